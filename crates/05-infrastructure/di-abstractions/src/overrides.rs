//! 解析覆盖抽象

use crate::import::{ImportDescriptor, MatchRank};
use crate::injection::InjectionValue;
use std::fmt;

/// 调用方在单次解析中提供的覆盖
///
/// 多个覆盖同时匹配时，后加入的优先。
pub trait ResolverOverride: Send + Sync + fmt::Debug {
    /// 与导入描述的匹配等级
    fn rank(&self, import: &ImportDescriptor) -> MatchRank;

    /// 部分匹配被接受的最低等级
    fn required_rank(&self) -> MatchRank {
        MatchRank::ExactMatch
    }

    /// 覆盖值
    fn value(&self) -> InjectionValue;
}
