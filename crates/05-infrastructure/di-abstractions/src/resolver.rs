//! 依赖解析器抽象接口
//!
//! 提供依赖解析、异步解析与对已有实例的成员注入

use crate::contract::Contract;
use crate::overrides::ResolverOverride;
use async_trait::async_trait;
use infrastructure_common::{DependencyResult, Instance};
use std::any::Any;
use std::sync::Arc;

/// 依赖解析器 trait
///
/// 解析失败时返回 [`DependencyError::ResolutionFailed`](infrastructure_common::DependencyError::ResolutionFailed)，
/// 不会静默返回空值。
#[async_trait]
pub trait DependencyResolver: Send + Sync {
    /// 解析契约
    fn resolve(&self, contract: &Contract, overrides: &[Arc<dyn ResolverOverride>]) -> DependencyResult<Instance>;

    /// 异步解析契约
    ///
    /// 有缓存值时立即完成，否则把整个解析交给阻塞任务执行。
    async fn resolve_async(
        &self,
        contract: Contract,
        overrides: Vec<Arc<dyn ResolverOverride>>,
    ) -> DependencyResult<Instance>;

    /// 为已构造的实例注入成员，不创建新实例
    fn build_up(
        &self,
        contract: &Contract,
        existing: Box<dyn Any + Send + Sync>,
        overrides: &[Arc<dyn ResolverOverride>],
    ) -> DependencyResult<Box<dyn Any + Send + Sync>>;

    /// 契约是否已在当前容器或其祖先中注册
    fn is_registered(&self, contract: &Contract) -> bool;
}

infrastructure_common::reflect_interface!(dyn DependencyResolver);
