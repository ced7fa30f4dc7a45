//! 实例表示
//!
//! 容器内部统一以 `Arc<dyn Any + Send + Sync>` 传递实例，实例保存的是具体类型的值。

use crate::errors::DependencyResult;
use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

/// 类型擦除的共享实例
pub type Instance = Arc<dyn Any + Send + Sync>;

/// 数组合成的结果
pub type InstanceList = Vec<Instance>;

/// 实例的具体类型
pub fn instance_type_id(instance: &Instance) -> TypeId {
    (**instance).type_id()
}

/// 实例地址（忽略虚表），用于身份比较与去重
pub fn instance_address(instance: &Instance) -> usize {
    Arc::as_ptr(instance).cast::<()>() as usize
}

/// 两个实例是否为同一对象
pub fn same_instance(left: &Instance, right: &Instance) -> bool {
    instance_address(left) == instance_address(right)
}

/// 延迟序列的数据源
pub trait InstanceSource: Send + Sync {
    /// 按当前注册集合逐个解析元素
    fn iter(&self) -> Box<dyn Iterator<Item = DependencyResult<Instance>> + '_>;
}

/// 只读延迟序列
///
/// 每次枚举都会反映枚举时刻的注册集合。
#[derive(Clone)]
pub struct LazyInstances {
    source: Arc<dyn InstanceSource>,
}

impl LazyInstances {
    /// 包装数据源
    pub fn new(source: Arc<dyn InstanceSource>) -> Self {
        Self { source }
    }

    /// 逐个解析元素
    pub fn iter(&self) -> Box<dyn Iterator<Item = DependencyResult<Instance>> + '_> {
        self.source.iter()
    }

    /// 解析全部元素
    pub fn collect_all(&self) -> DependencyResult<InstanceList> {
        self.iter().collect()
    }
}

impl fmt::Debug for LazyInstances {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyInstances").finish_non_exhaustive()
    }
}
