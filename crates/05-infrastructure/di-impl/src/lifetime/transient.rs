//! 不缓存值的生命周期

use di_abstractions::{CreationPolicy, LifetimeManager, LifetimeScopes};
use infrastructure_common::Instance;
use std::sync::Arc;

/// 瞬时生命周期: 每次解析都创建新实例
#[derive(Debug, Default, Clone, Copy)]
pub struct TransientLifetimeManager;

impl LifetimeManager for TransientLifetimeManager {
    fn name(&self) -> &'static str {
        "Transient"
    }

    fn creation_policy(&self) -> CreationPolicy {
        CreationPolicy::Always
    }

    fn try_get_value(&self, _scopes: LifetimeScopes<'_>) -> Option<Instance> {
        None
    }

    fn set_value(&self, _value: Instance, _scopes: LifetimeScopes<'_>) {}

    fn clone_empty(&self) -> Arc<dyn LifetimeManager> {
        Arc::new(Self)
    }
}

/// 单次解析生命周期
///
/// 管理器本身不保存值；同一次顶层解析内构建的值保存在解析请求中，供兄弟依赖复用。
#[derive(Debug, Default, Clone, Copy)]
pub struct PerResolveLifetimeManager;

impl LifetimeManager for PerResolveLifetimeManager {
    fn name(&self) -> &'static str {
        "PerResolve"
    }

    fn creation_policy(&self) -> CreationPolicy {
        CreationPolicy::PerResolve
    }

    fn try_get_value(&self, _scopes: LifetimeScopes<'_>) -> Option<Instance> {
        None
    }

    fn set_value(&self, _value: Instance, _scopes: LifetimeScopes<'_>) {}

    fn clone_empty(&self) -> Arc<dyn LifetimeManager> {
        Arc::new(Self)
    }
}
