//! 在某个范围内共享的生命周期

use dashmap::DashMap;
use di_abstractions::{CreationPolicy, LifetimeManager, LifetimeScopes};
use infrastructure_common::Instance;
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};

/// 外部控制: 只保存弱引用，外部释放后视为没有值
#[derive(Debug, Default)]
pub struct ExternallyControlledLifetimeManager {
    value: RwLock<Option<Weak<dyn Any + Send + Sync>>>,
}

impl ExternallyControlledLifetimeManager {
    /// 创建空管理器
    pub fn new() -> Self {
        Self::default()
    }
}

impl LifetimeManager for ExternallyControlledLifetimeManager {
    fn name(&self) -> &'static str {
        "ExternallyControlled"
    }

    fn creation_policy(&self) -> CreationPolicy {
        CreationPolicy::OnceInWhile
    }

    fn try_get_value(&self, _scopes: LifetimeScopes<'_>) -> Option<Instance> {
        self.value.read().as_ref().and_then(Weak::upgrade)
    }

    fn set_value(&self, value: Instance, _scopes: LifetimeScopes<'_>) {
        *self.value.write() = Some(Arc::downgrade(&value));
    }

    fn clone_empty(&self) -> Arc<dyn LifetimeManager> {
        Arc::new(Self::new())
    }
}

/// 线程单例: 每个线程一个实例
#[derive(Debug, Default)]
pub struct PerThreadLifetimeManager {
    values: DashMap<ThreadId, Instance>,
}

impl PerThreadLifetimeManager {
    /// 创建空管理器
    pub fn new() -> Self {
        Self::default()
    }
}

impl LifetimeManager for PerThreadLifetimeManager {
    fn name(&self) -> &'static str {
        "PerThread"
    }

    fn creation_policy(&self) -> CreationPolicy {
        CreationPolicy::OnceInWhile
    }

    fn try_get_value(&self, _scopes: LifetimeScopes<'_>) -> Option<Instance> {
        self.values
            .get(&thread::current().id())
            .map(|value| value.clone())
    }

    fn set_value(&self, value: Instance, _scopes: LifetimeScopes<'_>) {
        self.values.insert(thread::current().id(), value);
    }

    fn clone_empty(&self) -> Arc<dyn LifetimeManager> {
        Arc::new(Self::new())
    }
}

/// 注册版本控制: 持有注册的容器发生任何注册变更后值失效
#[derive(Debug, Default)]
pub struct RegistrationControlledLifetimeManager {
    value: Mutex<Option<(u64, Instance)>>,
}

impl RegistrationControlledLifetimeManager {
    /// 创建空管理器
    pub fn new() -> Self {
        Self::default()
    }
}

impl LifetimeManager for RegistrationControlledLifetimeManager {
    fn name(&self) -> &'static str {
        "RegistrationControlled"
    }

    fn creation_policy(&self) -> CreationPolicy {
        CreationPolicy::OnceInWhile
    }

    fn try_get_value(&self, scopes: LifetimeScopes<'_>) -> Option<Instance> {
        let version = scopes.owner.version();
        self.value
            .lock()
            .as_ref()
            .filter(|(written, _)| *written == version)
            .map(|(_, value)| value.clone())
    }

    fn set_value(&self, value: Instance, scopes: LifetimeScopes<'_>) {
        scopes.owner.register_disposable(&value);
        *self.value.lock() = Some((scopes.owner.version(), value));
    }

    fn clone_empty(&self) -> Arc<dyn LifetimeManager> {
        Arc::new(Self::new())
    }
}
