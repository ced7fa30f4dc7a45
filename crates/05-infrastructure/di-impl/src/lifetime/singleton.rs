//! 同步构建的共享生命周期

use super::scope_table::ScopeTable;
use super::synchronized::Synchronized;
use di_abstractions::{CreationPolicy, LifetimeManager, LifetimeScopes};
use infrastructure_common::Instance;
use std::fmt;
use std::sync::Arc;
use tracing::trace;
use uuid::Uuid;

/// 容器单例: 持有注册的容器内只有一个实例，随该容器释放
pub struct ContainerControlledLifetimeManager {
    slot: Synchronized<Option<Instance>>,
}

impl ContainerControlledLifetimeManager {
    /// 创建空管理器
    pub fn new() -> Self {
        Self {
            slot: Synchronized::new(None),
        }
    }
}

impl Default for ContainerControlledLifetimeManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ContainerControlledLifetimeManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerControlledLifetimeManager")
            .field("has_value", &self.slot.peek(Option::clone).is_some())
            .finish()
    }
}

impl LifetimeManager for ContainerControlledLifetimeManager {
    fn name(&self) -> &'static str {
        "ContainerControlled"
    }

    fn creation_policy(&self) -> CreationPolicy {
        CreationPolicy::Once
    }

    fn try_get_value(&self, _scopes: LifetimeScopes<'_>) -> Option<Instance> {
        self.slot.peek(Option::clone)
    }

    fn get_value(&self, _scopes: LifetimeScopes<'_>) -> Option<Instance> {
        self.slot.acquire(&(), Option::clone)
    }

    fn set_value(&self, value: Instance, scopes: LifetimeScopes<'_>) {
        scopes.owner.register_disposable(&value);
        self.slot.publish(&(), |storage| *storage = Some(value));
        trace!("容器单例已缓存: {}", scopes.owner.scope().name);
    }

    fn is_synchronized(&self) -> bool {
        true
    }

    fn recover(&self, _scopes: LifetimeScopes<'_>) {
        self.slot.release(&());
    }

    fn clone_empty(&self) -> Arc<dyn LifetimeManager> {
        Arc::new(Self::new())
    }
}

/// 分层单例: 每个发起解析的容器各有一个实例，随该容器释放
///
/// 不同容器的首次构建互不阻塞。
pub struct HierarchicalLifetimeManager {
    slot: Arc<Synchronized<ScopeTable, Uuid>>,
}

impl HierarchicalLifetimeManager {
    /// 创建空管理器
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Synchronized::new(ScopeTable::new())),
        }
    }

    /// 已缓存值的作用域个数
    pub fn scope_count(&self) -> usize {
        self.slot.update(|table| table.len())
    }
}

impl Default for HierarchicalLifetimeManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HierarchicalLifetimeManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HierarchicalLifetimeManager")
            .field("scopes", &self.scope_count())
            .finish()
    }
}

impl LifetimeManager for HierarchicalLifetimeManager {
    fn name(&self) -> &'static str {
        "Hierarchical"
    }

    fn creation_policy(&self) -> CreationPolicy {
        CreationPolicy::OnceInWhile
    }

    fn try_get_value(&self, scopes: LifetimeScopes<'_>) -> Option<Instance> {
        let key = scopes.current.scope().id;
        self.slot.peek(|table| table.get(&key))
    }

    fn get_value(&self, scopes: LifetimeScopes<'_>) -> Option<Instance> {
        let key = scopes.current.scope().id;
        self.slot.acquire(&key, |table| table.get(&key))
    }

    fn set_value(&self, value: Instance, scopes: LifetimeScopes<'_>) {
        let key = scopes.current.scope().id;
        scopes.current.register_disposable(&value);
        let slot = Arc::downgrade(&self.slot);
        scopes.current.register_release(Box::new(move || {
            if let Some(slot) = slot.upgrade() {
                // 在锁外丢弃移除的值
                let removed = slot.update(|table| table.remove(&key));
                drop(removed);
            }
        }));
        self.slot.publish(&key, |table| table.insert(key, value));
        trace!("分层单例已缓存: {}", scopes.current.scope().name);
    }

    fn is_synchronized(&self) -> bool {
        true
    }

    fn recover(&self, scopes: LifetimeScopes<'_>) {
        self.slot.release(&scopes.current.scope().id);
    }

    fn clone_empty(&self) -> Arc<dyn LifetimeManager> {
        Arc::new(Self::new())
    }
}
