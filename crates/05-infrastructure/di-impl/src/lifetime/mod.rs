//! 生命周期管理器实现

mod scope_table;
mod scoped;
mod singleton;
mod synchronized;
mod transient;

pub use scoped::{ExternallyControlledLifetimeManager, PerThreadLifetimeManager, RegistrationControlledLifetimeManager};
pub use singleton::{ContainerControlledLifetimeManager, HierarchicalLifetimeManager};
pub use transient::{PerResolveLifetimeManager, TransientLifetimeManager};

use di_abstractions::{LifetimeManager, LifetimeScopes};

/// 构建失败（包括展开）时调用同步管理器的恢复钩子
pub(crate) struct RecoveryGuard<'a> {
    lifetime: &'a dyn LifetimeManager,
    scopes: LifetimeScopes<'a>,
    armed: bool,
}

impl<'a> RecoveryGuard<'a> {
    /// 在 `get_value` 取得构建权之后创建
    pub(crate) fn new(lifetime: &'a dyn LifetimeManager, scopes: LifetimeScopes<'a>) -> Option<Self> {
        lifetime.is_synchronized().then_some(Self {
            lifetime,
            scopes,
            armed: true,
        })
    }

    /// 值已写入，`set_value` 已交还构建权
    pub(crate) fn complete(mut self) {
        self.armed = false;
    }
}

impl Drop for RecoveryGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.lifetime.recover(self.scopes);
        }
    }
}
