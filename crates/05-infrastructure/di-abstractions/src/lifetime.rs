//! 生命周期抽象
//!
//! 生命周期管理器决定注册的值在什么范围内共享。管理器只缓存值，
//! 构建值的工作始终由解析管线完成。

use infrastructure_common::{Instance, Scope};
use std::fmt;
use std::sync::Arc;

/// 创建策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CreationPolicy {
    /// 每次解析都创建
    Always,
    /// 只创建一次
    Once,
    /// 在某个范围内（线程、作用域、注册版本、外部引用）只创建一次
    OnceInWhile,
    /// 同一次顶层解析内只创建一次
    PerResolve,
}

/// 作用域释放时执行的清理
pub type ScopeRelease = Box<dyn FnOnce() + Send + Sync>;

/// 生命周期管理器可见的容器作用域
pub trait LifetimeScope: Send + Sync {
    /// 作用域身份
    fn scope(&self) -> &Scope;

    /// 注册版本号，任何注册变更都会使其递增
    fn version(&self) -> u64;

    /// 登记需要随作用域释放的实例
    ///
    /// 未声明释放函数的实例会被忽略。
    fn register_disposable(&self, instance: &Instance);

    /// 登记作用域释放（或丢弃）时执行的清理
    ///
    /// 按作用域缓存值的管理器借此移除该作用域的值。
    fn register_release(&self, release: ScopeRelease);
}

/// 一次解析涉及的两个作用域
#[derive(Clone, Copy)]
pub struct LifetimeScopes<'a> {
    /// 持有注册的容器
    pub owner: &'a dyn LifetimeScope,
    /// 发起解析的容器
    pub current: &'a dyn LifetimeScope,
}

impl fmt::Debug for LifetimeScopes<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifetimeScopes")
            .field("owner", &self.owner.scope().name)
            .field("current", &self.current.scope().name)
            .finish()
    }
}

/// 生命周期管理器
pub trait LifetimeManager: Send + Sync + fmt::Debug {
    /// 管理器名称（诊断用）
    fn name(&self) -> &'static str;

    /// 创建策略
    fn creation_policy(&self) -> CreationPolicy;

    /// 查看已缓存的值，不等待正在进行的构建
    fn try_get_value(&self, scopes: LifetimeScopes<'_>) -> Option<Instance>;

    /// 获取已缓存的值
    ///
    /// 同步管理器在没有值时取得构建权并返回 `None`；其它线程正在构建时会等待其完成。
    fn get_value(&self, scopes: LifetimeScopes<'_>) -> Option<Instance> {
        self.try_get_value(scopes)
    }

    /// 缓存新构建的值并释放构建权
    fn set_value(&self, value: Instance, scopes: LifetimeScopes<'_>);

    /// 是否需要互斥构建
    fn is_synchronized(&self) -> bool {
        false
    }

    /// 构建失败后释放构建权
    ///
    /// 只在 [`get_value`](Self::get_value) 返回 `None` 而最终没有调用 `set_value` 时调用。
    fn recover(&self, _scopes: LifetimeScopes<'_>) {}

    /// 创建同策略的空管理器
    fn clone_empty(&self) -> Arc<dyn LifetimeManager>;
}
