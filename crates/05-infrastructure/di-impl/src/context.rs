//! 管线上下文
//!
//! 每次解析（包括嵌套依赖）各有一个上下文，沿调用栈通过 `parent` 串联。
//! 上下文一旦出错，后续策略不再修改它。

use crate::container::DiContainerImpl;
use crate::parameters;
use crate::plan::BuildPlan;
use crate::registration::RegistrationManager;
use di_abstractions::{Contract, ImportDescriptor, LifetimeScopes, ResolverOverride};
use infrastructure_common::{DependencyError, DependencyResult, Instance};
use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// 正在构建的目标值
pub enum Target {
    /// 尚未产生值
    Empty,
    /// 独占的新值，成员注入直接修改它
    Owned(Box<dyn Any + Send + Sync>),
    /// 共享值（实例注册、工厂结果或已缓存的值）
    Shared(Instance),
}

impl Target {
    /// 是否尚未产生值
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Owned(_) => f.write_str("Owned(..)"),
            Self::Shared(_) => f.write_str("Shared(..)"),
        }
    }
}

/// 一次顶层解析共享的状态
///
/// 单次解析生命周期的值保存在这里，供同一棵解析树内的兄弟依赖复用。
#[derive(Default)]
pub(crate) struct RequestState {
    per_resolve: RefCell<HashMap<Contract, Instance>>,
}

impl RequestState {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn get(&self, contract: &Contract) -> Option<Instance> {
        self.per_resolve.borrow().get(contract).cloned()
    }

    pub(crate) fn insert(&self, contract: Contract, value: Instance) {
        self.per_resolve.borrow_mut().insert(contract, value);
    }
}

thread_local! {
    static SUSPENDED: RefCell<Vec<Contract>> = const { RefCell::new(Vec::new()) };
}

/// 调用用户代码（工厂、构造函数、注入方法）期间挂起的外层解析路径
///
/// 用户代码通过容器发起的解析从新的顶层上下文开始，递归保护靠这条路径接上外层的深度与祖先。
/// 路径按线程记录，离开作用域（包括展开）时恢复。
pub(crate) struct SuspendedPath {
    restore: usize,
}

impl SuspendedPath {
    /// 挂起 `context` 及其祖先的契约
    pub(crate) fn enter(context: &PipelineContext<'_>) -> Self {
        let mut path: Vec<Contract> = context.ancestors().map(|ancestor| ancestor.contract().clone()).collect();
        path.reverse();
        path.push(context.contract().clone());
        SUSPENDED.with(|suspended| {
            let mut suspended = suspended.borrow_mut();
            let restore = suspended.len();
            suspended.extend(path);
            Self { restore }
        })
    }

    /// 在挂起路径上执行，路径由外到内
    pub(crate) fn with<R>(inspect: impl FnOnce(&[Contract]) -> R) -> R {
        SUSPENDED.with(|suspended| inspect(&suspended.borrow()))
    }
}

impl Drop for SuspendedPath {
    fn drop(&mut self) {
        SUSPENDED.with(|suspended| suspended.borrow_mut().truncate(self.restore));
    }
}

/// 管线上下文
pub struct PipelineContext<'a> {
    contract: Contract,
    container: &'a DiContainerImpl,
    owner: &'a DiContainerImpl,
    registration: Arc<RegistrationManager>,
    plan: Option<Arc<BuildPlan>>,
    overrides: &'a [Arc<dyn ResolverOverride>],
    target: Target,
    error: Option<DependencyError>,
    parent: Option<&'a PipelineContext<'a>>,
    request: &'a RequestState,
    depth: usize,
}

impl<'a> PipelineContext<'a> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        contract: Contract,
        container: &'a DiContainerImpl,
        owner: &'a DiContainerImpl,
        registration: Arc<RegistrationManager>,
        plan: Option<Arc<BuildPlan>>,
        overrides: &'a [Arc<dyn ResolverOverride>],
        parent: Option<&'a PipelineContext<'a>>,
        request: &'a RequestState,
    ) -> Self {
        Self {
            contract,
            container,
            owner,
            registration,
            plan,
            overrides,
            target: Target::Empty,
            error: None,
            depth: parent.map_or(0, |parent| parent.depth + 1),
            parent,
            request,
        }
    }

    /// 正在解析的契约
    pub fn contract(&self) -> &Contract {
        &self.contract
    }

    /// 发起解析的容器
    pub fn container(&self) -> &'a DiContainerImpl {
        self.container
    }

    /// 持有注册的容器
    pub fn owner(&self) -> &'a DiContainerImpl {
        self.owner
    }

    /// 注册管理器
    pub fn registration(&self) -> &Arc<RegistrationManager> {
        &self.registration
    }

    /// 构建计划（仅类型注册有）
    pub fn plan(&self) -> Option<&Arc<BuildPlan>> {
        self.plan.as_ref()
    }

    /// 本次解析的覆盖
    pub fn overrides(&self) -> &'a [Arc<dyn ResolverOverride>] {
        self.overrides
    }

    /// 上一层上下文
    pub fn parent(&self) -> Option<&'a PipelineContext<'a>> {
        self.parent
    }

    /// 从上一层开始依次经过的祖先上下文
    pub fn ancestors(&self) -> impl Iterator<Item = &'a PipelineContext<'a>> {
        std::iter::successors(self.parent, |context| context.parent)
    }

    /// 嵌套深度，顶层为 0
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub(crate) fn request(&self) -> &'a RequestState {
        self.request
    }

    /// 生命周期管理器可见的作用域
    pub fn scopes(&self) -> LifetimeScopes<'a> {
        LifetimeScopes {
            owner: self.owner,
            current: self.container,
        }
    }

    /// 是否已出错
    pub fn is_faulted(&self) -> bool {
        self.error.is_some()
    }

    /// 标记出错，只保留第一个错误
    pub fn fault(&mut self, error: DependencyError) {
        if self.error.is_none() {
            warn!("构建失败: {}, 原因: {}", self.contract, error);
            self.error = Some(error);
        }
    }

    /// 当前目标值
    pub fn target(&self) -> &Target {
        &self.target
    }

    /// 替换目标值
    pub fn set_target(&mut self, target: Target) {
        self.target = target;
    }

    /// 可修改的目标值
    ///
    /// 共享值只有在没有其它引用时才能修改。
    pub fn target_mut(&mut self) -> Option<&mut (dyn Any + Send + Sync)> {
        match &mut self.target {
            Target::Empty => None,
            Target::Owned(value) => Some(value.as_mut()),
            Target::Shared(value) => Arc::get_mut(value),
        }
    }

    /// 解析单个导入
    pub fn resolve_import(&self, import: &ImportDescriptor) -> DependencyResult<Option<Instance>> {
        parameters::resolve_import(self, import)
    }

    /// 转换为共享实例；出错或没有产生值时返回错误
    pub fn into_result(self) -> DependencyResult<Instance> {
        if let Some(error) = self.error {
            return Err(error);
        }
        match self.target {
            Target::Empty => Err(DependencyError::NoValueProduced {
                type_name: self.contract.type_handle().name().to_string(),
            }),
            Target::Owned(value) => Ok(Arc::from(value)),
            Target::Shared(value) => Ok(value),
        }
    }

    /// 转换为独占值，供对已有实例注入时使用
    pub(crate) fn into_owned(self) -> DependencyResult<Box<dyn Any + Send + Sync>> {
        if let Some(error) = self.error {
            return Err(error);
        }
        match self.target {
            Target::Owned(value) => Ok(value),
            Target::Empty | Target::Shared(_) => Err(DependencyError::NoValueProduced {
                type_name: self.contract.type_handle().name().to_string(),
            }),
        }
    }
}

impl fmt::Debug for PipelineContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineContext")
            .field("contract", &self.contract)
            .field("depth", &self.depth)
            .field("target", &self.target)
            .field("faulted", &self.is_faulted())
            .finish_non_exhaustive()
    }
}
