//! 依赖注入容器
//!
//! 容器持有注册表、开放泛型注册、合成注册缓存与释放列表。子容器与父容器共享策略链，
//! 查找注册时先查自身再沿父链向上；找不到时按契约类型合成注册。

use crate::context::{PipelineContext, RequestState, Target};
use crate::disposal::DisposalList;
use crate::lifetime::{ContainerControlledLifetimeManager, RecoveryGuard, TransientLifetimeManager};
use crate::registration::RegistrationManager;
use crate::strategies::Strategies;
use crate::synthesis::{self, OpenGeneric, Synthesized};
use async_trait::async_trait;
use dashmap::DashMap;
use di_abstractions::{
    ContainerConfig, Contract, CreationPolicy, DependencyResolver, InjectionMember, LifetimeManager,
    LifetimeScope, LifetimeScopes, RegistrationData, ResolverOverride, ScopeRelease,
};
use infrastructure_common::{
    catalog, ConfigResult, ConstructionError, DependencyError, DependencyResult, GenericDefinition, Injectable,
    Instance, InstanceList, Reflect, RegistrationError, RegistrationResult, Scope, TypeDescriptor, TypeHandle,
};
use parking_lot::{Mutex, RwLock};
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info, trace, warn};

#[derive(Default)]
struct Registry {
    managers: HashMap<Contract, Arc<RegistrationManager>>,
    order: Vec<Contract>,
}

/// 容器内部状态，子容器通过强引用持有父容器
pub(crate) struct ContainerState {
    scope: Scope,
    parent: Option<DiContainerImpl>,
    config: ContainerConfig,
    registry: RwLock<Registry>,
    pub(crate) open_generics: RwLock<Vec<Arc<OpenGeneric>>>,
    pub(crate) synthesized: DashMap<Contract, Synthesized>,
    version: AtomicU64,
    disposables: DisposalList,
    releases: Mutex<Vec<ScopeRelease>>,
    strategies: Arc<Strategies>,
    disposed: AtomicBool,
}

impl ContainerState {
    /// 执行登记的作用域清理
    fn release_scope(&self) {
        let releases = std::mem::take(&mut *self.releases.lock());
        if !releases.is_empty() {
            trace!("清理作用域缓存: {}, {} 项", self.scope.name, releases.len());
        }
        for release in releases {
            release();
        }
    }
}

impl Drop for ContainerState {
    fn drop(&mut self) {
        self.release_scope();
    }
}

/// 具体的依赖注入容器实现
///
/// 克隆得到的是同一个容器的另一个句柄。
#[derive(Clone)]
pub struct DiContainerImpl {
    state: Arc<ContainerState>,
}

impl DiContainerImpl {
    /// 使用默认配置创建根容器
    pub fn new() -> Self {
        Self::create(ContainerConfig::default())
    }

    /// 使用指定配置创建根容器
    pub fn with_config(config: ContainerConfig) -> ConfigResult<Self> {
        config.validate()?;
        Ok(Self::create(config))
    }

    fn create(config: ContainerConfig) -> Self {
        let strategies = Arc::new(Strategies::new(&config));
        Self::assemble(Scope::root(), None, config, strategies)
    }

    fn assemble(
        scope: Scope,
        parent: Option<Self>,
        config: ContainerConfig,
        strategies: Arc<Strategies>,
    ) -> Self {
        let container = Self {
            state: Arc::new(ContainerState {
                scope,
                parent,
                config,
                registry: RwLock::new(Registry::default()),
                open_generics: RwLock::new(Vec::new()),
                synthesized: DashMap::new(),
                version: AtomicU64::new(0),
                disposables: DisposalList::new(),
                releases: Mutex::new(Vec::new()),
                strategies,
                disposed: AtomicBool::new(false),
            }),
        };

        for contract in [Contract::of::<Self>(), Contract::of::<dyn DependencyResolver>()] {
            container.insert(Arc::new(RegistrationManager::new(
                contract,
                RegistrationData::Internal,
                Arc::new(TransientLifetimeManager),
                Vec::new(),
            )));
        }
        debug!("创建容器: {}", container.state.scope.name);
        container
    }

    /// 创建子容器
    ///
    /// 子容器可以覆盖父容器的注册，父容器看不到子容器的注册。
    pub fn create_child_container(&self) -> Self {
        let scope = self.state.scope.child("child");
        debug!("创建子容器: {}", scope.name);
        Self::assemble(
            scope,
            Some(self.clone()),
            self.state.config.clone(),
            self.state.strategies.clone(),
        )
    }

    /// 容器配置
    pub fn config(&self) -> &ContainerConfig {
        &self.state.config
    }

    /// 容器作用域
    pub fn scope(&self) -> &Scope {
        &self.state.scope
    }

    /// 父容器
    pub fn parent(&self) -> Option<&Self> {
        self.state.parent.as_ref()
    }

    /// 策略链
    pub fn strategies(&self) -> &Arc<Strategies> {
        &self.state.strategies
    }

    /// 是否已释放
    pub fn is_disposed(&self) -> bool {
        self.state.disposed.load(Ordering::Acquire)
    }

    /// 当前容器的注册，按注册顺序
    pub fn registrations(&self) -> Vec<Arc<RegistrationManager>> {
        let registry = self.state.registry.read();
        registry
            .order
            .iter()
            .filter_map(|contract| registry.managers.get(contract).cloned())
            .collect()
    }

    /// 开始一个注册
    pub fn registration<T: ?Sized + Reflect>(&self) -> RegistrationBuilder<'_> {
        RegistrationBuilder::new(self, Contract::of::<T>())
    }

    /// 注册契约
    ///
    /// 同一契约再次注册时替换原注册。已被其它注册使用的生命周期管理器会换成同策略的空管理器。
    /// 启用校验时立即选择构建计划，注入声明错误在这里返回。
    pub fn register(
        &self,
        contract: Contract,
        data: RegistrationData,
        lifetime: Arc<dyn LifetimeManager>,
        members: Vec<InjectionMember>,
    ) -> RegistrationResult<Arc<RegistrationManager>> {
        let data = match data {
            RegistrationData::None => RegistrationData::Type(contract.type_handle().clone()),
            data => data,
        };
        if let RegistrationData::Type(implementation) = &data {
            if !contract.type_handle().is_assignable_from(implementation) {
                return Err(RegistrationError::IncompatibleMapping {
                    from: contract.type_handle().name().to_string(),
                    to: implementation.name().to_string(),
                });
            }
        }

        let lifetime = if self.lifetime_in_use(&lifetime) {
            debug!("生命周期管理器已被使用，改用新的 {} 管理器", lifetime.name());
            lifetime.clone_empty()
        } else {
            lifetime
        };

        let manager = Arc::new(RegistrationManager::new(contract, data, lifetime, members));
        if self.state.config.enable_validation {
            let prepared = manager.prepare(&self.state.strategies)?;
            if let Some(error) = prepared.plan.as_ref().and_then(|plan| plan.registration_error()) {
                return Err(error.clone());
            }
        }

        info!(
            "注册组件: {} -> {}, 生命周期 {}",
            manager.contract(),
            manager.data(),
            manager.lifetime().name()
        );
        self.insert(manager.clone());
        if let RegistrationData::Instance(instance) = manager.data() {
            manager.lifetime().set_value(
                instance.clone(),
                LifetimeScopes {
                    owner: self,
                    current: self,
                },
            );
        }
        Ok(manager)
    }

    /// 注册已有实例，由容器控制生命周期
    pub fn register_instance<T: ?Sized + Reflect>(&self, instance: Instance) -> RegistrationResult<Arc<RegistrationManager>> {
        self.registration::<T>().instance(instance).register()
    }

    /// 注册工厂，每次解析都调用
    pub fn register_factory<T, F>(&self, factory: F) -> RegistrationResult<Arc<RegistrationManager>>
    where
        T: ?Sized + Reflect,
        F: Fn(&dyn DependencyResolver, &Contract) -> DependencyResult<Option<Instance>> + Send + Sync + 'static,
    {
        self.registration::<T>().factory(factory).register()
    }

    /// 注册开放泛型映射
    ///
    /// 解析封闭类型时用相同实参封闭实现定义；每个封闭类型得到一个新的同策略生命周期管理器。
    pub fn register_open_generic(
        &self,
        definition: GenericDefinition,
        implementation: GenericDefinition,
        name: Option<String>,
        lifetime: Arc<dyn LifetimeManager>,
        members: Vec<InjectionMember>,
    ) -> RegistrationResult<()> {
        if definition.arity() != implementation.arity() {
            return Err(RegistrationError::IncompatibleMapping {
                from: definition.to_string(),
                to: implementation.to_string(),
            });
        }

        info!("注册开放泛型: {} -> {}, 生命周期 {}", definition, implementation, lifetime.name());
        let open = Arc::new(OpenGeneric {
            definition,
            implementation,
            name,
            lifetime,
            members,
        });
        {
            let mut open_generics = self.state.open_generics.write();
            match open_generics
                .iter_mut()
                .find(|existing| existing.definition == open.definition && existing.name == open.name)
            {
                Some(existing) => *existing = open,
                None => open_generics.push(open),
            }
        }
        self.state.version.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    fn insert(&self, manager: Arc<RegistrationManager>) {
        {
            let mut registry = self.state.registry.write();
            let contract = manager.contract().clone();
            if registry.managers.insert(contract.clone(), manager).is_none() {
                registry.order.push(contract);
            }
        }
        self.state.version.fetch_add(1, Ordering::AcqRel);
    }

    fn lifetime_in_use(&self, lifetime: &Arc<dyn LifetimeManager>) -> bool {
        self.state
            .registry
            .read()
            .managers
            .values()
            .any(|manager| Arc::ptr_eq(manager.lifetime(), lifetime))
    }

    /// 从当前容器开始，依次经过的祖先容器
    pub(crate) fn lineage(&self) -> impl Iterator<Item = &Self> {
        std::iter::successors(Some(self), |container| container.state.parent.as_ref())
    }

    /// 祖先链上全部注册版本之和，任一容器注册变更时改变
    pub(crate) fn lineage_version(&self) -> u64 {
        self.lineage()
            .map(|container| container.state.version.load(Ordering::Acquire))
            .sum()
    }

    pub(crate) fn state(&self) -> &ContainerState {
        &self.state
    }

    pub(crate) fn downgrade(&self) -> Weak<ContainerState> {
        Arc::downgrade(&self.state)
    }

    pub(crate) fn upgrade(state: &Weak<ContainerState>) -> Option<Self> {
        state.upgrade().map(|state| Self { state })
    }

    /// 查找显式注册，返回持有注册的容器
    fn find_registered(&self, contract: &Contract) -> Option<(Self, Arc<RegistrationManager>)> {
        self.lineage().find_map(|container| {
            container
                .state
                .registry
                .read()
                .managers
                .get(contract)
                .map(|manager| (container.clone(), manager.clone()))
        })
    }

    /// 查找注册，找不到时合成
    pub(crate) fn lookup(&self, contract: &Contract) -> DependencyResult<(Self, Arc<RegistrationManager>)> {
        if let Some(found) = self.find_registered(contract) {
            return Ok(found);
        }
        synthesis::synthesize(self, contract)
    }

    /// 集合元素契约: 从当前容器到根，同名注册只取最近的一个
    pub(crate) fn collection_contracts(&self, element: &TypeHandle) -> Vec<Contract> {
        let mut contracts: Vec<Contract> = Vec::new();
        let mut push = |contract: Contract| {
            if !contracts.iter().any(|seen| seen.name() == contract.name()) {
                contracts.push(contract);
            }
        };

        let definition = element.generic().map(|generic| generic.definition);
        for container in self.lineage() {
            {
                let registry = container.state.registry.read();
                for contract in &registry.order {
                    if contract.type_handle() == element {
                        push(contract.clone());
                    }
                }
            }
            if let Some(definition) = definition {
                for open in container.state.open_generics.read().iter() {
                    if open.definition == definition {
                        push(Contract::new(element.clone(), open.name.clone()));
                    }
                }
            }
        }
        contracts
    }

    fn ensure_live(&self) -> DependencyResult<()> {
        if self.is_disposed() {
            return Err(DependencyError::Disposed {
                scope: self.state.scope.name.clone(),
            });
        }
        Ok(())
    }

    /// 执行一次解析
    ///
    /// 先查生命周期缓存；需要构建时在同步管理器的构建权内运行管线，失败时交还构建权。
    fn execute(
        &self,
        contract: &Contract,
        overrides: &[Arc<dyn ResolverOverride>],
        parent: Option<&PipelineContext<'_>>,
        request: &RequestState,
    ) -> DependencyResult<Instance> {
        self.ensure_live()?;
        let (owner, manager) = self.lookup(contract)?;
        let lifetime = manager.lifetime().clone();
        let scopes = LifetimeScopes {
            owner: &owner,
            current: self,
        };

        if let Some(value) = lifetime.try_get_value(scopes) {
            trace!("命中生命周期缓存: {}", contract);
            return Ok(value);
        }
        let per_resolve = lifetime.creation_policy() == CreationPolicy::PerResolve;
        if per_resolve {
            if let Some(value) = request.get(contract) {
                return Ok(value);
            }
        }

        if let Some(value) = lifetime.get_value(scopes) {
            return Ok(value);
        }
        let recovery = RecoveryGuard::new(&*lifetime, scopes);

        let prepared = manager.prepare(&self.state.strategies)?;
        let mut context = PipelineContext::new(
            contract.clone(),
            self,
            &owner,
            manager.clone(),
            prepared.plan.clone(),
            overrides,
            parent,
            request,
        );
        (prepared.pipeline)(&mut context);
        let value = context.into_result()?;

        lifetime.set_value(value.clone(), scopes);
        if let Some(recovery) = recovery {
            recovery.complete();
        }
        if per_resolve {
            request.insert(contract.clone(), value.clone());
        }
        Ok(value)
    }

    /// 在外层管线内解析依赖，共享覆盖与解析请求
    pub(crate) fn resolve_nested(&self, contract: &Contract, parent: &PipelineContext<'_>) -> DependencyResult<Instance> {
        self.execute(contract, parent.overrides(), Some(parent), parent.request())
    }

    /// 开始一次新的顶层解析，不包装错误
    pub(crate) fn resolve_root(&self, contract: &Contract) -> DependencyResult<Instance> {
        self.execute(contract, &[], None, &RequestState::new())
    }

    fn wrap(contract: &Contract, error: DependencyError) -> DependencyError {
        warn!("解析失败: {}, 原因: {}", contract, error);
        DependencyError::resolution_failed(
            contract.type_handle().name(),
            contract.name().map(str::to_string),
            error,
        )
    }

    fn cached(&self, contract: &Contract) -> Option<Instance> {
        let (owner, manager) = self.find_registered(contract)?;
        manager.lifetime().try_get_value(LifetimeScopes {
            owner: &owner,
            current: self,
        })
    }

    fn build_up_manager(&self, contract: &Contract, existing: &(dyn Any + Send + Sync)) -> DependencyResult<Arc<RegistrationManager>> {
        let concrete = existing.type_id();
        if let Ok((_, manager)) = self.lookup(contract) {
            if manager.data().implementation().and_then(TypeHandle::type_id) == Some(concrete) {
                return Ok(manager);
            }
        }
        let handle = catalog::handle_by_id(concrete).ok_or_else(|| ConstructionError::TypeNotDescribed {
            type_name: contract.type_handle().name().to_string(),
        })?;
        synthesis::poco(self, &Contract::new(handle, None))
    }

    fn build_up_existing(
        &self,
        contract: &Contract,
        existing: Box<dyn Any + Send + Sync>,
        overrides: &[Arc<dyn ResolverOverride>],
    ) -> DependencyResult<Box<dyn Any + Send + Sync>> {
        self.ensure_live()?;
        let manager = self.build_up_manager(contract, &*existing)?;
        let prepared = manager.prepare(&self.state.strategies)?;
        let request = RequestState::new();
        let mut context = PipelineContext::new(
            manager.contract().clone(),
            self,
            self,
            manager.clone(),
            prepared.plan.clone(),
            overrides,
            None,
            &request,
        );
        context.set_target(Target::Owned(existing));
        (prepared.pipeline)(&mut context);
        context.into_owned()
    }

    /// 解析类型 `T` 的默认注册
    pub fn resolve_type<T: Reflect + Send + Sync>(&self) -> DependencyResult<Arc<T>> {
        self.resolve_contract_as(&Contract::of::<T>())
    }

    /// 解析类型 `T` 的命名注册
    pub fn resolve_named<T: Reflect + Send + Sync>(&self, name: &str) -> DependencyResult<Arc<T>> {
        self.resolve_contract_as(&Contract::named::<T>(name))
    }

    fn resolve_contract_as<T: Reflect + Send + Sync>(&self, contract: &Contract) -> DependencyResult<Arc<T>> {
        self.resolve(contract, &[])?
            .downcast::<T>()
            .map_err(|_| mismatch::<T>(contract))
    }

    /// 解析接口 `I` 的默认注册
    pub fn resolve_service<I: ?Sized + Reflect + Send + Sync>(&self) -> DependencyResult<Arc<I>> {
        let contract = Contract::of::<I>();
        let instance = self.resolve(&contract, &[])?;
        catalog::cast::<I>(&instance).ok_or_else(|| mismatch::<I>(&contract))
    }

    /// 解析接口 `I` 的全部注册
    pub fn resolve_all<I: ?Sized + Reflect + Send + Sync>(&self) -> DependencyResult<Vec<Arc<I>>> {
        let contract = Contract::new(TypeHandle::array(I::type_handle(), 1), None);
        let instance = self.resolve(&contract, &[])?;
        let list = instance
            .downcast_ref::<InstanceList>()
            .ok_or_else(|| mismatch::<InstanceList>(&contract))?;
        list.iter()
            .map(|element| catalog::cast::<I>(element).ok_or_else(|| mismatch::<I>(&contract)))
            .collect()
    }

    /// 为已有值注入成员
    pub fn build_up_value<T: Reflect + Send + Sync>(&self, existing: T) -> DependencyResult<T> {
        let contract = Contract::of::<T>();
        let built = self.build_up(&contract, Box::new(existing), &[])?;
        built.downcast::<T>().map(|value| *value).map_err(|_| mismatch::<T>(&contract))
    }

    /// 释放容器
    ///
    /// 按配置的顺序释放容器缓存过的可释放实例，返回释放个数。重复调用不做任何事。
    /// 分层单例为本容器缓存的值随之移除（容器被丢弃时也会移除）。子容器需要单独释放。
    pub fn dispose(&self) -> usize {
        if self.state.disposed.swap(true, Ordering::AcqRel) {
            return 0;
        }
        let count = self.state.disposables.dispose(self.state.config.dispose_order);
        self.state.release_scope();
        debug!("释放容器: {}, 释放实例 {}", self.state.scope.name, count);
        count
    }
}

fn mismatch<T: ?Sized>(contract: &Contract) -> DependencyError {
    DependencyError::InvalidOperation(ConstructionError::TargetMismatch {
        expected: std::any::type_name::<T>().to_string(),
        member: contract.to_string(),
    })
}

impl Default for DiContainerImpl {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DiContainerImpl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiContainerImpl")
            .field("scope", &self.state.scope.name)
            .field("registrations", &self.state.registry.read().order.len())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl Reflect for DiContainerImpl {
    fn type_handle() -> TypeHandle {
        catalog::intern::<Self>(TypeHandle::abstract_class::<Self>)
    }
}

impl Injectable for DiContainerImpl {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::builder::<Self>()
            .implements::<dyn DependencyResolver>(|container| container as Arc<dyn DependencyResolver>)
            .build()
    }
}

#[async_trait]
impl DependencyResolver for DiContainerImpl {
    fn resolve(&self, contract: &Contract, overrides: &[Arc<dyn ResolverOverride>]) -> DependencyResult<Instance> {
        debug!("解析: {}", contract);
        self.execute(contract, overrides, None, &RequestState::new())
            .map_err(|error| Self::wrap(contract, error))
    }

    async fn resolve_async(
        &self,
        contract: Contract,
        overrides: Vec<Arc<dyn ResolverOverride>>,
    ) -> DependencyResult<Instance> {
        if let Some(value) = self.cached(&contract) {
            trace!("异步解析命中缓存: {}", contract);
            return Ok(value);
        }

        let container = self.clone();
        let type_name = contract.type_handle().name().to_string();
        tokio::task::spawn_blocking(move || container.resolve(&contract, &overrides))
            .await
            .map_err(|error| DependencyError::ComponentCreationFailed {
                type_name,
                source: Box::new(error),
            })?
    }

    fn build_up(
        &self,
        contract: &Contract,
        existing: Box<dyn Any + Send + Sync>,
        overrides: &[Arc<dyn ResolverOverride>],
    ) -> DependencyResult<Box<dyn Any + Send + Sync>> {
        debug!("注入已有实例: {}", contract);
        self.build_up_existing(contract, existing, overrides)
            .map_err(|error| Self::wrap(contract, error))
    }

    fn is_registered(&self, contract: &Contract) -> bool {
        self.find_registered(contract).is_some()
    }
}

impl LifetimeScope for DiContainerImpl {
    fn scope(&self) -> &Scope {
        &self.state.scope
    }

    fn version(&self) -> u64 {
        self.state.version.load(Ordering::Acquire)
    }

    fn register_disposable(&self, instance: &Instance) {
        self.state.disposables.register(instance);
    }

    fn register_release(&self, release: ScopeRelease) {
        self.state.releases.lock().push(release);
    }
}

/// 链式注册
///
/// ```rust,ignore
/// container
///     .registration::<dyn Repository>()
///     .named("primary")
///     .to::<SqlRepository>()
///     .lifetime(ContainerControlledLifetimeManager::new())
///     .register()?;
/// ```
#[must_use]
pub struct RegistrationBuilder<'c> {
    container: &'c DiContainerImpl,
    contract: Contract,
    data: RegistrationData,
    lifetime: Option<Arc<dyn LifetimeManager>>,
    members: Vec<InjectionMember>,
}

impl<'c> RegistrationBuilder<'c> {
    fn new(container: &'c DiContainerImpl, contract: Contract) -> Self {
        Self {
            container,
            contract,
            data: RegistrationData::None,
            lifetime: None,
            members: Vec::new(),
        }
    }

    /// 注册名称
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.contract = Contract::new(self.contract.type_handle().clone(), Some(name.into()));
        self
    }

    /// 映射到实现类型 `T`
    pub fn to<T: Reflect>(self) -> Self {
        self.to_type(T::type_handle())
    }

    /// 映射到实现类型句柄
    pub fn to_type(mut self, implementation: TypeHandle) -> Self {
        self.data = RegistrationData::Type(implementation);
        self
    }

    /// 使用已有实例，未指定生命周期时由容器控制
    pub fn instance(mut self, instance: Instance) -> Self {
        self.data = RegistrationData::Instance(instance);
        self
    }

    /// 使用工厂
    pub fn factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&dyn DependencyResolver, &Contract) -> DependencyResult<Option<Instance>> + Send + Sync + 'static,
    {
        self.data = RegistrationData::Factory(Arc::new(factory));
        self
    }

    /// 生命周期管理器
    pub fn lifetime(self, lifetime: impl LifetimeManager + 'static) -> Self {
        self.with_lifetime(Arc::new(lifetime))
    }

    /// 共享的生命周期管理器
    pub fn with_lifetime(mut self, lifetime: Arc<dyn LifetimeManager>) -> Self {
        self.lifetime = Some(lifetime);
        self
    }

    /// 注入成员
    pub fn member(mut self, member: InjectionMember) -> Self {
        self.members.push(member);
        self
    }

    /// 完成注册
    pub fn register(self) -> RegistrationResult<Arc<RegistrationManager>> {
        let lifetime = self.lifetime.unwrap_or_else(|| -> Arc<dyn LifetimeManager> {
            match self.data {
                RegistrationData::Instance(_) => Arc::new(ContainerControlledLifetimeManager::new()),
                _ => Arc::new(TransientLifetimeManager),
            }
        });
        self.container.register(self.contract, self.data, lifetime, self.members)
    }
}
