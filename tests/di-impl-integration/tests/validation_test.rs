//! 注册校验与构建失败的报告
mod common;

use common::*;
use di_abstractions::{
    Contract, ContainerConfig, DependencyResolver, ImportTarget, InjectionMember, InjectionValue, ResolverOverride,
    ValueProvider,
};
use di_impl::{ContainerControlledLifetimeManager, DiContainerImpl, ParameterOverride};
use infrastructure_common::{
    catalog, ConstructionError, ConstructorInfo, DependencyError, Injectable, MethodInfo, ParameterInfo,
    ParameterKind, PropertyInfo, Reflect, RegistrationError, TypeDescriptor, TypeHandle,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// 构造函数参数是自身类型
struct Looping;

impl Injectable for Looping {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::builder::<Self>()
            .constructor(vec![ParameterInfo::new("inner", TypeHandle::of::<Looping>())], |_| Ok(Self))
            .build()
    }
}

/// 构造函数带输出参数
struct Exchange;

impl Injectable for Exchange {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::builder::<Self>()
            .constructor(
                vec![ParameterInfo::new("rate", TypeHandle::of::<ServiceA>()).with_kind(ParameterKind::Out)],
                |_| Ok(Self),
            )
            .build()
    }
}

/// 两个注入构造函数
struct Twin;

impl Injectable for Twin {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::builder::<Self>()
            .injection_constructor(Vec::new(), |_| Ok(Self))
            .injection_constructor(vec![ParameterInfo::new("a", TypeHandle::of::<ServiceA>())], |_| Ok(Self))
            .build()
    }
}

/// 注入构造函数不是公共的
struct Vault {
    opened_by: &'static str,
}

impl Injectable for Vault {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::builder::<Self>()
            .with_constructor(
                ConstructorInfo::new::<Self, _>(vec![ParameterInfo::new("a", TypeHandle::of::<ServiceA>())], |_| {
                    Ok(Self { opened_by: "hidden" })
                })
                .injection_constructor()
                .non_public(),
            )
            .constructor(Vec::new(), |_| Ok(Self { opened_by: "public" }))
            .build()
    }
}

/// 抽象类型
struct Template;

impl Reflect for Template {
    fn type_handle() -> TypeHandle {
        catalog::intern::<Self>(TypeHandle::abstract_class::<Self>)
    }
}

impl Injectable for Template {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::builder::<Self>().build()
    }
}

/// 不可注入的成员
#[derive(Default)]
struct Gauge;

impl Injectable for Gauge {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::builder::<Self>()
            .default_constructor()
            .property(PropertyInfo::new::<Self, _>("item", TypeHandle::of::<ServiceA>(), |_, _| Ok(())).indexer())
            .method(MethodInfo::new::<Self, _>("calibrate", Vec::new(), |_, _| Ok(())).non_public())
            .method(MethodInfo::new::<Self, _>("convert", Vec::new(), |_, _| Ok(())).generic_definition())
            .method(MethodInfo::new::<Self, _>(
                "swap",
                vec![ParameterInfo::new("other", TypeHandle::of::<ServiceA>()).with_kind(ParameterKind::Ref)],
                |_, _| Ok(()),
            ))
            .build()
    }
}

static FLAKY_FAILED: AtomicBool = AtomicBool::new(false);

/// 第一次构造失败
struct Flaky;

impl Injectable for Flaky {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::builder::<Self>()
            .constructor(Vec::new(), |_| {
                if FLAKY_FAILED.swap(true, Ordering::SeqCst) {
                    Ok(Self)
                } else {
                    Err(ConstructionError::invocation("new", "连接尚未就绪"))
                }
            })
            .build()
    }
}

impl Reflect for Looping {
    fn type_handle() -> TypeHandle {
        catalog::intern::<Self>(TypeHandle::class::<Self>)
    }
}

impl Reflect for Exchange {
    fn type_handle() -> TypeHandle {
        catalog::intern::<Self>(TypeHandle::class::<Self>)
    }
}

impl Reflect for Twin {
    fn type_handle() -> TypeHandle {
        catalog::intern::<Self>(TypeHandle::class::<Self>)
    }
}

impl Reflect for Vault {
    fn type_handle() -> TypeHandle {
        catalog::intern::<Self>(TypeHandle::class::<Self>)
    }
}

impl Reflect for Gauge {
    fn type_handle() -> TypeHandle {
        catalog::intern::<Self>(TypeHandle::class::<Self>)
    }
}

impl Reflect for Flaky {
    fn type_handle() -> TypeHandle {
        catalog::intern::<Self>(TypeHandle::class::<Self>)
    }
}

/// 每次展开都给出下一个提供者，计数到零时给出值
struct Countdown(usize);

impl ValueProvider for Countdown {
    fn provide(&self, _target: &ImportTarget) -> InjectionValue {
        match self.0 {
            0 => InjectionValue::value(7_i32),
            remaining => InjectionValue::provider(Countdown(remaining - 1)),
        }
    }
}

/// 展开后回到自身
struct Echo {
    next: Mutex<Option<Arc<dyn ValueProvider>>>,
}

impl ValueProvider for Echo {
    fn provide(&self, _target: &ImportTarget) -> InjectionValue {
        let next = self.next.lock().unwrap().clone().expect("已设置");
        InjectionValue::Provider(next)
    }
}

fn resolve_counter(
    container: &DiContainerImpl,
    provider: Arc<dyn ValueProvider>,
) -> Result<i32, DependencyError> {
    let overrides: Vec<Arc<dyn ResolverOverride>> = vec![Arc::new(ParameterOverride::named(
        "x",
        InjectionValue::Provider(provider),
    ))];
    let counter = container.resolve(&Contract::of::<Counter>(), &overrides)?;
    Ok(counter.downcast_ref::<Counter>().map(|counter| counter.x).unwrap_or_default())
}

#[test]
fn test_multidimensional_array_is_rejected() {
    init_logger();
    let container = DiContainerImpl::new();
    let contract = Contract::new(TypeHandle::array(ServiceA::type_handle(), 2), None);

    let error = container.resolve(&contract, &[]).unwrap_err();
    assert!(matches!(
        error.root_cause(),
        DependencyError::InvalidRegistration(RegistrationError::InvalidArrayRank { rank: 2, .. })
    ));
}

#[test]
fn test_self_referencing_constructor_is_rejected() {
    init_logger();
    let container = DiContainerImpl::new();

    let error = container.resolve(&Contract::of::<Looping>(), &[]).unwrap_err();
    assert!(matches!(
        error.root_cause(),
        DependencyError::InvalidOperation(ConstructionError::SelfReferencingConstructor { .. })
    ));
}

#[test]
fn test_constructor_with_out_parameter_is_rejected() {
    init_logger();
    let container = DiContainerImpl::new();

    let error = container.registration::<Exchange>().register().unwrap_err();
    assert!(matches!(error, RegistrationError::RefParameter { ref parameter, .. } if parameter == "rate"));

    let error = container.resolve(&Contract::of::<Exchange>(), &[]).unwrap_err();
    assert!(matches!(
        error.root_cause(),
        DependencyError::InvalidRegistration(RegistrationError::RefParameter { .. })
    ));
}

#[test]
fn test_multiple_injection_constructors_are_rejected() {
    init_logger();
    let container = DiContainerImpl::new();

    let error = container.registration::<Twin>().register().unwrap_err();
    assert!(matches!(error, RegistrationError::MultipleInjectionConstructors { .. }));
}

#[test]
fn test_non_public_injection_constructor_is_not_used() -> anyhow::Result<()> {
    init_logger();
    let container = DiContainerImpl::new();
    container.registration::<Vault>().register()?;

    assert_eq!(container.resolve_type::<Vault>()?.opened_by, "public");
    Ok(())
}

#[test]
fn test_abstract_and_delegate_types_cannot_be_built() {
    init_logger();
    let container = DiContainerImpl::new();

    let error = container.resolve(&Contract::of::<Template>(), &[]).unwrap_err();
    assert!(matches!(
        error.root_cause(),
        DependencyError::InvalidOperation(ConstructionError::CannotConstructAbstractClass { .. })
    ));

    let callback = Contract::new(TypeHandle::delegate::<dyn Fn() -> u32 + Send + Sync>(), None);
    let error = container.resolve(&callback, &[]).unwrap_err();
    assert!(matches!(
        error.root_cause(),
        DependencyError::InvalidOperation(ConstructionError::CannotConstructDelegate { .. })
    ));
}

#[test]
fn test_uninjectable_members_are_rejected_at_registration() {
    init_logger();
    let container = DiContainerImpl::new();
    let register = |member: InjectionMember| container.registration::<Gauge>().member(member).register();

    assert!(matches!(
        register(InjectionMember::property("item")),
        Err(RegistrationError::IndexerProperty { .. })
    ));
    assert!(matches!(
        register(InjectionMember::method("calibrate", Vec::new())),
        Err(RegistrationError::NonPublicMethod { .. })
    ));
    assert!(matches!(
        register(InjectionMember::method("convert", Vec::new())),
        Err(RegistrationError::OpenGenericMethod { .. })
    ));
    assert!(matches!(
        register(InjectionMember::method("swap", vec![InjectionValue::resolved()])),
        Err(RegistrationError::RefParameter { .. })
    ));
    assert!(!container.is_registered(&Contract::of::<Gauge>()));
}

#[test]
fn test_dynamic_values_are_unwrapped_up_to_the_limit() -> anyhow::Result<()> {
    init_logger();
    let container = DiContainerImpl::new();
    assert_eq!(resolve_counter(&container, Arc::new(Countdown(3)))?, 7);

    let error = resolve_counter(&container, Arc::new(Countdown(20))).unwrap_err();
    assert!(matches!(
        error.root_cause(),
        DependencyError::UnstableDynamicValue { iterations: 8, .. }
    ));

    let strict = DiContainerImpl::with_config(ContainerConfig {
        max_dynamic_unwrap: 2,
        ..ContainerConfig::default()
    })?;
    let error = resolve_counter(&strict, Arc::new(Countdown(3))).unwrap_err();
    assert!(matches!(
        error.root_cause(),
        DependencyError::UnstableDynamicValue { iterations: 2, .. }
    ));
    Ok(())
}

#[test]
fn test_dynamic_value_returning_itself_is_rejected() {
    init_logger();
    let container = DiContainerImpl::new();
    let echo = Arc::new(Echo {
        next: Mutex::new(None),
    });
    let provider: Arc<dyn ValueProvider> = echo.clone();
    *echo.next.lock().unwrap() = Some(provider.clone());

    let error = resolve_counter(&container, provider).unwrap_err();
    assert!(matches!(
        error.root_cause(),
        DependencyError::UnstableDynamicValue { iterations: 1, .. }
    ));
    echo.next.lock().unwrap().take();
}

#[test]
fn test_singleton_recovers_after_failed_build() -> anyhow::Result<()> {
    init_logger();
    let container = DiContainerImpl::new();
    container
        .registration::<Flaky>()
        .lifetime(ContainerControlledLifetimeManager::new())
        .register()?;

    let error = container.resolve(&Contract::of::<Flaky>(), &[]).unwrap_err();
    assert!(matches!(
        error.root_cause(),
        DependencyError::InvalidOperation(ConstructionError::InvocationFailed { .. })
    ));

    // 构建权已交还，其它线程可以完成构建
    let other = container.clone();
    let built = std::thread::spawn(move || other.resolve_type::<Flaky>())
        .join()
        .map_err(|_| anyhow::anyhow!("构建线程异常退出"))??;
    assert!(Arc::ptr_eq(&built, &container.resolve_type::<Flaky>()?));
    Ok(())
}
