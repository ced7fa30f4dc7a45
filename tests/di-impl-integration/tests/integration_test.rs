//! 解析管线的端到端行为
mod common;

use common::*;
use di_abstractions::{ContainerConfig, Contract, DependencyResolver, InjectionMember, InjectionValue, ResolverOverride};
use di_impl::{
    BuildStage, BuildSteps, BuilderStrategy, ContainerControlledLifetimeManager, DependencyOverride,
    DiContainerImpl, HierarchicalLifetimeManager, ParameterOverride, PerResolveLifetimeManager, PipelineContext,
    Target, TransientLifetimeManager,
};
use infrastructure_common::{DependencyError, RegistrationError};
use std::sync::{Arc, Mutex};

#[test]
fn test_constructor_with_most_parameters_is_selected() -> anyhow::Result<()> {
    init_logger();
    let container = DiContainerImpl::new();

    let widget = container.resolve_type::<Widget>()?;
    assert_eq!(widget.arity, 2);

    // 未注册时在解析时报告
    let error = container.resolve(&Contract::of::<Tied>(), &[]).unwrap_err();
    assert!(matches!(error, DependencyError::ResolutionFailed { .. }));
    assert!(matches!(
        error.root_cause(),
        DependencyError::InvalidRegistration(RegistrationError::AmbiguousInjectionConstructor { .. })
    ));

    // 注册时立即校验
    let error = container.registration::<Tied>().register().unwrap_err();
    assert!(matches!(error, RegistrationError::AmbiguousInjectionConstructor { .. }));
    Ok(())
}

#[test]
fn test_most_recent_override_wins() -> anyhow::Result<()> {
    init_logger();
    let container = DiContainerImpl::new();
    let overrides: Vec<Arc<dyn ResolverOverride>> = vec![
        Arc::new(ParameterOverride::named("x", InjectionValue::value(1_i32))),
        Arc::new(ParameterOverride::named("x", InjectionValue::value(2_i32))),
    ];

    let counter = container
        .resolve(&Contract::of::<Counter>(), &overrides)?
        .downcast::<Counter>()
        .map_err(|_| anyhow::anyhow!("类型不符"))?;
    assert_eq!(counter.x, 2);
    Ok(())
}

#[test]
fn test_container_controlled_is_shared_and_transient_is_not() -> anyhow::Result<()> {
    init_logger();
    let container = DiContainerImpl::new();
    container
        .registration::<ServiceA>()
        .lifetime(ContainerControlledLifetimeManager::new())
        .register()?;
    container
        .registration::<ServiceB>()
        .lifetime(TransientLifetimeManager)
        .register()?;

    let first = container.resolve_type::<ServiceA>()?;
    let second = container.resolve_type::<ServiceA>()?;
    assert!(Arc::ptr_eq(&first, &second));

    let first = container.resolve_type::<ServiceB>()?;
    let second = container.resolve_type::<ServiceB>()?;
    assert!(!Arc::ptr_eq(&first, &second));
    Ok(())
}

#[test]
fn test_hierarchical_lifetime_isolates_child_containers() -> anyhow::Result<()> {
    init_logger();
    let parent = DiContainerImpl::new();
    parent
        .registration::<ServiceA>()
        .lifetime(HierarchicalLifetimeManager::new())
        .register()?;
    let child = parent.create_child_container();

    let from_parent = parent.resolve_type::<ServiceA>()?;
    let from_child = child.resolve_type::<ServiceA>()?;
    let again_from_child = child.resolve_type::<ServiceA>()?;

    assert!(!Arc::ptr_eq(&from_parent, &from_child));
    assert!(Arc::ptr_eq(&from_child, &again_from_child));
    Ok(())
}

#[test]
fn test_array_contains_default_and_named_registrations() -> anyhow::Result<()> {
    init_logger();
    let empty = DiContainerImpl::new();
    assert!(empty.resolve_all::<dyn Service>()?.is_empty());

    let container = DiContainerImpl::new();
    container.registration::<dyn Service>().to::<ServiceA>().register()?;
    container.registration::<dyn Service>().named("b").to::<ServiceB>().register()?;

    let services = container.resolve_all::<dyn Service>()?;
    let mut names: Vec<_> = services.iter().map(|service| service.name()).collect();
    names.sort_unstable();
    assert_eq!(names, vec!["a", "b"]);
    Ok(())
}

#[test]
fn test_optional_dependency_falls_back_to_default() -> anyhow::Result<()> {
    init_logger();
    let container = DiContainerImpl::new();

    let reporter = container.resolve_type::<Reporter>()?;
    assert!(reporter.sink.is_none());
    assert_eq!(reporter.retries, 0);

    let error = container.resolve(&Contract::of::<StrictReporter>(), &[]).unwrap_err();
    assert!(matches!(error, DependencyError::ResolutionFailed { .. }));
    assert!(matches!(error.root_cause(), DependencyError::InvalidOperation(_)));
    assert!(error.trail().len() >= 2);
    Ok(())
}

#[derive(Debug)]
struct StageRecorder {
    name: &'static str,
    faults: bool,
    log: Arc<Mutex<Vec<String>>>,
}

impl BuilderStrategy for StageRecorder {
    fn name(&self) -> &'static str {
        self.name
    }

    fn steps(&self) -> BuildSteps {
        BuildSteps::BOTH
    }

    fn pre_build_up(&self, context: &mut PipelineContext<'_>) {
        self.log.lock().unwrap().push(format!("{}.pre", self.name));
        if self.faults {
            context.fault(DependencyError::NoValueProduced {
                type_name: self.name.to_string(),
            });
        } else if context.target().is_empty() {
            context.set_target(Target::Owned(Box::new(Inner)));
        }
    }

    fn post_build_up(&self, _context: &mut PipelineContext<'_>) {
        self.log.lock().unwrap().push(format!("{}.post", self.name));
    }
}

#[test]
fn test_fault_stops_later_steps() {
    init_logger();
    let container = DiContainerImpl::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let recorder = |name, faults| {
        Arc::new(StageRecorder {
            name,
            faults,
            log: log.clone(),
        })
    };

    let chain = container.strategies().type_chain();
    chain.replace(BuildStage::Setup, recorder("setup", false));
    chain.replace(BuildStage::Creation, recorder("creation", true));
    chain.replace(BuildStage::Fields, recorder("fields", false));

    let error = container.resolve(&Contract::of::<Inner>(), &[]).unwrap_err();
    assert!(matches!(error.root_cause(), DependencyError::NoValueProduced { .. }));
    assert_eq!(*log.lock().unwrap(), vec!["setup.pre", "creation.pre"]);
}

#[test]
fn test_members_are_injected_after_construction() -> anyhow::Result<()> {
    init_logger();
    let container = DiContainerImpl::new();
    container.registration::<dyn Service>().to::<ServiceB>().register()?;
    container
        .registration::<Dashboard>()
        .member(InjectionMember::field_value("title", InjectionValue::value("运维".to_string())))
        .register()?;

    let dashboard = container.resolve_type::<Dashboard>()?;
    assert_eq!(dashboard.service.as_ref().map(|service| service.name()), Some("b"));
    assert_eq!(dashboard.title, "运维");
    assert_eq!(dashboard.started_with, Some("b"));
    Ok(())
}

#[test]
fn test_build_up_injects_existing_value() -> anyhow::Result<()> {
    init_logger();
    let container = DiContainerImpl::new();
    container.registration::<dyn Service>().to::<ServiceA>().register()?;

    let existing = Dashboard {
        title: "已有".to_string(),
        ..Dashboard::default()
    };
    let built = container.build_up_value(existing)?;
    assert_eq!(built.title, "已有");
    assert_eq!(built.started_with, Some("a"));
    assert!(built.service.is_some());
    Ok(())
}

#[test]
fn test_circular_dependency_is_reported() {
    init_logger();
    let container = DiContainerImpl::new();
    let error = container.resolve(&Contract::of::<Chicken>(), &[]).unwrap_err();
    match error.root_cause() {
        DependencyError::CircularDependency { dependency_chain } => {
            assert!(dependency_chain.contains("Chicken"));
            assert!(dependency_chain.contains("Egg"));
        }
        other => panic!("期望循环依赖错误，实际: {other}"),
    }
}

#[test]
fn test_dependency_override_reaches_nested_dependencies() -> anyhow::Result<()> {
    init_logger();
    let container = DiContainerImpl::new();
    let overrides: Vec<Arc<dyn ResolverOverride>> = vec![Arc::new(DependencyOverride::of::<i32>(
        InjectionValue::value(41_i32),
    ))];

    let reporter = container
        .resolve(&Contract::of::<Reporter>(), &overrides)?
        .downcast::<Reporter>()
        .map_err(|_| anyhow::anyhow!("类型不符"))?;
    assert_eq!(reporter.retries, 41);
    Ok(())
}

#[test]
fn test_per_resolve_value_is_shared_within_one_resolve() -> anyhow::Result<()> {
    init_logger();
    let container = DiContainerImpl::new();
    container
        .registration::<Shared>()
        .lifetime(PerResolveLifetimeManager)
        .register()?;

    let first = container.resolve_type::<Pair>()?;
    assert!(Arc::ptr_eq(&first.left, &first.right));

    let second = container.resolve_type::<Pair>()?;
    assert!(!Arc::ptr_eq(&first.left, &second.left));
    Ok(())
}

#[test]
fn test_factory_registration() -> anyhow::Result<()> {
    init_logger();
    let container = DiContainerImpl::new();
    container.register_factory::<dyn Service, _>(|resolver, _| {
        let resolved = resolver.resolve(&Contract::of::<ServiceB>(), &[])?;
        Ok(Some(resolved))
    })?;
    container.register_factory::<dyn Sink, _>(|_, _| Ok(None))?;

    assert_eq!(container.resolve_service::<dyn Service>()?.name(), "b");

    let error = container.resolve(&Contract::of::<dyn Sink>(), &[]).unwrap_err();
    assert!(matches!(error.root_cause(), DependencyError::NoValueProduced { .. }));
    Ok(())
}

/// 展开包装层与工厂错误，得到最内层的原因
fn innermost(error: &DependencyError) -> &DependencyError {
    match error.root_cause() {
        DependencyError::ComponentCreationFailed { source, .. } => match source.downcast_ref::<DependencyError>() {
            Some(inner) => innermost(inner),
            None => error.root_cause(),
        },
        cause => cause,
    }
}

#[test]
fn test_self_resolving_factory_is_reported_as_cycle() -> anyhow::Result<()> {
    init_logger();
    let container = DiContainerImpl::new();
    container.register_factory::<dyn Sink, _>(|resolver, contract| resolver.resolve(contract, &[]).map(Some))?;
    container
        .registration::<ServiceA>()
        .factory(|resolver, contract| resolver.resolve(contract, &[]).map(Some))
        .lifetime(ContainerControlledLifetimeManager::new())
        .register()?;

    let error = container.resolve(&Contract::of::<dyn Sink>(), &[]).unwrap_err();
    match innermost(&error) {
        DependencyError::CircularDependency { dependency_chain } => {
            assert!(dependency_chain.contains("Sink -> "));
        }
        other => panic!("意外的错误: {other}"),
    }

    let error = container.resolve(&Contract::of::<ServiceA>(), &[]).unwrap_err();
    assert!(matches!(innermost(&error), DependencyError::CircularDependency { .. }));
    // 失败后构建权已交还
    let error = container.resolve(&Contract::of::<ServiceA>(), &[]).unwrap_err();
    assert!(matches!(innermost(&error), DependencyError::CircularDependency { .. }));
    Ok(())
}

#[test]
fn test_self_resolving_factory_hits_depth_limit_without_cycle_detection() -> anyhow::Result<()> {
    init_logger();
    let container = DiContainerImpl::with_config(ContainerConfig {
        enable_circular_dependency_detection: false,
        max_resolution_depth: 6,
        ..ContainerConfig::default()
    })?;
    container.register_factory::<dyn Sink, _>(|resolver, contract| resolver.resolve(contract, &[]).map(Some))?;

    let error = container.resolve(&Contract::of::<dyn Sink>(), &[]).unwrap_err();
    assert!(matches!(
        innermost(&error),
        DependencyError::DepthExceeded { max_depth: 6, .. }
    ));
    Ok(())
}

#[test]
fn test_resolver_is_registered_as_internal() -> anyhow::Result<()> {
    init_logger();
    let container = DiContainerImpl::new();
    let resolver = container.resolve_service::<dyn DependencyResolver>()?;
    assert!(resolver.is_registered(&Contract::of::<dyn DependencyResolver>()));
    assert!(!resolver.is_registered(&Contract::of::<ServiceA>()));
    Ok(())
}
