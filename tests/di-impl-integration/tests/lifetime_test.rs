//! 生命周期、泛型合成、释放与配置
mod common;

use common::*;
use di_abstractions::{Contract, ContainerConfig, DependencyResolver, PipelineMode};
use di_impl::{
    ContainerConfigLoader, ContainerControlledLifetimeManager, DiContainerImpl, HierarchicalLifetimeManager,
    TransientLifetimeManager,
};
use infrastructure_common::{same_instance, DependencyError, LazyInstances, Reflect, TypeHandle};
use std::sync::atomic::Ordering;
use std::sync::Arc;

#[tokio::test]
async fn test_resolve_async_uses_cache_after_first_build() -> anyhow::Result<()> {
    init_logger();
    let container = DiContainerImpl::new();
    container
        .registration::<ServiceA>()
        .lifetime(ContainerControlledLifetimeManager::new())
        .register()?;

    let first = container.resolve_async(Contract::of::<ServiceA>(), Vec::new()).await?;
    let second = container.resolve_async(Contract::of::<ServiceA>(), Vec::new()).await?;
    assert!(same_instance(&first, &second));

    let transient = container.resolve_async(Contract::of::<ServiceB>(), Vec::new()).await?;
    assert!(transient.downcast::<ServiceB>().is_ok());
    Ok(())
}

#[test]
fn test_singleton_is_built_once_under_contention() -> anyhow::Result<()> {
    init_logger();
    let container = DiContainerImpl::new();
    container
        .registration::<Expensive>()
        .lifetime(ContainerControlledLifetimeManager::new())
        .register()?;

    let before = EXPENSIVE_BUILDS.load(Ordering::SeqCst);
    let resolved: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| container.resolve_type::<Expensive>()))
            .collect();
        handles.into_iter().map(|handle| handle.join()).collect()
    });

    let resolved = resolved
        .into_iter()
        .map(|result| {
            result
                .map_err(|_| anyhow::anyhow!("线程崩溃"))
                .and_then(|resolved| resolved.map_err(anyhow::Error::from))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    assert_eq!(EXPENSIVE_BUILDS.load(Ordering::SeqCst) - before, 1);
    assert!(resolved.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
    Ok(())
}

#[test]
fn test_instances_are_disposed_in_reverse_order() -> anyhow::Result<()> {
    init_logger();
    let container = DiContainerImpl::new();
    for name in ["reverse-1", "reverse-2", "reverse-3"] {
        container
            .registration::<Journal>()
            .named(name)
            .instance(Arc::new(Journal::new(name)))
            .register()?;
    }

    assert!(container.dispose() >= 3);
    assert_eq!(disposed_with("reverse-"), vec!["reverse-3", "reverse-2", "reverse-1"]);

    // 再次释放不会重复执行
    assert_eq!(container.dispose(), 0);
    assert_eq!(disposed_with("reverse-").len(), 3);

    let error = container.resolve(&Contract::of::<ServiceA>(), &[]).unwrap_err();
    assert!(matches!(error.root_cause(), DependencyError::Disposed { .. }));
    Ok(())
}

#[test]
fn test_child_dispose_leaves_parent_untouched() -> anyhow::Result<()> {
    init_logger();
    let parent = DiContainerImpl::new();
    parent.register_instance::<Journal>(Arc::new(Journal::new("scoped-parent")))?;
    let child = parent.create_child_container();
    child
        .registration::<Journal>()
        .named("child")
        .instance(Arc::new(Journal::new("scoped-child")))
        .register()?;

    child.dispose();
    assert_eq!(disposed_with("scoped-"), vec!["scoped-child"]);
    assert!(!parent.is_disposed());
    assert_eq!(parent.resolve_type::<Journal>()?.name, "scoped-parent");

    parent.dispose();
    assert_eq!(disposed_with("scoped-"), vec!["scoped-child", "scoped-parent"]);
    Ok(())
}

#[test]
fn test_hierarchical_values_are_released_with_child_containers() -> anyhow::Result<()> {
    init_logger();
    let parent = DiContainerImpl::new();
    parent
        .registration::<ServiceA>()
        .lifetime(HierarchicalLifetimeManager::new())
        .register()?;
    let kept = parent.resolve_type::<ServiceA>()?;

    let mut released = Vec::new();
    for round in 0..50 {
        let child = parent.create_child_container();
        let value = child.resolve_type::<ServiceA>()?;
        assert!(Arc::ptr_eq(&value, &child.resolve_type::<ServiceA>()?));
        released.push(Arc::downgrade(&value));
        drop(value);
        // 释放或直接丢弃子容器都会移除它的值
        if round % 2 == 0 {
            child.dispose();
        }
        drop(child);
    }

    assert!(released.iter().all(|weak| weak.upgrade().is_none()));
    assert!(Arc::ptr_eq(&kept, &parent.resolve_type::<ServiceA>()?));
    Ok(())
}

#[test]
fn test_child_registration_does_not_leak_to_parent() -> anyhow::Result<()> {
    init_logger();
    let parent = DiContainerImpl::new();
    parent.registration::<dyn Service>().to::<ServiceA>().register()?;
    let child = parent.create_child_container();
    child.registration::<dyn Service>().to::<ServiceB>().register()?;

    assert_eq!(parent.resolve_service::<dyn Service>()?.name(), "a");
    assert_eq!(child.resolve_service::<dyn Service>()?.name(), "b");
    assert_eq!(child.resolve_all::<dyn Service>()?.len(), 1);
    Ok(())
}

#[test]
fn test_open_generic_closes_per_type_argument() -> anyhow::Result<()> {
    init_logger();
    // 封闭类型需要先登记到目录中
    SqlRepository::<User>::type_handle();
    SqlRepository::<Order>::type_handle();

    let container = DiContainerImpl::new();
    container.register_open_generic(
        REPOSITORY,
        SQL_REPOSITORY,
        None,
        Arc::new(ContainerControlledLifetimeManager::new()),
        Vec::new(),
    )?;

    let users = container.resolve_service::<dyn Repository<User>>()?;
    let again = container.resolve_service::<dyn Repository<User>>()?;
    let orders = container.resolve_service::<dyn Repository<Order>>()?;

    assert!(users.entity().ends_with("User"));
    assert!(orders.entity().ends_with("Order"));
    assert!(Arc::ptr_eq(&users, &again));
    Ok(())
}

#[test]
fn test_array_skips_elements_that_cannot_be_closed() -> anyhow::Result<()> {
    init_logger();
    SqlRepository::<User>::type_handle();

    let container = DiContainerImpl::new();
    container
        .registration::<dyn Repository<User>>()
        .to::<SqlRepository<User>>()
        .register()?;
    container.register_open_generic(
        REPOSITORY,
        ARCHIVE_REPOSITORY,
        Some("archive".to_string()),
        Arc::new(TransientLifetimeManager),
        Vec::new(),
    )?;

    let repositories = container.resolve_all::<dyn Repository<User>>()?;
    assert_eq!(repositories.len(), 1);

    // 单独解析时照常报告
    let error = container
        .resolve(&Contract::named::<dyn Repository<User>>("archive"), &[])
        .unwrap_err();
    assert!(error.root_cause().is_type_load_argument());
    Ok(())
}

#[test]
fn test_enumerable_reflects_later_registrations() -> anyhow::Result<()> {
    init_logger();
    let container = DiContainerImpl::new();
    container.registration::<dyn Service>().to::<ServiceA>().register()?;

    let contract = Contract::new(TypeHandle::enumerable(<dyn Service>::type_handle()), None);
    let services = container
        .resolve(&contract, &[])?
        .downcast::<LazyInstances>()
        .map_err(|_| anyhow::anyhow!("类型不符"))?;
    assert_eq!(services.collect_all()?.len(), 1);

    container.registration::<dyn Service>().named("b").to::<ServiceB>().register()?;
    assert_eq!(services.collect_all()?.len(), 2);
    Ok(())
}

#[test]
fn test_depth_limit_from_configuration() -> anyhow::Result<()> {
    init_logger();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("container.toml");
    std::fs::write(&path, "[container]\nmax_resolution_depth = 1\n")?;

    let config = ContainerConfigLoader::new()
        .with_file(&path)
        .with_env_prefix("DI_DEPTH_TEST")
        .load()?;
    let container = DiContainerImpl::with_config(config)?;

    let error = container.resolve(&Contract::of::<Outer>(), &[]).unwrap_err();
    assert!(matches!(
        error.root_cause(),
        DependencyError::DepthExceeded { max_depth: 1, .. }
    ));
    assert!(container.resolve_type::<Inner>().is_ok());
    Ok(())
}

#[test]
fn test_interpreted_pipeline_matches_compiled() -> anyhow::Result<()> {
    init_logger();
    let container = DiContainerImpl::with_config(ContainerConfig {
        pipeline_mode: PipelineMode::Interpreted,
        ..ContainerConfig::default()
    })?;
    container.registration::<dyn Service>().to::<ServiceA>().register()?;

    assert_eq!(container.resolve_type::<Widget>()?.arity, 2);
    assert_eq!(container.resolve_type::<Dashboard>()?.started_with, Some("a"));
    assert!(matches!(
        container.resolve(&Contract::of::<Chicken>(), &[]).unwrap_err().root_cause(),
        DependencyError::CircularDependency { .. }
    ));
    Ok(())
}

#[test]
fn test_cached_value_resolves_without_spawning() -> anyhow::Result<()> {
    init_logger();
    let container = DiContainerImpl::new();
    let shared: infrastructure_common::Instance = Arc::new(ServiceA);
    container.register_instance::<ServiceA>(shared.clone())?;

    let resolved = tokio_test::block_on(container.resolve_async(Contract::of::<ServiceA>(), Vec::new()))?;
    assert!(same_instance(&shared, &resolved));
    Ok(())
}
