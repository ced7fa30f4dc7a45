//! 派生描述在容器中的行为

use di_abstractions::{Contract, DependencyResolver};
use di_impl::{ContainerControlledLifetimeManager, DiContainerImpl, ParameterOverride};
use infrastructure_common::{reflect_interface, Disposable, TypeHandle};
use injection_macros::Injectable;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Once};

static INIT_LOGGER: Once = Once::new();

fn init_logger() {
    INIT_LOGGER.call_once(|| {
        tracing_subscriber::fmt().with_env_filter("debug").try_init().ok();
    });
}

pub trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

reflect_interface!(dyn Clock);

pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str) -> String;
}

reflect_interface!(dyn Notifier);

#[derive(Injectable)]
#[injectable(implements(dyn Clock))]
pub struct FixedClock;

impl Clock for FixedClock {
    fn now(&self) -> u64 {
        42
    }
}

#[derive(Injectable)]
#[injectable(implements(dyn Clock))]
pub struct LateClock;

impl Clock for LateClock {
    fn now(&self) -> u64 {
        99
    }
}

#[derive(Injectable)]
pub struct Settings {
    prefix: Option<String>,
}

#[derive(Injectable)]
#[injectable(implements(dyn Notifier))]
pub struct Mailer {
    #[dependency]
    clock: Arc<dyn Clock>,
    settings: Arc<Settings>,
    #[dependency(name = "late", optional)]
    late: Option<Arc<dyn Clock>>,
    #[injectable(default = 3)]
    retries: u32,
    #[dependency(field)]
    audit: Option<Arc<dyn Clock>>,
    #[injectable(skip)]
    sent: AtomicUsize,
}

impl Notifier for Mailer {
    fn notify(&self, message: &str) -> String {
        self.sent.fetch_add(1, Ordering::SeqCst);
        let prefix = self.settings.prefix.as_deref().unwrap_or("-");
        format!("{prefix} {message} @{}", self.clock.now())
    }
}

#[derive(Injectable)]
pub struct Broadcaster {
    clocks: Vec<Arc<dyn Clock>>,
}

static CLOSED: AtomicUsize = AtomicUsize::new(0);

#[derive(Injectable)]
#[injectable(disposable)]
pub struct Connection;

impl Disposable for Connection {
    fn dispose(&self) {
        CLOSED.fetch_add(1, Ordering::SeqCst);
    }
}

fn container() -> anyhow::Result<DiContainerImpl> {
    let container = DiContainerImpl::new();
    container.registration::<dyn Clock>().to::<FixedClock>().register()?;
    container
        .registration::<dyn Notifier>()
        .to::<Mailer>()
        .lifetime(ContainerControlledLifetimeManager::new())
        .register()?;
    Ok(container)
}

#[test]
fn test_derived_constructor_resolves_dependencies() -> anyhow::Result<()> {
    init_logger();
    let container = container()?;

    let mailer = container.resolve_type::<Mailer>()?;
    assert_eq!(mailer.clock.now(), 42);
    assert!(mailer.settings.prefix.is_none());
    assert!(mailer.late.is_none());
    assert_eq!(mailer.retries, 3);
    assert_eq!(mailer.audit.as_ref().map(|clock| clock.now()), Some(42));
    assert_eq!(mailer.sent.load(Ordering::SeqCst), 0);
    Ok(())
}

#[test]
fn test_named_optional_dependency_is_used_when_registered() -> anyhow::Result<()> {
    init_logger();
    let container = container()?;
    container.registration::<dyn Clock>().named("late").to::<LateClock>().register()?;

    let mailer = container.resolve_type::<Mailer>()?;
    assert_eq!(mailer.late.as_ref().map(|clock| clock.now()), Some(99));
    Ok(())
}

#[test]
fn test_interface_registration_uses_derived_cast() -> anyhow::Result<()> {
    init_logger();
    let container = container()?;

    let notifier = container.resolve_service::<dyn Notifier>()?;
    assert_eq!(notifier.notify("hello"), "- hello @42");
    let again = container.resolve_service::<dyn Notifier>()?;
    assert!(Arc::ptr_eq(&notifier, &again));
    Ok(())
}

#[test]
fn test_parameter_names_follow_field_names() -> anyhow::Result<()> {
    init_logger();
    let container = container()?;
    let overrides: Vec<Arc<dyn di_abstractions::ResolverOverride>> = vec![Arc::new(ParameterOverride::named(
        "retries",
        di_abstractions::InjectionValue::value(5_u32),
    ))];

    let mailer = container
        .resolve(&Contract::of::<Mailer>(), &overrides)?
        .downcast::<Mailer>()
        .map_err(|_| anyhow::anyhow!("类型不符"))?;
    assert_eq!(mailer.retries, 5);
    Ok(())
}

#[test]
fn test_vector_field_receives_every_registration() -> anyhow::Result<()> {
    init_logger();
    let container = container()?;
    container.registration::<dyn Clock>().named("late").to::<LateClock>().register()?;

    let broadcaster = container.resolve_type::<Broadcaster>()?;
    let mut readings: Vec<_> = broadcaster.clocks.iter().map(|clock| clock.now()).collect();
    readings.sort_unstable();
    assert_eq!(readings, vec![42, 99]);
    Ok(())
}

#[test]
fn test_disposable_flag_registers_disposer() -> anyhow::Result<()> {
    init_logger();
    let container = DiContainerImpl::new();
    container
        .registration::<Connection>()
        .lifetime(ContainerControlledLifetimeManager::new())
        .register()?;
    container.resolve_type::<Connection>()?;

    let before = CLOSED.load(Ordering::SeqCst);
    container.dispose();
    assert_eq!(CLOSED.load(Ordering::SeqCst) - before, 1);
    assert!(TypeHandle::of::<Connection>().descriptor().is_some_and(|descriptor| descriptor.disposer().is_some()));
    Ok(())
}

#[tokio::test]
async fn test_derived_type_resolves_asynchronously() -> anyhow::Result<()> {
    init_logger();
    let container = container()?;
    let instance = container.resolve_async(Contract::of::<dyn Notifier>(), Vec::new()).await?;
    assert!(instance.downcast::<Mailer>().is_ok());
    Ok(())
}
