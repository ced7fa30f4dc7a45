use infrastructure_common::{reflect_interface, Injectable};
use injection_macros::Injectable;
use std::sync::Arc;

trait Store: Send + Sync {}

reflect_interface!(dyn Store);

#[derive(Injectable)]
#[injectable(implements(dyn Store))]
struct MemoryStore;

impl Store for MemoryStore {}

#[derive(Injectable)]
struct Service {
    #[dependency(name = "primary")]
    store: Arc<dyn Store>,
    #[dependency(optional)]
    backup: Option<Arc<dyn Store>>,
    stores: Vec<Arc<dyn Store>>,
    #[injectable(default = 8)]
    capacity: usize,
    label: Option<String>,
    #[dependency(field)]
    audit: Option<Arc<dyn Store>>,
    #[injectable(skip)]
    hits: u64,
}

fn main() {
    let descriptor = Service::describe();
    let constructor = &descriptor.constructors()[0];
    assert_eq!(constructor.parameters.len(), 5);
    assert_eq!(descriptor.fields().len(), 1);
    assert_eq!(MemoryStore::describe().interfaces().len(), 1);
    let _ = |service: Service| (service.store, service.backup, service.stores, service.capacity, service.label, service.audit, service.hits);
}
