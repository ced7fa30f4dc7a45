use infrastructure_common::{Injectable, Reflect, TypeHandle, TypeKind};
use injection_macros::Injectable;

#[derive(Injectable)]
struct Empty;

fn main() {
    let handle = Empty::type_handle();
    assert!(matches!(handle.kind(), TypeKind::Class));
    assert_eq!(Empty::describe().constructors().len(), 1);
    assert_eq!(handle, TypeHandle::of::<Empty>());
}
