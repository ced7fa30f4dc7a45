//! 进程级类型目录
//!
//! 类型句柄、类型描述、接口转换函数与封闭泛型实例在首次使用时登记，
//! 进程内永不失效（类型在进程生命周期内不可变）。

use crate::descriptor::{CastFn, TypeDescriptor};
use crate::errors::{DependencyError, DependencyResult};
use crate::instance::{instance_type_id, Instance};
use crate::metadata::{GenericDefinition, TypeHandle, TypeIdentity, TypeKind};
use dashmap::DashMap;
use once_cell::sync::Lazy;
use std::any::{Any, TypeId};
use std::sync::Arc;
use tracing::trace;

type InstantiationKey = (GenericDefinition, Vec<TypeIdentity>);

/// 全局类型句柄缓存
static HANDLES: Lazy<DashMap<TypeId, TypeHandle>> = Lazy::new(DashMap::new);

/// 全局类型描述缓存
static DESCRIPTORS: Lazy<DashMap<TypeIdentity, Arc<TypeDescriptor>>> = Lazy::new(DashMap::new);

/// 全局接口转换表: (具体类型, 接口类型) -> 转换函数
static CASTS: Lazy<DashMap<(TypeId, TypeId), CastFn>> = Lazy::new(DashMap::new);

/// 全局封闭泛型实例表
static INSTANTIATIONS: Lazy<DashMap<InstantiationKey, TypeHandle>> = Lazy::new(DashMap::new);

/// 登记并返回类型 `T` 的句柄
///
/// 句柄只创建一次；封闭泛型句柄同时登记到泛型实例表。
pub fn intern<T: ?Sized + 'static>(create: impl FnOnce() -> TypeHandle) -> TypeHandle {
    let id = TypeId::of::<T>();
    if let Some(handle) = HANDLES.get(&id) {
        return handle.clone();
    }

    // 在锁外创建，create 可能递归登记泛型实参
    let handle = create();
    if let Some(generic) = handle.generic() {
        let key = (
            generic.definition,
            generic
                .arguments
                .iter()
                .map(|argument| argument.identity().clone())
                .collect(),
        );
        trace!("登记封闭泛型: {} -> {}", generic.definition, handle);
        INSTANTIATIONS.insert(key, handle.clone());
    }

    HANDLES.entry(id).or_insert(handle).clone()
}

/// 按 `TypeId` 查找已登记的句柄
pub fn handle_by_id(id: TypeId) -> Option<TypeHandle> {
    HANDLES.get(&id).map(|handle| handle.clone())
}

/// 获取类型描述，首次访问时构建
pub fn descriptor(handle: &TypeHandle) -> Option<Arc<TypeDescriptor>> {
    if let Some(descriptor) = DESCRIPTORS.get(handle.identity()) {
        return Some(descriptor.clone());
    }

    let describe = handle.describer()?;
    let descriptor = Arc::new(describe());
    trace!("构建类型描述: {}", handle);

    if let Some(concrete) = handle.type_id() {
        for implemented in descriptor.interfaces() {
            if let Some(interface) = implemented.interface.type_id() {
                CASTS.insert((concrete, interface), implemented.cast.clone());
            }
        }
    }

    Some(
        DESCRIPTORS
            .entry(handle.identity().clone())
            .or_insert(descriptor)
            .clone(),
    )
}

/// 获取实例具体类型的描述
pub fn descriptor_of_instance(instance: &Instance) -> Option<Arc<TypeDescriptor>> {
    let id = instance_type_id(instance);
    if let Some(descriptor) = DESCRIPTORS.get(&TypeIdentity::Native(id)) {
        return Some(descriptor.clone());
    }
    handle_by_id(id).and_then(|handle| descriptor(&handle))
}

/// 把实例转换为接口 `I` 的共享指针
///
/// 转换函数由实例具体类型的描述登记（见 [`TypeDescriptor::interfaces`]）。
pub fn cast<I: ?Sized + Send + Sync + 'static>(instance: &Instance) -> Option<Arc<I>> {
    let key = (instance_type_id(instance), TypeId::of::<I>());
    if !CASTS.contains_key(&key) {
        // 描述会顺带登记该类型的全部转换函数
        descriptor_of_instance(instance);
    }
    let cast = CASTS.get(&key).map(|cast| cast.clone())?;
    let converted: Box<dyn Any + Send + Sync> = cast(instance.clone())?;
    converted.downcast::<Arc<I>>().ok().map(|boxed| *boxed)
}

/// 用泛型实参封闭开放定义
///
/// 封闭类型未登记时（Rust 无法在运行时实例化泛型）返回包装了类型加载失败的参数错误。
pub fn make_generic_type(
    definition: GenericDefinition,
    arguments: &[TypeHandle],
) -> DependencyResult<TypeHandle> {
    let display = format!(
        "{}<{}>",
        definition.name(),
        arguments
            .iter()
            .map(TypeHandle::name)
            .collect::<Vec<_>>()
            .join(", ")
    );

    if arguments.len() != definition.arity() {
        return Err(DependencyError::InvalidArgument {
            message: format!(
                "泛型 {definition} 需要 {} 个实参，实际 {}",
                definition.arity(),
                arguments.len()
            ),
            source: None,
        });
    }

    let key = (
        definition,
        arguments
            .iter()
            .map(|argument| argument.identity().clone())
            .collect(),
    );
    INSTANTIATIONS
        .get(&key)
        .map(|handle| handle.clone())
        .ok_or_else(|| DependencyError::type_load_argument(display, "封闭类型未在进程内登记"))
}

/// `source` 类型的值能否赋给 `target`
pub fn is_assignable(target: &TypeHandle, source: &TypeHandle) -> bool {
    if target == source {
        return true;
    }

    match (target.kind(), source.kind()) {
        (
            TypeKind::Array {
                element: target_element,
                rank: target_rank,
            },
            TypeKind::Array {
                element: source_element,
                rank: source_rank,
            },
        ) => target_rank == source_rank && is_assignable(target_element, source_element),
        (
            TypeKind::Enumerable {
                element: target_element,
            },
            TypeKind::Array {
                element: source_element,
                rank: 1,
            }
            | TypeKind::Enumerable {
                element: source_element,
            },
        ) => is_assignable(target_element, source_element),
        (TypeKind::Interface | TypeKind::Abstract, _) => descriptor(source).is_some_and(|described| {
            described
                .interfaces()
                .iter()
                .any(|implemented| &implemented.interface == target)
        }),
        _ => false,
    }
}

/// 实例能否作为 `target` 类型的值使用
pub fn instance_is(instance: &Instance, target: &TypeHandle) -> bool {
    let id = instance_type_id(instance);
    if target.type_id() == Some(id) {
        return true;
    }
    handle_by_id(id).is_some_and(|source| is_assignable(target, &source))
}
