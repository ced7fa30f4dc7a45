//! 未注册契约的注册合成
//!
//! - 封闭泛型: 沿祖先链找到同名开放泛型注册后封闭实现类型，缓存在持有开放注册的容器中
//! - 一维数组与序列: 合成为集合注册
//! - 其它类型: 合成为瞬时类型注册，由构建计划决定能否构造

use crate::container::DiContainerImpl;
use crate::lifetime::TransientLifetimeManager;
use crate::registration::RegistrationManager;
use dashmap::mapref::entry::Entry;
use di_abstractions::{Contract, InjectionMember, LifetimeManager, RegistrationData};
use infrastructure_common::{
    catalog, DependencyResult, GenericDefinition, GenericInstance, RegistrationError, TypeKind,
};
use std::sync::Arc;
use tracing::debug;

/// 开放泛型注册
pub(crate) struct OpenGeneric {
    pub(crate) definition: GenericDefinition,
    pub(crate) implementation: GenericDefinition,
    pub(crate) name: Option<String>,
    pub(crate) lifetime: Arc<dyn LifetimeManager>,
    pub(crate) members: Vec<InjectionMember>,
}

/// 合成的注册及其来源
pub(crate) struct Synthesized {
    source: Option<Arc<OpenGeneric>>,
    manager: Arc<RegistrationManager>,
}

fn same_source(cached: Option<&Arc<OpenGeneric>>, current: Option<&Arc<OpenGeneric>>) -> bool {
    match (cached, current) {
        (Some(cached), Some(current)) => Arc::ptr_eq(cached, current),
        (None, None) => true,
        _ => false,
    }
}

/// 取得缓存的合成注册；来源开放注册被替换后重新合成
///
/// 合成在缓存分片锁内完成，同一契约并发解析时只得到一个管理器。
fn cached(
    container: &DiContainerImpl,
    contract: &Contract,
    source: Option<&Arc<OpenGeneric>>,
    create: impl FnOnce() -> DependencyResult<RegistrationManager>,
) -> DependencyResult<Arc<RegistrationManager>> {
    let synthesized = &container.state().synthesized;
    match synthesized.entry(contract.clone()) {
        Entry::Occupied(entry) if same_source(entry.get().source.as_ref(), source) => Ok(entry.get().manager.clone()),
        Entry::Occupied(mut entry) => {
            let manager = Arc::new(create()?);
            entry.insert(Synthesized {
                source: source.cloned(),
                manager: manager.clone(),
            });
            Ok(manager)
        }
        Entry::Vacant(entry) => {
            let manager = Arc::new(create()?);
            entry.insert(Synthesized {
                source: source.cloned(),
                manager: manager.clone(),
            });
            Ok(manager)
        }
    }
}

/// 为没有显式注册的契约合成注册，返回持有注册的容器
pub(crate) fn synthesize(
    container: &DiContainerImpl,
    contract: &Contract,
) -> DependencyResult<(DiContainerImpl, Arc<RegistrationManager>)> {
    if let Some(generic) = contract.type_handle().generic() {
        if let Some(closed) = close_generic(container, contract, generic) {
            return closed;
        }
    }

    let data = match contract.type_handle().kind() {
        TypeKind::Array { element, rank: 1 } => RegistrationData::Collection {
            element: element.clone(),
            lazy: false,
        },
        TypeKind::Array { rank, .. } => {
            return Err(RegistrationError::InvalidArrayRank {
                type_name: contract.type_handle().name().to_string(),
                rank: *rank,
            }
            .into())
        }
        TypeKind::Enumerable { element } => RegistrationData::Collection {
            element: element.clone(),
            lazy: true,
        },
        _ => return poco(container, contract).map(|manager| (container.clone(), manager)),
    };

    let manager = cached(container, contract, None, || {
        debug!("合成集合注册: {} -> {}", contract, data);
        Ok(transient(contract, data.clone()))
    })?;
    Ok((container.clone(), manager))
}

/// 把契约类型本身作为实现的瞬时注册
pub(crate) fn poco(container: &DiContainerImpl, contract: &Contract) -> DependencyResult<Arc<RegistrationManager>> {
    cached(container, contract, None, || {
        debug!("合成类型注册: {}", contract);
        Ok(transient(
            contract,
            RegistrationData::Type(contract.type_handle().clone()),
        ))
    })
}

fn transient(contract: &Contract, data: RegistrationData) -> RegistrationManager {
    RegistrationManager::new(contract.clone(), data, Arc::new(TransientLifetimeManager), Vec::new())
}

fn close_generic(
    container: &DiContainerImpl,
    contract: &Contract,
    generic: &GenericInstance,
) -> Option<DependencyResult<(DiContainerImpl, Arc<RegistrationManager>)>> {
    container.lineage().find_map(|owner| {
        let open = owner
            .state()
            .open_generics
            .read()
            .iter()
            .find(|open| open.definition == generic.definition && open.name.as_deref() == contract.name())
            .cloned()?;

        let manager = cached(owner, contract, Some(&open), || {
            let implementation = catalog::make_generic_type(open.implementation, &generic.arguments)?;
            debug!("封闭开放泛型: {} -> {}", contract, implementation);
            Ok(RegistrationManager::new(
                contract.clone(),
                RegistrationData::Type(implementation),
                open.lifetime.clone_empty(),
                open.members.clone(),
            ))
        });
        Some(manager.map(|manager| (owner.clone(), manager)))
    })
}
