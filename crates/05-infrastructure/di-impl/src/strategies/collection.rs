//! 数组与序列合成
//!
//! 元素来自沿容器祖先链可见的全部同类型注册（默认与命名）。
//! 只有包装了类型加载失败的参数错误会让元素被丢弃，其它错误照常失败。

use crate::chain::{BuildSteps, BuilderStrategy};
use crate::container::{ContainerState, DiContainerImpl};
use crate::context::{PipelineContext, Target};
use di_abstractions::{Contract, RegistrationData};
use infrastructure_common::{
    DependencyError, DependencyResult, Instance, InstanceList, InstanceSource, LazyInstances, TypeHandle,
};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use tracing::debug;

/// 合成数组或延迟序列
#[derive(Debug, Default, Clone, Copy)]
pub struct CollectionStrategy;

impl BuilderStrategy for CollectionStrategy {
    fn name(&self) -> &'static str {
        "Collection"
    }

    fn steps(&self) -> BuildSteps {
        BuildSteps::PRE
    }

    fn pre_build_up(&self, context: &mut PipelineContext<'_>) {
        let (element, lazy) = match context.registration().data() {
            RegistrationData::Collection { element, lazy } => (element.clone(), *lazy),
            _ => return,
        };

        if lazy {
            let source = LiveCollection::new(context.container(), element);
            context.set_target(Target::Shared(Arc::new(LazyInstances::new(Arc::new(source)))));
            return;
        }

        let contracts = context.container().collection_contracts(&element);
        let mut list = InstanceList::with_capacity(contracts.len());
        for contract in &contracts {
            match context.container().resolve_nested(contract, context) {
                Ok(instance) => list.push(instance),
                Err(error) if error.root_cause().is_type_load_argument() => {
                    debug!("丢弃无法构造的元素: {}, 原因: {}", contract, error);
                }
                Err(error) => {
                    context.fault(error);
                    return;
                }
            }
        }
        debug!("合成数组: {}[], 元素 {}/{}", element, list.len(), contracts.len());
        context.set_target(Target::Shared(Arc::new(list)));
    }
}

/// 延迟序列的数据源
///
/// 每次枚举时按容器的注册版本检查快照，版本变化后重新收集元素契约。
struct LiveCollection {
    state: Weak<ContainerState>,
    element: TypeHandle,
    snapshot: Mutex<Option<(u64, Arc<[Contract]>)>>,
}

impl LiveCollection {
    fn new(container: &DiContainerImpl, element: TypeHandle) -> Self {
        Self {
            state: container.downgrade(),
            element,
            snapshot: Mutex::new(None),
        }
    }

    fn contracts(&self, container: &DiContainerImpl) -> Arc<[Contract]> {
        let version = container.lineage_version();
        let mut snapshot = self.snapshot.lock();
        match snapshot.as_ref() {
            Some((seen, contracts)) if *seen == version => contracts.clone(),
            _ => {
                let contracts: Arc<[Contract]> = container.collection_contracts(&self.element).into();
                *snapshot = Some((version, contracts.clone()));
                contracts
            }
        }
    }
}

impl InstanceSource for LiveCollection {
    fn iter(&self) -> Box<dyn Iterator<Item = DependencyResult<Instance>> + '_> {
        let Some(container) = DiContainerImpl::upgrade(&self.state) else {
            return Box::new(std::iter::once(Err::<Instance, _>(DependencyError::Disposed {
                scope: format!("Enumerable<{}>", self.element),
            })));
        };
        let contracts = self.contracts(&container);
        Box::new(
            (0..contracts.len())
                .map(move |index| container.resolve_root(&contracts[index]))
                .filter(|result| !matches!(result, Err(error) if error.root_cause().is_type_load_argument())),
        )
    }
}
