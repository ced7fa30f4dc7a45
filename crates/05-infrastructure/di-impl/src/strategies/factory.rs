//! 工厂与实例注册

use crate::chain::{BuildSteps, BuilderStrategy};
use crate::context::{PipelineContext, SuspendedPath, Target};
use di_abstractions::{DependencyResolver, RegistrationData};
use infrastructure_common::{DependencyError, Instance};
use std::sync::Arc;
use tracing::trace;

/// 调用注册的工厂
#[derive(Debug, Default, Clone, Copy)]
pub struct FactoryStrategy;

impl BuilderStrategy for FactoryStrategy {
    fn name(&self) -> &'static str {
        "Factory"
    }

    fn steps(&self) -> BuildSteps {
        BuildSteps::PRE
    }

    fn pre_build_up(&self, context: &mut PipelineContext<'_>) {
        let RegistrationData::Factory(factory) = context.registration().data() else {
            return;
        };
        let factory = factory.clone();
        let type_name = context.contract().type_handle().name().to_string();

        let resolver: &dyn DependencyResolver = context.container();
        let produced = {
            let _outer = SuspendedPath::enter(context);
            factory(resolver, context.contract())
        };
        match produced {
            Ok(Some(value)) => {
                trace!("工厂产生实例: {}", context.contract());
                context.set_target(Target::Shared(value));
            }
            Ok(None) => context.fault(DependencyError::NoValueProduced { type_name }),
            Err(error) => context.fault(DependencyError::ComponentCreationFailed {
                type_name,
                source: Box::new(error),
            }),
        }
    }
}

/// 返回注册的实例，或发起解析的容器本身
#[derive(Debug, Default, Clone, Copy)]
pub struct InstanceStrategy;

impl BuilderStrategy for InstanceStrategy {
    fn name(&self) -> &'static str {
        "Instance"
    }

    fn steps(&self) -> BuildSteps {
        BuildSteps::PRE
    }

    fn pre_build_up(&self, context: &mut PipelineContext<'_>) {
        let value: Instance = match context.registration().data() {
            RegistrationData::Instance(instance) => instance.clone(),
            RegistrationData::Internal => Arc::new(context.container().clone()),
            _ => return,
        };
        context.set_target(Target::Shared(value));
    }
}
