//! 构造函数调用

use crate::chain::{BuildSteps, BuilderStrategy};
use crate::context::{PipelineContext, SuspendedPath, Target};
use crate::parameters::resolve_arguments;
use infrastructure_common::{ConstructionError, DependencyError};
use tracing::trace;

/// 按构建计划选中的构造函数创建实例
///
/// 目标已有值（对已有实例注入）时跳过。
#[derive(Debug, Default, Clone, Copy)]
pub struct ConstructorStrategy;

impl BuilderStrategy for ConstructorStrategy {
    fn name(&self) -> &'static str {
        "Constructor"
    }

    fn steps(&self) -> BuildSteps {
        BuildSteps::PRE
    }

    fn pre_build_up(&self, context: &mut PipelineContext<'_>) {
        if !context.target().is_empty() {
            return;
        }
        let Some(plan) = context.plan().cloned() else {
            context.fault(DependencyError::from(ConstructionError::TypeNotDescribed {
                type_name: context.contract().type_handle().name().to_string(),
            }));
            return;
        };
        let constructor = match plan.constructor() {
            Ok(constructor) => constructor,
            Err(fault) => {
                context.fault(fault.clone().into());
                return;
            }
        };

        if constructor.self_referencing {
            // 参数以自身类型为类型时只能使用已缓存的值
            match context.registration().lifetime().try_get_value(context.scopes()) {
                Some(existing) => context.set_target(Target::Shared(existing)),
                None => context.fault(DependencyError::from(ConstructionError::SelfReferencingConstructor {
                    type_name: plan.type_handle().name().to_string(),
                })),
            }
            return;
        }

        let arguments = match resolve_arguments(context, &constructor.imports) {
            Ok(arguments) => arguments,
            Err(error) => {
                context.fault(error);
                return;
            }
        };
        trace!("调用构造函数: {}{}", plan.type_handle(), constructor.info.signature());
        let created = {
            let _outer = SuspendedPath::enter(context);
            constructor.info.invoke(&arguments)
        };
        match created {
            Ok(value) => context.set_target(Target::Owned(value)),
            Err(error) => context.fault(error.into()),
        }
    }
}
