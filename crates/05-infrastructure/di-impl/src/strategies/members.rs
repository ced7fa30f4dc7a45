//! 字段、属性与方法注入
//!
//! 目标必须是独占值；共享值（实例注册、缓存值）不会被修改。

use crate::chain::{BuildSteps, BuilderStrategy};
use crate::context::{PipelineContext, SuspendedPath};
use crate::parameters::resolve_arguments;
use infrastructure_common::ConstructionResult;
use std::any::Any;
use tracing::trace;

/// 把成员写入目标；目标不可修改时跳过并返回 `false`
fn with_target(
    context: &mut PipelineContext<'_>,
    member: &str,
    write: impl FnOnce(&mut (dyn Any + Send + Sync)) -> ConstructionResult<()>,
) -> bool {
    let result = match context.target_mut() {
        Some(target) => write(target),
        None => {
            trace!("目标不可修改，跳过成员注入: {}.{}", context.contract(), member);
            return false;
        }
    };
    match result {
        Ok(()) => true,
        Err(error) => {
            context.fault(error.into());
            false
        }
    }
}

/// 字段注入
#[derive(Debug, Default, Clone, Copy)]
pub struct FieldStrategy;

impl BuilderStrategy for FieldStrategy {
    fn name(&self) -> &'static str {
        "Fields"
    }

    fn steps(&self) -> BuildSteps {
        BuildSteps::PRE
    }

    fn pre_build_up(&self, context: &mut PipelineContext<'_>) {
        let Some(plan) = context.plan().cloned() else {
            return;
        };
        for field in plan.fields() {
            let value = match context.resolve_import(&field.import) {
                Ok(value) => value,
                Err(error) => {
                    context.fault(error);
                    return;
                }
            };
            if !with_target(context, &field.info.name, |target| field.info.set(target, value)) {
                return;
            }
        }
    }
}

/// 属性注入
#[derive(Debug, Default, Clone, Copy)]
pub struct PropertyStrategy;

impl BuilderStrategy for PropertyStrategy {
    fn name(&self) -> &'static str {
        "Properties"
    }

    fn steps(&self) -> BuildSteps {
        BuildSteps::PRE
    }

    fn pre_build_up(&self, context: &mut PipelineContext<'_>) {
        let Some(plan) = context.plan().cloned() else {
            return;
        };
        for property in plan.properties() {
            let value = match context.resolve_import(&property.import) {
                Ok(value) => value,
                Err(error) => {
                    context.fault(error);
                    return;
                }
            };
            if !with_target(context, &property.info.name, |target| property.info.set(target, value)) {
                return;
            }
        }
    }
}

/// 调用注入方法
#[derive(Debug, Default, Clone, Copy)]
pub struct MethodStrategy;

impl BuilderStrategy for MethodStrategy {
    fn name(&self) -> &'static str {
        "Methods"
    }

    fn steps(&self) -> BuildSteps {
        BuildSteps::PRE
    }

    fn pre_build_up(&self, context: &mut PipelineContext<'_>) {
        let Some(plan) = context.plan().cloned() else {
            return;
        };
        for method in plan.methods() {
            let arguments = match resolve_arguments(context, &method.imports) {
                Ok(arguments) => arguments,
                Err(error) => {
                    context.fault(error);
                    return;
                }
            };
            trace!("调用注入方法: {}", method.info.signature());
            let _outer = SuspendedPath::enter(context);
            if !with_target(context, &method.info.name, |target| method.info.invoke(target, &arguments)) {
                return;
            }
        }
    }
}
