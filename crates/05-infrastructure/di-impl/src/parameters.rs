//! 参数与成员值解析
//!
//! 优先级: 调用时覆盖 > 注册时注入值 > 依赖标记与默认值 > 容器解析 > 回退默认值。

use crate::context::{PipelineContext, SuspendedPath};
use crate::overrides::select_override;
use di_abstractions::{Contract, DependencyResolver, ImportDescriptor, ValueData, ValueProvider};
use infrastructure_common::{Arguments, DependencyError, DependencyResult, Instance, InstanceList};
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{debug, trace};

/// 解析单个导入，失败时按 `allow_default` 回退
pub(crate) fn resolve_import(
    context: &PipelineContext<'_>,
    import: &ImportDescriptor,
) -> DependencyResult<Option<Instance>> {
    let mut import = Cow::Borrowed(import);
    if let Some(overriding) = select_override(context.overrides(), &import) {
        trace!("应用解析覆盖: {} <- {:?}", import.target.label(), overriding);
        import.to_mut().apply(&overriding.value());
    }

    let import = unwrap_dynamic(context, import)?;
    resolve_value(context, &import).or_else(|error| fallback(&import, error))
}

fn fallback(import: &ImportDescriptor, error: DependencyError) -> DependencyResult<Option<Instance>> {
    if matches!(error, DependencyError::InvalidRegistration(_)) {
        return Err(error);
    }
    if import.allow_default {
        debug!("可选依赖 {} 解析失败，使用默认值: {}", import.target.label(), error);
        return Ok(import.fallback());
    }
    Err(DependencyError::dependency_failed(
        import.contract.type_handle().name(),
        import.contract.name().map(str::to_string),
        import.target.label(),
        error,
    ))
}

/// 展开动态值，直到得到其它来源
///
/// 同一个提供者出现两次，或展开次数达到上限，视为配置错误。
fn unwrap_dynamic<'i>(
    context: &PipelineContext<'_>,
    mut import: Cow<'i, ImportDescriptor>,
) -> DependencyResult<Cow<'i, ImportDescriptor>> {
    let limit = context.container().config().max_dynamic_unwrap;
    // 已展开的提供者保持存活，地址不会被复用
    let mut seen: Vec<Arc<dyn ValueProvider>> = Vec::new();
    while let ValueData::Dynamic(provider) = &import.value {
        let provider = provider.clone();
        let repeated = seen
            .iter()
            .any(|earlier| Arc::as_ptr(earlier).cast::<()>() == Arc::as_ptr(&provider).cast::<()>());
        if repeated || seen.len() >= limit {
            return Err(DependencyError::UnstableDynamicValue {
                member: import.target.label(),
                iterations: seen.len(),
            });
        }

        let provided = provider.provide(&import.target);
        seen.push(provider);
        let import = import.to_mut();
        import.value = ValueData::None;
        import.apply(&provided);
    }
    Ok(import)
}

fn resolve_value(context: &PipelineContext<'_>, import: &ImportDescriptor) -> DependencyResult<Option<Instance>> {
    match &import.value {
        ValueData::Value(value) => Ok(value.clone()),
        ValueData::Pipeline(factory) => {
            let resolver: &dyn DependencyResolver = context.container();
            let _outer = SuspendedPath::enter(context);
            factory(resolver, &import.contract)
        }
        ValueData::Array { element, values } => {
            let mut list = InstanceList::with_capacity(values.len());
            for value in values {
                let mut element_import = import.clone();
                element_import.target.member_type = element.clone();
                element_import.contract = Contract::new(element.clone(), None);
                element_import.value = ValueData::None;
                element_import.allow_default = false;
                element_import.default_value = None;
                element_import.apply(value);

                let element_import = unwrap_dynamic(context, Cow::Owned(element_import))?;
                if let Some(instance) = resolve_value(context, &element_import)? {
                    list.push(instance);
                }
            }
            Ok(Some(Arc::new(list) as Instance))
        }
        ValueData::None => context.container().resolve_nested(&import.contract, context).map(Some),
        ValueData::Dynamic(_) => Err(DependencyError::UnstableDynamicValue {
            member: import.target.label(),
            iterations: 0,
        }),
    }
}

/// 依次解析参数列表
pub(crate) fn resolve_arguments(
    context: &PipelineContext<'_>,
    imports: &[ImportDescriptor],
) -> DependencyResult<Arguments> {
    let values = imports
        .iter()
        .map(|import| resolve_import(context, import))
        .collect::<DependencyResult<Vec<_>>>()?;
    Ok(Arguments::new(values))
}
