//! 注入值与成员参数的匹配

use di_abstractions::{InjectionValue, MatchRank};
use infrastructure_common::{catalog, instance_type_id, InstanceList, ParameterInfo, TypeHandle, TypeKind};

/// 注入值与参数类型的匹配等级
pub fn match_value(value: &InjectionValue, parameter_type: &TypeHandle) -> MatchRank {
    match value {
        InjectionValue::Value(None) => {
            if parameter_type.kind().accepts_null() {
                MatchRank::ExactMatch
            } else {
                MatchRank::NoMatch
            }
        }
        InjectionValue::Value(Some(instance)) => {
            if parameter_type.type_id() == Some(instance_type_id(instance)) {
                return MatchRank::ExactMatch;
            }
            if let (Some(element), Some(list)) = (parameter_type.element_type(), instance.downcast_ref::<InstanceList>()) {
                return if list.iter().all(|item| catalog::instance_is(item, element)) {
                    MatchRank::Compatible
                } else {
                    MatchRank::NoMatch
                };
            }
            if catalog::instance_is(instance, parameter_type) {
                MatchRank::Compatible
            } else {
                MatchRank::NoMatch
            }
        }
        InjectionValue::Resolved { type_handle, .. } | InjectionValue::Optional { type_handle, .. } => {
            match type_handle {
                None => MatchRank::ExactMatch,
                Some(handle) => match_type(handle, parameter_type),
            }
        }
        InjectionValue::Type(handle) => {
            if parameter_type.is_assignable_from(handle) {
                MatchRank::HigherProspect
            } else {
                MatchRank::NoMatch
            }
        }
        InjectionValue::Factory(_) | InjectionValue::Provider(_) => MatchRank::HigherProspect,
        InjectionValue::Array { element, .. } => match parameter_type.kind() {
            TypeKind::Array {
                element: expected,
                rank: 1,
            }
            | TypeKind::Enumerable { element: expected } => match_type(element, expected),
            _ => MatchRank::NoMatch,
        },
    }
}

fn match_type(source: &TypeHandle, target: &TypeHandle) -> MatchRank {
    if source == target {
        MatchRank::ExactMatch
    } else if target.is_assignable_from(source) {
        MatchRank::Compatible
    } else {
        MatchRank::NoMatch
    }
}

/// 参数列表的匹配分值，越小越好；任一参数不匹配时为 `None`
pub fn match_parameters(parameters: &[ParameterInfo], values: &[InjectionValue]) -> Option<i32> {
    if parameters.len() != values.len() {
        return None;
    }
    parameters
        .iter()
        .zip(values)
        .map(|(parameter, value)| match_value(value, &parameter.parameter_type).score())
        .sum()
}

/// 选择与注入值最匹配的候选
///
/// 第一个完全匹配的候选直接胜出，否则取分值最小者（相同分值取先出现者）。
pub fn select_best<'c, C>(
    candidates: impl IntoIterator<Item = &'c C>,
    parameters: impl Fn(&C) -> &[ParameterInfo],
    values: &[InjectionValue],
) -> Option<&'c C>
where
    C: 'c,
{
    let mut best: Option<(i32, &'c C)> = None;
    for candidate in candidates {
        let Some(score) = match_parameters(parameters(candidate), values) else {
            continue;
        };
        if score == 0 {
            return Some(candidate);
        }
        if best.map_or(true, |(lowest, _)| score < lowest) {
            best = Some((score, candidate));
        }
    }
    best.map(|(_, candidate)| candidate)
}

/// 注入值列表的签名（诊断用）
pub(crate) fn describe_values(values: &[InjectionValue]) -> String {
    let parts: Vec<String> = values.iter().map(|value| format!("{value:?}")).collect();
    format!("({})", parts.join(", "))
}
