//! 解析覆盖实现
//!
//! 覆盖在单次解析中替换某个参数、属性、字段或依赖的值，对嵌套依赖同样生效。

use di_abstractions::{ImportDescriptor, ImportKind, InjectionValue, MatchRank, ResolverOverride};
use infrastructure_common::{Reflect, TypeHandle};
use std::sync::Arc;

fn rank_declaring_type(target: Option<&TypeHandle>, import: &ImportDescriptor) -> bool {
    target.map_or(true, |target| target == &import.target.declaring_type)
}

/// 按名称和（或）类型覆盖构造函数或方法参数
#[derive(Debug, Clone)]
pub struct ParameterOverride {
    name: Option<String>,
    parameter_type: Option<TypeHandle>,
    target: Option<TypeHandle>,
    value: InjectionValue,
}

impl ParameterOverride {
    /// 按参数名覆盖
    pub fn named(name: impl Into<String>, value: InjectionValue) -> Self {
        Self {
            name: Some(name.into()),
            parameter_type: None,
            target: None,
            value,
        }
    }

    /// 按参数类型覆盖
    pub fn typed(parameter_type: TypeHandle, value: InjectionValue) -> Self {
        Self {
            name: None,
            parameter_type: Some(parameter_type),
            target: None,
            value,
        }
    }

    /// 按参数名与类型覆盖
    pub fn new(name: impl Into<String>, parameter_type: TypeHandle, value: InjectionValue) -> Self {
        Self {
            name: Some(name.into()),
            parameter_type: Some(parameter_type),
            target: None,
            value,
        }
    }

    /// 只作用于声明在 `T` 上的参数
    #[must_use]
    pub fn on_type<T: ?Sized + Reflect>(mut self) -> Self {
        self.target = Some(T::type_handle());
        self
    }
}

impl ResolverOverride for ParameterOverride {
    fn rank(&self, import: &ImportDescriptor) -> MatchRank {
        if import.target.kind != ImportKind::Parameter || !rank_declaring_type(self.target.as_ref(), import) {
            return MatchRank::NoMatch;
        }
        if let Some(name) = &self.name {
            if name != &import.target.name {
                return MatchRank::NoMatch;
            }
        }
        match &self.parameter_type {
            None => MatchRank::ExactMatch,
            Some(parameter_type) if parameter_type == &import.target.member_type => MatchRank::ExactMatch,
            Some(parameter_type) if import.target.member_type.is_assignable_from(parameter_type) => {
                MatchRank::Compatible
            }
            Some(_) => MatchRank::NoMatch,
        }
    }

    fn required_rank(&self) -> MatchRank {
        if self.parameter_type.is_some() {
            MatchRank::Compatible
        } else {
            MatchRank::ExactMatch
        }
    }

    fn value(&self) -> InjectionValue {
        self.value.clone()
    }
}

/// 按名称覆盖属性
#[derive(Debug, Clone)]
pub struct PropertyOverride {
    name: String,
    target: Option<TypeHandle>,
    value: InjectionValue,
}

impl PropertyOverride {
    /// 创建属性覆盖
    pub fn new(name: impl Into<String>, value: InjectionValue) -> Self {
        Self {
            name: name.into(),
            target: None,
            value,
        }
    }

    /// 只作用于声明在 `T` 上的属性
    #[must_use]
    pub fn on_type<T: ?Sized + Reflect>(mut self) -> Self {
        self.target = Some(T::type_handle());
        self
    }
}

impl ResolverOverride for PropertyOverride {
    fn rank(&self, import: &ImportDescriptor) -> MatchRank {
        if import.target.kind == ImportKind::Property
            && import.target.name == self.name
            && rank_declaring_type(self.target.as_ref(), import)
        {
            MatchRank::ExactMatch
        } else {
            MatchRank::NoMatch
        }
    }

    fn value(&self) -> InjectionValue {
        self.value.clone()
    }
}

/// 按名称覆盖字段
#[derive(Debug, Clone)]
pub struct FieldOverride {
    name: String,
    target: Option<TypeHandle>,
    value: InjectionValue,
}

impl FieldOverride {
    /// 创建字段覆盖
    pub fn new(name: impl Into<String>, value: InjectionValue) -> Self {
        Self {
            name: name.into(),
            target: None,
            value,
        }
    }

    /// 只作用于声明在 `T` 上的字段
    #[must_use]
    pub fn on_type<T: ?Sized + Reflect>(mut self) -> Self {
        self.target = Some(T::type_handle());
        self
    }
}

impl ResolverOverride for FieldOverride {
    fn rank(&self, import: &ImportDescriptor) -> MatchRank {
        if import.target.kind == ImportKind::Field
            && import.target.name == self.name
            && rank_declaring_type(self.target.as_ref(), import)
        {
            MatchRank::ExactMatch
        } else {
            MatchRank::NoMatch
        }
    }

    fn value(&self) -> InjectionValue {
        self.value.clone()
    }
}

/// 按契约覆盖任意成员的依赖
///
/// 不指定名称时也接受命名导入，但等级降为 [`MatchRank::Compatible`]。
#[derive(Debug, Clone)]
pub struct DependencyOverride {
    dependency_type: TypeHandle,
    name: Option<String>,
    target: Option<TypeHandle>,
    value: InjectionValue,
}

impl DependencyOverride {
    /// 覆盖类型 `T` 的依赖
    pub fn of<T: ?Sized + Reflect>(value: InjectionValue) -> Self {
        Self::new(T::type_handle(), None, value)
    }

    /// 覆盖类型 `T` 的命名依赖
    pub fn named<T: ?Sized + Reflect>(name: impl Into<String>, value: InjectionValue) -> Self {
        Self::new(T::type_handle(), Some(name.into()), value)
    }

    /// 按类型句柄创建
    pub fn new(dependency_type: TypeHandle, name: Option<String>, value: InjectionValue) -> Self {
        Self {
            dependency_type,
            name,
            target: None,
            value,
        }
    }

    /// 只作用于声明在 `T` 上的成员
    #[must_use]
    pub fn on_type<T: ?Sized + Reflect>(mut self) -> Self {
        self.target = Some(T::type_handle());
        self
    }
}

impl ResolverOverride for DependencyOverride {
    fn rank(&self, import: &ImportDescriptor) -> MatchRank {
        if import.contract.type_handle() != &self.dependency_type || !rank_declaring_type(self.target.as_ref(), import)
        {
            return MatchRank::NoMatch;
        }
        match (&self.name, import.contract.name()) {
            (Some(expected), Some(actual)) if expected == actual => MatchRank::ExactMatch,
            (Some(_), _) => MatchRank::NoMatch,
            (None, None) => MatchRank::ExactMatch,
            (None, Some(_)) => MatchRank::Compatible,
        }
    }

    fn required_rank(&self) -> MatchRank {
        MatchRank::Compatible
    }

    fn value(&self) -> InjectionValue {
        self.value.clone()
    }
}

/// 为导入选择覆盖
///
/// 后加入的覆盖优先：逆序查找，第一个完全匹配者胜出；否则取达到各自最低等级要求的最佳部分匹配。
pub fn select_override<'o>(
    overrides: &'o [Arc<dyn ResolverOverride>],
    import: &ImportDescriptor,
) -> Option<&'o Arc<dyn ResolverOverride>> {
    let mut best: Option<(MatchRank, &'o Arc<dyn ResolverOverride>)> = None;
    for candidate in overrides.iter().rev() {
        let rank = candidate.rank(import);
        if rank == MatchRank::ExactMatch {
            return Some(candidate);
        }
        if rank == MatchRank::NoMatch || rank < candidate.required_rank() {
            continue;
        }
        if best.map_or(true, |(current, _)| rank > current) {
            best = Some((rank, candidate));
        }
    }
    best.map(|(_, candidate)| candidate)
}
