//! 导入描述
//!
//! 每个待解析的参数、属性或字段对应一个导入描述，它决定最终值如何产生。
//! 描述由成员元数据（依赖标记、默认值）构建，再叠加注册时的注入值与调用时的覆盖。

use crate::contract::Contract;
use crate::injection::{FactoryFn, InjectionValue, ValueProvider};
use infrastructure_common::{DefaultValue, FieldInfo, Instance, ParameterInfo, PropertyInfo, TypeHandle};
use std::fmt;
use std::sync::Arc;

/// 匹配等级，按 `ExactMatch > Compatible > HigherProspect > NoMatch` 排序
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchRank {
    /// 不匹配
    NoMatch,
    /// 解析占位符（类型、工厂、提供者）
    HigherProspect,
    /// 可赋值
    Compatible,
    /// 完全匹配
    ExactMatch,
}

impl MatchRank {
    /// 方法匹配时的分值，越小越好；不匹配为 `None`
    pub const fn score(self) -> Option<i32> {
        match self {
            Self::ExactMatch => Some(0),
            Self::Compatible => Some(1),
            Self::HigherProspect => Some(2),
            Self::NoMatch => None,
        }
    }
}

/// 导入目标的种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportKind {
    /// 构造函数或方法参数
    Parameter,
    /// 属性
    Property,
    /// 字段
    Field,
}

/// 导入目标: 正在解析的成员
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportTarget {
    /// 种类
    pub kind: ImportKind,
    /// 声明该成员的类型
    pub declaring_type: TypeHandle,
    /// 所属成员（参数所在的构造函数或方法）
    pub member: String,
    /// 参数、属性或字段名
    pub name: String,
    /// 成员的静态类型
    pub member_type: TypeHandle,
}

impl ImportTarget {
    /// 诊断用标签，例如 `Service.new(logger)`
    pub fn label(&self) -> String {
        match self.kind {
            ImportKind::Parameter => {
                format!("{}.{}({})", self.declaring_type.short_name(), self.member, self.name)
            }
            ImportKind::Property | ImportKind::Field => {
                format!("{}.{}", self.declaring_type.short_name(), self.name)
            }
        }
    }
}

/// 值的来源
#[derive(Clone, Default)]
pub enum ValueData {
    /// 按契约从容器解析
    #[default]
    None,
    /// 字面值
    Value(Option<Instance>),
    /// 值工厂
    Pipeline(FactoryFn),
    /// 动态值，使用前必须展开为其它来源
    Dynamic(Arc<dyn ValueProvider>),
    /// 逐个解析的数组
    Array {
        /// 元素类型
        element: TypeHandle,
        /// 元素值
        values: Vec<InjectionValue>,
    },
}

impl fmt::Debug for ValueData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Value(None) => f.write_str("Value(null)"),
            Self::Value(Some(_)) => f.write_str("Value(..)"),
            Self::Pipeline(_) => f.write_str("Pipeline(..)"),
            Self::Dynamic(_) => f.write_str("Dynamic(..)"),
            Self::Array { element, values } => f
                .debug_struct("Array")
                .field("element", element)
                .field("values", &values.len())
                .finish(),
        }
    }
}

/// 导入描述
#[derive(Debug, Clone)]
pub struct ImportDescriptor {
    /// 导入目标
    pub target: ImportTarget,
    /// 待解析的契约
    pub contract: Contract,
    /// 解析失败时是否使用默认值
    pub allow_default: bool,
    /// 显式默认值，缺省时使用成员类型的语言默认值
    pub default_value: Option<DefaultValue>,
    /// 值的来源
    pub value: ValueData,
    /// 是否带有依赖标记
    pub is_import: bool,
}

impl ImportDescriptor {
    fn new(target: ImportTarget) -> Self {
        Self {
            contract: Contract::new(target.member_type.clone(), None),
            target,
            allow_default: false,
            default_value: None,
            value: ValueData::None,
            is_import: false,
        }
    }

    /// 构造函数或方法参数
    ///
    /// 显式默认值标注优先于参数默认值；任一默认值都允许解析失败时回退。
    pub fn parameter(declaring_type: &TypeHandle, member: &str, parameter: &ParameterInfo) -> Self {
        let mut import = Self::new(ImportTarget {
            kind: ImportKind::Parameter,
            declaring_type: declaring_type.clone(),
            member: member.to_string(),
            name: parameter.name.clone(),
            member_type: parameter.parameter_type.clone(),
        });

        if let Some(dependency) = &parameter.dependency {
            import.contract = Contract::new(parameter.parameter_type.clone(), dependency.name.clone());
            import.allow_default = dependency.optional;
            import.is_import = true;
        }

        if let Some(default) = parameter
            .default_value_attribute
            .as_ref()
            .or(parameter.default_value.as_ref())
        {
            import.default_value = Some(default.clone());
            import.allow_default = true;
        }
        import
    }

    /// 属性
    pub fn property(declaring_type: &TypeHandle, property: &PropertyInfo) -> Self {
        let mut import = Self::new(ImportTarget {
            kind: ImportKind::Property,
            declaring_type: declaring_type.clone(),
            member: property.name.clone(),
            name: property.name.clone(),
            member_type: property.property_type.clone(),
        });
        if let Some(dependency) = &property.dependency {
            import.contract = Contract::new(property.property_type.clone(), dependency.name.clone());
            import.allow_default = dependency.optional;
            import.is_import = true;
        }
        import
    }

    /// 字段
    pub fn field(declaring_type: &TypeHandle, field: &FieldInfo) -> Self {
        let mut import = Self::new(ImportTarget {
            kind: ImportKind::Field,
            declaring_type: declaring_type.clone(),
            member: field.name.clone(),
            name: field.name.clone(),
            member_type: field.field_type.clone(),
        });
        if let Some(dependency) = &field.dependency {
            import.contract = Contract::new(field.field_type.clone(), dependency.name.clone());
            import.allow_default = dependency.optional;
            import.is_import = true;
        }
        import
    }

    /// 叠加注入值
    pub fn apply(&mut self, value: &InjectionValue) {
        match value {
            InjectionValue::Value(value) => self.value = ValueData::Value(value.clone()),
            InjectionValue::Resolved { type_handle, name } => {
                self.redirect(type_handle.as_ref(), name.clone());
                self.allow_default = false;
            }
            InjectionValue::Optional { type_handle, name } => {
                self.redirect(type_handle.as_ref(), name.clone());
                self.allow_default = true;
            }
            InjectionValue::Type(type_handle) => self.redirect(Some(type_handle), None),
            InjectionValue::Factory(factory) => self.value = ValueData::Pipeline(factory.clone()),
            InjectionValue::Provider(provider) => self.value = ValueData::Dynamic(provider.clone()),
            InjectionValue::Array { element, values } => {
                self.value = ValueData::Array {
                    element: element.clone(),
                    values: values.clone(),
                };
            }
        }
    }

    fn redirect(&mut self, type_handle: Option<&TypeHandle>, name: Option<String>) {
        let type_handle = type_handle.unwrap_or(&self.target.member_type).clone();
        self.contract = Contract::new(type_handle, name);
        self.value = ValueData::None;
    }

    /// 解析失败时的回退值
    pub fn fallback(&self) -> Option<Instance> {
        match &self.default_value {
            Some(default) => default.to_instance(),
            None => self.target.member_type.default_value(),
        }
    }
}
