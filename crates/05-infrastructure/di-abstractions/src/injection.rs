//! 注入成员
//!
//! 注册时显式提供的构造函数、属性、字段与方法注入数据。

use crate::import::ImportTarget;
use crate::resolver::DependencyResolver;
use crate::contract::Contract;
use infrastructure_common::{DependencyResult, Instance, TypeHandle};
use std::fmt;
use std::sync::Arc;

/// 值工厂
///
/// 收到容器与待解析的契约，返回可空实例。
pub type FactoryFn =
    Arc<dyn Fn(&dyn DependencyResolver, &Contract) -> DependencyResult<Option<Instance>> + Send + Sync>;

/// 动态值提供者
///
/// 每次解析时按目标成员给出新的注入值，返回值可以再次是提供者。
pub trait ValueProvider: Send + Sync {
    /// 为目标成员提供注入值
    fn provide(&self, target: &ImportTarget) -> InjectionValue;
}

/// 注入值
#[derive(Clone)]
pub enum InjectionValue {
    /// 字面值（`None` 表示空）
    Value(Option<Instance>),
    /// 从容器解析，类型缺省时使用成员类型
    Resolved {
        /// 解析类型
        type_handle: Option<TypeHandle>,
        /// 注册名称
        name: Option<String>,
    },
    /// 可选解析，失败时使用默认值
    Optional {
        /// 解析类型
        type_handle: Option<TypeHandle>,
        /// 注册名称
        name: Option<String>,
    },
    /// 把类型作为"解析该类型"的占位符
    Type(TypeHandle),
    /// 值工厂
    Factory(FactoryFn),
    /// 动态值提供者
    Provider(Arc<dyn ValueProvider>),
    /// 数组，逐个元素解析
    Array {
        /// 元素类型
        element: TypeHandle,
        /// 元素值
        values: Vec<InjectionValue>,
    },
}

impl InjectionValue {
    /// 字面值
    pub fn value<T: Send + Sync + 'static>(value: T) -> Self {
        Self::Value(Some(Arc::new(value)))
    }

    /// 空值
    pub const fn null() -> Self {
        Self::Value(None)
    }

    /// 按成员类型从容器解析
    pub const fn resolved() -> Self {
        Self::Resolved {
            type_handle: None,
            name: None,
        }
    }

    /// 按成员类型解析命名注册
    pub fn resolved_named(name: impl Into<String>) -> Self {
        Self::Resolved {
            type_handle: None,
            name: Some(name.into()),
        }
    }

    /// 按成员类型可选解析
    pub const fn optional() -> Self {
        Self::Optional {
            type_handle: None,
            name: None,
        }
    }

    /// 值工厂
    pub fn factory<F>(factory: F) -> Self
    where
        F: Fn(&dyn DependencyResolver, &Contract) -> DependencyResult<Option<Instance>> + Send + Sync + 'static,
    {
        Self::Factory(Arc::new(factory))
    }

    /// 动态值提供者
    pub fn provider(provider: impl ValueProvider + 'static) -> Self {
        Self::Provider(Arc::new(provider))
    }
}

impl fmt::Debug for InjectionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(None) => f.write_str("Value(null)"),
            Self::Value(Some(_)) => f.write_str("Value(..)"),
            Self::Resolved { type_handle, name } => f
                .debug_struct("Resolved")
                .field("type_handle", type_handle)
                .field("name", name)
                .finish(),
            Self::Optional { type_handle, name } => f
                .debug_struct("Optional")
                .field("type_handle", type_handle)
                .field("name", name)
                .finish(),
            Self::Type(handle) => f.debug_tuple("Type").field(handle).finish(),
            Self::Factory(_) => f.write_str("Factory(..)"),
            Self::Provider(_) => f.write_str("Provider(..)"),
            Self::Array { element, values } => f
                .debug_struct("Array")
                .field("element", element)
                .field("values", values)
                .finish(),
        }
    }
}

/// 注入成员
#[derive(Debug, Clone)]
pub enum InjectionMember {
    /// 按参数匹配选择构造函数
    Constructor(Vec<InjectionValue>),
    /// 注入属性，值缺省时按属性类型解析
    Property {
        /// 属性名
        name: String,
        /// 注入值
        value: Option<InjectionValue>,
    },
    /// 注入字段，值缺省时按字段类型解析
    Field {
        /// 字段名
        name: String,
        /// 注入值
        value: Option<InjectionValue>,
    },
    /// 调用方法，按参数匹配选择重载
    Method {
        /// 方法名
        name: String,
        /// 参数值
        arguments: Vec<InjectionValue>,
    },
}

impl InjectionMember {
    /// 构造函数注入
    pub fn constructor(arguments: impl IntoIterator<Item = InjectionValue>) -> Self {
        Self::Constructor(arguments.into_iter().collect())
    }

    /// 属性注入（从容器解析）
    pub fn property(name: impl Into<String>) -> Self {
        Self::Property {
            name: name.into(),
            value: None,
        }
    }

    /// 属性注入（指定值）
    pub fn property_value(name: impl Into<String>, value: InjectionValue) -> Self {
        Self::Property {
            name: name.into(),
            value: Some(value),
        }
    }

    /// 字段注入（从容器解析）
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field {
            name: name.into(),
            value: None,
        }
    }

    /// 字段注入（指定值）
    pub fn field_value(name: impl Into<String>, value: InjectionValue) -> Self {
        Self::Field {
            name: name.into(),
            value: Some(value),
        }
    }

    /// 方法注入
    pub fn method(name: impl Into<String>, arguments: impl IntoIterator<Item = InjectionValue>) -> Self {
        Self::Method {
            name: name.into(),
            arguments: arguments.into_iter().collect(),
        }
    }
}
