//! 注册数据

use crate::injection::FactoryFn;
use infrastructure_common::{Instance, TypeHandle};
use std::fmt;

/// 注册类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistrationCategory {
    /// 尚未初始化
    Uninitialized,
    /// 构造类型
    Type,
    /// 工厂
    Factory,
    /// 已有实例
    Instance,
    /// 容器内部注册（容器自身）
    Internal,
    /// 按注册集合合成的数组或序列
    Cache,
}

/// 注册数据，由类别决定含义
#[derive(Clone, Default)]
pub enum RegistrationData {
    /// 无数据
    #[default]
    None,
    /// 要构造的实现类型
    Type(TypeHandle),
    /// 工厂
    Factory(FactoryFn),
    /// 实例
    Instance(Instance),
    /// 解析为发起解析的容器
    Internal,
    /// 元素集合
    Collection {
        /// 元素类型
        element: TypeHandle,
        /// 延迟序列（否则为数组）
        lazy: bool,
    },
}

impl RegistrationData {
    /// 数据对应的类别
    pub const fn category(&self) -> RegistrationCategory {
        match self {
            Self::None => RegistrationCategory::Uninitialized,
            Self::Type(_) => RegistrationCategory::Type,
            Self::Factory(_) => RegistrationCategory::Factory,
            Self::Instance(_) => RegistrationCategory::Instance,
            Self::Internal => RegistrationCategory::Internal,
            Self::Collection { .. } => RegistrationCategory::Cache,
        }
    }

    /// 实现类型
    pub fn implementation(&self) -> Option<&TypeHandle> {
        match self {
            Self::Type(type_handle) => Some(type_handle),
            _ => None,
        }
    }
}

impl fmt::Debug for RegistrationData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Type(type_handle) => f.debug_tuple("Type").field(type_handle).finish(),
            Self::Factory(_) => f.write_str("Factory(..)"),
            Self::Instance(_) => f.write_str("Instance(..)"),
            Self::Internal => f.write_str("Internal"),
            Self::Collection { element, lazy } => f
                .debug_struct("Collection")
                .field("element", element)
                .field("lazy", lazy)
                .finish(),
        }
    }
}

impl fmt::Display for RegistrationData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Type(type_handle) => write!(f, "{type_handle}"),
            Self::Collection { element, lazy: true } => write!(f, "Enumerable<{element}>"),
            Self::Collection { element, lazy: false } => write!(f, "{element}[]"),
            other => write!(f, "{other:?}"),
        }
    }
}
