//! 解析契约

use infrastructure_common::{Reflect, TypeHandle};
use std::fmt;

/// 解析契约: 类型与可选名称
///
/// 名称为空的契约是该类型的默认注册。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Contract {
    type_handle: TypeHandle,
    name: Option<String>,
}

impl Contract {
    /// 创建契约
    pub fn new(type_handle: TypeHandle, name: Option<String>) -> Self {
        Self { type_handle, name }
    }

    /// 类型 `T` 的默认契约
    pub fn of<T: ?Sized + Reflect>() -> Self {
        Self::new(T::type_handle(), None)
    }

    /// 类型 `T` 的命名契约
    pub fn named<T: ?Sized + Reflect>(name: impl Into<String>) -> Self {
        Self::new(T::type_handle(), Some(name.into()))
    }

    /// 契约类型
    pub fn type_handle(&self) -> &TypeHandle {
        &self.type_handle
    }

    /// 契约名称
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// 是否为默认契约
    pub fn is_default(&self) -> bool {
        self.name.is_none()
    }

    /// 替换类型，保留名称
    #[must_use]
    pub fn with_type(&self, type_handle: TypeHandle) -> Self {
        Self::new(type_handle, self.name.clone())
    }
}

impl fmt::Display for Contract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} (名称: {name})", self.type_handle),
            None => write!(f, "{}", self.type_handle),
        }
    }
}
