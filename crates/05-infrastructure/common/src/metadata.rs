//! 元数据定义
//!
//! 提供可解析类型的运行时身份。Rust 没有运行时反射，类型句柄显式携带
//! 类型种类、默认值工厂与描述函数。

use crate::catalog;
use crate::descriptor::TypeDescriptor;
use crate::instance::Instance;
use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// 类型身份（结构化相等）
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeIdentity {
    /// 原生 Rust 类型
    Native(TypeId),
    /// 数组类型
    Array {
        /// 元素类型
        element: Box<TypeIdentity>,
        /// 维数
        rank: usize,
    },
    /// 只读序列
    Enumerable(Box<TypeIdentity>),
}

/// 类型种类
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    /// 可构造的具体类型
    Class,
    /// 抽象类型（仅能通过映射或 BuildUp 使用）
    Abstract,
    /// 接口（trait 对象）
    Interface,
    /// 委托（闭包类型）
    Delegate,
    /// 文本
    Text,
    /// 值类型
    Value {
        /// 是否可空
        nullable: bool,
    },
    /// 数组
    Array {
        /// 元素类型
        element: TypeHandle,
        /// 维数
        rank: usize,
    },
    /// 只读序列
    Enumerable {
        /// 元素类型
        element: TypeHandle,
    },
}

impl TypeKind {
    /// 是否接受空值
    pub const fn accepts_null(&self) -> bool {
        !matches!(self, Self::Value { nullable: false })
    }
}

/// 开放泛型定义
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GenericDefinition {
    name: &'static str,
    arity: usize,
}

impl GenericDefinition {
    /// 创建开放泛型定义
    pub const fn new(name: &'static str, arity: usize) -> Self {
        Self { name, arity }
    }

    /// 定义名称
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// 泛型参数个数
    pub const fn arity(&self) -> usize {
        self.arity
    }
}

impl fmt::Display for GenericDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<{}>", self.name, ",".repeat(self.arity.saturating_sub(1)))
    }
}

/// 封闭泛型的定义与实参
#[derive(Debug, Clone)]
pub struct GenericInstance {
    /// 开放定义
    pub definition: GenericDefinition,
    /// 泛型实参
    pub arguments: Vec<TypeHandle>,
}

#[derive(Clone)]
struct TypeShape {
    identity: TypeIdentity,
    name: String,
    kind: TypeKind,
    describe: Option<fn() -> TypeDescriptor>,
    default_value: Option<fn() -> Instance>,
    generic: Option<GenericInstance>,
}

/// 类型句柄
///
/// 相等性只比较 [`TypeIdentity`]。
#[derive(Clone)]
pub struct TypeHandle(Arc<TypeShape>);

fn default_instance<T: Default + Send + Sync + 'static>() -> Instance {
    Arc::new(T::default())
}

impl TypeHandle {
    fn native<T: ?Sized + 'static>(kind: TypeKind) -> Self {
        Self(Arc::new(TypeShape {
            identity: TypeIdentity::Native(TypeId::of::<T>()),
            name: std::any::type_name::<T>().to_string(),
            kind,
            describe: None,
            default_value: None,
            generic: None,
        }))
    }

    /// 可构造类型
    pub fn class<T: crate::descriptor::Injectable>() -> Self {
        let mut handle = Self::native::<T>(TypeKind::Class);
        Arc::make_mut(&mut handle.0).describe = Some(T::describe);
        handle
    }

    /// 抽象类型
    pub fn abstract_class<T: crate::descriptor::Injectable>() -> Self {
        let mut handle = Self::native::<T>(TypeKind::Abstract);
        Arc::make_mut(&mut handle.0).describe = Some(T::describe);
        handle
    }

    /// 接口类型（通常是 `dyn Trait`）
    pub fn interface<I: ?Sized + 'static>() -> Self {
        Self::native::<I>(TypeKind::Interface)
    }

    /// 委托类型
    pub fn delegate<F: ?Sized + 'static>() -> Self {
        Self::native::<F>(TypeKind::Delegate)
    }

    /// 文本类型
    pub fn text<T: 'static>() -> Self {
        Self::native::<T>(TypeKind::Text)
    }

    /// 不可空值类型，默认值为 `T::default()`
    pub fn value<T: Default + Send + Sync + 'static>() -> Self {
        let mut handle = Self::native::<T>(TypeKind::Value { nullable: false });
        Arc::make_mut(&mut handle.0).default_value = Some(default_instance::<T>);
        handle
    }

    /// 可空值类型，默认值为空
    pub fn nullable<T: 'static>() -> Self {
        Self::native::<T>(TypeKind::Value { nullable: true })
    }

    /// 数组类型
    pub fn array(element: Self, rank: usize) -> Self {
        let brackets = ",".repeat(rank.saturating_sub(1));
        Self(Arc::new(TypeShape {
            identity: TypeIdentity::Array {
                element: Box::new(element.identity().clone()),
                rank,
            },
            name: format!("{}[{brackets}]", element.name()),
            kind: TypeKind::Array { element, rank },
            describe: None,
            default_value: None,
            generic: None,
        }))
    }

    /// 只读序列类型
    pub fn enumerable(element: Self) -> Self {
        Self(Arc::new(TypeShape {
            identity: TypeIdentity::Enumerable(Box::new(element.identity().clone())),
            name: format!("Enumerable<{}>", element.name()),
            kind: TypeKind::Enumerable { element },
            describe: None,
            default_value: None,
            generic: None,
        }))
    }

    /// 标记为某个开放泛型的封闭实例
    #[must_use]
    pub fn closing(mut self, definition: GenericDefinition, arguments: Vec<Self>) -> Self {
        Arc::make_mut(&mut self.0).generic = Some(GenericInstance {
            definition,
            arguments,
        });
        self
    }

    /// 从 [`Reflect`] 实现获取句柄
    pub fn of<T: ?Sized + Reflect>() -> Self {
        T::type_handle()
    }

    /// 类型身份
    pub fn identity(&self) -> &TypeIdentity {
        &self.0.identity
    }

    /// 完整类型名称
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// 获取简短的类型名称（不包含模块路径）
    pub fn short_name(&self) -> &str {
        let name = self.0.name.split('<').next().unwrap_or(&self.0.name);
        let start = name.rfind("::").map_or(0, |index| index + 2);
        &self.0.name[start..]
    }

    /// 类型种类
    pub fn kind(&self) -> &TypeKind {
        &self.0.kind
    }

    /// 原生 `TypeId`（数组与序列没有）
    pub fn type_id(&self) -> Option<TypeId> {
        match &self.0.identity {
            TypeIdentity::Native(id) => Some(*id),
            _ => None,
        }
    }

    /// 封闭泛型信息
    pub fn generic(&self) -> Option<&GenericInstance> {
        self.0.generic.as_ref()
    }

    /// 类型描述函数
    pub fn describer(&self) -> Option<fn() -> TypeDescriptor> {
        self.0.describe
    }

    /// 类型描述（首次访问时构建并缓存）
    pub fn descriptor(&self) -> Option<Arc<TypeDescriptor>> {
        catalog::descriptor(self)
    }

    /// 语言层面的默认值: 值类型为 `T::default()`，其它为 `None`（空）
    pub fn default_value(&self) -> Option<Instance> {
        self.0.default_value.map(|create| create())
    }

    /// 数组或序列的元素类型
    pub fn element_type(&self) -> Option<&Self> {
        match &self.0.kind {
            TypeKind::Array { element, .. } | TypeKind::Enumerable { element } => Some(element),
            _ => None,
        }
    }

    /// `source` 类型的值能否赋给当前类型
    pub fn is_assignable_from(&self, source: &Self) -> bool {
        catalog::is_assignable(self, source)
    }
}

impl PartialEq for TypeHandle {
    fn eq(&self, other: &Self) -> bool {
        self.0.identity == other.0.identity
    }
}

impl Eq for TypeHandle {}

impl Hash for TypeHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.identity.hash(state);
    }
}

impl fmt::Debug for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TypeHandle").field(&self.0.name).finish()
    }
}

impl fmt::Display for TypeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.name)
    }
}

/// 类型句柄提供者
///
/// 值类型、文本与 `Option<T>` 已内置实现；结构体通过 `#[derive(Injectable)]`
/// 实现；接口通过 [`reflect_interface!`](crate::reflect_interface) 声明。
pub trait Reflect: 'static {
    /// 当前类型的句柄
    fn type_handle() -> TypeHandle;
}

macro_rules! reflect_value_types {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Reflect for $ty {
                fn type_handle() -> TypeHandle {
                    catalog::intern::<$ty>(TypeHandle::value::<$ty>)
                }
            }
        )*
    };
}

reflect_value_types!(
    bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64
);

impl Reflect for String {
    fn type_handle() -> TypeHandle {
        catalog::intern::<Self>(TypeHandle::text::<Self>)
    }
}

impl Reflect for &'static str {
    fn type_handle() -> TypeHandle {
        catalog::intern::<Self>(TypeHandle::text::<Self>)
    }
}

impl<T: Reflect + Send + Sync> Reflect for Option<T> {
    fn type_handle() -> TypeHandle {
        catalog::intern::<Self>(TypeHandle::nullable::<Self>)
    }
}

/// 为 trait 对象声明 [`Reflect`] 实现
///
/// # 示例
///
/// ```rust
/// use infrastructure_common::reflect_interface;
///
/// pub trait Greeter: Send + Sync {
///     fn greet(&self) -> String;
/// }
///
/// reflect_interface!(dyn Greeter);
/// ```
#[macro_export]
macro_rules! reflect_interface {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl $crate::Reflect for $ty {
                fn type_handle() -> $crate::TypeHandle {
                    $crate::catalog::intern::<$ty>($crate::TypeHandle::interface::<$ty>)
                }
            }
        )+
    };
}
