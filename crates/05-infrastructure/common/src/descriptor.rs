//! 类型描述
//!
//! 类型描述是"导入描述提供者"的数据来源：容器据此选择构造函数与注入成员。

use crate::errors::ConstructionResult;
use crate::instance::Instance;
use crate::lifecycle::Disposable;
use crate::members::{Arguments, ConstructorInfo, FieldInfo, MethodInfo, ParameterInfo, PropertyInfo};
use crate::metadata::{Reflect, TypeHandle};
use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// 类型擦除的接口转换函数，返回装箱的 `Arc<dyn Interface>`
pub type CastFn = Arc<dyn Fn(Instance) -> Option<Box<dyn Any + Send + Sync>> + Send + Sync>;

/// 类型擦除的释放函数
pub type Disposer = Arc<dyn Fn(&Instance) + Send + Sync>;

/// 类型描述提供者
///
/// 通常由 `#[derive(Injectable)]` 生成。
pub trait Injectable: Reflect + Send + Sync {
    /// 描述当前类型的成员
    fn describe() -> TypeDescriptor;
}

/// 已实现的接口
#[derive(Clone)]
pub struct InterfaceImpl {
    /// 接口类型
    pub interface: TypeHandle,
    /// 转换函数
    pub cast: CastFn,
}

impl fmt::Debug for InterfaceImpl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("InterfaceImpl").field(&self.interface).finish()
    }
}

/// 类型描述
#[derive(Clone)]
pub struct TypeDescriptor {
    handle: TypeHandle,
    constructors: Vec<Arc<ConstructorInfo>>,
    properties: Vec<Arc<PropertyInfo>>,
    methods: Vec<Arc<MethodInfo>>,
    fields: Vec<Arc<FieldInfo>>,
    interfaces: Vec<InterfaceImpl>,
    disposer: Option<Disposer>,
}

impl TypeDescriptor {
    /// 为类型 `T` 创建描述构建器
    pub fn builder<T: Reflect + Send + Sync>() -> DescriptorBuilder<T> {
        DescriptorBuilder {
            descriptor: Self {
                handle: T::type_handle(),
                constructors: Vec::new(),
                properties: Vec::new(),
                methods: Vec::new(),
                fields: Vec::new(),
                interfaces: Vec::new(),
                disposer: None,
            },
            _marker: PhantomData,
        }
    }

    /// 被描述的类型
    pub fn handle(&self) -> &TypeHandle {
        &self.handle
    }

    /// 构造函数（声明顺序）
    pub fn constructors(&self) -> &[Arc<ConstructorInfo>] {
        &self.constructors
    }

    /// 属性（声明顺序）
    pub fn properties(&self) -> &[Arc<PropertyInfo>] {
        &self.properties
    }

    /// 方法（声明顺序）
    pub fn methods(&self) -> &[Arc<MethodInfo>] {
        &self.methods
    }

    /// 字段（声明顺序）
    pub fn fields(&self) -> &[Arc<FieldInfo>] {
        &self.fields
    }

    /// 已实现的接口
    pub fn interfaces(&self) -> &[InterfaceImpl] {
        &self.interfaces
    }

    /// 释放函数
    pub fn disposer(&self) -> Option<&Disposer> {
        self.disposer.as_ref()
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("handle", &self.handle)
            .field("constructors", &self.constructors.len())
            .field("properties", &self.properties.len())
            .field("methods", &self.methods.len())
            .field("fields", &self.fields.len())
            .field("interfaces", &self.interfaces)
            .field("disposable", &self.disposer.is_some())
            .finish()
    }
}

/// 类型描述构建器
pub struct DescriptorBuilder<T> {
    descriptor: TypeDescriptor,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Reflect + Send + Sync> DescriptorBuilder<T> {
    /// 添加公共构造函数
    #[must_use]
    pub fn constructor<F>(self, parameters: Vec<ParameterInfo>, construct: F) -> Self
    where
        F: Fn(&Arguments) -> ConstructionResult<T> + Send + Sync + 'static,
    {
        self.with_constructor(ConstructorInfo::new(parameters, construct))
    }

    /// 添加标记为注入构造函数的公共构造函数
    #[must_use]
    pub fn injection_constructor<F>(self, parameters: Vec<ParameterInfo>, construct: F) -> Self
    where
        F: Fn(&Arguments) -> ConstructionResult<T> + Send + Sync + 'static,
    {
        self.with_constructor(ConstructorInfo::new(parameters, construct).injection_constructor())
    }

    /// 添加无参构造函数
    #[must_use]
    pub fn default_constructor(self) -> Self
    where
        T: Default,
    {
        self.constructor(Vec::new(), |_| Ok(T::default()))
    }

    /// 添加构造函数描述
    #[must_use]
    pub fn with_constructor(mut self, constructor: ConstructorInfo) -> Self {
        self.descriptor.constructors.push(Arc::new(constructor));
        self
    }

    /// 添加属性描述
    #[must_use]
    pub fn property(mut self, property: PropertyInfo) -> Self {
        self.descriptor.properties.push(Arc::new(property));
        self
    }

    /// 添加方法描述
    #[must_use]
    pub fn method(mut self, method: MethodInfo) -> Self {
        self.descriptor.methods.push(Arc::new(method));
        self
    }

    /// 添加字段描述
    #[must_use]
    pub fn field(mut self, field: FieldInfo) -> Self {
        self.descriptor.fields.push(Arc::new(field));
        self
    }

    /// 声明实现了接口 `I`
    #[must_use]
    pub fn implements<I>(mut self, cast: impl Fn(Arc<T>) -> Arc<I> + Send + Sync + 'static) -> Self
    where
        I: ?Sized + Reflect + Send + Sync,
    {
        let cast: CastFn = Arc::new(move |instance: Instance| {
            let concrete = instance.downcast::<T>().ok()?;
            Some(Box::new(cast(concrete)) as Box<dyn Any + Send + Sync>)
        });
        self.descriptor.interfaces.push(InterfaceImpl {
            interface: I::type_handle(),
            cast,
        });
        self
    }

    /// 声明容器释放作用域时需要释放该类型的实例
    #[must_use]
    pub fn disposable(mut self) -> Self
    where
        T: Disposable,
    {
        self.descriptor.disposer = Some(Arc::new(|instance: &Instance| {
            if let Some(value) = instance.downcast_ref::<T>() {
                value.dispose();
            }
        }));
        self
    }

    /// 完成描述
    pub fn build(self) -> TypeDescriptor {
        self.descriptor
    }
}
