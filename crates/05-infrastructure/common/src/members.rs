//! 成员元数据
//!
//! 构造函数、属性、方法、字段与参数的描述，以及调用它们时使用的参数视图。

use crate::catalog;
use crate::errors::{ConstructionError, ConstructionResult};
use crate::instance::{Instance, InstanceList, LazyInstances};
use crate::metadata::TypeHandle;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// 类型擦除的构造函数
pub type ConstructFn =
    Arc<dyn Fn(&Arguments) -> ConstructionResult<Box<dyn Any + Send + Sync>> + Send + Sync>;

/// 类型擦除的成员调用（属性/字段赋值、方法调用）
pub type MemberFn =
    Arc<dyn Fn(&mut (dyn Any + Send + Sync), &Arguments) -> ConstructionResult<()> + Send + Sync>;

/// 依赖标记
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyAttribute {
    /// 依赖的注册名称
    pub name: Option<String>,
    /// 是否为可选依赖
    pub optional: bool,
}

impl DependencyAttribute {
    /// 必需依赖
    pub fn required() -> Self {
        Self::default()
    }

    /// 可选依赖
    pub fn optional() -> Self {
        Self {
            name: None,
            optional: true,
        }
    }

    /// 指定注册名称
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// 默认值
#[derive(Clone)]
pub enum DefaultValue {
    /// 空
    Null,
    /// 具体值
    Value(Instance),
}

impl DefaultValue {
    /// 从具体值创建
    pub fn of<T: Send + Sync + 'static>(value: T) -> Self {
        Self::Value(Arc::new(value))
    }

    /// 转换为可空实例
    pub fn to_instance(&self) -> Option<Instance> {
        match self {
            Self::Null => None,
            Self::Value(value) => Some(value.clone()),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("Null"),
            Self::Value(_) => f.write_str("Value(..)"),
        }
    }
}

/// 参数传递方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParameterKind {
    /// 按值
    #[default]
    In,
    /// 引用
    Ref,
    /// 输出
    Out,
}

/// 参数描述
#[derive(Debug, Clone)]
pub struct ParameterInfo {
    /// 参数名
    pub name: String,
    /// 参数类型
    pub parameter_type: TypeHandle,
    /// 传递方式
    pub kind: ParameterKind,
    /// 语言层面的参数默认值
    pub default_value: Option<DefaultValue>,
    /// `[DefaultValue]` 等价标注，优先于参数默认值
    pub default_value_attribute: Option<DefaultValue>,
    /// 依赖标记
    pub dependency: Option<DependencyAttribute>,
}

impl ParameterInfo {
    /// 创建按值参数
    pub fn new(name: impl Into<String>, parameter_type: TypeHandle) -> Self {
        Self {
            name: name.into(),
            parameter_type,
            kind: ParameterKind::In,
            default_value: None,
            default_value_attribute: None,
            dependency: None,
        }
    }

    /// 设置传递方式
    #[must_use]
    pub fn with_kind(mut self, kind: ParameterKind) -> Self {
        self.kind = kind;
        self
    }

    /// 设置参数默认值
    #[must_use]
    pub fn with_default(mut self, value: DefaultValue) -> Self {
        self.default_value = Some(value);
        self
    }

    /// 设置默认值标注
    #[must_use]
    pub fn with_default_attribute(mut self, value: DefaultValue) -> Self {
        self.default_value_attribute = Some(value);
        self
    }

    /// 设置依赖标记
    #[must_use]
    pub fn with_dependency(mut self, dependency: DependencyAttribute) -> Self {
        self.dependency = Some(dependency);
        self
    }

    /// 是否按引用传递
    pub fn is_by_ref(&self) -> bool {
        self.kind != ParameterKind::In
    }
}

/// 构造函数描述
#[derive(Clone)]
pub struct ConstructorInfo {
    /// 参数列表
    pub parameters: Vec<ParameterInfo>,
    /// 是否标记为注入构造函数
    pub is_injection_constructor: bool,
    /// 是否公共
    pub is_public: bool,
    invoke: ConstructFn,
}

impl ConstructorInfo {
    /// 创建公共构造函数
    pub fn new<T, F>(parameters: Vec<ParameterInfo>, construct: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&Arguments) -> ConstructionResult<T> + Send + Sync + 'static,
    {
        Self {
            parameters,
            is_injection_constructor: false,
            is_public: true,
            invoke: Arc::new(move |arguments| {
                construct(arguments).map(|value| Box::new(value) as Box<dyn Any + Send + Sync>)
            }),
        }
    }

    /// 标记为注入构造函数
    #[must_use]
    pub fn injection_constructor(mut self) -> Self {
        self.is_injection_constructor = true;
        self
    }

    /// 标记为非公共
    #[must_use]
    pub fn non_public(mut self) -> Self {
        self.is_public = false;
        self
    }

    /// 调用构造函数
    pub fn invoke(&self, arguments: &Arguments) -> ConstructionResult<Box<dyn Any + Send + Sync>> {
        (self.invoke)(arguments)
    }

    /// 参数签名（诊断用）
    pub fn signature(&self) -> String {
        signature(&self.parameters)
    }
}

impl fmt::Debug for ConstructorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstructorInfo")
            .field("signature", &self.signature())
            .field("is_injection_constructor", &self.is_injection_constructor)
            .field("is_public", &self.is_public)
            .finish_non_exhaustive()
    }
}

fn erase_member<T, F>(member: String, call: F) -> MemberFn
where
    T: Send + Sync + 'static,
    F: Fn(&mut T, &Arguments) -> ConstructionResult<()> + Send + Sync + 'static,
{
    Arc::new(move |target, arguments| {
        let this = target
            .downcast_mut::<T>()
            .ok_or_else(|| ConstructionError::TargetMismatch {
                expected: std::any::type_name::<T>().to_string(),
                member: member.clone(),
            })?;
        call(this, arguments)
    })
}

/// 属性描述
#[derive(Clone)]
pub struct PropertyInfo {
    /// 属性名
    pub name: String,
    /// 属性类型
    pub property_type: TypeHandle,
    /// 是否静态
    pub is_static: bool,
    /// 是否为索引器
    pub is_indexer: bool,
    /// 是否可写
    pub can_write: bool,
    /// 依赖标记
    pub dependency: Option<DependencyAttribute>,
    setter: MemberFn,
}

impl PropertyInfo {
    /// 创建可写实例属性，`setter` 收到单个参数
    pub fn new<T, F>(name: impl Into<String>, property_type: TypeHandle, setter: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&mut T, &Arguments) -> ConstructionResult<()> + Send + Sync + 'static,
    {
        let name = name.into();
        Self {
            setter: erase_member(name.clone(), setter),
            name,
            property_type,
            is_static: false,
            is_indexer: false,
            can_write: true,
            dependency: None,
        }
    }

    /// 设置依赖标记
    #[must_use]
    pub fn with_dependency(mut self, dependency: DependencyAttribute) -> Self {
        self.dependency = Some(dependency);
        self
    }

    /// 标记为静态
    #[must_use]
    pub fn static_member(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// 标记为索引器
    #[must_use]
    pub fn indexer(mut self) -> Self {
        self.is_indexer = true;
        self
    }

    /// 标记为只读
    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.can_write = false;
        self
    }

    /// 赋值
    pub fn set(&self, target: &mut (dyn Any + Send + Sync), value: Option<Instance>) -> ConstructionResult<()> {
        (self.setter)(target, &Arguments::new(vec![value]))
    }
}

impl fmt::Debug for PropertyInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyInfo")
            .field("name", &self.name)
            .field("property_type", &self.property_type)
            .field("dependency", &self.dependency)
            .finish_non_exhaustive()
    }
}

/// 字段描述
#[derive(Clone)]
pub struct FieldInfo {
    /// 字段名
    pub name: String,
    /// 字段类型
    pub field_type: TypeHandle,
    /// 是否静态
    pub is_static: bool,
    /// 是否只读
    pub is_read_only: bool,
    /// 依赖标记
    pub dependency: Option<DependencyAttribute>,
    setter: MemberFn,
}

impl FieldInfo {
    /// 创建可写实例字段，`setter` 收到单个参数
    pub fn new<T, F>(name: impl Into<String>, field_type: TypeHandle, setter: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&mut T, &Arguments) -> ConstructionResult<()> + Send + Sync + 'static,
    {
        let name = name.into();
        Self {
            setter: erase_member(name.clone(), setter),
            name,
            field_type,
            is_static: false,
            is_read_only: false,
            dependency: None,
        }
    }

    /// 设置依赖标记
    #[must_use]
    pub fn with_dependency(mut self, dependency: DependencyAttribute) -> Self {
        self.dependency = Some(dependency);
        self
    }

    /// 标记为静态
    #[must_use]
    pub fn static_member(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// 标记为只读
    #[must_use]
    pub fn read_only(mut self) -> Self {
        self.is_read_only = true;
        self
    }

    /// 赋值
    pub fn set(&self, target: &mut (dyn Any + Send + Sync), value: Option<Instance>) -> ConstructionResult<()> {
        (self.setter)(target, &Arguments::new(vec![value]))
    }
}

impl fmt::Debug for FieldInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldInfo")
            .field("name", &self.name)
            .field("field_type", &self.field_type)
            .field("dependency", &self.dependency)
            .finish_non_exhaustive()
    }
}

/// 方法描述
#[derive(Clone)]
pub struct MethodInfo {
    /// 方法名
    pub name: String,
    /// 参数列表
    pub parameters: Vec<ParameterInfo>,
    /// 是否静态
    pub is_static: bool,
    /// 是否公共
    pub is_public: bool,
    /// 是否为开放泛型方法
    pub is_generic_definition: bool,
    /// 是否标记为注入方法
    pub is_injection_method: bool,
    invoke: MemberFn,
}

impl MethodInfo {
    /// 创建公共实例方法
    pub fn new<T, F>(name: impl Into<String>, parameters: Vec<ParameterInfo>, invoke: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&mut T, &Arguments) -> ConstructionResult<()> + Send + Sync + 'static,
    {
        let name = name.into();
        Self {
            invoke: erase_member(name.clone(), invoke),
            name,
            parameters,
            is_static: false,
            is_public: true,
            is_generic_definition: false,
            is_injection_method: false,
        }
    }

    /// 标记为注入方法
    #[must_use]
    pub fn injection_method(mut self) -> Self {
        self.is_injection_method = true;
        self
    }

    /// 标记为静态
    #[must_use]
    pub fn static_member(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// 标记为非公共
    #[must_use]
    pub fn non_public(mut self) -> Self {
        self.is_public = false;
        self
    }

    /// 标记为开放泛型方法
    #[must_use]
    pub fn generic_definition(mut self) -> Self {
        self.is_generic_definition = true;
        self
    }

    /// 调用方法
    pub fn invoke(&self, target: &mut (dyn Any + Send + Sync), arguments: &Arguments) -> ConstructionResult<()> {
        (self.invoke)(target, arguments)
    }

    /// 参数签名（诊断用）
    pub fn signature(&self) -> String {
        format!("{}{}", self.name, signature(&self.parameters))
    }
}

impl fmt::Debug for MethodInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodInfo")
            .field("signature", &self.signature())
            .field("is_injection_method", &self.is_injection_method)
            .finish_non_exhaustive()
    }
}

fn signature(parameters: &[ParameterInfo]) -> String {
    let names: Vec<String> = parameters
        .iter()
        .map(|parameter| format!("{}: {}", parameter.name, parameter.parameter_type.short_name()))
        .collect();
    format!("({})", names.join(", "))
}

/// 成员调用时的参数视图
///
/// 每个位置保存一个可空实例。
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    values: Vec<Option<Instance>>,
}

impl Arguments {
    /// 创建参数视图
    pub fn new(values: Vec<Option<Instance>>) -> Self {
        Self { values }
    }

    /// 参数个数
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// 是否没有参数
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// 原始可空实例
    pub fn raw(&self, position: usize) -> ConstructionResult<Option<&Instance>> {
        self.values
            .get(position)
            .map(Option::as_ref)
            .ok_or(ConstructionError::MissingArgument { position })
    }

    /// 非空实例
    pub fn instance(&self, position: usize) -> ConstructionResult<Instance> {
        self.raw(position)?
            .cloned()
            .ok_or_else(|| ConstructionError::NullArgument {
                position,
                expected: "实例".to_string(),
            })
    }

    /// 具体类型的共享指针
    pub fn get<T: Send + Sync + 'static>(&self, position: usize) -> ConstructionResult<Arc<T>> {
        self.optional::<T>(position)?
            .ok_or_else(|| ConstructionError::NullArgument {
                position,
                expected: std::any::type_name::<T>().to_string(),
            })
    }

    /// 可空的具体类型共享指针
    pub fn optional<T: Send + Sync + 'static>(&self, position: usize) -> ConstructionResult<Option<Arc<T>>> {
        match self.raw(position)? {
            None => Ok(None),
            Some(instance) => instance
                .clone()
                .downcast::<T>()
                .map(Some)
                .map_err(|_| ConstructionError::argument_mismatch(position, std::any::type_name::<T>())),
        }
    }

    /// 值类型的副本
    pub fn value<T: Clone + Send + Sync + 'static>(&self, position: usize) -> ConstructionResult<T> {
        self.optional_value::<T>(position)?
            .ok_or_else(|| ConstructionError::NullArgument {
                position,
                expected: std::any::type_name::<T>().to_string(),
            })
    }

    /// 可空值类型的副本
    pub fn optional_value<T: Clone + Send + Sync + 'static>(&self, position: usize) -> ConstructionResult<Option<T>> {
        match self.raw(position)? {
            None => Ok(None),
            Some(instance) => instance
                .downcast_ref::<T>()
                .cloned()
                .map(Some)
                .ok_or_else(|| ConstructionError::argument_mismatch(position, std::any::type_name::<T>())),
        }
    }

    /// 接口（trait 对象）的共享指针
    pub fn service<I: ?Sized + Send + Sync + 'static>(&self, position: usize) -> ConstructionResult<Arc<I>> {
        self.optional_service::<I>(position)?
            .ok_or_else(|| ConstructionError::NullArgument {
                position,
                expected: std::any::type_name::<I>().to_string(),
            })
    }

    /// 可空接口的共享指针
    pub fn optional_service<I: ?Sized + Send + Sync + 'static>(
        &self,
        position: usize,
    ) -> ConstructionResult<Option<Arc<I>>> {
        match self.raw(position)? {
            None => Ok(None),
            Some(instance) => catalog::cast::<I>(instance)
                .map(Some)
                .ok_or_else(|| ConstructionError::argument_mismatch(position, std::any::type_name::<I>())),
        }
    }

    /// 数组或序列参数中的全部元素
    pub fn services<I: ?Sized + Send + Sync + 'static>(&self, position: usize) -> ConstructionResult<Vec<Arc<I>>> {
        let instance = self.instance(position)?;
        let elements: InstanceList = if let Some(list) = instance.downcast_ref::<InstanceList>() {
            list.clone()
        } else if let Some(lazy) = instance.downcast_ref::<LazyInstances>() {
            lazy.collect_all()
                .map_err(|error| ConstructionError::invocation(format!("#{position}"), error.to_string()))?
        } else {
            return Err(ConstructionError::argument_mismatch(
                position,
                format!("[{}]", std::any::type_name::<I>()),
            ));
        };

        elements
            .iter()
            .map(|element| {
                catalog::cast::<I>(element)
                    .ok_or_else(|| ConstructionError::argument_mismatch(position, std::any::type_name::<I>()))
            })
            .collect()
    }
}
