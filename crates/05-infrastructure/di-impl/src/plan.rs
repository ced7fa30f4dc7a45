//! 构建计划
//!
//! 为一个实现类型选择构造函数与需要注入的字段、属性、方法，并为每个参数或成员准备导入描述。
//! 计划在注册管理器首次构建管线时生成，之后每次解析复用。

use crate::matching::{describe_values, select_best};
use di_abstractions::{ImportDescriptor, InjectionMember, InjectionValue};
use infrastructure_common::{
    ConstructionError, ConstructorInfo, DependencyError, FieldInfo, MethodInfo, ParameterInfo, PropertyInfo,
    RegistrationError, RegistrationResult, TypeDescriptor, TypeHandle, TypeKind,
};
use std::sync::Arc;
use tracing::trace;

/// 构造函数无法选出的原因
///
/// 推迟到真正需要构造时才报告，对已有实例注入成员时不受影响。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstructorFault {
    /// 类型本身不可构造
    Construction(ConstructionError),
    /// 构造函数声明有问题
    Registration(RegistrationError),
}

impl From<ConstructorFault> for DependencyError {
    fn from(fault: ConstructorFault) -> Self {
        match fault {
            ConstructorFault::Construction(error) => error.into(),
            ConstructorFault::Registration(error) => error.into(),
        }
    }
}

/// 选中的构造函数
#[derive(Debug)]
pub struct SelectedConstructor {
    /// 构造函数
    pub info: Arc<ConstructorInfo>,
    /// 每个参数的导入描述
    pub imports: Vec<ImportDescriptor>,
    /// 是否有参数以被构建的类型自身为类型
    pub self_referencing: bool,
}

/// 选中的字段
#[derive(Debug)]
pub struct SelectedField {
    /// 字段
    pub info: Arc<FieldInfo>,
    /// 导入描述
    pub import: ImportDescriptor,
}

/// 选中的属性
#[derive(Debug)]
pub struct SelectedProperty {
    /// 属性
    pub info: Arc<PropertyInfo>,
    /// 导入描述
    pub import: ImportDescriptor,
}

/// 选中的方法
#[derive(Debug)]
pub struct SelectedMethod {
    /// 方法
    pub info: Arc<MethodInfo>,
    /// 每个参数的导入描述
    pub imports: Vec<ImportDescriptor>,
}

/// 构建计划
#[derive(Debug)]
pub struct BuildPlan {
    type_handle: TypeHandle,
    constructor: Result<SelectedConstructor, ConstructorFault>,
    fields: Vec<SelectedField>,
    properties: Vec<SelectedProperty>,
    methods: Vec<SelectedMethod>,
}

impl BuildPlan {
    /// 为实现类型生成计划
    ///
    /// 注入成员声明有问题时立即返回注册错误；构造函数的问题记录在计划中。
    pub fn select(type_handle: &TypeHandle, members: &[InjectionMember]) -> RegistrationResult<Self> {
        let descriptor = type_handle.descriptor();
        let injected_constructor = members.iter().rev().find_map(|member| match member {
            InjectionMember::Constructor(values) => Some(values.as_slice()),
            _ => None,
        });

        let constructor = match (type_handle.kind(), descriptor.as_deref()) {
            (TypeKind::Interface, _) => Err(ConstructorFault::Construction(ConstructionError::CannotConstructInterface {
                type_name: type_handle.name().to_string(),
            })),
            (TypeKind::Abstract, _) => Err(ConstructorFault::Construction(
                ConstructionError::CannotConstructAbstractClass {
                    type_name: type_handle.name().to_string(),
                },
            )),
            (TypeKind::Delegate, _) => Err(ConstructorFault::Construction(ConstructionError::CannotConstructDelegate {
                type_name: type_handle.name().to_string(),
            })),
            (TypeKind::Class, Some(descriptor)) => select_constructor(type_handle, descriptor, injected_constructor),
            (TypeKind::Class, None) => Err(ConstructorFault::Construction(ConstructionError::TypeNotDescribed {
                type_name: type_handle.name().to_string(),
            })),
            _ => Err(ConstructorFault::Construction(ConstructionError::TypeIsNotConstructable {
                type_name: type_handle.name().to_string(),
            })),
        };

        let mut plan = Self {
            type_handle: type_handle.clone(),
            constructor,
            fields: Vec::new(),
            properties: Vec::new(),
            methods: Vec::new(),
        };
        if let Some(descriptor) = descriptor {
            plan.select_members(&descriptor, members)?;
        } else if let Some(member) = members.iter().find(|member| !matches!(member, InjectionMember::Constructor(_))) {
            return Err(RegistrationError::member_not_found(type_handle.name(), member_name(member)));
        }

        trace!(
            "生成构建计划: {}, 字段 {}, 属性 {}, 方法 {}",
            type_handle,
            plan.fields.len(),
            plan.properties.len(),
            plan.methods.len()
        );
        Ok(plan)
    }

    /// 被构建的类型
    pub fn type_handle(&self) -> &TypeHandle {
        &self.type_handle
    }

    /// 选中的构造函数
    pub fn constructor(&self) -> Result<&SelectedConstructor, &ConstructorFault> {
        self.constructor.as_ref()
    }

    /// 选中的字段（声明顺序）
    pub fn fields(&self) -> &[SelectedField] {
        &self.fields
    }

    /// 选中的属性（声明顺序）
    pub fn properties(&self) -> &[SelectedProperty] {
        &self.properties
    }

    /// 选中的方法
    pub fn methods(&self) -> &[SelectedMethod] {
        &self.methods
    }

    /// 计划中的注册错误（构造函数声明问题）
    pub fn registration_error(&self) -> Option<&RegistrationError> {
        match &self.constructor {
            Err(ConstructorFault::Registration(error)) => Some(error),
            _ => None,
        }
    }

    fn select_members(&mut self, descriptor: &TypeDescriptor, members: &[InjectionMember]) -> RegistrationResult<()> {
        let type_name = self.type_handle.name().to_string();

        // 注册时显式提供的成员优先
        for member in members {
            match member {
                InjectionMember::Constructor(_) => {}
                InjectionMember::Field { name, value } => {
                    let info = descriptor
                        .fields()
                        .iter()
                        .find(|field| &field.name == name)
                        .ok_or_else(|| RegistrationError::member_not_found(&type_name, name))?;
                    validate_field(&type_name, info)?;
                    let mut import = ImportDescriptor::field(&self.type_handle, info);
                    if let Some(value) = value {
                        import.apply(value);
                    }
                    self.fields.retain(|selected| selected.info.name != *name);
                    self.fields.push(SelectedField {
                        info: info.clone(),
                        import,
                    });
                }
                InjectionMember::Property { name, value } => {
                    let info = descriptor
                        .properties()
                        .iter()
                        .find(|property| &property.name == name)
                        .ok_or_else(|| RegistrationError::member_not_found(&type_name, name))?;
                    validate_property(&type_name, info)?;
                    let mut import = ImportDescriptor::property(&self.type_handle, info);
                    if let Some(value) = value {
                        import.apply(value);
                    }
                    self.properties.retain(|selected| selected.info.name != *name);
                    self.properties.push(SelectedProperty {
                        info: info.clone(),
                        import,
                    });
                }
                InjectionMember::Method { name, arguments } => {
                    let candidates: Vec<&Arc<MethodInfo>> =
                        descriptor.methods().iter().filter(|method| &method.name == name).collect();
                    if candidates.is_empty() {
                        return Err(RegistrationError::member_not_found(&type_name, name));
                    }
                    let info = select_best(candidates, |method| method.parameters.as_slice(), arguments)
                        .ok_or_else(|| {
                            RegistrationError::no_matching_member(
                                &type_name,
                                "方法",
                                format!("{name}{}", describe_values(arguments)),
                            )
                        })?;
                    validate_method(&type_name, info)?;
                    if self.methods.iter().any(|selected| Arc::ptr_eq(&selected.info, info)) {
                        return Err(RegistrationError::DuplicateInjectionMethod {
                            type_name,
                            member: info.signature(),
                        });
                    }
                    let imports = method_imports(&self.type_handle, &info.name, &info.parameters, Some(arguments));
                    self.methods.push(SelectedMethod {
                        info: info.clone(),
                        imports,
                    });
                }
            }
        }

        // 其余带依赖标记的成员
        for info in descriptor.fields() {
            if info.dependency.is_none() || self.fields.iter().any(|selected| selected.info.name == info.name) {
                continue;
            }
            validate_field(&type_name, info)?;
            self.fields.push(SelectedField {
                info: info.clone(),
                import: ImportDescriptor::field(&self.type_handle, info),
            });
        }
        for info in descriptor.properties() {
            if info.dependency.is_none() || self.properties.iter().any(|selected| selected.info.name == info.name) {
                continue;
            }
            validate_property(&type_name, info)?;
            self.properties.push(SelectedProperty {
                info: info.clone(),
                import: ImportDescriptor::property(&self.type_handle, info),
            });
        }
        for info in descriptor.methods() {
            if !info.is_injection_method || self.methods.iter().any(|selected| Arc::ptr_eq(&selected.info, info)) {
                continue;
            }
            validate_method(&type_name, info)?;
            self.methods.push(SelectedMethod {
                info: info.clone(),
                imports: method_imports(&self.type_handle, &info.name, &info.parameters, None),
            });
        }
        Ok(())
    }
}

fn select_constructor(
    type_handle: &TypeHandle,
    descriptor: &TypeDescriptor,
    injected: Option<&[InjectionValue]>,
) -> Result<SelectedConstructor, ConstructorFault> {
    let type_name = type_handle.name();
    let public: Vec<&Arc<ConstructorInfo>> = descriptor
        .constructors()
        .iter()
        .filter(|constructor| constructor.is_public)
        .collect();

    let (info, values) = if let Some(values) = injected {
        let info = select_best(public, |constructor| constructor.parameters.as_slice(), values).ok_or_else(|| {
            ConstructorFault::Registration(RegistrationError::no_matching_member(
                type_name,
                "构造函数",
                describe_values(values),
            ))
        })?;
        (info, Some(values))
    } else {
        let marked: Vec<&Arc<ConstructorInfo>> = public
            .iter()
            .copied()
            .filter(|constructor| constructor.is_injection_constructor)
            .collect();
        match marked.as_slice() {
            [single] => (*single, None),
            [_, _, ..] => {
                return Err(ConstructorFault::Registration(RegistrationError::MultipleInjectionConstructors {
                    type_name: type_name.to_string(),
                }));
            }
            [] => (longest(type_name, &public)?, None),
        }
    };

    if let Some(parameter) = info.parameters.iter().find(|parameter| parameter.is_by_ref()) {
        return Err(ConstructorFault::Registration(RegistrationError::RefParameter {
            type_name: type_name.to_string(),
            member: "new".to_string(),
            parameter: parameter.name.clone(),
        }));
    }

    Ok(SelectedConstructor {
        info: info.clone(),
        imports: method_imports(type_handle, "new", &info.parameters, values),
        self_referencing: info
            .parameters
            .iter()
            .any(|parameter| &parameter.parameter_type == type_handle),
    })
}

/// 参数最多的构造函数；最多参数个数相同时有歧义
fn longest<'c>(type_name: &str, candidates: &[&'c Arc<ConstructorInfo>]) -> Result<&'c Arc<ConstructorInfo>, ConstructorFault> {
    let mut sorted = candidates.to_vec();
    sorted.sort_by(|left, right| right.parameters.len().cmp(&left.parameters.len()));
    match sorted.as_slice() {
        [] => Err(ConstructorFault::Registration(RegistrationError::NoConstructorFound {
            type_name: type_name.to_string(),
        })),
        [first, second, ..] if first.parameters.len() == second.parameters.len() => Err(ConstructorFault::Registration(
            RegistrationError::AmbiguousInjectionConstructor {
                type_name: type_name.to_string(),
                parameter_count: first.parameters.len(),
            },
        )),
        [first, ..] => Ok(*first),
    }
}

fn method_imports(
    declaring_type: &TypeHandle,
    member: &str,
    parameters: &[ParameterInfo],
    values: Option<&[InjectionValue]>,
) -> Vec<ImportDescriptor> {
    parameters
        .iter()
        .enumerate()
        .map(|(position, parameter)| {
            let mut import = ImportDescriptor::parameter(declaring_type, member, parameter);
            if let Some(value) = values.and_then(|values| values.get(position)) {
                import.apply(value);
            }
            import
        })
        .collect()
}

fn validate_field(type_name: &str, info: &FieldInfo) -> RegistrationResult<()> {
    if info.is_static {
        return Err(RegistrationError::StaticMember {
            type_name: type_name.to_string(),
            member: info.name.clone(),
        });
    }
    if info.is_read_only {
        return Err(RegistrationError::ReadOnlyMember {
            type_name: type_name.to_string(),
            member: info.name.clone(),
        });
    }
    Ok(())
}

fn validate_property(type_name: &str, info: &PropertyInfo) -> RegistrationResult<()> {
    let member = info.name.clone();
    let type_name = type_name.to_string();
    if info.is_static {
        Err(RegistrationError::StaticMember { type_name, member })
    } else if info.is_indexer {
        Err(RegistrationError::IndexerProperty { type_name, member })
    } else if !info.can_write {
        Err(RegistrationError::ReadOnlyMember { type_name, member })
    } else {
        Ok(())
    }
}

fn validate_method(type_name: &str, info: &MethodInfo) -> RegistrationResult<()> {
    let member = info.name.clone();
    let type_name = type_name.to_string();
    if info.is_static {
        return Err(RegistrationError::StaticMember { type_name, member });
    }
    if !info.is_public {
        return Err(RegistrationError::NonPublicMethod { type_name, member });
    }
    if info.is_generic_definition {
        return Err(RegistrationError::OpenGenericMethod { type_name, member });
    }
    if let Some(parameter) = info.parameters.iter().find(|parameter| parameter.is_by_ref()) {
        return Err(RegistrationError::RefParameter {
            type_name,
            member,
            parameter: parameter.name.clone(),
        });
    }
    Ok(())
}

fn member_name(member: &InjectionMember) -> &str {
    match member {
        InjectionMember::Constructor(_) => "new",
        InjectionMember::Field { name, .. }
        | InjectionMember::Property { name, .. }
        | InjectionMember::Method { name, .. } => name,
    }
}
