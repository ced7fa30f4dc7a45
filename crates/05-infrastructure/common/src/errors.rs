//! 错误类型定义

use thiserror::Error;

/// 注册校验错误
///
/// 注入声明本身有问题时产生：在注册时或首次构建管线时抛出，而不是每次解析都重复检查。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    #[error("构造函数选择存在歧义: {type_name} 有多个参数个数为 {parameter_count} 的构造函数")]
    AmbiguousInjectionConstructor {
        type_name: String,
        parameter_count: usize,
    },

    #[error("类型 {type_name} 标记了多个注入构造函数")]
    MultipleInjectionConstructors { type_name: String },

    #[error("类型 {type_name} 没有可访问的构造函数")]
    NoConstructorFound { type_name: String },

    #[error("类型 {type_name} 没有与注入数据匹配的{member_kind}: {signature}")]
    NoMatchingMember {
        type_name: String,
        member_kind: String,
        signature: String,
    },

    #[error("{type_name}.{member} 的参数 {parameter} 是 ref/out 参数，无法注入")]
    RefParameter {
        type_name: String,
        member: String,
        parameter: String,
    },

    #[error("{type_name}.{member} 是静态成员，无法注入")]
    StaticMember { type_name: String, member: String },

    #[error("{type_name}.{member} 是索引器，无法注入")]
    IndexerProperty { type_name: String, member: String },

    #[error("{type_name}.{member} 是只读成员，无法注入")]
    ReadOnlyMember { type_name: String, member: String },

    #[error("{type_name}.{member} 不是公共方法，无法注入")]
    NonPublicMethod { type_name: String, member: String },

    #[error("{type_name}.{member} 是开放泛型方法，无法注入")]
    OpenGenericMethod { type_name: String, member: String },

    #[error("方法 {type_name}.{member} 被重复注入")]
    DuplicateInjectionMethod { type_name: String, member: String },

    #[error("类型 {type_name} 不存在成员 {member}")]
    MemberNotFound { type_name: String, member: String },

    #[error("无效数组类型 {type_name}: 仅支持一维数组, 实际维数 {rank}")]
    InvalidArrayRank { type_name: String, rank: usize },

    #[error("映射无效: {from} 不能赋值给 {to}")]
    IncompatibleMapping { from: String, to: String },

    #[error("构建阶段 {stage} 已存在策略")]
    DuplicateStage { stage: String },
}

impl RegistrationError {
    /// 创建成员未找到错误
    pub fn member_not_found(type_name: impl Into<String>, member: impl Into<String>) -> Self {
        Self::MemberNotFound {
            type_name: type_name.into(),
            member: member.into(),
        }
    }

    /// 创建无匹配成员错误
    pub fn no_matching_member(
        type_name: impl Into<String>,
        member_kind: impl Into<String>,
        signature: impl Into<String>,
    ) -> Self {
        Self::NoMatchingMember {
            type_name: type_name.into(),
            member_kind: member_kind.into(),
            signature: signature.into(),
        }
    }
}

/// 构造期错误
///
/// 目标类型本身无法构造，或调用成员时参数与目标不符。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConstructionError {
    #[error("无法构造接口类型 {type_name}，是否缺少类型映射?")]
    CannotConstructInterface { type_name: String },

    #[error("无法构造抽象类型 {type_name}，是否缺少类型映射?")]
    CannotConstructAbstractClass { type_name: String },

    #[error("无法构造委托类型 {type_name}")]
    CannotConstructDelegate { type_name: String },

    #[error("类型 {type_name} 不可构造")]
    TypeIsNotConstructable { type_name: String },

    #[error("类型 {type_name} 的构造函数依赖自身，且不存在已创建的实例")]
    SelfReferencingConstructor { type_name: String },

    #[error("类型 {type_name} 没有类型描述，无法构建")]
    TypeNotDescribed { type_name: String },

    #[error("第 {position} 个参数缺失")]
    MissingArgument { position: usize },

    #[error("第 {position} 个参数为空，期望 {expected}")]
    NullArgument { position: usize, expected: String },

    #[error("第 {position} 个参数类型不匹配: 期望 {expected}")]
    ArgumentMismatch { position: usize, expected: String },

    #[error("成员 {member} 的目标实例类型不匹配: 期望 {expected}")]
    TargetMismatch { expected: String, member: String },

    #[error("调用成员 {member} 失败: {message}")]
    InvocationFailed { member: String, message: String },
}

impl ConstructionError {
    /// 创建成员调用失败错误
    pub fn invocation(member: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvocationFailed {
            member: member.into(),
            message: message.into(),
        }
    }

    /// 创建参数类型不匹配错误
    pub fn argument_mismatch(position: usize, expected: impl Into<String>) -> Self {
        Self::ArgumentMismatch {
            position,
            expected: expected.into(),
        }
    }
}

/// 依赖解析错误类型
#[derive(Error, Debug)]
pub enum DependencyError {
    #[error("解析失败: {type_name}{}, 原因: {source}", display_name(.name))]
    ResolutionFailed {
        type_name: String,
        name: Option<String>,
        source: Box<DependencyError>,
    },

    #[error("解析依赖 {member} ({type_name}{}) 失败: {source}", display_name(.name))]
    DependencyFailed {
        type_name: String,
        name: Option<String>,
        member: String,
        source: Box<DependencyError>,
    },

    #[error("管线未产生实例: {type_name}")]
    NoValueProduced { type_name: String },

    #[error("循环依赖检测到: {dependency_chain}")]
    CircularDependency { dependency_chain: String },

    #[error("解析深度超过上限 {max_depth}: {type_name}")]
    DepthExceeded { type_name: String, max_depth: usize },

    #[error("成员 {member} 的动态值在 {iterations} 次展开后仍未稳定")]
    UnstableDynamicValue { member: String, iterations: usize },

    #[error("参数无效: {message}")]
    InvalidArgument {
        message: String,
        #[source]
        source: Option<Box<DependencyError>>,
    },

    #[error("类型加载失败: {type_name}, 原因: {message}")]
    TypeLoad { type_name: String, message: String },

    #[error("容器作用域已释放: {scope}")]
    Disposed { scope: String },

    #[error("组件创建失败: {type_name}, 原因: {source}")]
    ComponentCreationFailed {
        type_name: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error(transparent)]
    InvalidRegistration(#[from] RegistrationError),

    #[error(transparent)]
    InvalidOperation(#[from] ConstructionError),
}

fn display_name(name: &Option<String>) -> String {
    name.as_ref()
        .map(|name| format!(" (名称: {name})"))
        .unwrap_or_default()
}

impl DependencyError {
    /// 创建最外层解析失败错误
    pub fn resolution_failed(
        type_name: impl Into<String>,
        name: Option<String>,
        source: DependencyError,
    ) -> Self {
        Self::ResolutionFailed {
            type_name: type_name.into(),
            name,
            source: Box::new(source),
        }
    }

    /// 创建嵌套依赖失败错误
    pub fn dependency_failed(
        type_name: impl Into<String>,
        name: Option<String>,
        member: impl Into<String>,
        source: DependencyError,
    ) -> Self {
        Self::DependencyFailed {
            type_name: type_name.into(),
            name,
            member: member.into(),
            source: Box::new(source),
        }
    }

    /// 创建包装类型加载失败的参数错误
    pub fn type_load_argument(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        let type_name = type_name.into();
        Self::InvalidArgument {
            message: format!("无法构造封闭类型 {type_name}"),
            source: Some(Box::new(Self::TypeLoad {
                type_name,
                message: message.into(),
            })),
        }
    }

    /// 是否为包装了类型加载失败的参数错误
    ///
    /// 集合合成时只有这一种元素错误会被丢弃。
    pub fn is_type_load_argument(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument { source: Some(inner), .. }
                if matches!(inner.as_ref(), Self::TypeLoad { .. })
        )
    }

    /// 剥离诊断链包装，返回最内层错误
    pub fn root_cause(&self) -> &DependencyError {
        let mut current = self;
        loop {
            match current {
                Self::ResolutionFailed { source, .. } | Self::DependencyFailed { source, .. } => {
                    current = source;
                }
                _ => return current,
            }
        }
    }

    /// 诊断链: 从外到内依次经过的类型名称
    pub fn trail(&self) -> Vec<String> {
        let mut trail = Vec::new();
        let mut current = self;
        loop {
            match current {
                Self::ResolutionFailed {
                    type_name, source, ..
                }
                | Self::DependencyFailed {
                    type_name, source, ..
                } => {
                    trail.push(type_name.clone());
                    current = source;
                }
                _ => return trail,
            }
        }
    }
}

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    #[error("配置解析失败: {source}")]
    ParseError {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("配置验证失败: {message}")]
    ValidationError { message: String },
}

/// 结果类型别名
pub type ConfigResult<T> = Result<T, ConfigError>;
pub type DependencyResult<T> = Result<T, DependencyError>;
pub type RegistrationResult<T> = Result<T, RegistrationError>;
pub type ConstructionResult<T> = Result<T, ConstructionError>;
