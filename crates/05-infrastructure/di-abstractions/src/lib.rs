//! # Dependency Injection Abstractions
//!
//! 依赖注入抽象层，定义解析管线内核与外部协作者之间的契约。
//!
//! ## 核心接口
//!
//! - [`Contract`] - 解析契约（类型 + 名称）
//! - [`LifetimeManager`] - 生命周期管理器
//! - [`InjectionMember`] / [`InjectionValue`] - 注册时的注入数据
//! - [`ImportDescriptor`] - 单个参数或成员的导入描述
//! - [`ResolverOverride`] - 单次解析的覆盖
//! - [`DependencyResolver`] - 依赖解析器接口
//! - [`ContainerConfig`] - 容器配置

pub mod container;
pub mod contract;
pub mod import;
pub mod injection;
pub mod lifetime;
pub mod overrides;
pub mod registration;
pub mod resolver;

pub use container::*;
pub use contract::*;
pub use import::*;
pub use injection::*;
pub use lifetime::*;
pub use overrides::*;
pub use registration::*;
pub use resolver::*;
