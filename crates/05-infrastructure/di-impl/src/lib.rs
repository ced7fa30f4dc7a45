//! # Dependency Injection Implementation
//!
//! 依赖注入解析管线与构建计划的具体实现。
//!
//! ## 主要组件
//!
//! - [`DiContainerImpl`] - 容器: 注册表、父子容器、注册合成与释放
//! - [`StagedStrategyChain`] / [`BuilderStrategy`] - 按阶段排列的构建策略
//! - [`PipelineBuilder`] - 把策略链组合为管线（编译或解释执行）
//! - [`PipelineContext`] - 一次构建的上下文
//! - [`BuildPlan`] - 按类型描述与注入成员选出的构造函数、字段、属性与方法
//! - [`RegistrationManager`] - 单个注册的生命周期、注册数据与已准备的管线
//! - [`ParameterOverride`] 等 - 单次解析的覆盖
//! - [`ContainerConfigLoader`] - 从配置文件与环境变量加载 [`ContainerConfig`](di_abstractions::ContainerConfig)
//!
//! ## 示例
//!
//! ```rust,ignore
//! let container = DiContainerImpl::new();
//! container
//!     .registration::<dyn Clock>()
//!     .to::<SystemClock>()
//!     .lifetime(ContainerControlledLifetimeManager::new())
//!     .register()?;
//!
//! let clock = container.resolve_service::<dyn Clock>()?;
//! ```

pub mod chain;
pub mod config;
pub mod container;
pub mod context;
mod disposal;
pub mod lifetime;
pub mod matching;
pub mod overrides;
mod parameters;
pub mod pipeline;
pub mod plan;
pub mod registration;
pub mod strategies;
mod synthesis;

pub use chain::{BuildStage, BuildSteps, BuilderStrategy, StagedStrategyChain};
pub use config::ContainerConfigLoader;
pub use container::{DiContainerImpl, RegistrationBuilder};
pub use context::{PipelineContext, Target};
pub use lifetime::*;
pub use overrides::{DependencyOverride, FieldOverride, ParameterOverride, PropertyOverride};
pub use pipeline::{Pipeline, PipelineBuilder};
pub use plan::BuildPlan;
pub use registration::RegistrationManager;
pub use strategies::Strategies;
