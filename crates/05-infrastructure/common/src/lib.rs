//! # Infrastructure Common
//!
//! 这个 crate 提供了依赖注入内核共享的基础类型。
//!
//! ## 核心组件
//!
//! - [`TypeHandle`] - 可解析类型的运行时身份
//! - [`TypeDescriptor`] - 类型的成员元数据（构造函数、属性、方法、字段）
//! - [`Reflect`] / [`Injectable`] - 类型句柄与类型描述的提供者
//! - [`catalog`] - 进程级类型目录、接口转换表与泛型实例表
//! - [`DependencyError`] - 解析错误分类
//! - [`Scope`] / [`Disposable`] - 容器作用域身份与释放约定
//!
//! ## 设计原则
//!
//! - 用显式的数据描述替代运行时反射
//! - 类型元数据首次使用时构建，进程内永不失效
//! - 错误用枚举表达，不在库代码中 panic

pub mod catalog;
pub mod descriptor;
pub mod errors;
pub mod instance;
pub mod lifecycle;
pub mod members;
pub mod metadata;

pub use descriptor::*;
pub use errors::*;
pub use instance::*;
pub use lifecycle::*;
pub use members::*;
pub use metadata::*;
