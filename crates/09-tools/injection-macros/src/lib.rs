//! # Injection Macros
//!
//! 为结构体生成 `Reflect` 与 `Injectable` 实现，免去手写类型描述。
//!
//! ## 使用示例
//!
//! ```rust,ignore
//! use injection_macros::Injectable;
//! use std::sync::Arc;
//!
//! #[derive(Injectable)]
//! #[injectable(implements(dyn Notifier), disposable)]
//! pub struct MailNotifier {
//!     #[dependency]
//!     transport: Arc<dyn Transport>,
//!     #[dependency(name = "audit", optional)]
//!     audit: Option<Arc<dyn AuditLog>>,
//!     #[dependency(field)]
//!     clock: Option<Arc<dyn Clock>>,
//!     #[injectable(default = 3)]
//!     retries: u32,
//!     #[injectable(skip)]
//!     sent: AtomicUsize,
//! }
//! ```

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

mod attributes;
mod injectable;
mod utils;

/// 注入描述派生宏
///
/// 未标记的字段按声明顺序成为唯一注入构造函数的参数。
///
/// # 结构体参数 `#[injectable(...)]`
///
/// - `implements(dyn A, dyn B)` - 实现的接口，用于接口注册与按接口取值
/// - `disposable` - 由容器负责释放（要求实现 `Disposable`）
///
/// # 字段参数
///
/// - `#[dependency]` - 必需依赖
/// - `#[dependency(optional)]` - 可选依赖，解析失败时取默认值
/// - `#[dependency(name = "x")]` - 按名称解析
/// - `#[dependency(field)]` - 构造后注入字段，字段以 `Default` 初始化
/// - `#[injectable(skip)]` - 不参与注入，以 `Default` 初始化
/// - `#[injectable(default)]` / `#[injectable(default = 3)]` - 值类型参数解析失败时的默认值
///
/// `Option` 字段未标记时视为可选依赖。
/// 字段类型决定取值方式: `Arc<T>`、`Option<Arc<T>>`、`Vec<Arc<T>>`（数组依赖）、
/// `Option<T>` 与其它可克隆的值类型。
#[proc_macro_derive(Injectable, attributes(injectable, dependency))]
pub fn derive_injectable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    injectable::derive_injectable_impl(input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
