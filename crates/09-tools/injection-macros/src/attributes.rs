//! 属性解析

use syn::{parenthesized, punctuated::Punctuated, Attribute, Expr, LitStr, Result, Token, Type};

/// 结构体级参数
#[derive(Default)]
pub struct TypeArgs {
    /// 实现的接口
    pub implements: Vec<Type>,
    /// 是否由容器释放
    pub disposable: bool,
}

/// 字段如何参与注入
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldRole {
    /// 构造函数参数
    Parameter,
    /// 构造后注入的字段
    Injected,
    /// 不参与注入
    Skipped,
}

/// 参数默认值
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultArg {
    /// `Default::default()`
    Implicit,
    Explicit(Expr),
}

/// 字段级参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldArgs {
    pub role: FieldRole,
    /// 是否带依赖标记
    pub marked: bool,
    pub optional: bool,
    pub name: Option<String>,
    pub default: Option<DefaultArg>,
}

impl Default for FieldArgs {
    fn default() -> Self {
        Self {
            role: FieldRole::Parameter,
            marked: false,
            optional: false,
            name: None,
            default: None,
        }
    }
}

/// 解析 `#[injectable(...)]`
pub fn parse_type_args(attrs: &[Attribute]) -> Result<TypeArgs> {
    let mut args = TypeArgs::default();
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("injectable")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("implements") {
                let content;
                parenthesized!(content in meta.input);
                let interfaces = Punctuated::<Type, Token![,]>::parse_terminated(&content)?;
                args.implements.extend(interfaces);
                Ok(())
            } else if meta.path.is_ident("disposable") {
                args.disposable = true;
                Ok(())
            } else {
                Err(meta.error("未知的 injectable 参数，可用: implements(..), disposable"))
            }
        })?;
    }
    Ok(args)
}

/// 解析字段上的 `#[dependency(...)]` 与 `#[injectable(...)]`
pub fn parse_field_args(attrs: &[Attribute]) -> Result<FieldArgs> {
    let mut args = FieldArgs::default();
    for attr in attrs {
        if attr.path().is_ident("injectable") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("skip") {
                    args.role = FieldRole::Skipped;
                    Ok(())
                } else if meta.path.is_ident("default") {
                    args.default = Some(if meta.input.peek(Token![=]) {
                        DefaultArg::Explicit(meta.value()?.parse()?)
                    } else {
                        DefaultArg::Implicit
                    });
                    Ok(())
                } else {
                    Err(meta.error("字段上只支持 #[injectable(skip)] 与 #[injectable(default [= ..])]"))
                }
            })?;
        } else if attr.path().is_ident("dependency") {
            args.marked = true;
            // 无参数的 #[dependency] 不需要解析
            if matches!(attr.meta, syn::Meta::Path(_)) {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("optional") {
                    args.optional = true;
                } else if meta.path.is_ident("field") {
                    if args.role != FieldRole::Skipped {
                        args.role = FieldRole::Injected;
                    }
                } else if meta.path.is_ident("name") {
                    let name: LitStr = meta.value()?.parse()?;
                    args.name = Some(name.value());
                } else {
                    return Err(meta.error("未知的 dependency 参数，可用: optional, field, name = \"..\""));
                }
                Ok(())
            })?;
        }
    }

    if args.role == FieldRole::Skipped && (args.marked || args.default.is_some()) {
        return Err(syn::Error::new_spanned(
            &attrs[0],
            "#[injectable(skip)] 不能与 #[dependency] 或默认值同时使用",
        ));
    }
    Ok(args)
}
