//! `#[derive(Injectable)]` 实现

use crate::attributes::{parse_field_args, parse_type_args, DefaultArg, FieldArgs, FieldRole};
use crate::utils::Shape;
use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Error, Fields, Ident, Result};

/// 生成 `Reflect` 与 `Injectable` 实现
pub fn derive_injectable_impl(input: DeriveInput) -> Result<TokenStream> {
    let struct_name = &input.ident;
    if !input.generics.params.is_empty() {
        return Err(Error::new_spanned(
            &input.generics,
            "derive(Injectable) 不支持泛型结构体，请为封闭类型手写描述",
        ));
    }
    let Data::Struct(data) = &input.data else {
        return Err(Error::new_spanned(struct_name, "derive(Injectable) 只能用于结构体"));
    };

    let type_args = parse_type_args(&input.attrs)?;

    let mut parameters = Vec::new();
    let mut initializers = Vec::new();
    let mut injected_fields = Vec::new();
    let constructed = match &data.fields {
        Fields::Unit => quote! { Self },
        Fields::Unnamed(fields) => {
            return Err(Error::new_spanned(fields, "derive(Injectable) 需要具名字段"));
        }
        Fields::Named(fields) => {
            for field in &fields.named {
                let Some(ident) = field.ident.as_ref() else {
                    continue;
                };
                let args = parse_field_args(&field.attrs)?;
                let shape = Shape::of(&field.ty);
                if args.default.is_some() && !matches!(shape, Shape::Value(_) | Shape::OptionalValue(_)) {
                    return Err(Error::new_spanned(&field.ty, "默认值只能用于值类型字段"));
                }
                match args.role {
                    FieldRole::Parameter => {
                        let position = parameters.len();
                        parameters.push(parameter_info(ident, &shape, &args));
                        let value = extract(&shape, position);
                        initializers.push(quote! { #ident: #value });
                    }
                    FieldRole::Injected => {
                        injected_fields.push(field_info(ident, &shape, &args));
                        initializers.push(quote! { #ident: ::std::default::Default::default() });
                    }
                    FieldRole::Skipped => {
                        initializers.push(quote! { #ident: ::std::default::Default::default() });
                    }
                }
            }
            quote! { Self { #(#initializers),* } }
        }
    };

    let implements = type_args.implements.iter().map(|interface| {
        quote! {
            .implements::<#interface>(|this| this as ::std::sync::Arc<#interface>)
        }
    });
    let disposable = type_args.disposable.then(|| quote! { .disposable() });
    let arguments = if parameters.is_empty() {
        quote! { _ }
    } else {
        quote! { args }
    };

    Ok(quote! {
        impl ::infrastructure_common::Reflect for #struct_name {
            fn type_handle() -> ::infrastructure_common::TypeHandle {
                ::infrastructure_common::catalog::intern::<Self>(::infrastructure_common::TypeHandle::class::<Self>)
            }
        }

        impl ::infrastructure_common::Injectable for #struct_name {
            fn describe() -> ::infrastructure_common::TypeDescriptor {
                ::infrastructure_common::TypeDescriptor::builder::<Self>()
                    .injection_constructor(
                        ::std::vec![#(#parameters),*],
                        |#arguments| ::std::result::Result::Ok(#constructed),
                    )
                    #(#injected_fields)*
                    #(#implements)*
                    #disposable
                    .build()
            }
        }
    })
}

/// 依赖标记；`Option` 字段未标记时视为可选依赖
fn dependency(shape: &Shape<'_>, args: &FieldArgs) -> Option<TokenStream> {
    let attribute = if args.optional || (!args.marked && shape.is_nullable()) {
        quote! { ::infrastructure_common::DependencyAttribute::optional() }
    } else if args.marked {
        quote! { ::infrastructure_common::DependencyAttribute::required() }
    } else {
        return None;
    };
    Some(match &args.name {
        Some(name) => quote! { #attribute.named(#name) },
        None => attribute,
    })
}

fn type_handle(shape: &Shape<'_>) -> TokenStream {
    let ty = shape.resolved_type();
    match shape {
        Shape::Services(_) => quote! {
            ::infrastructure_common::TypeHandle::array(::infrastructure_common::TypeHandle::of::<#ty>(), 1)
        },
        _ => quote! { ::infrastructure_common::TypeHandle::of::<#ty>() },
    }
}

fn parameter_info(ident: &Ident, shape: &Shape<'_>, args: &FieldArgs) -> TokenStream {
    let name = ident.to_string();
    let handle = type_handle(shape);
    let dependency = dependency(shape, args).map(|attribute| quote! { .with_dependency(#attribute) });
    let ty = shape.resolved_type();
    let default = args.default.as_ref().map(|default| {
        let value = match default {
            DefaultArg::Implicit => quote! { <#ty as ::std::default::Default>::default() },
            DefaultArg::Explicit(expr) => quote! { #expr },
        };
        quote! { .with_default(::infrastructure_common::DefaultValue::of::<#ty>(#value)) }
    });
    quote! {
        ::infrastructure_common::ParameterInfo::new(#name, #handle) #dependency #default
    }
}

fn field_info(ident: &Ident, shape: &Shape<'_>, args: &FieldArgs) -> TokenStream {
    let name = ident.to_string();
    let handle = type_handle(shape);
    let value = extract(shape, 0);
    let dependency = dependency(shape, args).map(|attribute| quote! { .with_dependency(#attribute) });
    quote! {
        .field(
            ::infrastructure_common::FieldInfo::new::<Self, _>(#name, #handle, |this, args| {
                this.#ident = #value;
                ::std::result::Result::Ok(())
            })
            #dependency
        )
    }
}

/// 从构造参数中取出字段值
fn extract(shape: &Shape<'_>, position: usize) -> TokenStream {
    let ty = shape.resolved_type();
    match shape {
        Shape::Service(_) => quote! { args.service::<#ty>(#position)? },
        Shape::OptionalService(_) => quote! { args.optional_service::<#ty>(#position)? },
        Shape::Shared(_) => quote! { args.get::<#ty>(#position)? },
        Shape::OptionalShared(_) => quote! { args.optional::<#ty>(#position)? },
        Shape::Services(_) => quote! { args.services::<#ty>(#position)? },
        Shape::OptionalValue(_) => quote! { args.optional_value::<#ty>(#position)? },
        Shape::Value(_) => quote! { args.value::<#ty>(#position)? },
    }
}
