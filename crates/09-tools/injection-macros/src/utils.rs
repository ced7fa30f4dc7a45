//! 字段类型形状

use syn::{GenericArgument, PathArguments, Type};

/// 字段值的取法
#[derive(Debug, PartialEq, Eq)]
pub enum Shape<'a> {
    /// `Arc<dyn I>`
    Service(&'a Type),
    /// `Option<Arc<dyn I>>`
    OptionalService(&'a Type),
    /// `Arc<T>`
    Shared(&'a Type),
    /// `Option<Arc<T>>`
    OptionalShared(&'a Type),
    /// `Vec<Arc<T>>`，按数组依赖解析
    Services(&'a Type),
    /// `Option<T>`
    OptionalValue(&'a Type),
    /// 其它值类型
    Value(&'a Type),
}

impl<'a> Shape<'a> {
    /// 按字段类型判断取法
    pub fn of(ty: &'a Type) -> Self {
        if let Some(inner) = wrapped(ty, "Arc") {
            return if is_trait_object(inner) {
                Self::Service(inner)
            } else {
                Self::Shared(inner)
            };
        }
        if let Some(inner) = wrapped(ty, "Option") {
            return match wrapped(inner, "Arc") {
                Some(service) if is_trait_object(service) => Self::OptionalService(service),
                Some(shared) => Self::OptionalShared(shared),
                None => Self::OptionalValue(inner),
            };
        }
        if let Some(element) = wrapped(ty, "Vec").and_then(|inner| wrapped(inner, "Arc")) {
            return Self::Services(element);
        }
        Self::Value(ty)
    }

    /// 解析时使用的类型
    pub fn resolved_type(&self) -> &'a Type {
        match *self {
            Self::Service(ty)
            | Self::OptionalService(ty)
            | Self::Shared(ty)
            | Self::OptionalShared(ty)
            | Self::Services(ty)
            | Self::OptionalValue(ty)
            | Self::Value(ty) => ty,
        }
    }

    /// `Option` 包装的字段天然可为空
    pub fn is_nullable(&self) -> bool {
        matches!(
            self,
            Self::OptionalService(_) | Self::OptionalShared(_) | Self::OptionalValue(_)
        )
    }
}

/// 取出 `Wrapper<T>` 中的 `T`
fn wrapped<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    match &segment.arguments {
        PathArguments::AngleBracketed(args) => match args.args.first()? {
            GenericArgument::Type(inner) => Some(inner),
            _ => None,
        },
        _ => None,
    }
}

fn is_trait_object(ty: &Type) -> bool {
    match ty {
        Type::TraitObject(_) => true,
        Type::Paren(paren) => is_trait_object(&paren.elem),
        _ => false,
    }
}
