//! 集成测试共享的组件描述
#![allow(dead_code)]

use infrastructure_common::{
    catalog, reflect_interface, DependencyAttribute, Disposable, GenericDefinition, Injectable, MethodInfo,
    ParameterInfo, PropertyInfo, FieldInfo, Reflect, TypeDescriptor, TypeHandle,
};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

static INIT_LOGGER: Once = Once::new();

/// 初始化测试日志
pub fn init_logger() {
    INIT_LOGGER.call_once(|| {
        tracing_subscriber::fmt().with_env_filter("debug").try_init().ok();
    });
}

macro_rules! reflect_class {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl Reflect for $ty {
                fn type_handle() -> TypeHandle {
                    catalog::intern::<Self>(TypeHandle::class::<Self>)
                }
            }
        )+
    };
}

pub trait Service: Send + Sync {
    fn name(&self) -> &'static str;
}

reflect_interface!(dyn Service);

pub trait Sink: Send + Sync {}

reflect_interface!(dyn Sink);

#[derive(Debug, Default)]
pub struct ServiceA;

#[derive(Debug, Default)]
pub struct ServiceB;

impl Service for ServiceA {
    fn name(&self) -> &'static str {
        "a"
    }
}

impl Service for ServiceB {
    fn name(&self) -> &'static str {
        "b"
    }
}

impl Injectable for ServiceA {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::builder::<Self>()
            .default_constructor()
            .implements::<dyn Service>(|service| service as Arc<dyn Service>)
            .build()
    }
}

impl Injectable for ServiceB {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::builder::<Self>()
            .default_constructor()
            .implements::<dyn Service>(|service| service as Arc<dyn Service>)
            .build()
    }
}

/// 记录使用了哪个构造函数
#[derive(Debug)]
pub struct Widget {
    pub arity: usize,
}

impl Injectable for Widget {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::builder::<Self>()
            .constructor(Vec::new(), |_| Ok(Self { arity: 0 }))
            .constructor(
                vec![
                    ParameterInfo::new("a", TypeHandle::of::<ServiceA>()),
                    ParameterInfo::new("b", TypeHandle::of::<ServiceB>()),
                ],
                |args| {
                    args.get::<ServiceA>(0)?;
                    args.get::<ServiceB>(1)?;
                    Ok(Self { arity: 2 })
                },
            )
            .build()
    }
}

/// 两个参数个数相同的构造函数
#[derive(Debug)]
pub struct Tied;

impl Injectable for Tied {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::builder::<Self>()
            .constructor(vec![ParameterInfo::new("a", TypeHandle::of::<ServiceA>())], |_| Ok(Self))
            .constructor(vec![ParameterInfo::new("b", TypeHandle::of::<ServiceB>())], |_| Ok(Self))
            .build()
    }
}

#[derive(Debug)]
pub struct Counter {
    pub x: i32,
}

impl Injectable for Counter {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::builder::<Self>()
            .constructor(vec![ParameterInfo::new("x", TypeHandle::of::<i32>())], |args| {
                Ok(Self { x: args.value(0)? })
            })
            .build()
    }
}

/// 全部依赖可选
pub struct Reporter {
    pub sink: Option<Arc<dyn Sink>>,
    pub retries: i32,
}

impl Injectable for Reporter {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::builder::<Self>()
            .constructor(
                vec![
                    ParameterInfo::new("sink", TypeHandle::of::<dyn Sink>())
                        .with_dependency(DependencyAttribute::optional()),
                    ParameterInfo::new("retries", TypeHandle::of::<i32>())
                        .with_dependency(DependencyAttribute::optional()),
                ],
                |args| {
                    Ok(Self {
                        sink: args.optional_service::<dyn Sink>(0)?,
                        retries: args.value(1)?,
                    })
                },
            )
            .build()
    }
}

/// 依赖必需
pub struct StrictReporter {
    pub sink: Arc<dyn Sink>,
}

impl Injectable for StrictReporter {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::builder::<Self>()
            .constructor(
                vec![ParameterInfo::new("sink", TypeHandle::of::<dyn Sink>())
                    .with_dependency(DependencyAttribute::required())],
                |args| {
                    Ok(Self {
                        sink: args.service::<dyn Sink>(0)?,
                    })
                },
            )
            .build()
    }
}

/// 属性、字段与注入方法
#[derive(Default)]
pub struct Dashboard {
    pub service: Option<Arc<dyn Service>>,
    pub title: String,
    pub started_with: Option<&'static str>,
}

impl Injectable for Dashboard {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::builder::<Self>()
            .default_constructor()
            .property(
                PropertyInfo::new::<Self, _>("service", TypeHandle::of::<dyn Service>(), |this, args| {
                    this.service = args.optional_service::<dyn Service>(0)?;
                    Ok(())
                })
                .with_dependency(DependencyAttribute::required()),
            )
            .field(FieldInfo::new::<Self, _>("title", TypeHandle::of::<String>(), |this, args| {
                this.title = args.value::<String>(0)?;
                Ok(())
            }))
            .method(
                MethodInfo::new::<Self, _>(
                    "start",
                    vec![ParameterInfo::new("service", TypeHandle::of::<dyn Service>())],
                    |this, args| {
                        this.started_with = Some(args.service::<dyn Service>(0)?.name());
                        Ok(())
                    },
                )
                .injection_method(),
            )
            .build()
    }
}

pub struct Chicken;

pub struct Egg;

impl Injectable for Chicken {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::builder::<Self>()
            .constructor(vec![ParameterInfo::new("egg", TypeHandle::of::<Egg>())], |_| Ok(Self))
            .build()
    }
}

impl Injectable for Egg {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::builder::<Self>()
            .constructor(vec![ParameterInfo::new("chicken", TypeHandle::of::<Chicken>())], |_| Ok(Self))
            .build()
    }
}

/// 三层依赖链
pub struct Outer;

pub struct Middle;

#[derive(Default)]
pub struct Inner;

impl Injectable for Outer {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::builder::<Self>()
            .constructor(vec![ParameterInfo::new("middle", TypeHandle::of::<Middle>())], |_| Ok(Self))
            .build()
    }
}

impl Injectable for Middle {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::builder::<Self>()
            .constructor(vec![ParameterInfo::new("inner", TypeHandle::of::<Inner>())], |_| Ok(Self))
            .build()
    }
}

impl Injectable for Inner {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::builder::<Self>().default_constructor().build()
    }
}

/// 构造次数计数
pub static EXPENSIVE_BUILDS: AtomicUsize = AtomicUsize::new(0);

pub struct Expensive;

impl Injectable for Expensive {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::builder::<Self>()
            .constructor(Vec::new(), |_| {
                EXPENSIVE_BUILDS.fetch_add(1, Ordering::SeqCst);
                std::thread::sleep(std::time::Duration::from_millis(20));
                Ok(Self)
            })
            .build()
    }
}

/// 两个参数依赖同一个单次解析组件
#[derive(Default)]
pub struct Shared;

pub struct Pair {
    pub left: Arc<Shared>,
    pub right: Arc<Shared>,
}

impl Injectable for Shared {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::builder::<Self>().default_constructor().build()
    }
}

impl Injectable for Pair {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::builder::<Self>()
            .constructor(
                vec![
                    ParameterInfo::new("left", TypeHandle::of::<Shared>()),
                    ParameterInfo::new("right", TypeHandle::of::<Shared>()),
                ],
                |args| {
                    Ok(Self {
                        left: args.get(0)?,
                        right: args.get(1)?,
                    })
                },
            )
            .build()
    }
}

/// 释放时写入日志
pub static DISPOSED: Mutex<Vec<String>> = Mutex::new(Vec::new());

pub struct Journal {
    pub name: String,
}

impl Journal {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Disposable for Journal {
    fn dispose(&self) {
        if let Ok(mut disposed) = DISPOSED.lock() {
            disposed.push(self.name.clone());
        }
    }
}

impl Injectable for Journal {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::builder::<Self>().disposable().build()
    }
}

/// 已释放的日志名称中带有指定前缀的部分
pub fn disposed_with(prefix: &str) -> Vec<String> {
    DISPOSED
        .lock()
        .map(|disposed| {
            disposed
                .iter()
                .filter(|name| name.starts_with(prefix))
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}

reflect_class!(
    ServiceA, ServiceB, Widget, Tied, Counter, Reporter, StrictReporter, Dashboard, Chicken, Egg, Outer, Middle,
    Inner, Expensive, Shared, Pair, Journal,
);

pub const REPOSITORY: GenericDefinition = GenericDefinition::new("Repository", 1);
pub const SQL_REPOSITORY: GenericDefinition = GenericDefinition::new("SqlRepository", 1);
/// 没有任何封闭类型登记过的实现
pub const ARCHIVE_REPOSITORY: GenericDefinition = GenericDefinition::new("ArchiveRepository", 1);

pub trait Repository<T>: Send + Sync {
    fn entity(&self) -> &'static str;
}

impl<T: Reflect> Reflect for dyn Repository<T> {
    fn type_handle() -> TypeHandle {
        catalog::intern::<Self>(|| TypeHandle::interface::<Self>().closing(REPOSITORY, vec![T::type_handle()]))
    }
}

pub struct SqlRepository<T> {
    _entity: PhantomData<fn() -> T>,
}

impl<T: Reflect + Send + Sync> Repository<T> for SqlRepository<T> {
    fn entity(&self) -> &'static str {
        std::any::type_name::<T>()
    }
}

impl<T: Reflect + Send + Sync> Reflect for SqlRepository<T> {
    fn type_handle() -> TypeHandle {
        catalog::intern::<Self>(|| TypeHandle::class::<Self>().closing(SQL_REPOSITORY, vec![T::type_handle()]))
    }
}

impl<T: Reflect + Send + Sync> Injectable for SqlRepository<T> {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::builder::<Self>()
            .constructor(Vec::new(), |_| {
                Ok(Self {
                    _entity: PhantomData,
                })
            })
            .implements::<dyn Repository<T>>(|repository| repository as Arc<dyn Repository<T>>)
            .build()
    }
}

#[derive(Debug, Default)]
pub struct User;

#[derive(Debug, Default)]
pub struct Order;

impl Injectable for User {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::builder::<Self>().default_constructor().build()
    }
}

impl Injectable for Order {
    fn describe() -> TypeDescriptor {
        TypeDescriptor::builder::<Self>().default_constructor().build()
    }
}

reflect_class!(User, Order);
