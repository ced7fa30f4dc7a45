//! 作用域与释放约定

use serde::{Deserialize, Serialize};

/// 需要在作用域结束时释放资源的对象
///
/// 容器在释放作用域时对其获取的每个实例至多调用一次 `dispose`。
pub trait Disposable: Send + Sync {
    /// 释放资源
    fn dispose(&self);
}

/// 容器作用域
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    /// 作用域标识，生命周期管理器按它区分作用域
    pub id: uuid::Uuid,
    /// 以点分隔的路径名
    pub name: String,
    /// 根作用域为 0
    pub depth: usize,
    /// 创建时间
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Scope {
    fn new(name: impl Into<String>, depth: usize) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            name: name.into(),
            depth,
            created_at: chrono::Utc::now(),
        }
    }

    /// 创建根作用域
    pub fn root() -> Self {
        Self::new("root", 0)
    }

    /// 创建子作用域
    pub fn child(&self, name: impl Into<String>) -> Self {
        Self::new(format!("{}.{}", self.name, name.into()), self.depth + 1)
    }

    /// 是否为根作用域
    pub const fn is_root(&self) -> bool {
        self.depth == 0
    }
}
