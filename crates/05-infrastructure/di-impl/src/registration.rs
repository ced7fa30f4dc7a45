//! 注册管理器
//!
//! 每个注册契约对应一个管理器，持有生命周期、注册数据、注入成员与已准备的管线。
//! 管线在首次解析（或注册校验）时在管理器自己的锁内准备，链版本变化后延迟重建。

use crate::pipeline::Pipeline;
use crate::plan::BuildPlan;
use crate::strategies::Strategies;
use di_abstractions::{Contract, InjectionMember, LifetimeManager, RegistrationCategory, RegistrationData};
use infrastructure_common::RegistrationResult;
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// 已准备的管线
pub(crate) struct Prepared {
    version: u64,
    pub(crate) pipeline: Pipeline,
    pub(crate) plan: Option<Arc<BuildPlan>>,
}

/// 注册管理器
pub struct RegistrationManager {
    contract: Contract,
    data: RegistrationData,
    lifetime: Arc<dyn LifetimeManager>,
    members: Vec<InjectionMember>,
    prepared: RwLock<Option<Arc<Prepared>>>,
    build_lock: Mutex<()>,
}

impl RegistrationManager {
    /// 创建管理器
    pub fn new(
        contract: Contract,
        data: RegistrationData,
        lifetime: Arc<dyn LifetimeManager>,
        members: Vec<InjectionMember>,
    ) -> Self {
        Self {
            contract,
            data,
            lifetime,
            members,
            prepared: RwLock::new(None),
            build_lock: Mutex::new(()),
        }
    }

    /// 注册契约
    pub fn contract(&self) -> &Contract {
        &self.contract
    }

    /// 注册类别
    pub fn category(&self) -> RegistrationCategory {
        self.data.category()
    }

    /// 注册数据
    pub fn data(&self) -> &RegistrationData {
        &self.data
    }

    /// 生命周期管理器
    pub fn lifetime(&self) -> &Arc<dyn LifetimeManager> {
        &self.lifetime
    }

    /// 注册时提供的注入成员
    pub fn members(&self) -> &[InjectionMember] {
        &self.members
    }

    /// 管线是否已准备（且对应当前链版本）
    pub fn is_prepared(&self, strategies: &Strategies) -> bool {
        self.current(strategies.version(self.category())).is_some()
    }

    /// 取得已准备的管线，必要时在管理器锁内构建
    ///
    /// 构建计划只生成一次；链版本变化时只重新组合管线。
    /// 成员声明错误在这里返回；构造函数声明错误记录在计划中，由调用方决定何时报告。
    pub(crate) fn prepare(&self, strategies: &Strategies) -> RegistrationResult<Arc<Prepared>> {
        let category = self.category();
        if let Some(prepared) = self.current(strategies.version(category)) {
            return Ok(prepared);
        }

        let _building = self.build_lock.lock();
        let (version, pipeline) = strategies.pipeline(category);
        if let Some(prepared) = self.current(version) {
            return Ok(prepared);
        }

        let previous = self.prepared.read().as_ref().and_then(|prepared| prepared.plan.clone());
        let plan = match (previous, &self.data) {
            (Some(plan), _) => Some(plan),
            (None, RegistrationData::Type(implementation)) => {
                Some(Arc::new(BuildPlan::select(implementation, &self.members)?))
            }
            (None, _) => None,
        };

        debug!("准备管线: {} -> {}, 链版本 {}", self.contract, self.data, version);
        let prepared = Arc::new(Prepared { version, pipeline, plan });
        *self.prepared.write() = Some(prepared.clone());
        Ok(prepared)
    }

    fn current(&self, version: u64) -> Option<Arc<Prepared>> {
        self.prepared
            .read()
            .as_ref()
            .filter(|prepared| prepared.version == version)
            .cloned()
    }
}

impl fmt::Debug for RegistrationManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationManager")
            .field("contract", &self.contract)
            .field("data", &self.data)
            .field("lifetime", &self.lifetime.name())
            .field("members", &self.members.len())
            .finish()
    }
}
