//! 分阶段策略链
//!
//! 每个构建阶段至多放置一个策略，遍历顺序与阶段声明顺序一致。
//! 链的任何变更都会递增版本号并通知订阅方，已编译的管线据此失效。

use crate::context::PipelineContext;
use infrastructure_common::{RegistrationError, RegistrationResult};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// 构建阶段（按声明顺序执行）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BuildStage {
    /// 准备（递归保护等）
    Setup,
    /// 创建实例
    Creation,
    /// 字段注入
    Fields,
    /// 属性注入
    Properties,
    /// 方法注入
    Methods,
}

impl fmt::Display for BuildStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Setup => "Setup",
            Self::Creation => "Creation",
            Self::Fields => "Fields",
            Self::Properties => "Properties",
            Self::Methods => "Methods",
        };
        f.write_str(name)
    }
}

/// 策略实际提供的步骤
///
/// 两个步骤都不提供的策略在组合管线时被跳过。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BuildSteps {
    /// 提供前置步骤
    pub pre: bool,
    /// 提供后置步骤
    pub post: bool,
}

impl BuildSteps {
    /// 不提供任何步骤
    pub const NONE: Self = Self { pre: false, post: false };
    /// 只有前置步骤
    pub const PRE: Self = Self { pre: true, post: false };
    /// 只有后置步骤
    pub const POST: Self = Self { pre: false, post: true };
    /// 前置与后置步骤
    pub const BOTH: Self = Self { pre: true, post: true };

    /// 是否提供任一步骤
    pub const fn any(self) -> bool {
        self.pre || self.post
    }
}

/// 构建策略
///
/// 前置步骤按链顺序执行，后置步骤按相反顺序执行。
/// 策略通过 [`PipelineContext::fault`] 报告失败，而不是返回错误。
pub trait BuilderStrategy: Send + Sync + fmt::Debug {
    /// 策略名称（诊断用）
    fn name(&self) -> &'static str;

    /// 实际提供的步骤
    fn steps(&self) -> BuildSteps;

    /// 前置步骤
    fn pre_build_up(&self, _context: &mut PipelineContext<'_>) {}

    /// 后置步骤
    fn post_build_up(&self, _context: &mut PipelineContext<'_>) {}
}

type Subscriber = Box<dyn Fn(u64) + Send + Sync>;

/// 分阶段策略链
pub struct StagedStrategyChain {
    stages: RwLock<BTreeMap<BuildStage, Arc<dyn BuilderStrategy>>>,
    version: AtomicU64,
    subscribers: RwLock<Vec<Subscriber>>,
}

impl StagedStrategyChain {
    /// 创建空链
    pub fn new() -> Self {
        Self {
            stages: RwLock::new(BTreeMap::new()),
            version: AtomicU64::new(0),
            subscribers: RwLock::new(Vec::new()),
        }
    }

    /// 在空阶段放置策略
    ///
    /// 阶段已被占用时返回 [`RegistrationError::DuplicateStage`]。
    pub fn add(&self, stage: BuildStage, strategy: Arc<dyn BuilderStrategy>) -> RegistrationResult<()> {
        {
            let mut stages = self.stages.write();
            if stages.contains_key(&stage) {
                return Err(RegistrationError::DuplicateStage {
                    stage: stage.to_string(),
                });
            }
            debug!("添加构建策略: {} -> {}", stage, strategy.name());
            stages.insert(stage, strategy);
        }
        self.changed();
        Ok(())
    }

    /// 替换阶段上的策略，返回原策略
    pub fn replace(&self, stage: BuildStage, strategy: Arc<dyn BuilderStrategy>) -> Option<Arc<dyn BuilderStrategy>> {
        let previous = {
            debug!("替换构建策略: {} -> {}", stage, strategy.name());
            self.stages.write().insert(stage, strategy)
        };
        self.changed();
        previous
    }

    /// 移除阶段上的策略
    pub fn remove(&self, stage: BuildStage) -> Option<Arc<dyn BuilderStrategy>> {
        let removed = self.stages.write().remove(&stage);
        if removed.is_some() {
            debug!("移除构建策略: {}", stage);
            self.changed();
        }
        removed
    }

    /// 阶段上的策略
    pub fn get(&self, stage: BuildStage) -> Option<Arc<dyn BuilderStrategy>> {
        self.stages.read().get(&stage).cloned()
    }

    /// 按阶段顺序取得全部策略的快照
    pub fn strategies(&self) -> Vec<Arc<dyn BuilderStrategy>> {
        self.stages.read().values().cloned().collect()
    }

    /// 已占用的阶段数
    pub fn len(&self) -> usize {
        self.stages.read().len()
    }

    /// 是否为空链
    pub fn is_empty(&self) -> bool {
        self.stages.read().is_empty()
    }

    /// 当前版本号
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// 订阅变更通知，回调收到变更后的版本号
    pub fn subscribe(&self, callback: impl Fn(u64) + Send + Sync + 'static) {
        self.subscribers.write().push(Box::new(callback));
    }

    fn changed(&self) {
        let version = self.version.fetch_add(1, Ordering::AcqRel) + 1;
        for subscriber in self.subscribers.read().iter() {
            subscriber(version);
        }
    }
}

impl Default for StagedStrategyChain {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StagedStrategyChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stages = self.stages.read();
        f.debug_struct("StagedStrategyChain")
            .field("stages", &stages.iter().map(|(stage, strategy)| (*stage, strategy.name())).collect::<Vec<_>>())
            .field("version", &self.version())
            .finish()
    }
}
