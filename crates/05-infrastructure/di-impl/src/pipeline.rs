//! 管线组合
//!
//! 编译方式把策略从内向外包装为嵌套闭包；解释方式按策略列表循环执行。
//! 两种方式在每个步骤之后检查出错标志，观察到的结果相同。

use crate::chain::{BuilderStrategy, StagedStrategyChain};
use crate::context::PipelineContext;
use di_abstractions::PipelineMode;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// 组合后的管线
pub type Pipeline = Arc<dyn Fn(&mut PipelineContext<'_>) + Send + Sync>;

fn pipeline<F>(run: F) -> Pipeline
where
    F: Fn(&mut PipelineContext<'_>) + Send + Sync + 'static,
{
    Arc::new(run)
}

/// 管线构建器
#[derive(Debug)]
pub struct PipelineBuilder {
    strategies: Vec<Arc<dyn BuilderStrategy>>,
}

impl PipelineBuilder {
    /// 从策略链的当前快照创建；不提供任何步骤的策略被跳过
    pub fn new(chain: &StagedStrategyChain) -> Self {
        Self::from_strategies(chain.strategies())
    }

    /// 从策略列表创建
    pub fn from_strategies(strategies: Vec<Arc<dyn BuilderStrategy>>) -> Self {
        Self {
            strategies: strategies
                .into_iter()
                .filter(|strategy| strategy.steps().any())
                .collect(),
        }
    }

    /// 按执行方式构建
    pub fn build(self, mode: PipelineMode) -> Pipeline {
        match mode {
            PipelineMode::Compiled => self.compile(),
            PipelineMode::Interpreted => self.interpret(),
        }
    }

    /// 组合为嵌套闭包：最内层是最后一个策略
    pub fn compile(self) -> Pipeline {
        let mut composed = pipeline(|_| {});
        for strategy in self.strategies.into_iter().rev() {
            let inner = composed;
            let steps = strategy.steps();
            composed = pipeline(move |context| {
                if steps.pre {
                    strategy.pre_build_up(context);
                    if context.is_faulted() {
                        return;
                    }
                }
                inner(context);
                if context.is_faulted() {
                    return;
                }
                if steps.post {
                    strategy.post_build_up(context);
                }
            });
        }
        composed
    }

    /// 循环执行：前置步骤正序，后置步骤逆序
    pub fn interpret(self) -> Pipeline {
        let strategies = self.strategies;
        pipeline(move |context| {
            for strategy in &strategies {
                if strategy.steps().pre {
                    strategy.pre_build_up(context);
                    if context.is_faulted() {
                        return;
                    }
                }
            }
            for strategy in strategies.iter().rev() {
                if strategy.steps().post {
                    strategy.post_build_up(context);
                    if context.is_faulted() {
                        return;
                    }
                }
            }
        })
    }
}

/// 按链版本缓存的管线
///
/// 链变更时通过订阅清空缓存，下次取用时重新组合。
pub(crate) struct PipelineCache {
    chain: Arc<StagedStrategyChain>,
    mode: PipelineMode,
    cached: Arc<Mutex<Option<(u64, Pipeline)>>>,
}

impl PipelineCache {
    pub(crate) fn new(chain: Arc<StagedStrategyChain>, mode: PipelineMode) -> Self {
        let cached: Arc<Mutex<Option<(u64, Pipeline)>>> = Arc::new(Mutex::new(None));
        let slot = Arc::downgrade(&cached);
        chain.subscribe(move |_| {
            if let Some(slot) = slot.upgrade() {
                *slot.lock() = None;
            }
        });
        Self { chain, mode, cached }
    }

    /// 当前链版本
    pub(crate) fn version(&self) -> u64 {
        self.chain.version()
    }

    /// 取得管线及其对应的链版本
    pub(crate) fn pipeline(&self) -> (u64, Pipeline) {
        let mut cached = self.cached.lock();
        let version = self.chain.version();
        if let Some((built, pipeline)) = cached.as_ref() {
            if *built == version {
                return (version, pipeline.clone());
            }
        }

        let pipeline = PipelineBuilder::new(&self.chain).build(self.mode);
        debug!("组合管线: 链版本 {}, 方式 {:?}", version, self.mode);
        *cached = Some((version, pipeline.clone()));
        (version, pipeline)
    }
}
