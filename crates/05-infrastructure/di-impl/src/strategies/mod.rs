//! 内置构建策略与按注册类别划分的策略链

mod collection;
mod constructor;
mod factory;
mod guard;
mod members;

pub use collection::CollectionStrategy;
pub use constructor::ConstructorStrategy;
pub use factory::{FactoryStrategy, InstanceStrategy};
pub use guard::RecursionGuardStrategy;
pub use members::{FieldStrategy, MethodStrategy, PropertyStrategy};

use crate::chain::{BuildStage, StagedStrategyChain};
use crate::pipeline::{Pipeline, PipelineCache};
use di_abstractions::{ContainerConfig, RegistrationCategory};
use std::fmt;
use std::sync::Arc;

/// 容器（及其子容器）共享的策略链
pub struct Strategies {
    type_chain: Arc<StagedStrategyChain>,
    factory_chain: Arc<StagedStrategyChain>,
    instance_chain: Arc<StagedStrategyChain>,
    collection_chain: Arc<StagedStrategyChain>,
    type_pipeline: PipelineCache,
    factory_pipeline: PipelineCache,
    instance_pipeline: PipelineCache,
    collection_pipeline: PipelineCache,
}

impl Strategies {
    /// 按配置组装默认策略链
    pub fn new(config: &ContainerConfig) -> Self {
        let guard = Arc::new(RecursionGuardStrategy::new(
            config.max_resolution_depth,
            config.enable_circular_dependency_detection,
        ));

        let type_chain = Arc::new(StagedStrategyChain::new());
        type_chain.replace(BuildStage::Setup, guard.clone());
        type_chain.replace(BuildStage::Creation, Arc::new(ConstructorStrategy));
        type_chain.replace(BuildStage::Fields, Arc::new(FieldStrategy));
        type_chain.replace(BuildStage::Properties, Arc::new(PropertyStrategy));
        type_chain.replace(BuildStage::Methods, Arc::new(MethodStrategy));

        let factory_chain = Arc::new(StagedStrategyChain::new());
        factory_chain.replace(BuildStage::Setup, guard.clone());
        factory_chain.replace(BuildStage::Creation, Arc::new(FactoryStrategy));

        let instance_chain = Arc::new(StagedStrategyChain::new());
        instance_chain.replace(BuildStage::Creation, Arc::new(InstanceStrategy));

        let collection_chain = Arc::new(StagedStrategyChain::new());
        collection_chain.replace(BuildStage::Setup, guard);
        collection_chain.replace(BuildStage::Creation, Arc::new(CollectionStrategy));

        let mode = config.pipeline_mode;
        Self {
            type_pipeline: PipelineCache::new(type_chain.clone(), mode),
            factory_pipeline: PipelineCache::new(factory_chain.clone(), mode),
            instance_pipeline: PipelineCache::new(instance_chain.clone(), mode),
            collection_pipeline: PipelineCache::new(collection_chain.clone(), mode),
            type_chain,
            factory_chain,
            instance_chain,
            collection_chain,
        }
    }

    /// 类型注册的策略链
    pub fn type_chain(&self) -> &Arc<StagedStrategyChain> {
        &self.type_chain
    }

    /// 工厂注册的策略链
    pub fn factory_chain(&self) -> &Arc<StagedStrategyChain> {
        &self.factory_chain
    }

    /// 实例与内部注册的策略链
    pub fn instance_chain(&self) -> &Arc<StagedStrategyChain> {
        &self.instance_chain
    }

    /// 数组与序列的策略链
    pub fn collection_chain(&self) -> &Arc<StagedStrategyChain> {
        &self.collection_chain
    }

    // 未初始化的注册按类型注册处理
    fn cache(&self, category: RegistrationCategory) -> &PipelineCache {
        match category {
            RegistrationCategory::Type | RegistrationCategory::Uninitialized => &self.type_pipeline,
            RegistrationCategory::Factory => &self.factory_pipeline,
            RegistrationCategory::Instance | RegistrationCategory::Internal => &self.instance_pipeline,
            RegistrationCategory::Cache => &self.collection_pipeline,
        }
    }

    /// 类别对应的链版本
    pub(crate) fn version(&self, category: RegistrationCategory) -> u64 {
        self.cache(category).version()
    }

    /// 类别对应的管线及其链版本
    pub(crate) fn pipeline(&self, category: RegistrationCategory) -> (u64, Pipeline) {
        self.cache(category).pipeline()
    }
}

impl fmt::Debug for Strategies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Strategies")
            .field("type_chain", &self.type_chain)
            .field("factory_chain", &self.factory_chain)
            .field("instance_chain", &self.instance_chain)
            .field("collection_chain", &self.collection_chain)
            .finish()
    }
}
