//! 递归保护

use crate::chain::{BuildSteps, BuilderStrategy};
use crate::context::{PipelineContext, SuspendedPath};
use di_abstractions::Contract;
use infrastructure_common::DependencyError;
use tracing::trace;

/// 限制嵌套深度并检测循环依赖
#[derive(Debug, Clone, Copy)]
pub struct RecursionGuardStrategy {
    max_depth: usize,
    detect_cycles: bool,
}

impl RecursionGuardStrategy {
    /// 创建递归保护
    pub fn new(max_depth: usize, detect_cycles: bool) -> Self {
        Self {
            max_depth,
            detect_cycles,
        }
    }
}

impl BuilderStrategy for RecursionGuardStrategy {
    fn name(&self) -> &'static str {
        "RecursionGuard"
    }

    fn steps(&self) -> BuildSteps {
        BuildSteps::BOTH
    }

    fn pre_build_up(&self, context: &mut PipelineContext<'_>) {
        // 工厂等用户代码发起的解析要接上挂起的外层路径
        let fault = SuspendedPath::with(|outer| {
            let depth = outer.len() + context.depth();
            if depth > self.max_depth {
                return Some(DependencyError::DepthExceeded {
                    type_name: context.contract().type_handle().name().to_string(),
                    max_depth: self.max_depth,
                });
            }
            if !self.detect_cycles {
                return None;
            }

            let ancestors: Vec<&Contract> = context.ancestors().map(|ancestor| ancestor.contract()).collect();
            let mut chain: Vec<&Contract> = outer.iter().chain(ancestors.into_iter().rev()).collect();
            let start = chain.iter().rposition(|contract| *contract == context.contract())?;
            chain.push(context.contract());
            Some(DependencyError::CircularDependency {
                dependency_chain: chain[start..]
                    .iter()
                    .map(|contract| contract.to_string())
                    .collect::<Vec<_>>()
                    .join(" -> "),
            })
        });
        if let Some(fault) = fault {
            context.fault(fault);
        }
    }

    fn post_build_up(&self, context: &mut PipelineContext<'_>) {
        trace!("构建完成: {} (深度 {})", context.contract(), context.depth());
    }
}
