//! 容器配置

use infrastructure_common::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};

/// 管线执行方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineMode {
    /// 预先组合为嵌套闭包
    #[default]
    Compiled,
    /// 按策略列表循环执行
    Interpreted,
}

/// 释放顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisposeOrder {
    /// 与获取顺序相反
    #[default]
    Reverse,
    /// 与获取顺序相同
    Registration,
}

/// 容器配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    /// 是否启用循环依赖检测
    pub enable_circular_dependency_detection: bool,
    /// 最大解析深度
    pub max_resolution_depth: usize,
    /// 管线执行方式
    pub pipeline_mode: PipelineMode,
    /// 动态值最多展开次数
    pub max_dynamic_unwrap: usize,
    /// 释放顺序
    pub dispose_order: DisposeOrder,
    /// 是否在注册时校验注入声明
    pub enable_validation: bool,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        Self {
            enable_circular_dependency_detection: true,
            max_resolution_depth: 100,
            pipeline_mode: PipelineMode::Compiled,
            max_dynamic_unwrap: 8,
            dispose_order: DisposeOrder::Reverse,
            enable_validation: true,
        }
    }
}

impl ContainerConfig {
    /// 校验配置取值
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_resolution_depth == 0 {
            return Err(ConfigError::ValidationError {
                message: "max_resolution_depth 必须大于 0".to_string(),
            });
        }
        if self.max_dynamic_unwrap == 0 {
            return Err(ConfigError::ValidationError {
                message: "max_dynamic_unwrap 必须大于 0".to_string(),
            });
        }
        Ok(())
    }
}
