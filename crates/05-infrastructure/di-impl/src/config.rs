//! 容器配置加载
//!
//! 依次合并配置文件（可缺失）与环境变量，绑定 `container` 配置节。
//! 环境变量形如 `DI__CONTAINER__MAX_RESOLUTION_DEPTH=32`。

use di_abstractions::ContainerConfig;
use infrastructure_common::{ConfigError, ConfigResult};
use std::path::PathBuf;
use tracing::{debug, error};

const SECTION: &str = "container";

/// 容器配置加载器
#[derive(Debug, Clone)]
pub struct ContainerConfigLoader {
    files: Vec<PathBuf>,
    env_prefix: String,
}

impl ContainerConfigLoader {
    /// 创建加载器，默认读取 `config/container` 与 `DI` 前缀的环境变量
    pub fn new() -> Self {
        Self {
            files: vec![PathBuf::from("config/container")],
            env_prefix: "DI".to_string(),
        }
    }

    /// 追加配置文件，后加入的优先
    #[must_use]
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.files.push(path.into());
        self
    }

    /// 环境变量前缀
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// 加载并校验配置；没有 `container` 配置节时使用默认值
    pub fn load(&self) -> ConfigResult<ContainerConfig> {
        let mut builder = config::Config::builder();
        for path in &self.files {
            builder = builder.add_source(config::File::from(path.as_path()).required(false));
        }
        let settings = builder
            .add_source(config::Environment::with_prefix(&self.env_prefix).separator("__"))
            .build()
            .map_err(|e| {
                error!("配置构建失败: {}", e);
                ConfigError::ParseError { source: Box::new(e) }
            })?;

        let container = match settings.get::<ContainerConfig>(SECTION) {
            Ok(container) => container,
            Err(config::ConfigError::NotFound(_)) => {
                debug!("未找到配置节 {}，使用默认配置", SECTION);
                ContainerConfig::default()
            }
            Err(e) => {
                error!("配置绑定失败: path={}, error={}", SECTION, e);
                return Err(ConfigError::ParseError { source: Box::new(e) });
            }
        };

        container.validate()?;
        debug!("配置绑定成功: {} -> {:?}", SECTION, container);
        Ok(container)
    }
}

impl Default for ContainerConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
