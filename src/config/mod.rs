//! 配置管理模块
//!
//! 使用 TOML 文件存储配置，遵循 XDG 规范：
//! - Linux: ~/.config/marginalia/config.toml
//! - macOS: ~/Library/Application Support/com.marginalia.Marginalia/config.toml
//! - Windows: %APPDATA%\marginalia\Marginalia\config\config.toml
//!
//! API 密钥优先从环境变量读取，配置文件中的 `api_key` 仅作回退。

use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::ai::Credential;

pub use crate::ai::inference::{EndpointConfig, EndpointTable, InferenceConfig};
pub use crate::dispatch::DispatchConfig;

/// 应用配置（顶层结构）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// 推理 API 配置
    #[serde(default)]
    pub inference: InferenceConfig,
    /// 任务分发配置
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

impl AppConfig {
    /// 获取配置目录路径
    pub fn config_dir() -> Result<PathBuf> {
        if let Some(proj_dirs) = ProjectDirs::from("com", "marginalia", "Marginalia") {
            Ok(proj_dirs.config_dir().to_path_buf())
        } else {
            // 回退到 ~/.marginalia
            let home = dirs::home_dir().ok_or_else(|| anyhow!("Cannot find home directory"))?;
            Ok(home.join(".marginalia"))
        }
    }

    /// 获取配置文件完整路径
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// 从默认位置加载配置
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// 从指定文件加载配置
    ///
    /// 如果文件不存在，返回默认配置并创建文件
    pub fn load_from(path: &Path) -> Result<Self> {
        debug!("Loading config from: {}", path.display());

        let config = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            let config: Self = toml::from_str(&content).map_err(|e| {
                warn!("Failed to parse config file: {}", e);
                anyhow!("Invalid config file {}: {}", path.display(), e)
            })?;
            info!("Config loaded from: {}", path.display());
            config
        } else {
            info!("Config file not found, creating default at: {}", path.display());
            let config = Self::default();
            config.save_to(path)?;
            config
        };

        config.inference.validate()?;
        Ok(config)
    }

    /// 保存配置到默认位置
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    /// 保存配置到指定文件
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let dir = path.parent().ok_or_else(|| anyhow!("Invalid config path"))?;

        // 确保目录存在
        if !dir.as_os_str().is_empty() && !dir.exists() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
            debug!("Created config directory: {}", dir.display());
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, &content)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;

        // 可能包含 API 密钥，仅用户可读写
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(path)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(path, perms)?;
        }

        info!("Config saved to: {}", path.display());
        Ok(())
    }

    /// 用于展示的副本，API 密钥只保留前缀
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        config.inference.api_key = config
            .inference
            .api_key
            .as_deref()
            .and_then(Credential::new)
            .map(|credential| credential.masked());
        config
    }

    /// 渲染为可打印的 TOML（密钥已遮蔽）
    pub fn to_display_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(&self.redacted())?)
    }
}
