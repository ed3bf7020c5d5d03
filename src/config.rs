//! YAML 配置加载与校验
//!
//! 配置路径优先级：
//! 1. 命令行 `--configpath`
//! 2. `~/.config/ssender/config.yml`（存在时）
//! 3. `/etc/ssender/config.yml`

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use crate::notification::channels::{FacebookConfig, TelegramConfig, VkConfig};
use crate::notification::RetryPolicy;
use crate::store::DEFAULT_BUCKET;

/// 系统级默认配置路径
pub const SYSTEM_CONFIG_PATH: &str = "/etc/ssender/config.yml";

/// 运行配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Delivery Store 文件路径
    pub dbpath: String,
    /// 账本 bucket 名称
    pub bucket: String,
    /// 每个渠道的 HTTP 超时（秒）
    pub timeout_secs: u64,
    /// 等待账本文件锁的时间（毫秒）
    pub lock_timeout_ms: u64,
    /// 各渠道并行发送
    pub parallel: bool,
    pub retry: RetryPolicy,
    pub telegram: TelegramConfig,
    pub vk: VkConfig,
    pub facebook: FacebookConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dbpath: String::new(),
            bucket: DEFAULT_BUCKET.to_string(),
            timeout_secs: 30,
            lock_timeout_ms: 5000,
            parallel: false,
            retry: RetryPolicy::default(),
            telegram: TelegramConfig::default(),
            vk: VkConfig::default(),
            facebook: FacebookConfig::default(),
        }
    }
}

impl Config {
    /// 从文件加载
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("cannot read config {}", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// 解析配置路径（只在进程启动时调用一次）
    pub fn resolve_path(explicit: Option<PathBuf>) -> PathBuf {
        if let Some(path) = explicit {
            return path;
        }

        if let Some(user) = dirs::home_dir().map(|h| h.join(".config/ssender/config.yml")) {
            if user.exists() {
                return user;
            }
        }

        PathBuf::from(SYSTEM_CONFIG_PATH)
    }

    /// 在打开账本或发送之前检查配置
    pub fn validate(&self) -> Result<()> {
        if self.dbpath.trim().is_empty() {
            bail!("dbpath is required");
        }
        if self.bucket.trim().is_empty() {
            bail!("bucket must not be empty");
        }
        if self.telegram.send {
            if self.telegram.token.trim().is_empty() {
                bail!("telegram.token is required when telegram.send is true");
            }
            if self.telegram.chat_id == 0 {
                bail!("telegram.chatid is required when telegram.send is true");
            }
        }
        if self.vk.send {
            if self.vk.token.trim().is_empty() {
                bail!("vk.token is required when vk.send is true");
            }
            if self.vk.owner_id == 0 {
                bail!("vk.ownerid is required when vk.send is true");
            }
        }
        if self.facebook.send && !self.facebook.strict {
            warn!("facebook.send is enabled but posting to facebook is not implemented; items will be skipped");
        }
        Ok(())
    }

    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.dbpath)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }
}
