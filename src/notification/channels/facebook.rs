//! Facebook 渠道 - 尚未实现，发送时只记录警告

use serde::Deserialize;
use tracing::warn;

use crate::error::SinkError;
use crate::feed::Item;
use crate::notification::channel::{NotificationChannel, SendResult};

const CHANNEL: &str = "facebook";

/// Facebook 渠道配置
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FacebookConfig {
    pub send: bool,
    pub token: String,
    /// 为 true 时，启用该渠道会在构建阶段报错而不是静默跳过
    pub strict: bool,
}

/// Facebook 渠道（no-op）
#[derive(Debug, Default)]
pub struct FacebookChannel;

impl FacebookChannel {
    pub fn new() -> Self {
        Self
    }
}

impl NotificationChannel for FacebookChannel {
    fn name(&self) -> &str {
        CHANNEL
    }

    fn send(&self, item: &Item) -> Result<SendResult, SinkError> {
        warn!(channel = CHANNEL, identity = %item.identity, "Sending to facebook is not implemented yet");
        Ok(SendResult::Skipped("not implemented".to_string()))
    }
}
