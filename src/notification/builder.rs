//! 通知系统构建器 - 根据配置创建渠道和分发器

use std::sync::Arc;
use tracing::{info, warn};

use super::channels::{FacebookChannel, TelegramChannel, VkChannel};
use super::dispatcher::NotificationDispatcher;
use crate::config::Config;
use crate::error::DispatchError;

/// 通知系统构建器
///
/// 渠道顺序固定为 telegram -> vk -> facebook；`send: false` 的渠道不会被创建。
pub struct NotificationBuilder<'a> {
    config: &'a Config,
    dry_run: bool,
}

impl<'a> NotificationBuilder<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self {
            config,
            dry_run: false,
        }
    }

    /// 设置 dry-run 模式
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn build(self) -> Result<NotificationDispatcher, DispatchError> {
        let config = self.config;
        let mut dispatcher = NotificationDispatcher::new()
            .with_retry(config.retry.clone())
            .with_parallel(config.parallel)
            .with_dry_run(self.dry_run);

        // 1. Telegram
        if config.telegram.send {
            info!(channel = "telegram", chat_id = config.telegram.chat_id, "Telegram channel enabled");
            let channel = TelegramChannel::new(config.telegram.clone(), config.timeout())?;
            dispatcher.register_channel(Arc::new(channel));
        }

        // 2. VK
        if config.vk.send {
            info!(channel = "vk", owner_id = config.vk.owner_id, "VK channel enabled");
            let channel = VkChannel::new(config.vk.clone(), config.timeout())?;
            dispatcher.register_channel(Arc::new(channel));
        }

        // 3. Facebook（未实现）
        if config.facebook.send {
            if config.facebook.strict {
                return Err(DispatchError::Unimplemented {
                    channel: "facebook".to_string(),
                });
            }
            warn!(channel = "facebook", "Facebook channel enabled but not implemented, items will be skipped");
            dispatcher.register_channel(Arc::new(FacebookChannel::new()));
        }

        if dispatcher.channel_count() == 0 {
            warn!("No channels enabled; new items will be recorded without being sent");
        }

        Ok(dispatcher)
    }
}
