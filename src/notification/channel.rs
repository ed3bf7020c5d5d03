//! 通知渠道 trait 定义

use crate::error::SinkError;
use crate::feed::Item;

/// 发送结果
#[derive(Debug, Clone, PartialEq)]
pub enum SendResult {
    /// 发送成功
    Sent,
    /// 跳过（渠道未实现等），视为无错误
    Skipped(String),
}

/// 通知渠道 trait
///
/// 每个渠道只负责"发送一条"，重试和提交由 `NotificationDispatcher` 决定。
pub trait NotificationChannel: Send + Sync {
    /// 渠道名称（用于日志和错误信息）
    fn name(&self) -> &str;

    /// 同步发送一条订阅条目
    fn send(&self, item: &Item) -> Result<SendResult, SinkError>;
}
