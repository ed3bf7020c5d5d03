//! 错误类型 - 存储、渠道、分发三层

use std::path::PathBuf;
use thiserror::Error;

/// Delivery Store 错误
#[derive(Debug, Error)]
pub enum StoreError {
    /// 无法打开或读取（锁竞争、文件损坏、目录不存在、未初始化）
    #[error("store {path} unavailable: {reason}")]
    Unavailable { path: PathBuf, reason: String },

    /// 写入未能持久化
    #[error("store {path} write failed: {reason}")]
    Write { path: PathBuf, reason: String },
}

impl StoreError {
    pub(crate) fn unavailable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Unavailable {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Write {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// 渠道发送错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SinkError {
    /// 可重试（超时、限流、服务端 5xx）
    #[error("channel {channel}: transient error: {reason}")]
    Transient { channel: String, reason: String },

    /// 不可重试（凭证错误、请求格式错误）
    #[error("channel {channel}: permanent error: {reason}")]
    Permanent { channel: String, reason: String },
}

impl SinkError {
    pub fn transient(channel: impl Into<String>, reason: impl ToString) -> Self {
        Self::Transient {
            channel: channel.into(),
            reason: reason.to_string(),
        }
    }

    pub fn permanent(channel: impl Into<String>, reason: impl ToString) -> Self {
        Self::Permanent {
            channel: channel.into(),
            reason: reason.to_string(),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    /// 出错的渠道名称
    pub fn channel(&self) -> &str {
        match self {
            Self::Transient { channel, .. } | Self::Permanent { channel, .. } => channel,
        }
    }

    /// 将 reqwest 错误归类：超时和连接失败可重试，其余视为永久错误
    pub fn from_http(channel: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            return Self::transient(channel, err);
        }
        match err.status() {
            Some(status) if status.as_u16() == 429 || status.is_server_error() => {
                Self::transient(channel, err)
            }
            _ => Self::permanent(channel, err),
        }
    }
}

/// 一次分发运行的错误
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("store stage failed: {0}")]
    Store(#[from] StoreError),

    #[error("sink stage failed: {0}")]
    Sink(#[from] SinkError),

    /// 已配置但未实现的渠道（仅在 strict 模式下报错）
    #[error("channel {channel} is enabled but not implemented")]
    Unimplemented { channel: String },
}
