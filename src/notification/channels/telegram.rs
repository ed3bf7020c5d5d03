//! Telegram 渠道（Bot API sendMessage）

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

use crate::error::SinkError;
use crate::feed::Item;
use crate::notification::channel::{NotificationChannel, SendResult};
use crate::notification::formatter::telegram_message;

const CHANNEL: &str = "telegram";

/// Telegram Bot API 地址
pub const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

/// Telegram 渠道配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// 是否启用
    pub send: bool,
    /// 以 info 级别记录请求和响应内容
    #[serde(rename = "senddebug")]
    pub send_debug: bool,
    /// Chat ID
    #[serde(rename = "chatid")]
    pub chat_id: i64,
    /// Bot token
    pub token: String,
    /// API 地址（测试时指向 mock server）
    pub api_base: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            send: false,
            send_debug: false,
            chat_id: 0,
            token: String::new(),
            api_base: TELEGRAM_API_BASE.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
    parse_mode: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    #[serde(default)]
    retry_after: Option<u64>,
}

/// Telegram 渠道
pub struct TelegramChannel {
    config: TelegramConfig,
    client: Client,
}

impl TelegramChannel {
    pub fn new(config: TelegramConfig, timeout: Duration) -> Result<Self, SinkError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SinkError::permanent(CHANNEL, format!("cannot create HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.config.api_base.trim_end_matches('/'),
            self.config.token
        )
    }
}

impl NotificationChannel for TelegramChannel {
    fn name(&self) -> &str {
        CHANNEL
    }

    fn send(&self, item: &Item) -> Result<SendResult, SinkError> {
        let text = telegram_message(item);
        let request = SendMessageRequest {
            chat_id: self.config.chat_id,
            text: &text,
            parse_mode: "HTML",
        };

        if self.config.send_debug {
            info!(channel = CHANNEL, chat_id = self.config.chat_id, text = %text, "Sending message");
        }

        // URL 中含 token，错误信息里去掉 URL
        let response = self
            .client
            .post(self.endpoint())
            .json(&request)
            .send()
            .map_err(|e| SinkError::from_http(CHANNEL, e.without_url()))?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| SinkError::from_http(CHANNEL, e.without_url()))?;

        if self.config.send_debug {
            info!(channel = CHANNEL, status = status.as_u16(), body = %body, "Bot API response");
        }

        let parsed: Option<ApiResponse> = serde_json::from_str(&body).ok();

        if status.is_success() && parsed.as_ref().map(|r| r.ok).unwrap_or(false) {
            info!(channel = CHANNEL, identity = %item.identity, "Sent to telegram");
            return Ok(SendResult::Sent);
        }

        let retry_after = parsed
            .as_ref()
            .and_then(|r| r.parameters.as_ref())
            .and_then(|p| p.retry_after);
        let reason = format!(
            "HTTP {}: {}",
            status.as_u16(),
            parsed
                .and_then(|r| r.description)
                .unwrap_or(body)
        );

        if status.as_u16() == 429 || status.is_server_error() || retry_after.is_some() {
            Err(SinkError::transient(CHANNEL, reason))
        } else {
            Err(SinkError::permanent(CHANNEL, reason))
        }
    }
}
