//! VK 渠道（wall.post，以链接作为附件）

use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::info;

use crate::error::SinkError;
use crate::feed::Item;
use crate::notification::channel::{NotificationChannel, SendResult};

const CHANNEL: &str = "vk";

/// VK API 地址
pub const VK_API_BASE: &str = "https://api.vk.com";

/// VK API 版本
pub const VK_API_VERSION: &str = "5.131";

/// 可重试的 VK 错误码：请求过多、flood control、服务端内部错误
const TRANSIENT_ERROR_CODES: [i64; 3] = [6, 9, 10];

/// VK 渠道配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VkConfig {
    /// 是否启用
    pub send: bool,
    /// access token
    pub token: String,
    /// 墙的所有者（社区为负数）
    #[serde(rename = "ownerid")]
    pub owner_id: i64,
    pub api_base: String,
    pub api_version: String,
}

impl Default for VkConfig {
    fn default() -> Self {
        Self {
            send: false,
            token: String::new(),
            owner_id: 0,
            api_base: VK_API_BASE.to_string(),
            api_version: VK_API_VERSION.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    response: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error_code: i64,
    #[serde(default)]
    error_msg: String,
}

/// VK 墙发布渠道
pub struct VkChannel {
    config: VkConfig,
    client: Client,
}

impl VkChannel {
    pub fn new(config: VkConfig, timeout: Duration) -> Result<Self, SinkError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SinkError::permanent(CHANNEL, format!("cannot create HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }
}

impl NotificationChannel for VkChannel {
    fn name(&self) -> &str {
        CHANNEL
    }

    fn send(&self, item: &Item) -> Result<SendResult, SinkError> {
        let url = format!("{}/method/wall.post", self.config.api_base.trim_end_matches('/'));
        let owner_id = self.config.owner_id.to_string();
        let params = [
            ("owner_id", owner_id.as_str()),
            ("attachments", item.permalink()),
            ("access_token", self.config.token.as_str()),
            ("v", self.config.api_version.as_str()),
        ];

        let response = self
            .client
            .post(&url)
            .form(&params)
            .send()
            .map_err(|e| SinkError::from_http(CHANNEL, e))?;

        let status = response.status();
        let body = response.text().map_err(|e| SinkError::from_http(CHANNEL, e))?;

        if status.as_u16() == 429 || status.is_server_error() {
            return Err(SinkError::transient(CHANNEL, format!("HTTP {}: {}", status.as_u16(), body)));
        }

        let parsed: ApiResponse = serde_json::from_str(&body).map_err(|e| {
            SinkError::permanent(CHANNEL, format!("unexpected response (HTTP {}): {}", status.as_u16(), e))
        })?;

        if let Some(error) = parsed.error {
            let reason = format!("error {}: {}", error.error_code, error.error_msg);
            return if TRANSIENT_ERROR_CODES.contains(&error.error_code) {
                Err(SinkError::transient(CHANNEL, reason))
            } else {
                Err(SinkError::permanent(CHANNEL, reason))
            };
        }

        match parsed.response {
            Some(response) => {
                info!(
                    channel = CHANNEL,
                    identity = %item.identity,
                    post_id = ?response.get("post_id"),
                    "Sent to vk"
                );
                Ok(SendResult::Sent)
            }
            None => Err(SinkError::permanent(CHANNEL, format!("empty response: {}", body))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn channel(server: &MockServer) -> VkChannel {
        let config = VkConfig {
            send: true,
            token: "secret".to_string(),
            owner_id: -1234,
            api_base: server.base_url(),
            ..Default::default()
        };
        VkChannel::new(config, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_wall_post_with_link_attachment() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/method/wall.post")
                .body_contains("owner_id=-1234")
                .body_contains("attachments=https%3A%2F%2Fexample.com%2F1")
                .body_contains("v=5.131");
            then.status(200).json_body(json!({"response": {"post_id": 55}}));
        });

        let item = Item::new("Hello", "https://example.com/1");
        assert_eq!(channel(&server).send(&item).unwrap(), SendResult::Sent);
        mock.assert();
    }

    #[test]
    fn test_auth_error_is_permanent() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/method/wall.post");
            then.status(200).json_body(json!({
                "error": {"error_code": 5, "error_msg": "User authorization failed"}
            }));
        });

        let err = channel(&server).send(&Item::new("a", "https://example.com/a")).unwrap_err();
        assert!(!err.is_transient());
        assert!(err.to_string().contains("authorization failed"));
    }

    #[test]
    fn test_flood_control_is_transient() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/method/wall.post");
            then.status(200).json_body(json!({
                "error": {"error_code": 9, "error_msg": "Flood control"}
            }));
        });

        let err = channel(&server).send(&Item::new("a", "https://example.com/a")).unwrap_err();
        assert!(err.is_transient());
    }

    #[test]
    fn test_timeout_is_transient() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/method/wall.post");
            then.status(200)
                .delay(Duration::from_millis(1500))
                .json_body(json!({"response": {"post_id": 1}}));
        });

        let mut config = channel(&server).config;
        let channel = VkChannel::new(config, Duration::from_millis(200)).unwrap();

        let err = channel.send(&Item::new("a", "https://example.com/a")).unwrap_err();
        assert!(err.is_transient(), "unexpected error: {}", err);
        assert!(!err.to_string().contains("secret"));
    }

    #[test]
    fn test_connection_refused_is_transient() {
        let config = VkConfig {
            send: true,
            token: "secret".to_string(),
            owner_id: -1234,
            api_base: "http://127.0.0.1:1".to_string(),
            ..Default::default()
        };
        let channel = VkChannel::new(config, Duration::from_secs(2)).unwrap();

        let err = channel.send(&Item::new("a", "https://example.com/a")).unwrap_err();
        assert!(err.is_transient(), "unexpected error: {}", err);
    }
}
