//! 重试策略 - 对瞬时错误做指数退避重试

use serde::{Deserialize, Serialize};
use std::thread;
use std::time::Duration;
use tracing::warn;

use crate::error::SinkError;

/// 重试配置
///
/// 默认 `max_retries = 0`，即首个错误立即中止本次运行。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// 最大重试次数（不含首次发送）
    pub max_retries: u32,
    /// 初始退避时间（毫秒）
    pub initial_backoff_ms: u64,
    /// 最大退避时间（毫秒）
    pub max_backoff_ms: u64,
    /// 退避倍数
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_backoff_ms: 500,
            max_backoff_ms: 5000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// 不重试
    pub fn none() -> Self {
        Self::default()
    }

    /// 第 `attempt` 次重试前的等待时间（attempt 从 0 开始）
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = self.backoff_multiplier.max(1.0).powi(attempt as i32);
        let ms = (self.initial_backoff_ms as f64 * factor).min(self.max_backoff_ms as f64);
        Duration::from_millis(ms as u64)
    }

    /// 执行操作；瞬时错误按策略重试，永久错误立即返回
    pub fn run<T, F>(&self, mut operation: F) -> Result<T, SinkError>
    where
        F: FnMut() -> Result<T, SinkError>,
    {
        let mut attempt = 0;
        loop {
            match operation() {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.max_retries => {
                    let wait = self.backoff(attempt);
                    let wait_ms = wait.as_millis() as u64;
                    warn!(
                        channel = err.channel(),
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        wait_ms,
                        error = %err,
                        "Transient send failure, retrying"
                    );
                    thread::sleep(wait);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
