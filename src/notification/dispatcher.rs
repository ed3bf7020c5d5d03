//! 分发协调器 - 计算 delta、发送到所有渠道、成功后提交账本
//!
//! 状态流转：
//! ```text
//! Start -> DeltaComputed -> (空) NothingNew
//!                        -> Dispatching -> 全部成功 -> Committing -> Done
//!                                       -> 任一渠道失败 -> Aborted（不提交）
//! ```
//!
//! 账本只在所有渠道都成功发送全部 delta 之后才写入，中途失败或进程被杀都不会留下部分提交。
//! 代价是重新运行时，已经成功的渠道可能收到重复消息。

use serde::Serialize;
use std::sync::Arc;
use std::thread;
use tracing::{debug, error, info};

use super::channel::{NotificationChannel, SendResult};
use super::retry::RetryPolicy;
use crate::delta::compute_delta;
use crate::error::{DispatchError, SinkError, StoreError};
use crate::feed::Item;
use crate::store::{DeliveryRecord, DeliveryStore};

/// 一次运行的结束状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    /// 没有新条目，未打开任何渠道
    NothingNew,
    /// dry-run：只计算 delta
    DryRun,
    /// 发送并提交完成
    Done,
}

/// 运行报告
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub state: RunState,
    /// feed 条目数
    pub feed: usize,
    /// 新条目数
    pub delta: usize,
    /// 成功发送次数（渠道 × 条目）
    pub sent: usize,
    /// 跳过次数
    pub skipped: usize,
    /// 写入账本的条目数
    pub committed: usize,
}

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    sent: usize,
    skipped: usize,
}

impl Tally {
    fn merge(self, other: Tally) -> Tally {
        Tally {
            sent: self.sent + other.sent,
            skipped: self.skipped + other.skipped,
        }
    }
}

/// 通知分发器
pub struct NotificationDispatcher {
    /// 按配置顺序排列的渠道
    channels: Vec<Arc<dyn NotificationChannel>>,
    retry: RetryPolicy,
    parallel: bool,
    dry_run: bool,
}

impl NotificationDispatcher {
    pub fn new() -> Self {
        Self {
            channels: Vec::new(),
            retry: RetryPolicy::none(),
            parallel: false,
            dry_run: false,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// 各渠道在独立线程中发送
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// 注册渠道（发送顺序即注册顺序）
    pub fn register_channel(&mut self, channel: Arc<dyn NotificationChannel>) {
        info!(channel = channel.name(), "Registering notification channel");
        self.channels.push(channel);
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    /// 正常运行：delta -> 发送 -> 提交
    pub fn run<S>(&self, items: &[Item], store: &mut S) -> Result<RunReport, DispatchError>
    where
        S: DeliveryStore + ?Sized,
    {
        let delta = compute_delta(items, store)?;
        let mut report = RunReport {
            state: RunState::NothingNew,
            feed: items.len(),
            delta: delta.len(),
            sent: 0,
            skipped: 0,
            committed: 0,
        };

        if delta.is_empty() {
            info!(feed = items.len(), "No new items");
            return Ok(report);
        }

        info!(count = delta.len(), "New items found");
        for item in &delta {
            debug!(identity = %item.identity, title = %item.title, "New item");
        }

        if self.dry_run {
            for item in &delta {
                eprintln!("[DRY-RUN] Would send: {} ({})", item.title, item.identity);
            }
            report.state = RunState::DryRun;
            return Ok(report);
        }

        info!(channels = ?self.channel_names(), "Run send process");
        let tally = match self.dispatch(&delta) {
            Ok(tally) => tally,
            Err(e) => {
                error!(channel = e.channel(), error = %e, "Dispatch aborted, store left untouched");
                return Err(e.into());
            }
        };

        let records: Vec<DeliveryRecord> = delta.into_iter().map(DeliveryRecord::new).collect();
        let committed = records.len();
        info!(count = committed, "Update DB");
        store.put_all(records)?;

        report.state = RunState::Done;
        report.sent = tally.sent;
        report.skipped = tally.skipped;
        report.committed = committed;
        Ok(report)
    }

    fn dispatch(&self, delta: &[Item]) -> Result<Tally, SinkError> {
        if self.parallel && self.channels.len() > 1 {
            return self.dispatch_parallel(delta);
        }

        let mut tally = Tally::default();
        for channel in &self.channels {
            tally = tally.merge(self.send_all(channel.as_ref(), delta)?);
        }
        Ok(tally)
    }

    /// 每个渠道一个线程；等所有线程结束后再按配置顺序返回第一个错误
    fn dispatch_parallel(&self, delta: &[Item]) -> Result<Tally, SinkError> {
        let results: Vec<Result<Tally, SinkError>> = thread::scope(|scope| {
            let handles: Vec<_> = self
                .channels
                .iter()
                .map(|channel| {
                    let channel = channel.as_ref();
                    (channel.name(), scope.spawn(move || self.send_all(channel, delta)))
                })
                .collect();

            handles
                .into_iter()
                .map(|(name, handle)| {
                    handle
                        .join()
                        .unwrap_or_else(|_| Err(SinkError::permanent(name, "sender thread panicked")))
                })
                .collect()
        });

        let mut tally = Tally::default();
        let mut first_error = None;
        for result in results {
            match result {
                Ok(t) => tally = tally.merge(t),
                Err(e) => {
                    if first_error.is_none() {
                        first_error = Some(e);
                    } else {
                        error!(channel = e.channel(), error = %e, "Additional channel failure");
                    }
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(tally),
        }
    }

    /// 按 delta 顺序发送到单个渠道，遇错即停
    fn send_all(&self, channel: &dyn NotificationChannel, delta: &[Item]) -> Result<Tally, SinkError> {
        let mut tally = Tally::default();
        for item in delta {
            debug!(channel = channel.name(), identity = %item.identity, "Sending item");
            match self.retry.run(|| channel.send(item))? {
                SendResult::Sent => tally.sent += 1,
                SendResult::Skipped(reason) => {
                    debug!(channel = channel.name(), reason = %reason, "Item skipped");
                    tally.skipped += 1;
                }
            }
        }
        Ok(tally)
    }
}

impl Default for NotificationDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// 初始化账本：记录当前 feed 的全部条目，不发送
pub fn initialize<S>(items: &[Item], store: &mut S) -> Result<usize, StoreError>
where
    S: DeliveryStore + ?Sized,
{
    info!(count = items.len(), "Initialize DB");
    store.initialize(items)
}
