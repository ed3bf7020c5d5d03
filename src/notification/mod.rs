//! 通知层 - 渠道抽象、分发与提交
//!
//! # 设计目标
//! 1. 统一接口：所有渠道实现 `NotificationChannel` trait，只负责发送一条
//! 2. 渠道解耦：新增渠道只需实现 trait 并在 `NotificationBuilder` 中注册
//! 3. 提交边界：`NotificationDispatcher` 只在全部渠道成功后写入账本
//!
//! # 使用示例
//! ```ignore
//! use ssender::{Config, JsonFileStore, NotificationBuilder};
//!
//! let dispatcher = NotificationBuilder::new(&config).build()?;
//! let mut store = JsonFileStore::open(config.db_path())?;
//! let report = dispatcher.run(&items, &mut store)?;
//! ```

pub mod builder;
pub mod channel;
pub mod channels;
pub mod dispatcher;
pub mod formatter;
pub mod retry;

pub use builder::NotificationBuilder;
pub use channel::{NotificationChannel, SendResult};
pub use dispatcher::{initialize, NotificationDispatcher, RunReport, RunState};
pub use formatter::{telegram_message, unescape_html};
pub use retry::RetryPolicy;
