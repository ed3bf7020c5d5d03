//! ssender - 将 RSS 新条目推送到 Telegram / VK，每条只推送一次

pub mod cli;
pub mod config;
pub mod delta;
pub mod error;
pub mod feed;
pub mod notification;
pub mod store;

pub use config::Config;
pub use delta::compute_delta;
pub use error::{DispatchError, SinkError, StoreError};
pub use feed::Item;
pub use notification::{
    initialize, NotificationBuilder, NotificationChannel, NotificationDispatcher, RetryPolicy,
    RunReport, RunState, SendResult,
};
pub use store::{DeliveryRecord, DeliveryStore, JsonFileStore, MemoryStore};
