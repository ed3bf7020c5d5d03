//! Delivery Store - 记录已投递条目的持久化账本
//!
//! 记录存在即表示"不要再次投递"。正常运行只追加、不删除。
//!
//! - `JsonFileStore`：单文件 JSON，fs2 文件锁保证单写者，原子替换保证不出现半写文件
//! - `MemoryStore`：内存实现，仅用于测试

pub mod json_file;
pub mod memory;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::StoreError;
use crate::feed::Item;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

/// 默认 bucket 名称
pub const DEFAULT_BUCKET: &str = "rss";

/// 投递记录：key 为 identity，value 为投递时的条目快照
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryRecord {
    pub item: Item,
    pub delivered_at: DateTime<Utc>,
}

impl DeliveryRecord {
    pub fn new(item: Item) -> Self {
        Self {
            item,
            delivered_at: Utc::now(),
        }
    }

    pub fn identity(&self) -> &str {
        &self.item.identity
    }
}

/// 已投递账本
pub trait DeliveryStore {
    /// identity 是否已记录
    fn exists(&self, identity: &str) -> Result<bool, StoreError>;

    /// 写入单条记录，返回时已持久化；重复写入同一 identity 为幂等覆盖
    fn put(&mut self, record: DeliveryRecord) -> Result<(), StoreError>;

    /// 批量写入，只有全部落盘才返回成功
    fn put_all(&mut self, records: Vec<DeliveryRecord>) -> Result<(), StoreError>;

    /// 已记录数量
    fn len(&self) -> Result<usize, StoreError>;

    fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    /// 首次运行时用当前 feed 填充账本，不触发发送
    ///
    /// 相同 identity 只产生一条记录（后出现的快照覆盖先出现的）。
    fn initialize(&mut self, items: &[Item]) -> Result<usize, StoreError> {
        let count = items
            .iter()
            .map(|item| item.identity.as_str())
            .collect::<HashSet<_>>()
            .len();
        let records = items.iter().cloned().map(DeliveryRecord::new).collect();
        self.put_all(records)?;
        Ok(count)
    }
}
