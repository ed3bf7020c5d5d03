//! 内存账本（测试和 dry-run 使用）

use std::collections::BTreeMap;
use std::path::PathBuf;

use super::{DeliveryRecord, DeliveryStore};
use crate::error::StoreError;

/// 内存账本
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: BTreeMap<String, DeliveryRecord>,
    fail_writes: bool,
    commits: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 所有写入都返回 `StoreError::Write`
    pub fn with_failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    /// 成功提交的次数
    pub fn commit_count(&self) -> usize {
        self.commits
    }

    /// 按 identity 排序的全部 key
    pub fn identities(&self) -> Vec<String> {
        self.records.keys().cloned().collect()
    }

    pub fn get(&self, identity: &str) -> Option<&DeliveryRecord> {
        self.records.get(identity)
    }
}

impl DeliveryStore for MemoryStore {
    fn exists(&self, identity: &str) -> Result<bool, StoreError> {
        Ok(self.records.contains_key(identity))
    }

    fn put(&mut self, record: DeliveryRecord) -> Result<(), StoreError> {
        self.put_all(vec![record])
    }

    fn put_all(&mut self, records: Vec<DeliveryRecord>) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::write(PathBuf::from(":memory:"), "writes disabled"));
        }
        for record in records {
            self.records.insert(record.identity().to_string(), record);
        }
        self.commits += 1;
        Ok(())
    }

    fn len(&self) -> Result<usize, StoreError> {
        Ok(self.records.len())
    }
}
