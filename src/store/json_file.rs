//! 单文件 JSON 账本（带文件锁）
//!
//! 文件格式：`{"buckets": {"rss": {"<identity>": DeliveryRecord}}}`
//!
//! 打开时获取 `<path>.lock` 的排他锁并一直持有到 drop，保证同一时间只有一个写者。
//! 每次提交写入 `<path>.tmp`，fsync 后 rename 覆盖原文件。

use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::{DeliveryRecord, DeliveryStore, DEFAULT_BUCKET};
use crate::error::StoreError;

/// 默认等锁时间
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreDocument {
    #[serde(default)]
    buckets: BTreeMap<String, BTreeMap<String, DeliveryRecord>>,
}

/// 单文件 JSON 账本
pub struct JsonFileStore {
    path: PathBuf,
    bucket: String,
    doc: StoreDocument,
    lock_file: File,
}

impl JsonFileStore {
    /// 使用默认 bucket 和等锁时间打开
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        Self::open_with(path, DEFAULT_BUCKET, DEFAULT_LOCK_TIMEOUT)
    }

    /// 打开账本；文件不存在时视为空，首次提交时创建
    pub fn open_with(
        path: impl Into<PathBuf>,
        bucket: &str,
        lock_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let path = path.into();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.is_dir() {
                return Err(StoreError::unavailable(
                    &path,
                    format!("directory {} does not exist", parent.display()),
                ));
            }
        }

        let lock_path = sibling(&path, ".lock");
        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|e| StoreError::unavailable(&path, e))?;

        acquire_lock(&lock_file, lock_timeout).map_err(|e| {
            StoreError::unavailable(&path, format!("cannot lock {}: {}", lock_path.display(), e))
        })?;

        let doc = read_document(&path)?;
        debug!(
            path = %path.display(),
            bucket = %bucket,
            records = doc.buckets.get(bucket).map(|b| b.len()).unwrap_or(0),
            "Delivery store opened"
        );

        Ok(Self {
            path,
            bucket: bucket.to_string(),
            doc,
            lock_file,
        })
    }

    /// 账本文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 读取某条记录
    pub fn get(&self, identity: &str) -> Option<&DeliveryRecord> {
        self.doc.buckets.get(&self.bucket)?.get(identity)
    }

    /// 写临时文件 -> fsync -> rename
    fn persist(&self) -> Result<(), StoreError> {
        let tmp_path = sibling(&self.path, ".tmp");
        let content =
            serde_json::to_vec_pretty(&self.doc).map_err(|e| StoreError::write(&self.path, e))?;

        let write_tmp = || -> std::io::Result<()> {
            let mut tmp = File::create(&tmp_path)?;
            tmp.write_all(&content)?;
            tmp.sync_all()?;
            Ok(())
        };
        write_tmp().map_err(|e| StoreError::write(&self.path, e))?;

        fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::write(&self.path, e))?;

        // rename 本身落盘需要同步目录
        let parent = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        sync_dir(parent).map_err(|e| StoreError::write(&self.path, e))?;

        Ok(())
    }
}

impl DeliveryStore for JsonFileStore {
    fn exists(&self, identity: &str) -> Result<bool, StoreError> {
        let bucket = self.doc.buckets.get(&self.bucket).ok_or_else(|| {
            StoreError::unavailable(
                &self.path,
                format!("bucket '{}' not initialized, run with --initdb", self.bucket),
            )
        })?;
        Ok(bucket.contains_key(identity))
    }

    fn put(&mut self, record: DeliveryRecord) -> Result<(), StoreError> {
        self.put_all(vec![record])
    }

    fn put_all(&mut self, records: Vec<DeliveryRecord>) -> Result<(), StoreError> {
        let previous = self.doc.clone();
        let count = records.len();

        let bucket = self.doc.buckets.entry(self.bucket.clone()).or_default();
        for record in records {
            bucket.insert(record.identity().to_string(), record);
        }

        if let Err(e) = self.persist() {
            self.doc = previous;
            return Err(e);
        }

        info!(path = %self.path.display(), count, "Delivery records committed");
        Ok(())
    }

    fn len(&self) -> Result<usize, StoreError> {
        Ok(self.doc.buckets.get(&self.bucket).map(|b| b.len()).unwrap_or(0))
    }
}

impl Drop for JsonFileStore {
    fn drop(&mut self) {
        let _ = self.lock_file.unlock();
    }
}

/// `<path><suffix>`，例如 `ssender.db.lock`
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// fsync 目录，使其中的 rename 持久化
#[cfg(unix)]
fn sync_dir(dir: &Path) -> std::io::Result<()> {
    File::open(dir)?.sync_all()
}

/// 非 Unix 平台无法打开目录句柄，rename 由文件系统自身保证
#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> std::io::Result<()> {
    Ok(())
}

/// 在超时时间内轮询获取排他锁
fn acquire_lock(file: &File, timeout: Duration) -> std::io::Result<()> {
    let contended = fs2::lock_contended_error().kind();
    let start = Instant::now();
    loop {
        match file.try_lock_exclusive() {
            Ok(()) => return Ok(()),
            Err(e) if e.kind() == contended && start.elapsed() < timeout => {
                thread::sleep(LOCK_POLL_INTERVAL);
            }
            Err(e) => return Err(e),
        }
    }
}

fn read_document(path: &Path) -> Result<StoreDocument, StoreError> {
    if !path.exists() {
        return Ok(StoreDocument::default());
    }

    let content = fs::read_to_string(path).map_err(|e| StoreError::unavailable(path, e))?;
    if content.trim().is_empty() {
        return Ok(StoreDocument::default());
    }

    serde_json::from_str(&content)
        .map_err(|e| StoreError::unavailable(path, format!("corrupt store: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::Item;
    use tempfile::tempdir;

    fn record(link: &str) -> DeliveryRecord {
        DeliveryRecord::new(Item::new(format!("title {}", link), link))
    }

    #[test]
    fn test_uninitialized_bucket_is_unavailable() {
        let temp = tempdir().unwrap();
        let store = JsonFileStore::open(temp.path().join("db.json")).unwrap();

        let err = store.exists("https://example.com/1").unwrap_err();
        assert!(matches!(err, StoreError::Unavailable { .. }));
        assert!(err.to_string().contains("--initdb"));
    }

    #[test]
    fn test_put_then_reopen() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("db.json");

        {
            let mut store = JsonFileStore::open(&path).unwrap();
            store.put(record("https://example.com/1")).unwrap();
            assert!(store.exists("https://example.com/1").unwrap());
        }

        let store = JsonFileStore::open(&path).unwrap();
        assert!(store.exists("https://example.com/1").unwrap());
        assert!(!store.exists("https://example.com/2").unwrap());
        assert_eq!(store.len().unwrap(), 1);
        assert_eq!(
            store.get("https://example.com/1").unwrap().item.title,
            "title https://example.com/1"
        );
    }

    #[test]
    fn test_put_is_idempotent() {
        let temp = tempdir().unwrap();
        let mut store = JsonFileStore::open(temp.path().join("db.json")).unwrap();

        store.put(record("https://example.com/1")).unwrap();
        store.put(record("https://example.com/1")).unwrap();
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_initialize_with_empty_feed_creates_bucket() {
        let temp = tempdir().unwrap();
        let mut store = JsonFileStore::open(temp.path().join("db.json")).unwrap();

        assert_eq!(store.initialize(&[]).unwrap(), 0);
        assert!(!store.exists("anything").unwrap());
    }

    #[test]
    fn test_second_writer_is_rejected() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("db.json");

        let _first = JsonFileStore::open(&path).unwrap();
        let second = JsonFileStore::open_with(&path, DEFAULT_BUCKET, Duration::from_millis(100));
        assert!(matches!(second, Err(StoreError::Unavailable { .. })));
    }

    #[test]
    fn test_lock_released_on_drop() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("db.json");

        drop(JsonFileStore::open(&path).unwrap());
        assert!(JsonFileStore::open_with(&path, DEFAULT_BUCKET, Duration::ZERO).is_ok());
    }

    #[test]
    fn test_missing_directory_is_unavailable() {
        let temp = tempdir().unwrap();
        let result = JsonFileStore::open(temp.path().join("missing").join("db.json"));
        assert!(matches!(result, Err(StoreError::Unavailable { .. })));
    }

    #[test]
    fn test_corrupt_file_is_unavailable() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("db.json");
        fs::write(&path, "{not json").unwrap();

        let result = JsonFileStore::open(&path);
        assert!(matches!(result, Err(StoreError::Unavailable { .. })));
    }

    #[test]
    fn test_failed_commit_keeps_previous_state() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("db.json");
        let mut store = JsonFileStore::open(&path).unwrap();
        store.initialize(&[Item::new("a", "https://example.com/a")]).unwrap();

        // 用目录占住临时文件路径，使写入失败
        fs::create_dir(sibling(&path, ".tmp")).unwrap();

        let err = store.put(record("https://example.com/b")).unwrap_err();
        assert!(matches!(err, StoreError::Write { .. }));
        assert!(!store.exists("https://example.com/b").unwrap());
        assert!(store.exists("https://example.com/a").unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn test_sync_dir_reports_errors() {
        let temp = tempdir().unwrap();
        assert!(sync_dir(temp.path()).is_ok());
        assert!(sync_dir(&temp.path().join("gone")).is_err());
    }

    #[test]
    fn test_custom_bucket_is_isolated() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("db.json");

        {
            let mut store = JsonFileStore::open(&path).unwrap();
            store.put(record("https://example.com/1")).unwrap();
        }

        let mut other = JsonFileStore::open_with(&path, "other", DEFAULT_LOCK_TIMEOUT).unwrap();
        other.initialize(&[]).unwrap();
        assert!(!other.exists("https://example.com/1").unwrap());
    }
}
