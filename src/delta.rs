//! Delta 计算 - 找出 feed 中尚未投递的条目
//!
//! 纯函数：不发网络请求、不写账本。相同 feed + 相同账本状态总是得到相同结果。

use std::collections::HashSet;
use tracing::debug;

use crate::error::StoreError;
use crate::feed::Item;
use crate::store::DeliveryStore;

/// 按 feed 原顺序返回账本中不存在的条目
///
/// 同一 identity 在 feed 中出现多次时只保留第一次出现的条目。
pub fn compute_delta<S>(items: &[Item], store: &S) -> Result<Vec<Item>, StoreError>
where
    S: DeliveryStore + ?Sized,
{
    let mut seen = HashSet::new();
    let mut delta = Vec::new();

    for item in items {
        if !seen.insert(item.identity.as_str()) {
            debug!(identity = %item.identity, "Duplicate identity in feed, keeping first");
            continue;
        }
        if !store.exists(&item.identity)? {
            delta.push(item.clone());
        }
    }

    debug!(feed = items.len(), delta = delta.len(), "Delta computed");
    Ok(delta)
}
