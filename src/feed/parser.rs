//! RSS 2.0 解析 - 将文档转换为有序的 `Item` 列表

use anyhow::{Context, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, warn};

use super::item::Item;

/// 从文件解析 RSS
pub fn parse_file(path: &Path) -> Result<Vec<Item>> {
    let file = File::open(path).with_context(|| format!("cannot open feed {}", path.display()))?;
    let channel = rss::Channel::read_from(BufReader::new(file))
        .with_context(|| format!("cannot parse feed {}", path.display()))?;
    let items = from_channel(&channel);
    debug!(path = %path.display(), count = items.len(), "Feed parsed");
    Ok(items)
}

/// 从字符串解析 RSS（无 I/O）
pub fn parse_str(xml: &str) -> Result<Vec<Item>> {
    let channel = rss::Channel::read_from(xml.as_bytes()).context("cannot parse feed")?;
    Ok(from_channel(&channel))
}

/// 保持 feed 原有顺序
pub fn from_channel(channel: &rss::Channel) -> Vec<Item> {
    channel.items().iter().filter_map(convert_item).collect()
}

fn convert_item(item: &rss::Item) -> Option<Item> {
    let link = item.link().map(str::trim).unwrap_or_default().to_string();

    // link 为空时回退到 guid
    let identity = if link.is_empty() {
        item.guid().map(|g| g.value().trim().to_string()).unwrap_or_default()
    } else {
        link.clone()
    };

    if identity.is_empty() {
        warn!(title = ?item.title(), "Skipping feed item without link or guid");
        return None;
    }

    Some(Item {
        identity,
        title: item.title().unwrap_or_default().to_string(),
        link,
        description: item.description().unwrap_or_default().to_string(),
        content: item.content().map(String::from),
        published_at: item.pub_date().map(String::from),
        comments: item.comments().map(String::from),
    })
}
