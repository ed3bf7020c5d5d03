//! 订阅条目模型

use serde::{Deserialize, Serialize};

/// 一条已规范化的订阅条目
///
/// 每次解析时构造，之后不再修改。只有 `identity` 和快照会进入 Delivery Store。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// 稳定身份（permalink），相同 identity 视为同一投递单元
    pub identity: String,
    /// 标题
    pub title: String,
    /// 链接（可能为空，此时 identity 来自 guid）
    #[serde(default)]
    pub link: String,
    /// 描述（HTML）
    #[serde(default)]
    pub description: String,
    /// content:encoded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// 原始 pubDate，仅供展示，不参与排序和去重
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_at: Option<String>,
    /// 评论地址
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
}

impl Item {
    /// 以 link 作为 identity 创建条目
    pub fn new(title: impl Into<String>, link: impl Into<String>) -> Self {
        let link = link.into();
        Self {
            identity: link.clone(),
            title: title.into(),
            link,
            description: String::new(),
            content: None,
            published_at: None,
            comments: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn with_published_at(mut self, published_at: impl Into<String>) -> Self {
        self.published_at = Some(published_at.into());
        self
    }

    /// 发送时使用的链接：优先 link，否则回退到 identity
    pub fn permalink(&self) -> &str {
        if self.link.is_empty() {
            &self.identity
        } else {
            &self.link
        }
    }
}
