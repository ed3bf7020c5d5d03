//! 订阅源：条目模型与 RSS 解析

pub mod item;
pub mod parser;

pub use item::Item;
pub use parser::{parse_file, parse_str};
