//! 具体渠道实现

pub mod facebook;
pub mod telegram;
pub mod vk;

pub use facebook::{FacebookChannel, FacebookConfig};
pub use telegram::{TelegramChannel, TelegramConfig};
pub use vk::{VkChannel, VkConfig};
