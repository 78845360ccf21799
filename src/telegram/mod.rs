//! All Telegram-specific functionality

#[cfg(feature = "telegram")]
pub mod client;
pub mod gateway;
pub mod session;

// Re-export main types for convenience
#[cfg(feature = "telegram")]
pub use client::TelegramClient;
pub use gateway::{ForumGateway, classify_send_error};
