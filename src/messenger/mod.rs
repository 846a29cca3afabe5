mod notifier;
mod telegram_client;

use crate::domain::ChatId;
use async_trait::async_trait;
pub use notifier::{DeliveryReport, Notifier};
pub use telegram_client::TelegramClient;

/// Outbound chat channel.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_message(&self, recipient: &ChatId, text: &str) -> Result<(), anyhow::Error>;

    /// Human readable name of a chat: `@username`, else first and last name.
    async fn display_name(&self, chat_id: &ChatId) -> Result<String, anyhow::Error>;
}
