use crate::domain::ChatId;
use crate::messenger::Messenger;
use crate::store::SubscriberStore;
use std::sync::Arc;

/// How a broadcast went.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeliveryReport {
    pub attempted: usize,
    pub delivered: usize,
}

/// Fan-out over a [`Messenger`]. Delivery failures are logged, never propagated to the caller.
#[derive(Clone)]
pub struct Notifier {
    messenger: Arc<dyn Messenger>,
    store: Arc<dyn SubscriberStore>,
    recipients: Vec<ChatId>,
    admins: Vec<ChatId>,
}

impl Notifier {
    pub fn new(
        messenger: Arc<dyn Messenger>,
        store: Arc<dyn SubscriberStore>,
        recipients: Vec<ChatId>,
        admins: Vec<ChatId>,
    ) -> Self {
        Self {
            messenger,
            store,
            recipients,
            admins,
        }
    }

    pub fn is_admin(&self, chat_id: &ChatId) -> bool {
        self.admins.contains(chat_id)
    }

    pub async fn send_to(&self, recipient: &ChatId, text: &str) -> Result<(), anyhow::Error> {
        let outcome = self.messenger.send_message(recipient, text).await;
        if let Err(e) = &outcome {
            tracing::warn!(error.cause_chain = ?e, %recipient, "Failed to deliver message");
        }
        outcome
    }

    /// Sends to every active subscriber, or to the configured chats when nobody subscribed.
    #[tracing::instrument(name = "Broadcast message", skip(self, text))]
    pub async fn broadcast(&self, text: &str) -> DeliveryReport {
        let recipients = self.broadcast_recipients().await;
        self.deliver(&recipients, text).await
    }

    /// Sends to the admin chats, falling back to the configured recipients.
    #[tracing::instrument(name = "Alert operators", skip(self, text))]
    pub async fn alert_operators(&self, text: &str) -> DeliveryReport {
        let operators = if self.admins.is_empty() {
            &self.recipients
        } else {
            &self.admins
        };
        if operators.is_empty() {
            tracing::warn!("No operator chat configured, dropping alert");
        }
        self.deliver(operators, text).await
    }

    pub async fn resolve_display_name(&self, chat_id: &ChatId) -> String {
        match self.messenger.display_name(chat_id).await {
            Ok(name) => name,
            Err(e) => {
                tracing::debug!(error.cause_chain = ?e, %chat_id, "Falling back to the raw chat id");
                chat_id.to_string()
            }
        }
    }

    async fn broadcast_recipients(&self) -> Vec<ChatId> {
        match self.store.list_active_subscribers().await {
            Ok(subscribers) if !subscribers.is_empty() => {
                subscribers.into_iter().map(|s| s.chat_id).collect()
            }
            Ok(_) => self.recipients.clone(),
            Err(e) => {
                tracing::warn!(error.cause_chain = ?e, "Failed to list subscribers, using configured chats");
                self.recipients.clone()
            }
        }
    }

    async fn deliver(&self, recipients: &[ChatId], text: &str) -> DeliveryReport {
        let mut report = DeliveryReport::default();
        for recipient in recipients {
            report.attempted += 1;
            if self.send_to(recipient, text).await.is_ok() {
                report.delivered += 1;
            }
        }
        report
    }
}
