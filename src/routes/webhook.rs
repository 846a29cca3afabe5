use crate::domain::{ChatId, Language, NewSubscriber};
use crate::guards::VerifiedWebhook;
use crate::messenger::Notifier;
use crate::notifications::format;
use crate::store::{StoreError, SubscriberStore};
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;
use std::fmt::Write;
use std::sync::Arc;

const GREETING: &str =
    "✅ Subscribed. We'll notify you about new dates. Send /stop to unsubscribe.";
const UNSUBSCRIBED: &str = "🛑 Unsubscribed. Send /start to subscribe again.";
const NOT_ALLOWED: &str = "⛔ This command is only available to administrators.";

#[derive(serde::Deserialize, Debug)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(serde::Deserialize, Debug)]
pub struct Message {
    pub chat: Option<Chat>,
    pub from: Option<User>,
    pub text: Option<String>,
}

#[derive(serde::Deserialize, Debug)]
pub struct Chat {
    pub id: i64,
}

#[derive(serde::Deserialize, Debug, Default)]
pub struct User {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub language_code: Option<String>,
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Stop,
    Id,
    Subscribers,
    Other,
}

impl Command {
    /// Reads the leading command, ignoring a `@botname` suffix and arguments.
    fn parse(text: Option<&str>) -> Command {
        let word = text
            .and_then(|t| t.split_whitespace().next())
            .unwrap_or_default();
        let command = word.split('@').next().unwrap_or_default();
        match command {
            "/stop" => Command::Stop,
            "/id" => Command::Id,
            "/subscribers" => Command::Subscribers,
            _ => Command::Other,
        }
    }
}

#[tracing::instrument(
    name = "Handling Telegram update",
    skip(_verified, update, store, notifier),
    fields(update_id = update.update_id)
)]
#[post("/telegram/webhook", data = "<update>")]
pub async fn telegram_webhook(
    _verified: VerifiedWebhook,
    update: Json<Update>,
    store: &State<Arc<dyn SubscriberStore>>,
    notifier: &State<Notifier>,
) -> Status {
    let Some(message) = update.into_inner().message else {
        return Status::Ok;
    };
    let Some(chat) = &message.chat else {
        return Status::Ok;
    };
    let chat_id = ChatId::from(chat.id);
    let command = Command::parse(message.text.as_deref());
    tracing::info!(%chat_id, ?command, "Received Telegram message");

    if command == Command::Stop {
        match store.deactivate_subscriber(&chat_id).await {
            Ok(()) | Err(StoreError::NotFound(_)) => {}
            Err(e) => tracing::error!(error.cause_chain = ?e, "Failed to deactivate subscriber"),
        }
        let _ = notifier.send_to(&chat_id, UNSUBSCRIBED).await;
        return Status::Ok;
    }

    let subscriber = new_subscriber(chat_id.clone(), message.from.unwrap_or_default());
    if let Err(e) = store.upsert_subscriber(subscriber).await {
        tracing::error!(error.cause_chain = ?e, "Failed to save subscriber");
    }

    let reply = match command {
        Command::Id => format!("🆔 Your chat id is <code>{}</code>", chat_id),
        Command::Subscribers if notifier.is_admin(&chat_id) => {
            subscriber_list(store.inner().as_ref(), notifier).await
        }
        Command::Subscribers => NOT_ALLOWED.to_string(),
        Command::Stop | Command::Other => GREETING.to_string(),
    };
    let _ = notifier.send_to(&chat_id, &reply).await;
    Status::Ok
}

fn new_subscriber(chat_id: ChatId, from: User) -> NewSubscriber {
    let language = from
        .language_code
        .as_deref()
        .and_then(Language::detect)
        .unwrap_or_default();
    NewSubscriber {
        username: from.username,
        first_name: from.first_name,
        last_name: from.last_name,
        ..NewSubscriber::new(chat_id, language)
    }
}

async fn subscriber_list(store: &dyn SubscriberStore, notifier: &Notifier) -> String {
    let subscribers = match store.list_active_subscribers().await {
        Ok(subscribers) => subscribers,
        Err(e) => {
            tracing::error!(error.cause_chain = ?e, "Failed to list subscribers");
            return "⚠️ Could not load subscribers.".to_string();
        }
    };
    let mut reply = format!("👥 <b>Active subscribers: {}</b>\n", subscribers.len());
    for subscriber in &subscribers {
        let name = notifier.resolve_display_name(&subscriber.chat_id).await;
        let _ = writeln!(
            reply,
            "• {} ({}, {})",
            format::html_escape(&name),
            subscriber.chat_id,
            subscriber.language.as_str()
        );
    }
    reply
}
