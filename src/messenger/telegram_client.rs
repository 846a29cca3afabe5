use crate::configuration::TelegramSettings;
use crate::domain::ChatId;
use crate::messenger::Messenger;
use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};

pub struct TelegramClient {
    http_client: Client,
    base_url: String,
    bot_token: Secret<String>,
}

impl TelegramClient {
    pub fn new(settings: &TelegramSettings) -> Result<Self, reqwest::Error> {
        let http_client = Client::builder().timeout(settings.timeout()).build()?;
        Ok(Self {
            http_client,
            base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            bot_token: Secret::new(settings.bot_token.expose_secret().clone()),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.base_url,
            self.bot_token.expose_secret(),
            method
        )
    }
}

#[derive(serde::Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(serde::Deserialize, Default)]
struct Chat {
    username: Option<String>,
    first_name: Option<String>,
    last_name: Option<String>,
    title: Option<String>,
}

impl Chat {
    fn display_name(&self) -> Option<String> {
        if let Some(username) = self.username.as_deref().filter(|u| !u.is_empty()) {
            return Some(format!("@{}", username));
        }
        let full_name = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if !full_name.is_empty() {
            return Some(full_name);
        }
        self.title.clone().filter(|t| !t.is_empty())
    }
}

#[async_trait]
impl Messenger for TelegramClient {
    #[tracing::instrument(name = "Send Telegram message", skip(self, text))]
    async fn send_message(&self, recipient: &ChatId, text: &str) -> Result<(), anyhow::Error> {
        let response = self
            .http_client
            .post(self.method_url("sendMessage"))
            .form(&[
                ("chat_id", recipient.as_ref()),
                ("text", text),
                ("parse_mode", "HTML"),
            ])
            .send()
            .await
            .context("Failed to reach the Telegram API.")?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Telegram rejected sendMessage with {}: {}", status, body);
        }
        Ok(())
    }

    #[tracing::instrument(name = "Look up Telegram chat", skip(self))]
    async fn display_name(&self, chat_id: &ChatId) -> Result<String, anyhow::Error> {
        let response: ApiResponse<Chat> = self
            .http_client
            .post(self.method_url("getChat"))
            .json(&serde_json::json!({ "chat_id": chat_id.as_ref() }))
            .send()
            .await
            .context("Failed to reach the Telegram API.")?
            .json()
            .await
            .context("Failed to decode the getChat response.")?;
        if !response.ok {
            anyhow::bail!(
                "Telegram rejected getChat: {}",
                response.description.unwrap_or_default()
            );
        }
        Ok(response
            .result
            .unwrap_or_default()
            .display_name()
            .unwrap_or_else(|| chat_id.to_string()))
    }
}
