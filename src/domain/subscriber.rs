use crate::domain::{ChatId, Language};
use chrono::{DateTime, Utc};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    #[default]
    Free,
    Pro,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Pro => "pro",
        }
    }

    pub fn parse(s: &str) -> Plan {
        match s {
            "pro" => Plan::Pro,
            _ => Plan::Free,
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subscriber details as received from the web form or a Telegram update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubscriber {
    pub chat_id: ChatId,
    pub language: Language,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl NewSubscriber {
    pub fn new(chat_id: ChatId, language: Language) -> Self {
        Self {
            chat_id,
            language,
            username: None,
            first_name: None,
            last_name: None,
        }
    }

    /// Builds the stored record, keeping what an existing record already knows.
    pub fn into_subscriber(self, existing: Option<Subscriber>, now: DateTime<Utc>) -> Subscriber {
        let (plan, created_at) = existing
            .as_ref()
            .map(|s| (s.plan, s.created_at))
            .unwrap_or((Plan::Free, now));
        Subscriber {
            chat_id: self.chat_id,
            username: self.username,
            first_name: self.first_name,
            last_name: self.last_name,
            language: self.language,
            plan,
            is_active: true,
            created_at,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Subscriber {
    pub chat_id: ChatId,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub language: Language,
    pub plan: Plan,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
