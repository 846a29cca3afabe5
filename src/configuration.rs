use crate::domain::ChatId;
use chrono::NaiveDate;
use secrecy::{ExposeSecret, Secret};
use serde_aux::field_attributes::deserialize_number_from_string;
use serde_aux::field_attributes::deserialize_option_number_from_string;
use std::net::IpAddr;
use std::time::Duration;

pub enum Environment {
    Local,
    Production,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration.")]
    Load(#[from] config::ConfigError),
    #[error("Required configuration value `{0}` is missing.")]
    Missing(&'static str),
    #[error("Configuration value `{key}` is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(serde::Deserialize)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub booking: BookingSettings,
    pub telegram: TelegramSettings,
    pub poller: PollerSettings,
    pub store: StoreSettings,
    pub database: DatabaseSettings,
}

#[derive(serde::Deserialize)]
pub struct ApplicationSettings {
    #[serde(default, deserialize_with = "deserialize_option_number_from_string")]
    pub port: Option<u16>,
    pub host: IpAddr,
    #[serde(default)]
    pub measurement_id: String,
}

#[derive(serde::Deserialize)]
pub struct BookingSettings {
    pub base_url: String,
    pub parent_url: String,
    pub session_id: Secret<String>,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub pax: u32,
    pub timeout_milliseconds: u64,
    #[serde(default)]
    pub anchor_date: Option<NaiveDate>,
    #[serde(default = "default_months")]
    pub months: u32,
    pub waiting_room: WaitingRoomSettings,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct WaitingRoomSettings {
    pub max_attempts: u32,
    pub initial_backoff_milliseconds: u64,
    pub max_backoff_milliseconds: u64,
}

#[derive(serde::Deserialize)]
pub struct TelegramSettings {
    pub api_base_url: String,
    pub bot_token: Secret<String>,
    #[serde(default)]
    pub chat_ids: String,
    #[serde(default)]
    pub admin_chat_ids: String,
    #[serde(default)]
    pub webhook_secret: Option<Secret<String>>,
    pub timeout_milliseconds: u64,
}

#[derive(serde::Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DedupScope {
    Global,
    PerSubscriber,
}

/// What makes two openings "the same" for deduplication.
#[derive(serde::Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DedupKey {
    /// A date announced at one refuge is not announced again at the other.
    Date,
    LocationDate,
}

#[derive(serde::Deserialize)]
pub struct PollerSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub interval_seconds: u64,
    #[serde(default)]
    pub per_subscriber_filtering: bool,
    #[serde(default = "default_dedup_scope")]
    pub dedup_scope: DedupScope,
    #[serde(default = "default_dedup_key")]
    pub dedup_key: DedupKey,
    #[serde(default, deserialize_with = "deserialize_option_number_from_string")]
    pub notified_ttl_hours: Option<u64>,
}

#[derive(serde::Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    Embedded,
    Postgres,
}

#[derive(serde::Deserialize)]
pub struct StoreSettings {
    pub backend: StoreBackend,
    pub embedded_path: String,
}

#[derive(serde::Deserialize)]
pub struct DatabaseSettings {
    #[serde(default)]
    pub url: Option<Secret<String>>,
    pub username: String,
    pub password: Secret<String>,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,
    pub host: String,
    pub database_name: String,
    pub require_ssl: bool,
}

fn default_months() -> u32 {
    1
}

fn default_dedup_scope() -> DedupScope {
    DedupScope::Global
}

fn default_dedup_key() -> DedupKey {
    DedupKey::Date
}

impl Settings {
    /// Checks everything the service cannot start without.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.application.measurement_id.trim().is_empty() {
            return Err(ConfigError::Missing("application.measurement_id"));
        }
        if self.booking.base_url.trim().is_empty() {
            return Err(ConfigError::Missing("booking.base_url"));
        }
        if self.booking.session_id.expose_secret().trim().is_empty() {
            return Err(ConfigError::Missing("booking.session_id"));
        }
        if self.telegram.bot_token.expose_secret().trim().is_empty() {
            return Err(ConfigError::Missing("telegram.bot_token"));
        }
        if self.booking.waiting_room.max_attempts == 0 {
            return Err(ConfigError::Invalid {
                key: "booking.waiting_room.max_attempts",
                reason: "at least one attempt is required".into(),
            });
        }
        if self.poller.interval_seconds == 0 {
            return Err(ConfigError::Invalid {
                key: "poller.interval_seconds",
                reason: "must be greater than zero".into(),
            });
        }
        self.telegram.recipients()?;
        self.telegram.admins()?;
        if self.store.backend == StoreBackend::Postgres && self.database.host.trim().is_empty() {
            let has_url = self
                .database
                .url
                .as_ref()
                .map_or(false, |url| !url.expose_secret().trim().is_empty());
            if !has_url {
                return Err(ConfigError::Missing("database.url"));
            }
        }
        Ok(())
    }
}

impl BookingSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_milliseconds)
    }
}

impl WaitingRoomSettings {
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_milliseconds)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_millis(self.max_backoff_milliseconds)
    }
}

impl TelegramSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_milliseconds)
    }

    /// Recipients used when the store has no active subscriber.
    pub fn recipients(&self) -> Result<Vec<ChatId>, ConfigError> {
        ChatId::parse_list(&self.chat_ids).map_err(|reason| ConfigError::Invalid {
            key: "telegram.chat_ids",
            reason,
        })
    }

    pub fn admins(&self) -> Result<Vec<ChatId>, ConfigError> {
        ChatId::parse_list(&self.admin_chat_ids).map_err(|reason| ConfigError::Invalid {
            key: "telegram.admin_chat_ids",
            reason,
        })
    }
}

impl PollerSettings {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    pub fn notified_ttl(&self) -> Option<chrono::Duration> {
        self.notified_ttl_hours
            .map(|hours| chrono::Duration::hours(hours as i64))
    }
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either 'local' or 'production'.",
                other
            )),
        }
    }
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> Secret<String> {
        if let Some(url) = self
            .url
            .as_ref()
            .filter(|url| !url.expose_secret().trim().is_empty())
        {
            return Secret::new(url.expose_secret().clone());
        }
        Secret::new(format!(
            "postgres://{}:{}@{}:{}/{}?sslmode={}",
            self.username,
            self.password.expose_secret(),
            self.host,
            self.port,
            self.database_name,
            ssl_mode(self.require_ssl)
        ))
    }

    /// Server-level connection built from the parts, for creating databases.
    pub fn connection_string_without_database(&self) -> Secret<String> {
        Secret::new(format!(
            "postgres://{}:{}@{}:{}?sslmode={}",
            self.username,
            self.password.expose_secret(),
            self.host,
            self.port,
            ssl_mode(self.require_ssl)
        ))
    }
}

fn ssl_mode(require_ssl: bool) -> &'static str {
    match require_ssl {
        true => "require",
        false => "prefer",
    }
}

pub fn get_configuration() -> Result<Settings, ConfigError> {
    let base_path = std::env::current_dir().map_err(|e| ConfigError::Invalid {
        key: "current_dir",
        reason: e.to_string(),
    })?;
    let configuration_directory = base_path.join("configuration");
    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(|reason| ConfigError::Invalid {
            key: "APP_ENVIRONMENT",
            reason,
        })?;

    let mut settings = config::Config::default();
    settings.merge(config::File::from(configuration_directory.join("base")).required(true))?;
    settings.merge(
        config::File::from(configuration_directory.join(environment.as_str())).required(true),
    )?;
    settings.merge(config::Environment::with_prefix("app").separator("__"))?;
    Ok(settings.try_into()?)
}
