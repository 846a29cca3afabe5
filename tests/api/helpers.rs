use async_trait::async_trait;
use once_cell::sync::Lazy;
use refuge_watch::booking::{BookingPage, FetchError};
use refuge_watch::configuration::{get_configuration, Settings, StoreBackend};
use refuge_watch::domain::{Anchor, ChatId, Location};
use refuge_watch::messenger::{Messenger, Notifier};
use refuge_watch::startup::Application;
use refuge_watch::status_board::StatusBoard;
use refuge_watch::store::{RedbStore, SubscriberStore};
use refuge_watch::telemetry::{get_subscriber, init_subscriber};
use secrecy::Secret;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

static TRACING: Lazy<()> = Lazy::new(|| {
    let default_filter_level = "info".into();
    let subscriber_name = "test".into();
    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::stdout);
        init_subscriber(subscriber);
    } else {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::sink);
        init_subscriber(subscriber);
    }
});

pub const ADMIN_CHAT_ID: i64 = 99;
pub const CONFIGURED_CHAT_ID: i64 = 1;
pub const WEBHOOK_SECRET: &str = "webhook-secret";

/// Records every outgoing message instead of talking to Telegram.
#[derive(Default)]
pub struct RecordingMessenger {
    sent: Mutex<Vec<(ChatId, String)>>,
    names: Mutex<HashMap<ChatId, String>>,
}

impl RecordingMessenger {
    pub fn sent(&self) -> Vec<(ChatId, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_to(&self, chat_id: i64) -> Vec<String> {
        let chat_id = ChatId::from(chat_id);
        self.sent()
            .into_iter()
            .filter(|(recipient, _)| *recipient == chat_id)
            .map(|(_, text)| text)
            .collect()
    }

    pub fn set_name(&self, chat_id: i64, name: &str) {
        self.names
            .lock()
            .unwrap()
            .insert(ChatId::from(chat_id), name.to_string());
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_message(&self, recipient: &ChatId, text: &str) -> Result<(), anyhow::Error> {
        self.sent
            .lock()
            .unwrap()
            .push((recipient.clone(), text.to_string()));
        Ok(())
    }

    async fn display_name(&self, chat_id: &ChatId) -> Result<String, anyhow::Error> {
        self.names
            .lock()
            .unwrap()
            .get(chat_id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("chat not found"))
    }
}

#[derive(Clone)]
pub enum PageResponse {
    Html(String),
    Reauth,
    Upstream(u16),
}

/// Serves scripted responses in order, then repeats the fallback forever.
pub struct ScriptedPage {
    script: Mutex<VecDeque<PageResponse>>,
    fallback: PageResponse,
    calls: Mutex<Vec<(Location, Anchor)>>,
}

impl ScriptedPage {
    pub fn always(response: PageResponse) -> Self {
        Self::new(vec![], response)
    }

    pub fn new(script: Vec<PageResponse>, fallback: PageResponse) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback,
            calls: Mutex::new(vec![]),
        }
    }

    pub fn calls(&self) -> Vec<(Location, Anchor)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BookingPage for ScriptedPage {
    async fn fetch(&self, location: Location, anchor: Anchor) -> Result<String, FetchError> {
        self.calls.lock().unwrap().push((location, anchor));
        let response = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        match response {
            PageResponse::Html(html) => Ok(html),
            PageResponse::Reauth => Err(FetchError::ReauthRequired),
            PageResponse::Upstream(status) => Err(FetchError::Upstream { status }),
        }
    }
}

/// Calendar markup as served by the booking widget.
pub fn calendar_html(available: &[(&str, u32)], full: &[&str]) -> String {
    let mut html = String::from("<html><body><div class=\"calendar\">");
    for (day, places) in available {
        html.push_str(&format!(
            "<div class=\"day dispo\"><span class=\"date\">{}</span><span class=\"place\">{}</span></div>",
            day, places
        ));
    }
    for day in full {
        html.push_str(&format!(
            "<div class=\"day complet\"><span class=\"date\">{}</span></div>",
            day
        ));
    }
    html.push_str("</div></body></html>");
    html
}

/// Settings for tests: random port, embedded store in a temp dir, fast backoff.
pub fn test_settings(store_dir: &TempDir) -> Settings {
    let mut c = get_configuration().expect("Failed to read configuration.");
    c.application.port = Some(0);
    c.application.host = "127.0.0.1".parse().unwrap();
    c.application.measurement_id = "G-TEST123".into();
    c.booking.anchor_date = Some(chrono::NaiveDate::from_ymd_opt(2025, 8, 1).unwrap());
    c.booking.months = 1;
    c.booking.waiting_room.max_attempts = 2;
    c.booking.waiting_room.initial_backoff_milliseconds = 1;
    c.booking.waiting_room.max_backoff_milliseconds = 5;
    c.telegram.chat_ids = CONFIGURED_CHAT_ID.to_string();
    c.telegram.admin_chat_ids = ADMIN_CHAT_ID.to_string();
    c.telegram.webhook_secret = None;
    c.poller.per_subscriber_filtering = false;
    c.store.backend = StoreBackend::Embedded;
    c.store.embedded_path = store_dir
        .path()
        .join("store.redb")
        .to_string_lossy()
        .into_owned();
    c
}

pub struct TestApp {
    pub address: String,
    pub store: Arc<dyn SubscriberStore>,
    pub messenger: Arc<RecordingMessenger>,
    pub board: StatusBoard,
    pub api_client: reqwest::Client,
    _store_dir: TempDir,
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(|_| {}).await
}

pub async fn spawn_app_with_webhook_secret() -> TestApp {
    spawn_app_with(|c| c.telegram.webhook_secret = Some(Secret::new(WEBHOOK_SECRET.into()))).await
}

pub async fn spawn_app_with(customise: impl FnOnce(&mut Settings)) -> TestApp {
    Lazy::force(&TRACING);

    let store_dir = tempfile::tempdir().expect("Failed to create a temp dir.");
    let configuration = {
        let mut c = test_settings(&store_dir);
        customise(&mut c);
        c
    };

    let store: Arc<dyn SubscriberStore> = Arc::new(
        RedbStore::open(&configuration.store.embedded_path).expect("Failed to open the store."),
    );
    let messenger = Arc::new(RecordingMessenger::default());
    let notifier = Notifier::new(
        messenger.clone(),
        store.clone(),
        configuration.telegram.recipients().unwrap(),
        configuration.telegram.admins().unwrap(),
    );
    let board = StatusBoard::default();

    let app = Application::build(&configuration, store.clone(), notifier, board.clone())
        .await
        .expect("Failed to build application.");
    let port = app.port();
    let _ = tokio::spawn(app.run_until_stopped());
    let port = port.get().await.expect("Server did not start.");

    let api_client = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        store,
        messenger,
        board,
        api_client,
        _store_dir: store_dir,
    }
}

impl TestApp {
    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.api_client
            .get(&format!("{}{}", &self.address, path))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_subscriptions(&self, body: String) -> reqwest::Response {
        self.api_client
            .post(&format!("{}/subscribe", &self.address))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_webhook(&self, body: String, secret: Option<&str>) -> reqwest::Response {
        let mut request = self
            .api_client
            .post(&format!("{}/telegram/webhook", &self.address))
            .header("Content-Type", "application/json")
            .body(body);
        if let Some(secret) = secret {
            request = request.header("X-Telegram-Bot-Api-Secret-Token", secret);
        }
        request.send().await.expect("Failed to execute request.")
    }
}
