use crate::catchers::*;
use crate::configuration::Settings;
use crate::messenger::Notifier;
use crate::port_saver;
use crate::port_saver::Port;
use crate::routes::*;
use crate::status_board::StatusBoard;
use crate::store::SubscriberStore;
use rocket::config::LogLevel;
use rocket::{Config, Ignite, Rocket};
use secrecy::{ExposeSecret, Secret};
use std::sync::Arc;

const DEFAULT_PORT: u16 = 8080;

/// Secret token Telegram must echo on webhook calls, if one is configured.
pub struct WebhookSecret(pub Option<Secret<String>>);

/// Analytics id rendered into pages.
pub struct MeasurementId(pub String);

pub struct Application {
    server: Rocket<Ignite>,
    port: Port,
}

impl Application {
    pub async fn build(
        settings: &Settings,
        store: Arc<dyn SubscriberStore>,
        notifier: Notifier,
        board: StatusBoard,
    ) -> Result<Self, rocket::Error> {
        let (port_saver, port) = port_saver::create_pair();
        let server = rocket::custom(Config {
            address: settings.application.host,
            port: settings.application.port.unwrap_or(DEFAULT_PORT),
            log_level: LogLevel::Off,
            ..Config::release_default()
        })
        .attach(port_saver)
        .manage(store)
        .manage(notifier)
        .manage(board)
        .manage(WebhookSecret(
            settings
                .telegram
                .webhook_secret
                .as_ref()
                .map(|secret| Secret::new(secret.expose_secret().clone())),
        ))
        .manage(MeasurementId(settings.application.measurement_id.clone()))
        .mount(
            "/",
            routes![home, status, health, subscribe, telegram_webhook],
        )
        .register(
            "/",
            catchers![unprocessable_entity_to_bad_request, unauthorized],
        )
        .ignite()
        .await?;
        Ok(Self { server, port })
    }

    pub fn port(&self) -> Port {
        self.port.clone()
    }

    /// Serves until Rocket shuts down (Ctrl-C, SIGTERM or a `Shutdown` handle).
    pub async fn run_until_stopped(self) -> Result<(), rocket::Error> {
        self.server.launch().await.map(|_| ())
    }
}
