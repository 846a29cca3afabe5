use anyhow::Context;
use refuge_watch::booking::BookingClient;
use refuge_watch::configuration::get_configuration;
use refuge_watch::messenger::{Messenger, Notifier, TelegramClient};
use refuge_watch::poller::Poller;
use refuge_watch::startup::Application;
use refuge_watch::status_board::StatusBoard;
use refuge_watch::store::open_store;
use refuge_watch::telemetry::{get_subscriber, init_subscriber};
use std::sync::Arc;
use tokio::sync::watch;

#[rocket::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = get_subscriber("refuge_watch".into(), "info".into(), std::io::stdout);
    init_subscriber(subscriber);

    let settings = get_configuration().context("Failed to read configuration.")?;
    settings.validate()?;

    let store = open_store(&settings)
        .await
        .context("Failed to open the subscriber store.")?;
    let messenger: Arc<dyn Messenger> = Arc::new(
        TelegramClient::new(&settings.telegram).context("Failed to build the Telegram client.")?,
    );
    let notifier = Notifier::new(
        messenger,
        store.clone(),
        settings.telegram.recipients()?,
        settings.telegram.admins()?,
    );
    let board = StatusBoard::default();
    let page = Arc::new(
        BookingClient::new(&settings.booking).context("Failed to build the booking client.")?,
    );

    let poller = Poller::new(&settings, page, store.clone(), notifier.clone(), board.clone());
    let application = Application::build(&settings, store, notifier, board).await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let poller_task = tokio::spawn(poller.run(shutdown_rx));

    application.run_until_stopped().await?;

    tracing::info!("Web server stopped, stopping the poller");
    let _ = shutdown_tx.send(true);
    poller_task.await.context("Poller task failed.")?;
    Ok(())
}
