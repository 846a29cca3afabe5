use crate::booking::{extract_availability, fetch_with_backoff, BookingPage, FetchError};
use crate::configuration::{Settings, WaitingRoomSettings};
use crate::domain::{Anchor, AvailabilitySnapshot, Location};
use crate::messenger::Notifier;
use crate::notifications::{
    format, CycleOutcome, NotificationEngine, NotifiedDates, RetentionPolicy, SubscriberOutcome,
    SubscriberQueries,
};
use crate::status_board::StatusBoard;
use crate::store::{StoreError, SubscriberStore};
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

/// What one cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CycleReport {
    pub total_dates: usize,
    pub notifications: usize,
    pub alerts: usize,
}

/// Drives fetch, extraction, the status board and notifications on a fixed interval.
pub struct Poller {
    page: Arc<dyn BookingPage>,
    store: Arc<dyn SubscriberStore>,
    notifier: Notifier,
    board: StatusBoard,
    engine: NotificationEngine,
    anchor_date: Option<NaiveDate>,
    months: u32,
    waiting_room: WaitingRoomSettings,
    interval: Duration,
    per_subscriber_filtering: bool,
    reauth_alerted: bool,
}

impl Poller {
    pub fn new(
        settings: &Settings,
        page: Arc<dyn BookingPage>,
        store: Arc<dyn SubscriberStore>,
        notifier: Notifier,
        board: StatusBoard,
    ) -> Self {
        let engine = NotificationEngine::new(
            NotifiedDates::new(RetentionPolicy::from_ttl(settings.poller.notified_ttl())),
            settings.poller.dedup_scope,
            settings.poller.dedup_key,
        );
        Self {
            page,
            store,
            notifier,
            board,
            engine,
            anchor_date: settings.booking.anchor_date,
            months: settings.booking.months.max(1),
            waiting_room: settings.booking.waiting_room.clone(),
            interval: settings.poller.interval(),
            per_subscriber_filtering: settings.poller.per_subscriber_filtering,
            reauth_alerted: false,
        }
    }

    fn anchors(&self, now: DateTime<Utc>) -> Vec<Anchor> {
        Anchor::containing(self.anchor_date.unwrap_or_else(|| now.date_naive())).months(self.months)
    }

    /// Announces itself, polls until `shutdown` flips (or its sender is dropped), then says goodbye.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let anchors = self.anchors(Utc::now());
        self.notifier
            .alert_operators(&format::startup_message(&anchors, self.interval))
            .await;

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_cycle(Utc::now()).await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Poller stopping");
        self.notifier
            .alert_operators(&format::shutdown_message())
            .await;
    }

    #[tracing::instrument(name = "Poll cycle", skip(self))]
    pub async fn run_cycle(&mut self, now: DateTime<Utc>) -> CycleReport {
        let mut report = CycleReport::default();
        let (snapshot, reauth_required) = self.collect(now).await;
        report.total_dates = snapshot.total_dates();
        self.board.write(snapshot.clone(), now);

        if reauth_required && !self.reauth_alerted {
            tracing::error!("Booking session expired, alerting operators");
            self.notifier
                .alert_operators(&format::reauth_message())
                .await;
            self.reauth_alerted = true;
            report.alerts += 1;
        }

        let scrape_failed = if self.per_subscriber_filtering {
            let subscribers = match self.subscriber_queries().await {
                Ok(subscribers) => subscribers,
                Err(e) => {
                    tracing::error!(error.cause_chain = ?e, "Failed to load subscriber queries");
                    Vec::new()
                }
            };
            match self
                .engine
                .process_for_subscribers(&snapshot, &subscribers, now)
            {
                SubscriberOutcome::ScrapeFailure => true,
                SubscriberOutcome::Deliveries(deliveries) => {
                    for delivery in deliveries {
                        tracing::info!(
                            recipient = %delivery.recipient,
                            count = delivery.count,
                            "Sending filtered availability"
                        );
                        if self
                            .notifier
                            .send_to(&delivery.recipient, &delivery.message)
                            .await
                            .is_ok()
                        {
                            report.notifications += 1;
                        }
                    }
                    false
                }
            }
        } else {
            match self.engine.process(&snapshot, now) {
                CycleOutcome::ScrapeFailure => true,
                CycleOutcome::NothingNew => false,
                CycleOutcome::NewAvailability { message, count } => {
                    tracing::info!(count, "New availability found");
                    report.notifications += self.notifier.broadcast(&message).await.delivered;
                    false
                }
            }
        };

        if scrape_failed && !reauth_required {
            tracing::warn!("No dates extracted for any refuge");
            self.notifier
                .alert_operators(&format::scrape_failure_message())
                .await;
            report.alerts += 1;
        }
        report
    }

    /// Fetches every location for every anchor month. Stops early when the session has expired.
    async fn collect(&mut self, now: DateTime<Utc>) -> (AvailabilitySnapshot, bool) {
        let mut snapshot = AvailabilitySnapshot::default();
        for anchor in self.anchors(now) {
            for location in Location::ALL {
                match fetch_with_backoff(self.page.as_ref(), location, anchor, &self.waiting_room)
                    .await
                {
                    Ok(html) => {
                        self.reauth_alerted = false;
                        let dates = extract_availability(&html, anchor);
                        tracing::info!(%location, %anchor, dates = dates.len(), "Fetched availability");
                        snapshot.insert(location, dates);
                    }
                    Err(FetchError::ReauthRequired) => return (snapshot, true),
                    Err(e) => {
                        tracing::warn!(error.cause_chain = ?e, %location, %anchor, "Failed to fetch availability");
                    }
                }
            }
        }
        (snapshot, false)
    }

    async fn subscriber_queries(&self) -> Result<Vec<SubscriberQueries>, StoreError> {
        let mut result = Vec::new();
        for subscriber in self.store.list_active_subscribers().await? {
            let queries = self.store.list_queries(&subscriber.chat_id).await?;
            result.push(SubscriberQueries {
                chat_id: subscriber.chat_id,
                queries,
            });
        }
        Ok(result)
    }
}
