use crate::helpers::{
    calendar_html, test_settings, PageResponse, RecordingMessenger, ScriptedPage, ADMIN_CHAT_ID,
    CONFIGURED_CHAT_ID,
};
use chrono::{Duration, Utc};
use refuge_watch::configuration::{DedupScope, Settings};
use refuge_watch::domain::{
    ChatId, DateRange, Language, Location, LocationFilter, NewQuery, NewSubscriber,
};
use refuge_watch::messenger::Notifier;
use refuge_watch::poller::{CycleReport, Poller};
use refuge_watch::status_board::StatusBoard;
use refuge_watch::store::{RedbStore, SubscriberStore};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::watch;

struct TestPoller {
    poller: Poller,
    page: Arc<ScriptedPage>,
    messenger: Arc<RecordingMessenger>,
    store: Arc<dyn SubscriberStore>,
    board: StatusBoard,
    _dir: TempDir,
}

fn build_poller(page: ScriptedPage, customise: impl FnOnce(&mut Settings)) -> TestPoller {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = test_settings(&dir);
    customise(&mut settings);

    let store: Arc<dyn SubscriberStore> =
        Arc::new(RedbStore::open(&settings.store.embedded_path).unwrap());
    let messenger = Arc::new(RecordingMessenger::default());
    let notifier = Notifier::new(
        messenger.clone(),
        store.clone(),
        settings.telegram.recipients().unwrap(),
        settings.telegram.admins().unwrap(),
    );
    let board = StatusBoard::default();
    let page = Arc::new(page);
    let poller = Poller::new(
        &settings,
        page.clone(),
        store.clone(),
        notifier,
        board.clone(),
    );
    TestPoller {
        poller,
        page,
        messenger,
        store,
        board,
        _dir: dir,
    }
}

fn two_open_days() -> PageResponse {
    PageResponse::Html(calendar_html(&[("08/03", 2), ("08/04", 1)], &["08/10"]))
}

#[tokio::test]
async fn new_openings_are_broadcast_once() {
    // arrange
    let mut t = build_poller(ScriptedPage::always(two_open_days()), |_| {});

    // act
    let first = t.poller.run_cycle(Utc::now()).await;
    let second = t.poller.run_cycle(Utc::now()).await;

    // assert
    assert_eq!(first.total_dates, 6);
    assert_eq!(first.notifications, 1);
    assert_eq!(second, CycleReport { total_dates: 6, notifications: 0, alerts: 0 });

    let messages = t.messenger.sent_to(CONFIGURED_CHAT_ID);
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("<b>Tête Rousse</b>"));
    assert!(messages[0].contains("<b>du Goûter</b>"));
    assert!(messages[0].contains("• 2025-08-03: 2 places"));
    assert!(messages[0].contains("• 2025-08-04: 1 place\n"));
    assert!(!messages[0].contains("2025-08-10"));
}

#[tokio::test]
async fn a_date_announced_at_one_refuge_is_not_announced_at_the_other() {
    // arrange
    let page = ScriptedPage::new(
        vec![
            PageResponse::Html(calendar_html(&[("08/03", 2)], &[])),
            PageResponse::Html(calendar_html(&[], &["08/03"])),
            PageResponse::Html(calendar_html(&[], &["08/03"])),
            PageResponse::Html(calendar_html(&[("08/03", 1)], &[])),
        ],
        two_open_days(),
    );
    let mut t = build_poller(page, |_| {});

    // act
    let first = t.poller.run_cycle(Utc::now()).await;
    let second = t.poller.run_cycle(Utc::now()).await;

    // assert
    assert_eq!(first.notifications, 1);
    assert_eq!(second.notifications, 0);
    assert_eq!(t.messenger.sent_to(CONFIGURED_CHAT_ID).len(), 1);
}

#[tokio::test]
async fn refuges_that_yield_no_dates_are_left_off_the_board() {
    let page = ScriptedPage::new(
        vec![
            two_open_days(),
            PageResponse::Html("<html><body></body></html>".into()),
        ],
        two_open_days(),
    );
    let mut t = build_poller(page, |_| {});

    t.poller.run_cycle(Utc::now()).await;

    let view = t.board.read();
    assert_eq!(view.snapshot.location_count(), 1);
    assert!(view.snapshot.get(Location::Gouter).is_none());
}

#[tokio::test]
async fn every_location_is_fetched_for_every_month() {
    let mut t = build_poller(ScriptedPage::always(two_open_days()), |c| c.booking.months = 2);

    t.poller.run_cycle(Utc::now()).await;

    let calls = t.page.calls();
    assert_eq!(calls.len(), 4);
    assert!(calls.iter().any(|(l, a)| *l == Location::Gouter && a.month() == 9));
}

#[tokio::test]
async fn the_status_board_is_updated_every_cycle() {
    let mut t = build_poller(ScriptedPage::always(two_open_days()), |_| {});
    let now = Utc::now();

    t.poller.run_cycle(now).await;

    let view = t.board.read();
    assert_eq!(view.last_check, now);
    assert_eq!(view.snapshot.location_count(), 2);
}

#[tokio::test]
async fn an_empty_cycle_raises_exactly_one_warning() {
    // arrange
    let page = ScriptedPage::always(PageResponse::Html("<html><body></body></html>".into()));
    let mut t = build_poller(page, |_| {});

    // act
    let report = t.poller.run_cycle(Utc::now()).await;

    // assert
    assert_eq!(report, CycleReport { total_dates: 0, notifications: 0, alerts: 1 });
    assert!(t.messenger.sent_to(CONFIGURED_CHAT_ID).is_empty());
    let warnings = t.messenger.sent_to(ADMIN_CHAT_ID);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("No dates were found"));
}

#[tokio::test]
async fn upstream_failures_on_every_fetch_count_as_an_empty_cycle() {
    let mut t = build_poller(ScriptedPage::always(PageResponse::Upstream(503)), |_| {});

    let report = t.poller.run_cycle(Utc::now()).await;

    assert_eq!(report.alerts, 1);
    assert_eq!(t.messenger.sent_to(ADMIN_CHAT_ID).len(), 1);
}

#[tokio::test]
async fn an_endless_waiting_room_gives_up_and_warns() {
    let queued = PageResponse::Html("<p>Your Rank in the waiting room: 120</p>".into());
    let mut t = build_poller(ScriptedPage::always(queued), |_| {});

    let report = t.poller.run_cycle(Utc::now()).await;

    // Two attempts per location, then the cycle carries on without data.
    assert_eq!(t.page.calls().len(), 4);
    assert_eq!(report.total_dates, 0);
    assert_eq!(report.alerts, 1);
}

#[tokio::test]
async fn expired_session_alerts_operators_once_per_episode() {
    // arrange
    let page = ScriptedPage::new(
        vec![PageResponse::Reauth, PageResponse::Reauth],
        two_open_days(),
    );
    let mut t = build_poller(page, |_| {});

    // act
    let first = t.poller.run_cycle(Utc::now()).await;
    let second = t.poller.run_cycle(Utc::now()).await;

    // assert
    assert_eq!(first.alerts, 1, "reauth alert without a scrape failure warning");
    assert_eq!(second.alerts, 0);
    let alerts = t.messenger.sent_to(ADMIN_CHAT_ID);
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].contains("session has expired"));

    // The third cycle succeeds, so a later expiry is a new episode.
    let third = t.poller.run_cycle(Utc::now()).await;
    assert_eq!(third.notifications, 1);
}

#[tokio::test]
async fn a_new_expiry_after_recovery_alerts_again() {
    let page = ScriptedPage::new(
        vec![
            PageResponse::Reauth,
            two_open_days(),
            two_open_days(),
            PageResponse::Reauth,
        ],
        two_open_days(),
    );
    let mut t = build_poller(page, |_| {});

    t.poller.run_cycle(Utc::now()).await;
    t.poller.run_cycle(Utc::now()).await;
    t.poller.run_cycle(Utc::now()).await;

    let reauth_alerts = t
        .messenger
        .sent_to(ADMIN_CHAT_ID)
        .into_iter()
        .filter(|m| m.contains("session has expired"))
        .count();
    assert_eq!(reauth_alerts, 2);
}

#[tokio::test]
async fn broadcast_goes_to_active_subscribers_when_there_are_any() {
    let mut t = build_poller(ScriptedPage::always(two_open_days()), |_| {});
    t.store
        .upsert_subscriber(NewSubscriber::new(ChatId::from(7), Language::En))
        .await
        .unwrap();

    t.poller.run_cycle(Utc::now()).await;

    assert_eq!(t.messenger.sent_to(7).len(), 1);
    assert!(t.messenger.sent_to(CONFIGURED_CHAT_ID).is_empty());
}

async fn subscribe(store: &Arc<dyn SubscriberStore>, chat_id: i64, refuge: &str, from: &str, to: &str) {
    let chat_id = ChatId::from(chat_id);
    store
        .upsert_subscriber(NewSubscriber::new(chat_id.clone(), Language::En))
        .await
        .unwrap();
    store
        .add_query(NewQuery {
            id: None,
            chat_id,
            location: LocationFilter::parse(refuge).unwrap(),
            range: DateRange::parse(from, to).unwrap(),
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn filtered_mode_only_sends_matching_openings() {
    // arrange
    let mut t = build_poller(ScriptedPage::always(two_open_days()), |c| {
        c.poller.per_subscriber_filtering = true;
    });
    subscribe(&t.store, 10, "du Goûter", "", "2025-08-03").await;
    t.store
        .upsert_subscriber(NewSubscriber::new(ChatId::from(11), Language::En))
        .await
        .unwrap();

    // act
    let report = t.poller.run_cycle(Utc::now()).await;

    // assert
    assert_eq!(report.notifications, 1);
    let messages = t.messenger.sent_to(10);
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("du Goûter"));
    assert!(!messages[0].contains("Tête Rousse"));
    assert!(messages[0].contains("2025-08-03"));
    assert!(!messages[0].contains("2025-08-04"));
    // Subscribers without saved queries get nothing in filtered mode.
    assert!(t.messenger.sent_to(11).is_empty());
}

#[tokio::test]
async fn overlapping_filters_follow_the_dedup_scope() {
    for (scope, expected_recipients) in [(DedupScope::Global, 1), (DedupScope::PerSubscriber, 2)] {
        let mut t = build_poller(ScriptedPage::always(two_open_days()), |c| {
            c.poller.per_subscriber_filtering = true;
            c.poller.dedup_scope = scope;
        });
        subscribe(&t.store, 20, "*", "", "").await;
        subscribe(&t.store, 21, "*", "", "").await;

        t.poller.run_cycle(Utc::now()).await;

        let recipients = [20, 21]
            .into_iter()
            .filter(|id| !t.messenger.sent_to(*id).is_empty())
            .count();
        assert_eq!(recipients, expected_recipients, "scope {:?}", scope);
    }
}

#[tokio::test]
async fn notified_dates_expire_with_a_ttl() {
    let mut t = build_poller(ScriptedPage::always(two_open_days()), |c| {
        c.poller.notified_ttl_hours = Some(1);
    });
    let start = Utc::now();

    let first = t.poller.run_cycle(start).await;
    let within_ttl = t.poller.run_cycle(start + Duration::minutes(30)).await;
    let after_ttl = t.poller.run_cycle(start + Duration::hours(2)).await;

    assert_eq!(first.notifications, 1);
    assert_eq!(within_ttl.notifications, 0);
    assert_eq!(after_ttl.notifications, 1);
}

#[tokio::test]
async fn run_announces_start_and_stop() {
    // arrange
    let t = build_poller(ScriptedPage::always(two_open_days()), |_| {});
    let messenger = t.messenger.clone();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // act
    let task = tokio::spawn(t.poller.run(shutdown_rx));
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(std::time::Duration::from_secs(5), task)
        .await
        .expect("poller did not stop")
        .unwrap();

    // assert
    let operator_messages = messenger.sent_to(ADMIN_CHAT_ID);
    assert!(operator_messages.first().unwrap().contains("Monitoring started"));
    assert!(operator_messages.last().unwrap().contains("Monitoring stopped"));
    // The first tick fires immediately.
    assert_eq!(messenger.sent_to(CONFIGURED_CHAT_ID).len(), 1);
}
