use crate::helpers::spawn_app;
use refuge_watch::domain::{ChatId, Language, Location, LocationFilter};

#[tokio::test]
async fn subscribe_redirects_and_persists_for_valid_form_data() {
    // arrange
    let app = spawn_app().await;
    let body = "chat_id=123456&language=fr&refuge=du%20Go%C3%BBter&date_from=2025-07-01&date_to=2025-07-31";

    // act
    let response = app.post_subscriptions(body.into()).await;

    // assert
    assert_eq!(303, response.status().as_u16());
    assert_eq!(
        response.headers().get("Location").unwrap().to_str().unwrap(),
        "/#subscribe"
    );

    let chat_id = ChatId::from(123456);
    let saved = app.store.get_subscriber(&chat_id).await.unwrap();
    assert_eq!(saved.language, Language::Fr);
    assert!(saved.is_active);

    let queries = app.store.list_queries(&chat_id).await.unwrap();
    assert_eq!(queries.len(), 1);
    assert_eq!(queries[0].location, LocationFilter::Only(Location::Gouter));

    assert_eq!(app.messenger.sent_to(123456).len(), 1);
}

#[tokio::test]
async fn subscribing_twice_keeps_one_record_with_the_latest_language() {
    // arrange
    let app = spawn_app().await;

    // act
    app.post_subscriptions("chat_id=42&language=de".into()).await;
    app.post_subscriptions("chat_id=42&language=it".into()).await;

    // assert
    let active = app.store.list_active_subscribers().await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].language, Language::It);
    assert_eq!(app.store.list_queries(&ChatId::from(42)).await.unwrap().len(), 2);
}

#[tokio::test]
async fn subscribe_returns_a_400_when_chat_id_is_missing() {
    // arrange
    let app = spawn_app().await;
    let test_cases = vec![
        ("language=en&refuge=*", "missing the chat id"),
        ("", "empty body"),
    ];

    for (invalid_body, error_message) in test_cases {
        // act
        let response = app.post_subscriptions(invalid_body.into()).await;

        // assert
        assert_eq!(
            400,
            response.status().as_u16(),
            "The API did not fail with 400 Bad Request when the payload was {}.",
            error_message
        );
    }
}

#[tokio::test]
async fn subscribe_returns_a_400_when_fields_are_present_but_invalid() {
    // arrange
    let app = spawn_app().await;
    let test_cases = vec![
        ("chat_id=not-a-number", "non-numeric chat id"),
        ("chat_id=", "empty chat id"),
        ("chat_id=1&language=klingon", "unsupported language"),
        ("chat_id=1&refuge=Cosmiques", "unknown refuge"),
        ("chat_id=1&date_from=2025-08-10&date_to=2025-08-01", "reversed dates"),
        ("chat_id=1&date_from=tomorrow", "malformed date"),
    ];

    for (body, description) in test_cases {
        // act
        let response = app.post_subscriptions(body.into()).await;

        // assert
        assert_eq!(
            400,
            response.status().as_u16(),
            "The API did not return a 400 Bad Request when the payload was {}.",
            description
        );
    }

    assert!(app.store.list_active_subscribers().await.unwrap().is_empty());
    assert!(app.messenger.sent().is_empty());
}

#[tokio::test]
async fn validation_errors_are_described_in_the_body() {
    let app = spawn_app().await;

    let response = app.post_subscriptions("chat_id=abc".into()).await;

    assert_eq!(400, response.status().as_u16());
    assert!(response.text().await.unwrap().contains("must be numeric"));
}
