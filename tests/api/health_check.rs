use crate::helpers::spawn_app;

#[tokio::test]
async fn health_check_works() {
    // arrange
    let app = spawn_app().await;

    // act
    let response = app.get("/health").await;

    // assert
    assert!(response.status().is_success());
    assert_eq!("OK", response.text().await.unwrap());
}
