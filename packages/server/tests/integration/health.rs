use crate::common::TestApp;

#[tokio::test]
async fn health_returns_ok() {
    let app = TestApp::spawn().await;

    let res = app.get("/health").await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body.as_str().unwrap(), "OK");
}

#[tokio::test]
async fn status_reports_running_service() {
    let app = TestApp::spawn().await;

    let res = app.get("/status").await;
    assert_eq!(res.status, 200);
    assert_eq!(res.body["status"].as_str().unwrap(), "running");
    assert!(res.body["uptime_secs"].as_u64().is_some());
}
