//! History log and request store behaviour through the facade.

use super::{in_memory_tester, tester_with};
use api_tester::{
    ApiError, ApiTesterConfig, HistoryFilter, HttpMethod, OutcomeKind, RequestConfig,
    RequestOverrides, StatusClass,
};
use std::time::Duration;
use wiremock::matchers::path;
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn status_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(path("/ok"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;
    Mock::given(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(path("/broken"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_history_evicts_oldest_at_capacity() {
    let server = status_server().await;
    let tester = in_memory_tester();
    let config = RequestConfig::new(HttpMethod::GET, format!("{}/ok", server.uri()));

    let mut ids = Vec::new();
    for _ in 0..101 {
        let record = tester
            .execute_request(&config, &RequestOverrides::default())
            .await
            .unwrap();
        ids.push(record.id);
    }

    let history = tester.get_history(&HistoryFilter::default());
    assert_eq!(history.len(), 100);
    assert!(matches!(
        tester.get_history_record(&ids[0]),
        Err(ApiError::NotFound { .. })
    ));
    assert!(tester.get_history_record(&ids[1]).is_ok());
    assert_eq!(history[0].id, ids[100]);
    assert_eq!(history[99].id, ids[1]);
}

#[tokio::test]
async fn test_history_filters() {
    let server = status_server().await;
    let tester = in_memory_tester();

    for (method, route) in [
        (HttpMethod::GET, "/ok"),
        (HttpMethod::POST, "/missing"),
        (HttpMethod::GET, "/broken"),
        (HttpMethod::GET, "/ok"),
    ] {
        tester
            .execute_request(
                &RequestConfig::new(method, format!("{}{}", server.uri(), route)),
                &RequestOverrides::default(),
            )
            .await
            .unwrap();
    }

    let gets = tester.get_history(&HistoryFilter::new().method(HttpMethod::GET));
    assert_eq!(gets.len(), 3);

    let client_errors =
        tester.get_history(&HistoryFilter::new().status_class(StatusClass::ClientError));
    assert_eq!(client_errors.len(), 1);
    assert_eq!(client_errors[0].request.method, HttpMethod::POST);

    let errors = tester.get_history(&HistoryFilter::new().outcome(OutcomeKind::HttpError));
    assert_eq!(errors.len(), 2);

    let by_url = tester.get_history(&HistoryFilter::new().url_contains("/OK"));
    assert_eq!(by_url.len(), 2);

    let newest = tester.get_history(&HistoryFilter::new().limit(1));
    let oldest = tester.get_history(&HistoryFilter::new().limit(1).oldest_first());
    assert!(newest[0].request.url.ends_with("/ok"));
    assert!(newest[0].timestamp >= oldest[0].timestamp);
    assert_ne!(newest[0].id, oldest[0].id);
}

#[tokio::test]
async fn test_clear_history_returns_count() {
    let server = status_server().await;
    let tester = in_memory_tester();
    for _ in 0..3 {
        tester
            .execute_request(
                &RequestConfig::new(HttpMethod::GET, format!("{}/ok", server.uri())),
                &RequestOverrides::default(),
            )
            .await
            .unwrap();
    }

    assert_eq!(tester.clear_history().unwrap(), 3);
    assert!(tester.get_history(&HistoryFilter::default()).is_empty());
    assert_eq!(tester.clear_history().unwrap(), 0);
}

#[tokio::test]
async fn test_small_capacity() {
    let server = status_server().await;
    let tester = tester_with(ApiTesterConfig {
        max_history: 2,
        ..ApiTesterConfig::in_memory()
    });

    for _ in 0..5 {
        tester
            .execute_request(
                &RequestConfig::new(HttpMethod::GET, format!("{}/ok", server.uri())),
                &RequestOverrides::default(),
            )
            .await
            .unwrap();
    }
    assert_eq!(tester.get_history(&HistoryFilter::default()).len(), 2);
}

#[test]
fn test_store_lifecycle() {
    let tester = in_memory_tester();
    let config = RequestConfig::new(HttpMethod::GET, "https://api.test/users")
        .with_description("List users");

    tester.save_request("users", config.clone()).unwrap();
    tester
        .save_request("health", RequestConfig::new(HttpMethod::GET, "/health"))
        .unwrap();

    assert_eq!(
        tester.list_requests(),
        vec!["health".to_string(), "users".to_string()]
    );
    assert_eq!(tester.load_request("users").unwrap().url, config.url);

    let overrides = RequestOverrides {
        timeout: Some(Duration::from_secs(5)),
        ..RequestOverrides::default()
    };
    let updated = tester.update_request("users", &overrides).unwrap();
    assert_eq!(updated.timeout, Some(Duration::from_secs(5)));
    assert_eq!(
        tester.load_request("users").unwrap().timeout,
        Some(Duration::from_secs(5))
    );

    let summaries = tester.request_summaries();
    let users = summaries.iter().find(|s| s.name == "users").unwrap();
    assert_eq!(users.description.as_deref(), Some("List users"));
    assert!(users.updated_at >= users.saved_at);

    tester.delete_request("users").unwrap();
    assert!(matches!(
        tester.delete_request("users"),
        Err(ApiError::NotFound { .. })
    ));
    assert!(tester.load_request("users").unwrap_err().is_not_found());
}

#[test]
fn test_store_last_write_wins_and_rejects_empty_name() {
    let tester = in_memory_tester();
    tester
        .save_request("a", RequestConfig::new(HttpMethod::GET, "https://a.test/1"))
        .unwrap();
    tester
        .save_request("a", RequestConfig::new(HttpMethod::POST, "https://a.test/2"))
        .unwrap();

    let loaded = tester.load_request("a").unwrap();
    assert_eq!(loaded.method, HttpMethod::POST);
    assert_eq!(loaded.url, "https://a.test/2");
    assert_eq!(tester.list_requests().len(), 1);

    let unnamed = RequestConfig::new(HttpMethod::GET, "https://a.test/x");
    tester.save_request("users", unnamed.clone()).unwrap();
    assert_eq!(tester.load_request("users").unwrap(), unnamed);

    assert!(matches!(
        tester.save_request("", RequestConfig::default()),
        Err(ApiError::InvalidConfig(_))
    ));
    assert!(tester
        .update_request("missing", &RequestOverrides::default())
        .unwrap_err()
        .is_not_found());
}
