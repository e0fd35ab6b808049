//! End-to-end execution tests against a local mock server.

use super::{in_memory_tester, tester_with};
use api_tester::{
    ApiError, ApiTesterConfig, AuthSpec, Environment, HistoryFilter, HttpMethod, Outcome,
    RequestBody, RequestConfig, RequestOverrides,
};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn header_value(request: &wiremock::Request, name: &str) -> Option<String> {
    request
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

#[tokio::test]
async fn test_execute_success_records_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/posts/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1, "title": "hello"})))
        .mount(&server)
        .await;

    let tester = in_memory_tester();
    let record = tester
        .execute_request(
            &RequestConfig::new(HttpMethod::GET, format!("{}/posts/1", server.uri())),
            &RequestOverrides::default(),
        )
        .await
        .unwrap();

    assert_eq!(record.outcome, Outcome::Success);
    let response = record.response.as_ref().unwrap();
    assert_eq!(response.status_code, 200);
    assert_eq!(response.body_json(), Some(json!({"id": 1, "title": "hello"})));
    assert!(!response.truncated);
    assert_eq!(tester.get_history_record(&record.id).unwrap(), record);
}

#[tokio::test]
async fn test_base_url_join_keeps_base_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/posts/1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let tester = in_memory_tester();
    tester
        .register_environment(
            Environment::new("local")
                .with_base_url(&format!("{}/api/", server.uri()))
                .unwrap(),
            false,
        )
        .unwrap();
    tester.set_environment("local").unwrap();

    let record = tester
        .execute_request(
            &RequestConfig::new(HttpMethod::GET, "/posts/1"),
            &RequestOverrides::default(),
        )
        .await
        .unwrap();

    assert_eq!(record.outcome, Outcome::Success);
    assert!(record.request.url.ends_with("/api/posts/1"));
    assert!(!record.request.url.contains("api//posts"));
}

#[tokio::test]
async fn test_relative_url_without_environment_fails() {
    let tester = in_memory_tester();
    let result = tester
        .execute_request(
            &RequestConfig::new(HttpMethod::GET, "/posts/1"),
            &RequestOverrides::default(),
        )
        .await;

    assert!(matches!(result, Err(ApiError::InvalidUrl(_))));
    assert!(tester.get_history(&HistoryFilter::default()).is_empty());
}

#[tokio::test]
async fn test_override_precedence() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/items"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let tester = in_memory_tester();
    tester
        .register_environment(
            Environment::new("dev")
                .with_base_url(&server.uri())
                .unwrap()
                .with_header("X-Layer", "environment")
                .with_header("X-Env", "dev")
                .with_timeout(Duration::from_secs(5)),
            false,
        )
        .unwrap();
    tester.set_environment("dev").unwrap();

    let config = RequestConfig::new(HttpMethod::GET, "/items")
        .with_header("x-layer", "request")
        .with_query("page", "1")
        .with_timeout(Duration::from_secs(10));

    let mut overrides = RequestOverrides {
        method: Some(HttpMethod::PUT),
        timeout: Some(Duration::from_secs(3)),
        ..RequestOverrides::default()
    };
    overrides
        .headers
        .insert("X-LAYER".to_string(), "override".to_string());
    overrides
        .query_params
        .insert("page".to_string(), "2".to_string());

    let record = tester.execute_request(&config, &overrides).await.unwrap();

    assert_eq!(record.outcome, Outcome::Success);
    assert_eq!(record.request.method, HttpMethod::PUT);
    assert_eq!(record.request.timeout, Some(Duration::from_secs(3)));

    let received = server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
    assert_eq!(header_value(&received[0], "x-layer").as_deref(), Some("override"));
    assert_eq!(header_value(&received[0], "x-env").as_deref(), Some("dev"));
    assert!(header_value(&received[0], "user-agent")
        .unwrap()
        .starts_with("api-tester/"));
}

#[tokio::test]
async fn test_environment_timeout_applies_when_request_has_none() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let tester = in_memory_tester();
    tester
        .register_environment(
            Environment::new("dev")
                .with_base_url(&server.uri())
                .unwrap()
                .with_timeout(Duration::from_secs(7)),
            false,
        )
        .unwrap();
    tester.set_environment("dev").unwrap();

    let record = tester
        .execute_request(
            &RequestConfig::new(HttpMethod::GET, "ping"),
            &RequestOverrides::default(),
        )
        .await
        .unwrap();
    assert_eq!(record.request.timeout, Some(Duration::from_secs(7)));

    let plain = in_memory_tester()
        .execute_request(
            &RequestConfig::new(HttpMethod::GET, format!("{}/ping", server.uri())),
            &RequestOverrides::default(),
        )
        .await
        .unwrap();
    assert_eq!(plain.request.timeout, Some(Duration::from_secs(30)));
}

#[tokio::test]
async fn test_json_body_and_auth_headers_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/users"))
        .and(header("authorization", "Bearer secret-token"))
        .and(header("content-type", "application/json"))
        .and(body_json(json!({"name": "Ada"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 42})))
        .expect(1)
        .mount(&server)
        .await;

    let config = RequestConfig::new(HttpMethod::POST, format!("{}/users", server.uri()))
        .with_body(RequestBody::Json(json!({"name": "Ada"})))
        .with_auth(AuthSpec::Bearer {
            token: "secret-token".to_string(),
        });

    let record = in_memory_tester()
        .execute_request(&config, &RequestOverrides::default())
        .await
        .unwrap();

    assert_eq!(record.outcome, Outcome::Success);
    assert_eq!(record.status(), Some(201));
}

#[tokio::test]
async fn test_api_key_and_basic_auth() {
    let server = MockServer::start().await;
    Mock::given(path("/key"))
        .and(header("x-api-key", "k-123"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    Mock::given(path("/basic"))
        .and(header("authorization", "Basic dXNlcjpwYXNz"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let tester = in_memory_tester();
    let key = tester
        .execute_request(
            &RequestConfig::new(HttpMethod::GET, format!("{}/key", server.uri())).with_auth(
                AuthSpec::ApiKey {
                    header_name: "X-API-Key".to_string(),
                    value: "k-123".to_string(),
                },
            ),
            &RequestOverrides::default(),
        )
        .await
        .unwrap();
    assert_eq!(key.outcome, Outcome::Success);

    let basic = tester
        .execute_request(
            &RequestConfig::new(HttpMethod::GET, format!("{}/basic", server.uri())).with_auth(
                AuthSpec::Basic {
                    username: "user".to_string(),
                    password: "pass".to_string(),
                },
            ),
            &RequestOverrides::default(),
        )
        .await
        .unwrap();
    assert_eq!(basic.outcome, Outcome::Success);
}

#[tokio::test]
async fn test_auth_conflict_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let tester = in_memory_tester();
    let config = RequestConfig::new(HttpMethod::GET, server.uri())
        .with_header("Authorization", "Bearer a")
        .with_auth(AuthSpec::Bearer {
            token: "b".to_string(),
        });

    let result = tester
        .execute_request(&config, &RequestOverrides::default())
        .await;

    match result {
        Err(ApiError::ConfigConflict { header, .. }) => {
            assert!(header.eq_ignore_ascii_case("authorization"))
        }
        other => panic!("Expected ConfigConflict, got {:?}", other),
    }
    assert!(tester.get_history(&HistoryFilter::default()).is_empty());
}

#[tokio::test]
async fn test_identical_explicit_auth_header_is_not_a_conflict() {
    let server = MockServer::start().await;
    Mock::given(header("authorization", "Bearer same"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let config = RequestConfig::new(HttpMethod::GET, server.uri())
        .with_header("authorization", "Bearer same")
        .with_auth(AuthSpec::Bearer {
            token: "same".to_string(),
        });

    let record = in_memory_tester()
        .execute_request(&config, &RequestOverrides::default())
        .await
        .unwrap();
    assert_eq!(record.outcome, Outcome::Success);
}

#[tokio::test]
async fn test_http_error_is_an_outcome() {
    let server = MockServer::start().await;
    Mock::given(path("/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not here"))
        .mount(&server)
        .await;

    let record = in_memory_tester()
        .execute_request(
            &RequestConfig::new(HttpMethod::GET, format!("{}/missing", server.uri())),
            &RequestOverrides::default(),
        )
        .await
        .unwrap();

    assert_eq!(record.outcome, Outcome::HttpError { status: 404 });
    assert_eq!(record.response.unwrap().body_text(), Some("not here"));
}

#[tokio::test]
async fn test_connection_refused_is_network_error() {
    let tester = in_memory_tester();
    let record = tester
        .execute_request(
            &RequestConfig::new(HttpMethod::GET, "http://127.0.0.1:1/"),
            &RequestOverrides::default(),
        )
        .await
        .unwrap();

    match &record.outcome {
        Outcome::NetworkError { reason } => assert!(!reason.is_empty()),
        other => panic!("Expected NetworkError, got {:?}", other),
    }
    assert!(record.response.is_none());
    assert_eq!(tester.get_history(&HistoryFilter::default()).len(), 1);
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let config = RequestConfig::new(HttpMethod::GET, format!("{}/slow", server.uri()))
        .with_timeout(Duration::from_millis(100));

    let record = in_memory_tester()
        .execute_request(&config, &RequestOverrides::default())
        .await
        .unwrap();

    assert_eq!(record.outcome, Outcome::Timeout);
    assert!(record.response.is_none());
    assert!(record.duration >= Duration::from_millis(100));
    assert!(record.duration < Duration::from_secs(2));
}

#[tokio::test]
async fn test_large_body_is_truncated() {
    let server = MockServer::start().await;
    Mock::given(path("/big"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![b'x'; 100]))
        .mount(&server)
        .await;

    let tester = tester_with(ApiTesterConfig {
        max_body_capture_bytes: 10,
        ..ApiTesterConfig::in_memory()
    });
    let record = tester
        .execute_request(
            &RequestConfig::new(HttpMethod::GET, format!("{}/big", server.uri())),
            &RequestOverrides::default(),
        )
        .await
        .unwrap();

    let response = record.response.unwrap();
    assert!(response.truncated);
    assert_eq!(response.body.len(), 10);
    assert_eq!(response.size, 100);
}

#[tokio::test]
async fn test_blocked_domain_writes_no_record() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let tester = tester_with(ApiTesterConfig {
        blocked_domains: vec!["127.0.0.1".to_string()],
        ..ApiTesterConfig::in_memory()
    });

    let result = tester
        .execute_request(
            &RequestConfig::new(HttpMethod::GET, server.uri()),
            &RequestOverrides::default(),
        )
        .await;

    assert!(matches!(result, Err(ApiError::BlockedUrl(_))));
    assert!(tester.get_history(&HistoryFilter::default()).is_empty());
}

#[tokio::test]
async fn test_unsupported_scheme_rejected() {
    let result = in_memory_tester()
        .execute_request(
            &RequestConfig::new(HttpMethod::GET, "ftp://files.test/a"),
            &RequestOverrides::default(),
        )
        .await;
    assert!(matches!(result, Err(ApiError::UnsupportedProtocol(_))));
}

#[tokio::test]
async fn test_effective_request_replays_identically() {
    let server = MockServer::start().await;
    Mock::given(path("/api/echo"))
        .and(query_param("q", "1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(2)
        .mount(&server)
        .await;

    let tester = in_memory_tester();
    tester
        .register_environment(
            Environment::new("dev")
                .with_base_url(&format!("{}/api", server.uri()))
                .unwrap()
                .with_header("X-Env", "dev"),
            false,
        )
        .unwrap();
    tester.set_environment("dev").unwrap();

    let first = tester
        .execute_request(
            &RequestConfig::new(HttpMethod::GET, "echo").with_query("q", "1"),
            &RequestOverrides::default(),
        )
        .await
        .unwrap();

    // Replaying the effective request needs no environment.
    let replay = in_memory_tester()
        .execute_request(&first.request, &RequestOverrides::default())
        .await
        .unwrap();

    assert_eq!(replay.request, first.request);
    assert_eq!(replay.outcome, Outcome::Success);
}

#[tokio::test]
async fn test_execute_saved_request_with_overrides() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/users/7"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let tester = in_memory_tester();
    tester
        .save_request(
            "user",
            RequestConfig::new(HttpMethod::GET, format!("{}/users/7", server.uri())),
        )
        .unwrap();

    let overrides = RequestOverrides {
        method: Some(HttpMethod::DELETE),
        ..RequestOverrides::default()
    };
    let record = tester.execute_saved_request("user", &overrides).await.unwrap();
    assert_eq!(record.request.method, HttpMethod::DELETE);
    assert_eq!(record.request.name.as_deref(), Some("user"));

    // The saved configuration itself is unchanged.
    assert_eq!(tester.load_request("user").unwrap().method, HttpMethod::GET);

    let missing = tester
        .execute_saved_request("nope", &RequestOverrides::default())
        .await;
    assert!(missing.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_concurrent_executions_all_recorded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let tester = in_memory_tester();
    let mut handles = Vec::new();
    for i in 0..10 {
        let tester = tester.clone();
        let url = format!("{}/item/{}", server.uri(), i);
        handles.push(tokio::spawn(async move {
            tester
                .execute_request(
                    &RequestConfig::new(HttpMethod::GET, url),
                    &RequestOverrides::default(),
                )
                .await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }

    assert_eq!(tester.get_history(&HistoryFilter::default()).len(), 10);
}
