//! Comparison, analysis, statistics and planning over executed requests.

use super::in_memory_tester;
use api_tester::analysis::{Anomaly, BodyDiff, ChangeKind, ContentType, Pattern};
use api_tester::{ApiTester, HistoryFilter, HistoryRecord, HttpMethod, RequestConfig, RequestOverrides};
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::path;
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn get(tester: &ApiTester, url: String) -> HistoryRecord {
    tester
        .execute_request(
            &RequestConfig::new(HttpMethod::GET, url),
            &RequestOverrides::default(),
        )
        .await
        .unwrap()
}

#[tokio::test]
async fn test_compare_responses() {
    let server = MockServer::start().await;
    Mock::given(path("/v1/user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 1, "name": "Ada"})))
        .mount(&server)
        .await;
    Mock::given(path("/v2/user"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"id": 1, "name": "Ada L.", "email": "ada@test"})),
        )
        .mount(&server)
        .await;

    let tester = in_memory_tester();
    let a = get(&tester, format!("{}/v1/user", server.uri())).await;
    let b = get(&tester, format!("{}/v2/user", server.uri())).await;

    let same = tester.compare_responses(&a.id, &a.id).unwrap();
    assert!(same.status_match);
    assert!(same.header_diff.is_empty());
    assert!(same.body_diff.is_empty());
    assert_eq!(same.timing_delta_ms, 0);

    let report = tester.compare_responses(&a.id, &b.id).unwrap();
    assert!(report.status_match);
    match report.body_diff {
        BodyDiff::Json { changes, truncated } => {
            assert!(!truncated);
            let paths: Vec<(&str, ChangeKind)> =
                changes.iter().map(|c| (c.path.as_str(), c.kind)).collect();
            assert!(paths.contains(&("$.name", ChangeKind::Changed)));
            assert!(paths.contains(&("$.email", ChangeKind::Added)));
            assert_eq!(changes.len(), 2);
        }
        other => panic!("Expected JSON diff, got {:?}", other),
    }

    assert!(tester
        .compare_responses(&a.id, &Uuid::new_v4())
        .unwrap_err()
        .is_not_found());
}

#[tokio::test]
async fn test_analyze_response() {
    let server = MockServer::start().await;
    Mock::given(path("/users"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Link", "<https://api.test/users?page=2>; rel=\"next\"")
                .insert_header("X-RateLimit-Remaining", "41")
                .set_body_json(json!({
                    "data": [{"name": "Ada"}, {"name": "Linus"}],
                    "page": 1,
                    "total": 2
                })),
        )
        .mount(&server)
        .await;
    Mock::given(path("/empty"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let tester = in_memory_tester();
    let record = get(&tester, format!("{}/users", server.uri())).await;

    let report = tester
        .analyze_response(&record.id, Some("data[1].name"))
        .unwrap();
    assert_eq!(report.content_type, Some(ContentType::Json));
    assert_eq!(report.status, Some(200));
    assert_eq!(report.json_shape.as_ref().unwrap().root, "object");
    assert!(report.patterns.iter().any(|p| matches!(p, Pattern::Pagination { .. })));
    assert!(report.patterns.contains(&Pattern::LinkNext {
        url: "https://api.test/users?page=2".to_string()
    }));
    assert!(report.patterns.iter().any(|p| matches!(
        p,
        Pattern::RateLimit { remaining: Some(r), .. } if r == "41"
    )));
    assert_eq!(report.extracted.unwrap().value, Some(json!("Linus")));

    get(&tester, format!("{}/empty", server.uri())).await;
    let latest = tester.analyze_latest(None).unwrap();
    assert!(latest.anomalies.contains(&Anomaly::EmptyBody { status: 200 }));
}

#[tokio::test]
async fn test_stats() {
    let tester = in_memory_tester();

    let empty = tester.get_stats(&HistoryFilter::default());
    assert_eq!(empty.count, 0);
    assert_eq!(empty.success_rate, 0.0);
    assert_eq!(empty.timeout_rate, 0.0);
    assert!(empty.p50_duration.is_none());

    let server = MockServer::start().await;
    Mock::given(path("/ok"))
        .respond_with(ResponseTemplate::new(200).set_body_string("12345"))
        .mount(&server)
        .await;
    Mock::given(path("/fail"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    get(&tester, format!("{}/ok", server.uri())).await;
    get(&tester, format!("{}/ok", server.uri())).await;
    get(&tester, format!("{}/fail", server.uri())).await;
    get(&tester, "http://127.0.0.1:1/".to_string()).await;

    let stats = tester.get_stats(&HistoryFilter::default());
    assert_eq!(stats.count, 4);
    assert_eq!(stats.success_count, 2);
    assert_eq!(stats.success_rate, 0.5);
    assert_eq!(stats.network_error_rate, 0.25);
    assert_eq!(
        stats.error_rate_by_status_class[&api_tester::StatusClass::ServerError],
        0.25
    );
    assert_eq!(stats.total_bytes_transferred, 10);
    assert_eq!(stats.methods[&HttpMethod::GET], 4);
    assert_eq!(stats.top_domains[0].domain, "127.0.0.1");
    assert_eq!(stats.top_domains[0].count, 4);
    assert!(stats.max_duration >= stats.p90_duration);
    assert!(stats.p90_duration >= stats.p50_duration);
}

#[tokio::test]
async fn test_plan_load_test_uses_history() {
    let server = MockServer::start().await;
    Mock::given(path("/orders"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .mount(&server)
        .await;

    let tester = in_memory_tester();
    for _ in 0..6 {
        get(&tester, format!("{}/orders", server.uri())).await;
    }

    let plan = tester.plan_load_test("/orders", Some(50.0)).unwrap();
    assert_eq!(plan.baseline.samples, 6);
    assert_eq!(plan.baseline.error_rate, 0.0);
    assert_eq!(plan.stages.len(), 5);
    assert!(plan.stages.iter().all(|s| s.concurrency >= 1));
    assert!(plan.warnings.is_empty());

    assert!(tester.plan_load_test("/orders", Some(-1.0)).is_err());
    assert_eq!(tester.get_history(&HistoryFilter::default()).len(), 6);
}
