//! Reopening a persisted tester and moving snapshots between testers.

use super::{in_memory_tester, persistent_settings, tester_with};
use api_tester::{
    ApiTesterConfig, Environment, HistoryFilter, HistoryRecord, HttpMethod, Outcome,
    RequestConfig, RequestOverrides, Snapshot,
};
use chrono::{Duration as ChronoDuration, Utc};
use std::fs;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_state_survives_reopen() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).insert_header("Set-Cookie", "session=abc"))
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let settings = persistent_settings(temp_dir.path());

    let record_id = {
        let tester = tester_with(settings.clone());
        tester
            .save_request(
                "ping",
                RequestConfig::new(HttpMethod::GET, "/ping").with_description("Health check"),
            )
            .unwrap();
        tester
            .register_environment(
                Environment::new("mock").with_base_url(&server.uri()).unwrap(),
                false,
            )
            .unwrap();
        tester.set_environment("mock").unwrap();

        let overrides = RequestOverrides {
            headers: [("Authorization".to_string(), "Bearer top-secret".to_string())]
                .into_iter()
                .collect(),
            ..RequestOverrides::default()
        };
        let record = tester.execute_saved_request("ping", &overrides).await.unwrap();
        assert_eq!(record.outcome, Outcome::Success);
        record.id
    };

    let reopened = tester_with(settings.clone());
    assert_eq!(reopened.list_requests(), vec!["ping".to_string()]);
    assert_eq!(
        reopened.load_request("ping").unwrap().description.as_deref(),
        Some("Health check")
    );
    assert_eq!(reopened.list_environments(), vec!["mock".to_string()]);
    assert_eq!(reopened.active_environment().unwrap().name, "mock");

    let restored = reopened.get_history_record(&record_id).unwrap();
    assert_eq!(restored.request.headers["Authorization"], "[REDACTED]");
    assert_eq!(restored.response.unwrap().headers["set-cookie"], "[REDACTED]");

    let raw = fs::read_to_string(&settings.history_file_path).unwrap();
    assert!(!raw.contains("top-secret"));
    assert_eq!(raw.lines().count(), 1);
}

#[test]
fn test_saved_requests_file_is_pretty_json_map() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let settings = persistent_settings(temp_dir.path());
    let tester = tester_with(settings.clone());

    tester
        .save_request("users", RequestConfig::new(HttpMethod::GET, "https://a.test/users"))
        .unwrap();

    let raw = fs::read_to_string(&settings.requests_file_path).unwrap();
    let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(value["users"]["config"]["url"], "https://a.test/users");
    assert!(raw.contains('\n'));

    tester.delete_request("users").unwrap();
    let reopened = tester_with(settings);
    assert!(reopened.list_requests().is_empty());
}

#[test]
fn test_corrupt_history_lines_are_skipped() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let settings = persistent_settings(temp_dir.path());

    let good = HistoryRecord::new(
        RequestConfig::new(HttpMethod::GET, "https://a.test/"),
        None,
        Duration::from_millis(5),
        Outcome::Timeout,
    );
    let content = format!(
        "{}\nnot json at all\n{{\"id\": 1}}\n",
        serde_json::to_string(&good).unwrap()
    );
    fs::write(&settings.history_file_path, content).unwrap();

    let tester = tester_with(settings);
    let history = tester.get_history(&HistoryFilter::default());
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, good.id);
}

#[test]
fn test_invalid_persisted_environments_rejected() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let settings = persistent_settings(temp_dir.path());
    fs::write(&settings.environments_file_path, "{ not json").unwrap();

    assert!(api_tester::ApiTester::new(settings).is_err());
}

fn record_at(minutes_ago: i64) -> HistoryRecord {
    let mut record = HistoryRecord::new(
        RequestConfig::new(HttpMethod::GET, format!("https://a.test/{}", minutes_ago)),
        None,
        Duration::from_millis(1),
        Outcome::Timeout,
    );
    record.timestamp = Utc::now() - ChronoDuration::minutes(minutes_ago);
    record
}

#[test]
fn test_import_keeps_newest_within_capacity() {
    let tester = tester_with(ApiTesterConfig {
        max_history: 5,
        ..ApiTesterConfig::in_memory()
    });

    let records: Vec<HistoryRecord> = (0..8).rev().map(record_at).collect();
    let newest_ids: Vec<_> = records[3..].iter().map(|r| r.id).collect();

    let snapshot = Snapshot {
        version: 1,
        exported_at: Utc::now(),
        requests: Default::default(),
        history: records.clone(),
    };
    let summary = tester.import_snapshot(snapshot).unwrap();
    assert_eq!(summary.history, 5);

    let kept: Vec<_> = tester
        .get_history(&HistoryFilter::new().oldest_first())
        .iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(kept, newest_ids);

    // Importing the same records again adds nothing.
    let again = Snapshot {
        version: 1,
        exported_at: Utc::now(),
        requests: Default::default(),
        history: records,
    };
    assert_eq!(tester.import_snapshot(again).unwrap().history, 0);
    assert_eq!(tester.get_history(&HistoryFilter::default()).len(), 5);
}

#[test]
fn test_export_import_between_testers() {
    let source = in_memory_tester();
    source
        .save_request("a", RequestConfig::new(HttpMethod::GET, "https://a.test/"))
        .unwrap();
    source
        .import_snapshot(Snapshot {
            version: 1,
            exported_at: Utc::now(),
            requests: Default::default(),
            history: vec![record_at(2), record_at(1)],
        })
        .unwrap();

    let exported = source.export_snapshot();
    assert_eq!(exported.history.len(), 2);
    assert!(exported.history[0].timestamp <= exported.history[1].timestamp);

    let json = serde_json::to_string_pretty(&exported).unwrap();
    let target = in_memory_tester();
    let summary = target
        .import_snapshot(serde_json::from_str(&json).unwrap())
        .unwrap();

    assert_eq!(summary.requests, 1);
    assert_eq!(summary.history, 2);
    assert_eq!(target.load_request("a").unwrap().url, "https://a.test/");
}
