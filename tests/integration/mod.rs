//! Integration tests module for the API tester
//!
//! Shared helpers: logging setup, tester construction and mock server
//! shortcuts used by the test files in this directory.

pub mod analysis_test;
pub mod execution_test;
pub mod history_test;
pub mod persistence_test;

use api_tester::{ApiTester, ApiTesterConfig};
use std::path::Path;
use std::sync::Once;

static INIT: Once = Once::new();

/// Initialize test environment (run once)
pub fn init_test_env() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// A tester with default settings and no disk persistence.
pub fn in_memory_tester() -> ApiTester {
    tester_with(ApiTesterConfig::in_memory())
}

/// A tester built from `settings`.
pub fn tester_with(settings: ApiTesterConfig) -> ApiTester {
    init_test_env();
    ApiTester::new(settings).expect("Failed to create tester")
}

/// Settings persisting everything under `dir`.
pub fn persistent_settings(dir: &Path) -> ApiTesterConfig {
    ApiTesterConfig {
        save_requests_to_file: true,
        requests_file_path: dir.join("saved_requests.json").display().to_string(),
        environments_file_path: dir.join("environments.json").display().to_string(),
        persist_history: true,
        history_file_path: dir.join("request_history.jsonl").display().to_string(),
        ..ApiTesterConfig::default()
    }
}
