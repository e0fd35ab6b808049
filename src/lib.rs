//! HTTP API testing engine
//!
//! This crate executes HTTP requests on behalf of an assistant or tool, keeps
//! an audit trail of every execution, and analyzes the recorded responses.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - **config**: Settings loaded from JSON, with defaults and validation
//! - **models**: Request configurations, overrides and captured responses
//! - **auth**: Authentication specs and header injection
//! - **environment**: Named request defaults with one active environment
//! - **store**: Named saved requests with optional file persistence
//! - **executor**: Merges defaults, sends requests with reqwest, records results
//! - **history**: Bounded, optionally persisted log of executions
//! - **analysis**: Comparison, inspection, statistics and load-test planning
//! - **tester**: The [`ApiTester`] facade over all of the above
//!
//! # Execution flow
//!
//! [`ApiTester::execute_request`] does the following:
//! 1. Merges overrides, the request, the active environment and engine defaults
//! 2. Resolves the URL against the environment base URL and checks the domain policy
//! 3. Injects auth headers, rejecting contradictory explicit headers
//! 4. Sends the request with the resolved timeout and captures the response
//! 5. Appends a [`HistoryRecord`] with the outcome and returns it
//!
//! Transport failures are outcomes on the record, not errors. Validation
//! failures are errors and leave no record.
//!
//! # Example
//!
//! ```no_run
//! use api_tester::{ApiTester, HttpMethod, RequestConfig, RequestOverrides};
//!
//! # async fn run() -> api_tester::Result<()> {
//! let tester = ApiTester::in_memory()?;
//! let record = tester
//!     .execute_request(
//!         &RequestConfig::new(HttpMethod::GET, "https://httpbin.org/get"),
//!         &RequestOverrides::default(),
//!     )
//!     .await?;
//! println!("{} in {:?}", record.outcome, record.duration);
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod auth;
pub mod config;
pub mod environment;
pub mod error;
pub mod executor;
pub mod history;
pub mod models;
mod persistence;
pub mod store;
pub mod tester;

pub use analysis::{AnalysisEngine, AnalysisReport, ComparisonReport, LoadTestPlan, StatsReport};
pub use auth::AuthSpec;
pub use config::{load_config, ApiTesterConfig};
pub use environment::{Environment, EnvironmentRegistry};
pub use error::{ApiError, EntityKind, Result};
pub use executor::Executor;
pub use history::{HistoryFilter, HistoryLog, HistoryRecord, Outcome, OutcomeKind};
pub use models::{
    HttpMethod, RequestBody, RequestConfig, RequestOverrides, ResponseSnapshot, StatusClass,
};
pub use store::{RequestStore, RequestSummary, SavedRequest};
pub use tester::{ApiTester, ImportSummary, Snapshot};
