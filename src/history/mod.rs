//! Request history tracking and persistence.
//!
//! Every request that reaches the wire produces exactly one immutable
//! [`HistoryRecord`]. Records live in a bounded [`HistoryLog`] and can
//! optionally be mirrored to a JSONL file.
//!
//! # Features
//!
//! - Fixed-capacity ring with FIFO eviction
//! - Newest-first listing with method, status, time, URL and outcome filters
//! - JSONL persistence with corruption-tolerant loading
//! - Sensitive header redaction in the persisted file
//!
//! # Example
//!
//! ```
//! use api_tester::history::{HistoryFilter, HistoryLog};
//!
//! let log = HistoryLog::new(100);
//! assert!(log.list(&HistoryFilter::default()).is_empty());
//! ```

pub mod filter;
pub mod ledger;
pub mod models;
pub mod storage;

pub use filter::HistoryFilter;
pub use ledger::HistoryLog;
pub use models::{HistoryRecord, Outcome, OutcomeKind, SENSITIVE_HEADERS};
pub use storage::HistoryFile;
