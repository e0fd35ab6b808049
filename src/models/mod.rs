//! Data models for HTTP requests and responses.
//!
//! This module contains the core data structures used throughout the crate for
//! representing request configurations, per-call overrides and captured responses.

pub mod request;
pub mod response;

pub use request::{
    find_header, set_header, HttpMethod, RequestBody, RequestConfig, RequestOverrides,
};
pub use response::{ResponseSnapshot, StatusClass};
