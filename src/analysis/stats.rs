//! Aggregate statistics over history records.
//!
//! Everything is computed on demand from the records passed in. Rates are
//! exact fractions of `count`; with no records every rate is `0.0` and every
//! duration is `None`.

use crate::history::{HistoryRecord, Outcome};
use crate::models::{HttpMethod, StatusClass};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Number of domains listed in [`StatsReport::top_domains`].
pub const TOP_DOMAINS: usize = 5;

/// Request count for one host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainCount {
    pub domain: String,
    pub count: usize,
}

/// Aggregate statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsReport {
    pub count: usize,
    pub success_count: usize,
    pub success_rate: f64,
    /// Share of records per non-2xx status class. Every such class is listed.
    pub error_rate_by_status_class: BTreeMap<StatusClass, f64>,
    pub network_error_rate: f64,
    pub timeout_rate: f64,
    pub p50_duration: Option<Duration>,
    pub p90_duration: Option<Duration>,
    pub max_duration: Option<Duration>,
    /// Request body bytes sent plus response body bytes received.
    pub total_bytes_transferred: u64,
    pub methods: BTreeMap<HttpMethod, usize>,
    pub top_domains: Vec<DomainCount>,
}

/// Computes statistics over `records`.
pub fn compute_stats(records: &[HistoryRecord]) -> StatsReport {
    let count = records.len();
    let rate = |k: usize| if count == 0 { 0.0 } else { k as f64 / count as f64 };

    let mut success_count = 0;
    let mut network_errors = 0;
    let mut timeouts = 0;
    let mut by_class: BTreeMap<StatusClass, usize> = [
        StatusClass::Informational,
        StatusClass::Redirection,
        StatusClass::ClientError,
        StatusClass::ServerError,
    ]
    .into_iter()
    .map(|class| (class, 0))
    .collect();
    let mut methods = BTreeMap::new();
    let mut domains: BTreeMap<String, usize> = BTreeMap::new();
    let mut total_bytes: u64 = 0;

    for record in records {
        match &record.outcome {
            Outcome::Success => success_count += 1,
            Outcome::NetworkError { .. } => network_errors += 1,
            Outcome::Timeout => timeouts += 1,
            Outcome::HttpError { .. } => {}
        }

        if let Some(class) = record.status_class() {
            if let Some(n) = by_class.get_mut(&class) {
                *n += 1;
            }
        }

        *methods.entry(record.request.method).or_insert(0) += 1;

        if let Some(host) = record.host() {
            *domains.entry(host).or_insert(0) += 1;
        }

        let sent = record.request.body.as_ref().map_or(0, |b| b.len());
        total_bytes += (sent + record.response_size()) as u64;
    }

    let mut durations: Vec<Duration> = records.iter().map(|r| r.duration).collect();
    durations.sort();

    let mut top_domains: Vec<DomainCount> = domains
        .into_iter()
        .map(|(domain, count)| DomainCount { domain, count })
        .collect();
    top_domains.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.domain.cmp(&b.domain)));
    top_domains.truncate(TOP_DOMAINS);

    StatsReport {
        count,
        success_count,
        success_rate: rate(success_count),
        error_rate_by_status_class: by_class
            .into_iter()
            .map(|(class, n)| (class, rate(n)))
            .collect(),
        network_error_rate: rate(network_errors),
        timeout_rate: rate(timeouts),
        p50_duration: percentile(&durations, 50.0),
        p90_duration: percentile(&durations, 90.0),
        max_duration: durations.last().copied(),
        total_bytes_transferred: total_bytes,
        methods,
        top_domains,
    }
}

/// Nearest-rank percentile of an ascending slice.
///
/// # Examples
///
/// ```
/// use api_tester::analysis::stats::percentile;
/// use std::time::Duration;
///
/// let sorted: Vec<Duration> = (1..=10).map(Duration::from_millis).collect();
/// assert_eq!(percentile(&sorted, 90.0), Some(Duration::from_millis(9)));
/// assert_eq!(percentile(&[], 50.0), None);
/// ```
pub fn percentile(sorted: &[Duration], p: f64) -> Option<Duration> {
    if sorted.is_empty() {
        return None;
    }
    let rank = ((p / 100.0) * sorted.len() as f64).ceil() as usize;
    let index = rank.clamp(1, sorted.len()) - 1;
    Some(sorted[index])
}

/// Median of an unsorted list, using the nearest-rank method.
pub fn median(durations: &[Duration]) -> Option<Duration> {
    let mut sorted = durations.to_vec();
    sorted.sort();
    percentile(&sorted, 50.0)
}
