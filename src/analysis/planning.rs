//! Load-test plan suggestions derived from history.
//!
//! Planning never issues traffic. It looks at the recorded latency of an
//! endpoint and proposes a staged ramp, sizing concurrency for each stage
//! with Little's law (`concurrency = rate * latency`).

use super::stats::percentile;
use crate::error::{ApiError, Result};
use crate::history::{HistoryRecord, Outcome};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Ramp fractions of the expected rate.
const RAMP_FRACTIONS: &[(f64, &str)] = &[
    (0.10, "warm-up"),
    (0.25, "ramp 25%"),
    (0.50, "ramp 50%"),
    (1.00, "target"),
    (1.50, "stress 150%"),
];

/// Rates used when the expected rate is unknown.
const DEFAULT_RATES: &[f64] = &[1.0, 5.0, 10.0, 25.0];

const STAGE_DURATION: Duration = Duration::from_secs(60);
const TARGET_STAGE_DURATION: Duration = Duration::from_secs(300);

/// Latency assumed when there is no history for the endpoint.
const FALLBACK_LATENCY: Duration = Duration::from_secs(1);

const MIN_BASELINE_SAMPLES: usize = 5;
const HIGH_ERROR_RATE: f64 = 0.05;
const SLOW_P90: Duration = Duration::from_secs(2);

/// Latency and error baseline for an endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub samples: usize,
    pub p50: Option<Duration>,
    pub p90: Option<Duration>,
    /// Share of samples that did not end in `Success`.
    pub error_rate: f64,
}

/// One step of the ramp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadStage {
    pub name: String,
    pub target_rps: f64,
    pub concurrency: u32,
    pub duration: Duration,
}

/// Suggested load test for an endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadTestPlan {
    pub endpoint: String,
    pub expected_rps: Option<f64>,
    pub baseline: Baseline,
    pub stages: Vec<LoadStage>,
    pub warnings: Vec<String>,
}

/// Builds a plan for `endpoint` from `records`.
///
/// Records match when their URL contains `endpoint`, ignoring ASCII case and
/// a trailing slash.
///
/// # Errors
///
/// `InvalidConfig` if `expected_rps` is given and is not a positive number.
pub fn plan_load_test(
    records: &[HistoryRecord],
    endpoint: &str,
    expected_rps: Option<f64>,
) -> Result<LoadTestPlan> {
    if let Some(rps) = expected_rps {
        if !rps.is_finite() || rps <= 0.0 {
            return Err(ApiError::InvalidConfig(format!(
                "expected_rps must be a positive number, got {}",
                rps
            )));
        }
    }

    let needle = endpoint.trim().trim_end_matches('/').to_lowercase();
    if needle.is_empty() {
        return Err(ApiError::InvalidConfig(
            "endpoint must not be empty".to_string(),
        ));
    }

    let matching: Vec<&HistoryRecord> = records
        .iter()
        .filter(|r| r.request.url.to_lowercase().contains(&needle))
        .collect();

    let baseline = baseline(&matching);
    let mut warnings = Vec::new();

    match baseline.samples {
        0 => warnings.push(format!(
            "No history for {}; assuming {}s latency",
            endpoint,
            FALLBACK_LATENCY.as_secs()
        )),
        n if n < MIN_BASELINE_SAMPLES => warnings.push(format!(
            "Only {} sample(s) for {}; the baseline may not be representative",
            n, endpoint
        )),
        _ => {}
    }
    if baseline.error_rate > HIGH_ERROR_RATE {
        warnings.push(format!(
            "Baseline error rate is {:.1}%; fix errors before load testing",
            baseline.error_rate * 100.0
        ));
    }
    if baseline.p90.map_or(false, |p90| p90 > SLOW_P90) {
        warnings.push("Baseline p90 latency exceeds 2s".to_string());
    }

    let latency = baseline.p90.or(baseline.p50).unwrap_or(FALLBACK_LATENCY);

    let stages = match expected_rps {
        Some(rps) => RAMP_FRACTIONS
            .iter()
            .map(|(fraction, name)| {
                let duration = if *fraction == 1.0 {
                    TARGET_STAGE_DURATION
                } else {
                    STAGE_DURATION
                };
                stage(name, rps * fraction, latency, duration)
            })
            .collect(),
        None => DEFAULT_RATES
            .iter()
            .map(|rps| stage(&format!("{} rps", rps), *rps, latency, STAGE_DURATION))
            .collect(),
    };

    Ok(LoadTestPlan {
        endpoint: endpoint.to_string(),
        expected_rps,
        baseline,
        stages,
        warnings,
    })
}

fn baseline(records: &[&HistoryRecord]) -> Baseline {
    let mut durations: Vec<Duration> = records.iter().map(|r| r.duration).collect();
    durations.sort();

    let failures = records
        .iter()
        .filter(|r| !matches!(r.outcome, Outcome::Success))
        .count();

    Baseline {
        samples: records.len(),
        p50: percentile(&durations, 50.0),
        p90: percentile(&durations, 90.0),
        error_rate: if records.is_empty() {
            0.0
        } else {
            failures as f64 / records.len() as f64
        },
    }
}

fn stage(name: &str, rps: f64, latency: Duration, duration: Duration) -> LoadStage {
    let concurrency = (rps * latency.as_secs_f64()).ceil().max(1.0) as u32;
    LoadStage {
        name: name.to_string(),
        target_rps: rps,
        concurrency,
        duration,
    }
}
