use serde::Serialize;

use crate::schemas::backend::{StatsRow, StudentTaskView};
use crate::schemas::types::GradingMode;
use crate::services::evaluator::{meets_pass_threshold, points_ceiling};

pub(crate) const SINGLE_TASKS_LABEL: &str = "Zadania pojedyncze";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct SessionSummary {
    pub(crate) session_name: String,
    pub(crate) mode: GradingMode,
    /// Sum of netto points for `POINTS10`, average percent for `PERCENT`.
    pub(crate) total: f64,
    pub(crate) max: f64,
    pub(crate) percent: u32,
    pub(crate) task_count: usize,
    pub(crate) passed_count: usize,
    pub(crate) pass_threshold: Option<f64>,
    pub(crate) max_points: Option<f64>,
}

/// Groups overview items by session, in order of first appearance.
///
/// A bucket takes its mode from its first task. Ungraded tasks count as zero.
pub(crate) fn summarize(items: &[StudentTaskView]) -> Vec<SessionSummary> {
    let mut buckets: Vec<SessionSummary> = Vec::new();

    for item in items {
        let name = item
            .session_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())
            .unwrap_or(SINGLE_TASKS_LABEL);

        let index = match buckets.iter().position(|bucket| bucket.session_name == name) {
            Some(index) => index,
            None => {
                buckets.push(SessionSummary {
                    session_name: name.to_string(),
                    mode: item.mode(),
                    total: 0.0,
                    max: 0.0,
                    percent: 0,
                    task_count: 0,
                    passed_count: 0,
                    pass_threshold: item.pass_threshold,
                    max_points: item.max_points,
                });
                buckets.len() - 1
            }
        };
        let bucket = &mut buckets[index];

        let mode = item.mode();
        let value = item.last_points_netto.unwrap_or(0.0);
        match mode {
            GradingMode::Points10 => {
                bucket.total += value;
                bucket.max += points_ceiling(mode, item.max_points);
            }
            GradingMode::Percent => bucket.total += value.min(100.0),
        }
        bucket.task_count += 1;

        if meets_pass_threshold(value, item.pass_threshold, mode, item.max_points) == Some(true) {
            bucket.passed_count += 1;
        }
        if let Some(threshold) = item.pass_threshold {
            bucket.pass_threshold =
                Some(bucket.pass_threshold.map_or(threshold, |current| current.max(threshold)));
        }
        if bucket.max_points.is_none() {
            bucket.max_points = item.max_points;
        }
    }

    for bucket in &mut buckets {
        match bucket.mode {
            GradingMode::Points10 => {
                bucket.percent = if bucket.max > 0.0 {
                    (bucket.total / bucket.max * 100.0).round() as u32
                } else {
                    0
                };
            }
            GradingMode::Percent => {
                let average = if bucket.task_count > 0 {
                    bucket.total / bucket.task_count as f64
                } else {
                    0.0
                };
                bucket.total = average;
                bucket.max = 100.0;
                bucket.percent = average.round() as u32;
            }
        }
    }

    buckets
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub(crate) struct StatsTotals {
    pub(crate) passed: u64,
    pub(crate) failed: u64,
    pub(crate) pending: u64,
    pub(crate) pct_passed: u32,
    pub(crate) pct_failed: u32,
    pub(crate) pct_pending: u32,
}

pub(crate) fn stats_totals(rows: &[StatsRow]) -> StatsTotals {
    let (passed, failed, pending) = rows.iter().fold((0u64, 0u64, 0u64), |acc, row| {
        (acc.0 + row.passed, acc.1 + row.failed, acc.2 + row.pending)
    });
    let sum = (passed + failed + pending).max(1) as f64;
    let pct = |value: u64| (value as f64 / sum * 100.0).round() as u32;

    StatsTotals {
        passed,
        failed,
        pending,
        pct_passed: pct(passed),
        pct_failed: pct(failed),
        pct_pending: pct(pending),
    }
}
