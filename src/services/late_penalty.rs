use time::OffsetDateTime;

use crate::core::config::Settings;
use crate::schemas::types::GradingMode;
use crate::services::evaluator::points_ceiling;

const MINUTES_PER_DAY: i64 = 24 * 60;

/// Per-stage late policy: `k` percent per started day after the soft
/// deadline, capped at `m` percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct LatePolicy {
    pub(crate) percent_per_day: f64,
    pub(crate) max_percent: f64,
    pub(crate) allow_after_hard: bool,
}

impl LatePolicy {
    pub(crate) fn from_settings(settings: &Settings) -> Self {
        let penalty = settings.penalty();
        Self {
            percent_per_day: penalty.percent_per_day,
            max_percent: penalty.max_percent,
            allow_after_hard: penalty.allow_after_hard,
        }
    }
}

pub(crate) fn penalty_percent(
    policy: LatePolicy,
    soft: Option<OffsetDateTime>,
    hard: Option<OffsetDateTime>,
    submitted_at: OffsetDateTime,
) -> f64 {
    let Some(soft) = soft else {
        return 0.0;
    };
    if submitted_at <= soft {
        return 0.0;
    }

    let mut effective = submitted_at;
    if let Some(hard) = hard {
        if submitted_at > hard {
            if !policy.allow_after_hard {
                return 100.0;
            }
            effective = hard;
        }
    }

    let late_minutes = (effective - soft).whole_minutes();
    let started_days = (late_minutes + MINUTES_PER_DAY - 1) / MINUTES_PER_DAY;
    (started_days as f64 * policy.percent_per_day).min(policy.max_percent)
}

pub(crate) fn apply_penalty(brutto: f64, percent: f64) -> f64 {
    if brutto.is_nan() {
        return 0.0;
    }
    let factor = (1.0 - percent / 100.0).max(0.0);
    brutto * factor
}

pub(crate) fn cap_by_mode(value: f64, mode: GradingMode, max_points: Option<f64>) -> f64 {
    value.min(points_ceiling(mode, max_points)).max(0.0)
}

/// Netto points a grade would carry if the penalty were applied.
pub(crate) fn netto_preview(
    brutto: f64,
    penalty_percent: f64,
    mode: GradingMode,
    max_points: Option<f64>,
) -> f64 {
    cap_by_mode(apply_penalty(brutto, penalty_percent), mode, max_points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;
    use time::Duration;

    const SOFT: OffsetDateTime = datetime!(2024-01-01 00:00:00 UTC);

    fn policy(percent_per_day: f64, max_percent: f64) -> LatePolicy {
        LatePolicy { percent_per_day, max_percent, allow_after_hard: false }
    }

    #[test]
    fn no_penalty_before_soft_or_without_soft() {
        let early = SOFT - Duration::hours(2);
        assert_eq!(penalty_percent(policy(10.0, 50.0), Some(SOFT), None, early), 0.0);
        assert_eq!(penalty_percent(policy(10.0, 50.0), Some(SOFT), None, SOFT), 0.0);
        assert_eq!(penalty_percent(policy(10.0, 50.0), None, None, early), 0.0);
    }

    #[test]
    fn penalty_accumulates_per_started_day() {
        let submitted = SOFT + Duration::hours(25);
        assert_eq!(penalty_percent(policy(5.0, 50.0), Some(SOFT), None, submitted), 10.0);
    }

    #[test]
    fn penalty_is_capped() {
        let submitted = SOFT + Duration::days(10);
        assert_eq!(penalty_percent(policy(15.0, 20.0), Some(SOFT), None, submitted), 20.0);
    }

    #[test]
    fn after_hard_without_allowance_is_full_penalty() {
        let hard = SOFT + Duration::days(2);
        let submitted = hard + Duration::hours(1);
        assert_eq!(penalty_percent(policy(10.0, 50.0), Some(SOFT), Some(hard), submitted), 100.0);
    }

    #[test]
    fn after_hard_with_allowance_counts_until_hard() {
        let hard = SOFT + Duration::days(2);
        let submitted = hard + Duration::days(5);
        let lenient = LatePolicy { allow_after_hard: true, ..policy(10.0, 90.0) };
        assert_eq!(penalty_percent(lenient, Some(SOFT), Some(hard), submitted), 20.0);
    }

    #[test]
    fn apply_penalty_reduces_points() {
        assert_eq!(apply_penalty(80.0, 25.0), 60.0);
        assert_eq!(apply_penalty(80.0, 150.0), 0.0);
        assert_eq!(apply_penalty(f64::NAN, 10.0), 0.0);
    }

    #[test]
    fn netto_preview_is_capped_by_mode() {
        assert_eq!(netto_preview(12.0, 0.0, GradingMode::Points10, Some(10.0)), 10.0);
        assert_eq!(netto_preview(120.0, 50.0, GradingMode::Percent, None), 60.0);
        assert_eq!(cap_by_mode(-3.0, GradingMode::Percent, None), 0.0);
    }
}
