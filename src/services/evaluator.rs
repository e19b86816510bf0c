//! Derived judgments shown next to tasks, revisions and grades.
//!
//! Everything here is pure and synchronous. Results are display hints and
//! request gates; the grade of record is always what the teacher entered.

use time::OffsetDateTime;

use crate::schemas::types::{GradingMode, RevisionStatus};

/// Sentinel rendered in place of absent points.
pub const NO_POINTS: &str = "brak";

const DEFAULT_MAX_POINTS: f64 = 10.0;
const PERCENT_CEILING: f64 = 100.0;

/// Anything carrying the moment it was submitted.
pub trait Submitted {
    fn submitted_at(&self) -> Option<OffsetDateTime>;
}

impl Submitted for OffsetDateTime {
    fn submitted_at(&self) -> Option<OffsetDateTime> {
        Some(*self)
    }
}

/// Earliest submission in a history, regardless of the order it came in.
///
/// Lateness is always measured from this point, so resubmissions after a
/// `NEEDS_FIX` never add lateness of their own.
pub fn first_submission_at<T: Submitted>(history: &[T]) -> Option<OffsetDateTime> {
    history.iter().filter_map(Submitted::submitted_at).min()
}

/// Position of a submission between the soft and the hard deadline, in percent.
///
/// `None` when a timestamp is missing or the deadlines do not form a window.
pub fn lateness_percent(
    soft: Option<OffsetDateTime>,
    hard: Option<OffsetDateTime>,
    submitted_at: Option<OffsetDateTime>,
) -> Option<u8> {
    let (soft, hard, submitted_at) = (soft?, hard?, submitted_at?);
    if hard <= soft {
        return None;
    }
    if submitted_at <= soft {
        return Some(0);
    }
    if submitted_at >= hard {
        return Some(100);
    }

    let window = (hard - soft).whole_milliseconds() as f64;
    let late = (submitted_at - soft).whole_milliseconds() as f64;
    let ratio = (100.0 * late / window).round().clamp(0.0, 100.0);
    Some(ratio as u8)
}

/// Highest value a grade can take in the given mode.
pub fn points_ceiling(mode: GradingMode, max_points: Option<f64>) -> f64 {
    match mode {
        GradingMode::Points10 => {
            max_points.filter(|max| max.is_finite() && *max > 0.0).unwrap_or(DEFAULT_MAX_POINTS)
        }
        GradingMode::Percent => PERCENT_CEILING,
    }
}

/// `None` when the task has no threshold; otherwise whether `points` reach it.
///
/// Points are read in the unit of `mode` and bounded by its ceiling.
pub fn meets_pass_threshold(
    points: f64,
    threshold: Option<f64>,
    mode: GradingMode,
    max_points: Option<f64>,
) -> Option<bool> {
    let threshold = threshold?;
    let bounded = points.min(points_ceiling(mode, max_points));
    Some(bounded >= threshold)
}

pub fn format_points(value: Option<f64>, mode: GradingMode, max_points: Option<f64>) -> String {
    let Some(value) = value else {
        return NO_POINTS.to_string();
    };

    match mode {
        GradingMode::Points10 => format!(
            "{}/{}",
            format_number(value),
            format_number(max_points.unwrap_or(DEFAULT_MAX_POINTS))
        ),
        GradingMode::Percent => format!("{}%", format_number(value)),
    }
}

fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

/// A new revision may be uploaded before the first one and after `NEEDS_FIX`.
pub fn can_resubmit(latest: Option<RevisionStatus>) -> bool {
    matches!(latest, None | Some(RevisionStatus::NeedsFix))
}

/// A grade may be written for an existing revision that is not waiting on the student.
///
/// A revision without a reported status is treated as freshly submitted.
pub fn can_grade(last_revision_id: Option<i64>, status: Option<RevisionStatus>) -> bool {
    if last_revision_id.is_none() {
        return false;
    }

    matches!(
        status.unwrap_or(RevisionStatus::Submitted),
        RevisionStatus::Submitted | RevisionStatus::Accepted | RevisionStatus::Rejected
    )
}

pub fn status_transition_allowed(current: RevisionStatus, target: RevisionStatus) -> bool {
    use RevisionStatus::*;

    if current == target {
        return true;
    }

    matches!(
        (current, target),
        (Submitted, NeedsFix | Accepted | Rejected)
            | (Accepted | Rejected, NeedsFix)
            | (NeedsFix, Submitted)
    )
}

pub fn status_label(status: Option<RevisionStatus>) -> &'static str {
    match status {
        None => "Nie oddano",
        Some(RevisionStatus::Submitted) => "Złożone (oczekuje)",
        Some(RevisionStatus::NeedsFix) => "Do poprawy",
        Some(RevisionStatus::Accepted) => "Zakończone",
        Some(RevisionStatus::Rejected) => "Odrzucone",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatenessBadge {
    NotSubmitted,
    OnTime,
    Late { percent: u8 },
    NotApplicable,
}

impl LatenessBadge {
    pub fn evaluate(last_submitted_at: Option<OffsetDateTime>, lateness: Option<u8>) -> Self {
        if last_submitted_at.is_none() {
            return Self::NotSubmitted;
        }

        match lateness {
            None => Self::NotApplicable,
            Some(0) => Self::OnTime,
            Some(percent) => Self::Late { percent },
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Self::NotSubmitted => "not_submitted",
            Self::OnTime => "on_time",
            Self::Late { .. } => "late",
            Self::NotApplicable => "not_applicable",
        }
    }

    pub fn label(self) -> String {
        match self {
            Self::NotSubmitted => "Praca nie oddana".to_string(),
            Self::OnTime => "Oddano w terminie".to_string(),
            Self::Late { percent } => {
                format!("Oddano po terminie ({percent}% między preferowanym a ostatecznym)")
            }
            Self::NotApplicable => "Brak terminów do oceny spóźnienia".to_string(),
        }
    }
}

/// Accepting below the threshold needs an explicit confirmation.
pub fn below_pass_warning(points: f64, status_after_grade: RevisionStatus, threshold: Option<f64>) -> bool {
    match (status_after_grade, threshold) {
        (RevisionStatus::Accepted, Some(threshold)) => points < threshold,
        _ => false,
    }
}

/// The "Etap" shown to users: how many revisions exist so far, at least one.
pub fn stage_ordinal(revision_count: usize) -> usize {
    revision_count.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;
    use time::Duration;

    const T: OffsetDateTime = datetime!(2024-01-01 00:00:00 UTC);

    fn at(seconds: i64) -> Option<OffsetDateTime> {
        Some(T + Duration::seconds(seconds))
    }

    #[test]
    fn lateness_bounds_and_midpoint() {
        assert_eq!(lateness_percent(at(0), at(10), at(0)), Some(0));
        assert_eq!(lateness_percent(at(0), at(10), at(10)), Some(100));
        assert_eq!(lateness_percent(at(0), at(10), at(5)), Some(50));
        assert_eq!(lateness_percent(at(0), at(10), at(-3)), Some(0));
        assert_eq!(lateness_percent(at(0), at(10), at(30)), Some(100));
    }

    #[test]
    fn lateness_rounds_to_nearest_percent() {
        assert_eq!(lateness_percent(at(0), at(3), at(1)), Some(33));
        assert_eq!(lateness_percent(at(0), at(3), at(2)), Some(67));
    }

    #[test]
    fn lateness_is_undefined_without_a_window() {
        assert_eq!(lateness_percent(None, at(10), at(5)), None);
        assert_eq!(lateness_percent(at(0), None, at(5)), None);
        assert_eq!(lateness_percent(at(0), at(10), None), None);
        assert_eq!(lateness_percent(at(10), at(10), at(5)), None);
        assert_eq!(lateness_percent(at(10), at(0), at(20)), None);
    }

    #[test]
    fn lateness_is_monotonic_in_submission_time() {
        let mut previous = 0;
        for second in -5..=3_700 {
            let current =
                lateness_percent(at(0), at(3_600), at(second)).expect("window is valid");
            assert!(current >= previous, "dropped at {second}s");
            previous = current;
        }
    }

    #[test]
    fn first_submission_ignores_input_order() {
        let history = [T + Duration::seconds(5), T, T + Duration::seconds(9)];
        assert_eq!(first_submission_at(&history), Some(T));

        let empty: [OffsetDateTime; 0] = [];
        assert_eq!(first_submission_at(&empty), None);
    }

    #[test]
    fn pass_threshold_judgment() {
        assert_eq!(meets_pass_threshold(60.0, Some(60.0), GradingMode::Percent, None), Some(true));
        assert_eq!(meets_pass_threshold(59.0, Some(60.0), GradingMode::Percent, None), Some(false));
        assert_eq!(meets_pass_threshold(90.0, None, GradingMode::Percent, None), None);
        assert_eq!(meets_pass_threshold(3.0, None, GradingMode::Points10, Some(10.0)), None);
    }

    #[test]
    fn pass_threshold_bounds_points_by_mode_ceiling() {
        assert_eq!(
            meets_pass_threshold(12.0, Some(11.0), GradingMode::Points10, Some(10.0)),
            Some(false)
        );
        assert_eq!(meets_pass_threshold(6.0, Some(6.0), GradingMode::Points10, None), Some(true));
    }

    #[test]
    fn points_formatting() {
        assert_eq!(format_points(None, GradingMode::Percent, None), NO_POINTS);
        assert_eq!(format_points(None, GradingMode::Points10, Some(10.0)), NO_POINTS);
        assert_eq!(format_points(Some(7.0), GradingMode::Points10, Some(10.0)), "7/10");
        assert_eq!(format_points(Some(7.5), GradingMode::Points10, None), "7.5/10");
        assert_eq!(format_points(Some(85.0), GradingMode::Percent, None), "85%");
    }

    #[test]
    fn resubmission_gate() {
        assert!(can_resubmit(None));
        assert!(can_resubmit(Some(RevisionStatus::NeedsFix)));
        assert!(!can_resubmit(Some(RevisionStatus::Submitted)));
        assert!(!can_resubmit(Some(RevisionStatus::Accepted)));
        assert!(!can_resubmit(Some(RevisionStatus::Rejected)));
    }

    #[test]
    fn grading_gate() {
        assert!(!can_grade(None, Some(RevisionStatus::Submitted)));
        assert!(can_grade(Some(1), Some(RevisionStatus::Submitted)));
        assert!(can_grade(Some(1), None));
        assert!(can_grade(Some(1), Some(RevisionStatus::Accepted)));
        assert!(can_grade(Some(1), Some(RevisionStatus::Rejected)));
        assert!(!can_grade(Some(1), Some(RevisionStatus::NeedsFix)));
    }

    #[test]
    fn status_transitions() {
        use RevisionStatus::*;

        assert!(status_transition_allowed(Submitted, Accepted));
        assert!(status_transition_allowed(Submitted, NeedsFix));
        assert!(status_transition_allowed(Accepted, NeedsFix));
        assert!(status_transition_allowed(Accepted, Accepted));
        assert!(status_transition_allowed(NeedsFix, Submitted));
        assert!(!status_transition_allowed(Accepted, Rejected));
        assert!(!status_transition_allowed(NeedsFix, Accepted));
        assert!(!status_transition_allowed(Rejected, Submitted));
    }

    #[test]
    fn badge_selection() {
        assert_eq!(LatenessBadge::evaluate(None, Some(40)), LatenessBadge::NotSubmitted);
        assert_eq!(LatenessBadge::evaluate(at(0), Some(0)), LatenessBadge::OnTime);
        assert_eq!(LatenessBadge::evaluate(at(0), Some(40)), LatenessBadge::Late { percent: 40 });
        assert_eq!(LatenessBadge::evaluate(at(0), None), LatenessBadge::NotApplicable);
        assert!(LatenessBadge::Late { percent: 40 }.label().contains("40%"));
    }

    #[test]
    fn below_pass_warning_only_for_acceptance() {
        assert!(below_pass_warning(40.0, RevisionStatus::Accepted, Some(50.0)));
        assert!(!below_pass_warning(50.0, RevisionStatus::Accepted, Some(50.0)));
        assert!(!below_pass_warning(40.0, RevisionStatus::NeedsFix, Some(50.0)));
        assert!(!below_pass_warning(40.0, RevisionStatus::Accepted, None));
    }

    #[test]
    fn ceiling_and_stage() {
        assert_eq!(points_ceiling(GradingMode::Percent, Some(10.0)), 100.0);
        assert_eq!(points_ceiling(GradingMode::Points10, None), 10.0);
        assert_eq!(points_ceiling(GradingMode::Points10, Some(0.0)), 10.0);
        assert_eq!(points_ceiling(GradingMode::Points10, Some(20.0)), 20.0);
        assert_eq!(stage_ordinal(0), 1);
        assert_eq!(stage_ordinal(3), 3);
    }
}
