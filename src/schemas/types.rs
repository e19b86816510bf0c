use serde::{Deserialize, Serialize};

/// Lifecycle of one submission attempt, as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RevisionStatus {
    Submitted,
    NeedsFix,
    Accepted,
    Rejected,
}

impl RevisionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Submitted => "SUBMITTED",
            Self::NeedsFix => "NEEDS_FIX",
            Self::Accepted => "ACCEPTED",
            Self::Rejected => "REJECTED",
        }
    }
}

/// Unknown modes fall back to `Percent`, the backend default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GradingMode {
    Points10,
    #[default]
    #[serde(other)]
    Percent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub(crate) enum UserRole {
    Teacher,
    Student,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ExportKind {
    CsvDetailed,
    CsvAggregated,
    Archive,
}

impl ExportKind {
    pub(crate) fn parse(value: &str) -> Option<Self> {
        match value {
            "csv-detailed" => Some(Self::CsvDetailed),
            "csv-aggregated" => Some(Self::CsvAggregated),
            "archive" => Some(Self::Archive),
            _ => None,
        }
    }

    pub(crate) fn default_filename(self, course_id: i64) -> String {
        match self {
            Self::CsvDetailed => format!("course-{course_id}-detailed.csv"),
            Self::CsvAggregated => format!("course-{course_id}-aggregated.csv"),
            Self::Archive => format!("course-{course_id}-archive.zip"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grading_mode_parses_known_and_unknown_values() {
        let points: GradingMode = serde_json::from_str("\"POINTS10\"").expect("points");
        let percent: GradingMode = serde_json::from_str("\"PERCENT\"").expect("percent");
        let other: GradingMode = serde_json::from_str("\"LETTER\"").expect("other");

        assert_eq!(points, GradingMode::Points10);
        assert_eq!(percent, GradingMode::Percent);
        assert_eq!(other, GradingMode::Percent);
        assert_eq!(GradingMode::default(), GradingMode::Percent);
        assert_eq!(serde_json::to_string(&GradingMode::Points10).expect("json"), "\"POINTS10\"");
    }

    #[test]
    fn revision_status_uses_backend_spelling() {
        let status: RevisionStatus = serde_json::from_str("\"NEEDS_FIX\"").expect("status");
        assert_eq!(status, RevisionStatus::NeedsFix);
        assert_eq!(serde_json::to_string(&status).expect("json"), "\"NEEDS_FIX\"");
        assert_eq!(status.as_str(), "NEEDS_FIX");
    }

    #[test]
    fn export_kind_parses_path_segments() {
        assert_eq!(ExportKind::parse("csv-detailed"), Some(ExportKind::CsvDetailed));
        assert_eq!(ExportKind::parse("archive"), Some(ExportKind::Archive));
        assert_eq!(ExportKind::parse("pdf"), None);
        assert_eq!(ExportKind::Archive.default_filename(7), "course-7-archive.zip");
    }
}
