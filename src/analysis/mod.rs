pub mod duration;
pub mod unit;

pub use duration::{validate_duration, DurationCheck};
pub use unit::UnitAnalyzer;

use serde::{Deserialize, Serialize};

use crate::audio::SilenceRegion;

/// A silent gap, in seconds from the start of the unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SilentInterval {
    pub start: f64,
    pub end: f64,
    pub duration: f64,
}

impl From<SilenceRegion> for SilentInterval {
    fn from(region: SilenceRegion) -> Self {
        let start = region.start.as_millis() as f64 / 1000.0;
        let end = region.end.as_millis() as f64 / 1000.0;
        Self {
            start,
            end,
            duration: region.duration().as_millis() as f64 / 1000.0,
        }
    }
}

/// Issues found in one audio unit.
///
/// The length fields are `Some` only when the unit had a companion text file,
/// and always for zero-length audio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub filename: String,
    pub chapter_id: String,
    pub section_id: String,
    pub silent_segments: Vec<SilentInterval>,
    /// Measured audio duration in seconds.
    pub duration: f64,
    pub has_silence_issue: bool,
    pub has_length_issue: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_diff_percent: Option<f64>,
}

/// Result of analyzing a unit that could be read.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitOutcome {
    Issue(Finding),
    NoIssue,
}

impl UnitOutcome {
    pub fn into_finding(self) -> Option<Finding> {
        match self {
            UnitOutcome::Issue(finding) => Some(finding),
            UnitOutcome::NoIssue => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_silent_interval_from_region() {
        let interval = SilentInterval::from(SilenceRegion {
            start: Duration::from_millis(1250),
            end: Duration::from_millis(4500),
        });
        assert_eq!(interval.start, 1.25);
        assert_eq!(interval.end, 4.5);
        assert_eq!(interval.duration, 3.25);
    }

    #[test]
    fn test_finding_omits_missing_length_fields() {
        let finding = Finding {
            filename: "gutenberg_1_1_1.mp3".to_string(),
            chapter_id: "1".to_string(),
            section_id: "1".to_string(),
            silent_segments: vec![SilentInterval {
                start: 2.0,
                end: 6.0,
                duration: 4.0,
            }],
            duration: 30.0,
            has_silence_issue: true,
            has_length_issue: false,
            text_length: None,
            expected_duration: None,
            duration_diff_percent: None,
        };

        let json = serde_json::to_string(&finding).unwrap();
        assert!(!json.contains("text_length"));
        assert!(json.contains("\"has_silence_issue\":true"));

        let parsed: Finding = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, finding);
    }

    #[test]
    fn test_outcome_into_finding() {
        assert!(UnitOutcome::NoIssue.into_finding().is_none());
    }
}
