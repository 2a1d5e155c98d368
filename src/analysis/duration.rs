/// Outcome of comparing audio duration with the duration its text implies.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DurationCheck {
    pub expected_duration: f64,
    pub diff_percent: f64,
    pub is_issue: bool,
}

/// Compare `audio_duration_sec` with `(text_length / 1000) * seconds_per_1000_chars`.
///
/// A relative deviation above `tolerance_fraction` is an issue. When the
/// expected duration is not positive (empty text) there is nothing to divide
/// by, so the unit is flagged outright with a 100% difference.
pub fn validate_duration(
    audio_duration_sec: f64,
    text_length: usize,
    expected_seconds_per_1000_chars: f64,
    tolerance_fraction: f64,
) -> DurationCheck {
    let expected_duration = (text_length as f64 / 1000.0) * expected_seconds_per_1000_chars;

    if expected_duration <= 0.0 || !expected_duration.is_finite() {
        return DurationCheck {
            expected_duration: 0.0,
            diff_percent: 100.0,
            is_issue: true,
        };
    }

    let relative_diff = (audio_duration_sec - expected_duration).abs() / expected_duration;

    DurationCheck {
        expected_duration,
        diff_percent: relative_diff * 100.0,
        is_issue: relative_diff > tolerance_fraction,
    }
}
