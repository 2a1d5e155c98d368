use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::audio::{detect_silence, AudioDecoder};
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::naming::{AudioUnit, UnitLayout};

use super::{validate_duration, Finding, SilentInterval, UnitOutcome};

/// Character count of a companion text. CRLF counts as one character.
fn text_length(text: &str) -> usize {
    text.chars().count() - text.matches("\r\n").count()
}

/// Length of the companion text, or `None` when the unit has none.
fn read_text_length(path: &Path) -> Result<Option<usize>, AnalysisError> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(Some(text_length(&text))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(AnalysisError::TextRead {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Runs silence detection and the duration check for one audio/text pair.
pub struct UnitAnalyzer {
    decoder: Arc<dyn AudioDecoder>,
    layout: Arc<dyn UnitLayout>,
    config: AnalysisConfig,
}

impl UnitAnalyzer {
    pub fn new(
        decoder: Arc<dyn AudioDecoder>,
        layout: Arc<dyn UnitLayout>,
        config: AnalysisConfig,
    ) -> Self {
        Self {
            decoder,
            layout,
            config,
        }
    }

    pub fn decoder_name(&self) -> &'static str {
        self.decoder.name()
    }

    pub fn layout(&self) -> &Arc<dyn UnitLayout> {
        &self.layout
    }

    /// Analyze one audio file of `book_id`.
    ///
    /// Returns `UnitOutcome::Issue` when the unit has a silent gap, a length
    /// mismatch, or no audio at all; `UnitOutcome::NoIssue` otherwise. Errors
    /// mean the unit could not be analyzed and should be skipped.
    pub fn analyze_unit(
        &self,
        audio_path: &Path,
        book_id: &str,
    ) -> Result<UnitOutcome, AnalysisError> {
        let unit = AudioUnit::from_path(audio_path, book_id).ok_or_else(|| {
            AnalysisError::FilenameParse {
                filename: audio_path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| audio_path.display().to_string()),
            }
        })?;

        let text_path = self
            .layout
            .text_path(book_id, &unit.chapter_id, &unit.section_id);

        let audio = self
            .decoder
            .decode(audio_path)
            .map_err(|e| AnalysisError::Decode {
                path: audio_path.to_path_buf(),
                message: e.to_string(),
            })?;

        if audio.is_empty() || audio.len_ms() == 0 {
            drop(audio);
            warn!("{} appears to be empty (0 length)", audio_path.display());

            let length = read_text_length(&text_path)?.unwrap_or(0);
            return Ok(UnitOutcome::Issue(Finding {
                filename: unit.filename(),
                chapter_id: unit.chapter_id,
                section_id: unit.section_id,
                silent_segments: Vec::new(),
                duration: 0.0,
                has_silence_issue: false,
                has_length_issue: true,
                text_length: Some(length),
                expected_duration: Some(0.0),
                duration_diff_percent: Some(100.0),
            }));
        }

        let duration = audio.len_ms() as f64 / 1000.0;
        let silent_segments: Vec<SilentInterval> = detect_silence(
            &audio,
            self.config.min_silence_duration_ms,
            self.config.silence_threshold_db,
        )
        .into_iter()
        .map(SilentInterval::from)
        .collect();
        drop(audio);

        let length_check = read_text_length(&text_path)?.map(|length| {
            (
                length,
                validate_duration(
                    duration,
                    length,
                    self.config.expected_seconds_per_1000_chars,
                    self.config.tolerance_fraction,
                ),
            )
        });

        let has_length_issue = length_check
            .map(|(_, check)| check.is_issue)
            .unwrap_or(false);

        debug!(
            "{}: {:.2}s, {} silent segments, text {}",
            unit.filename(),
            duration,
            silent_segments.len(),
            match length_check {
                Some((length, check)) => format!("{} chars ({:.1}% off)", length, check.diff_percent),
                None => "missing".to_string(),
            }
        );

        if silent_segments.is_empty() && !has_length_issue {
            return Ok(UnitOutcome::NoIssue);
        }

        Ok(UnitOutcome::Issue(Finding {
            filename: unit.filename(),
            chapter_id: unit.chapter_id,
            section_id: unit.section_id,
            has_silence_issue: !silent_segments.is_empty(),
            silent_segments,
            duration,
            has_length_issue,
            text_length: length_check.map(|(length, _)| length),
            expected_duration: length_check.map(|(_, check)| check.expected_duration),
            duration_diff_percent: length_check.map(|(_, check)| check.diff_percent),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::DecodedAudio;
    use crate::error::{NarrcheckError, Result};
    use crate::naming::BookLayout;
    use tempfile::TempDir;

    const RATE: u32 = 8_000;
    const BOOK: &str = "84";

    /// Hands back the same audio for every path, or fails like a corrupt file.
    struct FixedDecoder(Option<DecodedAudio>);

    impl AudioDecoder for FixedDecoder {
        fn decode(&self, _path: &Path) -> Result<DecodedAudio> {
            self.0
                .clone()
                .ok_or_else(|| NarrcheckError::Decode("bad frame header".to_string()))
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    fn tone(ms: u64) -> Vec<f32> {
        (0..(ms * RATE as u64 / 1000))
            .map(|i| if i % 2 == 0 { 0.3 } else { -0.3 })
            .collect()
    }

    fn silence(ms: u64) -> Vec<f32> {
        vec![0.0; (ms * RATE as u64 / 1000) as usize]
    }

    struct Fixture {
        _dir: TempDir,
        layout: Arc<BookLayout>,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let layout = Arc::new(BookLayout::new(dir.path()));
            std::fs::create_dir_all(layout.text_dir(BOOK)).unwrap();
            Self { _dir: dir, layout }
        }

        fn write_text(&self, chapter: &str, section: &str, text: &str) {
            std::fs::write(self.layout.text_path(BOOK, chapter, section), text).unwrap();
        }

        fn analyzer(&self, audio: Option<DecodedAudio>) -> UnitAnalyzer {
            UnitAnalyzer::new(
                Arc::new(FixedDecoder(audio)),
                self.layout.clone(),
                AnalysisConfig::default(),
            )
        }

        fn audio_path(&self, chapter: &str, section: &str) -> std::path::PathBuf {
            self.layout.audio_path(BOOK, chapter, section)
        }
    }

    fn audio(parts: Vec<Vec<f32>>) -> DecodedAudio {
        DecodedAudio::new(parts.concat(), RATE, 1)
    }

    #[test]
    fn test_clean_unit_has_no_issue() {
        let fx = Fixture::new();
        fx.write_text("1", "1", &"a".repeat(10_000));
        let analyzer = fx.analyzer(Some(audio(vec![tone(50_000)])));

        let outcome = analyzer.analyze_unit(&fx.audio_path("1", "1"), BOOK).unwrap();
        assert_eq!(outcome, UnitOutcome::NoIssue);
    }

    #[test]
    fn test_clean_unit_without_text_has_no_issue() {
        let fx = Fixture::new();
        let analyzer = fx.analyzer(Some(audio(vec![tone(5_000)])));

        let outcome = analyzer.analyze_unit(&fx.audio_path("1", "1"), BOOK).unwrap();
        assert_eq!(outcome, UnitOutcome::NoIssue);
    }

    #[test]
    fn test_silence_issue_without_text() {
        let fx = Fixture::new();
        let analyzer = fx.analyzer(Some(audio(vec![tone(2_000), silence(4_000), tone(1_000)])));

        let finding = analyzer
            .analyze_unit(&fx.audio_path("3", "2"), BOOK)
            .unwrap()
            .into_finding()
            .unwrap();

        assert_eq!(finding.filename, "gutenberg_84_3_2.mp3");
        assert_eq!(finding.chapter_id, "3");
        assert_eq!(finding.section_id, "2");
        assert!(finding.has_silence_issue);
        assert!(!finding.has_length_issue);
        assert_eq!(finding.duration, 7.0);
        assert_eq!(
            finding.silent_segments,
            vec![SilentInterval {
                start: 2.0,
                end: 6.0,
                duration: 4.0
            }]
        );
        assert!(finding.text_length.is_none());
        assert!(finding.expected_duration.is_none());
        assert!(finding.duration_diff_percent.is_none());
    }

    #[test]
    fn test_length_issue_with_text() {
        let fx = Fixture::new();
        fx.write_text("1", "4", &"x".repeat(10_000));
        let analyzer = fx.analyzer(Some(audio(vec![tone(10_000)])));

        let finding = analyzer
            .analyze_unit(&fx.audio_path("1", "4"), BOOK)
            .unwrap()
            .into_finding()
            .unwrap();

        assert!(!finding.has_silence_issue);
        assert!(finding.has_length_issue);
        assert_eq!(finding.text_length, Some(10_000));
        assert_eq!(finding.expected_duration, Some(50.0));
        assert!((finding.duration_diff_percent.unwrap() - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_silence_issue_carries_length_fields_when_text_exists() {
        let fx = Fixture::new();
        fx.write_text("2", "1", &"x".repeat(1_400));
        let analyzer = fx.analyzer(Some(audio(vec![tone(3_000), silence(3_500)])));

        let finding = analyzer
            .analyze_unit(&fx.audio_path("2", "1"), BOOK)
            .unwrap()
            .into_finding()
            .unwrap();

        assert!(finding.has_silence_issue);
        assert!(!finding.has_length_issue);
        assert_eq!(finding.text_length, Some(1_400));
        assert_eq!(finding.expected_duration, Some(7.0));
    }

    #[test]
    fn test_zero_length_audio_with_text() {
        let fx = Fixture::new();
        fx.write_text("5", "1", &"y".repeat(1_234));
        let analyzer = fx.analyzer(Some(DecodedAudio::new(Vec::new(), RATE, 1)));

        let finding = analyzer
            .analyze_unit(&fx.audio_path("5", "1"), BOOK)
            .unwrap()
            .into_finding()
            .unwrap();

        assert!(finding.has_length_issue);
        assert!(!finding.has_silence_issue);
        assert!(finding.silent_segments.is_empty());
        assert_eq!(finding.duration, 0.0);
        assert_eq!(finding.text_length, Some(1_234));
        assert_eq!(finding.expected_duration, Some(0.0));
        assert_eq!(finding.duration_diff_percent, Some(100.0));
    }

    #[test]
    fn test_zero_length_audio_without_text() {
        let fx = Fixture::new();
        let analyzer = fx.analyzer(Some(DecodedAudio::new(Vec::new(), RATE, 1)));

        let finding = analyzer
            .analyze_unit(&fx.audio_path("5", "2"), BOOK)
            .unwrap()
            .into_finding()
            .unwrap();

        assert!(finding.has_length_issue);
        assert_eq!(finding.text_length, Some(0));
        assert_eq!(finding.duration_diff_percent, Some(100.0));
    }

    #[test]
    fn test_empty_text_is_a_length_issue() {
        let fx = Fixture::new();
        fx.write_text("6", "1", "");
        let analyzer = fx.analyzer(Some(audio(vec![tone(4_000)])));

        let finding = analyzer
            .analyze_unit(&fx.audio_path("6", "1"), BOOK)
            .unwrap()
            .into_finding()
            .unwrap();

        assert!(finding.has_length_issue);
        assert_eq!(finding.text_length, Some(0));
        assert_eq!(finding.expected_duration, Some(0.0));
        assert_eq!(finding.duration_diff_percent, Some(100.0));
    }

    #[test]
    fn test_unparseable_filename() {
        let fx = Fixture::new();
        let analyzer = fx.analyzer(Some(audio(vec![tone(1_000)])));

        let result = analyzer.analyze_unit(Path::new("books/84/audio/intro.mp3"), BOOK);
        match result {
            Err(AnalysisError::FilenameParse { filename }) => assert_eq!(filename, "intro.mp3"),
            other => panic!("Expected FilenameParse, got: {other:?}"),
        }
    }

    #[test]
    fn test_decode_failure() {
        let fx = Fixture::new();
        let analyzer = fx.analyzer(None);

        let result = analyzer.analyze_unit(&fx.audio_path("1", "1"), BOOK);
        match result {
            Err(AnalysisError::Decode { message, .. }) => {
                assert!(message.contains("bad frame header"))
            }
            other => panic!("Expected Decode error, got: {other:?}"),
        }
    }

    #[test]
    fn test_unreadable_text_is_an_error() {
        let fx = Fixture::new();
        std::fs::write(fx.layout.text_path(BOOK, "7", "1"), [0xff, 0xfe, 0x00, 0xd8]).unwrap();
        let analyzer = fx.analyzer(Some(audio(vec![tone(1_000)])));

        let result = analyzer.analyze_unit(&fx.audio_path("7", "1"), BOOK);
        assert!(matches!(result, Err(AnalysisError::TextRead { .. })));
    }

    #[test]
    fn test_analysis_is_repeatable() {
        let fx = Fixture::new();
        fx.write_text("8", "1", &"z".repeat(3_000));
        let analyzer = fx.analyzer(Some(audio(vec![tone(1_000), silence(3_200), tone(500)])));
        let path = fx.audio_path("8", "1");

        let first = analyzer.analyze_unit(&path, BOOK).unwrap();
        let second = analyzer.analyze_unit(&path, BOOK).unwrap();
        assert_eq!(first, second);
        assert!(first.into_finding().is_some());
    }

    #[test]
    fn test_text_length_counts_crlf_once() {
        assert_eq!(text_length("ab\r\ncd"), 5);
        assert_eq!(text_length("héllo"), 5);
        assert_eq!(text_length(""), 0);
    }
}
