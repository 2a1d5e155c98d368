use crate::error::{NarrcheckError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::warn;

/// Thresholds that drive the per-unit analysis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Level in dBFS at or below which audio counts as silent.
    pub silence_threshold_db: f64,
    /// A gap must last at least this long to be reported.
    pub min_silence_duration_ms: u64,
    /// Calibration rate: seconds of narration per 1000 characters of text.
    pub expected_seconds_per_1000_chars: f64,
    /// Allowed relative deviation from the expected duration (0.2 = 20%).
    pub tolerance_fraction: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            silence_threshold_db: -50.0,
            min_silence_duration_ms: 3000,
            expected_seconds_per_1000_chars: 5.0,
            tolerance_fraction: 0.2,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<()> {
        if self.min_silence_duration_ms == 0 {
            return Err(NarrcheckError::Config(
                "min_silence_duration_ms must be greater than 0".to_string(),
            ));
        }
        if !self.silence_threshold_db.is_finite() || self.silence_threshold_db > 0.0 {
            return Err(NarrcheckError::Config(format!(
                "silence_threshold_db must be a dBFS level <= 0, got {}",
                self.silence_threshold_db
            )));
        }
        if !self.expected_seconds_per_1000_chars.is_finite()
            || self.expected_seconds_per_1000_chars <= 0.0
        {
            return Err(NarrcheckError::Config(format!(
                "expected_seconds_per_1000_chars must be positive, got {}",
                self.expected_seconds_per_1000_chars
            )));
        }
        if !self.tolerance_fraction.is_finite() || self.tolerance_fraction < 0.0 {
            return Err(NarrcheckError::Config(format!(
                "tolerance_fraction must be >= 0, got {}",
                self.tolerance_fraction
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding one sub-directory per book.
    pub books_root: PathBuf,
    /// First filename component of every audio file.
    pub audio_prefix: String,
    pub audio_extension: String,
    #[serde(flatten)]
    pub analysis: AnalysisConfig,
    /// Worker pool size; `None` means one worker per CPU.
    pub max_workers: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            books_root: PathBuf::from("books"),
            audio_prefix: "gutenberg".to_string(),
            audio_extension: "mp3".to_string(),
            analysis: AnalysisConfig::default(),
            max_workers: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        // Load from config file if it exists
        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                let contents = std::fs::read_to_string(&config_path)?;
                match Self::from_toml(&contents) {
                    Ok(file_config) => config = file_config,
                    Err(e) => warn!("Ignoring {}: {}", config_path.display(), e),
                }
            }
        }

        // Override with environment variables
        if let Ok(root) = std::env::var("NARRCHECK_BOOKS_ROOT") {
            config.books_root = PathBuf::from(root);
        }
        if let Ok(threshold) = std::env::var("NARRCHECK_SILENCE_THRESHOLD_DB") {
            if let Ok(t) = threshold.parse() {
                config.analysis.silence_threshold_db = t;
            }
        }
        if let Ok(min_silence) = std::env::var("NARRCHECK_MIN_SILENCE_MS") {
            if let Ok(m) = min_silence.parse() {
                config.analysis.min_silence_duration_ms = m;
            }
        }
        if let Ok(rate) = std::env::var("NARRCHECK_SECONDS_PER_1000_CHARS") {
            if let Ok(r) = rate.parse() {
                config.analysis.expected_seconds_per_1000_chars = r;
            }
        }
        if let Ok(tolerance) = std::env::var("NARRCHECK_TOLERANCE") {
            if let Ok(t) = tolerance.parse() {
                config.analysis.tolerance_fraction = t;
            }
        }
        if let Ok(workers) = std::env::var("NARRCHECK_MAX_WORKERS") {
            if let Ok(w) = workers.parse() {
                config.max_workers = Some(w);
            }
        }

        Ok(config)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| NarrcheckError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        self.analysis.validate()?;

        if self.max_workers == Some(0) {
            return Err(NarrcheckError::Config(
                "max_workers must be greater than 0".to_string(),
            ));
        }

        if self.audio_prefix.is_empty() || self.audio_prefix.contains('_') {
            return Err(NarrcheckError::Config(format!(
                "audio_prefix must be a non-empty name without '_', got {:?}",
                self.audio_prefix
            )));
        }

        Ok(())
    }

    /// Pool size after applying the per-CPU default.
    pub fn worker_count(&self) -> usize {
        self.max_workers.unwrap_or_else(num_cpus::get).max(1)
    }

    fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("narrcheck").join("config.toml"))
    }
}
