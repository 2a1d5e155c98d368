pub mod analysis;
pub mod audio;
pub mod batch;
pub mod config;
pub mod error;
pub mod naming;

pub use analysis::{validate_duration, Finding, SilentInterval, UnitAnalyzer, UnitOutcome};
pub use audio::{detect_silence, AudioDecoder, DecodedAudio, FileDecoder};
pub use batch::{print_summary, BatchOrchestrator, BatchReport, BatchStats, RecheckSet};
pub use config::{AnalysisConfig, Config};
pub use error::{AnalysisError, NarrcheckError, Result};
pub use naming::{AudioUnit, BookLayout, UnitLayout};
