pub mod decode;
pub mod silence;

pub use decode::{decode_symphonia, decode_wav, FileDecoder};
pub use silence::{db_to_amplitude, detect_silence};

use std::path::Path;
use std::time::Duration;

use crate::error::Result;

/// Metadata about an audio file.
#[derive(Debug, Clone)]
pub struct AudioMetadata {
    pub duration: Duration,
    pub sample_rate: u32,
    pub channels: u16,
}

/// A fully decoded audio unit.
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// Interleaved samples in [-1.0, 1.0], `metadata.channels` per frame.
    pub samples: Vec<f32>,
    pub metadata: AudioMetadata,
}

impl DecodedAudio {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        let channels = channels.max(1);
        let frames = samples.len() / channels as usize;
        let duration = if sample_rate == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(frames as f64 / sample_rate as f64)
        };
        Self {
            samples,
            metadata: AudioMetadata {
                duration,
                sample_rate,
                channels,
            },
        }
    }

    /// Number of complete frames (one sample per channel).
    pub fn frames(&self) -> usize {
        self.samples.len() / self.metadata.channels as usize
    }

    /// Total length in whole milliseconds.
    pub fn len_ms(&self) -> u64 {
        if self.metadata.sample_rate == 0 {
            return 0;
        }
        (self.frames() as u64 * 1000) / self.metadata.sample_rate as u64
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration(&self) -> Duration {
        self.metadata.duration
    }
}

/// A region of silence detected in audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SilenceRegion {
    pub start: Duration,
    pub end: Duration,
}

impl SilenceRegion {
    /// Get the duration of this silence region.
    pub fn duration(&self) -> Duration {
        self.end.saturating_sub(self.start)
    }
}

/// Turns an audio file on disk into samples.
pub trait AudioDecoder: Send + Sync {
    fn decode(&self, path: &Path) -> Result<DecodedAudio>;
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoded_audio_duration() {
        let audio = DecodedAudio::new(vec![0.0; 16_000 * 3], 16_000, 1);
        assert_eq!(audio.duration(), Duration::from_secs(3));
        assert_eq!(audio.len_ms(), 3000);
        assert!(!audio.is_empty());
    }

    #[test]
    fn test_stereo_duration_counts_frames() {
        let audio = DecodedAudio::new(vec![0.0; 16_000 * 2 * 3], 16_000, 2);
        assert_eq!(audio.frames(), 48_000);
        assert_eq!(audio.duration(), Duration::from_secs(3));
        assert_eq!(audio.len_ms(), 3000);
    }

    #[test]
    fn test_decoded_audio_zero_rate() {
        let audio = DecodedAudio::new(vec![0.0; 10], 0, 1);
        assert_eq!(audio.duration(), Duration::ZERO);
        assert_eq!(audio.len_ms(), 0);
    }

    #[test]
    fn test_silence_region_duration() {
        let region = SilenceRegion {
            start: Duration::from_millis(1500),
            end: Duration::from_millis(4750),
        };
        assert_eq!(region.duration(), Duration::from_millis(3250));
    }
}
