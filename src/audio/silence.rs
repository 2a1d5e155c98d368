use std::time::Duration;

use tracing::debug;

use super::{DecodedAudio, SilenceRegion};

/// Convert a dBFS level into a linear amplitude relative to full scale.
pub fn db_to_amplitude(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}

/// Frame index at which millisecond `ms` begins.
fn frame_offset(ms: u64, sample_rate: u32) -> usize {
    (ms * sample_rate as u64 / 1000) as usize
}

/// Prefix sums of squared sample energy at every millisecond boundary.
///
/// `energy[m]` is the sum of squares of every channel's samples before
/// millisecond `m`.
fn cumulative_energy(
    samples: &[f32],
    sample_rate: u32,
    channels: usize,
    len_ms: u64,
) -> Vec<f64> {
    let mut energy = Vec::with_capacity(len_ms as usize + 1);
    let mut total = 0.0f64;
    energy.push(total);

    for ms in 0..len_ms {
        let from = (frame_offset(ms, sample_rate) * channels).min(samples.len());
        let to = (frame_offset(ms + 1, sample_rate) * channels).min(samples.len());
        total += samples[from..to]
            .iter()
            .map(|&s| {
                let s = s as f64;
                s * s
            })
            .sum::<f64>();
        energy.push(total);
    }

    energy
}

/// Find every stretch of audio that stays at or below `silence_threshold_db`
/// for at least `min_silence_ms`.
///
/// A window `min_silence_ms` long slides across the audio in 1 ms steps and is
/// silent when its RMS level, taken over the samples of every channel, is at or
/// below the threshold. Silent windows that
/// overlap or touch coalesce into one region; regions separated by sound stay
/// apart. The returned regions are disjoint and ordered by start time.
pub fn detect_silence(
    audio: &DecodedAudio,
    min_silence_ms: u64,
    silence_threshold_db: f64,
) -> Vec<SilenceRegion> {
    let min_silence_ms = min_silence_ms.max(1);
    let len_ms = audio.len_ms();

    if audio.is_empty() || len_ms < min_silence_ms {
        return vec![];
    }

    let sample_rate = audio.metadata.sample_rate;
    let channels = audio.metadata.channels as usize;
    let threshold = db_to_amplitude(silence_threshold_db);
    let energy = cumulative_energy(&audio.samples, sample_rate, channels, len_ms);

    let mut ranges: Vec<(u64, u64)> = Vec::new();
    let mut current: Option<(u64, u64)> = None;

    for start in 0..=(len_ms - min_silence_ms) {
        let end = start + min_silence_ms;
        let count = (frame_offset(end, sample_rate) - frame_offset(start, sample_rate)) * channels;
        let window_energy = energy[end as usize] - energy[start as usize];
        let rms = if count == 0 {
            0.0
        } else {
            (window_energy.max(0.0) / count as f64).sqrt()
        };

        if rms > threshold {
            continue;
        }

        current = match current {
            Some((range_start, prev)) if start <= prev + min_silence_ms => Some((range_start, start)),
            Some((range_start, prev)) => {
                ranges.push((range_start, prev + min_silence_ms));
                Some((start, start))
            }
            None => Some((start, start)),
        };
    }

    if let Some((range_start, prev)) = current {
        ranges.push((range_start, prev + min_silence_ms));
    }

    debug!(
        "Found {} silent regions >= {}ms below {}dBFS in {}ms of audio",
        ranges.len(),
        min_silence_ms,
        silence_threshold_db,
        len_ms
    );

    ranges
        .into_iter()
        .map(|(start, end)| SilenceRegion {
            start: Duration::from_millis(start),
            end: Duration::from_millis(end),
        })
        .collect()
}
