use std::path::Path;

use hound::WavReader;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use crate::error::{NarrcheckError, Result};

use super::{AudioDecoder, DecodedAudio};

/// Default decoder: WAV through hound, everything else (MP3, FLAC) through symphonia.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileDecoder;

impl AudioDecoder for FileDecoder {
    fn decode(&self, path: &Path) -> Result<DecodedAudio> {
        let is_wav = path
            .extension()
            .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case("wav"))
            .unwrap_or(false);

        if is_wav {
            decode_wav(path)
        } else {
            decode_symphonia(path)
        }
    }

    fn name(&self) -> &'static str {
        "hound/symphonia"
    }
}

fn open_error(path: &Path, e: std::io::Error) -> NarrcheckError {
    if e.kind() == std::io::ErrorKind::NotFound {
        NarrcheckError::FileNotFound(path.display().to_string())
    } else {
        NarrcheckError::Io(e)
    }
}

/// Decode a WAV file into interleaved samples.
pub fn decode_wav(path: &Path) -> Result<DecodedAudio> {
    if !path.exists() {
        return Err(NarrcheckError::FileNotFound(path.display().to_string()));
    }

    let reader = WavReader::open(path)
        .map_err(|e| NarrcheckError::Decode(format!("Failed to open WAV file: {e}")))?;

    let spec = reader.spec();
    let channels = spec.channels.max(1);

    debug!(
        "Decoding WAV {}: {} Hz, {} channels, {} bits",
        path.display(),
        spec.sample_rate,
        spec.channels,
        spec.bits_per_sample
    );

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<Vec<f32>, _>>()
        }
        hound::SampleFormat::Float => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<Vec<f32>, _>>(),
    }
    .map_err(|e| NarrcheckError::Decode(format!("Corrupt WAV data in {}: {e}", path.display())))?;

    Ok(DecodedAudio::new(samples, spec.sample_rate, channels))
}

/// Classify an error from `next_packet`. Only a clean end of file ends the
/// stream; a reset (chained or re-configured stream) would leave the audio
/// truncated, so it fails the unit instead of passing on a short render.
fn end_of_stream(path: &Path, err: SymphoniaError) -> Result<()> {
    match err {
        SymphoniaError::IoError(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(()),
        SymphoniaError::ResetRequired => {
            warn!("{}: stream reset mid-file", path.display());
            Err(NarrcheckError::Decode(format!(
                "Stream reset mid-file in {}, decoded audio would be truncated",
                path.display()
            )))
        }
        e => Err(NarrcheckError::Decode(format!(
            "Error reading packet from {}: {e}",
            path.display()
        ))),
    }
}

/// Decode any format symphonia can probe (MP3, FLAC, WAV) into interleaved samples.
pub fn decode_symphonia(path: &Path) -> Result<DecodedAudio> {
    let file = std::fs::File::open(path).map_err(|e| open_error(path, e))?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| NarrcheckError::Decode(format!("Failed to probe {}: {e}", path.display())))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| NarrcheckError::Decode(format!("No audio track in {}", path.display())))?;

    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate;
    let mut channels: Option<u16> = None;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| {
            NarrcheckError::Decode(format!("Failed to create decoder for {}: {e}", path.display()))
        })?;

    let mut samples: Vec<f32> = Vec::new();
    let mut bad_packets = 0usize;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(e) => {
                end_of_stream(path, e)?;
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                let channel_count = spec.channels.count() as u16;
                sample_rate = sample_rate.or(Some(spec.rate));

                if *channels.get_or_insert(channel_count) != channel_count {
                    return Err(NarrcheckError::Decode(format!(
                        "Channel count changed mid-stream in {}",
                        path.display()
                    )));
                }

                let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buf.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buf.samples());
            }
            Err(SymphoniaError::DecodeError(e)) => {
                bad_packets += 1;
                debug!("Skipping corrupt packet in {}: {e}", path.display());
            }
            Err(e) => {
                return Err(NarrcheckError::Decode(format!(
                    "Decode error for {}: {e}",
                    path.display()
                )));
            }
        }
    }

    if bad_packets > 0 {
        warn!("{}: skipped {} corrupt packets", path.display(), bad_packets);
    }

    let sample_rate = sample_rate.ok_or_else(|| {
        NarrcheckError::Decode(format!("Sample rate unknown for {}", path.display()))
    })?;

    Ok(DecodedAudio::new(
        samples,
        sample_rate,
        channels.unwrap_or(1),
    ))
}
