//! Canonical PCM16 mono WAV encode/decode.
//!
//! Only the 44-byte-header layout is handled: `RIFF`/`WAVE`, a 16-byte
//! `fmt ` chunk declaring plain PCM, and a single `data` chunk. That is the
//! one container the pipeline persists, and the only one the CLI ingests;
//! anything fancier belongs to a real decoding collaborator.

use crate::error::PipelineError;
use crate::signal::SignalBuffer;

const HEADER_LEN: usize = 44;
const BYTES_PER_SAMPLE: usize = 2;
const CHANNELS: u16 = 1;
const BITS_PER_SAMPLE: u16 = 16;

/// Encode a mono signal as PCM16 WAV bytes: 44-byte header plus two bytes per
/// sample.
///
/// Samples are clamped to `[-1.0, 1.0]` before quantization so out-of-range
/// input can never wrap around the 16-bit range.
pub fn encode(signal: &SignalBuffer) -> Vec<u8> {
    let data_len = signal.len() * BYTES_PER_SAMPLE;
    let byte_rate = signal.sample_rate * BYTES_PER_SAMPLE as u32 * CHANNELS as u32;
    let block_align = CHANNELS * BITS_PER_SAMPLE / 8;
    let mut out = Vec::with_capacity(HEADER_LEN + data_len);

    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&((36 + data_len) as u32).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM
    out.extend_from_slice(&CHANNELS.to_le_bytes());
    out.extend_from_slice(&signal.sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());
    out.extend_from_slice(b"data");
    out.extend_from_slice(&(data_len as u32).to_le_bytes());

    for &sample in &signal.samples {
        out.extend_from_slice(&quantize(sample).to_le_bytes());
    }
    out
}

/// Clamp-then-round quantization to signed 16-bit.
fn quantize(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * 32767.0).round() as i16
}

/// Decode canonical PCM16 mono WAV bytes as produced by [`encode`].
///
/// Rejects anything outside that layout — extra chunks, other codecs,
/// multi-channel data — with a [`PipelineError::MalformedWav`].
pub fn decode(bytes: &[u8]) -> Result<SignalBuffer, PipelineError> {
    if bytes.len() < HEADER_LEN {
        return Err(PipelineError::MalformedWav(format!(
            "file is {} bytes, need at least {HEADER_LEN}",
            bytes.len()
        )));
    }
    if &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return Err(PipelineError::MalformedWav(
            "missing RIFF/WAVE markers".to_string(),
        ));
    }
    if &bytes[12..16] != b"fmt " {
        return Err(PipelineError::MalformedWav(
            "expected fmt chunk at offset 12".to_string(),
        ));
    }
    let fmt_len = read_u32(bytes, 16);
    if fmt_len != 16 {
        return Err(PipelineError::MalformedWav(format!(
            "non-canonical fmt chunk of {fmt_len} bytes"
        )));
    }
    let audio_format = read_u16(bytes, 20);
    if audio_format != 1 {
        return Err(PipelineError::MalformedWav(format!(
            "audio format {audio_format} is not plain PCM"
        )));
    }
    let channels = read_u16(bytes, 22);
    if channels != CHANNELS {
        return Err(PipelineError::MalformedWav(format!(
            "{channels} channels, only mono is supported"
        )));
    }
    let sample_rate = read_u32(bytes, 24);
    if sample_rate == 0 {
        return Err(PipelineError::MalformedWav(
            "sample rate is zero".to_string(),
        ));
    }
    let bits = read_u16(bytes, 34);
    if bits != BITS_PER_SAMPLE {
        return Err(PipelineError::MalformedWav(format!(
            "{bits}-bit samples, only 16-bit PCM is supported"
        )));
    }
    if &bytes[36..40] != b"data" {
        return Err(PipelineError::MalformedWav(
            "expected a single data chunk at offset 36".to_string(),
        ));
    }
    let data_len = read_u32(bytes, 40) as usize;
    let data = &bytes[HEADER_LEN..];
    if data.len() < data_len {
        return Err(PipelineError::MalformedWav(format!(
            "data chunk declares {data_len} bytes but only {} are present",
            data.len()
        )));
    }
    if data_len % BYTES_PER_SAMPLE != 0 {
        return Err(PipelineError::MalformedWav(format!(
            "data chunk length {data_len} is not a whole number of samples"
        )));
    }

    let samples = data[..data_len]
        .chunks_exact(BYTES_PER_SAMPLE)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
        .collect();
    Ok(SignalBuffer::new(samples, sample_rate))
}

fn read_u16(bytes: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([bytes[offset], bytes[offset + 1]])
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}
