//! RIFF/WAVE container for raw PCM returned by speech models.
//!
//! Speech models return headerless little-endian PCM. The format is fixed:
//! 24 kHz, mono, 16-bit.

use std::io::Cursor;

use super::error::GeminiError;

/// Sample rate of generated speech.
pub const SAMPLE_RATE: u32 = 24_000;

/// Channel count of generated speech.
pub const CHANNELS: u16 = 1;

/// Bits per sample of generated speech.
pub const BITS_PER_SAMPLE: u16 = 16;

/// Size of the canonical PCM WAV header.
pub const HEADER_LEN: usize = 44;

/// Format of every speech file written.
pub fn speech_spec() -> hound::WavSpec {
    hound::WavSpec {
        channels: CHANNELS,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: BITS_PER_SAMPLE,
        sample_format: hound::SampleFormat::Int,
    }
}

/// Wrap raw little-endian 16-bit PCM in a WAV container.
///
/// The data chunk holds exactly `pcm`, so its declared length equals `pcm.len()`.
pub fn wrap_pcm(pcm: &[u8]) -> Result<Vec<u8>, GeminiError> {
    if pcm.len() % 2 != 0 {
        return Err(GeminiError::InvalidPcmLength(pcm.len()));
    }

    let mut cursor = Cursor::new(Vec::with_capacity(HEADER_LEN + pcm.len()));
    {
        let mut writer = hound::WavWriter::new(&mut cursor, speech_spec())?;
        for frame in pcm.chunks_exact(2) {
            writer.write_sample(i16::from_le_bytes([frame[0], frame[1]]))?;
        }
        writer.finalize()?;
    }
    Ok(cursor.into_inner())
}
