//! PCM stream format
//!
//! The format is fixed at startup and shared by the source, the hub and every
//! responder. All buffer sizes in the crate are derived from it.

pub mod wav;

pub use wav::{WavHeader, WAV_HEADER_LEN};

use crate::error::{Error, Result};

/// Number of source slices per second of audio (250ms each)
pub const SLICES_PER_SECOND: usize = 4;

/// Raw PCM stream parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    sample_rate: u32,
    bits_per_sample: u16,
    channels: u16,
}

impl AudioFormat {
    /// Create a format, validating its parameters
    pub fn new(sample_rate: u32, bits_per_sample: u16, channels: u16) -> Result<Self> {
        if sample_rate == 0 {
            return Err(Error::InvalidFormat("sample rate must be non-zero".into()));
        }
        if channels == 0 {
            return Err(Error::InvalidFormat("channel count must be non-zero".into()));
        }
        if bits_per_sample == 0 || bits_per_sample % 8 != 0 {
            return Err(Error::InvalidFormat(format!(
                "bits per sample must be a non-zero multiple of 8, got {}",
                bits_per_sample
            )));
        }

        let block_align = u16::try_from(u32::from(channels) * u32::from(bits_per_sample) / 8)
            .map_err(|_| {
                Error::InvalidFormat(format!(
                    "{} channels of {} bits exceed the largest WAV block",
                    channels, bits_per_sample
                ))
            })?;
        if sample_rate.checked_mul(u32::from(block_align)).is_none() {
            return Err(Error::InvalidFormat(format!(
                "{}Hz with {}-byte blocks exceeds the largest WAV byte rate",
                sample_rate, block_align
            )));
        }

        Ok(Self {
            sample_rate,
            bits_per_sample,
            channels,
        })
    }

    /// 44.1kHz, 16-bit, stereo
    pub const fn cd_quality() -> Self {
        Self {
            sample_rate: 44_100,
            bits_per_sample: 16,
            channels: 2,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn bits_per_sample(&self) -> u16 {
        self.bits_per_sample
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Bytes per sample frame across all channels
    pub fn block_align(&self) -> u16 {
        // Bounded to u16 by `new`
        (u32::from(self.channels) * u32::from(self.bits_per_sample) / 8) as u16
    }

    /// Bytes per second, as written in the WAV `fmt ` chunk
    pub fn byte_rate(&self) -> u32 {
        self.sample_rate * u32::from(self.block_align())
    }

    /// Bytes holding exactly one second of audio
    ///
    /// This is both the capacity of each subscriber ring and the threshold at
    /// which a subscriber's buffer is handed out.
    pub fn frame_bytes(&self) -> usize {
        self.byte_rate() as usize
    }

    /// Bytes in one source slice (a quarter second)
    pub fn chunk_bytes(&self) -> usize {
        self.frame_bytes() / SLICES_PER_SECOND
    }

    /// WAV header announcing this format with an unknown length
    pub fn wav_header(&self) -> WavHeader {
        WavHeader::streaming(*self)
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self::cd_quality()
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}Hz/{}bit/{}ch",
            self.sample_rate, self.bits_per_sample, self.channels
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cd_quality_sizes() {
        let format = AudioFormat::default();

        assert_eq!(format.frame_bytes(), 176_400);
        assert_eq!(format.chunk_bytes(), 44_100);
        assert_eq!(format.block_align(), 4);
        assert_eq!(format.byte_rate(), 176_400);
        assert_eq!(format.to_string(), "44100Hz/16bit/2ch");
    }

    #[test]
    fn test_mono_8bit() {
        let format = AudioFormat::new(8000, 8, 1).unwrap();

        assert_eq!(format.frame_bytes(), 8000);
        assert_eq!(format.chunk_bytes(), 2000);
        assert_eq!(format.block_align(), 1);
    }

    #[test]
    fn test_rejects_invalid() {
        assert!(matches!(
            AudioFormat::new(0, 16, 2),
            Err(Error::InvalidFormat(_))
        ));
        assert!(matches!(
            AudioFormat::new(44_100, 16, 0),
            Err(Error::InvalidFormat(_))
        ));
        assert!(matches!(
            AudioFormat::new(44_100, 12, 2),
            Err(Error::InvalidFormat(_))
        ));
        assert!(matches!(
            AudioFormat::new(44_100, 0, 2),
            Err(Error::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_rejects_oversized_block() {
        // 5000 * 16 / 8 = 10000 fits, 40000 * 16 / 8 = 80000 does not
        assert_eq!(AudioFormat::new(8000, 16, 5000).unwrap().block_align(), 10_000);
        assert!(matches!(
            AudioFormat::new(8000, 16, 40_000),
            Err(Error::InvalidFormat(_))
        ));
        assert!(matches!(
            AudioFormat::new(8000, u16::MAX - 7, u16::MAX),
            Err(Error::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_rejects_oversized_byte_rate() {
        assert!(matches!(
            AudioFormat::new(u32::MAX, 16, 2),
            Err(Error::InvalidFormat(_))
        ));

        // Largest rate that still fits: 4-byte blocks
        let format = AudioFormat::new(u32::MAX / 4, 16, 2).unwrap();
        assert_eq!(format.byte_rate(), (u32::MAX / 4) * 4);
        assert_eq!(format.frame_bytes(), format.byte_rate() as usize);
    }
}
