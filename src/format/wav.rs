//! WAV header for unbounded streams
//!
//! Layout (little-endian, 44 bytes):
//! ```text
//! +--------+----------+--------+--------+--------+--------+----------+
//! | "RIFF" | size+36  | "WAVE" | "fmt " |   16   | PCM(1) | channels |
//! |   4    |    4     |   4    |   4    |   4    |   2    |    2     |
//! +--------+----------+--------+--------+--------+--------+----------+
//! | rate   | byte rate| align  | bits   | "data" | size   |
//! |   4    |    4     |   2    |   2    |   4    |   4    |
//! +--------+----------+--------+--------+--------+--------+
//! ```
//!
//! A live stream has no known length, so `size` is written as 0. Clients that
//! see a zero data size play until EOF instead of buffering the whole body.

use bytes::{BufMut, Bytes, BytesMut};

use super::AudioFormat;

/// Encoded header length
pub const WAV_HEADER_LEN: usize = 44;

pub const RIFF_MAGIC: &[u8; 4] = b"RIFF";
pub const WAVE_MAGIC: &[u8; 4] = b"WAVE";
pub const FMT_CHUNK: &[u8; 4] = b"fmt ";
pub const DATA_CHUNK: &[u8; 4] = b"data";

/// Size of the PCM `fmt ` chunk body
const FMT_CHUNK_SIZE: u32 = 16;

/// WAVE_FORMAT_PCM
const FORMAT_PCM: u16 = 1;

/// RIFF size minus data size: "WAVE" + fmt chunk + data chunk header
const RIFF_OVERHEAD: u32 = 36;

/// WAV header for a PCM stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavHeader {
    pub format: AudioFormat,
    /// Declared length of the data chunk
    pub data_size: u32,
}

impl WavHeader {
    /// Header for a stream of unknown length (data size 0)
    pub fn streaming(format: AudioFormat) -> Self {
        Self {
            format,
            data_size: 0,
        }
    }

    /// Value of the RIFF chunk size field
    pub fn riff_size(&self) -> u32 {
        self.data_size.saturating_add(RIFF_OVERHEAD)
    }

    /// Encode to the 44-byte wire form
    pub fn to_bytes(&self) -> Bytes {
        let format = &self.format;
        let mut buf = BytesMut::with_capacity(WAV_HEADER_LEN);

        buf.put_slice(RIFF_MAGIC);
        buf.put_u32_le(self.riff_size());
        buf.put_slice(WAVE_MAGIC);

        buf.put_slice(FMT_CHUNK);
        buf.put_u32_le(FMT_CHUNK_SIZE);
        buf.put_u16_le(FORMAT_PCM);
        buf.put_u16_le(format.channels());
        buf.put_u32_le(format.sample_rate());
        buf.put_u32_le(format.byte_rate());
        buf.put_u16_le(format.block_align());
        buf.put_u16_le(format.bits_per_sample());

        buf.put_slice(DATA_CHUNK);
        buf.put_u32_le(self.data_size);

        debug_assert_eq!(buf.len(), WAV_HEADER_LEN);
        buf.freeze()
    }
}
