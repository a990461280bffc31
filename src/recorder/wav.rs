//! WAV container synthesis
//!
//! Minimal uncompressed RIFF/WAVE header for the audio channel's
//! artifact. All multi-byte fields are little-endian; declared sizes
//! must match the payload exactly.

/// PCM stream parameters for header synthesis
#[derive(Debug, Clone, Copy)]
pub struct WavSpec {
    pub channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
}

impl WavSpec {
    /// Bytes per sample frame across all channels
    pub fn block_align(&self) -> u16 {
        self.channels * self.bits_per_sample / 8
    }

    /// Bytes per second of audio
    pub fn byte_rate(&self) -> u32 {
        self.sample_rate * self.block_align() as u32
    }
}

/// Size of the synthesized header in bytes
pub const HEADER_LEN: usize = 44;

/// Format tag for integer PCM
const FORMAT_PCM: u16 = 1;

/// Build a 44-byte WAV header for a payload of `data_len` bytes
pub fn header(spec: &WavSpec, data_len: u32) -> [u8; HEADER_LEN] {
    let mut h = [0u8; HEADER_LEN];

    // RIFF chunk: total size = payload + 36 remaining header bytes
    h[0..4].copy_from_slice(b"RIFF");
    h[4..8].copy_from_slice(&(data_len + 36).to_le_bytes());
    h[8..12].copy_from_slice(b"WAVE");

    // fmt sub-chunk, always 16 bytes for PCM
    h[12..16].copy_from_slice(b"fmt ");
    h[16..20].copy_from_slice(&16u32.to_le_bytes());
    h[20..22].copy_from_slice(&FORMAT_PCM.to_le_bytes());
    h[22..24].copy_from_slice(&spec.channels.to_le_bytes());
    h[24..28].copy_from_slice(&spec.sample_rate.to_le_bytes());
    h[28..32].copy_from_slice(&spec.byte_rate().to_le_bytes());
    h[32..34].copy_from_slice(&spec.block_align().to_le_bytes());
    h[34..36].copy_from_slice(&spec.bits_per_sample.to_le_bytes());

    // data sub-chunk declares the exact payload length
    h[36..40].copy_from_slice(b"data");
    h[40..44].copy_from_slice(&data_len.to_le_bytes());

    h
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u16_at(buf: &[u8], at: usize) -> u16 {
        u16::from_le_bytes([buf[at], buf[at + 1]])
    }

    fn u32_at(buf: &[u8], at: usize) -> u32 {
        u32::from_le_bytes([buf[at], buf[at + 1], buf[at + 2], buf[at + 3]])
    }

    #[test]
    fn header_fields_roundtrip() {
        // N samples at rate R, channels C, bit depth B:
        // payload = N * C * B / 8
        let spec = WavSpec {
            channels: 2,
            sample_rate: 48_000,
            bits_per_sample: 16,
        };
        let samples = 48_000u32;
        let data_len = samples * 2 * 16 / 8;
        let h = header(&spec, data_len);

        assert_eq!(&h[0..4], b"RIFF");
        assert_eq!(u32_at(&h, 4), data_len + 36);
        assert_eq!(&h[8..12], b"WAVE");

        assert_eq!(&h[12..16], b"fmt ");
        assert_eq!(u32_at(&h, 16), 16);
        assert_eq!(u16_at(&h, 20), 1); // PCM
        assert_eq!(u16_at(&h, 22), 2);
        assert_eq!(u32_at(&h, 24), 48_000);
        assert_eq!(u32_at(&h, 28), 48_000 * 4);
        assert_eq!(u16_at(&h, 32), 4);
        assert_eq!(u16_at(&h, 34), 16);

        assert_eq!(&h[36..40], b"data");
        assert_eq!(u32_at(&h, 40), data_len);

        // Sample count recovered unchanged
        let recovered = u32_at(&h, 40) / (u16_at(&h, 22) as u32 * u16_at(&h, 34) as u32 / 8);
        assert_eq!(recovered, samples);
    }

    #[test]
    fn mono_8bit_geometry() {
        let spec = WavSpec {
            channels: 1,
            sample_rate: 16_000,
            bits_per_sample: 8,
        };
        assert_eq!(spec.block_align(), 1);
        assert_eq!(spec.byte_rate(), 16_000);
    }

    #[test]
    fn empty_payload_declares_zero_data() {
        let spec = WavSpec {
            channels: 1,
            sample_rate: 44_100,
            bits_per_sample: 16,
        };
        let h = header(&spec, 0);
        assert_eq!(u32_at(&h, 4), 36);
        assert_eq!(u32_at(&h, 40), 0);
    }
}
