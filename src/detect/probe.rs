//! Intensity probes
//!
//! Turn one raw chunk into one scalar intensity. The probes here are the
//! simple stand-ins at the sampler boundary: frame differencing for
//! video, RMS for audio, the raw line level for a switch.

use crate::capture::SignalChunk;

/// Maps a raw chunk to a scalar intensity
pub trait IntensityProbe: Send {
    fn intensity(&mut self, chunk: &SignalChunk) -> f64;
}

/// Percentage of pixels that changed versus the previous frame
///
/// Stateful: keeps the previous frame. The first frame always yields 0.0
/// since there is nothing to diff against.
pub struct FrameDiffProbe {
    previous: Option<Vec<u8>>,
    pixel_threshold: u8,
}

impl FrameDiffProbe {
    pub fn new(pixel_threshold: u8) -> Self {
        Self {
            previous: None,
            pixel_threshold,
        }
    }
}

impl Default for FrameDiffProbe {
    fn default() -> Self {
        Self::new(15)
    }
}

impl IntensityProbe for FrameDiffProbe {
    fn intensity(&mut self, chunk: &SignalChunk) -> f64 {
        let movement = match &self.previous {
            Some(prev) if prev.len() == chunk.data.len() && !prev.is_empty() => {
                let changed = prev
                    .iter()
                    .zip(&chunk.data)
                    .filter(|(a, b)| a.abs_diff(**b) > self.pixel_threshold)
                    .count();
                changed as f64 * 100.0 / chunk.data.len() as f64
            }
            _ => 0.0,
        };

        self.previous = Some(chunk.data.clone());
        movement
    }
}

/// Root mean square of a little-endian 16-bit PCM chunk
#[derive(Default)]
pub struct RmsProbe;

impl IntensityProbe for RmsProbe {
    fn intensity(&mut self, chunk: &SignalChunk) -> f64 {
        let samples: Vec<f64> = chunk
            .data
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]) as f64)
            .collect();

        if samples.is_empty() {
            return 0.0;
        }

        let sum_sq: f64 = samples.iter().map(|s| s * s).sum();
        (sum_sq / samples.len() as f64).sqrt()
    }
}

/// Raw line level of a binary switch reading
#[derive(Default)]
pub struct LevelProbe;

impl IntensityProbe for LevelProbe {
    fn intensity(&mut self, chunk: &SignalChunk) -> f64 {
        match chunk.data.first() {
            Some(0) | None => 0.0,
            Some(_) => 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(data: Vec<u8>) -> SignalChunk {
        SignalChunk::new(data)
    }

    #[test]
    fn frame_diff_first_frame_is_zero() {
        let mut probe = FrameDiffProbe::new(15);
        assert_eq!(probe.intensity(&chunk(vec![0; 100])), 0.0);
    }

    #[test]
    fn frame_diff_counts_changed_pixels() {
        let mut probe = FrameDiffProbe::new(15);
        probe.intensity(&chunk(vec![0; 100]));

        // Half the pixels jump well above the per-pixel threshold
        let mut next = vec![0u8; 100];
        for px in next.iter_mut().take(50) {
            *px = 200;
        }
        let movement = probe.intensity(&chunk(next));
        assert!((movement - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn frame_diff_ignores_subthreshold_noise() {
        let mut probe = FrameDiffProbe::new(15);
        probe.intensity(&chunk(vec![100; 100]));
        assert_eq!(probe.intensity(&chunk(vec![110; 100])), 0.0);
    }

    #[test]
    fn rms_of_silence_is_zero() {
        let mut probe = RmsProbe;
        assert_eq!(probe.intensity(&chunk(vec![0; 64])), 0.0);
    }

    #[test]
    fn rms_of_constant_signal() {
        let mut probe = RmsProbe;
        // Every sample = 1000
        let data: Vec<u8> = std::iter::repeat(1000i16.to_le_bytes())
            .take(32)
            .flatten()
            .collect();
        let rms = probe.intensity(&chunk(data));
        assert!((rms - 1000.0).abs() < 1e-9);
    }

    #[test]
    fn level_probe_is_binary() {
        let mut probe = LevelProbe;
        assert_eq!(probe.intensity(&chunk(vec![1])), 1.0);
        assert_eq!(probe.intensity(&chunk(vec![0])), 0.0);
        assert_eq!(probe.intensity(&chunk(vec![])), 0.0);
    }
}
