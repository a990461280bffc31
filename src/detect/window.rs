//! Sliding-window threshold detector
//!
//! A fixed-capacity window of recent intensity samples. The channel is
//! active while any sample in the window exceeds the threshold, so
//! activity persists for one window length past the last loud sample.

use chrono::{DateTime, Utc};
use std::collections::VecDeque;

use crate::utils::error::CalibrationError;

/// One intensity reading
#[derive(Debug, Clone, Copy)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub intensity: f64,
}

impl Sample {
    pub fn new(timestamp: DateTime<Utc>, intensity: f64) -> Self {
        Self {
            timestamp,
            intensity,
        }
    }
}

/// Summary statistic applied to the calibration baseline
#[derive(Debug, Clone, Copy)]
pub enum BaselineStat {
    /// Mean of all baseline samples
    Mean,
    /// Mean of the top fraction (0..1] of samples, for noisier signals
    TopFraction(f64),
}

/// Derive a detection threshold from baseline intensities
///
/// threshold = statistic × margin_factor + margin_offset
pub fn calibrate(
    baseline: &[f64],
    stat: BaselineStat,
    margin_factor: f64,
    margin_offset: f64,
) -> Result<f64, CalibrationError> {
    if baseline.is_empty() {
        return Err(CalibrationError::NoSamples);
    }

    let statistic = match stat {
        BaselineStat::Mean => baseline.iter().sum::<f64>() / baseline.len() as f64,
        BaselineStat::TopFraction(fraction) => {
            let mut sorted = baseline.to_vec();
            sorted.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
            let take = ((sorted.len() as f64 * fraction).ceil() as usize).clamp(1, sorted.len());
            sorted[..take].iter().sum::<f64>() / take as f64
        }
    };

    Ok(statistic * margin_factor + margin_offset)
}

/// Fixed-capacity time window plus threshold classifier
pub struct SlidingWindowDetector {
    window: VecDeque<Sample>,
    capacity: usize,
    threshold: f64,
    active: bool,
    since: Option<DateTime<Utc>>,
}

impl SlidingWindowDetector {
    /// Create a detector with a fixed threshold
    ///
    /// Capacity is window_seconds × sampling_rate and is immutable after
    /// construction.
    pub fn new(capacity: usize, threshold: f64) -> Self {
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity: capacity.max(1),
            threshold,
            active: false,
            since: None,
        }
    }

    /// Push a sample, evicting the oldest when full, and reclassify
    pub fn ingest(&mut self, sample: Sample) {
        self.window.push_back(sample);
        while self.window.len() > self.capacity {
            self.window.pop_front();
        }

        let was_active = self.active;
        self.active = self
            .window
            .iter()
            .any(|s| s.intensity > self.threshold);

        if self.active && !was_active {
            // Only the sample just ingested can flip an inactive window
            self.since = Some(sample.timestamp);
        } else if !self.active {
            self.since = None;
        }
    }

    /// Whether any sample currently in the window exceeds the threshold
    pub fn active(&self) -> bool {
        self.active
    }

    /// Timestamp of the sample that started the current activation streak
    pub fn active_since(&self) -> Option<DateTime<Utc>> {
        self.since
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
