//! GPIO switch source
//!
//! Polls a sysfs value file for a binary motion switch (e.g. a PIR
//! sensor exported at /sys/class/gpio/gpioNN/value). Each read yields a
//! single level byte: 1 while the line is high, 0 otherwise.

use std::path::PathBuf;
use std::time::Duration;

use super::traits::{SignalChunk, SignalSource};
use crate::utils::error::CaptureError;

/// Polls a sysfs GPIO value file at a fixed interval
pub struct GpioSwitch {
    value_path: PathBuf,
    poll_interval: Duration,
}

impl GpioSwitch {
    pub fn new(value_path: PathBuf, poll_interval: Duration) -> Self {
        Self {
            value_path,
            poll_interval,
        }
    }
}

impl SignalSource for GpioSwitch {
    fn read(&mut self) -> Result<Option<SignalChunk>, CaptureError> {
        std::thread::sleep(self.poll_interval);

        let raw = std::fs::read_to_string(&self.value_path)?;
        let level = match raw.trim() {
            "1" => 1u8,
            _ => 0u8,
        };

        Ok(Some(SignalChunk::new(vec![level])))
    }
}
