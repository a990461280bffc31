//! Capture sources
//!
//! The sensor boundary of the daemon: blocking sources that yield raw
//! fixed-size chunks. Device handling lives in external capture
//! processes or the kernel; each source is owned exclusively by one
//! channel worker and released on drop.

pub mod command;
pub mod gpio;
pub mod traits;

pub use command::CommandSource;
pub use gpio::GpioSwitch;
pub use traits::{ChannelKind, SignalChunk, SignalSource};
