//! Controller subsystem: the snapshot source polled by the sampling loop
//!
//! # Architecture
//!
//! ```text
//! Gamepad ──► GilrsSource ──► ControllerSnapshot ──► Sampler
//!             (refresh / snapshot / suspend)
//! ```
//!
//! [`ControllerSource`] is the seam between hardware and the core; tests drive the
//! sampling loop through scripted sources instead of real gamepads.

pub mod gilrs_source;
pub mod snapshot;
pub mod source;

pub use gilrs_source::GilrsSource;
pub use snapshot::{ButtonId, ControllerSnapshot, AXIS_COUNT, BUTTON_COUNT};
pub use source::{ControllerSource, DeviceInfo, SourceError};
