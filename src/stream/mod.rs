//! Stream publishing boundary
//!
//! The sampling loop publishes through two outlets per session:
//!
//! ```text
//! Sampler ──[6 × f32, t]──► axes outlet     ("Position", regular rate)
//!         ──[1 × f32, t]──► buttons outlet  ("Markers", irregular rate)
//! ```
//!
//! Transports implement [`OutletFactory`]. [`LogOutletFactory`] is always
//! available; the liblsl transport is compiled with the `lsl` feature.

pub mod clock;
pub mod info;
#[cfg(feature = "lsl")]
pub mod lsl_outlet;
pub mod outlet;

pub use clock::{Clock, MonotonicClock};
pub use info::{
    axes_stream_info, button_stream_info, ChannelDescriptor, ChannelFormat, MetaElement,
    StreamInfo, AXIS_CHANNELS, IRREGULAR_RATE,
};
#[cfg(feature = "lsl")]
pub use lsl_outlet::{LslClock, LslOutletFactory};
pub use outlet::{LogOutletFactory, OutletFactory, PublishError, StreamOutlet};
