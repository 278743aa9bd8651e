//! Sampling pipeline: poll the controller, publish axes and button presses
//!
//! ```text
//! ControllerSource ──► Sampler ──► axes outlet
//!                        │
//!                   EdgeDetector ──► buttons outlet
//! ```

pub mod edge_detector;
pub mod sampler;

pub use edge_detector::{EdgeDetector, ReleasePolicy};
pub use sampler::{
    Finished, Ready, Sampler, SamplerSettings, SamplerState, SamplingError, SessionReport,
    SessionStats, Streaming,
};
