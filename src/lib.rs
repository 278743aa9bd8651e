//! Streams game controller input to lab streaming outlets.
//!
//! A background sampler polls one controller every few milliseconds and
//! publishes two streams: the six analog axes at a regular rate, and button
//! presses as irregular marker events. Both share one monotonic clock so samples
//! from the same poll carry the same timestamp.

pub mod config;
pub mod controller;
pub mod link;
pub mod sampling;
pub mod stream;

#[cfg(test)]
pub(crate) mod testing;
