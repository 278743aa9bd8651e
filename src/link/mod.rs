//! Link lifecycle: starts the sampler on a background task and stops it again
//!
//! Lifecycle requests come from a single control task. Only one session can be
//! active per [`LinkController`]; a second link request is rejected.

pub mod link_controller;

pub use link_controller::{LinkController, LinkError, LinkSettings, LinkState, SessionSummary};
