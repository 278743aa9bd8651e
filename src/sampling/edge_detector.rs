//! Rising-edge detection for polled button levels
//!
//! Polling yields levels; the button-event stream wants presses. The detector
//! remembers the last pressed state per button and reports a button once per
//! not-pressed → pressed transition. Holding a button reports nothing further
//! until it has been released.

use serde::{Deserialize, Serialize};

use crate::controller::{ButtonId, BUTTON_COUNT};

/// How a release re-arms detection
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleasePolicy {
    /// A release clears the state of the released button
    #[default]
    PerButton,

    /// Legacy streamer behavior: any not-pressed sample clears only the
    /// right-stick slot, so other buttons fire once per session
    Legacy,
}

/// Slot cleared by [`ReleasePolicy::Legacy`]
const LEGACY_RELEASE_SLOT: usize = 12;

#[derive(Clone, Debug)]
pub struct EdgeDetector {
    was_pressed: [bool; BUTTON_COUNT],
    policy: ReleasePolicy,
}

impl EdgeDetector {
    pub fn new(policy: ReleasePolicy) -> Self {
        Self {
            was_pressed: [false; BUTTON_COUNT],
            policy,
        }
    }

    pub fn policy(&self) -> ReleasePolicy {
        self.policy
    }

    /// Feeds one polled level, returning the button on a rising edge
    pub fn on_sample(&mut self, button: ButtonId, pressed: bool) -> Option<ButtonId> {
        let index = button.index();
        if !self.was_pressed[index] && pressed {
            self.was_pressed[index] = true;
            return Some(button);
        }

        let release_slot = match self.policy {
            ReleasePolicy::PerButton => index,
            ReleasePolicy::Legacy => LEGACY_RELEASE_SLOT,
        };
        if self.was_pressed[release_slot] && !pressed {
            self.was_pressed[release_slot] = false;
        }
        None
    }

    pub fn is_armed(&self, button: ButtonId) -> bool {
        !self.was_pressed[button.index()]
    }
}

impl Default for EdgeDetector {
    fn default() -> Self {
        Self::new(ReleasePolicy::default())
    }
}
