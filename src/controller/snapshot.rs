//! Point-in-time controller state
//!
//! A [`ControllerSnapshot`] is produced fresh on every poll and never retained
//! past one sampling iteration. Buttons are addressed through [`ButtonId`], whose
//! discriminants are the stable indices published on the button-event stream.

use serde::{Deserialize, Serialize};

/// Number of buttons tracked per controller
pub const BUTTON_COUNT: usize = 14;

/// Number of analog channels on the axes stream
pub const AXIS_COUNT: usize = 6;

/// Buttons of the fixed analog+button layout.
///
/// The discriminant is the index carried as payload on the button-event stream,
/// so the order here is part of the output format and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ButtonId {
    A = 0,
    B = 1,
    X = 2,
    Y = 3,
    DPadDown = 4,
    DPadLeft = 5,
    DPadRight = 6,
    DPadUp = 7,
    LeftShoulder = 8,
    RightShoulder = 9,
    Start = 10,
    LeftStick = 11,
    RightStick = 12,
    Back = 13,
}

impl ButtonId {
    /// All buttons in publishing order
    pub const ALL: [ButtonId; BUTTON_COUNT] = [
        ButtonId::A,
        ButtonId::B,
        ButtonId::X,
        ButtonId::Y,
        ButtonId::DPadDown,
        ButtonId::DPadLeft,
        ButtonId::DPadRight,
        ButtonId::DPadUp,
        ButtonId::LeftShoulder,
        ButtonId::RightShoulder,
        ButtonId::Start,
        ButtonId::LeftStick,
        ButtonId::RightStick,
        ButtonId::Back,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<ButtonId> {
        Self::ALL.get(index).copied()
    }
}

/// Snapshot of one controller as returned by a [`ControllerSource`](super::ControllerSource)
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ControllerSnapshot {
    pub connected: bool,

    // Sticks in [-1, 1]
    pub left_stick_x: f32,
    pub left_stick_y: f32,
    pub right_stick_x: f32,
    pub right_stick_y: f32,

    // Triggers in [0, 1]
    pub left_trigger: f32,
    pub right_trigger: f32,

    pub buttons: [bool; BUTTON_COUNT],
}

impl ControllerSnapshot {
    /// Snapshot reported for an empty or unplugged slot
    pub fn disconnected() -> Self {
        Self::default()
    }

    /// Connected controller at rest
    pub fn idle() -> Self {
        Self {
            connected: true,
            ..Self::default()
        }
    }

    pub fn is_pressed(&self, button: ButtonId) -> bool {
        self.buttons[button.index()]
    }

    pub fn with_button(mut self, button: ButtonId, pressed: bool) -> Self {
        self.buttons[button.index()] = pressed;
        self
    }

    /// Axes in channel order: left X/Y, right X/Y, left trigger, right trigger
    pub fn axes(&self) -> [f32; AXIS_COUNT] {
        [
            self.left_stick_x,
            self.left_stick_y,
            self.right_stick_x,
            self.right_stick_y,
            self.left_trigger,
            self.right_trigger,
        ]
    }
}
