//! gilrs-backed controller source
//!
//! gilrs only updates its cached gamepad state while events are drained, so every
//! public call pumps the event queue before reading. Controller indices refer to
//! the order of connected gamepads at the last [`refresh`](ControllerSource::refresh).

use gilrs::{Axis, Button, Event, Gamepad, GamepadId, Gilrs};
use tracing::{debug, error, info, trace, warn};

use super::snapshot::{ButtonId, ControllerSnapshot};
use super::source::{ControllerSource, DeviceInfo, SourceError};

pub struct GilrsSource {
    gilrs: Gilrs,

    // Connected gamepads by index, as of the last refresh
    slots: Vec<GamepadId>,
}

impl GilrsSource {
    pub fn new() -> Result<Self, SourceError> {
        info!("Initializing gilrs controller interface");
        let gilrs = match Gilrs::new() {
            Ok(g) => {
                info!("Successfully initialized gilrs");
                g
            }
            Err(e) => {
                error!("Failed to initialize gilrs: {}", e);
                return Err(SourceError::InitializationError(e.to_string()));
            }
        };

        let mut source = Self {
            gilrs,
            slots: Vec::new(),
        };
        source.refresh();
        Ok(source)
    }

    fn pump_events(&mut self) {
        while let Some(Event { id, event, time, .. }) = self.gilrs.next_event() {
            trace!("gilrs event from {}: {:?} at {:?}", id, event, time);
        }
    }
}

impl ControllerSource for GilrsSource {
    fn refresh(&mut self) -> Vec<DeviceInfo> {
        self.pump_events();

        let mut devices = Vec::new();
        self.slots.clear();
        for (index, (id, gamepad)) in self.gilrs.gamepads().enumerate() {
            let device = DeviceInfo {
                index,
                name: gamepad.name().to_string(),
                guid: format_guid(gamepad.uuid()),
            };
            debug!("  [{}] ID: {}, Name: {}, GUID: {}", index, id, device.name, device.guid);
            self.slots.push(id);
            devices.push(device);
        }

        if devices.is_empty() {
            warn!("No gamepad connected");
        } else {
            info!("Found {} gamepads", devices.len());
        }
        devices
    }

    fn snapshot(&mut self, index: usize) -> Result<ControllerSnapshot, SourceError> {
        self.pump_events();

        let Some(id) = self.slots.get(index).copied() else {
            return Ok(ControllerSnapshot::disconnected());
        };
        Ok(match self.gilrs.connected_gamepad(id) {
            Some(gamepad) => read_gamepad(&gamepad),
            None => ControllerSnapshot::disconnected(),
        })
    }

    fn suspend(&mut self) -> Result<(), SourceError> {
        // gilrs has no explicit release; drain what is queued and forget the slots
        self.pump_events();
        self.slots.clear();
        info!("Controller interface suspended");
        Ok(())
    }
}

fn read_gamepad(gamepad: &Gamepad<'_>) -> ControllerSnapshot {
    let trigger = |button: Button| {
        gamepad
            .button_data(button)
            .map(|data| data.value())
            .unwrap_or(0.0)
    };

    let mut snapshot = ControllerSnapshot {
        connected: gamepad.is_connected(),
        left_stick_x: gamepad.value(Axis::LeftStickX),
        left_stick_y: gamepad.value(Axis::LeftStickY),
        right_stick_x: gamepad.value(Axis::RightStickX),
        right_stick_y: gamepad.value(Axis::RightStickY),
        left_trigger: trigger(Button::LeftTrigger2),
        right_trigger: trigger(Button::RightTrigger2),
        ..ControllerSnapshot::default()
    };
    for button in ButtonId::ALL {
        snapshot.buttons[button.index()] = gamepad.is_pressed(map_button(button));
    }
    snapshot
}

// Helper function to map our ButtonId to the gilrs Button
fn map_button(button: ButtonId) -> Button {
    match button {
        ButtonId::A => Button::South,
        ButtonId::B => Button::East,
        ButtonId::X => Button::West,
        ButtonId::Y => Button::North,
        ButtonId::DPadDown => Button::DPadDown,
        ButtonId::DPadLeft => Button::DPadLeft,
        ButtonId::DPadRight => Button::DPadRight,
        ButtonId::DPadUp => Button::DPadUp,
        ButtonId::LeftShoulder => Button::LeftTrigger,
        ButtonId::RightShoulder => Button::RightTrigger,
        ButtonId::Start => Button::Start,
        ButtonId::LeftStick => Button::LeftThumb,
        ButtonId::RightStick => Button::RightThumb,
        ButtonId::Back => Button::Select,
    }
}

fn format_guid(uuid: [u8; 16]) -> String {
    uuid.iter().map(|byte| format!("{:02x}", byte)).collect()
}
