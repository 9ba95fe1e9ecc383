// Input configuration
//
// The `[input]` section of the settings file: driver selection, focus
// policy, poll frequency and every binding, stored as
// `"<settings key>" = "0x1/0/55;0x3000000010002/3/0"`.

use super::binding::{format_assignments, Assignment, Qualifier};
use super::hid::keyboard;
use super::hotkeys::HotkeyAction;
use super::keyboard::KEYBOARD_ID;
use super::manager::{BindTarget, InputManager};
use super::virtual_port::{MappingId, PadControl, KEYBOARD_KEYS};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// What happens to input while the window is not focused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Defocus {
    /// Stop the emulation until focus returns
    #[default]
    Pause,
    /// Keep running but read every input as released
    Block,
    /// Keep reading input
    Allow,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// "Host" for keyboard/mouse/gamepads, "None" for no devices
    pub driver: String,
    pub defocus: Defocus,
    pub poll_frequency_ms: u64,
    pub bindings: BTreeMap<String, String>,
}

impl InputConfig {
    pub fn new() -> Self {
        Self {
            driver: "Host".to_string(),
            defocus: Defocus::Pause,
            poll_frequency_ms: 5,
            bindings: default_bindings(),
        }
    }

    pub fn poll_frequency(&self) -> Duration {
        Duration::from_millis(self.poll_frequency_ms.max(1))
    }

    /// Push the stored bindings into the input manager
    pub fn apply(&self, manager: &InputManager) {
        manager.set_poll_frequency(self.poll_frequency());
        manager.load_assignments(&self.bindings);
        manager.bind();
    }

    /// Take the bindings back from the input manager
    pub fn capture(&mut self, manager: &InputManager) {
        self.bindings = manager.assignments();
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn key(name: &str) -> Option<Assignment> {
    KEYBOARD_KEYS.iter().position(|k| *k == name).map(|index| {
        Assignment::new(KEYBOARD_ID, keyboard::BUTTON, index as u32, Qualifier::None)
    })
}

/// Keyboard bindings for the first port and the common hotkeys
pub fn default_bindings() -> BTreeMap<String, String> {
    let pad = [
        (PadControl::Up, "Up"),
        (PadControl::Down, "Down"),
        (PadControl::Left, "Left"),
        (PadControl::Right, "Right"),
        (PadControl::Select, "RightShift"),
        (PadControl::Start, "Enter"),
        (PadControl::South, "Z"),
        (PadControl::East, "X"),
        (PadControl::West, "A"),
        (PadControl::North, "S"),
        (PadControl::LBumper, "Q"),
        (PadControl::RBumper, "W"),
    ];
    let hotkeys = [
        (HotkeyAction::ToggleFullscreen, "F11"),
        (HotkeyAction::FastForward, "Tab"),
        (HotkeyAction::Rewind, "Backspace"),
        (HotkeyAction::FrameAdvance, "O"),
        (HotkeyAction::CaptureScreenshot, "F12"),
        (HotkeyAction::SaveState, "F2"),
        (HotkeyAction::LoadState, "F4"),
        (HotkeyAction::DecrementStateSlot, "F6"),
        (HotkeyAction::IncrementStateSlot, "F7"),
        (HotkeyAction::PauseEmulation, "P"),
    ];

    let targets = pad
        .iter()
        .map(|(control, name)| (BindTarget::Port(MappingId::pad(0, *control)), *name))
        .chain(
            hotkeys
                .iter()
                .map(|(action, name)| (BindTarget::Hotkey(*action), *name)),
        );

    targets
        .filter_map(|(target, name)| {
            key(name).map(|a| (target.settings_key(), format_assignments(&[Some(a)])))
        })
        .collect()
}
