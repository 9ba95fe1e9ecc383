// Keyboard and mouse input
//
// The window event loop owns keyboard and mouse events, so they are pushed
// into a `KeyboardFeed` by the window layer and drained into two
// `HidDevice`s (one keyboard, one mouse) whenever the input driver polls.

use super::driver::InputEvent;
use super::hid::{keyboard, mouse, HidDevice};
use super::virtual_port::KEYBOARD_KEYS;
use std::sync::{Arc, Mutex};
use winit::event::MouseButton;
use winit::keyboard::{KeyCode, PhysicalKey};

/// Device id of the system keyboard
pub const KEYBOARD_ID: u64 = 0x1;

/// Device id of the system mouse
pub const MOUSE_ID: u64 = 0x2;

/// Name of a physical key, as used for the keyboard device's inputs
///
/// # Returns
/// `None` for keys that are not part of the keyboard layout
pub fn key_name(code: KeyCode) -> Option<&'static str> {
    let name = match code {
        KeyCode::Escape => "Escape",
        KeyCode::F1 => "F1",
        KeyCode::F2 => "F2",
        KeyCode::F3 => "F3",
        KeyCode::F4 => "F4",
        KeyCode::F5 => "F5",
        KeyCode::F6 => "F6",
        KeyCode::F7 => "F7",
        KeyCode::F8 => "F8",
        KeyCode::F9 => "F9",
        KeyCode::F10 => "F10",
        KeyCode::F11 => "F11",
        KeyCode::F12 => "F12",
        KeyCode::Digit1 => "1",
        KeyCode::Digit2 => "2",
        KeyCode::Digit3 => "3",
        KeyCode::Digit4 => "4",
        KeyCode::Digit5 => "5",
        KeyCode::Digit6 => "6",
        KeyCode::Digit7 => "7",
        KeyCode::Digit8 => "8",
        KeyCode::Digit9 => "9",
        KeyCode::Digit0 => "0",
        KeyCode::Minus => "Minus",
        KeyCode::Equal => "Equal",
        KeyCode::Backspace => "Backspace",
        KeyCode::Tab => "Tab",
        KeyCode::KeyQ => "Q",
        KeyCode::KeyW => "W",
        KeyCode::KeyE => "E",
        KeyCode::KeyR => "R",
        KeyCode::KeyT => "T",
        KeyCode::KeyY => "Y",
        KeyCode::KeyU => "U",
        KeyCode::KeyI => "I",
        KeyCode::KeyO => "O",
        KeyCode::KeyP => "P",
        KeyCode::BracketLeft => "LeftBracket",
        KeyCode::BracketRight => "RightBracket",
        KeyCode::Backslash => "Backslash",
        KeyCode::CapsLock => "CapsLock",
        KeyCode::KeyA => "A",
        KeyCode::KeyS => "S",
        KeyCode::KeyD => "D",
        KeyCode::KeyF => "F",
        KeyCode::KeyG => "G",
        KeyCode::KeyH => "H",
        KeyCode::KeyJ => "J",
        KeyCode::KeyK => "K",
        KeyCode::KeyL => "L",
        KeyCode::Semicolon => "Semicolon",
        KeyCode::Quote => "Apostrophe",
        KeyCode::Enter => "Enter",
        KeyCode::ShiftLeft => "LeftShift",
        KeyCode::KeyZ => "Z",
        KeyCode::KeyX => "X",
        KeyCode::KeyC => "C",
        KeyCode::KeyV => "V",
        KeyCode::KeyB => "B",
        KeyCode::KeyN => "N",
        KeyCode::KeyM => "M",
        KeyCode::Comma => "Comma",
        KeyCode::Period => "Period",
        KeyCode::Slash => "Slash",
        KeyCode::ShiftRight => "RightShift",
        KeyCode::ControlLeft => "LeftControl",
        KeyCode::AltLeft => "LeftAlt",
        KeyCode::Space => "Space",
        KeyCode::AltRight => "RightAlt",
        KeyCode::ControlRight => "RightControl",
        KeyCode::ArrowUp => "Up",
        KeyCode::ArrowDown => "Down",
        KeyCode::ArrowLeft => "Left",
        KeyCode::ArrowRight => "Right",
        KeyCode::Insert => "Insert",
        KeyCode::Delete => "Delete",
        KeyCode::Home => "Home",
        KeyCode::End => "End",
        KeyCode::PageUp => "PageUp",
        KeyCode::PageDown => "PageDown",
        _ => return None,
    };
    Some(name)
}

fn key_index(code: KeyCode) -> Option<u32> {
    let name = key_name(code)?;
    KEYBOARD_KEYS
        .iter()
        .position(|key| *key == name)
        .map(|index| index as u32)
}

fn mouse_button_index(button: MouseButton) -> Option<u32> {
    match button {
        MouseButton::Left => Some(0),
        MouseButton::Middle => Some(1),
        MouseButton::Right => Some(2),
        _ => None,
    }
}

#[derive(Debug, Default)]
struct Feed {
    keys: Vec<(u32, bool)>,
    buttons: Vec<(u32, bool)>,
    motion: (f64, f64),
}

/// Handle the window layer uses to forward keyboard and mouse events
#[derive(Debug, Clone, Default)]
pub struct KeyboardFeed {
    feed: Arc<Mutex<Feed>>,
}

impl KeyboardFeed {
    pub fn new() -> Self {
        Self::default()
    }

    fn with(&self, f: impl FnOnce(&mut Feed)) {
        let mut feed = match self.feed.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut feed);
    }

    /// Forward a key press or release
    ///
    /// # Returns
    /// `false` if the key is not part of the keyboard layout
    pub fn key(&self, code: KeyCode, pressed: bool) -> bool {
        match key_index(code) {
            Some(index) => {
                self.with(|f| f.keys.push((index, pressed)));
                true
            }
            None => false,
        }
    }

    /// Forward a winit physical key
    pub fn physical_key(&self, key: PhysicalKey, pressed: bool) -> bool {
        match key {
            PhysicalKey::Code(code) => self.key(code, pressed),
            PhysicalKey::Unidentified(_) => false,
        }
    }

    /// Accumulate relative mouse motion until the next poll
    pub fn mouse_motion(&self, dx: f64, dy: f64) {
        self.with(|f| {
            f.motion.0 += dx;
            f.motion.1 += dy;
        });
    }

    pub fn mouse_button(&self, button: MouseButton, pressed: bool) {
        if let Some(index) = mouse_button_index(button) {
            self.with(|f| f.buttons.push((index, pressed)));
        }
    }

    fn drain(&self) -> Feed {
        let mut drained = Feed::default();
        self.with(|f| drained = std::mem::take(f));
        drained
    }
}

/// The system keyboard and mouse as HID devices
#[derive(Debug)]
pub struct KeyboardMouse {
    keyboard: Arc<HidDevice>,
    mouse: Arc<HidDevice>,
    feed: KeyboardFeed,
}

impl KeyboardMouse {
    pub fn new(feed: KeyboardFeed) -> Self {
        Self {
            keyboard: Arc::new(HidDevice::keyboard(KEYBOARD_ID, "Keyboard", KEYBOARD_KEYS)),
            mouse: Arc::new(HidDevice::mouse(MOUSE_ID, "Mouse")),
            feed,
        }
    }

    pub fn devices(&self) -> [Arc<HidDevice>; 2] {
        [self.keyboard.clone(), self.mouse.clone()]
    }

    /// Apply everything fed since the last poll
    pub fn poll(&mut self, events: &mut Vec<InputEvent>) {
        let feed = self.feed.drain();

        for (index, pressed) in feed.keys {
            update(&self.keyboard, keyboard::BUTTON, index, pressed as i16, events);
        }
        for (index, pressed) in feed.buttons {
            update(&self.mouse, mouse::BUTTON, index, pressed as i16, events);
        }

        // Relative axes report the motion since the previous poll
        let clamp = |v: f64| v.round().clamp(i16::MIN as f64, i16::MAX as f64) as i16;
        update(&self.mouse, mouse::AXIS, 0, clamp(feed.motion.0), events);
        update(&self.mouse, mouse::AXIS, 1, clamp(feed.motion.1), events);
    }
}

/// Write a value and record an event if it changed
pub(crate) fn update(
    device: &Arc<HidDevice>,
    group: u32,
    input: u32,
    value: i16,
    events: &mut Vec<InputEvent>,
) {
    if let Some(old_value) = device.set_value(group, input, value) {
        if old_value != value {
            events.push(InputEvent {
                device: device.clone(),
                group,
                input,
                old_value,
                new_value: value,
            });
        }
    }
}
