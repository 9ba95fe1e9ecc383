// Host input driver
//
// Combines the system keyboard and mouse (fed from the window layer) with
// the gilrs gamepads into a single `InputDriver`. Gamepad support is
// optional: if gilrs cannot start, keyboard and mouse keep working.

use super::driver::{InputDriver, InputEvent};
use super::gamepad::Gamepads;
use super::hid::HidDevice;
use super::keyboard::{KeyboardFeed, KeyboardMouse};
use std::sync::Arc;

pub struct UnifiedDriver {
    keyboard: KeyboardMouse,
    gamepads: Option<Gamepads>,
    acquired: bool,
}

impl UnifiedDriver {
    /// Create the driver
    ///
    /// # Arguments
    /// * `feed` - Handle the window layer forwards keyboard/mouse events to
    /// * `gamepads` - Whether to start gilrs
    pub fn new(feed: KeyboardFeed, gamepads: bool) -> Self {
        let gamepads = if gamepads {
            match Gamepads::new() {
                Ok(gamepads) => Some(gamepads),
                Err(e) => {
                    log::warn!("{}", e);
                    None
                }
            }
        } else {
            None
        };

        Self {
            keyboard: KeyboardMouse::new(feed),
            gamepads,
            acquired: false,
        }
    }
}

impl InputDriver for UnifiedDriver {
    fn name(&self) -> &str {
        if self.gamepads.is_some() {
            "Keyboard+Mouse+Gamepads"
        } else {
            "Keyboard+Mouse"
        }
    }

    fn poll(&mut self, events: &mut Vec<InputEvent>) -> Vec<Arc<HidDevice>> {
        self.keyboard.poll(events);
        let mut devices = self.keyboard.devices().to_vec();
        if let Some(gamepads) = &mut self.gamepads {
            gamepads.poll(events);
            devices.extend(gamepads.devices());
        }
        devices
    }

    fn rumble(&mut self, device_id: u64, strong: u16, weak: u16) -> bool {
        self.gamepads
            .as_mut()
            .is_some_and(|gamepads| gamepads.rumble(device_id, strong, weak))
    }

    fn acquired(&self) -> bool {
        self.acquired
    }

    fn acquire(&mut self) -> bool {
        self.acquired = true;
        true
    }

    fn release(&mut self) -> bool {
        self.acquired = false;
        true
    }
}
