// Input driver interface
//
// A driver enumerates physical devices and reports raw value changes. The
// `InputManager` owns exactly one driver and polls it from the UI thread.
//
// `ScriptedDriver` is a driver whose devices and events are fed through a
// cloneable `ScriptHandle`. It backs headless runs and input replays.

use super::hid::HidDevice;
use std::sync::{Arc, Mutex};

/// A raw transition on one physical input
#[derive(Debug, Clone)]
pub struct InputEvent {
    pub device: Arc<HidDevice>,
    pub group: u32,
    pub input: u32,
    pub old_value: i16,
    pub new_value: i16,
}

/// Backend that talks to the host's input devices
pub trait InputDriver: Send {
    /// Short name shown in settings
    fn name(&self) -> &str;

    /// Poll the hardware
    ///
    /// Value changes are written into the returned devices and appended to
    /// `events` as they are observed.
    ///
    /// # Returns
    /// The complete list of currently connected devices
    fn poll(&mut self, events: &mut Vec<InputEvent>) -> Vec<Arc<HidDevice>>;

    /// Drive the force feedback motors of a device
    ///
    /// # Returns
    /// `true` if the device accepted the request
    fn rumble(&mut self, device_id: u64, strong: u16, weak: u16) -> bool;

    /// Whether the mouse is currently captured
    fn acquired(&self) -> bool {
        false
    }

    fn acquire(&mut self) -> bool {
        false
    }

    fn release(&mut self) -> bool {
        false
    }
}

/// Driver with no devices at all
#[derive(Debug, Default)]
pub struct NullDriver;

impl InputDriver for NullDriver {
    fn name(&self) -> &str {
        "None"
    }

    fn poll(&mut self, _events: &mut Vec<InputEvent>) -> Vec<Arc<HidDevice>> {
        Vec::new()
    }

    fn rumble(&mut self, _device_id: u64, _strong: u16, _weak: u16) -> bool {
        false
    }
}

#[derive(Debug, Default)]
struct Script {
    devices: Vec<Arc<HidDevice>>,
    pending: Vec<InputEvent>,
    rumbles: Vec<(u64, u16, u16)>,
    acquired: bool,
}

/// Handle used to feed a `ScriptedDriver`
#[derive(Debug, Clone, Default)]
pub struct ScriptHandle {
    script: Arc<Mutex<Script>>,
}

impl ScriptHandle {
    fn with<R>(&self, f: impl FnOnce(&mut Script) -> R) -> R {
        let mut script = match self.script.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut script)
    }

    /// Plug a device in
    pub fn connect(&self, device: Arc<HidDevice>) {
        self.with(|s| s.devices.push(device));
    }

    /// Unplug a device by id
    pub fn disconnect(&self, device_id: u64) {
        self.with(|s| s.devices.retain(|d| d.id() != device_id));
    }

    /// Change an input value; the event is delivered on the next poll
    ///
    /// # Returns
    /// `false` if the device or input is unknown
    pub fn set(&self, device_id: u64, group: u32, input: u32, value: i16) -> bool {
        self.with(|s| {
            let Some(device) = s.devices.iter().find(|d| d.id() == device_id).cloned() else {
                return false;
            };
            let Some(old_value) = device.set_value(group, input, value) else {
                return false;
            };
            if old_value != value {
                s.pending.push(InputEvent {
                    device,
                    group,
                    input,
                    old_value,
                    new_value: value,
                });
            }
            true
        })
    }

    pub fn set_acquired(&self, acquired: bool) {
        self.with(|s| s.acquired = acquired);
    }

    /// Rumble requests received so far, oldest first
    pub fn rumbles(&self) -> Vec<(u64, u16, u16)> {
        self.with(|s| s.rumbles.clone())
    }
}

/// Driver fed from a `ScriptHandle`
#[derive(Debug, Default)]
pub struct ScriptedDriver {
    handle: ScriptHandle,
}

impl ScriptedDriver {
    /// Create a driver and the handle that feeds it
    pub fn new() -> (Self, ScriptHandle) {
        let handle = ScriptHandle::default();
        (
            Self {
                handle: handle.clone(),
            },
            handle,
        )
    }
}

impl InputDriver for ScriptedDriver {
    fn name(&self) -> &str {
        "Scripted"
    }

    fn poll(&mut self, events: &mut Vec<InputEvent>) -> Vec<Arc<HidDevice>> {
        self.handle.with(|s| {
            events.append(&mut s.pending);
            s.devices.clone()
        })
    }

    fn rumble(&mut self, device_id: u64, strong: u16, weak: u16) -> bool {
        self.handle.with(|s| {
            let known = s.devices.iter().any(|d| d.id() == device_id);
            if known {
                s.rumbles.push((device_id, strong, weak));
            }
            known
        })
    }

    fn acquired(&self) -> bool {
        self.handle.with(|s| s.acquired)
    }

    fn acquire(&mut self) -> bool {
        self.handle.set_acquired(true);
        true
    }

    fn release(&mut self) -> bool {
        self.handle.set_acquired(false);
        true
    }
}
