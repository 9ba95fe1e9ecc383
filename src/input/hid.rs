// Physical input device model
//
// This module describes the physical devices reported by an input driver:
// keyboards, mice and joypads, each made of groups of named inputs whose
// current values are stored atomically so a driver can update them while
// the emulation thread reads them.
//
// Devices are collected in a generation-tagged `DeviceTable`. Bindings keep
// a `DeviceSlot` (index + generation) instead of a pointer and re-resolve it
// whenever the table is replaced.

use std::fmt;
use std::sync::atomic::{AtomicI16, Ordering};
use std::sync::Arc;

/// Group identifiers for keyboard devices
pub mod keyboard {
    /// Key buttons
    pub const BUTTON: u32 = 0;
}

/// Group identifiers for mouse devices
pub mod mouse {
    /// Relative X/Y motion
    pub const AXIS: u32 = 0;
    /// Mouse buttons
    pub const BUTTON: u32 = 1;
}

/// Group identifiers for joypad devices
pub mod joypad {
    /// Analog sticks
    pub const AXIS: u32 = 0;
    /// D-pad hats
    pub const HAT: u32 = 1;
    /// Analog triggers
    pub const TRIGGER: u32 = 2;
    /// Digital buttons
    pub const BUTTON: u32 = 3;
}

/// Threshold at which an analog reading is treated as a digital press
pub const AXIS_THRESHOLD: i16 = 16384;

/// Kind of physical device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    /// Placeholder used to signal a device removal
    Null,
    /// Keyboard
    Keyboard,
    /// Mouse or other pointing device
    Mouse,
    /// Gamepad, joystick or wheel
    Joypad,
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeviceKind::Null => "Null",
            DeviceKind::Keyboard => "Keyboard",
            DeviceKind::Mouse => "Mouse",
            DeviceKind::Joypad => "Joypad",
        };
        f.write_str(name)
    }
}

/// A single named input (key, button, axis) and its current value
#[derive(Debug)]
pub struct HidInput {
    name: String,
    value: AtomicI16,
}

impl HidInput {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            value: AtomicI16::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> i16 {
        self.value.load(Ordering::Relaxed)
    }

    /// Store a new value and return the previous one
    pub fn set_value(&self, value: i16) -> i16 {
        self.value.swap(value, Ordering::Relaxed)
    }
}

/// A named group of inputs inside a device
#[derive(Debug)]
pub struct HidGroup {
    name: String,
    inputs: Vec<HidInput>,
}

impl HidGroup {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inputs(&self) -> &[HidInput] {
        &self.inputs
    }

    pub fn input(&self, id: u32) -> Option<&HidInput> {
        self.inputs.get(id as usize)
    }

    /// Find the index of an input by name
    pub fn find(&self, name: &str) -> Option<u32> {
        self.inputs
            .iter()
            .position(|input| input.name == name)
            .map(|index| index as u32)
    }
}

/// A physical device as reported by an input driver
///
/// The group layout is fixed once the device is built; only the input
/// values change afterwards.
#[derive(Debug)]
pub struct HidDevice {
    kind: DeviceKind,
    id: u64,
    name: String,
    groups: Vec<HidGroup>,
}

impl HidDevice {
    /// Create a device with no groups
    ///
    /// # Arguments
    /// * `kind` - Device kind
    /// * `id` - Stable numeric identifier (vendor/product/path packed by the driver)
    /// * `name` - Human readable name
    pub fn new(kind: DeviceKind, id: u64, name: &str) -> Self {
        Self {
            kind,
            id,
            name: name.to_string(),
            groups: Vec::new(),
        }
    }

    /// The null device, used to signal that a device went away
    pub fn null() -> Self {
        Self::new(DeviceKind::Null, 0, "Null")
    }

    /// Append a group of inputs (builder style)
    ///
    /// Groups are numbered in insertion order, so drivers must add them in
    /// the order given by the `keyboard`, `mouse` and `joypad` group ids.
    pub fn with_group(mut self, name: &str, inputs: &[&str]) -> Self {
        self.groups.push(HidGroup {
            name: name.to_string(),
            inputs: inputs.iter().map(|input| HidInput::new(input)).collect(),
        });
        self
    }

    /// Standard keyboard layout with a single button group
    pub fn keyboard(id: u64, name: &str, keys: &[&str]) -> Self {
        Self::new(DeviceKind::Keyboard, id, name).with_group("Button", keys)
    }

    /// Standard mouse layout: X/Y axes and three buttons
    pub fn mouse(id: u64, name: &str) -> Self {
        Self::new(DeviceKind::Mouse, id, name)
            .with_group("Axis", &["X", "Y"])
            .with_group("Button", &["Left", "Middle", "Right"])
    }

    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_null(&self) -> bool {
        self.kind == DeviceKind::Null
    }

    pub fn is_keyboard(&self) -> bool {
        self.kind == DeviceKind::Keyboard
    }

    pub fn is_mouse(&self) -> bool {
        self.kind == DeviceKind::Mouse
    }

    pub fn is_joypad(&self) -> bool {
        self.kind == DeviceKind::Joypad
    }

    pub fn groups(&self) -> &[HidGroup] {
        &self.groups
    }

    pub fn group(&self, id: u32) -> Option<&HidGroup> {
        self.groups.get(id as usize)
    }

    pub fn input(&self, group: u32, input: u32) -> Option<&HidInput> {
        self.group(group).and_then(|g| g.input(input))
    }

    /// Current value of an input, or 0 if it does not exist
    pub fn value(&self, group: u32, input: u32) -> i16 {
        self.input(group, input).map_or(0, HidInput::value)
    }

    /// Update an input and return the previous value
    ///
    /// # Returns
    /// `None` if the group or input does not exist
    pub fn set_value(&self, group: u32, input: u32, value: i16) -> Option<i16> {
        self.input(group, input).map(|i| i.set_value(value))
    }

    /// Whether `(group, input)` names the keyboard Escape key
    pub fn is_escape(&self, group: u32, input: u32) -> bool {
        self.is_keyboard()
            && group == keyboard::BUTTON
            && self.input(group, input).is_some_and(|i| i.name() == "Escape")
    }
}

/// Reference to a device inside a specific generation of a `DeviceTable`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceSlot {
    pub index: usize,
    pub generation: u64,
}

/// The list of currently enumerated devices
///
/// Every time the list actually changes the generation is bumped, which
/// invalidates all outstanding `DeviceSlot`s.
#[derive(Debug, Default)]
pub struct DeviceTable {
    devices: Vec<Arc<HidDevice>>,
    generation: u64,
}

impl DeviceTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn devices(&self) -> &[Arc<HidDevice>] {
        &self.devices
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Replace the device list if it differs from the current one
    ///
    /// Lists are compared element by element by identity, so a reordering
    /// counts as a change.
    ///
    /// # Returns
    /// `true` if the list changed and bindings must be re-resolved
    pub fn replace(&mut self, devices: Vec<Arc<HidDevice>>) -> bool {
        let unchanged = devices.len() == self.devices.len()
            && devices
                .iter()
                .zip(&self.devices)
                .all(|(new, old)| Arc::ptr_eq(new, old));
        if unchanged {
            return false;
        }
        self.devices = devices;
        self.generation += 1;
        true
    }

    /// Resolve a device id to a slot in the current generation
    pub fn resolve(&self, id: u64) -> Option<DeviceSlot> {
        self.devices
            .iter()
            .position(|device| device.id() == id)
            .map(|index| DeviceSlot {
                index,
                generation: self.generation,
            })
    }

    /// Fetch the device behind a slot, if the slot is still current
    pub fn get(&self, slot: DeviceSlot) -> Option<&Arc<HidDevice>> {
        if slot.generation != self.generation {
            return None;
        }
        self.devices.get(slot.index)
    }

    pub fn find(&self, id: u64) -> Option<&Arc<HidDevice>> {
        self.devices.iter().find(|device| device.id() == id)
    }
}
