// Input mapping engine
//
// An `InputMapping` connects one logical control (a pad button, an analog
// stick half, a mouse axis, a rumble motor or a hotkey) to up to
// `BINDING_LIMIT` physical inputs. It stores the persisted assignments and
// their resolved bindings, decides whether a raw transition should be
// captured into a slot, and computes the logical value each frame.

use super::binding::{Assignment, Binding, Qualifier, BINDING_LIMIT};
use super::driver::InputDriver;
use super::hid::{joypad, keyboard, mouse, DeviceTable, HidDevice, AXIS_THRESHOLD};

/// Full-scale magnitude of an analog value
pub const AXIS_MAX: i32 = 32767;

/// How a mapping interprets its bound inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MappingKind {
    /// On/off control; bindings are OR-ed together
    Digital,
    /// Half-axis control; contributions are summed and clamped
    Analog,
    /// Absolute pointer position
    Absolute,
    /// Relative pointer motion
    Relative,
    /// Force feedback actuator with no readable value
    Rumble,
    /// Front-end hotkey; like Digital but ignores keyboard capture
    Hotkey,
}

/// Per-frame state that affects how bindings are read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MappingContext {
    /// The console is in a text entry mode that owns the physical keyboard
    pub keyboard_captured: bool,
    /// The mouse is captured by the front-end window
    pub mouse_acquired: bool,
}

#[derive(Debug, Clone)]
pub struct InputMapping {
    name: String,
    kind: MappingKind,
    assignments: [Option<Assignment>; BINDING_LIMIT],
    bindings: [Option<Binding>; BINDING_LIMIT],
}

impl InputMapping {
    pub fn new(name: &str, kind: MappingKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            assignments: [None; BINDING_LIMIT],
            bindings: [None; BINDING_LIMIT],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> MappingKind {
        self.kind
    }

    pub fn assignments(&self) -> &[Option<Assignment>; BINDING_LIMIT] {
        &self.assignments
    }

    pub fn assignment(&self, index: usize) -> Option<Assignment> {
        self.assignments.get(index).copied().flatten()
    }

    pub fn bindings(&self) -> &[Option<Binding>; BINDING_LIMIT] {
        &self.bindings
    }

    pub fn binding(&self, index: usize) -> Option<Binding> {
        self.bindings.get(index).copied().flatten()
    }

    /// Whether any slot holds an assignment
    pub fn is_bound(&self) -> bool {
        self.assignments.iter().any(Option::is_some)
    }

    /// Re-resolve every binding from its assignment and the device list
    pub fn bind(&mut self, devices: &DeviceTable) {
        for (binding, assignment) in self.bindings.iter_mut().zip(&self.assignments) {
            *binding = assignment.map(|a| Binding::resolve(a, devices));
        }
    }

    /// Store an assignment in one slot and resolve it
    ///
    /// Out of range indices are ignored.
    pub fn bind_assignment(&mut self, index: usize, assignment: Assignment, devices: &DeviceTable) {
        if index >= BINDING_LIMIT {
            return;
        }
        self.assignments[index] = Some(assignment);
        self.bindings[index] = Some(Binding::resolve(assignment, devices));
    }

    /// Replace all slots at once, e.g. after loading settings
    pub fn set_assignments(
        &mut self,
        assignments: [Option<Assignment>; BINDING_LIMIT],
        devices: &DeviceTable,
    ) {
        self.assignments = assignments;
        self.bind(devices);
    }

    /// Clear every slot
    pub fn unbind(&mut self) {
        self.assignments = [None; BINDING_LIMIT];
        self.bindings = [None; BINDING_LIMIT];
    }

    /// Clear a single slot
    pub fn unbind_slot(&mut self, index: usize) {
        if index < BINDING_LIMIT {
            self.assignments[index] = None;
            self.bindings[index] = None;
        }
    }

    /// Decide whether a raw input transition should be captured into `index`
    ///
    /// A null device or the keyboard Escape key always clears the slot.
    /// Otherwise the rules depend on the mapping kind:
    /// - Digital, Analog, Hotkey: any button going 0 -> nonzero, or a joypad
    ///   axis/hat/trigger crossing the half-scale threshold (captured as
    ///   `Lo` when crossing downward, `Hi` when crossing upward).
    /// - Absolute, Relative: any mouse axis movement, or a joypad axis
    ///   moving out of the threshold dead zone.
    /// - Rumble: a joypad button press selects that joypad's motor.
    ///
    /// # Returns
    /// `true` if the slot was bound or unbound and the transition consumed
    #[allow(clippy::too_many_arguments)]
    pub fn capture(
        &mut self,
        index: usize,
        device: &HidDevice,
        group: u32,
        input: u32,
        old_value: i16,
        new_value: i16,
        devices: &DeviceTable,
    ) -> bool {
        if device.is_null() || device.is_escape(group, input) {
            self.unbind_slot(index);
            return true;
        }

        let qualifier = match self.kind {
            MappingKind::Digital | MappingKind::Analog | MappingKind::Hotkey => {
                button_capture(device, group, old_value, new_value)
            }
            MappingKind::Absolute | MappingKind::Relative => {
                axis_capture(device, group, old_value, new_value)
            }
            MappingKind::Rumble => {
                let pressed = old_value == 0 && new_value != 0;
                (device.is_joypad() && group == joypad::BUTTON && pressed)
                    .then_some(Qualifier::Rumble)
            }
        };

        match qualifier {
            Some(qualifier) => {
                let assignment = Assignment::new(device.id(), group, input, qualifier);
                self.bind_assignment(index, assignment, devices);
                log::debug!("Bound {} slot {} to {}", self.name, index, assignment);
                true
            }
            None => false,
        }
    }

    /// Logical value of the mapping for this frame
    ///
    /// Digital and Hotkey mappings return 0 or 1. Analog, Absolute and
    /// Relative mappings return a sum clamped to +/-32767. Rumble mappings
    /// always read 0.
    pub fn value(&self, devices: &DeviceTable, context: &MappingContext) -> i16 {
        let mut result: i32 = 0;

        for binding in self.bindings.iter().flatten() {
            let Some(device) = binding.slot.and_then(|slot| devices.get(slot)) else {
                continue;
            };
            if device.is_keyboard() && context.keyboard_captured && self.kind != MappingKind::Hotkey
            {
                continue;
            }

            let a = binding.assignment;
            let value = device.value(a.group, a.input);

            match self.kind {
                MappingKind::Digital | MappingKind::Hotkey => {
                    if digital_contribution(device, a.group, a.qualifier, value, context) {
                        result = 1;
                    }
                }
                MappingKind::Analog => {
                    result += analog_contribution(device, a.group, a.qualifier, value, context);
                }
                MappingKind::Absolute | MappingKind::Relative => {
                    result += axis_contribution(device, a.group, value, context);
                }
                MappingKind::Rumble => {}
            }
        }

        result.clamp(-AXIS_MAX, AXIS_MAX) as i16
    }

    /// Whether the mapping currently reads as pressed
    ///
    /// Analog mappings count as pressed past the half-scale threshold.
    pub fn pressed(&self, devices: &DeviceTable, context: &MappingContext) -> bool {
        let value = self.value(devices, context);
        match self.kind {
            MappingKind::Analog => value > AXIS_THRESHOLD,
            _ => value != 0,
        }
    }

    /// Push a force feedback request to every connected bound device
    pub fn rumble(&self, devices: &DeviceTable, driver: &mut dyn InputDriver, strong: u16, weak: u16) {
        if self.kind != MappingKind::Rumble {
            return;
        }
        for binding in self.bindings.iter().flatten() {
            if let Some(device) = binding.slot.and_then(|slot| devices.get(slot)) {
                driver.rumble(device.id(), strong, weak);
            }
        }
    }
}

fn button_group(device: &HidDevice, group: u32) -> bool {
    (device.is_keyboard() && group == keyboard::BUTTON)
        || (device.is_mouse() && group == mouse::BUTTON)
        || (device.is_joypad() && group == joypad::BUTTON)
}

fn button_capture(device: &HidDevice, group: u32, old_value: i16, new_value: i16) -> Option<Qualifier> {
    if button_group(device, group) {
        return (old_value == 0 && new_value != 0).then_some(Qualifier::None);
    }
    if device.is_joypad() {
        if old_value >= -AXIS_THRESHOLD && new_value < -AXIS_THRESHOLD {
            return Some(Qualifier::Lo);
        }
        if old_value <= AXIS_THRESHOLD && new_value > AXIS_THRESHOLD {
            return Some(Qualifier::Hi);
        }
    }
    None
}

fn axis_capture(device: &HidDevice, group: u32, old_value: i16, new_value: i16) -> Option<Qualifier> {
    if device.is_mouse() && group == mouse::AXIS {
        return Some(Qualifier::None);
    }
    if device.is_joypad() && group == joypad::AXIS {
        // Either threshold, crossed in either direction
        let crossed = |edge: i16| {
            (old_value >= edge && new_value < edge) || (old_value <= edge && new_value > edge)
        };
        return (crossed(-AXIS_THRESHOLD) || crossed(AXIS_THRESHOLD)).then_some(Qualifier::None);
    }
    None
}

fn digital_contribution(
    device: &HidDevice,
    group: u32,
    qualifier: Qualifier,
    value: i16,
    context: &MappingContext,
) -> bool {
    if device.is_mouse() && group == mouse::BUTTON {
        return context.mouse_acquired && value != 0;
    }
    if button_group(device, group) {
        return value != 0;
    }
    if device.is_joypad() {
        return match qualifier {
            Qualifier::Lo => value < -AXIS_THRESHOLD,
            Qualifier::Hi => value > AXIS_THRESHOLD,
            _ => false,
        };
    }
    false
}

fn analog_contribution(
    device: &HidDevice,
    group: u32,
    qualifier: Qualifier,
    value: i16,
    context: &MappingContext,
) -> i32 {
    if button_group(device, group) {
        let live = !device.is_mouse() || context.mouse_acquired;
        return if live && value != 0 { AXIS_MAX } else { 0 };
    }
    if device.is_joypad() {
        let value = value as i32;
        return match qualifier {
            Qualifier::Lo if value < 0 => value.abs().min(AXIS_MAX),
            Qualifier::Hi if value > 0 => value,
            _ => 0,
        };
    }
    0
}

fn axis_contribution(device: &HidDevice, group: u32, value: i16, context: &MappingContext) -> i32 {
    if device.is_mouse() && group == mouse::AXIS && context.mouse_acquired {
        return value as i32;
    }
    if device.is_joypad() && group == joypad::AXIS {
        return value as i32;
    }
    0
}
