// Per-console input topology
//
// A console declares its controller ports once, at construction: each
// `InputPort` lists the devices that can be plugged into it and each
// `InputDevice` lists its named inputs. Every input points at one mapping
// of the virtual ports (or a Lo/Hi pair of them for a bidirectional axis).
// The tree is immutable afterwards; only the bindings inside the mappings
// change.

use super::hid::DeviceTable;
use super::mapping::{InputMapping, MappingContext, AXIS_MAX};
use super::virtual_port::{MappingId, MouseControl, PadControl, VirtualPorts};

/// Two mappings combined into one bidirectional axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputPair {
    pub lo: MappingId,
    pub hi: MappingId,
}

impl InputPair {
    /// `hi - lo`, clamped to the analog range
    pub fn value(&self, ports: &VirtualPorts, devices: &DeviceTable, ctx: &MappingContext) -> i16 {
        let read = |id| {
            ports
                .mapping(id)
                .map_or(0, |m: &InputMapping| m.value(devices, ctx) as i32)
        };
        (read(self.hi) - read(self.lo)).clamp(-AXIS_MAX, AXIS_MAX) as i16
    }
}

/// Where an input gets its value from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSource {
    Single(MappingId),
    Pair(InputPair),
}

/// A named leaf input of a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputNode {
    name: String,
    source: InputSource,
}

impl InputNode {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> InputSource {
        self.source
    }

    /// Raw logical value (axis position, 0/1 for buttons)
    pub fn value(&self, ports: &VirtualPorts, devices: &DeviceTable, ctx: &MappingContext) -> i16 {
        match self.source {
            InputSource::Single(id) => ports.mapping(id).map_or(0, |m| m.value(devices, ctx)),
            InputSource::Pair(pair) => pair.value(ports, devices, ctx),
        }
    }

    /// Whether the input reads as pressed
    pub fn pressed(&self, ports: &VirtualPorts, devices: &DeviceTable, ctx: &MappingContext) -> bool {
        match self.source {
            InputSource::Single(id) => ports.mapping(id).is_some_and(|m| m.pressed(devices, ctx)),
            InputSource::Pair(pair) => pair.value(ports, devices, ctx) != 0,
        }
    }
}

/// A device that can be plugged into a port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputDevice {
    name: String,
    inputs: Vec<InputNode>,
}

impl InputDevice {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            inputs: Vec::new(),
        }
    }

    /// Add an input backed by a single mapping
    pub fn input(mut self, name: &str, mapping: MappingId) -> Self {
        self.inputs.push(InputNode {
            name: name.to_string(),
            source: InputSource::Single(mapping),
        });
        self
    }

    /// Add a bidirectional axis backed by a Lo/Hi pair of mappings
    pub fn pair(mut self, name: &str, lo: MappingId, hi: MappingId) -> Self {
        self.inputs.push(InputNode {
            name: name.to_string(),
            source: InputSource::Pair(InputPair { lo, hi }),
        });
        self
    }

    /// Gamepad whose inputs map one-to-one onto virtual pad controls
    ///
    /// # Arguments
    /// * `name` - Device name as the core knows it
    /// * `port` - Virtual port index
    /// * `layout` - `(core input name, virtual pad control)` pairs
    pub fn gamepad(name: &str, port: usize, layout: &[(&str, PadControl)]) -> Self {
        layout.iter().fold(Self::new(name), |device, (input, control)| {
            device.input(input, MappingId::pad(port, *control))
        })
    }

    /// Mouse with relative X/Y and three buttons
    pub fn mouse(name: &str, port: usize) -> Self {
        MouseControl::ALL.iter().fold(Self::new(name), |device, control| {
            device.input(control.name(), MappingId::mouse(port, *control))
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inputs(&self) -> &[InputNode] {
        &self.inputs
    }

    pub fn find(&self, name: &str) -> Option<&InputNode> {
        self.inputs.iter().find(|input| input.name == name)
    }
}

/// A controller port and the devices it accepts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputPort {
    name: String,
    devices: Vec<InputDevice>,
}

impl InputPort {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            devices: Vec::new(),
        }
    }

    pub fn device(mut self, device: InputDevice) -> Self {
        self.devices.push(device);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn devices(&self) -> &[InputDevice] {
        &self.devices
    }

    pub fn find(&self, name: &str) -> Option<&InputDevice> {
        self.devices.iter().find(|device| device.name == name)
    }
}

/// Resolve a `port/device/input` path in a port list
pub fn find_input<'a>(
    ports: &'a [InputPort],
    port: &str,
    device: &str,
    input: &str,
) -> Option<&'a InputNode> {
    ports
        .iter()
        .find(|p| p.name == port)?
        .find(device)?
        .find(input)
}
