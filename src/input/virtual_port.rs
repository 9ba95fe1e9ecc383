// Virtual controller ports
//
// Every console declares its own controllers, but all of them point at the
// same canonical virtual devices: a modern twin-stick pad, a mouse and a
// keyboard. Binding a physical button to "South" once therefore drives the
// equivalent button on every console.

use super::hid::DeviceTable;
use super::mapping::{InputMapping, MappingKind};

/// Number of virtual controller ports
pub const VIRTUAL_PORTS: usize = 5;

/// Controls of the canonical pad
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PadControl {
    Up,
    Down,
    Left,
    Right,
    Select,
    Start,
    South,
    East,
    West,
    North,
    LBumper,
    RBumper,
    LTrigger,
    RTrigger,
    LStickClick,
    RStickClick,
    LStickUp,
    LStickDown,
    LStickLeft,
    LStickRight,
    RStickUp,
    RStickDown,
    RStickLeft,
    RStickRight,
    Rumble,
}

impl PadControl {
    pub const ALL: [PadControl; 25] = [
        PadControl::Up,
        PadControl::Down,
        PadControl::Left,
        PadControl::Right,
        PadControl::Select,
        PadControl::Start,
        PadControl::South,
        PadControl::East,
        PadControl::West,
        PadControl::North,
        PadControl::LBumper,
        PadControl::RBumper,
        PadControl::LTrigger,
        PadControl::RTrigger,
        PadControl::LStickClick,
        PadControl::RStickClick,
        PadControl::LStickUp,
        PadControl::LStickDown,
        PadControl::LStickLeft,
        PadControl::LStickRight,
        PadControl::RStickUp,
        PadControl::RStickDown,
        PadControl::RStickLeft,
        PadControl::RStickRight,
        PadControl::Rumble,
    ];

    pub fn name(self) -> &'static str {
        match self {
            PadControl::Up => "Up",
            PadControl::Down => "Down",
            PadControl::Left => "Left",
            PadControl::Right => "Right",
            PadControl::Select => "Select",
            PadControl::Start => "Start",
            PadControl::South => "South",
            PadControl::East => "East",
            PadControl::West => "West",
            PadControl::North => "North",
            PadControl::LBumper => "L-Bumper",
            PadControl::RBumper => "R-Bumper",
            PadControl::LTrigger => "L-Trigger",
            PadControl::RTrigger => "R-Trigger",
            PadControl::LStickClick => "L-Stick Click",
            PadControl::RStickClick => "R-Stick Click",
            PadControl::LStickUp => "L-Up",
            PadControl::LStickDown => "L-Down",
            PadControl::LStickLeft => "L-Left",
            PadControl::LStickRight => "L-Right",
            PadControl::RStickUp => "R-Up",
            PadControl::RStickDown => "R-Down",
            PadControl::RStickLeft => "R-Left",
            PadControl::RStickRight => "R-Right",
            PadControl::Rumble => "Rumble",
        }
    }

    pub fn kind(self) -> MappingKind {
        match self {
            PadControl::LTrigger
            | PadControl::RTrigger
            | PadControl::LStickUp
            | PadControl::LStickDown
            | PadControl::LStickLeft
            | PadControl::LStickRight
            | PadControl::RStickUp
            | PadControl::RStickDown
            | PadControl::RStickLeft
            | PadControl::RStickRight => MappingKind::Analog,
            PadControl::Rumble => MappingKind::Rumble,
            _ => MappingKind::Digital,
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Controls of the canonical mouse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseControl {
    X,
    Y,
    Left,
    Middle,
    Right,
}

impl MouseControl {
    pub const ALL: [MouseControl; 5] = [
        MouseControl::X,
        MouseControl::Y,
        MouseControl::Left,
        MouseControl::Middle,
        MouseControl::Right,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MouseControl::X => "X",
            MouseControl::Y => "Y",
            MouseControl::Left => "Left",
            MouseControl::Middle => "Middle",
            MouseControl::Right => "Right",
        }
    }

    pub fn kind(self) -> MappingKind {
        match self {
            MouseControl::X | MouseControl::Y => MappingKind::Relative,
            _ => MappingKind::Digital,
        }
    }
}

/// Keys of the canonical keyboard
pub const KEYBOARD_KEYS: &[&str] = &[
    "Escape", "F1", "F2", "F3", "F4", "F5", "F6", "F7", "F8", "F9", "F10", "F11", "F12", "1", "2",
    "3", "4", "5", "6", "7", "8", "9", "0", "Minus", "Equal", "Backspace", "Tab", "Q", "W", "E",
    "R", "T", "Y", "U", "I", "O", "P", "LeftBracket", "RightBracket", "Backslash", "CapsLock",
    "A", "S", "D", "F", "G", "H", "J", "K", "L", "Semicolon", "Apostrophe", "Enter", "LeftShift",
    "Z", "X", "C", "V", "B", "N", "M", "Comma", "Period", "Slash", "RightShift", "LeftControl",
    "LeftAlt", "Space", "RightAlt", "RightControl", "Up", "Down", "Left", "Right", "Insert",
    "Delete", "Home", "End", "PageUp", "PageDown",
];

/// Reference to a control inside one virtual port
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    Pad(PadControl),
    Mouse(MouseControl),
    Keyboard(usize),
}

/// Typed reference to one mapping of the virtual port set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MappingId {
    pub port: usize,
    pub control: Control,
}

impl MappingId {
    pub fn pad(port: usize, control: PadControl) -> Self {
        Self {
            port,
            control: Control::Pad(control),
        }
    }

    pub fn mouse(port: usize, control: MouseControl) -> Self {
        Self {
            port,
            control: Control::Mouse(control),
        }
    }

    /// Look a keyboard key up by name
    pub fn key(port: usize, name: &str) -> Option<Self> {
        KEYBOARD_KEYS
            .iter()
            .position(|key| *key == name)
            .map(|index| Self {
                port,
                control: Control::Keyboard(index),
            })
    }

    /// Stable key used in the settings file, e.g. `port1/pad/South`
    pub fn settings_key(&self) -> String {
        let (device, name) = match self.control {
            Control::Pad(c) => ("pad", c.name()),
            Control::Mouse(c) => ("mouse", c.name()),
            Control::Keyboard(i) => ("keyboard", KEYBOARD_KEYS.get(i).copied().unwrap_or("?")),
        };
        format!("port{}/{}/{}", self.port + 1, device, name)
    }
}

/// One virtual port: a pad, a mouse and a keyboard
#[derive(Debug, Clone)]
pub struct VirtualPort {
    pad: Vec<InputMapping>,
    mouse: Vec<InputMapping>,
    keyboard: Vec<InputMapping>,
}

impl VirtualPort {
    pub fn new() -> Self {
        Self {
            pad: PadControl::ALL
                .iter()
                .map(|c| InputMapping::new(c.name(), c.kind()))
                .collect(),
            mouse: MouseControl::ALL
                .iter()
                .map(|c| InputMapping::new(c.name(), c.kind()))
                .collect(),
            keyboard: KEYBOARD_KEYS
                .iter()
                .map(|k| InputMapping::new(k, MappingKind::Digital))
                .collect(),
        }
    }

    pub fn pad(&self, control: PadControl) -> &InputMapping {
        &self.pad[control.index()]
    }

    pub fn pad_mut(&mut self, control: PadControl) -> &mut InputMapping {
        &mut self.pad[control.index()]
    }

    pub fn mouse(&self, control: MouseControl) -> &InputMapping {
        &self.mouse[control as usize]
    }

    pub fn keyboard(&self) -> &[InputMapping] {
        &self.keyboard
    }

    fn bind(&mut self, devices: &DeviceTable) {
        for mapping in self
            .pad
            .iter_mut()
            .chain(self.mouse.iter_mut())
            .chain(self.keyboard.iter_mut())
        {
            mapping.bind(devices);
        }
    }
}

impl Default for VirtualPort {
    fn default() -> Self {
        Self::new()
    }
}

/// The full set of virtual ports
#[derive(Debug, Clone)]
pub struct VirtualPorts {
    ports: Vec<VirtualPort>,
}

impl VirtualPorts {
    pub fn new() -> Self {
        Self {
            ports: (0..VIRTUAL_PORTS).map(|_| VirtualPort::new()).collect(),
        }
    }

    pub fn port(&self, index: usize) -> Option<&VirtualPort> {
        self.ports.get(index)
    }

    pub fn port_mut(&mut self, index: usize) -> Option<&mut VirtualPort> {
        self.ports.get_mut(index)
    }

    pub fn mapping(&self, id: MappingId) -> Option<&InputMapping> {
        let port = self.ports.get(id.port)?;
        match id.control {
            Control::Pad(c) => Some(port.pad(c)),
            Control::Mouse(c) => Some(port.mouse(c)),
            Control::Keyboard(i) => port.keyboard.get(i),
        }
    }

    pub fn mapping_mut(&mut self, id: MappingId) -> Option<&mut InputMapping> {
        let port = self.ports.get_mut(id.port)?;
        match id.control {
            Control::Pad(c) => Some(port.pad_mut(c)),
            Control::Mouse(c) => port.mouse.get_mut(c as usize),
            Control::Keyboard(i) => port.keyboard.get_mut(i),
        }
    }

    /// Every mapping id, in port order
    pub fn ids(&self) -> Vec<MappingId> {
        let mut ids = Vec::new();
        for port in 0..self.ports.len() {
            ids.extend(PadControl::ALL.iter().map(|&c| MappingId::pad(port, c)));
            ids.extend(MouseControl::ALL.iter().map(|&c| MappingId::mouse(port, c)));
            ids.extend((0..KEYBOARD_KEYS.len()).map(|i| MappingId {
                port,
                control: Control::Keyboard(i),
            }));
        }
        ids
    }

    /// Re-resolve every binding of every port
    pub fn bind(&mut self, devices: &DeviceTable) {
        for port in &mut self.ports {
            port.bind(devices);
        }
    }
}

impl Default for VirtualPorts {
    fn default() -> Self {
        Self::new()
    }
}
