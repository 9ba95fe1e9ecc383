// Console profiles
//
// Each supported console is a table: identity, medium extensions, the
// firmware it needs, the controller ports it declares to the input layer
// and the peripherals plugged in at load time. Per-game overrides (which
// pak goes into an N64 controller, for instance) are a small policy
// value rather than code.

use crate::engine::blank::{BlankFactory, BlankSystem, DeviceSpec, PortSpec};
use crate::engine::InputKind;
use crate::input::{InputDevice, InputPort, MappingId, MouseControl, PadControl};
use crate::media::Pak;

/// Firmware a console needs for one region
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Firmware {
    /// Firmware type, e.g. "BIOS"
    pub kind: String,
    /// Firmware region, e.g. "US"
    pub region: String,
    /// SHA-256 of a known good dump, informational only
    pub sha256: Option<String>,
}

/// A peripheral plugged into a core port at load time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub port: String,
    pub device: String,
}

impl Connection {
    fn new(port: &str, device: &str) -> Self {
        Self {
            port: port.to_string(),
            device: device.to_string(),
        }
    }
}

/// Per-game port overrides
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortPolicy {
    /// Always the default connections
    Fixed,
    /// Controller port 1 gets a Controller Pak or Rumble Pak depending on
    /// the game's `cpak` / `rpak` attributes
    ControllerPak,
}

/// A device in both forms: the input tree and what the core polls
struct Layout {
    device: InputDevice,
    spec: DeviceSpec,
}

impl Layout {
    fn new(name: &str) -> Self {
        Self {
            device: InputDevice::new(name),
            spec: DeviceSpec {
                name: name.to_string(),
                inputs: Vec::new(),
            },
        }
    }

    fn with(mut self, name: &str, mapping: MappingId, kind: InputKind) -> Self {
        self.device = self.device.input(name, mapping);
        self.spec.inputs.push((name.to_string(), kind));
        self
    }

    fn digital(self, name: &str, mapping: MappingId) -> Self {
        self.with(name, mapping, InputKind::Button)
    }

    fn analog(self, name: &str, mapping: MappingId) -> Self {
        self.with(name, mapping, InputKind::Axis)
    }

    fn rumble(self, name: &str, mapping: MappingId) -> Self {
        self.with(name, mapping, InputKind::Rumble)
    }

    fn axis(mut self, name: &str, lo: MappingId, hi: MappingId) -> Self {
        self.device = self.device.pair(name, lo, hi);
        self.spec.inputs.push((name.to_string(), InputKind::Axis));
        self
    }

    fn mouse(port: usize) -> Self {
        MouseControl::ALL
            .iter()
            .fold(Self::new("Mouse"), |layout, control| {
                let kind = match control {
                    MouseControl::X | MouseControl::Y => InputKind::Axis,
                    _ => InputKind::Button,
                };
                layout.with(control.name(), MappingId::mouse(port, *control), kind)
            })
    }
}

fn pad(port: usize, control: PadControl) -> MappingId {
    MappingId::pad(port, control)
}

/// Static description of one console
#[derive(Debug, Clone)]
pub struct Console {
    manufacturer: String,
    name: String,
    medium: String,
    extensions: Vec<String>,
    firmware: Vec<Firmware>,
    ports: Vec<InputPort>,
    core_ports: Vec<PortSpec>,
    connections: Vec<Connection>,
    policy: PortPolicy,
    tray: Option<String>,
    width: u32,
    height: u32,
    aspect: f64,
}

impl Console {
    fn new(manufacturer: &str, name: &str, extensions: &[&str], size: (u32, u32), aspect: f64) -> Self {
        Self {
            manufacturer: manufacturer.to_string(),
            name: name.to_string(),
            medium: name.to_string(),
            extensions: extensions.iter().map(|e| e.to_string()).collect(),
            firmware: Vec::new(),
            ports: Vec::new(),
            core_ports: Vec::new(),
            connections: Vec::new(),
            policy: PortPolicy::Fixed,
            tray: None,
            width: size.0,
            height: size.1,
            aspect,
        }
    }

    fn port(mut self, name: &str, layouts: Vec<Layout>) -> Self {
        let mut port = InputPort::new(name);
        let mut spec = PortSpec {
            name: name.to_string(),
            devices: Vec::new(),
        };
        for layout in layouts {
            port = port.device(layout.device);
            spec.devices.push(layout.spec);
        }
        self.ports.push(port);
        self.core_ports.push(spec);
        self
    }

    /// A core port whose devices have no inputs (memory cards, drives)
    fn peripheral(mut self, name: &str, devices: &[&str]) -> Self {
        self.core_ports.push(PortSpec {
            name: name.to_string(),
            devices: devices
                .iter()
                .map(|device| DeviceSpec {
                    name: device.to_string(),
                    inputs: Vec::new(),
                })
                .collect(),
        });
        self
    }

    fn connect(mut self, port: &str, device: &str) -> Self {
        self.connections.push(Connection::new(port, device));
        self
    }

    fn firmware(mut self, kind: &str, region: &str, sha256: &str) -> Self {
        self.firmware.push(Firmware {
            kind: kind.to_string(),
            region: region.to_string(),
            sha256: Some(sha256.to_string()),
        });
        self
    }

    fn medium(mut self, medium: &str) -> Self {
        self.medium = medium.to_string();
        self
    }

    fn tray(mut self, port: &str) -> Self {
        self.tray = Some(port.to_string());
        self
    }

    fn policy(mut self, policy: PortPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn manufacturer(&self) -> &str {
        &self.manufacturer
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Medium type, e.g. "Super Famicom" or "PlayStation"
    pub fn medium_name(&self) -> &str {
        &self.medium
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Whether a file extension belongs to this console's medium
    pub fn accepts(&self, extension: &str) -> bool {
        self.extensions
            .iter()
            .any(|e| e.eq_ignore_ascii_case(extension))
    }

    pub fn firmware_list(&self) -> &[Firmware] {
        &self.firmware
    }

    /// Controller ports declared to the input layer
    pub fn ports(&self) -> &[InputPort] {
        &self.ports
    }

    /// Port of the hot-swappable drive, if the console has one
    pub fn tray_port(&self) -> Option<&str> {
        self.tray.as_deref()
    }

    pub fn policy_kind(&self) -> PortPolicy {
        self.policy
    }

    /// Device connected to a port by default
    pub fn default_device(&self, port: &str) -> Option<&str> {
        self.connections
            .iter()
            .find(|c| c.port == port)
            .map(|c| c.device.as_str())
    }

    /// Firmware matching a game region
    ///
    /// Falls back to the first entry when nothing matches.
    pub fn firmware_for(&self, region: Option<&str>) -> Option<&Firmware> {
        let wanted = match region {
            Some("NTSC-U") | Some("NTSC") => "US",
            Some("NTSC-J") => "Japan",
            Some("PAL") => "Europe",
            _ => "",
        };
        self.firmware
            .iter()
            .find(|f| f.region == wanted)
            .or_else(|| self.firmware.first())
    }

    /// Peripherals to connect for a game
    pub fn connections(&self, game: &dyn Pak) -> Vec<Connection> {
        let mut connections = self.connections.clone();
        if self.policy == PortPolicy::ControllerPak {
            let enabled = |name: &str| {
                game.attribute(name)
                    .is_some_and(|v| v == "true" || v == "1")
            };
            if enabled("cpak") {
                connections.push(Connection::new("Controller Port 1/Pak", "Controller Pak"));
            } else if enabled("rpak") {
                connections.push(Connection::new("Controller Port 1/Pak", "Rumble Pak"));
            }
        }
        connections
    }

    /// Description of this console for the built-in core
    pub fn core_system(&self) -> BlankSystem {
        let mut firmware: Vec<String> = Vec::new();
        for entry in &self.firmware {
            if !firmware.contains(&entry.kind) {
                firmware.push(entry.kind.clone());
            }
        }
        BlankSystem {
            width: self.width,
            height: self.height,
            rotation: 0,
            aspect: self.aspect,
            ports: self.core_ports.clone(),
            firmware,
            hot_swap: self.tray.is_some(),
        }
    }
}

fn famicom() -> Console {
    let gamepad = |port| {
        Layout::new("Gamepad")
            .digital("Up", pad(port, PadControl::Up))
            .digital("Down", pad(port, PadControl::Down))
            .digital("Left", pad(port, PadControl::Left))
            .digital("Right", pad(port, PadControl::Right))
            .digital("B", pad(port, PadControl::West))
            .digital("A", pad(port, PadControl::South))
            .digital("Select", pad(port, PadControl::Select))
            .digital("Start", pad(port, PadControl::Start))
    };
    Console::new("Nintendo", "Famicom", &["fc", "nes", "unf", "unif"], (256, 240), 8.0 / 7.0)
        .port("Controller Port 1", vec![gamepad(0)])
        .port("Controller Port 2", vec![gamepad(1)])
        .connect("Controller Port 1", "Gamepad")
        .connect("Controller Port 2", "Gamepad")
}

fn super_famicom() -> Console {
    let gamepad = |port| {
        Layout::new("Gamepad")
            .digital("Up", pad(port, PadControl::Up))
            .digital("Down", pad(port, PadControl::Down))
            .digital("Left", pad(port, PadControl::Left))
            .digital("Right", pad(port, PadControl::Right))
            .digital("B", pad(port, PadControl::South))
            .digital("A", pad(port, PadControl::East))
            .digital("Y", pad(port, PadControl::West))
            .digital("X", pad(port, PadControl::North))
            .digital("L", pad(port, PadControl::LBumper))
            .digital("R", pad(port, PadControl::RBumper))
            .digital("Select", pad(port, PadControl::Select))
            .digital("Start", pad(port, PadControl::Start))
    };
    Console::new("Nintendo", "Super Famicom", &["sfc", "smc"], (256, 240), 8.0 / 7.0)
        .port("Controller Port 1", vec![gamepad(0)])
        .port("Controller Port 2", vec![gamepad(1), Layout::mouse(1)])
        .connect("Controller Port 1", "Gamepad")
        .connect("Controller Port 2", "Gamepad")
}

fn mega_drive() -> Console {
    let control_pad = |port| {
        Layout::new("Control Pad")
            .digital("Up", pad(port, PadControl::Up))
            .digital("Down", pad(port, PadControl::Down))
            .digital("Left", pad(port, PadControl::Left))
            .digital("Right", pad(port, PadControl::Right))
            .digital("A", pad(port, PadControl::West))
            .digital("B", pad(port, PadControl::South))
            .digital("C", pad(port, PadControl::East))
            .digital("Start", pad(port, PadControl::Start))
    };
    let fighting_pad = |port| {
        Layout::new("Fighting Pad")
            .digital("Up", pad(port, PadControl::Up))
            .digital("Down", pad(port, PadControl::Down))
            .digital("Left", pad(port, PadControl::Left))
            .digital("Right", pad(port, PadControl::Right))
            .digital("A", pad(port, PadControl::West))
            .digital("B", pad(port, PadControl::South))
            .digital("C", pad(port, PadControl::East))
            .digital("X", pad(port, PadControl::LBumper))
            .digital("Y", pad(port, PadControl::North))
            .digital("Z", pad(port, PadControl::RBumper))
            .digital("Mode", pad(port, PadControl::Select))
            .digital("Start", pad(port, PadControl::Start))
    };
    Console::new("Sega", "Mega Drive", &["md", "gen", "smd"], (320, 224), 1.0)
        .port("Controller Port 1", vec![control_pad(0), fighting_pad(0)])
        .port("Controller Port 2", vec![control_pad(1), fighting_pad(1)])
        .connect("Controller Port 1", "Control Pad")
        .connect("Controller Port 2", "Control Pad")
}

fn playstation() -> Console {
    let digital = |layout: Layout, port| {
        layout
            .digital("Up", pad(port, PadControl::Up))
            .digital("Down", pad(port, PadControl::Down))
            .digital("Left", pad(port, PadControl::Left))
            .digital("Right", pad(port, PadControl::Right))
            .digital("Cross", pad(port, PadControl::South))
            .digital("Circle", pad(port, PadControl::East))
            .digital("Square", pad(port, PadControl::West))
            .digital("Triangle", pad(port, PadControl::North))
            .digital("L1", pad(port, PadControl::LBumper))
            .digital("L2", pad(port, PadControl::LTrigger))
            .digital("R1", pad(port, PadControl::RBumper))
            .digital("R2", pad(port, PadControl::RTrigger))
            .digital("Select", pad(port, PadControl::Select))
            .digital("Start", pad(port, PadControl::Start))
    };
    let dualshock = |port| {
        digital(Layout::new("DualShock"), port)
            .digital("L3", pad(port, PadControl::LStickClick))
            .digital("R3", pad(port, PadControl::RStickClick))
            .analog("L-Up", pad(port, PadControl::LStickUp))
            .analog("L-Down", pad(port, PadControl::LStickDown))
            .analog("L-Left", pad(port, PadControl::LStickLeft))
            .analog("L-Right", pad(port, PadControl::LStickRight))
            .analog("R-Up", pad(port, PadControl::RStickUp))
            .analog("R-Down", pad(port, PadControl::RStickDown))
            .analog("R-Left", pad(port, PadControl::RStickLeft))
            .analog("R-Right", pad(port, PadControl::RStickRight))
            .axis(
                "L-Stick X",
                pad(port, PadControl::LStickLeft),
                pad(port, PadControl::LStickRight),
            )
            .axis(
                "L-Stick Y",
                pad(port, PadControl::LStickUp),
                pad(port, PadControl::LStickDown),
            )
            .axis(
                "R-Stick X",
                pad(port, PadControl::RStickLeft),
                pad(port, PadControl::RStickRight),
            )
            .axis(
                "R-Stick Y",
                pad(port, PadControl::RStickUp),
                pad(port, PadControl::RStickDown),
            )
            .rumble("Rumble", pad(port, PadControl::Rumble))
    };
    Console::new("Sony", "PlayStation", &["cue", "chd", "exe"], (320, 240), 1.0)
        .medium("PlayStation Disc")
        .firmware(
            "BIOS",
            "US",
            "11052b6499e466bbf0a709b1f9cb6834a9418e66680387912451e971cf8a1fef",
        )
        .firmware(
            "BIOS",
            "Japan",
            "9c0421858e217805f4abe18698afea8d5aa36ff0727eb8484944e00eb5e7eadb",
        )
        .firmware(
            "BIOS",
            "Europe",
            "1faaa18fa820a0225e488d9f086296b8e6c46df739666093987ff7d8fd352c09",
        )
        .port(
            "Controller Port 1",
            vec![digital(Layout::new("Digital Gamepad"), 0), dualshock(0)],
        )
        .port(
            "Controller Port 2",
            vec![digital(Layout::new("Digital Gamepad"), 1), dualshock(1)],
        )
        .peripheral("Memory Card Port 1", &["Memory Card"])
        .peripheral("Memory Card Port 2", &["Memory Card"])
        .peripheral("PlayStation/Disc Tray", &["Disc"])
        .tray("PlayStation/Disc Tray")
        .connect("PlayStation/Disc Tray", "Disc")
        .connect("Controller Port 1", "Digital Gamepad")
        .connect("Controller Port 2", "Digital Gamepad")
        .connect("Memory Card Port 1", "Memory Card")
}

fn nintendo_64() -> Console {
    let gamepad = |port| {
        Layout::new("Gamepad")
            .digital("Up", pad(port, PadControl::Up))
            .digital("Down", pad(port, PadControl::Down))
            .digital("Left", pad(port, PadControl::Left))
            .digital("Right", pad(port, PadControl::Right))
            .digital("A", pad(port, PadControl::South))
            .digital("B", pad(port, PadControl::West))
            .digital("C-Up", pad(port, PadControl::RStickUp))
            .digital("C-Down", pad(port, PadControl::RStickDown))
            .digital("C-Left", pad(port, PadControl::RStickLeft))
            .digital("C-Right", pad(port, PadControl::RStickRight))
            .digital("L", pad(port, PadControl::LBumper))
            .digital("R", pad(port, PadControl::RBumper))
            .digital("Z", pad(port, PadControl::LTrigger))
            .digital("Start", pad(port, PadControl::Start))
            .axis(
                "X-Axis",
                pad(port, PadControl::LStickLeft),
                pad(port, PadControl::LStickRight),
            )
            .axis(
                "Y-Axis",
                pad(port, PadControl::LStickUp),
                pad(port, PadControl::LStickDown),
            )
            .rumble("Rumble", pad(port, PadControl::Rumble))
    };
    let mut console = Console::new("Nintendo", "Nintendo 64", &["n64", "z64", "v64"], (320, 240), 1.0);
    for port in 0..4 {
        console = console.port(&format!("Controller Port {}", port + 1), vec![gamepad(port)]);
    }
    console
        .peripheral("Controller Port 1/Pak", &["Controller Pak", "Rumble Pak"])
        .connect("Controller Port 1", "Gamepad")
        .policy(PortPolicy::ControllerPak)
}

fn game_boy() -> Console {
    let controls = Layout::new("Controls")
        .digital("Up", pad(0, PadControl::Up))
        .digital("Down", pad(0, PadControl::Down))
        .digital("Left", pad(0, PadControl::Left))
        .digital("Right", pad(0, PadControl::Right))
        .digital("B", pad(0, PadControl::South))
        .digital("A", pad(0, PadControl::East))
        .digital("Select", pad(0, PadControl::Select))
        .digital("Start", pad(0, PadControl::Start));
    Console::new("Nintendo", "Game Boy", &["gb"], (160, 144), 1.0)
        .port("Game Boy", vec![controls])
        .connect("Game Boy", "Controls")
}

/// Every console the front-end knows about
pub fn consoles() -> Vec<Console> {
    vec![
        famicom(),
        super_famicom(),
        mega_drive(),
        playstation(),
        nintendo_64(),
        game_boy(),
    ]
}

/// Built-in core factory able to run every given console
pub fn blank_factory(consoles: &[Console]) -> BlankFactory {
    consoles
        .iter()
        .fold(BlankFactory::new(), |factory, console| {
            factory.system(console.name(), console.core_system())
        })
}
