// Blank core
//
// A deterministic stand-in for a real emulation core. It exposes the same
// surface (screens, streams, controller ports, serialization, battery
// memory) so the whole front-end can run headless: the picture and the
// sound are derived from a frame counter, a linear feedback shift register
// seeded from the ROM, and the sum of every input the core polled.

use super::{
    AudioStream, Core, CoreError, CoreFactory, CoreInput, InputKind, Node, Platform, Port, Screen,
};
use crate::media::{Pak, PROGRAM_ROM};
use std::collections::BTreeMap;

/// Suffix of the battery memory file
pub const SAVE_RAM: &str = "sav";

/// Size of the battery memory
pub const SAVE_RAM_SIZE: usize = 8 * 1024;

/// Sample rate of the audio stream
pub const SAMPLE_RATE: f64 = 48000.0;

/// Audio frames produced per emulated frame
pub const SAMPLES_PER_FRAME: usize = 800;

const STATE_VERSION: u8 = 1;

/// A device the core accepts in a port, and the inputs it polls
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSpec {
    pub name: String,
    pub inputs: Vec<(String, InputKind)>,
}

/// A controller port of the core
#[derive(Debug, Clone, PartialEq)]
pub struct PortSpec {
    pub name: String,
    pub devices: Vec<DeviceSpec>,
}

/// Static description of one system the blank core emulates
#[derive(Debug, Clone, PartialEq)]
pub struct BlankSystem {
    pub width: u32,
    pub height: u32,
    pub rotation: u32,
    pub aspect: f64,
    pub ports: Vec<PortSpec>,
    /// Firmware types that must be readable from the firmware pak
    pub firmware: Vec<String>,
    /// Whether `change_medium` is supported
    pub hot_swap: bool,
}

impl Default for BlankSystem {
    fn default() -> Self {
        Self {
            width: 256,
            height: 240,
            rotation: 0,
            aspect: 1.0,
            ports: Vec::new(),
            firmware: Vec::new(),
            hot_swap: false,
        }
    }
}

struct BlankPort {
    spec: PortSpec,
    allocated: Option<usize>,
    connected: bool,
    inputs: Vec<CoreInput>,
}

impl BlankPort {
    fn new(spec: PortSpec) -> Self {
        Self {
            spec,
            allocated: None,
            connected: false,
            inputs: Vec::new(),
        }
    }
}

impl Port for BlankPort {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn allocate(&mut self, device: &str) -> bool {
        match self.spec.devices.iter().position(|d| d.name == device) {
            Some(index) => {
                self.allocated = Some(index);
                true
            }
            None => false,
        }
    }

    fn connect(&mut self) {
        let Some(device) = self.allocated.and_then(|i| self.spec.devices.get(i)) else {
            return;
        };
        self.inputs = device
            .inputs
            .iter()
            .map(|(name, kind)| CoreInput::new(&self.spec.name, &device.name, name, *kind))
            .collect();
        self.connected = true;
    }

    fn disconnect(&mut self) {
        self.inputs.clear();
        self.connected = false;
    }

    fn connected(&self) -> Option<&str> {
        if !self.connected {
            return None;
        }
        self.allocated
            .and_then(|i| self.spec.devices.get(i))
            .map(|d| d.name.as_str())
    }
}

/// Deterministic core instance
pub struct BlankCore {
    system: String,
    screen: Screen,
    stream: AudioStream,
    attached: bool,
    ports: Vec<BlankPort>,
    hot_swap: bool,
    medium: String,
    seed: u32,
    frame: u64,
    lfsr: u32,
    accumulator: i64,
    memory: Vec<u8>,
    pixels: Vec<u32>,
    run_ahead: bool,
    booleans: BTreeMap<String, bool>,
}

impl BlankCore {
    fn new(system: &str, spec: &BlankSystem, rom: &[u8], memory: Vec<u8>, medium: &str) -> Self {
        let mut screen = Screen::new("Screen", spec.width, spec.height);
        screen.rotation = spec.rotation;
        screen.aspect = spec.aspect;
        let pixels = vec![0; (spec.width * spec.height) as usize];
        let seed = rom_seed(rom);

        Self {
            system: system.to_string(),
            screen,
            stream: AudioStream::new("Audio", 2, SAMPLE_RATE),
            attached: false,
            ports: spec.ports.iter().cloned().map(BlankPort::new).collect(),
            hot_swap: spec.hot_swap,
            medium: medium.to_string(),
            seed,
            frame: 0,
            lfsr: seed,
            accumulator: 0,
            memory,
            pixels,
            run_ahead: false,
            booleans: BTreeMap::new(),
        }
    }

    /// Frames emulated since power on
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Name of the medium currently inserted
    pub fn medium(&self) -> &str {
        &self.medium
    }

    pub fn boolean(&self, name: &str) -> Option<bool> {
        self.booleans.get(name).copied()
    }

    fn step_lfsr(&mut self) {
        // 32-bit Galois LFSR, taps 32 31 29 1
        let lsb = self.lfsr & 1;
        self.lfsr >>= 1;
        if lsb != 0 {
            self.lfsr ^= 0xD000_0001;
        }
    }

    fn poll_inputs(&mut self, platform: &mut dyn Platform) {
        let pressed = self.accumulator != 0;
        for port in &mut self.ports {
            for input in &mut port.inputs {
                if input.kind == InputKind::Rumble {
                    input.strong = if pressed { u16::MAX } else { 0 };
                    input.weak = input.strong / 2;
                }
                platform.input(input);
                if input.kind != InputKind::Rumble {
                    self.accumulator = self.accumulator.wrapping_add(input.value as i64);
                }
            }
        }
    }

    fn render(&mut self) {
        let width = self.screen.width as usize;
        let shade = (self.lfsr & 0xff) ^ (self.frame as u32 & 0xff);
        for (i, pixel) in self.pixels.iter_mut().enumerate() {
            let x = (i % width) as u32;
            let y = (i / width) as u32;
            let v = (x ^ y ^ shade) & 0xff;
            *pixel = 0xff00_0000 | (v << 16) | ((v ^ 0x55) << 8) | (v ^ 0xaa);
        }
    }

    fn synthesize(&mut self) {
        let period = 64 + (self.lfsr % 64) as u64;
        let base = self.frame * SAMPLES_PER_FRAME as u64;
        for n in 0..SAMPLES_PER_FRAME as u64 {
            let sample = if (base + n) % period < period / 2 { 0.25 } else { -0.25 };
            self.stream.write(&[sample, sample]);
        }
    }
}

fn rom_seed(rom: &[u8]) -> u32 {
    // FNV-1a; a zero seed would lock the LFSR
    let hash = rom.iter().fold(0x811c_9dc5u32, |hash, byte| {
        (hash ^ *byte as u32).wrapping_mul(0x0100_0193)
    });
    hash.max(1)
}

struct Reader<'a> {
    data: &'a [u8],
}

impl<'a> Reader<'a> {
    fn take(&mut self, count: usize) -> Option<&'a [u8]> {
        if self.data.len() < count {
            return None;
        }
        let (head, tail) = self.data.split_at(count);
        self.data = tail;
        Some(head)
    }

    fn u8(&mut self) -> Option<u8> {
        self.take(1).map(|b| b[0])
    }

    fn u32(&mut self) -> Option<u32> {
        self.take(4)?.try_into().ok().map(u32::from_le_bytes)
    }

    fn u64(&mut self) -> Option<u64> {
        self.take(8)?.try_into().ok().map(u64::from_le_bytes)
    }
}

impl Core for BlankCore {
    fn name(&self) -> &str {
        &self.system
    }

    fn power(&mut self, reset: bool) {
        log::debug!("{} {}", self.system, if reset { "reset" } else { "power on" });
        self.frame = 0;
        self.lfsr = self.seed;
        self.accumulator = 0;
        self.stream.clear();
    }

    fn run(&mut self, platform: &mut dyn Platform) {
        if !self.attached {
            platform.attach(&Node::Screen(self.screen.clone()));
            platform.attach(&Node::Stream {
                name: self.stream.name().to_string(),
                channels: self.stream.channels(),
                frequency: self.stream.frequency(),
            });
            self.attached = true;
            platform.log(
                &self.system,
                &format!("attached, medium {}, seed {:08x}", self.medium, self.seed),
            );
        }

        self.poll_inputs(platform);
        self.step_lfsr();
        self.frame += 1;
        let index = (self.frame as usize) % self.memory.len().max(1);
        if let Some(byte) = self.memory.get_mut(index) {
            *byte = byte.wrapping_add(self.accumulator as u8);
        }

        if !self.run_ahead {
            self.render();
            let width = self.screen.width;
            let height = self.screen.height;
            platform.video(&self.screen, &self.pixels, width as usize, width, height);
            self.synthesize();
            platform.audio(std::slice::from_mut(&mut self.stream));
        }
    }

    fn serialize(&mut self, with_id: bool) -> Vec<u8> {
        let mut state = vec![STATE_VERSION, with_id as u8];
        if with_id {
            let name = self.system.as_bytes();
            state.push(name.len().min(u8::MAX as usize) as u8);
            state.extend_from_slice(&name[..name.len().min(u8::MAX as usize)]);
        }
        state.extend_from_slice(&self.frame.to_le_bytes());
        state.extend_from_slice(&self.lfsr.to_le_bytes());
        state.extend_from_slice(&self.accumulator.to_le_bytes());
        state.extend_from_slice(&(self.memory.len() as u32).to_le_bytes());
        state.extend_from_slice(&self.memory);
        state
    }

    fn unserialize(&mut self, state: &[u8]) -> bool {
        let mut reader = Reader { data: state };
        let parsed = (|| {
            if reader.u8()? != STATE_VERSION {
                return None;
            }
            if reader.u8()? != 0 {
                let len = reader.u8()? as usize;
                if reader.take(len)? != self.system.as_bytes() {
                    return None;
                }
            }
            let frame = reader.u64()?;
            let lfsr = reader.u32()?;
            let accumulator = reader.u64()? as i64;
            let len = reader.u32()? as usize;
            if len != self.memory.len() {
                return None;
            }
            let memory = reader.take(len)?.to_vec();
            reader.data.is_empty().then_some((frame, lfsr, accumulator, memory))
        })();

        match parsed {
            Some((frame, lfsr, accumulator, memory)) => {
                self.frame = frame;
                self.lfsr = lfsr;
                self.accumulator = accumulator;
                self.memory = memory;
                true
            }
            None => false,
        }
    }

    fn save(&mut self) -> Vec<(String, Vec<u8>)> {
        vec![(SAVE_RAM.to_string(), self.memory.clone())]
    }

    fn unload(&mut self, platform: &mut dyn Platform) {
        if !self.attached {
            return;
        }
        platform.detach(&Node::Stream {
            name: self.stream.name().to_string(),
            channels: self.stream.channels(),
            frequency: self.stream.frequency(),
        });
        platform.detach(&Node::Screen(self.screen.clone()));
        self.stream.clear();
        self.attached = false;
    }

    fn port(&mut self, name: &str) -> Option<&mut dyn Port> {
        self.ports
            .iter_mut()
            .find(|p| p.spec.name == name)
            .map(|p| p as &mut dyn Port)
    }

    fn ports(&self) -> Vec<String> {
        self.ports.iter().map(|p| p.spec.name.clone()).collect()
    }

    fn set_boolean(&mut self, name: &str, value: bool) -> bool {
        self.booleans.insert(name.to_string(), value);
        true
    }

    fn set_run_ahead(&mut self, enabled: bool) {
        self.run_ahead = enabled;
    }

    fn change_medium(&mut self, game: &dyn Pak) -> bool {
        if !self.hot_swap {
            return false;
        }
        self.medium = game.name().to_string();
        true
    }
}

/// Factory for every system registered with `system`
#[derive(Debug, Clone, Default)]
pub struct BlankFactory {
    systems: BTreeMap<String, BlankSystem>,
}

impl BlankFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a system
    pub fn system(mut self, name: &str, spec: BlankSystem) -> Self {
        self.systems.insert(name.to_string(), spec);
        self
    }

    pub fn supports(&self, name: &str) -> bool {
        self.systems.contains_key(name)
    }
}

impl CoreFactory for BlankFactory {
    fn load(&self, system: &str, game: &dyn Pak, firmware: &dyn Pak) -> Result<Box<dyn Core>, CoreError> {
        let spec = self
            .systems
            .get(system)
            .ok_or_else(|| CoreError::UnknownSystem(system.to_string()))?;

        for kind in &spec.firmware {
            if !firmware.read(kind).is_some_and(|data| !data.is_empty()) {
                return Err(CoreError::Other(format!("{} firmware '{}' is unreadable", system, kind)));
            }
        }

        let rom = game
            .read(PROGRAM_ROM)
            .filter(|rom| !rom.is_empty())
            .ok_or_else(|| CoreError::InvalidRom(game.location().display().to_string()))?;

        let mut memory = game.read(SAVE_RAM).unwrap_or_default();
        memory.resize(SAVE_RAM_SIZE, 0);

        log::debug!("Blank core: {} with {} byte ROM", system, rom.len());
        Ok(Box::new(BlankCore::new(system, spec, &rom, memory, game.name())))
    }
}
