// Emulation engine interface
//
// The front-end never emulates hardware itself. It drives a core through
// the `Core` trait (power, run one frame, serialize, port topology) and the
// core calls back into the front-end through `Platform` while it runs:
// `attach`/`detach` for screens and audio streams, `video` once per frame,
// `audio` when samples are pending, `input` whenever it polls a control,
// and `log`/`status` for text.

pub mod blank;

pub use blank::{BlankCore, BlankFactory};

use crate::media::Pak;
use std::collections::VecDeque;
use std::fmt;
use std::time::Instant;
use thiserror::Error;

/// Errors a core factory can report while instantiating a console
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    #[error("the core does not support '{0}'")]
    UnknownSystem(String),
    #[error("invalid ROM: {0}")]
    InvalidRom(String),
    #[error("{0}")]
    Other(String),
}

/// A video output of the core
#[derive(Debug, Clone, PartialEq)]
pub struct Screen {
    pub name: String,
    /// Native resolution in pixels
    pub width: u32,
    pub height: u32,
    /// Display rotation in degrees (0, 90, 180 or 270)
    pub rotation: u32,
    /// Pixel aspect ratio (width / height of one pixel)
    pub aspect: f64,
}

impl Screen {
    pub fn new(name: &str, width: u32, height: u32) -> Self {
        Self {
            name: name.to_string(),
            width,
            height,
            rotation: 0,
            aspect: 1.0,
        }
    }
}

/// A sample stream produced by the core
#[derive(Debug, Clone)]
pub struct AudioStream {
    name: String,
    channels: usize,
    frequency: f64,
    samples: VecDeque<f64>,
}

impl AudioStream {
    pub fn new(name: &str, channels: usize, frequency: f64) -> Self {
        Self {
            name: name.to_string(),
            channels: channels.max(1),
            frequency,
            samples: VecDeque::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    /// Queue one frame (one sample per channel)
    pub fn write(&mut self, frame: &[f64]) {
        for channel in 0..self.channels {
            self.samples.push_back(frame.get(channel).copied().unwrap_or(0.0));
        }
    }

    /// Whether at least one full frame is queued
    pub fn pending(&self) -> bool {
        self.samples.len() >= self.channels
    }

    /// Number of full frames queued
    pub fn pending_frames(&self) -> usize {
        self.samples.len() / self.channels
    }

    /// Dequeue one frame into `frame`
    ///
    /// # Returns
    /// Number of channels written, 0 if nothing was pending
    pub fn read(&mut self, frame: &mut [f64]) -> usize {
        if !self.pending() {
            return 0;
        }
        for channel in 0..self.channels {
            let sample = self.samples.pop_front().unwrap_or(0.0);
            if let Some(slot) = frame.get_mut(channel) {
                *slot = sample;
            }
        }
        self.channels
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

/// Kind of node announced through `Platform::attach`/`detach`
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Screen(Screen),
    Stream { name: String, channels: usize, frequency: f64 },
}

/// What a polled input expects back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    /// Digital control, 0 or 1
    Button,
    /// Analog or pointer axis
    Axis,
    /// Force feedback actuator; the core fills in the motor levels
    Rumble,
}

/// A core-side input node polled through `Platform::input`
#[derive(Debug, Clone)]
pub struct CoreInput {
    pub port: String,
    pub device: String,
    pub name: String,
    pub kind: InputKind,
    /// Value written back by the front-end
    pub value: i16,
    /// Motor levels requested by the core (rumble nodes only)
    pub strong: u16,
    pub weak: u16,
    /// Time of the last front-end read, used to throttle polling
    pub last_poll: Option<Instant>,
}

impl CoreInput {
    pub fn new(port: &str, device: &str, name: &str, kind: InputKind) -> Self {
        Self {
            port: port.to_string(),
            device: device.to_string(),
            name: name.to_string(),
            kind,
            value: 0,
            strong: 0,
            weak: 0,
            last_poll: None,
        }
    }

    pub fn pressed(&self) -> bool {
        self.value != 0
    }
}

/// Callbacks the core invokes while it runs
pub trait Platform {
    /// A screen or stream came into existence
    fn attach(&mut self, node: &Node);

    /// A screen or stream is about to go away
    fn detach(&mut self, node: &Node);

    /// A frame finished rendering
    ///
    /// `pixels` is `pitch` pixels per row, of which `width` are visible.
    fn video(&mut self, screen: &Screen, pixels: &[u32], pitch: usize, width: u32, height: u32);

    /// Samples are pending on one or more streams
    fn audio(&mut self, streams: &mut [AudioStream]);

    /// The core polls an input node
    fn input(&mut self, input: &mut CoreInput);

    /// Trace output from a core component
    fn log(&mut self, _tracer: &str, _message: &str) {}

    /// Short user-facing status text
    fn status(&mut self, _message: &str) {}
}

/// A controller port inside the core's node tree
pub trait Port {
    fn name(&self) -> &str;

    /// Choose the peripheral plugged into the port
    ///
    /// # Returns
    /// `false` if the port does not accept this device
    fn allocate(&mut self, device: &str) -> bool;

    fn connect(&mut self);

    fn disconnect(&mut self);

    /// Name of the connected peripheral, if any
    fn connected(&self) -> Option<&str>;
}

/// An instantiated console
pub trait Core: Send {
    fn name(&self) -> &str;

    /// Power on (or reset, if `reset` is set)
    fn power(&mut self, reset: bool);

    /// Emulate exactly one frame
    fn run(&mut self, platform: &mut dyn Platform);

    /// Serialize the complete machine state
    ///
    /// With `with_id` the blob starts with an identifier of the core so a
    /// state from another console is rejected by `unserialize`.
    fn serialize(&mut self, with_id: bool) -> Vec<u8>;

    /// Restore a state produced by `serialize`
    ///
    /// # Returns
    /// `false` (and no change) if the blob is rejected
    fn unserialize(&mut self, state: &[u8]) -> bool;

    /// Battery-backed memory to persist, as `(file name, contents)` pairs
    fn save(&mut self) -> Vec<(String, Vec<u8>)>;

    /// Tear the node tree down, detaching screens and streams
    fn unload(&mut self, platform: &mut dyn Platform);

    /// Look a controller port up by name
    fn port(&mut self, name: &str) -> Option<&mut dyn Port>;

    /// Names of all controller ports
    fn ports(&self) -> Vec<String>;

    /// Set a boolean setting node (e.g. "Color Emulation")
    fn set_boolean(&mut self, _name: &str, _value: bool) -> bool {
        false
    }

    /// Flag the next frame as a speculative run-ahead frame
    fn set_run_ahead(&mut self, _enabled: bool) {}

    /// Swap the medium of a hot-swappable drive
    fn change_medium(&mut self, _game: &dyn Pak) -> bool {
        false
    }
}

/// Creates cores for the systems it supports
pub trait CoreFactory: Send + Sync {
    /// Instantiate `system` with the given game and firmware
    fn load(&self, system: &str, game: &dyn Pak, firmware: &dyn Pak) -> Result<Box<dyn Core>, CoreError>;
}

impl fmt::Debug for dyn Core {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Core").field("name", &self.name()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_frames() {
        let mut stream = AudioStream::new("Audio", 2, 48000.0);
        assert!(!stream.pending());

        stream.write(&[0.25, -0.25]);
        stream.write(&[0.5]);
        assert_eq!(stream.pending_frames(), 2);

        let mut frame = [0.0; 2];
        assert_eq!(stream.read(&mut frame), 2);
        assert_eq!(frame, [0.25, -0.25]);
        assert_eq!(stream.read(&mut frame), 2);
        assert_eq!(frame, [0.5, 0.0]);
        assert_eq!(stream.read(&mut frame), 0);
    }

    #[test]
    fn test_mono_stream_reads_one_channel() {
        let mut stream = AudioStream::new("PSG", 1, 44100.0);
        stream.write(&[0.1, 0.9]);
        let mut frame = [0.0; 2];
        assert_eq!(stream.read(&mut frame), 1);
        assert_eq!(frame[0], 0.1);
    }
}
