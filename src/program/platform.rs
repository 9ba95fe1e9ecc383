// Platform hooks
//
// The callbacks a core makes while it runs a frame. Video frames are
// copied into the output buffer and their geometry latched; audio is
// drained, mixed to stereo, resampled and queued on the sink; input polls
// are resolved through the console's port declarations; trace messages go
// to the log and optionally to a trace file.

use super::screenshot::save_screenshot;
use crate::audio::{AudioSink, Frame, Mixer, Resampler};
use crate::emulator::{dispatch_input, Console};
use crate::engine::{AudioStream, CoreInput, InputKind, Node, Platform, Screen};
use crate::input::InputManager;
use crate::settings::AudioSettings;
use crate::video::{FrameBuffer, Latch};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Trace files are truncated once they grow past this size
pub const TRACE_LIMIT: u64 = 1 << 30;

/// Trace log written from core `log` callbacks
pub struct TraceFile {
    path: PathBuf,
    writer: BufWriter<File>,
    written: u64,
    limit: u64,
}

impl TraceFile {
    /// Create (or truncate) the trace file
    pub fn create(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(File::create(path)?),
            written: 0,
            limit: TRACE_LIMIT,
        })
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    /// Append one line, starting over when the file is full
    pub fn write_line(&mut self, tracer: &str, message: &str) -> io::Result<()> {
        let line = format!("{}: {}\n", tracer, message);
        if self.written + line.len() as u64 > self.limit {
            self.writer.flush()?;
            self.writer = BufWriter::new(File::create(&self.path)?);
            self.written = 0;
        }
        self.writer.write_all(line.as_bytes())?;
        self.written += line.len() as u64;
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// What the core's input polls are allowed to see
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputGate {
    /// Values come from the mappings
    Open,
    /// Buttons and axes read zero; rumble still reaches the devices
    Blocked,
}

/// Everything the hooks write into, owned by the session
pub struct Output {
    pub frame: FrameBuffer,
    mixer: Mixer,
    resampler: Option<Resampler>,
    sink: Box<dyn AudioSink>,
    scratch: Vec<Frame>,
    trace: Option<TraceFile>,
    /// Screenshot directory and game location, until the next frame arrives
    screenshot: Option<(PathBuf, Option<PathBuf>)>,
    /// Status text from the core and from deferred work
    messages: Vec<String>,
}

impl Output {
    pub fn new(sink: Box<dyn AudioSink>) -> Self {
        log::info!("Audio output: {} at {} Hz", sink.name(), sink.frequency());
        Self {
            frame: FrameBuffer::new(),
            mixer: Mixer::new(),
            resampler: None,
            sink,
            scratch: Vec::new(),
            trace: None,
            screenshot: None,
            messages: Vec::new(),
        }
    }

    /// Apply volume, balance and mute
    pub fn configure(&mut self, settings: &AudioSettings) {
        self.mixer.set_volume(settings.volume);
        self.mixer.set_balance(settings.balance);
        self.mixer.set_mute(settings.mute);
    }

    pub fn mixer(&self) -> &Mixer {
        &self.mixer
    }

    pub fn mixer_mut(&mut self) -> &mut Mixer {
        &mut self.mixer
    }

    pub fn sink(&self) -> &dyn AudioSink {
        &*self.sink
    }

    /// Drop queued audio, e.g. while paused
    pub fn clear_audio(&mut self) {
        self.sink.clear();
        if let Some(resampler) = self.resampler.as_mut() {
            resampler.reset();
        }
    }

    pub fn set_trace(&mut self, trace: Option<TraceFile>) {
        if let Some(mut old) = self.trace.take() {
            if let Err(e) = old.flush() {
                log::warn!("Could not flush {}: {}", old.path().display(), e);
            }
        }
        self.trace = trace;
    }

    pub fn trace(&self) -> Option<&TraceFile> {
        self.trace.as_ref()
    }

    /// Capture the next delivered frame
    pub fn request_screenshot(&mut self, directory: PathBuf, game: Option<PathBuf>) {
        self.screenshot = Some((directory, game));
    }

    pub fn screenshot_pending(&self) -> bool {
        self.screenshot.is_some()
    }

    pub fn push_message(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    pub fn take_messages(&mut self) -> Vec<String> {
        std::mem::take(&mut self.messages)
    }

    /// Forget the last frame and any resampling state
    pub fn reset(&mut self) {
        self.frame.clear();
        self.resampler = None;
        self.screenshot = None;
        self.clear_audio();
    }
}

/// Platform implementation handed to `Core::run`
pub struct Hooks<'a> {
    pub output: &'a mut Output,
    pub console: &'a Console,
    pub latch: &'a mut Latch,
    pub input: &'a InputManager,
    pub gate: InputGate,
}

impl Platform for Hooks<'_> {
    fn attach(&mut self, node: &Node) {
        match node {
            Node::Screen(screen) => {
                log::debug!("Attached screen {} ({}x{})", screen.name, screen.width, screen.height)
            }
            Node::Stream {
                name,
                channels,
                frequency,
            } => {
                log::debug!("Attached stream {} ({} ch, {} Hz)", name, channels, frequency);
                self.output.resampler = None;
            }
        }
    }

    fn detach(&mut self, node: &Node) {
        match node {
            Node::Screen(_) => self.output.frame.clear(),
            Node::Stream { .. } => self.output.resampler = None,
        }
    }

    fn video(&mut self, screen: &Screen, pixels: &[u32], pitch: usize, width: u32, height: u32) {
        self.output.frame.copy_from(pixels, pitch, width, height);
        self.latch.update(width, height, screen.rotation);

        if let Some((directory, game)) = self.output.screenshot.take() {
            let message = match save_screenshot(&self.output.frame, &directory, game.as_deref()) {
                Ok(path) => format!("Captured screenshot {}", path.display()),
                Err(e) => format!("Screenshot failed: {}", e),
            };
            self.output.messages.push(message);
        }
    }

    fn audio(&mut self, streams: &mut [AudioStream]) {
        let Some(first) = streams.first() else {
            return;
        };
        let input_rate = first.frequency();
        let output = &mut *self.output;
        let stale = output
            .resampler
            .as_ref()
            .map_or(true, |r| r.input_rate() != input_rate);
        if stale {
            let output_rate = f64::from(output.sink.frequency());
            output.resampler = Some(Resampler::new(input_rate, output_rate));
        }
        let Some(resampler) = output.resampler.as_mut() else {
            return;
        };

        while let Some(frame) = output.mixer.mix(streams) {
            resampler.process(frame, &mut output.scratch);
        }
        for frame in output.scratch.drain(..) {
            output.sink.output(frame);
        }
    }

    fn input(&mut self, input: &mut CoreInput) {
        if self.gate == InputGate::Blocked && input.kind != InputKind::Rumble {
            input.value = 0;
            return;
        }
        dispatch_input(self.console, input, self.input);
    }

    fn log(&mut self, tracer: &str, message: &str) {
        log::info!(target: "trace", "{}: {}", tracer, message);
        if let Some(trace) = self.output.trace.as_mut() {
            if let Err(e) = trace.write_line(tracer, message) {
                log::warn!("Trace file disabled: {}", e);
                self.output.trace = None;
            }
        }
    }

    fn status(&mut self, message: &str) {
        self.output.messages.push(message.to_string());
    }
}

/// Platform used while a core shuts down; only detach and text callbacks
/// have an effect
pub struct Teardown<'a> {
    pub output: &'a mut Output,
}

impl Platform for Teardown<'_> {
    fn attach(&mut self, _node: &Node) {}

    fn detach(&mut self, node: &Node) {
        if let Node::Screen(_) = node {
            self.output.frame.clear();
        }
        self.output.resampler = None;
    }

    fn video(&mut self, _screen: &Screen, _pixels: &[u32], _pitch: usize, _width: u32, _height: u32) {}

    fn audio(&mut self, streams: &mut [AudioStream]) {
        streams.iter_mut().for_each(AudioStream::clear);
    }

    fn input(&mut self, input: &mut CoreInput) {
        input.value = 0;
    }

    fn log(&mut self, tracer: &str, message: &str) {
        log::info!(target: "trace", "{}: {}", tracer, message);
    }

    fn status(&mut self, message: &str) {
        self.output.messages.push(message.to_string());
    }
}
