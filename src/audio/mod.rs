// Audio module - Output of the mixed core audio
//
// This module provides:
// - Mixing of every core stream into one stereo frame (volume, mute, balance)
// - Sample rate conversion from the stream rate to the device rate
// - Cross-platform output using cpal (behind the `audio` feature)
// - A null sink for headless runs and a recording sink for tests

pub mod mixer;
#[cfg(feature = "audio")]
pub mod output;
pub mod resampler;

pub use mixer::Mixer;
#[cfg(feature = "audio")]
pub use output::{AudioConfig, CpalSink};
pub use resampler::{AudioBuffer, Frame, Resampler};

use crate::settings::AudioSettings;
use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AudioError {
    #[error("no audio output device available")]
    NoDevice,
    #[error("audio stream error: {0}")]
    Stream(String),
}

/// Destination of mixed stereo frames
pub trait AudioSink: Send {
    fn name(&self) -> &str;

    /// Output rate in Hz
    fn frequency(&self) -> u32;

    /// Queue one frame
    fn output(&mut self, frame: Frame);

    /// Drop everything queued
    fn clear(&mut self);

    /// Frames queued but not played yet
    fn queued(&self) -> usize {
        0
    }
}

/// Discards audio, counting frames
#[derive(Debug, Clone)]
pub struct NullSink {
    frequency: u32,
    frames: u64,
}

impl NullSink {
    pub fn new(frequency: u32) -> Self {
        Self {
            frequency,
            frames: 0,
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }
}

impl AudioSink for NullSink {
    fn name(&self) -> &str {
        "None"
    }

    fn frequency(&self) -> u32 {
        self.frequency
    }

    fn output(&mut self, _frame: Frame) {
        self.frames += 1;
    }

    fn clear(&mut self) {}
}

/// Keeps every frame in memory; the handle reads them from another thread
#[derive(Debug, Clone)]
pub struct RecordingSink {
    frequency: u32,
    frames: Arc<Mutex<Vec<Frame>>>,
}

impl RecordingSink {
    pub fn new(frequency: u32) -> Self {
        Self {
            frequency,
            frames: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Shared view of the recorded frames
    pub fn frames(&self) -> Arc<Mutex<Vec<Frame>>> {
        Arc::clone(&self.frames)
    }
}

impl AudioSink for RecordingSink {
    fn name(&self) -> &str {
        "Recording"
    }

    fn frequency(&self) -> u32 {
        self.frequency
    }

    fn output(&mut self, frame: Frame) {
        self.frames.lock().push(frame);
    }

    fn clear(&mut self) {}
}

/// Open the sink selected in the settings
///
/// Falls back to a null sink when the driver is "None", the `audio`
/// feature is disabled, or the device cannot be opened.
pub fn open(settings: &AudioSettings) -> Box<dyn AudioSink> {
    #[cfg(feature = "audio")]
    if settings.driver == "cpal" {
        let config = AudioConfig::new()
            .with_sample_rate(settings.frequency)
            .with_buffer_duration(settings.latency_ms);
        match CpalSink::new(config) {
            Ok(sink) => return Box::new(sink),
            Err(e) => log::warn!("Audio disabled: {}", e),
        }
    }

    log::info!("Audio driver: None");
    Box::new(NullSink::new(settings.frequency))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_sink_counts() {
        let mut sink = NullSink::new(44100);
        sink.output([0.0, 0.0]);
        sink.output([0.5, 0.5]);
        assert_eq!(sink.frames(), 2);
        assert_eq!(sink.frequency(), 44100);
    }

    #[test]
    fn test_recording_sink_shares_frames() {
        let mut sink = RecordingSink::new(48000);
        let frames = sink.frames();
        sink.output([0.25, -0.25]);
        assert_eq!(*frames.lock(), vec![[0.25, -0.25]]);
    }

    #[test]
    fn test_open_none_driver() {
        let settings = AudioSettings {
            driver: "None".to_string(),
            ..AudioSettings::default()
        };
        let sink = open(&settings);
        assert_eq!(sink.name(), "None");
        assert_eq!(sink.frequency(), 48000);
    }
}
