// Audio output - Plays mixed frames on the default device using cpal
//
// The cpal stream is owned by a dedicated thread because it is not `Send`
// on every host. Frames travel through a shared ring buffer that the
// device callback drains; underruns play silence.

use super::resampler::AudioBuffer;
use super::{AudioError, AudioSink};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::StreamConfig;
use parking_lot::Mutex;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Audio output configuration
#[derive(Debug, Clone)]
pub struct AudioConfig {
    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Buffer size in milliseconds (affects latency)
    pub buffer_duration_ms: u32,
}

impl AudioConfig {
    pub fn new() -> Self {
        Self {
            sample_rate: 48000,
            buffer_duration_ms: 40,
        }
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    pub fn with_buffer_duration(mut self, duration_ms: u32) -> Self {
        self.buffer_duration_ms = duration_ms;
        self
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Stereo output on the default cpal device
pub struct CpalSink {
    config: AudioConfig,
    buffer: Arc<Mutex<AudioBuffer>>,
    quit: Option<mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
    dropped: u64,
}

impl CpalSink {
    /// Open the default output device
    pub fn new(config: AudioConfig) -> Result<Self, AudioError> {
        // Four times the latency target leaves room for frame pacing jitter
        let buffer = Arc::new(Mutex::new(AudioBuffer::with_duration(
            config.buffer_duration_ms * 4,
            config.sample_rate as f64,
        )));
        let (ready_tx, ready_rx) = mpsc::channel();
        let (quit_tx, quit_rx) = mpsc::channel::<()>();

        let stream_buffer = Arc::clone(&buffer);
        let sample_rate = config.sample_rate;
        let thread = thread::Builder::new()
            .name("audio".to_string())
            .spawn(move || {
                let stream = match build_stream(sample_rate, stream_buffer) {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));
                // Parked until the sink is dropped
                let _ = quit_rx.recv();
                drop(stream);
            })
            .map_err(|e| AudioError::Stream(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                log::info!(
                    "Audio output initialized: {} Hz, {} ms",
                    config.sample_rate,
                    config.buffer_duration_ms
                );
                Ok(Self {
                    config,
                    buffer,
                    quit: Some(quit_tx),
                    thread: Some(thread),
                    dropped: 0,
                })
            }
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(AudioError::Stream("audio thread exited".to_string()))
            }
        }
    }

    pub fn config(&self) -> &AudioConfig {
        &self.config
    }
}

fn build_stream(
    sample_rate: u32,
    buffer: Arc<Mutex<AudioBuffer>>,
) -> Result<cpal::Stream, AudioError> {
    let host = cpal::default_host();
    let device = host.default_output_device().ok_or(AudioError::NoDevice)?;
    log::info!("Audio device: {}", device.name().unwrap_or_default());

    let stream_config = StreamConfig {
        channels: 2,
        sample_rate: cpal::SampleRate(sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let stream = device
        .build_output_stream(
            &stream_config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let mut buffer = buffer.lock();
                for frame in data.chunks_mut(2) {
                    let samples = buffer.pop().unwrap_or([0.0; 2]);
                    for (out, sample) in frame.iter_mut().zip(samples) {
                        *out = sample;
                    }
                }
            },
            |err| log::error!("Audio stream error: {}", err),
            None,
        )
        .map_err(|e| AudioError::Stream(e.to_string()))?;

    stream
        .play()
        .map_err(|e| AudioError::Stream(e.to_string()))?;
    Ok(stream)
}

impl AudioSink for CpalSink {
    fn name(&self) -> &str {
        "cpal"
    }

    fn frequency(&self) -> u32 {
        self.config.sample_rate
    }

    fn output(&mut self, frame: [f64; 2]) {
        if !self.buffer.lock().push([frame[0] as f32, frame[1] as f32]) {
            self.dropped += 1;
            if self.dropped % 48000 == 1 {
                log::debug!("Audio buffer full, {} frames dropped", self.dropped);
            }
        }
    }

    fn clear(&mut self) {
        self.buffer.lock().clear();
    }

    fn queued(&self) -> usize {
        self.buffer.lock().len()
    }
}

impl Drop for CpalSink {
    fn drop(&mut self) {
        if let Some(quit) = self.quit.take() {
            let _ = quit.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
