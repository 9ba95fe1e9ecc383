// Audio mixer - Combines every stream of a core into one stereo frame
//
// A core can expose several streams (a console's main sound chip plus an
// expansion chip, for instance). A frame is only mixed once every stream
// has one pending, so the streams never drift apart.

use super::resampler::Frame;
use crate::engine::AudioStream;

/// Mixer applying volume, mute and balance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mixer {
    /// Linear gain (0.0 = silent, 1.0 = unity)
    volume: f64,

    /// -1.0 (left only) to 1.0 (right only)
    balance: f64,

    mute: bool,
}

impl Mixer {
    /// Create a new mixer at unity gain, centered
    pub fn new() -> Self {
        Self {
            volume: 1.0,
            balance: 0.0,
            mute: false,
        }
    }

    /// Set the master volume
    ///
    /// # Arguments
    ///
    /// * `volume` - Gain, clamped to 0.0..=2.0
    pub fn set_volume(&mut self, volume: f64) {
        self.volume = volume.clamp(0.0, 2.0);
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn set_balance(&mut self, balance: f64) {
        self.balance = balance.clamp(-1.0, 1.0);
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn set_mute(&mut self, mute: bool) {
        self.mute = mute;
    }

    pub fn mute(&self) -> bool {
        self.mute
    }

    /// Mix one frame from every stream
    ///
    /// Mono streams feed both channels.
    ///
    /// # Returns
    ///
    /// `None` (and nothing consumed) unless every stream has a frame pending
    pub fn mix(&self, streams: &mut [AudioStream]) -> Option<Frame> {
        if streams.is_empty() || streams.iter().any(|s| !s.pending()) {
            return None;
        }

        let mut samples = [0.0; 2];
        for stream in streams.iter_mut() {
            let mut buffer = [0.0; 2];
            if stream.read(&mut buffer) == 1 {
                samples[0] += buffer[0];
                samples[1] += buffer[0];
            } else {
                samples[0] += buffer[0];
                samples[1] += buffer[1];
            }
        }

        Some(self.apply(samples))
    }

    /// Volume and clamping first, then balance
    pub fn apply(&self, samples: Frame) -> Frame {
        let volume = if self.mute { 0.0 } else { self.volume };
        let mut output = samples.map(|s| (s * volume).clamp(-1.0, 1.0));
        if self.balance < 0.0 {
            output[1] *= 1.0 + self.balance;
        }
        if self.balance > 0.0 {
            output[0] *= 1.0 - self.balance;
        }
        output
    }
}

impl Default for Mixer {
    fn default() -> Self {
        Self::new()
    }
}
