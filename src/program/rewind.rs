// Rewind
//
// While playing, a serialized state is captured every `frequency` frames
// into a bounded history. While the rewind hotkey is held, the newest state
// is popped and restored every `frequency / 5` frames, so playback runs
// five times faster than capture. An empty history ends the rewind.

use crate::engine::Core;
use std::collections::VecDeque;

/// Playback runs this many times faster than capture
pub const REWIND_SPEEDUP: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewindMode {
    Playing,
    Rewinding,
}

/// Outcome of one frame of rewind bookkeeping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewindStep {
    /// Nothing to do this frame
    Idle,
    /// A state was pushed to the history
    Captured,
    /// A state was popped and restored
    Restored,
    /// The core rejected a stored state
    Failed,
    /// The history ran out; back to playing
    Exhausted,
}

/// Bounded history of serialized states
#[derive(Debug, Clone)]
pub struct Rewind {
    mode: RewindMode,
    history: VecDeque<Vec<u8>>,
    length: usize,
    frequency: u32,
    counter: u32,
}

impl Rewind {
    /// Create a rewind buffer
    ///
    /// # Arguments
    ///
    /// * `length` - Maximum number of stored states
    /// * `frequency` - Frames between two captures
    pub fn new(length: usize, frequency: u32) -> Self {
        Self {
            mode: RewindMode::Playing,
            history: VecDeque::with_capacity(length.min(1024)),
            length,
            frequency: frequency.max(1),
            counter: 0,
        }
    }

    pub fn mode(&self) -> RewindMode {
        self.mode
    }

    /// Switch mode; the frame counter restarts
    pub fn set_mode(&mut self, mode: RewindMode) {
        self.mode = mode;
        self.counter = 0;
    }

    /// Back to playing with an empty history and new limits
    pub fn reset(&mut self, length: usize, frequency: u32) {
        self.set_mode(RewindMode::Playing);
        self.history.clear();
        self.length = length;
        self.frequency = frequency.max(1);
    }

    pub fn clear(&mut self) {
        self.set_mode(RewindMode::Playing);
        self.history.clear();
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn length(&self) -> usize {
        self.length
    }

    pub fn frequency(&self) -> u32 {
        self.frequency
    }

    /// Frames between two restores while rewinding
    pub fn playback_interval(&self) -> u32 {
        (self.frequency / REWIND_SPEEDUP).max(1)
    }

    /// Advance the bookkeeping by one frame
    ///
    /// Called once per emulated frame, before the frame runs.
    pub fn step(&mut self, core: &mut dyn Core) -> RewindStep {
        match self.mode {
            RewindMode::Playing => {
                self.counter += 1;
                if self.counter < self.frequency {
                    return RewindStep::Idle;
                }
                self.counter = 0;
                if self.length == 0 {
                    return RewindStep::Idle;
                }
                while self.history.len() >= self.length {
                    self.history.pop_front();
                }
                self.history.push_back(core.serialize(false));
                RewindStep::Captured
            }
            RewindMode::Rewinding => {
                if self.history.is_empty() {
                    self.set_mode(RewindMode::Playing);
                    return RewindStep::Exhausted;
                }
                self.counter += 1;
                if self.counter < self.playback_interval() {
                    return RewindStep::Idle;
                }
                self.counter = 0;

                let Some(state) = self.history.pop_back() else {
                    return RewindStep::Idle;
                };
                if !core.unserialize(&state) {
                    log::warn!("Rewind state rejected by the core");
                    self.clear();
                    return RewindStep::Failed;
                }
                if self.history.is_empty() {
                    self.set_mode(RewindMode::Playing);
                    return RewindStep::Exhausted;
                }
                RewindStep::Restored
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Platform, Port};

    /// Core whose whole state is a frame counter
    struct Counter {
        frame: u64,
    }

    impl Core for Counter {
        fn name(&self) -> &str {
            "Counter"
        }

        fn power(&mut self, _reset: bool) {
            self.frame = 0;
        }

        fn run(&mut self, _platform: &mut dyn Platform) {
            self.frame += 1;
        }

        fn serialize(&mut self, _with_id: bool) -> Vec<u8> {
            self.frame.to_le_bytes().to_vec()
        }

        fn unserialize(&mut self, state: &[u8]) -> bool {
            match <[u8; 8]>::try_from(state) {
                Ok(bytes) => {
                    self.frame = u64::from_le_bytes(bytes);
                    true
                }
                Err(_) => false,
            }
        }

        fn save(&mut self) -> Vec<(String, Vec<u8>)> {
            Vec::new()
        }

        fn unload(&mut self, _platform: &mut dyn Platform) {}

        fn port(&mut self, _name: &str) -> Option<&mut dyn Port> {
            None
        }

        fn ports(&self) -> Vec<String> {
            Vec::new()
        }
    }

    fn play(rewind: &mut Rewind, core: &mut Counter, frames: u64) {
        for _ in 0..frames {
            core.frame += 1;
            rewind.step(core);
        }
    }

    #[test]
    fn test_captures_every_frequency_frames() {
        let mut rewind = Rewind::new(100, 10);
        let mut core = Counter { frame: 0 };
        play(&mut rewind, &mut core, 35);
        assert_eq!(rewind.len(), 3);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut rewind = Rewind::new(2, 1);
        let mut core = Counter { frame: 0 };
        play(&mut rewind, &mut core, 5);
        assert_eq!(rewind.len(), 2);

        rewind.set_mode(RewindMode::Rewinding);
        rewind.step(&mut core);
        assert_eq!(core.frame, 5);
        rewind.step(&mut core);
        assert_eq!(core.frame, 4);
    }

    #[test]
    fn test_rewind_is_lifo_and_exhausts_once() {
        let mut rewind = Rewind::new(100, 10);
        let mut core = Counter { frame: 0 };
        play(&mut rewind, &mut core, 30);
        assert_eq!(rewind.len(), 3);
        assert_eq!(rewind.playback_interval(), 2);

        rewind.set_mode(RewindMode::Rewinding);
        let mut restored = Vec::new();
        let mut exhausted = 0;
        for _ in 0..20 {
            match rewind.step(&mut core) {
                RewindStep::Restored => restored.push(core.frame),
                RewindStep::Exhausted => {
                    restored.push(core.frame);
                    exhausted += 1;
                }
                _ => {}
            }
        }
        assert_eq!(restored, vec![30, 20, 10]);
        assert_eq!(exhausted, 1);
        assert_eq!(rewind.mode(), RewindMode::Playing);
        assert!(rewind.len() <= 1);
    }

    #[test]
    fn test_rewind_with_empty_history() {
        let mut rewind = Rewind::new(100, 10);
        let mut core = Counter { frame: 7 };
        rewind.set_mode(RewindMode::Rewinding);
        assert_eq!(rewind.step(&mut core), RewindStep::Exhausted);
        assert_eq!(rewind.mode(), RewindMode::Playing);
        assert_eq!(core.frame, 7);
    }

    #[test]
    fn test_zero_length_never_captures() {
        let mut rewind = Rewind::new(0, 1);
        let mut core = Counter { frame: 0 };
        play(&mut rewind, &mut core, 10);
        assert!(rewind.is_empty());
    }
}
