// Audio resampler - Converts a core's stream rate to the output device rate
//
// Cores produce samples at whatever rate their sound hardware runs at.
// The output device expects its own rate, so the mixed stereo frames are
// converted with linear interpolation before they are queued.

/// A stereo frame, left then right
pub type Frame = [f64; 2];

/// Stereo resampler using linear interpolation
pub struct Resampler {
    /// Input sample rate (stream rate)
    input_rate: f64,

    /// Output sample rate (device rate)
    output_rate: f64,

    /// Input frames consumed per output frame
    step: f64,

    /// Position between `previous` and `current`, in input frames
    phase: f64,

    previous: Frame,
    current: Frame,
}

impl Resampler {
    /// Create a new resampler
    ///
    /// # Arguments
    ///
    /// * `input_rate` - Rate of the frames passed to `process`
    /// * `output_rate` - Rate of the frames it produces
    pub fn new(input_rate: f64, output_rate: f64) -> Self {
        let input_rate = input_rate.max(1.0);
        let output_rate = output_rate.max(1.0);
        Self {
            input_rate,
            output_rate,
            step: input_rate / output_rate,
            phase: 0.0,
            previous: [0.0; 2],
            current: [0.0; 2],
        }
    }

    /// Feed one input frame
    ///
    /// Output frames are appended to `output`; on average
    /// `output_rate / input_rate` of them per call.
    pub fn process(&mut self, frame: Frame, output: &mut Vec<Frame>) {
        self.previous = self.current;
        self.current = frame;

        while self.phase < 1.0 {
            let t = self.phase;
            output.push([
                self.previous[0] + (self.current[0] - self.previous[0]) * t,
                self.previous[1] + (self.current[1] - self.previous[1]) * t,
            ]);
            self.phase += self.step;
        }
        self.phase -= 1.0;
    }

    /// Reset the resampler state
    pub fn reset(&mut self) {
        self.phase = 0.0;
        self.previous = [0.0; 2];
        self.current = [0.0; 2];
    }

    /// Get the input sample rate
    pub fn input_rate(&self) -> f64 {
        self.input_rate
    }

    /// Get the output sample rate
    pub fn output_rate(&self) -> f64 {
        self.output_rate
    }
}

/// Ring buffer of stereo frames between the emulation thread and the
/// device callback
pub struct AudioBuffer {
    /// Internal ring buffer
    buffer: Vec<[f32; 2]>,

    /// Read position
    read_pos: usize,

    /// Write position
    write_pos: usize,

    /// Number of frames in the buffer
    count: usize,
}

impl AudioBuffer {
    /// Create a new audio buffer
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of frames the buffer can hold
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: vec![[0.0; 2]; capacity.max(1)],
            read_pos: 0,
            write_pos: 0,
            count: 0,
        }
    }

    /// Create a buffer holding `milliseconds` of audio at `sample_rate`
    pub fn with_duration(milliseconds: u32, sample_rate: f64) -> Self {
        let capacity = ((milliseconds as f64 / 1000.0) * sample_rate) as usize;
        Self::new(capacity)
    }

    /// Push a frame
    ///
    /// Returns false if the buffer is full.
    pub fn push(&mut self, frame: [f32; 2]) -> bool {
        if self.count >= self.buffer.len() {
            return false;
        }

        self.buffer[self.write_pos] = frame;
        self.write_pos = (self.write_pos + 1) % self.buffer.len();
        self.count += 1;
        true
    }

    /// Pop the oldest frame
    pub fn pop(&mut self) -> Option<[f32; 2]> {
        if self.count == 0 {
            return None;
        }

        let frame = self.buffer[self.read_pos];
        self.read_pos = (self.read_pos + 1) % self.buffer.len();
        self.count -= 1;
        Some(frame)
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count >= self.buffer.len()
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    pub fn clear(&mut self) {
        self.read_pos = 0;
        self.write_pos = 0;
        self.count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_rate_passes_frames_through() {
        let mut resampler = Resampler::new(48000.0, 48000.0);
        let mut output = Vec::new();
        for i in 1..=4 {
            resampler.process([i as f64, -(i as f64)], &mut output);
        }
        // One frame of latency
        assert_eq!(output, vec![[0.0, 0.0], [1.0, -1.0], [2.0, -2.0], [3.0, -3.0]]);
    }

    #[test]
    fn test_upsampling_interpolates() {
        let mut resampler = Resampler::new(24000.0, 48000.0);
        let mut output = Vec::new();
        resampler.process([1.0, 1.0], &mut output);
        resampler.process([2.0, 2.0], &mut output);
        assert_eq!(output.len(), 4);
        assert_eq!(output[2], [1.0, 1.0]);
        assert_eq!(output[3], [1.5, 1.5]);
    }

    #[test]
    fn test_downsampling_ratio() {
        let mut resampler = Resampler::new(96000.0, 48000.0);
        let mut output = Vec::new();
        for _ in 0..1000 {
            resampler.process([0.5, 0.5], &mut output);
        }
        assert_eq!(output.len(), 500);
    }

    #[test]
    fn test_audio_buffer_wrap_around() {
        let mut buffer = AudioBuffer::new(3);

        for _ in 0..10 {
            assert!(buffer.push([1.0, -1.0]));
            assert!(buffer.push([2.0, -2.0]));
            assert!(buffer.push([3.0, -3.0]));
            assert!(!buffer.push([4.0, -4.0]));

            assert_eq!(buffer.pop(), Some([1.0, -1.0]));
            assert_eq!(buffer.pop(), Some([2.0, -2.0]));
            assert_eq!(buffer.pop(), Some([3.0, -3.0]));
        }

        assert!(buffer.is_empty());
        assert_eq!(buffer.pop(), None);
    }

    #[test]
    fn test_audio_buffer_with_duration() {
        let buffer = AudioBuffer::with_duration(100, 44100.0);
        assert_eq!(buffer.capacity(), 4410);
    }
}
