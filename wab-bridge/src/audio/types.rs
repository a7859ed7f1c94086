//! Audio buffer types

/// Planar two-channel buffer handed to an endpoint for playback.
///
/// Both channels always hold the same number of frames.
#[derive(Debug, Clone, PartialEq)]
pub struct StereoBuffer {
    left: Vec<f32>,
    right: Vec<f32>,
    sample_rate: f64,
}

impl StereoBuffer {
    /// Silent buffer of `frames` frames
    pub fn silence(frames: usize, sample_rate: f64) -> Self {
        Self {
            left: vec![0.0; frames],
            right: vec![0.0; frames],
            sample_rate,
        }
    }

    /// De-interleave `[L, R, L, R, ...]` samples into a buffer of `frames` frames.
    ///
    /// Input sample `2i` lands in the left channel at frame `i`, sample `2i + 1`
    /// in the right channel. Frames the input does not cover stay silent;
    /// samples beyond `2 * frames` are ignored. Values are copied unchanged.
    pub fn from_interleaved<I>(samples: I, frames: usize, sample_rate: f64) -> Self
    where
        I: IntoIterator<Item = f32>,
    {
        let mut buffer = Self::silence(frames, sample_rate);
        let mut samples = samples.into_iter();
        for i in 0..frames {
            match (samples.next(), samples.next()) {
                (Some(l), Some(r)) => {
                    buffer.left[i] = l;
                    buffer.right[i] = r;
                }
                (Some(l), None) => {
                    buffer.left[i] = l;
                    break;
                }
                _ => break,
            }
        }
        buffer
    }

    /// Number of frames per channel
    pub fn frames(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Playback length in seconds
    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / self.sample_rate
    }

    pub fn left(&self) -> &[f32] {
        &self.left
    }

    pub fn right(&self) -> &[f32] {
        &self.right
    }

    /// Channel data by index (0 = left, 1 = right)
    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        match index {
            0 => Some(&self.left),
            1 => Some(&self.right),
            _ => None,
        }
    }

    /// (left, right) pair at `frame`
    pub fn frame(&self, frame: usize) -> Option<(f32, f32)> {
        Some((*self.left.get(frame)?, *self.right.get(frame)?))
    }
}
