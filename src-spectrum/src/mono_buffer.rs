// ============================================================================
// Mono Shift Buffer
// ============================================================================
//
// Fixed-capacity reservoir holding the latest N down-mixed samples.
// The most recent sample always sits at index N-1.

/// Sliding window of the most recent mono samples
#[derive(Debug, Clone)]
pub struct MonoBuffer {
    samples: Vec<f32>,
}

impl MonoBuffer {
    /// Create a zeroed buffer of `len` samples
    pub fn new(len: usize) -> Self {
        Self {
            samples: vec![0.0; len],
        }
    }

    /// Number of samples held (always the construction length)
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Current contents, oldest first
    pub fn as_slice(&self) -> &[f32] {
        &self.samples
    }

    /// Zero the whole buffer
    pub fn clear(&mut self) {
        self.samples.fill(0.0);
    }

    /// Shift the buffer left by the chunk length and append the down-mix
    /// `0.5 * (left + right)` at the end.
    ///
    /// Chunks longer than the buffer keep only their first N frames, and
    /// mismatched channel lengths are clamped to the shorter one.
    ///
    /// Returns the number of frames ingested.
    pub fn shift_in(&mut self, left: &[f32], right: &[f32]) -> usize {
        let n = self.samples.len();
        let m = left.len().min(right.len()).min(n);

        self.samples.copy_within(m.., 0);

        for (dst, (&l, &r)) in self.samples[n - m..]
            .iter_mut()
            .zip(left.iter().zip(right.iter()))
        {
            *dst = 0.5 * (l + r);
        }

        m
    }
}
