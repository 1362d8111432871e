// ============================================================================
// Hann Window Table
// ============================================================================

use std::f64::consts::PI;

/// Precomputed symmetric Hann coefficients
///
/// `w[n] = 0.5 * (1 - cos(2*pi*n / (N - 1)))`
///
/// The first half is evaluated in double precision and mirrored onto the
/// second half, so `w[n] == w[N - 1 - n]` holds exactly.
#[derive(Debug, Clone)]
pub struct WindowTable {
    coefficients: Vec<f32>,
}

impl WindowTable {
    /// Build a Hann table of `len` coefficients
    pub fn hann(len: usize) -> Self {
        let mut coefficients = vec![0.0_f32; len];

        if len > 1 {
            let denom = (len - 1) as f64;
            for n in 0..len.div_ceil(2) {
                let w = 0.5 * (1.0 - (2.0 * PI * n as f64 / denom).cos());
                coefficients[n] = w as f32;
                coefficients[len - 1 - n] = w as f32;
            }
        } else if len == 1 {
            coefficients[0] = 1.0;
        }

        Self { coefficients }
    }

    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.coefficients
    }

    /// Write `input[n] * w[n]` into `output`
    pub fn apply(&self, input: &[f32], output: &mut [f32]) {
        debug_assert_eq!(input.len(), self.coefficients.len());
        debug_assert_eq!(output.len(), self.coefficients.len());

        for ((out, &x), &w) in output
            .iter_mut()
            .zip(input.iter())
            .zip(self.coefficients.iter())
        {
            *out = x * w;
        }
    }

    /// Sum of all coefficients (coherent gain times N)
    pub fn sum(&self) -> f64 {
        self.coefficients.iter().map(|&w| w as f64).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hann_endpoints_and_symmetry() {
        let window = WindowTable::hann(8192);
        let w = window.as_slice();

        assert_eq!(w.len(), 8192);
        assert_eq!(w[0], 0.0);
        assert_eq!(w[8191], 0.0);
        for n in 0..w.len() {
            assert_eq!(w[n], w[w.len() - 1 - n], "asymmetry at {}", n);
        }
    }

    #[test]
    fn test_hann_center_is_unity() {
        let window = WindowTable::hann(8192);
        let center = window.as_slice()[(8192 - 1) / 2];
        assert!((center - 1.0).abs() < 1e-6, "center = {}", center);
    }

    #[test]
    fn test_hann_sum_is_half_length() {
        let window = WindowTable::hann(8192);
        // Symmetric Hann sums to (N - 1) / 2
        assert!((window.sum() - 4095.5).abs() < 1e-2);
    }

    #[test]
    fn test_apply() {
        let window = WindowTable::hann(5);
        let mut out = vec![0.0; 5];
        window.apply(&[2.0; 5], &mut out);
        assert_eq!(out[0], 0.0);
        assert!((out[2] - 2.0).abs() < 1e-6);
        assert!((out[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_degenerate_lengths() {
        assert!(WindowTable::hann(0).is_empty());
        assert_eq!(WindowTable::hann(1).as_slice(), &[1.0]);
    }
}
