//! Test signal generation
//!
//! Deterministic generators used to probe the analyzer:
//! - Pure tones at an arbitrary frequency
//! - Tones centered exactly on an FFT bin
//! - Constant (DC) signals
//! - White noise

use std::f64::consts::PI;

/// Clip a sample to the open interval (-1, 1)
#[inline]
pub fn clip(x: f32) -> f32 {
    x.clamp(-0.999_999, 0.999_999)
}

/// Generate a pure tone (sine wave)
///
/// # Arguments
/// * `freq` - Frequency in Hz
/// * `amp` - Amplitude (0.0 to 1.0)
/// * `sample_rate` - Sample rate in Hz
/// * `n_frames` - Number of samples
pub fn gen_tone(freq: f64, amp: f32, sample_rate: u32, n_frames: usize) -> Vec<f32> {
    let dphi = 2.0 * PI * freq / sample_rate as f64;
    (0..n_frames)
        .map(|i| clip(amp * (dphi * i as f64).sin() as f32))
        .collect()
}

/// Generate a sine whose period divides `fft_size` exactly `bin` times
///
/// Sample `i` of the output is `amp * sin(2π·bin·i / fft_size)`, so the last
/// `fft_size` samples of any output at least that long put all their energy
/// in `bin` (before windowing).
pub fn gen_bin_tone(bin: usize, fft_size: usize, amp: f32, n_frames: usize) -> Vec<f32> {
    let dphi = 2.0 * PI * bin as f64 / fft_size as f64;
    (0..n_frames)
        .map(|i| amp * (dphi * i as f64).sin() as f32)
        .collect()
}

/// Generate a constant signal
pub fn gen_dc(level: f32, n_frames: usize) -> Vec<f32> {
    vec![level; n_frames]
}

/// Generate white noise
///
/// Uses a deterministic LCG seeded with `seed` for reproducible output.
pub fn gen_white_noise(amp: f32, seed: u64, n_frames: usize) -> Vec<f32> {
    let mut state = seed;
    (0..n_frames)
        .map(|_| {
            // Numerical Recipes constants
            state = state.wrapping_mul(1664525).wrapping_add(1013904223) & 0xffff_ffff;
            let random = (state as f32 / u32::MAX as f32) * 2.0 - 1.0;
            clip(amp * random)
        })
        .collect()
}
