// ============================================================================
// FFT Engine - Scoped Forward Transform Handle
// ============================================================================
//
// Owns the forward plan together with its scratch and output buffers.
// Dropping the handle releases all of them; holding one means the transform
// is ready to run.

use crate::error::{PluginError, PluginResult};
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// Forward real-input FFT of a fixed size
pub struct FftEngine {
    /// Transform size N
    size: usize,
    /// Forward plan
    plan: Arc<dyn Fft<f32>>,
    /// Transform buffer (N complex values, imaginary parts zero on input)
    complex_output: Vec<Complex<f32>>,
    /// Plan scratch space
    scratch: Vec<Complex<f32>>,
}

impl FftEngine {
    /// Plan a forward transform of `size` points
    ///
    /// Fails for sizes that are zero or not a power of two.
    pub fn new(size: usize) -> PluginResult<Self> {
        if size < 2 || !size.is_power_of_two() {
            return Err(PluginError::FftPlan { size });
        }

        let mut planner = FftPlanner::<f32>::new();
        let plan = planner.plan_fft_forward(size);
        let scratch_len = plan.get_inplace_scratch_len();

        Ok(Self {
            size,
            plan,
            complex_output: vec![Complex::new(0.0, 0.0); size],
            scratch: vec![Complex::new(0.0, 0.0); scratch_len],
        })
    }

    /// Transform size N
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of non-redundant output bins (N/2 + 1)
    pub fn n_bins(&self) -> usize {
        self.size / 2 + 1
    }

    /// Run the unnormalized forward transform on `real_input`
    ///
    /// Returns the first N/2 + 1 bins. Inputs shorter than N are zero padded,
    /// longer inputs are truncated.
    pub fn execute(&mut self, real_input: &[f32]) -> &[Complex<f32>] {
        for (i, c) in self.complex_output.iter_mut().enumerate() {
            *c = Complex::new(real_input.get(i).copied().unwrap_or(0.0), 0.0);
        }

        self.plan
            .process_with_scratch(&mut self.complex_output, &mut self.scratch);

        &self.complex_output[..self.size / 2 + 1]
    }
}

impl Drop for FftEngine {
    fn drop(&mut self) {
        log::debug!("fft plan of size {} destroyed", self.size);
    }
}
