// ============================================================================
// Plugin Host - Chain stereo stages together
// ============================================================================

use super::plugin::Plugin;
use crate::error::{PluginError, PluginResult};

/// Default chunk capacity, the largest buffer the audio server hands out
pub const DEFAULT_MAX_FRAMES: usize = 8192;

/// Plugin host that chains pipeline stages
///
/// The host owns the stages, routes each chunk through them in order and
/// keeps the framework bookkeeping (sample rate, audio graph connection,
/// level meters) uniform across stages.
///
/// All intermediate buffers are allocated up front; `process` never
/// allocates. Chunks longer than `max_frames` are truncated to it.
///
/// # Example
/// ```
/// use fx_spectrum::{IdleQueue, MemorySettings, PipelineType, PluginHost, Spectrum, StageConfig};
///
/// let queue = IdleQueue::new(16);
/// let settings = MemorySettings::new("spectrum", Spectrum::schema());
/// let config = StageConfig::new("spectrum#0", "spectrum", PipelineType::Output);
///
/// let mut host = PluginHost::new(48000, 1024);
/// host.add_plugin(Box::new(Spectrum::new(&config, &settings, queue.poster()).unwrap()));
///
/// let left = vec![0.5_f32; 512];
/// let right = vec![-0.5_f32; 512];
/// let (mut out_l, mut out_r) = (vec![0.0; 512], vec![0.0; 512]);
/// let frames = host.process(&left, &right, &mut out_l, &mut out_r);
/// assert_eq!(frames, 512);
/// assert_eq!(out_l, left);
/// ```
pub struct PluginHost {
    /// Chain of stages
    plugins: Vec<Box<dyn Plugin>>,
    /// Sample rate in Hz
    sample_rate: u32,
    /// Largest chunk accepted, in frames
    max_frames: usize,
    /// Ping-pong buffers between stages: [left, right] x 2
    buffers: [[Vec<f32>; 2]; 2],
}

impl PluginHost {
    /// Create a host running at `sample_rate` for chunks of at most
    /// `max_frames` frames
    pub fn new(sample_rate: u32, max_frames: usize) -> Self {
        let max_frames = max_frames.max(1);
        Self {
            plugins: Vec::new(),
            sample_rate,
            max_frames,
            buffers: [
                [vec![0.0; max_frames], vec![0.0; max_frames]],
                [vec![0.0; max_frames], vec![0.0; max_frames]],
            ],
        }
    }

    /// Add a stage at the end of the chain
    ///
    /// The stage gets the host sample rate, is linked into the graph and
    /// set up before it sees any audio.
    pub fn add_plugin(&mut self, mut plugin: Box<dyn Plugin>) {
        plugin.base_mut().set_rate(self.sample_rate);
        plugin.setup();
        plugin.base_mut().connect();

        log::info!(
            "{}{} added to the pipeline at position {}",
            plugin.base().log_tag(),
            plugin.base().name,
            self.plugins.len()
        );

        self.plugins.push(plugin);
    }

    /// Remove the stage at `index`, unlinking it from the graph first
    pub fn remove_plugin(&mut self, index: usize) -> PluginResult<Box<dyn Plugin>> {
        if index >= self.plugins.len() {
            return Err(PluginError::IndexOutOfRange(index));
        }

        let mut plugin = self.plugins.remove(index);
        plugin.base_mut().disconnect();

        log::info!(
            "{}{} removed from the pipeline",
            plugin.base().log_tag(),
            plugin.base().name
        );

        Ok(plugin)
    }

    /// Get the number of plugins in the chain
    pub fn plugin_count(&self) -> usize {
        self.plugins.len()
    }

    /// Get plugin at index
    pub fn get_plugin(&self, index: usize) -> Option<&dyn Plugin> {
        self.plugins.get(index).map(|p| p.as_ref())
    }

    pub fn get_plugin_mut(&mut self, index: usize) -> Option<&mut (dyn Plugin + 'static)> {
        self.plugins.get_mut(index).map(|p| p.as_mut())
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn max_frames(&self) -> usize {
        self.max_frames
    }

    /// Reconfigure the graph for a new sample rate and set every stage up
    /// again
    pub fn set_rate(&mut self, sample_rate: u32) {
        self.sample_rate = sample_rate;
        for plugin in &mut self.plugins {
            plugin.base_mut().set_rate(sample_rate);
            plugin.setup();
        }
        log::info!("pipeline reconfigured at {} Hz", sample_rate);
    }

    /// Run `setup` on every stage (graph reconfiguration at the same rate)
    pub fn setup(&mut self) {
        for plugin in &mut self.plugins {
            plugin.setup();
        }
    }

    /// Turn notifications of every stage on or off
    pub fn set_post_messages(&mut self, state: bool) {
        for plugin in &mut self.plugins {
            plugin.set_post_messages(state);
        }
    }

    /// Total delay of the chain in seconds
    pub fn total_latency_seconds(&self) -> f32 {
        self.plugins.iter().map(|p| p.latency_seconds()).sum()
    }

    /// Process one chunk through the chain
    ///
    /// # Returns
    /// Number of frames written to the outputs
    pub fn process(
        &mut self,
        left_in: &[f32],
        right_in: &[f32],
        left_out: &mut [f32],
        right_out: &mut [f32],
    ) -> usize {
        let n = left_in
            .len()
            .min(right_in.len())
            .min(left_out.len())
            .min(right_out.len())
            .min(self.max_frames);

        if self.plugins.is_empty() {
            left_out[..n].copy_from_slice(&left_in[..n]);
            right_out[..n].copy_from_slice(&right_in[..n]);
            return n;
        }

        let [front, back] = &mut self.buffers;
        front[0][..n].copy_from_slice(&left_in[..n]);
        front[1][..n].copy_from_slice(&right_in[..n]);

        let (mut src, mut dst) = (front, back);
        for plugin in &mut self.plugins {
            let [src_l, src_r] = &*src;
            let [dst_l, dst_r] = &mut *dst;

            plugin.process(
                &src_l[..n],
                &src_r[..n],
                &mut dst_l[..n],
                &mut dst_r[..n],
            );
            plugin
                .base_mut()
                .update_levels(&src_l[..n], &src_r[..n], &dst_l[..n], &dst_r[..n]);

            std::mem::swap(&mut src, &mut dst);
        }

        // After the last swap `src` holds the chain output
        left_out[..n].copy_from_slice(&src[0][..n]);
        right_out[..n].copy_from_slice(&src[1][..n]);

        n
    }
}
