// ============================================================================
// Plugin Trait Definition
// ============================================================================

use super::base::{LevelPair, PluginBase};
use crate::signal::Signal;

/// Information about a plugin
#[derive(Debug, Clone)]
pub struct PluginInfo {
    /// Plugin name
    pub name: String,
    /// Plugin version
    pub version: String,
    /// Plugin description
    pub description: String,
}

/// Core contract of a pipeline stage
///
/// Stages process planar stereo: separate left and right spans of equal
/// length. The host drives every stage the same way:
///
/// 1. `base_mut().set_rate(rate)` then `setup()` whenever the graph is
///    (re)configured,
/// 2. `process()` from the realtime audio thread,
/// 3. `set_post_messages()` from the UI to gate notifications.
pub trait Plugin: Send {
    /// Get plugin information
    fn info(&self) -> PluginInfo;

    /// Shared framework state
    fn base(&self) -> &PluginBase;

    fn base_mut(&mut self) -> &mut PluginBase;

    /// Prepare internal buffers for a new graph configuration
    fn setup(&mut self);

    /// Process one chunk of audio
    ///
    /// Realtime: must not allocate, log, or block on anything but the
    /// stage's own short data lock. All four spans have the same length.
    fn process(
        &mut self,
        left_in: &[f32],
        right_in: &[f32],
        left_out: &mut [f32],
        right_out: &mut [f32],
    );

    /// Delay introduced by the stage, in seconds
    fn latency_seconds(&self) -> f32 {
        0.0
    }

    /// Enable or disable notifications emitted by the stage
    fn set_post_messages(&mut self, state: bool) {
        self.base().set_post_messages(state);
    }

    fn post_messages(&self) -> bool {
        self.base().post_messages()
    }

    /// Input peak levels in dB, emitted off the realtime thread
    fn input_level(&self) -> &Signal<LevelPair> {
        self.base().input_level()
    }

    /// Output peak levels in dB, emitted off the realtime thread
    fn output_level(&self) -> &Signal<LevelPair> {
        self.base().output_level()
    }
}
