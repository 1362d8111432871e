// ============================================================================
// Pipeline Stages
// ============================================================================
//
// Stages process planar stereo chunks on the realtime thread and defer every
// notification to the idle queue.
//
// Architecture:
// - Plugin trait: contract every stage implements
// - PluginBase: framework state shared by all stages (rate, connection,
//   post-messages switch, level meters)
// - PluginHost: chains stages and drives their lifecycle
// - Spectrum: pass-through analyzer publishing a power spectrum
//
// Example usage:
// ```
// let mut host = PluginHost::new(48000, 8192);
// host.add_plugin(Box::new(Spectrum::new(&config, &settings, queue.poster())?));
// host.set_post_messages(true);
// host.process(&left_in, &right_in, &mut left_out, &mut right_out);
// queue.dispatch_pending(); // UI side
// ```

mod analyzer_spectrum;
mod base;
mod host;
mod plugin;

pub use analyzer_spectrum::{
    DEFAULT_SNAPSHOT_POOL, N_BANDS, PowerSpectrum, SHOW_KEY, Spectrum, SpectrumJob,
};
pub use base::{
    LevelPair, LevelsJob, MINIMUM_DB_LEVEL, MINIMUM_LINEAR_LEVEL, PipelineType, PluginBase,
    StageConfig, linear_to_db,
};
pub use host::{DEFAULT_MAX_FRAMES, PluginHost};
pub use plugin::{Plugin, PluginInfo};
