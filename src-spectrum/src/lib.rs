//! Spectrum analyzer stage for a stereo audio-effects pipeline
//!
//! The analyzer is a pass-through stage: audio leaves it untouched while it
//! keeps the latest N = 8192 samples of the mono down-mix, applies a Hann
//! window and publishes the normalized power spectrum to subscribers.
//!
//! Data flow:
//! - Realtime thread: `Plugin::process` copies input to output, updates the
//!   mono buffer and posts a windowed snapshot on the idle queue
//! - Idle side: `IdleQueue::dispatch_pending` (or an `IdleWorker`) runs the
//!   FFT and emits `Spectrum::power`
//! - Settings: the `show` key toggles bypass from any thread

use std::sync::Once;

pub mod config;
pub mod dispatch;
pub mod error;
pub mod fft;
pub mod mono_buffer;
pub mod plugins;
pub mod settings;
pub mod signal;
pub mod tones;
pub mod window;

pub use config::PipelineConfig;
pub use dispatch::{IdlePoster, IdleQueue, IdleTask, IdleWorker};
pub use error::{ConfigError, DispatchError, PluginError, PluginResult, SettingsError};
pub use fft::FftEngine;
pub use mono_buffer::MonoBuffer;
pub use plugins::{
    LevelPair, N_BANDS, PipelineType, Plugin, PluginBase, PluginHost, PluginInfo, PowerSpectrum,
    SHOW_KEY, Spectrum, StageConfig,
};
pub use settings::{KeySpec, MemorySettings, SettingsKey, SettingsSource, SettingsValue};
pub use signal::{Connection, Signal};
pub use window::WindowTable;

static INIT: Once = Once::new();

/// Initialize logging
///
/// Default filter is `info`, overridable through `RUST_LOG`. Safe to call
/// more than once.
pub fn init_logging() {
    INIT.call_once(|| {
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .try_init();
        log::info!("fx_spectrum v{} ready", env!("CARGO_PKG_VERSION"));
    });
}
