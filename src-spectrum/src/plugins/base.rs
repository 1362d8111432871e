// ============================================================================
// Plugin Base - state shared by every pipeline stage
// ============================================================================
//
// Every stage carries the same framework state: its identity (tag, schema,
// pipeline direction), the sample rate set by the host, the audio-server
// connection flag, the post-messages switch and the level meter signals.
// It is handed in explicitly at construction through `StageConfig` and an
// `IdlePoster`.

use crate::dispatch::{IdlePoster, IdleTask};
use crate::signal::Signal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Levels below this linear amplitude are reported as `MINIMUM_DB_LEVEL`
pub const MINIMUM_LINEAR_LEVEL: f32 = 0.00001;

/// Floor of the level meters in dB
pub const MINIMUM_DB_LEVEL: f32 = -100.0;

/// Convert a linear amplitude to dB, floored at `MINIMUM_DB_LEVEL`
pub fn linear_to_db(amp: f32) -> f32 {
    if amp >= MINIMUM_LINEAR_LEVEL {
        20.0 * amp.log10()
    } else {
        MINIMUM_DB_LEVEL
    }
}

/// Which side of the audio server the pipeline processes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineType {
    /// Microphone / capture side
    Input,
    /// Playback side
    Output,
}

impl PipelineType {
    /// Prefix used in log messages of stages on this side
    pub fn log_tag(&self) -> &'static str {
        match self {
            PipelineType::Input => "sie: ",
            PipelineType::Output => "soe: ",
        }
    }
}

fn default_level_interval_ms() -> u32 {
    100
}

/// Construction parameters common to every stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageConfig {
    /// Instance tag, unique within a pipeline
    pub tag: String,
    /// Settings schema identity
    pub schema: String,
    /// Settings path of this instance
    #[serde(default)]
    pub schema_path: String,
    pub pipe_type: PipelineType,
    /// Minimum time between two level notifications
    #[serde(default = "default_level_interval_ms")]
    pub level_interval_ms: u32,
}

impl StageConfig {
    pub fn new(tag: &str, schema: &str, pipe_type: PipelineType) -> Self {
        Self {
            tag: tag.to_string(),
            schema: schema.to_string(),
            schema_path: String::new(),
            pipe_type,
            level_interval_ms: default_level_interval_ms(),
        }
    }
}

/// Left/right meter values in dB
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelPair {
    pub left: f32,
    pub right: f32,
}

/// Deferred emission of the level meters
pub struct LevelsJob {
    input_level: Signal<LevelPair>,
    output_level: Signal<LevelPair>,
    post_messages: Arc<AtomicBool>,
    input: LevelPair,
    output: LevelPair,
}

impl LevelsJob {
    pub(crate) fn run(self) {
        // Notifications switched off after posting: drop silently
        if !self.post_messages.load(Ordering::Acquire) {
            return;
        }

        self.input_level.emit(&self.input);
        self.output_level.emit(&self.output);
    }
}

/// Peak tracker accumulating between two notifications
#[derive(Debug, Clone, Default)]
struct LevelMeter {
    input_peak: [f32; 2],
    output_peak: [f32; 2],
    elapsed_samples: usize,
    interval_samples: usize,
}

impl LevelMeter {
    fn track(peaks: &mut [f32; 2], left: &[f32], right: &[f32]) {
        for &s in left {
            peaks[0] = peaks[0].max(s.abs());
        }
        for &s in right {
            peaks[1] = peaks[1].max(s.abs());
        }
    }

    fn reset(&mut self) {
        self.input_peak = [0.0; 2];
        self.output_peak = [0.0; 2];
        self.elapsed_samples = 0;
    }
}

/// Framework state owned by every stage
pub struct PluginBase {
    /// Instance tag
    pub tag: String,
    /// Stage name (e.g. "spectrum")
    pub name: String,
    /// Settings schema identity
    pub schema: String,
    /// Settings path of this instance
    pub schema_path: String,
    pub pipe_type: PipelineType,
    /// Sample rate set by the host
    rate: u32,
    /// Whether the stage is linked into a running audio graph
    connected: bool,
    /// Gate for every notification of this stage
    post_messages: Arc<AtomicBool>,
    input_level: Signal<LevelPair>,
    output_level: Signal<LevelPair>,
    level_interval_ms: u32,
    meter: LevelMeter,
    idle: IdlePoster,
}

impl PluginBase {
    pub fn new(name: &str, config: &StageConfig, idle: IdlePoster) -> Self {
        Self {
            tag: config.tag.clone(),
            name: name.to_string(),
            schema: config.schema.clone(),
            schema_path: config.schema_path.clone(),
            pipe_type: config.pipe_type,
            rate: 0,
            connected: false,
            post_messages: Arc::new(AtomicBool::new(false)),
            input_level: Signal::new(),
            output_level: Signal::new(),
            level_interval_ms: config.level_interval_ms,
            meter: LevelMeter::default(),
            idle,
        }
    }

    pub fn log_tag(&self) -> &'static str {
        self.pipe_type.log_tag()
    }

    pub fn rate(&self) -> u32 {
        self.rate
    }

    /// Set the sample rate. Called by the host before `setup`.
    pub fn set_rate(&mut self, rate: u32) {
        self.rate = rate;
        self.meter.interval_samples =
            ((rate as u64 * self.level_interval_ms as u64) / 1000).max(1) as usize;
        self.meter.reset();
    }

    pub fn connected(&self) -> bool {
        self.connected
    }

    pub fn connect(&mut self) {
        if !self.connected {
            self.connected = true;
            log::debug!("{}{} connected to the audio graph", self.log_tag(), self.name);
        }
    }

    pub fn disconnect(&mut self) {
        if self.connected {
            self.connected = false;
            log::debug!("{}{} disconnected from the audio graph", self.log_tag(), self.name);
        }
    }

    pub fn post_messages(&self) -> bool {
        self.post_messages.load(Ordering::Acquire)
    }

    pub fn set_post_messages(&self, state: bool) {
        self.post_messages.store(state, Ordering::Release);
    }

    pub fn input_level(&self) -> &Signal<LevelPair> {
        &self.input_level
    }

    pub fn output_level(&self) -> &Signal<LevelPair> {
        &self.output_level
    }

    /// Queue used for deferred notifications
    pub fn idle(&self) -> &IdlePoster {
        &self.idle
    }

    /// Track input/output peaks of one processed chunk
    ///
    /// Once per level interval, and only while post-messages is on, the
    /// peaks are posted as an idle task and the tracker starts over.
    /// Realtime safe: no allocation, no blocking.
    pub fn update_levels(
        &mut self,
        left_in: &[f32],
        right_in: &[f32],
        left_out: &[f32],
        right_out: &[f32],
    ) {
        LevelMeter::track(&mut self.meter.input_peak, left_in, right_in);
        LevelMeter::track(&mut self.meter.output_peak, left_out, right_out);
        self.meter.elapsed_samples += left_in.len().max(right_in.len());

        if self.meter.elapsed_samples < self.meter.interval_samples {
            return;
        }

        if self.post_messages() {
            let job = LevelsJob {
                input_level: self.input_level.clone(),
                output_level: self.output_level.clone(),
                post_messages: Arc::clone(&self.post_messages),
                input: LevelPair {
                    left: linear_to_db(self.meter.input_peak[0]),
                    right: linear_to_db(self.meter.input_peak[1]),
                },
                output: LevelPair {
                    left: linear_to_db(self.meter.output_peak[0]),
                    right: linear_to_db(self.meter.output_peak[1]),
                },
            };

            // A full queue means the UI is behind; skip this update
            let _ = self.idle.try_post(IdleTask::Levels(job));
        }

        self.meter.reset();
    }
}
