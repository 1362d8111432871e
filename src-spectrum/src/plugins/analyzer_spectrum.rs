// ============================================================================
// Spectrum Analyzer Stage
// ============================================================================
//
// Pass-through stage that observes the stereo stream and periodically
// publishes a power spectrum of the latest N samples.
//
// Realtime path (process):
//   copy input to output -> down-mix and shift into the mono buffer ->
//   apply the Hann window -> copy the windowed block into a pooled snapshot
//   and post it on the idle queue.
//
// Idle path (SpectrumJob::run):
//   re-check bypass and FFT readiness -> forward FFT -> normalized power per
//   bin -> emit `power`.
//
// The snapshot pool and the idle queue are allocated up front, so the
// realtime path never allocates. Each job owns its snapshot, the audio
// thread never shares `real_input` with a job in flight.

use super::base::{PluginBase, StageConfig};
use super::plugin::{Plugin, PluginInfo};
use crate::dispatch::{IdlePoster, IdleTask};
use crate::error::PluginResult;
use crate::fft::FftEngine;
use crate::mono_buffer::MonoBuffer;
use crate::settings::{KeySpec, SettingsSource};
use crate::signal::{Connection, Signal};
use crate::window::WindowTable;
use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Analysis window length. Matches the largest chunk the audio server
/// hands to a stage, so one chunk never overruns the buffer.
pub const N_BANDS: usize = 8192;

/// Settings key controlling whether the analyzer runs
pub const SHOW_KEY: &str = "show";

/// Number of snapshot buffers available to in-flight jobs
pub const DEFAULT_SNAPSHOT_POOL: usize = 4;

/// Power spectrum published by the analyzer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerSpectrum {
    /// Sample rate of the analyzed stream in Hz
    pub rate: u32,
    /// Number of bins (N/2 + 1)
    pub n_points: u32,
    /// `(re^2 + im^2) / n_points^2` per bin
    pub magnitudes: Vec<f64>,
}

impl PowerSpectrum {
    /// Transform length the spectrum was computed from
    pub fn fft_size(&self) -> usize {
        (self.n_points as usize).saturating_sub(1) * 2
    }

    /// Center frequency of `bin` in Hz
    pub fn frequency(&self, bin: usize) -> f64 {
        match self.fft_size() {
            0 => 0.0,
            n => bin as f64 * self.rate as f64 / n as f64,
        }
    }

    /// Center frequencies of all bins
    pub fn frequencies(&self) -> Vec<f64> {
        (0..self.magnitudes.len()).map(|i| self.frequency(i)).collect()
    }

    /// Index of the strongest bin
    pub fn peak_bin(&self) -> Option<usize> {
        self.magnitudes
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
    }
}

/// State guarded by the data mutex
struct SpectrumData {
    bypass: bool,
    /// True from construction until teardown starts
    fft_ready: bool,
    in_mono: MonoBuffer,
    real_input: Vec<f32>,
}

/// State shared between the stage, its jobs and its settings callback
struct SpectrumShared {
    data: Mutex<SpectrumData>,
    fft: Mutex<Option<FftEngine>>,
    power: Signal<PowerSpectrum>,
    pool_tx: Sender<Vec<f32>>,
    pool_rx: Receiver<Vec<f32>>,
}

impl SpectrumShared {
    fn recycle(&self, snapshot: Vec<f32>) {
        // The pool is sized to hold every snapshot, this cannot fill up
        let _ = self.pool_tx.try_send(snapshot);
    }

    /// Normalized power of `real_input`, `None` when bypassed or torn down
    fn transform(&self, real_input: &[f32]) -> Option<Vec<f64>> {
        {
            let data = self.data.lock();
            if data.bypass || !data.fft_ready {
                return None;
            }
        }

        let mut fft = self.fft.lock();
        let engine = fft.as_mut()?;
        let bins = engine.execute(real_input);

        let divisor = (bins.len() * bins.len()) as f32;
        Some(
            bins.iter()
                .map(|c| ((c.re * c.re + c.im * c.im) / divisor) as f64)
                .collect(),
        )
    }
}

/// Deferred transform of one windowed snapshot
pub struct SpectrumJob {
    shared: Arc<SpectrumShared>,
    rate: u32,
    real_input: Vec<f32>,
}

impl SpectrumJob {
    pub(crate) fn run(self) {
        let SpectrumJob {
            shared,
            rate,
            real_input,
        } = self;

        let magnitudes = shared.transform(&real_input);
        shared.recycle(real_input);

        if let Some(magnitudes) = magnitudes {
            let spectrum = PowerSpectrum {
                rate,
                n_points: magnitudes.len() as u32,
                magnitudes,
            };
            shared.power.emit(&spectrum);
        }
    }
}

/// Real-time spectrum analyzer stage
///
/// # Example
/// ```
/// use fx_spectrum::{IdleQueue, MemorySettings, PipelineType, Plugin, Spectrum, StageConfig};
///
/// let queue = IdleQueue::new(16);
/// let settings = MemorySettings::new("spectrum", Spectrum::schema());
/// let config = StageConfig::new("spectrum#0", "spectrum", PipelineType::Output);
///
/// let mut spectrum = Spectrum::new(&config, &settings, queue.poster()).unwrap();
/// spectrum.base_mut().set_rate(48000);
/// spectrum.setup();
/// spectrum.set_post_messages(true);
///
/// let _connection = spectrum.power().connect(|p| println!("{} bins", p.n_points));
///
/// let input = vec![0.0_f32; 256];
/// let (mut left, mut right) = (vec![0.0; 256], vec![0.0; 256]);
/// spectrum.process(&input, &input, &mut left, &mut right);
///
/// // UI side
/// queue.dispatch_pending();
/// ```
pub struct Spectrum {
    base: PluginBase,
    shared: Arc<SpectrumShared>,
    hann_window: WindowTable,
    settings_connection: Connection,
}

impl Spectrum {
    /// Create the analyzer with the default snapshot pool
    pub fn new(
        config: &StageConfig,
        settings: &dyn SettingsSource,
        idle: IdlePoster,
    ) -> PluginResult<Self> {
        Self::with_snapshot_pool(config, settings, idle, DEFAULT_SNAPSHOT_POOL)
    }

    /// Create the analyzer with `pool_size` snapshot buffers
    ///
    /// At most `pool_size` transforms can be pending at any time; further
    /// dispatches are skipped until the UI side catches up.
    pub fn with_snapshot_pool(
        config: &StageConfig,
        settings: &dyn SettingsSource,
        idle: IdlePoster,
        pool_size: usize,
    ) -> PluginResult<Self> {
        let base = PluginBase::new("spectrum", config, idle);

        let engine = FftEngine::new(N_BANDS)?;

        let pool_size = pool_size.max(1);
        let (pool_tx, pool_rx) = channel::bounded(pool_size);
        for _ in 0..pool_size {
            let _ = pool_tx.try_send(vec![0.0_f32; N_BANDS]);
        }

        // A missing key means the analyzer stays active
        let show = settings.get_bool(SHOW_KEY).unwrap_or(true);

        let shared = Arc::new(SpectrumShared {
            data: Mutex::new(SpectrumData {
                bypass: !show,
                fft_ready: true,
                in_mono: MonoBuffer::new(N_BANDS),
                real_input: vec![0.0; N_BANDS],
            }),
            fft: Mutex::new(Some(engine)),
            power: Signal::new(),
            pool_tx,
            pool_rx,
        });

        let weak = Arc::downgrade(&shared);
        let settings_connection = settings.connect_changed(
            SHOW_KEY,
            Box::new(move |value| {
                if let (Some(shared), Some(show)) = (weak.upgrade(), value.as_bool()) {
                    shared.data.lock().bypass = !show;
                }
            }),
        );

        log::debug!(
            "{}{} created (tag {}, {} points)",
            base.log_tag(),
            base.name,
            base.tag,
            N_BANDS
        );

        Ok(Self {
            base,
            shared,
            hann_window: WindowTable::hann(N_BANDS),
            settings_connection,
        })
    }

    /// Settings keys read by the analyzer
    pub fn schema() -> Vec<KeySpec> {
        vec![KeySpec::new_bool(SHOW_KEY, "Show the spectrum", true)]
    }

    /// Power spectrum notifications
    pub fn power(&self) -> &Signal<PowerSpectrum> {
        &self.shared.power
    }

    pub fn bypass(&self) -> bool {
        self.shared.data.lock().bypass
    }

    /// Number of points per analysis window
    pub fn n_bands(&self) -> usize {
        N_BANDS
    }

    pub fn window(&self) -> &WindowTable {
        &self.hann_window
    }

    /// Copy of the mono buffer, oldest sample first
    pub fn mono_snapshot(&self) -> Vec<f32> {
        self.shared.data.lock().in_mono.as_slice().to_vec()
    }

    /// Copy of the last windowed block
    pub fn real_input_snapshot(&self) -> Vec<f32> {
        self.shared.data.lock().real_input.clone()
    }

    /// Number of snapshot buffers not currently held by a job
    pub fn free_snapshots(&self) -> usize {
        self.shared.pool_rx.len()
    }

    fn schedule_transform(&self, real_input: &[f32]) {
        let Ok(mut snapshot) = self.shared.pool_rx.try_recv() else {
            return;
        };
        snapshot.copy_from_slice(real_input);

        let job = SpectrumJob {
            shared: Arc::clone(&self.shared),
            rate: self.base.rate(),
            real_input: snapshot,
        };

        if let Err(IdleTask::Spectrum(job)) = self.base.idle().try_post(IdleTask::Spectrum(job)) {
            self.shared.recycle(job.real_input);
        }
    }
}

impl Plugin for Spectrum {
    fn info(&self) -> PluginInfo {
        PluginInfo {
            name: "Spectrum".to_string(),
            version: "1.0.0".to_string(),
            description: "Real-time FFT power spectrum of the stereo stream".to_string(),
        }
    }

    fn base(&self) -> &PluginBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut PluginBase {
        &mut self.base
    }

    fn setup(&mut self) {
        let mut data = self.shared.data.lock();

        data.in_mono.clear();
        data.real_input.fill(0.0);

        debug_assert_eq!(data.in_mono.len(), N_BANDS);
        debug_assert_eq!(data.real_input.len(), N_BANDS);

        log::debug!(
            "{}{} setup at {} Hz",
            self.base.log_tag(),
            self.base.name,
            self.base.rate()
        );
    }

    fn process(
        &mut self,
        left_in: &[f32],
        right_in: &[f32],
        left_out: &mut [f32],
        right_out: &mut [f32],
    ) {
        let mut data = self.shared.data.lock();

        let n_left = left_in.len().min(left_out.len());
        let n_right = right_in.len().min(right_out.len());
        left_out[..n_left].copy_from_slice(&left_in[..n_left]);
        right_out[..n_right].copy_from_slice(&right_in[..n_right]);

        if data.bypass || !data.fft_ready {
            return;
        }

        debug_assert_eq!(left_in.len(), right_in.len());
        debug_assert!(
            left_in.len() <= N_BANDS,
            "chunk of {} frames exceeds the {} point window",
            left_in.len(),
            N_BANDS
        );

        let SpectrumData {
            in_mono,
            real_input,
            ..
        } = &mut *data;

        in_mono.shift_in(left_in, right_in);
        self.hann_window.apply(in_mono.as_slice(), real_input);

        if self.base.post_messages() {
            self.schedule_transform(real_input);
        }
    }

    fn latency_seconds(&self) -> f32 {
        0.0
    }
}

impl Drop for Spectrum {
    fn drop(&mut self) {
        if self.base.connected() {
            self.base.disconnect();
        }

        self.settings_connection.disconnect();

        let mut data = self.shared.data.lock();
        data.fft_ready = false;
        // Jobs still queued find no engine and return
        self.shared.fft.lock().take();
        drop(data);

        log::debug!("{}{} destroyed", self.base.log_tag(), self.base.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::IdleQueue;
    use crate::plugins::PipelineType;
    use crate::settings::MemorySettings;

    fn make(queue: &IdleQueue, settings: &MemorySettings) -> Spectrum {
        let config = StageConfig::new("spectrum#0", "test.spectrum", PipelineType::Output);
        let mut spectrum = Spectrum::new(&config, settings, queue.poster()).unwrap();
        spectrum.base_mut().set_rate(48000);
        spectrum.setup();
        spectrum
    }

    #[test]
    fn test_initial_bypass_follows_show() {
        let queue = IdleQueue::new(4);
        let settings = MemorySettings::new("test.spectrum", Spectrum::schema());
        settings.set_bool(SHOW_KEY, false).unwrap();

        let spectrum = make(&queue, &settings);
        assert!(spectrum.bypass());

        settings.set_bool(SHOW_KEY, true).unwrap();
        assert!(!spectrum.bypass());
    }

    #[test]
    fn test_missing_show_key_means_active() {
        let queue = IdleQueue::new(4);
        let settings = MemorySettings::new("empty", Vec::new());
        let spectrum = make(&queue, &settings);
        assert!(!spectrum.bypass());
    }

    #[test]
    fn test_no_dispatch_without_post_messages() {
        let queue = IdleQueue::new(4);
        let settings = MemorySettings::new("test.spectrum", Spectrum::schema());
        let mut spectrum = make(&queue, &settings);

        let chunk = vec![0.25_f32; 64];
        let (mut l, mut r) = (vec![0.0; 64], vec![0.0; 64]);
        spectrum.process(&chunk, &chunk, &mut l, &mut r);

        assert_eq!(queue.pending(), 0);
        assert_eq!(spectrum.mono_snapshot()[N_BANDS - 1], 0.25);
    }

    #[test]
    fn test_full_queue_returns_snapshot_to_pool() {
        let queue = IdleQueue::new(1);
        let settings = MemorySettings::new("test.spectrum", Spectrum::schema());
        let mut spectrum = make(&queue, &settings);
        spectrum.set_post_messages(true);

        let chunk = vec![0.5_f32; 32];
        let (mut l, mut r) = (vec![0.0; 32], vec![0.0; 32]);
        for _ in 0..3 {
            spectrum.process(&chunk, &chunk, &mut l, &mut r);
        }

        assert_eq!(queue.pending(), 1);
        assert_eq!(spectrum.free_snapshots(), DEFAULT_SNAPSHOT_POOL - 1);

        queue.dispatch_pending();
        assert_eq!(spectrum.free_snapshots(), DEFAULT_SNAPSHOT_POOL);
    }

    #[test]
    fn test_power_spectrum_helpers() {
        let spectrum = PowerSpectrum {
            rate: 48000,
            n_points: 5,
            magnitudes: vec![0.1, 0.2, 0.9, 0.3, 0.0],
        };
        assert_eq!(spectrum.fft_size(), 8);
        assert_eq!(spectrum.frequency(1), 6000.0);
        assert_eq!(spectrum.frequencies().len(), 5);
        assert_eq!(spectrum.peak_bin(), Some(2));
    }
}
