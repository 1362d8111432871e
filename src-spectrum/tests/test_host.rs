// ============================================================================
// Plugin Host Integration Tests
// ============================================================================
//
// Spectrum stages driven through the host, including level meters and the
// configuration helpers.

use fx_spectrum::tones::{gen_bin_tone, gen_tone};
use fx_spectrum::{
    IdleQueue, LevelPair, N_BANDS, PipelineConfig, PipelineType, Plugin, PluginHost,
    PowerSpectrum, Spectrum,
};
use parking_lot::Mutex;
use std::sync::Arc;

fn spectrum_host(config: &PipelineConfig, queue: &IdleQueue) -> PluginHost {
    let settings = config.spectrum_settings("spectrum");
    let stage = config.stage_config("spectrum#0", "spectrum", PipelineType::Output);
    let spectrum = Spectrum::with_snapshot_pool(
        &stage,
        &settings,
        queue.poster(),
        config.snapshot_pool_size,
    )
    .unwrap();

    let mut host = PluginHost::new(config.sample_rate, config.max_frames);
    host.add_plugin(Box::new(spectrum));
    host
}

#[test]
fn test_host_is_transparent_with_spectrum() {
    let config = PipelineConfig::default();
    let queue = IdleQueue::new(config.idle_queue_capacity);
    let mut host = spectrum_host(&config, &queue);
    host.set_post_messages(true);

    let left = gen_tone(1000.0, 0.5, config.sample_rate, 4096);
    let right = gen_tone(250.0, 0.25, config.sample_rate, 4096);
    let mut left_out = vec![0.0; 4096];
    let mut right_out = vec![0.0; 4096];

    for _ in 0..4 {
        let frames = host.process(&left, &right, &mut left_out, &mut right_out);
        assert_eq!(frames, 4096);
        assert_eq!(left_out, left);
        assert_eq!(right_out, right);
        queue.dispatch_pending();
    }

    assert_eq!(host.total_latency_seconds(), 0.0);
}

#[test]
fn test_spectrum_and_levels_through_host() {
    let config = PipelineConfig::default();
    let queue = IdleQueue::new(config.idle_queue_capacity);
    let settings = config.spectrum_settings("spectrum");
    let stage = config.stage_config("spectrum#0", "spectrum", PipelineType::Output);
    let spectrum = Spectrum::new(&stage, &settings, queue.poster()).unwrap();

    let received: Arc<Mutex<Vec<PowerSpectrum>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    let _power = spectrum.power().connect(move |p| sink.lock().push(p.clone()));

    let levels: Arc<Mutex<Vec<LevelPair>>> = Arc::new(Mutex::new(Vec::new()));
    let level_sink = Arc::clone(&levels);
    let _levels = spectrum
        .output_level()
        .connect(move |l| level_sink.lock().push(*l));

    let mut host = PluginHost::new(config.sample_rate, config.max_frames);
    host.add_plugin(Box::new(spectrum));
    host.set_post_messages(true);

    let plugin = host.get_plugin(0).unwrap();
    assert_eq!(plugin.info().name, "Spectrum");
    assert_eq!(plugin.base().rate(), config.sample_rate);
    assert!(plugin.base().connected());

    let tone = gen_bin_tone(64, N_BANDS, 0.5, N_BANDS);
    let mut out = vec![0.0; 1024];
    let mut out_r = vec![0.0; 1024];
    for piece in tone.chunks(1024) {
        host.process(piece, piece, &mut out, &mut out_r);
    }

    // 4 pooled snapshots plus one level update; the other frames were dropped
    assert_eq!(queue.pending(), 5);
    queue.dispatch_pending();

    let received = received.lock();
    assert_eq!(received.len(), 4);
    assert!(received.iter().all(|p| p.rate == config.sample_rate));

    // 8192 samples at 48 kHz cross the 100 ms meter interval once
    let levels = levels.lock();
    assert_eq!(levels.len(), 1);
    assert!((levels[0].left - 20.0 * 0.5f32.log10()).abs() < 0.1);
    assert!((levels[0].right - levels[0].left).abs() < 1e-6);
}

#[test]
fn test_show_spectrum_false_bypasses() {
    let config = PipelineConfig::from_json_str(r#"{ "show_spectrum": false }"#).unwrap();
    let queue = IdleQueue::new(config.idle_queue_capacity);
    let mut host = spectrum_host(&config, &queue);
    host.set_post_messages(true);

    let chunk = vec![0.5_f32; 1024];
    let mut out = vec![0.0; 1024];
    let mut out_r = vec![0.0; 1024];
    host.process(&chunk, &chunk, &mut out, &mut out_r);

    // No spectrum job, and the level interval is not reached yet
    assert_eq!(queue.pending(), 0);
}

#[test]
fn test_remove_and_reconfigure() {
    let config = PipelineConfig::default();
    let queue = IdleQueue::new(config.idle_queue_capacity);
    let mut host = spectrum_host(&config, &queue);

    host.set_rate(44100);
    assert_eq!(host.get_plugin(0).unwrap().base().rate(), 44100);

    let removed = host.remove_plugin(0).unwrap();
    assert!(!removed.base().connected());
    assert_eq!(host.plugin_count(), 0);
    assert!(host.remove_plugin(0).is_err());
}
