use std::sync::Arc;
use std::time::Duration;
use sweepscope_core::{BitDepth, FilterSelection, NotchType, ScopeConfig};
use sweepscope_simulation::{
    start_exg_stream, ExgSimConfig, ExgSimulator, NoiseConfig, SignalPattern, StreamCommand,
    StreamConfig,
};
use sweepscope_viewer::{spawn_ingestion, spawn_render_driver, RecordingBackend, Scope};

fn quiet(pattern: SignalPattern, channels: usize) -> ExgSimConfig {
    ExgSimConfig {
        sampling_rate_hz: 500.0,
        channel_count: channels,
        resolution: BitDepth::Bits16,
        pattern,
        noise: NoiseConfig {
            gaussian_std: 0.0,
            baseline_wander: 0.0,
            powerline_amplitude: 0.0,
            powerline_hz: None,
        },
        seed: Some(11),
    }
}

fn peak(values: &[f32]) -> f32 {
    values
        .iter()
        .filter(|v| !v.is_nan())
        .fold(0.0f32, |acc, v| acc.max(v.abs()))
}

#[tokio::test]
async fn test_stream_to_screen() {
    let scope = Arc::new(Scope::new(ScopeConfig::default()).unwrap());
    scope.set_channel_set([0, 1]).unwrap();

    let stream = StreamConfig {
        simulator: ExgSimConfig {
            sampling_rate_hz: 1000.0,
            ..quiet(SignalPattern::default(), 3)
        },
        batch_size: 10,
        ..StreamConfig::default()
    };
    let (receiver, control, info) = start_exg_stream(stream).unwrap();
    let ingestion = spawn_ingestion(receiver, Arc::clone(&scope));
    let render = spawn_render_driver(Arc::clone(&scope), RecordingBackend::new(), 100);

    control.send(StreamCommand::Start).await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;
    control.send(StreamCommand::Stop).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let report = ingestion.stop().await.unwrap();
    let backend = render.stop().await.unwrap();

    assert_eq!(report.connects, 1);
    assert!(report.frames > 0);

    let config = scope.config();
    assert_eq!(config.sampling_rate_hz, info.nominal_srate);
    assert_eq!(config.display.bit_depth, BitDepth::Bits16);
    let sweeps = scope.sweeps();
    assert_eq!(sweeps.capacity(), 4000);

    let stats = scope.stats();
    assert!(!stats.connected);
    assert_eq!(stats.frames_ingested, report.frames);
    assert!(stats.frames_rendered >= 1);
    assert_eq!(stats.poison_resets, 0);

    // both lines advance together
    let cursors: Vec<usize> = sweeps.lines().iter().map(|l| l.buffer.cursor()).collect();
    assert_eq!(cursors[0], cursors[1]);
    assert_eq!(cursors[0] as u64, report.frames % 4000);

    assert_eq!(backend.channels(), &[0, 1]);
    assert_eq!(backend.line(0).map(<[f32]>::len), Some(4000));
}

#[test]
fn test_notch_removes_mains_tone() {
    let tone = SignalPattern::Sine {
        frequency: 50.0,
        amplitude: 0.5,
    };
    let frames = ExgSimulator::new(quiet(tone, 1)).unwrap().generate(4000);

    let mut config = ScopeConfig::default();
    config.display.bit_depth = BitDepth::Bits16;

    let plain = Scope::new(config.clone()).unwrap();
    plain.on_batch(&frames);

    let notched = Scope::new(config).unwrap();
    notched
        .set_channel_filter(0, FilterSelection::Notch(Some(NotchType::Hz50)))
        .unwrap();
    notched.on_batch(&frames);

    let raw_peak = peak(&plain.sweeps().lines()[0].buffer.snapshot());
    let notched_peak = peak(&notched.sweeps().lines()[0].buffer.snapshot());
    assert!(raw_peak > 0.45, "{}", raw_peak);
    assert!(notched_peak < 0.05, "{}", notched_peak);
}

#[tokio::test]
async fn test_reconfigure_while_rendering() {
    let scope = Arc::new(Scope::new(ScopeConfig::default()).unwrap());
    let render = spawn_render_driver(Arc::clone(&scope), RecordingBackend::new(), 200);
    let frames = ExgSimulator::new(quiet(SignalPattern::default(), 4))
        .unwrap()
        .generate(600);

    scope.select_all_channels().unwrap();
    for chunk in frames.chunks(25) {
        scope.on_batch(chunk);
        tokio::task::yield_now().await;
    }
    scope.set_time_base(1.0).unwrap();
    scope.set_channel_set([1, 3]).unwrap();
    for chunk in frames.chunks(25).take(4) {
        scope.on_batch(chunk);
    }
    tokio::time::sleep(Duration::from_millis(30)).await;

    let backend = render.stop().await.unwrap();
    let sweeps = scope.sweeps();
    assert_eq!(sweeps.capacity(), 500);
    assert_eq!(sweeps.channels(), vec![1, 3]);
    assert!(sweeps.lines().iter().all(|l| l.buffer.cursor() == 100));
    assert_eq!(backend.channels(), &[1, 3]);
    assert_eq!(backend.line(0).map(<[f32]>::len), Some(500));
}
