//! Scope facade: sample ingestion and configuration in one place
//!
//! Ingestion and every configuration change run under one mutex, so a
//! reallocation is never observed half-done by the writer. The renderer
//! never takes that mutex; it reads the current [`SweepBank`] and
//! [`ScopeConfig`] through [`Snapshot`]s.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use sweepscope_core::{
    channel_error, types::validate_rate, BitDepth, ChannelAssignment, ConfigChange, FilterFamily,
    FilterSelection, ScopeConfig, ScopeResult, MAX_CHANNELS,
};
use sweepscope_processing::{FilterOrder, FilterSettings, PipelineBank};
use sweepscope_simulation::StreamInfo;
use tracing::{debug, info};

use crate::sweep::{Snapshot, SweepBank};

/// Counters reported by [`Scope::stats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeStats {
    pub connected: bool,
    pub frames_ingested: u64,
    /// Filtered but not written because the display was paused
    pub frames_frozen: u64,
    /// Discarded because no stream was connected
    pub frames_dropped: u64,
    pub poison_resets: u64,
    pub configuration_misses: u64,
    pub buffer_generation: u64,
    pub frames_rendered: u64,
}

#[derive(Debug, Default)]
struct Counters {
    frames_ingested: AtomicU64,
    frames_frozen: AtomicU64,
    frames_dropped: AtomicU64,
    frames_rendered: AtomicU64,
}

#[derive(Debug)]
struct IngestState {
    config: ScopeConfig,
    pipelines: PipelineBank,
    generation: u64,
    accepting: bool,
    stream: Option<StreamInfo>,
}

/// Live scope state shared by ingestion, rendering and control
#[derive(Debug)]
pub struct Scope {
    state: Mutex<IngestState>,
    config: Snapshot<ScopeConfig>,
    sweeps: Snapshot<SweepBank>,
    counters: Counters,
}

impl Scope {
    /// A scope accepting samples immediately, without a stream attached.
    pub fn new(config: ScopeConfig) -> ScopeResult<Self> {
        config.validate()?;
        let sweeps = SweepBank::new(config.channels.indices(), config.sweep_capacity(), 0);
        let state = IngestState {
            pipelines: PipelineBank::new(config.sampling_rate_hz),
            config: config.clone(),
            generation: 0,
            accepting: true,
            stream: None,
        };
        Ok(Self {
            state: Mutex::new(state),
            config: Snapshot::new(config),
            sweeps: Snapshot::new(sweeps),
            counters: Counters::default(),
        })
    }

    pub fn config(&self) -> Arc<ScopeConfig> {
        self.config.load()
    }

    /// Buffers currently being written.
    pub fn sweeps(&self) -> Arc<SweepBank> {
        self.sweeps.load()
    }

    pub fn stream_info(&self) -> Option<StreamInfo> {
        self.state.lock().stream.clone()
    }

    /// Channels selectable under the current stream.
    pub fn channel_limit(&self) -> usize {
        Self::limit_of(&self.state.lock())
    }

    fn limit_of(state: &IngestState) -> usize {
        state
            .stream
            .as_ref()
            .map_or(MAX_CHANNELS, |info| info.channel_count.clamp(1, MAX_CHANNELS))
    }

    /// One raw frame, one value per stream channel.
    pub fn on_samples(&self, frame: &[f32]) {
        let mut state = self.state.lock();
        let sweeps = self.sweeps.load();
        self.ingest(&mut state, &sweeps, frame);
    }

    /// Consecutive frames under a single lock acquisition.
    pub fn on_batch(&self, frames: &[Vec<f32>]) {
        let mut state = self.state.lock();
        let sweeps = self.sweeps.load();
        for frame in frames {
            self.ingest(&mut state, &sweeps, frame);
        }
    }

    #[inline]
    fn ingest(&self, state: &mut IngestState, sweeps: &SweepBank, frame: &[f32]) {
        if !state.accepting {
            self.counters.frames_dropped.fetch_add(1, Ordering::Relaxed);
            return;
        }
        let IngestState {
            config, pipelines, ..
        } = state;
        let depth = config.display.bit_depth;

        if config.paused {
            // filters keep running so resuming shows no transient
            pipelines.process_frame(frame, config.channels.indices(), |_, _| {});
            self.counters.frames_frozen.fetch_add(1, Ordering::Relaxed);
            return;
        }

        pipelines.process_frame(frame, config.channels.indices(), |line, filtered| {
            if let Some(line) = sweeps.line(line) {
                line.buffer.write(depth.normalize(filtered));
            }
        });
        self.counters.frames_ingested.fetch_add(1, Ordering::Relaxed);
    }

    /// Select or bypass one filter family on one channel.
    pub fn set_channel_filter(&self, channel: usize, selection: FilterSelection) -> ScopeResult<()> {
        let mut state = self.state.lock();
        state.pipelines.set_channel_filter(channel, selection)?;
        debug!(channel, ?selection, "channel filter");
        Ok(())
    }

    /// Apply one selection to every channel of the stream.
    pub fn apply_filter_to_all(&self, selection: FilterSelection) -> ScopeResult<()> {
        let mut state = self.state.lock();
        let limit = Self::limit_of(&state);
        state.pipelines.apply_to_channels(0..limit, selection)
    }

    /// Bypass one family on every channel of the stream.
    pub fn clear_filter_family(&self, family: FilterFamily) -> ScopeResult<()> {
        let mut state = self.state.lock();
        let limit = Self::limit_of(&state);
        state.pipelines.clear_channels(0..limit, family)
    }

    pub fn set_filter_order(&self, order: FilterOrder) {
        self.state.lock().pipelines.set_order(order);
    }

    pub fn filter_settings(&self) -> FilterSettings {
        self.state.lock().pipelines.settings()
    }

    pub fn apply_filter_settings(&self, settings: &FilterSettings) -> ScopeResult<()> {
        self.state.lock().pipelines.apply_settings(settings)
    }

    /// Human-readable filter chain of one channel.
    pub fn describe_channel(&self, channel: usize) -> Option<String> {
        self.state.lock().pipelines.pipeline(channel).map(|p| p.describe())
    }

    pub fn set_sample_rate(&self, rate_hz: f32) -> ScopeResult<ConfigChange> {
        let rate_hz = validate_rate(rate_hz)?;
        self.update(|config| config.sampling_rate_hz = rate_hz)
    }

    pub fn set_time_base(&self, seconds: f32) -> ScopeResult<ConfigChange> {
        self.update(|config| config.display.time_base_seconds = seconds)
    }

    /// Replace the displayed channels; order on screen is ascending.
    pub fn set_channel_set(
        &self,
        channels: impl IntoIterator<Item = usize>,
    ) -> ScopeResult<ConfigChange> {
        let assignment = ChannelAssignment::new(channels)?;
        let mut state = self.state.lock();
        let limit = Self::limit_of(&state);
        if let Some(bad) = assignment.iter().find(|&channel| channel >= limit) {
            return Err(channel_error!(bad, limit));
        }
        let mut next = state.config.clone();
        next.channels = assignment;
        self.reconcile(&mut state, next, false)
    }

    /// Add or remove one channel from the display.
    pub fn toggle_channel(&self, channel: usize) -> ScopeResult<ConfigChange> {
        let mut state = self.state.lock();
        let limit = Self::limit_of(&state);
        if channel >= limit {
            return Err(channel_error!(channel, limit));
        }
        let mut next = state.config.clone();
        next.channels.toggle(channel)?;
        self.reconcile(&mut state, next, false)
    }

    /// Display every channel of the stream.
    pub fn select_all_channels(&self) -> ScopeResult<ConfigChange> {
        let mut state = self.state.lock();
        let limit = Self::limit_of(&state);
        let mut next = state.config.clone();
        next.channels.select_all(limit);
        self.reconcile(&mut state, next, false)
    }

    /// Back to channel 0 only.
    pub fn reset_channels(&self) -> ScopeResult<ConfigChange> {
        self.update(|config| config.channels.reset())
    }

    pub fn set_vertical_scale(&self, scale: f32) -> ScopeResult<ConfigChange> {
        self.update(|config| config.display.vertical_scale = scale)
    }

    pub fn set_bit_depth(&self, bits: u8) -> ScopeResult<ConfigChange> {
        let depth = BitDepth::try_from(bits)?;
        self.update(|config| config.display.bit_depth = depth)
    }

    /// Freeze or resume the display. Resuming restarts the sweep at the left edge.
    pub fn set_paused(&self, paused: bool) -> ScopeResult<ConfigChange> {
        self.update(|config| config.paused = paused)
    }

    /// The drawing surface changed size; buffers are rebuilt.
    pub fn notify_viewport_changed(&self) -> ScopeResult<ConfigChange> {
        let mut state = self.state.lock();
        let next = state.config.clone();
        self.reconcile(&mut state, next, true)
    }

    /// Adopt a stream's rate and resolution and start accepting its frames.
    pub fn connect(&self, info: &StreamInfo) -> ScopeResult<ConfigChange> {
        let rate_hz = validate_rate(info.nominal_srate)?;
        let mut state = self.state.lock();
        let mut next = state.config.clone();
        next.sampling_rate_hz = rate_hz;
        next.display.bit_depth = info.resolution;
        next.channels.retain_below(info.channel_count.clamp(1, MAX_CHANNELS));
        let change = self.reconcile(&mut state, next, true)?;
        state.stream = Some(info.clone());
        state.accepting = true;
        info!(
            name = %info.name,
            source = %info.source_id,
            srate = rate_hz,
            channels = info.channel_count,
            bits = info.resolution.bits(),
            "scope connected"
        );
        Ok(change)
    }

    /// Stop accepting frames; the last sweep stays on screen.
    pub fn disconnect(&self) {
        let mut state = self.state.lock();
        if !state.accepting {
            return;
        }
        state.accepting = false;
        state.stream = None;
        info!("scope disconnected, display frozen");
    }

    pub fn is_accepting(&self) -> bool {
        self.state.lock().accepting
    }

    pub(crate) fn record_rendered_frame(&self) {
        self.counters.frames_rendered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> ScopeStats {
        let (connected, filters, generation) = {
            let state = self.state.lock();
            (state.accepting, state.pipelines.stats(), state.generation)
        };
        ScopeStats {
            connected,
            frames_ingested: self.counters.frames_ingested.load(Ordering::Relaxed),
            frames_frozen: self.counters.frames_frozen.load(Ordering::Relaxed),
            frames_dropped: self.counters.frames_dropped.load(Ordering::Relaxed),
            poison_resets: filters.poison_resets,
            configuration_misses: filters.configuration_misses,
            buffer_generation: generation,
            frames_rendered: self.counters.frames_rendered.load(Ordering::Relaxed),
        }
    }

    fn update(&self, edit: impl FnOnce(&mut ScopeConfig)) -> ScopeResult<ConfigChange> {
        let mut state = self.state.lock();
        let mut next = state.config.clone();
        edit(&mut next);
        self.reconcile(&mut state, next, false)
    }

    /// Move live state from the current config to `next`.
    ///
    /// Runs with the ingestion lock held, so the writer sees either the old
    /// buffers or the new ones, never a mix.
    fn reconcile(
        &self,
        state: &mut IngestState,
        next: ScopeConfig,
        force_reallocate: bool,
    ) -> ScopeResult<ConfigChange> {
        next.validate()?;
        if next == state.config && !force_reallocate {
            return Ok(ConfigChange::default());
        }

        let mut change = ScopeConfig::diff(&state.config, &next);
        change.reallocate |= force_reallocate;
        if change.reallocate {
            change.rewind = false;
        }

        if change.reset_filters {
            state.pipelines.set_sample_rate(next.sampling_rate_hz);
        }
        if change.reallocate {
            state.generation += 1;
            let capacity = next.sweep_capacity();
            self.sweeps.store(SweepBank::new(
                next.channels.indices(),
                capacity,
                state.generation,
            ));
            info!(
                generation = state.generation,
                capacity,
                lines = next.channels.len(),
                "sweep buffers reallocated"
            );
        } else if change.rewind {
            self.sweeps.load().rewind();
            debug!("sweep rewound");
        }

        debug!(?change, paused = next.paused, "configuration applied");
        self.config.store(next.clone());
        state.config = next;
        Ok(change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sweepscope_core::{ExgType, NotchType, ScopeError};
    use sweepscope_simulation::ExgSimConfig;

    fn info(srate: f32, channels: usize, resolution: BitDepth) -> StreamInfo {
        let device = ExgSimConfig {
            sampling_rate_hz: srate,
            channel_count: channels,
            resolution,
            ..ExgSimConfig::default()
        };
        StreamInfo::from_config("test", &device)
    }

    fn bits(values: &[f32]) -> Vec<u32> {
        values.iter().map(|v| v.to_bits()).collect()
    }

    fn scope_24bit() -> Scope {
        let mut config = ScopeConfig::default();
        config.display.bit_depth = BitDepth::Bits24;
        Scope::new(config).unwrap()
    }

    #[test]
    fn test_default_capacity() {
        let scope = Scope::new(ScopeConfig::default()).unwrap();
        let sweeps = scope.sweeps();
        assert_eq!(sweeps.capacity(), 2000);
        assert_eq!(sweeps.channels(), vec![0]);
    }

    #[test]
    fn test_full_sweep_plus_one() {
        let scope = scope_24bit();
        let capacity = scope.config().sweep_capacity();
        assert_eq!(capacity, 2000);

        let bank = SweepBank::new(&[0], capacity, 0);
        let line = &bank.lines()[0].buffer;
        for _ in 0..=capacity {
            line.write(BitDepth::Bits24.normalize(8_388_608.0));
        }
        assert_eq!(line.value_at(0), Some(1.0));
        assert_eq!(line.cursor(), 1);

        for _ in 0..=capacity {
            scope.on_samples(&[8_388_608.0]);
        }
        assert_eq!(scope.sweeps().lines()[0].buffer.cursor(), 1);
        assert_eq!(scope.stats().frames_ingested, 2001);
    }

    #[test]
    fn test_normalizes_with_bit_depth() {
        let scope = Scope::new(ScopeConfig::default()).unwrap();
        scope.set_bit_depth(16).unwrap();
        scope.on_samples(&[32_768.0]);
        let first = scope.sweeps().lines()[0].buffer.value_at(0).unwrap();
        // first baseline output is b0 times the input
        assert!((first - 0.995_567).abs() < 1e-4, "{}", first);
    }

    #[test]
    fn test_time_base_reallocates() {
        let scope = Scope::new(ScopeConfig::default()).unwrap();
        for _ in 0..10 {
            scope.on_samples(&[100.0]);
        }
        let change = scope.set_time_base(2.0).unwrap();
        assert!(change.reallocate);
        assert!(!change.reset_filters);
        let sweeps = scope.sweeps();
        assert_eq!(sweeps.capacity(), 1000);
        assert_eq!(sweeps.generation(), 1);
        let line = &sweeps.lines()[0].buffer;
        assert_eq!(line.cursor(), 0);
        assert!(line.snapshot().iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_sample_rate_change() {
        let scope = Scope::new(ScopeConfig::default()).unwrap();
        let change = scope.set_sample_rate(1000.0).unwrap();
        assert!(change.reallocate && change.reset_filters);
        assert_eq!(scope.sweeps().capacity(), 4000);
        assert!(matches!(
            scope.set_sample_rate(0.0),
            Err(ScopeError::InvalidSampleRate { .. })
        ));
        // unchanged config after a rejected update
        assert_eq!(scope.config().sampling_rate_hz, 1000.0);
    }

    #[test]
    fn test_oversized_sweep_is_rejected() {
        let scope = Scope::new(ScopeConfig::default()).unwrap();
        assert!(matches!(
            scope.set_time_base(1.0e12),
            Err(ScopeError::InvalidTimeBase { .. })
        ));
        assert!(matches!(
            scope.set_sample_rate(1.0e30),
            Err(ScopeError::InvalidSampleRate { .. })
        ));

        let sweeps = scope.sweeps();
        assert_eq!(sweeps.generation(), 0);
        assert_eq!(sweeps.capacity(), 2000);
        assert_eq!(*scope.config(), ScopeConfig::default());
    }

    #[test]
    fn test_same_value_is_noop() {
        let scope = Scope::new(ScopeConfig::default()).unwrap();
        assert!(scope.set_time_base(4.0).unwrap().is_empty());
        assert_eq!(scope.sweeps().generation(), 0);
    }

    #[test]
    fn test_pause_freezes_and_resume_rewinds() {
        let scope = scope_24bit();
        for _ in 0..50 {
            scope.on_samples(&[0.0]);
        }
        scope.set_paused(true).unwrap();
        let before = scope.sweeps().lines()[0].buffer.snapshot();
        for _ in 0..20 {
            scope.on_samples(&[1000.0]);
        }
        assert_eq!(bits(&scope.sweeps().lines()[0].buffer.snapshot()), bits(&before));
        assert_eq!(scope.sweeps().lines()[0].buffer.cursor(), 50);
        assert_eq!(scope.stats().frames_frozen, 20);

        let change = scope.set_paused(false).unwrap();
        assert!(change.rewind && !change.reallocate);
        assert_eq!(scope.sweeps().lines()[0].buffer.cursor(), 0);
        assert_eq!(scope.sweeps().generation(), 0);
    }

    #[test]
    fn test_channel_set_changes_lines() {
        let scope = Scope::new(ScopeConfig::default()).unwrap();
        scope.set_channel_set([3, 1]).unwrap();
        assert_eq!(scope.sweeps().channels(), vec![1, 3]);

        scope.on_samples(&[0.0, 10.0, 0.0, 20.0]);
        let sweeps = scope.sweeps();
        assert!(sweeps.lines().iter().all(|line| line.buffer.cursor() == 1));

        scope.toggle_channel(1).unwrap();
        assert_eq!(scope.sweeps().channels(), vec![3]);
        scope.reset_channels().unwrap();
        assert_eq!(scope.sweeps().channels(), vec![0]);
        assert!(scope.set_channel_set([16]).is_err());
    }

    #[test]
    fn test_short_frame_skips_missing_channels() {
        let scope = Scope::new(ScopeConfig::default()).unwrap();
        scope.set_channel_set([0, 5]).unwrap();
        scope.on_samples(&[1.0, 2.0]);
        let sweeps = scope.sweeps();
        assert_eq!(sweeps.lines()[0].buffer.cursor(), 1);
        assert_eq!(sweeps.lines()[1].buffer.cursor(), 0);
    }

    #[test]
    fn test_connect_adopts_stream() {
        let scope = Scope::new(ScopeConfig::default()).unwrap();
        scope.set_channel_set([0, 2, 7]).unwrap();
        let change = scope.connect(&info(1000.0, 4, BitDepth::Bits16)).unwrap();
        assert!(change.reallocate && change.reset_filters && change.renormalize);

        let config = scope.config();
        assert_eq!(config.sampling_rate_hz, 1000.0);
        assert_eq!(config.display.bit_depth, BitDepth::Bits16);
        assert_eq!(config.channels.indices(), &[0, 2]);
        assert_eq!(scope.channel_limit(), 4);

        scope.select_all_channels().unwrap();
        assert_eq!(scope.sweeps().channels(), vec![0, 1, 2, 3]);
        assert!(scope.toggle_channel(4).is_err());
    }

    #[test]
    fn test_connect_rejects_unsupported_rate() {
        let scope = Scope::new(ScopeConfig::default()).unwrap();
        assert!(scope.connect(&info(-5.0, 4, BitDepth::Bits10)).is_err());
        assert!(scope.stream_info().is_none());
    }

    #[test]
    fn test_disconnect_freezes_display() {
        let scope = scope_24bit();
        for _ in 0..10 {
            scope.on_samples(&[1000.0]);
        }
        scope.disconnect();
        let frozen = scope.sweeps().lines()[0].buffer.snapshot();
        for _ in 0..10 {
            scope.on_samples(&[5000.0]);
        }
        let after = scope.sweeps().lines()[0].buffer.snapshot();
        assert_eq!(bits(&frozen), bits(&after));
        let stats = scope.stats();
        assert!(!stats.connected);
        assert_eq!(stats.frames_dropped, 10);
        assert_eq!(stats.frames_ingested, 10);
    }

    #[test]
    fn test_filter_controls() {
        let scope = Scope::new(ScopeConfig::default()).unwrap();
        scope.connect(&info(500.0, 3, BitDepth::Bits10)).unwrap();
        scope
            .set_channel_filter(1, FilterSelection::Exg(Some(ExgType::Ecg)))
            .unwrap();
        scope
            .apply_filter_to_all(FilterSelection::Notch(Some(NotchType::Hz50)))
            .unwrap();

        let settings = scope.filter_settings();
        assert_eq!(settings.channels.len(), 3);
        assert!(scope.describe_channel(1).unwrap().contains("ECG"));

        scope.clear_filter_family(FilterFamily::Notch).unwrap();
        assert_eq!(scope.filter_settings().channels.len(), 1);
        assert!(scope
            .set_channel_filter(16, FilterSelection::Exg(None))
            .is_err());
    }

    #[test]
    fn test_vertical_scale_does_not_touch_buffers() {
        let scope = Scope::new(ScopeConfig::default()).unwrap();
        let change = scope.set_vertical_scale(2.5).unwrap();
        assert!(change.rescale && !change.reallocate);
        assert_eq!(scope.sweeps().generation(), 0);
        assert!(scope.set_vertical_scale(0.0).is_err());
    }
}
