//! Real-time multi-channel stream feeding the scope
//!
//! Frames are generated on a fixed cadence, grouped into batches and
//! published over a broadcast channel together with connect/disconnect
//! events. Control commands arrive over an mpsc channel.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use sweepscope_core::{BitDepth, ScopeResult};
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::exg_simulator::{ExgSimConfig, ExgSimulator};

/// Frames per batch unless configured otherwise
pub const DEFAULT_BATCH_SIZE: usize = 25;

/// Metadata announced when a stream connects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamInfo {
    pub name: String,
    pub source_id: Uuid,
    pub nominal_srate: f32,
    pub channel_count: usize,
    pub resolution: BitDepth,
}

impl StreamInfo {
    pub fn from_config(name: &str, config: &ExgSimConfig) -> Self {
        Self {
            name: name.to_string(),
            source_id: Uuid::new_v4(),
            nominal_srate: config.sampling_rate_hz,
            channel_count: config.channel_count,
            resolution: config.resolution,
        }
    }
}

/// Consecutive frames delivered together
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBatch {
    pub sequence: u64,
    pub frames: Vec<Vec<f32>>,
}

/// What subscribers receive
#[derive(Debug, Clone)]
pub enum StreamEvent {
    Connected(StreamInfo),
    Samples(Arc<SampleBatch>),
    Disconnected,
}

/// Groups frames into batches, dropping a frame identical to its predecessor
#[derive(Debug, Clone)]
pub struct FrameBatcher {
    batch_size: usize,
    drop_duplicates: bool,
    pending: Vec<Vec<f32>>,
    last: Option<Vec<f32>>,
    sequence: u64,
    duplicates_dropped: u64,
}

impl FrameBatcher {
    pub fn new(batch_size: usize, drop_duplicates: bool) -> Self {
        let batch_size = batch_size.max(1);
        Self {
            batch_size,
            drop_duplicates,
            pending: Vec::with_capacity(batch_size),
            last: None,
            sequence: 0,
            duplicates_dropped: 0,
        }
    }

    /// Add a frame; returns a batch once `batch_size` frames are pending.
    pub fn push(&mut self, frame: Vec<f32>) -> Option<SampleBatch> {
        if self.drop_duplicates && self.last.as_ref() == Some(&frame) {
            self.duplicates_dropped += 1;
            return None;
        }
        if self.drop_duplicates {
            self.last = Some(frame.clone());
        }
        self.pending.push(frame);
        if self.pending.len() >= self.batch_size {
            self.flush()
        } else {
            None
        }
    }

    /// Emit whatever is pending.
    pub fn flush(&mut self) -> Option<SampleBatch> {
        if self.pending.is_empty() {
            return None;
        }
        let frames = std::mem::replace(&mut self.pending, Vec::with_capacity(self.batch_size));
        let batch = SampleBatch {
            sequence: self.sequence,
            frames,
        };
        self.sequence += 1;
        Some(batch)
    }

    /// Forget the previous frame and any pending ones.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.last = None;
    }

    pub fn duplicates_dropped(&self) -> u64 {
        self.duplicates_dropped
    }
}

/// Configuration for real-time streaming
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamConfig {
    pub name: String,
    pub simulator: ExgSimConfig,
    pub batch_size: usize,
    pub drop_duplicates: bool,
    /// Capacity of the broadcast channel, in events
    pub buffer_size: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            name: "Simulated ExG".to_string(),
            simulator: ExgSimConfig::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            drop_duplicates: true,
            buffer_size: 256,
        }
    }
}

impl StreamConfig {
    /// Time covered by one batch at the nominal rate.
    pub fn batch_interval(&self) -> Duration {
        let nanos = self.batch_size.max(1) as f64 * 1e9 / f64::from(self.simulator.sampling_rate_hz);
        Duration::from_nanos(nanos.round() as u64)
    }
}

/// Commands for controlling the stream
#[derive(Debug, Clone)]
pub enum StreamCommand {
    Start,
    Stop,
    Pause,
    Resume,
    UpdateConfig(StreamConfig),
}

/// Running totals kept by the stream task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamStats {
    pub is_running: bool,
    pub batches_sent: u64,
    pub frames_sent: u64,
    pub duplicates_dropped: u64,
}

/// Simulated device publishing batches at its nominal rate
pub struct RealTimeExgStream {
    config: StreamConfig,
    info: StreamInfo,
    simulator: ExgSimulator,
    batcher: FrameBatcher,
    data_sender: broadcast::Sender<StreamEvent>,
    control_receiver: mpsc::Receiver<StreamCommand>,
    stats: StreamStats,
}

impl RealTimeExgStream {
    /// Build a stream and the sender that controls it.
    pub fn new(config: StreamConfig) -> ScopeResult<(Self, mpsc::Sender<StreamCommand>)> {
        let simulator = ExgSimulator::new(config.simulator.clone())?;
        let info = StreamInfo::from_config(&config.name, &config.simulator);
        let batcher = FrameBatcher::new(config.batch_size, config.drop_duplicates);
        let (data_sender, _) = broadcast::channel(config.buffer_size.max(1));
        let (control_sender, control_receiver) = mpsc::channel(32);

        let stream = Self {
            config,
            info,
            simulator,
            batcher,
            data_sender,
            control_receiver,
            stats: StreamStats::default(),
        };
        Ok((stream, control_sender))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StreamEvent> {
        self.data_sender.subscribe()
    }

    pub fn info(&self) -> &StreamInfo {
        &self.info
    }

    pub fn stats(&self) -> StreamStats {
        self.stats
    }

    fn emit(&self, event: StreamEvent) {
        // no subscribers is not an error
        let _ = self.data_sender.send(event);
    }

    fn produce_batch(&mut self) {
        for _ in 0..self.config.batch_size.max(1) {
            let frame = self.simulator.next_frame();
            if let Some(batch) = self.batcher.push(frame) {
                self.stats.batches_sent += 1;
                self.stats.frames_sent += batch.frames.len() as u64;
                self.emit(StreamEvent::Samples(Arc::new(batch)));
            }
        }
        self.stats.duplicates_dropped = self.batcher.duplicates_dropped();
    }

    fn disconnect(&mut self) {
        if self.stats.is_running {
            self.emit(StreamEvent::Disconnected);
        }
        self.stats.is_running = false;
        self.batcher.clear();
    }

    /// Drive the stream until every control sender is dropped.
    pub async fn run(&mut self) -> ScopeResult<()> {
        let mut ticker = interval(self.config.batch_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut paused = false;

        info!(
            name = %self.info.name,
            srate = self.info.nominal_srate,
            channels = self.info.channel_count,
            "stream task ready"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.stats.is_running && !paused {
                        self.produce_batch();
                    }
                }

                command = self.control_receiver.recv() => {
                    match command {
                        Some(StreamCommand::Start) => {
                            if !self.stats.is_running {
                                self.stats.is_running = true;
                                paused = false;
                                self.emit(StreamEvent::Connected(self.info.clone()));
                                info!(source = %self.info.source_id, "stream connected");
                            }
                        }
                        Some(StreamCommand::Stop) => {
                            self.disconnect();
                            self.simulator.reset_time();
                            info!("stream stopped");
                        }
                        Some(StreamCommand::Pause) => {
                            paused = true;
                            debug!("stream paused");
                        }
                        Some(StreamCommand::Resume) => {
                            paused = false;
                            debug!("stream resumed");
                        }
                        Some(StreamCommand::UpdateConfig(new_config)) => {
                            if let Err(e) = self.simulator.update_config(new_config.simulator.clone()) {
                                warn!(error = %e, "rejected stream configuration");
                                continue;
                            }
                            let was_running = self.stats.is_running;
                            self.disconnect();
                            self.info = StreamInfo::from_config(&new_config.name, &new_config.simulator);
                            self.batcher = FrameBatcher::new(new_config.batch_size, new_config.drop_duplicates);
                            self.config = new_config;
                            ticker = interval(self.config.batch_interval());
                            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                            if was_running {
                                self.stats.is_running = true;
                                self.emit(StreamEvent::Connected(self.info.clone()));
                            }
                            info!(srate = self.info.nominal_srate, channels = self.info.channel_count, "stream reconfigured");
                        }
                        None => {
                            self.disconnect();
                            debug!("stream control channel closed");
                            break;
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

/// Spawn a stream task and return its event receiver, control sender and metadata.
pub fn start_exg_stream(
    config: StreamConfig,
) -> ScopeResult<(
    broadcast::Receiver<StreamEvent>,
    mpsc::Sender<StreamCommand>,
    StreamInfo,
)> {
    let (mut stream, control_sender) = RealTimeExgStream::new(config)?;
    let data_receiver = stream.subscribe();
    let info = stream.info().clone();

    tokio::spawn(async move {
        if let Err(e) = stream.run().await {
            warn!(error = %e, "stream task failed");
        }
    });

    Ok((data_receiver, control_sender, info))
}
