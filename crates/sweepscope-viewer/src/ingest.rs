//! Ingestion task: stream events into the scope

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use sweepscope_simulation::StreamEvent;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::scope::Scope;

/// What an ingestion task handled before it ended
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionReport {
    pub batches: u64,
    pub frames: u64,
    /// Events lost because the receiver fell behind
    pub lagged_events: u64,
    pub connects: u64,
}

/// Running ingestion task
pub struct IngestionHandle {
    cancel: CancellationToken,
    task: JoinHandle<IngestionReport>,
}

impl IngestionHandle {
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Halt ingestion now; the scope keeps its last sweep.
    pub async fn stop(self) -> anyhow::Result<IngestionReport> {
        self.cancel.cancel();
        self.join().await
    }

    /// Wait for the stream to close on its own.
    pub async fn join(self) -> anyhow::Result<IngestionReport> {
        self.task.await.context("ingestion task panicked")
    }
}

/// Feed every event from `receiver` into `scope` until the stream closes
/// or the handle is stopped.
pub fn spawn_ingestion(
    mut receiver: broadcast::Receiver<StreamEvent>,
    scope: Arc<Scope>,
) -> IngestionHandle {
    let cancel = CancellationToken::new();
    let token = cancel.clone();

    let task = tokio::spawn(async move {
        let mut report = IngestionReport::default();
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    scope.disconnect();
                    debug!("ingestion cancelled");
                    break;
                }

                event = receiver.recv() => match event {
                    Ok(StreamEvent::Connected(info)) => match scope.connect(&info) {
                        Ok(_) => report.connects += 1,
                        Err(e) => warn!(error = %e, stream = %info.name, "stream rejected"),
                    },
                    Ok(StreamEvent::Samples(batch)) => {
                        scope.on_batch(&batch.frames);
                        report.batches += 1;
                        report.frames += batch.frames.len() as u64;
                    }
                    Ok(StreamEvent::Disconnected) => scope.disconnect(),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "ingestion fell behind the stream");
                        report.lagged_events += skipped;
                    }
                    Err(RecvError::Closed) => {
                        scope.disconnect();
                        debug!("stream closed");
                        break;
                    }
                },
            }
        }
        info!(batches = report.batches, frames = report.frames, "ingestion ended");
        report
    });

    IngestionHandle { cancel, task }
}
