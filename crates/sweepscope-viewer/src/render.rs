//! Render driver: redraws whatever the sweep buffers hold, once per tick

use anyhow::Context;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::RenderBackend;
use crate::scope::Scope;

/// Pulls sweep state from a [`Scope`] into a [`RenderBackend`]
pub struct RenderDriver<B: RenderBackend> {
    scope: Arc<Scope>,
    backend: B,
    generation: Option<u64>,
    scale_y: Option<f32>,
}

impl<B: RenderBackend> RenderDriver<B> {
    pub fn new(scope: Arc<Scope>, backend: B) -> Self {
        Self {
            scope,
            backend,
            generation: None,
            scale_y: None,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Rasterize the current buffers. Never waits for samples.
    pub fn render_frame(&mut self) -> anyhow::Result<()> {
        let sweeps = self.scope.sweeps();
        let scale_y = self.scope.config().display.vertical_scale;

        if self.generation != Some(sweeps.generation()) {
            self.backend
                .reset_lines(&sweeps.channels(), sweeps.capacity())
                .context("rebuilding render lines")?;
            self.generation = Some(sweeps.generation());
        }
        if self.scale_y != Some(scale_y) {
            self.backend.set_scale_y(scale_y);
            self.scale_y = Some(scale_y);
        }

        for (index, line) in sweeps.lines().iter().enumerate() {
            for position in 0..sweeps.capacity() {
                let value = line.buffer.value_at(position).unwrap_or(f32::NAN);
                self.backend.set_point(index, position, value);
            }
        }

        self.backend.present().context("presenting frame")?;
        self.scope.record_rendered_frame();
        Ok(())
    }

    /// Redraw every `frame_interval` until cancelled or `stop` is raised.
    ///
    /// Late ticks are skipped rather than bunched. A failed frame is logged
    /// and the loop carries on.
    pub async fn run(
        mut self,
        frame_interval: Duration,
        cancel: CancellationToken,
        stop: Arc<AtomicBool>,
    ) -> B {
        let mut ticker = interval(frame_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(interval_ms = frame_interval.as_millis() as u64, "render driver started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if stop.load(Ordering::Acquire) {
                        break;
                    }
                    if let Err(e) = self.render_frame() {
                        warn!(error = %e, "frame skipped");
                    }
                }
            }
        }

        debug!("render driver stopped");
        self.backend
    }
}

/// Running render task
pub struct RenderHandle<B: RenderBackend> {
    cancel: CancellationToken,
    stop: Arc<AtomicBool>,
    task: JoinHandle<B>,
}

impl<B: RenderBackend> RenderHandle<B> {
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop redrawing and hand the backend back.
    pub async fn stop(self) -> anyhow::Result<B> {
        self.stop.store(true, Ordering::Release);
        self.cancel.cancel();
        self.task.await.context("render task panicked")
    }
}

/// Spawn a render loop at `fps` frames per second.
pub fn spawn_render_driver<B: RenderBackend>(
    scope: Arc<Scope>,
    backend: B,
    fps: u32,
) -> RenderHandle<B> {
    let frame_interval = Duration::from_secs_f64(1.0 / f64::from(fps.max(1)));
    let cancel = CancellationToken::new();
    let stop = Arc::new(AtomicBool::new(false));
    let driver = RenderDriver::new(scope, backend);
    let task = tokio::spawn(driver.run(frame_interval, cancel.clone(), Arc::clone(&stop)));

    RenderHandle { cancel, stop, task }
}
