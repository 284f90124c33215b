//! Render backends: the drawing surface behind the render driver

use serde::{Deserialize, Serialize};
use tracing::info;

/// Vertex sink for one redraw.
///
/// A NaN value means "leave a gap here".
pub trait RenderBackend: Send + 'static {
    /// Line set or capacity changed; drop previous geometry.
    fn reset_lines(&mut self, channels: &[usize], capacity: usize) -> anyhow::Result<()>;

    fn set_scale_y(&mut self, scale: f32);

    fn set_point(&mut self, line: usize, position: usize, value: f32);

    /// End of frame.
    fn present(&mut self) -> anyhow::Result<()>;
}

/// Keeps the latest frame in memory
#[derive(Debug, Clone, Default)]
pub struct RecordingBackend {
    channels: Vec<usize>,
    lines: Vec<Vec<f32>>,
    scale_y: f32,
    resets: u64,
    frames_presented: u64,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self {
            scale_y: 1.0,
            ..Self::default()
        }
    }

    pub fn channels(&self) -> &[usize] {
        &self.channels
    }

    /// Points of one line exactly as last set.
    pub fn line(&self, line: usize) -> Option<&[f32]> {
        self.lines.get(line).map(Vec::as_slice)
    }

    /// Points of one line that would be drawn, already scaled.
    pub fn scaled_points(&self, line: usize) -> Vec<f32> {
        self.line(line)
            .unwrap_or_default()
            .iter()
            .filter(|v| !v.is_nan())
            .map(|v| v * self.scale_y)
            .collect()
    }

    pub fn scale_y(&self) -> f32 {
        self.scale_y
    }

    pub fn resets(&self) -> u64 {
        self.resets
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }
}

impl RenderBackend for RecordingBackend {
    fn reset_lines(&mut self, channels: &[usize], capacity: usize) -> anyhow::Result<()> {
        self.channels = channels.to_vec();
        self.lines = vec![vec![f32::NAN; capacity]; channels.len()];
        self.resets += 1;
        Ok(())
    }

    fn set_scale_y(&mut self, scale: f32) {
        self.scale_y = scale;
    }

    fn set_point(&mut self, line: usize, position: usize, value: f32) {
        if let Some(slot) = self.lines.get_mut(line).and_then(|l| l.get_mut(position)) {
            *slot = value;
        }
    }

    fn present(&mut self) -> anyhow::Result<()> {
        self.frames_presented += 1;
        Ok(())
    }
}

/// Extent of one line within a frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineSummary {
    pub channel: usize,
    pub min: f32,
    pub max: f32,
    /// Gaps (NaN points)
    pub blanks: usize,
}

impl LineSummary {
    fn empty(channel: usize) -> Self {
        Self {
            channel,
            min: f32::INFINITY,
            max: f32::NEG_INFINITY,
            blanks: 0,
        }
    }
}

/// Headless backend logging per-line extents every `report_every` frames
#[derive(Debug, Clone)]
pub struct SummaryBackend {
    report_every: u64,
    scale_y: f32,
    current: Vec<LineSummary>,
    last: Vec<LineSummary>,
    frames_presented: u64,
}

impl SummaryBackend {
    pub fn new(report_every: u64) -> Self {
        Self {
            report_every: report_every.max(1),
            scale_y: 1.0,
            current: Vec::new(),
            last: Vec::new(),
            frames_presented: 0,
        }
    }

    /// Summary of the most recently presented frame.
    pub fn last_frame(&self) -> &[LineSummary] {
        &self.last
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }
}

impl RenderBackend for SummaryBackend {
    fn reset_lines(&mut self, channels: &[usize], capacity: usize) -> anyhow::Result<()> {
        self.current = channels.iter().map(|&c| LineSummary::empty(c)).collect();
        info!(lines = channels.len(), capacity, "render lines rebuilt");
        Ok(())
    }

    fn set_scale_y(&mut self, scale: f32) {
        self.scale_y = scale;
    }

    fn set_point(&mut self, line: usize, _position: usize, value: f32) {
        let Some(summary) = self.current.get_mut(line) else {
            return;
        };
        if value.is_nan() {
            summary.blanks += 1;
        } else {
            let y = value * self.scale_y;
            summary.min = summary.min.min(y);
            summary.max = summary.max.max(y);
        }
    }

    fn present(&mut self) -> anyhow::Result<()> {
        self.frames_presented += 1;
        let fresh = self.current.iter().map(|s| LineSummary::empty(s.channel)).collect();
        self.last = std::mem::replace(&mut self.current, fresh);

        if self.frames_presented % self.report_every == 0 {
            for summary in &self.last {
                info!(
                    channel = summary.channel,
                    min = summary.min,
                    max = summary.max,
                    blanks = summary.blanks,
                    frame = self.frames_presented,
                    "line extent"
                );
            }
        }
        Ok(())
    }
}
