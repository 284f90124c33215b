//! Channel pipelines and the fixed pool that owns them

use serde::{Deserialize, Serialize};
use sweepscope_core::{
    channel_error, ExgType, FilterFamily, FilterSelection, NotchType, ScopeResult, MAX_CHANNELS,
};
use tracing::{debug, info};

use crate::config::{ChannelFilterSettings, FilterSettings};
use crate::filters::{BaselineFilter, ChannelFilter, ExgFilter, FilterStats, NotchFilter};

/// Order of the two selectable stages after the baseline filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOrder {
    #[default]
    BandThenNotch,
    NotchThenBand,
}

/// Baseline, EXG and notch filters of one physical channel
#[derive(Debug, Clone)]
pub struct ChannelPipeline {
    channel: usize,
    order: FilterOrder,
    baseline: BaselineFilter,
    exg: ExgFilter,
    notch: NotchFilter,
}

impl ChannelPipeline {
    pub fn new(channel: usize, rate_hz: f32) -> Self {
        Self {
            channel,
            order: FilterOrder::default(),
            baseline: BaselineFilter::new(channel, rate_hz),
            exg: ExgFilter::new(channel, rate_hz),
            notch: NotchFilter::new(channel, rate_hz),
        }
    }

    pub fn channel(&self) -> usize {
        self.channel
    }

    /// Baseline first, then the two selectable stages in configured order.
    #[inline]
    pub fn process_sample(&mut self, raw: f32) -> f32 {
        let value = self.baseline.process(raw);
        match self.order {
            FilterOrder::BandThenNotch => self.notch.process(self.exg.process(value)),
            FilterOrder::NotchThenBand => self.exg.process(self.notch.process(value)),
        }
    }

    /// Takes effect on the next processed sample.
    pub fn set_selection(&mut self, selection: FilterSelection) {
        match selection {
            FilterSelection::Exg(exg) => self.exg.set_type(exg),
            FilterSelection::Notch(notch) => self.notch.set_type(notch),
        }
    }

    pub fn exg_type(&self) -> Option<ExgType> {
        self.exg.selection()
    }

    pub fn notch_type(&self) -> Option<NotchType> {
        self.notch.selection()
    }

    pub fn set_order(&mut self, order: FilterOrder) {
        self.order = order;
    }

    pub fn set_sample_rate(&mut self, rate_hz: f32) {
        for stage in self.stages_mut() {
            stage.set_sample_rate(rate_hz);
        }
    }

    pub fn reset(&mut self) {
        for stage in self.stages_mut() {
            stage.reset();
        }
    }

    /// Human-readable chain, e.g. `Baseline High-pass -> ECG Low-pass 30Hz -> Notch 50Hz`.
    pub fn describe(&self) -> String {
        let stages: [&dyn ChannelFilter; 3] = match self.order {
            FilterOrder::BandThenNotch => [&self.baseline, &self.exg, &self.notch],
            FilterOrder::NotchThenBand => [&self.baseline, &self.notch, &self.exg],
        };
        stages
            .iter()
            .map(|stage| stage.name())
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    pub fn stats(&self) -> FilterStats {
        let mut total = self.baseline.stats();
        total += self.exg.stats();
        total += self.notch.stats();
        total
    }

    fn stages_mut(&mut self) -> [&mut dyn ChannelFilter; 3] {
        [&mut self.baseline, &mut self.exg, &mut self.notch]
    }
}

/// One pipeline per possible channel, allocated once.
///
/// Only pipelines for displayed channels are driven; the rest keep their
/// selections so re-adding a channel restores its filters.
#[derive(Debug, Clone)]
pub struct PipelineBank {
    rate_hz: f32,
    order: FilterOrder,
    pipelines: [ChannelPipeline; MAX_CHANNELS],
}

impl PipelineBank {
    pub fn new(rate_hz: f32) -> Self {
        Self {
            rate_hz,
            order: FilterOrder::default(),
            pipelines: std::array::from_fn(|channel| ChannelPipeline::new(channel, rate_hz)),
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.rate_hz
    }

    pub fn pipeline(&self, channel: usize) -> Option<&ChannelPipeline> {
        self.pipelines.get(channel)
    }

    /// Filter one frame for the selected channels.
    ///
    /// `sink` receives `(line, filtered)` where `line` is the position of the
    /// channel in `selected`. Channels missing from the frame are skipped.
    #[inline]
    pub fn process_frame<F>(&mut self, frame: &[f32], selected: &[usize], mut sink: F)
    where
        F: FnMut(usize, f32),
    {
        for (line, &channel) in selected.iter().enumerate() {
            let (Some(&raw), Some(pipeline)) = (frame.get(channel), self.pipelines.get_mut(channel))
            else {
                continue;
            };
            sink(line, pipeline.process_sample(raw));
        }
    }

    pub fn set_channel_filter(&mut self, channel: usize, selection: FilterSelection) -> ScopeResult<()> {
        let pipeline = self
            .pipelines
            .get_mut(channel)
            .ok_or(channel_error!(channel, MAX_CHANNELS))?;
        pipeline.set_selection(selection);
        Ok(())
    }

    /// Apply one selection to every listed channel.
    pub fn apply_to_channels(
        &mut self,
        channels: impl IntoIterator<Item = usize>,
        selection: FilterSelection,
    ) -> ScopeResult<()> {
        let channels: Vec<usize> = channels.into_iter().collect();
        if let Some(&bad) = channels.iter().find(|&&c| c >= MAX_CHANNELS) {
            return Err(channel_error!(bad, MAX_CHANNELS));
        }
        for &channel in &channels {
            self.pipelines[channel].set_selection(selection);
        }
        info!(count = channels.len(), ?selection, "applied filter to channels");
        Ok(())
    }

    /// Put one family back to bypass on every listed channel.
    pub fn clear_channels(
        &mut self,
        channels: impl IntoIterator<Item = usize>,
        family: FilterFamily,
    ) -> ScopeResult<()> {
        let selection = match family {
            FilterFamily::Exg => FilterSelection::Exg(None),
            FilterFamily::Notch => FilterSelection::Notch(None),
            FilterFamily::Baseline => return Ok(()),
        };
        self.apply_to_channels(channels, selection)
    }

    /// New coefficients for every pipeline; all delay lines restart at zero.
    pub fn set_sample_rate(&mut self, rate_hz: f32) {
        if self.rate_hz == rate_hz {
            return;
        }
        debug!(from = self.rate_hz, to = rate_hz, "pipeline sample rate");
        self.rate_hz = rate_hz;
        for pipeline in &mut self.pipelines {
            pipeline.set_sample_rate(rate_hz);
        }
    }

    pub fn set_order(&mut self, order: FilterOrder) {
        self.order = order;
        for pipeline in &mut self.pipelines {
            pipeline.set_order(order);
        }
    }

    pub fn reset_all(&mut self) {
        for pipeline in &mut self.pipelines {
            pipeline.reset();
        }
    }

    pub fn stats(&self) -> FilterStats {
        let mut total = FilterStats::default();
        for pipeline in &self.pipelines {
            total += pipeline.stats();
        }
        total
    }

    /// Snapshot of every channel that has a non-bypass selection.
    pub fn settings(&self) -> FilterSettings {
        let channels = self
            .pipelines
            .iter()
            .filter(|p| p.exg_type().is_some() || p.notch_type().is_some())
            .map(|p| ChannelFilterSettings {
                channel: p.channel(),
                exg: p.exg_type(),
                notch: p.notch_type(),
            })
            .collect();
        FilterSettings {
            order: self.order,
            channels,
        }
    }

    /// Replace all selections with `settings`; unlisted channels bypass.
    pub fn apply_settings(&mut self, settings: &FilterSettings) -> ScopeResult<()> {
        settings.validate()?;
        self.set_order(settings.order);
        for pipeline in &mut self.pipelines {
            let entry = settings.channels.iter().find(|c| c.channel == pipeline.channel());
            pipeline.set_selection(FilterSelection::Exg(entry.and_then(|e| e.exg)));
            pipeline.set_selection(FilterSelection::Notch(entry.and_then(|e| e.notch)));
        }
        Ok(())
    }
}
