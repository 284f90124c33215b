//! Per-channel table-driven filters
//!
//! Each filter owns the delay lines for one channel and resolves its
//! coefficients from the static table whenever its type or the sampling
//! rate changes. Missing table rows and poisoned state never fail the
//! sample path: the former bypass, the latter are zeroed and counted.

use serde::{Deserialize, Serialize};
use std::ops::AddAssign;
use sweepscope_core::{ExgType, FilterFamily, NotchType, ScopeError};
use tracing::{debug, warn};

use crate::biquad::BiquadState;
use crate::coefficients::{lookup_hz, CoeffSet, FilterKind};

/// Longest cascade in the table
const MAX_SECTIONS: usize = 2;

/// Counters a filter accumulates while running
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterStats {
    /// Delay lines zeroed after NaN or infinity reached them
    pub poison_resets: u64,
    /// Active types left as bypass because the rate has no table row
    pub configuration_misses: u64,
}

impl AddAssign for FilterStats {
    fn add_assign(&mut self, rhs: Self) {
        self.poison_resets += rhs.poison_resets;
        self.configuration_misses += rhs.configuration_misses;
    }
}

/// Common interface of the filters in a channel pipeline
pub trait ChannelFilter: Send {
    /// Filter one sample. Bypassed filters return the input untouched.
    fn process(&mut self, input: f32) -> f32;

    /// Zero every delay register.
    fn reset(&mut self);

    /// Re-resolve coefficients for a new device rate and clear state.
    fn set_sample_rate(&mut self, rate_hz: f32);

    fn name(&self) -> &str;

    fn family(&self) -> FilterFamily;

    /// Whether samples are currently altered.
    fn is_active(&self) -> bool;

    fn stats(&self) -> FilterStats;
}

/// Delay lines plus the coefficient set they run against
#[derive(Debug, Clone)]
struct Cascade {
    channel: usize,
    family: FilterFamily,
    rate_hz: f32,
    coeffs: Option<CoeffSet>,
    states: [BiquadState; MAX_SECTIONS],
    stats: FilterStats,
}

impl Cascade {
    fn new(channel: usize, family: FilterFamily, rate_hz: f32) -> Self {
        Self {
            channel,
            family,
            rate_hz,
            coeffs: None,
            states: [BiquadState::new(); MAX_SECTIONS],
            stats: FilterStats::default(),
        }
    }

    /// Resolve coefficients for `kind` at the current rate; `None` bypasses.
    fn configure(&mut self, kind: Option<FilterKind>) {
        self.reset();
        self.coeffs = match kind {
            None => None,
            Some(kind) => match lookup_hz(self.rate_hz, kind) {
                Some(set) => Some(set),
                None => {
                    let miss = ScopeError::ConfigurationMiss {
                        rate_hz: self.rate_hz,
                        family: self.family.name(),
                        code: kind.code(),
                    };
                    warn!(channel = self.channel, error = %miss, "filter bypassed");
                    self.stats.configuration_misses += 1;
                    None
                }
            },
        };
    }

    #[inline]
    fn process(&mut self, input: f32) -> f32 {
        let Some(set) = self.coeffs else {
            return input;
        };

        let mut value = input;
        for (coeffs, state) in set.sections.iter().zip(self.states.iter_mut()) {
            value = state.process(coeffs, value);
        }

        if self.states.iter().any(BiquadState::is_poisoned) {
            let poisoned = ScopeError::StatePoisoned {
                channel: self.channel,
                family: self.family.name(),
            };
            warn!(error = %poisoned, input, "resetting filter state");
            self.stats.poison_resets += 1;
            self.reset();
        }
        value
    }

    fn reset(&mut self) {
        self.states.iter_mut().for_each(BiquadState::reset);
    }

    fn set_rate(&mut self, rate_hz: f32, kind: Option<FilterKind>) {
        self.rate_hz = rate_hz;
        self.configure(kind);
    }
}

/// Always-on 0.5 Hz high-pass removing electrode drift
#[derive(Debug, Clone)]
pub struct BaselineFilter {
    cascade: Cascade,
}

impl BaselineFilter {
    pub fn new(channel: usize, rate_hz: f32) -> Self {
        let mut cascade = Cascade::new(channel, FilterFamily::Baseline, rate_hz);
        cascade.configure(Some(FilterKind::Baseline));
        Self { cascade }
    }
}

impl ChannelFilter for BaselineFilter {
    fn process(&mut self, input: f32) -> f32 {
        self.cascade.process(input)
    }

    fn reset(&mut self) {
        self.cascade.reset();
    }

    fn set_sample_rate(&mut self, rate_hz: f32) {
        self.cascade.set_rate(rate_hz, Some(FilterKind::Baseline));
    }

    fn name(&self) -> &str {
        "Baseline High-pass"
    }

    fn family(&self) -> FilterFamily {
        FilterFamily::Baseline
    }

    fn is_active(&self) -> bool {
        self.cascade.coeffs.is_some()
    }

    fn stats(&self) -> FilterStats {
        self.cascade.stats
    }
}

/// Band shaping selected by physiological signal type
#[derive(Debug, Clone)]
pub struct ExgFilter {
    selection: Option<ExgType>,
    cascade: Cascade,
}

impl ExgFilter {
    pub fn new(channel: usize, rate_hz: f32) -> Self {
        Self {
            selection: None,
            cascade: Cascade::new(channel, FilterFamily::Exg, rate_hz),
        }
    }

    pub fn selection(&self) -> Option<ExgType> {
        self.selection
    }

    /// Switch type. A different type starts from zeroed registers;
    /// repeating the current one changes nothing.
    pub fn set_type(&mut self, selection: Option<ExgType>) {
        if self.selection == selection {
            return;
        }
        debug!(channel = self.cascade.channel, from = ?self.selection, to = ?selection, "exg filter type");
        self.selection = selection;
        self.cascade.configure(selection.map(FilterKind::Exg));
    }
}

impl ChannelFilter for ExgFilter {
    fn process(&mut self, input: f32) -> f32 {
        self.cascade.process(input)
    }

    fn reset(&mut self) {
        self.cascade.reset();
    }

    fn set_sample_rate(&mut self, rate_hz: f32) {
        let kind = self.selection.map(FilterKind::Exg);
        self.cascade.set_rate(rate_hz, kind);
    }

    fn name(&self) -> &str {
        match self.selection {
            Some(ExgType::Ecg) => "ECG Low-pass 30Hz",
            Some(ExgType::Eog) => "EOG Low-pass 10Hz",
            Some(ExgType::Eeg) => "EEG Low-pass 45Hz",
            Some(ExgType::Emg) => "EMG High-pass 70Hz",
            None => "EXG Bypass",
        }
    }

    fn family(&self) -> FilterFamily {
        FilterFamily::Exg
    }

    fn is_active(&self) -> bool {
        self.cascade.coeffs.is_some()
    }

    fn stats(&self) -> FilterStats {
        self.cascade.stats
    }
}

/// Two-section powerline rejection
#[derive(Debug, Clone)]
pub struct NotchFilter {
    selection: Option<NotchType>,
    cascade: Cascade,
}

impl NotchFilter {
    pub fn new(channel: usize, rate_hz: f32) -> Self {
        Self {
            selection: None,
            cascade: Cascade::new(channel, FilterFamily::Notch, rate_hz),
        }
    }

    pub fn selection(&self) -> Option<NotchType> {
        self.selection
    }

    /// Same contract as [`ExgFilter::set_type`].
    pub fn set_type(&mut self, selection: Option<NotchType>) {
        if self.selection == selection {
            return;
        }
        debug!(channel = self.cascade.channel, from = ?self.selection, to = ?selection, "notch filter type");
        self.selection = selection;
        self.cascade.configure(selection.map(FilterKind::Notch));
    }
}

impl ChannelFilter for NotchFilter {
    fn process(&mut self, input: f32) -> f32 {
        self.cascade.process(input)
    }

    fn reset(&mut self) {
        self.cascade.reset();
    }

    fn set_sample_rate(&mut self, rate_hz: f32) {
        let kind = self.selection.map(FilterKind::Notch);
        self.cascade.set_rate(rate_hz, kind);
    }

    fn name(&self) -> &str {
        match self.selection {
            Some(NotchType::Hz50) => "Notch 50Hz",
            Some(NotchType::Hz60) => "Notch 60Hz",
            None => "Notch Bypass",
        }
    }

    fn family(&self) -> FilterFamily {
        FilterFamily::Notch
    }

    fn is_active(&self) -> bool {
        self.cascade.coeffs.is_some()
    }

    fn stats(&self) -> FilterStats {
        self.cascade.stats
    }
}
