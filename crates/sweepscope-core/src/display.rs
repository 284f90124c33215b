//! Display configuration, normalization and reconciliation

use serde::{Deserialize, Serialize};

use crate::channels::ChannelAssignment;
use crate::error::{ScopeError, ScopeResult};
use crate::types::validate_rate;

/// Longest selectable sweep window
pub const MAX_TIME_BASE_SECONDS: f32 = 10.0;

/// Upper bound on samples held per sweep line
pub const MAX_SWEEP_SAMPLES: usize = 1 << 20;

/// ADC resolution used to map raw counts onto the plotting range
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum BitDepth {
    #[default]
    Bits10,
    Bits12,
    Bits14,
    Bits16,
    Bits24,
}

impl BitDepth {
    pub fn bits(self) -> u8 {
        match self {
            BitDepth::Bits10 => 10,
            BitDepth::Bits12 => 12,
            BitDepth::Bits14 => 14,
            BitDepth::Bits16 => 16,
            BitDepth::Bits24 => 24,
        }
    }

    /// Map a raw sample onto roughly [-1, 1].
    ///
    /// 24-bit devices deliver samples centred on zero with a 2^23 full
    /// scale; every other resolution is scaled by `2 / 2^bits`.
    pub fn normalize(self, raw: f32) -> f32 {
        match self {
            BitDepth::Bits24 => raw / 8_388_608.0,
            other => raw * (2.0 / (1u32 << other.bits()) as f32),
        }
    }
}

impl TryFrom<u8> for BitDepth {
    type Error = ScopeError;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        match bits {
            10 => Ok(BitDepth::Bits10),
            12 => Ok(BitDepth::Bits12),
            14 => Ok(BitDepth::Bits14),
            16 => Ok(BitDepth::Bits16),
            24 => Ok(BitDepth::Bits24),
            bits => Err(ScopeError::UnsupportedBitDepth { bits }),
        }
    }
}

impl From<BitDepth> for u8 {
    fn from(value: BitDepth) -> Self {
        value.bits()
    }
}

/// Process-wide display parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Vertical zoom applied at rasterization time
    pub vertical_scale: f32,
    /// Width of the sweep window in seconds
    pub time_base_seconds: f32,
    /// Resolution used for normalization
    pub bit_depth: BitDepth,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            vertical_scale: 1.0,
            time_base_seconds: 4.0,
            bit_depth: BitDepth::Bits10,
        }
    }
}

impl DisplayConfig {
    pub fn validate(&self) -> ScopeResult<()> {
        if !(self.vertical_scale.is_finite() && self.vertical_scale > 0.0) {
            return Err(ScopeError::InvalidVerticalScale {
                scale: self.vertical_scale,
            });
        }
        if !(self.time_base_seconds.is_finite()
            && self.time_base_seconds > 0.0
            && self.time_base_seconds <= MAX_TIME_BASE_SECONDS)
        {
            return Err(ScopeError::InvalidTimeBase {
                seconds: self.time_base_seconds,
            });
        }
        Ok(())
    }
}

/// Complete configuration snapshot driving buffers and filters.
///
/// Every change produces a new value; [`ScopeConfig::diff`] decides what the
/// old and new snapshots imply for live state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeConfig {
    pub sampling_rate_hz: f32,
    pub display: DisplayConfig,
    pub channels: ChannelAssignment,
    pub paused: bool,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            sampling_rate_hz: 500.0,
            display: DisplayConfig::default(),
            channels: ChannelAssignment::default(),
            paused: false,
        }
    }
}

impl ScopeConfig {
    /// Also rejects a rate whose sweep would exceed [`MAX_SWEEP_SAMPLES`].
    pub fn validate(&self) -> ScopeResult<()> {
        validate_rate(self.sampling_rate_hz)?;
        self.display.validate()?;
        let samples =
            (f64::from(self.sampling_rate_hz) * f64::from(self.display.time_base_seconds)).round();
        if samples > MAX_SWEEP_SAMPLES as f64 {
            return Err(ScopeError::InvalidSampleRate {
                rate_hz: self.sampling_rate_hz,
            });
        }
        Ok(())
    }

    /// Samples per sweep line: `round(rate * time base)`, at least one.
    pub fn sweep_capacity(&self) -> usize {
        let samples = (self.sampling_rate_hz * self.display.time_base_seconds).round();
        if samples.is_finite() && samples >= 1.0 {
            samples as usize
        } else {
            1
        }
    }

    /// Compare two snapshots.
    pub fn diff(old: &ScopeConfig, new: &ScopeConfig) -> ConfigChange {
        let rate_changed = old.sampling_rate_hz != new.sampling_rate_hz;
        let reallocate = rate_changed
            || old.display.time_base_seconds != new.display.time_base_seconds
            || old.channels != new.channels;

        ConfigChange {
            reallocate,
            reset_filters: rate_changed,
            rewind: !reallocate && old.paused && !new.paused,
            rescale: old.display.vertical_scale != new.display.vertical_scale,
            renormalize: old.display.bit_depth != new.display.bit_depth,
        }
    }

    pub fn to_json(&self) -> ScopeResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> ScopeResult<Self> {
        let config: ScopeConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

/// What a configuration transition requires of live state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfigChange {
    /// Sweep buffers must be replaced (capacity or line set changed)
    pub reallocate: bool,
    /// Every filter delay line must be zeroed (coefficients changed)
    pub reset_filters: bool,
    /// Cursors return to zero without reallocating (leaving the frozen state)
    pub rewind: bool,
    /// Render scale must be pushed to the backend
    pub rescale: bool,
    /// Subsequent samples use a different normalization
    pub renormalize: bool,
}

impl ConfigChange {
    pub fn is_empty(&self) -> bool {
        *self == ConfigChange::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_scale_normalization() {
        assert_eq!(BitDepth::Bits24.normalize(8_388_608.0), 1.0);
        assert_eq!(BitDepth::Bits16.normalize(32_768.0), 1.0);
        assert_eq!(BitDepth::Bits10.normalize(512.0), 1.0);
        assert_eq!(BitDepth::Bits12.normalize(-2048.0), -1.0);
        assert_eq!(BitDepth::Bits14.normalize(0.0), 0.0);
    }

    #[test]
    fn test_bit_depth_conversion() {
        assert_eq!(BitDepth::try_from(14).unwrap(), BitDepth::Bits14);
        assert_eq!(
            BitDepth::try_from(8),
            Err(ScopeError::UnsupportedBitDepth { bits: 8 })
        );
        assert_eq!(u8::from(BitDepth::Bits24), 24);
    }

    #[test]
    fn test_sweep_capacity() {
        let config = ScopeConfig::default();
        assert_eq!(config.sweep_capacity(), 2000);

        let mut tiny = config.clone();
        tiny.display.time_base_seconds = 0.001;
        tiny.sampling_rate_hz = 250.0;
        assert_eq!(tiny.sweep_capacity(), 1);

        let mut odd = config;
        odd.sampling_rate_hz = 333.0;
        odd.display.time_base_seconds = 1.5;
        assert_eq!(odd.sweep_capacity(), 500);
    }

    #[test]
    fn test_rejects_oversized_sweep() {
        let mut long = ScopeConfig::default();
        long.display.time_base_seconds = 1.0e12;
        assert!(matches!(
            long.validate(),
            Err(ScopeError::InvalidTimeBase { .. })
        ));

        let mut limit = ScopeConfig::default();
        limit.display.time_base_seconds = MAX_TIME_BASE_SECONDS;
        limit.sampling_rate_hz = 2000.0;
        assert!(limit.validate().is_ok());

        let mut fast = ScopeConfig::default();
        fast.sampling_rate_hz = 1.0e30;
        assert!(matches!(
            fast.validate(),
            Err(ScopeError::InvalidSampleRate { .. })
        ));
    }

    #[test]
    fn test_diff_rate_change() {
        let old = ScopeConfig::default();
        let mut new = old.clone();
        new.sampling_rate_hz = 1000.0;
        let change = ScopeConfig::diff(&old, &new);
        assert!(change.reallocate);
        assert!(change.reset_filters);
        assert!(!change.rescale);
    }

    #[test]
    fn test_diff_time_base_keeps_filters() {
        let old = ScopeConfig::default();
        let mut new = old.clone();
        new.display.time_base_seconds = 2.0;
        let change = ScopeConfig::diff(&old, &new);
        assert!(change.reallocate);
        assert!(!change.reset_filters);
    }

    #[test]
    fn test_diff_scale_only() {
        let old = ScopeConfig::default();
        let mut new = old.clone();
        new.display.vertical_scale = 3.0;
        let change = ScopeConfig::diff(&old, &new);
        assert_eq!(
            change,
            ConfigChange {
                rescale: true,
                ..ConfigChange::default()
            }
        );
        assert!(ScopeConfig::diff(&old, &old).is_empty());
    }

    #[test]
    fn test_diff_resume_rewinds() {
        let mut old = ScopeConfig::default();
        old.paused = true;
        let new = ScopeConfig::default();
        assert!(ScopeConfig::diff(&old, &new).rewind);
        assert!(!ScopeConfig::diff(&new, &old).rewind);
    }

    #[test]
    fn test_json_round_trip_and_validation() {
        let mut config = ScopeConfig::default();
        config.display.bit_depth = BitDepth::Bits24;
        let json = config.to_json().unwrap();
        assert!(json.contains("\"bit_depth\": 24"));
        assert_eq!(ScopeConfig::from_json(&json).unwrap(), config);

        let bad = json.replace("\"time_base_seconds\": 4.0", "\"time_base_seconds\": -1.0");
        assert!(matches!(
            ScopeConfig::from_json(&bad),
            Err(ScopeError::InvalidTimeBase { .. })
        ));
    }
}
