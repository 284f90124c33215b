//! Closed enumerations shared by the filter and display layers

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ScopeError, ScopeResult};

/// Number of physical channel slots a device may expose
pub const MAX_CHANNELS: usize = 16;

/// Sampling rates with tabulated filter coefficients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleRate {
    Hz250,
    Hz500,
    Hz1000,
    Hz2000,
}

impl SampleRate {
    pub const ALL: [SampleRate; 4] = [
        SampleRate::Hz250,
        SampleRate::Hz500,
        SampleRate::Hz1000,
        SampleRate::Hz2000,
    ];

    /// Map an arbitrary rate onto a tabulated one.
    ///
    /// Returns `None` for anything that is not exactly 250, 500, 1000 or
    /// 2000 Hz; filters treat that as "no coefficients, pass through".
    pub fn from_hz(rate_hz: f32) -> Option<Self> {
        match rate_hz {
            r if r == 250.0 => Some(SampleRate::Hz250),
            r if r == 500.0 => Some(SampleRate::Hz500),
            r if r == 1000.0 => Some(SampleRate::Hz1000),
            r if r == 2000.0 => Some(SampleRate::Hz2000),
            _ => None,
        }
    }

    pub fn hz(self) -> f32 {
        match self {
            SampleRate::Hz250 => 250.0,
            SampleRate::Hz500 => 500.0,
            SampleRate::Hz1000 => 1000.0,
            SampleRate::Hz2000 => 2000.0,
        }
    }
}

impl fmt::Display for SampleRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}Hz", self.hz())
    }
}

/// Validate a device-reported sampling rate.
pub fn validate_rate(rate_hz: f32) -> ScopeResult<f32> {
    if rate_hz.is_finite() && rate_hz > 0.0 {
        Ok(rate_hz)
    } else {
        Err(ScopeError::InvalidSampleRate { rate_hz })
    }
}

/// Filter families in a channel pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterFamily {
    /// 0.5 Hz high-pass removing electrode drift, always active
    Baseline,
    /// Signal-type band shaping
    Exg,
    /// Powerline rejection
    Notch,
}

impl FilterFamily {
    pub fn name(self) -> &'static str {
        match self {
            FilterFamily::Baseline => "baseline",
            FilterFamily::Exg => "exg",
            FilterFamily::Notch => "notch",
        }
    }
}

impl fmt::Display for FilterFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Physiological signal type selecting the EXG filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExgType {
    /// 30 Hz low-pass
    Ecg,
    /// 10 Hz low-pass
    Eog,
    /// 45 Hz low-pass
    Eeg,
    /// 70 Hz high-pass
    Emg,
}

impl ExgType {
    pub const ALL: [ExgType; 4] = [ExgType::Ecg, ExgType::Eog, ExgType::Eeg, ExgType::Emg];

    /// Decode the wire code. `0` means bypass.
    pub fn from_code(code: u8) -> ScopeResult<Option<Self>> {
        match code {
            0 => Ok(None),
            1 => Ok(Some(ExgType::Ecg)),
            2 => Ok(Some(ExgType::Eog)),
            3 => Ok(Some(ExgType::Eeg)),
            4 => Ok(Some(ExgType::Emg)),
            code => Err(ScopeError::UnknownFilterType {
                family: FilterFamily::Exg.name(),
                code,
            }),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            ExgType::Ecg => 1,
            ExgType::Eog => 2,
            ExgType::Eeg => 3,
            ExgType::Emg => 4,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ExgType::Ecg => "ECG",
            ExgType::Eog => "EOG",
            ExgType::Eeg => "EEG",
            ExgType::Emg => "EMG",
        }
    }
}

/// Mains frequency rejected by the notch filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotchType {
    Hz50,
    Hz60,
}

impl NotchType {
    pub const ALL: [NotchType; 2] = [NotchType::Hz50, NotchType::Hz60];

    /// Decode the wire code. `0` means bypass.
    pub fn from_code(code: u8) -> ScopeResult<Option<Self>> {
        match code {
            0 => Ok(None),
            1 => Ok(Some(NotchType::Hz50)),
            2 => Ok(Some(NotchType::Hz60)),
            code => Err(ScopeError::UnknownFilterType {
                family: FilterFamily::Notch.name(),
                code,
            }),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            NotchType::Hz50 => 1,
            NotchType::Hz60 => 2,
        }
    }

    pub fn mains_hz(self) -> f32 {
        match self {
            NotchType::Hz50 => 50.0,
            NotchType::Hz60 => 60.0,
        }
    }
}

/// A filter-type change addressed to one family, `None` meaning bypass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterSelection {
    Exg(Option<ExgType>),
    Notch(Option<NotchType>),
}

impl FilterSelection {
    /// Build a selection from a family and its wire code.
    pub fn from_code(family: FilterFamily, code: u8) -> ScopeResult<Self> {
        match family {
            FilterFamily::Exg => Ok(FilterSelection::Exg(ExgType::from_code(code)?)),
            FilterFamily::Notch => Ok(FilterSelection::Notch(NotchType::from_code(code)?)),
            FilterFamily::Baseline => Err(ScopeError::UnknownFilterType {
                family: FilterFamily::Baseline.name(),
                code,
            }),
        }
    }

    pub fn family(&self) -> FilterFamily {
        match self {
            FilterSelection::Exg(_) => FilterFamily::Exg,
            FilterSelection::Notch(_) => FilterFamily::Notch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_lookup() {
        assert_eq!(SampleRate::from_hz(500.0), Some(SampleRate::Hz500));
        assert_eq!(SampleRate::from_hz(2000.0), Some(SampleRate::Hz2000));
        assert_eq!(SampleRate::from_hz(300.0), None);
        assert_eq!(SampleRate::from_hz(f32::NAN), None);
        for rate in SampleRate::ALL {
            assert_eq!(SampleRate::from_hz(rate.hz()), Some(rate));
        }
    }

    #[test]
    fn test_validate_rate() {
        assert!(validate_rate(300.0).is_ok());
        assert!(validate_rate(0.0).is_err());
        assert!(validate_rate(-250.0).is_err());
        assert!(validate_rate(f32::INFINITY).is_err());
    }

    #[test]
    fn test_exg_codes() {
        assert_eq!(ExgType::from_code(0).unwrap(), None);
        for exg in ExgType::ALL {
            assert_eq!(ExgType::from_code(exg.code()).unwrap(), Some(exg));
        }
        assert!(matches!(
            ExgType::from_code(5),
            Err(ScopeError::UnknownFilterType { family: "exg", code: 5 })
        ));
    }

    #[test]
    fn test_notch_codes() {
        assert_eq!(NotchType::from_code(0).unwrap(), None);
        assert_eq!(NotchType::from_code(1).unwrap(), Some(NotchType::Hz50));
        assert_eq!(NotchType::from_code(2).unwrap(), Some(NotchType::Hz60));
        assert!(NotchType::from_code(3).is_err());
    }

    #[test]
    fn test_selection_from_code() {
        let sel = FilterSelection::from_code(FilterFamily::Notch, 2).unwrap();
        assert_eq!(sel, FilterSelection::Notch(Some(NotchType::Hz60)));
        assert_eq!(sel.family(), FilterFamily::Notch);
        assert!(FilterSelection::from_code(FilterFamily::Baseline, 1).is_err());
    }
}
