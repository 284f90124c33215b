//! Error handling for the sweep scope
//!
//! Configuration calls return these errors synchronously. The per-sample path
//! never fails: configuration misses degrade to bypass and poisoned filter
//! state is cleared in place, both only counted and logged.

use thiserror::Error;

/// Result type alias for sweep scope operations
pub type ScopeResult<T> = Result<T, ScopeError>;

/// Error taxonomy for the filtering and display core
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum ScopeError {
    /// No coefficient row exists for the requested rate/filter combination
    #[error("no coefficients for {family} type {code} at {rate_hz}Hz")]
    ConfigurationMiss {
        /// Sampling rate that was looked up
        rate_hz: f32,
        /// Filter family name
        family: &'static str,
        /// Numeric filter type code
        code: u8,
    },

    /// A non-finite value entered a biquad delay line
    #[error("filter state poisoned on channel {channel} ({family})")]
    StatePoisoned {
        /// Physical channel index
        channel: usize,
        /// Filter family name
        family: &'static str,
    },

    /// A computed sweep position fell outside the buffer
    #[error("sweep position {position} outside buffer of capacity {capacity}")]
    BufferIndexFault {
        /// Offending position
        position: usize,
        /// Buffer capacity
        capacity: usize,
    },

    /// Sampling rate is not a positive finite number
    #[error("invalid sampling rate: {rate_hz}Hz")]
    InvalidSampleRate {
        /// Provided rate
        rate_hz: f32,
    },

    /// ADC resolution outside the supported set
    #[error("unsupported bit depth {bits}, expected one of 10, 12, 14, 16, 24")]
    UnsupportedBitDepth {
        /// Provided resolution
        bits: u8,
    },

    /// Time base must be a positive finite number of seconds
    #[error("invalid time base: {seconds}s")]
    InvalidTimeBase {
        /// Provided window length
        seconds: f32,
    },

    /// Vertical zoom factor must be positive and finite
    #[error("invalid vertical scale: {scale}")]
    InvalidVerticalScale {
        /// Provided zoom factor
        scale: f32,
    },

    /// Channel index beyond the supported or connected channel count
    #[error("channel {index} out of range (max {max})")]
    ChannelOutOfRange {
        /// Requested channel
        index: usize,
        /// Exclusive upper bound
        max: usize,
    },

    /// Filter type code not defined for the family
    #[error("unknown {family} filter type {code}")]
    UnknownFilterType {
        /// Filter family name
        family: &'static str,
        /// Provided code
        code: u8,
    },

    /// Settings could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for ScopeError {
    fn from(value: serde_json::Error) -> Self {
        ScopeError::Serialization(value.to_string())
    }
}

/// Convenience macro for channel range errors
#[macro_export]
macro_rules! channel_error {
    ($index:expr, $max:expr) => {
        $crate::error::ScopeError::ChannelOutOfRange {
            index: $index,
            max: $max,
        }
    };
}
