//! sweepscope-core: shared types for the biosignal sweep scope
//!
//! Closed enumerations for sample rates and filter types, the channel
//! selection, display configuration with normalization, and the error type.

pub mod channels;
pub mod display;
pub mod error;
pub mod types;

pub use channels::ChannelAssignment;
pub use display::{
    BitDepth, ConfigChange, DisplayConfig, ScopeConfig, MAX_SWEEP_SAMPLES, MAX_TIME_BASE_SECONDS,
};
pub use error::{ScopeError, ScopeResult};
pub use types::*;
