//! sweepscope-processing: per-channel IIR filtering
//!
//! Fixed-coefficient biquad cascades selected from a static table, composed
//! into one pipeline per physical channel.

pub mod biquad;
pub mod coefficients;
pub mod config;
pub mod filters;
pub mod pipeline;
pub mod response;

pub use biquad::{BiquadCoeffs, BiquadState};
pub use coefficients::{lookup, lookup_hz, CoeffSet, FilterKind};
pub use config::{ChannelFilterSettings, FilterSettings};
pub use filters::{BaselineFilter, ChannelFilter, ExgFilter, FilterStats, NotchFilter};
pub use pipeline::{ChannelPipeline, FilterOrder, PipelineBank};
