//! sweepscope-simulation: synthetic biosignal device
//!
//! Generates quantized multi-channel ExG frames and streams them in batches,
//! standing in for a hardware acquisition link.

pub mod exg_simulator;
pub mod real_time_stream;
pub mod signal_patterns;

pub use exg_simulator::*;
pub use real_time_stream::*;
pub use signal_patterns::*;
