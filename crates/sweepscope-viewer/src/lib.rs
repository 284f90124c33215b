//! sweepscope-viewer: sweep display driven by a live sample stream
//!
//! Ingestion and redraw run as independent tasks. They share only the sweep
//! buffers, which the writer updates slot by slot and the renderer reads
//! without locking.

pub mod backend;
pub mod cli;
pub mod ingest;
pub mod render;
pub mod scope;
pub mod sweep;

pub use backend::{LineSummary, RecordingBackend, RenderBackend, SummaryBackend};
pub use ingest::{spawn_ingestion, IngestionHandle, IngestionReport};
pub use render::{spawn_render_driver, RenderDriver, RenderHandle};
pub use scope::{Scope, ScopeStats};
pub use sweep::{erase_ahead_position, Snapshot, SweepBank, SweepBuffer, SweepLine};
