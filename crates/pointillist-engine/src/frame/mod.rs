//! Per-frame orchestration.
//!
//! [`FrameOrchestrator::render_frame`] is the engine's single per-tick entry
//! point. It never waits on tile fetches: it records the draws that are
//! possible right now into [`FrameCommands`], which the renderer then encodes
//! into one render pass.

mod commands;
mod orchestrator;

pub use commands::{FrameCommands, FrameStats, PointDraw};
pub use orchestrator::FrameOrchestrator;
