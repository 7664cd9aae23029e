//! Pointillist engine crate.
//!
//! Streams a hierarchy of point-cloud tiles into GPU buffers and draws the
//! visible working set once per frame. Tile fetches are asynchronous; the
//! frame loop never waits on them and simply skips tiles that are not ready.

pub mod config;
pub mod coords;
pub mod device;
pub mod error;
pub mod frame;
pub mod label;
pub mod logging;
pub mod pipeline;
pub mod render;
pub mod texture;
pub mod tile;
pub mod time;
pub mod view;

pub use config::RenderConfig;
pub use error::{ComposeError, FontLoadError};
pub use frame::{FrameCommands, FrameOrchestrator, FrameStats, PointDraw};
pub use render::PointCloudRenderer;
