//! Time subsystem.
//!
//! One `FrameClock` per render loop; call `tick()` once per frame to obtain a
//! `FrameTime`. Elapsed session time for shaders is measured against the
//! interaction layer's session start, not against the clock itself.

mod frame_clock;

pub use frame_clock::{FrameClock, FrameTime};
