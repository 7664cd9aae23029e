//! GPU device + surface management.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue
//! - creating & configuring the Surface (swapchain)
//! - acquiring frames and providing encoders/views for rendering
//! - the `BufferDevice` seam used by the tile cache

mod buffers;
mod error;
mod frame;
mod gpu;
mod init;

pub use buffers::BufferDevice;
pub use error::SurfaceErrorAction;
pub use frame::GpuFrame;
pub use gpu::Gpu;
pub use init::GpuInit;

#[cfg(test)]
pub(crate) use buffers::testing;
