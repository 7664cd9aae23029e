/// Buffer operations the tile cache and label encoder need from the GPU.
///
/// Implemented by [`crate::render::RenderCtx`] for wgpu. Keeping it narrow
/// lets the frame logic run against a recording device in tests.
pub trait BufferDevice {
    /// Shared handle to a device buffer.
    type Buffer: Clone;

    /// Creates a vertex buffer initialized with `contents` that also accepts sub-writes.
    fn create_point_buffer(&self, label: &str, contents: &[u8]) -> Self::Buffer;

    /// Overwrites `data.len()` bytes of `buffer` starting at `offset`.
    fn write_buffer(&self, buffer: &Self::Buffer, offset: u64, data: &[u8]);
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::{Cell, RefCell};

    use super::BufferDevice;

    /// Records buffer traffic; buffers are numbered in creation order.
    #[derive(Default)]
    pub(crate) struct RecordingDevice {
        pub next_id: Cell<u32>,
        pub created: RefCell<Vec<(String, usize)>>,
        pub writes: RefCell<Vec<(u32, u64, Vec<u8>)>>,
    }

    impl BufferDevice for RecordingDevice {
        type Buffer = u32;

        fn create_point_buffer(&self, label: &str, contents: &[u8]) -> u32 {
            let id = self.next_id.get();
            self.next_id.set(id + 1);
            self.created.borrow_mut().push((label.to_string(), contents.len()));
            id
        }

        fn write_buffer(&self, buffer: &u32, offset: u64, data: &[u8]) {
            self.writes.borrow_mut().push((*buffer, offset, data.to_vec()));
        }
    }
}
