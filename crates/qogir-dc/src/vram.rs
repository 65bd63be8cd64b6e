//! The host's video-memory allocator, seen through a narrow trait.

use thiserror::Error;

/// Opaque handle to a host-owned buffer in device memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub u64);

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum VramError {
    #[error("out of device memory")]
    OutOfMemory,
    #[error("unknown buffer handle")]
    InvalidHandle,
    #[error("buffer is not pinned")]
    NotPinned,
}

/// Allocation, pinning and address resolution for scanout buffers.
///
/// Pins are counted: a buffer pinned twice needs two unpins, which is what
/// makes swapping a buffer for itself safe. `device_address` is only
/// meaningful while the buffer holds at least one pin, and `map_mut` yields
/// the buffer's full allocation.
pub trait VramManager {
    fn alloc(&mut self, len: usize, align: usize) -> Result<BufferId, VramError>;
    fn free(&mut self, buffer: BufferId);
    fn pin(&mut self, buffer: BufferId) -> Result<(), VramError>;
    fn unpin(&mut self, buffer: BufferId);
    fn device_address(&mut self, buffer: BufferId) -> Result<u32, VramError>;
    fn map_mut(&mut self, buffer: BufferId) -> Result<&mut [u8], VramError>;
}
