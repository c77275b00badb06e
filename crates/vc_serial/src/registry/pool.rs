use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use core::ops::{Deref, DerefMut};
use std::sync::{Mutex, PoisonError};

/// A locked free list of scratch buffers shared by every session.
///
/// Buffers are handed out as [`PooledBuffer`] guards and come back on drop,
/// so a returned buffer can no longer be reached by its former user.
#[derive(Clone, Default)]
pub struct BufferPool {
    free: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl BufferPool {
    /// Capacity of a fresh buffer; writers flush when it is reached.
    pub const BUFFER_SIZE: usize = 4096;

    /// Upper bound on idle buffers kept around.
    const MAX_IDLE: usize = 16;

    pub fn new() -> Self {
        Self::default()
    }

    /// Takes an idle buffer or allocates a new one.
    pub fn acquire(&self) -> PooledBuffer {
        let buffer = self
            .free
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
            .unwrap_or_else(|| Vec::with_capacity(Self::BUFFER_SIZE));
        PooledBuffer {
            buffer,
            pool: self.free.clone(),
        }
    }

    /// Number of buffers waiting to be reused.
    pub fn idle(&self) -> usize {
        self.free.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

impl fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferPool")
            .field("idle", &self.idle())
            .finish()
    }
}

/// A scratch buffer on loan from a [`BufferPool`].
pub struct PooledBuffer {
    buffer: Vec<u8>,
    pool: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl Deref for PooledBuffer {
    type Target = Vec<u8>;

    #[inline]
    fn deref(&self) -> &Vec<u8> {
        &self.buffer
    }
}

impl DerefMut for PooledBuffer {
    #[inline]
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        &mut self.buffer
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        let mut buffer = core::mem::take(&mut self.buffer);
        // Keep the allocation, drop the content.
        buffer.clear();
        let mut free = self.pool.lock().unwrap_or_else(PoisonError::into_inner);
        if free.len() < BufferPool::MAX_IDLE {
            free.push(buffer);
        }
    }
}

impl fmt::Debug for PooledBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledBuffer")
            .field("len", &self.buffer.len())
            .field("capacity", &self.buffer.capacity())
            .finish()
    }
}
