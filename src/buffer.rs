use std::sync::Mutex;

use crate::BlockOutcome;

/// Capacity of the working buffer used by every block stream.
pub const BLOCK_BUFFER_SIZE: usize = (1 << 16) - 16;

/// A trait used to buffer data. Conceptually, a buffer starts empty,
/// has some data written to it. The buffer holds that data while it's
/// uncommitted, then something else commits that data e.g. by writing it
/// to the outside world. Once all data has been committed, then the buffer
/// is again empty.
///
/// See [FixedBuffer] for a minimal buffer implementation.
pub trait Buffer {
    /// Get the writable slice of the buffer.
    fn writable(&mut self) -> &mut [u8];

    /// Mark the first `len` bytes as having been written to the writable
    /// part of the buffer.
    ///
    /// ## Panics
    ///
    /// Implementations may panic if `len > self.writable().len()`.
    fn written(&mut self, len: usize);

    /// Get the uncommitted slice of the buffer. This is data that has
    /// been written to the buffer but not yet committed.
    fn uncommitted(&self) -> &[u8];

    /// Mark the first `len` bytes of the uncommitted part of the buffer as
    /// committed, e.g. because it was flushed to the outside world.
    ///
    /// ## Panics
    ///
    /// Implementations may panic if `len > self.uncommitted().len()`.
    fn commit(&mut self, len: usize);

    /// Clear any uncommitted data in the buffer. This is conceptually
    /// equivalent to committing all the uncommitted data.
    #[cfg(test)]
    fn clear(&mut self);
}

/// A [Buffer] that wraps some fixed-size array-like type, which uses two
/// indices to track the writable, uncommitted, and commmitted parts of the
/// buffer.
///
/// The buffer will look like this internally:
///
/// ```plain
/// |--------------------- buffer ---------------------|
/// |-- (committed) --|-- uncommitted --|-- writable --|
///                 ^ head            ^ tail
/// ```
///
/// - When data is written to the buffer, `tail` is bumped forward
/// - When data is committed from the buffer, `head` is bumped forward
/// - Once all data is committed, then `head` and `tail` are reset
pub struct FixedBuffer<T> {
    buffer: T,
    head: usize,
    tail: usize,
}

impl<T> FixedBuffer<T> {
    pub fn new(buffer: T) -> Self {
        Self {
            buffer,
            head: 0,
            tail: 0,
        }
    }
}

impl<T> Buffer for FixedBuffer<T>
where
    T: AsRef<[u8]> + AsMut<[u8]>,
{
    fn writable(&mut self) -> &mut [u8] {
        let buffer = self.buffer.as_mut();
        &mut buffer[self.tail..]
    }

    fn written(&mut self, len: usize) {
        self.tail += len;
        assert!(self.tail <= self.buffer.as_ref().len());
    }

    fn uncommitted(&self) -> &[u8] {
        let buffer = self.buffer.as_ref();
        &buffer[self.head..self.tail]
    }

    fn commit(&mut self, len: usize) {
        self.head += len;
        assert!(self.head <= self.tail);

        if self.head == self.tail {
            self.head = 0;
            self.tail = 0;
        }
    }

    #[cfg(test)]
    fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
    }
}

/// Copy data from `src` into the `dst` buffer, capped to the buffer's
/// available write capacity. Returns the number of bytes copied from `src`.
pub fn copy_from_slice(src: &[u8], dst: &mut impl Buffer) -> usize {
    let writable = dst.writable();
    let write_len = writable.len().min(src.len());

    writable[..write_len].copy_from_slice(&src[..write_len]);
    dst.written(write_len);

    write_len
}

/// Copy the not-yet-copied tail of a fragment into `dst`, where `copied`
/// tracks how much of `fragment` has been copied so far. Returns
/// [`Complete(())`](BlockOutcome::Complete) once the whole fragment has
/// been copied, or [`HasMore(_)`](BlockOutcome::HasMore) with the number
/// of bytes still to copy.
pub fn copy_fragment(fragment: &[u8], copied: &mut usize, dst: &mut impl Buffer) -> BlockOutcome<()> {
    *copied += copy_from_slice(&fragment[*copied..], dst);

    let remaining_bytes = fragment.len() - *copied;
    if remaining_bytes == 0 {
        BlockOutcome::Complete(())
    } else {
        BlockOutcome::HasMore { remaining_bytes }
    }
}

/// A pool of working buffers shared between block streams.
///
/// Only suspendable (async) block streams rent from the pool. A rented
/// [`PooledBuffer`] goes back to the pool when it's dropped. Blocking
/// streams allocate their own buffer and never touch the pool.
pub struct BufferPool {
    buffers: Mutex<Vec<Box<[u8]>>>,
    buffer_size: usize,
    max_pooled: usize,
}

static SHARED_POOL: BufferPool = BufferPool::new(BLOCK_BUFFER_SIZE, 16);

impl BufferPool {
    /// Create an empty pool handing out buffers of `buffer_size` bytes,
    /// retaining at most `max_pooled` returned buffers.
    pub const fn new(buffer_size: usize, max_pooled: usize) -> Self {
        Self {
            buffers: Mutex::new(Vec::new()),
            buffer_size,
            max_pooled,
        }
    }

    /// The process-wide pool used by async block streams.
    pub fn shared() -> &'static BufferPool {
        &SHARED_POOL
    }

    /// Take a buffer from the pool, allocating a new one if the pool is
    /// empty.
    pub fn rent(&'static self) -> PooledBuffer {
        let buffer = self.lock().pop();
        let buffer = buffer.unwrap_or_else(|| vec![0; self.buffer_size].into_boxed_slice());

        PooledBuffer {
            buffer: Some(buffer),
            pool: self,
        }
    }

    /// Number of idle buffers currently held by the pool.
    pub fn idle(&self) -> usize {
        self.lock().len()
    }

    fn give_back(&self, buffer: Box<[u8]>) {
        let mut buffers = self.lock();
        if buffers.len() < self.max_pooled {
            buffers.push(buffer);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Box<[u8]>>> {
        // A panic while holding the lock can't leave the list of idle
        // buffers in an inconsistent state
        self.buffers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// A working buffer rented from a [`BufferPool`]. Returned to the pool
/// on drop.
pub struct PooledBuffer {
    buffer: Option<Box<[u8]>>,
    pool: &'static BufferPool,
}

impl AsRef<[u8]> for PooledBuffer {
    fn as_ref(&self) -> &[u8] {
        self.buffer.as_deref().unwrap_or_default()
    }
}

impl AsMut<[u8]> for PooledBuffer {
    fn as_mut(&mut self) -> &mut [u8] {
        self.buffer.as_deref_mut().unwrap_or_default()
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        if let Some(buffer) = self.buffer.take() {
            self.pool.give_back(buffer);
        }
    }
}
