use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// A thread-safe pool of byte buffers reused for PES payload assembly.
///
/// Maintains a pool of reusable byte buffers to minimize allocations
/// while packets are collected from the transport stream.
#[derive(Debug, Clone)]
pub struct BufferPool {
    pool: Arc<Mutex<VecDeque<Vec<u8>>>>,
    max_size: usize,
    buffer_capacity: usize,
}

impl BufferPool {
    /// Creates a new buffer pool with the specified parameters.
    ///
    /// # Arguments
    ///
    /// * `max_size` - Maximum number of buffers to keep in the pool
    /// * `buffer_capacity` - Initial capacity for each buffer
    pub fn new(max_size: usize, buffer_capacity: usize) -> Self {
        Self {
            pool: Arc::new(Mutex::new(VecDeque::with_capacity(max_size))),
            max_size,
            buffer_capacity,
        }
    }

    /// Acquires a buffer from the pool or creates a new one if none available.
    pub fn acquire(&self) -> Vec<u8> {
        let pooled = match self.pool.lock() {
            Ok(mut pool) => pool.pop_front(),
            Err(_) => None,
        };

        pooled.unwrap_or_else(|| Vec::with_capacity(self.buffer_capacity))
    }

    /// Returns a buffer to the pool for reuse.
    pub fn release(&self, mut buffer: Vec<u8>) {
        buffer.clear();

        if let Ok(mut pool) = self.pool.lock() {
            if pool.len() < self.max_size {
                pool.push_back(buffer);
            }
        }
    }

    pub fn pooled(&self) -> usize {
        self.pool.lock().map(|pool| pool.len()).unwrap_or(0)
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(16, 4 * 1024)
    }
}

#[test]
fn reuse_released_buffers() {
    let pool = BufferPool::new(1, 8);

    let mut buffer = pool.acquire();
    buffer.extend_from_slice(&[1, 2, 3]);
    pool.release(buffer);
    pool.release(Vec::new());
    assert_eq!(pool.pooled(), 1);

    let buffer = pool.acquire();
    assert!(buffer.is_empty());
    assert_eq!(pool.pooled(), 0);
}
