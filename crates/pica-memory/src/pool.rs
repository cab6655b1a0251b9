//! Bitmap Memory Pool
//!
//! Reuses pixel buffers to reduce allocations while decoding. Buffers are
//! bucketed by allocated size and format; decode workers share the pool with
//! the UI task, so all state sits behind an interior mutex.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::buffer::{bucket_dim, PixelBuffer, PixelFormat};

/// Bucket key: power-of-two dimensions plus pixel format.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
struct BucketKey {
    width_bucket: u32,
    height_bucket: u32,
    format: PixelFormat,
}

impl BucketKey {
    fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        Self {
            width_bucket: bucket_dim(width),
            height_bucket: bucket_dim(height),
            format,
        }
    }
}

/// Pool of reusable pixel buffers.
pub struct BitmapPool {
    inner: Mutex<PoolInner>,
    /// Maximum buffers retained per bucket
    max_per_bucket: usize,
    /// Maximum total bytes retained
    max_bytes: usize,
}

struct PoolInner {
    buckets: HashMap<BucketKey, Vec<PixelBuffer>>,
    total_bytes: usize,
    hits: u64,
    misses: u64,
}

impl Default for BitmapPool {
    fn default() -> Self {
        Self::new(64, 128 * 1024 * 1024) // 128 MB default limit
    }
}

impl BitmapPool {
    /// Create a pool with the given retention limits.
    pub fn new(max_per_bucket: usize, max_bytes: usize) -> Self {
        Self {
            inner: Mutex::new(PoolInner {
                buckets: HashMap::new(),
                total_bytes: 0,
                hits: 0,
                misses: 0,
            }),
            max_per_bucket,
            max_bytes,
        }
    }

    /// Best-effort reuse: pop a buffer from the matching bucket, or `None`.
    ///
    /// A returned buffer is resized, zeroed, and carries a fresh identity.
    pub fn get(&self, width: u32, height: u32, format: PixelFormat) -> Option<PixelBuffer> {
        let key = BucketKey::new(width, height, format);
        let mut inner = self.inner.lock().unwrap();

        let popped = inner.buckets.get_mut(&key).and_then(|bucket| bucket.pop());
        match popped {
            Some(mut buffer) => {
                inner.hits += 1;
                inner.total_bytes -= buffer.allocated_bytes();
                buffer.resize(width, height);
                buffer.clear();
                buffer.reassign_id();
                Some(buffer)
            }
            None => {
                inner.misses += 1;
                None
            }
        }
    }

    /// Reuse a pooled buffer or allocate a new one.
    pub fn get_or_alloc(&self, width: u32, height: u32, format: PixelFormat) -> PixelBuffer {
        self.get(width, height, format)
            .unwrap_or_else(|| PixelBuffer::new(width, height, format))
    }

    /// Return a buffer for future reuse.
    ///
    /// The caller must be able to prove no references remain; the reference
    /// counter only calls this once it holds the sole handle. Buffers beyond
    /// the retention limits are dropped.
    pub fn put(&self, buffer: PixelBuffer) {
        let (alloc_w, alloc_h) = buffer.allocated_dims();
        let key = BucketKey::new(alloc_w, alloc_h, buffer.format);
        let bytes = buffer.allocated_bytes();
        let mut inner = self.inner.lock().unwrap();

        if inner.total_bytes + bytes > self.max_bytes {
            tracing::trace!(bytes, "pool byte limit reached, dropping buffer");
            return;
        }
        let bucket = inner.buckets.entry(key).or_default();
        if bucket.len() >= self.max_per_bucket {
            tracing::trace!("bucket full, dropping buffer");
            return;
        }
        bucket.push(buffer);
        inner.total_bytes += bytes;
    }

    /// Current pool statistics.
    pub fn stats(&self) -> PoolStats {
        let inner = self.inner.lock().unwrap();
        PoolStats {
            total_bytes: inner.total_bytes,
            max_bytes: self.max_bytes,
            hits: inner.hits,
            misses: inner.misses,
            hit_rate: if inner.hits + inner.misses > 0 {
                inner.hits as f64 / (inner.hits + inner.misses) as f64
            } else {
                0.0
            },
            num_buckets: inner.buckets.len(),
            num_buffers: inner.buckets.values().map(|b| b.len()).sum(),
        }
    }

    /// Drop all pooled buffers.
    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.buckets.clear();
        inner.total_bytes = 0;
    }
}

/// Pool statistics
#[derive(Debug, Clone)]
pub struct PoolStats {
    pub total_bytes: usize,
    pub max_bytes: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub num_buckets: usize,
    pub num_buffers: usize,
}
