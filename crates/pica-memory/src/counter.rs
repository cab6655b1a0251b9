//! Bitmap Reference Counting
//!
//! Tracks how many logical holders rely on each decoded buffer and returns a
//! buffer to the pool exactly when it has been invalidated and the count has
//! reached zero. Counts are mutated from the single UI-owning task; callers
//! wrap the counter in `Rc<RefCell<_>>` rather than a lock.

use std::collections::HashMap;
use std::sync::Arc;

use crate::buffer::{Bitmap, BufferId};
use crate::pool::BitmapPool;

/// Per-buffer bookkeeping gating return to the pool.
pub struct BitmapReferenceCounter {
    pool: Arc<BitmapPool>,
    entries: HashMap<BufferId, Entry>,
    /// Buffers that became eligible while a handle was still live; retried
    /// on every mutation and on explicit [`sweep`](Self::sweep)
    pending: Vec<Bitmap>,
}

struct Entry {
    bitmap: Bitmap,
    count: u32,
    invalid: bool,
}

impl BitmapReferenceCounter {
    /// Create a counter returning eligible buffers to `pool`.
    pub fn new(pool: Arc<BitmapPool>) -> Self {
        Self {
            pool,
            entries: HashMap::new(),
            pending: Vec::new(),
        }
    }

    /// Record one more logical holder of `bitmap`.
    pub fn increment(&mut self, bitmap: &Bitmap) {
        self.sweep();
        let entry = self.entry_for(bitmap);
        entry.count += 1;
        tracing::trace!(id = ?bitmap.id(), count = entry.count, "increment");
    }

    /// Remove one logical holder of `bitmap`.
    ///
    /// Underflow is a lifecycle bug upstream: it asserts in debug builds and
    /// is logged and ignored in release builds so counts never go negative.
    pub fn decrement(&mut self, bitmap: &Bitmap) {
        self.sweep();
        let id = bitmap.id();
        let Some(entry) = self.entries.get_mut(&id) else {
            debug_assert!(false, "reference count underflow for {id:?}");
            tracing::error!(?id, "reference count underflow: decrement of untracked buffer");
            return;
        };
        if entry.count == 0 {
            debug_assert!(false, "reference count underflow for {id:?}");
            tracing::error!(?id, "reference count underflow");
            return;
        }
        entry.count -= 1;
        tracing::trace!(?id, count = entry.count, "decrement");
        if entry.count == 0 && entry.invalid {
            self.retire(id);
        }
    }

    /// Mark `bitmap` as no longer anyone's current value.
    ///
    /// Does not change the count; the buffer becomes pool-eligible once the
    /// count is (or reaches) zero.
    pub fn invalidate(&mut self, bitmap: &Bitmap) {
        self.sweep();
        let entry = self.entry_for(bitmap);
        entry.invalid = true;
        tracing::trace!(id = ?bitmap.id(), count = entry.count, "invalidate");
        if entry.count == 0 {
            self.retire(bitmap.id());
        }
    }

    /// Retry deferred pool returns whose last outside handle has dropped.
    pub fn sweep(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        for bitmap in pending {
            match Arc::try_unwrap(bitmap) {
                Ok(buffer) => {
                    tracing::trace!(id = ?buffer.id(), "returning buffer to pool");
                    self.pool.put(buffer);
                }
                Err(bitmap) => self.pending.push(bitmap),
            }
        }
    }

    /// Current logical holder count for `bitmap`.
    pub fn count(&self, bitmap: &Bitmap) -> u32 {
        self.entries.get(&bitmap.id()).map_or(0, |e| e.count)
    }

    /// Whether `bitmap` has been invalidated.
    pub fn is_invalidated(&self, bitmap: &Bitmap) -> bool {
        let id = bitmap.id();
        self.entries.get(&id).map_or(false, |e| e.invalid)
            || self.pending.iter().any(|b| b.id() == id)
    }

    /// Number of buffers with live bookkeeping entries.
    pub fn tracked(&self) -> usize {
        self.entries.len()
    }

    /// Number of eligible buffers still waiting on an outside handle.
    pub fn pending_returns(&self) -> usize {
        self.pending.len()
    }

    fn entry_for(&mut self, bitmap: &Bitmap) -> &mut Entry {
        let id = bitmap.id();
        if !self.entries.contains_key(&id) {
            // A buffer parked in `pending` can be re-held before its pool
            // return lands; rescue it so a sweep cannot pool a live buffer.
            // It stays invalid: eligibility only ever widens.
            let invalid = if let Some(pos) = self.pending.iter().position(|b| b.id() == id) {
                self.pending.swap_remove(pos);
                true
            } else {
                false
            };
            self.entries.insert(
                id,
                Entry {
                    bitmap: bitmap.clone(),
                    count: 0,
                    invalid,
                },
            );
        }
        self.entries.get_mut(&id).unwrap()
    }

    /// Remove an eligible entry and hand the buffer back to the pool.
    ///
    /// The counter holds one handle per tracked buffer; unwrapping it proves
    /// no reader remains. A buffer still shared is parked for a later sweep
    /// instead of being pooled out from under its readers.
    fn retire(&mut self, id: BufferId) {
        let Some(entry) = self.entries.remove(&id) else {
            return;
        };
        match Arc::try_unwrap(entry.bitmap) {
            Ok(buffer) => {
                tracing::trace!(?id, "returning buffer to pool");
                self.pool.put(buffer);
            }
            Err(bitmap) => {
                tracing::trace!(?id, "buffer still referenced, deferring pool return");
                self.pending.push(bitmap);
            }
        }
    }
}
