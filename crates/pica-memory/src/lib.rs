//! Pica Memory
//!
//! Pixel buffer storage, pooling, and reference counting for the pica
//! image-loading pipeline. Decoded buffers are shared as [`Bitmap`] handles;
//! the [`BitmapReferenceCounter`] decides when a buffer may return to the
//! [`BitmapPool`] for reuse.

mod buffer;
mod counter;
mod pool;

pub use buffer::{Bitmap, BufferId, PixelBuffer, PixelFormat};
pub use counter::BitmapReferenceCounter;
pub use pool::{BitmapPool, PoolStats};
