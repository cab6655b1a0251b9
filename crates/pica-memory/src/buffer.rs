//! Pixel Buffers
//!
//! Decoded raster storage with power-of-two allocation so buffers of similar
//! sizes can be pooled and reused.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Shared read-only handle to a decoded pixel buffer.
pub type Bitmap = Arc<PixelBuffer>;

/// Minimum allocated dimension; tiny images still round up to this.
const MIN_DIM: u32 = 64;

/// Round a dimension up to its allocation bucket.
pub(crate) fn bucket_dim(n: u32) -> u32 {
    n.max(MIN_DIM).next_power_of_two()
}

/// Process-unique identity of one decoded buffer.
///
/// A buffer checked back out of the pool receives a fresh id: it is a new
/// logical value and must never alias bookkeeping from a previous life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(u64);

impl BufferId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Pixel layout of a decoded buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PixelFormat {
    /// 8-bit RGBA, the decode layer's native output
    #[default]
    Rgba8888,
    /// 8-bit BGRA for surfaces that want it pre-swizzled
    Bgra8888,
    /// 8-bit grayscale
    Gray8,
}

impl PixelFormat {
    /// Bytes per pixel for this format
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            PixelFormat::Rgba8888 | PixelFormat::Bgra8888 => 4,
            PixelFormat::Gray8 => 1,
        }
    }
}

/// A mutable block of decoded pixel data with a fixed format.
///
/// The allocation is rounded up to power-of-two dimensions so the buffer can
/// later back a smaller image without reallocating.
pub struct PixelBuffer {
    id: BufferId,
    /// Raw pixel bytes, row-major with the allocated stride
    pub data: Vec<u8>,
    /// Logical width in pixels
    pub width: u32,
    /// Logical height in pixels
    pub height: u32,
    /// Pixel layout
    pub format: PixelFormat,
    /// Allocated width (may be larger than `width`)
    allocated_width: u32,
    /// Allocated height (may be larger than `height`)
    allocated_height: u32,
}

impl PixelBuffer {
    /// Allocate a buffer for the given logical dimensions.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        let alloc_w = bucket_dim(width);
        let alloc_h = bucket_dim(height);
        let bytes = alloc_w as usize * alloc_h as usize * format.bytes_per_pixel();

        Self {
            id: BufferId::next(),
            data: vec![0; bytes],
            width,
            height,
            format,
            allocated_width: alloc_w,
            allocated_height: alloc_h,
        }
    }

    /// This buffer's identity.
    pub fn id(&self) -> BufferId {
        self.id
    }

    /// Resize the logical dimensions, reusing the allocation when it fits.
    pub fn resize(&mut self, width: u32, height: u32) {
        let need_w = bucket_dim(width);
        let need_h = bucket_dim(height);

        if need_w > self.allocated_width || need_h > self.allocated_height {
            self.allocated_width = need_w;
            self.allocated_height = need_h;
            let bytes = need_w as usize * need_h as usize * self.format.bytes_per_pixel();
            self.data.resize(bytes, 0);
        }

        self.width = width;
        self.height = height;
    }

    /// Zero the pixel data.
    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    /// Bytes between the start of consecutive rows.
    pub fn row_stride(&self) -> usize {
        self.allocated_width as usize * self.format.bytes_per_pixel()
    }

    /// Pixel bytes at (x, y), or `None` outside the logical bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let bpp = self.format.bytes_per_pixel();
        let idx = y as usize * self.row_stride() + x as usize * bpp;
        self.data.get(idx..idx + bpp)
    }

    /// Write one pixel at (x, y). Out-of-bounds writes are ignored.
    pub fn set_pixel(&mut self, x: u32, y: u32, pixel: &[u8]) {
        debug_assert_eq!(pixel.len(), self.format.bytes_per_pixel());
        if x >= self.width || y >= self.height {
            return;
        }
        let bpp = self.format.bytes_per_pixel();
        let idx = y as usize * self.row_stride() + x as usize * bpp;
        self.data[idx..idx + bpp].copy_from_slice(pixel);
    }

    /// Copy tightly-packed pixel rows into this buffer's strided storage.
    pub fn copy_from_tight(&mut self, src: &[u8]) {
        let bpp = self.format.bytes_per_pixel();
        let row_bytes = self.width as usize * bpp;
        debug_assert_eq!(src.len(), row_bytes * self.height as usize);
        let stride = self.row_stride();
        for (y, row) in src.chunks_exact(row_bytes).enumerate() {
            let start = y * stride;
            self.data[start..start + row_bytes].copy_from_slice(row);
        }
    }

    /// Allocated size in bytes.
    pub fn allocated_bytes(&self) -> usize {
        self.data.len()
    }

    pub(crate) fn allocated_dims(&self) -> (u32, u32) {
        (self.allocated_width, self.allocated_height)
    }

    /// Mint a new identity for a buffer starting a new life out of the pool.
    pub(crate) fn reassign_id(&mut self) {
        self.id = BufferId::next();
    }
}

impl std::fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("id", &self.id)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_roundtrip() {
        let mut buf = PixelBuffer::new(100, 100, PixelFormat::Rgba8888);
        buf.set_pixel(50, 50, &[255, 0, 0, 255]);

        assert_eq!(buf.pixel(50, 50), Some(&[255, 0, 0, 255][..]));
        assert_eq!(buf.pixel(100, 50), None);
    }

    #[test]
    fn test_allocation_rounds_up() {
        let buf = PixelBuffer::new(100, 30, PixelFormat::Rgba8888);
        assert_eq!(buf.allocated_dims(), (128, 64));
        assert_eq!(buf.allocated_bytes(), 128 * 64 * 4);
    }

    #[test]
    fn test_resize_reuses_allocation() {
        let mut buf = PixelBuffer::new(100, 100, PixelFormat::Rgba8888);
        let before = buf.allocated_bytes();

        buf.resize(60, 120);
        assert_eq!(buf.allocated_bytes(), before);
        assert_eq!((buf.width, buf.height), (60, 120));

        buf.resize(300, 100);
        assert!(buf.allocated_bytes() > before);
    }

    #[test]
    fn test_copy_from_tight_respects_stride() {
        let mut buf = PixelBuffer::new(65, 2, PixelFormat::Gray8);
        let src: Vec<u8> = (0..130).map(|i| (i % 251) as u8).collect();
        buf.copy_from_tight(&src);

        assert_eq!(buf.pixel(64, 0), Some(&src[64..65]));
        assert_eq!(buf.pixel(0, 1), Some(&src[65..66]));
    }

    #[test]
    fn test_ids_are_unique() {
        let a = PixelBuffer::new(8, 8, PixelFormat::Rgba8888);
        let b = PixelBuffer::new(8, 8, PixelFormat::Rgba8888);
        assert_ne!(a.id(), b.id());
    }
}
