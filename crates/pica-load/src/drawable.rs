//! Drawables
//!
//! What a display target shows: a decoded bitmap or flat placeholder art.

use pica_memory::Bitmap;

/// Solid RGBA color for placeholder and error art.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba { r: 0, g: 0, b: 0, a: 0 };

    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// A displayable value delivered through the request lifecycle.
#[derive(Debug, Clone)]
pub enum Drawable {
    /// Backed by a pooled pixel buffer
    Bitmap(Bitmap),
    /// Flat color with no pooled backing
    Solid(Rgba),
}

impl Drawable {
    /// The pooled buffer behind this drawable, if any.
    ///
    /// Solid drawables have none, which makes every counter call routed
    /// through here a no-op for them.
    pub fn bitmap(&self) -> Option<&Bitmap> {
        match self {
            Drawable::Bitmap(b) => Some(b),
            Drawable::Solid(_) => None,
        }
    }
}
