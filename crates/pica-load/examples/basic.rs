//! End-to-end lifecycle demo: decode into the shared pool, display through a
//! poolable surface, retire the buffer, and watch the pool reuse it.
//!
//! Run with `RUST_LOG=trace` to see the counter and pool activity.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use pica_load::{
    decode, DecodeOptions, DisplayTarget, Drawable, ImageRequest, LoaderConfig, PoolableTarget,
    RequestTarget, Rgba, TargetDelegate, Transition,
};
use pica_memory::{Bitmap, BitmapReferenceCounter};

/// A stand-in UI surface that prints what it would draw.
#[derive(Default)]
struct TerminalSurface {
    current: Option<Bitmap>,
}

impl DisplayTarget for TerminalSurface {
    fn on_start(&mut self, placeholder: Option<&Drawable>) {
        println!("surface: showing placeholder ({})", placeholder.is_some());
    }
    fn on_success(&mut self, result: &Drawable) {
        if let Some(b) = result.bitmap() {
            println!("surface: showing {}x{} bitmap {:?}", b.width, b.height, b.id());
        }
    }
    fn on_error(&mut self, _error: Option<&Drawable>) {
        println!("surface: showing error state");
    }
}

impl PoolableTarget for TerminalSurface {
    fn current_bitmap(&self) -> Option<Bitmap> {
        self.current.clone()
    }
    fn replace_current_bitmap(&mut self, next: Option<Bitmap>) -> Option<Bitmap> {
        std::mem::replace(&mut self.current, next)
    }
    fn on_clear(&mut self) {
        println!("surface: cleared");
    }
}

fn encode_sample_png(width: u32, height: u32) -> Vec<u8> {
    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, width, height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header().unwrap();
        let mut pixels = vec![0u8; (width * height * 4) as usize];
        for (i, px) in pixels.chunks_exact_mut(4).enumerate() {
            px[0] = (i * 7 % 256) as u8;
            px[1] = (i * 13 % 256) as u8;
            px[3] = 255;
        }
        writer.write_image_data(&pixels).unwrap();
    }
    out
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = LoaderConfig::default();
    let pool = Arc::new(config.new_pool());
    let counter = Rc::new(RefCell::new(BitmapReferenceCounter::new(pool.clone())));
    let surface = Rc::new(RefCell::new(TerminalSurface::default()));

    let request = ImageRequest::new("demo://sample.png")
        .with_size(64, 64)
        .with_placeholder(Drawable::Solid(Rgba::new(32, 32, 32, 255)))
        .with_transition(Transition::crossfade())
        .with_target(RequestTarget::Poolable(surface.clone()));
    request.validate().expect("request is well formed");

    // Fetch and decode would normally run on a worker; the result is handed
    // back to this task before any delegate call.
    let data = encode_sample_png(128, 128);
    let decoded = decode(
        &pool,
        &data,
        request.size,
        &DecodeOptions {
            allow_downsample: true,
            ..Default::default()
        },
    )
    .expect("sample image decodes");
    println!(
        "decoded {}x{} (downsampled: {})",
        decoded.bitmap.width, decoded.bitmap.height, decoded.downsampled
    );

    let mut delegate = TargetDelegate::new(&request.target, counter.clone());
    delegate.start(None, request.placeholder.as_ref());
    smol::block_on(delegate.success(
        Drawable::Bitmap(decoded.bitmap.clone()),
        false,
        &request.transition,
    ));

    // The surface is being torn down; nothing replaces the image.
    counter.borrow_mut().invalidate(&decoded.bitmap);
    delegate.clear();
    drop(decoded);
    counter.borrow_mut().sweep();

    let stats = pool.stats();
    println!(
        "pool now holds {} buffer(s), {} bytes",
        stats.num_buffers, stats.total_bytes
    );

    // The next decode of a similar size reuses the recycled buffer.
    let again = decode(&pool, &data, request.size, &DecodeOptions {
        allow_downsample: true,
        ..Default::default()
    })
    .expect("second decode");
    println!(
        "second decode got buffer {:?}, pool hits: {}",
        again.bitmap.id(),
        pool.stats().hits
    );
}
