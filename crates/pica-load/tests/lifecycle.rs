//! Integration tests for the full request lifecycle
//!
//! Exercises decode, delegate dispatch, and pool recycling together the way
//! the orchestration layer drives them.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use pica_load::*;
use pica_memory::{Bitmap, BitmapPool, BitmapReferenceCounter};

#[derive(Default)]
struct TestSurface {
    current: Option<Bitmap>,
    shown: Vec<String>,
}

impl DisplayTarget for TestSurface {
    fn on_start(&mut self, _placeholder: Option<&Drawable>) {
        self.shown.push("placeholder".into());
    }
    fn on_success(&mut self, result: &Drawable) {
        let label = result
            .bitmap()
            .map_or("solid".to_string(), |b| format!("{}x{}", b.width, b.height));
        self.shown.push(label);
    }
    fn on_error(&mut self, _error: Option<&Drawable>) {
        self.shown.push("error".into());
    }
}

impl PoolableTarget for TestSurface {
    fn current_bitmap(&self) -> Option<Bitmap> {
        self.current.clone()
    }
    fn replace_current_bitmap(&mut self, next: Option<Bitmap>) -> Option<Bitmap> {
        std::mem::replace(&mut self.current, next)
    }
    fn on_clear(&mut self) {
        self.shown.push("cleared".into());
    }
}

fn encode_png(width: u32, height: u32) -> Vec<u8> {
    let mut out = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut out, width, height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header().unwrap();
        writer
            .write_image_data(&vec![128u8; (width * height * 4) as usize])
            .unwrap();
    }
    out
}

fn setup() -> (Arc<BitmapPool>, SharedCounter) {
    let pool = Arc::new(LoaderConfig::default().new_pool());
    let counter = Rc::new(RefCell::new(BitmapReferenceCounter::new(pool.clone())));
    (pool, counter)
}

// ============================================================================
// DISPLAY FLOW
// ============================================================================

#[test]
fn test_decode_and_display() {
    let (pool, counter) = setup();
    let surface = Rc::new(RefCell::new(TestSurface::default()));

    let request = ImageRequest::new("test://a.png")
        .with_size(16, 16)
        .with_target(RequestTarget::Poolable(surface.clone()));
    request.validate().unwrap();

    let decoded = decode(
        &pool,
        &encode_png(32, 32),
        request.size,
        &DecodeOptions {
            allow_downsample: true,
            ..Default::default()
        },
    )
    .unwrap();
    assert!(decoded.downsampled);

    let mut delegate = TargetDelegate::new(&request.target, counter.clone());
    delegate.start(None, request.placeholder.as_ref());
    smol::block_on(delegate.success(
        Drawable::Bitmap(decoded.bitmap.clone()),
        false,
        &request.transition,
    ));

    assert_eq!(surface.borrow().shown, vec!["placeholder", "16x16"]);
    assert_eq!(counter.borrow().count(&decoded.bitmap), 1);
}

// ============================================================================
// REQUEST SUPERSESSION
// ============================================================================

#[test]
fn test_superseded_buffer_is_recycled_and_reused() {
    let (pool, counter) = setup();
    let surface = Rc::new(RefCell::new(TestSurface::default()));
    let target = RequestTarget::Poolable(surface.clone());
    let data = encode_png(16, 16);

    // First request resolves onto the surface
    let first = decode(&pool, &data, None, &DecodeOptions::default()).unwrap();
    let first_bitmap = first.bitmap.clone();
    let mut delegate = TargetDelegate::new(&target, counter.clone());
    delegate.start(None, None);
    smol::block_on(delegate.success(Drawable::Bitmap(first.bitmap), false, &Transition::None));

    // The cache drops the first result; the surface is the last holder
    counter.borrow_mut().invalidate(&first_bitmap);
    assert_eq!(counter.borrow().count(&first_bitmap), 1);

    // A second request targets the same surface; the old delegate is
    // discarded and the new one's lifecycle unwinds the old bookkeeping
    let second = decode(&pool, &data, None, &DecodeOptions::default()).unwrap();
    let mut replacement = TargetDelegate::new(&target, counter.clone());
    replacement.start(None, None);
    smol::block_on(replacement.success(
        Drawable::Bitmap(second.bitmap.clone()),
        false,
        &Transition::None,
    ));

    // The superseded buffer retired once every handle was gone
    assert_eq!(counter.borrow().count(&first_bitmap), 0);
    drop(first_bitmap);
    counter.borrow_mut().sweep();
    assert_eq!(pool.stats().num_buffers, 1);

    // And the next decode of the same size reuses it
    let hits_before = pool.stats().hits;
    let third = decode(&pool, &data, None, &DecodeOptions::default()).unwrap();
    assert_eq!(pool.stats().hits, hits_before + 1);
    assert_eq!(third.bitmap.width, 16);
}

// ============================================================================
// CACHE-ONLY REQUESTS
// ============================================================================

#[test]
fn test_prefetch_touches_no_bookkeeping() {
    let (pool, counter) = setup();
    let data = encode_png(16, 16);

    let decoded = decode(&pool, &data, None, &DecodeOptions::default()).unwrap();
    let mut delegate = TargetDelegate::new(&RequestTarget::None, counter.clone());
    delegate.start(None, None);
    smol::block_on(delegate.success(
        Drawable::Bitmap(decoded.bitmap.clone()),
        false,
        &Transition::None,
    ));

    // The decoded buffer is live for cache consumers and untracked
    assert_eq!(counter.borrow().tracked(), 0);
    assert_eq!(counter.borrow().count(&decoded.bitmap), 0);
    assert_eq!(pool.stats().num_buffers, 0);
}

#[test]
fn test_one_shot_result_becomes_eligible() {
    let (pool, counter) = setup();
    let data = encode_png(16, 16);

    let decoded = decode(&pool, &data, None, &DecodeOptions::default()).unwrap();
    let mut delegate = TargetDelegate::new(&RequestTarget::Discard, counter.clone());
    delegate.start(None, None);
    smol::block_on(delegate.success(
        Drawable::Bitmap(decoded.bitmap.clone()),
        false,
        &Transition::None,
    ));

    // Eligible as soon as the last caller handle drops
    drop(decoded);
    counter.borrow_mut().sweep();
    assert_eq!(pool.stats().num_buffers, 1);
}

// ============================================================================
// ERROR PATH
// ============================================================================

#[test]
fn test_decode_failure_feeds_error_lifecycle() {
    let (pool, counter) = setup();
    let surface = Rc::new(RefCell::new(TestSurface::default()));
    let target = RequestTarget::Poolable(surface.clone());

    let result = decode(&pool, b"garbage", None, &DecodeOptions::default());
    let err: LoadError = result.unwrap_err().into();
    assert!(matches!(err, LoadError::Decode(_)));

    let mut delegate = TargetDelegate::new(&target, counter);
    delegate.start(None, None);
    smol::block_on(delegate.error(
        Some(Drawable::Solid(Rgba::new(200, 0, 0, 255))),
        &Transition::None,
    ));

    assert_eq!(surface.borrow().shown, vec!["placeholder", "error"]);
    assert_eq!(delegate.state(), DelegateState::Errored);
}
