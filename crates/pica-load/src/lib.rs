//! Pica Load
//!
//! Request lifecycle for the pica image loader: target delegates bind a UI
//! surface to reference-count bookkeeping so a pixel buffer returns to the
//! pool exactly when nothing can still read it, across placeholder display,
//! animated handoffs, request supersession, and clears.

mod decode;
mod delegate;
mod drawable;
mod error;
mod request;
mod target;
mod transition;

pub use decode::{decode, Decoded, DecodeError, DecodeOptions, EncodedFormat};
pub use delegate::{DelegateState, SharedCounter, TargetDelegate};
pub use drawable::{Drawable, Rgba};
pub use error::LoadError;
pub use request::{ImageRequest, LoaderConfig, PoolConfig};
pub use target::{
    DisplayTarget, LocalBoxFuture, PoolableTarget, RequestTarget, TransitionOutcome,
    TransitionTarget,
};
pub use transition::{Transition, TransitionEvents};
