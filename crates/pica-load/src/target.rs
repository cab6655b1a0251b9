//! Display Targets
//!
//! Capability seams for the UI surfaces a request can resolve into. How much
//! reference-tracking work a request needs is decided once, by which of
//! these traits its surface implements.

use std::cell::RefCell;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;

use pica_memory::Bitmap;

use crate::drawable::Drawable;
use crate::transition::Transition;

/// Boxed single-threaded future, used for animated handoffs.
pub type LocalBoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Final visible state delivered to a surface.
#[derive(Debug, Clone)]
pub enum TransitionOutcome {
    Success(Drawable),
    Error(Option<Drawable>),
}

/// A UI surface that can show placeholder, success, and error states.
pub trait DisplayTarget {
    /// A request against this surface started; show the placeholder.
    fn on_start(&mut self, placeholder: Option<&Drawable>);
    /// The request resolved; show the result.
    fn on_success(&mut self, result: &Drawable);
    /// The request failed; show the error drawable.
    fn on_error(&mut self, error: Option<&Drawable>);

    /// Animated-transition capability probe. Surfaces that cannot animate
    /// return `None` and receive direct show calls instead.
    fn as_transition_target(&mut self) -> Option<&mut dyn TransitionTarget> {
        None
    }
}

/// A surface that persistently tracks the buffer backing its current frame
/// and takes part in pool bookkeeping.
pub trait PoolableTarget: DisplayTarget {
    /// The buffer currently backing this surface, if any.
    fn current_bitmap(&self) -> Option<Bitmap>;
    /// Install `next` as the backing buffer, returning the previous one.
    fn replace_current_bitmap(&mut self, next: Option<Bitmap>) -> Option<Bitmap>;
    /// The surface is being released with no replacement.
    fn on_clear(&mut self);
}

/// A surface that can run an animated handoff to a new visible state.
pub trait TransitionTarget: DisplayTarget {
    /// One logical unit of animation work. Resolves only when the handoff is
    /// complete and the outgoing drawable is no longer being read; callers
    /// must not retire the outgoing buffer before then.
    fn run_transition(
        &mut self,
        outcome: &TransitionOutcome,
        transition: &Transition,
    ) -> LocalBoxFuture<'_, ()>;
}

/// The display binding chosen once per request.
#[derive(Clone)]
pub enum RequestTarget {
    /// Cache population only; nothing visible consumes the result
    None,
    /// No surface, but the decoded buffer must become pool-eligible as soon
    /// as nothing else holds it
    Discard,
    /// A plain display surface with no pool bookkeeping of its own
    Display(Rc<RefCell<dyn DisplayTarget>>),
    /// A surface that tracks its backing buffer for reuse
    Poolable(Rc<RefCell<dyn PoolableTarget>>),
}

impl RequestTarget {
    /// Variant name for diagnostics.
    pub(crate) fn kind_name(&self) -> &'static str {
        match self {
            RequestTarget::None => "none",
            RequestTarget::Discard => "discard",
            RequestTarget::Display(_) => "display",
            RequestTarget::Poolable(_) => "poolable",
        }
    }
}
