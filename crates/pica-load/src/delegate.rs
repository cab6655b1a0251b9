//! Target Delegates
//!
//! Per-request orchestration binding a display target to reference-count
//! bookkeeping. Every lifecycle event for one request routes through exactly
//! one delegate, chosen once from the request's target binding, so a pixel
//! buffer is never pooled while a surface or a running transition can still
//! read it.

use std::cell::RefCell;
use std::rc::Rc;

use pica_memory::{Bitmap, BitmapReferenceCounter};

use crate::drawable::Drawable;
use crate::target::{DisplayTarget, PoolableTarget, RequestTarget, TransitionOutcome};
use crate::transition::{Transition, TransitionEvents};

/// The reference counter as shared on the UI task.
pub type SharedCounter = Rc<RefCell<BitmapReferenceCounter>>;

/// Lifecycle position of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelegateState {
    Created,
    Started,
    Succeeded,
    Errored,
    Cleared,
}

enum DelegateKind {
    /// No visible consumer; every event is a no-op
    Empty,
    /// No surface, but the result must become pool-eligible once unheld
    Discard { counter: SharedCounter },
    /// Plain display surface without pool bookkeeping of its own
    Display {
        target: Rc<RefCell<dyn DisplayTarget>>,
        counter: SharedCounter,
    },
    /// Surface that tracks the buffer backing its current frame
    Poolable {
        target: Rc<RefCell<dyn PoolableTarget>>,
        counter: SharedCounter,
    },
}

/// Orchestrator for one in-flight request.
///
/// A new request against the same surface gets a new delegate; the previous
/// one is discarded by the caller, and its bookkeeping is unwound through
/// the replacement's `start` or an explicit `clear`.
pub struct TargetDelegate {
    kind: DelegateKind,
    state: DelegateState,
    events: Option<Rc<dyn TransitionEvents>>,
}

impl TargetDelegate {
    /// Bind a delegate to the request's target, chosen once per request.
    pub fn new(target: &RequestTarget, counter: SharedCounter) -> Self {
        Self::with_events(target, counter, None)
    }

    /// Like [`new`](Self::new), with a listener for animated handoffs.
    pub fn with_events(
        target: &RequestTarget,
        counter: SharedCounter,
        events: Option<Rc<dyn TransitionEvents>>,
    ) -> Self {
        let kind = match target {
            RequestTarget::None => DelegateKind::Empty,
            RequestTarget::Discard => DelegateKind::Discard { counter },
            RequestTarget::Display(t) => DelegateKind::Display {
                target: t.clone(),
                counter,
            },
            RequestTarget::Poolable(t) => DelegateKind::Poolable {
                target: t.clone(),
                counter,
            },
        };
        Self {
            kind,
            state: DelegateState::Created,
            events,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> DelegateState {
        self.state
    }

    /// The request started; show the placeholder.
    ///
    /// `cached` is the buffer behind the drawable this request supersedes:
    /// the previously displayed value for plain surfaces, or the pooled
    /// buffer backing the placeholder for poolable ones.
    pub fn start(&mut self, cached: Option<&Bitmap>, placeholder: Option<&Drawable>) {
        if !self.advance(&[DelegateState::Created], DelegateState::Started, "start") {
            return;
        }
        match &mut self.kind {
            DelegateKind::Empty | DelegateKind::Discard { .. } => {}
            DelegateKind::Display { target, counter } => {
                if let Some(b) = cached {
                    counter.borrow_mut().invalidate(b);
                }
                target.borrow_mut().on_start(placeholder);
            }
            DelegateKind::Poolable { target, counter } => {
                if let Some(b) = cached {
                    counter.borrow_mut().increment(b);
                }
                let previous = target.borrow_mut().replace_current_bitmap(cached.cloned());
                target.borrow_mut().on_start(placeholder);
                if let Some(b) = previous {
                    counter.borrow_mut().decrement(&b);
                }
            }
        }
    }

    /// The request resolved; deliver the result through the transition.
    ///
    /// Suspends only for an animated transition on a surface that supports
    /// one, and never retires the outgoing buffer before the handoff ends.
    pub async fn success(&mut self, result: Drawable, from_cache: bool, transition: &Transition) {
        if !self.advance(&[DelegateState::Started], DelegateState::Succeeded, "success") {
            return;
        }
        tracing::trace!(from_cache, "delivering success");
        let events = self.events.clone();
        match &mut self.kind {
            DelegateKind::Empty => {}
            DelegateKind::Discard { counter } => {
                // Nothing will ever decrement this buffer; flag it now so it
                // becomes pool-eligible as soon as nothing else holds it.
                if let Some(b) = result.bitmap() {
                    counter.borrow_mut().invalidate(b);
                }
            }
            DelegateKind::Display { target, counter } => {
                // Plain surfaces never decrement either; same leak guard.
                if let Some(b) = result.bitmap() {
                    counter.borrow_mut().invalidate(b);
                }
                let outcome = TransitionOutcome::Success(result);
                deliver(&**target, &outcome, transition, events.as_ref()).await;
            }
            DelegateKind::Poolable { target, counter } => {
                // Increment the incoming buffer before touching the surface:
                // old and new may be the same buffer, and the brief double
                // hold keeps it from ever looking unreferenced mid-update.
                let next = result.bitmap().cloned();
                if let Some(b) = &next {
                    counter.borrow_mut().increment(b);
                }
                let previous = target.borrow_mut().replace_current_bitmap(next);
                let _retire = DecrementGuard::new(counter.clone(), previous);
                let outcome = TransitionOutcome::Success(result);
                deliver(&**target, &outcome, transition, events.as_ref()).await;
                // `_retire` decrements the outgoing buffer here, or when the
                // task is cancelled mid-transition.
            }
        }
    }

    /// The request failed; deliver the error drawable.
    pub async fn error(&mut self, error: Option<Drawable>, transition: &Transition) {
        if !self.advance(&[DelegateState::Started], DelegateState::Errored, "error") {
            return;
        }
        let events = self.events.clone();
        match &mut self.kind {
            DelegateKind::Empty | DelegateKind::Discard { .. } => {}
            DelegateKind::Display { target, .. } => {
                let outcome = TransitionOutcome::Error(error);
                deliver(&**target, &outcome, transition, events.as_ref()).await;
            }
            DelegateKind::Poolable { target, counter } => {
                let previous = target.borrow_mut().replace_current_bitmap(None);
                let _retire = DecrementGuard::new(counter.clone(), previous);
                let outcome = TransitionOutcome::Error(error);
                deliver(&**target, &outcome, transition, events.as_ref()).await;
            }
        }
    }

    /// Release the surface with no replacement. Terminal.
    pub fn clear(&mut self) {
        let from = [
            DelegateState::Created,
            DelegateState::Started,
            DelegateState::Succeeded,
            DelegateState::Errored,
        ];
        if !self.advance(&from, DelegateState::Cleared, "clear") {
            return;
        }
        if let DelegateKind::Poolable { target, counter } = &mut self.kind {
            let previous = target.borrow_mut().replace_current_bitmap(None);
            target.borrow_mut().on_clear();
            if let Some(b) = previous {
                counter.borrow_mut().decrement(&b);
            }
        }
    }

    /// Guard a lifecycle transition. Out-of-order calls are an integration
    /// defect: they assert in debug builds and are logged and ignored in
    /// release builds so counts are never corrupted. The empty variant
    /// swallows them silently.
    fn advance(&mut self, allowed: &[DelegateState], next: DelegateState, op: &'static str) -> bool {
        if allowed.contains(&self.state) {
            self.state = next;
            return true;
        }
        if !matches!(self.kind, DelegateKind::Empty) {
            debug_assert!(false, "{op} called on a delegate in state {:?}", self.state);
            tracing::error!(op, state = ?self.state, "lifecycle call out of order, ignoring");
        }
        false
    }
}

/// Retires the outgoing backing buffer once the visible update has finished,
/// even if the surrounding task is cancelled mid-transition.
struct DecrementGuard {
    counter: SharedCounter,
    previous: Option<Bitmap>,
}

impl DecrementGuard {
    fn new(counter: SharedCounter, previous: Option<Bitmap>) -> Self {
        Self { counter, previous }
    }
}

impl Drop for DecrementGuard {
    fn drop(&mut self) {
        if let Some(b) = self.previous.take() {
            self.counter.borrow_mut().decrement(&b);
        }
    }
}

/// Deliver an outcome to a surface per the transition contract: identity
/// transitions and incapable surfaces get a direct, synchronous show; an
/// animated handoff runs as one unit between the listener notifications.
async fn deliver<T>(
    surface: &RefCell<T>,
    outcome: &TransitionOutcome,
    transition: &Transition,
    events: Option<&Rc<dyn TransitionEvents>>,
) where
    T: DisplayTarget + ?Sized,
{
    // Lifecycle calls for one surface are serialized on the UI task, so the
    // surface stays exclusively borrowed for the whole handoff.
    let mut surface = surface.borrow_mut();
    if transition.is_none() {
        return show_direct(&mut *surface, outcome);
    }
    match surface.as_transition_target() {
        None => {
            tracing::debug!("surface does not support animated transitions, showing directly");
            show_direct(&mut *surface, outcome);
        }
        Some(animated) => {
            if let Some(events) = events {
                events.transition_start();
            }
            animated.run_transition(outcome, transition).await;
            if let Some(events) = events {
                events.transition_end();
            }
        }
    }
}

fn show_direct<T: DisplayTarget + ?Sized>(surface: &mut T, outcome: &TransitionOutcome) {
    match outcome {
        TransitionOutcome::Success(result) => surface.on_success(result),
        TransitionOutcome::Error(error) => surface.on_error(error.as_ref()),
    }
}
