//! Transitions
//!
//! Strategy values describing how a result becomes visible, plus the
//! listener notified around animated handoffs. The animation itself is
//! rendered by the surface; this crate only sequences it.

use std::time::Duration;

/// How a result becomes visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transition {
    /// Show the result immediately with no animation
    #[default]
    None,
    /// Cross-fade from the current drawable over `duration`
    Crossfade { duration: Duration },
}

impl Transition {
    /// Default cross-fade length.
    pub const DEFAULT_CROSSFADE: Duration = Duration::from_millis(100);

    /// A cross-fade of the default length.
    pub fn crossfade() -> Self {
        Transition::Crossfade {
            duration: Self::DEFAULT_CROSSFADE,
        }
    }

    /// Whether this is the identity transition.
    pub fn is_none(&self) -> bool {
        matches!(self, Transition::None)
    }
}

/// Observer of animated handoffs, e.g. for diagnostics or frame pacing.
pub trait TransitionEvents {
    /// An animated handoff is about to run.
    fn transition_start(&self);
    /// The handoff finished; the outgoing drawable is no longer being read.
    fn transition_end(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_identity() {
        assert!(Transition::default().is_none());
        assert!(!Transition::crossfade().is_none());
    }
}
