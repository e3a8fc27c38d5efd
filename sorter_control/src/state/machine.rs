//! Generic state holder shared by the three pipeline machines.
//!
//! Each machine is a closed enum of state variants. A variant's `step`
//! returns `Option<next>`; [`Machine::apply`] swaps it in, logs the
//! transition and drops the old variant. Dropping a variant cancels any
//! worker it owns, so leaving a state always cleans it up.

use std::fmt;
use std::time::{Duration, Instant};
use tracing::info;

/// A machine state with a printable tag.
pub trait StateKind {
    type Tag: Copy + Eq + fmt::Display + fmt::Debug;

    fn tag(&self) -> Self::Tag;
}

pub struct Machine<S> {
    name: &'static str,
    state: S,
    entered_at: Instant,
    transitions: u64,
}

impl<S: StateKind> Machine<S> {
    pub fn new(name: &'static str, initial: S) -> Self {
        Self {
            name,
            state: initial,
            entered_at: Instant::now(),
            transitions: 0,
        }
    }

    #[inline]
    pub fn state_mut(&mut self) -> &mut S {
        &mut self.state
    }

    #[inline]
    pub fn tag(&self) -> S::Tag {
        self.state.tag()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn time_in_state(&self) -> Duration {
        self.entered_at.elapsed()
    }

    pub fn transitions(&self) -> u64 {
        self.transitions
    }

    /// Enter `next` if present. Returns whether a transition happened.
    pub fn apply(&mut self, next: Option<S>) -> bool {
        let Some(next) = next else {
            return false;
        };
        let from = self.state.tag();
        let to = next.tag();
        let held = self.time_in_state();
        // old variant dropped here
        self.state = next;
        self.entered_at = Instant::now();
        self.transitions += 1;
        info!("{}: {} -> {} after {:?}", self.name, from, to, held);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum LightTag {
        Off,
        On,
    }

    impl fmt::Display for LightTag {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(match self {
                Self::Off => "OFF",
                Self::On => "ON",
            })
        }
    }

    struct Guard(Arc<AtomicBool>);

    impl Drop for Guard {
        fn drop(&mut self) {
            self.0.store(true, Ordering::SeqCst);
        }
    }

    enum Light {
        Off,
        On(#[allow(dead_code)] Guard),
    }

    impl StateKind for Light {
        type Tag = LightTag;

        fn tag(&self) -> LightTag {
            match self {
                Self::Off => LightTag::Off,
                Self::On(_) => LightTag::On,
            }
        }
    }

    #[test]
    fn none_keeps_state() {
        let mut m = Machine::new("light", Light::Off);
        assert!(!m.apply(None));
        assert_eq!(m.tag(), LightTag::Off);
        assert_eq!(m.transitions(), 0);
    }

    #[test]
    fn transition_drops_previous_state() {
        let dropped = Arc::new(AtomicBool::new(false));
        let mut m = Machine::new("light", Light::Off);
        assert!(m.apply(Some(Light::On(Guard(Arc::clone(&dropped))))));
        assert_eq!(m.tag(), LightTag::On);
        assert!(!dropped.load(Ordering::SeqCst));

        assert!(m.apply(Some(Light::Off)));
        assert!(dropped.load(Ordering::SeqCst));
        assert_eq!(m.transitions(), 2);
        assert_eq!(m.name(), "light");
    }

    #[test]
    fn transition_restarts_time_in_state() {
        let mut m = Machine::new("light", Light::Off);
        std::thread::sleep(Duration::from_millis(20));
        assert!(m.time_in_state() >= Duration::from_millis(20));
        m.apply(Some(Light::Off));
        assert!(m.time_in_state() < Duration::from_millis(20));
    }
}
