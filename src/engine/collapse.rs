use std::time::{Duration, Instant};

/// Height transition length for expanding/collapsing a group.
pub const TRANSITION: Duration = Duration::from_millis(180);

/// Observable lifecycle phase of one group's child block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollapsePhase {
    Closed,
    Opening,
    Open,
    Closing,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    /// Children unmounted.
    Closed,
    /// Children just mounted at height 0, waiting one frame for a measured
    /// natural height.
    Measuring,
    Opening {
        started: Instant,
        from: f32,
        to: f32,
    },
    /// Settled; height is the natural (auto) height, so later content
    /// changes need no re-measure.
    Open,
    Closing {
        started: Instant,
        from: f32,
    },
}

/// Per-group open/close height animation.
///
/// `Closed → Opening → Open → Closing → Closed`, with a measuring beat at the
/// start of every open. Any toggle received mid-transition reverses from the
/// current interpolated height, which also cancels the pending settle or
/// unmount step; rapid toggling can never leave a closed group mounted or
/// re-reference an unmounted one.
///
/// Time is passed in explicitly so transitions are unit-testable.
#[derive(Debug, Clone, Copy)]
pub struct CollapseAnimator {
    state: State,
}

impl CollapseAnimator {
    pub fn new(open: bool) -> Self {
        Self {
            state: if open { State::Open } else { State::Closed },
        }
    }

    pub fn phase(&self) -> CollapsePhase {
        match self.state {
            State::Closed => CollapsePhase::Closed,
            State::Measuring | State::Opening { .. } => CollapsePhase::Opening,
            State::Open => CollapsePhase::Open,
            State::Closing { .. } => CollapsePhase::Closing,
        }
    }

    /// Whether the child rows should be in the layout at all.
    pub fn is_mounted(&self) -> bool {
        !matches!(self.state, State::Closed)
    }

    pub fn is_animating(&self) -> bool {
        matches!(
            self.state,
            State::Measuring | State::Opening { .. } | State::Closing { .. }
        )
    }

    /// Flip direction. `natural_height` is the current full height of the
    /// child block (used when reversing out of the settled states).
    pub fn toggle(&mut self, now: Instant, natural_height: f32) {
        self.state = match self.state {
            State::Closed => State::Measuring,
            // Nothing visible yet; unmount straight away.
            State::Measuring => State::Closed,
            State::Opening { started, from, to } => State::Closing {
                started: now,
                from: interpolate(now, started, from, to),
            },
            State::Open => State::Closing {
                started: now,
                from: natural_height,
            },
            State::Closing { started, from } => State::Opening {
                started: now,
                from: interpolate(now, started, from, 0.0),
                to: natural_height,
            },
        };
    }

    /// Feed the measured natural height one frame after mounting at 0.
    pub fn provide_measured_height(&mut self, now: Instant, natural_height: f32) {
        if matches!(self.state, State::Measuring) {
            self.state = State::Opening {
                started: now,
                from: 0.0,
                to: natural_height.max(0.0),
            };
        }
    }

    /// Advance finished transitions: a completed open settles to auto, a
    /// completed close unmounts the children.
    pub fn tick(&mut self, now: Instant) {
        match self.state {
            State::Opening { started, .. } if now >= started + TRANSITION => {
                self.state = State::Open;
            }
            State::Closing { started, .. } if now >= started + TRANSITION => {
                self.state = State::Closed;
            }
            _ => {}
        }
    }

    /// Current display height of the child block. `None` means "auto": the
    /// block renders at its natural height.
    pub fn height(&self, now: Instant) -> Option<f32> {
        match self.state {
            State::Closed => Some(0.0),
            State::Measuring => Some(0.0),
            State::Opening { started, from, to } => Some(interpolate(now, started, from, to)),
            State::Open => None,
            State::Closing { started, from } => Some(interpolate(now, started, from, 0.0)),
        }
    }
}

fn interpolate(now: Instant, started: Instant, from: f32, to: f32) -> f32 {
    let elapsed = now.saturating_duration_since(started);
    let t = (elapsed.as_secs_f32() / TRANSITION.as_secs_f32()).clamp(0.0, 1.0);
    from + (to - from) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    const NATURAL: f32 = 140.0;

    fn half() -> Duration {
        TRANSITION / 2
    }

    #[test]
    fn full_open_cycle_settles_to_auto() {
        let now = Instant::now();
        let mut a = CollapseAnimator::new(false);
        a.toggle(now, NATURAL);
        assert_eq!(a.phase(), CollapsePhase::Opening);
        assert_eq!(a.height(now), Some(0.0));

        // Next frame: natural height is measured and the grow begins.
        a.provide_measured_height(now, NATURAL);
        let mid = now + half();
        let h = a.height(mid).unwrap();
        assert!(h > 0.0 && h < NATURAL);

        let done = now + TRANSITION;
        a.tick(done);
        assert_eq!(a.phase(), CollapsePhase::Open);
        assert_eq!(a.height(done), None);
    }

    #[test]
    fn full_close_cycle_unmounts() {
        let now = Instant::now();
        let mut a = CollapseAnimator::new(true);
        a.toggle(now, NATURAL);
        assert_eq!(a.phase(), CollapsePhase::Closing);
        assert!(a.is_mounted());

        let mid = now + half();
        let h = a.height(mid).unwrap();
        assert!(h > 0.0 && h < NATURAL);

        a.tick(now + TRANSITION);
        assert_eq!(a.phase(), CollapsePhase::Closed);
        assert!(!a.is_mounted());
        assert_eq!(a.height(now + TRANSITION), Some(0.0));
    }

    #[test]
    fn toggle_mid_open_reverses_from_current_height() {
        let now = Instant::now();
        let mut a = CollapseAnimator::new(false);
        a.toggle(now, NATURAL);
        a.provide_measured_height(now, NATURAL);

        let mid = now + half();
        let h_before = a.height(mid).unwrap();
        a.toggle(mid, NATURAL);
        assert_eq!(a.phase(), CollapsePhase::Closing);
        // Reversal starts where the open left off, not from the top.
        assert!((a.height(mid).unwrap() - h_before).abs() < 0.5);
    }

    #[test]
    fn toggle_mid_close_reopens_without_unmounting() {
        let now = Instant::now();
        let mut a = CollapseAnimator::new(true);
        a.toggle(now, NATURAL);
        let mid = now + half();
        a.toggle(mid, NATURAL);
        assert_eq!(a.phase(), CollapsePhase::Opening);
        assert!(a.is_mounted());

        // The original close deadline passes; the cancelled unmount must not fire.
        a.tick(now + TRANSITION);
        assert!(a.is_mounted());

        a.tick(mid + TRANSITION);
        assert_eq!(a.phase(), CollapsePhase::Open);
    }

    #[test]
    fn toggle_while_measuring_unmounts_immediately() {
        let now = Instant::now();
        let mut a = CollapseAnimator::new(false);
        a.toggle(now, NATURAL);
        a.toggle(now, NATURAL);
        assert_eq!(a.phase(), CollapsePhase::Closed);
        assert!(!a.is_mounted());
    }

    #[test]
    fn measured_height_is_ignored_outside_measuring() {
        let now = Instant::now();
        let mut a = CollapseAnimator::new(true);
        a.provide_measured_height(now, NATURAL);
        assert_eq!(a.phase(), CollapsePhase::Open);
    }

    #[test]
    fn tick_before_deadline_changes_nothing() {
        let now = Instant::now();
        let mut a = CollapseAnimator::new(true);
        a.toggle(now, NATURAL);
        a.tick(now + half());
        assert_eq!(a.phase(), CollapsePhase::Closing);
    }
}
