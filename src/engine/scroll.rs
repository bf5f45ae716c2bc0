use std::time::{Duration, Instant};

use super::time_axis::TimeAxis;

/// How long a scroll-to target stays highlighted.
pub const HIGHLIGHT_DURATION: Duration = Duration::from_millis(2500);

/// Rows of head-room left above a scroll-to target.
const LEAD_ROWS: f32 = 2.0;

/// Pixels of margin left of a scroll-to target's minute.
pub const LEADING_MARGIN_PX: f32 = 48.0;

/// Single source-of-truth scroll offset. The header mirrors `x`, the row
/// label panel mirrors `y`, the bar canvas owns both; whichever surface the
/// user drags writes here and every other panel reads it back.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScrollOffset {
    pub x: f32,
    pub y: f32,
}

/// A requested jump to a row at a given scenario minute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollTarget {
    pub row_index: usize,
    pub minute: i64,
}

struct Pending {
    target: ScrollTarget,
    /// Frames to wait before applying, so a just-switched day page lays out
    /// before the target offsets are computed.
    defer_frames: u8,
}

struct Highlight {
    row_index: usize,
    expires_at: Instant,
}

/// Keeps the time-scale header, row label panel and bar canvas scrolled in
/// lockstep, and owns day paging and scroll-to-target state.
pub struct ScrollCoordinator {
    offset: ScrollOffset,
    day_index: usize,
    pending: Option<Pending>,
    highlight: Option<Highlight>,
}

impl Default for ScrollCoordinator {
    fn default() -> Self {
        Self {
            offset: ScrollOffset::default(),
            day_index: 0,
            pending: None,
            highlight: None,
        }
    }
}

impl ScrollCoordinator {
    pub fn offset(&self) -> ScrollOffset {
        self.offset
    }

    /// Record the offset reported by the actively scrolled surface.
    pub fn set_offset(&mut self, offset: ScrollOffset) {
        self.offset = offset;
    }

    pub fn day_index(&self) -> usize {
        self.day_index
    }

    /// User-driven day paging. Invalidates any in-flight scroll target: the
    /// target row may not exist on the new page.
    pub fn set_day(&mut self, day_index: usize) {
        if day_index != self.day_index {
            self.day_index = day_index;
            self.pending = None;
        }
    }

    /// Request a jump. When the target minute lies on another day page the
    /// switch happens now and the scroll itself is deferred one frame so the
    /// target row exists in the new layout before offsets are computed.
    pub fn scroll_to(&mut self, target: ScrollTarget, paged: bool) {
        let mut defer_frames = 0;
        if paged {
            let day = super::day_window::DayWindow::containing(target.minute).day_index;
            if day != self.day_index {
                self.day_index = day;
                defer_frames = 1;
            }
        }
        self.pending = Some(Pending {
            target,
            defer_frames,
        });
    }

    /// Drop any in-flight target (grouping mode changed, data refreshed).
    pub fn invalidate_target(&mut self) {
        self.pending = None;
    }

    pub fn has_pending_target(&self) -> bool {
        self.pending.is_some()
    }

    /// Advance the pending target by one frame. Returns the offset to force
    /// onto the canvas once the deferral has elapsed and the target row has
    /// been re-validated against the current row count.
    ///
    /// Applying a target also arms the transient highlight, cancelling any
    /// prior pending clear so rapid jumps do not flicker.
    pub fn take_ready_target(
        &mut self,
        now: Instant,
        row_count: usize,
        row_height_px: f32,
        axis: TimeAxis,
        window_origin_minute: i64,
    ) -> Option<ScrollOffset> {
        let pending = self.pending.as_mut()?;
        if pending.defer_frames > 0 {
            pending.defer_frames -= 1;
            return None;
        }
        let target = self.pending.take()?.target;
        if target.row_index >= row_count {
            return None;
        }
        let y = (target.row_index as f32 - LEAD_ROWS) * row_height_px;
        let x = axis.to_pixel(target.minute - window_origin_minute) - LEADING_MARGIN_PX;
        self.offset = ScrollOffset {
            x: x.max(0.0),
            y: y.max(0.0),
        };
        self.highlight = Some(Highlight {
            row_index: target.row_index,
            expires_at: now + HIGHLIGHT_DURATION,
        });
        Some(self.offset)
    }

    /// The row to highlight, if the highlight window is still open.
    pub fn highlighted_row(&mut self, now: Instant) -> Option<usize> {
        match &self.highlight {
            Some(h) if now < h.expires_at => Some(h.row_index),
            Some(_) => {
                self.highlight = None;
                None
            }
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis() -> TimeAxis {
        TimeAxis::new(4.0)
    }

    #[test]
    fn target_offsets_leave_lead_room() {
        let mut c = ScrollCoordinator::default();
        let now = Instant::now();
        c.scroll_to(
            ScrollTarget {
                row_index: 10,
                minute: 120,
            },
            false,
        );
        let off = c
            .take_ready_target(now, 50, 28.0, axis(), 0)
            .expect("target ready immediately in single-window mode");
        assert_eq!(off.y, (10.0 - 2.0) * 28.0);
        assert_eq!(off.x, 120.0 * 4.0 - LEADING_MARGIN_PX);
    }

    #[test]
    fn offsets_clamp_at_zero() {
        let mut c = ScrollCoordinator::default();
        c.scroll_to(
            ScrollTarget {
                row_index: 1,
                minute: 0,
            },
            false,
        );
        let off = c
            .take_ready_target(Instant::now(), 5, 28.0, axis(), 0)
            .unwrap();
        assert_eq!(off, ScrollOffset { x: 0.0, y: 0.0 });
    }

    #[test]
    fn cross_day_jump_defers_one_frame() {
        let mut c = ScrollCoordinator::default();
        let now = Instant::now();
        c.scroll_to(
            ScrollTarget {
                row_index: 3,
                minute: 1500,
            },
            true,
        );
        assert_eq!(c.day_index(), 1);
        // Frame 1: day just switched, nothing applied yet.
        assert!(c.take_ready_target(now, 50, 28.0, axis(), 1440).is_none());
        assert!(c.has_pending_target());
        // Frame 2: target applies against the new window origin.
        let off = c.take_ready_target(now, 50, 28.0, axis(), 1440).unwrap();
        assert_eq!(off.x, (1500 - 1440) as f32 * 4.0 - LEADING_MARGIN_PX);
    }

    #[test]
    fn same_day_jump_applies_without_deferral() {
        let mut c = ScrollCoordinator::default();
        c.scroll_to(
            ScrollTarget {
                row_index: 3,
                minute: 600,
            },
            true,
        );
        assert!(c
            .take_ready_target(Instant::now(), 50, 28.0, axis(), 0)
            .is_some());
    }

    #[test]
    fn stale_target_row_is_dropped_after_revalidation() {
        let mut c = ScrollCoordinator::default();
        c.scroll_to(
            ScrollTarget {
                row_index: 40,
                minute: 0,
            },
            false,
        );
        // Regroup shrank the row list below the target.
        assert!(c.take_ready_target(Instant::now(), 10, 28.0, axis(), 0).is_none());
        assert!(!c.has_pending_target());
    }

    #[test]
    fn day_change_invalidates_pending_target() {
        let mut c = ScrollCoordinator::default();
        c.scroll_to(
            ScrollTarget {
                row_index: 3,
                minute: 600,
            },
            true,
        );
        c.set_day(2);
        assert!(!c.has_pending_target());
    }

    #[test]
    fn highlight_expires_after_its_window() {
        let mut c = ScrollCoordinator::default();
        let now = Instant::now();
        c.scroll_to(
            ScrollTarget {
                row_index: 4,
                minute: 60,
            },
            false,
        );
        c.take_ready_target(now, 10, 28.0, axis(), 0).unwrap();
        assert_eq!(c.highlighted_row(now), Some(4));
        assert_eq!(
            c.highlighted_row(now + HIGHLIGHT_DURATION + Duration::from_millis(1)),
            None
        );
    }

    #[test]
    fn newer_target_supersedes_highlight_clear() {
        let mut c = ScrollCoordinator::default();
        let now = Instant::now();
        c.scroll_to(
            ScrollTarget {
                row_index: 4,
                minute: 60,
            },
            false,
        );
        c.take_ready_target(now, 10, 28.0, axis(), 0).unwrap();
        // A second jump lands just before the first clear would fire.
        let later = now + HIGHLIGHT_DURATION - Duration::from_millis(10);
        c.scroll_to(
            ScrollTarget {
                row_index: 7,
                minute: 60,
            },
            false,
        );
        c.take_ready_target(later, 10, 28.0, axis(), 0).unwrap();
        // The first clear deadline passes; the new highlight must survive.
        assert_eq!(
            c.highlighted_row(now + HIGHLIGHT_DURATION + Duration::from_millis(1)),
            Some(7)
        );
    }
}
