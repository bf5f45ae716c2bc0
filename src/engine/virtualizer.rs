/// Fixed row-index buffer rendered on each side of the viewport.
pub const DEFAULT_BUFFER_ROWS: usize = 6;

/// Half-open range of row indices that must be materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibleRows {
    pub first: usize,
    pub last: usize,
}

impl VisibleRows {
    pub fn len(&self) -> usize {
        self.last.saturating_sub(self.first)
    }

    pub fn is_empty(&self) -> bool {
        self.last <= self.first
    }

    pub fn iter(&self) -> std::ops::Range<usize> {
        self.first..self.last
    }
}

/// Rows to render for the current scroll position. O(1) regardless of the
/// total row count; all rows still contribute to [`content_height`] so the
/// scrollbar proportions stay correct.
pub fn visible_range(
    scroll_top: f32,
    viewport_height_px: f32,
    row_height_px: f32,
    row_count: usize,
    buffer: usize,
) -> VisibleRows {
    if row_count == 0 || row_height_px <= 0.0 {
        return VisibleRows { first: 0, last: 0 };
    }
    let first_on_screen = (scroll_top.max(0.0) / row_height_px).floor() as usize;
    let first = first_on_screen.saturating_sub(buffer).min(row_count);
    let span = (viewport_height_px.max(0.0) / row_height_px).ceil() as usize + 2 * buffer;
    let last = (first + span).min(row_count);
    VisibleRows { first, last }
}

/// Total scrollable height.
pub fn content_height(row_count: usize, row_height_px: f32) -> f32 {
    row_count as f32 * row_height_px
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn covers_every_row_intersecting_the_viewport() {
        let row_h = 28.0;
        let rows = 500;
        for scroll in (0..14000).step_by(37) {
            let scroll_top = scroll as f32;
            let viewport = 600.0;
            let vis = visible_range(scroll_top, viewport, row_h, rows, DEFAULT_BUFFER_ROWS);
            for index in 0..rows {
                let top = index as f32 * row_h;
                let bottom = top + row_h;
                if bottom > scroll_top && top < scroll_top + viewport {
                    assert!(
                        vis.iter().contains(&index),
                        "row {} missing at scroll {}",
                        index,
                        scroll_top
                    );
                }
            }
        }
    }

    #[test]
    fn buffer_extends_both_sides() {
        let vis = visible_range(280.0, 280.0, 28.0, 100, 6);
        assert_eq!(vis.first, 4); // 10 on-screen minus 6 buffer
        assert_eq!(vis.last, 4 + 10 + 12);
    }

    #[test]
    fn clamps_at_list_edges() {
        let vis = visible_range(0.0, 280.0, 28.0, 100, 6);
        assert_eq!(vis.first, 0);
        let vis = visible_range(1e9, 280.0, 28.0, 100, 6);
        assert_eq!(vis.last, 100);
        assert!(vis.first <= vis.last);
    }

    #[test]
    fn short_lists_render_entirely() {
        let vis = visible_range(0.0, 600.0, 28.0, 5, 6);
        assert_eq!((vis.first, vis.last), (0, 5));
    }

    #[test]
    fn empty_list_renders_nothing() {
        let vis = visible_range(100.0, 600.0, 28.0, 0, 6);
        assert!(vis.is_empty());
        assert_eq!(content_height(0, 28.0), 0.0);
    }

    #[test]
    fn content_height_scales_with_row_count() {
        assert_eq!(content_height(100, 28.0), 2800.0);
    }
}
