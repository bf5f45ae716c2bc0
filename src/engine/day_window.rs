pub const MINUTES_PER_DAY: i64 = 1440;

/// How bar intervals are mapped onto the displayed window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    /// Single continuous window modelling an overnight shift; events before
    /// `window_start` minutes-of-day fold into the next calendar day.
    Overnight { window_start: i64 },
    /// One calendar day at a time, with prev/next paging.
    Paged,
}

/// The `[offset, offset+1440)` minute range shown in paged mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub day_index: usize,
}

impl DayWindow {
    pub fn offset_minutes(&self) -> i64 {
        self.day_index as i64 * MINUTES_PER_DAY
    }

    pub fn window_minutes(&self) -> i64 {
        MINUTES_PER_DAY
    }

    /// The day window containing an absolute scenario minute.
    pub fn containing(minute: i64) -> Self {
        Self {
            day_index: minute.max(0).div_euclid(MINUTES_PER_DAY) as usize,
        }
    }
}

/// A bar's interval clipped to one day window. The continuation flags drive
/// purely visual treatment (square vs. rounded bar edges); the underlying
/// bar record is untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClippedBar {
    pub visible_start: i64,
    pub visible_end: i64,
    pub continues_from_previous: bool,
    pub continues_to_next: bool,
}

/// Clip `[start, start+duration)` to the window, or `None` when the bar does
/// not intersect it at all (omitted from that day's render pass entirely).
///
/// Zero-duration bars are kept when their instant falls inside the window so
/// data gaps stay visible as markers; zero-width segments produced by the
/// clipping itself are suppressed.
pub fn clip_to_window(start: i64, duration: i64, window: DayWindow) -> Option<ClippedBar> {
    let offset = window.offset_minutes();
    let window_end = offset + window.window_minutes();

    if duration <= 0 {
        if (offset..window_end).contains(&start) {
            return Some(ClippedBar {
                visible_start: start,
                visible_end: start,
                continues_from_previous: false,
                continues_to_next: false,
            });
        }
        return None;
    }

    let end = start + duration;
    if end <= offset || start >= window_end {
        return None;
    }
    Some(ClippedBar {
        visible_start: start.max(offset),
        visible_end: end.min(window_end),
        continues_from_previous: start < offset,
        continues_to_next: end > window_end,
    })
}

/// Fold a minutes-of-day interval into the overnight display window.
///
/// An event starting before `window_start` belongs to the tail of the shift
/// and moves forward a full day; an end at or before its start crossed
/// midnight and moves forward likewise. The displayed day can therefore run
/// e.g. 06:00 → next-day 08:00 instead of 00:00 → 24:00.
pub fn fold_overnight(start_of_day: i64, end_of_day: i64, window_start: i64) -> (i64, i64) {
    let mut start = start_of_day;
    let mut end = end_of_day;
    if start < window_start {
        start += MINUTES_PER_DAY;
        end += MINUTES_PER_DAY;
    }
    if end <= start {
        end += MINUTES_PER_DAY;
    }
    (start, end)
}

/// Fold an absolute bar interval into the overnight display window.
///
/// Works on minutes-of-day, so bars longer than a day are truncated to at
/// most one folded day; zero-duration markers fold with their start and keep
/// zero width.
pub fn folded_interval(
    start_minute: i64,
    duration_minutes: i64,
    window_start: i64,
) -> (i64, i64) {
    let start_of_day = start_minute.rem_euclid(MINUTES_PER_DAY);
    if duration_minutes <= 0 {
        let s = if start_of_day < window_start {
            start_of_day + MINUTES_PER_DAY
        } else {
            start_of_day
        };
        return (s, s);
    }
    let end_of_day = (start_minute + duration_minutes).rem_euclid(MINUTES_PER_DAY);
    fold_overnight(start_of_day, end_of_day, window_start)
}

/// The minute at which a bar is drawn under the given view mode. Paged mode
/// draws at the raw scenario minute; overnight mode draws at the folded one.
/// Scroll targets must go through this so jumps land where the bar is.
pub fn display_start(start_minute: i64, duration_minutes: i64, mode: ViewMode) -> i64 {
    match mode {
        ViewMode::Overnight { window_start } => {
            folded_interval(start_minute, duration_minutes, window_start).0
        }
        ViewMode::Paged => start_minute,
    }
}
