/// Zoom presets in pixels per minute, widest first.
pub const ZOOM_PRESETS: &[f32] = &[12.0, 4.0, 2.0];

/// Trailing breathing room appended after the latest bar end.
const TRAILING_PAD_MINUTES: i64 = 60;

/// Continuous minute↔pixel mapping at a fixed scale.
///
/// Both directions are exact at minute granularity: the UI rounds only for
/// cursor/label display, never for bar placement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeAxis {
    pub minute_px: f32,
}

impl TimeAxis {
    pub fn new(minute_px: f32) -> Self {
        Self {
            minute_px: minute_px.max(0.01),
        }
    }

    pub fn to_pixel(&self, minute: i64) -> f32 {
        minute as f32 * self.minute_px
    }

    pub fn to_minute(&self, px: f32) -> i64 {
        (px / self.minute_px).round() as i64
    }
}

/// One mark on the time scale header.
#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub minute: i64,
    pub is_hour: bool,
    pub is_half_hour: bool,
    /// Hour boundaries always carry a label; other ticks render only a mark.
    pub label: Option<String>,
}

/// Generate ticks over `[start, end]` at the given minor step (5/15/30).
/// Labels are clock times of day, so multi-day minutes wrap at midnight.
pub fn ticks(start: i64, end: i64, minor_step: i64) -> impl Iterator<Item = Tick> {
    let step = minor_step.max(1);
    let first = start.div_euclid(step) * step;
    let first = if first < start { first + step } else { first };
    (0..)
        .map(move |n| first + n * step)
        .take_while(move |&m| m <= end)
        .map(|minute| {
            let is_hour = minute.rem_euclid(60) == 0;
            let is_half_hour = minute.rem_euclid(30) == 0 && !is_hour;
            let label = is_hour.then(|| {
                let of_day = minute.rem_euclid(super::day_window::MINUTES_PER_DAY);
                format!("{:02}:{:02}", of_day / 60, of_day % 60)
            });
            Tick {
                minute,
                is_hour,
                is_half_hour,
                label,
            }
        })
}

/// Total axis length for a timeline whose latest bar ends at `latest_end`:
/// the smallest multiple of 60 (for short timelines) or 360 (otherwise) that
/// covers the end plus a 60-minute pad.
pub fn total_minutes(latest_end: i64) -> i64 {
    let padded = latest_end.max(0) + TRAILING_PAD_MINUTES;
    let unit = if padded <= super::day_window::MINUTES_PER_DAY {
        60
    } else {
        360
    };
    padded.div_euclid(unit) * unit + if padded.rem_euclid(unit) == 0 { 0 } else { unit }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_minute_round_trip_at_all_presets() {
        for &scale in ZOOM_PRESETS {
            let axis = TimeAxis::new(scale);
            for m in 0..=2880 {
                assert_eq!(axis.to_minute(axis.to_pixel(m)), m, "scale {}", scale);
            }
        }
    }

    #[test]
    fn hour_ticks_carry_labels() {
        let all: Vec<Tick> = ticks(0, 120, 15).collect();
        assert_eq!(all.len(), 9);
        let hours: Vec<&Tick> = all.iter().filter(|t| t.is_hour).collect();
        assert_eq!(hours.len(), 3);
        assert_eq!(hours[1].label.as_deref(), Some("01:00"));
        assert!(all.iter().filter(|t| !t.is_hour).all(|t| t.label.is_none()));
    }

    #[test]
    fn half_hour_ticks_are_flagged_but_unlabelled() {
        let all: Vec<Tick> = ticks(0, 60, 30).collect();
        let half: Vec<&Tick> = all.iter().filter(|t| t.is_half_hour).collect();
        assert_eq!(half.len(), 1);
        assert_eq!(half[0].minute, 30);
        assert!(half[0].label.is_none());
    }

    #[test]
    fn tick_labels_wrap_at_midnight() {
        let all: Vec<Tick> = ticks(1440, 1500, 30).collect();
        assert_eq!(all[0].label.as_deref(), Some("00:00"));
    }

    #[test]
    fn ticks_respect_range_start() {
        let all: Vec<Tick> = ticks(7, 40, 15).collect();
        assert_eq!(all.first().map(|t| t.minute), Some(15));
        assert_eq!(all.last().map(|t| t.minute), Some(30));
    }

    #[test]
    fn total_minutes_rounds_to_hour_within_a_day() {
        // 600 + 60 pad = 660, already a multiple of 60.
        assert_eq!(total_minutes(600), 660);
        // 605 + 60 = 665 → next hour boundary.
        assert_eq!(total_minutes(605), 720);
    }

    #[test]
    fn total_minutes_rounds_to_six_hours_beyond_a_day() {
        // 1400 + 60 = 1460 → exceeds a day, 360-minute unit.
        assert_eq!(total_minutes(1400), 1800);
        assert_eq!(total_minutes(1380), 1440);
        assert_eq!(total_minutes(4000), 4320);
    }

    #[test]
    fn total_minutes_has_trailing_room() {
        for end in [0, 59, 1439, 2000, 5000] {
            assert!(total_minutes(end) >= end + 60);
        }
    }
}
