use super::grouping::Bar;

/// Pack one row's bars into the minimum number of non-overlapping lanes.
///
/// Greedy interval partitioning: bars are visited in start order (ties keep
/// arrival order) and each takes the first lane whose last bar has already
/// ended. The resulting lane count equals the maximum overlap depth of the
/// interval set, which is the optimum.
///
/// Lane indices are a display attribute recomputed per row on every pass;
/// callers must not persist them across edits.
pub fn assign_lanes(bars: &mut [Bar]) -> usize {
    let mut order: Vec<usize> = (0..bars.len()).collect();
    order.sort_by_key(|&i| bars[i].start_minute);

    let mut lane_end: Vec<i64> = Vec::new();
    for &i in &order {
        let start = bars[i].start_minute;
        // Zero/negative durations still occupy a lane at their start point.
        let end = start + bars[i].duration_minutes.max(0);
        match lane_end.iter().position(|&e| e <= start) {
            Some(lane) => {
                bars[i].lane = lane;
                lane_end[lane] = end;
            }
            None => {
                bars[i].lane = lane_end.len();
                lane_end.push(end);
            }
        }
    }
    lane_end.len()
}
