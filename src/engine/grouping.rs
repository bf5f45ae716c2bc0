use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::model::{GroupingMode, OverrideStore, ScheduleItem};

use super::lanes::assign_lanes;

/// Reserved bucket for items with no grouping key; always sorts last.
pub const UNASSIGNED_KEY: &str = "(unassigned)";
pub const UNASSIGNED_LABEL: &str = "Unassigned";

/// One schedule item's interval as laid out in a task row.
///
/// `start_minute`/`duration_minutes` are relative to the scenario epoch.
/// `lane` is assigned by the lane packer and is a display attribute only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bar {
    pub id: Uuid,
    pub start_minute: i64,
    pub duration_minutes: i64,
    pub lane: usize,
    pub resource_id: Option<Uuid>,
    pub tool_id: Option<Uuid>,
}

impl Bar {
    pub fn end_minute(&self) -> i64 {
        self.start_minute + self.duration_minutes.max(0)
    }
}

/// A rendered board row: a collapsible group header or a leaf task row.
///
/// `row_index` is dense over the currently expanded row list: a collapsed
/// group contributes one index and its children contribute none.
#[derive(Debug, Clone, PartialEq)]
pub enum Row {
    Group {
        key: String,
        label: String,
        child_count: usize,
        is_open: bool,
        row_index: usize,
    },
    Task {
        group_key: String,
        label: String,
        bars: Vec<Bar>,
        lane_count: usize,
        row_index: usize,
    },
}

impl Row {
    pub fn row_index(&self) -> usize {
        match self {
            Row::Group { row_index, .. } | Row::Task { row_index, .. } => *row_index,
        }
    }

    pub fn group_key(&self) -> &str {
        match self {
            Row::Group { key, .. } => key,
            Row::Task { group_key, .. } => group_key,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Row::Group { label, .. } | Row::Task { label, .. } => label,
        }
    }
}

/// Expand/collapse state per group key. Keys never toggled default to open,
/// so only the closed set is stored.
#[derive(Debug, Clone, Default)]
pub struct OpenSet {
    closed: HashSet<String>,
}

impl OpenSet {
    pub fn is_open(&self, key: &str) -> bool {
        !self.closed.contains(key)
    }

    pub fn toggle(&mut self, key: &str) {
        if !self.closed.remove(key) {
            self.closed.insert(key.to_string());
        }
    }

    pub fn set_open(&mut self, key: &str, open: bool) {
        if open {
            self.closed.remove(key);
        } else {
            self.closed.insert(key.to_string());
        }
    }
}

struct TaskBucket {
    label: String,
    bars: Vec<Bar>,
}

struct GroupBucket {
    key: String,
    tasks: Vec<TaskBucket>,
    task_index: HashMap<String, usize>,
}

/// Build the hierarchical row list from a flat item set.
///
/// Items are bucketed by group key in arrival order, sub-bucketed by task
/// label (repeated task types collapse into one row with several bars), then
/// buckets are sorted by label with the unassigned bucket last. Lane packing
/// runs over each task row's full, unclipped bar list so lanes stay stable
/// across day paging.
///
/// Pure: recomputing on the same items and open-set yields identical rows
/// and row indices.
pub fn build_rows(
    items: &[ScheduleItem],
    overrides: &OverrideStore,
    mode: GroupingMode,
    open: &OpenSet,
    epoch: DateTime<Utc>,
) -> Vec<Row> {
    let mut buckets: Vec<GroupBucket> = Vec::new();
    let mut bucket_index: HashMap<String, usize> = HashMap::new();

    for item in items {
        let merged = overrides.merge(item);
        let key = merged
            .group_key(mode)
            .filter(|k| !k.trim().is_empty())
            .unwrap_or(UNASSIGNED_KEY)
            .to_string();

        let bi = *bucket_index.entry(key.clone()).or_insert_with(|| {
            buckets.push(GroupBucket {
                key,
                tasks: Vec::new(),
                task_index: HashMap::new(),
            });
            buckets.len() - 1
        });

        let bucket = &mut buckets[bi];
        let ti = *bucket
            .task_index
            .entry(merged.label.clone())
            .or_insert_with(|| {
                bucket.tasks.push(TaskBucket {
                    label: merged.label.clone(),
                    bars: Vec::new(),
                });
                bucket.tasks.len() - 1
            });

        let start_minute = merged
            .start_time
            .map(|t| (t - epoch).num_minutes())
            .unwrap_or(0);
        bucket.tasks[ti].bars.push(Bar {
            id: merged.id,
            start_minute,
            duration_minutes: merged.layout_duration(),
            lane: 0,
            resource_id: merged.resource_id,
            tool_id: merged.tool_id,
        });
    }

    // Label order, reserved bucket last.
    buckets.sort_by(|a, b| {
        let a_last = a.key == UNASSIGNED_KEY;
        let b_last = b.key == UNASSIGNED_KEY;
        a_last
            .cmp(&b_last)
            .then_with(|| a.key.to_lowercase().cmp(&b.key.to_lowercase()))
    });

    // Emit rows, threading the running index through the fold.
    buckets
        .into_iter()
        .fold((Vec::new(), 0usize), |(mut rows, index), bucket| {
            let is_open = open.is_open(&bucket.key);
            let label = if bucket.key == UNASSIGNED_KEY {
                UNASSIGNED_LABEL.to_string()
            } else {
                bucket.key.clone()
            };
            rows.push(Row::Group {
                key: bucket.key.clone(),
                label,
                child_count: bucket.tasks.len(),
                is_open,
                row_index: index,
            });
            let mut next = index + 1;
            if is_open {
                for task in bucket.tasks {
                    let mut bars = task.bars;
                    let lane_count = assign_lanes(&mut bars);
                    rows.push(Row::Task {
                        group_key: bucket.key.clone(),
                        label: task.label,
                        bars,
                        lane_count,
                        row_index: next,
                    });
                    next += 1;
                }
            }
            (rows, next)
        })
        .0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap()
    }

    fn item(product: &str, label: &str, start_min: i64, duration: i64) -> ScheduleItem {
        let mut it = ScheduleItem::new(label, epoch() + chrono::Duration::minutes(start_min), duration);
        it.product_key = Some(product.to_string());
        it.resource_key = Some(format!("line-{}", product));
        it
    }

    /// 12 items across 3 groups, as in the scenario property.
    fn scenario_items() -> Vec<ScheduleItem> {
        let mut items = Vec::new();
        for (g, tasks) in [("alpha", 4), ("beta", 5), ("gamma", 3)] {
            for t in 0..tasks {
                items.push(item(g, &format!("op-{}", t), t as i64 * 30, 25));
            }
        }
        items
    }

    #[test]
    fn rows_are_indexed_contiguously() {
        let rows = build_rows(
            &scenario_items(),
            &OverrideStore::default(),
            GroupingMode::Product,
            &OpenSet::default(),
            epoch(),
        );
        // 3 group rows + 4 + 5 + 3 task rows.
        assert_eq!(rows.len(), 15);
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(row.row_index(), i);
        }
    }

    #[test]
    fn closed_group_occupies_one_index_and_shifts_later_rows() {
        let items = scenario_items();
        let mut open = OpenSet::default();
        open.set_open("beta", false);
        let rows = build_rows(
            &items,
            &OverrideStore::default(),
            GroupingMode::Product,
            &open,
            epoch(),
        );
        // alpha header + 4 tasks, beta header (closed), gamma header + 3 tasks.
        assert_eq!(rows.len(), 1 + 4 + 1 + 1 + 3);
        // Rows before the closed group keep their indices...
        assert_eq!(rows[0].group_key(), "alpha");
        assert_eq!(rows[5].group_key(), "beta");
        assert_eq!(rows[5].row_index(), 5);
        // ...and rows after shift down by the removed child count (5).
        let gamma_header = rows.iter().find(|r| r.group_key() == "gamma").unwrap();
        assert_eq!(gamma_header.row_index(), 6);
    }

    #[test]
    fn open_set_defaults_open_and_toggles() {
        let mut open = OpenSet::default();
        assert!(open.is_open("anything"));
        open.toggle("beta");
        assert!(!open.is_open("beta"));
        open.toggle("beta");
        assert!(open.is_open("beta"));
    }

    #[test]
    fn regroup_is_idempotent() {
        let items = scenario_items();
        let open = OpenSet::default();
        let a = build_rows(&items, &OverrideStore::default(), GroupingMode::Product, &open, epoch());
        let b = build_rows(&items, &OverrideStore::default(), GroupingMode::Product, &open, epoch());
        assert_eq!(a, b);
    }

    #[test]
    fn repeated_task_labels_collapse_into_one_row() {
        let items = vec![
            item("alpha", "milling", 0, 30),
            item("alpha", "milling", 60, 30),
            item("alpha", "drilling", 30, 15),
        ];
        let rows = build_rows(
            &items,
            &OverrideStore::default(),
            GroupingMode::Product,
            &OpenSet::default(),
            epoch(),
        );
        assert_eq!(rows.len(), 3);
        match &rows[1] {
            Row::Task { label, bars, .. } => {
                assert_eq!(label, "milling");
                assert_eq!(bars.len(), 2);
            }
            _ => panic!("expected task row"),
        }
    }

    #[test]
    fn missing_group_key_buckets_as_unassigned_and_sorts_last() {
        let mut orphan = item("x", "op", 0, 30);
        orphan.product_key = None;
        let items = vec![orphan, item("zeta", "op", 0, 30), item("alpha", "op", 0, 30)];
        let rows = build_rows(
            &items,
            &OverrideStore::default(),
            GroupingMode::Product,
            &OpenSet::default(),
            epoch(),
        );
        let groups: Vec<&str> = rows
            .iter()
            .filter(|r| matches!(r, Row::Group { .. }))
            .map(|r| r.group_key())
            .collect();
        assert_eq!(groups, vec!["alpha", "zeta", UNASSIGNED_KEY]);
        assert_eq!(rows.last().unwrap().group_key(), UNASSIGNED_KEY);
    }

    #[test]
    fn blank_group_key_is_treated_as_unassigned() {
        let mut blank = item("x", "op", 0, 30);
        blank.product_key = Some("  ".to_string());
        let rows = build_rows(
            &[blank],
            &OverrideStore::default(),
            GroupingMode::Product,
            &OpenSet::default(),
            epoch(),
        );
        assert_eq!(rows[0].group_key(), UNASSIGNED_KEY);
        assert_eq!(rows[0].label(), UNASSIGNED_LABEL);
    }

    #[test]
    fn grouping_mode_selects_the_key_dimension() {
        let items = vec![item("alpha", "op", 0, 30), item("beta", "op", 0, 30)];
        let rows = build_rows(
            &items,
            &OverrideStore::default(),
            GroupingMode::Resource,
            &OpenSet::default(),
            epoch(),
        );
        let groups: Vec<&str> = rows
            .iter()
            .filter(|r| matches!(r, Row::Group { .. }))
            .map(|r| r.group_key())
            .collect();
        assert_eq!(groups, vec!["line-alpha", "line-beta"]);
    }

    #[test]
    fn item_without_start_becomes_zero_duration_marker() {
        let mut broken = item("alpha", "op", 0, 45);
        broken.start_time = None;
        let rows = build_rows(
            &[broken],
            &OverrideStore::default(),
            GroupingMode::Product,
            &OpenSet::default(),
            epoch(),
        );
        match &rows[1] {
            Row::Task { bars, .. } => {
                assert_eq!(bars[0].start_minute, 0);
                assert_eq!(bars[0].duration_minutes, 0);
            }
            _ => panic!("expected task row"),
        }
    }

    #[test]
    fn overrides_are_merged_before_grouping() {
        let it = item("alpha", "op", 0, 30);
        let id = it.id;
        let new_res = Uuid::new_v4();
        let mut overrides = OverrideStore::default();
        overrides.apply(crate::model::OverrideAction::Set(
            id,
            crate::model::ItemOverride {
                resource_id: Some(new_res),
                tool_id: None,
            },
        ));
        let rows = build_rows(
            &[it],
            &overrides,
            GroupingMode::Product,
            &OpenSet::default(),
            epoch(),
        );
        match &rows[1] {
            Row::Task { bars, .. } => assert_eq!(bars[0].resource_id, Some(new_res)),
            _ => panic!("expected task row"),
        }
    }

    #[test]
    fn lane_packing_runs_per_task_row() {
        let items = vec![
            item("alpha", "milling", 0, 60),
            item("alpha", "milling", 30, 20),
            item("alpha", "milling", 70, 30),
        ];
        let rows = build_rows(
            &items,
            &OverrideStore::default(),
            GroupingMode::Product,
            &OpenSet::default(),
            epoch(),
        );
        match &rows[1] {
            Row::Task { lane_count, bars, .. } => {
                assert_eq!(*lane_count, 2);
                assert_eq!(bars[2].lane, 0);
            }
            _ => panic!("expected task row"),
        }
    }
}
