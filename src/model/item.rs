use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Which dimension the board groups rows by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupingMode {
    Product,
    Resource,
}

/// A catalog entry used to resolve display names for resources and tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceRef {
    pub id: Uuid,
    pub name: String,
}

impl ResourceRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
        }
    }
}

/// One scheduled work assignment, as delivered by the data layer.
///
/// The board never mutates these directly; reassignment edits are kept in an
/// [`OverrideStore`] and merged in before each recompute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleItem {
    pub id: Uuid,
    /// Product/order grouping key. `None` lands in the reserved
    /// "unassigned" group.
    pub product_key: Option<String>,
    /// Resource grouping key (work center name).
    pub resource_key: Option<String>,
    pub label: String,
    /// Missing start times are tolerated: the item is laid out as a
    /// zero-duration marker at the scenario epoch instead of being dropped.
    pub start_time: Option<DateTime<Utc>>,
    pub duration_minutes: i64,
    pub resource_id: Option<Uuid>,
    pub tool_id: Option<Uuid>,
}

impl ScheduleItem {
    pub fn new(
        label: impl Into<String>,
        start_time: DateTime<Utc>,
        duration_minutes: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            product_key: None,
            resource_key: None,
            label: label.into(),
            start_time: Some(start_time),
            duration_minutes,
            resource_id: None,
            tool_id: None,
        }
    }

    /// The grouping key under the given mode, if the item has one.
    pub fn group_key(&self, mode: GroupingMode) -> Option<&str> {
        match mode {
            GroupingMode::Product => self.product_key.as_deref(),
            GroupingMode::Resource => self.resource_key.as_deref(),
        }
    }

    /// Duration clamped for layout: non-positive or start-less items become
    /// zero-duration markers so data gaps stay visible.
    pub fn layout_duration(&self) -> i64 {
        if self.start_time.is_none() {
            return 0;
        }
        self.duration_minutes.max(0)
    }
}

/// The scenario epoch: midnight (UTC) of the earliest valid start time.
/// Bar minutes are measured relative to this instant.
pub fn scenario_epoch(items: &[ScheduleItem]) -> Option<DateTime<Utc>> {
    items
        .iter()
        .filter_map(|i| i.start_time)
        .min()
        .map(|t| t.date_naive().and_hms_opt(0, 0, 0).unwrap_or_default().and_utc())
}

/// A local resource/tool reassignment, applied optimistically while the data
/// layer confirms it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemOverride {
    pub resource_id: Option<Uuid>,
    pub tool_id: Option<Uuid>,
}

impl ItemOverride {
    pub fn is_empty(&self) -> bool {
        self.resource_id.is_none() && self.tool_id.is_none()
    }
}

/// The only ways the override store may change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideAction {
    Set(Uuid, ItemOverride),
    Clear(Uuid),
    ClearAll,
}

/// Owned key→value store for pending reassignments, updated only through
/// [`OverrideStore::apply`] and merged into items before each recompute.
#[derive(Debug, Clone, Default)]
pub struct OverrideStore {
    entries: HashMap<Uuid, ItemOverride>,
}

impl OverrideStore {
    pub fn apply(&mut self, action: OverrideAction) {
        match action {
            OverrideAction::Set(id, ov) => {
                if ov.is_empty() {
                    self.entries.remove(&id);
                } else {
                    self.entries.insert(id, ov);
                }
            }
            OverrideAction::Clear(id) => {
                self.entries.remove(&id);
            }
            OverrideAction::ClearAll => self.entries.clear(),
        }
    }

    pub fn get(&self, id: Uuid) -> Option<ItemOverride> {
        self.entries.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return a copy of the item with any pending override folded in.
    pub fn merge(&self, item: &ScheduleItem) -> ScheduleItem {
        let mut merged = item.clone();
        if let Some(ov) = self.entries.get(&item.id) {
            if ov.resource_id.is_some() {
                merged.resource_id = ov.resource_id;
            }
            if ov.tool_id.is_some() {
                merged.tool_id = ov.tool_id;
            }
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item_at(hour: u32) -> ScheduleItem {
        ScheduleItem::new(
            "op",
            Utc.with_ymd_and_hms(2024, 3, 4, hour, 30, 0).unwrap(),
            60,
        )
    }

    #[test]
    fn epoch_is_midnight_of_earliest_start() {
        let items = vec![item_at(9), item_at(6), item_at(14)];
        let epoch = scenario_epoch(&items).unwrap();
        assert_eq!(epoch, Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap());
    }

    #[test]
    fn epoch_ignores_items_without_start() {
        let mut broken = item_at(9);
        broken.start_time = None;
        assert!(scenario_epoch(&[broken.clone()]).is_none());
        let items = vec![broken, item_at(6)];
        let epoch = scenario_epoch(&items).unwrap();
        assert_eq!(epoch, Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap());
    }

    #[test]
    fn layout_duration_clamps_invalid_input() {
        let mut item = item_at(9);
        item.duration_minutes = -15;
        assert_eq!(item.layout_duration(), 0);
        item.duration_minutes = 45;
        item.start_time = None;
        assert_eq!(item.layout_duration(), 0);
    }

    #[test]
    fn override_store_reducer_round_trip() {
        let mut store = OverrideStore::default();
        let id = Uuid::new_v4();
        let res = Uuid::new_v4();
        store.apply(OverrideAction::Set(
            id,
            ItemOverride {
                resource_id: Some(res),
                tool_id: None,
            },
        ));
        assert_eq!(store.get(id).unwrap().resource_id, Some(res));
        store.apply(OverrideAction::Clear(id));
        assert!(store.get(id).is_none());
    }

    #[test]
    fn empty_override_is_not_stored() {
        let mut store = OverrideStore::default();
        let id = Uuid::new_v4();
        store.apply(OverrideAction::Set(id, ItemOverride::default()));
        assert!(store.is_empty());
    }

    #[test]
    fn merge_only_touches_overridden_fields() {
        let mut store = OverrideStore::default();
        let mut item = item_at(9);
        let original_tool = Uuid::new_v4();
        item.tool_id = Some(original_tool);
        let new_res = Uuid::new_v4();
        store.apply(OverrideAction::Set(
            item.id,
            ItemOverride {
                resource_id: Some(new_res),
                tool_id: None,
            },
        ));
        let merged = store.merge(&item);
        assert_eq!(merged.resource_id, Some(new_res));
        assert_eq!(merged.tool_id, Some(original_tool));
    }
}
