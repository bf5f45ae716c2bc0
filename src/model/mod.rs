pub mod item;

pub use item::{
    scenario_epoch, GroupingMode, ItemOverride, OverrideAction, OverrideStore, ResourceRef,
    ScheduleItem,
};
