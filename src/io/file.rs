use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::model::{ResourceRef, ScheduleItem};

/// On-disk snapshot of a schedule: items plus the display catalogs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleFile {
    pub items: Vec<ScheduleItem>,
    #[serde(default)]
    pub resources: Vec<ResourceRef>,
    #[serde(default)]
    pub tools: Vec<ResourceRef>,
}

/// Save a schedule to a JSON file.
pub fn save_schedule(schedule: &ScheduleFile, path: &Path) -> Result<(), String> {
    let json = serde_json::to_string_pretty(schedule).map_err(|e| e.to_string())?;
    std::fs::write(path, json).map_err(|e| e.to_string())
}

/// Load a schedule from a JSON file.
pub fn load_schedule(path: &Path) -> Result<ScheduleFile, String> {
    let json = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    serde_json::from_str(&json).map_err(|e| e.to_string())
}
