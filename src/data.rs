use uuid::Uuid;

use crate::model::{ItemOverride, ResourceRef, ScheduleItem};

/// Contract between the board and the schedule data layer.
///
/// The board treats the layer as the owner of all schedule records: edits go
/// through [`ScheduleSource::reassign`] and the board re-reads `items` after
/// every confirmed change.
pub trait ScheduleSource {
    fn items(&self) -> &[ScheduleItem];
    fn resources(&self) -> &[ResourceRef];
    fn tools(&self) -> &[ResourceRef];

    /// Apply a resource/tool reassignment and return the item as the layer
    /// resolved it. An `Err` means the board must roll back its optimistic
    /// override.
    fn reassign(&mut self, item_id: Uuid, change: ItemOverride) -> Result<ScheduleItem, String>;
}

/// In-process data layer: a plain item list plus catalogs.
#[derive(Debug, Default)]
pub struct InMemorySource {
    items: Vec<ScheduleItem>,
    resources: Vec<ResourceRef>,
    tools: Vec<ResourceRef>,
}

impl InMemorySource {
    pub fn new(
        items: Vec<ScheduleItem>,
        resources: Vec<ResourceRef>,
        tools: Vec<ResourceRef>,
    ) -> Self {
        Self {
            items,
            resources,
            tools,
        }
    }

    pub fn replace_items(&mut self, items: Vec<ScheduleItem>) {
        self.items = items;
    }

    pub fn replace_catalogs(&mut self, resources: Vec<ResourceRef>, tools: Vec<ResourceRef>) {
        self.resources = resources;
        self.tools = tools;
    }
}

impl ScheduleSource for InMemorySource {
    fn items(&self) -> &[ScheduleItem] {
        &self.items
    }

    fn resources(&self) -> &[ResourceRef] {
        &self.resources
    }

    fn tools(&self) -> &[ResourceRef] {
        &self.tools
    }

    fn reassign(&mut self, item_id: Uuid, change: ItemOverride) -> Result<ScheduleItem, String> {
        if let Some(res) = change.resource_id {
            if !self.resources.iter().any(|r| r.id == res) {
                return Err(format!("Unknown resource id {}", res));
            }
        }
        if let Some(tool) = change.tool_id {
            if !self.tools.iter().any(|t| t.id == tool) {
                return Err(format!("Unknown tool id {}", tool));
            }
        }
        let resource_key = change
            .resource_id
            .and_then(|res| self.resources.iter().find(|r| r.id == res))
            .map(|r| r.name.clone());
        let item = self
            .items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or_else(|| format!("Unknown schedule item {}", item_id))?;
        if let Some(res) = change.resource_id {
            item.resource_id = Some(res);
            item.resource_key = resource_key;
        }
        if let Some(tool) = change.tool_id {
            item.tool_id = Some(tool);
        }
        Ok(item.clone())
    }
}
