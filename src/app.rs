use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use crate::data::{InMemorySource, ScheduleSource};
use crate::engine::{
    build_rows, day_window, CollapseAnimator, CollapsePhase, OpenSet, Row, ScrollCoordinator,
    ViewMode,
};
use crate::model::{
    scenario_epoch, GroupingMode, ItemOverride, OverrideAction, OverrideStore, ResourceRef,
    ScheduleItem,
};
use crate::ui::{
    self,
    board::{BoardConfig, BoardView},
};

/// Overnight shift window start: 06:00.
pub const SHIFT_WINDOW_START: i64 = 360;

/// A queued optimistic reassignment awaiting reconciliation with the data
/// layer. Settled one pass after it was first displayed, so the pending
/// tone and status counter are visible before the edit resolves.
struct PendingEdit {
    item_id: Uuid,
    change: ItemOverride,
    displayed: bool,
}

/// Main application state.
pub struct ScheduleApp {
    pub source: InMemorySource,
    pub overrides: OverrideStore,
    pub open_set: OpenSet,
    pub grouping: GroupingMode,
    pub view_mode: ViewMode,
    pub config: BoardConfig,

    // Derived state, rebuilt whenever items/grouping/open-set change.
    rows: Vec<Row>,
    epoch: DateTime<Utc>,
    axis_total: i64,
    total_days: usize,
    rows_dirty: bool,

    pub coordinator: ScrollCoordinator,
    animators: HashMap<String, CollapseAnimator>,
    pub selected_bar: Option<Uuid>,
    pending_edits: Vec<PendingEdit>,

    pub file_path: Option<PathBuf>,
    pub status_message: String,
    pub find_query: String,
    pub show_about: bool,
}

impl ScheduleApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        // Register Phosphor icon font as a fallback so icons render inline with text
        let mut fonts = egui::FontDefinitions::default();
        egui_phosphor::add_to_fonts(&mut fonts, egui_phosphor::Variant::Regular);
        cc.egui_ctx.set_fonts(fonts);

        Self::with_source(Self::sample_schedule())
    }

    fn with_source(source: InMemorySource) -> Self {
        let mut app = Self {
            source,
            overrides: OverrideStore::default(),
            open_set: OpenSet::default(),
            grouping: GroupingMode::Product,
            view_mode: ViewMode::Overnight {
                window_start: SHIFT_WINDOW_START,
            },
            config: BoardConfig::default(),
            rows: Vec::new(),
            epoch: Utc.timestamp_opt(0, 0).single().unwrap_or_default(),
            axis_total: day_window::MINUTES_PER_DAY,
            total_days: 1,
            rows_dirty: true,
            coordinator: ScrollCoordinator::default(),
            animators: HashMap::new(),
            selected_bar: None,
            pending_edits: Vec::new(),
            file_path: None,
            status_message: "Ready".to_string(),
            find_query: String::new(),
            show_about: false,
        };
        app.recompute_rows();
        app
    }

    /// Generate a sample schedule for demonstration.
    fn sample_schedule() -> InMemorySource {
        let line1 = ResourceRef::new("Line 1");
        let line2 = ResourceRef::new("Line 2");
        let line3 = ResourceRef::new("Line 3");
        let jig_a = ResourceRef::new("Jig A");
        let jig_b = ResourceRef::new("Jig B");

        let day0 = Utc
            .with_ymd_and_hms(2024, 3, 4, 0, 0, 0)
            .single()
            .unwrap_or_else(Utc::now);
        let at = |day: i64, hour: i64, minute: i64| {
            day0 + chrono::Duration::minutes(day * 1440 + hour * 60 + minute)
        };

        let mut items = Vec::new();
        let mut push = |product: &str,
                        label: &str,
                        start: Option<DateTime<Utc>>,
                        duration: i64,
                        line: &ResourceRef,
                        jig: Option<&ResourceRef>| {
            items.push(ScheduleItem {
                id: Uuid::new_v4(),
                product_key: Some(product.to_string()),
                resource_key: Some(line.name.clone()),
                label: label.to_string(),
                start_time: start,
                duration_minutes: duration,
                resource_id: Some(line.id),
                tool_id: jig.map(|j| j.id),
            });
        };

        // ── Order A: overlapping ops on day 0, one crossing midnight ────
        push("Order A-1042", "Milling", Some(at(0, 7, 0)), 150, &line1, Some(&jig_a));
        push("Order A-1042", "Milling", Some(at(0, 9, 0)), 90, &line1, Some(&jig_a));
        push("Order A-1042", "Deburring", Some(at(0, 10, 0)), 45, &line2, None);
        push("Order A-1042", "Coating", Some(at(0, 22, 30)), 180, &line2, Some(&jig_b));

        // ── Order B: repeated op labels collapsing into one row ─────────
        push("Order B-2210", "Pressing", Some(at(0, 8, 0)), 60, &line2, None);
        push("Order B-2210", "Pressing", Some(at(0, 9, 30)), 60, &line2, None);
        push("Order B-2210", "Pressing", Some(at(0, 11, 0)), 60, &line2, None);
        push("Order B-2210", "Inspection", Some(at(1, 6, 30)), 40, &line3, None);

        // ── Order C: early-morning work that folds into the shift tail ──
        push("Order C-0077", "Assembly", Some(at(1, 2, 0)), 120, &line3, Some(&jig_b));
        push("Order C-0077", "Packing", Some(at(1, 9, 0)), 75, &line1, None);

        // A data gap: no start time, still shown as a marker.
        push("Order C-0077", "Rework", None, 30, &line3, None);

        // An item nobody assigned yet.
        items.push(ScheduleItem {
            id: Uuid::new_v4(),
            product_key: None,
            resource_key: None,
            label: "Unplanned maintenance".to_string(),
            start_time: Some(at(0, 13, 0)),
            duration_minutes: 90,
            resource_id: None,
            tool_id: None,
        });

        InMemorySource::new(items, vec![line1, line2, line3], vec![jig_a, jig_b])
    }

    // --- Derived state ---

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn mark_dirty(&mut self) {
        self.rows_dirty = true;
    }

    /// Rebuild rows, lanes and axis bounds from the current inputs. Derived
    /// state is replaced wholesale, never patched.
    fn recompute_rows(&mut self) {
        self.epoch = scenario_epoch(self.source.items())
            .unwrap_or_else(|| Utc.timestamp_opt(0, 0).single().unwrap_or_default());
        self.rows = build_rows(
            self.source.items(),
            &self.overrides,
            self.grouping,
            &self.open_set,
            self.epoch,
        );

        let latest_end = self
            .rows
            .iter()
            .filter_map(|r| match r {
                Row::Task { bars, .. } => bars.iter().map(|b| b.end_minute()).max(),
                _ => None,
            })
            .max()
            .unwrap_or(0);
        // A bar ending exactly on midnight must not open an empty day page.
        self.total_days = if latest_end <= 0 {
            1
        } else {
            (latest_end - 1).div_euclid(day_window::MINUTES_PER_DAY) as usize + 1
        };
        self.axis_total = match self.view_mode {
            ViewMode::Overnight { window_start } => {
                ui::board::overnight_span(&self.rows, window_start)
            }
            ViewMode::Paged => day_window::MINUTES_PER_DAY,
        };
        self.rows_dirty = false;
    }

    // --- View state transitions ---

    pub fn set_zoom(&mut self, minute_px: f32) {
        self.config.minute_px = minute_px;
        self.status_message = format!("Zoom: {} px/min", minute_px);
    }

    pub fn set_grouping(&mut self, mode: GroupingMode) {
        if self.grouping != mode {
            self.grouping = mode;
            // Target rows are meaningless under the new grouping.
            self.coordinator.invalidate_target();
            self.mark_dirty();
            self.status_message = match mode {
                GroupingMode::Product => "Grouped by product".to_string(),
                GroupingMode::Resource => "Grouped by resource".to_string(),
            };
        }
    }

    pub fn set_view_mode(&mut self, mode: ViewMode) {
        if self.view_mode != mode {
            self.view_mode = mode;
            self.coordinator.invalidate_target();
            self.mark_dirty();
        }
    }

    pub fn day_index(&self) -> usize {
        self.coordinator.day_index()
    }

    pub fn day_count(&self) -> usize {
        self.total_days
    }

    pub fn page_day(&mut self, delta: i64) {
        let current = self.coordinator.day_index() as i64;
        let next = (current + delta).clamp(0, self.total_days.saturating_sub(1) as i64);
        self.coordinator.set_day(next as usize);
    }

    /// Toggle a group open/closed, driving the collapse animation. Closing is
    /// two-phase: children stay in the row list while the block shrinks and
    /// are unmounted when the animator settles.
    pub fn toggle_group(&mut self, key: &str, now: Instant) {
        let child_count = self
            .rows
            .iter()
            .find_map(|r| match r {
                Row::Group {
                    key: k,
                    child_count,
                    ..
                } if k == key => Some(*child_count),
                _ => None,
            })
            .unwrap_or(0);
        let natural = child_count as f32 * self.config.row_height_px;

        let was_open = self.open_set.is_open(key);
        let closed_now = {
            let anim = self
                .animators
                .entry(key.to_string())
                .or_insert_with(|| CollapseAnimator::new(was_open));
            anim.toggle(now, natural);
            anim.phase() == CollapsePhase::Closed
        };

        if !was_open {
            // Opening mounts the children immediately; the grow follows.
            self.open_set.set_open(key, true);
            self.mark_dirty();
        } else if closed_now {
            // A toggle during measuring unmounts straight away.
            self.open_set.set_open(key, false);
            self.mark_dirty();
        }
    }

    /// Advance collapse animations; unmount children of groups whose close
    /// transition just finished.
    fn tick_animators(&mut self, now: Instant) {
        let mut finished_close: Vec<String> = Vec::new();
        for (key, anim) in self.animators.iter_mut() {
            let was_mounted = anim.is_mounted();
            anim.tick(now);
            if was_mounted && !anim.is_mounted() {
                finished_close.push(key.clone());
            }
        }
        for key in finished_close {
            if self.open_set.is_open(&key) {
                self.open_set.set_open(&key, false);
                self.mark_dirty();
            }
        }
    }

    // --- Edits ---

    /// Apply a reassignment optimistically and queue it for reconciliation.
    /// The override takes effect in the very next recompute.
    pub fn reassign_bar(&mut self, item_id: Uuid, change: ItemOverride) {
        self.overrides.apply(OverrideAction::Set(item_id, change));
        self.pending_edits.push(PendingEdit {
            item_id,
            change,
            displayed: false,
        });
        self.mark_dirty();
    }

    /// Settle queued reassignments against the data layer. Each edit is
    /// reconciled one pass after it was first displayed; a rejection rolls
    /// its override back and the view recovers on the next recompute.
    fn reconcile_pending_edits(&mut self) {
        if self.pending_edits.is_empty() {
            return;
        }
        let mut ready = Vec::new();
        self.pending_edits.retain_mut(|edit| {
            if edit.displayed {
                ready.push((edit.item_id, edit.change));
                false
            } else {
                edit.displayed = true;
                true
            }
        });
        if ready.is_empty() {
            return;
        }
        for (item_id, change) in ready {
            match self.source.reassign(item_id, change) {
                Ok(updated) => {
                    self.overrides.apply(OverrideAction::Clear(item_id));
                    self.status_message = format!("Reassigned '{}'", updated.label);
                }
                Err(e) => {
                    self.overrides.apply(OverrideAction::Clear(item_id));
                    self.status_message = format!("Reassignment rejected: {}", e);
                }
            }
        }
        self.mark_dirty();
    }

    // --- Navigation ---

    /// Jump to the row matching a group key and task label (group rows match
    /// on the key alone). Opens the containing group if needed.
    pub fn scroll_to_row(&mut self, group_key: &str, label: Option<&str>) {
        if !self.open_set.is_open(group_key) {
            self.open_set.set_open(group_key, true);
            self.animators
                .insert(group_key.to_string(), CollapseAnimator::new(true));
            self.recompute_rows();
        } else if self.rows_dirty {
            self.recompute_rows();
        }

        // Target the minute where the current mode draws the bar, not the
        // raw scenario minute (they differ under the overnight fold).
        let mode = self.view_mode;
        let target = self.rows.iter().find_map(|r| match r {
            Row::Task {
                group_key: k,
                label: l,
                bars,
                row_index,
                ..
            } if k == group_key && label.map_or(true, |want| l == want) => Some((
                *row_index,
                bars.iter()
                    .map(|b| day_window::display_start(b.start_minute, b.duration_minutes, mode))
                    .min()
                    .unwrap_or(0),
            )),
            Row::Group { key, row_index, .. } if label.is_none() && key == group_key => {
                Some((*row_index, 0))
            }
            _ => None,
        });

        if let Some((row_index, minute)) = target {
            let paged = matches!(self.view_mode, ViewMode::Paged);
            self.coordinator
                .scroll_to(crate::engine::ScrollTarget { row_index, minute }, paged);
        } else {
            self.status_message = format!("No row found for '{}'", group_key);
        }
    }

    pub fn find_and_scroll(&mut self) {
        let query = self.find_query.trim().to_lowercase();
        if query.is_empty() {
            return;
        }
        if self.rows_dirty {
            self.recompute_rows();
        }
        let hit = self.rows.iter().find_map(|r| match r {
            Row::Task {
                group_key, label, ..
            } if label.to_lowercase().contains(&query) => {
                Some((group_key.clone(), Some(label.clone())))
            }
            Row::Group { key, label, .. } if label.to_lowercase().contains(&query) => {
                Some((key.clone(), None))
            }
            _ => None,
        });
        match hit {
            Some((group_key, label)) => {
                self.scroll_to_row(&group_key, label.as_deref());
                self.status_message = format!("Jumped to '{}'", self.find_query.trim());
            }
            None => {
                self.status_message = format!("No match for '{}'", self.find_query.trim());
            }
        }
    }

    // --- File operations ---

    pub fn open_schedule(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Schedule", &["schedule.json", "json"])
            .pick_file()
        {
            match crate::io::load_schedule(&path) {
                Ok(schedule) => {
                    self.source.replace_items(schedule.items);
                    if !schedule.resources.is_empty() || !schedule.tools.is_empty() {
                        self.source
                            .replace_catalogs(schedule.resources, schedule.tools);
                    }
                    self.file_path = Some(path);
                    self.overrides.apply(OverrideAction::ClearAll);
                    self.open_set = OpenSet::default();
                    self.animators.clear();
                    self.selected_bar = None;
                    self.coordinator.invalidate_target();
                    self.mark_dirty();
                    self.status_message = "Schedule loaded".to_string();
                }
                Err(e) => {
                    self.status_message = format!("Error loading: {}", e);
                }
            }
        }
    }

    pub fn save_schedule(&mut self) {
        if let Some(path) = self.file_path.clone() {
            let file = crate::io::ScheduleFile {
                items: self.source.items().to_vec(),
                resources: self.source.resources().to_vec(),
                tools: self.source.tools().to_vec(),
            };
            match crate::io::save_schedule(&file, &path) {
                Ok(()) => self.status_message = "Schedule saved".to_string(),
                Err(e) => self.status_message = format!("Error saving: {}", e),
            }
        } else {
            self.save_schedule_as();
        }
    }

    pub fn save_schedule_as(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("Schedule", &["schedule.json", "json"])
            .set_file_name("board.schedule.json")
            .save_file()
        {
            self.file_path = Some(path);
            self.save_schedule();
        }
    }

    pub fn import_csv(&mut self) {
        if !self.source.items().is_empty() {
            let confirm = rfd::MessageDialog::new()
                .set_title("Import CSV")
                .set_description("This will replace the current schedule. Continue?")
                .set_buttons(rfd::MessageButtons::YesNo)
                .show();
            if confirm != rfd::MessageDialogResult::Yes {
                return;
            }
        }

        if let Some(path) = rfd::FileDialog::new()
            .add_filter("CSV Files", &["csv", "txt"])
            .pick_file()
        {
            match crate::io::csv_import::import_csv(&path) {
                Ok((items, skipped)) => {
                    let count = items.len();
                    self.source.replace_items(items);
                    self.file_path = None;
                    self.overrides.apply(OverrideAction::ClearAll);
                    self.open_set = OpenSet::default();
                    self.animators.clear();
                    self.selected_bar = None;
                    self.coordinator.invalidate_target();
                    self.mark_dirty();
                    self.status_message = if skipped > 0 {
                        format!("Imported {} items ({} rows skipped)", count, skipped)
                    } else {
                        format!("Imported {} items", count)
                    };
                }
                Err(e) => {
                    self.status_message = format!("CSV import failed: {}", e);
                }
            }
        }
    }
}

impl eframe::App for ScheduleApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ui::theme::apply_theme(ctx);
        let now = Instant::now();

        // Handle keyboard shortcuts outside closures to avoid borrow issues
        let should_save = ctx.input(|i| i.modifiers.ctrl && i.key_pressed(egui::Key::S));
        let page_back = ctx.input(|i| i.key_pressed(egui::Key::PageUp));
        let page_fwd = ctx.input(|i| i.key_pressed(egui::Key::PageDown));
        if should_save {
            self.save_schedule();
        }
        if matches!(self.view_mode, ViewMode::Paged) {
            if page_back {
                self.page_day(-1);
            }
            if page_fwd {
                self.page_day(1);
            }
        }

        self.tick_animators(now);
        self.reconcile_pending_edits();
        if self.rows_dirty {
            self.recompute_rows();
        }

        // Top panel: toolbar
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui::toolbar::show_toolbar(self, ui);
        });

        // Bottom panel: status bar
        egui::TopBottomPanel::bottom("status_bar")
            .exact_height(22.0)
            .frame(
                egui::Frame::default()
                    .fill(ui::theme::BG_HEADER)
                    .inner_margin(egui::Margin::symmetric(10.0, 0.0)),
            )
            .show(ctx, |ui| {
                ui.horizontal_centered(|ui| {
                    ui.label(
                        egui::RichText::new(&self.status_message)
                            .font(ui::theme::font_status())
                            .color(ui::theme::TEXT_SECONDARY),
                    );
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        let dim = |text: String| {
                            egui::RichText::new(text)
                                .size(10.5)
                                .color(ui::theme::TEXT_DIM)
                        };
                        ui.label(dim(format!("Items: {}", self.source.items().len())));
                        ui.label(dim(" · ".to_string()));
                        ui.label(dim(format!("Rows: {}", self.rows.len())));
                        ui.label(dim(" · ".to_string()));
                        ui.label(dim(format!("Zoom: {} px/min", self.config.minute_px)));
                        if !self.overrides.is_empty() {
                            ui.label(dim(" · ".to_string()));
                            ui.label(dim(format!("Pending edits: {}", self.overrides.len())));
                        }
                    });
                });
            });

        // Central panel: the board
        let board_frame = egui::Frame::default()
            .fill(ui::theme::BG_DARK)
            .inner_margin(egui::Margin::ZERO);
        egui::CentralPanel::default()
            .frame(board_frame)
            .show(ctx, |ui| {
                let view = BoardView {
                    rows: &self.rows,
                    resources: self.source.resources(),
                    tools: self.source.tools(),
                    overrides: &self.overrides,
                    config: self.config,
                    mode: self.view_mode,
                    axis_total_minutes: self.axis_total,
                    item_count: self.source.items().len(),
                    now,
                };
                let interaction = ui::board::show_board(
                    view,
                    &mut self.coordinator,
                    &mut self.animators,
                    &mut self.selected_bar,
                    ui,
                );

                if let Some(key) = interaction.toggle_group {
                    self.toggle_group(&key, now);
                }
                if let Some((item_id, change)) = interaction.reassign {
                    self.reassign_bar(item_id, change);
                }
                if let Some(target) = interaction.jump_to {
                    let paged = matches!(self.view_mode, ViewMode::Paged);
                    self.coordinator.scroll_to(target, paged);
                }
            });

        if !self.pending_edits.is_empty() {
            ctx.request_repaint();
        }

        if self.show_about {
            ui::dialogs::show_about_dialog(self, ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::TimeAxis;

    fn app() -> ScheduleApp {
        ScheduleApp::with_source(ScheduleApp::sample_schedule())
    }

    #[test]
    fn reassignment_stays_pending_until_reconciled() {
        let mut app = app();
        let item_id = app.source.items()[0].id;
        let res_id = app.source.resources()[1].id;
        app.reassign_bar(
            item_id,
            ItemOverride {
                resource_id: Some(res_id),
                tool_id: None,
            },
        );
        assert!(!app.overrides.is_empty());

        // First pass only marks the edit as displayed; the pending tone and
        // status counter stay live for that frame.
        app.reconcile_pending_edits();
        assert!(!app.overrides.is_empty());

        // Next pass settles against the data layer.
        app.reconcile_pending_edits();
        assert!(app.overrides.is_empty());
        assert_eq!(app.source.items()[0].resource_id, Some(res_id));
    }

    #[test]
    fn rejected_reassignment_rolls_back() {
        let mut app = app();
        let item_id = app.source.items()[0].id;
        let before = app.source.items()[0].resource_id;
        app.reassign_bar(
            item_id,
            ItemOverride {
                resource_id: Some(Uuid::new_v4()),
                tool_id: None,
            },
        );
        app.reconcile_pending_edits();
        app.reconcile_pending_edits();
        assert!(app.overrides.is_empty());
        assert_eq!(app.source.items()[0].resource_id, before);
        assert!(app.status_message.contains("rejected"));
    }

    #[test]
    fn find_jump_targets_the_folded_overnight_position() {
        let mut app = app();
        // "Inspection" starts day 1 at 06:30 (raw minute 1830); the default
        // overnight window draws it at minute 390 from midnight.
        app.find_query = "Inspection".to_string();
        app.find_and_scroll();
        let off = app
            .coordinator
            .take_ready_target(
                std::time::Instant::now(),
                app.rows().len(),
                28.0,
                TimeAxis::new(4.0),
                SHIFT_WINDOW_START,
            )
            .expect("same-window jump resolves without deferral");
        let expected = (390 - SHIFT_WINDOW_START) as f32 * 4.0
            - crate::engine::scroll::LEADING_MARGIN_PX;
        assert_eq!(off.x, expected);
    }

    #[test]
    fn bar_ending_exactly_at_midnight_adds_no_day_page() {
        let item = ScheduleItem::new(
            "turning",
            Utc.with_ymd_and_hms(2024, 3, 4, 23, 0, 0).unwrap(),
            60,
        );
        let app = ScheduleApp::with_source(InMemorySource::new(vec![item], vec![], vec![]));
        assert_eq!(app.day_count(), 1);
    }

    #[test]
    fn bar_crossing_midnight_pages_to_the_next_day() {
        let item = ScheduleItem::new(
            "turning",
            Utc.with_ymd_and_hms(2024, 3, 4, 23, 0, 0).unwrap(),
            90,
        );
        let app = ScheduleApp::with_source(InMemorySource::new(vec![item], vec![], vec![]));
        assert_eq!(app.day_count(), 2);
    }
}
