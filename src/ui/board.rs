use std::collections::HashMap;
use std::time::Instant;

use egui::{Color32, Pos2, Rect, Rounding, Sense, Stroke, Ui, Vec2};
use uuid::Uuid;

use crate::engine::{
    clip_to_window, content_height, day_window, time_axis, visible_range, CollapseAnimator,
    DayWindow, Row, ScrollCoordinator, ScrollOffset, ScrollTarget, TimeAxis, ViewMode,
};
use crate::model::{ItemOverride, OverrideStore, ResourceRef};
use crate::ui::theme::{self, BarTone};

/// Engine configuration supplied by the embedding app.
#[derive(Debug, Clone, Copy)]
pub struct BoardConfig {
    pub minute_px: f32,
    pub row_height_px: f32,
    pub header_height_px: f32,
    pub buffer_rows: usize,
    pub minor_tick_minutes: i64,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            minute_px: 4.0,
            row_height_px: theme::ROW_HEIGHT,
            header_height_px: theme::HEADER_HEIGHT,
            buffer_rows: crate::engine::DEFAULT_BUFFER_ROWS,
            minor_tick_minutes: 15,
        }
    }
}

/// Everything the board needs for one frame.
pub struct BoardView<'a> {
    pub rows: &'a [Row],
    pub resources: &'a [ResourceRef],
    pub tools: &'a [ResourceRef],
    pub overrides: &'a OverrideStore,
    pub config: BoardConfig,
    pub mode: ViewMode,
    /// Axis length in minutes from the window origin (1440 in paged mode).
    pub axis_total_minutes: i64,
    pub item_count: usize,
    pub now: Instant,
}

/// Result details from interactions in the board.
#[derive(Debug, Clone, Default)]
pub struct BoardInteraction {
    pub toggle_group: Option<String>,
    pub reassign: Option<(Uuid, ItemOverride)>,
    pub jump_to: Option<ScrollTarget>,
}

/// A group's child block mid collapse/expand animation.
struct AnimBlock {
    first_child: usize,
    child_count: usize,
    factor: f32,
    shrink_px: f32,
}

/// Axis span for the overnight single-window mode: latest folded bar end,
/// rounded up with trailing room.
pub fn overnight_span(rows: &[Row], window_start: i64) -> i64 {
    let mut latest = 0i64;
    for row in rows {
        if let Row::Task { bars, .. } = row {
            for bar in bars {
                let (_, end) = day_window::folded_interval(
                    bar.start_minute,
                    bar.duration_minutes,
                    window_start,
                );
                latest = latest.max(end - window_start);
            }
        }
    }
    time_axis::total_minutes(latest)
}

/// Render the board: row label panel, time-scale header and bar canvas, all
/// scrolled in lockstep through the coordinator.
pub fn show_board(
    view: BoardView<'_>,
    coordinator: &mut ScrollCoordinator,
    animators: &mut HashMap<String, CollapseAnimator>,
    selected_bar: &mut Option<Uuid>,
    ui: &mut Ui,
) -> BoardInteraction {
    let mut interaction = BoardInteraction::default();
    let config = view.config;
    let axis = TimeAxis::new(config.minute_px);
    let row_h = config.row_height_px;
    let now = view.now;

    let origin_minute = match view.mode {
        ViewMode::Overnight { window_start } => window_start,
        ViewMode::Paged => DayWindow {
            day_index: coordinator.day_index(),
        }
        .offset_minutes(),
    };

    let full = ui.max_rect();
    let header_rect = Rect::from_min_max(
        Pos2::new(full.left() + theme::LABEL_PANEL_WIDTH, full.top()),
        Pos2::new(full.right(), full.top() + config.header_height_px),
    );
    let label_rect = Rect::from_min_max(
        Pos2::new(full.left(), header_rect.bottom()),
        Pos2::new(header_rect.left(), full.bottom()),
    );
    let corner_rect = Rect::from_min_max(full.min, Pos2::new(label_rect.right(), header_rect.bottom()));
    let body_rect = Rect::from_min_max(Pos2::new(header_rect.left(), header_rect.bottom()), full.max);

    // Feed the measuring animators before layout so the grow can start next
    // frame, then collect mid-flight blocks for row positioning.
    for row in view.rows {
        if let Row::Group {
            key, child_count, ..
        } = row
        {
            if let Some(anim) = animators.get_mut(key) {
                anim.provide_measured_height(now, *child_count as f32 * row_h);
            }
        }
    }
    let blocks = collect_anim_blocks(view.rows, animators, now, row_h);
    let total_shrink: f32 = blocks.iter().map(|b| b.shrink_px).sum();
    let animating = !blocks.is_empty();

    let row_y = |index: usize| -> f32 {
        let mut y = index as f32 * row_h;
        for b in &blocks {
            if index >= b.first_child + b.child_count {
                y -= b.shrink_px;
            } else if index >= b.first_child {
                y -= (index - b.first_child) as f32 * row_h * (1.0 - b.factor);
            }
        }
        y
    };
    let row_height_at = |index: usize| -> f32 {
        for b in &blocks {
            if index >= b.first_child && index < b.first_child + b.child_count {
                return row_h * b.factor;
            }
        }
        row_h
    };

    // The pending scroll target is resolved against the current layout; a
    // day-page switch defers it one frame so the new layout exists first.
    let forced = coordinator.take_ready_target(
        now,
        view.rows.len(),
        row_h,
        axis,
        origin_minute,
    );
    if coordinator.has_pending_target() {
        ui.ctx().request_repaint();
    }

    let content_w = axis.to_pixel(view.axis_total_minutes).max(body_rect.width());
    let content_h =
        (content_height(view.rows.len(), row_h) - total_shrink).max(body_rect.height());

    let highlight_row = coordinator.highlighted_row(now);

    // ── Bar canvas ───────────────────────────────────────────────────────
    let mut body_ui = ui.new_child(egui::UiBuilder::new().max_rect(body_rect));
    let mut scroll_area = egui::ScrollArea::both()
        .id_salt("board_body")
        .auto_shrink([false, false]);
    if let Some(offset) = forced {
        scroll_area = scroll_area.scroll_offset(Vec2::new(offset.x, offset.y));
    }
    let output = scroll_area.show_viewport(&mut body_ui, |ui, viewport| {
        let (response, painter) =
            ui.allocate_painter(Vec2::new(content_w, content_h), Sense::click());
        let origin = response.rect.min;
        let mut consumed_click = false;

        painter.rect_filled(response.rect, 0.0, theme::BG_DARK);

        if view.rows.is_empty() {
            draw_empty_state(&painter, response.rect, view.item_count);
            return;
        }

        // Vertical grid over the visible minute range only.
        let first_minute = origin_minute + axis.to_minute(viewport.left().max(0.0));
        let last_minute = origin_minute + axis.to_minute(viewport.right());
        for tick in time_axis::ticks(first_minute, last_minute, config.minor_tick_minutes) {
            let x = origin.x + axis.to_pixel(tick.minute - origin_minute);
            let color = if tick.is_hour {
                theme::GRID_LINE_HOUR
            } else {
                theme::GRID_LINE
            };
            painter.line_segment(
                [
                    Pos2::new(x, origin.y + viewport.top()),
                    Pos2::new(x, origin.y + viewport.bottom()),
                ],
                Stroke::new(if tick.is_hour { 1.0 } else { 0.5 }, color),
            );
        }

        let mut vis = visible_range(
            viewport.top().max(0.0),
            viewport.height(),
            row_h,
            view.rows.len(),
            config.buffer_rows,
        );
        if animating {
            // Shrinking blocks pull later rows up into view.
            let extra = (total_shrink / row_h).ceil() as usize + 1;
            vis.last = (vis.last + extra).min(view.rows.len());
        }

        for index in vis.iter() {
            let row = &view.rows[index];
            let y = origin.y + row_y(index);
            let h = row_height_at(index);
            let row_rect = Rect::from_min_size(
                Pos2::new(origin.x, y),
                Vec2::new(content_w, h),
            );

            match row {
                Row::Group { key, is_open, .. } => {
                    painter.rect_filled(row_rect, 0.0, theme::BG_GROUP_ROW);
                    painter.line_segment(
                        [row_rect.left_bottom(), row_rect.right_bottom()],
                        Stroke::new(1.0, theme::BORDER_SUBTLE),
                    );
                    let resp = ui.interact(
                        row_rect,
                        ui.make_persistent_id(("group-band", key)),
                        Sense::click(),
                    );
                    if resp.clicked() {
                        interaction.toggle_group = Some(key.clone());
                        consumed_click = true;
                    }
                    if resp.hovered() && !*is_open {
                        ui.ctx().set_cursor_icon(egui::CursorIcon::PointingHand);
                    }
                }
                Row::Task {
                    bars, lane_count, label, ..
                } => {
                    if index % 2 == 0 {
                        painter.rect_filled(row_rect, 0.0, theme::BG_PANEL);
                    }
                    painter.line_segment(
                        [row_rect.left_bottom(), row_rect.right_bottom()],
                        Stroke::new(0.5, theme::BORDER_SUBTLE),
                    );
                    let clip = painter.with_clip_rect(row_rect);
                    for bar in bars {
                        let segment = match view.mode {
                            ViewMode::Paged => clip_to_window(
                                bar.start_minute,
                                bar.duration_minutes,
                                DayWindow {
                                    day_index: coordinator.day_index(),
                                },
                            )
                            .map(|c| {
                                (
                                    c.visible_start,
                                    c.visible_end,
                                    c.continues_from_previous,
                                    c.continues_to_next,
                                )
                            }),
                            ViewMode::Overnight { window_start } => {
                                let (s, e) = day_window::folded_interval(
                                    bar.start_minute,
                                    bar.duration_minutes,
                                    window_start,
                                );
                                Some((s, e, false, false))
                            }
                        };
                        let Some((seg_start, seg_end, cont_prev, cont_next)) = segment else {
                            continue;
                        };

                        let x0 = origin.x + axis.to_pixel(seg_start - origin_minute);
                        let x1 = origin.x + axis.to_pixel(seg_end - origin_minute);
                        let width = (x1 - x0).max(theme::MIN_BAR_WIDTH);
                        let lanes = (*lane_count).max(1) as f32;
                        let lane_h = (h - 2.0 * theme::BAR_INSET) / lanes;
                        let bar_rect = Rect::from_min_size(
                            Pos2::new(x0, y + theme::BAR_INSET + bar.lane as f32 * lane_h),
                            Vec2::new(width, (lane_h - 1.0).max(2.0)),
                        );

                        let tone = if bar.duration_minutes <= 0 {
                            BarTone::Missing
                        } else if view.overrides.get(bar.id).is_some() {
                            BarTone::Reassigned
                        } else {
                            BarTone::Scheduled
                        };
                        // Continuation edges render square; full edges rounded.
                        let rounding = Rounding {
                            nw: if cont_prev { 0.0 } else { theme::BAR_ROUNDING },
                            sw: if cont_prev { 0.0 } else { theme::BAR_ROUNDING },
                            ne: if cont_next { 0.0 } else { theme::BAR_ROUNDING },
                            se: if cont_next { 0.0 } else { theme::BAR_ROUNDING },
                        };
                        clip.rect_filled(bar_rect, rounding, theme::bar_fill(tone));
                        let stroke = theme::bar_stroke(tone);
                        if stroke != Stroke::NONE {
                            clip.rect_stroke(bar_rect, rounding, stroke);
                        }
                        if *selected_bar == Some(bar.id) {
                            clip.rect_stroke(
                                bar_rect.expand(1.5),
                                Rounding::same(theme::BAR_ROUNDING + 1.5),
                                Stroke::new(2.0, theme::BORDER_ACCENT),
                            );
                        }
                        if width > 30.0 && bar_rect.height() > 9.0 {
                            let galley = clip.layout_no_wrap(
                                label.clone(),
                                theme::font_bar(),
                                theme::TEXT_ON_BAR,
                            );
                            let text_y = bar_rect.center().y - galley.size().y / 2.0;
                            let text_clip = clip.with_clip_rect(bar_rect);
                            text_clip.galley(
                                Pos2::new(bar_rect.left() + 5.0, text_y),
                                galley,
                                Color32::TRANSPARENT,
                            );
                        }

                        let resp = ui.interact(
                            bar_rect,
                            ui.make_persistent_id(("bar", bar.id)),
                            Sense::click(),
                        );
                        if resp.clicked() {
                            *selected_bar = Some(bar.id);
                            consumed_click = true;
                        }
                        if resp.hovered() {
                            show_bar_tooltip(ui, bar, label, view.resources, view.tools);
                        }
                        resp.context_menu(|ui| {
                            bar_context_menu(
                                ui,
                                bar.id,
                                view.resources,
                                view.tools,
                                &mut interaction,
                            );
                        });
                    }
                }
            }

            if highlight_row == Some(index) {
                painter.rect_filled(row_rect, 0.0, theme::HIGHLIGHT_ROW);
            }
        }

        if response.clicked() && !consumed_click {
            *selected_bar = None;
        }
    });

    // The canvas is the actively scrolled surface; its offset is the single
    // source of truth the header and label panel mirror below.
    coordinator.set_offset(ScrollOffset {
        x: output.state.offset.x,
        y: output.state.offset.y,
    });
    let offset = coordinator.offset();

    draw_header(ui, header_rect, corner_rect, &view, axis, origin_minute, offset, coordinator);
    draw_label_panel(
        ui,
        label_rect,
        &view,
        offset,
        &row_y,
        &row_height_at,
        highlight_row,
        &mut interaction,
    );

    if animating {
        ui.ctx().request_repaint();
    }
    if highlight_row.is_some() {
        ui.ctx().request_repaint_after(std::time::Duration::from_millis(120));
    }

    interaction
}

fn collect_anim_blocks(
    rows: &[Row],
    animators: &mut HashMap<String, CollapseAnimator>,
    now: Instant,
    row_h: f32,
) -> Vec<AnimBlock> {
    if !animators.values().any(|a| a.is_animating()) {
        return Vec::new();
    }
    let mut blocks = Vec::new();
    for row in rows {
        if let Row::Group {
            key,
            child_count,
            is_open,
            row_index,
            ..
        } = row
        {
            if !*is_open || *child_count == 0 {
                continue;
            }
            if let Some(anim) = animators.get(key) {
                if let (true, Some(height)) = (anim.is_animating(), anim.height(now)) {
                    let natural = *child_count as f32 * row_h;
                    let factor = (height / natural).clamp(0.0, 1.0);
                    blocks.push(AnimBlock {
                        first_child: row_index + 1,
                        child_count: *child_count,
                        factor,
                        shrink_px: natural * (1.0 - factor),
                    });
                }
            }
        }
    }
    blocks
}

fn show_bar_tooltip(
    ui: &Ui,
    bar: &crate::engine::Bar,
    label: &str,
    resources: &[ResourceRef],
    tools: &[ResourceRef],
) {
    let name_of = |catalog: &[ResourceRef], id: Option<Uuid>| -> Option<String> {
        id.and_then(|id| catalog.iter().find(|r| r.id == id))
            .map(|r| r.name.clone())
    };
    egui::show_tooltip_at_pointer(
        ui.ctx(),
        ui.layer_id(),
        egui::Id::new(("bar-tip", bar.id)),
        |ui| {
            ui.strong(label);
            if bar.duration_minutes <= 0 {
                ui.label("No valid start/duration, shown as a marker");
            } else {
                ui.label(format!(
                    "{} → {}  ({} min)",
                    clock_label(bar.start_minute),
                    clock_label(bar.end_minute()),
                    bar.duration_minutes
                ));
            }
            if let Some(name) = name_of(resources, bar.resource_id) {
                ui.label(format!("Resource: {}", name));
            }
            if let Some(name) = name_of(tools, bar.tool_id) {
                ui.label(format!("Tool: {}", name));
            }
        },
    );
}

fn bar_context_menu(
    ui: &mut Ui,
    bar_id: Uuid,
    resources: &[ResourceRef],
    tools: &[ResourceRef],
    interaction: &mut BoardInteraction,
) {
    ui.menu_button("Reassign resource", |ui| {
        for res in resources {
            if ui.button(&res.name).clicked() {
                interaction.reassign = Some((
                    bar_id,
                    ItemOverride {
                        resource_id: Some(res.id),
                        tool_id: None,
                    },
                ));
                ui.close_menu();
            }
        }
    });
    ui.menu_button("Reassign tool", |ui| {
        for tool in tools {
            if ui.button(&tool.name).clicked() {
                interaction.reassign = Some((
                    bar_id,
                    ItemOverride {
                        resource_id: None,
                        tool_id: Some(tool.id),
                    },
                ));
                ui.close_menu();
            }
        }
    });
}

#[allow(clippy::too_many_arguments)]
fn draw_header(
    ui: &mut Ui,
    header_rect: Rect,
    corner_rect: Rect,
    view: &BoardView<'_>,
    axis: TimeAxis,
    origin_minute: i64,
    offset: ScrollOffset,
    coordinator: &ScrollCoordinator,
) {
    let painter = ui.painter().with_clip_rect(header_rect);
    painter.rect_filled(header_rect, 0.0, theme::BG_HEADER);
    painter.line_segment(
        [header_rect.left_bottom(), header_rect.right_bottom()],
        Stroke::new(1.0, theme::BORDER_SUBTLE),
    );

    let first_minute = origin_minute + axis.to_minute(offset.x);
    let last_minute = origin_minute + axis.to_minute(offset.x + header_rect.width());
    for tick in time_axis::ticks(first_minute, last_minute, view.config.minor_tick_minutes) {
        let x = header_rect.left() + axis.to_pixel(tick.minute - origin_minute) - offset.x;
        let mark_top = if tick.is_hour {
            header_rect.bottom() - 14.0
        } else if tick.is_half_hour {
            header_rect.bottom() - 9.0
        } else {
            header_rect.bottom() - 5.0
        };
        painter.line_segment(
            [Pos2::new(x, mark_top), Pos2::new(x, header_rect.bottom())],
            Stroke::new(if tick.is_hour { 1.0 } else { 0.5 }, theme::TEXT_DIM),
        );
        if let Some(label) = &tick.label {
            painter.text(
                Pos2::new(x + 3.0, header_rect.bottom() - 20.0),
                egui::Align2::LEFT_CENTER,
                label,
                theme::font_header(),
                theme::TEXT_SECONDARY,
            );
        }
    }

    // Corner cell: current window description.
    let corner = ui.painter().with_clip_rect(corner_rect);
    corner.rect_filled(corner_rect, 0.0, theme::BG_HEADER);
    corner.line_segment(
        [corner_rect.left_bottom(), corner_rect.right_bottom()],
        Stroke::new(1.0, theme::BORDER_SUBTLE),
    );
    let caption = match view.mode {
        ViewMode::Overnight { window_start } => {
            format!("Shift window  {}", clock_label(window_start))
        }
        ViewMode::Paged => format!("Day {}", coordinator.day_index() + 1),
    };
    corner.text(
        Pos2::new(corner_rect.left() + 8.0, corner_rect.center().y),
        egui::Align2::LEFT_CENTER,
        caption,
        theme::font_header(),
        theme::TEXT_PRIMARY,
    );
}

#[allow(clippy::too_many_arguments)]
fn draw_label_panel(
    ui: &mut Ui,
    label_rect: Rect,
    view: &BoardView<'_>,
    offset: ScrollOffset,
    row_y: &dyn Fn(usize) -> f32,
    row_height_at: &dyn Fn(usize) -> f32,
    highlight_row: Option<usize>,
    interaction: &mut BoardInteraction,
) {
    let painter = ui.painter().with_clip_rect(label_rect);
    painter.rect_filled(label_rect, 0.0, theme::BG_PANEL);
    painter.line_segment(
        [label_rect.right_top(), label_rect.right_bottom()],
        Stroke::new(1.0, theme::BORDER_SUBTLE),
    );

    let row_h = view.config.row_height_px;
    let vis = visible_range(
        offset.y,
        label_rect.height(),
        row_h,
        view.rows.len(),
        view.config.buffer_rows,
    );

    for index in vis.iter() {
        let row = &view.rows[index];
        let y = label_rect.top() + row_y(index) - offset.y;
        let h = row_height_at(index);
        if h < 1.0 {
            continue;
        }
        let row_rect = Rect::from_min_size(
            Pos2::new(label_rect.left(), y),
            Vec2::new(label_rect.width(), h),
        );

        match row {
            Row::Group {
                key,
                label,
                child_count,
                is_open,
                ..
            } => {
                painter.rect_filled(row_rect, 0.0, theme::BG_GROUP_ROW);
                let marker = if *is_open { "▼" } else { "▶" };
                painter.text(
                    Pos2::new(row_rect.left() + 6.0, row_rect.center().y),
                    egui::Align2::LEFT_CENTER,
                    marker,
                    theme::font_small(),
                    theme::TEXT_SECONDARY,
                );
                painter.text(
                    Pos2::new(row_rect.left() + 20.0, row_rect.center().y),
                    egui::Align2::LEFT_CENTER,
                    label,
                    theme::font_header(),
                    theme::TEXT_PRIMARY,
                );
                painter.text(
                    Pos2::new(row_rect.right() - 8.0, row_rect.center().y),
                    egui::Align2::RIGHT_CENTER,
                    format!("{}", child_count),
                    theme::font_small(),
                    theme::TEXT_DIM,
                );
                let resp = ui.interact(
                    row_rect,
                    ui.make_persistent_id(("group-label", key)),
                    Sense::click(),
                );
                if resp.clicked() {
                    interaction.toggle_group = Some(key.clone());
                }
            }
            Row::Task {
                label,
                bars,
                row_index,
                ..
            } => {
                if highlight_row == Some(index) {
                    painter.rect_filled(row_rect, 0.0, theme::HIGHLIGHT_ROW);
                }
                painter.text(
                    Pos2::new(row_rect.left() + 24.0, row_rect.center().y),
                    egui::Align2::LEFT_CENTER,
                    label,
                    theme::font_sub(),
                    theme::TEXT_SECONDARY,
                );
                if bars.len() > 1 {
                    painter.text(
                        Pos2::new(row_rect.right() - 8.0, row_rect.center().y),
                        egui::Align2::RIGHT_CENTER,
                        format!("×{}", bars.len()),
                        theme::font_small(),
                        theme::TEXT_DIM,
                    );
                }
                let resp = ui.interact(
                    row_rect,
                    ui.make_persistent_id(("task-label", row_index)),
                    Sense::click(),
                );
                // Clicking a task label jumps the canvas to its first bar,
                // at the minute where the current mode actually draws it.
                if resp.clicked() {
                    let first = bars
                        .iter()
                        .map(|b| {
                            day_window::display_start(
                                b.start_minute,
                                b.duration_minutes,
                                view.mode,
                            )
                        })
                        .min();
                    if let Some(first) = first {
                        interaction.jump_to = Some(ScrollTarget {
                            row_index: *row_index,
                            minute: first,
                        });
                    }
                }
            }
        }
    }
}

fn draw_empty_state(painter: &egui::Painter, rect: Rect, item_count: usize) {
    let (title, hint) = if item_count == 0 {
        (
            "No schedule loaded",
            "Open a schedule file or import a CSV to populate the board",
        )
    } else {
        (
            "Nothing to display",
            "All items fell outside the current grouping; check the grouping mode",
        )
    };
    painter.text(
        rect.center() - Vec2::new(0.0, 10.0),
        egui::Align2::CENTER_CENTER,
        title,
        theme::font_menu(),
        theme::TEXT_SECONDARY,
    );
    painter.text(
        rect.center() + Vec2::new(0.0, 10.0),
        egui::Align2::CENTER_CENTER,
        hint,
        theme::font_sub(),
        theme::TEXT_DIM,
    );
}

fn clock_label(minute: i64) -> String {
    let of_day = minute.rem_euclid(day_window::MINUTES_PER_DAY);
    format!("{:02}:{:02}", of_day / 60, of_day % 60)
}
