use crate::app::ScheduleApp;
use crate::engine::{ViewMode, ZOOM_PRESETS};
use crate::model::GroupingMode;
use crate::ui::theme;
use egui::{menu, RichText, Ui};

/// Render the top toolbar / menu bar.
pub fn show_toolbar(app: &mut ScheduleApp, ui: &mut Ui) {
    menu::bar(ui, |ui| {
        ui.menu_button(RichText::new("  File  ").font(theme::font_menu()), |ui| {
            if ui.button("  Open Schedule...").clicked() {
                app.open_schedule();
                ui.close_menu();
            }
            if ui.button("  Save          Ctrl+S").clicked() {
                app.save_schedule();
                ui.close_menu();
            }
            if ui.button("  Save As...").clicked() {
                app.save_schedule_as();
                ui.close_menu();
            }
            ui.separator();
            if ui.button("  Import CSV...").clicked() {
                app.import_csv();
                ui.close_menu();
            }
        });

        ui.menu_button(RichText::new("  View  ").font(theme::font_menu()), |ui| {
            ui.label(RichText::new("Zoom").small().weak());
            for &preset in ZOOM_PRESETS {
                let label = format!("{} px/min", preset);
                if ui
                    .radio(app.config.minute_px == preset, label)
                    .clicked()
                {
                    app.set_zoom(preset);
                    ui.close_menu();
                }
            }
            ui.separator();
            ui.label(RichText::new("Group by").small().weak());
            if ui
                .radio(app.grouping == GroupingMode::Product, "Product")
                .clicked()
            {
                app.set_grouping(GroupingMode::Product);
                ui.close_menu();
            }
            if ui
                .radio(app.grouping == GroupingMode::Resource, "Resource")
                .clicked()
            {
                app.set_grouping(GroupingMode::Resource);
                ui.close_menu();
            }
            ui.separator();
            ui.label(RichText::new("Timeline").small().weak());
            if ui
                .radio(
                    matches!(app.view_mode, ViewMode::Overnight { .. }),
                    "Overnight shift",
                )
                .clicked()
            {
                app.set_view_mode(ViewMode::Overnight {
                    window_start: crate::app::SHIFT_WINDOW_START,
                });
                ui.close_menu();
            }
            if ui
                .radio(matches!(app.view_mode, ViewMode::Paged), "Day pager")
                .clicked()
            {
                app.set_view_mode(ViewMode::Paged);
                ui.close_menu();
            }
        });

        ui.menu_button(RichText::new("  Help  ").font(theme::font_menu()), |ui| {
            if ui.button("About").clicked() {
                app.show_about = true;
                ui.close_menu();
            }
        });

        // Day pager, only meaningful in paged mode.
        if matches!(app.view_mode, ViewMode::Paged) {
            ui.separator();
            if ui.button("◀").on_hover_text("Previous day  PageUp").clicked() {
                app.page_day(-1);
            }
            ui.label(
                RichText::new(format!("Day {} / {}", app.day_index() + 1, app.day_count()))
                    .font(theme::font_menu()),
            );
            if ui.button("▶").on_hover_text("Next day  PageDown").clicked() {
                app.page_day(1);
            }
        }

        // Right side: find box driving scroll-to-row.
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            let resp = ui.add(
                egui::TextEdit::singleline(&mut app.find_query)
                    .hint_text("Find row...")
                    .desired_width(140.0),
            );
            if resp.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                app.find_and_scroll();
            }
            if ui.button("Go").clicked() {
                app.find_and_scroll();
            }
        });
    });
}
