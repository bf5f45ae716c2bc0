use crate::app::ScheduleApp;
use crate::ui::theme;
use egui::{Context, RichText, Window};

/// Render the About dialog.
pub fn show_about_dialog(app: &mut ScheduleApp, ctx: &Context) {
    let mut open = app.show_about;
    Window::new(RichText::new("About").strong().size(14.0))
        .resizable(false)
        .collapsible(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .open(&mut open)
        .show(ctx, |ui| {
            ui.add_space(4.0);
            ui.label(
                RichText::new("Schedule Board")
                    .strong()
                    .size(16.0)
                    .color(theme::TEXT_PRIMARY),
            );
            ui.label(
                RichText::new(format!("Version {}", env!("CARGO_PKG_VERSION")))
                    .size(11.0)
                    .color(theme::TEXT_DIM),
            );
            ui.add_space(6.0);
            ui.label(
                RichText::new(
                    "A production schedule timeline board.\n\
                     Group work by product or resource, page through days,\n\
                     and reassign bars from their context menu.",
                )
                .size(11.5)
                .color(theme::TEXT_SECONDARY),
            );
            ui.add_space(4.0);
        });
    app.show_about = open;
}
