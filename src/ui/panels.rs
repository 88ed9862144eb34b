use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};

use rusty_roster::state::{AppState, Status, StatusKind};

// ---------------------------------------------------------------------------
// Left side panel – filter widgets
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("🔎 Filter by any field");
    ui.separator();

    let Some(source) = state.source() else {
        ui.label("No data loaded.");
        return;
    };

    // Clone what we need so we can mutate state inside the loop.
    let columns: Vec<String> = source.column_names().map(str::to_string).collect();
    let options = state.options.clone();

    ui.horizontal(|ui: &mut Ui| {
        if ui.button("Apply Filters").clicked() {
            // Failures are reported through `state.status`.
            let _ = state.apply_inputs();
        }
        if ui.button("Clear").clicked() {
            let _ = state.clear_filters();
        }
    });
    ui.separator();

    let mut submit = false;
    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            for col in &columns {
                let input = state.inputs.entry(col.clone()).or_default();

                let mut header = RichText::new(col.as_str()).strong();
                if !input.text.trim().is_empty() || !input.picked.is_empty() {
                    header = header.color(Color32::LIGHT_GREEN);
                }

                egui::CollapsingHeader::new(header)
                    .id_salt(col)
                    .default_open(false)
                    .show(ui, |ui: &mut Ui| {
                        let response = ui
                            .add_enabled(
                                input.picked.is_empty(),
                                egui::TextEdit::singleline(&mut input.text)
                                    .hint_text("contains…")
                                    .desired_width(f32::INFINITY),
                            )
                            .on_disabled_hover_text("Ticked values are used instead of the text");
                        let submitted =
                            response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));

                        if let Some(values) = options.get(col) {
                            ui.horizontal(|ui: &mut Ui| {
                                if ui.small_button("All").clicked() {
                                    input.picked = values.clone();
                                }
                                if ui.small_button("None").clicked() {
                                    input.picked.clear();
                                }
                                ui.label(format!("{}/{}", input.picked.len(), values.len()));
                            });

                            for val in values {
                                let mut checked = input.picked.contains(val);
                                if ui.checkbox(&mut checked, val.to_string()).changed() {
                                    if checked {
                                        input.picked.insert(val.clone());
                                    } else {
                                        input.picked.remove(val);
                                    }
                                }
                            }
                        }

                        submit |= submitted;
                    });
            }
        });

    if submit {
        let _ = state.apply_inputs();
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("📂 Load Data…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
            if ui.button("💾 Export Filtered Data…").clicked() {
                export_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if let (Some(source), Some(view)) = (state.source(), state.view()) {
            ui.label(format!("{} rows loaded, {} shown", source.len(), view.len()));
            let active = state.applied_filters().active_count();
            if active > 0 {
                ui.label(format!("{active} filter(s) active"));
            }
            ui.separator();
        }

        if let Some(status) = &state.status {
            let color = match status.kind {
                StatusKind::Info => ui.visuals().text_color(),
                StatusKind::Warning => Color32::YELLOW,
                StatusKind::Error => Color32::RED,
            };
            ui.label(RichText::new(&status.text).color(color));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Load data")
        .add_filter("Supported files", &["xlsx", "xlsm", "xlsb", "xls", "ods", "csv"])
        .add_filter("Excel files", &["xlsx", "xlsm", "xlsb", "xls"])
        .add_filter("CSV files", &["csv"])
        .pick_file();

    if let Some(path) = file {
        // Failures are reported through `state.status`.
        let _ = state.load_file(&path);
    }
}

pub fn export_file_dialog(state: &mut AppState) {
    if !state.can_export() {
        state.status = Some(Status::warning("No data to export."));
        return;
    }

    let file = rfd::FileDialog::new()
        .set_title("Export filtered data")
        .set_file_name(state.config.default_export_name.as_str())
        .add_filter("Excel files", &["xlsx"])
        .add_filter("CSV files", &["csv"])
        .save_file();

    if let Some(path) = file {
        let _ = state.export_to(&path);
    }
}
