use eframe::egui::{self, Align, Layout, RichText, TextStyle, Ui};
use egui_extras::{Column as TableColumn, TableBuilder};

use rusty_roster::data::filter::SortDirection;
use rusty_roster::state::AppState;

// ---------------------------------------------------------------------------
// Data table (central panel)
// ---------------------------------------------------------------------------

/// Render the current view. Clicking a header sorts by that column.
pub fn data_table(ui: &mut Ui, state: &mut AppState) {
    let Some(view) = state.view() else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Load a file to view data  (File → Load Data…)");
        });
        return;
    };

    if view.is_empty() {
        ui.label(RichText::new("No matching records found.").italics());
        ui.separator();
    }

    let sort = state.active_sort().cloned();
    let row_height = TextStyle::Body
        .resolve(ui.style())
        .size
        .max(ui.spacing().interact_size.y);
    let mut clicked: Option<String> = None;

    egui::ScrollArea::horizontal().show(ui, |ui: &mut Ui| {
        TableBuilder::new(ui)
            .striped(true)
            .resizable(true)
            .cell_layout(Layout::left_to_right(Align::Center))
            .columns(
                TableColumn::auto().at_least(80.0).clip(true),
                view.columns().len(),
            )
            .min_scrolled_height(0.0)
            .header(row_height + 4.0, |mut header| {
                for column in view.columns() {
                    header.col(|ui: &mut Ui| {
                        let arrow = match &sort {
                            Some(s) if s.column == column.name => match s.direction {
                                SortDirection::Ascending => " ▲",
                                SortDirection::Descending => " ▼",
                            },
                            _ => "",
                        };
                        let label = RichText::new(format!("{}{arrow}", column.name)).strong();
                        if ui
                            .button(label)
                            .on_hover_text(format!("{} column – click to sort", column.kind))
                            .clicked()
                        {
                            clicked = Some(column.name.clone());
                        }
                    });
                }
            })
            .body(|body| {
                body.rows(row_height, view.len(), |mut row| {
                    let cells = &view.rows()[row.index()];
                    for value in cells {
                        row.col(|ui: &mut Ui| {
                            ui.label(value.to_string());
                        });
                    }
                });
            });
    });

    if let Some(column) = clicked {
        // Failures are reported through `state.status`.
        let _ = state.sort_by(&column);
    }
}
