use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::config::ViewerConfig;
use crate::data::exporter;
use crate::data::filter::{self, Criterion, FilterSpec, SortSpec};
use crate::data::loader::{self, DataFormat};
use crate::data::model::{Table, Value};
use crate::error::{ApplyError, SortError, TableError};

// ---------------------------------------------------------------------------
// Session phase and status line
// ---------------------------------------------------------------------------

/// `Empty → Loaded → Filtered*`. Exporting never changes the phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Empty,
    Loaded,
    Filtered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Warning,
    Error,
}

/// The message shown to the user after an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub kind: StatusKind,
    pub text: String,
}

impl Status {
    pub fn info(text: impl Into<String>) -> Self {
        Status {
            kind: StatusKind::Info,
            text: text.into(),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Status {
            kind: StatusKind::Warning,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Status {
            kind: StatusKind::Error,
            text: text.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Per-column filter inputs
// ---------------------------------------------------------------------------

/// What the user has typed / ticked for one column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnInput {
    /// Free-text "contains" box.
    pub text: String,
    /// Ticked values of the pick list.
    pub picked: BTreeSet<Value>,
}

impl ColumnInput {
    /// Ticked values take precedence over the text box.
    fn criterion(&self) -> Option<Criterion> {
        let criterion = if self.picked.is_empty() {
            Criterion::contains(&self.text)
        } else {
            Criterion::OneOf(self.picked.clone())
        };
        criterion.is_active().then_some(criterion)
    }

    /// True when text was typed but ticked values override it.
    pub fn text_ignored(&self) -> bool {
        !self.picked.is_empty() && !self.text.trim().is_empty()
    }
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// One interactive session, independent of rendering.
///
/// Holds the loaded table and the current derived view. Every transformation
/// replaces the view by value; a failed action leaves both tables as they were.
pub struct AppState {
    pub config: ViewerConfig,

    /// The table as loaded (None until the user loads a file).
    source: Option<Table>,

    /// Result of the last filter/sort, shown and exported.
    view: Option<Table>,

    phase: Phase,

    /// Criteria behind the current view.
    applied: FilterSpec,

    /// Active sort, re-applied after each filter.
    sort: Option<SortSpec>,

    /// Editable filter widgets, keyed by column name.
    pub inputs: BTreeMap<String, ColumnInput>,

    /// Pick-list values for low-cardinality columns of the source.
    pub options: BTreeMap<String, BTreeSet<Value>>,

    /// Where the current table came from, if it was a file.
    pub source_path: Option<PathBuf>,

    /// Status / error message shown in the UI.
    pub status: Option<Status>,
}

impl Default for AppState {
    fn default() -> Self {
        AppState::new(ViewerConfig::default())
    }
}

impl AppState {
    pub fn new(config: ViewerConfig) -> Self {
        Self {
            config,
            source: None,
            view: None,
            phase: Phase::Empty,
            applied: FilterSpec::default(),
            sort: None,
            inputs: BTreeMap::new(),
            options: BTreeMap::new(),
            source_path: None,
            status: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn source(&self) -> Option<&Table> {
        self.source.as_ref()
    }

    /// The table currently shown to the user.
    pub fn view(&self) -> Option<&Table> {
        self.view.as_ref()
    }

    pub fn applied_filters(&self) -> &FilterSpec {
        &self.applied
    }

    pub fn active_sort(&self) -> Option<&SortSpec> {
        self.sort.as_ref()
    }

    // -- loading --

    /// Load a table from a file; on failure the session is unchanged.
    pub fn load_file(&mut self, path: &Path) -> Result<(), TableError> {
        match loader::load_file(path) {
            Ok(table) => {
                self.set_table(table);
                self.source_path = Some(path.to_path_buf());
                Ok(())
            }
            Err(e) => Err(self.fail_load(e)),
        }
    }

    /// Load a table from raw bytes; on failure the session is unchanged.
    pub fn load_bytes(&mut self, bytes: &[u8], hint: Option<DataFormat>) -> Result<(), TableError> {
        match loader::load(bytes, hint) {
            Ok(table) => {
                self.set_table(table);
                self.source_path = None;
                Ok(())
            }
            Err(e) => Err(self.fail_load(e)),
        }
    }

    fn fail_load(&mut self, e: TableError) -> TableError {
        log::error!("Failed to load file: {e}");
        self.status = Some(Status::error(format!("Failed to load file: {e}")));
        e
    }

    /// Ingest a newly loaded table, reset filters and build the pick lists.
    pub fn set_table(&mut self, table: Table) {
        let limit = self.config.membership_limit;
        self.options = table
            .column_names()
            .filter_map(|col| {
                table
                    .membership_options(col, limit)
                    .map(|vals| (col.to_string(), vals))
            })
            .collect();
        self.inputs = table
            .column_names()
            .map(|col| (col.to_string(), ColumnInput::default()))
            .collect();

        self.status = Some(Status::info(format!(
            "Loaded {} rows, {} columns",
            table.len(),
            table.columns().len()
        )));
        self.view = Some(table.clone());
        self.source = Some(table);
        self.applied = FilterSpec::default();
        self.sort = None;
        self.phase = Phase::Loaded;
    }

    // -- filtering / sorting --

    /// Build a [`FilterSpec`] from the current widget inputs.
    ///
    /// Blank text boxes and empty pick lists are left out. A column with both
    /// a text pattern and picked values uses the pick list.
    pub fn filter_spec_from_inputs(&self) -> FilterSpec {
        let mut spec = FilterSpec::new();
        for (col, input) in &self.inputs {
            if let Some(criterion) = input.criterion() {
                spec.insert(col.clone(), criterion);
            }
        }
        spec
    }

    /// Filter the loaded table (not the current view) with the widget inputs.
    ///
    /// Columns whose typed text was overridden by ticked values are named in
    /// a warning.
    pub fn apply_inputs(&mut self) -> Result<(), ApplyError> {
        let spec = self.filter_spec_from_inputs();
        let ignored: Vec<String> = self
            .inputs
            .iter()
            .filter(|(_, input)| input.text_ignored())
            .map(|(col, _)| col.clone())
            .collect();

        self.apply(spec)?;
        if !ignored.is_empty() {
            log::warn!("Text filter ignored for {}", ignored.join(", "));
            self.status = Some(Status::warning(format!(
                "Text filter ignored for {} (ticked values are used)",
                ignored.join(", ")
            )));
        }
        Ok(())
    }

    /// Filter the loaded table and re-apply the active sort.
    ///
    /// Does nothing before a table is loaded. If sorting fails the filtered
    /// rows are still shown and the sort is dropped.
    pub fn apply(&mut self, spec: FilterSpec) -> Result<(), ApplyError> {
        let Some(source) = &self.source else {
            return Ok(());
        };

        match filter::apply(source, &spec, self.sort.as_ref()) {
            Ok(table) => {
                self.status = Some(if table.is_empty() {
                    Status::info("No matching records found.")
                } else {
                    Status::info(format!("{} of {} rows match", table.len(), source.len()))
                });
                self.view = Some(table);
                self.applied = spec;
                self.phase = Phase::Filtered;
                Ok(())
            }
            Err(ApplyError::Sort { error, filtered }) => {
                self.status = Some(Status::error(format!("Sort error: {error}")));
                self.view = Some(filtered.clone());
                self.applied = spec;
                self.sort = None;
                self.phase = Phase::Filtered;
                Err(ApplyError::Sort { error, filtered })
            }
            Err(e) => {
                log::error!("Failed to apply filters: {e}");
                self.status = Some(Status::error(format!("Failed to apply filters: {e}")));
                Err(e)
            }
        }
    }

    /// Clear all widget inputs and show every row again.
    pub fn clear_filters(&mut self) -> Result<(), ApplyError> {
        for input in self.inputs.values_mut() {
            *input = ColumnInput::default();
        }
        self.apply(FilterSpec::new())
    }

    /// Sort the current view by `column`. Sorting the same column again
    /// flips the direction.
    pub fn sort_by(&mut self, column: &str) -> Result<(), SortError> {
        let Some(view) = &self.view else {
            return Ok(());
        };

        let spec = match &self.sort {
            Some(current) if current.column == column => SortSpec {
                column: column.to_string(),
                direction: current.direction.toggled(),
            },
            _ => SortSpec::ascending(column),
        };

        match filter::sort(view, &spec) {
            Ok(sorted) => {
                self.view = Some(sorted);
                self.sort = Some(spec);
                self.phase = Phase::Filtered;
                Ok(())
            }
            Err(e) => {
                log::warn!("{e}");
                self.status = Some(Status::error(format!("Sort error: {e}")));
                Err(e)
            }
        }
    }

    // -- exporting --

    /// Serialize the current view. Nothing in the session changes except
    /// the status line.
    pub fn export(&mut self, format: DataFormat) -> Result<Vec<u8>, TableError> {
        let result = match &self.view {
            Some(view) => exporter::serialize(view, format),
            None => Err(TableError::EmptyExport),
        };
        if let Err(e) = &result {
            self.report_export_error(e);
        }
        result
    }

    /// Write the current view to `path` (see [`exporter::export_file`]).
    pub fn export_to(&mut self, path: &Path) -> Result<PathBuf, TableError> {
        let result = match &self.view {
            Some(view) => exporter::export_file(view, path),
            None => Err(TableError::EmptyExport),
        };
        match &result {
            Ok(written) => {
                self.status = Some(Status::info(format!("Data exported to {}", written.display())));
            }
            Err(e) => self.report_export_error(e),
        }
        result
    }

    /// Whether exporting would produce a file.
    pub fn can_export(&self) -> bool {
        self.view.as_ref().is_some_and(|v| !v.is_empty())
    }

    fn report_export_error(&mut self, e: &TableError) {
        self.status = Some(match e {
            TableError::EmptyExport => Status::warning("No data to export."),
            other => {
                log::error!("Export failed: {other}");
                Status::error(format!("Export error: {other}"))
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROSTER: &[u8] = b"Name,Grade,School\nAnn,5,North\nBo,3,South\nCy,5,North\n";

    fn loaded() -> AppState {
        let mut state = AppState::default();
        state.load_bytes(ROSTER, None).unwrap();
        state
    }

    fn view_names(state: &AppState) -> Vec<String> {
        state
            .view()
            .unwrap()
            .rows()
            .iter()
            .map(|r| r[0].to_string())
            .collect()
    }

    #[test]
    fn starts_empty() {
        let mut state = AppState::default();
        assert_eq!(state.phase(), Phase::Empty);
        assert!(state.view().is_none());
        assert!(!state.can_export());
        assert!(matches!(state.export(DataFormat::Csv), Err(TableError::EmptyExport)));
        assert_eq!(state.status.as_ref().unwrap().kind, StatusKind::Warning);
    }

    #[test]
    fn load_builds_inputs_and_options() {
        let state = loaded();
        assert_eq!(state.phase(), Phase::Loaded);
        assert_eq!(state.inputs.len(), 3);
        assert_eq!(state.options["School"].len(), 2);
    }

    #[test]
    fn failed_load_keeps_previous_table() {
        let mut state = loaded();
        let before = state.view().cloned();
        assert!(state.load_bytes(b"A,B\n1\n", None).is_err());
        assert_eq!(state.view().cloned(), before);
        assert_eq!(state.phase(), Phase::Loaded);
        assert_eq!(state.status.as_ref().unwrap().kind, StatusKind::Error);
    }

    #[test]
    fn filters_always_start_from_source() {
        let mut state = loaded();
        state.inputs.get_mut("School").unwrap().text = "south".into();
        state.apply_inputs().unwrap();
        assert_eq!(view_names(&state), vec!["Bo"]);

        state.inputs.get_mut("School").unwrap().text = "north".into();
        state.apply_inputs().unwrap();
        assert_eq!(view_names(&state), vec!["Ann", "Cy"]);
        assert_eq!(state.phase(), Phase::Filtered);
    }

    #[test]
    fn picked_values_become_membership_criteria() {
        let mut state = loaded();
        state
            .inputs
            .get_mut("Grade")
            .unwrap()
            .picked
            .insert(Value::from(3.0));
        let spec = state.filter_spec_from_inputs();
        assert_eq!(spec.get("Grade"), Some(&Criterion::one_of([3.0])));
        assert_eq!(spec.active_count(), 1);
    }

    #[test]
    fn picked_values_override_typed_text_with_warning() {
        let mut state = loaded();
        let school = state.inputs.get_mut("School").unwrap();
        school.text = "south".into();
        school.picked.insert(Value::from("North"));

        let spec = state.filter_spec_from_inputs();
        assert_eq!(spec.get("School"), Some(&Criterion::one_of(["North"])));

        state.apply_inputs().unwrap();
        assert_eq!(view_names(&state), vec!["Ann", "Cy"]);
        assert_eq!(state.applied_filters().active_count(), 1);
        let status = state.status.as_ref().unwrap();
        assert_eq!(status.kind, StatusKind::Warning);
        assert!(status.text.contains("School"), "{}", status.text);

        // Without picked values the text applies and no warning is shown.
        state.inputs.get_mut("School").unwrap().picked.clear();
        state.apply_inputs().unwrap();
        assert_eq!(view_names(&state), vec!["Bo"]);
        assert_eq!(state.status.as_ref().unwrap().kind, StatusKind::Info);
    }

    #[test]
    fn no_match_is_a_notice() {
        let mut state = loaded();
        state.inputs.get_mut("Name").unwrap().text = "zed".into();
        state.apply_inputs().unwrap();
        assert!(state.view().unwrap().is_empty());
        assert_eq!(
            state.status,
            Some(Status::info("No matching records found."))
        );
        assert!(!state.can_export());
        assert!(matches!(state.export(DataFormat::Spreadsheet), Err(TableError::EmptyExport)));
    }

    #[test]
    fn sort_toggles_and_survives_refilter() {
        let mut state = loaded();
        state.sort_by("Grade").unwrap();
        assert_eq!(view_names(&state), vec!["Bo", "Ann", "Cy"]);
        state.sort_by("Grade").unwrap();
        assert_eq!(view_names(&state), vec!["Ann", "Cy", "Bo"]);

        state.inputs.get_mut("Name").unwrap().text = "y".into();
        state.apply_inputs().unwrap();
        assert_eq!(view_names(&state), vec!["Cy"]);
        assert_eq!(state.active_sort(), Some(&SortSpec::descending("Grade")));
    }

    #[test]
    fn unknown_sort_column_leaves_view() {
        let mut state = loaded();
        let before = state.view().cloned();
        assert!(state.sort_by("Nope").is_err());
        assert_eq!(state.view().cloned(), before);
        assert!(state.active_sort().is_none());
    }

    #[test]
    fn clear_filters_shows_everything() {
        let mut state = loaded();
        state.inputs.get_mut("Name").unwrap().text = "bo".into();
        state.apply_inputs().unwrap();
        state.clear_filters().unwrap();
        assert_eq!(state.view().unwrap().len(), 3);
        assert!(state.inputs.values().all(|i| i.text.is_empty()));
    }

    #[test]
    fn export_leaves_view_untouched() {
        let mut state = loaded();
        let before = state.view().cloned();
        let bytes = state.export(DataFormat::Csv).unwrap();
        assert!(bytes.starts_with(b"Name,Grade,School\n"));
        assert_eq!(state.view().cloned(), before);
        assert_eq!(state.phase(), Phase::Loaded);
    }
}
