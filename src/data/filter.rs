use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use super::model::{ColumnKind, Table, Value};
use crate::error::{ApplyError, Result, SortError, TableError};

// ---------------------------------------------------------------------------
// Criteria: what a single column must satisfy
// ---------------------------------------------------------------------------

/// A per-column matching rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Criterion {
    /// Case-insensitive substring of the cell's display text.
    /// A blank pattern imposes no constraint.
    Contains(String),
    /// Exact membership. An empty set imposes no constraint; missing cells
    /// match only if [`Value::Missing`] is in the set.
    OneOf(BTreeSet<Value>),
}

impl Criterion {
    /// Build a substring criterion from raw user input (surrounding
    /// whitespace is ignored).
    pub fn contains(input: &str) -> Self {
        Criterion::Contains(input.trim().to_string())
    }

    pub fn one_of<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Self {
        Criterion::OneOf(values.into_iter().map(Into::into).collect())
    }

    /// Whether this criterion constrains anything at all.
    pub fn is_active(&self) -> bool {
        match self {
            Criterion::Contains(pattern) => !pattern.trim().is_empty(),
            Criterion::OneOf(set) => !set.is_empty(),
        }
    }

    pub fn matches(&self, value: &Value) -> bool {
        Matcher::new(self).map_or(true, |m| m.matches(value))
    }
}

/// A criterion prepared for evaluation over many rows.
enum Matcher<'a> {
    Contains(String),
    OneOf(&'a BTreeSet<Value>),
}

impl<'a> Matcher<'a> {
    fn new(criterion: &'a Criterion) -> Option<Self> {
        if !criterion.is_active() {
            return None;
        }
        Some(match criterion {
            Criterion::Contains(pattern) => Matcher::Contains(pattern.to_lowercase()),
            Criterion::OneOf(set) => Matcher::OneOf(set),
        })
    }

    fn matches(&self, value: &Value) -> bool {
        match self {
            Matcher::Contains(_) if value.is_missing() => false,
            Matcher::Contains(needle) => value.to_string().to_lowercase().contains(needle.as_str()),
            Matcher::OneOf(set) => set.contains(value),
        }
    }
}

// ---------------------------------------------------------------------------
// FilterSpec / SortSpec
// ---------------------------------------------------------------------------

/// Column → criterion. All criteria must hold (logical AND); columns without
/// an entry are unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSpec {
    criteria: BTreeMap<String, Criterion>,
}

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, column: impl Into<String>, criterion: Criterion) -> Self {
        self.insert(column, criterion);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, criterion: Criterion) {
        self.criteria.insert(column.into(), criterion);
    }

    pub fn get(&self, column: &str) -> Option<&Criterion> {
        self.criteria.get(column)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Criterion)> {
        self.criteria.iter().map(|(c, k)| (c.as_str(), k))
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    /// Number of criteria that actually constrain rows.
    pub fn active_count(&self) -> usize {
        self.criteria.values().filter(|c| c.is_active()).count()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

/// The single active sort: one column and a direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub column: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn ascending(column: impl Into<String>) -> Self {
        SortSpec {
            column: column.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(column: impl Into<String>) -> Self {
        SortSpec {
            column: column.into(),
            direction: SortDirection::Descending,
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Return a new table holding the rows (in input order) that pass every
/// active criterion. Zero matches is a normal, empty result.
pub fn filter(table: &Table, spec: &FilterSpec) -> Result<Table> {
    let mut matchers = Vec::new();
    for (column, criterion) in spec.iter() {
        let idx = table
            .column_index(column)
            .ok_or_else(|| TableError::UnknownColumn(column.to_string()))?;
        if let Some(m) = Matcher::new(criterion) {
            matchers.push((idx, m));
        }
    }

    if matchers.is_empty() {
        return Ok(table.clone());
    }

    let rows = table
        .rows()
        .iter()
        .filter(|row| matchers.iter().all(|(idx, m)| m.matches(&row[*idx])))
        .cloned()
        .collect::<Vec<_>>();

    log::debug!(
        "Filter with {} active criteria kept {} of {} rows",
        matchers.len(),
        rows.len(),
        table.len()
    );
    Ok(table.with_rows(rows))
}

/// Return a new table with rows stably reordered by one column.
///
/// Numbers compare numerically, dates chronologically, text lexicographically
/// (case-sensitive). Missing values go last in either direction.
pub fn sort(table: &Table, spec: &SortSpec) -> Result<Table, SortError> {
    let idx = table
        .column_index(&spec.column)
        .ok_or_else(|| SortError::UnknownColumn(spec.column.clone()))?;

    // The load-time kind is a superset; after filtering the remaining rows
    // may well be comparable.
    if table.columns()[idx].kind == ColumnKind::Mixed
        && ColumnKind::infer(table.rows().iter().map(|r| &r[idx])) == ColumnKind::Mixed
    {
        return Err(SortError::MixedTypes {
            column: spec.column.clone(),
        });
    }

    let mut rows = table.rows().to_vec();
    rows.sort_by(|a, b| compare_cells(&a[idx], &b[idx], spec.direction));

    log::debug!("Sorted {} rows by '{}' ({:?})", rows.len(), spec.column, spec.direction);
    Ok(table.with_rows(rows))
}

fn compare_cells(a: &Value, b: &Value, direction: SortDirection) -> Ordering {
    match (a.is_missing(), b.is_missing()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => match direction {
            SortDirection::Ascending => a.cmp(b),
            SortDirection::Descending => b.cmp(a),
        },
    }
}

/// Filter, then optionally sort.
///
/// A sort failure still hands back the filtered rows in
/// [`ApplyError::Sort`].
pub fn apply(
    table: &Table,
    spec: &FilterSpec,
    sort_spec: Option<&SortSpec>,
) -> Result<Table, ApplyError> {
    let filtered = filter(table, spec)?;
    match sort_spec {
        None => Ok(filtered),
        Some(s) => match sort(&filtered, s) {
            Ok(sorted) => Ok(sorted),
            Err(error) => {
                log::warn!("{error}");
                Err(ApplyError::Sort { error, filtered })
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Column;

    fn roster() -> Table {
        Table::from_rows(
            vec!["Name".into(), "Grade".into(), "School".into()],
            vec![
                vec!["Ann".into(), 5i64.into(), "North High".into()],
                vec!["Bo".into(), 3i64.into(), Value::Missing],
                vec!["Cy".into(), 5i64.into(), "south high".into()],
                vec!["Di".into(), Value::Missing, "East".into()],
            ],
        )
        .unwrap()
    }

    fn names(t: &Table) -> Vec<String> {
        t.rows().iter().map(|r| r[0].to_string()).collect()
    }

    #[test]
    fn contains_is_case_insensitive() {
        let spec = FilterSpec::new().with("School", Criterion::contains("HIGH"));
        assert_eq!(names(&filter(&roster(), &spec).unwrap()), vec!["Ann", "Cy"]);
    }

    #[test]
    fn contains_matches_numbers_as_text() {
        let spec = FilterSpec::new().with("Grade", Criterion::contains("5"));
        assert_eq!(names(&filter(&roster(), &spec).unwrap()), vec!["Ann", "Cy"]);
    }

    #[test]
    fn blank_pattern_is_no_constraint() {
        let spec = FilterSpec::new().with("School", Criterion::contains("   "));
        assert_eq!(filter(&roster(), &spec).unwrap(), roster());
        assert_eq!(spec.active_count(), 0);
    }

    #[test]
    fn input_is_trimmed() {
        assert_eq!(Criterion::contains("  bo "), Criterion::Contains("bo".into()));
    }

    #[test]
    fn missing_never_matches_contains() {
        assert!(!Criterion::Contains("x".into()).matches(&Value::Missing));
        let spec = FilterSpec::new().with("School", Criterion::contains("h"));
        assert!(!names(&filter(&roster(), &spec).unwrap()).contains(&"Bo".to_string()));
    }

    #[test]
    fn membership_is_exact() {
        let spec = FilterSpec::new().with("School", Criterion::one_of(["East", "north high"]));
        assert_eq!(names(&filter(&roster(), &spec).unwrap()), vec!["Di"]);
    }

    #[test]
    fn membership_can_select_missing() {
        let spec = FilterSpec::new().with("Grade", Criterion::one_of([Value::Missing]));
        assert_eq!(names(&filter(&roster(), &spec).unwrap()), vec!["Di"]);
    }

    #[test]
    fn empty_membership_is_no_constraint() {
        let spec = FilterSpec::new().with("Grade", Criterion::OneOf(BTreeSet::new()));
        assert_eq!(filter(&roster(), &spec).unwrap().len(), 4);
    }

    #[test]
    fn criteria_are_and_combined() {
        let spec = FilterSpec::new()
            .with("Grade", Criterion::one_of([5.0]))
            .with("Name", Criterion::contains("c"));
        assert_eq!(names(&filter(&roster(), &spec).unwrap()), vec!["Cy"]);
    }

    #[test]
    fn unknown_filter_column_fails() {
        let spec = FilterSpec::new().with("Nope", Criterion::contains("x"));
        assert!(matches!(filter(&roster(), &spec), Err(TableError::UnknownColumn(c)) if c == "Nope"));
    }

    #[test]
    fn missing_sorts_last_both_ways() {
        let asc = sort(&roster(), &SortSpec::ascending("Grade")).unwrap();
        assert_eq!(names(&asc), vec!["Bo", "Ann", "Cy", "Di"]);
        let desc = sort(&roster(), &SortSpec::descending("Grade")).unwrap();
        assert_eq!(names(&desc), vec!["Ann", "Cy", "Bo", "Di"]);
    }

    #[test]
    fn text_sort_is_case_sensitive() {
        let sorted = sort(&roster(), &SortSpec::ascending("School")).unwrap();
        // Uppercase letters order before lowercase ones.
        assert_eq!(names(&sorted), vec!["Di", "Ann", "Cy", "Bo"]);
    }

    #[test]
    fn mixed_column_cannot_be_sorted() {
        let t = Table::new(
            vec![Column::new("Code", ColumnKind::Mixed)],
            vec![vec![1i64.into()], vec!["A".into()]],
        )
        .unwrap();
        let err = sort(&t, &SortSpec::ascending("Code")).unwrap_err();
        assert_eq!(err, SortError::MixedTypes { column: "Code".into() });

        // Once filtered down to numbers only, sorting works.
        let only_numbers = filter(&t, &FilterSpec::new().with("Code", Criterion::one_of([1.0]))).unwrap();
        assert!(sort(&only_numbers, &SortSpec::ascending("Code")).is_ok());
    }

    #[test]
    fn apply_returns_filtered_rows_on_sort_failure() {
        let spec = FilterSpec::new().with("Grade", Criterion::one_of([5.0]));
        match apply(&roster(), &spec, Some(&SortSpec::ascending("Nope"))) {
            Err(ApplyError::Sort { error, filtered }) => {
                assert_eq!(error, SortError::UnknownColumn("Nope".into()));
                assert_eq!(names(&filtered), vec!["Ann", "Cy"]);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn toggling_direction() {
        assert_eq!(SortDirection::Ascending.toggled(), SortDirection::Descending);
        assert_eq!(SortDirection::default(), SortDirection::Ascending);
    }
}
