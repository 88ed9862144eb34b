use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;

use rusty_roster::data::exporter::export_file;
use rusty_roster::{Column, ColumnKind, Table, Value};

/// Deterministic SplitMix64 generator; the same seed gives the same roster.
struct SimpleRng(u64);

impl SimpleRng {
    fn new(seed: u64) -> Self {
        SimpleRng(seed)
    }

    fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform-ish index in `0..n`; `n` must be non-zero.
    fn below(&mut self, n: usize) -> usize {
        (self.next_u64() % n as u64) as usize
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[self.below(items.len())]
    }
}

const SCHOOLS: &[(&str, &str)] = &[
    ("Northfield High", "North"),
    ("Riverside Academy", "East"),
    ("Hillcrest Middle", "North"),
    ("Lakeview Elementary", "West"),
    ("St. Mary's", "South"),
];
const FIRST_NAMES: &[&str] = &[
    "Ann", "Bo", "Cy", "Dara", "Eli", "Fatima", "Gus", "Hana", "Ivan", "June", "Kofi", "Lena",
];
const LAST_NAMES: &[&str] = &["Okafor", "Smith", "Nguyen", "García", "Kowalski", "Ito", "Brown"];

fn build_rows(rng: &mut SimpleRng, n: usize) -> Result<Vec<Vec<Value>>> {
    let term_start = NaiveDate::from_ymd_opt(2024, 9, 2).context("invalid term start")?;

    (0..n)
        .map(|i| -> Result<Vec<Value>> {
            let (school, district) = SCHOOLS[rng.below(SCHOOLS.len())];
            let name = format!("{} {}", rng.pick(FIRST_NAMES), rng.pick(LAST_NAMES));
            let grade = 1 + rng.below(12) as i64;
            // Roughly one in ten scores is not recorded yet.
            let score = if rng.below(10) == 0 {
                Value::Missing
            } else {
                Value::Number(40.0 + rng.below(121) as f64 / 2.0)
            };
            let enrolled = term_start
                .checked_add_days(chrono::Days::new(rng.below(30) as u64))
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .context("invalid enrolment date")?;

            Ok(vec![
                Value::Number((1000 + i) as f64),
                Value::text(name),
                Value::text(school),
                Value::text(district),
                Value::from(grade),
                score,
                Value::Date(enrolled),
            ])
        })
        .collect()
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);

    let columns = vec![
        Column::new("Student ID", ColumnKind::Number),
        Column::new("Name", ColumnKind::Text),
        Column::new("School", ColumnKind::Text),
        Column::new("District", ColumnKind::Text),
        Column::new("Grade", ColumnKind::Number),
        Column::new("Score", ColumnKind::Number),
        Column::new("Enrolled", ColumnKind::Date),
    ];
    let rows = build_rows(&mut rng, 250)?;
    let table = Table::new(columns, rows).context("building sample table")?;

    for output in ["schools.csv", "schools.xlsx"] {
        let written = export_file(&table, Path::new(output))
            .with_context(|| format!("writing {output}"))?;
        println!("Wrote {} rows to {}", table.len(), written.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_roster() {
        let a = build_rows(&mut SimpleRng::new(7), 20).unwrap();
        let b = build_rows(&mut SimpleRng::new(7), 20).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, build_rows(&mut SimpleRng::new(8), 20).unwrap());
    }

    #[test]
    fn below_stays_in_range() {
        let mut rng = SimpleRng::new(42);
        assert!((0..1000).all(|_| rng.below(12) < 12));
    }
}
