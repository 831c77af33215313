//! Stage 3: combined-source cleaner and reconciler.
//!
//! Works on the merged table plus the entry-event reference workbook. Two
//! passes carry state across rows of each farm's chronologically sorted
//! history: the animal-count forward fill (a fold over the history with the
//! previous row's mortality) and the life-week assignment (a date-interval
//! lookup against the farm's entry events).

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Days, NaiveDate};

use crate::logging::Logger;
use crate::pipeline::merge::{coerce_date, coerce_trimmed_string};
use crate::report::StageSummary;
use crate::table::{csv, xlsx, CellValue, Table};

/// Source header for the initial animal count, renamed to `n_animales`.
const SOURCE_COUNT_COLUMN: &str = "Números incial de animales";

/// Source header for the initial life-week of an entry event.
const ENTRY_WEEK_COLUMN: &str = "Semanas de Vida Inicial";

/// Merged-table columns with no analytical value. Absence is not an error.
const EXTRANEOUS_COLUMNS: &[&str] = &["Fecha de Fin de Producción", "Semanas de Vida Inicial"];

/// Outlier bounds; rows outside any of them are dropped.
const MAX_PIENSO: f64 = 7000.0;
const MAX_TOTALES: f64 = 70000.0;
const MAX_ENTRADA_PIENSO: f64 = 60000.0;

/// A recorded start-of-batch marker for one farm.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryEvent {
    pub fecha: NaiveDate,
    pub initial_week: i64,
    pub initial_count: Option<f64>,
}

/// Load the merged table and coerce the columns the reconciliation needs.
pub fn load_merged(path: &Path) -> Result<Table> {
    let mut table = xlsx::read_table(path)?;
    table.rename_column_if_present(SOURCE_COUNT_COLUMN, "n_animales");
    table.apply("fecha", coerce_date)?;
    table.apply("n_animales", CellValue::to_numeric)?;
    table.apply("bajas", |cell| match cell.to_numeric() {
        CellValue::Null => CellValue::Float(0.0),
        numeric => numeric,
    })?;
    Ok(table)
}

/// Running state of the per-farm forward fill.
#[derive(Debug, Default)]
struct FillState {
    last_known_count: Option<f64>,
    previous_mortality: f64,
}

/// Forward-fill missing animal counts per farm, in ascending date order.
///
/// A known count resets the running value. A missing count on any row but
/// the farm's first becomes `running - previous row's mortality`, and that
/// figure becomes the new running value, so deficits compound across
/// consecutive missing rows. Rows still missing afterwards (no count ever
/// recorded for the farm up to that point) are dropped.
pub fn fill_animal_counts(mut table: Table) -> Result<Table> {
    table.sort_by(&["granja", "fecha"])?;

    let farms: Vec<String> = table
        .column("granja")?
        .iter()
        .map(CellValue::render)
        .collect();
    let mut histories: Vec<(String, Vec<usize>)> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    for (row, farm) in farms.iter().enumerate() {
        match positions.get(farm) {
            Some(&i) => histories[i].1.push(row),
            None => {
                positions.insert(farm.clone(), histories.len());
                histories.push((farm.clone(), vec![row]));
            }
        }
    }

    for (_, rows) in &histories {
        let mut state = FillState::default();
        for (position, &row) in rows.iter().enumerate() {
            let current = table.get(row, "n_animales")?.as_f64();
            match current {
                Some(count) => state.last_known_count = Some(count),
                None => {
                    if let Some(last) = state.last_known_count {
                        if position > 0 {
                            let inferred = last - state.previous_mortality;
                            table.set(row, "n_animales", CellValue::Float(inferred))?;
                            state.last_known_count = Some(inferred);
                        }
                    }
                }
            }
            state.previous_mortality = table.get(row, "bajas")?.as_f64().unwrap_or(0.0);
        }
    }

    let keep: Vec<bool> = table
        .column("n_animales")?
        .iter()
        .map(|c| !c.is_null())
        .collect();
    table.retain_rows(&keep);
    Ok(table)
}

/// Value cleaning: drop extraneous columns, clamp negative consumption and
/// mortality, filter outliers, resort. A row missing any bounded value fails
/// its bound and is dropped.
pub fn clean_values(mut table: Table) -> Result<Table> {
    table.drop_columns_if_present(EXTRANEOUS_COLUMNS);
    table.apply("fecha", coerce_date)?;

    for column in ["agua", "pienso", "bajas"] {
        table.apply(column, CellValue::to_numeric)?;
        table.apply(column, |cell| match cell.as_f64() {
            Some(v) if v < 0.0 => CellValue::Float(0.0),
            _ => cell.clone(),
        })?;
    }
    table.apply("totales", CellValue::to_numeric)?;
    table.apply("entrada de pienso", CellValue::to_numeric)?;

    let keep: Vec<bool> = {
        let pienso = table.column("pienso")?;
        let totales = table.column("totales")?;
        let entrada = table.column("entrada de pienso")?;
        (0..table.height())
            .map(|row| {
                pienso[row].as_f64().is_some_and(|v| v <= MAX_PIENSO)
                    && totales[row].as_f64().is_some_and(|v| v <= MAX_TOTALES)
                    && entrada[row]
                        .as_f64()
                        .is_some_and(|v| (0.0..=MAX_ENTRADA_PIENSO).contains(&v))
            })
            .collect()
    };
    table.retain_rows(&keep);

    table.sort_by(&["granja", "fecha"])?;
    Ok(table)
}

/// Load entry events grouped per farm, sorted by date ascending.
///
/// Events missing their initial life-week or date are excluded from
/// consideration entirely.
pub fn load_entry_events(path: &Path) -> Result<HashMap<String, Vec<EntryEvent>>> {
    let mut table = xlsx::read_table(path)?;
    table.apply("fecha", coerce_date)?;
    table.apply("granja", coerce_trimmed_string)?;

    let farms = table.column("granja")?;
    let dates = table.column("fecha")?;
    let weeks = table.column(ENTRY_WEEK_COLUMN)?;
    let counts = if table.has_column(SOURCE_COUNT_COLUMN) {
        Some(table.column(SOURCE_COUNT_COLUMN)?)
    } else {
        None
    };

    let mut events: HashMap<String, Vec<EntryEvent>> = HashMap::new();
    for row in 0..table.height() {
        let week = match weeks[row].to_numeric().as_f64() {
            Some(w) => w as i64,
            None => continue,
        };
        let fecha = match dates[row].as_date() {
            Some(d) => d,
            None => continue,
        };
        let farm = farms[row].render();
        events.entry(farm).or_default().push(EntryEvent {
            fecha,
            initial_week: week,
            initial_count: counts.and_then(|c| c[row].to_numeric().as_f64()),
        });
    }
    for farm_events in events.values_mut() {
        farm_events.sort_by_key(|e| e.fecha);
    }
    Ok(events)
}

/// Assign `semana_vida` per farm from its entry-event intervals.
///
/// Each entry event except the last covers `[start, next_start)`; the last
/// covers `[start, max date in the farm's history + 1 day)`. A row inside an
/// interval gets `initial_week + floor(days_since_start / 7)`. Rows before
/// the farm's first event, or of farms without events, stay missing.
pub fn assign_life_weeks(
    mut table: Table,
    entries: &HashMap<String, Vec<EntryEvent>>,
) -> Result<Table> {
    let height = table.height();
    table.add_column("semana_vida", vec![CellValue::Null; height])?;

    let farms: Vec<String> = table
        .column("granja")?
        .iter()
        .map(CellValue::render)
        .collect();
    let dates: Vec<Option<NaiveDate>> = table
        .column("fecha")?
        .iter()
        .map(CellValue::as_date)
        .collect();

    let mut farm_rows: HashMap<&str, Vec<usize>> = HashMap::new();
    for (row, farm) in farms.iter().enumerate() {
        farm_rows.entry(farm).or_default().push(row);
    }

    for (farm, rows) in &farm_rows {
        let Some(events) = entries.get(*farm) else {
            continue;
        };
        let Some(last_date) = rows.iter().filter_map(|&r| dates[r]).max() else {
            continue;
        };

        for (i, event) in events.iter().enumerate() {
            let end = match events.get(i + 1) {
                Some(next) => next.fecha,
                None => last_date + Days::new(1),
            };
            for &row in rows.iter() {
                if let Some(fecha) = dates[row] {
                    if fecha >= event.fecha && fecha < end {
                        let week = event.initial_week + (fecha - event.fecha).num_days() / 7;
                        table.set(row, "semana_vida", CellValue::Int(week))?;
                    }
                }
            }
        }
    }
    Ok(table)
}

/// Run the whole stage: reconcile, enrich, write workbook and delimited
/// text with the same row set.
pub fn run(
    merged_path: &Path,
    entries_path: &Path,
    output_xlsx: &Path,
    output_csv: &Path,
    logger: &dyn Logger,
) -> Result<StageSummary> {
    logger.info(&format!("loading merged table {}", merged_path.display()));
    let table = load_merged(merged_path)
        .with_context(|| format!("loading {}", merged_path.display()))?;
    let (rows_in, columns_in) = (table.height(), table.width());

    logger.info("reconciling animal counts");
    let table = fill_animal_counts(table).context("animal-count reconciliation")?;
    let table = clean_values(table).context("value cleaning")?;

    logger.info(&format!("loading entry events {}", entries_path.display()));
    let entries = load_entry_events(entries_path)
        .with_context(|| format!("loading {}", entries_path.display()))?;
    let table = assign_life_weeks(table, &entries).context("life-week assignment")?;

    logger.info(&format!(
        "writing final table to {} and {}",
        output_xlsx.display(),
        output_csv.display()
    ));
    xlsx::write_table(&table, output_xlsx)
        .with_context(|| format!("writing {}", output_xlsx.display()))?;
    csv::write_delimited(&table, output_csv)
        .with_context(|| format!("writing {}", output_csv.display()))?;

    Ok(StageSummary {
        stage: "reconciler",
        rows_in,
        rows_out: table.height(),
        columns_in,
        columns_out: table.width(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> CellValue {
        CellValue::Date(NaiveDate::from_ymd_opt(2024, 1, day).unwrap())
    }

    fn farm(name: &str) -> CellValue {
        CellValue::String(name.to_string())
    }

    #[test]
    fn forward_fill_compounds_mortality() {
        let mut table =
            Table::with_names(vec!["granja".into(), "fecha".into(), "n_animales".into(), "bajas".into()]);
        table.push_row(vec![farm("Norte"), d(1), CellValue::Float(100.0), CellValue::Float(5.0)]);
        table.push_row(vec![farm("Norte"), d(2), CellValue::Null, CellValue::Float(3.0)]);
        table.push_row(vec![farm("Norte"), d(3), CellValue::Null, CellValue::Float(0.0)]);

        let table = fill_animal_counts(table).unwrap();
        let counts: Vec<_> = table.column("n_animales").unwrap().to_vec();
        assert_eq!(
            counts,
            vec![
                CellValue::Float(100.0),
                CellValue::Float(95.0),
                CellValue::Float(92.0),
            ]
        );
    }

    #[test]
    fn rows_without_any_known_count_are_dropped() {
        let mut table =
            Table::with_names(vec!["granja".into(), "fecha".into(), "n_animales".into(), "bajas".into()]);
        // first row of the farm is missing: nothing to fill from
        table.push_row(vec![farm("Sur"), d(1), CellValue::Null, CellValue::Float(2.0)]);
        table.push_row(vec![farm("Sur"), d(2), CellValue::Float(50.0), CellValue::Float(1.0)]);

        let table = fill_animal_counts(table).unwrap();
        assert_eq!(table.height(), 1);
        assert_eq!(table.column("n_animales").unwrap()[0], CellValue::Float(50.0));
    }

    #[test]
    fn life_week_floors_days_by_seven() {
        let mut table = Table::with_names(vec!["granja".into(), "fecha".into()]);
        table.push_row(vec![farm("Norte"), d(10)]);

        let mut entries = HashMap::new();
        entries.insert(
            "Norte".to_string(),
            vec![EntryEvent {
                fecha: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                initial_week: 0,
                initial_count: Some(100.0),
            }],
        );

        let table = assign_life_weeks(table, &entries).unwrap();
        // 9 days after entry: floor(9 / 7) = 1
        assert_eq!(table.column("semana_vida").unwrap()[0], CellValue::Int(1));
    }

    #[test]
    fn later_entry_event_starts_a_new_interval() {
        let mut table = Table::with_names(vec!["granja".into(), "fecha".into()]);
        table.push_row(vec![farm("Norte"), d(5)]);
        table.push_row(vec![farm("Norte"), d(20)]);

        let mut entries = HashMap::new();
        entries.insert(
            "Norte".to_string(),
            vec![
                EntryEvent {
                    fecha: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                    initial_week: 3,
                    initial_count: None,
                },
                EntryEvent {
                    fecha: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
                    initial_week: 0,
                    initial_count: None,
                },
            ],
        );

        let table = assign_life_weeks(table, &entries).unwrap();
        let weeks = table.column("semana_vida").unwrap();
        assert_eq!(weeks[0], CellValue::Int(3)); // 4 days into the first batch
        assert_eq!(weeks[1], CellValue::Int(0)); // 5 days into the second
    }

    #[test]
    fn rows_before_first_event_stay_missing() {
        let mut table = Table::with_names(vec!["granja".into(), "fecha".into()]);
        table.push_row(vec![farm("Norte"), d(1)]);
        table.push_row(vec![farm("Oeste"), d(1)]);

        let mut entries = HashMap::new();
        entries.insert(
            "Norte".to_string(),
            vec![EntryEvent {
                fecha: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
                initial_week: 0,
                initial_count: None,
            }],
        );

        let table = assign_life_weeks(table, &entries).unwrap();
        let weeks = table.column("semana_vida").unwrap();
        assert_eq!(weeks[0], CellValue::Null); // before the farm's first entry
        assert_eq!(weeks[1], CellValue::Null); // farm without entry events
    }
}
