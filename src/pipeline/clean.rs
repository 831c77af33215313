//! Stage 1: single-source cleaner.
//!
//! Loads a raw multi-sheet daily-log workbook, standardizes column names from
//! the first sheet's header, concatenates every sheet header-suppressed, and
//! applies the per-column cleaning rules, ending with the derived `no_suelo`
//! column. The cleaning rules are order-dependent: row filters earlier in the
//! chain change what later rules see.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use regex::Regex;

use crate::logging::Logger;
use crate::report::StageSummary;
use crate::table::{xlsx, CellValue, Table};

/// Header aliases applied after trimming and lowercasing.
const HEADER_ALIASES: &[(&str, &str)] = &[("temp 9:00", "temp_9"), ("temp 12.00", "temp_12")];

/// Known junk columns: positional leftovers and a free-text notes column.
/// Their absence is not an error.
const JUNK_COLUMNS: &[&str] = &[
    "unnamed: 19",
    "unnamed: 20",
    "unnamed: 21",
    "unnamed: 22",
    "unnamed: 23",
    "observaciones del dia",
];

/// Auto-fill helper column dropped unconditionally; a workbook without it is
/// structurally wrong.
const WATER_ONLY_COLUMN: &str = "introduce solo agua calculo pienso automático";

/// Sentinel value marking invalid lice-treatment rows.
const LICE_SENTINEL: f64 = 6910.0;

/// Temperature readings above this are sensor noise.
const MAX_TEMP: f64 = 43.0;

/// Derive canonical column names from the first sheet's header row: trim,
/// lowercase, apply the fixed aliases. Empty header cells get positional
/// names so the later junk-column drop can find them.
pub fn standardize_columns(header: &[CellValue]) -> Vec<String> {
    header
        .iter()
        .enumerate()
        .map(|(i, cell)| {
            let mut name = match cell {
                CellValue::Null => format!("unnamed: {}", i),
                other => other.render().trim().to_lowercase(),
            };
            for (from, to) in HEADER_ALIASES {
                name = name.replace(from, to);
            }
            name
        })
        .collect()
}

/// Load every sheet of the workbook header-suppressed under the canonical
/// column names and concatenate them in workbook order. Each sheet's own
/// header row enters the data; `basic_cleaning` removes those artifacts.
pub fn load_source_workbook(path: &Path) -> Result<Table> {
    let sheets = xlsx::read_sheets(path)?;
    let first = sheets.first().ok_or_else(|| {
        crate::table::TableError::EmptyWorkbook {
            path: path.to_path_buf(),
        }
    })?;

    let header = first.rows.first().cloned().unwrap_or_default();
    let names = standardize_columns(&header);

    let mut table = Table::with_names(names);
    for sheet in &sheets {
        for row in &sheet.rows {
            table.push_row(row.clone());
        }
    }
    Ok(table)
}

/// Basic cleaning: remove repeated-header rows, normalize dates, drop blank
/// and junk columns, sort chronologically.
pub fn basic_cleaning(mut table: Table) -> Result<Table> {
    // concatenation artifacts: each sheet's header row shows up as data
    let keep: Vec<bool> = table
        .column("fecha")?
        .iter()
        .map(|c| !matches!(c, CellValue::String(s) if s == "fecha"))
        .collect();
    table.retain_rows(&keep);

    table.apply("fecha", |cell| match cell {
        CellValue::String(s) => match NaiveDate::parse_from_str(s.trim(), "%d-%m-%Y") {
            Ok(d) => CellValue::String(d.format("%Y-%m-%d").to_string()),
            Err(_) => CellValue::Null,
        },
        CellValue::Date(d) => CellValue::String(d.format("%Y-%m-%d").to_string()),
        _ => CellValue::Null,
    })?;
    retain_not_null(&mut table, "fecha")?;

    let blank: Vec<String> = table
        .column_names()
        .iter()
        .filter(|n| n.trim().is_empty())
        .cloned()
        .collect();
    let blank_refs: Vec<&str> = blank.iter().map(String::as_str).collect();
    table.drop_columns_if_present(&blank_refs);

    table.sort_by(&["fecha"])?;
    table.drop_columns_if_present(JUNK_COLUMNS);
    Ok(table)
}

/// Text columns: title-case the farm name, reduce the handler name to a
/// clean first name with `sin asignar` for missing entries.
pub fn clean_text_columns(mut table: Table) -> Result<Table> {
    table.apply("granja", |cell| match cell.as_str() {
        Some(s) => CellValue::String(title_case(s)),
        None => CellValue::Null,
    })?;

    table.apply("granjero", |cell| {
        match cell.as_str().and_then(|s| s.split_whitespace().next()) {
            Some(first) => CellValue::String(title_case(first)),
            None => CellValue::Null,
        }
    })?;
    table.apply("granjero", |cell| {
        if cell.is_null() {
            CellValue::String("sin asignar".to_string())
        } else {
            cell.clone()
        }
    })?;

    let punctuation = Regex::new(r"[^\w\s]").expect("static pattern");
    table.apply("granjero", |cell| match cell.as_str() {
        Some(s) => CellValue::String(punctuation.replace_all(s, "").into_owned()),
        None => cell.clone(),
    })?;
    Ok(table)
}

/// Normalize `corte de pienso` to a boolean.
///
/// This is a membership test in {"si", "no"}, so a literal "no" maps to true;
/// the behavior is kept verbatim from the source system pending product-owner
/// clarification.
pub fn clean_feed_cut_column(mut table: Table) -> Result<Table> {
    table.apply("corte de pienso", |cell| {
        let known = matches!(cell.as_str().map(str::to_lowercase).as_deref(), Some("si") | Some("no"));
        CellValue::Bool(known)
    })?;
    Ok(table)
}

/// Treatment columns: drop the auto-fill helper, remove lice-sentinel rows,
/// normalize the water treatment into a numeric dose, tidy the free-text
/// treatment list.
pub fn clean_treatments(mut table: Table) -> Result<Table> {
    table.drop_column(WATER_ONLY_COLUMN)?;

    let keep: Vec<bool> = table
        .column("tratamiento piojos")?
        .iter()
        .map(|c| c.as_f64() != Some(LICE_SENTINEL))
        .collect();
    table.retain_rows(&keep);

    table.apply("tratamiento agua", |cell| match cell.as_str() {
        Some(s) => {
            let flattened = s.replace('\n', " ");
            match flattened.split_whitespace().next() {
                Some(first) => CellValue::String(first.to_string()),
                None => CellValue::Null,
            }
        }
        None => CellValue::Null,
    })?;

    let keep: Vec<bool> = table
        .column("tratamiento agua")?
        .iter()
        .map(|c| c.as_str() != Some("SI"))
        .collect();
    table.retain_rows(&keep);

    table.apply("tratamiento agua", |cell| {
        if cell.as_str() == Some("NO") {
            CellValue::String("NADA".to_string())
        } else {
            cell.clone()
        }
    })?;
    table.apply("tratamiento agua", CellValue::to_numeric)?;
    table.apply("tratamiento agua", |cell| match cell.as_f64() {
        Some(v) if v < 0.0 => CellValue::Float(0.0),
        _ => cell.clone(),
    })?;

    table.apply("tratamientos", |cell| match cell.as_str() {
        Some(s) => CellValue::String(s.to_lowercase()),
        None => CellValue::Null,
    })?;
    let parenthesized = Regex::new(r"\(\d+\)").expect("static pattern");
    table.apply("tratamientos", |cell| match cell.as_str() {
        Some(s) => CellValue::String(parenthesized.replace_all(s, "").into_owned()),
        None => cell.clone(),
    })?;
    Ok(table)
}

/// Numeric columns: mortality floor, consumption presence, temperature
/// bounds. `temp_9` truncates to integer, `temp_12` rounds.
pub fn clean_numeric_columns(mut table: Table) -> Result<Table> {
    table.apply("bajas", |cell| {
        if cell.is_null() {
            CellValue::Int(0)
        } else {
            cell.clone()
        }
    })?;
    table.apply("bajas", |cell| match cell {
        CellValue::Int(i) => CellValue::Int((*i).max(0)),
        CellValue::Float(f) => CellValue::Int((f.trunc() as i64).max(0)),
        // free-text mortality entries pass through untouched
        other => other.clone(),
    })?;

    let keep: Vec<bool> = table
        .column("agua")?
        .iter()
        .zip(table.column("pienso")?)
        .map(|(agua, pienso)| !agua.is_null() && !pienso.is_null())
        .collect();
    table.retain_rows(&keep);

    table.apply("temp_9", CellValue::to_numeric)?;
    retain_not_null(&mut table, "temp_9")?;
    retain_at_most(&mut table, "temp_9", MAX_TEMP)?;
    table.apply("temp_9", |cell| match cell.as_f64() {
        Some(v) => CellValue::Int(v.trunc() as i64),
        None => CellValue::Int(0),
    })?;

    table.apply("temp_12", CellValue::to_numeric)?;
    retain_not_null(&mut table, "temp_12")?;
    retain_at_most(&mut table, "temp_12", MAX_TEMP)?;
    table.apply("temp_12", |cell| match cell.as_f64() {
        Some(v) => CellValue::Int(v.round_ties_even() as i64),
        None => CellValue::Int(0),
    })?;
    Ok(table)
}

/// Derive `no_suelo = totales - suelo`, positioned right after `suelo`.
///
/// A negative difference falls back to the raw `totales` value (not clamped
/// to zero): a floor count larger than the total means the total is the only
/// trustworthy figure of the two.
pub fn derive_no_suelo(mut table: Table) -> Result<Table> {
    table.apply("totales", CellValue::to_numeric)?;
    table.apply("suelo", |cell| match cell.to_numeric().as_f64() {
        Some(v) => CellValue::Int(v.trunc() as i64),
        None => CellValue::Int(0),
    })?;

    let no_suelo: Vec<CellValue> = table
        .column("totales")?
        .iter()
        .zip(table.column("suelo")?)
        .map(|(totales, suelo)| {
            let total = totales.as_f64().unwrap_or(0.0);
            let floor = suelo.as_f64().unwrap_or(0.0);
            let diff = (total - floor).trunc() as i64;
            if diff < 0 {
                totales.clone()
            } else {
                CellValue::Int(diff)
            }
        })
        .collect();

    table.insert_after("suelo", "no_suelo", no_suelo)?;
    Ok(table)
}

/// Run the whole stage: load, clean, write.
pub fn run(input: &Path, output: &Path, logger: &dyn Logger) -> Result<StageSummary> {
    logger.info(&format!("reading source workbook {}", input.display()));
    let table = load_source_workbook(input)
        .with_context(|| format!("loading {}", input.display()))?;
    let (rows_in, columns_in) = (table.height(), table.width());

    logger.info("cleaning daily-log table");
    let table = basic_cleaning(table).context("basic cleaning")?;
    let table = clean_text_columns(table).context("text columns")?;
    let table = clean_feed_cut_column(table).context("feed-cut column")?;
    let table = clean_treatments(table).context("treatment columns")?;
    let table = clean_numeric_columns(table).context("numeric columns")?;
    let table = derive_no_suelo(table).context("no_suelo derivation")?;

    logger.info(&format!("writing cleaned table to {}", output.display()));
    xlsx::write_table(&table, output)
        .with_context(|| format!("writing {}", output.display()))?;

    Ok(StageSummary {
        stage: "single-source cleaner",
        rows_in,
        rows_out: table.height(),
        columns_in,
        columns_out: table.width(),
    })
}

fn retain_not_null(table: &mut Table, column: &str) -> Result<()> {
    let keep: Vec<bool> = table.column(column)?.iter().map(|c| !c.is_null()).collect();
    table.retain_rows(&keep);
    Ok(())
}

fn retain_at_most(table: &mut Table, column: &str, bound: f64) -> Result<()> {
    let keep: Vec<bool> = table
        .column(column)?
        .iter()
        .map(|c| c.as_f64().is_some_and(|v| v <= bound))
        .collect();
    table.retain_rows(&keep);
    Ok(())
}

/// Word-wise capitalization: first letter of each alphanumeric run upper,
/// rest lower.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for ch in s.chars() {
        if ch.is_alphanumeric() {
            if at_word_start {
                out.extend(ch.to_uppercase());
                at_word_start = false;
            } else {
                out.extend(ch.to_lowercase());
            }
        } else {
            out.push(ch);
            at_word_start = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_case_handles_multiword_and_caps() {
        assert_eq!(title_case("granja del NORTE"), "Granja Del Norte");
        assert_eq!(title_case("JOSÉ"), "José");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn standardize_applies_aliases_and_positional_names() {
        let header = vec![
            CellValue::String("  Fecha ".into()),
            CellValue::String("Temp 9:00".into()),
            CellValue::String("temp 12.00".into()),
            CellValue::Null,
            CellValue::String("   ".into()),
        ];
        assert_eq!(
            standardize_columns(&header),
            vec!["fecha", "temp_9", "temp_12", "unnamed: 3", ""]
        );
    }

    #[test]
    fn feed_cut_is_a_membership_test() {
        let mut table = Table::with_names(vec!["corte de pienso".into()]);
        for v in ["SI", "no", "tal vez"] {
            table.push_row(vec![CellValue::String(v.into())]);
        }
        table.push_row(vec![CellValue::Null]);

        let table = clean_feed_cut_column(table).unwrap();
        let got: Vec<_> = table.column("corte de pienso").unwrap().to_vec();
        assert_eq!(
            got,
            vec![
                CellValue::Bool(true),
                CellValue::Bool(true), // literal "no" is a *known* answer, hence true
                CellValue::Bool(false),
                CellValue::Bool(false),
            ]
        );
    }

    #[test]
    fn mortality_keeps_free_text_untouched() {
        let mut table = Table::with_names(vec![
            "bajas".into(),
            "agua".into(),
            "pienso".into(),
            "temp_9".into(),
            "temp_12".into(),
        ]);
        table.push_row(vec![
            CellValue::Float(-3.7),
            CellValue::Int(1),
            CellValue::Int(1),
            CellValue::Int(20),
            CellValue::Int(20),
        ]);
        table.push_row(vec![
            CellValue::String("dos o tres".into()),
            CellValue::Int(1),
            CellValue::Int(1),
            CellValue::Int(20),
            CellValue::Int(20),
        ]);

        let table = clean_numeric_columns(table).unwrap();
        assert_eq!(table.column("bajas").unwrap()[0], CellValue::Int(0));
        assert_eq!(
            table.column("bajas").unwrap()[1],
            CellValue::String("dos o tres".into())
        );
    }

    #[test]
    fn no_suelo_negative_falls_back_to_totales() {
        let mut table = Table::with_names(vec!["totales".into(), "suelo".into()]);
        table.push_row(vec![CellValue::Int(100), CellValue::Int(30)]);
        table.push_row(vec![CellValue::Int(10), CellValue::Int(30)]);
        table.push_row(vec![CellValue::Null, CellValue::Int(30)]);

        let table = derive_no_suelo(table).unwrap();
        assert_eq!(table.column_names(), &["totales", "suelo", "no_suelo"]);

        let no_suelo = table.column("no_suelo").unwrap();
        assert_eq!(no_suelo[0], CellValue::Int(70));
        // 10 - 30 < 0: take totales itself, not zero
        assert_eq!(no_suelo[1], CellValue::Int(10));
        // missing totales counts as 0, difference is negative, fall back to Null
        assert_eq!(no_suelo[2], CellValue::Null);
    }
}
