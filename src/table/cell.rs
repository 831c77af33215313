//! Cell scalar type shared by every table column.
//!
//! Columns in farm workbooks are heterogeneous: a mortality column can hold
//! integers, floats and free text in the same sheet. `CellValue` models one
//! cell of such a column, with `Null` as the universal "missing" channel that
//! unparsable values collapse into.

use chrono::NaiveDate;

/// A single cell in a [`Table`](crate::table::Table).
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Missing value. Failed parses land here instead of raising.
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Date(NaiveDate),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Numeric view of the cell. Strings are not parsed here; use
    /// [`to_numeric`](Self::to_numeric) first when string input is possible.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Int(i) => Some(*i as f64),
            CellValue::Float(f) => Some(*f),
            CellValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            CellValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Coerce to a numeric cell. Numbers pass through, booleans become 0/1,
    /// numeric strings parse as floats, everything else becomes `Null`.
    pub fn to_numeric(&self) -> CellValue {
        match self {
            CellValue::Int(i) => CellValue::Int(*i),
            CellValue::Float(f) => CellValue::Float(*f),
            CellValue::Bool(b) => CellValue::Int(i64::from(*b)),
            CellValue::String(s) => match s.trim().parse::<f64>() {
                Ok(f) => CellValue::Float(f),
                Err(_) => CellValue::Null,
            },
            _ => CellValue::Null,
        }
    }

    /// Plain-text rendering: `Null` is empty, dates are ISO, floats keep a
    /// trailing `.0` for whole values.
    pub fn render(&self) -> String {
        match self {
            CellValue::Null => String::new(),
            CellValue::Bool(b) => if *b { "True" } else { "False" }.to_string(),
            CellValue::Int(i) => i.to_string(),
            CellValue::Float(f) => render_float(*f),
            CellValue::String(s) => s.clone(),
            CellValue::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }
}

/// Render a float so whole values keep one decimal place ("95.0", not "95").
pub(crate) fn render_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 {
        format!("{:.1}", f)
    } else {
        format!("{}", f)
    }
}

/// Total ordering used for sorting: same-type cells compare naturally,
/// numeric types compare cross-type, missing values always sort last.
pub fn compare(a: &CellValue, b: &CellValue) -> std::cmp::Ordering {
    use std::cmp::Ordering;
    use CellValue::*;

    match (a, b) {
        (Null, Null) => Ordering::Equal,
        (Null, _) => Ordering::Greater,
        (_, Null) => Ordering::Less,
        (Bool(x), Bool(y)) => x.cmp(y),
        (Int(x), Int(y)) => x.cmp(y),
        (Int(x), Float(y)) => cmp_f64(*x as f64, *y),
        (Float(x), Int(y)) => cmp_f64(*x, *y as f64),
        (Float(x), Float(y)) => cmp_f64(*x, *y),
        (String(x), String(y)) => x.cmp(y),
        (Date(x), Date(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn cmp_f64(x: f64, y: f64) -> std::cmp::Ordering {
    x.partial_cmp(&y).unwrap_or(std::cmp::Ordering::Equal)
}

fn type_rank(cell: &CellValue) -> u8 {
    match cell {
        CellValue::Bool(_) => 0,
        CellValue::Int(_) | CellValue::Float(_) => 1,
        CellValue::Date(_) => 2,
        CellValue::String(_) => 3,
        CellValue::Null => 4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cmp::Ordering;

    #[test]
    fn to_numeric_parses_numeric_strings() {
        assert_eq!(
            CellValue::String(" 42.5 ".to_string()).to_numeric(),
            CellValue::Float(42.5)
        );
        assert_eq!(
            CellValue::String("NADA".to_string()).to_numeric(),
            CellValue::Null
        );
        assert_eq!(CellValue::Int(7).to_numeric(), CellValue::Int(7));
        assert_eq!(CellValue::Bool(true).to_numeric(), CellValue::Int(1));
        assert_eq!(CellValue::Null.to_numeric(), CellValue::Null);
    }

    #[test]
    fn as_f64_does_not_parse_strings() {
        assert_eq!(CellValue::String("42".to_string()).as_f64(), None);
        assert_eq!(CellValue::Float(42.0).as_f64(), Some(42.0));
    }

    #[test]
    fn render_keeps_trailing_zero_on_whole_floats() {
        assert_eq!(CellValue::Float(95.0).render(), "95.0");
        assert_eq!(CellValue::Float(0.5).render(), "0.5");
        assert_eq!(CellValue::Int(95).render(), "95");
        assert_eq!(CellValue::Null.render(), "");
    }

    #[test]
    fn nulls_sort_last() {
        assert_eq!(compare(&CellValue::Null, &CellValue::Int(1)), Ordering::Greater);
        assert_eq!(compare(&CellValue::Int(1), &CellValue::Null), Ordering::Less);
        assert_eq!(compare(&CellValue::Int(2), &CellValue::Float(2.5)), Ordering::Less);
    }
}
