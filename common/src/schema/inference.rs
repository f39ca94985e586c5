use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

/// declared column type, named by its sqlite affinity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ColumnType {
    Integer,
    Real,
    Text,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Integer => "INTEGER",
            ColumnType::Real => "REAL",
            ColumnType::Text => "TEXT",
        }
    }
}

fn is_missing(raw: &str) -> bool {
    raw.trim().is_empty()
}

/// None means the cell is empty and says nothing about the column
fn infer_cell(raw: &str) -> Option<ColumnType> {
    if is_missing(raw) {
        return None;
    }

    let trimmed = raw.trim();
    if trimmed.parse::<i64>().is_ok() {
        Some(ColumnType::Integer)
    } else if trimmed.parse::<f64>().map(f64::is_finite).unwrap_or(false) {
        Some(ColumnType::Real)
    } else {
        Some(ColumnType::Text)
    }
}

fn merge_types(lhs: Option<ColumnType>, rhs: Option<ColumnType>) -> Option<ColumnType> {
    match (lhs, rhs) {
        (None, t) | (t, None) => t,
        (Some(l), Some(r)) if l == r => Some(l),
        (Some(ColumnType::Integer), Some(ColumnType::Real))
        | (Some(ColumnType::Real), Some(ColumnType::Integer)) => Some(ColumnType::Real),
        _ => Some(ColumnType::Text),
    }
}

/// widen per-cell types column by column; all-empty columns become text
pub fn infer_column_types(width: usize, rows: &[Vec<String>]) -> Vec<ColumnType> {
    let mut inferred: Vec<Option<ColumnType>> = vec![None; width];

    for row in rows {
        for (idx, slot) in inferred.iter_mut().enumerate() {
            let cell = row.get(idx).map(String::as_str).unwrap_or("");
            *slot = merge_types(*slot, infer_cell(cell));
        }
    }

    inferred
        .into_iter()
        .map(|t| t.unwrap_or(ColumnType::Text))
        .collect()
}

/// convert a raw cell into a typed value for its column
pub fn parse_cell(raw: &str, column_type: ColumnType) -> Value {
    if is_missing(raw) {
        return Value::Null;
    }

    let trimmed = raw.trim();
    match column_type {
        ColumnType::Integer => trimmed
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(raw.to_string())),
        ColumnType::Real => trimmed
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(raw.to_string())),
        ColumnType::Text => Value::String(raw.to_string()),
    }
}
