use crate::error::{Result, TabletalkError};
use crate::schema::{infer_column_types, parse_cell, ColumnType, Record};
use calamine::{open_workbook_auto, Data, Reader};
use csv::ReaderBuilder;
use serde_json::Value;
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

/// in-memory table produced by the loader
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub types: Vec<ColumnType>,
    pub rows: Vec<Vec<Value>>,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// first `limit` rows as column-keyed records
    pub fn records(&self, limit: usize) -> Vec<Record> {
        self.rows
            .iter()
            .take(limit)
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect()
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceFormat {
    Csv,
    Spreadsheet,
}

fn detect_format(path: &Path) -> Result<SourceFormat> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match extension.as_deref() {
        Some("csv") => Ok(SourceFormat::Csv),
        Some("xlsx") | Some("xls") => Ok(SourceFormat::Spreadsheet),
        Some(other) => Err(TabletalkError::Input(format!(
            "unsupported file format '.{}' for {}",
            other,
            path.display()
        ))),
        None => Err(TabletalkError::Input(format!(
            "cannot determine file format of {}",
            path.display()
        ))),
    }
}

/// load a `.csv` or `.xlsx`/`.xls` file; header names are trimmed and every
/// column gets one inferred type. empty cells become `NULL`
#[tracing::instrument(skip(path), fields(path = %path.as_ref().display()))]
pub fn load_dataset(path: impl AsRef<Path>) -> Result<Dataset> {
    let path = path.as_ref();

    let dataset = match detect_format(path)? {
        SourceFormat::Csv => read_csv(std::fs::File::open(path)?)?,
        SourceFormat::Spreadsheet => read_spreadsheet(path)?,
    };

    tracing::info!(
        columns = dataset.columns.len(),
        rows = dataset.len(),
        "loaded dataset"
    );
    Ok(dataset)
}

/// parse csv text; the first record is the header
pub fn read_csv<R: Read>(source: R) -> Result<Dataset> {
    let mut reader = ReaderBuilder::new().flexible(true).from_reader(source);
    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

    let mut raw_rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        raw_rows.push(record.iter().map(str::to_string).collect());
    }

    build_dataset(headers, raw_rows)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

/// first worksheet of a workbook; the first row is the header
pub fn read_spreadsheet(path: &Path) -> Result<Dataset> {
    let unreadable = |e: calamine::Error| match e {
        calamine::Error::Io(io) => TabletalkError::Io(io),
        other => TabletalkError::Input(format!(
            "cannot read workbook {}: {}",
            path.display(),
            other
        )),
    };

    let mut workbook = open_workbook_auto(path).map_err(unreadable)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| {
            TabletalkError::Input(format!("workbook {} has no worksheets", path.display()))
        })?
        .map_err(unreadable)?;

    let mut rows = range.rows();
    let headers = rows
        .next()
        .map(|row| row.iter().map(cell_text).collect())
        .unwrap_or_default();
    let raw_rows = rows.map(|row| row.iter().map(cell_text).collect()).collect();

    build_dataset(headers, raw_rows)
}

/// name columns, square up the rows and type every column
fn build_dataset(headers: Vec<String>, raw_rows: Vec<Vec<String>>) -> Result<Dataset> {
    let mut seen = HashSet::new();
    let mut columns = Vec::with_capacity(headers.len());
    for (idx, header) in headers.iter().enumerate() {
        let name = match header.trim() {
            "" => format!("column_{}", idx + 1),
            trimmed => trimmed.to_string(),
        };
        if !seen.insert(name.clone()) {
            return Err(TabletalkError::Input(format!(
                "duplicate column name '{}'",
                name
            )));
        }
        columns.push(name);
    }

    if columns.is_empty() {
        return Err(TabletalkError::Input("file has no header row".to_string()));
    }

    let raw_rows: Vec<Vec<String>> = raw_rows
        .into_iter()
        .map(|mut row| {
            row.resize(columns.len(), String::new());
            row
        })
        .collect();

    let types = infer_column_types(columns.len(), &raw_rows);
    let rows = raw_rows
        .iter()
        .map(|row| {
            row.iter()
                .zip(&types)
                .map(|(cell, t)| parse_cell(cell, *t))
                .collect()
        })
        .collect();

    Ok(Dataset {
        columns,
        types,
        rows,
    })
}
