use crate::ingest::Dataset;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

/// upper bound on sample rows carried by any descriptor
pub const MAX_SAMPLE_ROWS: usize = 5;

/// column name to value, keys in column order
pub type Record = Map<String, Value>;

/// compact summary of a table used to prompt the synthesis stages
///
/// Columns keep their table order. Every column has exactly one entry in
/// `types`, and sample rows only carry keys that name a column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaDescriptor {
    columns: Vec<String>,
    types: HashMap<String, String>,
    sample_rows: Vec<Record>,
}

impl SchemaDescriptor {
    /// duplicate column names keep their first declaration
    pub fn new(columns: Vec<(String, String)>, sample_rows: Vec<Record>) -> Self {
        let mut seen = HashSet::new();
        let mut names = Vec::with_capacity(columns.len());
        let mut types = HashMap::with_capacity(columns.len());

        for (name, declared) in columns {
            if seen.insert(name.clone()) {
                types.insert(name.clone(), declared);
                names.push(name);
            }
        }

        let sample_rows = sample_rows
            .into_iter()
            .take(MAX_SAMPLE_ROWS)
            .map(|row| {
                row.into_iter()
                    .filter(|(key, _)| seen.contains(key))
                    .collect::<Record>()
            })
            .collect();

        Self {
            columns: names,
            types,
            sample_rows,
        }
    }

    /// summary of an in-memory dataset before it reaches the store
    pub fn from_dataset(dataset: &Dataset) -> Self {
        let columns = dataset
            .columns
            .iter()
            .cloned()
            .zip(dataset.types.iter().map(|t| t.as_str().to_string()))
            .collect();

        Self::new(columns, dataset.records(MAX_SAMPLE_ROWS))
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn type_of(&self, column: &str) -> Option<&str> {
        self.types.get(column).map(String::as_str)
    }

    pub fn types(&self) -> &HashMap<String, String> {
        &self.types
    }

    pub fn sample_rows(&self) -> &[Record] {
        &self.sample_rows
    }

    pub fn columns_text(&self) -> String {
        Value::from(self.columns.clone()).to_string()
    }

    /// types rendered in column order
    pub fn types_text(&self) -> String {
        let ordered: Record = self
            .columns
            .iter()
            .map(|c| {
                let declared = self.types.get(c).cloned().unwrap_or_default();
                (c.clone(), Value::String(declared))
            })
            .collect();
        Value::Object(ordered).to_string()
    }

    pub fn sample_rows_text(&self) -> String {
        Value::Array(
            self.sample_rows
                .iter()
                .cloned()
                .map(Value::Object)
                .collect(),
        )
        .to_string()
    }
}
