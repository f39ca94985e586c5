use crate::agent::guard::ValidatedStatement;
use crate::error::{Result, TabletalkError};
use crate::ingest::Dataset;
use crate::schema::{Record, SchemaDescriptor};
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Batch, Connection, OpenFlags, Statement};
use serde_json::{Number, Value};
use std::path::{Path, PathBuf};

/// rows sampled by [`Store::describe`]
pub const DESCRIBE_SAMPLE_ROWS: usize = 3;

/// rows returned by one statement, in column order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl ResultSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

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

pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(format!("<blob {} bytes>", bytes.len())),
    }
}

fn to_sql(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                SqlValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                SqlValue::Real(f)
            } else {
                SqlValue::Text(n.to_string())
            }
        }
        Value::String(s) => SqlValue::Text(s.clone()),
        other => SqlValue::Text(other.to_string()),
    }
}

fn run_query(conn: &Connection, sql: &str) -> rusqlite::Result<ResultSet> {
    let mut stmt = conn.prepare(sql)?;
    collect_rows(&mut stmt)
}

fn collect_rows(stmt: &mut Statement<'_>) -> rusqlite::Result<ResultSet> {
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    let mut rows = stmt.query([])?;
    let mut collected = Vec::new();
    while let Some(row) = rows.next()? {
        let mut values = Vec::with_capacity(columns.len());
        for idx in 0..columns.len() {
            values.push(to_json(row.get_ref(idx)?));
        }
        collected.push(values);
    }

    Ok(ResultSet {
        columns,
        rows: collected,
    })
}

/// first statement of `sql`; a second one, even after a `;`, is an error
///
/// `Connection::prepare` silently drops everything past the first
/// statement, so the tail is walked with a [`Batch`]. whitespace and
/// comments after the last `;` are not statements.
fn prepare_single<'c>(conn: &'c Connection, sql: &str) -> Result<Statement<'c>> {
    let failed = |e: rusqlite::Error| TabletalkError::Execution(e.to_string());
    let mut batch = Batch::new(conn, sql);

    let first = batch
        .next()
        .map_err(failed)?
        .ok_or_else(|| TabletalkError::Execution("empty statement".to_string()))?;

    if batch.next().map_err(failed)?.is_some() {
        return Err(TabletalkError::Execution(
            "multiple statements are not allowed".to_string(),
        ));
    }

    Ok(first)
}

/// sqlite file; every call opens its own connection and drops it before
/// returning
#[derive(Debug, Clone)]
pub struct Store {
    path: PathBuf,
}

impl Store {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn connect(&self) -> Result<Connection> {
        Connection::open(&self.path).map_err(|e| {
            TabletalkError::StoreAccess(format!("cannot open {}: {}", self.path.display(), e))
        })
    }

    fn connect_read_only(&self) -> Result<Connection> {
        Connection::open_with_flags(
            &self.path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| {
            TabletalkError::StoreAccess(format!("cannot open {}: {}", self.path.display(), e))
        })
    }

    /// columns, declared types and a few sample rows of a stored table
    #[tracing::instrument(skip(self), fields(store = %self.path.display()))]
    pub fn describe(&self, table: &str) -> Result<SchemaDescriptor> {
        let conn = self.connect_read_only()?;
        let access = |e: rusqlite::Error| {
            TabletalkError::StoreAccess(format!("cannot describe '{}': {}", table, e))
        };

        let mut stmt = conn
            .prepare("SELECT name, type FROM pragma_table_info(?1) ORDER BY cid")
            .map_err(access)?;
        let columns = stmt
            .query_map([table], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
            .map_err(access)?
            .collect::<rusqlite::Result<Vec<(String, String)>>>()
            .map_err(access)?;

        if columns.is_empty() {
            return Err(TabletalkError::StoreAccess(format!(
                "table '{}' does not exist in {}",
                table,
                self.path.display()
            )));
        }

        let sample = run_query(
            &conn,
            &format!(
                "SELECT * FROM {} LIMIT {}",
                quote_ident(table),
                DESCRIBE_SAMPLE_ROWS
            ),
        )
        .map_err(access)?;

        tracing::debug!(columns = columns.len(), samples = sample.len(), "described table");

        Ok(SchemaDescriptor::new(
            columns,
            sample.records(DESCRIBE_SAMPLE_ROWS),
        ))
    }

    /// replace `table` with `ddl` and bulk insert the dataset in one transaction
    #[tracing::instrument(skip(self, ddl, dataset), fields(store = %self.path.display(), rows = dataset.len()))]
    pub fn materialize(&self, table: &str, ddl: &str, dataset: &Dataset) -> Result<usize> {
        let mut conn = self.connect()?;
        let failed = |e: rusqlite::Error| {
            TabletalkError::Execution(format!("creating table '{}' failed: {}", table, e))
        };

        let tx = conn.transaction().map_err(failed)?;
        tx.execute_batch(&format!("DROP TABLE IF EXISTS {}", quote_ident(table)))
            .map_err(failed)?;
        tx.execute_batch(ddl).map_err(failed)?;

        let placeholders = (1..=dataset.columns.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let insert = format!("INSERT INTO {} VALUES ({})", quote_ident(table), placeholders);

        {
            let mut stmt = tx.prepare(&insert).map_err(failed)?;
            for row in &dataset.rows {
                stmt.execute(params_from_iter(row.iter().map(to_sql)))
                    .map_err(failed)?;
            }
        }

        tx.commit().map_err(failed)?;
        tracing::info!(table, rows = dataset.len(), "table materialized");
        Ok(dataset.len())
    }

    /// run a guarded statement and collect every row it returns
    #[tracing::instrument(skip(self, statement), fields(store = %self.path.display()))]
    pub fn execute(&self, statement: &ValidatedStatement) -> Result<ResultSet> {
        let conn = self.connect()?;
        let mut stmt = prepare_single(&conn, statement.as_str())?;
        let result =
            collect_rows(&mut stmt).map_err(|e| TabletalkError::Execution(e.to_string()))?;

        tracing::info!(rows = result.len(), "statement executed");
        Ok(result)
    }

    /// first `limit` rows of a table, used to verify ingestion
    pub fn preview(&self, table: &str, limit: usize) -> Result<ResultSet> {
        let conn = self.connect_read_only()?;
        run_query(
            &conn,
            &format!("SELECT * FROM {} LIMIT {};", quote_ident(table), limit),
        )
        .map_err(|e| TabletalkError::StoreAccess(format!("cannot read '{}': {}", table, e)))
    }
}
