use crate::agent::executor::{materialize_with_retry, MaterializedTable};
use crate::agent::guard::{validate, ValidatedStatement};
use crate::agent::query::synthesize_query;
use crate::agent::summary::summarize;
use crate::context::{run_blocking, PipelineContext};
use crate::error::Result;
use crate::ingest::load_dataset;
use crate::schema::SchemaDescriptor;
use crate::store::ResultSet;
use std::path::Path;
use std::sync::Arc;

/// outcome of loading a file into the store
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub table: MaterializedTable,
    pub preview: ResultSet,
}

/// load a file, define its table through the model, insert the rows and
/// read a verification preview back
#[tracing::instrument(skip(ctx, path), fields(path = %path.display(), table = %ctx.table()))]
pub async fn ingest(ctx: &PipelineContext, path: &Path) -> Result<IngestReport> {
    tracing::info!("loading file");
    let owned = path.to_path_buf();
    let dataset = Arc::new(run_blocking(move || load_dataset(owned)).await?);

    tracing::info!("extracting metadata");
    let descriptor = SchemaDescriptor::from_dataset(&dataset);

    tracing::info!("generating create table statement");
    let table = materialize_with_retry(ctx, &descriptor, dataset).await?;

    let store = ctx.store.clone();
    let name = ctx.table().to_string();
    let limit = ctx.settings.verify_rows;
    let preview = run_blocking(move || store.preview(&name, limit)).await?;

    tracing::info!(rows = table.rows, "ingestion complete");
    Ok(IngestReport { table, preview })
}

/// one answered question
#[derive(Debug, Clone)]
pub struct QuestionTurn {
    pub question: String,
    pub statement: ValidatedStatement,
    pub result: ResultSet,
    pub summary: String,
}

/// question loop state: the stored table's descriptor, computed once
pub struct Session {
    ctx: PipelineContext,
    schema: SchemaDescriptor,
}

impl Session {
    /// describe the configured table; fails if it was never created
    pub async fn open(ctx: PipelineContext) -> Result<Self> {
        let store = ctx.store.clone();
        let table = ctx.table().to_string();
        let schema = run_blocking(move || store.describe(&table)).await?;

        tracing::info!(columns = schema.columns().len(), "session ready");
        Ok(Self { ctx, schema })
    }

    pub fn schema(&self) -> &SchemaDescriptor {
        &self.schema
    }

    pub fn context(&self) -> &PipelineContext {
        &self.ctx
    }

    /// synthesize, screen and bound a statement for the question
    #[tracing::instrument(skip(self, question))]
    pub async fn prepare(&self, question: &str) -> Result<ValidatedStatement> {
        let candidate = synthesize_query(&self.ctx, question, &self.schema).await?;
        let statement = validate(&candidate, self.ctx.settings.row_limit)?;
        tracing::info!(statement = %statement, "statement validated");
        Ok(statement)
    }

    #[tracing::instrument(skip(self, statement))]
    pub async fn run(&self, statement: &ValidatedStatement) -> Result<ResultSet> {
        let store = self.ctx.store.clone();
        let statement = statement.clone();
        run_blocking(move || store.execute(&statement)).await
    }

    pub async fn summarize(&self, question: &str, result: &ResultSet) -> Result<String> {
        summarize(&self.ctx, question, result).await
    }

    /// full turn: prepare, run, summarize
    pub async fn ask(&self, question: &str) -> Result<QuestionTurn> {
        let statement = self.prepare(question).await?;
        let result = self.run(&statement).await?;
        let summary = self.summarize(question, &result).await?;

        Ok(QuestionTurn {
            question: question.to_string(),
            statement,
            result,
            summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::summary::NO_RECORDS_MESSAGE;
    use crate::config::PipelineSettings;
    use crate::error::TabletalkError;
    use crate::llm::scripted::ScriptedModel;
    use serde_json::json;

    const DDL_REPLY: &str = "```sql\nCREATE TABLE uploaded_data (id INTEGER, status TEXT);\n```";

    fn context(model: Arc<ScriptedModel>, dir: &tempfile::TempDir) -> PipelineContext {
        let settings = PipelineSettings {
            db_path: dir.path().join("temp_data.db"),
            ..PipelineSettings::default()
        };
        PipelineContext::new(model, settings)
    }

    fn write_csv(dir: &tempfile::TempDir) -> std::path::PathBuf {
        let path = dir.path().join("testdata.csv");
        std::fs::write(&path, "id,status\n1,Unknown\n2,Active\n").unwrap();
        path
    }

    #[tokio::test]
    async fn test_end_to_end_question() {
        let dir = tempfile::tempdir().unwrap();
        let model = Arc::new(ScriptedModel::new([
            DDL_REPLY,
            "```sql\nSELECT * FROM uploaded_data WHERE status = 'Unknown'\n```",
            "Exactly one record matched: id 1 has status Unknown.",
        ]));
        let ctx = context(model.clone(), &dir);

        let report = ingest(&ctx, &write_csv(&dir)).await.unwrap();
        assert_eq!(report.table.rows, 2);
        assert_eq!(report.preview.len(), 2);

        let session = Session::open(ctx).await.unwrap();
        assert_eq!(session.schema().columns(), ["id", "status"]);

        let turn = session
            .ask("show rows where status is Unknown")
            .await
            .unwrap();

        assert!(turn.statement.as_str().contains("'Unknown'"));
        assert_eq!(turn.statement.as_str().matches("LIMIT").count(), 1);
        assert_eq!(
            turn.statement.as_str(),
            "SELECT * FROM uploaded_data WHERE status = 'Unknown'\nLIMIT 10;"
        );
        assert_eq!(turn.result.rows, vec![vec![json!(1), json!("Unknown")]]);
        assert!(turn.summary.contains("one record"));
        assert_eq!(model.call_count(), 3);
        assert_eq!(session.context().usage.totals().calls, 3);

        // the question prompt is built from the stored table's descriptor
        let query_request = &model.requests()[1];
        assert!(query_request.messages[0]
            .content
            .contains(r#"{"id":1,"status":"Unknown"}"#));
    }

    #[tokio::test]
    async fn test_blocked_statement_never_executes() {
        let dir = tempfile::tempdir().unwrap();
        let model = Arc::new(ScriptedModel::new([
            DDL_REPLY,
            "DELETE FROM uploaded_data",
        ]));
        let ctx = context(model.clone(), &dir);
        ingest(&ctx, &write_csv(&dir)).await.unwrap();
        let session = Session::open(ctx).await.unwrap();

        let result = session.ask("remove the unknown rows").await;
        assert!(matches!(
            result,
            Err(TabletalkError::SafetyRejection { ref keyword }) if keyword == "DELETE"
        ));

        // nothing was deleted and no summary call was made
        let preview = session.context().store.preview("uploaded_data", 20).unwrap();
        assert_eq!(preview.len(), 2);
        assert_eq!(model.call_count(), 2);
    }

    #[tokio::test]
    async fn test_empty_result_skips_summary_call() {
        let dir = tempfile::tempdir().unwrap();
        let model = Arc::new(ScriptedModel::new([
            DDL_REPLY,
            "SELECT * FROM uploaded_data WHERE status = 'Closed';",
        ]));
        let ctx = context(model.clone(), &dir);
        ingest(&ctx, &write_csv(&dir)).await.unwrap();
        let session = Session::open(ctx).await.unwrap();

        let turn = session.ask("which rows are closed?").await.unwrap();
        assert!(turn.result.is_empty());
        assert_eq!(turn.summary, NO_RECORDS_MESSAGE);
        assert_eq!(model.call_count(), 2);
    }

    #[tokio::test]
    async fn test_execution_error_leaves_session_usable() {
        let dir = tempfile::tempdir().unwrap();
        let model = Arc::new(ScriptedModel::new([
            DDL_REPLY,
            "SELECT missing_column FROM uploaded_data",
            "SELECT COUNT(*) AS n FROM uploaded_data",
            "There are 2 rows.",
        ]));
        let ctx = context(model, &dir);
        ingest(&ctx, &write_csv(&dir)).await.unwrap();
        let session = Session::open(ctx).await.unwrap();

        let failed = session.ask("bad question").await;
        assert!(matches!(failed, Err(TabletalkError::Execution(_))));
        assert!(failed.unwrap_err().is_turn_local());

        let turn = session.ask("how many rows?").await.unwrap();
        assert_eq!(turn.result.rows, vec![vec![json!(2)]]);
        assert_eq!(turn.summary, "There are 2 rows.");
    }

    #[tokio::test]
    async fn test_open_without_table_is_store_access_error() {
        let dir = tempfile::tempdir().unwrap();
        let model = Arc::new(ScriptedModel::new(Vec::<String>::new()));
        let result = Session::open(context(model, &dir)).await;
        assert!(matches!(result, Err(TabletalkError::StoreAccess(_))));
    }

    #[tokio::test]
    async fn test_unsupported_file_is_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let model = Arc::new(ScriptedModel::new(Vec::<String>::new()));
        let ctx = context(model.clone(), &dir);

        let result = ingest(&ctx, Path::new("sample_SKUs.parquet")).await;
        assert!(matches!(result, Err(TabletalkError::Input(_))));
        assert_eq!(model.call_count(), 0);
    }
}
