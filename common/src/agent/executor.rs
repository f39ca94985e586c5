use crate::agent::ddl::synthesize_ddl;
use crate::context::{run_blocking, PipelineContext};
use crate::error::{Result, TabletalkError};
use crate::ingest::Dataset;
use crate::llm::ChatRequest;
use crate::schema::SchemaDescriptor;
use std::sync::Arc;

/// one model round trip; usage goes to the ledger, text comes back trimmed
#[tracing::instrument(skip(ctx, request), fields(llm.model = %ctx.model.model_id()))]
pub async fn call_model(ctx: &PipelineContext, stage: &str, request: ChatRequest) -> Result<String> {
    let response = ctx.model.complete(request).await?;
    ctx.usage.record(stage, &response.usage);
    Ok(response.content.trim().to_string())
}

/// table created from a synthesized ddl statement
#[derive(Debug, Clone)]
pub struct MaterializedTable {
    pub ddl: String,
    pub rows: usize,
    pub attempts: usize,
}

/// synthesize ddl and load the dataset, feeding store errors back to the
/// model for up to `max_attempts` rounds
#[tracing::instrument(skip(ctx, descriptor, dataset), fields(max_attempts = ctx.settings.max_attempts))]
pub async fn materialize_with_retry(
    ctx: &PipelineContext,
    descriptor: &SchemaDescriptor,
    dataset: Arc<Dataset>,
) -> Result<MaterializedTable> {
    let max_attempts = ctx.settings.max_attempts.max(1);
    let mut last_error: Option<TabletalkError> = None;
    let mut feedback: Option<String> = None;

    for attempt in 1..=max_attempts {
        tracing::info!("ddl synthesis attempt {}/{}", attempt, max_attempts);

        let ddl = match synthesize_ddl(ctx, descriptor, ctx.table(), feedback.as_deref()).await {
            Ok(ddl) => ddl,
            Err(e) => {
                tracing::warn!("ddl synthesis attempt {} failed: {}", attempt, e);
                feedback = Some(format!("previous output was unusable: {}", e));
                last_error = Some(e);
                continue;
            }
        };

        let store = ctx.store.clone();
        let table = ctx.table().to_string();
        let statement = ddl.clone();
        let data = Arc::clone(&dataset);

        match run_blocking(move || store.materialize(&table, &statement, &data)).await {
            Ok(rows) => {
                tracing::info!("table created on attempt {}", attempt);
                return Ok(MaterializedTable {
                    ddl,
                    rows,
                    attempts: attempt,
                });
            }
            Err(e) => {
                tracing::warn!("table creation attempt {} failed: {}", attempt, e);
                feedback = Some(format!(
                    "previous statement:\n{}\nfailed with: {}\n\
                     return only one create table statement.",
                    ddl, e
                ));
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| {
        TabletalkError::Synthesis(format!(
            "table creation failed after {} attempts",
            max_attempts
        ))
    }))
}
