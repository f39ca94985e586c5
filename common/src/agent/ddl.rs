use crate::agent::executor::call_model;
use crate::agent::parser::extract_statement;
use crate::agent::prompt::{DDL_TEMPLATE, SLOT_COLUMNS, SLOT_SAMPLES, SLOT_TABLE, SLOT_TYPES};
use crate::context::PipelineContext;
use crate::error::Result;
use crate::llm::{ChatRequest, Message};
use crate::schema::SchemaDescriptor;

/// ask the model for a create table statement matching the descriptor
///
/// The returned text is not checked in any way. A malformed statement only
/// shows up when the store tries to run it.
#[tracing::instrument(skip(ctx, descriptor, feedback), fields(columns = descriptor.columns().len(), retry = feedback.is_some()))]
pub async fn synthesize_ddl(
    ctx: &PipelineContext,
    descriptor: &SchemaDescriptor,
    table: &str,
    feedback: Option<&str>,
) -> Result<String> {
    let columns = descriptor.columns_text();
    let types = descriptor.types_text();
    let samples = descriptor.sample_rows_text();

    let mut prompt = DDL_TEMPLATE.render(&[
        (SLOT_TABLE, table),
        (SLOT_COLUMNS, columns.as_str()),
        (SLOT_TYPES, types.as_str()),
        (SLOT_SAMPLES, samples.as_str()),
    ])?;

    if let Some(feedback) = feedback {
        prompt = format!("{}\n\n{}", prompt, feedback);
    }

    let request = ChatRequest::new(
        vec![Message::system(prompt)],
        ctx.settings.synthesis_temperature,
    );
    let output = call_model(ctx, "create table", request).await?;

    let ddl = extract_statement("create table", &output)?;
    tracing::info!(ddl_length = ddl.len(), "ddl synthesized");
    Ok(ddl)
}
