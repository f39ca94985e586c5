use crate::agent::executor::call_model;
use crate::agent::parser::extract_statement;
use crate::agent::prompt::{QUERY_TEMPLATE, SLOT_COLUMNS, SLOT_SAMPLES, SLOT_TABLE, SLOT_TYPES};
use crate::context::PipelineContext;
use crate::error::Result;
use crate::llm::{ChatRequest, Message};
use crate::schema::SchemaDescriptor;

/// turn a question into candidate select text; nothing here checks it
#[tracing::instrument(skip(ctx, question, descriptor), fields(question_len = question.len()))]
pub async fn synthesize_query(
    ctx: &PipelineContext,
    question: &str,
    descriptor: &SchemaDescriptor,
) -> Result<String> {
    let columns = descriptor.columns_text();
    let types = descriptor.types_text();
    let samples = descriptor.sample_rows_text();

    let system = QUERY_TEMPLATE.render(&[
        (SLOT_TABLE, ctx.table()),
        (SLOT_COLUMNS, columns.as_str()),
        (SLOT_TYPES, types.as_str()),
        (SLOT_SAMPLES, samples.as_str()),
    ])?;

    let request = ChatRequest::new(
        vec![Message::system(system), Message::user(question)],
        ctx.settings.synthesis_temperature,
    );
    let output = call_model(ctx, "analysis", request).await?;

    extract_statement("analysis", &output)
}
