use crate::agent::executor::call_model;
use crate::agent::prompt::{SLOT_QUESTION, SLOT_RESULT, SUMMARY_REQUEST_TEMPLATE, SUMMARY_TEMPLATE};
use crate::context::PipelineContext;
use crate::error::{Result, TabletalkError};
use crate::llm::{ChatRequest, Message};
use crate::store::ResultSet;
use serde_json::Value;

pub const NO_RECORDS_MESSAGE: &str = "No records matched the query.";

/// grounded prose over the first rows of a result; empty results never
/// reach the model
#[tracing::instrument(skip(ctx, question, result), fields(rows = result.len()))]
pub async fn summarize(ctx: &PipelineContext, question: &str, result: &ResultSet) -> Result<String> {
    if result.is_empty() {
        return Ok(NO_RECORDS_MESSAGE.to_string());
    }

    let preview = Value::Array(
        result
            .records(ctx.settings.preview_rows)
            .into_iter()
            .map(Value::Object)
            .collect(),
    );
    let preview_text = serde_json::to_string_pretty(&preview)?;

    let system = SUMMARY_TEMPLATE.render(&[])?;
    let user = SUMMARY_REQUEST_TEMPLATE.render(&[
        (SLOT_QUESTION, question),
        (SLOT_RESULT, preview_text.as_str()),
    ])?;

    let request = ChatRequest::new(
        vec![Message::system(system), Message::user(user)],
        ctx.settings.summary_temperature,
    );
    let summary = call_model(ctx, "summary", request).await?;

    if summary.is_empty() {
        return Err(TabletalkError::Synthesis(
            "summary stage: model returned no text".to_string(),
        ));
    }

    Ok(summary)
}
