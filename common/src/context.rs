use crate::config::PipelineSettings;
use crate::error::{Result, TabletalkError};
use crate::llm::{ChatModel, UsageLedger};
use crate::store::Store;
use std::sync::Arc;

/// everything a pipeline stage needs, built once and cloned cheaply
#[derive(Clone)]
pub struct PipelineContext {
    pub model: Arc<dyn ChatModel>,
    pub usage: Arc<UsageLedger>,
    pub store: Store,
    pub settings: Arc<PipelineSettings>,
}

impl PipelineContext {
    pub fn new(model: Arc<dyn ChatModel>, settings: PipelineSettings) -> Self {
        Self {
            model,
            usage: Arc::new(UsageLedger::new()),
            store: Store::new(settings.db_path.clone()),
            settings: Arc::new(settings),
        }
    }

    pub fn table(&self) -> &str {
        &self.settings.table
    }
}

/// run sync store work off the async runtime
pub(crate) async fn run_blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| TabletalkError::Execution(format!("task join error: {}", e)))?
}
