pub mod agent;
pub mod config;
pub mod context;
pub mod error;
pub mod ingest;
pub mod llm;
pub mod schema;
pub mod session;
pub mod store;
pub mod tracing;

pub use config::{AppConfig, LlmConfig, PipelineSettings};
pub use context::PipelineContext;
pub use error::{Result, TabletalkError};
pub use session::{ingest, IngestReport, QuestionTurn, Session};
