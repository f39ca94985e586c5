pub mod azure;
pub mod model;
pub mod usage;

#[cfg(test)]
pub mod scripted;

pub use azure::AzureOpenAiClient;
pub use model::{ChatModel, ChatRequest, ChatResponse, Message, MessageRole, Usage};
pub use usage::{UsageLedger, UsageTotals};
