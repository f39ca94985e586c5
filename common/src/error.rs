use thiserror::Error;

#[derive(Error, Debug)]
pub enum TabletalkError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("input error: {0}")]
    Input(String),

    #[error("store access error: {0}")]
    StoreAccess(String),

    #[error("synthesis error: {0}")]
    Synthesis(String),

    #[error("statement rejected: contains forbidden keyword {keyword}")]
    SafetyRejection { keyword: String },

    #[error("execution error: {0}")]
    Execution(String),

    #[error("tracing initialization failed: {0}")]
    Tracing(String),
}

impl TabletalkError {
    /// errors that abort a single question turn but leave the loop running
    pub fn is_turn_local(&self) -> bool {
        matches!(
            self,
            TabletalkError::Synthesis(_)
                | TabletalkError::SafetyRejection { .. }
                | TabletalkError::Execution(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, TabletalkError>;
