pub mod ddl;
pub mod executor;
pub mod guard;
pub mod parser;
pub mod prompt;
pub mod query;
pub mod summary;

pub use ddl::synthesize_ddl;
pub use executor::{call_model, materialize_with_retry, MaterializedTable};
pub use guard::{check_read_only, enforce_limit, validate, ValidatedStatement};
pub use parser::strip_code_fence;
pub use query::synthesize_query;
pub use summary::{summarize, NO_RECORDS_MESSAGE};
