//! CLI command handlers.

mod completions;
mod get;
mod run;

pub use completions::run_completions;
pub use get::run_single;
pub use run::run_batch;
