pub mod config;
pub mod logging;

pub mod assembler;
pub mod control;
pub mod dispatch;
pub mod error;
pub mod fetcher;
pub mod http;
pub mod job;
pub mod orchestrator;
pub mod progress;
pub mod resolver;
pub mod retry;
pub mod segmenter;
pub mod store;
pub mod url_model;

pub use config::{EngineConfig, SegfetchConfig};
pub use control::{CancelToken, JobControl};
pub use dispatch::{run_jobs, JobReport, Summary};
pub use error::TransferError;
pub use job::{JobDescriptor, TransferJob, TransferOutcome};
pub use orchestrator::TransferEngine;
