//! Job-level failure reasons.

use crate::assembler::AssemblyError;
use crate::retry::SegmentError;
use crate::segmenter::PlanError;
use crate::store::StoreError;

/// Why a transfer job failed. Carried by [`TransferOutcome::Failure`](crate::TransferOutcome).
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    /// A segment still failed after every attempt round.
    #[error("segment {index} exhausted retries: {cause}")]
    SegmentExhausted {
        index: usize,
        #[source]
        cause: SegmentError,
    },
    /// The single-stream transfer of an unknown-size resource failed.
    #[error("direct transfer failed: {0}")]
    DirectFetchFailed(#[source] SegmentError),
    #[error("assembly failed: {0}")]
    Assembly(#[from] AssemblyError),
    /// Segment state or the output directory could not be read or written.
    #[error("filesystem error: {0}")]
    Filesystem(#[from] StoreError),
    #[error("invalid segment plan: {0}")]
    InvalidPlan(#[from] PlanError),
    /// Another job of the same batch already owns these output names.
    #[error("output name {key} is already used by job {other}")]
    DuplicateTarget { key: String, other: String },
    #[error("cancelled")]
    Cancelled,
    /// The thread running the job panicked.
    #[error("transfer worker panicked")]
    Panicked,
}

impl TransferError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TransferError::Cancelled)
    }
}
