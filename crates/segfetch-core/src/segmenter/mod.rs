//! Range math and segment planning.
//!
//! Splits a transfer of known length into N contiguous inclusive byte ranges
//! and computes the Range header bounds used to fetch (or resume) each one.

mod range;

pub use range::{plan_segments, PlanError, Segment};
