//! Pipeline entry points for outline retrieval.
//!
//! - `fetch_outline`: per-course retry/fallback state machine
//! - `run_term`: one term's resumable run with checkpoint cadence
//! - `run_all`: bounded worker pool over independent terms

pub mod outline;

pub use outline::{OutlineStats, TermJob, TermReport, fetch_outline, run_all, run_term};
