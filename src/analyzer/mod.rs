//! Single-grating Talbot analyzer.
//!
//! Modules
//! - [`params`] – configuration types used by the analyzer and CLI.
//! - `pipeline` – the main [`TalbotAnalyzer`] implementation.
//! - [`zscan`] – per-frame period and visibility of a coherence z-scan.

pub mod params;
mod pipeline;
pub mod zscan;

pub use params::{ExperimentParams, GratingPattern, HarmonicParams, TalbotParams};
pub use pipeline::{TalbotAnalyzer, TalbotResult};
pub use zscan::{fit_stack, measure_frame, AxisCoherence, ScanDirection, ZScanFrame, ZScanParams};
