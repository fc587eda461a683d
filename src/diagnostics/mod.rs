//! Diagnostics channel, timing trace and analysis report.
//!
//! Every stage receives a `&mut dyn DiagnosticSink` and emits tagged text
//! lines through it. `AnalysisReport` is returned by the analyzer, bundling
//! the maps with a serializable summary of what each stage measured.

pub mod report;
pub mod sink;
pub mod timing;

pub use report::{AnalysisReport, AnalysisSummary, InputDescriptor};
pub use sink::{Diagnostic, DiagnosticSink, Level, LogSink, RecordingSink};
pub use timing::{elapsed_ms, StageTiming, TimingBreakdown};
