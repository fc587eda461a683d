//! Diagnostics channel injected into every stage.
//!
//! Stages never talk to a logger directly; they receive a
//! `&mut dyn DiagnosticSink` and emit tagged text lines. [`LogSink`] forwards
//! to the `log` facade, [`RecordingSink`] additionally keeps the lines so
//! they can be attached to reports or inspected in tests.
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Warning,
    Error,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Diagnostic {
    pub level: Level,
    pub message: String,
}

pub trait DiagnosticSink {
    fn emit(&mut self, level: Level, message: &str);

    fn info(&mut self, message: &str) {
        self.emit(Level::Info, message);
    }

    fn warning(&mut self, message: &str) {
        self.emit(Level::Warning, message);
    }

    fn error(&mut self, message: &str) {
        self.emit(Level::Error, message);
    }
}

fn forward_to_log(level: Level, message: &str) {
    match level {
        Level::Info => log::info!("{message}"),
        Level::Warning => log::warn!("{message}"),
        Level::Error => log::error!("{message}"),
    }
}

/// Forwards every line to the `log` facade.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl DiagnosticSink for LogSink {
    fn emit(&mut self, level: Level, message: &str) {
        forward_to_log(level, message);
    }
}

/// Keeps every line (and mirrors it to `log`).
#[derive(Clone, Debug, Default)]
pub struct RecordingSink {
    records: Vec<Diagnostic>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[Diagnostic] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Diagnostic> {
        self.records
    }

    /// Lines emitted at `level`.
    pub fn messages(&self, level: Level) -> impl Iterator<Item = &str> {
        self.records
            .iter()
            .filter(move |d| d.level == level)
            .map(|d| d.message.as_str())
    }

    pub fn count(&self, level: Level) -> usize {
        self.messages(level).count()
    }
}

impl DiagnosticSink for RecordingSink {
    fn emit(&mut self, level: Level, message: &str) {
        forward_to_log(level, message);
        self.records.push(Diagnostic {
            level,
            message: message.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_sink_keeps_levels() {
        let mut sink = RecordingSink::new();
        sink.info("a");
        sink.warning("b");
        sink.warning("c");
        sink.error("d");
        assert_eq!(sink.count(Level::Warning), 2);
        assert_eq!(sink.messages(Level::Error).collect::<Vec<_>>(), vec!["d"]);
        assert_eq!(sink.records().len(), 4);
    }
}
