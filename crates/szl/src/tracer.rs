//! Execution tracing hooks.
//!
//! The interpreter reports each statement it is about to run to an
//! [`ExecTracer`]. The default [`NoopTracer`] opts out up front so the hot
//! path never materialises the statement text.

/// Observer for statement-level execution events.
pub trait ExecTracer {
    /// Whether statement text should be materialised and reported at all.
    fn wants_statements(&self) -> bool {
        false
    }

    /// Called before a statement executes. `depth` is the current call
    /// nesting depth.
    fn on_statement(&mut self, _depth: usize, _statement: &str) {}
}

/// Tracer that ignores everything.
#[derive(Debug, Default)]
pub struct NoopTracer;

impl ExecTracer for NoopTracer {}

/// Tracer that prints each statement to stderr, indented by depth.
#[derive(Debug, Default)]
pub struct StderrTracer;

impl ExecTracer for StderrTracer {
    fn wants_statements(&self) -> bool {
        true
    }

    fn on_statement(&mut self, depth: usize, statement: &str) {
        eprintln!("szl: {:depth$}{statement}", "");
    }
}

/// Tracer that records statements in order; used in tests.
#[derive(Debug, Default)]
pub struct RecordingTracer {
    statements: Vec<String>,
}

impl RecordingTracer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn statements(&self) -> &[String] {
        &self.statements
    }
}

impl ExecTracer for RecordingTracer {
    fn wants_statements(&self) -> bool {
        true
    }

    fn on_statement(&mut self, _depth: usize, statement: &str) {
        self.statements.push(statement.to_owned());
    }
}
