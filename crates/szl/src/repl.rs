//! Persistent interactive sessions.
//!
//! A [`ReplSession`] keeps one interpreter alive across inputs and buffers
//! continuation lines while `{}`/`[]` nesting is still open, so multi-line
//! procedure definitions work the way they do in a script file.

use crate::error::Status;
use crate::interp::Interp;
use crate::parse;

/// Outcome of feeding one line to a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplProgress {
    /// The input so far is incomplete; feed more lines.
    NeedMore,
    /// A chunk was executed.
    Done {
        status: Status,
        /// The final `last` value's string form.
        output: String,
    },
}

/// A line-oriented session wrapping a persistent [`Interp`].
pub struct ReplSession {
    interp: Interp,
    pending: String,
}

impl Default for ReplSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplSession {
    #[must_use]
    pub fn new() -> Self {
        Self::with_interp(Interp::new())
    }

    #[must_use]
    pub fn with_interp(interp: Interp) -> Self {
        Self {
            interp,
            pending: String::new(),
        }
    }

    /// Access to the underlying interpreter, e.g. for host registration.
    pub fn interp(&mut self) -> &mut Interp {
        &mut self.interp
    }

    /// True while buffered input awaits its closing delimiters.
    #[must_use]
    pub fn is_continuing(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Feeds one input line. Runs the buffered chunk once all `{}`/`[]`
    /// nesting is closed; unbalanced closers run immediately so the error
    /// surfaces instead of wedging the session.
    pub fn feed(&mut self, line: &str) -> ReplProgress {
        if !self.pending.is_empty() {
            self.pending.push('\n');
        }
        self.pending.push_str(line);
        let (braces, brackets) = parse::nesting_balance(&self.pending);
        if braces > 0 || brackets > 0 {
            return ReplProgress::NeedMore;
        }
        let chunk = std::mem::take(&mut self.pending);
        let status = self.interp.run(&chunk);
        let output = self.interp.last_string().unwrap_or_default();
        ReplProgress::Done { status, output }
    }
}
