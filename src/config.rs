//! Interpreter configuration.
//!
//! Three switches change semantics, all off by default:
//!
//! - [`EngineMode::Legacy`] answers table literals and queries by
//!   fingerprint matching with canned tables, as the original console did.
//! - [`Leniency::Echo`] turns unparseable input into a string value instead
//!   of an error.
//! - [`LineJoining::Brackets`] lets a statement span lines while a bracket
//!   is open.

/// How table literals, queries and the VWAP builtin are answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineMode {
    /// Parse literals into real columns and evaluate queries row by row
    #[default]
    Structural,

    /// Recognise inputs by keyword fingerprints and return canned tables
    Legacy,
}

/// What happens to input that does not parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Leniency {
    /// Report a parse error
    #[default]
    Strict,

    /// Echo the statement text back as a string value
    Echo,
}

/// How source text is cut into statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineJoining {
    /// Every non-empty line is one statement
    #[default]
    PerLine,

    /// A line that leaves a bracket open continues on the next line
    Brackets,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterpreterConfig {
    pub mode: EngineMode,
    pub leniency: Leniency,
    pub joining: LineJoining,
}

impl InterpreterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mode(mut self, mode: EngineMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_leniency(mut self, leniency: Leniency) -> Self {
        self.leniency = leniency;
        self
    }

    pub fn with_joining(mut self, joining: LineJoining) -> Self {
        self.joining = joining;
        self
    }

    /// Fingerprint tables and echo fallback together: the original console.
    pub fn legacy() -> Self {
        InterpreterConfig {
            mode: EngineMode::Legacy,
            leniency: Leniency::Echo,
            joining: LineJoining::PerLine,
        }
    }
}
