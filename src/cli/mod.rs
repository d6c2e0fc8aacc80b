//! CLI support for qconsole
//!
//! Provides programmatic access to the command-line session setup so hosts
//! can embed the same behaviour.

mod run;
mod seed;

pub use run::{execute_script, repl};
pub use seed::{json_to_value, seed_symbols};

use std::{io, path::PathBuf};

use crate::{EngineMode, Interpreter, InterpreterConfig, Leniency, LineJoining};

/// Errors that can occur during CLI operations
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON parsing error
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Seed document of the wrong shape
    #[error("Invalid seed: {0}")]
    Seed(String),

    /// No input provided
    #[error("No input provided. Pass a file or pipe a script to stdin.")]
    NoInput,
}

/// Settings shared by every subcommand
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Answer literals and queries with canned fingerprint tables
    pub legacy: bool,
    /// Echo unparseable statements back instead of failing
    pub lenient: bool,
    /// Start without the sample `trade` table
    pub no_sample: bool,
    /// Treat every script line as its own statement, even inside brackets
    pub per_line: bool,
    /// JSON document of extra bindings
    pub seed: Option<PathBuf>,
}

impl SessionOptions {
    /// Scripts join lines across open brackets unless `per_line` is set.
    pub fn config(&self) -> InterpreterConfig {
        let joining = if self.per_line {
            LineJoining::PerLine
        } else {
            LineJoining::Brackets
        };
        let mut config = InterpreterConfig::new().with_joining(joining);
        if self.legacy {
            config = config.with_mode(EngineMode::Legacy);
        }
        if self.lenient {
            config = config.with_leniency(Leniency::Echo);
        }
        config
    }
}

pub fn build_interpreter(options: &SessionOptions) -> Result<Interpreter, CliError> {
    let config = options.config();
    let mut interpreter = if options.no_sample {
        Interpreter::new(config)
    } else {
        Interpreter::with_sample_data(config)
    };

    if let Some(path) = &options.seed {
        let document = std::fs::read_to_string(path)?;
        let bound = seed_symbols(interpreter.symbols_mut(), &document)?;
        tracing::info!(path = %path.display(), bound, "seeded symbol table");
    }
    Ok(interpreter)
}
