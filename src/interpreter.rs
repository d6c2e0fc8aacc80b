use std::panic::{self, AssertUnwindSafe};

use crate::{
    config::InterpreterConfig,
    evaluator::{EvalError, Evaluator, Outcome, classify},
    output::{DisplayLine, format_value},
    source::StatementLines,
    symbols::SymbolTable,
    value::Value,
};

const UNKNOWN_ERROR: &str = "Unknown error occurred";

/// A console session: one symbol table and the settings it runs under.
///
/// ```
/// use qconsole::{Interpreter, InterpreterConfig};
///
/// let mut q = Interpreter::new(InterpreterConfig::default());
/// let lines = q.run("x: 5\nx + 1");
/// let text: Vec<String> = lines.iter().map(|l| l.to_string()).collect();
/// assert_eq!(text, vec!["// Assigned to variable: x", "q) x + 1", "6"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Interpreter {
    symbols: SymbolTable,
    config: InterpreterConfig,
}

impl Interpreter {
    pub fn new(config: InterpreterConfig) -> Self {
        Interpreter {
            symbols: SymbolTable::new(),
            config,
        }
    }

    /// Starts with the sample `trade` table bound.
    pub fn with_sample_data(config: InterpreterConfig) -> Self {
        Interpreter {
            symbols: SymbolTable::with_sample_data(),
            config,
        }
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn symbols_mut(&mut self) -> &mut SymbolTable {
        &mut self.symbols
    }

    /// Evaluates every statement of `source` in order.
    ///
    /// Statements are split per line unless the config joins lines across
    /// open brackets. A failing statement contributes one error line and the rest still run;
    /// this never panics and never fails as a whole.
    #[tracing::instrument(level = "debug", skip_all, fields(bytes = source.len()))]
    pub fn run(&mut self, source: &str) -> Vec<DisplayLine> {
        let mut lines = Vec::new();
        for statement in StatementLines::with_joining(source, self.config.joining) {
            self.run_statement(&statement, &mut lines);
        }
        lines
    }

    /// Like [`run`](Self::run), rendered as inline HTML.
    pub fn run_markup(&mut self, source: &str) -> Vec<String> {
        self.run(source).iter().map(DisplayLine::markup).collect()
    }

    fn run_statement(&mut self, text: &str, lines: &mut Vec<DisplayLine>) {
        let statement = classify(text);
        if !statement.is_binding() {
            lines.push(DisplayLine::prompt(text));
        }

        let mut evaluator = Evaluator::new(&mut self.symbols, &self.config);
        match contain(text, || evaluator.evaluate_statement(&statement)) {
            Ok(outcome) => lines.extend(render(outcome)),
            Err(error) => lines.push(error_line(&error)),
        }
    }
}

/// Runs one statement's evaluation; a panic becomes [`EvalError::Unknown`].
fn contain<F>(text: &str, evaluate: F) -> Result<Outcome, EvalError>
where
    F: FnOnce() -> Result<Outcome, EvalError>,
{
    panic::catch_unwind(AssertUnwindSafe(evaluate)).unwrap_or_else(|_| {
        tracing::error!(statement = text, "statement panicked");
        Err(EvalError::Unknown)
    })
}

fn render(outcome: Outcome) -> Vec<DisplayLine> {
    match outcome {
        Outcome::Assigned { name, value } => {
            let mut lines = vec![DisplayLine::comment(format!("// Assigned to variable: {}", name))];
            if matches!(value, Value::Table(_) | Value::List(_)) {
                lines.push(format_value(&value));
            }
            lines
        }
        Outcome::Defined { name } => {
            vec![DisplayLine::comment(format!("// Function defined: {}", name))]
        }
        Outcome::Value(value) => vec![format_value(&value)],
    }
}

fn error_line(error: &EvalError) -> DisplayLine {
    let message = error.to_string();
    if message.is_empty() {
        DisplayLine::error(UNKNOWN_ERROR)
    } else {
        DisplayLine::error(&message)
    }
}
