//! An interpreter for a small q-like language of lists and tables.
//!
//! Source text is split into statements, each statement is classified
//! (assignment, function definition, bracketed call, `select` query or bare
//! expression) and evaluated against one mutable [`SymbolTable`]. Results are
//! rendered into styled [`DisplayLine`]s.
//!
//! ```
//! use qconsole::{Interpreter, InterpreterConfig};
//!
//! let mut q = Interpreter::with_sample_data(InterpreterConfig::default());
//! let lines = q.run("select avg price by sym from trade");
//! assert_eq!(lines[0].to_string(), "q) select avg price by sym from trade");
//! assert!(lines[1].text.contains("AAPL 185.825"));
//! ```

pub mod ast;
pub mod builtins;
pub mod config;
pub mod evaluator;
pub mod interpreter;
pub mod lexer;
pub mod output;
pub mod parser;
pub mod source;
pub mod symbols;
pub mod table;
pub mod value;

#[cfg(feature = "cli")]
pub mod cli;

pub use ast::{BinOp, Expr, SelectQuery, Statement, Token};
pub use config::{EngineMode, InterpreterConfig, Leniency, LineJoining};
pub use evaluator::{EvalContext, EvalError, Evaluator, Outcome};
pub use interpreter::Interpreter;
pub use lexer::{LexError, Lexer};
pub use output::{DisplayLine, Style};
pub use parser::{ParseError, Parser};
pub use symbols::SymbolTable;
pub use value::{QDate, Table, Value};
