//! # Abstract syntax tree
//!
//! The interpreter works on one statement line at a time. A line is first
//! classified textually into a [`Statement`] (assignment, function
//! definition, bracketed call, query or bare expression); the payload is then
//! tokenized by the [`Lexer`](crate::lexer::Lexer) and parsed into the nodes
//! defined here.
//!
//! - **[tokens]** - Lexical tokens produced by the lexer
//! - **[expressions]** - Expression nodes (atoms, vectors, names, operators, application)
//! - **[operators]** - Binary operators with conventional infix precedence
//! - **[statements]** - Statement shapes produced by the line classifier
//! - **[query]** - Table literals and `select` queries
//!
//! ## Examples
//!
//! ```text
//! trade: ([] date: 2023.10.01 2023.10.02; sym: `AAPL`MSFT; price: 185.25 402.15; size: 100 200)
//! select avg price, sum size by sym from trade
//! select from trade where price > 200, sym in `MSFT`GOOG
//! sum[price*size] % sum size
//! ```
pub mod expressions;
pub mod operators;
pub mod query;
pub mod statements;
pub mod tokens;

pub use expressions::Expr;
pub use operators::BinOp;
pub use query::{ColumnDef, Projection, SelectQuery, TableLiteral};
pub use statements::Statement;
pub use tokens::Token;
