use crate::ast::{BinOp, TableLiteral};
use crate::value::QDate;

/// Abstract Syntax Tree node representing a parsed expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    // Literals
    /// Literal number
    ///
    /// # Example
    /// ```text
    /// 42
    /// ```
    Number(f64),

    /// String literal
    Text(String),

    /// Boolean literal
    Boolean(bool),

    /// Date literal
    Date(QDate),

    /// Symbol literal
    Symbol(String),

    /// Vector or general list
    ///
    /// # Examples
    /// ```text
    /// 1 2 3
    /// `AAPL`MSFT
    /// (1; "a"; `b)
    /// ```
    List(Vec<Expr>),

    /// Function literal, kept as source text
    Function(String),

    /// Table literal
    ///
    /// # Example
    /// ```text
    /// ([] sym: `a`b; px: 1 2)
    /// ```
    Table(TableLiteral),

    // References
    /// Variable or column reference
    Name(String),

    // Operations
    /// Unary minus
    Negate(Box<Expr>),

    /// Binary operation (arithmetic, comparison, membership, weighted average)
    BinaryOp {
        op: BinOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Function application, by brackets or by juxtaposition
    ///
    /// # Examples
    /// ```text
    /// sum[price*size]
    /// avg price
    /// calculateVWAP[trade]
    /// ```
    Apply {
        function: String,
        args: Vec<Expr>,
    },
}
