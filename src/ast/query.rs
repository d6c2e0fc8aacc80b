use crate::ast::Expr;

/// One `name: expr` column of a table literal.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDef {
    pub name: String,
    pub value: Expr,
}

/// Table literal `([keys] col: expr; ...)`.
///
/// Key columns are kept apart by the parser; the engine flattens them into
/// the leading columns of an unkeyed table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableLiteral {
    pub keys: Vec<ColumnDef>,
    pub columns: Vec<ColumnDef>,
}

/// A projected column, optionally named (`vwap: size wavg price`).
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub name: Option<String>,
    pub expr: Expr,
}

/// `select [projections] [by groups] from table [where filters]`
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    /// Empty means every column
    pub projections: Vec<Projection>,

    /// Grouping expressions
    pub by: Vec<Projection>,

    /// Source table name
    pub from: String,

    /// Comma-separated predicates, all of which must hold
    pub filters: Vec<Expr>,
}
