use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::{Decimal, prelude::FromPrimitive, prelude::ToPrimitive};

use crate::{
    ast::{BinOp, Expr, Statement},
    builtins::{self, Builtin},
    config::{EngineMode, InterpreterConfig, Leniency},
    lexer::Lexer,
    parser::{MAX_NESTING, ParseError, Parser},
    symbols::SymbolTable,
    table::{self, legacy},
    value::{Table, Value},
};

/// Digits, decimal points, `+ - * /` and whitespace only.
static ARITHMETIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9+\-*/\s.]+$").expect("arithmetic pattern is a valid regex")
});

/// Errors that can occur while evaluating a statement.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    /// Text that looks like arithmetic but does not evaluate
    #[error("Cannot evaluate expression: {0}")]
    Arithmetic(String),

    /// The statement did not parse
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Reference to a name bound neither in scope nor as a column
    #[error("Undefined name: {0}")]
    UndefinedName(String),

    /// Operation applied to values of the wrong shape
    #[error("Type error: {0}")]
    Type(String),

    /// Vectors whose lengths must agree but do not
    #[error("Length error: expected {expected} items, found {found}")]
    Length { expected: usize, found: usize },

    /// Malformed table (duplicate columns, non-table source)
    #[error("Table error: {0}")]
    Table(String),

    /// A failure that carries no description
    #[error("")]
    Unknown,
}

impl EvalError {
    /// Failures that the echo leniency mode turns into the statement text.
    pub fn is_degradable(&self) -> bool {
        matches!(self, EvalError::Parse(_) | EvalError::UndefinedName(_))
    }
}

/// What a statement did.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A value was stored under `name`
    Assigned { name: String, value: Value },

    /// A function literal was stored under `name`
    Defined { name: String },

    /// A value was computed
    Value(Value),
}

// ========================================
// Classification
// ========================================

/// Decides the statement shape of a line. First match wins:
///
/// 1. assignment: a top-level `:` whose target is an identifier, or a
///    function definition when the target carries `{`;
/// 2. bracketed call: `[` and `]` present and an identifier before the first `[`;
/// 3. query: starts with `select` (case-insensitive);
/// 4. anything else is a bare expression.
///
/// ```
/// use qconsole::{ast::Statement, evaluator::classify};
///
/// assert!(matches!(classify("x: f[1]"), Statement::Assignment { .. }));
/// assert!(matches!(classify("f[1]"), Statement::Call { .. }));
/// assert!(matches!(classify("select vwap: size wavg price from trade"), Statement::Query(_)));
/// ```
pub fn classify(line: &str) -> Statement {
    let line = line.trim();

    if let Some(colon) = top_level_colon(line) {
        let target = line[..colon].trim();
        if let Some(brace) = target.find('{') {
            return Statement::FunctionDefinition {
                name: target[..brace].trim().to_string(),
                source: line.to_string(),
            };
        }
        if is_identifier(target) {
            return Statement::Assignment {
                name: target.to_string(),
                expression: line[colon + 1..].trim().to_string(),
            };
        }
    }

    if let Some(open) = line.find('[')
        && line.contains(']')
        && is_identifier(line[..open].trim())
    {
        return Statement::Call {
            function: line[..open].trim().to_string(),
            source: line.to_string(),
        };
    }

    if line.to_lowercase().starts_with("select") {
        return Statement::Query(line.to_string());
    }

    Statement::Expression(line.to_string())
}

/// Byte offset of the first `:` outside brackets, braces, parens and strings.
fn top_level_colon(line: &str) -> Option<usize> {
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in line.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            ':' if depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
}

pub fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// Parses one complete expression from source text.
pub fn parse_expression(text: &str) -> Result<Expr, ParseError> {
    Parser::new(Lexer::new(text))?.parse()
}

// ========================================
// Statement evaluation
// ========================================

/// Evaluates statements against a borrowed symbol table.
///
/// The evaluator holds the table only for as long as the caller lends it;
/// values outlive a statement only by being inserted.
pub struct Evaluator<'a> {
    symbols: &'a mut SymbolTable,
    config: &'a InterpreterConfig,
    depth: usize,
}

impl<'a> Evaluator<'a> {
    pub fn new(symbols: &'a mut SymbolTable, config: &'a InterpreterConfig) -> Self {
        Evaluator {
            symbols,
            config,
            depth: 0,
        }
    }

    /// Classifies and evaluates one statement line.
    ///
    /// ```
    /// use qconsole::{InterpreterConfig, SymbolTable, Value};
    /// use qconsole::evaluator::{Evaluator, Outcome};
    ///
    /// let mut symbols = SymbolTable::new();
    /// let config = InterpreterConfig::default();
    /// let mut evaluator = Evaluator::new(&mut symbols, &config);
    ///
    /// evaluator.evaluate("x: 5").unwrap();
    /// assert_eq!(evaluator.evaluate("x * 2").unwrap(), Outcome::Value(Value::Number(10.0)));
    /// ```
    pub fn evaluate(&mut self, line: &str) -> Result<Outcome, EvalError> {
        self.evaluate_statement(&classify(line))
    }

    pub fn evaluate_statement(&mut self, statement: &Statement) -> Result<Outcome, EvalError> {
        tracing::debug!(?statement, "evaluating statement");

        match statement {
            Statement::Assignment { name, expression } => {
                let value = self.evaluate_value(expression)?;
                self.symbols.insert(name.clone(), value.clone());
                if matches!(value, Value::Function(_)) {
                    Ok(Outcome::Defined { name: name.clone() })
                } else {
                    Ok(Outcome::Assigned {
                        name: name.clone(),
                        value,
                    })
                }
            }
            Statement::FunctionDefinition { name, source } => {
                self.symbols.insert(name.clone(), Value::Function(source.clone()));
                Ok(Outcome::Defined { name: name.clone() })
            }
            Statement::Call { function, source } => {
                self.evaluate_call(function, source).map(Outcome::Value)
            }
            Statement::Query(text) => {
                let result = table::run_query(text, &self.context());
                self.degrade(text, result.map(Value::Table)).map(Outcome::Value)
            }
            Statement::Expression(text) => self.evaluate_bare(text).map(Outcome::Value),
        }
    }

    /// Right-hand sides go through the classifier again, so `t: select ...`
    /// and chained `a: b: 1` work.
    fn evaluate_value(&mut self, text: &str) -> Result<Value, EvalError> {
        if self.depth >= MAX_NESTING {
            return Err(ParseError::TooDeep { limit: MAX_NESTING }.into());
        }
        self.depth += 1;
        let outcome = self.evaluate(text);
        self.depth -= 1;

        match outcome? {
            Outcome::Assigned { value, .. } => Ok(value),
            Outcome::Defined { name } => self
                .symbols
                .get(&name)
                .cloned()
                .ok_or(EvalError::UndefinedName(name)),
            Outcome::Value(value) => Ok(value),
        }
    }

    fn context(&self) -> EvalContext<'_> {
        EvalContext::new(self.symbols, self.config.mode)
    }

    fn evaluate_call(&mut self, function: &str, source: &str) -> Result<Value, EvalError> {
        if self.config.mode == EngineMode::Legacy && function.contains("calculateVWAP") {
            return Ok(Value::Table(legacy::vwap()));
        }

        let result = parse_expression(source)
            .map_err(EvalError::from)
            .and_then(|expr| {
                let ctx = self.context();
                match expr {
                    Expr::Apply { function, args } => ctx.apply_call(&function, &args),
                    other => ctx.eval(&other),
                }
            });
        self.degrade(source, result)
    }

    fn evaluate_bare(&mut self, text: &str) -> Result<Value, EvalError> {
        if text.starts_with("([") {
            let result = table::build_table(text, &self.context()).map(Value::Table);
            return self.degrade(text, result);
        }

        if ARITHMETIC.is_match(text) {
            let expr = parse_expression(text).map_err(|e| {
                tracing::debug!(error = %e, "arithmetic did not parse");
                EvalError::Arithmetic(text.to_string())
            })?;
            return self.context().eval(&expr);
        }

        let result = parse_expression(text)
            .map_err(EvalError::from)
            .and_then(|expr| self.context().eval(&expr));
        self.degrade(text, result)
    }

    /// Echo leniency: unparseable input comes back as its own text.
    fn degrade(&self, text: &str, result: Result<Value, EvalError>) -> Result<Value, EvalError> {
        match result {
            Err(e) if e.is_degradable() && self.config.leniency == Leniency::Echo => {
                tracing::warn!(error = %e, statement = text, "echoing statement that did not evaluate");
                Ok(Value::Text(text.to_string()))
            }
            other => other,
        }
    }
}

// ========================================
// Expression evaluation
// ========================================

/// The rows of a table that column names resolve against inside a query.
#[derive(Debug, Clone, Copy)]
pub struct ColumnScope<'a> {
    pub table: &'a Table,
    pub rows: &'a [usize],
}

/// Name resolution for expression evaluation: the columns of the current
/// partition (inside a query), then the virtual row index `i`, then the
/// symbol table.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    symbols: &'a SymbolTable,
    mode: EngineMode,
    columns: Option<ColumnScope<'a>>,
}

impl<'a> EvalContext<'a> {
    pub fn new(symbols: &'a SymbolTable, mode: EngineMode) -> Self {
        EvalContext {
            symbols,
            mode,
            columns: None,
        }
    }

    /// Create a context in which column names resolve to `rows` of `table`
    pub fn with_columns<'b>(&self, table: &'b Table, rows: &'b [usize]) -> EvalContext<'b>
    where
        'a: 'b,
    {
        EvalContext {
            symbols: self.symbols,
            mode: self.mode,
            columns: Some(ColumnScope { table, rows }),
        }
    }

    pub fn symbols(&self) -> &'a SymbolTable {
        self.symbols
    }

    pub fn mode(&self) -> EngineMode {
        self.mode
    }

    pub fn resolve(&self, name: &str) -> Result<Value, EvalError> {
        if let Some(scope) = &self.columns {
            if let Some(index) = scope.table.column_index(name) {
                return Ok(Value::List(scope.table.column_values(index, scope.rows)));
            }
            if name == "i" {
                return Ok(Value::List(
                    scope.rows.iter().map(|&r| Value::Number(r as f64)).collect(),
                ));
            }
        }

        self.symbols
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::UndefinedName(name.to_string()))
    }

    pub fn eval(&self, expr: &Expr) -> Result<Value, EvalError> {
        match expr {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Text(s) => Ok(Value::Text(s.clone())),
            Expr::Boolean(b) => Ok(Value::Boolean(*b)),
            Expr::Date(d) => Ok(Value::Date(*d)),
            Expr::Symbol(s) => Ok(Value::Symbol(s.clone())),
            Expr::List(items) => {
                let list = Value::List(
                    items
                        .iter()
                        .map(|item| self.eval(item))
                        .collect::<Result<Vec<_>, _>>()?,
                );
                if list.nesting() > MAX_NESTING {
                    return Err(ParseError::TooDeep { limit: MAX_NESTING }.into());
                }
                Ok(list)
            }
            Expr::Function(source) => Ok(Value::Function(source.clone())),
            Expr::Table(literal) => table::table_from_literal(literal, self).map(Value::Table),
            Expr::Name(name) => self.resolve(name),
            Expr::Negate(operand) => negate(&self.eval(operand)?),
            Expr::BinaryOp { op, left, right } => {
                let left_val = self.eval(left)?;
                let right_val = self.eval(right)?;
                apply_binop(*op, &left_val, &right_val)
            }
            Expr::Apply { function, args } => self.apply(function, args, false),
        }
    }

    /// Application from a bracketed-call statement: builtins also match by
    /// substring, and unknown names produce a placeholder instead of an error.
    pub fn apply_call(&self, function: &str, args: &[Expr]) -> Result<Value, EvalError> {
        self.apply(function, args, true)
    }

    fn apply(&self, function: &str, args: &[Expr], lenient: bool) -> Result<Value, EvalError> {
        let values = args
            .iter()
            .map(|arg| self.eval(arg))
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(builtin) = Builtin::lookup(function) {
            return builtins::call(builtin, &values, self);
        }

        // Bound lists and tables are indexed before any fuzzy builtin match.
        let bound = self.resolve(function);
        match &bound {
            Ok(Value::List(items)) => return index_list(items, &values),
            Ok(Value::Table(table)) => return index_table(table, &values),
            _ => {}
        }

        if lenient && let Some(builtin) = Builtin::lookup_fuzzy(function) {
            tracing::debug!(function, builtin = builtin.name(), "resolved call by substring");
            return builtins::call(builtin, &values, self);
        }

        match bound {
            Ok(Value::Function(_)) => {
                tracing::warn!(function, "user functions are stored but not executed");
                Ok(function_placeholder())
            }
            Ok(other) => Err(EvalError::Type(format!(
                "{} is a {}, not a function",
                function,
                other.type_name()
            ))),
            Err(EvalError::UndefinedName(_)) if lenient => {
                tracing::warn!(function, "unknown function");
                Ok(function_placeholder())
            }
            Err(e) => Err(e),
        }
    }
}

fn function_placeholder() -> Value {
    Value::Text("Function executed".to_string())
}

fn index_list(items: &[Value], args: &[Value]) -> Result<Value, EvalError> {
    match args {
        [Value::List(indices)] => indices
            .iter()
            .map(|index| index_list(items, std::slice::from_ref(index)))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        [index] => {
            let position = index
                .as_number()
                .filter(|n| n.fract() == 0.0 && *n >= 0.0)
                .ok_or_else(|| {
                    EvalError::Type(format!("cannot index a list with a {}", index.type_name()))
                })?;
            Ok(items.get(position as usize).cloned().unwrap_or(Value::NULL))
        }
        _ => Err(EvalError::Type(format!(
            "list indexing takes 1 argument, got {}",
            args.len()
        ))),
    }
}

fn index_table(table: &Table, args: &[Value]) -> Result<Value, EvalError> {
    match args {
        [Value::Symbol(column)] => table
            .column(column)
            .map(Value::List)
            .ok_or_else(|| EvalError::Table(format!("no column '{}'", column))),
        [other] => Err(EvalError::Type(format!(
            "cannot index a table with a {}",
            other.type_name()
        ))),
        _ => Err(EvalError::Type(format!(
            "table indexing takes 1 argument, got {}",
            args.len()
        ))),
    }
}

// ========================================
// Operators
// ========================================

fn negate(value: &Value) -> Result<Value, EvalError> {
    match value {
        Value::List(items) => items
            .iter()
            .map(negate)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        other => match other.as_number() {
            Some(n) => Ok(Value::Number(-n)),
            None => Err(EvalError::Type(format!("Cannot negate {}", other.type_name()))),
        },
    }
}

/// Applies a binary operator, broadcasting atoms over lists and pairing
/// lists element-wise.
pub fn apply_binop(op: BinOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    match op {
        BinOp::In => return Ok(membership(left, right)),
        BinOp::WeightedAvg => return builtins::weighted_avg(left, right),
        _ => {}
    }

    match (left, right) {
        (Value::Table(_), _) | (_, Value::Table(_)) => Err(EvalError::Type(format!(
            "Cannot apply {} to {} and {}",
            op.symbol(),
            left.type_name(),
            right.type_name()
        ))),
        (Value::List(a), Value::List(b)) => {
            if a.len() != b.len() {
                return Err(EvalError::Length {
                    expected: a.len(),
                    found: b.len(),
                });
            }
            a.iter()
                .zip(b)
                .map(|(x, y)| apply_binop(op, x, y))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List)
        }
        (Value::List(a), b) => a
            .iter()
            .map(|x| apply_binop(op, x, b))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        (a, Value::List(b)) => b
            .iter()
            .map(|y| apply_binop(op, a, y))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        (a, b) => apply_atom_binop(op, a, b),
    }
}

fn apply_atom_binop(op: BinOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    match op {
        BinOp::Add | BinOp::Subtract | BinOp::Multiply | BinOp::Divide => {
            match (left.as_number(), right.as_number()) {
                (Some(a), Some(b)) => Ok(Value::Number(arithmetic(op, a, b))),
                _ => Err(EvalError::Type(format!(
                    "Cannot apply {} to {} and {}",
                    op.symbol(),
                    left.type_name(),
                    right.type_name()
                ))),
            }
        }
        BinOp::Equal => Ok(Value::Boolean(equals(left, right))),
        BinOp::NotEqual => Ok(Value::Boolean(!equals(left, right))),
        BinOp::LessThan | BinOp::GreaterThan | BinOp::LessEqual | BinOp::GreaterEqual => {
            compare(op, left, right).map(Value::Boolean)
        }
        BinOp::In | BinOp::WeightedAvg => unreachable!("handled in apply_binop"),
    }
}

/// Exact decimal arithmetic when both operands convert and the result agrees
/// with the float result; plain `f64` otherwise. Division by zero gives q's
/// infinities and nulls.
///
/// The decimal result is preferred only when it lies within a relative
/// `1e-9` of the float result, so a float result of zero or a subnormal is
/// returned as computed.
pub fn arithmetic(op: BinOp, a: f64, b: f64) -> f64 {
    let float = match op {
        BinOp::Add => a + b,
        BinOp::Subtract => a - b,
        BinOp::Multiply => a * b,
        _ => a / b,
    };

    if let Some(ad) = Decimal::from_f64(a)
        && let Some(bd) = Decimal::from_f64(b)
    {
        let exact = match op {
            BinOp::Add => ad.checked_add(bd),
            BinOp::Subtract => ad.checked_sub(bd),
            BinOp::Multiply => ad.checked_mul(bd),
            _ => ad.checked_div(bd),
        };
        if let Some(r) = exact.and_then(|d| d.to_f64())
            && (r - float).abs() <= 1e-9 * float.abs()
        {
            return r;
        }
    }
    float
}

fn equals(left: &Value, right: &Value) -> bool {
    match (left.as_number(), right.as_number()) {
        (Some(a), Some(b)) => a == b,
        _ => left.same_key(right),
    }
}

fn compare(op: BinOp, left: &Value, right: &Value) -> Result<bool, EvalError> {
    use std::cmp::Ordering::*;

    if let (Some(a), Some(b)) = (left.as_number(), right.as_number()) {
        return Ok(match op {
            BinOp::LessThan => a < b,
            BinOp::GreaterThan => a > b,
            BinOp::LessEqual => a <= b,
            _ => a >= b,
        });
    }

    let ordering = compare_values(left, right).ok_or_else(|| {
        EvalError::Type(format!(
            "Cannot compare {} {} {}",
            left.type_name(),
            op.symbol(),
            right.type_name()
        ))
    })?;
    Ok(match op {
        BinOp::LessThan => ordering == Less,
        BinOp::GreaterThan => ordering == Greater,
        BinOp::LessEqual => ordering != Greater,
        _ => ordering != Less,
    })
}

/// Ordering between atoms of comparable kinds.
pub fn compare_values(a: &Value, b: &Value) -> Option<std::cmp::Ordering> {
    match (a, b) {
        (Value::Date(x), Value::Date(y)) => Some(x.cmp(y)),
        (Value::Text(x), Value::Text(y)) | (Value::Symbol(x), Value::Symbol(y)) => Some(x.cmp(y)),
        _ => a.as_number()?.partial_cmp(&b.as_number()?),
    }
}

fn membership(left: &Value, right: &Value) -> Value {
    let candidates = match right {
        Value::List(items) => items.as_slice(),
        other => std::slice::from_ref(other),
    };
    match left {
        Value::List(items) => Value::List(
            items
                .iter()
                .map(|item| Value::Boolean(candidates.iter().any(|c| equals(item, c))))
                .collect(),
        ),
        atom => Value::Boolean(candidates.iter().any(|c| equals(atom, c))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_precedence() {
        assert_eq!(
            classify("x: f[1]"),
            Statement::Assignment {
                name: "x".into(),
                expression: "f[1]".into()
            }
        );
        assert_eq!(
            classify("f{x}: x*x"),
            Statement::FunctionDefinition {
                name: "f".into(),
                source: "f{x}: x*x".into()
            }
        );
        assert!(matches!(classify("([] a: 1 2)"), Statement::Expression(_)));
        assert!(matches!(classify("SELECT from trade"), Statement::Query(_)));
        assert!(matches!(classify("sum[1 2] + 3"), Statement::Call { .. }));
    }

    #[test]
    fn test_colon_inside_brackets_is_not_assignment() {
        assert!(matches!(classify("f: {[x] y: x}"), Statement::Assignment { .. }));
        assert!(matches!(classify(r#""a:b""#), Statement::Expression(_)));
    }

    #[test]
    fn test_arithmetic_is_exact_where_possible() {
        assert_eq!(arithmetic(BinOp::Add, 0.1, 0.2), 0.3);
        assert_eq!(arithmetic(BinOp::Multiply, 1e-30, 1.0), 1e-30);
        assert_eq!(arithmetic(BinOp::Divide, 1.0, 0.0), f64::INFINITY);
        assert!(arithmetic(BinOp::Divide, 0.0, 0.0).is_nan());
        assert_eq!(arithmetic(BinOp::Multiply, 1e-200, 1e-200), 0.0);
    }

    #[test]
    fn test_broadcast() {
        let list = Value::List(vec![Value::Number(1.0), Value::Number(2.0)]);
        assert_eq!(
            apply_binop(BinOp::Multiply, &list, &Value::Number(10.0)).unwrap(),
            Value::List(vec![Value::Number(10.0), Value::Number(20.0)])
        );
        let short = Value::List(vec![Value::Number(1.0)]);
        assert!(matches!(
            apply_binop(BinOp::Add, &list, &short),
            Err(EvalError::Length { expected: 2, found: 1 })
        ));
    }

    #[test]
    fn test_membership() {
        let syms = Value::List(vec![Value::Symbol("a".into()), Value::Symbol("b".into())]);
        assert_eq!(
            apply_binop(BinOp::In, &Value::Symbol("b".into()), &syms).unwrap(),
            Value::Boolean(true)
        );
    }
}
