use std::fmt;

use crate::evaluator::EvalError;

/// A value produced by the interpreter.
///
/// The set of shapes is closed: every consumer (evaluator, table engine,
/// formatter) matches on it exhaustively.
///
/// # Examples
///
/// ```
/// use qconsole::Value;
///
/// let price = Value::Number(185.25);
/// let sym = Value::Symbol("AAPL".to_string());
/// let sizes = Value::List(vec![Value::Number(100.0), Value::Number(200.0)]);
///
/// assert_eq!(price.type_name(), "number");
/// assert_eq!(sym.as_string(), "AAPL");
/// assert_eq!(sizes.count(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Floating-point number. NaN is q's float null (`0n`).
    Number(f64),

    /// Character string, rendered quoted when standalone
    Text(String),

    /// Boolean (`1b` / `0b`)
    Boolean(bool),

    /// Calendar date (`2023.10.01`)
    Date(QDate),

    /// Interned name-like atom (`` `AAPL ``)
    Symbol(String),

    /// Ordered, possibly heterogeneous sequence
    List(Vec<Value>),

    /// Named columns with row-aligned data
    Table(Table),

    /// Source text of a function literal. Stored, never executed.
    Function(String),
}

impl Value {
    /// Float null, the sentinel returned by reducers over no data.
    pub const NULL: Value = Value::Number(f64::NAN);

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Text(_) => "string",
            Value::Boolean(_) => "boolean",
            Value::Date(_) => "date",
            Value::Symbol(_) => "symbol",
            Value::List(_) => "list",
            Value::Table(_) => "table",
            Value::Function(_) => "function",
        }
    }

    /// True for everything that is not a list or a table.
    pub fn is_atom(&self) -> bool {
        !matches!(self, Value::List(_) | Value::Table(_))
    }

    /// Levels of list and table wrapping: 0 for atoms.
    pub fn nesting(&self) -> usize {
        match self {
            Value::List(items) => 1 + items.iter().map(Value::nesting).max().unwrap_or(0),
            Value::Table(table) => {
                1 + table
                    .rows()
                    .iter()
                    .flatten()
                    .map(Value::nesting)
                    .max()
                    .unwrap_or(0)
            }
            _ => 0,
        }
    }

    /// Number of items: list length, table row count, 1 for atoms.
    pub fn count(&self) -> usize {
        match self {
            Value::List(items) => items.len(),
            Value::Table(table) => table.row_count(),
            _ => 1,
        }
    }

    /// Numeric view; booleans count as 1 and 0 like in q.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Boolean(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::Text(s) | Value::Symbol(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Table(table) => table.row_count() > 0,
            Value::Date(_) | Value::Function(_) => true,
        }
    }

    /// Equality used for grouping and membership: like `==`, but float
    /// nulls are equal to each other.
    pub fn same_key(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_key(y))
            }
            _ => self == other,
        }
    }

    /// Bare text of an atom as it appears in a table cell.
    pub fn as_string(&self) -> String {
        match self {
            Value::Number(n) => format_number(*n),
            Value::Text(s) => s.clone(),
            Value::Boolean(b) => (if *b { "1b" } else { "0b" }).to_string(),
            Value::Date(d) => d.to_string(),
            Value::Symbol(s) => s.clone(),
            Value::Function(source) => source.clone(),
            Value::List(items) => items
                .iter()
                .map(Value::as_string)
                .collect::<Vec<_>>()
                .join(" "),
            Value::Table(table) => format!("+[{}]", table.columns().join(" ")),
        }
    }
}

/// Render a float the way the console shows it: q's `0n`/`0w` for nulls and
/// infinities, shortest round-trip text otherwise.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "0n".to_string()
    } else if n.is_infinite() {
        (if n > 0.0 { "0w" } else { "-0w" }).to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else {
        n.to_string()
    }
}

// ========================================
// Dates
// ========================================

/// A calendar date written `YYYY.MM.DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QDate {
    pub year: i32,
    pub month: u32,
    pub day: u32,
}

impl QDate {
    /// Returns `None` for dates that do not exist (`2023.02.30`).
    pub fn new(year: i32, month: u32, day: u32) -> Option<Self> {
        if !(1..=12).contains(&month) || day == 0 || day > days_in_month(year, month) {
            return None;
        }
        Some(QDate { year, month, day })
    }

    /// Parses the dotted literal form.
    ///
    /// ```
    /// use qconsole::value::QDate;
    ///
    /// let d = QDate::parse("2023.10.01").unwrap();
    /// assert_eq!((d.year, d.month, d.day), (2023, 10, 1));
    /// assert!(QDate::parse("2023.13.01").is_none());
    /// ```
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.split('.');
        let (year, month, day) = (parts.next()?, parts.next()?, parts.next()?);
        if parts.next().is_some() || year.len() != 4 || month.len() != 2 || day.len() != 2 {
            return None;
        }
        QDate::new(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
    }
}

fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        2 if (year % 4 == 0 && year % 100 != 0) || year % 400 == 0 => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

impl fmt::Display for QDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}.{:02}.{:02}", self.year, self.month, self.day)
    }
}

// ========================================
// Tables
// ========================================

/// Ordered, uniquely named columns over row-major data.
///
/// Every row holds exactly one value per column; [`Table::new`] and
/// [`Table::from_columns`] are the only ways to build one and both check it.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self, EvalError> {
        for (i, name) in columns.iter().enumerate() {
            if columns[..i].contains(name) {
                return Err(EvalError::Table(format!("duplicate column '{}'", name)));
            }
        }
        if let Some(row) = rows.iter().find(|row| row.len() != columns.len()) {
            return Err(EvalError::Length {
                expected: columns.len(),
                found: row.len(),
            });
        }
        Ok(Table { columns, rows })
    }

    /// Builds a table from column vectors, which must all have the same length.
    pub fn from_columns(columns: Vec<(String, Vec<Value>)>) -> Result<Self, EvalError> {
        let height = columns.first().map_or(0, |(_, values)| values.len());
        if let Some((_, values)) = columns.iter().find(|(_, values)| values.len() != height) {
            return Err(EvalError::Length {
                expected: height,
                found: values.len(),
            });
        }

        let mut names = Vec::with_capacity(columns.len());
        let mut rows = vec![Vec::with_capacity(columns.len()); height];
        for (name, values) in columns {
            names.push(name);
            for (row, value) in rows.iter_mut().zip(values) {
                row.push(value);
            }
        }
        Table::new(names, rows)
    }

    /// Fixed tables whose shape is known to be valid.
    pub(crate) fn canned(columns: &[&str], rows: Vec<Vec<Value>>) -> Self {
        debug_assert!(rows.iter().all(|row| row.len() == columns.len()));
        Table {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// The values of one column, restricted to the given rows.
    pub fn column_values(&self, index: usize, rows: &[usize]) -> Vec<Value> {
        rows.iter().map(|&r| self.rows[r][index].clone()).collect()
    }

    /// A column as a vector over every row.
    pub fn column(&self, name: &str) -> Option<Vec<Value>> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().map(|row| row[index].clone()).collect())
    }

    /// A new table keeping only the given rows, in the given order.
    pub fn select_rows(&self, rows: &[usize]) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: rows.iter().map(|&r| self.rows[r].clone()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> Value {
        Value::Number(n)
    }

    #[test]
    fn test_table_rejects_ragged_rows() {
        let result = Table::new(
            vec!["a".into(), "b".into()],
            vec![vec![num(1.0), num(2.0)], vec![num(3.0)]],
        );
        assert!(matches!(result, Err(EvalError::Length { expected: 2, found: 1 })));
    }

    #[test]
    fn test_table_rejects_duplicate_columns() {
        let result = Table::new(vec!["a".into(), "a".into()], vec![]);
        assert!(matches!(result, Err(EvalError::Table(_))));
    }

    #[test]
    fn test_from_columns_transposes() {
        let table = Table::from_columns(vec![
            ("a".into(), vec![num(1.0), num(2.0)]),
            ("b".into(), vec![num(3.0), num(4.0)]),
        ])
        .unwrap();
        assert_eq!(table.rows(), &[vec![num(1.0), num(3.0)], vec![num(2.0), num(4.0)]]);
        assert_eq!(table.column("b"), Some(vec![num(3.0), num(4.0)]));
    }

    #[test]
    fn test_format_number_specials() {
        assert_eq!(format_number(14.0), "14");
        assert_eq!(format_number(185.825), "185.825");
        assert_eq!(format_number(f64::NAN), "0n");
        assert_eq!(format_number(f64::INFINITY), "0w");
        assert_eq!(format_number(f64::NEG_INFINITY), "-0w");
        assert_eq!(format_number(-0.0), "0");
    }

    #[test]
    fn test_leap_years() {
        assert!(QDate::parse("2024.02.29").is_some());
        assert!(QDate::parse("2023.02.29").is_none());
        assert!(QDate::parse("1900.02.29").is_none());
        assert!(QDate::parse("2000.02.29").is_some());
    }

    #[test]
    fn test_same_key_treats_nulls_as_equal() {
        assert!(Value::NULL.same_key(&Value::NULL));
        assert_ne!(Value::NULL, Value::NULL);
    }
}
