use std::collections::HashMap;

use crate::value::{QDate, Table, Value};

/// Global scope of one interpreter: name to value, exact-match lookup.
///
/// Entries are created by assignment and replaced by re-assignment; nothing
/// removes them. Each [`Interpreter`](crate::Interpreter) owns its own table.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    entries: HashMap<String, Value>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// A table seeded with the sample `trade` table.
    pub fn with_sample_data() -> Self {
        let mut symbols = SymbolTable::new();
        symbols.insert("trade", Value::Table(sample_trade()));
        symbols
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    /// Binds `name`, returning the value it replaced.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.entries.insert(name.into(), value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bound names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

fn date(year: i32, month: u32, day: u32) -> Value {
    QDate::new(year, month, day).map_or(Value::NULL, Value::Date)
}

fn sym(name: &str) -> Value {
    Value::Symbol(name.to_string())
}

/// The canonical `trade` table: `date, sym, price, size`, three rows.
pub fn sample_trade() -> Table {
    Table::canned(
        &["date", "sym", "price", "size"],
        vec![
            vec![date(2023, 10, 1), sym("AAPL"), Value::Number(185.25), Value::Number(100.0)],
            vec![date(2023, 10, 1), sym("MSFT"), Value::Number(402.15), Value::Number(200.0)],
            vec![date(2023, 10, 2), sym("AAPL"), Value::Number(186.40), Value::Number(150.0)],
        ],
    )
}

/// The employees table from the bundled examples.
pub fn sample_employees() -> Table {
    Table::canned(
        &["name", "age", "department"],
        vec![
            vec![sym("John"), Value::Number(35.0), sym("IT")],
            vec![sym("Emma"), Value::Number(28.0), sym("HR")],
            vec![sym("David"), Value::Number(42.0), sym("Finance")],
        ],
    )
}
