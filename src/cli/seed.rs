//! JSON seeding of the symbol table.
//!
//! The seed document is an object whose keys become names. A value shaped
//! `{"columns": [...], "rows": [[...], ...]}` becomes a table; anything else
//! converts element-wise. Strings starting with a backtick become symbols,
//! `YYYY.MM.DD` strings become dates.

use super::CliError;
use crate::{
    SymbolTable,
    value::{QDate, Table, Value},
};

/// Convert a JSON value to an interpreter value
pub fn json_to_value(v: serde_json::Value) -> Result<Value, CliError> {
    match v {
        serde_json::Value::Null => Ok(Value::NULL),
        serde_json::Value::Bool(b) => Ok(Value::Boolean(b)),
        serde_json::Value::Number(n) => n
            .as_f64()
            .map(Value::Number)
            .ok_or_else(|| CliError::Seed(format!("number {} is out of range", n))),
        serde_json::Value::String(s) => Ok(string_to_value(s)),
        serde_json::Value::Array(arr) => arr
            .into_iter()
            .map(json_to_value)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        serde_json::Value::Object(obj) => {
            let mut obj = obj;
            match (obj.remove("columns"), obj.remove("rows")) {
                (Some(columns), Some(rows)) if obj.is_empty() => json_to_table(columns, rows).map(Value::Table),
                _ => Err(CliError::Seed(
                    "objects must be tables of the form {\"columns\": [...], \"rows\": [[...]]}".to_string(),
                )),
            }
        }
    }
}

fn string_to_value(s: String) -> Value {
    if let Some(name) = s.strip_prefix('`') {
        return Value::Symbol(name.to_string());
    }
    match QDate::parse(&s) {
        Some(date) => Value::Date(date),
        None => Value::Text(s),
    }
}

fn json_to_table(columns: serde_json::Value, rows: serde_json::Value) -> Result<Table, CliError> {
    let serde_json::Value::Array(columns) = columns else {
        return Err(CliError::Seed("\"columns\" must be an array of names".to_string()));
    };
    let columns = columns
        .into_iter()
        .map(|column| match column {
            serde_json::Value::String(name) => Ok(name),
            other => Err(CliError::Seed(format!("column name {} is not a string", other))),
        })
        .collect::<Result<Vec<_>, _>>()?;

    let serde_json::Value::Array(rows) = rows else {
        return Err(CliError::Seed("\"rows\" must be an array of rows".to_string()));
    };
    let rows = rows
        .into_iter()
        .map(|row| match json_to_value(row)? {
            Value::List(cells) => Ok(cells),
            other => Err(CliError::Seed(format!("row {} is not an array", other.as_string()))),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Table::new(columns, rows).map_err(|e| CliError::Seed(e.to_string()))
}

/// Binds every entry of a seed document, returning how many names were bound.
pub fn seed_symbols(symbols: &mut SymbolTable, document: &str) -> Result<usize, CliError> {
    let serde_json::Value::Object(entries) = serde_json::from_str::<serde_json::Value>(document)? else {
        return Err(CliError::Seed("seed must be a JSON object".to_string()));
    };

    let count = entries.len();
    for (name, value) in entries {
        let value = json_to_value(value)?;
        tracing::debug!(%name, kind = value.type_name(), "seeding symbol");
        symbols.insert(name, value);
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalars_and_lists() {
        assert_eq!(json_to_value(json!(1.5)).unwrap(), Value::Number(1.5));
        assert_eq!(json_to_value(json!("`IBM")).unwrap(), Value::Symbol("IBM".into()));
        assert_eq!(json_to_value(json!("hello")).unwrap(), Value::Text("hello".into()));
        assert_eq!(
            json_to_value(json!([1, 2])).unwrap(),
            Value::List(vec![Value::Number(1.0), Value::Number(2.0)])
        );
    }

    #[test]
    fn test_seed_table() {
        let mut symbols = SymbolTable::new();
        let bound = seed_symbols(
            &mut symbols,
            r#"{"quotes": {"columns": ["sym", "bid"], "rows": [["`AAPL", 185.1], ["`MSFT", 401.9]]}, "limit": 3}"#,
        )
        .unwrap();
        assert_eq!(bound, 2);
        match symbols.get("quotes") {
            Some(Value::Table(table)) => {
                assert_eq!(table.columns(), &["sym", "bid"]);
                assert_eq!(table.row_count(), 2);
            }
            other => panic!("expected a table, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_ragged_rows() {
        let mut symbols = SymbolTable::new();
        let result = seed_symbols(&mut symbols, r#"{"t": {"columns": ["a", "b"], "rows": [[1]]}}"#);
        assert!(matches!(result, Err(CliError::Seed(_))));
    }

    #[test]
    fn test_rejects_non_object_document() {
        let mut symbols = SymbolTable::new();
        assert!(matches!(seed_symbols(&mut symbols, "[1, 2]"), Err(CliError::Seed(_))));
    }
}
