// tests/query_tests.rs

use pretty_assertions::assert_eq;
use qconsole::{
    EvalError, Evaluator, InterpreterConfig, Outcome, SymbolTable, Table, Value,
    value::QDate,
};

fn eval(symbols: &mut SymbolTable, line: &str) -> Result<Value, EvalError> {
    let config = InterpreterConfig::default();
    match Evaluator::new(symbols, &config).evaluate(line)? {
        Outcome::Value(value) | Outcome::Assigned { value, .. } => Ok(value),
        Outcome::Defined { name } => Ok(Value::Function(name)),
    }
}

fn query(line: &str) -> Table {
    let mut symbols = SymbolTable::with_sample_data();
    match eval(&mut symbols, line).unwrap() {
        Value::Table(table) => table,
        other => panic!("expected a table from {:?}, got {:?}", line, other),
    }
}

fn num(n: f64) -> Value {
    Value::Number(n)
}

fn sym(s: &str) -> Value {
    Value::Symbol(s.to_string())
}

fn date(s: &str) -> Value {
    Value::Date(QDate::parse(s).unwrap())
}

// ============================================================================
// Filtering
// ============================================================================

#[test]
fn test_select_everything() {
    let table = query("select from trade");
    assert_eq!(table.columns(), &["date", "sym", "price", "size"]);
    assert_eq!(table.row_count(), 3);
}

#[test]
fn test_where_price() {
    let table = query("select from trade where price > 200");
    assert_eq!(
        table.rows(),
        &[vec![date("2023.10.01"), sym("MSFT"), num(402.15), num(200.0)]]
    );
}

#[test]
fn test_comma_separated_predicates_all_hold() {
    let table = query("select from trade where sym = `AAPL, size > 120");
    assert_eq!(
        table.rows(),
        &[vec![date("2023.10.02"), sym("AAPL"), num(186.40), num(150.0)]]
    );
}

#[test]
fn test_membership_filter() {
    let table = query("select from trade where sym in `MSFT`GOOG");
    assert_eq!(table.row_count(), 1);
}

#[test]
fn test_date_filter() {
    assert_eq!(query("select from trade where date > 2023.10.01").row_count(), 1);
    assert_eq!(query("select from trade where date = 2023.10.01").row_count(), 2);
}

#[test]
fn test_filter_on_row_index() {
    let table = query("select sym from trade where i > 0");
    assert_eq!(table.rows(), &[vec![sym("MSFT")], vec![sym("AAPL")]]);
}

#[test]
fn test_mask_length_must_match() {
    let mut symbols = SymbolTable::with_sample_data();
    let err = eval(&mut symbols, "select from trade where 1 0").unwrap_err();
    assert_eq!(err, EvalError::Length { expected: 3, found: 2 });
}

// ============================================================================
// Projection
// ============================================================================

#[test]
fn test_named_and_computed_columns() {
    let table = query("select sym, notional: price * size from trade");
    assert_eq!(table.columns(), &["sym", "notional"]);
    assert_eq!(
        table.column("notional"),
        Some(vec![num(18525.0), num(80430.0), num(27960.0)])
    );
}

#[test]
fn test_default_column_names() {
    let table = query("select avg price, count i, price + 1 from trade");
    assert_eq!(table.columns(), &["avg_price", "count", "col3"]);
}

#[test]
fn test_aggregates_without_grouping_form_one_row() {
    let table = query("select max price, min size, sum size from trade");
    assert_eq!(table.rows(), &[vec![num(402.15), num(100.0), num(450.0)]]);
}

#[test]
fn test_atoms_broadcast_over_list_projections() {
    let table = query("select price, total: sum size from trade");
    assert_eq!(table.column("total"), Some(vec![num(450.0); 3]));
}

#[test]
fn test_empty_result_keeps_columns() {
    let table = query("select price from trade where price > 1000");
    assert_eq!(table.columns(), &["price"]);
    assert_eq!(table.row_count(), 0);
}

#[test]
fn test_empty_partition_sentinels() {
    let table = query("select sum size, count i, avg price, max price, first sym from trade where price > 1000");
    let row = &table.rows()[0];
    assert_eq!(row[0], num(0.0));
    assert_eq!(row[1], num(0.0));
    for sentinel in &row[2..] {
        assert!(matches!(sentinel, Value::Number(n) if n.is_nan()), "{:?}", sentinel);
    }
}

// ============================================================================
// Grouping
// ============================================================================

#[test]
fn test_group_by_sym() {
    let table = query("select avg price, sum size by sym from trade");
    assert_eq!(table.columns(), &["sym", "avg_price", "sum_size"]);
    assert_eq!(
        table.rows(),
        &[
            vec![sym("AAPL"), num(185.825), num(250.0)],
            vec![sym("MSFT"), num(402.15), num(200.0)],
        ]
    );
}

#[test]
fn test_vwap_projection() {
    let table = query("select vwap: sum[price*size]%sum size by sym from trade");
    assert_eq!(
        table.rows(),
        &[vec![sym("AAPL"), num(185.94)], vec![sym("MSFT"), num(402.15)]]
    );
}

#[test]
fn test_count_by_group() {
    let table = query("select count i by sym from trade");
    assert_eq!(table.columns(), &["sym", "count"]);
    assert_eq!(
        table.rows(),
        &[vec![sym("AAPL"), num(2.0)], vec![sym("MSFT"), num(1.0)]]
    );
}

#[test]
fn test_groups_keep_first_seen_order() {
    let mut symbols = SymbolTable::new();
    eval(&mut symbols, "t: ([] k: `b`a`b`c; v: 1 2 3 4)").unwrap();
    let Value::Table(table) = eval(&mut symbols, "select sum v by k from t").unwrap() else {
        panic!("expected a table");
    };
    assert_eq!(
        table.rows(),
        &[
            vec![sym("b"), num(4.0)],
            vec![sym("a"), num(2.0)],
            vec![sym("c"), num(4.0)],
        ]
    );
}

#[test]
fn test_select_by_keeps_last_row_per_group() {
    let table = query("select by sym from trade");
    assert_eq!(table.columns(), &["sym", "date", "price", "size"]);
    assert_eq!(
        table.rows(),
        &[
            vec![sym("AAPL"), date("2023.10.02"), num(186.40), num(150.0)],
            vec![sym("MSFT"), date("2023.10.01"), num(402.15), num(200.0)],
        ]
    );
}

#[test]
fn test_group_after_filter() {
    let table = query("select sum size by date from trade where size >= 150");
    assert_eq!(
        table.rows(),
        &[
            vec![date("2023.10.01"), num(200.0)],
            vec![date("2023.10.02"), num(150.0)],
        ]
    );
}

// ============================================================================
// Sources
// ============================================================================

#[test]
fn test_unknown_table_gives_placeholder() {
    let table = query("select from quotes");
    assert_eq!(table.columns(), &["result"]);
    assert_eq!(
        table.rows(),
        &[vec![Value::Text("Query result would be shown here".to_string())]]
    );
}

#[test]
fn test_query_on_non_table_fails() {
    let mut symbols = SymbolTable::new();
    eval(&mut symbols, "x: 5").unwrap();
    assert!(matches!(eval(&mut symbols, "select from x"), Err(EvalError::Table(_))));
}

#[test]
fn test_query_result_can_be_assigned_and_queried() {
    let mut symbols = SymbolTable::with_sample_data();
    eval(&mut symbols, "big: select from trade where size > 100").unwrap();
    let Value::Table(table) = eval(&mut symbols, "select sum size from big").unwrap() else {
        panic!("expected a table");
    };
    assert_eq!(table.rows(), &[vec![num(350.0)]]);
}

// ============================================================================
// Table literals and vwap
// ============================================================================

#[test]
fn test_literal_builds_real_columns() {
    let mut symbols = SymbolTable::new();
    let Value::Table(table) = eval(&mut symbols, "([] sym: `x`y; px: 1.5 2.5; venue: `N)").unwrap() else {
        panic!("expected a table");
    };
    assert_eq!(table.columns(), &["sym", "px", "venue"]);
    assert_eq!(table.column("venue"), Some(vec![sym("N"), sym("N")]));
}

#[test]
fn test_keyed_literal_is_flattened() {
    let mut symbols = SymbolTable::new();
    let Value::Table(table) = eval(&mut symbols, "([id: 1 2] name: `a`b)").unwrap() else {
        panic!("expected a table");
    };
    assert_eq!(table.columns(), &["id", "name"]);
}

#[test]
fn test_literal_columns_must_agree() {
    let mut symbols = SymbolTable::new();
    assert_eq!(
        eval(&mut symbols, "([] a: 1 2; b: 1 2 3)").unwrap_err(),
        EvalError::Length { expected: 2, found: 3 }
    );
}

#[test]
fn test_duplicate_columns_rejected() {
    let mut symbols = SymbolTable::new();
    assert!(matches!(eval(&mut symbols, "([] a: 1; a: 2)"), Err(EvalError::Table(_))));
}

#[test]
fn test_vwap_builtin() {
    let mut symbols = SymbolTable::with_sample_data();
    let expected = vec![vec![sym("AAPL"), num(185.94)], vec![sym("MSFT"), num(402.15)]];

    for line in ["vwap[]", "vwap[trade]", "calculateVWAP[trade]", "vwap[`trade]"] {
        let Value::Table(table) = eval(&mut symbols, line).unwrap() else {
            panic!("expected a table from {}", line);
        };
        assert_eq!(table.columns(), &["sym", "vwap"]);
        assert_eq!(table.rows(), expected.as_slice(), "{}", line);
    }
}

#[test]
fn test_vwap_needs_trade_columns() {
    let mut symbols = SymbolTable::new();
    eval(&mut symbols, "t: ([] a: 1 2)").unwrap();
    assert!(matches!(eval(&mut symbols, "vwap[t]"), Err(EvalError::Table(_))));
}
