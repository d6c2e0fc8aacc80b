//! Table literals and `select` queries.
//!
//! Queries run in three stages: filter the source rows, partition them by
//! the `by` expressions, then evaluate each projection once per partition.
//! Expressions see whole column vectors, so `avg price` inside a query is
//! the builtin applied to the partition's `price` values.

pub mod legacy;

use crate::{
    ast::{BinOp, Expr, Projection, SelectQuery, TableLiteral},
    config::EngineMode,
    evaluator::{EvalContext, EvalError, parse_expression},
    lexer::Lexer,
    parser::Parser,
    value::{Table, Value},
};

/// Builds the table a `([...] ...)` literal describes.
pub fn build_table(literal: &str, ctx: &EvalContext<'_>) -> Result<Table, EvalError> {
    if ctx.mode() == EngineMode::Legacy {
        return Ok(legacy::build_table(literal));
    }

    match ctx.eval(&parse_expression(literal)?)? {
        Value::Table(table) => Ok(table),
        other => Err(EvalError::Table(format!(
            "expected a table literal, got a {}",
            other.type_name()
        ))),
    }
}

pub fn table_from_literal(literal: &TableLiteral, ctx: &EvalContext<'_>) -> Result<Table, EvalError> {
    let columns = literal
        .keys
        .iter()
        .chain(&literal.columns)
        .map(|def| Ok((def.name.clone(), ctx.eval(&def.value)?)))
        .collect::<Result<Vec<_>, EvalError>>()?;

    assemble(columns)
}

/// Turns named column results into a table. Lists give one value per row;
/// atoms are repeated to the height of the first list, or form a single row.
fn assemble(columns: Vec<(String, Value)>) -> Result<Table, EvalError> {
    let height = columns
        .iter()
        .find_map(|(_, value)| match value {
            Value::List(items) => Some(items.len()),
            _ => None,
        })
        .unwrap_or(1);

    let vectors = columns
        .into_iter()
        .map(|(name, value)| match value {
            Value::List(items) => Ok((name, items)),
            Value::Table(_) => Err(EvalError::Type(format!("column '{}' cannot hold a table", name))),
            atom => Ok((name, vec![atom; height])),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Table::from_columns(vectors)
}

/// One-row table returned for queries against tables that do not exist.
pub fn placeholder() -> Table {
    Table::canned(
        &["result"],
        vec![vec![Value::Text("Query result would be shown here".to_string())]],
    )
}

/// Parses and executes a `select` statement.
pub fn run_query(text: &str, ctx: &EvalContext<'_>) -> Result<Table, EvalError> {
    if ctx.mode() == EngineMode::Legacy {
        return Ok(legacy::run_query(text));
    }

    let query = Parser::new(Lexer::new(text))?.parse_select()?;

    match ctx.symbols().get(&query.from) {
        Some(Value::Table(source)) => execute_select(&query, source, ctx),
        Some(other) => Err(EvalError::Table(format!(
            "'{}' is a {}, not a table",
            query.from,
            other.type_name()
        ))),
        None => {
            tracing::warn!(table = %query.from, "query against unknown table");
            Ok(placeholder())
        }
    }
}

pub fn execute_select(query: &SelectQuery, source: &Table, ctx: &EvalContext<'_>) -> Result<Table, EvalError> {
    let rows = filter_rows(source, &query.filters, ctx)?;
    tracing::debug!(from = %query.from, matched = rows.len(), "filtered rows");

    if query.by.is_empty() {
        project(source, &rows, &query.projections, ctx)
    } else {
        group(source, &rows, query, ctx)
    }
}

fn filter_rows(table: &Table, filters: &[Expr], ctx: &EvalContext<'_>) -> Result<Vec<usize>, EvalError> {
    let mut rows: Vec<usize> = (0..table.row_count()).collect();

    for filter in filters {
        let mask = ctx.with_columns(table, &rows).eval(filter)?;
        rows = match mask {
            Value::List(flags) => {
                if flags.len() != rows.len() {
                    return Err(EvalError::Length {
                        expected: rows.len(),
                        found: flags.len(),
                    });
                }
                rows.iter()
                    .zip(&flags)
                    .filter(|(_, flag)| flag.is_truthy())
                    .map(|(row, _)| *row)
                    .collect()
            }
            atom if atom.is_truthy() => rows,
            _ => vec![],
        };
    }
    Ok(rows)
}

fn project(
    table: &Table,
    rows: &[usize],
    projections: &[Projection],
    ctx: &EvalContext<'_>,
) -> Result<Table, EvalError> {
    if projections.is_empty() {
        return Ok(table.select_rows(rows));
    }

    let scope = ctx.with_columns(table, rows);
    let columns = projections
        .iter()
        .enumerate()
        .map(|(position, projection)| {
            Ok((column_name(projection, position), scope.eval(&projection.expr)?))
        })
        .collect::<Result<Vec<_>, EvalError>>()?;

    assemble(columns)
}

fn group(table: &Table, rows: &[usize], query: &SelectQuery, ctx: &EvalContext<'_>) -> Result<Table, EvalError> {
    let scope = ctx.with_columns(table, rows);
    let keys = query
        .by
        .iter()
        .map(|projection| expand(scope.eval(&projection.expr)?, rows.len()))
        .collect::<Result<Vec<_>, EvalError>>()?;

    // Partitions in first-seen order.
    let mut partitions: Vec<(Vec<Value>, Vec<usize>)> = vec![];
    for (position, &row) in rows.iter().enumerate() {
        let key: Vec<Value> = keys.iter().map(|column| column[position].clone()).collect();
        match partitions
            .iter_mut()
            .find(|(existing, _)| existing.iter().zip(&key).all(|(a, b)| a.same_key(b)))
        {
            Some((_, members)) => members.push(row),
            None => partitions.push((key, vec![row])),
        }
    }

    let mut names: Vec<String> = query
        .by
        .iter()
        .enumerate()
        .map(|(position, projection)| column_name(projection, position))
        .collect();

    // `select by k from t` keeps the remaining columns from the last row of each group.
    let carried: Vec<usize> = if query.projections.is_empty() {
        (0..table.columns().len())
            .filter(|&index| !names.contains(&table.columns()[index]))
            .collect()
    } else {
        vec![]
    };
    names.extend(carried.iter().map(|&index| table.columns()[index].clone()));
    names.extend(
        query
            .projections
            .iter()
            .enumerate()
            .map(|(position, projection)| column_name(projection, query.by.len() + position)),
    );

    let mut output = Vec::with_capacity(partitions.len());
    for (key, members) in partitions {
        let mut row = key;
        if let Some(&last) = members.last() {
            row.extend(carried.iter().map(|&index| table.rows()[last][index].clone()));
        }
        let scope = ctx.with_columns(table, &members);
        for projection in &query.projections {
            row.push(scope.eval(&projection.expr)?);
        }
        output.push(row);
    }

    Table::new(names, output)
}

/// A `by` expression's value per row.
fn expand(value: Value, rows: usize) -> Result<Vec<Value>, EvalError> {
    match value {
        Value::List(items) if items.len() == rows => Ok(items),
        Value::List(items) => Err(EvalError::Length {
            expected: rows,
            found: items.len(),
        }),
        Value::Table(_) => Err(EvalError::Type("cannot group by a table".to_string())),
        atom => Ok(vec![atom; rows]),
    }
}

/// Output column name when a projection is not named explicitly.
fn column_name(projection: &Projection, position: usize) -> String {
    if let Some(name) = &projection.name {
        return name.clone();
    }

    match &projection.expr {
        Expr::Name(column) => column.clone(),
        Expr::Apply { function, args } if args.len() == 1 => match &args[0] {
            Expr::Name(column) if function == "count" && column == "i" => "count".to_string(),
            Expr::Name(column) => format!("{}_{}", function, column),
            _ => format!("col{}", position + 1),
        },
        _ => format!("col{}", position + 1),
    }
}

/// `select vwap: size wavg price by sym from table`.
pub fn vwap(table: &Table, ctx: &EvalContext<'_>) -> Result<Table, EvalError> {
    if let Some(missing) = ["sym", "price", "size"]
        .into_iter()
        .find(|column| table.column_index(column).is_none())
    {
        return Err(EvalError::Table(format!("vwap needs a '{}' column", missing)));
    }

    let query = SelectQuery {
        projections: vec![Projection {
            name: Some("vwap".to_string()),
            expr: Expr::BinaryOp {
                op: BinOp::WeightedAvg,
                left: Box::new(Expr::Name("size".to_string())),
                right: Box::new(Expr::Name("price".to_string())),
            },
        }],
        by: vec![Projection {
            name: None,
            expr: Expr::Name("sym".to_string()),
        }],
        from: String::new(),
        filters: vec![],
    };
    execute_select(&query, table, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::{SymbolTable, sample_trade};

    fn sym(s: &str) -> Value {
        Value::Symbol(s.to_string())
    }

    #[test]
    fn test_assemble_broadcasts_atoms() {
        let table = assemble(vec![
            ("a".into(), Value::List(vec![Value::Number(1.0), Value::Number(2.0)])),
            ("b".into(), sym("x")),
        ])
        .unwrap();
        assert_eq!(table.column("b"), Some(vec![sym("x"), sym("x")]));
    }

    #[test]
    fn test_all_atoms_make_one_row() {
        let table = assemble(vec![("n".into(), Value::Number(3.0))]).unwrap();
        assert_eq!(table.row_count(), 1);
    }

    #[test]
    fn test_vwap_on_sample_trade() {
        let symbols = SymbolTable::new();
        let ctx = EvalContext::new(&symbols, EngineMode::Structural);
        let result = vwap(&sample_trade(), &ctx).unwrap();
        assert_eq!(result.columns(), &["sym", "vwap"]);
        assert_eq!(
            result.rows(),
            &[
                vec![sym("AAPL"), Value::Number(185.94)],
                vec![sym("MSFT"), Value::Number(402.15)],
            ]
        );
    }
}
