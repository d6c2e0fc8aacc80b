//! The builtin catalog.
//!
//! Reducers over empty input return the float null `0n`, except `sum` and
//! `count`, which return `0`.

use rust_decimal::{Decimal, prelude::FromPrimitive, prelude::ToPrimitive};

use crate::{
    config::EngineMode,
    evaluator::{EvalContext, EvalError, compare_values},
    table::{self, legacy},
    value::Value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Vwap,
    Wavg,
    Count,
    Sum,
    Avg,
    Min,
    Max,
    First,
    Last,
    Til,
    Cols,
}

// Substring lookup walks this in order, so longer names that contain
// shorter ones (`wavg` contains `avg`) come first.
const CATALOG: &[(&str, Builtin)] = &[
    ("vwap", Builtin::Vwap),
    ("wavg", Builtin::Wavg),
    ("count", Builtin::Count),
    ("sum", Builtin::Sum),
    ("avg", Builtin::Avg),
    ("min", Builtin::Min),
    ("max", Builtin::Max),
    ("first", Builtin::First),
    ("last", Builtin::Last),
    ("til", Builtin::Til),
    ("cols", Builtin::Cols),
];

impl Builtin {
    pub fn lookup(name: &str) -> Option<Builtin> {
        CATALOG
            .iter()
            .find(|(entry, _)| *entry == name)
            .map(|(_, builtin)| *builtin)
    }

    /// Case-insensitive substring match, used by bracketed calls
    /// (`calculateVWAP[trade]` reaches `vwap`).
    pub fn lookup_fuzzy(name: &str) -> Option<Builtin> {
        let name = name.to_lowercase();
        CATALOG
            .iter()
            .find(|(entry, _)| name.contains(entry))
            .map(|(_, builtin)| *builtin)
    }

    pub fn name(self) -> &'static str {
        CATALOG
            .iter()
            .find(|(_, builtin)| *builtin == self)
            .map_or("?", |(entry, _)| entry)
    }
}

pub fn call(builtin: Builtin, args: &[Value], ctx: &EvalContext<'_>) -> Result<Value, EvalError> {
    match builtin {
        Builtin::Vwap => vwap(args, ctx),
        Builtin::Wavg => {
            let [weights, values] = expect_args::<2>(builtin, args)?;
            weighted_avg(weights, values)
        }
        Builtin::Count => {
            let [value] = expect_args::<1>(builtin, args)?;
            Ok(Value::Number(value.count() as f64))
        }
        Builtin::Sum => {
            let [value] = expect_args::<1>(builtin, args)?;
            Ok(Value::Number(sum(&numbers(builtin, value)?)))
        }
        Builtin::Avg => {
            let [value] = expect_args::<1>(builtin, args)?;
            Ok(Value::Number(avg(&numbers(builtin, value)?)))
        }
        Builtin::Min | Builtin::Max => {
            let [value] = expect_args::<1>(builtin, args)?;
            extreme(builtin, value)
        }
        Builtin::First | Builtin::Last => {
            let [value] = expect_args::<1>(builtin, args)?;
            let items = items(builtin, value)?;
            let item = if builtin == Builtin::First {
                items.first()
            } else {
                items.last()
            };
            Ok(item.cloned().unwrap_or(Value::NULL))
        }
        Builtin::Til => {
            let [value] = expect_args::<1>(builtin, args)?;
            til(value)
        }
        Builtin::Cols => {
            let [value] = expect_args::<1>(builtin, args)?;
            match value {
                Value::Table(table) => Ok(Value::List(
                    table
                        .columns()
                        .iter()
                        .map(|c| Value::Symbol(c.clone()))
                        .collect(),
                )),
                other => Err(type_error(builtin, other)),
            }
        }
    }
}

fn expect_args<const N: usize>(builtin: Builtin, args: &[Value]) -> Result<&[Value; N], EvalError> {
    args.try_into().map_err(|_| {
        EvalError::Type(format!(
            "{} takes {} argument{}, got {}",
            builtin.name(),
            N,
            if N == 1 { "" } else { "s" },
            args.len()
        ))
    })
}

fn type_error(builtin: Builtin, value: &Value) -> EvalError {
    EvalError::Type(format!("{} cannot take a {}", builtin.name(), value.type_name()))
}

/// Items of a list, or the atom as a one-item slice.
fn items(builtin: Builtin, value: &Value) -> Result<&[Value], EvalError> {
    match value {
        Value::List(items) => Ok(items),
        Value::Table(_) => Err(type_error(builtin, value)),
        atom => Ok(std::slice::from_ref(atom)),
    }
}

fn numbers(builtin: Builtin, value: &Value) -> Result<Vec<f64>, EvalError> {
    items(builtin, value)?
        .iter()
        .map(|item| item.as_number().ok_or_else(|| type_error(builtin, item)))
        .collect()
}

/// Decimal sum, falling back to float addition if any term does not convert.
pub fn sum(values: &[f64]) -> f64 {
    values
        .iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(Decimal::from_f64(*v)?))
        .and_then(|total| total.to_f64())
        .unwrap_or_else(|| values.iter().sum())
}

pub fn avg(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    divide(sum(values), values.len() as f64)
}

fn divide(numerator: f64, denominator: f64) -> f64 {
    if let Some(n) = Decimal::from_f64(numerator)
        && let Some(d) = Decimal::from_f64(denominator)
        && let Some(q) = n.checked_div(d).and_then(|q| q.to_f64())
    {
        return q;
    }
    numerator / denominator
}

fn extreme(builtin: Builtin, value: &Value) -> Result<Value, EvalError> {
    let wanted = if builtin == Builtin::Min {
        std::cmp::Ordering::Less
    } else {
        std::cmp::Ordering::Greater
    };

    let mut best: Option<&Value> = None;
    for item in items(builtin, value)? {
        if matches!(item, Value::Number(n) if n.is_nan()) {
            continue;
        }
        best = match best {
            None => Some(item),
            Some(current) => match compare_values(item, current) {
                Some(ordering) if ordering == wanted => Some(item),
                Some(_) => Some(current),
                None => return Err(type_error(builtin, item)),
            },
        };
    }
    Ok(best.cloned().unwrap_or(Value::NULL))
}

/// Longest list `til` builds.
pub const MAX_TIL: usize = 1_000_000;

fn til(value: &Value) -> Result<Value, EvalError> {
    match value.as_number() {
        Some(n) if n > MAX_TIL as f64 && n.fract() == 0.0 => Err(EvalError::Type(format!(
            "til is limited to {} items, got {}",
            MAX_TIL,
            value.as_string()
        ))),
        Some(n) if n >= 0.0 && n.fract() == 0.0 => Ok(Value::List(
            (0..n as usize).map(|i| Value::Number(i as f64)).collect(),
        )),
        _ => Err(EvalError::Type(format!(
            "til needs a non-negative integer, got {}",
            value.as_string()
        ))),
    }
}

/// `weights wavg values`: sum of products over sum of weights. Atoms
/// broadcast against the other side.
pub fn weighted_avg(weights: &Value, values: &Value) -> Result<Value, EvalError> {
    let w = numbers(Builtin::Wavg, weights)?;
    let x = numbers(Builtin::Wavg, values)?;

    let pairs: Vec<(f64, f64)> = match (weights.is_atom(), values.is_atom()) {
        (true, false) => x.iter().map(|xi| (w[0], *xi)).collect(),
        (false, true) => w.iter().map(|wi| (*wi, x[0])).collect(),
        _ if w.len() != x.len() => {
            return Err(EvalError::Length {
                expected: w.len(),
                found: x.len(),
            });
        }
        _ => w.iter().copied().zip(x.iter().copied()).collect(),
    };

    if pairs.is_empty() {
        return Ok(Value::NULL);
    }

    let products: Vec<f64> = pairs
        .iter()
        .map(|(wi, xi)| crate::evaluator::arithmetic(crate::ast::BinOp::Multiply, *wi, *xi))
        .collect();
    let total_weight: Vec<f64> = pairs.iter().map(|(wi, _)| *wi).collect();
    Ok(Value::Number(divide(sum(&products), sum(&total_weight))))
}

/// Volume-weighted average price per `sym`.
///
/// No argument means the `trade` table; otherwise a table or a symbol naming one.
fn vwap(args: &[Value], ctx: &EvalContext<'_>) -> Result<Value, EvalError> {
    if ctx.mode() == EngineMode::Legacy {
        return Ok(Value::Table(legacy::vwap()));
    }

    let source = match args {
        [] => ctx.resolve("trade")?,
        [Value::Symbol(name)] => ctx.resolve(name)?,
        [table] => table.clone(),
        _ => {
            return Err(EvalError::Type(format!(
                "vwap takes at most 1 argument, got {}",
                args.len()
            )));
        }
    };

    match source {
        Value::Table(table) => table::vwap(&table, ctx).map(Value::Table),
        other => Err(type_error(Builtin::Vwap, &other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        assert_eq!(Builtin::lookup("sum"), Some(Builtin::Sum));
        assert_eq!(Builtin::lookup("Sum"), None);
        assert_eq!(Builtin::lookup_fuzzy("calculateVWAP"), Some(Builtin::Vwap));
        assert_eq!(Builtin::lookup_fuzzy("myWavg"), Some(Builtin::Wavg));
        assert_eq!(Builtin::lookup_fuzzy("nothing"), None);
    }

    #[test]
    fn test_empty_sentinels() {
        assert_eq!(sum(&[]), 0.0);
        assert!(avg(&[]).is_nan());
    }

    #[test]
    fn test_sum_is_exact() {
        assert_eq!(sum(&[0.1, 0.2]), 0.3);
        assert_eq!(avg(&[185.25, 186.40]), 185.825);
    }

    #[test]
    fn test_weighted_avg() {
        let w = Value::List(vec![Value::Number(100.0), Value::Number(150.0)]);
        let x = Value::List(vec![Value::Number(185.25), Value::Number(186.40)]);
        assert_eq!(weighted_avg(&w, &x).unwrap(), Value::Number(185.94));
    }

    #[test]
    fn test_til() {
        assert_eq!(
            til(&Value::Number(3.0)).unwrap(),
            Value::List(vec![Value::Number(0.0), Value::Number(1.0), Value::Number(2.0)])
        );
        assert!(til(&Value::Number(-1.0)).is_err());
    }

    #[test]
    fn test_til_length_is_capped() {
        assert_eq!(til(&Value::Number(MAX_TIL as f64)).unwrap().count(), MAX_TIL);
        assert!(matches!(
            til(&Value::Number(1e17)),
            Err(EvalError::Type(message)) if message.starts_with("til is limited to 1000000 items")
        ));
    }
}
