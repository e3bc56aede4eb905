//! Built-in functions and constants available to every script.

use super::ast::BinOp;
use super::error::{Result, ScriptError};
use super::ops::{self, numeric, Num};
use super::value::ScriptValue;
use std::cmp::Ordering;

/// Upper bound on sequences built by `range` or repetition.
pub const MAX_SEQUENCE: usize = 1_000_000;

const BUILTINS: &[&str] = &[
    "abs", "all", "any", "acos", "asin", "atan", "atan2", "bool", "ceil", "cos", "exp", "float",
    "floor", "int", "len", "list", "log", "log10", "max", "min", "pow", "range", "round", "sin",
    "sorted", "sqrt", "str", "sum", "tan",
];

pub fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(&name)
}

/// Named constants (`pi`, `e`).
pub fn constant(name: &str) -> Option<ScriptValue> {
    match name {
        "pi" => Some(ScriptValue::Float(std::f64::consts::PI)),
        "e" => Some(ScriptValue::Float(std::f64::consts::E)),
        _ => None,
    }
}

pub fn call(name: &str, args: &[ScriptValue]) -> Result<ScriptValue> {
    match name {
        "abs" => {
            let [x] = exactly::<1>(name, args)?;
            match number(name, x)? {
                Num::Int(n) => n
                    .checked_abs()
                    .map(ScriptValue::Int)
                    .ok_or(ScriptError::Overflow("abs")),
                Num::Float(f) => Ok(ScriptValue::Float(f.abs())),
            }
        }
        "min" => extreme(name, args, Ordering::Less),
        "max" => extreme(name, args, Ordering::Greater),
        "round" => round(args),
        "len" => {
            let [x] = exactly::<1>(name, args)?;
            let len = match x {
                ScriptValue::Str(s) => s.chars().count(),
                ScriptValue::List(items) => items.len(),
                ScriptValue::Map(map) => map.len(),
                other => {
                    return Err(ScriptError::type_error(format!(
                        "object of type '{}' has no len()",
                        other.type_name()
                    )))
                }
            };
            to_int(len)
        }
        "int" => {
            let [x] = exactly::<1>(name, args)?;
            to_integer(x)
        }
        "float" => {
            let [x] = exactly::<1>(name, args)?;
            to_float(x)
        }
        "str" => {
            let [x] = exactly::<1>(name, args)?;
            Ok(ScriptValue::Str(x.to_string()))
        }
        "bool" => {
            let [x] = exactly::<1>(name, args)?;
            Ok(ScriptValue::Bool(x.truthy()))
        }
        "list" => {
            let [x] = exactly::<1>(name, args)?;
            Ok(ScriptValue::List(iterate(x)?))
        }
        "sum" => {
            if args.is_empty() || args.len() > 2 {
                return Err(ScriptError::arity(name, "1 or 2", args.len()));
            }
            let start = args.get(1).cloned().unwrap_or(ScriptValue::Int(0));
            iterate(&args[0])?
                .iter()
                .try_fold(start, |acc, x| ops::binary(BinOp::Add, &acc, x))
        }
        "pow" => {
            let [a, b] = exactly::<2>(name, args)?;
            ops::binary(BinOp::Pow, a, b)
        }
        "sqrt" => unary_math(name, args, |x| (x >= 0.0).then(|| x.sqrt())),
        "exp" => unary_math(name, args, |x| Some(x.exp())),
        "log" => log(args),
        "log10" => unary_math(name, args, |x| (x > 0.0).then(|| x.log10())),
        "sin" => unary_math(name, args, |x| Some(x.sin())),
        "cos" => unary_math(name, args, |x| Some(x.cos())),
        "tan" => unary_math(name, args, |x| Some(x.tan())),
        "asin" => unary_math(name, args, |x| (-1.0..=1.0).contains(&x).then(|| x.asin())),
        "acos" => unary_math(name, args, |x| (-1.0..=1.0).contains(&x).then(|| x.acos())),
        "atan" => unary_math(name, args, |x| Some(x.atan())),
        "atan2" => {
            let [y, x] = exactly::<2>(name, args)?;
            let (y, x) = (number(name, y)?.as_f64(), number(name, x)?.as_f64());
            Ok(ScriptValue::Float(y.atan2(x)))
        }
        "floor" => {
            let [x] = exactly::<1>(name, args)?;
            float_to_int(number(name, x)?.as_f64().floor())
        }
        "ceil" => {
            let [x] = exactly::<1>(name, args)?;
            float_to_int(number(name, x)?.as_f64().ceil())
        }
        "range" => range(args),
        "sorted" => {
            let [x] = exactly::<1>(name, args)?;
            let mut items = iterate(x)?;
            let mut failure = None;
            items.sort_by(|a, b| {
                ops::ordering(a, b).unwrap_or_else(|err| {
                    failure.get_or_insert(err);
                    Ordering::Equal
                })
            });
            match failure {
                Some(err) => Err(err),
                None => Ok(ScriptValue::List(items)),
            }
        }
        "any" => {
            let [x] = exactly::<1>(name, args)?;
            Ok(ScriptValue::Bool(iterate(x)?.iter().any(ScriptValue::truthy)))
        }
        "all" => {
            let [x] = exactly::<1>(name, args)?;
            Ok(ScriptValue::Bool(iterate(x)?.iter().all(ScriptValue::truthy)))
        }
        _ => Err(ScriptError::UnknownName(name.to_string())),
    }
}

fn exactly<'a, const N: usize>(name: &str, args: &'a [ScriptValue]) -> Result<&'a [ScriptValue; N]> {
    args.try_into()
        .map_err(|_| ScriptError::arity(name, N.to_string(), args.len()))
}

fn number(name: &str, value: &ScriptValue) -> Result<Num> {
    numeric(value).ok_or_else(|| {
        ScriptError::type_error(format!(
            "{}() expects a number, not '{}'",
            name,
            value.type_name()
        ))
    })
}

fn to_int(n: usize) -> Result<ScriptValue> {
    i64::try_from(n)
        .map(ScriptValue::Int)
        .map_err(|_| ScriptError::Overflow("length"))
}

fn float_to_int(x: f64) -> Result<ScriptValue> {
    if !x.is_finite() {
        return Err(ScriptError::value_error(format!(
            "cannot convert float {} to integer",
            super::value::format_float(x)
        )));
    }
    if x < i64::MIN as f64 || x >= i64::MAX as f64 {
        return Err(ScriptError::Overflow("float to int"));
    }
    Ok(ScriptValue::Int(x as i64))
}

fn iterate(value: &ScriptValue) -> Result<Vec<ScriptValue>> {
    match value {
        ScriptValue::List(items) => Ok(items.clone()),
        ScriptValue::Str(s) => Ok(s.chars().map(|c| ScriptValue::Str(c.to_string())).collect()),
        ScriptValue::Map(map) => Ok(map.keys().cloned().map(ScriptValue::Str).collect()),
        other => Err(ScriptError::type_error(format!(
            "'{}' object is not iterable",
            other.type_name()
        ))),
    }
}

fn extreme(name: &str, args: &[ScriptValue], keep: Ordering) -> Result<ScriptValue> {
    let items = match args {
        [] => return Err(ScriptError::arity(name, "at least 1", 0)),
        [single] => iterate(single)?,
        many => many.to_vec(),
    };
    let mut iter = items.into_iter();
    let mut best = iter
        .next()
        .ok_or_else(|| ScriptError::value_error(format!("{}() arg is an empty sequence", name)))?;
    for item in iter {
        if ops::ordering(&item, &best)? == keep {
            best = item;
        }
    }
    Ok(best)
}

fn round(args: &[ScriptValue]) -> Result<ScriptValue> {
    let (x, digits) = match args {
        [x] => (x, None),
        [x, ScriptValue::None] => (x, None),
        [x, ScriptValue::Int(d)] => (x, Some(*d)),
        [_, other] => {
            return Err(ScriptError::type_error(format!(
                "round() ndigits must be an integer, not '{}'",
                other.type_name()
            )))
        }
        _ => return Err(ScriptError::arity("round", "1 or 2", args.len())),
    };
    match (number("round", x)?, digits) {
        (Num::Int(n), None) => Ok(ScriptValue::Int(n)),
        (Num::Int(n), Some(d)) if d >= 0 => Ok(ScriptValue::Int(n)),
        (n, None) => float_to_int(n.as_f64().round_ties_even()),
        (n, Some(d)) => {
            let d = i32::try_from(d.clamp(-308, 308)).map_err(|_| ScriptError::Overflow("round"))?;
            let rounded = if d >= 0 {
                let scale = 10f64.powi(d);
                (n.as_f64() * scale).round_ties_even() / scale
            } else {
                let scale = 10f64.powi(-d);
                (n.as_f64() / scale).round_ties_even() * scale
            };
            Ok(match n {
                Num::Int(_) => float_to_int(rounded)?,
                Num::Float(_) => ScriptValue::Float(rounded),
            })
        }
    }
}

fn log(args: &[ScriptValue]) -> Result<ScriptValue> {
    let (x, base) = match args {
        [x] => (number("log", x)?.as_f64(), None),
        [x, b] => (number("log", x)?.as_f64(), Some(number("log", b)?.as_f64())),
        _ => return Err(ScriptError::arity("log", "1 or 2", args.len())),
    };
    if x <= 0.0 {
        return Err(ScriptError::value_error("math domain error"));
    }
    match base {
        None => Ok(ScriptValue::Float(x.ln())),
        Some(b) if b <= 0.0 => Err(ScriptError::value_error("math domain error")),
        Some(b) if b == 1.0 => Err(ScriptError::DivisionByZero),
        Some(b) => Ok(ScriptValue::Float(x.ln() / b.ln())),
    }
}

fn unary_math(name: &str, args: &[ScriptValue], f: impl Fn(f64) -> Option<f64>) -> Result<ScriptValue> {
    let [x] = exactly::<1>(name, args)?;
    f(number(name, x)?.as_f64())
        .map(ScriptValue::Float)
        .ok_or_else(|| ScriptError::value_error("math domain error"))
}

fn to_integer(value: &ScriptValue) -> Result<ScriptValue> {
    match value {
        ScriptValue::Str(s) => s
            .trim()
            .parse::<i64>()
            .map(ScriptValue::Int)
            .map_err(|_| ScriptError::value_error(format!("invalid literal for int(): '{}'", s))),
        other => match numeric(other) {
            Some(Num::Int(n)) => Ok(ScriptValue::Int(n)),
            Some(Num::Float(x)) => float_to_int(x.trunc()),
            None => Err(ScriptError::type_error(format!(
                "int() argument must be a string or a number, not '{}'",
                other.type_name()
            ))),
        },
    }
}

fn to_float(value: &ScriptValue) -> Result<ScriptValue> {
    match value {
        ScriptValue::Str(s) => {
            let text = s.trim();
            let parsed = match text.to_ascii_lowercase().as_str() {
                "inf" | "+inf" | "infinity" => Some(f64::INFINITY),
                "-inf" | "-infinity" => Some(f64::NEG_INFINITY),
                "nan" => Some(f64::NAN),
                _ => text.parse::<f64>().ok(),
            };
            parsed.map(ScriptValue::Float).ok_or_else(|| {
                ScriptError::value_error(format!("could not convert string to float: '{}'", s))
            })
        }
        other => number("float", other).map(|n| ScriptValue::Float(n.as_f64())),
    }
}

fn range(args: &[ScriptValue]) -> Result<ScriptValue> {
    let ints = args
        .iter()
        .map(|a| match a {
            ScriptValue::Int(n) => Ok(*n),
            ScriptValue::Bool(b) => Ok(i64::from(*b)),
            other => Err(ScriptError::type_error(format!(
                "range() expects integers, not '{}'",
                other.type_name()
            ))),
        })
        .collect::<Result<Vec<i64>>>()?;
    let (start, stop, step) = match ints.as_slice() {
        [stop] => (0, *stop, 1),
        [start, stop] => (*start, *stop, 1),
        [start, stop, step] => (*start, *stop, *step),
        _ => return Err(ScriptError::arity("range", "1 to 3", args.len())),
    };
    if step == 0 {
        return Err(ScriptError::value_error("range() arg 3 must not be zero"));
    }
    let span = if step > 0 {
        (i128::from(stop) - i128::from(start)).max(0)
    } else {
        (i128::from(start) - i128::from(stop)).max(0)
    };
    let step_abs = i128::from(step).abs();
    let count = (span + step_abs - 1) / step_abs;
    if count > MAX_SEQUENCE as i128 {
        return Err(ScriptError::value_error(format!(
            "range() of {} elements exceeds the limit of {}",
            count, MAX_SEQUENCE
        )));
    }
    let items = (0..count)
        .map(|i| ScriptValue::Int((i128::from(start) + i * i128::from(step)) as i64))
        .collect();
    Ok(ScriptValue::List(items))
}
