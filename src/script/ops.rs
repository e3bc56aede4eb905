//! Operators: arithmetic, comparison, membership, indexing.
//!
//! Bools count as ints and `/` is true division. `//` and `%` round toward
//! negative infinity. Int results that would overflow are errors rather than
//! wrapping.

use super::ast::{BinOp, CmpOp};
use super::error::{Result, ScriptError};
use super::value::ScriptValue;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    pub(crate) fn as_f64(self) -> f64 {
        match self {
            Num::Int(n) => n as f64,
            Num::Float(x) => x,
        }
    }
}

pub(crate) fn numeric(value: &ScriptValue) -> Option<Num> {
    match value {
        ScriptValue::Int(n) => Some(Num::Int(*n)),
        ScriptValue::Float(x) => Some(Num::Float(*x)),
        ScriptValue::Bool(b) => Some(Num::Int(i64::from(*b))),
        _ => None,
    }
}

fn from_num(n: Num) -> ScriptValue {
    match n {
        Num::Int(i) => ScriptValue::Int(i),
        Num::Float(x) => ScriptValue::Float(x),
    }
}

fn unsupported(op: &str, left: &ScriptValue, right: &ScriptValue) -> ScriptError {
    ScriptError::type_error(format!(
        "unsupported operand types for {}: '{}' and '{}'",
        op,
        left.type_name(),
        right.type_name()
    ))
}

/// Values a clone of `value` allocates, nested items and string bytes included.
fn footprint(value: &ScriptValue) -> usize {
    match value {
        ScriptValue::Str(s) => s.len().max(1),
        ScriptValue::List(items) => items
            .iter()
            .fold(1usize, |acc, item| acc.saturating_add(footprint(item))),
        ScriptValue::Map(map) => map.iter().fold(1usize, |acc, (key, item)| {
            acc.saturating_add(key.len()).saturating_add(footprint(item))
        }),
        _ => 1,
    }
}

/// Repeat `items`, where one copy of them weighs `unit`. The total weight is
/// capped at `MAX_SEQUENCE`.
fn repeat<T: Clone>(items: &[T], unit: usize, times: i64) -> Result<Vec<T>> {
    let times = usize::try_from(times.max(0)).map_err(|_| ScriptError::Overflow("repeat"))?;
    let weight = unit.max(items.len()).saturating_mul(times);
    if weight > super::builtins::MAX_SEQUENCE {
        return Err(ScriptError::value_error("repeated sequence too large"));
    }
    Ok(items
        .iter()
        .cycle()
        .take(items.len() * times)
        .cloned()
        .collect())
}

pub fn binary(op: BinOp, left: &ScriptValue, right: &ScriptValue) -> Result<ScriptValue> {
    use ScriptValue as V;

    match (op, left, right) {
        (BinOp::Add, V::Str(a), V::Str(b)) => return Ok(V::Str(format!("{}{}", a, b))),
        (BinOp::Add, V::List(a), V::List(b)) => {
            return Ok(V::List(a.iter().chain(b).cloned().collect()))
        }
        (BinOp::Mul, V::Str(s), V::Int(n)) | (BinOp::Mul, V::Int(n), V::Str(s)) => {
            let chars: Vec<char> = s.chars().collect();
            return Ok(V::Str(repeat(&chars, s.len(), *n)?.into_iter().collect()));
        }
        (BinOp::Mul, V::List(items), V::Int(n)) | (BinOp::Mul, V::Int(n), V::List(items)) => {
            let unit = items
                .iter()
                .fold(0usize, |acc, item| acc.saturating_add(footprint(item)));
            return Ok(V::List(repeat(items, unit, *n)?));
        }
        _ => {}
    }

    let symbol = op_symbol(op);
    let (a, b) = match (numeric(left), numeric(right)) {
        (Some(a), Some(b)) => (a, b),
        _ => return Err(unsupported(symbol, left, right)),
    };

    let result = match op {
        BinOp::Add => int_or_float(a, b, i64::checked_add, |x, y| x + y, "addition")?,
        BinOp::Sub => int_or_float(a, b, i64::checked_sub, |x, y| x - y, "subtraction")?,
        BinOp::Mul => int_or_float(a, b, i64::checked_mul, |x, y| x * y, "multiplication")?,
        BinOp::Div => {
            if b.as_f64() == 0.0 {
                return Err(ScriptError::DivisionByZero);
            }
            Num::Float(a.as_f64() / b.as_f64())
        }
        BinOp::FloorDiv => floor_div(a, b)?,
        BinOp::Mod => modulo(a, b)?,
        BinOp::Pow => power(a, b)?,
    };
    Ok(from_num(result))
}

fn op_symbol(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::Div => "/",
        BinOp::FloorDiv => "//",
        BinOp::Mod => "%",
        BinOp::Pow => "**",
    }
}

fn int_or_float(
    a: Num,
    b: Num,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
    what: &'static str,
) -> Result<Num> {
    match (a, b) {
        (Num::Int(x), Num::Int(y)) => int_op(x, y).map(Num::Int).ok_or(ScriptError::Overflow(what)),
        _ => Ok(Num::Float(float_op(a.as_f64(), b.as_f64()))),
    }
}

fn floor_div(a: Num, b: Num) -> Result<Num> {
    match (a, b) {
        (_, Num::Int(0)) => Err(ScriptError::DivisionByZero),
        (Num::Int(x), Num::Int(y)) => {
            let q = x.checked_div(y).ok_or(ScriptError::Overflow("floor division"))?;
            let adjust = x % y != 0 && ((x < 0) != (y < 0));
            Ok(Num::Int(if adjust { q - 1 } else { q }))
        }
        _ => {
            let divisor = b.as_f64();
            if divisor == 0.0 {
                return Err(ScriptError::DivisionByZero);
            }
            Ok(Num::Float((a.as_f64() / divisor).floor()))
        }
    }
}

fn modulo(a: Num, b: Num) -> Result<Num> {
    match (a, b) {
        (_, Num::Int(0)) => Err(ScriptError::DivisionByZero),
        (Num::Int(x), Num::Int(y)) => {
            let r = x.checked_rem(y).ok_or(ScriptError::Overflow("modulo"))?;
            Ok(Num::Int(if r != 0 && ((r < 0) != (y < 0)) { r + y } else { r }))
        }
        _ => {
            let (x, y) = (a.as_f64(), b.as_f64());
            if y == 0.0 {
                return Err(ScriptError::DivisionByZero);
            }
            Ok(Num::Float(x - y * (x / y).floor()))
        }
    }
}

fn power(a: Num, b: Num) -> Result<Num> {
    match (a, b) {
        (Num::Int(x), Num::Int(y)) if y >= 0 => {
            let exp = u32::try_from(y).map_err(|_| ScriptError::Overflow("power"))?;
            x.checked_pow(exp)
                .map(Num::Int)
                .ok_or(ScriptError::Overflow("power"))
        }
        _ => {
            let (x, y) = (a.as_f64(), b.as_f64());
            if x == 0.0 && y < 0.0 {
                return Err(ScriptError::DivisionByZero);
            }
            Ok(Num::Float(x.powf(y)))
        }
    }
}

pub fn negate(value: &ScriptValue) -> Result<ScriptValue> {
    match numeric(value) {
        Some(Num::Int(n)) => n
            .checked_neg()
            .map(ScriptValue::Int)
            .ok_or(ScriptError::Overflow("negation")),
        Some(Num::Float(x)) => Ok(ScriptValue::Float(-x)),
        None => Err(ScriptError::type_error(format!(
            "bad operand type for unary -: '{}'",
            value.type_name()
        ))),
    }
}

pub fn positive(value: &ScriptValue) -> Result<ScriptValue> {
    match numeric(value) {
        Some(n) => Ok(from_num(n)),
        None => Err(ScriptError::type_error(format!(
            "bad operand type for unary +: '{}'",
            value.type_name()
        ))),
    }
}

/// Structural equality, numbers compared by value.
pub fn equal(a: &ScriptValue, b: &ScriptValue) -> bool {
    use ScriptValue as V;
    match (a, b) {
        (V::List(xs), V::List(ys)) => xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| equal(x, y)),
        (V::Map(xs), V::Map(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).map(|y| equal(x, y)).unwrap_or(false))
        }
        (V::Function(f), V::Function(g)) => std::rc::Rc::ptr_eq(f, g),
        (V::Str(x), V::Str(y)) => x == y,
        (V::None, V::None) => true,
        _ => match (numeric(a), numeric(b)) {
            (Some(Num::Int(x)), Some(Num::Int(y))) => x == y,
            (Some(x), Some(y)) => x.as_f64() == y.as_f64(),
            _ => false,
        },
    }
}

pub fn ordering(a: &ScriptValue, b: &ScriptValue) -> Result<Ordering> {
    use ScriptValue as V;
    match (a, b) {
        (V::Str(x), V::Str(y)) => Ok(x.cmp(y)),
        (V::List(xs), V::List(ys)) => {
            for (x, y) in xs.iter().zip(ys) {
                if !equal(x, y) {
                    return ordering(x, y);
                }
            }
            Ok(xs.len().cmp(&ys.len()))
        }
        _ => match (numeric(a), numeric(b)) {
            (Some(Num::Int(x)), Some(Num::Int(y))) => Ok(x.cmp(&y)),
            (Some(x), Some(y)) => x
                .as_f64()
                .partial_cmp(&y.as_f64())
                .ok_or_else(|| ScriptError::value_error("cannot order nan")),
            _ => Err(ScriptError::type_error(format!(
                "'<' not supported between '{}' and '{}'",
                a.type_name(),
                b.type_name()
            ))),
        },
    }
}

pub fn contains(container: &ScriptValue, item: &ScriptValue) -> Result<bool> {
    match container {
        ScriptValue::List(items) => Ok(items.iter().any(|x| equal(x, item))),
        ScriptValue::Str(s) => match item {
            ScriptValue::Str(needle) => Ok(s.contains(needle.as_str())),
            other => Err(ScriptError::type_error(format!(
                "'in <string>' requires string as left operand, not {}",
                other.type_name()
            ))),
        },
        ScriptValue::Map(map) => Ok(map.contains_key(&map_key(item))),
        other => Err(ScriptError::type_error(format!(
            "argument of type '{}' is not iterable",
            other.type_name()
        ))),
    }
}

pub fn compare(op: CmpOp, a: &ScriptValue, b: &ScriptValue) -> Result<bool> {
    Ok(match op {
        CmpOp::Eq => equal(a, b),
        CmpOp::NotEq => !equal(a, b),
        CmpOp::Lt => ordering(a, b)? == Ordering::Less,
        CmpOp::Le => ordering(a, b)? != Ordering::Greater,
        CmpOp::Gt => ordering(a, b)? == Ordering::Greater,
        CmpOp::Ge => ordering(a, b)? != Ordering::Less,
        CmpOp::In => contains(b, a)?,
        CmpOp::NotIn => !contains(b, a)?,
        CmpOp::Is => identical(a, b),
        CmpOp::IsNot => !identical(a, b),
    })
}

/// `is`: singletons by value, functions by identity, everything else by
/// type and value.
fn identical(a: &ScriptValue, b: &ScriptValue) -> bool {
    std::mem::discriminant(a) == std::mem::discriminant(b) && equal(a, b)
}

/// Dict keys are strings; other key values use their display form.
pub fn map_key(value: &ScriptValue) -> String {
    match value {
        ScriptValue::Str(s) => s.clone(),
        other => other.to_string(),
    }
}

fn resolve_index(index: &ScriptValue, len: usize) -> Result<usize> {
    let idx = match numeric(index) {
        Some(Num::Int(n)) if !matches!(index, ScriptValue::Bool(_)) => n,
        _ => {
            return Err(ScriptError::type_error(format!(
                "indices must be integers, not {}",
                index.type_name()
            )))
        }
    };
    crate::core::types::normalize_index(idx, len)
        .ok_or_else(|| ScriptError::Index(format!("index {} out of range for length {}", idx, len)))
}

pub fn index(target: &ScriptValue, index: &ScriptValue) -> Result<ScriptValue> {
    match target {
        ScriptValue::List(items) => Ok(items[resolve_index(index, items.len())?].clone()),
        ScriptValue::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            Ok(ScriptValue::Str(chars[resolve_index(index, chars.len())?].to_string()))
        }
        ScriptValue::Map(map) => {
            let key = map_key(index);
            map.get(&key)
                .cloned()
                .ok_or_else(|| ScriptError::Index(format!("key '{}' not found", key)))
        }
        other => Err(ScriptError::type_error(format!(
            "'{}' object is not subscriptable",
            other.type_name()
        ))),
    }
}

/// Clamp a slice bound into `0..=len`, negatives counting from the end.
fn slice_bound(bound: Option<&ScriptValue>, len: usize, default: usize) -> Result<usize> {
    let Some(bound) = bound else {
        return Ok(default);
    };
    let n = match bound {
        ScriptValue::None => return Ok(default),
        ScriptValue::Int(n) => *n,
        other => {
            return Err(ScriptError::type_error(format!(
                "slice indices must be integers, not {}",
                other.type_name()
            )))
        }
    };
    let len_i = i64::try_from(len).map_err(|_| ScriptError::Overflow("slice"))?;
    let clamped = if n < 0 { (n + len_i).max(0) } else { n.min(len_i) };
    usize::try_from(clamped).map_err(|_| ScriptError::Overflow("slice"))
}

pub fn slice(
    target: &ScriptValue,
    start: Option<&ScriptValue>,
    stop: Option<&ScriptValue>,
) -> Result<ScriptValue> {
    match target {
        ScriptValue::List(items) => {
            let lo = slice_bound(start, items.len(), 0)?;
            let hi = slice_bound(stop, items.len(), items.len())?;
            Ok(ScriptValue::List(if lo < hi {
                items[lo..hi].to_vec()
            } else {
                Vec::new()
            }))
        }
        ScriptValue::Str(s) => {
            let chars: Vec<char> = s.chars().collect();
            let lo = slice_bound(start, chars.len(), 0)?;
            let hi = slice_bound(stop, chars.len(), chars.len())?;
            Ok(ScriptValue::Str(if lo < hi {
                chars[lo..hi].iter().collect()
            } else {
                String::new()
            }))
        }
        other => Err(ScriptError::type_error(format!(
            "'{}' object is not sliceable",
            other.type_name()
        ))),
    }
}
