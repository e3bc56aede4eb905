//! Runtime values of the expression language and their conversion to and
//! from recipe data.

use super::ast::Expr;
use super::error::{Result, ScriptError};
use crate::core::types::value_to_string;
use indexmap::IndexMap;
use serde_yaml_ng::{Mapping, Number, Value};
use std::fmt;
use std::rc::Rc;

/// A user-defined function (`def` or `lambda`).
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub params: Vec<String>,
    pub body: Rc<Expr>,
}

/// A value inside a script.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptValue {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<ScriptValue>),
    Map(IndexMap<String, ScriptValue>),
    Function(Rc<Function>),
}

impl ScriptValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::None => "NoneType",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "str",
            Self::List(_) => "list",
            Self::Map(_) => "dict",
            Self::Function(_) => "function",
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Truthiness: zero, empty and `None` are false.
    pub fn truthy(&self) -> bool {
        match self {
            Self::None => false,
            Self::Bool(b) => *b,
            Self::Int(n) => *n != 0,
            Self::Float(x) => *x != 0.0,
            Self::Str(s) => !s.is_empty(),
            Self::List(items) => !items.is_empty(),
            Self::Map(map) => !map.is_empty(),
            Self::Function(_) => true,
        }
    }

    /// Quoted form used inside containers (`'a'` rather than `a`).
    pub fn repr(&self) -> String {
        match self {
            Self::Str(s) => {
                let escaped = s
                    .replace('\\', "\\\\")
                    .replace('\'', "\\'")
                    .replace('\n', "\\n");
                format!("'{}'", escaped)
            }
            other => other.to_string(),
        }
    }

    /// Convert recipe data into a script value.
    pub fn from_yaml(value: &Value) -> ScriptValue {
        match value {
            Value::Null => Self::None,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => number_to_script(n),
            Value::String(s) => Self::Str(s.clone()),
            Value::Sequence(items) => Self::List(items.iter().map(Self::from_yaml).collect()),
            Value::Mapping(map) => Self::Map(
                map.iter()
                    .map(|(k, v)| (value_to_string(k), Self::from_yaml(v)))
                    .collect(),
            ),
            Value::Tagged(tagged) => Self::from_yaml(&tagged.value),
        }
    }

    /// Convert back to recipe data. Functions have no data form.
    pub fn to_yaml(&self) -> Result<Value> {
        Ok(match self {
            Self::None => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(n) => Value::Number(Number::from(*n)),
            Self::Float(x) => Value::Number(Number::from(*x)),
            Self::Str(s) => Value::String(s.clone()),
            Self::List(items) => Value::Sequence(
                items
                    .iter()
                    .map(ScriptValue::to_yaml)
                    .collect::<Result<Vec<_>>>()?,
            ),
            Self::Map(map) => {
                let mut out = Mapping::new();
                for (k, v) in map {
                    out.insert(Value::String(k.clone()), v.to_yaml()?);
                }
                Value::Mapping(out)
            }
            Self::Function(func) => {
                return Err(ScriptError::NotRepresentable(format!(
                    "function '{}'",
                    func.name
                )))
            }
        })
    }
}

fn number_to_script(n: &Number) -> ScriptValue {
    if let Some(i) = n.as_i64() {
        ScriptValue::Int(i)
    } else if let Some(u) = n.as_u64() {
        ScriptValue::Float(u as f64)
    } else {
        ScriptValue::Float(n.as_f64().unwrap_or(f64::NAN))
    }
}

/// Float text with a trailing `.0` for integral values: `2.0`, `0.1`, `1e+20`, `inf`, `nan`.
pub fn format_float(x: f64) -> String {
    if x.is_nan() {
        "nan".to_string()
    } else if x.is_infinite() {
        if x > 0.0 { "inf" } else { "-inf" }.to_string()
    } else if x.fract() == 0.0 && x.abs() < 1e16 {
        format!("{:.1}", x)
    } else if x.abs() >= 1e16 || (x != 0.0 && x.abs() < 1e-4) {
        let s = format!("{:e}", x);
        match s.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{}e+{}", mantissa, exp),
            _ => s,
        }
    } else {
        x.to_string()
    }
}

impl fmt::Display for ScriptValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Bool(true) => write!(f, "True"),
            Self::Bool(false) => write!(f, "False"),
            Self::Int(n) => write!(f, "{}", n),
            Self::Float(x) => write!(f, "{}", format_float(*x)),
            Self::Str(s) => write!(f, "{}", s),
            Self::List(items) => {
                let parts: Vec<String> = items.iter().map(ScriptValue::repr).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Self::Map(map) => {
                let parts: Vec<String> = map
                    .iter()
                    .map(|(k, v)| format!("'{}': {}", k, v.repr()))
                    .collect();
                write!(f, "{{{}}}", parts.join(", "))
            }
            Self::Function(func) => write!(f, "<function {}>", func.name),
        }
    }
}
