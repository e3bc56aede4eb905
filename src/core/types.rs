//! Shared types: dialect selection, resolution options, the result set,
//! and helpers over `serde_yaml_ng::Value`.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_yaml_ng::Value;
use std::fmt;

// ============================================================================
// Dialect
// ============================================================================

/// Recipe dialect. Selects string resolution, list resolution and the
/// script key name together.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    /// `group.key` dotted paths, map-with-fallback lists, `script` nodes.
    #[default]
    Current,
    /// Bare keys probed against `acqp`/`method`/`visu_pars`,
    /// first-available lists, `Equation` nodes.
    Legacy,
}

impl Dialect {
    /// Pick a dialect from the legacy flag used by older callers.
    pub fn from_legacy_flag(legacy: bool) -> Self {
        if legacy {
            Self::Legacy
        } else {
            Self::Current
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Current => write!(f, "current"),
            Self::Legacy => write!(f, "legacy"),
        }
    }
}

// ============================================================================
// Options
// ============================================================================

/// Options for one resolution pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeOptions {
    /// Resolution dialect
    #[serde(default)]
    pub dialect: Dialect,

    /// Startup statements run ahead of the recipe's own `startup` entry
    #[serde(default)]
    pub startup_scripts: Vec<String>,
}

impl RecipeOptions {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            startup_scripts: Vec::new(),
        }
    }

    pub fn with_startup_scripts<I, S>(mut self, scripts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.startup_scripts
            .extend(scripts.into_iter().map(Into::into));
        self
    }
}

/// Resolved output: recipe key to value, in recipe order, never holding null.
pub type ResultSet = IndexMap<String, Value>;

// ============================================================================
// Value helpers
// ============================================================================

/// Render a value as plain text (strings unquoted, null empty).
pub fn value_to_string(val: &Value) -> String {
    match val {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Tagged(tagged) => value_to_string(&tagged.value),
        other => serde_yaml_ng::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_else(|_| format!("{:?}", other)),
    }
}

/// Collapse `Value::Null` into `None`.
pub fn non_null(val: Value) -> Option<Value> {
    match val {
        Value::Null => None,
        other => Some(other),
    }
}

/// Equality with numbers compared by value across int and float.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(i), Some(j)) => i == j,
            _ => match (x.as_f64(), y.as_f64()) {
                (Some(f), Some(g)) => f == g,
                _ => x == y,
            },
        },
        (Value::Sequence(xs), Value::Sequence(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| values_equal(x, y))
        }
        (Value::Mapping(xs), Value::Mapping(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(key, x)| ys.get(key).is_some_and(|y| values_equal(x, y)))
        }
        (Value::Tagged(t), other) | (other, Value::Tagged(t)) => values_equal(&t.value, other),
        _ => a == b,
    }
}

/// Interpret a value as a list index: integers, or floats with no
/// fractional part.
pub fn as_index(val: &Value) -> Option<i64> {
    match val {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::Tagged(t) => as_index(&t.value),
        _ => None,
    }
}

/// Normalize a possibly negative index against a length.
pub fn normalize_index(idx: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let idx = if idx < 0 { idx + len } else { idx };
    if (0..len).contains(&idx) {
        usize::try_from(idx).ok()
    } else {
        None
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_types_dialect_from_flag() {
        assert_eq!(Dialect::from_legacy_flag(true), Dialect::Legacy);
        assert_eq!(Dialect::from_legacy_flag(false), Dialect::Current);
        assert_eq!(Dialect::default(), Dialect::Current);
    }

    #[test]
    fn test_types_dialect_display() {
        assert_eq!(Dialect::Current.to_string(), "current");
        assert_eq!(Dialect::Legacy.to_string(), "legacy");
    }

    #[test]
    fn test_types_options_parse() {
        let yaml = r#"
dialect: legacy
startup_scripts:
  - "k = 2"
"#;
        let opts: RecipeOptions = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(opts.dialect, Dialect::Legacy);
        assert_eq!(opts.startup_scripts, vec!["k = 2"]);
    }

    #[test]
    fn test_types_options_defaults() {
        let opts: RecipeOptions = serde_yaml_ng::from_str("{}").unwrap();
        assert_eq!(opts.dialect, Dialect::Current);
        assert!(opts.startup_scripts.is_empty());
    }

    #[test]
    fn test_types_options_builder() {
        let opts = RecipeOptions::new(Dialect::Legacy).with_startup_scripts(["a = 1", "b = a"]);
        assert_eq!(opts.startup_scripts.len(), 2);
    }

    #[test]
    fn test_types_value_to_string() {
        assert_eq!(value_to_string(&Value::String("hello".into())), "hello");
        assert_eq!(value_to_string(&Value::Bool(true)), "true");
        assert_eq!(value_to_string(&Value::Null), "");
        assert_eq!(value_to_string(&Value::from(42)), "42");
    }

    #[test]
    fn test_types_values_equal_numeric() {
        assert!(values_equal(&Value::from(2), &Value::from(2.0)));
        assert!(!values_equal(&Value::from(2), &Value::from(2.5)));
        assert!(!values_equal(&Value::from(2), &Value::String("2".into())));
    }

    #[test]
    fn test_types_values_equal_nested_mappings() {
        let a: Value = serde_yaml_ng::from_str("{a: 2, b: [1, {c: 3}]}").unwrap();
        let b: Value = serde_yaml_ng::from_str("{b: [1.0, {c: 3.0}], a: 2.0}").unwrap();
        assert!(values_equal(&a, &b));
        let c: Value = serde_yaml_ng::from_str("{a: 2, b: [1, {c: 4}]}").unwrap();
        assert!(!values_equal(&a, &c));
        let d: Value = serde_yaml_ng::from_str("{a: 2}").unwrap();
        assert!(!values_equal(&a, &d));
    }

    #[test]
    fn test_types_as_index() {
        assert_eq!(as_index(&Value::from(3)), Some(3));
        assert_eq!(as_index(&Value::from(-1)), Some(-1));
        assert_eq!(as_index(&Value::from(2.0)), Some(2));
        assert_eq!(as_index(&Value::from(2.5)), None);
        assert_eq!(as_index(&Value::String("1".into())), None);
    }

    #[test]
    fn test_types_normalize_index() {
        assert_eq!(normalize_index(0, 3), Some(0));
        assert_eq!(normalize_index(2, 3), Some(2));
        assert_eq!(normalize_index(3, 3), None);
        assert_eq!(normalize_index(-1, 3), Some(2));
        assert_eq!(normalize_index(-3, 3), Some(0));
        assert_eq!(normalize_index(-4, 3), None);
        assert_eq!(normalize_index(0, 0), None);
    }

    #[test]
    fn test_types_non_null() {
        assert_eq!(non_null(Value::Null), None);
        assert_eq!(non_null(Value::from(0)), Some(Value::from(0)));
    }
}
