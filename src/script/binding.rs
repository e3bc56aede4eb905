//! Binding resolved sibling values into a script scope.
//!
//! A sibling's name must be a plain identifier. Its value binds as its
//! structural counterpart, except that a string whose whole text is a
//! literal (`"3.5"`, `"True"`, `"[1, 2]"`) binds as that literal.

use super::ast::{Expr, UnaryOp};
use super::error::{Result, ScriptError};
use super::lexer::{tokenize, Token};
use super::ops;
use super::parser::parse_expression;
use super::scope::Scope;
use super::value::ScriptValue;
use indexmap::IndexMap;
use serde_yaml_ng::Value;

/// A name a script can refer to: an identifier that is not a keyword.
pub fn is_identifier(name: &str) -> bool {
    match tokenize(name).as_deref() {
        Ok([only]) => matches!(&only.token, Token::Ident(ident) if ident == name),
        _ => false,
    }
}

/// The literal a string spells out, if it spells one out completely.
///
/// Numbers (optionally signed), `True`/`False`, and bracketed lists or
/// tuples of those. `None` and quoted strings do not count.
pub fn parse_literal(text: &str) -> Option<ScriptValue> {
    let expr = parse_expression(text).ok()?;
    literal_value(&expr)
}

fn literal_value(expr: &Expr) -> Option<ScriptValue> {
    match expr {
        Expr::Const(value @ (ScriptValue::Int(_) | ScriptValue::Float(_) | ScriptValue::Bool(_))) => {
            Some(value.clone())
        }
        Expr::Unary {
            op: op @ (UnaryOp::Neg | UnaryOp::Pos),
            operand,
        } => match operand.as_ref() {
            Expr::Const(value @ (ScriptValue::Int(_) | ScriptValue::Float(_))) => match op {
                UnaryOp::Neg => ops::negate(value).ok(),
                _ => Some(value.clone()),
            },
            _ => None,
        },
        Expr::List(items) => items
            .iter()
            .map(literal_value)
            .collect::<Option<Vec<_>>>()
            .map(ScriptValue::List),
        _ => None,
    }
}

/// Script value for one resolved sibling.
pub fn bind_value(value: &Value) -> ScriptValue {
    match value {
        Value::String(text) => {
            parse_literal(text).unwrap_or_else(|| ScriptValue::Str(text.clone()))
        }
        other => ScriptValue::from_yaml(other),
    }
}

/// Bind every sibling into the innermost frame of `scope`.
pub fn bind_siblings(scope: &mut Scope, siblings: &IndexMap<String, Value>) -> Result<()> {
    for (name, value) in siblings {
        if !is_identifier(name) {
            return Err(ScriptError::Binding {
                name: name.clone(),
                reason: "not a valid identifier".to_string(),
            });
        }
        scope.set(name.clone(), bind_value(value));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binding_identifiers() {
        assert!(is_identifier("alpha"));
        assert!(is_identifier("_x1"));
        assert!(!is_identifier("1x"));
        assert!(!is_identifier("a-b"));
        assert!(!is_identifier("a b"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("lambda"));
        assert!(!is_identifier("None"));
    }

    #[test]
    fn test_binding_numeric_strings_bind_as_numbers() {
        assert_eq!(parse_literal("3.5"), Some(ScriptValue::Float(3.5)));
        assert_eq!(parse_literal("-2"), Some(ScriptValue::Int(-2)));
        assert_eq!(parse_literal(" 7 "), Some(ScriptValue::Int(7)));
        assert_eq!(parse_literal("True"), Some(ScriptValue::Bool(true)));
    }

    #[test]
    fn test_binding_bracketed_literals() {
        assert_eq!(
            parse_literal("[1, 2.5]"),
            Some(ScriptValue::List(vec![ScriptValue::Int(1), ScriptValue::Float(2.5)]))
        );
        assert_eq!(
            parse_literal("(1, (2, 3))"),
            Some(ScriptValue::List(vec![
                ScriptValue::Int(1),
                ScriptValue::List(vec![ScriptValue::Int(2), ScriptValue::Int(3)]),
            ]))
        );
    }

    #[test]
    fn test_binding_non_literals_stay_strings() {
        assert_eq!(parse_literal("None"), None);
        assert_eq!(parse_literal("'quoted'"), None);
        assert_eq!(parse_literal("1 + 2"), None);
        assert_eq!(parse_literal("FLASH"), None);
        assert_eq!(parse_literal("[1, x]"), None);
        assert_eq!(
            bind_value(&Value::String("FLASH".into())),
            ScriptValue::Str("FLASH".into())
        );
    }

    #[test]
    fn test_binding_structural_values() {
        let v: Value = serde_yaml_ng::from_str("[1, '2', true]").unwrap();
        assert_eq!(
            bind_value(&v),
            ScriptValue::List(vec![
                ScriptValue::Int(1),
                ScriptValue::Str("2".into()),
                ScriptValue::Bool(true),
            ])
        );
    }

    #[test]
    fn test_binding_siblings_into_scope() {
        let mut scope = Scope::new();
        let mut siblings = IndexMap::new();
        siblings.insert("a".to_string(), Value::from(2));
        siblings.insert("b".to_string(), Value::String("4.5".into()));
        bind_siblings(&mut scope, &siblings).unwrap();
        assert_eq!(scope.get("a"), Some(&ScriptValue::Int(2)));
        assert_eq!(scope.get("b"), Some(&ScriptValue::Float(4.5)));
    }

    #[test]
    fn test_binding_rejects_bad_names() {
        let mut scope = Scope::new();
        let mut siblings = IndexMap::new();
        siblings.insert("if".to_string(), Value::from(1));
        let err = bind_siblings(&mut scope, &siblings).unwrap_err();
        assert!(matches!(err, ScriptError::Binding { ref name, .. } if name == "if"));
    }
}
