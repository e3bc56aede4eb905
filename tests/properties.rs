//! Property-based tests for resolution invariants.

use proptest::prelude::*;
use reshipe::core::dialect::Strategies;
use reshipe::core::node::Node;
use reshipe::core::resolver::Resolver;
use reshipe::script::Preamble;
use reshipe::{Dialect, Recipe, RecipeOptions, Resource, StaticResource};
use serde_yaml_ng::{Mapping, Value};

// =============================================================================
// Helpers
// =============================================================================

fn resource() -> StaticResource {
    StaticResource::new("scan")
        .with_group("method", [("x", Value::from(1)), ("list", Value::Sequence(vec![]))])
        .with_group("acqp", [("NR", Value::from(4))])
}

fn resolve(dialect: Dialect, raw: &Value) -> Option<Value> {
    let r = resource();
    let targets: [&dyn Resource; 1] = [&r];
    let strategies = Strategies::for_dialect(dialect);
    let preamble = Preamble::empty();
    let node = Node::parse(raw, &strategies);
    Resolver::new(&targets, strategies, &preamble).resolve(&node)
}

/// Identifiers that no test resource exposes as a group.
fn unknown_group() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,10}".prop_filter("known group", |g| g != "method" && g != "acqp")
}

fn identifier() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z0-9_]{0,10}"
}

/// Strings that never match `ident.ident`.
fn plain_string() -> impl Strategy<Value = String> {
    "[a-z ]{0,12}( [0-9]+)?"
}

/// Scalar recipe leaves: numbers, strings, nulls and dotted references.
fn leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<i32>().prop_map(Value::from),
        plain_string().prop_map(Value::String),
        Just(Value::String("method.x".into())),
        Just(Value::String("nope.x".into())),
    ]
}

// =============================================================================
// String resolution
// =============================================================================

proptest! {
    /// Current dialect: `g.k` with no resource exposing `g` is null.
    #[test]
    fn dotted_path_unknown_group_is_null(group in unknown_group(), key in identifier()) {
        let raw = Value::String(format!("{}.{}", group, key));
        prop_assert_eq!(resolve(Dialect::Current, &raw), None);
    }

    /// Current dialect: strings that are not dotted paths come back unchanged.
    #[test]
    fn plain_strings_pass_through(s in plain_string()) {
        let raw = Value::String(s.clone());
        prop_assert_eq!(resolve(Dialect::Current, &raw), Some(Value::String(s)));
    }

    /// Legacy dialect: a key absent from every probed group passes through.
    #[test]
    fn legacy_miss_passes_through(
        s in "[a-z][a-z0-9_.]{0,12}".prop_filter("probed key", |s| s != "x" && s != "list")
    ) {
        let raw = Value::String(s.clone());
        prop_assert_eq!(resolve(Dialect::Legacy, &raw), Some(Value::String(s)));
    }
}

// =============================================================================
// Lists and mappings
// =============================================================================

proptest! {
    /// Current dialect: a list always resolves to a list of the same length,
    /// unresolved elements replaced by their raw form.
    #[test]
    fn current_list_preserves_length(items in prop::collection::vec(leaf(), 0..8)) {
        let raw = Value::Sequence(items.clone());
        let resolved = resolve(Dialect::Current, &raw);
        match resolved {
            Some(Value::Sequence(out)) => {
                prop_assert_eq!(out.len(), items.len());
                for (o, i) in out.iter().zip(&items) {
                    if i == &Value::String("method.x".into()) {
                        prop_assert_eq!(o, &Value::from(1));
                    } else {
                        prop_assert_eq!(o, i);
                    }
                }
            }
            other => prop_assert!(false, "expected a list, got {:?}", other),
        }
    }

    /// Legacy dialect: a list resolves to its first non-null element.
    #[test]
    fn legacy_list_first_non_null(items in prop::collection::vec(
        prop_oneof![Just(Value::Null), any::<i32>().prop_map(Value::from)], 0..8)
    ) {
        let expected = items.iter().find(|v| !v.is_null()).cloned();
        prop_assert_eq!(resolve(Dialect::Legacy, &Value::Sequence(items)), expected);
    }

    /// A mapping whose members all miss is null, never an empty mapping.
    #[test]
    fn all_null_mapping_is_null(keys in prop::collection::vec(identifier(), 0..6)) {
        let mut map = Mapping::new();
        for key in keys {
            map.insert(Value::String(key), Value::String("nope.x".into()));
        }
        prop_assert_eq!(resolve(Dialect::Current, &Value::Mapping(map)), None);
    }
}

// =============================================================================
// Selector and script
// =============================================================================

proptest! {
    /// `idx` outside the list bounds is null, never a failure.
    #[test]
    fn selector_out_of_range_is_null(
        len in 0usize..6,
        offset in 0i64..100,
        negative in any::<bool>(),
    ) {
        let list: Vec<Value> = (0..len).map(|i| Value::from(i as i64)).collect();
        let n = len as i64;
        let idx = if negative { -n - 1 - offset } else { n + offset };
        let mut map = Mapping::new();
        map.insert("key".into(), Value::Sequence(list));
        map.insert("idx".into(), Value::from(idx));
        prop_assert_eq!(resolve(Dialect::Current, &Value::Mapping(map)), None);
    }

    /// `idx` inside the bounds picks the element.
    #[test]
    fn selector_in_range_picks_element(len in 1usize..6, pick in 0usize..6) {
        let pick = pick % len;
        let list: Vec<Value> = (0..len).map(|i| Value::from(i as i64 * 10)).collect();
        let mut map = Mapping::new();
        map.insert("key".into(), Value::Sequence(list));
        map.insert("idx".into(), Value::from(pick as i64));
        prop_assert_eq!(
            resolve(Dialect::Current, &Value::Mapping(map)),
            Some(Value::from(pick as i64 * 10))
        );
    }

    /// A null sibling nulls the script node before the expression runs,
    /// even when the expression itself would fail.
    #[test]
    fn null_sibling_nulls_script(name in "[a-z]{1,6}", expr in prop_oneof![
        Just("1 / 0"), Just("undefined"), Just("42"), Just("(")
    ]) {
        let mut map = Mapping::new();
        map.insert("script".into(), Value::String(expr.to_string()));
        map.insert(Value::String(name), Value::String("nope.x".into()));
        prop_assert_eq!(resolve(Dialect::Current, &Value::Mapping(map)), None);
    }

    /// Integer arithmetic in scripts agrees with Rust's checked arithmetic.
    #[test]
    fn script_integer_sum(a in -1_000_000i64..1_000_000, b in -1_000_000i64..1_000_000) {
        let mut map = Mapping::new();
        map.insert("script".into(), Value::String("a + b * 2".into()));
        map.insert("a".into(), Value::from(a));
        map.insert("b".into(), Value::from(b));
        prop_assert_eq!(
            resolve(Dialect::Current, &Value::Mapping(map)),
            Some(Value::from(a + b * 2))
        );
    }
}

// =============================================================================
// Whole recipes
// =============================================================================

proptest! {
    /// The result set never holds null and never has keys the recipe lacks.
    #[test]
    fn results_never_hold_null(entries in prop::collection::vec((identifier(), leaf()), 0..10)) {
        let mut recipe = Mapping::new();
        for (key, value) in entries {
            recipe.insert(Value::String(key), value);
        }
        let r = resource();
        let resolved = Recipe::for_resource(&r, &recipe, &RecipeOptions::default());
        for (key, value) in resolved.get() {
            prop_assert!(!value.is_null());
            prop_assert!(recipe.contains_key(key.as_str()));
        }
    }

    /// Resolution is deterministic.
    #[test]
    fn resolution_is_deterministic(entries in prop::collection::vec((identifier(), leaf()), 0..10)) {
        let mut recipe = Mapping::new();
        for (key, value) in entries {
            recipe.insert(Value::String(key), value);
        }
        let r = resource();
        let first = Recipe::for_resource(&r, &recipe, &RecipeOptions::default());
        let second = Recipe::for_resource(&r, &recipe, &RecipeOptions::default());
        prop_assert_eq!(first.get(), second.get());
    }
}
