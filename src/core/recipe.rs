//! Recipe loading, resolution and validation.
//!
//! A recipe is a mapping from output key to recipe node. The reserved
//! `startup` entry holds statements that run before any script node. A
//! resolution pass parses every node under the pass's dialect, runs the
//! startup statements once, then resolves entries in recipe order, keeping
//! only those that resolve to a value.

use super::dialect::Strategies;
use super::error::{read_file, RecipeError};
use super::node::{ListItem, Node, SelectorMode};
use super::resolver::Resolver;
use super::resource::{kind_of, Resource};
use super::types::{value_to_string, Dialect, RecipeOptions, ResultSet};
use crate::script::{binding::is_identifier, compile_expression, compile_program, Preamble};
use serde_yaml_ng::{Mapping, Value};
use std::path::Path;
use tracing::{debug, warn};

/// Recipe key holding startup statements.
pub const STARTUP_KEY: &str = "startup";

/// The outcome of one resolution pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    results: ResultSet,
    startup_scripts: Vec<String>,
    dialect: Dialect,
}

impl Recipe {
    /// Resolve `recipe` against `targets` (in priority order).
    ///
    /// Never fails: entries that miss are left out of the result set and
    /// failures inside script nodes are logged.
    pub fn resolve(targets: &[&dyn Resource], recipe: &Mapping, options: &RecipeOptions) -> Self {
        let strategies = Strategies::for_dialect(options.dialect);

        let mut startup_scripts = options.startup_scripts.clone();
        if let Some(entry) = recipe.get(STARTUP_KEY) {
            startup_scripts.extend(collect_startup(entry));
        }
        let preamble = Preamble::build(startup_scripts.as_slice());
        let resolver = Resolver::new(targets, strategies, &preamble);

        let mut results = ResultSet::new();
        for (key, raw) in recipe {
            if key.as_str() == Some(STARTUP_KEY) {
                continue;
            }
            let name = value_to_string(key);
            let node = Node::parse(raw, &strategies);
            match resolver.resolve(&node) {
                Some(value) => {
                    results.insert(name, value);
                }
                None => debug!(entry = %name, kind = node.kind(), "entry resolved to null, omitted"),
            }
        }

        debug!(
            dialect = %options.dialect,
            targets = targets.len(),
            entries = results.len(),
            startup = startup_scripts.len(),
            "recipe resolved"
        );

        Self {
            results,
            startup_scripts,
            dialect: options.dialect,
        }
    }

    /// Resolve against a single resource.
    pub fn for_resource(target: &dyn Resource, recipe: &Mapping, options: &RecipeOptions) -> Self {
        Self::resolve(&[target], recipe, options)
    }

    /// The resolved entries, in recipe order.
    pub fn get(&self) -> &ResultSet {
        &self.results
    }

    pub fn into_results(self) -> ResultSet {
        self.results
    }

    /// External scripts followed by the recipe's own `startup` statements.
    pub fn startup_scripts(&self) -> &[String] {
        &self.startup_scripts
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }
}

/// Statements of a `startup` entry: a list (nulls dropped) or one string.
fn collect_startup(entry: &Value) -> Vec<String> {
    match entry {
        Value::Null => Vec::new(),
        Value::String(s) => vec![s.clone()],
        Value::Sequence(items) => items
            .iter()
            .enumerate()
            .filter_map(|(i, item)| match item {
                Value::Null => None,
                Value::String(s) => Some(s.clone()),
                other => {
                    warn!(index = i, kind = kind_of(other), "startup entry is not a string, skipping");
                    None
                }
            })
            .collect(),
        Value::Tagged(tagged) => collect_startup(&tagged.value),
        other => {
            warn!(kind = kind_of(other), "startup must be a list of strings, ignoring");
            Vec::new()
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Load a recipe from a YAML or JSON file.
pub fn load_recipe(path: &Path) -> Result<Mapping, RecipeError> {
    let content = read_file(path)?;
    parse_recipe(&content)
}

/// Parse a recipe from YAML or JSON text. The top level must be a mapping;
/// an empty document is an empty recipe.
pub fn parse_recipe(text: &str) -> Result<Mapping, RecipeError> {
    match serde_yaml_ng::from_str::<Value>(text)? {
        Value::Mapping(map) => Ok(map),
        Value::Null => Ok(Mapping::new()),
        other => Err(RecipeError::invalid_recipe(format!(
            "top level must be a mapping, got {}",
            kind_of(&other)
        ))),
    }
}

/// Load resolution options from a YAML file.
pub fn load_options(path: &Path) -> Result<RecipeOptions, RecipeError> {
    let content = read_file(path)?;
    parse_options(&content)
}

pub fn parse_options(text: &str) -> Result<RecipeOptions, RecipeError> {
    match serde_yaml_ng::from_str::<Value>(text)? {
        Value::Null => Ok(RecipeOptions::default()),
        value => Ok(serde_yaml_ng::from_value(value)?),
    }
}

// ============================================================================
// Validation
// ============================================================================

/// A problem found by [`validate_recipe`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Location in the recipe, e.g. `echo_time.script` or `startup[1]`
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Static checks on a recipe. Returns every problem found (empty = valid).
///
/// These are the things that would make an entry silently resolve to null
/// regardless of the resources it is run against.
pub fn validate_recipe(recipe: &Mapping, options: &RecipeOptions) -> Vec<ValidationError> {
    let strategies = Strategies::for_dialect(options.dialect);
    let mut errors = Vec::new();

    for (key, raw) in recipe {
        let name = value_to_string(key);
        if name == STARTUP_KEY {
            validate_startup(raw, &mut errors);
        } else {
            let node = Node::parse(raw, &strategies);
            validate_node(&node, &name, strategies.script_key, &mut errors);
        }
    }

    errors
}

fn validate_startup(entry: &Value, errors: &mut Vec<ValidationError>) {
    let items: Vec<(String, &Value)> = match entry {
        Value::Sequence(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| (format!("{}[{}]", STARTUP_KEY, i), item))
            .collect(),
        other => vec![(STARTUP_KEY.to_string(), other)],
    };

    for (path, item) in items {
        match item {
            Value::Null => {}
            Value::String(source) => {
                if let Err(err) = compile_program(source) {
                    errors.push(ValidationError {
                        path,
                        message: format!("startup statement does not parse: {}", err),
                    });
                }
            }
            other => errors.push(ValidationError {
                path,
                message: format!("startup entries must be strings, got {}", kind_of(other)),
            }),
        }
    }
}

fn validate_node(node: &Node, path: &str, script_key: &str, errors: &mut Vec<ValidationError>) {
    match node {
        Node::Literal(_) | Node::DottedPath { .. } | Node::LegacyKey(_) => {}
        Node::List(items) => {
            for (i, ListItem { node, .. }) in items.iter().enumerate() {
                validate_node(node, &format!("{}[{}]", path, i), script_key, errors);
            }
        }
        Node::Mapping(members) => {
            for (name, member) in members {
                validate_node(member, &format!("{}.{}", path, name), script_key, errors);
            }
        }
        Node::Script(script) => {
            if let Err(err) = compile_expression(&script.source) {
                errors.push(ValidationError {
                    path: format!("{}.{}", path, script_key),
                    message: format!("expression does not parse: {}", err),
                });
            }
            for (name, binding) in &script.bindings {
                let member_path = format!("{}.{}", path, name);
                if !is_identifier(name) {
                    errors.push(ValidationError {
                        path: member_path.clone(),
                        message: format!("'{}' cannot be bound as a script variable", name),
                    });
                }
                validate_node(binding, &member_path, script_key, errors);
            }
        }
        Node::Selector(selector) => {
            validate_node(&selector.key, &format!("{}.key", path), script_key, errors);
            match &selector.mode {
                SelectorMode::Where(target) => {
                    validate_node(target, &format!("{}.where", path), script_key, errors)
                }
                SelectorMode::Idx(idx) => {
                    validate_node(idx, &format!("{}.idx", path), script_key, errors)
                }
                SelectorMode::Missing => errors.push(ValidationError {
                    path: path.to_string(),
                    message: "selector needs `where` or `idx`".to_string(),
                }),
            }
        }
        Node::FirstAvailable(alternatives) => {
            if alternatives.is_empty() {
                errors.push(ValidationError {
                    path: path.to_string(),
                    message: "first_avail has no alternatives".to_string(),
                });
            }
            for (i, alt) in alternatives.iter().enumerate() {
                validate_node(alt, &format!("{}.first_avail[{}]", path, i), script_key, errors);
            }
        }
    }
}
