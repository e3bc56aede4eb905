//! Node resolution.
//!
//! [`Resolver::resolve`] turns a parsed [`Node`] into a value, or `None` when
//! the node misses. Misses never raise: they propagate upward and prune the
//! enclosing member or entry.

use super::dialect::{ListStrategy, Strategies, LEGACY_GROUPS};
use super::node::{ListItem, Node, ScriptNode, SelectorMode, SelectorNode};
use super::resource::{find_group_owner, kind_of, Resource};
use super::types::{as_index, non_null, normalize_index, values_equal};
use crate::script::Preamble;
use indexmap::IndexMap;
use serde_yaml_ng::{Mapping, Value};
use tracing::{debug, warn};

/// Resolves nodes against an ordered list of target resources.
pub struct Resolver<'a> {
    targets: &'a [&'a dyn Resource],
    strategies: Strategies,
    preamble: &'a Preamble,
}

impl<'a> Resolver<'a> {
    pub fn new(
        targets: &'a [&'a dyn Resource],
        strategies: Strategies,
        preamble: &'a Preamble,
    ) -> Self {
        Self {
            targets,
            strategies,
            preamble,
        }
    }

    pub fn strategies(&self) -> &Strategies {
        &self.strategies
    }

    /// Resolve one node. `None` is a miss.
    pub fn resolve(&self, node: &Node) -> Option<Value> {
        match node {
            Node::Literal(value) => non_null(value.clone()),
            Node::DottedPath { group, key } => self.resolve_dotted_path(group, key),
            Node::LegacyKey(key) => Some(self.resolve_legacy_key(key)),
            Node::List(items) => self.resolve_list(items),
            Node::Script(script) => self.resolve_script(script),
            Node::Selector(selector) => self.resolve_selector(selector),
            Node::FirstAvailable(alternatives) => self.first_available(alternatives),
            Node::Mapping(members) => self.resolve_mapping(members),
        }
    }

    // ========================================================================
    // Strings
    // ========================================================================

    /// `group.key`: null when no target exposes `group` or the key is absent.
    fn resolve_dotted_path(&self, group: &str, key: &str) -> Option<Value> {
        let Some(owner) = find_group_owner(self.targets, group) else {
            debug!(group, key, "no target exposes group");
            return None;
        };
        let value = owner
            .attribute_group(group)
            .and_then(|attrs| attrs.get_or(key, None))
            .and_then(non_null);
        if value.is_none() {
            debug!(group, key, resource = owner.label(), "attribute not found");
        }
        value
    }

    /// Probe the legacy groups in order; on a miss the key itself comes back.
    fn resolve_legacy_key(&self, key: &str) -> Value {
        for group in LEGACY_GROUPS {
            let found = find_group_owner(self.targets, group)
                .and_then(|owner| owner.attribute_group(group))
                .and_then(|attrs| attrs.get(key).cloned())
                .and_then(non_null);
            if let Some(value) = found {
                return value;
            }
        }
        debug!(key, "legacy key not found, passing through");
        Value::String(key.to_string())
    }

    // ========================================================================
    // Lists and alternatives
    // ========================================================================

    fn resolve_list(&self, items: &[ListItem]) -> Option<Value> {
        match self.strategies.lists {
            ListStrategy::MapWithFallback => Some(Value::Sequence(
                items
                    .iter()
                    .map(|item| self.resolve(&item.node).unwrap_or_else(|| item.raw.clone()))
                    .collect(),
            )),
            ListStrategy::FirstAvailable => items.iter().find_map(|item| self.resolve(&item.node)),
        }
    }

    fn first_available(&self, alternatives: &[Node]) -> Option<Value> {
        let found = alternatives.iter().find_map(|alt| self.resolve(alt));
        if found.is_none() {
            debug!(alternatives = alternatives.len(), "no alternative resolved");
        }
        found
    }

    // ========================================================================
    // Selector
    // ========================================================================

    fn resolve_selector(&self, selector: &SelectorNode) -> Option<Value> {
        if selector.mode == SelectorMode::Missing {
            debug!("selector has neither `where` nor `idx`");
            return None;
        }

        let Some(candidates) = self.resolve(&selector.key) else {
            warn!(kind = "null", "selector key did not resolve to a list");
            return None;
        };
        let items = match candidates {
            Value::Sequence(items) => items,
            Value::Tagged(tagged) => match tagged.value {
                Value::Sequence(items) => items,
                other => return not_a_list(&other),
            },
            other => return not_a_list(&other),
        };

        match &selector.mode {
            SelectorMode::Where(target) => {
                let target = self.resolve(target)?;
                let found = items.iter().position(|item| values_equal(item, &target));
                if found.is_none() {
                    debug!(candidates = items.len(), "selector target not in list");
                }
                found.map(|index| Value::Number((index as u64).into()))
            }
            SelectorMode::Idx(idx) => {
                let idx = self.resolve(idx)?;
                let Some(index) = as_index(&idx) else {
                    warn!(kind = kind_of(&idx), "selector index is not an integer");
                    return None;
                };
                match normalize_index(index, items.len()) {
                    Some(i) => non_null(items[i].clone()),
                    None => {
                        debug!(index, len = items.len(), "selector index out of range");
                        None
                    }
                }
            }
            SelectorMode::Missing => None,
        }
    }

    // ========================================================================
    // Script
    // ========================================================================

    fn resolve_script(&self, script: &ScriptNode) -> Option<Value> {
        let mut siblings = IndexMap::with_capacity(script.bindings.len());
        for (name, binding) in &script.bindings {
            match self.resolve(binding) {
                Some(value) => {
                    siblings.insert(name.clone(), value);
                }
                None => {
                    debug!(sibling = %name, "script sibling is null, node not evaluated");
                    return None;
                }
            }
        }

        match self.preamble.evaluator().evaluate(&script.source, &siblings) {
            Ok(value) => value,
            Err(err) => {
                warn!(script = %script.source, error = %err, "script node failed");
                None
            }
        }
    }

    // ========================================================================
    // Mapping
    // ========================================================================

    /// Members that resolve to null are dropped; an empty result is null.
    fn resolve_mapping(&self, members: &IndexMap<String, Node>) -> Option<Value> {
        let mut out = Mapping::new();
        for (name, member) in members {
            if let Some(value) = self.resolve(member) {
                out.insert(Value::String(name.clone()), value);
            }
        }
        if out.is_empty() {
            None
        } else {
            Some(Value::Mapping(out))
        }
    }
}

fn not_a_list(value: &Value) -> Option<Value> {
    warn!(kind = kind_of(value), "selector key did not resolve to a list");
    None
}
