//! The parsed recipe tree.
//!
//! Raw recipe data is parsed once, under a pass's [`Strategies`], into a
//! tagged [`Node`] tree. The resolver dispatches on the tag and never
//! inspects raw shapes again.

use super::dialect::{split_dotted_path, StringStrategy, Strategies};
use super::types::value_to_string;
use indexmap::IndexMap;
use serde_yaml_ng::{Mapping, Value};

/// Key that introduces a selector node.
pub const SELECTOR_KEY: &str = "key";
/// Selector sub-key: find the index of a value.
pub const WHERE_KEY: &str = "where";
/// Selector sub-key: take the element at an index.
pub const IDX_KEY: &str = "idx";
/// Sole key of a first-available node.
pub const FIRST_AVAIL_KEY: &str = "first_avail";

/// One recipe node.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Passed through unchanged.
    Literal(Value),
    /// `group.key` attribute reference.
    DottedPath { group: String, key: String },
    /// Bare key probed against the legacy groups.
    LegacyKey(String),
    /// A list; combined by the pass's list strategy.
    List(Vec<ListItem>),
    /// Expression evaluated against sibling bindings.
    Script(ScriptNode),
    /// `key` + `where`/`idx` list selection.
    Selector(SelectorNode),
    /// `{first_avail: [...]}`.
    FirstAvailable(Vec<Node>),
    /// Any other mapping, resolved member-wise.
    Mapping(IndexMap<String, Node>),
}

/// A list element with the raw value it was parsed from.
#[derive(Debug, Clone, PartialEq)]
pub struct ListItem {
    pub raw: Value,
    pub node: Node,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScriptNode {
    /// Expression source text
    pub source: String,
    /// Sibling bindings, in mapping order
    pub bindings: IndexMap<String, Node>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectorNode {
    /// Resolves to the candidate list
    pub key: Box<Node>,
    pub mode: SelectorMode,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectorMode {
    /// Index of the first element equal to the resolved target
    Where(Box<Node>),
    /// Element at the resolved index
    Idx(Box<Node>),
    /// Neither `where` nor `idx` given; always null
    Missing,
}

impl Node {
    /// Parse a raw recipe value.
    pub fn parse(value: &Value, strategies: &Strategies) -> Node {
        match value {
            Value::String(s) => parse_string(s, strategies),
            Value::Sequence(items) => Node::List(
                items
                    .iter()
                    .map(|raw| ListItem {
                        raw: raw.clone(),
                        node: Node::parse(raw, strategies),
                    })
                    .collect(),
            ),
            Value::Mapping(map) => parse_mapping(map, strategies),
            Value::Tagged(tagged) => Node::parse(&tagged.value, strategies),
            other => Node::Literal(other.clone()),
        }
    }

    /// Short name of the node kind, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Literal(_) => "literal",
            Node::DottedPath { .. } => "dotted path",
            Node::LegacyKey(_) => "legacy key",
            Node::List(_) => "list",
            Node::Script(_) => "script",
            Node::Selector(_) => "selector",
            Node::FirstAvailable(_) => "first_avail",
            Node::Mapping(_) => "mapping",
        }
    }
}

fn parse_string(s: &str, strategies: &Strategies) -> Node {
    match strategies.strings {
        StringStrategy::DottedPath => match split_dotted_path(s) {
            Some((group, key)) => Node::DottedPath {
                group: group.to_string(),
                key: key.to_string(),
            },
            None => Node::Literal(Value::String(s.to_string())),
        },
        StringStrategy::LegacyKey => Node::LegacyKey(s.to_string()),
    }
}

fn parse_mapping(map: &Mapping, strategies: &Strategies) -> Node {
    if let Some(script) = map.get(strategies.script_key) {
        let bindings = map
            .iter()
            .filter(|(k, _)| k.as_str() != Some(strategies.script_key))
            .map(|(k, v)| (value_to_string(k), Node::parse(v, strategies)))
            .collect();
        return Node::Script(ScriptNode {
            source: value_to_string(script),
            bindings,
        });
    }

    if let Some(key) = map.get(SELECTOR_KEY) {
        let mode = if let Some(target) = map.get(WHERE_KEY) {
            SelectorMode::Where(Box::new(Node::parse(target, strategies)))
        } else if let Some(idx) = map.get(IDX_KEY) {
            SelectorMode::Idx(Box::new(Node::parse(idx, strategies)))
        } else {
            SelectorMode::Missing
        };
        return Node::Selector(SelectorNode {
            key: Box::new(Node::parse(key, strategies)),
            mode,
        });
    }

    if strategies.first_avail_node && map.len() == 1 {
        if let Some(alternatives) = map.get(FIRST_AVAIL_KEY) {
            let nodes = match alternatives {
                Value::Sequence(items) => items
                    .iter()
                    .map(|item| Node::parse(item, strategies))
                    .collect(),
                single => vec![Node::parse(single, strategies)],
            };
            return Node::FirstAvailable(nodes);
        }
    }

    Node::Mapping(
        map.iter()
            .map(|(k, v)| (value_to_string(k), Node::parse(v, strategies)))
            .collect(),
    )
}
