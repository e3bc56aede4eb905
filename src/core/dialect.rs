//! Dialect strategies.
//!
//! A dialect is composed once per pass from three independent pieces: how
//! strings resolve, how lists combine their elements, and which mapping key
//! marks a script node. Resolvers dispatch on these strategy values and never
//! look at the dialect flag directly.

use super::types::Dialect;
use regex::Regex;
use std::sync::OnceLock;

/// Attribute groups probed, in order, by the legacy key strategy.
pub const LEGACY_GROUPS: [&str; 3] = ["acqp", "method", "visu_pars"];

/// Script key in the current dialect.
pub const SCRIPT_KEY: &str = "script";

/// Script key in the legacy dialect.
pub const LEGACY_SCRIPT_KEY: &str = "Equation";

/// How a recipe string is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringStrategy {
    /// `group.key` looks up `key` in `group`; a missing group is null and
    /// any other string is a literal.
    DottedPath,
    /// The whole string is a key probed against [`LEGACY_GROUPS`]; a miss
    /// returns the string itself.
    LegacyKey,
}

/// How a recipe list combines its resolved elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListStrategy {
    /// Resolve every element, keeping the raw element where resolution is null.
    MapWithFallback,
    /// Return the first element that resolves to non-null.
    FirstAvailable,
}

/// The strategy set for one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strategies {
    pub strings: StringStrategy,
    pub lists: ListStrategy,
    pub script_key: &'static str,
    /// Whether `{first_avail: [...]}` is a node of its own.
    pub first_avail_node: bool,
}

impl Strategies {
    pub fn for_dialect(dialect: Dialect) -> Self {
        match dialect {
            Dialect::Current => Self {
                strings: StringStrategy::DottedPath,
                lists: ListStrategy::MapWithFallback,
                script_key: SCRIPT_KEY,
                first_avail_node: true,
            },
            Dialect::Legacy => Self {
                strings: StringStrategy::LegacyKey,
                lists: ListStrategy::FirstAvailable,
                script_key: LEGACY_SCRIPT_KEY,
                first_avail_node: false,
            },
        }
    }
}

impl From<Dialect> for Strategies {
    fn from(dialect: Dialect) -> Self {
        Self::for_dialect(dialect)
    }
}

fn dotted_path_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<group>[A-Za-z][A-Za-z0-9_]*)\.(?P<key>[A-Za-z][A-Za-z0-9_]*)$")
            .expect("dotted path pattern is valid")
    })
}

/// Split `group.key` into its parts. Anything else (extra dots, leading
/// digits, whitespace) is not a dotted path.
pub fn split_dotted_path(s: &str) -> Option<(&str, &str)> {
    let caps = dotted_path_regex().captures(s)?;
    let group = caps.name("group")?.as_str();
    let key = caps.name("key")?.as_str();
    Some((group, key))
}
