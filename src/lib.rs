//! reshipe: declarative recipes resolved against resource attribute groups.
//!
//! A recipe maps output keys to nodes: literals, `group.key` references,
//! lists, selectors, alternatives and small expressions. [`Recipe::resolve`]
//! evaluates every node against an ordered list of resources and keeps the
//! entries that produce a value.

pub mod cli;
pub mod core;
pub mod script;

pub use crate::core::recipe::{parse_recipe, validate_recipe, Recipe};
pub use crate::core::resource::{AttributeGroup, Resource, StaticResource};
pub use crate::core::types::{Dialect, RecipeOptions, ResultSet};
