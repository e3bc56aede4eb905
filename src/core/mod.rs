//! Core engine: types, resources, dialects, node parsing, resolution.

pub mod dialect;
pub mod error;
pub mod node;
pub mod recipe;
pub mod resolver;
pub mod resource;
pub mod types;
