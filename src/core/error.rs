//! Errors raised while loading recipes, resources and options.
//!
//! Resolution itself never fails: misses become null and are pruned.
//! These errors only cover getting data into the engine.

use std::path::PathBuf;
use thiserror::Error;

/// Loading and parsing errors.
#[derive(Error, Debug)]
pub enum RecipeError {
    /// File could not be read
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML (or JSON) syntax error
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),

    /// JSON encoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Well-formed data with the wrong shape for a recipe
    #[error("invalid recipe: {0}")]
    InvalidRecipe(String),

    /// Well-formed data with the wrong shape for a resource
    #[error("invalid resource: {0}")]
    InvalidResource(String),
}

impl RecipeError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_recipe(msg: impl Into<String>) -> Self {
        Self::InvalidRecipe(msg.into())
    }

    pub fn invalid_resource(msg: impl Into<String>) -> Self {
        Self::InvalidResource(msg.into())
    }
}

/// Read a file into a string, attaching the path to any error.
pub(crate) fn read_file(path: &std::path::Path) -> Result<String, RecipeError> {
    std::fs::read_to_string(path).map_err(|e| RecipeError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_invalid_recipe() {
        let e = RecipeError::invalid_recipe("top level must be a mapping");
        assert_eq!(e.to_string(), "invalid recipe: top level must be a mapping");
    }

    #[test]
    fn test_error_read_missing_file() {
        let err = read_file(std::path::Path::new("/nonexistent/recipe.yaml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/recipe.yaml"));
        assert!(matches!(err, RecipeError::Io { .. }));
    }

    #[test]
    fn test_error_from_yaml() {
        let yaml_err = serde_yaml_ng::from_str::<serde_yaml_ng::Value>("a: [").unwrap_err();
        let e: RecipeError = yaml_err.into();
        assert!(e.to_string().starts_with("YAML parse error"));
    }
}
