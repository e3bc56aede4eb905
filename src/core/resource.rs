//! Resources and their attribute groups.
//!
//! A resource exposes named attribute groups (e.g. an instrument's `acqp`
//! or `method` parameter blocks). Each group is a key/value lookup. The
//! engine never mutates a resource; it only asks whether a group exists
//! and reads keys from it.

use super::error::{read_file, RecipeError};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_yaml_ng::{Mapping, Value};
use std::collections::HashMap;
use std::path::Path;

/// A named key/value lookup exposed by a resource.
pub trait AttributeGroup {
    /// Whether the group holds `key`.
    fn contains_key(&self, key: &str) -> bool;

    /// Borrow the value stored under `key`.
    fn get(&self, key: &str) -> Option<&Value>;

    /// Value under `key`, or `default` when absent.
    fn get_or(&self, key: &str, default: Option<Value>) -> Option<Value> {
        self.get(key).cloned().or(default)
    }
}

impl AttributeGroup for Mapping {
    fn contains_key(&self, key: &str) -> bool {
        Mapping::contains_key(self, key)
    }

    fn get(&self, key: &str) -> Option<&Value> {
        Mapping::get(self, key)
    }
}

impl AttributeGroup for IndexMap<String, Value> {
    fn contains_key(&self, key: &str) -> bool {
        IndexMap::contains_key(self, key)
    }

    fn get(&self, key: &str) -> Option<&Value> {
        IndexMap::get(self, key)
    }
}

impl AttributeGroup for HashMap<String, Value> {
    fn contains_key(&self, key: &str) -> bool {
        HashMap::contains_key(self, key)
    }

    fn get(&self, key: &str) -> Option<&Value> {
        HashMap::get(self, key)
    }
}

/// Something recipes can read attribute groups from.
pub trait Resource {
    /// The attribute group called `name`, if this resource exposes one.
    fn attribute_group(&self, name: &str) -> Option<&dyn AttributeGroup>;

    fn has_attribute_group(&self, name: &str) -> bool {
        self.attribute_group(name).is_some()
    }

    /// Short label used in diagnostics.
    fn label(&self) -> &str {
        "resource"
    }
}

/// Find the first target that exposes `group`. Target order is priority order.
pub fn find_group_owner<'a>(
    targets: &[&'a dyn Resource],
    group: &str,
) -> Option<&'a dyn Resource> {
    targets
        .iter()
        .copied()
        .find(|target| target.has_attribute_group(group))
}

// ============================================================================
// In-memory resource
// ============================================================================

/// A resource held entirely in memory, loadable from YAML or JSON.
///
/// ```yaml
/// name: scan-7
/// groups:
///   acqp:
///     ACQ_flip_angle: 30
///   method:
///     PVM_RepetitionTime: 1500.0
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StaticResource {
    /// Label for diagnostics
    #[serde(default)]
    pub name: Option<String>,

    /// Attribute groups (order-preserving)
    #[serde(default)]
    pub groups: IndexMap<String, IndexMap<String, Value>>,
}

impl StaticResource {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            groups: IndexMap::new(),
        }
    }

    /// Add (or replace) an attribute group.
    pub fn with_group<I, K>(mut self, group: impl Into<String>, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let entries = entries.into_iter().map(|(k, v)| (k.into(), v)).collect();
        self.groups.insert(group.into(), entries);
        self
    }
}

impl Resource for StaticResource {
    fn attribute_group(&self, name: &str) -> Option<&dyn AttributeGroup> {
        self.groups
            .get(name)
            .map(|group| group as &dyn AttributeGroup)
    }

    fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("resource")
    }
}

/// Load a resource from a YAML or JSON file.
pub fn load_resource(path: &Path) -> Result<StaticResource, RecipeError> {
    let content = read_file(path)?;
    let mut resource = parse_resource(&content)?;
    if resource.name.is_none() {
        resource.name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned());
    }
    Ok(resource)
}

/// Parse a resource from YAML or JSON text.
pub fn parse_resource(text: &str) -> Result<StaticResource, RecipeError> {
    let value: Value = serde_yaml_ng::from_str(text)?;
    match value {
        Value::Mapping(_) => Ok(serde_yaml_ng::from_value(value)?),
        Value::Null => Ok(StaticResource::default()),
        other => Err(RecipeError::invalid_resource(format!(
            "expected a mapping, got {}",
            kind_of(&other)
        ))),
    }
}

pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan() -> StaticResource {
        StaticResource::new("scan").with_group(
            "acqp",
            [("NR", Value::from(4)), ("ACQ_method", Value::from("FLASH"))],
        )
    }

    #[test]
    fn test_resource_group_lookup() {
        let r = scan();
        let group = r.attribute_group("acqp").unwrap();
        assert!(group.contains_key("NR"));
        assert_eq!(group.get("NR"), Some(&Value::from(4)));
        assert!(r.attribute_group("method").is_none());
        assert!(!r.has_attribute_group("method"));
    }

    #[test]
    fn test_resource_get_or_default() {
        let r = scan();
        let group = r.attribute_group("acqp").unwrap();
        assert_eq!(group.get_or("missing", None), None);
        assert_eq!(
            group.get_or("missing", Some(Value::from(1))),
            Some(Value::from(1))
        );
        assert_eq!(group.get_or("NR", None), Some(Value::from(4)));
    }

    #[test]
    fn test_resource_find_owner_priority() {
        let a = StaticResource::new("a").with_group("method", [("x", Value::from(1))]);
        let b = StaticResource::new("b")
            .with_group("method", [("x", Value::from(2))])
            .with_group("acqp", [("y", Value::from(3))]);
        let targets: Vec<&dyn Resource> = vec![&a, &b];

        assert_eq!(find_group_owner(&targets, "method").unwrap().label(), "a");
        assert_eq!(find_group_owner(&targets, "acqp").unwrap().label(), "b");
        assert!(find_group_owner(&targets, "visu_pars").is_none());
    }

    #[test]
    fn test_resource_find_owner_empty_targets() {
        let targets: Vec<&dyn Resource> = vec![];
        assert!(find_group_owner(&targets, "acqp").is_none());
    }

    #[test]
    fn test_resource_mapping_group() {
        let mut m = Mapping::new();
        m.insert(Value::from("k"), Value::from(7));
        let group: &dyn AttributeGroup = &m;
        assert!(group.contains_key("k"));
        assert_eq!(group.get("k"), Some(&Value::from(7)));
    }

    #[test]
    fn test_resource_parse_yaml() {
        let yaml = r#"
name: scan-7
groups:
  acqp:
    NR: 4
  method:
    TE: 3.5
"#;
        let r = parse_resource(yaml).unwrap();
        assert_eq!(r.label(), "scan-7");
        assert_eq!(r.groups.len(), 2);
        assert_eq!(
            r.attribute_group("method").unwrap().get("TE"),
            Some(&Value::from(3.5))
        );
    }

    #[test]
    fn test_resource_parse_json() {
        let json = r#"{"groups": {"acqp": {"list": [1, 2, 3]}}}"#;
        let r = parse_resource(json).unwrap();
        assert!(r.has_attribute_group("acqp"));
        assert_eq!(r.label(), "resource");
    }

    #[test]
    fn test_resource_parse_rejects_scalar() {
        let err = parse_resource("42").unwrap_err();
        assert!(err.to_string().contains("expected a mapping"));
    }

    #[test]
    fn test_resource_load_file_names_from_stem() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subject-1.yaml");
        std::fs::write(&path, "groups:\n  acqp:\n    NR: 1\n").unwrap();
        let r = load_resource(&path).unwrap();
        assert_eq!(r.label(), "subject-1");
    }
}
