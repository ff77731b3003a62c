use anyhow::{Context, Result, bail};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Which side of its parent a subtree prefers to grow towards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

/// One record of the hierarchical input, recursively the same shape for children.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TreeValue {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(
        default,
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub children: Vec<TreeValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Side>,
    /// Raw row record for values produced by the CSV importer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
}

impl TreeValue {
    pub fn leaf(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_children(name: impl Into<String>, children: Vec<TreeValue>) -> Self {
        Self {
            name: name.into(),
            children,
            ..Self::default()
        }
    }

    pub fn node_count(&self) -> usize {
        let mut count = 0usize;
        let mut stack = vec![self];
        while let Some(value) = stack.pop() {
            count += 1;
            stack.extend(value.children.iter());
        }
        count
    }

    pub fn to_pretty_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize tree value")
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<TreeValue>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<TreeValue>>::deserialize(deserializer)?.unwrap_or_default())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

pub fn parse_tree_json(raw: &str) -> Result<TreeValue> {
    let parsed: Value = serde_json::from_str(raw).context("invalid JSON")?;
    if !parsed.is_object() {
        bail!("tree root must be an object, found {}", json_kind(&parsed));
    }

    TreeValue::deserialize(parsed).context("tree value does not match the expected shape")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_tree() {
        let raw = r#"{"name":"Root","children":[{"name":"A","content":"alpha","position":"left"},{"name":"B"}]}"#;
        let tree = parse_tree_json(raw).unwrap();
        assert_eq!(tree.name, "Root");
        assert_eq!(tree.children.len(), 2);
        assert_eq!(tree.children[0].content.as_deref(), Some("alpha"));
        assert_eq!(tree.children[0].position, Some(Side::Left));
        assert_eq!(tree.node_count(), 3);
    }

    #[test]
    fn rejects_null_root() {
        let error = parse_tree_json("null").unwrap_err();
        assert!(error.to_string().contains("null"));
    }

    #[test]
    fn rejects_non_object_root_and_children() {
        assert!(parse_tree_json("[1, 2]").is_err());
        assert!(parse_tree_json(r#"{"name":"Root","children":[3]}"#).is_err());
        assert!(parse_tree_json("{not json").is_err());
    }

    #[test]
    fn null_children_are_treated_as_empty() {
        let tree = parse_tree_json(r#"{"name":"Root","children":null}"#).unwrap();
        assert!(tree.children.is_empty());
    }
}
