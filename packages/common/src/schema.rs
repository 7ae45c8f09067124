//! Block type definitions, presets and exported block structures.

use crate::page::BlockProperties;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

fn is_false(value: &bool) -> bool {
    !*value
}

/// A configurable property of a block type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertyField {
    pub id: String,

    #[serde(rename = "type", default)]
    pub field_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    /// Group name used to organize fields in editors
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,

    /// Field-type specific settings
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PropertyField {
    pub fn new(id: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            field_type: field_type.into(),
            label: None,
            default: None,
            group: None,
            extra: Map::new(),
        }
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// Registered definition of a block type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockSchema {
    #[serde(rename = "type")]
    pub block_type: String,

    #[serde(default)]
    pub properties: Vec<PropertyField>,

    /// Child type patterns. `None` means the type accepts no children.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accepts: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub presets: Vec<BlockPreset>,

    /// Only nestable where a parent lists this exact type
    #[serde(default, skip_serializing_if = "is_false")]
    pub private: bool,

    /// Editor metadata (`name`, `icon`, `category`, ...)
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub meta: Map<String, Value>,
}

impl BlockSchema {
    pub fn new(block_type: impl Into<String>) -> Self {
        Self {
            block_type: block_type.into(),
            properties: Vec::new(),
            accepts: None,
            presets: Vec::new(),
            private: false,
            meta: Map::new(),
        }
    }

    pub fn with_property(mut self, field: PropertyField) -> Self {
        self.properties.push(field);
        self
    }

    pub fn accepting<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.accepts = Some(patterns.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_preset(mut self, preset: BlockPreset) -> Self {
        self.presets.push(preset);
        self
    }

    pub fn private(mut self) -> Self {
        self.private = true;
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.meta.insert("name".to_string(), Value::String(name.into()));
        self
    }

    /// Human readable name from `meta.name`
    pub fn display_name(&self) -> Option<&str> {
        self.meta.get("name").and_then(Value::as_str)
    }

    /// Every field default, keyed by field id
    pub fn default_properties(&self) -> BlockProperties {
        self.properties
            .iter()
            .filter_map(|field| {
                field
                    .default
                    .as_ref()
                    .map(|value| (field.id.clone(), value.clone()))
            })
            .collect()
    }

    /// Schema defaults with `overrides` merged on top (shallow)
    pub fn build_properties(&self, overrides: &BlockProperties) -> BlockProperties {
        let mut properties = self.default_properties();
        for (key, value) in overrides {
            properties.insert(key.clone(), value.clone());
        }
        properties
    }
}

/// Reusable template for a block type
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockPreset {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub properties: BlockProperties,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<BlockStructure>,
}

impl BlockPreset {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_properties(mut self, properties: BlockProperties) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_child(mut self, child: BlockStructure) -> Self {
        self.children.push(child);
        self
    }
}

/// Nested, id-free description of a block tree.
///
/// Used for preset children and for copy/paste of existing blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockStructure {
    #[serde(rename = "type")]
    pub block_type: String,

    /// Id the structure was exported from (or a semantic id for presets)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_id: Option<String>,

    #[serde(default)]
    pub properties: BlockProperties,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, rename = "static", skip_serializing_if = "is_false")]
    pub is_static: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub disabled: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub repeated: bool,

    #[serde(default, skip_serializing_if = "is_false")]
    pub ghost: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<BlockStructure>,
}

impl BlockStructure {
    pub fn new(block_type: impl Into<String>) -> Self {
        Self {
            block_type: block_type.into(),
            id: None,
            semantic_id: None,
            properties: BlockProperties::new(),
            name: None,
            is_static: false,
            disabled: false,
            repeated: false,
            ghost: false,
            children: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_properties(mut self, properties: BlockProperties) -> Self {
        self.properties = properties;
        self
    }

    pub fn with_child(mut self, child: BlockStructure) -> Self {
        self.children.push(child);
        self
    }

    pub fn static_block(mut self) -> Self {
        self.is_static = true;
        self
    }

    /// Number of nodes in this structure, root included
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(BlockStructure::node_count).sum::<usize>()
    }

    /// The semantic id a materialized block should carry
    pub fn resolved_semantic_id(&self) -> Option<&str> {
        self.semantic_id.as_deref().or(self.id.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_properties_skip_fields_without_default() {
        let schema = BlockSchema::new("text")
            .with_property(PropertyField::new("content", "text").with_default(json!("Hello")))
            .with_property(PropertyField::new("color", "color"));

        let props = schema.default_properties();
        assert_eq!(props.len(), 1);
        assert_eq!(props["content"], json!("Hello"));
    }

    #[test]
    fn test_build_properties_overrides_defaults() {
        let schema = BlockSchema::new("text")
            .with_property(PropertyField::new("content", "text").with_default(json!("Hello")))
            .with_property(PropertyField::new("size", "number").with_default(json!(14)));

        let mut overrides = BlockProperties::new();
        overrides.insert("content".into(), json!("Bye"));
        overrides.insert("weight".into(), json!("bold"));

        let props = schema.build_properties(&overrides);
        assert_eq!(props["content"], json!("Bye"));
        assert_eq!(props["size"], json!(14));
        assert_eq!(props["weight"], json!("bold"));
    }

    #[test]
    fn test_parse_schema_json() {
        let json = r#"{
            "type": "section",
            "properties": [
                { "id": "padding", "type": "range", "default": 8, "min": 0, "max": 64 }
            ],
            "accepts": ["*"],
            "presets": [
                { "name": "Hero", "properties": { "padding": 32 }, "children": [{ "type": "text" }] }
            ],
            "meta": { "name": "Section" }
        }"#;

        let schema: BlockSchema = serde_json::from_str(json).unwrap();
        assert_eq!(schema.block_type, "section");
        assert_eq!(schema.display_name(), Some("Section"));
        assert_eq!(schema.properties[0].extra["max"], json!(64));
        assert_eq!(schema.presets[0].children[0].block_type, "text");
        assert!(!schema.private);
    }

    #[test]
    fn test_structure_node_count() {
        let structure = BlockStructure::new("box")
            .with_child(BlockStructure::new("text"))
            .with_child(BlockStructure::new("box").with_child(BlockStructure::new("text")));
        assert_eq!(structure.node_count(), 4);
    }
}
