//! Schema definitions for the atlas load testing engine.
//!
//! ## Type Hierarchy
//!
//! - `SchemaNode` - Recursive value description (type, format, constraints,
//!   optional `resource` pool to draw from)
//! - `ResourceOptions` - How a resource-backed node samples its pool
//! - `OperationSchema` - Request parameters, request body and response schema
//!   for one API operation
//! - `SchemaBook` - Collection of operations, loaded from YAML or JSON
//!
//! Field names follow the JSON-schema spelling used by API contracts
//! (`minLength`, `exclusiveMaximum`, `additionalProperties`, ...).

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

// ============================================================================
// Error Types
// ============================================================================

/// Error type for schema operations.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// Error reading schema file
    #[error("Failed to read schema file: {0}")]
    IoError(#[from] std::io::Error),

    /// Error parsing YAML
    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Error parsing JSON
    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Operation not found in schema book
    #[error("Operation not found: {0}")]
    OperationNotFound(String),
}

// ============================================================================
// Schema Nodes
// ============================================================================

/// Value kind declared by a schema node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    Integer,
    Number,
    String,
    Boolean,
    Array,
    Object,
    /// Any type the engine has no generator for (e.g. `file`)
    #[serde(other)]
    Other,
}

impl std::fmt::Display for SchemaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SchemaType::Integer => "integer",
            SchemaType::Number => "number",
            SchemaType::String => "string",
            SchemaType::Boolean => "boolean",
            SchemaType::Array => "array",
            SchemaType::Object => "object",
            SchemaType::Other => "other",
        };
        f.write_str(name)
    }
}

/// Sampling options for a resource-backed node.
///
/// `delete` forces `items` to 1. `flatForSingle` defaults to `items == 1` and
/// makes a single sampled value come back as a scalar instead of a list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceOptions {
    /// Number of values to draw (default 1)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<usize>,

    /// Remove the sampled value from the pool
    #[serde(default)]
    pub delete: bool,

    /// Return a scalar when exactly one value is drawn
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flat_for_single: Option<bool>,
}

impl ResourceOptions {
    /// Options drawing `items` values without deletion.
    pub fn with_items(items: usize) -> Self {
        Self {
            items: Some(items),
            ..Self::default()
        }
    }

    /// Options drawing and removing a single value.
    pub fn deleting() -> Self {
        Self {
            delete: true,
            ..Self::default()
        }
    }

    /// Effective number of values to draw.
    pub fn items(&self) -> usize {
        if self.delete {
            1
        } else {
            self.items.unwrap_or(1)
        }
    }

    /// Whether a single drawn value should be returned as a scalar.
    pub fn flat_for_single(&self) -> bool {
        self.flat_for_single.unwrap_or(self.items() == 1)
    }
}

/// Recursive description of a value to produce or to read from a response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaNode {
    /// Declared value kind
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub schema_type: Option<SchemaType>,

    /// Format refinement (`date`, `email`, `uuid`, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Resource pool to draw from instead of faking
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,

    /// Sampling options when `resource` is set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<ResourceOptions>,

    /// Allowed values
    #[serde(rename = "enum", default, skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,

    #[serde(default)]
    pub exclusive_minimum: bool,

    #[serde(default)]
    pub exclusive_maximum: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiple_of: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,

    /// Regular expression generated strings must match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    /// Element schema for arrays
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaNode>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_items: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,

    #[serde(default)]
    pub unique_items: bool,

    /// Declared object properties
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, SchemaNode>,

    /// Schema shared by every undeclared object key (a boolean flag reads as
    /// no schema)
    #[serde(
        default,
        deserialize_with = "node_or_flag",
        skip_serializing_if = "Option::is_none"
    )]
    pub additional_properties: Option<Box<SchemaNode>>,

    /// Number of synthetic keys to produce from `additionalProperties`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_properties: Option<usize>,
}

impl SchemaNode {
    /// Create a node of the given type with no constraints.
    pub fn of_type(schema_type: SchemaType) -> Self {
        Self {
            schema_type: Some(schema_type),
            ..Self::default()
        }
    }

    /// Create a node backed by the named resource pool.
    pub fn resource(name: impl Into<String>) -> Self {
        Self {
            resource: Some(name.into()),
            ..Self::default()
        }
    }

    /// Parse a node from an in-memory JSON value.
    pub fn from_json_value(value: serde_json::Value) -> Result<Self, SchemaError> {
        Ok(serde_json::from_value(value)?)
    }

    /// Format string, if any.
    pub fn format(&self) -> Option<&str> {
        self.format.as_deref()
    }

    /// Sampling options, defaulting to a single non-deleting draw.
    pub fn resource_options(&self) -> ResourceOptions {
        self.options.clone().unwrap_or_default()
    }

    /// True for `{}`: no type, no resource, no constraints.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn node_or_flag<'de, D>(deserializer: D) -> Result<Option<Box<SchemaNode>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NodeOrFlag {
        Flag(bool),
        Node(Box<SchemaNode>),
    }

    Ok(match Option::<NodeOrFlag>::deserialize(deserializer)? {
        Some(NodeOrFlag::Node(node)) => Some(node),
        Some(NodeOrFlag::Flag(_)) | None => None,
    })
}

// ============================================================================
// Operations
// ============================================================================

/// Request and response schemas for a single API operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationSchema {
    /// Operation identifier
    #[serde(alias = "operationId")]
    pub name: String,

    /// Resources whose values must be drawn from one observed relationship
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_resources: Vec<String>,

    /// URL parameters (path and query), usually an object node
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<SchemaNode>,

    /// Request body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<SchemaNode>,

    /// Successful response body
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<SchemaNode>,
}

fn default_version() -> u32 {
    1
}

/// Collection of operation schemas.
///
/// Produced by the external contract compiler and loaded once per run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaBook {
    /// Schema version
    #[serde(default = "default_version")]
    pub version: u32,

    /// Operations in execution order
    pub operations: Vec<OperationSchema>,

    /// Cached operation lookup (not serialized)
    #[serde(skip)]
    operation_map: HashMap<String, usize>,
}

impl SchemaBook {
    /// Create a book from a list of operations.
    pub fn new(operations: Vec<OperationSchema>) -> Self {
        let mut book = Self {
            version: default_version(),
            operations,
            operation_map: HashMap::new(),
        };
        book.build_operation_map();
        book
    }

    /// Load a book from a YAML or JSON file (chosen by extension).
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json(&content),
            _ => Self::from_yaml(&content),
        }
    }

    /// Parse a book from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self, SchemaError> {
        let mut book: SchemaBook = serde_yaml::from_str(yaml)?;
        book.build_operation_map();
        Ok(book)
    }

    /// Parse a book from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, SchemaError> {
        let mut book: SchemaBook = serde_json::from_str(json)?;
        book.build_operation_map();
        Ok(book)
    }

    fn build_operation_map(&mut self) {
        self.operation_map = self
            .operations
            .iter()
            .enumerate()
            .map(|(idx, op)| (op.name.clone(), idx))
            .collect();
    }

    /// Get an operation by name.
    pub fn get_operation(&self, name: &str) -> Option<&OperationSchema> {
        self.operation_map
            .get(name)
            .and_then(|&idx| self.operations.get(idx))
    }

    /// Get an operation by name, failing if it is unknown.
    pub fn operation(&self, name: &str) -> Result<&OperationSchema, SchemaError> {
        self.get_operation(name)
            .ok_or_else(|| SchemaError::OperationNotFound(name.to_string()))
    }

    /// All operation names in execution order.
    pub fn operation_names(&self) -> Vec<&str> {
        self.operations.iter().map(|op| op.name.as_str()).collect()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SAMPLE_BOOK: &str = r#"
version: 1
operations:
  - name: createPet
    body:
      type: object
      properties:
        name:
          type: string
          maxLength: 20
        category:
          resource: category
    response:
      type: object
      properties:
        id:
          type: integer
          resource: pet

  - operationId: deletePet
    relatedResources: [pet, category]
    parameters:
      type: object
      properties:
        petId:
          resource: pet
          options:
            delete: true
"#;

    #[test]
    fn test_parse_schema_node_constraints() {
        let node = SchemaNode::from_json_value(json!({
            "type": "integer",
            "minimum": 0,
            "maximum": 10,
            "exclusiveMinimum": true,
            "multipleOf": 2,
            "enum": [0, 2]
        }))
        .unwrap();

        assert_eq!(node.schema_type, Some(SchemaType::Integer));
        assert_eq!(node.minimum, Some(0.0));
        assert_eq!(node.maximum, Some(10.0));
        assert!(node.exclusive_minimum);
        assert!(!node.exclusive_maximum);
        assert_eq!(node.multiple_of, Some(2.0));
        assert_eq!(node.enum_values, vec![json!(0), json!(2)]);
    }

    #[test]
    fn test_parse_nested_node() {
        let node = SchemaNode::from_json_value(json!({
            "type": "array",
            "minItems": 2,
            "uniqueItems": true,
            "items": {
                "type": "object",
                "properties": {"id": {"resource": "pet"}},
                "additionalProperties": {"type": "string", "minProperties": 3}
            }
        }))
        .unwrap();

        let items = node.items.as_deref().unwrap();
        assert_eq!(node.min_items, Some(2));
        assert!(node.unique_items);
        assert_eq!(items.properties["id"].resource.as_deref(), Some("pet"));
        assert_eq!(
            items.additional_properties.as_ref().unwrap().min_properties,
            Some(3)
        );
    }

    #[test]
    fn test_additional_properties_flag() {
        let node = SchemaNode::from_json_value(json!({
            "type": "object",
            "additionalProperties": true
        }))
        .unwrap();
        assert!(node.additional_properties.is_none());

        assert!(SchemaNode::default().is_empty());
        assert!(!SchemaNode::of_type(SchemaType::String).is_empty());
    }

    #[test]
    fn test_unknown_type_is_other() {
        let node = SchemaNode::from_json_value(json!({"type": "file"})).unwrap();
        assert_eq!(node.schema_type, Some(SchemaType::Other));
    }

    #[test]
    fn test_resource_options_defaults() {
        let options = ResourceOptions::default();
        assert_eq!(options.items(), 1);
        assert!(options.flat_for_single());

        let options = ResourceOptions::with_items(3);
        assert_eq!(options.items(), 3);
        assert!(!options.flat_for_single());

        // Delete always draws a single value
        let options = ResourceOptions {
            items: Some(5),
            delete: true,
            flat_for_single: None,
        };
        assert_eq!(options.items(), 1);
        assert!(options.flat_for_single());
    }

    #[test]
    fn test_parse_schema_book() {
        let book = SchemaBook::from_yaml(SAMPLE_BOOK).unwrap();

        assert_eq!(book.version, 1);
        assert_eq!(book.operation_names(), vec!["createPet", "deletePet"]);

        let delete = book.operation("deletePet").unwrap();
        assert_eq!(delete.related_resources, vec!["pet", "category"]);
        let pet_id = &delete.parameters.as_ref().unwrap().properties["petId"];
        assert!(pet_id.resource_options().delete);
    }

    #[test]
    fn test_operation_not_found() {
        let book = SchemaBook::from_yaml(SAMPLE_BOOK).unwrap();
        let result = book.operation("nonexistent");
        assert!(matches!(result, Err(SchemaError::OperationNotFound(_))));
    }

    #[test]
    fn test_book_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.json");
        let book = SchemaBook::new(vec![OperationSchema {
            name: "listPets".to_string(),
            related_resources: vec![],
            parameters: None,
            body: None,
            response: Some(SchemaNode::of_type(SchemaType::Array)),
        }]);
        fs::write(&path, serde_json::to_string(&book).unwrap()).unwrap();

        let loaded = SchemaBook::from_file(&path).unwrap();
        let op = loaded.operation("listPets").unwrap();
        assert_eq!(
            op.response.as_ref().unwrap().schema_type,
            Some(SchemaType::Array)
        );
    }
}
