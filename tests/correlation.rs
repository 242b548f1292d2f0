//! Response correlation feeding the relationship index.

use atlas_engine::{
    format_resource_map, Correlation, ResourceValue, RunContext, SchemaNode, ValueMap, ValueSet,
};
use serde_json::json;

fn set(values: &[i64]) -> ValueSet {
    values.iter().map(|v| ResourceValue::from(*v)).collect()
}

fn store_schema() -> SchemaNode {
    SchemaNode::from_json_value(json!({
        "type": "object",
        "properties": {
            "owner": {"type": "integer", "resource": "owner"},
            "store": {"type": "integer", "resource": "store"},
            "tags": {"type": "array", "items": {"type": "integer", "resource": "tag"}},
            "pets": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "id": {"type": "integer", "resource": "pet"},
                        "category": {"type": "integer", "resource": "category"}
                    }
                }
            }
        }
    }))
    .unwrap()
}

#[test]
fn test_nested_response_yields_one_row_per_branch() {
    let context = RunContext::with_seed(42);
    let correlator = context.correlator("default");

    let response = json!({
        "owner": 7,
        "store": 70,
        "tags": [100, 101],
        "pets": [
            {"id": 1, "category": 10},
            {"id": 2, "category": 10},
            {"id": 3, "category": 30}
        ]
    });

    let tree = correlator.parse(&store_schema(), &response);
    let rows = format_resource_map(&tree);

    let shared = ValueMap::from([
        ("owner".to_string(), set(&[7])),
        ("store".to_string(), set(&[70])),
    ]);
    let with = |name: &str, values: &[i64]| {
        let mut row = shared.clone();
        row.insert(name.to_string(), set(values));
        row
    };
    let pet_row = |pet: i64, category: i64| {
        let mut row = with("pet", &[pet]);
        row.insert("category".to_string(), set(&[category]));
        row
    };

    assert_eq!(
        rows,
        vec![
            pet_row(1, 10),
            pet_row(2, 10),
            pet_row(3, 30),
            with("tag", &[100, 101]),
        ]
    );
}

#[test]
fn test_resolve_populates_pools_and_relations() {
    let context = RunContext::with_seed(42);
    let correlator = context.correlator("default");

    let response = json!({
        "owner": 7,
        "tags": [100, 101],
        "pets": [{"id": 1, "category": 10}, {"id": 2, "category": 20}]
    });
    let usage = ValueMap::from([("user".to_string(), set(&[5]))]);

    let rows = correlator.resolve(&store_schema(), &response, &usage);
    assert_eq!(rows.len(), 3);

    assert_eq!(context.pool().len("default", "pet"), 2);
    assert_eq!(context.pool().len("default", "tag"), 2);
    assert_eq!(context.pool().len("default", "owner"), 1);
    // Request-side values are indexed but not merged.
    assert_eq!(context.pool().len("default", "user"), 0);

    let pets = context.relations().query(&["pet", "category"], "default");
    assert_eq!(pets.len(), 2);
    assert!(pets
        .iter()
        .any(|row| row["pet"] == ResourceValue::from(2) && row["category"] == ResourceValue::from(20)));

    // One owner, two tags: a single multi-valued name is expanded.
    assert_eq!(context.relations().len(&["owner", "tag"], "default"), 2);
    assert_eq!(context.relations().len(&["user", "owner", "pet"], "default"), 2);
    // Tags and pets sit in separate branches.
    assert_eq!(context.relations().len(&["tag", "pet"], "default"), 0);
}

#[test]
fn test_flat_response_pools_values_without_relations() {
    let context = RunContext::with_seed(42);
    let correlator = context.correlator("default");
    let schema = SchemaNode::from_json_value(json!({
        "type": "object",
        "properties": {
            "id": {"type": "integer", "resource": "pet"},
            "owner": {"type": "integer", "resource": "owner"}
        }
    }))
    .unwrap();

    let tree = correlator.parse(&schema, &json!({"id": 1, "owner": 7}));
    assert!(matches!(tree, Correlation::Row(_)));
    assert!(format_resource_map(&tree).is_empty());

    let rows = correlator.resolve(&schema, &json!({"id": 1, "owner": 7}), &ValueMap::new());
    assert!(rows.is_empty());
    assert_eq!(context.relations().len(&["pet", "owner"], "default"), 0);
    assert_eq!(context.pool().len("default", "pet"), 1);
    assert_eq!(context.pool().len("default", "owner"), 1);
}

#[test]
fn test_relation_selection_after_correlation() {
    let context = RunContext::with_seed(42);
    let correlator = context.correlator("default");
    let schema = store_schema();
    correlator.resolve(
        &schema,
        &json!({"pets": [{"id": 1, "category": 10}, {"id": 2, "category": 20}]}),
        &ValueMap::new(),
    );

    let mut provider = context.provider("default");
    let request = SchemaNode::from_json_value(json!({
        "type": "object",
        "properties": {
            "petId": {"resource": "pet"},
            "categoryId": {"resource": "category"}
        }
    }))
    .unwrap();

    for _ in 0..20 {
        assert!(provider.select_related(&["pet", "category"]));
        let value = provider.resolve(&request).unwrap();
        let expected_category = match value["petId"].as_i64().unwrap() {
            1 => 10,
            2 => 20,
            other => panic!("unexpected pet {other}"),
        };
        assert_eq!(value["categoryId"], json!(expected_category));
        provider.reset();
    }
}
