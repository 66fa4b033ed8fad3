/// Scenario 4: Structured Data and Schema Validation
///
/// Data payloads validate against the sibling schema role when one exists;
/// schema-role payloads validate against the embedded meta-schema;
/// schema-less data always passes.
mod common;

use serde_json::json;
use trellis_core::errors::TrellisError;
use trellis_core::model::{Blueprint, DataRole, DataStep, StructuredData};
use trellis_engine::{DataAccessor, Inventory};

use common::new_inventory;

fn data(value: serde_json::Value) -> StructuredData {
    StructuredData::from_json(&value)
}

fn resource_data(inventory: &Inventory) -> DataAccessor {
    inventory
        .tenants()
        .get("t1")
        .environments()
        .get("e1")
        .resources()
        .get("web")
        .data()
}

fn setup() -> Inventory {
    let inventory = new_inventory();
    inventory.tenants().create(Blueprint::new("t1")).unwrap();
    inventory
        .tenants()
        .get("t1")
        .environments()
        .create(Blueprint::new("e1"))
        .unwrap();
    inventory
        .tenants()
        .get("t1")
        .environments()
        .get("e1")
        .resources()
        .create(Blueprint::new("web"))
        .unwrap();
    inventory
}

#[test]
fn test_scenario_04_payload_violating_sibling_schema_fails() {
    // GIVEN a resource with a schema-role data entity requiring "a" to be
    // a string
    let inventory = setup();
    resource_data(&inventory)
        .create(
            DataRole::ConfigurationSchema,
            data(json!({
                "type": "object",
                "required": ["a"],
                "properties": { "a": { "type": "string" } }
            })),
        )
        .expect("schema attach");

    // WHEN attaching configuration data where "a" is an integer
    let result = resource_data(&inventory).create(DataRole::Configuration, data(json!({"a": 1})));

    // THEN the create fails with a validation error referencing the
    // resource's path
    match result {
        Err(TrellisError::Validation { path, findings }) => {
            assert!(path.contains("/r;web"));
            assert!(path.ends_with("d;configuration"));
            assert!(!findings.is_empty());
        }
        other => panic!("unexpected: {:?}", other),
    }

    // AND nothing was attached
    assert!(resource_data(&inventory)
        .get(DataRole::Configuration)
        .entity()
        .is_err());
}

#[test]
fn test_scenario_04_update_validates_too() {
    let inventory = setup();
    resource_data(&inventory)
        .create(
            DataRole::ConfigurationSchema,
            data(json!({
                "type": "object",
                "required": ["a"],
                "properties": { "a": { "type": "string" } }
            })),
        )
        .unwrap();
    resource_data(&inventory)
        .create(DataRole::Configuration, data(json!({"a": "ok"})))
        .expect("valid payload");

    // an update violating the schema is rejected, the old value stays
    let result =
        resource_data(&inventory).update(DataRole::Configuration, data(json!({"a": 1})));
    assert!(matches!(result, Err(TrellisError::Validation { .. })));

    let value = resource_data(&inventory)
        .get(DataRole::Configuration)
        .value()
        .unwrap();
    assert_eq!(value, data(json!({"a": "ok"})));
}

#[test]
fn test_scenario_04_schema_less_data_always_passes() {
    let inventory = setup();
    // no connectionConfigurationSchema sibling exists
    resource_data(&inventory)
        .create(
            DataRole::ConnectionConfiguration,
            data(json!({"anything": [1, "two", {"three": 3}]})),
        )
        .expect("schema-less data is always valid");
}

#[test]
fn test_scenario_04_schema_roles_validate_against_meta_schema() {
    let inventory = setup();

    // a schema document whose "type" is not a type name is itself invalid
    let result = resource_data(&inventory).create(
        DataRole::ConfigurationSchema,
        data(json!({"type": "uuid"})),
    );
    assert!(matches!(result, Err(TrellisError::Validation { .. })));

    // a well-formed schema document is accepted
    resource_data(&inventory)
        .create(
            DataRole::ConfigurationSchema,
            data(json!({"type": "object"})),
        )
        .expect("valid schema document");
}

#[test]
fn test_scenario_04_validation_is_idempotent() {
    let inventory = setup();
    resource_data(&inventory)
        .create(
            DataRole::ConfigurationSchema,
            data(json!({
                "type": "object",
                "required": ["a", "b"],
                "properties": { "c": { "type": "integer" } }
            })),
        )
        .unwrap();

    let attempt = || {
        resource_data(&inventory)
            .create(DataRole::Configuration, data(json!({"c": "nope"})))
            .unwrap_err()
    };

    // same payload, same schema: same verdict and the same ordered findings
    let first = attempt();
    let second = attempt();
    assert_eq!(first, second);
}

#[test]
fn test_scenario_04_data_reads() {
    let inventory = setup();
    resource_data(&inventory)
        .create(
            DataRole::Configuration,
            data(json!({"servers": ["alpha", "beta"], "port": 8080})),
        )
        .unwrap();

    let config = resource_data(&inventory).get(DataRole::Configuration);

    // full value round-trips structurally
    assert_eq!(
        config.value().unwrap(),
        data(json!({"servers": ["alpha", "beta"], "port": 8080}))
    );

    // descending by key and index
    let second = config
        .value_at(&[DataStep::Key("servers".to_string()), DataStep::Index(1)])
        .unwrap();
    assert_eq!(second, Some(StructuredData::Str("beta".to_string())));

    // shallow read prunes children
    let flat = config.flat_value().unwrap();
    assert_eq!(flat, StructuredData::Map(Default::default()));
}
