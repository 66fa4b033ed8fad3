/// Scenario 5: Deleting Data Entities
///
/// Deleting a data entity removes the implicit hasData edge and the value.
/// A data entity that never had a hasData edge still deletes cleanly, with
/// a warning logged instead of a failure.
mod common;

use std::collections::BTreeMap;

use serde_json::json;
use tracing::Level;
use trellis_core::logging_facility::init_test_capture;
use trellis_core::model::{Blueprint, DataRole, ElementKind, StructuredData, WellKnown};

use common::{new_inventory, resource_path};

fn setup() -> trellis_engine::Inventory {
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
fn test_scenario_05_delete_removes_value_and_edge() {
    let inventory = setup();
    let accessor = inventory
        .tenants()
        .get("t1")
        .environments()
        .get("e1")
        .resources()
        .get("web")
        .data();

    accessor
        .create(
            DataRole::Configuration,
            StructuredData::from_json(&json!({"a": 1})),
        )
        .unwrap();
    accessor.delete(DataRole::Configuration).expect("delete");
    assert!(accessor.get(DataRole::Configuration).entity().is_err());

    // re-creating under the same role works afterwards
    accessor
        .create(
            DataRole::Configuration,
            StructuredData::from_json(&json!({"a": 2})),
        )
        .expect("recreate after delete");
}

#[test]
fn test_scenario_05_missing_has_data_edge_logs_and_proceeds() {
    let capture = init_test_capture();
    capture.clear();

    // GIVEN a data entity persisted without its hasData edge (backdoor
    // write through the backend, as a buggy adapter might leave behind)
    let inventory = setup();
    let backend = inventory.backend();
    let web = resource_path("t1", "e1", "web");
    let orphan_path = web.extend(ElementKind::DataEntity, "configuration").unwrap();
    let mut tx = backend.begin().unwrap();
    let owner = backend.find(&mut tx, &web).unwrap();
    let orphan = backend
        .persist(&mut tx, &orphan_path, &Blueprint::new("configuration"))
        .unwrap();
    backend
        .relate(
            &mut tx,
            owner,
            orphan,
            WellKnown::Contains.name(),
            &BTreeMap::new(),
        )
        .unwrap();
    backend.commit(tx).unwrap();

    // WHEN deleting it through the data accessor
    inventory
        .tenants()
        .get("t1")
        .environments()
        .get("e1")
        .resources()
        .get("web")
        .data()
        .delete(DataRole::Configuration)
        .expect("delete must not fail");

    // THEN the entity is gone and a warning was logged
    assert!(inventory.element(&orphan_path).is_err());
    let warnings = capture.count_events(|event| {
        event.level == Level::WARN && event.op.as_deref() == Some("delete_data_entity")
    });
    assert_eq!(warnings, 1);
}
