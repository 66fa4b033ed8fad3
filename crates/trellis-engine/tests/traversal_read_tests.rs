/// Read traversals: filtered multi-result access, paging, direct path
/// resolution, query execution and closure traversal.
mod common;

use serde_json::json;
use trellis_core::errors::TrellisError;
use trellis_core::model::{Blueprint, Direction, ElementKind};
use trellis_core::query::{Filter, Query};
use trellis_core::spi::{Pager, SortOrder};

use common::{env_path, new_inventory, tenant_path};

fn setup() -> trellis_engine::Inventory {
    let inventory = new_inventory();
    inventory.tenants().create(Blueprint::new("t1")).unwrap();
    let tenant = inventory.tenants().get("t1");
    for (id, zone) in [("dev", "eu"), ("staging", "eu"), ("prod", "us")] {
        tenant
            .environments()
            .create(Blueprint::new(id).with_property("zone", json!(zone)))
            .unwrap();
    }
    inventory
}

#[test]
fn test_get_all_with_or_of_and_groups() {
    let inventory = setup();

    // zone == "eu" OR id == "prod"
    let page = inventory
        .tenants()
        .get("t1")
        .environments()
        .get_all(vec![
            vec![Filter::property("zone", json!("eu"))],
            vec![Filter::id("prod")],
        ])
        .entities(&Pager::all())
        .unwrap();
    assert_eq!(page.total, 3);

    // zone == "eu" AND id == "dev"
    let page = inventory
        .tenants()
        .get("t1")
        .environments()
        .get_all(vec![vec![
            Filter::property("zone", json!("eu")),
            Filter::id("dev"),
        ]])
        .entities(&Pager::all())
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].path, env_path("t1", "dev"));
}

#[test]
fn test_paging_is_stable_and_reports_total() {
    let inventory = setup();
    let environments = inventory.tenants().get("t1").environments();

    let pager = Pager::new(0, 2).with_order(SortOrder::Ascending("id".to_string()));
    let first = environments.all().entities(&pager).unwrap();
    assert_eq!(first.total, 3);
    assert_eq!(first.len(), 2);
    assert_eq!(first.items[0].id(), Some("dev"));
    assert_eq!(first.items[1].id(), Some("prod"));

    let pager = Pager::new(1, 2).with_order(SortOrder::Ascending("id".to_string()));
    let second = environments.all().entities(&pager).unwrap();
    assert_eq!(second.len(), 1);
    assert_eq!(second.items[0].id(), Some("staging"));
}

#[test]
fn test_element_resolves_paths_and_reports_misses() {
    let inventory = setup();
    assert!(inventory.element(&env_path("t1", "dev")).is_ok());

    let miss = inventory.element(&env_path("t1", "nope"));
    match miss {
        Err(TrellisError::EntityNotFound { path }) => {
            assert!(path.contains("e;nope"));
        }
        other => panic!("unexpected: {:?}", other),
    }
}

#[test]
fn test_execute_arbitrary_query() {
    let inventory = setup();

    let query = Query::path()
        .with(Filter::kind(ElementKind::Environment))
        .with(Filter::property("zone", json!("eu")))
        .get();
    let page = inventory.execute(&query, &Pager::all()).unwrap();
    assert_eq!(page.total, 2);
    for entity in &page.items {
        assert_eq!(entity.kind(), Some(ElementKind::Environment));
    }
}

#[test]
fn test_transitive_closure_over_contains() {
    let inventory = setup();
    inventory
        .tenants()
        .get("t1")
        .environments()
        .get("dev")
        .resources()
        .create(Blueprint::new("web"))
        .unwrap();

    let closure = inventory
        .transitive_closure_over(&tenant_path("t1"), Direction::Outgoing, &["contains"])
        .unwrap();
    // three environments plus the resource; the start entity is excluded
    assert_eq!(closure.len(), 4);
    assert!(closure.iter().all(|e| e.path != tenant_path("t1")));
}

#[test]
fn test_multi_target_update_requires_resolvable_position() {
    let inventory = setup();

    // updating a position that resolves nothing reports EntityNotFound
    let result = inventory
        .tenants()
        .get("ghost")
        .environments()
        .update("dev", trellis_core::model::Update::default());
    assert!(matches!(result, Err(TrellisError::EntityNotFound { .. })));
}
