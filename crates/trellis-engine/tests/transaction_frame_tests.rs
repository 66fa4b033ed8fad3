/// Transaction frames: several mutations, one commit, one flush.
mod common;

use trellis_core::errors::TrellisError;
use trellis_core::model::{Blueprint, ElementKind};
use trellis_core::spi::Action;
use trellis_engine::Interest;

use common::{env_path, new_inventory, tenant_path};

#[test]
fn test_frame_defers_visibility_and_notifications_until_commit() {
    let inventory = new_inventory();
    let tenant_created = inventory.observable(Interest::new(ElementKind::Tenant, Action::Created));
    let env_created = inventory.observable(Interest::new(ElementKind::Environment, Action::Created));

    let frame = inventory.new_transaction_frame().expect("frame open");
    frame
        .inventory()
        .tenants()
        .create(Blueprint::new("t1"))
        .expect("tenant in frame");
    frame
        .inventory()
        .tenants()
        .get("t1")
        .environments()
        .create(Blueprint::new("e1"))
        .expect("environment in frame");

    // inside the frame the writes are visible to the frame's inventory
    assert!(frame.inventory().element(&env_path("t1", "e1")).is_ok());

    // outside, nothing is durable and nothing was delivered
    assert!(inventory.element(&tenant_path("t1")).is_err());
    assert!(tenant_created.try_next().is_none());
    assert!(env_created.try_next().is_none());

    frame.commit().expect("frame commit");

    // now everything lands at once, in staging order
    assert!(inventory.element(&env_path("t1", "e1")).is_ok());
    assert_eq!(tenant_created.drain().len(), 1);
    assert_eq!(env_created.drain().len(), 1);
}

#[test]
fn test_frame_rollback_discards_writes_and_notifications() {
    let inventory = new_inventory();
    let tenant_created = inventory.observable(Interest::new(ElementKind::Tenant, Action::Created));

    let frame = inventory.new_transaction_frame().expect("frame open");
    frame
        .inventory()
        .tenants()
        .create(Blueprint::new("t1"))
        .expect("tenant in frame");
    frame.rollback().expect("frame rollback");

    assert!(inventory.element(&tenant_path("t1")).is_err());
    assert!(tenant_created.try_next().is_none());
}

#[test]
fn test_frame_conflict_surfaces_at_commit() {
    let inventory = new_inventory();

    let frame = inventory.new_transaction_frame().expect("frame open");
    frame
        .inventory()
        .tenants()
        .create(Blueprint::new("framed"))
        .expect("tenant in frame");

    // an interleaved commit through the plain inventory moves the store
    inventory.tenants().create(Blueprint::new("racer")).unwrap();

    // the frame does not retry; the conflict is the caller's to handle
    let result = frame.commit();
    assert!(matches!(result, Err(TrellisError::Conflict { .. })));
    assert!(inventory.element(&tenant_path("framed")).is_err());
}
