#![allow(dead_code)]

use std::sync::Arc;

use trellis_core::config::Configuration;
use trellis_core::model::{CanonicalPath, ElementKind};
use trellis_engine::Inventory;
use trellis_store::MemoryBackend;

/// An inventory over a fresh in-memory backend
pub fn new_inventory() -> Inventory {
    Inventory::new(Arc::new(MemoryBackend::new()), Configuration::empty())
        .expect("inventory should initialize")
}

pub fn tenant_path(id: &str) -> CanonicalPath {
    CanonicalPath::of_tenant(id)
}

pub fn env_path(tenant: &str, env: &str) -> CanonicalPath {
    tenant_path(tenant)
        .extend(ElementKind::Environment, env)
        .expect("environment nests under tenant")
}

pub fn resource_path(tenant: &str, env: &str, resource: &str) -> CanonicalPath {
    env_path(tenant, env)
        .extend(ElementKind::Resource, resource)
        .expect("resource nests under environment")
}
