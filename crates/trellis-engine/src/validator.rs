//! Structured-data schema validation
//!
//! On create and update of a data entity, the payload is validated against
//! the schema discovered by navigating from the entity's role to its
//! designated schema role. Absence of a schema is a deliberate pass. A
//! schema-role payload is instead validated against the fixed, embedded
//! meta-schema: schemas must themselves be valid schema documents.
//!
//! The schema vocabulary is a small closed subset interpreted directly over
//! [`StructuredData`]: `type`, `properties`, `required`, `items`, `enum`.

use std::sync::OnceLock;

use trellis_core::errors::{Result, Severity, TrellisError, ValidationFinding};
use trellis_core::model::{CanonicalPath, StructuredData};
use trellis_core::query::Query;
use trellis_core::spi::{BackendHandle, Transaction};

use crate::traversal::TraversalContext;

const META_SCHEMA_JSON: &str = include_str!("resources/data-meta-schema.json");

/// The embedded meta-schema used to validate schema-role payloads
fn meta_schema() -> std::result::Result<&'static StructuredData, String> {
    static META: OnceLock<std::result::Result<StructuredData, String>> = OnceLock::new();
    META.get_or_init(|| {
        serde_json::from_str::<serde_json::Value>(META_SCHEMA_JSON)
            .map(|v| StructuredData::from_json(&v))
            .map_err(|e| format!("embedded meta-schema is unreadable: {}", e))
    })
    .as_ref()
    .map_err(Clone::clone)
}

/// Validate a data entity's payload inside the surrounding transaction
///
/// # Errors
///
/// * `Validation` - the payload violates the discovered schema; carries the
///   data entity's path and the ordered finding list
/// * `UnableToValidate` - the schema or payload could not be processed
pub fn validate(
    ctx: &TraversalContext,
    data: &StructuredData,
    data_entity: BackendHandle,
    tx: &mut Transaction,
) -> Result<()> {
    let backend = ctx.backend.as_ref();
    let path = backend.extract_canonical_path(tx, data_entity)?;

    let Some(role) = path.ids().data_role() else {
        return Err(TrellisError::UnableToValidate {
            path: path.to_string(),
            message: "entity path carries no data role".to_string(),
        });
    };

    if role.is_schema() {
        let meta = meta_schema().map_err(|message| TrellisError::UnableToValidate {
            path: path.to_string(),
            message,
        })?;
        return run(&path, data, meta);
    }

    let Some(to_schema) = role.navigate_to_schema() else {
        return Ok(());
    };
    let Ok(schema_path) = to_schema.apply_to(&path) else {
        return Ok(());
    };
    let Some(schema_handle) = backend.query_single(tx, &Query::to(&schema_path))? else {
        // no schema means anything is OK
        return Ok(());
    };

    let schema_entity = backend.entity(tx, schema_handle)?;
    let Some(schema) = schema_entity.data else {
        return Err(TrellisError::UnableToValidate {
            path: schema_path.to_string(),
            message: "schema entity carries no value".to_string(),
        });
    };

    run(&path, data, &schema)
}

/// Validate `data` against `schema`, reporting findings against `path`
pub fn run(path: &CanonicalPath, data: &StructuredData, schema: &StructuredData) -> Result<()> {
    // absent payloads are explicitly allowed
    if data.is_undefined() {
        return Ok(());
    }

    let mut findings = Vec::new();
    check(schema, data, "$", &mut findings).map_err(|message| {
        TrellisError::UnableToValidate {
            path: path.to_string(),
            message,
        }
    })?;

    if findings.iter().any(|f| f.severity == Severity::Error) {
        return Err(TrellisError::Validation {
            path: path.to_string(),
            findings,
        });
    }
    Ok(())
}

/// Interpret one schema node over one value node
///
/// Findings accumulate in walk order, so the result list is deterministic
/// for a given (data, schema) pair. Returns `Err` only for malformed
/// schemas, which is an "unable to validate" condition rather than a
/// finding.
fn check(
    schema: &StructuredData,
    value: &StructuredData,
    location: &str,
    findings: &mut Vec<ValidationFinding>,
) -> std::result::Result<(), String> {
    let StructuredData::Map(schema_map) = schema else {
        return Err(format!("schema node at {} is not a map", location));
    };

    if let Some(type_spec) = schema_map.get("type") {
        let StructuredData::Str(type_name) = type_spec else {
            return Err(format!("schema 'type' at {} is not a string", location));
        };
        let matches = match type_name.as_str() {
            "object" => matches!(value, StructuredData::Map(_)),
            "array" => matches!(value, StructuredData::List(_)),
            "string" => matches!(value, StructuredData::Str(_)),
            "integer" => matches!(value, StructuredData::Integral(_)),
            "number" => matches!(
                value,
                StructuredData::Integral(_) | StructuredData::FloatingPoint(_)
            ),
            "boolean" => matches!(value, StructuredData::Bool(_)),
            "null" => value.is_undefined(),
            other => return Err(format!("unknown schema type '{}'", other)),
        };
        if !matches {
            findings.push(ValidationFinding::error(format!(
                "{}: expected {}, found {}",
                location,
                type_name,
                value.kind_name()
            )));
            // the shape is wrong; deeper checks would only produce noise
            return Ok(());
        }
    }

    if let Some(allowed) = schema_map.get("enum") {
        let StructuredData::List(choices) = allowed else {
            return Err(format!("schema 'enum' at {} is not a list", location));
        };
        if !choices.contains(value) {
            findings.push(ValidationFinding::error(format!(
                "{}: value not among the {} allowed choices",
                location,
                choices.len()
            )));
        }
    }

    if let StructuredData::Map(entries) = value {
        if let Some(required) = schema_map.get("required") {
            let StructuredData::List(names) = required else {
                return Err(format!("schema 'required' at {} is not a list", location));
            };
            for name in names {
                let StructuredData::Str(name) = name else {
                    return Err(format!(
                        "schema 'required' at {} contains a non-string entry",
                        location
                    ));
                };
                if !entries.contains_key(name) {
                    findings.push(ValidationFinding::error(format!(
                        "{}: missing required property '{}'",
                        location, name
                    )));
                }
            }
        }

        if let Some(properties) = schema_map.get("properties") {
            let StructuredData::Map(subschemas) = properties else {
                return Err(format!("schema 'properties' at {} is not a map", location));
            };
            for (key, subschema) in subschemas {
                if let Some(child) = entries.get(key) {
                    check(subschema, child, &format!("{}.{}", location, key), findings)?;
                }
            }
        }
    }

    if let StructuredData::List(items) = value {
        if let Some(items_schema) = schema_map.get("items") {
            for (index, item) in items.iter().enumerate() {
                check(
                    items_schema,
                    item,
                    &format!("{}[{}]", location, index),
                    findings,
                )?;
            }
        }
    }

    Ok(())
}
