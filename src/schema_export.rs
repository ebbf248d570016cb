// Copyright 2025 Cowboy AI, LLC.

//! JSON Schema for definition documents
//!
//! Loader collaborators and editors can check trait and object files against
//! these schemas before handing them to the engine.

use schemars::{schema_for, JsonSchema};
use serde_json::Value;

use crate::definitions::{ObjectDefinition, TraitDefinition};
use crate::errors::ComposeResult;

const SCHEMA_BASE: &str = "https://schemas.cim-composer.ai";

/// Types with an exported definition schema
pub trait SchemaExportable: JsonSchema {
    /// Schema title, also used in `$id`
    fn export_name() -> &'static str;
    /// Schema description
    fn export_description() -> &'static str;
}

impl SchemaExportable for TraitDefinition {
    fn export_name() -> &'static str {
        "TraitDefinition"
    }
    fn export_description() -> &'static str {
        "Reusable bundle of schema fields, semantics, view contributions and an optional state machine"
    }
}

impl SchemaExportable for ObjectDefinition {
    fn export_name() -> &'static str {
        "ObjectDefinition"
    }
    fn export_description() -> &'static str {
        "Domain object composed from traits, an optional base object and its own overrides"
    }
}

/// Generate the schema for a type, stamped with `$id`, title and description
pub fn generate_schema<T: SchemaExportable>() -> ComposeResult<Value> {
    let schema = schema_for!(T);
    let mut value = serde_json::to_value(schema)?;

    if let Value::Object(ref mut object) = value {
        object.insert(
            "$id".to_string(),
            Value::String(format!("{SCHEMA_BASE}/{}.json", T::export_name())),
        );
        object.insert("title".to_string(), Value::String(T::export_name().to_string()));
        object.insert(
            "description".to_string(),
            Value::String(T::export_description().to_string()),
        );
    }
    Ok(value)
}

/// Schema of trait definition documents
pub fn trait_definition_schema() -> ComposeResult<Value> {
    generate_schema::<TraitDefinition>()
}

/// Schema of object definition documents
pub fn object_definition_schema() -> ComposeResult<Value> {
    generate_schema::<ObjectDefinition>()
}
