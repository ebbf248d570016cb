// Copyright 2025 Cowboy AI, LLC.

//! Definition loading boundary
//!
//! Reading definition files from disk belongs to an external collaborator. The
//! engine only needs something that turns a name into a definition.

use std::collections::HashMap;
use std::path::PathBuf;

use serde_json::Value;

use crate::definitions::{ObjectDefinition, TraitDefinition};
use crate::errors::{ComposeResult, LoadError};

/// Source of trait and object definitions
pub trait DefinitionLoader {
    /// Load a trait by name, searching `roots` when the loader is root-based
    fn load_trait(&self, name: &str, roots: &[PathBuf]) -> Result<TraitDefinition, LoadError>;

    /// Load an object by name
    fn load_object(&self, name: &str, roots: &[PathBuf]) -> Result<ObjectDefinition, LoadError>;
}

impl<L: DefinitionLoader + ?Sized> DefinitionLoader for &L {
    fn load_trait(&self, name: &str, roots: &[PathBuf]) -> Result<TraitDefinition, LoadError> {
        (**self).load_trait(name, roots)
    }

    fn load_object(&self, name: &str, roots: &[PathBuf]) -> Result<ObjectDefinition, LoadError> {
        (**self).load_object(name, roots)
    }
}

/// In-memory loader for tests, benches and embedding hosts
///
/// Roots are ignored; every registered definition is visible.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLoader {
    traits: HashMap<String, TraitDefinition>,
    objects: HashMap<String, ObjectDefinition>,
}

impl InMemoryLoader {
    /// Create an empty loader
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a trait, replacing any previous definition with the same name
    pub fn with_trait(mut self, definition: TraitDefinition) -> Self {
        self.insert_trait(definition);
        self
    }

    /// Register an object, replacing any previous definition with the same name
    pub fn with_object(mut self, definition: ObjectDefinition) -> Self {
        self.insert_object(definition);
        self
    }

    /// Register a trait in place
    pub fn insert_trait(&mut self, definition: TraitDefinition) {
        self.traits.insert(definition.name.clone(), definition);
    }

    /// Register an object in place
    pub fn insert_object(&mut self, definition: ObjectDefinition) {
        self.objects.insert(definition.name.clone(), definition);
    }

    /// Build a loader from parsed JSON documents
    ///
    /// Malformed documents fail fast with `MALFORMED_DEFINITION`.
    pub fn from_json_documents(
        traits: impl IntoIterator<Item = Value>,
        objects: impl IntoIterator<Item = Value>,
    ) -> ComposeResult<Self> {
        let mut loader = Self::new();
        for document in traits {
            loader.insert_trait(TraitDefinition::from_json(document)?);
        }
        for document in objects {
            loader.insert_object(ObjectDefinition::from_json(document)?);
        }
        Ok(loader)
    }

    /// Number of registered traits
    pub fn trait_count(&self) -> usize {
        self.traits.len()
    }

    /// Number of registered objects
    pub fn object_count(&self) -> usize {
        self.objects.len()
    }
}

impl DefinitionLoader for InMemoryLoader {
    fn load_trait(&self, name: &str, _roots: &[PathBuf]) -> Result<TraitDefinition, LoadError> {
        self.traits
            .get(name)
            .cloned()
            .ok_or_else(|| LoadError::NotFound(name.to_string()))
    }

    fn load_object(&self, name: &str, _roots: &[PathBuf]) -> Result<ObjectDefinition, LoadError> {
        self.objects
            .get(name)
            .cloned()
            .ok_or_else(|| LoadError::NotFound(name.to_string()))
    }
}
