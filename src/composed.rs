// Copyright 2025 Cowboy AI, LLC.

//! The composed object and its audit metadata
//!
//! A [`ComposedObject`] is built fresh by every composition run and is never
//! mutated afterwards; validation only reads it.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::definitions::{
    ActionDefinition, FieldDefinition, ResolutionTarget, Schema, Semantics, StateMachineDefinition,
    TokenTree, TraitDefinition, ViewExtensions,
};
use crate::merge::{Collision, Layer, Provenance};

/// The state machine that survived composition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateMachineBinding {
    /// Trait that supplied the machine
    pub owner_trait: String,
    /// The machine itself
    pub definition: StateMachineDefinition,
}

/// More than one trait supplied a state machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateMachineConflict {
    /// Every providing trait, in merge order
    pub providers: Vec<String>,
}

/// An explicit resolution whose target is not part of the composition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnresolvedResolution {
    /// Field the resolution applies to
    pub field: String,
    /// Declared target
    pub target: ResolutionTarget,
}

/// An action together with the source that contributed it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposedAction {
    /// Contributing trait or object
    pub source: String,
    /// The action
    pub action: ActionDefinition,
}

/// Audit trail of a composition run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositionMetadata {
    /// Identifier of this run
    pub composition_id: Uuid,
    /// When the run finished
    pub composed_at: DateTime<Utc>,
    /// Schema field → last writer and overridden sources
    pub provenance: IndexMap<String, Provenance>,
    /// Semantic field → last writer and overridden sources
    pub semantic_provenance: IndexMap<String, Provenance>,
    /// Schema fields written by more than one contributor
    pub collisions: Vec<Collision>,
    /// Set when several traits supplied a state machine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_machine_conflict: Option<StateMachineConflict>,
    /// Resolutions naming a source outside the composition
    #[serde(default)]
    pub unresolved_resolutions: Vec<UnresolvedResolution>,
    /// Resolutions naming a composed source that never writes the field
    #[serde(default)]
    pub ineffective_resolutions: Vec<UnresolvedResolution>,
    /// Trait names in merge order
    pub trait_order: Vec<String>,
    /// Number of composed traits
    pub trait_count: usize,
    /// Non-fatal remarks recorded during composition
    #[serde(default)]
    pub warnings: Vec<String>,
    /// Time spent resolving the plan
    pub resolution_ms: f64,
    /// Time spent merging
    pub composition_ms: f64,
}

/// The merged result of applying a resolution plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposedObject {
    /// Object name
    pub name: String,
    /// The object followed by its bases, nearest first
    pub object_chain: Vec<String>,
    /// Merged schema
    pub schema: Schema,
    /// Merged semantics
    pub semantics: Semantics,
    /// Merged token tree
    pub tokens: TokenTree,
    /// Every merged token leaf by dotted path, in merge order
    pub token_paths: IndexMap<String, Value>,
    /// Merged view extensions, sorted by priority within each region
    pub view_extensions: ViewExtensions,
    /// Region → contributing trait or object, aligned with `view_extensions`
    pub view_extension_sources: IndexMap<String, Vec<String>>,
    /// Concatenated actions
    pub actions: Vec<ComposedAction>,
    /// Composed traits in merge order
    pub traits: Vec<TraitDefinition>,
    /// Trait name → configuration supplied by the object chain
    pub trait_configs: IndexMap<String, Value>,
    /// Surviving state machine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_machine: Option<StateMachineBinding>,
    /// Audit trail
    pub metadata: CompositionMetadata,
}

impl ComposedObject {
    /// Look up a composed trait by name
    pub fn find_trait(&self, name: &str) -> Option<&TraitDefinition> {
        self.traits.iter().find(|t| t.name == name)
    }

    /// Whether a trait is part of the composition
    pub fn has_trait(&self, name: &str) -> bool {
        self.find_trait(name).is_some()
    }

    /// Whether `source` may legitimately appear in provenance
    pub fn is_known_source(&self, source: &str, layer: Layer) -> bool {
        match layer {
            Layer::Trait => self.has_trait(source),
            Layer::Object => self.object_chain.iter().any(|name| name == source),
        }
    }

    /// Contributor of the extension at `index` in `region`
    pub fn view_extension_source(&self, region: &str, index: usize) -> Option<&str> {
        self.view_extension_sources
            .get(region)
            .and_then(|sources| sources.get(index))
            .map(String::as_str)
    }

    /// Collision entry for a field
    pub fn collision(&self, field: &str) -> Option<&Collision> {
        self.metadata
            .collisions
            .iter()
            .find(|c| c.field_name == field)
    }
}

/// How an object-level override changed a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverrideKind {
    /// The field did not exist before the object layer
    Added,
    /// The field existed with a different definition
    Replaced,
    /// The field existed with an identical definition
    Unchanged,
}

/// Effect of a single object-level schema override
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideChange {
    /// Overridden field
    pub field: String,
    /// Kind of change
    pub change: OverrideKind,
    /// Source that held the field before the object layer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_source: Option<String>,
    /// Definition before the object layer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<FieldDefinition>,
    /// Definition declared by the object
    pub next: FieldDefinition,
    /// `false` when an explicit resolution kept the earlier definition
    pub applied: bool,
}

/// Which fields the object's own overrides actually changed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConflictPlan {
    /// One entry per object-level schema override, in declaration order
    pub overrides: Vec<OverrideChange>,
}

impl ConflictPlan {
    /// Overrides that replaced an earlier definition
    pub fn replaced(&self) -> impl Iterator<Item = &OverrideChange> {
        self.overrides
            .iter()
            .filter(|o| o.applied && o.change == OverrideKind::Replaced)
    }

    /// Look up the entry for a field
    pub fn get(&self, field: &str) -> Option<&OverrideChange> {
        self.overrides.iter().find(|o| o.field == field)
    }
}
