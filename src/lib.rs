// Copyright 2025 Cowboy AI, LLC.

//! # CIM Composer
//!
//! Trait composition and validation for the Composable Information Machine.
//!
//! Domain objects are declared as an ordered list of reusable traits plus an
//! optional base object and their own overrides. This crate turns such a
//! declaration into a single merged [`ComposedObject`] and checks it:
//!
//! - **Resolver**: walks `extends`, rejects cycles, flattens trait references
//! - **Compositor**: folds schema, semantics and tokens with provenance and
//!   collision tracking, merges view extensions and actions, binds the state
//!   machine
//! - **Validation**: Layer A checks trait configuration against declared
//!   parameters; Layer B runs the composition rules
//! - **Diagnostics**: stable issue codes, JSON pointer paths and a CI exit code
//!
//! ## Precedence
//!
//! 1. Base objects, root first
//! 2. Traits in resolution order; a later trait wins
//! 3. The object's own overrides
//!
//! An explicit `resolutions.fields` entry pins a field to a named source
//! regardless of order.
//!
//! ## Example
//!
//! ```
//! use cim_composer::{
//!     CompositionEngine, FieldDefinition, InMemoryLoader, ObjectDefinition, ResolveOptions,
//!     TraitDefinition, ValidationOptions,
//! };
//!
//! let loader = InMemoryLoader::new()
//!     .with_trait(TraitDefinition::new("Titled").with_field("title", FieldDefinition::new("string")))
//!     .with_object(ObjectDefinition::new("Note").with_trait("Titled"));
//!
//! let engine = CompositionEngine::new(loader);
//! let resolution = engine.resolve("Note", &ResolveOptions::default())?;
//! let report = engine.validate(&resolution.composed, &ValidationOptions::default());
//!
//! assert!(resolution.composed.schema.contains_key("title"));
//! assert!(report.valid);
//! # Ok::<(), cim_composer::ComposeError>(())
//! ```

#![warn(missing_docs)]

pub mod composed;
pub mod compositor;
pub mod definitions;
pub mod diagnostics;
pub mod engine;
mod errors;
pub mod loader;
pub mod merge;
pub mod resolver;
pub mod schema_export;
pub mod tokens;
pub mod validation;

pub use composed::{
    ComposedAction, ComposedObject, CompositionMetadata, ConflictPlan, OverrideChange, OverrideKind,
    StateMachineBinding, StateMachineConflict, UnresolvedResolution,
};
pub use compositor::{Compositor, SequenceGenerator};
pub use definitions::{
    ActionDefinition, Dependency, ExtendsRef, FieldDefinition, ObjectDefinition, ResolutionTarget,
    Resolutions, SemanticField, StateMachineDefinition, TraitDefinition, TraitRef, TransitionDefinition,
    ViewExtension,
};
pub use diagnostics::{IssueCode, IssueLocation, Severity, ValidationIssue, ValidationSummary};
pub use engine::{CompositionEngine, EngineConfig, Resolution, ResolveOptions};
pub use errors::{ComposeError, ComposeResult, LoadError};
pub use loader::{DefinitionLoader, InMemoryLoader};
pub use merge::{select_winner, Collision, Contributor, Layer, MergeLedger, Provenance, Winner};
pub use resolver::{ResolutionPlan, Resolver};
pub use schema_export::{object_definition_schema, trait_definition_schema};
pub use tokens::TokenMapping;
pub use validation::{
    validate, HintTable, RuleKind, ValidationOptions, ValidationPipeline, ValidationReport,
};
