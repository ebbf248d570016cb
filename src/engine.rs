// Copyright 2025 Cowboy AI, LLC.

//! Consumer-facing engine
//!
//! [`CompositionEngine`] wires a [`DefinitionLoader`] to the resolver, the
//! compositor and the validation pipeline. It holds no state between calls
//! beyond its loader and configuration.

use std::path::PathBuf;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::composed::{CompositionMetadata, ComposedObject, ConflictPlan};
use crate::compositor::Compositor;
use crate::definitions::{ObjectDefinition, TraitDefinition, ViewExtensions};
use crate::diagnostics::ValidationIssue;
use crate::errors::{ComposeError, ComposeResult};
use crate::loader::DefinitionLoader;
use crate::resolver::Resolver;
use crate::validation::{validate_trait_parameters, ValidationOptions, ValidationPipeline, ValidationReport};

/// Options for [`CompositionEngine::resolve`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResolveOptions {
    /// Directories the loader searches for trait definitions
    pub trait_roots: Vec<PathBuf>,
    /// Reject trait configurations that fail their parameter schema
    pub validate_parameters: bool,
}

impl ResolveOptions {
    /// Add a trait root
    pub fn with_trait_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.trait_roots.push(root.into());
        self
    }

    /// Toggle resolve-time parameter validation
    pub fn with_parameter_validation(mut self, enabled: bool) -> Self {
        self.validate_parameters = enabled;
        self
    }
}

/// Engine configuration, loadable from JSON
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Defaults for resolution
    pub resolve: ResolveOptions,
    /// Defaults for validation, including the hint table
    pub validation: ValidationOptions,
}

impl EngineConfig {
    /// Parse a configuration document; missing keys take their defaults
    pub fn from_json(document: &str) -> ComposeResult<Self> {
        Ok(serde_json::from_str(document)?)
    }
}

/// Everything [`CompositionEngine::resolve`] produces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    /// The requested object definition
    pub record: ObjectDefinition,
    /// Its immediate base, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base: Option<ObjectDefinition>,
    /// Trait definitions in merge order
    pub resolved_traits: Vec<TraitDefinition>,
    /// The merged object
    pub composed: ComposedObject,
    /// View extensions declared by the object itself
    pub view_overrides: ViewExtensions,
    /// What the object's own schema overrides changed
    pub conflict_plan: ConflictPlan,
    /// Audit trail of the run
    pub metadata: CompositionMetadata,
}

/// Resolves, composes and validates objects from a loader
#[derive(Debug, Clone)]
pub struct CompositionEngine<L: DefinitionLoader> {
    loader: L,
    config: EngineConfig,
}

impl<L: DefinitionLoader> CompositionEngine<L> {
    /// Create an engine with the default configuration
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            config: EngineConfig::default(),
        }
    }

    /// Replace the configuration
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// The definition source
    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// The configuration in effect
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Resolve and compose an object
    ///
    /// Fails on unknown names, cyclic inheritance and loader errors. With
    /// `validate_parameters` set, the first trait whose configuration has an
    /// error aborts with [`ComposeError::InvalidParameters`].
    pub fn resolve(&self, object_name: &str, options: &ResolveOptions) -> ComposeResult<Resolution> {
        let started = Instant::now();
        let resolver = Resolver::new(&self.loader, &options.trait_roots);
        let plan = resolver.resolve(object_name)?;
        let traits = resolver.load_traits(&plan)?;
        let resolution_ms = started.elapsed().as_secs_f64() * 1000.0;

        if options.validate_parameters {
            for definition in &traits {
                let config: Option<&Value> = plan
                    .trait_refs
                    .iter()
                    .find(|r| r.name == definition.name)
                    .and_then(|r| r.config.as_ref());
                let issues: Vec<ValidationIssue> = validate_trait_parameters(
                    definition,
                    config,
                    &self.config.validation.hints,
                    self.config.validation.all_errors,
                )
                .into_iter()
                .filter(ValidationIssue::is_error)
                .collect();
                if !issues.is_empty() {
                    warn!(
                        object = %plan.object.name,
                        trait_name = %definition.name,
                        issues = issues.len(),
                        "trait configuration rejected"
                    );
                    return Err(ComposeError::InvalidParameters {
                        trait_name: definition.name.clone(),
                        issues,
                    });
                }
            }
        }

        let (composed, conflict_plan) = Compositor::new()
            .with_resolution_ms(resolution_ms)
            .compose_with_conflicts(&plan, &traits);

        info!(
            object = %composed.name,
            traits = composed.metadata.trait_count,
            collisions = composed.metadata.collisions.len(),
            resolution_ms = composed.metadata.resolution_ms,
            composition_ms = composed.metadata.composition_ms,
            "resolved object"
        );

        Ok(Resolution {
            base: plan.base().cloned(),
            view_overrides: plan.object.view_extensions.clone(),
            metadata: composed.metadata.clone(),
            record: plan.object,
            resolved_traits: traits,
            composed,
            conflict_plan,
        })
    }

    /// Validate a composed object
    pub fn validate(&self, composed: &ComposedObject, options: &ValidationOptions) -> ValidationReport {
        ValidationPipeline::new(options.clone()).validate(composed)
    }

    /// Resolve and validate with the configured defaults
    pub fn compose_and_validate(&self, object_name: &str) -> ComposeResult<(Resolution, ValidationReport)> {
        let resolution = self.resolve(object_name, &self.config.resolve)?;
        let report = self.validate(&resolution.composed, &self.config.validation);
        Ok((resolution, report))
    }
}
