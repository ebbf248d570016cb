// Copyright 2025 Cowboy AI, LLC.

//! Composition rules (Layer B)
//!
//! The rule set is closed. Each rule is a plain function from a
//! [`ComposedObject`] to [`RuleIssue`]s; [`RuleKind`] names and dispatches them.

pub mod dependencies;
pub mod resolutions;
pub mod semantic_completeness;
pub mod state_machine;
pub mod token_mappings;
pub mod view_extensions;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::composed::ComposedObject;
use crate::diagnostics::{IssueCode, Severity, ValidationIssue};

/// The composition rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RuleKind {
    /// Every declared dependency is composed
    Dependencies,
    /// At most one state machine, and it is internally consistent
    StateMachineOwnership,
    /// Token mappings parse and resolve against the merged tokens
    TokenMappings,
    /// View extensions target known regions and existing fields
    ViewExtensionTargets,
    /// Trait-contributed fields carry semantics
    SemanticCompleteness,
    /// Explicit resolutions name composed sources that write the field
    ExplicitResolutions,
}

impl RuleKind {
    /// Every rule, in evaluation order
    pub const ALL: [RuleKind; 6] = [
        RuleKind::Dependencies,
        RuleKind::StateMachineOwnership,
        RuleKind::TokenMappings,
        RuleKind::ViewExtensionTargets,
        RuleKind::SemanticCompleteness,
        RuleKind::ExplicitResolutions,
    ];

    /// Rule name as reported in `ValidationIssue::source`
    pub fn name(&self) -> &'static str {
        match self {
            RuleKind::Dependencies => "dependencies",
            RuleKind::StateMachineOwnership => "stateMachineOwnership",
            RuleKind::TokenMappings => "tokenMappings",
            RuleKind::ViewExtensionTargets => "viewExtensionTargets",
            RuleKind::SemanticCompleteness => "semanticCompleteness",
            RuleKind::ExplicitResolutions => "explicitResolutions",
        }
    }

    /// Evaluate the rule
    pub fn run(&self, composed: &ComposedObject) -> Vec<RuleIssue> {
        match self {
            RuleKind::Dependencies => dependencies::check(composed),
            RuleKind::StateMachineOwnership => state_machine::check(composed),
            RuleKind::TokenMappings => token_mappings::check(composed),
            RuleKind::ViewExtensionTargets => view_extensions::check(composed),
            RuleKind::SemanticCompleteness => semantic_completeness::check(composed),
            RuleKind::ExplicitResolutions => resolutions::check(composed),
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A finding produced by a composition rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleIssue {
    /// Stable code
    pub code: IssueCode,
    /// Human readable message
    pub message: String,
    /// JSON pointer into the composed structure
    pub path: String,
    /// Actionable fix
    pub hint: Option<String>,
    /// Severity
    pub severity: Severity,
    /// Related identifiers
    pub related: Vec<String>,
    /// Lineage from the owning trait to the subject
    pub trait_path: Vec<String>,
    /// Other traits affected by the same cause
    pub impacted_traits: Vec<String>,
}

impl RuleIssue {
    fn new(code: IssueCode, severity: Severity, message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            path: path.into(),
            hint: None,
            severity,
            related: Vec::new(),
            trait_path: Vec::new(),
            impacted_traits: Vec::new(),
        }
    }

    /// An error finding
    pub fn error(code: IssueCode, message: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(code, Severity::Error, message, path)
    }

    /// A warning finding
    pub fn warning(code: IssueCode, message: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(code, Severity::Warning, message, path)
    }

    /// Attach a fix hint
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Set related identifiers
    pub fn with_related(mut self, related: Vec<String>) -> Self {
        self.related = related;
        self
    }

    /// Set the trait lineage
    pub fn with_trait_path(mut self, trait_path: Vec<String>) -> Self {
        self.trait_path = trait_path;
        self
    }

    /// Set the impacted traits
    pub fn with_impacted_traits(mut self, impacted: Vec<String>) -> Self {
        self.impacted_traits = impacted;
        self
    }

    /// Convert into the canonical issue shape
    pub fn into_issue(self, rule: RuleKind) -> ValidationIssue {
        let mut issue = ValidationIssue::new(self.code, self.severity, self.message, self.path)
            .with_source(rule.name())
            .with_domain("composition")
            .with_related(self.related)
            .with_trait_path(self.trait_path)
            .with_impacted_traits(self.impacted_traits);
        if let Some(hint) = self.hint {
            issue = issue.with_hint(hint);
        }
        issue
    }
}

/// Push `name` unless already present
pub(crate) fn push_unique(names: &mut Vec<String>, name: &str) {
    if !names.iter().any(|n| n == name) {
        names.push(name.to_string());
    }
}

#[cfg(test)]
pub(crate) fn compose(
    object: crate::definitions::ObjectDefinition,
    traits: Vec<crate::definitions::TraitDefinition>,
) -> ComposedObject {
    let plan = crate::resolver::ResolutionPlan {
        trait_refs: object.traits.clone(),
        object,
        bases: Vec::new(),
    };
    crate::compositor::Compositor::new().compose(&plan, &traits)
}
