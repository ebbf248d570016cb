// Copyright 2025 Cowboy AI, LLC.

//! Every declared trait dependency must be part of the composition

use indexmap::IndexMap;

use super::{push_unique, RuleIssue};
use crate::composed::ComposedObject;
use crate::diagnostics::IssueCode;

/// Report dependencies that name traits missing from the composition
///
/// Required dependencies are errors, optional ones warnings. Traits that
/// depend on the same missing trait are listed as impacted by each other.
pub fn check(composed: &ComposedObject) -> Vec<RuleIssue> {
    let mut dependents: IndexMap<&str, Vec<String>> = IndexMap::new();
    for definition in &composed.traits {
        for dependency in &definition.dependencies {
            if !composed.has_trait(&dependency.name) {
                push_unique(dependents.entry(dependency.name.as_str()).or_default(), &definition.name);
            }
        }
    }

    let mut issues = Vec::new();
    for (trait_index, definition) in composed.traits.iter().enumerate() {
        for (dependency_index, dependency) in definition.dependencies.iter().enumerate() {
            let Some(all_dependents) = dependents.get(dependency.name.as_str()) else {
                continue;
            };
            let impacted: Vec<String> = all_dependents
                .iter()
                .filter(|name| **name != definition.name)
                .cloned()
                .collect();
            let path = format!("/traits/{trait_index}/dependencies/{dependency_index}");

            let issue = if dependency.optional {
                RuleIssue::warning(
                    IssueCode::MissingOptionalDependency,
                    format!(
                        "trait '{}' optionally depends on '{}', which is not composed",
                        definition.name, dependency.name
                    ),
                    path,
                )
                .with_hint(format!(
                    "Add '{}' to enable the integration, or leave it out deliberately",
                    dependency.name
                ))
            } else {
                RuleIssue::error(
                    IssueCode::MissingRequiredDependency,
                    format!(
                        "trait '{}' requires '{}', which is not composed",
                        definition.name, dependency.name
                    ),
                    path,
                )
                .with_hint(format!(
                    "Add '{}' to the traits of '{}' or one of its bases",
                    dependency.name, composed.name
                ))
            };

            issues.push(
                issue
                    .with_related(vec![dependency.name.clone()])
                    .with_trait_path(vec![definition.name.clone(), dependency.name.clone()])
                    .with_impacted_traits(impacted),
            );
        }
    }
    issues
}
