// Copyright 2025 Cowboy AI, LLC.

//! Semantic token mappings must parse and resolve against the merged tokens

use indexmap::IndexMap;

use super::{push_unique, RuleIssue};
use crate::composed::ComposedObject;
use crate::diagnostics::IssueCode;
use crate::tokens::TokenMapping;
use crate::validation::pointer_segment;

/// Check every `tokenMapping` in the composed semantics
pub fn check(composed: &ComposedObject) -> Vec<RuleIssue> {
    // Namespace → traits whose own semantics reference it.
    let mut referencing: IndexMap<String, Vec<String>> = IndexMap::new();
    for definition in &composed.traits {
        for semantic in definition.semantics.values() {
            if let Some(mapping) = semantic.token_mapping.as_deref().and_then(TokenMapping::parse) {
                push_unique(referencing.entry(mapping.to_string()).or_default(), &definition.name);
            }
        }
    }

    let mut issues = Vec::new();
    for (field, semantic) in &composed.semantics {
        let Some(expression) = &semantic.token_mapping else {
            continue;
        };
        let path = format!("/semantics/{}/tokenMapping", pointer_segment(field));
        let owner = composed
            .metadata
            .semantic_provenance
            .get(field)
            .map(|p| p.source.clone())
            .unwrap_or_else(|| composed.name.clone());

        match TokenMapping::parse(expression) {
            None => issues.push(
                RuleIssue::error(
                    IssueCode::InvalidTokenMapping,
                    format!("field '{field}' has malformed token mapping '{expression}'"),
                    path,
                )
                .with_hint("Write the mapping as tokenMap(<namespace>) or tokenMap(<namespace>.*)")
                .with_related(vec![field.clone()])
                .with_trait_path(vec![owner]),
            ),
            Some(mapping) if !mapping.is_satisfied_by(composed.token_paths.keys().map(String::as_str)) => {
                let impacted: Vec<String> = referencing
                    .get(&mapping.to_string())
                    .map(|names| names.iter().filter(|n| **n != owner).cloned().collect())
                    .unwrap_or_default();
                issues.push(
                    RuleIssue::error(
                        IssueCode::UnknownTokenNamespace,
                        format!("field '{field}' maps to '{mapping}' but no token matches"),
                        path,
                    )
                    .with_hint(format!(
                        "Add tokens under '{}' in a composed trait or correct the mapping",
                        mapping.namespace
                    ))
                    .with_related(vec![mapping.namespace.clone()])
                    .with_trait_path(vec![owner])
                    .with_impacted_traits(impacted),
                );
            }
            Some(_) => {}
        }
    }
    issues
}
