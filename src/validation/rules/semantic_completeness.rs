// Copyright 2025 Cowboy AI, LLC.

//! Fields contributed by traits should carry a semantic annotation

use super::RuleIssue;
use crate::composed::ComposedObject;
use crate::diagnostics::IssueCode;
use crate::merge::Layer;
use crate::validation::pointer_segment;

/// Warn about trait-contributed schema fields without semantics
///
/// Fields whose final writer is the object layer are the author's own and
/// are not checked.
pub fn check(composed: &ComposedObject) -> Vec<RuleIssue> {
    composed
        .metadata
        .provenance
        .iter()
        .filter(|(field, provenance)| {
            provenance.layer == Layer::Trait && !composed.semantics.contains_key(field.as_str())
        })
        .map(|(field, provenance)| {
            RuleIssue::warning(
                IssueCode::MissingSemanticMapping,
                format!(
                    "field '{field}' contributed by trait '{}' has no semantic mapping",
                    provenance.source
                ),
                format!("/schema/{}", pointer_segment(field)),
            )
            .with_hint(format!("Add a semantics entry for '{field}' in trait '{}'", provenance.source))
            .with_related(vec![field.clone()])
            .with_trait_path(vec![provenance.source.clone()])
        })
        .collect()
}
