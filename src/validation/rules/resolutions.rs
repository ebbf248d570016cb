// Copyright 2025 Cowboy AI, LLC.

//! Explicit resolutions must name a source that is part of the composition

use super::RuleIssue;
use crate::composed::ComposedObject;
use crate::diagnostics::IssueCode;
use crate::validation::pointer_segment;

/// Report resolutions whose target is not composed or never writes the field
///
/// A target outside the composition is an error. A composed target that does
/// not contribute the field is a warning: the resolution has no effect.
pub fn check(composed: &ComposedObject) -> Vec<RuleIssue> {
    let candidates = std::iter::once("object".to_string())
        .chain(composed.metadata.trait_order.iter().cloned())
        .collect::<Vec<_>>()
        .join(", ");

    let unknown = composed.metadata.unresolved_resolutions.iter().map(|unresolved| {
        RuleIssue::error(
            IssueCode::UnknownResolutionSource,
            format!(
                "resolution for field '{}' names '{}', which is not part of the composition",
                unresolved.field, unresolved.target
            ),
            format!("/resolutions/fields/{}", pointer_segment(&unresolved.field)),
        )
        .with_hint(format!("Resolve '{}' to one of: {candidates}", unresolved.field))
        .with_related(vec![unresolved.target.to_string(), unresolved.field.clone()])
    });

    let ineffective = composed.metadata.ineffective_resolutions.iter().map(|resolution| {
        let writers: Vec<String> = composed
            .metadata
            .provenance
            .get(&resolution.field)
            .map(|record| {
                record
                    .previous_sources
                    .iter()
                    .chain(std::iter::once(&record.source))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        let hint = if writers.is_empty() {
            format!("No contributor declares '{}'; remove the resolution", resolution.field)
        } else {
            format!("'{}' is written by: {}", resolution.field, writers.join(", "))
        };
        RuleIssue::warning(
            IssueCode::UnknownResolutionSource,
            format!(
                "resolution for field '{}' names '{}', which does not contribute it",
                resolution.field, resolution.target
            ),
            format!("/resolutions/fields/{}", pointer_segment(&resolution.field)),
        )
        .with_hint(hint)
        .with_related(vec![resolution.target.to_string(), resolution.field.clone()])
        .with_trait_path(writers)
    });

    unknown.chain(ineffective).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definitions::{FieldDefinition, ObjectDefinition, ResolutionTarget, TraitDefinition};
    use crate::diagnostics::Severity;
    use crate::validation::rules::compose;

    #[test]
    fn test_unknown_trait_target() {
        let titled = TraitDefinition::new("Titled").with_field("title", FieldDefinition::new("string"));
        let object = ObjectDefinition::new("Article")
            .with_trait("Titled")
            .with_resolution("title", ResolutionTarget::Trait("Ghost".to_string()));
        let issues = check(&compose(object, vec![titled]));

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, IssueCode::UnknownResolutionSource);
        assert_eq!(issues[0].path, "/resolutions/fields/title");
        assert_eq!(issues[0].hint.as_deref(), Some("Resolve 'title' to one of: object, Titled"));
    }

    #[test]
    fn test_non_contributing_targets_warn() {
        let titled = TraitDefinition::new("Titled").with_field("title", FieldDefinition::new("string"));
        let dated = TraitDefinition::new("Dated").with_field("createdAt", FieldDefinition::new("datetime"));
        let object = ObjectDefinition::new("Article")
            .with_trait("Titled")
            .with_trait("Dated")
            .with_resolution("title", ResolutionTarget::Trait("Dated".to_string()))
            .with_resolution("createdAt", ResolutionTarget::Object);
        let issues = check(&compose(object, vec![titled, dated]));

        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(|i| i.severity == Severity::Warning));
        assert!(issues.iter().all(|i| i.code == IssueCode::UnknownResolutionSource));
        let title = issues.iter().find(|i| i.path == "/resolutions/fields/title").unwrap();
        assert_eq!(title.hint.as_deref(), Some("'title' is written by: Titled"));
        assert_eq!(title.trait_path, vec!["Titled"]);
        assert!(issues.iter().any(|i| i.path == "/resolutions/fields/createdAt"));
    }

    #[test]
    fn test_resolution_for_undeclared_field_warns() {
        let titled = TraitDefinition::new("Titled").with_field("title", FieldDefinition::new("string"));
        let object = ObjectDefinition::new("Article")
            .with_trait("Titled")
            .with_resolution("summary", ResolutionTarget::Trait("Titled".to_string()));
        let issues = check(&compose(object, vec![titled]));

        assert_eq!(issues.len(), 1);
        assert_eq!(
            issues[0].hint.as_deref(),
            Some("No contributor declares 'summary'; remove the resolution")
        );
    }

    #[test]
    fn test_known_targets_pass() {
        let titled = TraitDefinition::new("Titled").with_field("title", FieldDefinition::new("string"));
        let object = ObjectDefinition::new("Article")
            .with_trait("Titled")
            .with_resolution("title", ResolutionTarget::Trait("Titled".to_string()));
        assert!(check(&compose(object, vec![titled])).is_empty());
    }
}
