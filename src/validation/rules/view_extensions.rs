// Copyright 2025 Cowboy AI, LLC.

//! View extensions must target known regions and existing fields

use serde_json::Value;

use super::{push_unique, RuleIssue};
use crate::composed::ComposedObject;
use crate::diagnostics::IssueCode;
use crate::validation::pointer_segment;

/// Canonical view contexts
pub const VIEW_CONTEXTS: [&str; 6] = ["list", "detail", "form", "timeline", "card", "inline"];

/// Canonical page regions
pub const VIEW_REGIONS: [&str; 5] = ["pageHeader", "main", "contextPanel", "toolbar", "footer"];

/// Whether a region key is on the allow-list
pub fn is_known_region(region: &str) -> bool {
    VIEW_CONTEXTS.contains(&region) || VIEW_REGIONS.contains(&region)
}

/// Prop keys that hold field references: `field` or anything ending in `Field`
fn is_field_reference(key: &str) -> bool {
    key == "field" || key.ends_with("Field")
}

fn referenced_fields(value: &Value) -> Vec<&str> {
    match value {
        Value::String(name) => vec![name.as_str()],
        Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

fn source_of(composed: &ComposedObject, region: &str, index: usize) -> String {
    composed
        .view_extension_source(region, index)
        .unwrap_or(composed.name.as_str())
        .to_string()
}

/// Check regions and field references of every view extension
pub fn check(composed: &ComposedObject) -> Vec<RuleIssue> {
    let mut issues = Vec::new();

    for (region, extensions) in &composed.view_extensions {
        let region_path = format!("/viewExtensions/{}", pointer_segment(region));

        if !is_known_region(region) {
            let mut owners = Vec::new();
            for index in 0..extensions.len() {
                push_unique(&mut owners, &source_of(composed, region, index));
            }
            issues.push(
                RuleIssue::error(
                    IssueCode::UnknownViewRegion,
                    format!("view region '{region}' is not a known context or region"),
                    region_path.clone(),
                )
                .with_hint(format!(
                    "Use one of: {}, {}",
                    VIEW_CONTEXTS.join(", "),
                    VIEW_REGIONS.join(", ")
                ))
                .with_related(vec![region.clone()])
                .with_trait_path(owners),
            );
        }

        for (index, extension) in extensions.iter().enumerate() {
            for (key, value) in &extension.props {
                if !is_field_reference(key) {
                    continue;
                }
                for field in referenced_fields(value) {
                    if composed.schema.contains_key(field) {
                        continue;
                    }
                    issues.push(
                        RuleIssue::error(
                            IssueCode::DanglingFieldReference,
                            format!(
                                "component '{}' references missing field '{field}' via '{key}'",
                                extension.component
                            ),
                            format!("{region_path}/{index}/props/{}", pointer_segment(key)),
                        )
                        .with_hint(format!("Add '{field}' to the schema or point '{key}' at an existing field"))
                        .with_related(vec![extension.component.clone(), field.to_string()])
                        .with_trait_path(vec![source_of(composed, region, index)]),
                    );
                }
            }
        }
    }
    issues
}
