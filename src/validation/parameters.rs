// Copyright 2025 Cowboy AI, LLC.

//! Structural validation of trait configuration
//!
//! Each trait may declare a JSON-Schema-like `parameters` description. The
//! configuration the object supplies for that trait is checked keyword by
//! keyword, and every failed keyword maps to a stable [`IssueCode`]. The
//! checker knows nothing about trait semantics; trait-aware wording comes from
//! the [`HintTable`].
//!
//! Supported keywords: `type`, `enum`, `const`, `required`, `properties`,
//! `additionalProperties: false`, `minimum`, `maximum`, `minLength`,
//! `maxLength`, `minItems`, `maxItems`, `items`, `if`/`then`/`else`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::pointer_segment;
use crate::composed::ComposedObject;
use crate::definitions::TraitDefinition;
use crate::diagnostics::{IssueCode, Severity, ValidationIssue};

/// A trait-aware fix hint for one failed keyword
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HintEntry {
    /// Trait the hint applies to
    pub trait_name: String,
    /// Failed schema keyword (`enum`, `required`, ...)
    pub keyword: String,
    /// Replacement fix hint
    pub hint: String,
}

/// Lookup table rewriting generic hints into trait-aware ones
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HintTable {
    entries: Vec<HintEntry>,
}

impl Default for HintTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl HintTable {
    /// A table with no entries
    pub fn empty() -> Self {
        Self { entries: Vec::new() }
    }

    /// Hints for the traits shipped with CIM
    pub fn builtin() -> Self {
        Self::empty()
            .with_hint("Stateful", "enum", "initialState must be one of the declared states")
            .with_hint(
                "Stateful",
                "required",
                "Stateful needs an initialState; set it to one of the declared states",
            )
            .with_hint(
                "Timestamped",
                "type",
                "Timestamp parameters take ISO-8601 strings such as \"2024-01-01T00:00:00Z\"",
            )
    }

    /// Add an entry; later entries shadow earlier ones for the same key
    pub fn with_hint(
        mut self,
        trait_name: impl Into<String>,
        keyword: impl Into<String>,
        hint: impl Into<String>,
    ) -> Self {
        self.entries.push(HintEntry {
            trait_name: trait_name.into(),
            keyword: keyword.into(),
            hint: hint.into(),
        });
        self
    }

    /// Find the hint for a trait and keyword
    pub fn lookup(&self, trait_name: &str, keyword: &str) -> Option<&str> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.trait_name == trait_name && e.keyword == keyword)
            .map(|e| e.hint.as_str())
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A keyword that failed at a location inside the configuration
#[derive(Debug, Clone, PartialEq)]
struct SchemaFailure {
    keyword: &'static str,
    pointer: String,
    message: String,
}

struct SchemaChecker {
    failures: Vec<SchemaFailure>,
    all_errors: bool,
}

impl SchemaChecker {
    fn new(all_errors: bool) -> Self {
        Self {
            failures: Vec::new(),
            all_errors,
        }
    }

    fn done(&self) -> bool {
        !self.all_errors && !self.failures.is_empty()
    }

    fn fail(&mut self, keyword: &'static str, pointer: &str, message: String) {
        if !self.done() {
            self.failures.push(SchemaFailure {
                keyword,
                pointer: pointer.to_string(),
                message,
            });
        }
    }

    fn check(&mut self, schema: &Value, value: &Value, pointer: &str) {
        let Some(schema) = schema.as_object() else {
            return;
        };
        if self.done() {
            return;
        }

        if let Some(expected) = schema.get("type") {
            let types: Vec<&str> = match expected {
                Value::String(t) => vec![t.as_str()],
                Value::Array(list) => list.iter().filter_map(Value::as_str).collect(),
                _ => Vec::new(),
            };
            if !types.is_empty() && !types.iter().any(|t| type_matches(t, value)) {
                self.fail(
                    "type",
                    pointer,
                    format!(
                        "parameter {} must be of type {} but is {}",
                        label(pointer),
                        types.join(" or "),
                        json_type_name(value)
                    ),
                );
                return;
            }
        }

        if let Some(Value::Array(allowed)) = schema.get("enum") {
            if !allowed.contains(value) {
                self.fail(
                    "enum",
                    pointer,
                    format!(
                        "parameter {} must be one of {} but is {}",
                        label(pointer),
                        Value::Array(allowed.clone()),
                        value
                    ),
                );
            }
        }

        if let Some(expected) = schema.get("const") {
            if expected != value {
                self.fail(
                    "const",
                    pointer,
                    format!("parameter {} must equal {} but is {}", label(pointer), expected, value),
                );
            }
        }

        match value {
            Value::Number(number) => self.check_number(schema, number.as_f64(), pointer),
            Value::String(text) => {
                let length = text.chars().count() as u64;
                self.check_size(schema, "minLength", "maxLength", length, "characters", pointer);
            }
            Value::Array(items) => {
                self.check_size(schema, "minItems", "maxItems", items.len() as u64, "items", pointer);
                if let Some(item_schema) = schema.get("items") {
                    for (index, item) in items.iter().enumerate() {
                        self.check(item_schema, item, &format!("{pointer}/{index}"));
                    }
                }
            }
            Value::Object(map) => self.check_object(schema, map, pointer),
            _ => {}
        }

        if let Some(condition) = schema.get("if") {
            let mut probe = SchemaChecker::new(false);
            probe.check(condition, value, pointer);
            let branch = if probe.failures.is_empty() {
                schema.get("then")
            } else {
                schema.get("else")
            };
            if let Some(branch) = branch {
                self.check(branch, value, pointer);
            }
        }
    }

    fn check_number(&mut self, schema: &Map<String, Value>, number: Option<f64>, pointer: &str) {
        let Some(number) = number else {
            return;
        };
        if let Some(minimum) = schema.get("minimum").and_then(Value::as_f64) {
            if number < minimum {
                self.fail(
                    "minimum",
                    pointer,
                    format!("parameter {} must be >= {minimum} but is {number}", label(pointer)),
                );
            }
        }
        if let Some(maximum) = schema.get("maximum").and_then(Value::as_f64) {
            if number > maximum {
                self.fail(
                    "maximum",
                    pointer,
                    format!("parameter {} must be <= {maximum} but is {number}", label(pointer)),
                );
            }
        }
    }

    fn check_size(
        &mut self,
        schema: &Map<String, Value>,
        min_keyword: &'static str,
        max_keyword: &'static str,
        size: u64,
        unit: &str,
        pointer: &str,
    ) {
        if let Some(min) = schema.get(min_keyword).and_then(Value::as_u64) {
            if size < min {
                self.fail(
                    min_keyword,
                    pointer,
                    format!("parameter {} needs at least {min} {unit} but has {size}", label(pointer)),
                );
            }
        }
        if let Some(max) = schema.get(max_keyword).and_then(Value::as_u64) {
            if size > max {
                self.fail(
                    max_keyword,
                    pointer,
                    format!("parameter {} allows at most {max} {unit} but has {size}", label(pointer)),
                );
            }
        }
    }

    fn check_object(&mut self, schema: &Map<String, Value>, map: &Map<String, Value>, pointer: &str) {
        if let Some(Value::Array(required)) = schema.get("required") {
            for name in required.iter().filter_map(Value::as_str) {
                if !map.contains_key(name) {
                    let child = format!("{pointer}/{}", pointer_segment(name));
                    self.fail(
                        "required",
                        &child,
                        format!("missing required parameter {}", label(&child)),
                    );
                }
            }
        }

        let properties = schema.get("properties").and_then(Value::as_object);
        if let Some(properties) = properties {
            for (name, property_schema) in properties {
                if let Some(child_value) = map.get(name) {
                    self.check(property_schema, child_value, &format!("{pointer}/{}", pointer_segment(name)));
                }
            }
        }

        if schema.get("additionalProperties") == Some(&Value::Bool(false)) {
            for name in map.keys() {
                if !properties.is_some_and(|p| p.contains_key(name)) {
                    let child = format!("{pointer}/{}", pointer_segment(name));
                    self.fail(
                        "additionalProperties",
                        &child,
                        format!("parameter {} is not declared by the trait", label(&child)),
                    );
                }
            }
        }
    }
}

fn type_matches(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => {
            value.is_i64() || value.is_u64() || value.as_f64().is_some_and(|f| f.fract() == 0.0)
        }
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// `'a.b'` for pointer `/a/b`, `configuration` for the root
fn label(pointer: &str) -> String {
    if pointer.is_empty() {
        "configuration".to_string()
    } else {
        let dotted = pointer
            .trim_start_matches('/')
            .split('/')
            .map(|s| s.replace("~1", "/").replace("~0", "~"))
            .collect::<Vec<_>>()
            .join(".");
        format!("'{dotted}'")
    }
}

fn code_for(keyword: &str) -> IssueCode {
    match keyword {
        "required" => IssueCode::MissingRequiredParameter,
        "type" => IssueCode::InvalidParameterType,
        "enum" | "const" => IssueCode::InvalidParameterValue,
        "additionalProperties" => IssueCode::UnknownParameter,
        _ => IssueCode::ParameterOutOfRange,
    }
}

fn generic_hint(keyword: &str, parameter: &str) -> String {
    match keyword {
        "required" => format!("Add {parameter} to the trait configuration"),
        "type" => format!("Change {parameter} to a value of the declared type"),
        "enum" | "const" => format!("Use one of the allowed values for {parameter}"),
        "additionalProperties" => format!("Remove {parameter} or declare it in the trait parameters"),
        _ => format!("Adjust {parameter} to fall within the declared bounds"),
    }
}

/// Validate one trait's configuration against its `parameters` schema
///
/// A trait without `parameters` accepts anything. A missing configuration is
/// checked as `{}` so required parameters are still reported.
pub fn validate_trait_parameters(
    definition: &TraitDefinition,
    config: Option<&Value>,
    hints: &HintTable,
    all_errors: bool,
) -> Vec<ValidationIssue> {
    let Some(schema) = &definition.parameters else {
        return Vec::new();
    };
    let empty = json!({});
    let config = config.unwrap_or(&empty);

    let mut checker = SchemaChecker::new(all_errors);
    checker.check(schema, config, "");

    checker
        .failures
        .into_iter()
        .map(|failure| {
            let parameter = label(&failure.pointer);
            let hint = hints
                .lookup(&definition.name, failure.keyword)
                .map(str::to_string)
                .unwrap_or_else(|| generic_hint(failure.keyword, &parameter));
            ValidationIssue::new(
                code_for(failure.keyword),
                Severity::Error,
                format!("{}: {}", definition.name, failure.message),
                format!("/traitConfigs/{}{}", pointer_segment(&definition.name), failure.pointer),
            )
            .with_hint(hint)
            .with_details(json!({ "keyword": failure.keyword, "parameter": failure.pointer }))
            .with_source("parameters")
            .with_domain("parameters")
            .with_trait_path(vec![definition.name.clone()])
        })
        .collect()
}

/// Validate the configuration of every composed trait
pub fn validate_parameters(
    composed: &ComposedObject,
    hints: &HintTable,
    all_errors: bool,
) -> Vec<ValidationIssue> {
    composed
        .traits
        .iter()
        .flat_map(|definition| {
            validate_trait_parameters(
                definition,
                composed.trait_configs.get(&definition.name),
                hints,
                all_errors,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn stateful() -> TraitDefinition {
        TraitDefinition::new("Stateful").with_parameters(json!({
            "type": "object",
            "required": ["initialState"],
            "properties": {
                "initialState": { "type": "string", "enum": ["draft", "active"] },
                "history": { "type": "integer", "minimum": 0, "maximum": 100 }
            },
            "additionalProperties": false
        }))
    }

    fn codes(issues: &[ValidationIssue]) -> Vec<IssueCode> {
        issues.iter().map(|i| i.code).collect()
    }

    #[test]
    fn test_missing_config_reports_required() {
        let issues = validate_trait_parameters(&stateful(), None, &HintTable::builtin(), true);
        assert_eq!(codes(&issues), vec![IssueCode::MissingRequiredParameter]);
        assert_eq!(issues[0].path(), "/traitConfigs/Stateful/initialState");
        assert_eq!(
            issues[0].fix_hint.as_deref(),
            Some("Stateful needs an initialState; set it to one of the declared states")
        );
    }

    #[test]
    fn test_enum_violation_uses_trait_hint() {
        let config = json!({ "initialState": "archived" });
        let issues = validate_trait_parameters(&stateful(), Some(&config), &HintTable::builtin(), true);
        assert_eq!(codes(&issues), vec![IssueCode::InvalidParameterValue]);
        assert!(issues[0].message.contains("'initialState' must be one of"));
        assert_eq!(
            issues[0].fix_hint.as_deref(),
            Some("initialState must be one of the declared states")
        );
    }

    #[test]
    fn test_generic_hint_without_table_entry() {
        let config = json!({ "initialState": "archived" });
        let issues = validate_trait_parameters(&stateful(), Some(&config), &HintTable::empty(), true);
        assert_eq!(
            issues[0].fix_hint.as_deref(),
            Some("Use one of the allowed values for 'initialState'")
        );
    }

    #[test_case(json!({ "initialState": 3 }), IssueCode::InvalidParameterType ; "wrong type")]
    #[test_case(json!({ "initialState": "draft", "history": 500 }), IssueCode::ParameterOutOfRange ; "above maximum")]
    #[test_case(json!({ "initialState": "draft", "history": 1.5 }), IssueCode::InvalidParameterType ; "not an integer")]
    #[test_case(json!({ "initialState": "draft", "color": "red" }), IssueCode::UnknownParameter ; "undeclared")]
    fn test_keyword_maps_to_code(config: Value, expected: IssueCode) {
        let issues = validate_trait_parameters(&stateful(), Some(&config), &HintTable::empty(), true);
        assert_eq!(codes(&issues), vec![expected]);
    }

    #[test]
    fn test_all_errors_false_stops_at_first_failure() {
        let config = json!({ "history": -1, "color": "red" });
        let all = validate_trait_parameters(&stateful(), Some(&config), &HintTable::empty(), true);
        let first = validate_trait_parameters(&stateful(), Some(&config), &HintTable::empty(), false);
        assert_eq!(all.len(), 3);
        assert_eq!(first.len(), 1);
    }

    #[test]
    fn test_conditional_schema() {
        let definition = TraitDefinition::new("Scheduled").with_parameters(json!({
            "type": "object",
            "properties": { "mode": { "enum": ["once", "recurring"] } },
            "if": { "properties": { "mode": { "const": "recurring" } } },
            "then": { "required": ["interval"] },
            "else": { "required": ["at"] }
        }));

        let recurring = json!({ "mode": "recurring" });
        let issues = validate_trait_parameters(&definition, Some(&recurring), &HintTable::empty(), true);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path(), "/traitConfigs/Scheduled/interval");

        let once = json!({ "mode": "once", "at": "2024-01-01" });
        assert!(validate_trait_parameters(&definition, Some(&once), &HintTable::empty(), true).is_empty());
    }

    #[test]
    fn test_array_items_and_length() {
        let definition = TraitDefinition::new("Tagged").with_parameters(json!({
            "type": "object",
            "properties": {
                "tags": { "type": "array", "maxItems": 2, "items": { "type": "string", "minLength": 2 } }
            }
        }));
        let config = json!({ "tags": ["ok", "x", "yes"] });
        let issues = validate_trait_parameters(&definition, Some(&config), &HintTable::empty(), true);
        let paths: Vec<_> = issues.iter().map(|i| i.path().to_string()).collect();
        assert_eq!(
            paths,
            vec!["/traitConfigs/Tagged/tags", "/traitConfigs/Tagged/tags/1"]
        );
        assert!(issues.iter().all(|i| i.code == IssueCode::ParameterOutOfRange));
    }

    #[test]
    fn test_trait_without_parameters_accepts_anything() {
        let config = json!({ "anything": true });
        let issues = validate_trait_parameters(&TraitDefinition::new("Free"), Some(&config), &HintTable::empty(), true);
        assert!(issues.is_empty());
    }

    #[test]
    fn test_hint_table_later_entries_shadow() {
        let table = HintTable::builtin().with_hint("Stateful", "enum", "pick draft or active");
        assert_eq!(table.lookup("Stateful", "enum"), Some("pick draft or active"));
        assert_eq!(table.lookup("Other", "enum"), None);
    }
}
