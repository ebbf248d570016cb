// Copyright 2025 Cowboy AI, LLC.

use pretty_assertions::assert_eq;
use serde_json::json;

use cim_composer::{
    CompositionEngine, ComposedObject, Dependency, FieldDefinition, InMemoryLoader, IssueCode,
    ObjectDefinition, ResolutionTarget, ResolveOptions, RuleKind, SemanticField, Severity,
    StateMachineDefinition, TraitDefinition, ValidationOptions, ViewExtension,
};

fn compose(loader: InMemoryLoader, object: &str) -> ComposedObject {
    CompositionEngine::new(loader)
        .resolve(object, &ResolveOptions::default())
        .unwrap()
        .composed
}

fn rules_only(rules: impl IntoIterator<Item = RuleKind>) -> ValidationOptions {
    ValidationOptions::default()
        .with_parameter_validation(false)
        .with_rules(rules)
}

#[test]
fn missing_required_dependency_has_trait_path() {
    let loader = InMemoryLoader::new()
        .with_trait(TraitDefinition::new("A").with_dependency(Dependency::required("B")))
        .with_trait(TraitDefinition::new("B"))
        .with_object(ObjectDefinition::new("Thing").with_trait("A"));
    let report = cim_composer::validate(&compose(loader, "Thing"), &ValidationOptions::default());

    let errors: Vec<_> = report.errors().collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].code, IssueCode::MissingRequiredDependency);
    assert_eq!(errors[0].trait_path, vec!["A", "B"]);
    assert_eq!(errors[0].path(), "/traits/0/dependencies/0");
    assert_eq!(errors[0].source.as_deref(), Some("dependencies"));
    assert_eq!(errors[0].domain.as_deref(), Some("composition"));
}

#[test]
fn state_machine_initial_and_transition_errors() {
    let machine = StateMachineDefinition::new(["draft", "active"], "archived")
        .with_transition("draft", "active")
        .with_transition("active", "deleted");
    let loader = InMemoryLoader::new()
        .with_trait(TraitDefinition::new("Stateful").with_state_machine(machine))
        .with_object(ObjectDefinition::new("Ticket").with_trait("Stateful"));
    let report = cim_composer::validate(
        &compose(loader, "Ticket"),
        &rules_only([RuleKind::StateMachineOwnership]),
    );

    let found: Vec<_> = report.issues.iter().map(|i| (i.code, i.path())).collect();
    assert_eq!(
        found,
        vec![
            (IssueCode::InvalidInitialState, "/stateMachine/definition/initial"),
            (IssueCode::InvalidTransition, "/stateMachine/definition/transitions/1"),
        ]
    );
}

#[test]
fn competing_state_machines_are_reported_not_thrown() {
    let machine = StateMachineDefinition::new(["open", "closed"], "open");
    let loader = InMemoryLoader::new()
        .with_trait(TraitDefinition::new("Stateful").with_state_machine(machine.clone()))
        .with_trait(TraitDefinition::new("Approvable").with_state_machine(machine))
        .with_object(ObjectDefinition::new("Ticket").with_trait("Stateful").with_trait("Approvable"));
    let composed = compose(loader, "Ticket");

    assert!(composed.state_machine.is_none());
    let conflict = composed.metadata.state_machine_conflict.as_ref().unwrap();
    assert_eq!(conflict.providers, vec!["Stateful", "Approvable"]);

    let report = cim_composer::validate(&composed, &ValidationOptions::default());
    assert!(report.has_code(IssueCode::StateMachineConflict));
}

fn token_loader(mapping: &str) -> InMemoryLoader {
    InMemoryLoader::new()
        .with_trait(
            TraitDefinition::new("Stateful")
                .with_field("status", FieldDefinition::new("string"))
                .with_semantic("status", SemanticField::typed("state").with_token_mapping(mapping)),
        )
        .with_trait(
            TraitDefinition::new("Themed")
                .with_tokens("status", json!({ "draft": { "value": "#999" }, "active": "#0a0" })),
        )
        .with_object(ObjectDefinition::new("Ticket").with_trait("Stateful").with_trait("Themed"))
}

#[test]
fn token_wildcard_and_exact_mappings() {
    let options = rules_only([RuleKind::TokenMappings]);

    for mapping in ["tokenMap(status.*)", "tokenMap(status.draft)", "tokenMap(status.active)"] {
        let report = cim_composer::validate(&compose(token_loader(mapping), "Ticket"), &options);
        assert!(report.valid, "{mapping} should resolve: {:?}", report.issues);
    }

    for mapping in ["tokenMap(status.exact)", "tokenMap(status)", "tokenMap(stat.*)"] {
        let report = cim_composer::validate(&compose(token_loader(mapping), "Ticket"), &options);
        assert!(report.has_code(IssueCode::UnknownTokenNamespace), "{mapping} should not resolve");
    }
}

#[test]
fn unknown_region_and_dangling_field() {
    let loader = InMemoryLoader::new()
        .with_trait(
            TraitDefinition::new("Badged")
                .with_view_extension("sidebar", ViewExtension::new("Badge"))
                .with_view_extension("card", ViewExtension::new("Badge").with_prop("labelField", json!("label"))),
        )
        .with_object(ObjectDefinition::new("Ticket").with_trait("Badged"));
    let report = cim_composer::validate(
        &compose(loader, "Ticket"),
        &rules_only([RuleKind::ViewExtensionTargets]),
    );

    let found: Vec<_> = report.issues.iter().map(|i| (i.code, i.path())).collect();
    assert_eq!(
        found,
        vec![
            (IssueCode::DanglingFieldReference, "/viewExtensions/card/0/props/labelField"),
            (IssueCode::UnknownViewRegion, "/viewExtensions/sidebar"),
        ]
    );
}

#[test]
fn unknown_resolution_target_is_a_configuration_error() {
    let loader = InMemoryLoader::new()
        .with_trait(TraitDefinition::new("Titled").with_field("title", FieldDefinition::new("string")))
        .with_object(
            ObjectDefinition::new("Note")
                .with_trait("Titled")
                .with_resolution("title", ResolutionTarget::Trait("Titel".into())),
        );
    let composed = compose(loader, "Note");

    assert_eq!(composed.metadata.unresolved_resolutions.len(), 1);
    assert_eq!(composed.metadata.warnings.len(), 1);

    let report = cim_composer::validate(&composed, &rules_only([RuleKind::ExplicitResolutions]));
    assert_eq!(report.summary.errors, 1);
    assert_eq!(report.issues[0].code, IssueCode::UnknownResolutionSource);
}

#[test]
fn missing_semantics_is_a_warning_with_exit_code_two() {
    let loader = InMemoryLoader::new()
        .with_trait(TraitDefinition::new("Titled").with_field("title", FieldDefinition::new("string")))
        .with_object(ObjectDefinition::new("Note").with_trait("Titled"));
    let report = cim_composer::validate(&compose(loader, "Note"), &ValidationOptions::default());

    assert!(report.valid);
    assert_eq!(report.summary.warnings, 1);
    assert_eq!(report.issues[0].severity, Severity::Warning);
    assert_eq!(report.exit_code(), 2);
}

#[test]
fn parameter_errors_carry_trait_hints() {
    let loader = InMemoryLoader::new()
        .with_trait(TraitDefinition::new("Stateful").with_parameters(json!({
            "type": "object",
            "properties": { "initialState": { "type": "string", "enum": ["draft", "active"] } },
            "required": ["initialState"]
        })))
        .with_object(
            ObjectDefinition::new("Ticket").with_configured_trait("Stateful", json!({ "initialState": "gone" })),
        );
    let report = cim_composer::validate(&compose(loader, "Ticket"), &ValidationOptions::default());

    assert_eq!(report.issues.len(), 1);
    let issue = &report.issues[0];
    assert_eq!(issue.code, IssueCode::InvalidParameterValue);
    assert_eq!(issue.domain.as_deref(), Some("parameters"));
    assert_eq!(issue.fix_hint.as_deref(), Some("initialState must be one of the declared states"));
}

#[test]
fn revalidation_is_idempotent() {
    let machine = StateMachineDefinition::new(["draft"], "archived");
    let loader = InMemoryLoader::new()
        .with_trait(
            TraitDefinition::new("Stateful")
                .with_dependency(Dependency::optional("Auditable"))
                .with_state_machine(machine)
                .with_field("status", FieldDefinition::new("string")),
        )
        .with_object(ObjectDefinition::new("Ticket").with_trait("Stateful"));
    let composed = compose(loader, "Ticket");
    let snapshot = composed.clone();

    let first = cim_composer::validate(&composed, &ValidationOptions::default());
    let second = cim_composer::validate(&composed, &ValidationOptions::default());

    assert_eq!(first, second);
    assert_eq!(composed, snapshot);
    assert_eq!(first.summary.errors, 1);
    assert_eq!(first.summary.warnings, 2);
}

#[test]
fn report_serializes_for_external_reporters() {
    let loader = InMemoryLoader::new()
        .with_trait(TraitDefinition::new("A").with_dependency(Dependency::required("B")))
        .with_object(ObjectDefinition::new("Thing").with_trait("A"));
    let report = cim_composer::validate(&compose(loader, "Thing"), &ValidationOptions::default());
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["valid"], false);
    assert_eq!(json["summary"]["errors"], 1);
    assert_eq!(json["issues"][0]["code"], "MISSING_REQUIRED_DEPENDENCY");
    assert_eq!(json["issues"][0]["location"]["path"], "/traits/0/dependencies/0");
    assert_eq!(json["issues"][0]["traitPath"], json!(["A", "B"]));
    assert_eq!(json["issues"][0]["severity"], "error");
}

#[test]
fn nested_token_keeps_mapped_leaf_resolvable() {
    let loader = InMemoryLoader::new()
        .with_trait(
            TraitDefinition::new("Brand")
                .with_field("accent", FieldDefinition::new("color"))
                .with_tokens("color", json!({ "primary": { "value": "#00f" } }))
                .with_semantic("accent", SemanticField::typed("color").with_token_mapping("tokenMap(color.primary)")),
        )
        .with_trait(
            TraitDefinition::new("Hover").with_tokens("color", json!({ "primary": { "hover": { "value": "#00a" } } })),
        )
        .with_object(ObjectDefinition::new("Button").with_trait("Brand").with_trait("Hover"));
    let composed = compose(loader, "Button");
    let report = cim_composer::validate(&composed, &rules_only([RuleKind::TokenMappings]));

    assert!(report.issues.is_empty(), "unexpected issues: {:?}", report.issues);
    assert_eq!(composed.tokens["color"]["primary"]["value"], json!("#00f"));
    assert_eq!(composed.tokens["color"]["primary"]["hover"], json!({ "value": "#00a" }));
}

#[test]
fn resolution_to_non_contributing_trait_warns() {
    let loader = InMemoryLoader::new()
        .with_trait(TraitDefinition::new("Titled").with_field("title", FieldDefinition::new("string")))
        .with_trait(TraitDefinition::new("Dated").with_field("createdAt", FieldDefinition::new("datetime")))
        .with_object(
            ObjectDefinition::new("Note")
                .with_trait("Titled")
                .with_trait("Dated")
                .with_resolution("title", ResolutionTarget::Trait("Dated".into())),
        );
    let composed = compose(loader, "Note");
    let report = cim_composer::validate(&composed, &rules_only([RuleKind::ExplicitResolutions]));

    assert!(report.valid);
    assert_eq!(report.summary.warnings, 1);
    assert_eq!(report.issues[0].code, IssueCode::UnknownResolutionSource);
    assert_eq!(report.issues[0].path(), "/resolutions/fields/title");
    assert_eq!(report.exit_code(), 2);
}
