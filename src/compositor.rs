// Copyright 2025 Cowboy AI, LLC.

//! Structural merge of a resolution plan into a [`ComposedObject`]
//!
//! Merge order is: base objects (root first), then traits in plan order, then
//! the object's own overrides. Schema, semantics and tokens go through a
//! [`MergeLedger`]; view extensions and actions concatenate. State-machine
//! ownership and dangling resolutions are recorded as facts, never rejected
//! here. Judging them is the validation pipeline's job.

use std::time::Instant;

use chrono::Utc;
use indexmap::IndexMap;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::composed::{
    ComposedAction, ComposedObject, CompositionMetadata, ConflictPlan, OverrideChange, OverrideKind,
    StateMachineBinding, StateMachineConflict, UnresolvedResolution,
};
use crate::definitions::{
    FieldDefinition, ObjectDefinition, ResolutionTarget, Resolutions, SemanticField, TraitDefinition,
    ViewExtension, ViewExtensions,
};
use crate::merge::{Contributor, Layer, MergeLedger};
use crate::resolver::ResolutionPlan;
use crate::tokens::{flatten_tokens, nested_leaf_paths, unflatten_tokens};

/// Per-run generator for identifiers of generated elements
///
/// A fresh generator is created for every composition, so identifiers never
/// depend on earlier runs.
#[derive(Debug)]
pub struct SequenceGenerator {
    next: u64,
}

impl Default for SequenceGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl SequenceGenerator {
    /// Start a sequence at 1
    pub fn new() -> Self {
        Self { next: 1 }
    }

    /// Next identifier, `<source>:<region>:<n>`
    pub fn next_id(&mut self, source: &str, region: &str) -> String {
        let id = format!("{source}:{region}:{}", self.next);
        self.next += 1;
        id
    }
}

/// One contributor in merge order
enum Contribution<'a> {
    Object(&'a ObjectDefinition),
    Trait(&'a TraitDefinition),
}

impl Contribution<'_> {
    fn name(&self) -> &str {
        match self {
            Contribution::Object(o) => &o.name,
            Contribution::Trait(t) => &t.name,
        }
    }

    fn contributor(&self, order: usize) -> Contributor {
        match self {
            Contribution::Object(o) => Contributor::object_layer(o.name.clone(), order),
            Contribution::Trait(t) => Contributor::trait_layer(t.name.clone(), order),
        }
    }

    fn schema(&self) -> &IndexMap<String, FieldDefinition> {
        match self {
            Contribution::Object(o) => &o.schema,
            Contribution::Trait(t) => &t.schema,
        }
    }

    fn semantics(&self) -> &IndexMap<String, SemanticField> {
        match self {
            Contribution::Object(o) => &o.semantics,
            Contribution::Trait(t) => &t.semantics,
        }
    }

    fn view_extensions(&self) -> &ViewExtensions {
        match self {
            Contribution::Object(o) => &o.view_extensions,
            Contribution::Trait(t) => &t.view_extensions,
        }
    }

    fn actions(&self) -> &[crate::definitions::ActionDefinition] {
        match self {
            Contribution::Object(o) => &o.actions,
            Contribution::Trait(t) => &t.actions,
        }
    }
}

/// Merges a resolution plan into a composed object
#[derive(Debug, Clone, Default)]
pub struct Compositor {
    resolution_ms: f64,
}

impl Compositor {
    /// Create a compositor
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the time spent producing the plan, reported in metadata
    pub fn with_resolution_ms(mut self, resolution_ms: f64) -> Self {
        self.resolution_ms = resolution_ms;
        self
    }

    /// Compose the plan with its loaded traits (in plan order)
    pub fn compose(&self, plan: &ResolutionPlan, traits: &[TraitDefinition]) -> ComposedObject {
        self.compose_with_conflicts(plan, traits).0
    }

    /// Compose and also report what the object's own overrides changed
    pub fn compose_with_conflicts(
        &self,
        plan: &ResolutionPlan,
        traits: &[TraitDefinition],
    ) -> (ComposedObject, ConflictPlan) {
        let started = Instant::now();
        let object = &plan.object;
        let resolutions = &object.resolutions;
        let mut sequence = SequenceGenerator::new();

        let contributions: Vec<Contribution<'_>> = plan
            .bases
            .iter()
            .rev()
            .map(Contribution::Object)
            .chain(traits.iter().map(Contribution::Trait))
            .chain(std::iter::once(Contribution::Object(object)))
            .collect();

        let mut schema = MergeLedger::new();
        let mut semantics = MergeLedger::new();
        let mut tokens = MergeLedger::new();
        let mut regions: IndexMap<String, Vec<(ViewExtension, String)>> = IndexMap::new();
        let mut actions = Vec::new();
        let mut conflict_plan = ConflictPlan::default();
        let last = contributions.len() - 1;

        for (order, contribution) in contributions.iter().enumerate() {
            let contributor = contribution.contributor(order);
            debug!(source = %contributor.source, order, "merging contributor");

            let before_object_layer = if order == last {
                Some(snapshot(&schema, contribution.schema()))
            } else {
                None
            };

            schema = schema.fold(&contributor, contribution.schema().clone(), resolutions);
            semantics = semantics.fold(&contributor, contribution.semantics().clone(), resolutions);

            if let Contribution::Trait(definition) = contribution {
                tokens = tokens.fold(&contributor, flatten_tokens(&definition.tokens), &Resolutions::default());
            }

            for (region, extensions) in contribution.view_extensions() {
                let merged = regions.entry(region.clone()).or_default();
                for extension in extensions {
                    let mut extension = extension.clone();
                    if extension.id.is_none() {
                        extension.id = Some(sequence.next_id(contribution.name(), region));
                    }
                    merged.push((extension, contributor.source.clone()));
                }
            }

            actions.extend(contribution.actions().iter().map(|action| ComposedAction {
                source: contributor.source.clone(),
                action: action.clone(),
            }));

            if let Some(previous) = before_object_layer {
                conflict_plan = build_conflict_plan(object, previous, &schema);
            }
        }

        // Stable sort: ties keep contributor merge order.
        let mut view_extensions = ViewExtensions::new();
        let mut view_extension_sources = IndexMap::new();
        for (region, mut extensions) in regions {
            extensions.sort_by_key(|(e, _)| e.priority);
            let (extensions, sources): (Vec<ViewExtension>, Vec<String>) = extensions.into_iter().unzip();
            view_extensions.insert(region.clone(), extensions);
            view_extension_sources.insert(region, sources);
        }

        let state_providers: Vec<&TraitDefinition> =
            traits.iter().filter(|t| t.state_machine.is_some()).collect();
        let (state_machine, state_machine_conflict) = match state_providers.as_slice() {
            [] => (None, None),
            [owner] => (
                owner.state_machine.clone().map(|definition| StateMachineBinding {
                    owner_trait: owner.name.clone(),
                    definition,
                }),
                None,
            ),
            many => {
                let providers: Vec<String> = many.iter().map(|t| t.name.clone()).collect();
                warn!(object = %object.name, ?providers, "multiple state machine providers");
                (None, Some(StateMachineConflict { providers }))
            }
        };

        let trait_order: Vec<String> = traits.iter().map(|t| t.name.clone()).collect();
        let object_chain = plan.object_chain();
        let (unresolved_resolutions, mut warnings) = audit_resolutions(resolutions, &trait_order);
        let (schema, provenance, collisions) = schema.into_parts();
        let (semantics, semantic_provenance, _) = semantics.into_parts();
        let (token_leaves, token_provenance, _) = tokens.into_parts();

        for path in nested_leaf_paths(&token_leaves) {
            let source = token_provenance.get(path).map_or("", |p| p.source.as_str());
            warn!(token = %path, source = %source, "token is both a value and a group");
            warnings.push(format!(
                "token '{path}' from '{source}' also has nested tokens; its value is kept under the group"
            ));
        }

        let mut ineffective_resolutions = Vec::new();
        for (field, target) in &resolutions.fields {
            if unresolved_resolutions.iter().any(|u| u.field == *field) {
                continue;
            }
            let contributed = provenance.get(field).is_some_and(|record| {
                std::iter::once(&record.source)
                    .chain(record.previous_sources.iter())
                    .any(|source| match target {
                        ResolutionTarget::Object => object_chain.contains(source),
                        ResolutionTarget::Trait(name) => source == name,
                    })
            });
            if !contributed {
                warn!(field = %field, target = %target, "resolution target does not write the field");
                warnings.push(format!(
                    "resolution for field '{field}' names '{target}', which does not contribute it"
                ));
                ineffective_resolutions.push(UnresolvedResolution {
                    field: field.clone(),
                    target: target.clone(),
                });
            }
        }

        for collision in &collisions {
            debug!(
                field = %collision.field_name,
                winner = %collision.winner,
                losers = ?collision.losers,
                "field collision"
            );
        }

        let trait_configs: IndexMap<String, Value> = plan
            .trait_refs
            .iter()
            .filter_map(|r| r.config.clone().map(|config| (r.name.clone(), config)))
            .collect();

        let metadata = CompositionMetadata {
            composition_id: Uuid::new_v4(),
            composed_at: Utc::now(),
            provenance,
            semantic_provenance,
            collisions,
            state_machine_conflict,
            unresolved_resolutions,
            ineffective_resolutions,
            trait_count: trait_order.len(),
            trait_order,
            warnings,
            resolution_ms: self.resolution_ms,
            composition_ms: started.elapsed().as_secs_f64() * 1000.0,
        };

        let composed = ComposedObject {
            name: object.name.clone(),
            object_chain,
            schema,
            semantics,
            tokens: unflatten_tokens(&token_leaves),
            token_paths: token_leaves,
            view_extensions,
            view_extension_sources,
            actions,
            traits: traits.to_vec(),
            trait_configs,
            state_machine,
            metadata,
        };

        (composed, conflict_plan)
    }
}

type Snapshot = IndexMap<String, Option<(FieldDefinition, String)>>;

fn snapshot(ledger: &MergeLedger<FieldDefinition>, overrides: &IndexMap<String, FieldDefinition>) -> Snapshot {
    overrides
        .keys()
        .map(|field| {
            let previous = ledger
                .get(field)
                .map(|(definition, provenance)| (definition.clone(), provenance.source.clone()));
            (field.clone(), previous)
        })
        .collect()
}

fn build_conflict_plan(
    object: &ObjectDefinition,
    previous: Snapshot,
    schema: &MergeLedger<FieldDefinition>,
) -> ConflictPlan {
    let overrides = previous
        .into_iter()
        .filter_map(|(field, before)| {
            let next = object.schema.get(&field)?.clone();
            let applied = schema
                .get(&field)
                .is_some_and(|(_, p)| p.layer == Layer::Object && p.source == object.name);
            let (change, previous_source, previous) = match before {
                None => (OverrideKind::Added, None, None),
                Some((definition, source)) if definition == next => {
                    (OverrideKind::Unchanged, Some(source), Some(definition))
                }
                Some((definition, source)) => (OverrideKind::Replaced, Some(source), Some(definition)),
            };
            Some(OverrideChange {
                field,
                change,
                previous_source,
                previous,
                next,
                applied,
            })
        })
        .collect();
    ConflictPlan { overrides }
}

fn audit_resolutions(
    resolutions: &Resolutions,
    trait_order: &[String],
) -> (Vec<UnresolvedResolution>, Vec<String>) {
    let mut unresolved = Vec::new();
    let mut warnings = Vec::new();
    for (field, target) in &resolutions.fields {
        if let ResolutionTarget::Trait(name) = target {
            if !trait_order.contains(name) {
                warn!(field = %field, target = %name, "resolution names a trait outside the composition");
                warnings.push(format!(
                    "resolution for field '{field}' names unknown trait '{name}'; default precedence applied"
                ));
                unresolved.push(UnresolvedResolution {
                    field: field.clone(),
                    target: target.clone(),
                });
            }
        }
    }
    (unresolved, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definitions::{Dependency, StateMachineDefinition};
    use serde_json::json;

    fn plan(object: ObjectDefinition, bases: Vec<ObjectDefinition>) -> ResolutionPlan {
        let trait_refs = crate::resolver::flatten_trait_refs(
            bases
                .iter()
                .rev()
                .chain(std::iter::once(&object))
                .flat_map(|o| o.traits.iter()),
        );
        ResolutionPlan {
            object,
            bases,
            trait_refs,
        }
    }

    fn two_traits() -> Vec<TraitDefinition> {
        vec![
            TraitDefinition::new("T1").with_field("x", FieldDefinition::new("string")),
            TraitDefinition::new("T2").with_field("x", FieldDefinition::new("number")),
        ]
    }

    #[test]
    fn test_sequence_generator_is_per_instance() {
        let mut first = SequenceGenerator::new();
        assert_eq!(first.next_id("T1", "main"), "T1:main:1");
        assert_eq!(first.next_id("T1", "main"), "T1:main:2");
        let mut second = SequenceGenerator::new();
        assert_eq!(second.next_id("T2", "detail"), "T2:detail:1");
    }

    #[test]
    fn test_later_trait_wins() {
        let object = ObjectDefinition::new("Thing").with_trait("T1").with_trait("T2");
        let composed = Compositor::new().compose(&plan(object, vec![]), &two_traits());

        assert_eq!(composed.schema["x"].field_type, "number");
        let collision = composed.collision("x").unwrap();
        assert_eq!(collision.winner, "T2");
        assert_eq!(collision.losers, vec!["T1"]);
        assert_eq!(composed.metadata.provenance["x"].layer, Layer::Trait);
        assert_eq!(composed.metadata.provenance["x"].order, 1);
    }

    #[test]
    fn test_explicit_resolution_keeps_earlier_trait() {
        let object = ObjectDefinition::new("Thing")
            .with_trait("T1")
            .with_trait("T2")
            .with_resolution("x", ResolutionTarget::Trait("T1".into()));
        let composed = Compositor::new().compose(&plan(object, vec![]), &two_traits());

        assert_eq!(composed.schema["x"].field_type, "string");
        let collision = composed.collision("x").unwrap();
        assert_eq!(collision.winner, "T1");
        assert!(collision.explicit_resolution);
    }

    #[test]
    fn test_unknown_resolution_target_is_recorded() {
        let object = ObjectDefinition::new("Thing")
            .with_trait("T1")
            .with_trait("T2")
            .with_resolution("x", ResolutionTarget::Trait("T9".into()));
        let composed = Compositor::new().compose(&plan(object, vec![]), &two_traits());

        assert_eq!(composed.schema["x"].field_type, "number");
        assert_eq!(composed.metadata.unresolved_resolutions.len(), 1);
        assert_eq!(composed.metadata.warnings.len(), 1);
    }

    #[test]
    fn test_resolution_to_non_contributing_source_is_recorded() {
        let traits = vec![
            TraitDefinition::new("T1").with_field("x", FieldDefinition::new("string")),
            TraitDefinition::new("T2").with_field("y", FieldDefinition::new("number")),
        ];
        let object = ObjectDefinition::new("Thing")
            .with_trait("T1")
            .with_trait("T2")
            .with_resolution("x", ResolutionTarget::Trait("T2".into()))
            .with_resolution("y", ResolutionTarget::Object);
        let composed = Compositor::new().compose(&plan(object, vec![]), &traits);

        assert_eq!(composed.schema["x"].field_type, "string");
        assert!(composed.metadata.unresolved_resolutions.is_empty());
        let fields: Vec<_> = composed
            .metadata
            .ineffective_resolutions
            .iter()
            .map(|r| (r.field.as_str(), r.target.clone()))
            .collect();
        assert_eq!(
            fields,
            vec![("x", ResolutionTarget::Trait("T2".into())), ("y", ResolutionTarget::Object)]
        );
        assert_eq!(composed.metadata.warnings.len(), 2);
    }

    #[test]
    fn test_view_extensions_sorted_by_priority_with_stable_ties() {
        let traits = vec![
            TraitDefinition::new("T1")
                .with_view_extension("detail", ViewExtension::new("A").with_priority(10))
                .with_view_extension("detail", ViewExtension::new("B").with_priority(0)),
            TraitDefinition::new("T2")
                .with_view_extension("detail", ViewExtension::new("C").with_priority(0)),
        ];
        let object = ObjectDefinition::new("Thing")
            .with_trait("T1")
            .with_trait("T2")
            .with_view_extension("detail", ViewExtension::new("D").with_priority(-5));
        let composed = Compositor::new().compose(&plan(object, vec![]), &traits);

        let components: Vec<_> = composed.view_extensions["detail"]
            .iter()
            .map(|e| e.component.as_str())
            .collect();
        assert_eq!(components, vec!["D", "B", "C", "A"]);
        assert_eq!(composed.view_extensions["detail"][1].id.as_deref(), Some("T1:detail:2"));
    }

    #[test]
    fn test_view_extension_sources_follow_sorting() {
        let traits = vec![TraitDefinition::new("T1")
            .with_view_extension("detail", ViewExtension::new("A").with_priority(5))];
        let base = ObjectDefinition::new("Base")
            .with_view_extension("detail", ViewExtension::new("B").with_priority(9));
        let object = ObjectDefinition::new("Thing")
            .extends("Base")
            .with_trait("T1")
            .with_view_extension("detail", ViewExtension::new("C").with_priority(0));
        let composed = Compositor::new().compose(&plan(object, vec![base]), &traits);

        assert_eq!(composed.view_extension_sources["detail"], vec!["Thing", "T1", "Base"]);
        assert_eq!(composed.view_extension_source("detail", 2), Some("Base"));
        assert_eq!(composed.view_extension_source("detail", 3), None);
    }

    #[test]
    fn test_actions_concatenate_without_dedup() {
        let traits = vec![
            TraitDefinition::new("T1").with_action(crate::definitions::ActionDefinition::new("archive")),
            TraitDefinition::new("T2").with_action(crate::definitions::ActionDefinition::new("archive")),
        ];
        let object = ObjectDefinition::new("Thing").with_trait("T1").with_trait("T2");
        let composed = Compositor::new().compose(&plan(object, vec![]), &traits);

        let sources: Vec<_> = composed.actions.iter().map(|a| a.source.as_str()).collect();
        assert_eq!(sources, vec!["T1", "T2"]);
    }

    #[test]
    fn test_multiple_state_machines_leave_binding_unset() {
        let machine = StateMachineDefinition::new(["draft"], "draft");
        let traits = vec![
            TraitDefinition::new("T1").with_state_machine(machine.clone()),
            TraitDefinition::new("T2").with_state_machine(machine),
        ];
        let object = ObjectDefinition::new("Thing").with_trait("T1").with_trait("T2");
        let composed = Compositor::new().compose(&plan(object, vec![]), &traits);

        assert!(composed.state_machine.is_none());
        assert_eq!(
            composed.metadata.state_machine_conflict.as_ref().unwrap().providers,
            vec!["T1", "T2"]
        );
    }

    #[test]
    fn test_tokens_merge_by_leaf_path() {
        let traits = vec![
            TraitDefinition::new("T1").with_tokens("status", json!({ "draft": "#999", "active": "#0a0" })),
            TraitDefinition::new("T2").with_tokens("status", json!({ "active": "#0f0", "archived": "#333" })),
        ];
        let object = ObjectDefinition::new("Thing").with_trait("T1").with_trait("T2");
        let composed = Compositor::new().compose(&plan(object, vec![]), &traits);

        assert_eq!(
            composed.tokens["status"],
            json!({ "draft": "#999", "active": "#0f0", "archived": "#333" })
        );
    }

    #[test]
    fn test_nested_token_does_not_erase_leaf() {
        let traits = vec![
            TraitDefinition::new("Brand").with_tokens("color", json!({ "primary": { "value": "#00f" } })),
            TraitDefinition::new("Hover")
                .with_tokens("color", json!({ "primary": { "hover": { "value": "#00a" } } })),
        ];
        let object = ObjectDefinition::new("Thing").with_trait("Brand").with_trait("Hover");
        let composed = Compositor::new().compose(&plan(object, vec![]), &traits);

        let paths: Vec<_> = composed.token_paths.keys().map(String::as_str).collect();
        assert_eq!(paths, vec!["color.primary", "color.primary.hover"]);
        assert_eq!(
            composed.tokens["color"],
            json!({ "primary": { "value": "#00f", "hover": { "value": "#00a" } } })
        );
        assert_eq!(composed.metadata.warnings.len(), 1);
        assert!(composed.metadata.warnings[0].contains("'color.primary' from 'Brand'"));
    }

    #[test]
    fn test_conflict_plan_describes_object_overrides() {
        let traits = vec![TraitDefinition::new("Descriptive")
            .with_field("description", FieldDefinition::new("text"))
            .with_dependency(Dependency::optional("Tagged"))];
        let object = ObjectDefinition::new("Article")
            .with_trait("Descriptive")
            .with_field("description", FieldDefinition::new("text").required())
            .with_field("title", FieldDefinition::new("string"));
        let (composed, conflicts) =
            Compositor::new().compose_with_conflicts(&plan(object, vec![]), &traits);

        let description = conflicts.get("description").unwrap();
        assert_eq!(description.change, OverrideKind::Replaced);
        assert_eq!(description.previous_source.as_deref(), Some("Descriptive"));
        assert!(description.applied);
        assert_eq!(conflicts.get("title").unwrap().change, OverrideKind::Added);
        assert_eq!(conflicts.replaced().count(), 1);
        assert!(composed.schema["description"].required);
    }

    #[test]
    fn test_trait_configs_are_carried() {
        let traits = vec![TraitDefinition::new("Stateful")];
        let object = ObjectDefinition::new("Thing")
            .with_configured_trait("Stateful", json!({ "initialState": "draft" }));
        let composed = Compositor::new().compose(&plan(object, vec![]), &traits);
        assert_eq!(composed.trait_configs["Stateful"], json!({ "initialState": "draft" }));
    }
}
