// Copyright 2025 Cowboy AI, LLC.

//! State machine ownership and internal consistency

use super::RuleIssue;
use crate::composed::ComposedObject;
use crate::diagnostics::IssueCode;

/// Check ownership of the composed state machine and its states
///
/// At most one trait may supply a machine. The bound machine's initial state
/// and every transition endpoint must be declared states.
pub fn check(composed: &ComposedObject) -> Vec<RuleIssue> {
    let providers: Vec<String> = composed
        .traits
        .iter()
        .filter(|t| t.state_machine.is_some())
        .map(|t| t.name.clone())
        .collect();
    let bystanders: Vec<String> = composed
        .traits
        .iter()
        .filter(|t| t.state_machine.is_none())
        .map(|t| t.name.clone())
        .collect();

    let mut issues = Vec::new();

    if providers.len() > 1 {
        issues.push(
            RuleIssue::error(
                IssueCode::StateMachineConflict,
                format!("state machine supplied by multiple traits: {}", providers.join(", ")),
                "/stateMachine",
            )
            .with_hint("Keep the state machine in exactly one trait and remove it from the others")
            .with_related(providers.clone())
            .with_trait_path(providers.clone())
            .with_impacted_traits(bystanders),
        );
    } else if let (Some(provider), None) = (providers.first(), &composed.state_machine) {
        issues.push(
            RuleIssue::error(
                IssueCode::StateMachineUnresolved,
                format!("trait '{provider}' supplies a state machine but none was bound"),
                "/stateMachine",
            )
            .with_trait_path(vec![provider.clone()]),
        );
    }

    let Some(binding) = &composed.state_machine else {
        return issues;
    };
    let owner = &binding.owner_trait;
    let machine = &binding.definition;

    if !providers.contains(owner) {
        issues.push(
            RuleIssue::error(
                IssueCode::StateMachineOwnerMismatch,
                format!("state machine owner '{owner}' does not supply a state machine"),
                "/stateMachine/ownerTrait",
            )
            .with_related(providers.clone())
            .with_trait_path(vec![owner.clone()]),
        );
    }

    if !machine.has_state(&machine.initial) {
        issues.push(
            RuleIssue::error(
                IssueCode::InvalidInitialState,
                format!(
                    "initial state '{}' is not one of the declared states [{}]",
                    machine.initial,
                    machine.states.join(", ")
                ),
                "/stateMachine/definition/initial",
            )
            .with_hint(format!("Set initial to one of: {}", machine.states.join(", ")))
            .with_related(vec![machine.initial.clone()])
            .with_trait_path(vec![owner.clone()]),
        );
    }

    for (index, transition) in machine.transitions.iter().enumerate() {
        let mut undeclared: Vec<String> = Vec::new();
        for state in [&transition.from, &transition.to] {
            if !machine.has_state(state) && !undeclared.contains(state) {
                undeclared.push(state.clone());
            }
        }
        if undeclared.is_empty() {
            continue;
        }
        issues.push(
            RuleIssue::error(
                IssueCode::InvalidTransition,
                format!(
                    "transition {index} ({} -> {}) references undeclared state(s): {}",
                    transition.from,
                    transition.to,
                    undeclared.join(", ")
                ),
                format!("/stateMachine/definition/transitions/{index}"),
            )
            .with_hint("Declare the state or correct the transition endpoints")
            .with_related(undeclared)
            .with_trait_path(vec![owner.clone()]),
        );
    }

    issues
}
