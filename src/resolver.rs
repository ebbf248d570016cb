// Copyright 2025 Cowboy AI, LLC.

//! Resolution of an object's inheritance chain and trait list
//!
//! The resolver walks `extends` to the root, rejects cycles, and flattens the
//! trait references of the whole chain into one ordered, de-duplicated list.
//! It performs no field logic; that is the compositor's job.

use std::path::PathBuf;

use tracing::debug;

use crate::definitions::{ObjectDefinition, TraitDefinition, TraitRef};
use crate::errors::{ComposeError, ComposeResult, LoadError};
use crate::loader::DefinitionLoader;

/// Ordered plan produced by the resolver
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionPlan {
    /// The requested object
    pub object: ObjectDefinition,
    /// Base objects, nearest first
    pub bases: Vec<ObjectDefinition>,
    /// Flattened trait references in merge order
    pub trait_refs: Vec<TraitRef>,
}

impl ResolutionPlan {
    /// The object followed by its bases, nearest first
    pub fn object_chain(&self) -> Vec<String> {
        std::iter::once(&self.object)
            .chain(self.bases.iter())
            .map(|o| o.name.clone())
            .collect()
    }

    /// Trait names in merge order
    pub fn trait_names(&self) -> Vec<String> {
        self.trait_refs.iter().map(|t| t.name.clone()).collect()
    }

    /// The immediate base, if any
    pub fn base(&self) -> Option<&ObjectDefinition> {
        self.bases.first()
    }
}

/// Resolves objects against a [`DefinitionLoader`]
pub struct Resolver<'a, L: DefinitionLoader> {
    loader: &'a L,
    roots: &'a [PathBuf],
}

impl<'a, L: DefinitionLoader> Resolver<'a, L> {
    /// Create a resolver searching the given trait roots
    pub fn new(loader: &'a L, roots: &'a [PathBuf]) -> Self {
        Self { loader, roots }
    }

    /// Build the resolution plan for `object_name`
    pub fn resolve(&self, object_name: &str) -> ComposeResult<ResolutionPlan> {
        let object = self.load_object(object_name)?;
        let mut chain = vec![object.name.clone()];
        let mut bases: Vec<ObjectDefinition> = Vec::new();

        let mut next = object.extends.as_ref().map(|e| e.name.clone());
        while let Some(base_name) = next {
            if chain.contains(&base_name) {
                chain.push(base_name);
                return Err(ComposeError::CyclicExtends { chain });
            }
            let base = self.load_object(&base_name)?;
            chain.push(base_name);
            next = base.extends.as_ref().map(|e| e.name.clone());
            bases.push(base);
        }

        // Root base first, requested object last.
        let declarations = bases.iter().rev().chain(std::iter::once(&object));
        let trait_refs = flatten_trait_refs(declarations.flat_map(|o| o.traits.iter()));

        debug!(
            object = %object.name,
            bases = bases.len(),
            traits = trait_refs.len(),
            "resolved object chain"
        );

        Ok(ResolutionPlan {
            object,
            bases,
            trait_refs,
        })
    }

    /// Load every trait named by the plan, in plan order
    pub fn load_traits(&self, plan: &ResolutionPlan) -> ComposeResult<Vec<TraitDefinition>> {
        plan.trait_refs
            .iter()
            .map(|reference| {
                self.loader
                    .load_trait(&reference.name, self.roots)
                    .map_err(|err| match err {
                        LoadError::NotFound(name) => ComposeError::UnknownTrait {
                            name,
                            referenced_by: declaring_object(plan, &reference.name),
                        },
                        other => ComposeError::Load(other),
                    })
            })
            .collect()
    }

    fn load_object(&self, name: &str) -> ComposeResult<ObjectDefinition> {
        self.loader
            .load_object(name, self.roots)
            .map_err(|err| match err {
                LoadError::NotFound(name) => ComposeError::UnknownObject(name),
                other => ComposeError::Load(other),
            })
    }
}

/// De-duplicate trait references, keeping the first position
///
/// A repeated reference that carries configuration replaces the earlier
/// configuration without moving the trait.
pub fn flatten_trait_refs<'r>(references: impl IntoIterator<Item = &'r TraitRef>) -> Vec<TraitRef> {
    let mut flattened: Vec<TraitRef> = Vec::new();
    for reference in references {
        match flattened.iter_mut().find(|r| r.name == reference.name) {
            Some(existing) => {
                if reference.config.is_some() {
                    existing.config = reference.config.clone();
                }
            }
            None => flattened.push(reference.clone()),
        }
    }
    flattened
}

fn declaring_object(plan: &ResolutionPlan, trait_name: &str) -> String {
    std::iter::once(&plan.object)
        .chain(plan.bases.iter())
        .find(|o| o.trait_names().any(|n| n == trait_name))
        .map(|o| o.name.clone())
        .unwrap_or_else(|| plan.object.name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::InMemoryLoader;
    use serde_json::json;

    fn loader() -> InMemoryLoader {
        InMemoryLoader::new()
            .with_object(
                ObjectDefinition::new("ContentBase")
                    .with_trait("Timestamped")
                    .with_trait("Auditable"),
            )
            .with_object(
                ObjectDefinition::new("Article")
                    .extends("ContentBase")
                    .with_trait("Descriptive")
                    .with_trait("Timestamped"),
            )
            .with_trait(TraitDefinition::new("Timestamped"))
            .with_trait(TraitDefinition::new("Auditable"))
            .with_trait(TraitDefinition::new("Descriptive"))
    }

    #[test]
    fn test_base_traits_come_first_and_duplicates_keep_first_position() {
        let loader = loader();
        let plan = Resolver::new(&loader, &[]).resolve("Article").unwrap();

        assert_eq!(plan.trait_names(), vec!["Timestamped", "Auditable", "Descriptive"]);
        assert_eq!(plan.object_chain(), vec!["Article", "ContentBase"]);
        assert_eq!(plan.base().map(|b| b.name.as_str()), Some("ContentBase"));
    }

    #[test]
    fn test_unknown_object() {
        let loader = loader();
        let err = Resolver::new(&loader, &[]).resolve("Missing").unwrap_err();
        assert!(matches!(err, ComposeError::UnknownObject(ref name) if name == "Missing"));
    }

    #[test]
    fn test_unknown_base_object() {
        let loader = InMemoryLoader::new().with_object(ObjectDefinition::new("Orphan").extends("Ghost"));
        let err = Resolver::new(&loader, &[]).resolve("Orphan").unwrap_err();
        assert_eq!(err.code(), "UNKNOWN_OBJECT");
    }

    #[test]
    fn test_cyclic_extends() {
        let loader = InMemoryLoader::new()
            .with_object(ObjectDefinition::new("A").extends("B"))
            .with_object(ObjectDefinition::new("B").extends("C"))
            .with_object(ObjectDefinition::new("C").extends("A"));

        let err = Resolver::new(&loader, &[]).resolve("A").unwrap_err();
        match err {
            ComposeError::CyclicExtends { chain } => assert_eq!(chain, vec!["A", "B", "C", "A"]),
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_self_extension_is_a_cycle() {
        let loader = InMemoryLoader::new().with_object(ObjectDefinition::new("Loop").extends("Loop"));
        let err = Resolver::new(&loader, &[]).resolve("Loop").unwrap_err();
        assert_eq!(err.code(), "CYCLIC_EXTENDS");
    }

    #[test]
    fn test_unknown_trait_names_declaring_object() {
        let loader = InMemoryLoader::new()
            .with_object(ObjectDefinition::new("Base").with_trait("Ghost"))
            .with_object(ObjectDefinition::new("Leaf").extends("Base"));
        let resolver = Resolver::new(&loader, &[]);
        let plan = resolver.resolve("Leaf").unwrap();
        let err = resolver.load_traits(&plan).unwrap_err();
        match err {
            ComposeError::UnknownTrait { name, referenced_by } => {
                assert_eq!(name, "Ghost");
                assert_eq!(referenced_by, "Base");
            }
            other => panic!("expected unknown trait, got {other:?}"),
        }
    }

    #[test]
    fn test_later_config_replaces_without_moving() {
        let base = ObjectDefinition::new("Base")
            .with_trait("Stateful")
            .with_trait("Tagged");
        let leaf = ObjectDefinition::new("Leaf")
            .with_configured_trait("Stateful", json!({ "initialState": "draft" }));
        let refs = flatten_trait_refs(base.traits.iter().chain(leaf.traits.iter()));

        assert_eq!(refs[0].name, "Stateful");
        assert_eq!(refs[0].config, Some(json!({ "initialState": "draft" })));
        assert_eq!(refs[1].name, "Tagged");
    }
}
