// Copyright 2025 Cowboy AI, LLC.

//! Ordered merge with provenance tracking
//!
//! Every keyed contribution (schema fields, semantics, flattened tokens) flows
//! through a [`MergeLedger`]: an accumulator holding the merged map together
//! with the provenance of each key and the set of keys settled by an explicit
//! resolution. Winner selection is the pure function [`select_winner`].
//!
//! ```mermaid
//! graph LR
//!     B[base object] --> T1[trait 1] --> T2[trait n] --> O[object overrides]
//! ```

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::definitions::{ResolutionTarget, Resolutions};

/// Which kind of definition contributed a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    /// A trait
    Trait,
    /// The object itself or one of its bases
    Object,
}

/// A source taking part in the merge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contributor {
    /// Trait or object name
    pub source: String,
    /// Contributing layer
    pub layer: Layer,
    /// Position in merge order
    pub order: usize,
}

impl Contributor {
    /// A trait contributor
    pub fn trait_layer(source: impl Into<String>, order: usize) -> Self {
        Self {
            source: source.into(),
            layer: Layer::Trait,
            order,
        }
    }

    /// An object contributor
    pub fn object_layer(source: impl Into<String>, order: usize) -> Self {
        Self {
            source: source.into(),
            layer: Layer::Object,
            order,
        }
    }

    /// Whether an explicit resolution names this contributor
    pub fn is_target(&self, target: &ResolutionTarget) -> bool {
        match target {
            ResolutionTarget::Object => self.layer == Layer::Object,
            ResolutionTarget::Trait(name) => self.layer == Layer::Trait && &self.source == name,
        }
    }
}

/// Audit record of who last wrote a key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provenance {
    /// Winning source
    pub source: String,
    /// Layer of the winning source
    pub layer: Layer,
    /// Merge order of the winning source
    pub order: usize,
    /// Every other contributor of this key, in merge order
    pub previous_sources: Vec<String>,
}

impl Provenance {
    fn from_contributor(contributor: &Contributor) -> Self {
        Self {
            source: contributor.source.clone(),
            layer: contributor.layer,
            order: contributor.order,
            previous_sources: Vec::new(),
        }
    }
}

/// A key written by more than one contributor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collision {
    /// Colliding field
    pub field_name: String,
    /// Source whose value was kept
    pub winner: String,
    /// Overridden sources, in merge order
    pub losers: Vec<String>,
    /// `true` when an explicit resolution chose the winner
    pub explicit_resolution: bool,
}

/// Outcome of [`select_winner`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winner {
    /// The value already in the ledger stays
    Current,
    /// The incoming value replaces it
    Incoming,
}

/// Decide which of two contributors owns a key
///
/// The incoming (later) contributor wins unless `resolution` names the current
/// holder. A resolution naming neither leaves the default in place.
pub fn select_winner(
    current: &Contributor,
    incoming: &Contributor,
    resolution: Option<&ResolutionTarget>,
) -> Winner {
    match resolution {
        Some(target) if current.is_target(target) && !incoming.is_target(target) => Winner::Current,
        _ => Winner::Incoming,
    }
}

/// What happened to a key when a contribution was applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The key was new
    Inserted,
    /// The key existed and the incoming value replaced it
    Replaced {
        /// Source that was overridden
        previous_source: String,
    },
    /// The key existed and the current value was kept
    Kept,
}

/// Accumulator for an ordered merge
#[derive(Debug, Clone)]
pub struct MergeLedger<T> {
    entries: IndexMap<String, T>,
    provenance: IndexMap<String, Provenance>,
    explicit: IndexSet<String>,
}

impl<T> Default for MergeLedger<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> MergeLedger<T> {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
            provenance: IndexMap::new(),
            explicit: IndexSet::new(),
        }
    }

    /// Apply one keyed contribution
    pub fn apply(
        &mut self,
        contributor: &Contributor,
        key: &str,
        value: T,
        resolution: Option<&ResolutionTarget>,
    ) -> MergeOutcome {
        let Some(record) = self.provenance.get_mut(key) else {
            self.entries.insert(key.to_string(), value);
            self.provenance
                .insert(key.to_string(), Provenance::from_contributor(contributor));
            return MergeOutcome::Inserted;
        };

        let current = Contributor {
            source: record.source.clone(),
            layer: record.layer,
            order: record.order,
        };
        if resolution.is_some_and(|target| current.is_target(target) || contributor.is_target(target)) {
            self.explicit.insert(key.to_string());
        }

        match select_winner(&current, contributor, resolution) {
            Winner::Current => {
                record.previous_sources.push(contributor.source.clone());
                MergeOutcome::Kept
            }
            Winner::Incoming => {
                record.previous_sources.push(current.source.clone());
                record.source = contributor.source.clone();
                record.layer = contributor.layer;
                record.order = contributor.order;
                self.entries.insert(key.to_string(), value);
                MergeOutcome::Replaced {
                    previous_source: current.source,
                }
            }
        }
    }

    /// Fold a whole contribution into the ledger
    pub fn fold<I>(mut self, contributor: &Contributor, contribution: I, resolutions: &Resolutions) -> Self
    where
        I: IntoIterator<Item = (String, T)>,
    {
        for (key, value) in contribution {
            let resolution = resolutions.fields.get(&key);
            self.apply(contributor, &key, value, resolution);
        }
        self
    }

    /// Current merged entries
    pub fn entries(&self) -> &IndexMap<String, T> {
        &self.entries
    }

    /// Current value and provenance for a key
    pub fn get(&self, key: &str) -> Option<(&T, &Provenance)> {
        Some((self.entries.get(key)?, self.provenance.get(key)?))
    }

    /// Provenance of every key
    pub fn provenance(&self) -> &IndexMap<String, Provenance> {
        &self.provenance
    }

    /// One collision per key written more than once
    pub fn collisions(&self) -> Vec<Collision> {
        self.provenance
            .iter()
            .filter(|(_, record)| !record.previous_sources.is_empty())
            .map(|(key, record)| Collision {
                field_name: key.clone(),
                winner: record.source.clone(),
                losers: record.previous_sources.clone(),
                explicit_resolution: self.explicit.contains(key),
            })
            .collect()
    }

    /// Split the ledger into entries, provenance and collisions
    pub fn into_parts(self) -> (IndexMap<String, T>, IndexMap<String, Provenance>, Vec<Collision>) {
        let collisions = self.collisions();
        (self.entries, self.provenance, collisions)
    }
}
