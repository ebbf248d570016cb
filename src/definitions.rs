// Copyright 2025 Cowboy AI, LLC.

//! Trait and object definitions
//!
//! These are the immutable inputs of the engine, as handed over by a
//! [`crate::loader::DefinitionLoader`]. A **trait** is a reusable bundle of
//! schema fields, semantics, view contributions, tokens, actions and at most one
//! state machine. An **object** names the traits it carries (order matters),
//! optionally extends a single base object, and may override schema entries.
//!
//! All maps are [`IndexMap`]s so declaration order survives loading and every
//! downstream result is deterministic.

use indexmap::IndexMap;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{ComposeError, ComposeResult};

/// Field name → field definition
pub type Schema = IndexMap<String, FieldDefinition>;

/// Field name → semantic annotation
pub type Semantics = IndexMap<String, SemanticField>;

/// Region name → ordered extension descriptors
pub type ViewExtensions = IndexMap<String, Vec<ViewExtension>>;

/// Nested namespace tree of token definitions
pub type TokenTree = IndexMap<String, Value>;

fn default_version() -> String {
    "1.0.0".to_string()
}

/// A single structural field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    /// Declared type (`string`, `number`, `datetime`, ...)
    #[serde(rename = "type")]
    pub field_type: String,

    /// Whether the field must be present on instances
    #[serde(default)]
    pub required: bool,

    /// Default value applied by consumers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    /// Human readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FieldDefinition {
    /// Create an optional field of the given type
    pub fn new(field_type: impl Into<String>) -> Self {
        Self {
            field_type: field_type.into(),
            required: false,
            default: None,
            description: None,
        }
    }

    /// Mark the field as required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Attach a default value
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }
}

/// A dependency of one trait on another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Dependency {
    /// Name of the trait depended upon
    pub name: String,

    /// Optional dependencies only produce warnings when missing
    #[serde(default)]
    pub optional: bool,
}

impl Dependency {
    /// A dependency that must be satisfied
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            optional: false,
        }
    }

    /// A dependency whose absence is tolerated
    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            optional: true,
        }
    }
}

/// Semantic annotation of a field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SemanticField {
    /// Semantic type such as `status`, `timestamp` or `title`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_type: Option<String>,

    /// Token mapping expression, `tokenMap(<namespace>[.*])`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_mapping: Option<String>,
}

impl SemanticField {
    /// Annotation carrying only a semantic type
    pub fn typed(semantic_type: impl Into<String>) -> Self {
        Self {
            semantic_type: Some(semantic_type.into()),
            token_mapping: None,
        }
    }

    /// Attach a token mapping expression
    pub fn with_token_mapping(mut self, expression: impl Into<String>) -> Self {
        self.token_mapping = Some(expression.into());
        self
    }
}

/// A UI contribution to a canonical region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ViewExtension {
    /// Stable identifier; generated during composition when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Component to render
    pub component: String,

    /// Component properties
    #[serde(default)]
    pub props: IndexMap<String, Value>,

    /// Ascending sort key within a region
    #[serde(default)]
    pub priority: i32,
}

impl ViewExtension {
    /// Create an extension for a component with default priority
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            id: None,
            component: component.into(),
            props: IndexMap::new(),
            priority: 0,
        }
    }

    /// Set the identifier
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set a component property
    pub fn with_prop(mut self, key: impl Into<String>, value: Value) -> Self {
        self.props.insert(key.into(), value);
        self
    }

    /// Set the priority
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

/// A transition between two declared states
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TransitionDefinition {
    /// Source state
    pub from: String,

    /// Target state
    pub to: String,

    /// Triggering event name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
}

impl TransitionDefinition {
    /// Create an unnamed transition
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            event: None,
        }
    }
}

/// Declarative lifecycle state machine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StateMachineDefinition {
    /// Declared states
    pub states: Vec<String>,

    /// Initial state, expected to be one of `states`
    pub initial: String,

    /// Allowed transitions
    #[serde(default)]
    pub transitions: Vec<TransitionDefinition>,
}

impl StateMachineDefinition {
    /// Build a machine from state names and an initial state
    pub fn new<S: Into<String>>(states: impl IntoIterator<Item = S>, initial: impl Into<String>) -> Self {
        Self {
            states: states.into_iter().map(Into::into).collect(),
            initial: initial.into(),
            transitions: Vec::new(),
        }
    }

    /// Add a transition
    pub fn with_transition(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.transitions.push(TransitionDefinition::new(from, to));
        self
    }

    /// Whether `state` is declared
    pub fn has_state(&self, state: &str) -> bool {
        self.states.iter().any(|s| s == state)
    }
}

/// An action contributed to the composed object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ActionDefinition {
    /// Action identifier; may repeat across contributors
    pub id: String,

    /// Display label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Intent such as `primary` or `destructive`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,

    /// Free-form properties
    #[serde(default)]
    pub props: IndexMap<String, Value>,
}

impl ActionDefinition {
    /// Create an action with only an identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: None,
            intent: None,
            props: IndexMap::new(),
        }
    }
}

/// A reusable behavioral trait
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TraitDefinition {
    /// Trait name
    pub name: String,

    /// Trait version
    #[serde(default = "default_version")]
    pub version: String,

    /// Human readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Ordered dependencies on other traits
    #[serde(default)]
    pub dependencies: Vec<Dependency>,

    /// Contributed schema fields
    #[serde(default)]
    pub schema: Schema,

    /// Contributed semantic annotations
    #[serde(default)]
    pub semantics: Semantics,

    /// Contributed view extensions
    #[serde(default)]
    pub view_extensions: ViewExtensions,

    /// Optional lifecycle state machine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_machine: Option<StateMachineDefinition>,

    /// Contributed token tree
    #[serde(default)]
    pub tokens: TokenTree,

    /// Contributed actions
    #[serde(default)]
    pub actions: Vec<ActionDefinition>,

    /// JSON-Schema-like description of accepted configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

impl TraitDefinition {
    /// Create an empty trait
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: default_version(),
            description: None,
            dependencies: Vec::new(),
            schema: Schema::new(),
            semantics: Semantics::new(),
            view_extensions: ViewExtensions::new(),
            state_machine: None,
            tokens: TokenTree::new(),
            actions: Vec::new(),
            parameters: None,
        }
    }

    /// Parse a trait document, rejecting malformed shapes with a coded error
    pub fn from_json(value: Value) -> ComposeResult<Self> {
        let name = document_name(&value, "trait")?;
        for key in ["dependencies", "actions"] {
            expect_list(&value, key, "trait", &name)?;
        }
        for key in ["schema", "semantics", "viewExtensions", "tokens"] {
            expect_map(&value, key, "trait", &name)?;
        }
        serde_json::from_value(value).map_err(|e| ComposeError::malformed("trait", &name, e.to_string()))
    }

    /// Set the version
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Add a dependency
    pub fn with_dependency(mut self, dependency: Dependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    /// Add a schema field
    pub fn with_field(mut self, name: impl Into<String>, field: FieldDefinition) -> Self {
        self.schema.insert(name.into(), field);
        self
    }

    /// Add a semantic annotation
    pub fn with_semantic(mut self, field: impl Into<String>, semantic: SemanticField) -> Self {
        self.semantics.insert(field.into(), semantic);
        self
    }

    /// Append a view extension to a region
    pub fn with_view_extension(mut self, region: impl Into<String>, extension: ViewExtension) -> Self {
        self.view_extensions
            .entry(region.into())
            .or_default()
            .push(extension);
        self
    }

    /// Attach a state machine
    pub fn with_state_machine(mut self, machine: StateMachineDefinition) -> Self {
        self.state_machine = Some(machine);
        self
    }

    /// Add a top-level token namespace
    pub fn with_tokens(mut self, namespace: impl Into<String>, tree: Value) -> Self {
        self.tokens.insert(namespace.into(), tree);
        self
    }

    /// Add an action
    pub fn with_action(mut self, action: ActionDefinition) -> Self {
        self.actions.push(action);
        self
    }

    /// Set the parameter schema
    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = Some(parameters);
        self
    }
}

/// Reference to the single base object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ExtendsRef {
    /// Base object name
    pub name: String,
}

/// Reference from an object to a trait
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TraitRef {
    /// Trait name
    pub name: String,

    /// Configuration validated against the trait's `parameters`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Value>,
}

impl TraitRef {
    /// Reference without configuration
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: None,
        }
    }
}

/// Explicit winner for a field, overriding last-writer-wins
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResolutionTarget {
    /// The object layer (the object itself or one of its bases)
    Object,
    /// A specific trait
    Trait(String),
}

impl From<String> for ResolutionTarget {
    fn from(value: String) -> Self {
        if value == "object" {
            ResolutionTarget::Object
        } else {
            ResolutionTarget::Trait(value)
        }
    }
}

impl From<ResolutionTarget> for String {
    fn from(value: ResolutionTarget) -> Self {
        match value {
            ResolutionTarget::Object => "object".to_string(),
            ResolutionTarget::Trait(name) => name,
        }
    }
}

impl std::fmt::Display for ResolutionTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolutionTarget::Object => write!(f, "object"),
            ResolutionTarget::Trait(name) => write!(f, "{name}"),
        }
    }
}

/// Explicit conflict resolutions declared by an object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Resolutions {
    /// Field name → winning source
    #[serde(default)]
    #[schemars(with = "IndexMap<String, String>")]
    pub fields: IndexMap<String, ResolutionTarget>,
}

/// A concrete object composed from traits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObjectDefinition {
    /// Object name
    pub name: String,

    /// Human readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Single base object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<ExtendsRef>,

    /// Ordered trait references; later traits win on conflict
    #[serde(default)]
    pub traits: Vec<TraitRef>,

    /// Schema overrides applied after all traits
    #[serde(default)]
    pub schema: Schema,

    /// Semantic overrides applied after all traits
    #[serde(default)]
    pub semantics: Semantics,

    /// View extensions applied after all traits
    #[serde(default)]
    pub view_extensions: ViewExtensions,

    /// Object-level actions
    #[serde(default)]
    pub actions: Vec<ActionDefinition>,

    /// Explicit per-field conflict resolutions
    #[serde(default)]
    pub resolutions: Resolutions,
}

impl ObjectDefinition {
    /// Create an object with no traits
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            extends: None,
            traits: Vec::new(),
            schema: Schema::new(),
            semantics: Semantics::new(),
            view_extensions: ViewExtensions::new(),
            actions: Vec::new(),
            resolutions: Resolutions::default(),
        }
    }

    /// Parse an object document, rejecting malformed shapes with a coded error
    pub fn from_json(value: Value) -> ComposeResult<Self> {
        let name = document_name(&value, "object")?;
        for key in ["traits", "actions"] {
            expect_list(&value, key, "object", &name)?;
        }
        for key in ["schema", "semantics", "viewExtensions", "resolutions"] {
            expect_map(&value, key, "object", &name)?;
        }
        serde_json::from_value(value).map_err(|e| ComposeError::malformed("object", &name, e.to_string()))
    }

    /// Extend a base object
    pub fn extends(mut self, base: impl Into<String>) -> Self {
        self.extends = Some(ExtendsRef { name: base.into() });
        self
    }

    /// Append a trait reference
    pub fn with_trait(mut self, name: impl Into<String>) -> Self {
        self.traits.push(TraitRef::new(name));
        self
    }

    /// Append a trait reference carrying configuration
    pub fn with_configured_trait(mut self, name: impl Into<String>, config: Value) -> Self {
        self.traits.push(TraitRef {
            name: name.into(),
            config: Some(config),
        });
        self
    }

    /// Add a schema override
    pub fn with_field(mut self, name: impl Into<String>, field: FieldDefinition) -> Self {
        self.schema.insert(name.into(), field);
        self
    }

    /// Add a semantic override
    pub fn with_semantic(mut self, field: impl Into<String>, semantic: SemanticField) -> Self {
        self.semantics.insert(field.into(), semantic);
        self
    }

    /// Append an object-level view extension
    pub fn with_view_extension(mut self, region: impl Into<String>, extension: ViewExtension) -> Self {
        self.view_extensions
            .entry(region.into())
            .or_default()
            .push(extension);
        self
    }

    /// Add an object-level action
    pub fn with_action(mut self, action: ActionDefinition) -> Self {
        self.actions.push(action);
        self
    }

    /// Declare an explicit winner for a field
    pub fn with_resolution(mut self, field: impl Into<String>, target: ResolutionTarget) -> Self {
        self.resolutions.fields.insert(field.into(), target);
        self
    }

    /// Names of the directly declared traits, in order
    pub fn trait_names(&self) -> impl Iterator<Item = &str> {
        self.traits.iter().map(|t| t.name.as_str())
    }
}

fn document_name(value: &Value, kind: &str) -> ComposeResult<String> {
    let object = value
        .as_object()
        .ok_or_else(|| ComposeError::malformed(kind, "<unnamed>", "definition must be a JSON object"))?;
    match object.get("name") {
        Some(Value::String(name)) if !name.is_empty() => Ok(name.clone()),
        _ => Err(ComposeError::malformed(kind, "<unnamed>", "name must be a non-empty string")),
    }
}

fn expect_list(value: &Value, key: &str, kind: &str, name: &str) -> ComposeResult<()> {
    match value.get(key) {
        None | Some(Value::Null) | Some(Value::Array(_)) => Ok(()),
        Some(_) => Err(ComposeError::malformed(kind, name, format!("{key} must be a list"))),
    }
}

fn expect_map(value: &Value, key: &str, kind: &str, name: &str) -> ComposeResult<()> {
    match value.get(key) {
        None | Some(Value::Null) | Some(Value::Object(_)) => Ok(()),
        Some(_) => Err(ComposeError::malformed(kind, name, format!("{key} must be a map"))),
    }
}
