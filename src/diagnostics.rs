// Copyright 2025 Cowboy AI, LLC.

//! Diagnostics shared by every validation layer
//!
//! [`ValidationIssue`] is the canonical external shape. Reporters (text, JSON,
//! CI annotations) live outside this crate and consume it through serde.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Severity of an issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational - not critical
    Info,
    /// Warning - should be addressed
    Warning,
    /// Error - must be fixed
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Stable issue codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueCode {
    /// A required parameter is absent
    MissingRequiredParameter,
    /// A parameter has the wrong JSON type
    InvalidParameterType,
    /// A parameter is not one of the allowed values
    InvalidParameterValue,
    /// A parameter violates a numeric, length or size bound
    ParameterOutOfRange,
    /// A parameter is not declared by the schema
    UnknownParameter,
    /// A required trait dependency is not composed
    MissingRequiredDependency,
    /// An optional trait dependency is not composed
    MissingOptionalDependency,
    /// More than one trait supplies a state machine
    StateMachineConflict,
    /// A sole state machine provider exists but no machine was bound
    StateMachineUnresolved,
    /// The bound state machine's owner is not a provider
    StateMachineOwnerMismatch,
    /// The initial state is not declared
    InvalidInitialState,
    /// A transition references an undeclared state
    InvalidTransition,
    /// A token mapping expression cannot be parsed
    InvalidTokenMapping,
    /// A token mapping names a namespace with no tokens
    UnknownTokenNamespace,
    /// A view extension targets an unknown region
    UnknownViewRegion,
    /// A view extension references a field missing from the schema
    DanglingFieldReference,
    /// A trait-contributed field has no semantic annotation
    MissingSemanticMapping,
    /// An explicit resolution names a source outside the composition
    UnknownResolutionSource,
}

impl IssueCode {
    /// Code as emitted in reports
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCode::MissingRequiredParameter => "MISSING_REQUIRED_PARAMETER",
            IssueCode::InvalidParameterType => "INVALID_PARAMETER_TYPE",
            IssueCode::InvalidParameterValue => "INVALID_PARAMETER_VALUE",
            IssueCode::ParameterOutOfRange => "PARAMETER_OUT_OF_RANGE",
            IssueCode::UnknownParameter => "UNKNOWN_PARAMETER",
            IssueCode::MissingRequiredDependency => "MISSING_REQUIRED_DEPENDENCY",
            IssueCode::MissingOptionalDependency => "MISSING_OPTIONAL_DEPENDENCY",
            IssueCode::StateMachineConflict => "STATE_MACHINE_CONFLICT",
            IssueCode::StateMachineUnresolved => "STATE_MACHINE_UNRESOLVED",
            IssueCode::StateMachineOwnerMismatch => "STATE_MACHINE_OWNER_MISMATCH",
            IssueCode::InvalidInitialState => "INVALID_INITIAL_STATE",
            IssueCode::InvalidTransition => "INVALID_TRANSITION",
            IssueCode::InvalidTokenMapping => "INVALID_TOKEN_MAPPING",
            IssueCode::UnknownTokenNamespace => "UNKNOWN_TOKEN_NAMESPACE",
            IssueCode::UnknownViewRegion => "UNKNOWN_VIEW_REGION",
            IssueCode::DanglingFieldReference => "DANGLING_FIELD_REFERENCE",
            IssueCode::MissingSemanticMapping => "MISSING_SEMANTIC_MAPPING",
            IssueCode::UnknownResolutionSource => "UNKNOWN_RESOLUTION_SOURCE",
        }
    }
}

impl fmt::Display for IssueCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an issue was found
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueLocation {
    /// Definition file, when the host knows it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// JSON pointer into the composed structure
    pub path: String,
}

/// A single validation finding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
    /// Stable code
    pub code: IssueCode,
    /// Human readable message
    pub message: String,
    /// Location of the finding
    pub location: IssueLocation,
    /// Actionable fix
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix_hint: Option<String>,
    /// Severity
    pub severity: Severity,
    /// Structured extra data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    /// Rule or layer that produced the issue
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// `parameters` or `composition`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Documentation link for the code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docs_url: Option<String>,
    /// Related identifiers (traits, fields, states)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related: Vec<String>,
    /// Lineage from the owning trait to the subject of the issue
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trait_path: Vec<String>,
    /// Other traits affected by the same root cause
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub impacted_traits: Vec<String>,
}

impl ValidationIssue {
    /// Create an issue at a JSON pointer path
    pub fn new(code: IssueCode, severity: Severity, message: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            location: IssueLocation {
                file: None,
                path: path.into(),
            },
            fix_hint: None,
            severity,
            details: None,
            source: None,
            domain: None,
            docs_url: None,
            related: Vec::new(),
            trait_path: Vec::new(),
            impacted_traits: Vec::new(),
        }
    }

    /// Attach a fix hint
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Attach structured details
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Set the producing rule or layer
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Set the domain
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Set the definition file
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.location.file = Some(file.into());
        self
    }

    /// Derive the docs link from a base URL and the code
    pub fn with_docs_base(mut self, base_url: &str) -> Self {
        let slug = self.code.as_str().to_lowercase().replace('_', "-");
        self.docs_url = Some(format!("{}/{slug}", base_url.trim_end_matches('/')));
        self
    }

    /// Set related identifiers
    pub fn with_related(mut self, related: Vec<String>) -> Self {
        self.related = related;
        self
    }

    /// Set the trait lineage
    pub fn with_trait_path(mut self, trait_path: Vec<String>) -> Self {
        self.trait_path = trait_path;
        self
    }

    /// Set the impacted traits
    pub fn with_impacted_traits(mut self, impacted: Vec<String>) -> Self {
        self.impacted_traits = impacted;
        self
    }

    /// JSON pointer of the issue
    pub fn path(&self) -> &str {
        &self.location.path
    }

    /// Whether the issue is an error
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}] {}: {}", self.severity, self.code, self.location.path, self.message)
    }
}

/// Issue counts by severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationSummary {
    /// Error count
    pub errors: usize,
    /// Warning count
    pub warnings: usize,
    /// Info count
    pub info: usize,
}

impl ValidationSummary {
    /// Count issues by severity
    pub fn from_issues<'a>(issues: impl IntoIterator<Item = &'a ValidationIssue>) -> Self {
        issues
            .into_iter()
            .fold(Self::default(), |mut summary, issue| {
                match issue.severity {
                    Severity::Error => summary.errors += 1,
                    Severity::Warning => summary.warnings += 1,
                    Severity::Info => summary.info += 1,
                }
                summary
            })
    }

    /// CI policy: 0 clean, 1 any error, 2 warnings only
    pub fn exit_code(&self) -> i32 {
        if self.errors > 0 {
            1
        } else if self.warnings > 0 {
            2
        } else {
            0
        }
    }
}

/// Deterministic issue order: path, then code, then message
pub fn sort_issues(issues: &mut [ValidationIssue]) {
    issues.sort_by(|a, b| {
        a.location
            .path
            .cmp(&b.location.path)
            .then_with(|| a.code.as_str().cmp(b.code.as_str()))
            .then_with(|| a.message.cmp(&b.message))
    });
}
