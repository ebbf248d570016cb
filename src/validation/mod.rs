// Copyright 2025 Cowboy AI, LLC.

//! Two-layer validation of composed objects
//!
//! Layer A checks each trait's configuration against its declared parameters.
//! Layer B runs the composition rules over the merged structure. Both layers
//! emit [`ValidationIssue`]s; the pipeline merges, decorates and sorts them.
//!
//! Validation is pure: it reads a [`ComposedObject`] and never mutates it, so
//! validating the same object twice yields the same report.

pub mod parameters;
pub mod rules;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::composed::ComposedObject;
use crate::diagnostics::{sort_issues, IssueCode, ValidationIssue, ValidationSummary};

pub use parameters::{validate_parameters, validate_trait_parameters, HintEntry, HintTable};
pub use rules::{RuleIssue, RuleKind};

/// Escape one JSON pointer reference token
pub(crate) fn pointer_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Options controlling a validation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidationOptions {
    /// Report every parameter failure instead of the first per trait
    pub all_errors: bool,
    /// Stop after the first layer or rule that reports an error
    pub stop_on_error: bool,
    /// Run Layer A
    pub validate_parameters: bool,
    /// Layer B rules to run, in order
    pub rules: Vec<RuleKind>,
    /// Trait-aware hint rewrites for Layer A
    pub hints: HintTable,
    /// Base URL for per-code documentation links
    pub docs_base_url: Option<String>,
    /// Definition file stamped onto every issue location
    pub file: Option<String>,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            all_errors: true,
            stop_on_error: false,
            validate_parameters: true,
            rules: RuleKind::ALL.to_vec(),
            hints: HintTable::default(),
            docs_base_url: None,
            file: None,
        }
    }
}

impl ValidationOptions {
    /// Stop at the first failing layer or rule
    pub fn with_stop_on_error(mut self, stop_on_error: bool) -> Self {
        self.stop_on_error = stop_on_error;
        self
    }

    /// Toggle exhaustive parameter reporting
    pub fn with_all_errors(mut self, all_errors: bool) -> Self {
        self.all_errors = all_errors;
        self
    }

    /// Toggle Layer A
    pub fn with_parameter_validation(mut self, enabled: bool) -> Self {
        self.validate_parameters = enabled;
        self
    }

    /// Restrict Layer B to the given rules
    pub fn with_rules(mut self, rules: impl IntoIterator<Item = RuleKind>) -> Self {
        self.rules = rules.into_iter().collect();
        self
    }

    /// Replace the hint table
    pub fn with_hints(mut self, hints: HintTable) -> Self {
        self.hints = hints;
        self
    }

    /// Link every issue to `<base>/<code-slug>`
    pub fn with_docs_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.docs_base_url = Some(base_url.into());
        self
    }

    /// Attribute every issue to a definition file
    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }
}

/// Result of a validation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// `true` when no issue is an error
    pub valid: bool,
    /// Issues sorted by path, code and message
    pub issues: Vec<ValidationIssue>,
    /// Counts by severity
    pub summary: ValidationSummary,
}

impl ValidationReport {
    /// Build a report from unsorted issues
    pub fn from_issues(mut issues: Vec<ValidationIssue>) -> Self {
        sort_issues(&mut issues);
        let summary = ValidationSummary::from_issues(&issues);
        Self {
            valid: summary.errors == 0,
            issues,
            summary,
        }
    }

    /// Issues with error severity
    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.is_error())
    }

    /// Issues carrying a given code
    pub fn with_code(&self, code: IssueCode) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(move |i| i.code == code)
    }

    /// Whether any issue carries a given code
    pub fn has_code(&self, code: IssueCode) -> bool {
        self.with_code(code).next().is_some()
    }

    /// CI exit code for this report
    pub fn exit_code(&self) -> i32 {
        self.summary.exit_code()
    }
}

/// Runs Layer A then the selected Layer B rules
#[derive(Debug, Clone, Default)]
pub struct ValidationPipeline {
    options: ValidationOptions,
}

impl ValidationPipeline {
    /// Create a pipeline
    pub fn new(options: ValidationOptions) -> Self {
        Self { options }
    }

    /// Options in effect
    pub fn options(&self) -> &ValidationOptions {
        &self.options
    }

    /// Validate a composed object
    pub fn validate(&self, composed: &ComposedObject) -> ValidationReport {
        let mut issues = Vec::new();
        let mut halted = false;

        if self.options.validate_parameters {
            let found = validate_parameters(composed, &self.options.hints, self.options.all_errors);
            debug!(object = %composed.name, issues = found.len(), "parameter layer evaluated");
            halted = self.options.stop_on_error && found.iter().any(ValidationIssue::is_error);
            issues.extend(found);
        }

        if !halted {
            for rule in &self.options.rules {
                let found: Vec<ValidationIssue> = rule
                    .run(composed)
                    .into_iter()
                    .map(|issue| issue.into_issue(*rule))
                    .collect();
                debug!(object = %composed.name, rule = rule.name(), issues = found.len(), "rule evaluated");
                let failed = found.iter().any(ValidationIssue::is_error);
                issues.extend(found);
                if failed && self.options.stop_on_error {
                    break;
                }
            }
        }

        let issues = issues
            .into_iter()
            .map(|issue| self.decorate(issue))
            .collect();
        let report = ValidationReport::from_issues(issues);

        info!(
            object = %composed.name,
            errors = report.summary.errors,
            warnings = report.summary.warnings,
            "validated composed object"
        );
        report
    }

    fn decorate(&self, mut issue: ValidationIssue) -> ValidationIssue {
        if let Some(file) = &self.options.file {
            issue = issue.with_file(file.clone());
        }
        if let Some(base) = &self.options.docs_base_url {
            issue = issue.with_docs_base(base);
        }
        issue
    }
}

/// Validate with the given options
pub fn validate(composed: &ComposedObject, options: &ValidationOptions) -> ValidationReport {
    ValidationPipeline::new(options.clone()).validate(composed)
}
