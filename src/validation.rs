//! Record Validation - Rule/Policy Separation
//!
//! Rules produce structured violations.
//! Policy decides whether warnings block the write.

use serde::{Deserialize, Serialize};

use crate::date::BuildDate;
use crate::pipeline::VersionRecord;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationViolation {
    pub rule: String,
    pub field: String,
    pub severity: ViolationSeverity,
    pub message: String,
    pub remediation: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub violations: Vec<ValidationViolation>,
}

impl ValidationResult {
    pub fn has_errors(&self) -> bool {
        self.violations.iter().any(|v| v.severity == ViolationSeverity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationViolation> {
        self.violations.iter().filter(|v| v.severity == ViolationSeverity::Warning)
    }
}

/// Validation rule trait - produces violations
pub trait ValidationRule {
    fn name(&self) -> &'static str;
    fn validate(&self, record: &VersionRecord) -> Vec<ValidationViolation>;
}

// --- Concrete Rules ---

pub struct BuildDateRule;

impl ValidationRule for BuildDateRule {
    fn name(&self) -> &'static str { "build_date" }

    fn validate(&self, record: &VersionRecord) -> Vec<ValidationViolation> {
        match BuildDate::unpack(record.build_date.pack()) {
            Ok(decoded) if decoded == record.build_date => vec![],
            _ => vec![ValidationViolation {
                rule: self.name().to_string(),
                field: "build_date".to_string(),
                severity: ViolationSeverity::Error,
                message: format!("Build date {} does not fit the packed word", record.build_date),
                remediation: vec!["Check the host clock".to_string()],
            }],
        }
    }
}

pub struct HeadRevisionRule;

impl ValidationRule for HeadRevisionRule {
    fn name(&self) -> &'static str { "head_revision" }

    fn validate(&self, record: &VersionRecord) -> Vec<ValidationViolation> {
        if !record.switch_hdl_hash.is_unknown() {
            return vec![];
        }
        vec![ValidationViolation {
            rule: self.name().to_string(),
            field: "switch_hdl_hash".to_string(),
            severity: ViolationSeverity::Warning,
            message: "No commit checked out, switch HDL version unknown".to_string(),
            remediation: vec!["Commit the working tree before building".to_string()],
        }]
    }
}

pub struct DependencyRevisionRule;

impl ValidationRule for DependencyRevisionRule {
    fn name(&self) -> &'static str { "dependency_revision" }

    fn validate(&self, record: &VersionRecord) -> Vec<ValidationViolation> {
        [
            ("gencores_hash", &record.gencores_hash),
            ("wrcores_hash", &record.wrcores_hash),
        ]
        .into_iter()
        .filter(|(_, hash)| hash.is_unknown())
        .map(|(field, _)| ValidationViolation {
            rule: self.name().to_string(),
            field: field.to_string(),
            severity: ViolationSeverity::Warning,
            message: "Dependency checkout not found, version unknown".to_string(),
            remediation: vec!["Run `git submodule update --init`".to_string()],
        })
        .collect()
    }
}

/// Validator orchestrates rules and applies policy
pub struct Validator {
    rules: Vec<Box<dyn ValidationRule>>,
    strict: bool,
}

impl Validator {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(BuildDateRule),
                Box::new(HeadRevisionRule),
                Box::new(DependencyRevisionRule),
            ],
            strict: false,
        }
    }

    /// In strict mode warnings block as well.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn validate(&self, record: &VersionRecord) -> ValidationResult {
        let violations: Vec<_> = self.rules.iter()
            .flat_map(|rule| rule.validate(record))
            .collect();

        let valid = if self.strict {
            violations.is_empty()
        } else {
            !violations.iter().any(|v| v.severity == ViolationSeverity::Error)
        };

        ValidationResult { valid, violations }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}
