use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldIssue {
    pub field: String,
    pub severity: Severity,
    pub message: String,
}

impl fmt::Display for FieldIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.severity, self.field, self.message)
    }
}

/// Everything the submitter should see about their issue, in form order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseReport {
    pub issues: Vec<FieldIssue>,
}

impl ParseReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &str, severity: Severity, message: impl Into<String>) {
        self.issues.push(FieldIssue {
            field: field.to_string(),
            severity,
            message: message.into(),
        });
    }

    pub fn warn(&mut self, field: &str, message: impl Into<String>) {
        self.push(field, Severity::Warning, message);
    }

    pub fn error(&mut self, field: &str, message: impl Into<String>) {
        self.push(field, Severity::Error, message);
    }

    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn errors(&self) -> impl Iterator<Item = &FieldIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &FieldIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Warning)
    }

    /// Issues raised for `field`.
    pub fn for_field<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a FieldIssue> + 'a {
        self.issues.iter().filter(move |i| i.field == field)
    }
}
