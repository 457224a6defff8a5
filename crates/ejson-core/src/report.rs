//! Audit report types.
//!
//! A report maps a check category (e.g. `"phase_consistency"`) to a section
//! holding a human-readable description and the problems found. Sections keep
//! the order in which they were registered, so serialized reports are stable.
//!
//! # Example
//!
//! ```
//! use ejson_core::report::{AuditReport, Problem};
//!
//! let mut report = AuditReport::new();
//! report.register("connections", "Check for wrongly connected components");
//! report.add(
//!     "connections",
//!     Problem::error().with_detail("elem_id", "ln1").with_detail("n_cons", 3),
//! );
//!
//! assert_eq!(report.error_count(), 1);
//! assert_eq!(report.summary(), "1 error");
//! ```

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

/// Severity level for audit problems, serialized as the problem's `type`.
/// Every check the auditor runs reports errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum Severity {
    Error,
}

/// A single finding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Problem {
    #[serde(rename = "type")]
    pub severity: Severity,
    /// Whether the auditor repaired the problem in place
    pub fixed: bool,
    pub details: Map<String, Value>,
}

impl Problem {
    pub fn new(severity: Severity) -> Self {
        Self {
            severity,
            fixed: false,
            details: Map::new(),
        }
    }

    pub fn error() -> Self {
        Self::new(Severity::Error)
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }

    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details.get(key)
    }
}

impl std::fmt::Display for Problem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let severity = match self.severity {
            Severity::Error => "error",
        };
        write!(f, "[{}]", severity)?;
        for (key, value) in &self.details {
            match value {
                Value::String(s) => write!(f, " {}={}", key, s)?,
                other => write!(f, " {}={}", key, other)?,
            }
        }
        Ok(())
    }
}

/// Findings of one check category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditSection {
    pub description: String,
    pub problems: Vec<Problem>,
}

/// Mapping from check category to its section.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AuditReport {
    sections: IndexMap<String, AuditSection>,
}

impl AuditReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure a category exists, even if it ends up with no problems.
    pub fn register(&mut self, category: &str, description: &str) -> &mut AuditSection {
        self.sections
            .entry(category.to_string())
            .or_insert_with(|| AuditSection {
                description: description.to_string(),
                problems: Vec::new(),
            })
    }

    /// Add a problem, creating the category with an empty description if needed.
    pub fn add(&mut self, category: &str, problem: Problem) {
        self.register(category, "").problems.push(problem);
    }

    pub fn section(&self, category: &str) -> Option<&AuditSection> {
        self.sections.get(category)
    }

    /// Problems of one category; empty if the category is unknown.
    pub fn problems(&self, category: &str) -> &[Problem] {
        self.sections
            .get(category)
            .map(|s| s.problems.as_slice())
            .unwrap_or(&[])
    }

    pub fn sections(&self) -> impl Iterator<Item = (&str, &AuditSection)> {
        self.sections.iter().map(|(k, v)| (k.as_str(), v))
    }

    fn all_problems(&self) -> impl Iterator<Item = &Problem> {
        self.sections.values().flat_map(|s| s.problems.iter())
    }

    pub fn problem_count(&self) -> usize {
        self.all_problems().count()
    }

    pub fn error_count(&self) -> usize {
        self.all_problems()
            .filter(|p| p.severity == Severity::Error)
            .count()
    }

    pub fn is_clean(&self) -> bool {
        self.problem_count() == 0
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    pub fn summary(&self) -> String {
        match self.error_count() {
            0 => "No problems".to_string(),
            1 => "1 error".to_string(),
            n => format!("{} errors", n),
        }
    }
}

impl std::fmt::Display for AuditReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Audit: {}", self.summary())?;
        for (name, section) in &self.sections {
            if section.problems.is_empty() {
                continue;
            }
            writeln!(f, "  {} ({}):", name, section.description)?;
            for problem in &section.problems {
                writeln!(f, "    {}", problem)?;
            }
        }
        Ok(())
    }
}
