// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Validation failure accumulation.
//!
//! Validation reports every problem it finds before giving up, so a user
//! sees all misconfigured fields at once. Each failure names the config
//! property (or the offending entry of a list property) it belongs to.

use std::fmt;

/// What a failure is attached to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cause {
    /// A whole config property.
    ConfigProperty(String),
    /// One entry of a list-valued property.
    ConfigElement { property: String, element: String },
    /// The underlying error, for diagnostics.
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    message: String,
    corrective_action: Option<String>,
    causes: Vec<Cause>,
}

impl ValidationFailure {
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn corrective_action(&self) -> Option<&str> {
        self.corrective_action.as_deref()
    }

    pub fn causes(&self) -> &[Cause] {
        &self.causes
    }

    pub fn with_config_property(&mut self, property: &str) -> &mut Self {
        self.causes.push(Cause::ConfigProperty(property.to_string()));
        self
    }

    pub fn with_config_element(&mut self, property: &str, element: &str) -> &mut Self {
        self.causes.push(Cause::ConfigElement {
            property: property.to_string(),
            element: element.to_string(),
        });
        self
    }

    pub fn with_error(&mut self, error: &dyn std::error::Error) -> &mut Self {
        self.causes.push(Cause::Error(error.to_string()));
        self
    }

    /// Config properties this failure is attached to, directly or by element.
    pub fn properties(&self) -> impl Iterator<Item = &str> {
        self.causes.iter().filter_map(|cause| match cause {
            Cause::ConfigProperty(property) => Some(property.as_str()),
            Cause::ConfigElement { property, .. } => Some(property.as_str()),
            Cause::Error(_) => None,
        })
    }

    /// True when attached to `property`.
    #[must_use]
    pub fn concerns(&self, property: &str) -> bool {
        self.properties().any(|p| p == property)
    }
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        for cause in &self.causes {
            match cause {
                Cause::ConfigProperty(property) => write!(f, " [{}]", property)?,
                Cause::ConfigElement { property, element } => {
                    write!(f, " [{}: {}]", property, element)?
                }
                Cause::Error(_) => {}
            }
        }
        if let Some(action) = &self.corrective_action {
            write!(f, " {}", action)?;
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct FailureCollector {
    failures: Vec<ValidationFailure>,
}

impl FailureCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure and return it for attaching causes.
    pub fn add_failure(
        &mut self,
        message: impl Into<String>,
        corrective_action: Option<&str>,
    ) -> &mut ValidationFailure {
        self.failures.push(ValidationFailure {
            message: message.into(),
            corrective_action: corrective_action.map(str::to_string),
            causes: Vec::new(),
        });
        let last = self.failures.len() - 1;
        &mut self.failures[last]
    }

    pub fn failures(&self) -> &[ValidationFailure] {
        &self.failures
    }

    /// Failures attached to `property`.
    pub fn failures_for<'a>(
        &'a self,
        property: &'a str,
    ) -> impl Iterator<Item = &'a ValidationFailure> + 'a {
        self.failures.iter().filter(move |f| f.concerns(property))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// `Err` with every collected failure, if there are any.
    pub fn get_or_error(&self) -> Result<(), ValidationError> {
        if self.failures.is_empty() {
            Ok(())
        } else {
            Err(ValidationError {
                failures: self.failures.clone(),
            })
        }
    }
}

/// All failures of one validation pass.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub struct ValidationError {
    failures: Vec<ValidationFailure>,
}

impl ValidationError {
    pub fn failures(&self) -> &[ValidationFailure] {
        &self.failures
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Errors were encountered during validation.")?;
        for failure in &self.failures {
            write!(f, " {}", failure)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_collector_passes() {
        let collector = FailureCollector::new();
        assert!(collector.is_empty());
        assert!(collector.get_or_error().is_ok());
    }

    #[test]
    fn test_failures_are_batched() {
        let mut collector = FailureCollector::new();
        collector
            .add_failure("Bucket does not exist.", Some("Ensure you entered the correct bucket path."))
            .with_config_element("paths", "gs://missing/a");
        collector
            .add_failure("Invalid format 'xml'.", None)
            .with_config_property("format");

        let err = collector.get_or_error().unwrap_err();
        assert_eq!(err.failures().len(), 2);
        assert_eq!(
            err.to_string(),
            "Errors were encountered during validation. \
             Bucket does not exist. [paths: gs://missing/a] Ensure you entered the correct bucket path. \
             Invalid format 'xml'. [format]"
        );
    }

    #[test]
    fn test_failures_for_property() {
        let mut collector = FailureCollector::new();
        collector.add_failure("a", None).with_config_property("sourcePath");
        collector
            .add_failure("b", None)
            .with_config_property("destPath")
            .with_error(&std::io::Error::other("boom"));
        collector.add_failure("c", None).with_config_element("destPath", "x");

        assert_eq!(collector.failures_for("sourcePath").count(), 1);
        let dest: Vec<&str> = collector
            .failures_for("destPath")
            .map(ValidationFailure::message)
            .collect();
        assert_eq!(dest, vec!["b", "c"]);
        assert_eq!(
            collector.failures()[1].causes()[1],
            Cause::Error("boom".to_string())
        );
    }
}
