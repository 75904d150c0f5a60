//! Build parameter types.
//!
//! Jenkins jobs may declare parameters (`ParametersDefinitionProperty`). The
//! relay renders those as a Mattermost dialog and validates the submission
//! against the declared schema before triggering the build.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Kind of a declared Jenkins job parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKind {
    /// Single-line string (`StringParameterDefinition`).
    String,
    /// Multi-line text (`TextParameterDefinition`).
    Text,
    /// Checkbox (`BooleanParameterDefinition`).
    Boolean,
    /// Drop-down list (`ChoiceParameterDefinition`).
    Choice,
    /// Masked string (`PasswordParameterDefinition`).
    Password,
    /// Anything else (file, run, credentials...). Must be supplied explicitly.
    Other,
}

impl ParameterKind {
    /// Map a Jenkins parameter definition type name to a kind.
    #[must_use]
    pub fn from_jenkins_type(type_name: &str) -> Self {
        match type_name {
            "StringParameterDefinition" => Self::String,
            "TextParameterDefinition" => Self::Text,
            "BooleanParameterDefinition" => Self::Boolean,
            "ChoiceParameterDefinition" => Self::Choice,
            "PasswordParameterDefinition" => Self::Password,
            _ => Self::Other,
        }
    }
}

/// A parameter declared by a Jenkins job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDefinition {
    /// Parameter name.
    pub name: String,
    /// Parameter kind.
    pub kind: ParameterKind,
    /// Default value, if the job declares one.
    pub default_value: Option<String>,
    /// Human-readable description.
    pub description: Option<String>,
    /// Allowed values (choice parameters only).
    pub choices: Vec<String>,
}

impl ParameterDefinition {
    /// Value used when the user leaves the parameter out of a submission.
    fn fallback_value(&self) -> Option<String> {
        if let Some(default) = &self.default_value {
            return Some(default.clone());
        }
        match self.kind {
            ParameterKind::String | ParameterKind::Text | ParameterKind::Password => {
                Some(String::new())
            }
            ParameterKind::Boolean => Some("false".to_string()),
            ParameterKind::Choice => self.choices.first().cloned(),
            ParameterKind::Other => None,
        }
    }
}

/// Errors produced when validating submitted parameters.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ParameterError {
    /// The submission contains a parameter the job does not declare.
    #[error("unknown parameter '{0}'")]
    Unknown(String),
    /// A required parameter has no value and no default.
    #[error("parameter '{0}' is required")]
    Missing(String),
    /// A boolean parameter received something other than true/false.
    #[error("parameter '{name}' must be true or false (got '{value}')")]
    InvalidBoolean {
        /// Parameter name.
        name: String,
        /// Submitted value.
        value: String,
    },
    /// A choice parameter received a value outside its choices.
    #[error("parameter '{name}' must be one of the declared choices (got '{value}')")]
    InvalidChoice {
        /// Parameter name.
        name: String,
        /// Submitted value.
        value: String,
    },
}

impl ParameterError {
    /// Name of the parameter the error is about.
    #[must_use]
    pub fn parameter_name(&self) -> &str {
        match self {
            Self::Unknown(name) | Self::Missing(name) => name,
            Self::InvalidBoolean { name, .. } | Self::InvalidChoice { name, .. } => name,
        }
    }
}

/// Ordered mapping of parameter name to value, ready to submit to Jenkins.
///
/// Order follows the job's declaration order once validated, so the query
/// string sent to `buildWithParameters` is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildParameters(Vec<(String, String)>);

impl BuildParameters {
    /// Create an empty parameter set.
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Insert or replace a parameter, keeping the original position on replace.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(entry) = self.0.iter_mut().find(|(n, _)| *n == name) {
            entry.1 = value;
        } else {
            self.0.push((name, value));
        }
    }

    /// Look up a parameter value by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Iterate over `(name, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Validate a submission against the job's declared parameters.
    ///
    /// Missing values fall back to the declared default (or an empty value
    /// for string-like kinds). Boolean values are normalised to lowercase.
    ///
    /// # Errors
    ///
    /// Returns an error for undeclared names, values that do not fit the
    /// declared kind, or required parameters that cannot be filled in.
    pub fn validate(
        mut submitted: BTreeMap<String, String>,
        definitions: &[ParameterDefinition],
    ) -> Result<Self, ParameterError> {
        let mut params = Self::new();

        for definition in definitions {
            let value = match submitted.remove(&definition.name) {
                Some(value) => value,
                None => definition
                    .fallback_value()
                    .ok_or_else(|| ParameterError::Missing(definition.name.clone()))?,
            };

            let value = match definition.kind {
                ParameterKind::Boolean => normalise_boolean(&definition.name, value)?,
                ParameterKind::Choice
                    if !definition.choices.is_empty() && !definition.choices.contains(&value) =>
                {
                    return Err(ParameterError::InvalidChoice {
                        name: definition.name.clone(),
                        value,
                    });
                }
                _ => value,
            };

            params.insert(definition.name.clone(), value);
        }

        if let Some(name) = submitted.into_keys().next() {
            return Err(ParameterError::Unknown(name));
        }

        Ok(params)
    }
}

fn normalise_boolean(name: &str, value: String) -> Result<String, ParameterError> {
    match value.to_ascii_lowercase().as_str() {
        "true" => Ok("true".to_string()),
        "false" | "" => Ok("false".to_string()),
        _ => Err(ParameterError::InvalidBoolean {
            name: name.to_string(),
            value,
        }),
    }
}

impl<'a> IntoIterator for &'a BuildParameters {
    type Item = &'a (String, String);
    type IntoIter = std::slice::Iter<'a, (String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition(name: &str, kind: ParameterKind) -> ParameterDefinition {
        ParameterDefinition {
            name: name.to_string(),
            kind,
            default_value: None,
            description: None,
            choices: Vec::new(),
        }
    }

    fn submission(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_kind_from_jenkins_type() {
        assert_eq!(
            ParameterKind::from_jenkins_type("BooleanParameterDefinition"),
            ParameterKind::Boolean
        );
        assert_eq!(
            ParameterKind::from_jenkins_type("RunParameterDefinition"),
            ParameterKind::Other
        );
    }

    #[test]
    fn test_validate_keeps_declaration_order() {
        let definitions = vec![
            definition("BRANCH", ParameterKind::String),
            definition("DEPLOY", ParameterKind::Boolean),
        ];
        let params = BuildParameters::validate(
            submission(&[("DEPLOY", "TRUE"), ("BRANCH", "main")]),
            &definitions,
        )
        .expect("valid submission");

        let pairs: Vec<_> = params.iter().collect();
        assert_eq!(pairs, vec![("BRANCH", "main"), ("DEPLOY", "true")]);
    }

    #[test]
    fn test_validate_fills_defaults() {
        let mut env = definition("ENV", ParameterKind::Choice);
        env.choices = vec!["staging".to_string(), "production".to_string()];
        let mut branch = definition("BRANCH", ParameterKind::String);
        branch.default_value = Some("develop".to_string());

        let params =
            BuildParameters::validate(BTreeMap::new(), &[branch, env]).expect("defaults apply");
        assert_eq!(params.get("BRANCH"), Some("develop"));
        assert_eq!(params.get("ENV"), Some("staging"));
    }

    #[test]
    fn test_validate_rejects_unknown_parameter() {
        let definitions = vec![definition("BRANCH", ParameterKind::String)];
        let err = BuildParameters::validate(submission(&[("BRNCH", "main")]), &definitions)
            .expect_err("unknown parameter");
        assert_eq!(err, ParameterError::Unknown("BRNCH".to_string()));
        assert_eq!(err.parameter_name(), "BRNCH");
    }

    #[test]
    fn test_validate_rejects_bad_choice_and_boolean() {
        let mut env = definition("ENV", ParameterKind::Choice);
        env.choices = vec!["staging".to_string()];
        let err = BuildParameters::validate(submission(&[("ENV", "prod")]), &[env])
            .expect_err("invalid choice");
        assert!(matches!(err, ParameterError::InvalidChoice { .. }));

        let flag = definition("FLAG", ParameterKind::Boolean);
        let err = BuildParameters::validate(submission(&[("FLAG", "yes")]), &[flag])
            .expect_err("invalid boolean");
        assert!(matches!(err, ParameterError::InvalidBoolean { .. }));
    }

    #[test]
    fn test_validate_requires_other_kinds() {
        let file = definition("ARCHIVE", ParameterKind::Other);
        let err = BuildParameters::validate(BTreeMap::new(), &[file]).expect_err("required");
        assert_eq!(err, ParameterError::Missing("ARCHIVE".to_string()));
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut params = BuildParameters::new();
        params.insert("A", "1");
        params.insert("B", "2");
        params.insert("A", "3");
        assert_eq!(params.len(), 2);
        assert_eq!(params.iter().next(), Some(("A", "3")));
    }
}
