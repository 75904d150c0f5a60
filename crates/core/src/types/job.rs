//! Jenkins job path type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Separator between folder segments in a user-supplied job path.
const FOLDER_SEPARATOR: char = '/';

/// Infix Jenkins expects between nested item names in URLs.
const SERVER_FOLDER_INFIX: &str = "/job/";

/// Errors that can occur when parsing a [`JobPath`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum JobPathError {
    /// The input string is empty.
    #[error("job name cannot be empty")]
    Empty,
    /// A folder segment is empty (e.g. `folder//job`).
    #[error("job path contains an empty folder segment")]
    EmptySegment,
}

/// A Jenkins job, optionally nested inside folders.
///
/// Segments are separated by `/` and may contain spaces, e.g.
/// `folder with spaces/and job`. The path is stored exactly as the user
/// typed it; [`JobPath::to_server_path`] produces the form the Jenkins API
/// expects.
///
/// ## Examples
///
/// ```
/// use jenkins_relay_core::JobPath;
///
/// let path = JobPath::parse("folder/jobname").unwrap();
/// assert_eq!(path.to_server_path(), "folder/job/jobname");
/// assert_eq!(path.name(), "jobname");
///
/// assert!(JobPath::parse("").is_err());
/// assert!(JobPath::parse("folder//job").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct JobPath(String);

impl JobPath {
    /// Parse a `JobPath` from a string.
    ///
    /// Leading and trailing separators are ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty or has an empty segment.
    pub fn parse(s: &str) -> Result<Self, JobPathError> {
        let trimmed = s.trim().trim_matches(FOLDER_SEPARATOR);
        if trimmed.is_empty() {
            return Err(JobPathError::Empty);
        }

        if trimmed
            .split(FOLDER_SEPARATOR)
            .any(|segment| segment.trim().is_empty())
        {
            return Err(JobPathError::EmptySegment);
        }

        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the path as the user wrote it.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the job name (the last segment).
    #[must_use]
    pub fn name(&self) -> &str {
        self.0
            .rsplit(FOLDER_SEPARATOR)
            .next()
            .unwrap_or(self.0.as_str())
    }

    /// Returns the enclosing folder, if the job is nested.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.0
            .rsplit_once(FOLDER_SEPARATOR)
            .map(|(parent, _)| Self(parent.to_owned()))
    }

    /// Rewrite folder separators into Jenkins' nested item convention.
    ///
    /// `folder/jobname` becomes `folder/job/jobname`; the caller prefixes the
    /// result with `job/` when building a URL.
    #[must_use]
    pub fn to_server_path(&self) -> String {
        self.0.replace(FOLDER_SEPARATOR, SERVER_FOLDER_INFIX)
    }
}

impl fmt::Display for JobPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for JobPath {
    type Err = JobPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for JobPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_path_single_folder() {
        let path = JobPath::parse("folder/jobname").expect("valid path");
        assert_eq!(path.to_server_path(), "folder/job/jobname");
    }

    #[test]
    fn test_server_path_nested_folders_with_spaces() {
        let path = JobPath::parse("folder with spaces/and job").expect("valid path");
        assert_eq!(path.to_server_path(), "folder with spaces/job/and job");

        let path = JobPath::parse("a/b/c").expect("valid path");
        assert_eq!(path.to_server_path(), "a/job/b/job/c");
    }

    #[test]
    fn test_server_path_plain_job_unchanged() {
        let path = JobPath::parse("jobname").expect("valid path");
        assert_eq!(path.to_server_path(), "jobname");
        assert!(path.parent().is_none());
    }

    #[test]
    fn test_name_and_parent() {
        let path = JobPath::parse("team/service/deploy").expect("valid path");
        assert_eq!(path.name(), "deploy");
        assert_eq!(
            path.parent().map(|p| p.as_str().to_owned()),
            Some("team/service".to_string())
        );

        let path = JobPath::parse("deploy").expect("valid path");
        assert_eq!(path.name(), "deploy");
        assert!(path.parent().is_none());
    }

    #[test]
    fn test_parse_trims_outer_separators() {
        let path = JobPath::parse("/folder/job/").expect("valid path");
        assert_eq!(path.as_str(), "folder/job");
    }

    #[test]
    fn test_parse_rejects_empty() {
        assert_eq!(JobPath::parse(""), Err(JobPathError::Empty));
        assert_eq!(JobPath::parse("  "), Err(JobPathError::Empty));
        assert_eq!(JobPath::parse("/"), Err(JobPathError::Empty));
    }

    #[test]
    fn test_parse_rejects_empty_segment() {
        assert_eq!(
            JobPath::parse("folder//job"),
            Err(JobPathError::EmptySegment)
        );
        assert_eq!(
            JobPath::parse("folder/ /job"),
            Err(JobPathError::EmptySegment)
        );
    }
}
