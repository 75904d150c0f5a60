//! Parser for the `<job> [build]` argument grammar used by slash commands.
//!
//! Users type job names that may live inside folders and may contain spaces.
//! Double quotes group a name with spaces; an optional trailing word is the
//! build number:
//!
//! ```text
//! jobname                       folder/jobname
//! jobname 22                    folder/jobname 22
//! "jobname"                     "folder/jobname" 22
//! "job name with space"         "folder with space/job name with space" 22
//! ```
//!
//! Slash commands arrive already split on whitespace, so the tokens are
//! re-joined with single spaces and scanned. Each candidate is either a
//! quoted segment or a bare run of non-space characters, optionally followed
//! by whitespace and a run of word characters. Exactly one candidate must be
//! found; anything else is ambiguous and rejected.

use crate::types::{JobPath, JobPathError};

const QUOTE: char = '"';

/// Characters stripped from both ends of an extracted job name.
const STRAY_CHARS: &[char] = &['"', '\\'];

/// A job reference extracted from command arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobReference {
    /// Job path, possibly nested in folders.
    pub job: JobPath,
    /// Build number (or other build selector word) following the job name.
    pub build_number: Option<String>,
}

/// One `<job> [build]` match found while scanning the joined input.
#[derive(Debug, PartialEq, Eq)]
struct Candidate<'a> {
    job: &'a str,
    build: &'a str,
}

/// Parse command arguments into `(job_name, build_number, ok)`.
///
/// This is the raw grammar: the job name is returned even when it would not
/// form a valid [`JobPath`], and the build number is an empty string when
/// absent. Most callers want [`parse_job_reference`].
#[must_use]
pub fn parse_build_parameters<S: AsRef<str>>(tokens: &[S]) -> (String, String, bool) {
    match tokens {
        [] => (String::new(), String::new(), false),
        [single] => {
            let single = single.as_ref();
            if single.starts_with(QUOTE) && single.ends_with(QUOTE) {
                (trim_stray(single).to_string(), String::new(), true)
            } else {
                (single.to_string(), String::new(), true)
            }
        }
        _ => {
            let joined = tokens
                .iter()
                .map(|token| token.as_ref())
                .collect::<Vec<&str>>()
                .join(" ");

            match scan(&joined).as_slice() {
                [only] => (trim_stray(only.job).to_string(), only.build.to_string(), true),
                _ => (String::new(), String::new(), false),
            }
        }
    }
}

/// Parse command arguments into a validated [`JobReference`].
///
/// Returns `None` when the arguments are empty, ambiguous, or do not name a
/// valid job path. Callers surface a usage message in that case.
#[must_use]
pub fn parse_job_reference<S: AsRef<str>>(tokens: &[S]) -> Option<JobReference> {
    let (job, build, ok) = parse_build_parameters(tokens);
    if !ok {
        return None;
    }

    let job = JobPath::parse(&job).ok()?;
    let build_number = (!build.is_empty()).then_some(build);

    Some(JobReference { job, build_number })
}

impl JobReference {
    /// Build a reference from a job name alone (dialog callbacks use this).
    ///
    /// # Errors
    ///
    /// Returns an error if the name is not a valid job path.
    pub fn from_job_name(name: &str) -> Result<Self, JobPathError> {
        Ok(Self {
            job: JobPath::parse(trim_stray(name))?,
            build_number: None,
        })
    }
}

fn trim_stray(s: &str) -> &str {
    s.trim_matches(STRAY_CHARS)
}

/// Whitespace as understood by the grammar (ASCII `\t \n \x0C \r` and space).
const fn is_space(c: char) -> bool {
    c.is_ascii_whitespace()
}

/// Word characters allowed in a build number.
const fn is_word(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Index of the first char at or after `from` matching `pred`, or `len`.
fn find_from(input: &str, from: usize, pred: impl Fn(char) -> bool) -> usize {
    input
        .get(from..)
        .and_then(|rest| rest.find(pred))
        .map_or(input.len(), |offset| from + offset)
}

/// Collect every non-overlapping candidate, scanning left to right.
fn scan(input: &str) -> Vec<Candidate<'_>> {
    let mut found = Vec::new();
    let mut pos = 0;

    while let Some(c) = input.get(pos..).and_then(|rest| rest.chars().next()) {
        let job_end = if c == QUOTE {
            // A quoted segment needs its closing quote; a lone quote cannot
            // start a candidate and is skipped.
            let after_open = pos + c.len_utf8();
            match input.get(after_open..).and_then(|rest| rest.find(QUOTE)) {
                Some(offset) => after_open + offset + QUOTE.len_utf8(),
                None => {
                    pos = after_open;
                    continue;
                }
            }
        } else if is_space(c) {
            pos += c.len_utf8();
            continue;
        } else {
            find_from(input, pos, |c| c == QUOTE || is_space(c))
        };

        let build_start = find_from(input, job_end, |c| !is_space(c));
        let build_end = find_from(input, build_start, |c| !is_word(c));

        if let (Some(job), Some(build)) = (
            input.get(pos..job_end),
            input.get(build_start..build_end),
        ) {
            found.push(Candidate { job, build });
        }

        pos = build_end;
    }

    found
}
