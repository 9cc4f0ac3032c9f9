//! Job name derivation and validation.
//!
//! Every remote job is named `{root}-{suffix}` where the root is the run's
//! job id and the suffix is fixed per stage. Distinct suffixes keep the
//! stages of one run from colliding; distinct roots keep runs from
//! colliding. Validation happens at request acceptance so a bad id is
//! rejected before anything launches.

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::OnceLock;

use crate::errors::NameError;
use crate::stages::Stage;

/// Maximum length of a derived job name.
pub const MAX_NAME_LEN: usize = 63;

/// Longest stage suffix, including the joining hyphen.
const SUFFIX_RESERVE: usize = 12;

/// Maximum length of a name root, leaving room for every stage suffix.
pub const MAX_ROOT_LEN: usize = MAX_NAME_LEN - SUFFIX_RESERVE;

static NAME_PATTERN: OnceLock<Regex> = OnceLock::new();

fn name_pattern() -> &'static Regex {
    NAME_PATTERN.get_or_init(|| {
        Regex::new(r"^[a-z0-9]([a-z0-9-]*[a-z0-9])?$").expect("hard-coded pattern compiles")
    })
}

fn validate(name: &str, max: usize) -> Result<(), NameError> {
    if name.is_empty() {
        return Err(NameError::Empty);
    }
    if name.len() > max {
        return Err(NameError::TooLong {
            name: name.to_string(),
            max,
        });
    }
    if !name_pattern().is_match(name) {
        return Err(NameError::InvalidCharset {
            name: name.to_string(),
        });
    }
    Ok(())
}

/// Validates a name root (a job id) for use in derived job names.
///
/// # Errors
///
/// Returns a [`NameError`] when the root is empty, longer than
/// [`MAX_ROOT_LEN`], or outside the lowercase-alphanumeric-with-interior-
/// hyphens charset.
pub fn validate_root(root: &str) -> Result<(), NameError> {
    validate(root, MAX_ROOT_LEN)
}

/// A validated, derived job name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct JobName(String);

impl JobName {
    /// Derives the name for one stage of a run: `{root}-{suffix}`.
    ///
    /// # Errors
    ///
    /// Returns a [`NameError`] when the root (and therefore the derived
    /// name) fails validation.
    pub fn derive(root: &str, stage: Stage) -> Result<Self, NameError> {
        validate_root(root)?;
        let name = format!("{root}-{}", stage.job_suffix());
        validate(&name, MAX_NAME_LEN)?;
        Ok(Self(name))
    }

    /// The name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<JobName> for String {
    fn from(name: JobName) -> Self {
        name.0
    }
}
