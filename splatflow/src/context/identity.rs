//! Run identity.

use serde::Serialize;
use std::fmt;
use uuid::Uuid;

use crate::errors::NameError;
use crate::naming;

/// The caller-visible id of one pipeline run.
///
/// The id doubles as the root of every derived job name, so it obeys the
/// name-root rules: lowercase alphanumeric with interior hyphens, short
/// enough that every `{id}-{suffix}` fits the backend's name limit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// Generates a fresh id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Accepts a caller-supplied id after validating it as a name root.
    ///
    /// # Errors
    ///
    /// Returns a [`NameError`] when the id cannot form valid job names.
    pub fn parse(raw: impl Into<String>) -> Result<Self, NameError> {
        let raw = raw.into();
        naming::validate_root(&raw)?;
        Ok(Self(raw))
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::JobName;
    use crate::stages::Stage;

    #[test]
    fn test_generated_ids_are_valid_name_roots() {
        for _ in 0..32 {
            let id = JobId::generate();
            assert!(JobName::derive(id.as_str(), Stage::Compress).is_ok());
        }
    }

    #[test]
    fn test_parse_rejects_bad_roots() {
        assert!(JobId::parse("abc123").is_ok());
        assert!(matches!(JobId::parse(""), Err(NameError::Empty)));
        assert!(matches!(
            JobId::parse("Not Valid"),
            Err(NameError::InvalidCharset { .. })
        ));
    }
}
