//! Artifact Record - input and output locations of a job

use serde::{Deserialize, Serialize};

/// Artifact Record points at data consumed or produced by a job.
///
/// `value` is an opaque URI (e.g. `s3://bucket/prefix/model.tar.gz`); the
/// façade records it but never reads it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtifactRecord {
    value: String,
    media_type: Option<String>,
}

impl ArtifactRecord {
    /// Create a new artifact record.
    ///
    /// # Arguments
    ///
    /// * `value` - URI of the artifact
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            media_type: None,
        }
    }

    /// Same artifact, with a media type.
    #[must_use]
    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    /// Get the artifact URI.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Get the media type, if known.
    #[must_use]
    pub fn media_type(&self) -> Option<&str> {
        self.media_type.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_record_new() {
        let artifact = ArtifactRecord::new("s3://bucket/model.tar.gz").with_media_type("application/x-tar");
        assert_eq!(artifact.value(), "s3://bucket/model.tar.gz");
        assert_eq!(artifact.media_type(), Some("application/x-tar"));
    }
}
