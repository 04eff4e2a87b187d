//! Tracking configuration
//!
//! Everything the façade needs to reach the registry lives in one explicit
//! [`TrackingConfig`] carried by [`TrackingContext`](crate::TrackingContext);
//! there is no process-global session.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Environment variable overriding [`RegistryConfig::endpoint`].
pub const ENV_ENDPOINT: &str = "WORKFLOW_TRIALS_ENDPOINT";
/// Environment variable overriding [`RegistryConfig::region`].
pub const ENV_REGION: &str = "WORKFLOW_TRIALS_REGION";
/// Environment variable overriding [`RegistryConfig::account_id`].
pub const ENV_ACCOUNT_ID: &str = "WORKFLOW_TRIALS_ACCOUNT_ID";

/// Largest page the registry returns per listing call.
pub const MAX_PAGE_SIZE: usize = 100;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrackingConfig {
    /// Registry endpoint and identity
    pub registry: RegistryConfig,
    /// Listing behaviour
    pub listing: ListingConfig,
    /// Cleanup throttling
    pub cleanup: CleanupConfig,
}

/// Where the registry lives and who we are to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistryConfig {
    /// Endpoint override; `None` uses the platform default for `region`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Region, e.g. `us-east-1`
    pub region: String,
    /// ARN partition, e.g. `aws`
    pub partition: String,
    /// 12-digit account id used when building resource ARNs
    pub account_id: String,
    /// Static credentials; `None` defers to the ambient credential chain
    #[serde(skip_serializing_if = "Option::is_none")]
    pub credentials: Option<Credentials>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            region: "us-east-1".to_string(),
            partition: "aws".to_string(),
            account_id: "000000000000".to_string(),
            credentials: None,
        }
    }
}

/// Static access credentials. `Debug` never prints the secret parts.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Credentials {
    /// Access key id
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// Session token for temporary credentials
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Listing behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ListingConfig {
    /// Records fetched per registry round trip
    pub page_size: usize,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            page_size: MAX_PAGE_SIZE,
        }
    }
}

/// Cleanup throttling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CleanupConfig {
    /// Pause between trial component deletions, in milliseconds
    pub delete_delay_ms: u64,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            delete_delay_ms: 500,
        }
    }
}

impl CleanupConfig {
    /// The pause between trial component deletions.
    #[must_use]
    pub const fn delete_delay(&self) -> Duration {
        Duration::from_millis(self.delete_delay_ms)
    }
}

impl TrackingConfig {
    /// Load and validate a JSON configuration file.
    ///
    /// Missing sections and fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the file cannot be read, parsed, or
    /// fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|e| {
            Error::InvalidConfig(format!("cannot parse {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults overridden by process environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the result fails validation.
    pub fn from_env() -> Result<Self> {
        let config = Self::default().with_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup (the environment, in production).
    ///
    /// Credentials are replaced only when both `AWS_ACCESS_KEY_ID` and
    /// `AWS_SECRET_ACCESS_KEY` resolve.
    #[must_use]
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = lookup(ENV_ENDPOINT) {
            self.registry.endpoint = Some(endpoint);
        }
        if let Some(region) = lookup(ENV_REGION) {
            self.registry.region = region;
        }
        if let Some(account_id) = lookup(ENV_ACCOUNT_ID) {
            self.registry.account_id = account_id;
        }
        if let (Some(access_key_id), Some(secret_access_key)) =
            (lookup("AWS_ACCESS_KEY_ID"), lookup("AWS_SECRET_ACCESS_KEY"))
        {
            self.registry.credentials = Some(Credentials {
                access_key_id,
                secret_access_key,
                session_token: lookup("AWS_SESSION_TOKEN"),
            });
        }
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        let registry = &self.registry;

        if let Some(endpoint) = &registry.endpoint {
            if !(endpoint.starts_with("https://") || endpoint.starts_with("http://")) {
                return Err(Error::InvalidConfig(format!(
                    "registry.endpoint '{endpoint}' must be an http(s) URL"
                )));
            }
        }

        if registry.region.is_empty()
            || !registry
                .region
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(Error::InvalidConfig(format!(
                "registry.region '{}' is not a region name",
                registry.region
            )));
        }

        if registry.partition.is_empty() {
            return Err(Error::InvalidConfig(
                "registry.partition must not be empty".into(),
            ));
        }

        if registry.account_id.len() != 12 || !registry.account_id.chars().all(|c| c.is_ascii_digit())
        {
            return Err(Error::InvalidConfig(format!(
                "registry.account_id '{}' must be 12 digits",
                registry.account_id
            )));
        }

        if let Some(credentials) = &registry.credentials {
            if credentials.access_key_id.is_empty() || credentials.secret_access_key.is_empty() {
                return Err(Error::InvalidConfig(
                    "registry.credentials requires access_key_id and secret_access_key".into(),
                ));
            }
        }

        if self.listing.page_size == 0 || self.listing.page_size > MAX_PAGE_SIZE {
            return Err(Error::InvalidConfig(format!(
                "listing.page_size must be between 1 and {MAX_PAGE_SIZE}, got {}",
                self.listing.page_size
            )));
        }

        Ok(())
    }

    /// ARN of a platform resource, e.g. `training-job/<name>`.
    #[must_use]
    pub fn resource_arn(&self, resource_type: &str, name: &str) -> String {
        format!(
            "arn:{}:sagemaker:{}:{}:{resource_type}/{name}",
            self.registry.partition, self.registry.region, self.registry.account_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_is_valid() {
        TrackingConfig::default().validate().unwrap();
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: TrackingConfig =
            serde_json::from_str(r#"{"registry": {"region": "eu-west-1"}}"#).unwrap();
        assert_eq!(config.registry.region, "eu-west-1");
        assert_eq!(config.registry.partition, "aws");
        assert_eq!(config.listing.page_size, MAX_PAGE_SIZE);
        assert_eq!(config.cleanup.delete_delay(), Duration::from_millis(500));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result: std::result::Result<TrackingConfig, _> =
            serde_json::from_str(r#"{"registry": {"regoin": "eu-west-1"}}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            (ENV_REGION, "ap-southeast-2"),
            ("AWS_ACCESS_KEY_ID", "AKIDEXAMPLE"),
            ("AWS_SECRET_ACCESS_KEY", "secret"),
        ]
        .into_iter()
        .collect();

        let config = TrackingConfig::default()
            .with_overrides(|k| vars.get(k).map(|v| (*v).to_string()));

        assert_eq!(config.registry.region, "ap-southeast-2");
        let creds = config.registry.credentials.as_ref().unwrap();
        assert_eq!(creds.access_key_id, "AKIDEXAMPLE");
        assert!(creds.session_token.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn test_credentials_debug_redacts_secret() {
        let creds = Credentials {
            access_key_id: "AKID".into(),
            secret_access_key: "super-secret".into(),
            session_token: Some("token".into()),
        };
        let debug = format!("{creds:?}");
        assert!(debug.contains("AKID"));
        assert!(!debug.contains("super-secret"));
        assert!(!debug.contains("\"token\""));
    }

    #[test]
    fn test_validate_rejects() {
        let mut config = TrackingConfig::default();
        config.listing.page_size = 0;
        assert!(config.validate().is_err());

        let mut config = TrackingConfig::default();
        config.registry.account_id = "123".into();
        assert!(config.validate().is_err());

        let mut config = TrackingConfig::default();
        config.registry.endpoint = Some("ftp://registry".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_resource_arn() {
        let arn = TrackingConfig::default().resource_arn("training-job", "train-1");
        assert_eq!(arn, "arn:aws:sagemaker:us-east-1:000000000000:training-job/train-1");
    }
}
