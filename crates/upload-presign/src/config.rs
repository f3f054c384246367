//! Signer configuration.
//!
//! Provides [`SignerConfig`], the loosely-typed settings a deployment supplies,
//! and the single conversion that validates them into [`StoreCredentials`].
//! Values are loaded from environment variables using the AWS SDK names where
//! one exists.

use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::credentials::StoreCredentials;
use crate::error::SignResult;
use crate::presigned::DEFAULT_LINK_EXPIRY;

/// Presigned upload configuration.
///
/// All fields have defaults suitable for a local S3-compatible server.
/// Configuration can be loaded from environment variables via
/// [`SignerConfig::from_env`].
///
/// # Examples
///
/// ```
/// use upload_presign::config::SignerConfig;
///
/// let config = SignerConfig::default();
/// assert_eq!(config.endpoint, "http://localhost:4566");
/// assert_eq!(config.default_expiry, 3600);
/// ```
#[derive(Clone, Serialize, Deserialize, TypedBuilder)]
#[serde(rename_all = "camelCase")]
pub struct SignerConfig {
    /// Object store endpoint URL.
    #[builder(default = String::from("http://localhost:4566"))]
    pub endpoint: String,

    /// Access key ID used in the credential scope.
    #[builder(default = String::from("test"))]
    pub access_key_id: String,

    /// Secret access key. Never serialized.
    #[builder(default = String::from("test"))]
    #[serde(skip_serializing, default)]
    pub secret_access_key: String,

    /// Default bucket for requests that do not name one.
    #[builder(default)]
    #[serde(default)]
    pub bucket: String,

    /// Signing region.
    #[builder(default = String::from("us-east-1"))]
    pub region: String,

    /// Link lifetime in seconds applied by callers that do not choose one.
    #[builder(default = DEFAULT_LINK_EXPIRY)]
    pub default_expiry: u64,

    /// Log level filter string (e.g. `"info"`, `"debug"`).
    #[builder(default = String::from("info"))]
    pub log_level: String,
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            endpoint: String::from("http://localhost:4566"),
            access_key_id: String::from("test"),
            secret_access_key: String::from("test"),
            bucket: String::new(),
            region: String::from("us-east-1"),
            default_expiry: DEFAULT_LINK_EXPIRY,
            log_level: String::from("info"),
        }
    }
}

impl std::fmt::Debug for SignerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignerConfig")
            .field("endpoint", &self.endpoint)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("default_expiry", &self.default_expiry)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl SignerConfig {
    /// Load configuration from environment variables.
    ///
    /// Reads the following environment variables (falling back to defaults):
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `S3_ENDPOINT_URL` | `http://localhost:4566` |
    /// | `AWS_ACCESS_KEY_ID` | `test` |
    /// | `AWS_SECRET_ACCESS_KEY` | `test` |
    /// | `S3_BUCKET` | *(empty)* |
    /// | `AWS_REGION`, then `DEFAULT_REGION` | `us-east-1` |
    /// | `PRESIGN_EXPIRY` | `3600` |
    /// | `LOG_LEVEL` | `info` |
    ///
    /// # Examples
    ///
    /// ```
    /// use upload_presign::config::SignerConfig;
    ///
    /// let config = SignerConfig::from_env();
    /// assert!(!config.endpoint.is_empty());
    /// ```
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(v) = std::env::var("S3_ENDPOINT_URL") {
            config.endpoint = v;
        }
        if let Ok(v) = std::env::var("AWS_ACCESS_KEY_ID") {
            config.access_key_id = v;
        }
        if let Ok(v) = std::env::var("AWS_SECRET_ACCESS_KEY") {
            config.secret_access_key = v;
        }
        if let Ok(v) = std::env::var("S3_BUCKET") {
            config.bucket = v;
        }
        if let Ok(v) = std::env::var("AWS_REGION").or_else(|_| std::env::var("DEFAULT_REGION")) {
            config.region = v;
        }
        if let Ok(v) = std::env::var("PRESIGN_EXPIRY") {
            if let Ok(n) = v.parse::<u64>() {
                config.default_expiry = n;
            }
        }
        if let Ok(v) = std::env::var("LOG_LEVEL") {
            config.log_level = v;
        }

        config
    }

    /// Validate this configuration into [`StoreCredentials`].
    ///
    /// # Errors
    ///
    /// Returns [`crate::SignError::InvalidConfiguration`] if the endpoint or
    /// any credential field is invalid.
    pub fn into_credentials(self) -> SignResult<StoreCredentials> {
        StoreCredentials::new(
            &self.endpoint,
            self.access_key_id,
            self.secret_access_key,
            self.bucket,
            self.region,
        )
    }
}
