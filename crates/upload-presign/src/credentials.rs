//! Store credentials: the validated endpoint and key pair a signer works with.
//!
//! [`StoreCredentials`] is constructed once, validated up front, and then
//! passed by reference to every signing call. The secret access key is held
//! in a buffer that is wiped on drop and never appears in `Debug` output.

use std::fmt;

use serde::{Deserialize, Deserializer};
use url::Url;
use zeroize::Zeroizing;

use crate::error::{SignError, SignResult};
use crate::presigned::SignRequest;

/// Credentials and addressing for one S3-compatible object store.
///
/// # Examples
///
/// ```
/// use upload_presign::StoreCredentials;
///
/// let creds = StoreCredentials::new(
///     "https://s3.example.com",
///     "AKIA_TEST",
///     "secret123",
///     "photos",
///     "us-east-1",
/// )
/// .unwrap();
/// assert_eq!(creds.region(), "us-east-1");
/// assert!(!format!("{creds:?}").contains("secret123"));
/// ```
pub struct StoreCredentials {
    endpoint: Url,
    access_key_id: String,
    secret_access_key: Zeroizing<String>,
    bucket: String,
    region: String,
}

impl StoreCredentials {
    /// Validate and build store credentials.
    ///
    /// `bucket` is the default bucket used by [`StoreCredentials::request`];
    /// it may be empty when every request names its own bucket.
    ///
    /// # Errors
    ///
    /// Returns [`SignError::InvalidConfiguration`] if the endpoint is not an
    /// absolute `http`/`https` URL with a host, or if the access key ID,
    /// secret access key or region is empty.
    pub fn new(
        endpoint: &str,
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        bucket: impl Into<String>,
        region: impl Into<String>,
    ) -> SignResult<Self> {
        let endpoint = parse_endpoint(endpoint)?;
        let access_key_id = access_key_id.into();
        let secret_access_key = Zeroizing::new(secret_access_key.into());
        let region = region.into();

        if access_key_id.trim().is_empty() {
            return Err(SignError::InvalidConfiguration(
                "access key ID must not be empty".to_owned(),
            ));
        }
        if secret_access_key.trim().is_empty() {
            return Err(SignError::InvalidConfiguration(
                "secret access key must not be empty".to_owned(),
            ));
        }
        if region.trim().is_empty() {
            return Err(SignError::InvalidConfiguration(
                "region must not be empty".to_owned(),
            ));
        }

        Ok(Self {
            endpoint,
            access_key_id,
            secret_access_key,
            bucket: bucket.into(),
            region,
        })
    }

    /// The parsed store endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// The access key ID.
    #[must_use]
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    /// The default bucket.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// The signing region.
    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }

    pub(crate) fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }

    /// Start a [`SignRequest`] for `key` in the default bucket.
    #[must_use]
    pub fn request(&self, key: impl Into<String>) -> SignRequest {
        SignRequest::new(self.bucket.clone(), key)
    }
}

impl fmt::Debug for StoreCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreCredentials")
            .field("endpoint", &self.endpoint.as_str())
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .finish()
    }
}

/// Deserialization helper; validation happens in [`StoreCredentials::new`].
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoreCredentialsSerde {
    endpoint: String,
    access_key_id: String,
    secret_access_key: String,
    #[serde(default)]
    bucket: String,
    region: String,
}

impl<'de> Deserialize<'de> for StoreCredentials {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let helper = StoreCredentialsSerde::deserialize(deserializer)?;
        StoreCredentials::new(
            &helper.endpoint,
            helper.access_key_id,
            helper.secret_access_key,
            helper.bucket,
            helper.region,
        )
        .map_err(serde::de::Error::custom)
    }
}

fn parse_endpoint(endpoint: &str) -> SignResult<Url> {
    let url = Url::parse(endpoint)
        .map_err(|e| SignError::InvalidConfiguration(format!("invalid endpoint {endpoint}: {e}")))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(SignError::InvalidConfiguration(format!(
            "unsupported endpoint scheme: {}",
            url.scheme()
        )));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(SignError::InvalidConfiguration(format!(
            "endpoint has no host: {endpoint}"
        )));
    }

    Ok(url)
}
