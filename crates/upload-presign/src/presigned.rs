//! Presigned upload URL generation.
//!
//! A presigned URL carries its authentication in the query string:
//!
//! - `X-Amz-Algorithm` - always `AWS4-HMAC-SHA256`
//! - `X-Amz-Credential` - `AKID/date/region/s3/aws4_request`
//! - `X-Amz-Date` - ISO 8601 basic timestamp (`YYYYMMDDTHHMMSSZ`)
//! - `X-Amz-Expires` - validity in seconds
//! - `X-Amz-SignedHeaders` - `cache-control;host`
//! - `X-Amz-Signature` - lowercase hex HMAC-SHA256, appended last
//!
//! The signed method is always `PUT` and the payload is never hashed.
//! [`sign`] reads no clock: the request timestamp is part of its input.

use chrono::{DateTime, SubsecRound, TimeDelta, TimeZone, Utc};
use http::Method;
use tracing::{debug, warn};
use url::Url;

use crate::canonical::{
    CanonicalHeaders, build_canonical_query_string, build_canonical_request, encode_path,
    uri_encode,
};
use crate::credentials::StoreCredentials;
use crate::error::{SignError, SignResult};
use crate::sigv4::{
    ALGORITHM, SERVICE, build_string_to_sign, compute_signature, credential_scope,
    derive_signing_key, format_amz_date, format_scope_date, hash_payload,
};

/// Link lifetime used when a request does not set one.
pub const DEFAULT_LINK_EXPIRY: u64 = 3600;

/// Longest lifetime AWS S3 accepts for a presigned URL (7 days).
pub const AWS_MAX_LINK_EXPIRY: u64 = 604_800;

/// Parameters for one presigned upload.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use upload_presign::SignRequest;
///
/// let request = SignRequest::new("photos", "avatar.jpg")
///     .with_datetime(Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap())
///     .with_expiry(900);
/// assert_eq!(request.link_expiry(), 900);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignRequest {
    bucket: String,
    key: String,
    request_datetime: DateTime<Utc>,
    link_expiry: u64,
}

impl SignRequest {
    /// Create a request for `key` in `bucket`, stamped with the current time
    /// and the default expiry.
    #[must_use]
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            request_datetime: Utc::now(),
            link_expiry: DEFAULT_LINK_EXPIRY,
        }
    }

    /// Pin the signing time. Any timezone is accepted and converted to UTC.
    #[must_use]
    pub fn with_datetime<Tz: TimeZone>(mut self, at: DateTime<Tz>) -> Self {
        self.request_datetime = at.with_timezone(&Utc);
        self
    }

    /// Set the link lifetime in seconds.
    #[must_use]
    pub fn with_expiry(mut self, seconds: u64) -> Self {
        self.link_expiry = seconds;
        self
    }

    /// Target bucket.
    #[must_use]
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Object key within the bucket.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Signing time.
    #[must_use]
    pub fn request_datetime(&self) -> DateTime<Utc> {
        self.request_datetime
    }

    /// Link lifetime in seconds.
    #[must_use]
    pub fn link_expiry(&self) -> u64 {
        self.link_expiry
    }
}

/// The outcome of a successful signing call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedUrlResult {
    /// Full URL to `PUT` against, including the signature.
    pub signed: String,
    /// Public object URL without any query string.
    pub url: String,
    /// Instant after which the store rejects `signed`.
    pub expires_at: DateTime<Utc>,
    /// Headers the uploader must send, with exactly these values.
    pub headers: CanonicalHeaders,
}

impl SignedUrlResult {
    /// The `(name, value)` pairs the `PUT` must carry.
    #[must_use]
    pub fn headers(&self) -> Vec<(&str, &str)> {
        self.headers.as_pairs()
    }
}

/// Produce a presigned `PUT` URL for `request` using `credentials`.
///
/// # Errors
///
/// Returns [`SignError::MissingParameter`] if the bucket or key is empty,
/// [`SignError::InvalidParameter`] if the expiry is zero or the bucket or key
/// holds a `.`/`..` path segment, and [`SignError::InvalidConfiguration`] if
/// the object URL cannot be assembled from the endpoint.
///
/// A lifetime too large to represent as a timestamp is still signed; its
/// `expires_at` saturates at `DateTime::<Utc>::MAX_UTC`.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use upload_presign::{SignRequest, StoreCredentials, sign};
///
/// let creds = StoreCredentials::new(
///     "https://s3.example.com",
///     "AKIA_TEST",
///     "secret123",
///     "photos",
///     "us-east-1",
/// )
/// .unwrap();
/// let request = SignRequest::new("photos", "avatar.jpg")
///     .with_datetime(Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap());
///
/// let result = sign(&creds, &request).unwrap();
/// assert_eq!(result.url, "https://s3.example.com/photos/avatar.jpg");
/// assert!(result.signed.starts_with(&format!("{}?", result.url)));
/// ```
pub fn sign(credentials: &StoreCredentials, request: &SignRequest) -> SignResult<SignedUrlResult> {
    if request.bucket.is_empty() {
        return Err(SignError::MissingParameter("bucket"));
    }
    if request.key.is_empty() {
        return Err(SignError::MissingParameter("key"));
    }
    if request.link_expiry == 0 {
        return Err(SignError::InvalidParameter {
            name: "link_expiry",
            reason: "must be a positive number of seconds".to_owned(),
        });
    }
    if request.link_expiry > AWS_MAX_LINK_EXPIRY {
        warn!(
            link_expiry = request.link_expiry,
            max = AWS_MAX_LINK_EXPIRY,
            "presigned URL lifetime exceeds the AWS S3 limit"
        );
    }

    let at = request.request_datetime.trunc_subsecs(0);
    let expires_at = expiry_instant(at, request.link_expiry);

    let object = object_url(credentials.endpoint(), &request.bucket, &request.key)?;
    let headers = CanonicalHeaders::upload(host_header(&object)?);

    let timestamp = format_amz_date(&at);
    let date = format_scope_date(&at);
    let scope = credential_scope(&date, credentials.region(), SERVICE);
    let query = build_presign_query(
        credentials.access_key_id(),
        &scope,
        &timestamp,
        request.link_expiry,
        &headers.signed_headers(),
    );

    let mut unsigned = object.clone();
    unsigned.set_query(Some(&query));

    let canonical_request = build_canonical_request(
        Method::PUT.as_str(),
        unsigned.path(),
        unsigned.query().unwrap_or_default(),
        &headers.as_pairs(),
    );

    debug!(
        access_key_id = %credentials.access_key_id(),
        region = %credentials.region(),
        bucket = %request.bucket,
        key = %request.key,
        canonical_request,
        "Built presigned canonical request"
    );

    let canonical_hash = hash_payload(canonical_request.as_bytes());
    let string_to_sign = build_string_to_sign(&timestamp, &scope, &canonical_hash);

    debug!(string_to_sign, "Built presigned string to sign");

    let signature = {
        let signing_key = derive_signing_key(
            credentials.secret_access_key(),
            &date,
            credentials.region(),
            SERVICE,
        );
        compute_signature(&signing_key, &string_to_sign)
    };

    let signed = format!("{unsigned}&X-Amz-Signature={signature}");

    Ok(SignedUrlResult {
        signed,
        url: object.to_string(),
        expires_at,
        headers,
    })
}

/// Build the canonical, encoded presign query string (without the signature).
///
/// # Examples
///
/// ```
/// use upload_presign::presigned::build_presign_query;
///
/// let query = build_presign_query(
///     "AKIA_TEST",
///     "20240115/us-east-1/s3/aws4_request",
///     "20240115T120000Z",
///     3600,
///     "cache-control;host",
/// );
/// assert!(query.starts_with("X-Amz-Algorithm=AWS4-HMAC-SHA256&X-Amz-Credential=AKIA_TEST%2F"));
/// ```
#[must_use]
pub fn build_presign_query(
    access_key_id: &str,
    scope: &str,
    timestamp: &str,
    link_expiry: u64,
    signed_headers: &str,
) -> String {
    let credential = format!("{access_key_id}/{scope}");
    let expires = link_expiry.to_string();

    build_canonical_query_string(&[
        ("X-Amz-Algorithm", ALGORITHM),
        ("X-Amz-Credential", credential.as_str()),
        ("X-Amz-Date", timestamp),
        ("X-Amz-Expires", expires.as_str()),
        ("X-Amz-SignedHeaders", signed_headers),
    ])
}

/// Resolve `<bucket>/<key>` against the endpoint.
///
/// Resolution follows RFC 3986 reference merging: an endpoint path ending in
/// `/` is kept as a prefix, otherwise its last segment is replaced. Bucket and
/// key are percent-encoded first, so `?` and `#` in keys stay in the path.
///
/// # Errors
///
/// Returns [`SignError::InvalidParameter`] if the bucket is `.` or `..`, or a
/// key segment is, and [`SignError::InvalidConfiguration`] if the endpoint
/// cannot serve as a base URL.
pub fn object_url(endpoint: &Url, bucket: &str, key: &str) -> SignResult<Url> {
    reject_dot_segments("bucket", std::iter::once(bucket))?;
    reject_dot_segments("key", key.split('/'))?;

    let relative = format!("{}/{}", uri_encode(bucket), encode_path(key));
    let mut url = endpoint.join(&relative).map_err(|e| {
        SignError::InvalidConfiguration(format!("cannot resolve object URL: {e}"))
    })?;
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

/// The `Host` header value for `url`.
///
/// The port is included only when it differs from the scheme default
/// (80 for `http`, 443 for `https`).
///
/// # Errors
///
/// Returns [`SignError::InvalidConfiguration`] if the URL has no host.
pub fn host_header(url: &Url) -> SignResult<String> {
    let host = url
        .host_str()
        .ok_or_else(|| SignError::InvalidConfiguration("URL missing host".to_owned()))?;

    Ok(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_owned(),
    })
}

/// `at + link_expiry`, saturating at the latest representable instant.
fn expiry_instant(at: DateTime<Utc>, link_expiry: u64) -> DateTime<Utc> {
    i64::try_from(link_expiry)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .and_then(|delta| at.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Reject `.` and `..` segments: URL resolution would collapse them and sign
/// a different path than the one requested.
fn reject_dot_segments<'a>(
    name: &'static str,
    mut segments: impl Iterator<Item = &'a str>,
) -> SignResult<()> {
    if segments.any(|segment| segment == "." || segment == "..") {
        return Err(SignError::InvalidParameter {
            name,
            reason: "must not contain `.` or `..` path segments".to_owned(),
        });
    }
    Ok(())
}
