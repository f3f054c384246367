//! AWS Signature Version 4 primitives.
//!
//! Signing runs in three steps once the canonical request exists:
//!
//! 1. Build the string to sign from the timestamp, the credential scope and the
//!    hex SHA-256 of the canonical request.
//! 2. Derive the signing key with the HMAC-SHA256 chain
//!    `secret -> date -> region -> service -> "aws4_request"`.
//! 3. HMAC the string to sign with that key and hex-encode the result.

use std::fmt;

use chrono::{DateTime, Utc};
use hmac::{Hmac, KeyInit, Mac};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

/// The only signing algorithm produced by this crate.
pub const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Service name bound into every credential scope.
pub const SERVICE: &str = "s3";

/// Terminal component of every credential scope.
const SCOPE_TERMINATOR: &str = "aws4_request";

type HmacSha256 = Hmac<Sha256>;

/// A derived SigV4 signing key, scoped to one date, region and service.
///
/// The key material is wiped when the value is dropped.
#[derive(Clone)]
pub struct SigningKey(Zeroizing<Vec<u8>>);

impl SigningKey {
    /// Raw key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningKey(<redacted>)")
    }
}

/// Format a timestamp as ISO 8601 basic (`YYYYMMDDTHHMMSSZ`).
///
/// Sub-second precision is dropped.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use upload_presign::sigv4::format_amz_date;
///
/// let at = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
/// assert_eq!(format_amz_date(&at), "20240115T120000Z");
/// ```
#[must_use]
pub fn format_amz_date(at: &DateTime<Utc>) -> String {
    at.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Format the date component of a credential scope (`YYYYMMDD`).
#[must_use]
pub fn format_scope_date(at: &DateTime<Utc>) -> String {
    at.format("%Y%m%d").to_string()
}

/// Build the credential scope `date/region/service/aws4_request`.
///
/// # Examples
///
/// ```
/// use upload_presign::sigv4::credential_scope;
///
/// assert_eq!(
///     credential_scope("20240115", "us-east-1", "s3"),
///     "20240115/us-east-1/s3/aws4_request"
/// );
/// ```
#[must_use]
pub fn credential_scope(date: &str, region: &str, service: &str) -> String {
    format!("{date}/{region}/{service}/{SCOPE_TERMINATOR}")
}

/// Build the SigV4 string to sign.
///
/// Format:
/// ```text
/// AWS4-HMAC-SHA256\n
/// <ISO8601 timestamp>\n
/// <credential_scope>\n
/// <hex(SHA256(canonical_request))>
/// ```
///
/// # Examples
///
/// ```
/// use upload_presign::sigv4::build_string_to_sign;
///
/// let sts = build_string_to_sign(
///     "20130524T000000Z",
///     "20130524/us-east-1/s3/aws4_request",
///     "7344ae5b7ee6c3e7e6b0fe0640412a37625d1fbfff95c48bbb2dc43964946972",
/// );
/// assert!(sts.starts_with("AWS4-HMAC-SHA256\n20130524T000000Z\n"));
/// ```
#[must_use]
pub fn build_string_to_sign(
    timestamp: &str,
    credential_scope: &str,
    canonical_request_hash: &str,
) -> String {
    format!("{ALGORITHM}\n{timestamp}\n{credential_scope}\n{canonical_request_hash}")
}

/// Derive the SigV4 signing key using the HMAC-SHA256 chain.
///
/// ```text
/// DateKey              = HMAC-SHA256("AWS4" + secret_key, date)
/// DateRegionKey        = HMAC-SHA256(DateKey, region)
/// DateRegionServiceKey = HMAC-SHA256(DateRegionKey, service)
/// SigningKey           = HMAC-SHA256(DateRegionServiceKey, "aws4_request")
/// ```
///
/// # Examples
///
/// ```
/// use upload_presign::sigv4::derive_signing_key;
///
/// let key = derive_signing_key(
///     "wJalrXUtnFEMI/K7MDENG/bPxRfiCYEXAMPLEKEY",
///     "20130524",
///     "us-east-1",
///     "s3",
/// );
/// assert_eq!(key.as_bytes().len(), 32);
/// ```
#[must_use]
pub fn derive_signing_key(secret_key: &str, date: &str, region: &str, service: &str) -> SigningKey {
    let seed = Zeroizing::new(format!("AWS4{secret_key}"));
    let date_key = hmac_sha256(seed.as_bytes(), date.as_bytes());
    let date_region_key = hmac_sha256(&date_key, region.as_bytes());
    let date_region_service_key = hmac_sha256(&date_region_key, service.as_bytes());
    SigningKey(hmac_sha256(
        &date_region_service_key,
        SCOPE_TERMINATOR.as_bytes(),
    ))
}

/// Compute the lowercase hex HMAC-SHA256 signature of `data`.
#[must_use]
pub fn compute_signature(signing_key: &SigningKey, data: &str) -> String {
    let sig = hmac_sha256(signing_key.as_bytes(), data.as_bytes());
    hex::encode(sig.as_slice())
}

/// Compute the SHA-256 hash of `payload` as lowercase hex.
///
/// # Examples
///
/// ```
/// use upload_presign::sigv4::hash_payload;
///
/// assert_eq!(
///     hash_payload(b""),
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
/// );
/// ```
#[must_use]
pub fn hash_payload(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}

/// Compute HMAC-SHA256 into a buffer that is wiped on drop.
fn hmac_sha256(key: &[u8], data: &[u8]) -> Zeroizing<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can accept keys of any length");
    mac.update(data);
    Zeroizing::new(mac.finalize().into_bytes().to_vec())
}
