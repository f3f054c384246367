//! Canonical request construction for AWS Signature Version 4.
//!
//! The canonical request is the newline-joined string:
//!
//! ```text
//! HTTPRequestMethod\n
//! CanonicalURI\n
//! CanonicalQueryString\n
//! CanonicalHeaders\n\n
//! SignedHeaders\n
//! HashedPayload
//! ```
//!
//! Presigned uploads never hash the body, so the payload line is always
//! [`UNSIGNED_PAYLOAD`]. The query string handed to [`build_canonical_request`]
//! must already be canonical (see [`build_canonical_query_string`]); it is
//! inserted verbatim.

use http::header::{CACHE_CONTROL, HOST};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Payload marker used in place of a body hash.
pub const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

/// `Cache-Control` value every presigned upload is signed with.
pub const UPLOAD_CACHE_CONTROL: &str = "max-age=31536000";

/// Characters left unencoded: the RFC 3986 unreserved set
/// (A-Z, a-z, 0-9, `-`, `_`, `.`, `~`).
const URI_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// The ordered set of headers bound into a presigned upload signature.
///
/// Entries are kept sorted by lowercase name, so iteration order is the
/// canonical order.
///
/// # Examples
///
/// ```
/// use upload_presign::canonical::CanonicalHeaders;
///
/// let headers = CanonicalHeaders::upload("s3.example.com");
/// assert_eq!(headers.signed_headers(), "cache-control;host");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalHeaders {
    entries: Vec<(String, String)>,
}

impl CanonicalHeaders {
    /// The fixed header set for an upload: `Cache-Control` and `Host`.
    #[must_use]
    pub fn upload(host: impl Into<String>) -> Self {
        let host: String = host.into();
        Self::from_pairs([
            (HOST.as_str(), host),
            (CACHE_CONTROL.as_str(), UPLOAD_CACHE_CONTROL.to_owned()),
        ])
    }

    fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, String)>) -> Self {
        let mut entries: Vec<(String, String)> = pairs
            .into_iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Self { entries }
    }

    /// Iterate over `(name, value)` pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Look up a header value by (lowercase) name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
    }

    /// The `X-Amz-SignedHeaders` value for this set.
    #[must_use]
    pub fn signed_headers(&self) -> String {
        let names: Vec<&str> = self.iter().map(|(name, _)| name).collect();
        build_signed_headers_string(&names)
    }

    /// Collect the entries as borrowed `(name, value)` pairs.
    #[must_use]
    pub fn as_pairs(&self) -> Vec<(&str, &str)> {
        self.iter().collect()
    }
}

/// Build the full canonical request string from its components.
///
/// `path` and `query` are used as given. Header names are lowercased and
/// sorted, values are trimmed of surrounding whitespace.
///
/// # Examples
///
/// ```
/// use upload_presign::canonical::build_canonical_request;
///
/// let canonical = build_canonical_request(
///     "put",
///     "/photos/avatar.jpg",
///     "X-Amz-Expires=3600",
///     &[("Host", "s3.example.com"), ("cache-control", " max-age=31536000 ")],
/// );
/// assert!(canonical.starts_with("PUT\n/photos/avatar.jpg\nX-Amz-Expires=3600\n"));
/// assert!(canonical.ends_with("\n\ncache-control;host\nUNSIGNED-PAYLOAD"));
/// ```
#[must_use]
pub fn build_canonical_request(
    method: &str,
    path: &str,
    query: &str,
    headers: &[(&str, &str)],
) -> String {
    let method = method.to_ascii_uppercase();
    let canonical_headers = build_canonical_headers(headers);
    let names: Vec<&str> = headers.iter().map(|(name, _)| *name).collect();
    let signed_headers = build_signed_headers_string(&names);

    format!(
        "{method}\n{path}\n{query}\n{canonical_headers}\n\n{signed_headers}\n{UNSIGNED_PAYLOAD}"
    )
}

/// Build the canonical header lines, one `name:value` per header.
///
/// The result has no trailing newline; [`build_canonical_request`] adds the
/// blank separator line itself.
#[must_use]
pub fn build_canonical_headers(headers: &[(&str, &str)]) -> String {
    let mut lines: Vec<(String, &str)> = headers
        .iter()
        .map(|(name, value)| (name.to_ascii_lowercase(), value.trim()))
        .collect();
    lines.sort_by(|a, b| a.0.cmp(&b.0));

    lines
        .iter()
        .map(|(name, value)| format!("{name}:{value}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the signed headers string: lowercase names, sorted, `;`-joined.
///
/// # Examples
///
/// ```
/// use upload_presign::canonical::build_signed_headers_string;
///
/// assert_eq!(build_signed_headers_string(&["Host", "cache-control"]), "cache-control;host");
/// ```
#[must_use]
pub fn build_signed_headers_string(names: &[&str]) -> String {
    let mut sorted: Vec<String> = names.iter().map(|n| n.to_ascii_lowercase()).collect();
    sorted.sort_unstable();
    sorted.join(";")
}

/// Encode `(key, value)` pairs into a canonical query string.
///
/// Keys and values are percent-encoded with the unreserved set, then the pairs
/// are sorted by encoded key (and by value for duplicate keys).
///
/// # Examples
///
/// ```
/// use upload_presign::canonical::build_canonical_query_string;
///
/// assert_eq!(
///     build_canonical_query_string(&[("b", "x/y"), ("a", "1")]),
///     "a=1&b=x%2Fy"
/// );
/// ```
#[must_use]
pub fn build_canonical_query_string(params: &[(&str, &str)]) -> String {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (uri_encode(k), uri_encode(v)))
        .collect();
    encoded.sort_unstable();

    encoded
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Percent-encode an object path, leaving `/` separators intact.
///
/// # Examples
///
/// ```
/// use upload_presign::canonical::encode_path;
///
/// assert_eq!(encode_path("2024/my photo.jpg"), "2024/my%20photo.jpg");
/// ```
#[must_use]
pub fn encode_path(path: &str) -> String {
    path.split('/').map(uri_encode).collect::<Vec<_>>().join("/")
}

/// URI-encode a single component using the SigV4 encoding rules.
#[must_use]
pub fn uri_encode(input: &str) -> String {
    utf8_percent_encode(input, URI_ENCODE_SET).to_string()
}
