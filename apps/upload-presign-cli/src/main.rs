//! Upload Presign - print a presigned S3 `PUT` URL for one object.
//!
//! Credentials and endpoint come from the environment; the object key (and
//! optionally bucket, expiry and signing time) come from the command line.
//!
//! # Usage
//!
//! ```text
//! S3_ENDPOINT_URL=https://s3.example.com S3_BUCKET=photos upload-presign avatar.jpg
//! curl -X PUT -H 'Cache-Control: max-age=31536000' --upload-file avatar.jpg '<signed>'
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `S3_ENDPOINT_URL` | `http://localhost:4566` | Object store endpoint |
//! | `AWS_ACCESS_KEY_ID` | `test` | Access key ID |
//! | `AWS_SECRET_ACCESS_KEY` | `test` | Secret access key |
//! | `S3_BUCKET` | *(empty)* | Default bucket |
//! | `AWS_REGION` | `us-east-1` | Signing region |
//! | `PRESIGN_EXPIRY` | `3600` | Default link lifetime in seconds |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

use anyhow::{Context, Result};
use chrono::DateTime;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;
use upload_presign::{SignRequest, SignedUrlResult, SignerConfig, sign};

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "upload-presign", version, about)]
struct Cli {
    /// Object key to authorize the upload for.
    key: String,

    /// Bucket (overrides `S3_BUCKET`).
    #[arg(short, long)]
    bucket: Option<String>,

    /// Link lifetime in seconds (overrides `PRESIGN_EXPIRY`).
    #[arg(short, long)]
    expires: Option<u64>,

    /// Signing time as RFC 3339, for reproducible output. Defaults to now.
    #[arg(long)]
    at: Option<String>,

    /// Print a JSON object instead of plain text.
    #[arg(long)]
    json: bool,
}

/// Initialize the tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

/// Build the [`SignRequest`] from the command line and configured defaults.
fn build_request(cli: &Cli, default_bucket: &str, default_expiry: u64) -> Result<SignRequest> {
    let bucket = cli.bucket.as_deref().unwrap_or(default_bucket);
    let mut request = SignRequest::new(bucket, cli.key.as_str())
        .with_expiry(cli.expires.unwrap_or(default_expiry));

    if let Some(at) = &cli.at {
        let at = DateTime::parse_from_rfc3339(at)
            .with_context(|| format!("invalid --at timestamp: {at}"))?;
        request = request.with_datetime(at);
    }

    Ok(request)
}

fn render_json(result: &SignedUrlResult) -> serde_json::Value {
    let headers: serde_json::Map<String, serde_json::Value> = result
        .headers()
        .into_iter()
        .map(|(name, value)| (name.to_owned(), value.into()))
        .collect();

    serde_json::json!({
        "signed": result.signed,
        "url": result.url,
        "expiresAt": result.expires_at.to_rfc3339(),
        "headers": headers,
    })
}

fn render_text(result: &SignedUrlResult) -> String {
    let mut out = format!(
        "{}\n\nurl: {}\nexpires: {}\n",
        result.signed,
        result.url,
        result.expires_at.to_rfc3339()
    );
    for (name, value) in result.headers() {
        out.push_str(&format!("header: {name}: {value}\n"));
    }
    out
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = SignerConfig::from_env();

    init_tracing(&config.log_level)?;

    let request = build_request(&cli, &config.bucket, config.default_expiry)?;

    info!(
        endpoint = %config.endpoint,
        bucket = %request.bucket(),
        key = %request.key(),
        expiry = request.link_expiry(),
        "signing upload URL"
    );

    let credentials = config
        .into_credentials()
        .context("invalid signer configuration")?;
    let result = sign(&credentials, &request).context("failed to sign upload URL")?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&render_json(&result))?);
    } else {
        print!("{}", render_text(&result));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("upload-presign").chain(args.iter().copied()))
    }

    #[test]
    fn test_should_use_configured_defaults() {
        let request = build_request(&cli(&["avatar.jpg"]), "photos", 1200).unwrap();
        assert_eq!(request.bucket(), "photos");
        assert_eq!(request.key(), "avatar.jpg");
        assert_eq!(request.link_expiry(), 1200);
    }

    #[test]
    fn test_should_let_flags_override_defaults() {
        let args = cli(&[
            "avatar.jpg",
            "--bucket",
            "media",
            "--expires",
            "900",
            "--at",
            "2024-01-15T12:00:00Z",
        ]);
        let request = build_request(&args, "photos", 3600).unwrap();
        assert_eq!(request.bucket(), "media");
        assert_eq!(request.link_expiry(), 900);
        assert_eq!(
            request.request_datetime().to_rfc3339(),
            "2024-01-15T12:00:00+00:00"
        );
    }

    #[test]
    fn test_should_reject_malformed_timestamp() {
        let args = cli(&["avatar.jpg", "--at", "yesterday"]);
        assert!(build_request(&args, "photos", 3600).is_err());
    }

    #[test]
    fn test_should_render_json_with_headers() {
        let credentials = SignerConfig::builder()
            .endpoint("https://s3.example.com".into())
            .build()
            .into_credentials()
            .unwrap();
        let request = build_request(
            &cli(&["avatar.jpg", "--at", "2024-01-15T12:00:00Z"]),
            "photos",
            3600,
        )
        .unwrap();
        let result = sign(&credentials, &request).unwrap();

        let json = render_json(&result);
        assert_eq!(json["url"], "https://s3.example.com/photos/avatar.jpg");
        assert_eq!(json["expiresAt"], "2024-01-15T13:00:00+00:00");
        assert_eq!(json["headers"]["cache-control"], "max-age=31536000");
        assert_eq!(json["headers"]["host"], "s3.example.com");

        let text = render_text(&result);
        assert!(text.starts_with(&result.signed));
        assert!(text.contains("header: host: s3.example.com\n"));
    }
}
