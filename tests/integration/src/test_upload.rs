//! Presigned upload integration tests.

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use reqwest::StatusCode;
    use upload_presign::{SignedUrlResult, sign};

    use crate::{cleanup_bucket, create_test_bucket, s3_client, store_credentials};

    /// `PUT` `body` to a signed URL with the headers the signature was bound to.
    async fn upload(result: &SignedUrlResult, body: &'static [u8]) -> reqwest::Response {
        let mut req = reqwest::Client::new().put(&result.signed).body(body);
        // reqwest derives Host from the URL.
        for (name, value) in result.headers() {
            if name != "host" {
                req = req.header(name, value);
            }
        }
        req.send().await.expect("send presigned PUT")
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_upload_through_presigned_url() {
        let client = s3_client();
        let bucket = create_test_bucket(&client, "presign").await;
        let credentials = store_credentials(&bucket);

        let result = sign(&credentials, &credentials.request("avatars/me.jpg")).expect("sign");
        let resp = upload(&result, b"not really a jpeg").await;
        assert!(
            resp.status().is_success(),
            "presigned PUT failed: {}",
            resp.status()
        );

        let obj = client
            .get_object()
            .bucket(&bucket)
            .key("avatars/me.jpg")
            .send()
            .await
            .expect("get_object");
        assert_eq!(obj.cache_control(), Some("max-age=31536000"));
        let data = obj.body.collect().await.expect("collect body").into_bytes();
        assert_eq!(data.as_ref(), b"not really a jpeg");

        cleanup_bucket(&client, &bucket).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_upload_key_with_special_characters() {
        let client = s3_client();
        let bucket = create_test_bucket(&client, "presign-chars").await;
        let credentials = store_credentials(&bucket);

        let key = "2024/my photo+1.jpg";
        let result = sign(&credentials, &credentials.request(key)).expect("sign");
        let resp = upload(&result, b"x").await;
        assert!(resp.status().is_success(), "status: {}", resp.status());

        let head = client.head_object().bucket(&bucket).key(key).send().await;
        assert!(head.is_ok(), "object should exist under the raw key");

        cleanup_bucket(&client, &bucket).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_mismatched_cache_control() {
        let client = s3_client();
        let bucket = create_test_bucket(&client, "presign-cc").await;
        let credentials = store_credentials(&bucket);

        let result = sign(&credentials, &credentials.request("doc.txt")).expect("sign");
        let resp = reqwest::Client::new()
            .put(&result.signed)
            .header("cache-control", "no-cache")
            .body(&b"payload"[..])
            .send()
            .await
            .expect("send presigned PUT");
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        cleanup_bucket(&client, &bucket).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_tampered_signature() {
        let client = s3_client();
        let bucket = create_test_bucket(&client, "presign-sig").await;
        let credentials = store_credentials(&bucket);

        let mut result = sign(&credentials, &credentials.request("doc.txt")).expect("sign");
        let last = result.signed.pop().expect("non-empty URL");
        result.signed.push(if last == '0' { '1' } else { '0' });

        let resp = upload(&result, b"payload").await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        cleanup_bucket(&client, &bucket).await;
    }

    #[tokio::test]
    #[ignore = "requires running server"]
    async fn test_should_reject_expired_link() {
        let client = s3_client();
        let bucket = create_test_bucket(&client, "presign-exp").await;
        let credentials = store_credentials(&bucket);

        let request = credentials
            .request("late.txt")
            .with_datetime(Utc::now() - Duration::hours(2))
            .with_expiry(60);
        let result = sign(&credentials, &request).expect("sign");
        assert!(result.expires_at < Utc::now());

        let resp = upload(&result, b"too late").await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        cleanup_bucket(&client, &bucket).await;
    }
}
