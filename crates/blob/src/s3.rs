use async_trait::async_trait;
use aws_sdk_s3::config::{Credentials, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;

use crate::{strip_etag_quotes, BlobStore, UploadResult};

pub struct S3BlobStore {
    client: Client,
    bucket: String,
}

impl S3BlobStore {
    pub async fn new(bucket: impl Into<String>, endpoint: Option<&str>) -> Self {
        let mut loader = aws_config::from_env();
        if let Some(endpoint) = endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        let shared = loader.load().await;
        let client = Client::new(&shared);
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Constructor for fixed-credential/non-IAM deployments (the common case
    /// for self-hosted MinIO-style endpoints).
    pub fn with_static_credentials(
        bucket: impl Into<String>,
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
    ) -> Self {
        let creds = Credentials::new(access_key, secret_key, None, None, "acontext-static");
        let config = aws_sdk_s3::Config::builder()
            .region(Region::new(region.to_string()))
            .endpoint_url(endpoint)
            .credentials_provider(creds)
            .force_path_style(true)
            .behavior_version(aws_sdk_s3::config::BehaviorVersion::latest())
            .build();
        Self {
            client: Client::from_conf(config),
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn upload_bytes(&self, key: &str, bytes: &[u8], content_type: &str) -> acontext_domain::Result<UploadResult> {
        let output = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes.to_vec()))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| acontext_domain::Error::Transient(format!("s3 put_object: {e}")))?;
        let etag = output.e_tag().unwrap_or_default();
        Ok(UploadResult {
            etag: strip_etag_quotes(etag),
        })
    }

    async fn delete_by_prefix(&self, prefix: &str) -> acontext_domain::Result<()> {
        let listed = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .send()
            .await
            .map_err(|e| acontext_domain::Error::Transient(format!("s3 list_objects_v2: {e}")))?;
        for obj in listed.contents() {
            if let Some(key) = obj.key() {
                self.client
                    .delete_object()
                    .bucket(&self.bucket)
                    .key(key)
                    .send()
                    .await
                    .map_err(|e| acontext_domain::Error::Transient(format!("s3 delete_object: {e}")))?;
            }
        }
        Ok(())
    }

    async fn presign_get(&self, key: &str, ttl_seconds: u64) -> acontext_domain::Result<String> {
        let presign_config = PresigningConfig::expires_in(std::time::Duration::from_secs(ttl_seconds))
            .map_err(|e| acontext_domain::Error::Validation(format!("presign config: {e}")))?;
        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presign_config)
            .await
            .map_err(|e| acontext_domain::Error::Transient(format!("s3 presign: {e}")))?;
        Ok(presigned.uri().to_string())
    }
}
