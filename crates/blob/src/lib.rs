pub mod memory;
pub mod s3;

use async_trait::async_trait;

#[derive(Debug, Clone)]
pub struct UploadResult {
    pub etag: String,
}

/// S3-compatible object store (§6: "Blob store"). Only the three operations
/// the pipeline needs are exposed — full object listing, versioning, etc are
/// out of scope.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn upload_bytes(&self, key: &str, bytes: &[u8], content_type: &str) -> acontext_domain::Result<UploadResult>;

    async fn delete_by_prefix(&self, prefix: &str) -> acontext_domain::Result<()>;

    async fn presign_get(&self, key: &str, ttl_seconds: u64) -> acontext_domain::Result<String>;
}

/// Strips the surrounding quotes S3 returns on ETags (§4.5.4 step 4).
pub fn strip_etag_quotes(etag: &str) -> String {
    etag.trim_matches('"').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_etag_quotes_removes_surrounding_quotes_only() {
        assert_eq!(strip_etag_quotes("\"abc123\""), "abc123");
        assert_eq!(strip_etag_quotes("abc123"), "abc123");
    }
}
