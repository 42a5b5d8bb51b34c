use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use crate::{BlobStore, UploadResult};

/// In-process `BlobStore` fake for tests. ETags are the hex sha256 of the
/// uploaded bytes, matching the real S3 convention closely enough for tests
/// that check etag-changes-on-content-change.
#[derive(Default)]
pub struct InMemoryBlobStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().get(key).cloned()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn upload_bytes(&self, key: &str, bytes: &[u8], _content_type: &str) -> acontext_domain::Result<UploadResult> {
        let etag = hex::encode(Sha256::digest(bytes));
        self.objects.lock().insert(key.to_string(), bytes.to_vec());
        Ok(UploadResult { etag })
    }

    async fn delete_by_prefix(&self, prefix: &str) -> acontext_domain::Result<()> {
        self.objects.lock().retain(|k, _| !k.starts_with(prefix));
        Ok(())
    }

    async fn presign_get(&self, key: &str, ttl_seconds: u64) -> acontext_domain::Result<String> {
        Ok(format!("memory://{key}?ttl={ttl_seconds}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upload_then_delete_by_prefix_removes_object() {
        let store = InMemoryBlobStore::new();
        store.upload_bytes("disks/p1/2026/01/01/abc.py", b"print(1)", "text/x-python").await.unwrap();
        assert!(store.get("disks/p1/2026/01/01/abc.py").is_some());
        store.delete_by_prefix("disks/p1/").await.unwrap();
        assert!(store.get("disks/p1/2026/01/01/abc.py").is_none());
    }
}
