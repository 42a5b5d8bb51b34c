use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use acontext_blob::BlobStore;
use acontext_domain::entities::AssetMeta;
use acontext_domain::meta::ARTIFACT_INFO_COMPARTMENT;
use acontext_domain::Result;

const TEXT_LIKE_MIMES: &[&str] = &["text/", "application/json", "application/x-yaml", "application/yaml"];

fn mime_for_extension(ext: &str) -> &'static str {
    match ext.to_lowercase().as_str() {
        "md" => "text/markdown",
        "txt" => "text/plain",
        "py" => "text/x-python",
        "js" => "text/javascript",
        "ts" => "text/typescript",
        "json" => "application/json",
        "yaml" | "yml" => "application/x-yaml",
        "csv" => "text/csv",
        "html" => "text/html",
        "sh" => "text/x-shellscript",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "pdf" => "application/pdf",
        _ => "text/plain",
    }
}

fn extension_of(filename: &str) -> String {
    match filename.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => format!(".{ext}"),
        _ => String::new(),
    }
}

fn is_text_mime(mime: &str) -> bool {
    TEXT_LIKE_MIMES.iter().any(|prefix| mime.starts_with(prefix))
}

/// Result of `upload_and_build_artifact_meta` (§4.5.4): the full asset
/// record plus the `__artifact_info__` patch to merge into the artifact's
/// `meta` column.
pub struct UploadedArtifact {
    pub asset_meta: AssetMeta,
    pub artifact_info_patch: serde_json::Value,
}

/// §4.5.4: sha256 the bytes, pick a MIME by extension, build the dated S3
/// key, upload, and package the two meta blocks callers persist. Failures
/// propagate as hard errors — no silent inline fallback, the comment in the
/// original design calls out this exact failure mode as the reintroduction
/// of a "phantom artifact" bug.
pub async fn upload_and_build_artifact_meta(
    blob: &Arc<dyn BlobStore>,
    bucket: &str,
    project_id: Uuid,
    path: &str,
    filename: &str,
    content: &str,
) -> Result<UploadedArtifact> {
    let bytes = content.as_bytes();
    let sha256 = hex::encode(Sha256::digest(bytes));
    let ext = extension_of(filename);
    let mime = mime_for_extension(filename.rsplit_once('.').map(|(_, e)| e).unwrap_or(""));

    let now = Utc::now();
    let s3_key = format!("disks/{project_id}/{}/{sha256}{ext}", now.format("%Y/%m/%d"));

    let uploaded = blob.upload_bytes(&s3_key, bytes, mime).await?;
    let etag = acontext_blob::strip_etag_quotes(&uploaded.etag);

    let asset_meta = AssetMeta {
        bucket: bucket.to_string(),
        s3_key: s3_key.clone(),
        etag,
        sha256,
        mime: mime.to_string(),
        size_b: bytes.len() as u64,
        content: is_text_mime(mime).then(|| content.to_string()),
    };

    let artifact_info_patch = json!({
        ARTIFACT_INFO_COMPARTMENT: {
            "path": path,
            "filename": filename,
            "mime": mime,
            "size": bytes.len(),
        }
    });

    Ok(UploadedArtifact {
        asset_meta,
        artifact_info_patch,
    })
}
