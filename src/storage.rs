//! Object storage for uploaded videos.
//!
//! Production uses the hosted storage REST API with the service role key;
//! tests swap in an in-memory implementation.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Storage error ({status}): {message}")]
    Api { status: u16, message: String },
}

#[async_trait]
pub trait ObjectStorage: Send + Sync + 'static {
    /// Upload bytes at `path`; fails if the object already exists
    async fn upload(&self, path: &str, data: Bytes, content_type: &str)
    -> Result<String, StorageError>;

    async fn download(&self, path: &str) -> Result<Bytes, StorageError>;

    async fn remove(&self, paths: &[String]) -> Result<(), StorageError>;

    fn public_url(&self, path: &str) -> String;
}

pub struct SupabaseStorage {
    base_url: String,
    bucket: String,
    service_key: String,
    http: Client,
}

impl SupabaseStorage {
    pub fn new(base_url: &str, bucket: &str, service_key: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            bucket: bucket.to_string(),
            service_key: service_key.to_string(),
            http: Client::new(),
        }
    }

    fn object_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url,
            encode_segment(&self.bucket),
            encode_path(path)
        )
    }

    async fn api_error(resp: reqwest::Response) -> StorageError {
        let status = resp.status().as_u16();
        let text = resp.text().await.unwrap_or_default();
        let message = serde_json::from_str::<StorageErrorBody>(&text)
            .ok()
            .and_then(|b| b.message.or(b.error))
            .unwrap_or(text);
        StorageError::Api { status, message }
    }
}

#[derive(Deserialize)]
struct StorageErrorBody {
    message: Option<String>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct UploadResponse {
    #[serde(rename = "Key")]
    key: Option<String>,
}

#[async_trait]
impl ObjectStorage for SupabaseStorage {
    async fn upload(
        &self,
        path: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<String, StorageError> {
        let resp = self
            .http
            .post(self.object_url(path))
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .header("Content-Type", content_type)
            .header("Cache-Control", "max-age=3600")
            .header("x-upsert", "false")
            .body(data)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Self::api_error(resp).await);
        }

        // The API answers with "<bucket>/<path>"; callers work with the bucket-relative path
        let body: UploadResponse = resp.json().await?;
        let prefix = format!("{}/", self.bucket);
        Ok(body
            .key
            .and_then(|k| k.strip_prefix(&prefix).map(str::to_string))
            .unwrap_or_else(|| path.to_string()))
    }

    async fn download(&self, path: &str) -> Result<Bytes, StorageError> {
        let resp = self
            .http
            .get(self.object_url(path))
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Self::api_error(resp).await);
        }

        Ok(resp.bytes().await?)
    }

    async fn remove(&self, paths: &[String]) -> Result<(), StorageError> {
        let url = format!(
            "{}/storage/v1/object/{}",
            self.base_url,
            encode_segment(&self.bucket)
        );
        let resp = self
            .http
            .delete(url)
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .json(&serde_json::json!({ "prefixes": paths }))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Self::api_error(resp).await);
        }
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url,
            encode_segment(&self.bucket),
            encode_path(path)
        )
    }
}

fn encode_segment(s: &str) -> String {
    percent_encoding::utf8_percent_encode(s, percent_encoding::NON_ALPHANUMERIC).to_string()
}

/// Percent-encode each path segment, keeping the separators
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(encode_segment)
        .collect::<Vec<_>>()
        .join("/")
}

/// Best-guess MIME type for a stored video, from its extension
pub fn content_type_for_path(path: &str) -> &'static str {
    let ext = path
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mov" => "video/quicktime",
        "webm" => "video/webm",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",
        "flv" => "video/x-flv",
        "wmv" => "video/x-ms-wmv",
        _ => "video/*",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_url_keeps_path_separators() {
        let storage = SupabaseStorage::new("https://proj.supabase.co/", "FreeBucket", "key");
        assert_eq!(
            storage.public_url("0b7f/1700000000000-abc.mp4"),
            "https://proj.supabase.co/storage/v1/object/public/FreeBucket/0b7f/1700000000000%2Dabc%2Emp4"
        );
    }

    #[test]
    fn content_type_from_extension() {
        assert_eq!(content_type_for_path("u/clip.MOV"), "video/quicktime");
        assert_eq!(content_type_for_path("u/clip.m4v"), "video/mp4");
        assert_eq!(content_type_for_path("u/clip"), "video/*");
    }
}
