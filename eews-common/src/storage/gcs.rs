//! Google Cloud Storage client (JSON API v1)

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;

use super::{ObjectStore, StorageError};
use crate::auth;

const GCS_BASE_URL: &str = "https://storage.googleapis.com";
const USER_AGENT: &str = "eews-pipeline/0.1.0";
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Object listing page
#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    items: Vec<ObjectMeta>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ObjectMeta {
    name: String,
}

/// Cloud Storage client bound to one bucket
pub struct GcsClient {
    http_client: reqwest::Client,
    bucket: String,
    access_token: String,
}

impl GcsClient {
    pub fn new(bucket: impl Into<String>, access_token: impl Into<String>) -> Result<Self, StorageError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| StorageError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            bucket: bucket.into(),
            access_token: access_token.into(),
        })
    }

    /// Build a client using the ambient credentials
    ///
    /// Failure here is the one storage condition that aborts a run.
    pub fn from_environment(bucket: &str) -> crate::Result<Self> {
        let token = auth::resolve_access_token()?;
        Ok(Self::new(bucket, token)?)
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// `.../storage/v1/b/{bucket}/o[/{object}][/...]` with each segment percent-encoded
    fn api_url(&self, upload: bool, segments: &[&str]) -> Result<Url, StorageError> {
        let mut url = Url::parse(GCS_BASE_URL).map_err(|e| StorageError::Parse(e.to_string()))?;
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| StorageError::Parse("base URL cannot carry a path".to_string()))?;
            path.pop_if_empty();
            if upload {
                path.push("upload");
            }
            path.extend(["storage", "v1", "b", self.bucket.as_str(), "o"]);
            path.extend(segments);
        }
        Ok(url)
    }

    async fn send(&self, request: reqwest::RequestBuilder, path: &str) -> Result<reqwest::Response, StorageError> {
        let response = request
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| StorageError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::UNAUTHORIZED {
            return Err(StorageError::Unauthorized);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound(path.to_string()));
        }
        let error_text = response.text().await.unwrap_or_default();
        Err(StorageError::Api(status.as_u16(), error_text))
    }
}

#[async_trait]
impl ObjectStore for GcsClient {
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let url = self.api_url(false, &[])?;
        let mut names = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![("prefix", prefix.to_string())];
            if let Some(token) = &page_token {
                query.push(("pageToken", token.clone()));
            }

            tracing::debug!(bucket = %self.bucket, prefix = %prefix, "Listing objects");
            let response = self
                .send(self.http_client.get(url.clone()).query(&query), prefix)
                .await?;
            let page: ListResponse = response
                .json()
                .await
                .map_err(|e| StorageError::Parse(e.to_string()))?;

            names.extend(page.items.into_iter().map(|o| o.name));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(names)
    }

    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        let url = self.api_url(false, &[path])?;
        match self.send(self.http_client.get(url), path).await {
            Ok(_) => Ok(true),
            Err(StorageError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn download(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let url = self.api_url(false, &[path])?;
        tracing::debug!(object = %path, "Downloading object");
        let response = self
            .send(self.http_client.get(url).query(&[("alt", "media")]), path)
            .await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| StorageError::Network(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StorageError> {
        let url = self.api_url(true, &[])?;
        tracing::debug!(object = %path, size = bytes.len(), content_type = %content_type, "Uploading object");
        self.send(
            self.http_client
                .post(url)
                .query(&[("uploadType", "media"), ("name", path)])
                .header(reqwest::header::CONTENT_TYPE, content_type)
                .body(bytes),
            path,
        )
        .await?;
        Ok(())
    }

    async fn copy(&self, from: &str, to: &str) -> Result<(), StorageError> {
        let url = self.api_url(false, &[from, "copyTo", "b", self.bucket.as_str(), "o", to])?;
        tracing::debug!(from = %from, to = %to, "Copying object");
        self.send(self.http_client.post(url).body(Vec::new()), from)
            .await?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        let url = self.api_url(false, &[path])?;
        tracing::debug!(object = %path, "Deleting object");
        self.send(self.http_client.delete(url), path).await?;
        Ok(())
    }

    fn uri(&self, path: &str) -> String {
        format!("gs://{}/{}", self.bucket, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GcsClient {
        GcsClient::new("turkey_tweets_0", "token").unwrap()
    }

    #[test]
    fn test_object_url_encodes_name() {
        let url = client()
            .api_url(false, &["EXAMPLES/Screenshot 2025-04-24 at 9.58.23 PM.png"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://storage.googleapis.com/storage/v1/b/turkey_tweets_0/o/\
             EXAMPLES%2FScreenshot%202025-04-24%20at%209.58.23%20PM.png"
        );
    }

    #[test]
    fn test_upload_url() {
        let url = client().api_url(true, &[]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://storage.googleapis.com/upload/storage/v1/b/turkey_tweets_0/o"
        );
    }

    #[test]
    fn test_copy_url() {
        let url = client()
            .api_url(false, &["INPUTS_1/a.png", "copyTo", "b", "turkey_tweets_0", "o", "DELETED_FILES/a.png"])
            .unwrap();
        assert!(url
            .as_str()
            .ends_with("/o/INPUTS_1%2Fa.png/copyTo/b/turkey_tweets_0/o/DELETED_FILES%2Fa.png"));
    }

    #[test]
    fn test_uri() {
        assert_eq!(client().uri("INPUTS_2/b.png"), "gs://turkey_tweets_0/INPUTS_2/b.png");
    }

    #[test]
    fn test_list_response_without_items() {
        let page: ListResponse = serde_json::from_str(r#"{"kind": "storage#objects"}"#).unwrap();
        assert!(page.items.is_empty());
        assert!(page.next_page_token.is_none());
    }
}
