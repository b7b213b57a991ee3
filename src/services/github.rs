// src/services/github.rs

//! Listings snapshot fetched through the GitHub REST API.
//!
//! The listings file is larger than the contents endpoint will inline, so
//! the fetch is two requests: resolve the file's blob sha, then download the
//! blob and decode its base64 body. Both stay on `api.github.com`, which
//! keeps the request authenticated and under the higher API rate limit.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::{Snapshot, SourceConfig};
use crate::utils::http::body_excerpt;

use super::{SnapshotSource, decode_feed};

const ACCEPT: &str = "application/vnd.github.v3+json";

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct BlobResponse {
    content: String,
    #[serde(default)]
    encoding: String,
}

/// Reads the listings JSON from a GitHub repository.
pub struct GitHubListingSource {
    client: Client,
    api_base: String,
    repository: String,
    path: String,
    token: Option<String>,
}

impl GitHubListingSource {
    pub fn new(client: Client, config: &SourceConfig) -> Self {
        Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            repository: config.repository.clone(),
            path: config.path.trim_start_matches('/').to_string(),
            token: config.token.clone().filter(|t| !t.trim().is_empty()),
        }
    }

    fn contents_url(&self) -> String {
        format!(
            "{}/repos/{}/contents/{}",
            self.api_base, self.repository, self.path
        )
    }

    fn blob_url(&self, sha: &str) -> String {
        format!("{}/repos/{}/git/blobs/{}", self.api_base, self.repository, sha)
    }

    fn request(&self, url: &str) -> RequestBuilder {
        let request = self.client.get(url).header(reqwest::header::ACCEPT, ACCEPT);
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.request(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::fetch(
                self.name(),
                format!("{} returned {}: {}", url, status, body_excerpt(&body, 200)),
            ));
        }
        Ok(response.json().await?)
    }
}

/// Decode a GitHub blob body into the raw file bytes.
///
/// GitHub wraps base64 content at 60 columns; whitespace is stripped first.
fn decode_blob(blob: &BlobResponse) -> Result<Vec<u8>> {
    let bytes = if blob.encoding.is_empty() || blob.encoding == "base64" {
        let compact: String = blob.content.split_whitespace().collect();
        STANDARD.decode(compact)?
    } else if blob.encoding == "utf-8" {
        blob.content.clone().into_bytes()
    } else {
        return Err(AppError::validation(format!(
            "Unsupported blob encoding: {}",
            blob.encoding
        )));
    };
    Ok(bytes)
}

#[async_trait]
impl SnapshotSource for GitHubListingSource {
    fn name(&self) -> &str {
        "github"
    }

    async fn fetch(&self) -> Result<Snapshot> {
        let contents: ContentsResponse = self.get_json(&self.contents_url()).await?;
        log::debug!("Listings blob sha for {}: {}", self.path, contents.sha);

        let blob: BlobResponse = self.get_json(&self.blob_url(&contents.sha)).await?;
        let bytes = decode_blob(&blob).map_err(|e| AppError::fetch(self.name(), e))?;
        let snapshot = decode_feed(self.name(), &bytes)?;

        log::info!(
            "Fetched {} postings from {}/{}",
            snapshot.len(),
            self.repository,
            self.path
        );
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> GitHubListingSource {
        let config = SourceConfig {
            api_base: "https://api.github.com/".to_string(),
            ..SourceConfig::default()
        };
        GitHubListingSource::new(Client::new(), &config)
    }

    #[test]
    fn test_urls() {
        let src = source();
        assert_eq!(
            src.contents_url(),
            "https://api.github.com/repos/SimplifyJobs/Summer2025-Internships/contents/.github/scripts/listings.json"
        );
        assert_eq!(
            src.blob_url("abc123"),
            "https://api.github.com/repos/SimplifyJobs/Summer2025-Internships/git/blobs/abc123"
        );
    }

    #[test]
    fn test_empty_token_ignored() {
        let config = SourceConfig {
            token: Some("  ".to_string()),
            ..SourceConfig::default()
        };
        let src = GitHubListingSource::new(Client::new(), &config);
        assert!(src.token.is_none());
    }

    #[test]
    fn test_decode_wrapped_base64() {
        let json = r#"[{"id":"a","active":true,"title":"Intern"},{"id":"b","active":false}]"#;
        let encoded = STANDARD.encode(json);
        // Mimic GitHub's line wrapping.
        let wrapped = encoded
            .as_bytes()
            .chunks(20)
            .map(|c| std::str::from_utf8(c).unwrap())
            .collect::<Vec<_>>()
            .join("\n");

        let blob = BlobResponse {
            content: wrapped,
            encoding: "base64".to_string(),
        };
        let bytes = decode_blob(&blob).unwrap();
        let snapshot = decode_feed("github", &bytes).unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.postings()[0].title, "Intern");
        assert!(!snapshot.postings()[1].active);
    }

    #[test]
    fn test_decode_rejects_unknown_encoding() {
        let blob = BlobResponse {
            content: "[]".to_string(),
            encoding: "rot13".to_string(),
        };
        assert!(decode_blob(&blob).is_err());
    }
}
