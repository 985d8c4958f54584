//! Text embeddings for duplicate detection.
use crate::error::{DomainErrorKind, Error, InternalErrorKind};
use async_trait::async_trait;
use log::*;
use serde::{Deserialize, Serialize};
use service::config::Config;
use std::time::Duration;

/// Anything that can turn idea text into an embedding.
///
/// Blank text yields an empty vector, which means "no embedding".
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, Error>;

    /// Length every returned vector must have, when the provider knows it.
    fn dimension(&self) -> Option<usize> {
        None
    }
}

/// Client for an OpenAI-compatible `/embeddings` endpoint.
pub struct EmbeddingClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    dimension: usize,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl EmbeddingClient {
    pub fn new(config: &Config) -> Result<Self, Error> {
        let client = build_client(config)?;

        Ok(Self {
            client,
            base_url: config.embedding_base_url().to_string(),
            model: config.embedding_model().to_string(),
            dimension: config.embedding_dimension,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for EmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, Error> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/embeddings", self.base_url);
        debug!("Requesting embedding from {url} with model {}", self.model);

        let response = self
            .client
            .post(&url)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: [text],
            })
            .send()
            .await
            .map_err(|e| {
                warn!("Failed to send embedding request: {e:?}");
                Error::provider_unavailable(Some(Box::new(e)))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!("Embedding provider answered {status}: {error_text}");
            return Err(Error::provider_unavailable(None));
        }

        let body: EmbeddingResponse = response.json().await.map_err(|e| {
            warn!("Failed to decode embedding response: {e:?}");
            Error::provider_unavailable(Some(Box::new(e)))
        })?;

        body.data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .ok_or_else(|| {
                warn!("Embedding response contained no data");
                Error::provider_unavailable(None)
            })
    }

    fn dimension(&self) -> Option<usize> {
        Some(self.dimension)
    }
}

fn build_client(config: &Config) -> Result<reqwest::Client, Error> {
    let headers = build_auth_headers(config)?;

    Ok(reqwest::Client::builder()
        .use_rustls_tls()
        .default_headers(headers)
        .timeout(Duration::from_secs(config.embedding_timeout_secs))
        .build()?)
}

/// Self-hosted providers often run without a key, so the bearer header is optional.
fn build_auth_headers(config: &Config) -> Result<reqwest::header::HeaderMap, Error> {
    let mut headers = reqwest::header::HeaderMap::new();

    if let Some(api_key) = config.embedding_api_key() {
        let auth_value = format!("Bearer {api_key}");
        let mut auth_header =
            reqwest::header::HeaderValue::from_str(&auth_value).map_err(|err| {
                warn!("Failed to create authorization header value: {err:?}");
                Error {
                    source: Some(Box::new(err)),
                    error_kind: DomainErrorKind::Internal(InternalErrorKind::Config),
                }
            })?;
        auth_header.set_sensitive(true);
        headers.insert(reqwest::header::AUTHORIZATION, auth_header);
    }

    Ok(headers)
}
