//! Embedding and cross-encoder rerank collaborators.
//!
//! Both models run in separate inference services; this crate only speaks
//! their HTTP contracts. `APP_USE_FAKE_EMBEDDINGS=1` swaps in a deterministic
//! hashing embedder for development and tests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use wikirag_core::config::EmbeddingSettings;
use wikirag_core::error::{Error, Result};
use wikirag_core::traits::Embedder;

pub mod rerank;

pub use rerank::HttpReranker;

const SERVICE: &str = "embedding";

/// Client for the embedding service (`POST /embed`).
pub struct HttpEmbedder {
    client: reqwest::Client,
    url: reqwest::Url,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    texts: &'a [String],
    normalize: bool,
}

#[derive(Deserialize)]
struct EmbedResponse {
    vectors: Vec<Vec<f32>>,
}

impl HttpEmbedder {
    pub fn new(settings: &EmbeddingSettings) -> Result<Self> {
        let url = reqwest::Url::parse(&settings.url)
            .map_err(|e| Error::InvalidConfig(format!("embedding.url '{}': {e}", settings.url)))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| Error::InvalidConfig(format!("embedding client: {e}")))?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, texts: &[String], normalize: bool) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        let response = self
            .client
            .post(self.url.clone())
            .json(&EmbedRequest { texts, normalize })
            .send()
            .await
            .map_err(|e| Error::unavailable(SERVICE, e))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::unavailable(SERVICE, format!("HTTP {}: {body}", status.as_u16())));
        }
        let body: EmbedResponse = response.json().await.map_err(|e| Error::unavailable(SERVICE, e))?;
        if body.vectors.len() != texts.len() {
            return Err(Error::unavailable(
                SERVICE,
                format!("returned {} vectors for {} texts", body.vectors.len(), texts.len()),
            ));
        }
        tracing::debug!(count = texts.len(), "embedded batch");
        Ok(body.vectors)
    }

    async fn health(&self) -> Result<()> {
        let url = self.url.join("/health").map_err(|e| Error::unavailable(SERVICE, e))?;
        let response = self.client.get(url).send().await.map_err(|e| Error::unavailable(SERVICE, e))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(Error::unavailable(SERVICE, format!("health returned HTTP {}", response.status().as_u16())))
        }
    }
}

/// Hashing embedder: stable, L2-normalized, no model required.
pub struct FakeEmbedder {
    dim: usize,
}

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        use std::hash::{Hash, Hasher};
        use twox_hash::XxHash64;
        let mut v = vec![0f32; self.dim];
        for (i, token) in text.split_whitespace().enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = usize::try_from(h % self.dim as u64).unwrap_or(0);
            #[allow(clippy::cast_precision_loss)]
            let val = ((h >> 32) as u32) as f32 / u32::MAX as f32;
            #[allow(clippy::cast_precision_loss)]
            let position = (i % 3) as f32;
            v[idx] += val + position * 0.01;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
        for x in &mut v {
            *x /= norm;
        }
        v
    }
}

#[async_trait]
impl Embedder for FakeEmbedder {
    async fn embed(&self, texts: &[String], _normalize: bool) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }

    async fn health(&self) -> Result<()> {
        Ok(())
    }
}

pub fn use_fake_embeddings() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

pub fn get_default_embedder(settings: &EmbeddingSettings) -> Result<Box<dyn Embedder>> {
    if use_fake_embeddings() {
        tracing::info!("using FakeEmbedder");
        return Ok(Box::new(FakeEmbedder::new(1024)));
    }
    Ok(Box::new(HttpEmbedder::new(settings)?))
}
