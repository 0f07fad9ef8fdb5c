use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use wikirag_core::config::RerankSettings;
use wikirag_core::error::{Error, Result};
use wikirag_core::traits::Reranker;

const SERVICE: &str = "rerank";

/// Client for the cross-encoder scoring service.
///
/// `POST {url}` with `{"query", "texts"}`, answered by `{"scores"}` in input order.
pub struct HttpReranker {
    client: reqwest::Client,
    url: reqwest::Url,
}

#[derive(Serialize)]
struct RankRequest<'a> {
    query: &'a str,
    texts: &'a [String],
}

#[derive(Deserialize)]
struct RankResponse {
    scores: Vec<f32>,
}

impl HttpReranker {
    pub fn new(settings: &RerankSettings) -> Result<Self> {
        let url = reqwest::Url::parse(&settings.url)
            .map_err(|e| Error::InvalidConfig(format!("rerank.url '{}': {e}", settings.url)))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| Error::InvalidConfig(format!("rerank client: {e}")))?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl Reranker for HttpReranker {
    async fn rerank(&self, query: &str, texts: &[String]) -> Result<Vec<f32>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        let response = self
            .client
            .post(self.url.clone())
            .json(&RankRequest { query, texts })
            .send()
            .await
            .map_err(|e| Error::unavailable(SERVICE, e))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::unavailable(SERVICE, format!("HTTP {}: {body}", status.as_u16())));
        }
        let body: RankResponse = response.json().await.map_err(|e| Error::unavailable(SERVICE, e))?;
        if body.scores.len() != texts.len() {
            return Err(Error::unavailable(
                SERVICE,
                format!("returned {} scores for {} texts", body.scores.len(), texts.len()),
            ));
        }
        Ok(body.scores)
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
