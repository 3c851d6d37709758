use async_trait::async_trait;
use lru::LruCache;
use parking_lot::Mutex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::config::{EmbeddingProviderKind, PeerlensConfig};

#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Both primary and fallback failed: primary={0}, fallback={1}")]
    BothFailed(String, String),
}

/// Batch text embedder.
///
/// Output has the same order as `batch` and every vector is L2-normalized.
/// A provider may return fewer vectors than requested; the returned ones are
/// then a prefix of the batch.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, batch: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    fn model_name(&self) -> &str;
}

pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 && norm.is_finite() {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

#[derive(Serialize)]
struct OllamaEmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct OllamaEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

#[derive(Serialize)]
struct OpenAIEmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct OpenAIEmbeddingResponse {
    data: Vec<OpenAIEmbeddingData>,
}

#[derive(Deserialize)]
struct OpenAIEmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

fn into_input_order(mut data: Vec<OpenAIEmbeddingData>) -> Vec<Vec<f32>> {
    data.sort_by_key(|d| d.index);
    data.into_iter().map(|d| d.embedding).collect()
}

struct EmbeddingCache {
    entries: Mutex<LruCache<String, (Vec<f32>, Instant)>>,
    ttl: Duration,
}

impl EmbeddingCache {
    fn new(capacity: NonZeroUsize, ttl_secs: u64) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl: Duration::from_secs(ttl_secs),
        }
    }

    fn key(model: &str, text: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(model.as_bytes());
        hasher.update([0u8]);
        hasher.update(text.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn get(&self, key: &str) -> Option<Vec<f32>> {
        let mut entries = self.entries.lock();
        let expired = match entries.get(key) {
            Some((embedding, created_at)) => {
                if created_at.elapsed() < self.ttl {
                    return Some(embedding.clone());
                }
                true
            }
            None => false,
        };
        if expired {
            entries.pop(key);
        }
        None
    }

    fn put(&self, key: String, embedding: Vec<f32>) {
        self.entries.lock().put(key, (embedding, Instant::now()));
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.lock().len()
    }
}

#[derive(Debug, Clone)]
pub struct EmbeddingSettings {
    pub kind: EmbeddingProviderKind,
    pub url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    /// Zero disables the cache.
    pub cache_size: usize,
    pub cache_ttl: u64,
    pub fallback_enabled: bool,
    pub fallback_url: String,
    pub fallback_model: String,
}

impl EmbeddingSettings {
    pub fn from_config(config: &PeerlensConfig) -> crate::Result<Self> {
        Ok(Self {
            kind: config.embedding_kind()?,
            url: config.embedding_url.clone(),
            model: config.embedding_model.clone(),
            api_key: config.embedding_api_key.clone(),
            timeout_secs: config.timeout,
            cache_size: config.embedding_cache_size,
            cache_ttl: config.embedding_cache_ttl,
            fallback_enabled: config.embedding_fallback_enabled,
            fallback_url: config.embedding_fallback_url.clone(),
            fallback_model: config.embedding_fallback_model.clone(),
        })
    }

    fn fallback_differs(&self) -> bool {
        self.kind != EmbeddingProviderKind::Ollama
            || self.fallback_url != self.url
            || self.fallback_model != self.model
    }
}

/// HTTP embedding adapter for Ollama and OpenAI-compatible endpoints.
///
/// Every `embed` call answers from a single model. Cache entries are keyed by
/// the model that produced them; lookups only consult the primary model.
pub struct EmbeddingGenerator {
    settings: EmbeddingSettings,
    client: Client,
    cache: Option<EmbeddingCache>,
}

impl EmbeddingGenerator {
    pub fn new(settings: EmbeddingSettings) -> Result<Self, EmbeddingError> {
        if settings.kind == EmbeddingProviderKind::OpenAi && settings.api_key.is_none() {
            return Err(EmbeddingError::Config("API key required for openai embeddings".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        info!(
            "EmbeddingGenerator initialized: provider={}, model={}, cache={}",
            settings.kind, settings.model, settings.cache_size
        );

        Ok(Self {
            cache: NonZeroUsize::new(settings.cache_size)
                .map(|capacity| EmbeddingCache::new(capacity, settings.cache_ttl)),
            settings,
            client,
        })
    }

    pub fn from_config(config: &PeerlensConfig) -> crate::Result<Self> {
        Ok(Self::new(EmbeddingSettings::from_config(config)?)?)
    }

    /// Returns the vectors together with the name of the model that produced them.
    async fn fetch(&self, texts: &[String]) -> Result<(&str, Vec<Vec<f32>>), EmbeddingError> {
        let primary = match self.settings.kind {
            EmbeddingProviderKind::Ollama => {
                self.fetch_ollama(&self.settings.url, &self.settings.model, texts).await
            }
            EmbeddingProviderKind::OpenAi => self.fetch_openai(texts).await,
        };

        match primary {
            Ok(embeddings) => Ok((self.settings.model.as_str(), embeddings)),
            Err(e) if self.settings.fallback_enabled && self.settings.fallback_differs() => {
                debug!("Primary embedding provider unavailable, trying fallback: {}", e);
                let embeddings = self.fallback_to_ollama(texts, &e).await?;
                Ok((self.settings.fallback_model.as_str(), embeddings))
            }
            Err(e) => Err(e),
        }
    }

    async fn fetch_ollama(&self, url: &str, model: &str, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let response = self
            .client
            .post(format!("{}/api/embed", url.trim_end_matches('/')))
            .json(&OllamaEmbedRequest { model, input: texts })
            .send()
            .await?
            .error_for_status()
            .map_err(EmbeddingError::Http)?
            .json::<OllamaEmbedResponse>()
            .await?;

        Ok(response.embeddings)
    }

    async fn fetch_openai(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let api_key = self
            .settings
            .api_key
            .as_ref()
            .ok_or_else(|| EmbeddingError::Config("API key required".to_string()))?;

        let response = self
            .client
            .post(format!("{}/embeddings", self.settings.url.trim_end_matches('/')))
            .bearer_auth(api_key)
            .json(&OpenAIEmbeddingRequest {
                model: &self.settings.model,
                input: texts,
            })
            .send()
            .await?
            .error_for_status()
            .map_err(EmbeddingError::Http)?
            .json::<OpenAIEmbeddingResponse>()
            .await?;

        Ok(into_input_order(response.data))
    }

    async fn fallback_to_ollama(
        &self,
        texts: &[String],
        original_error: &EmbeddingError,
    ) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        warn!(
            "Using fallback Ollama ({}/{}) - primary unavailable",
            self.settings.fallback_url, self.settings.fallback_model
        );

        self.fetch_ollama(&self.settings.fallback_url, &self.settings.fallback_model, texts)
            .await
            .map_err(|e| EmbeddingError::BothFailed(original_error.to_string(), e.to_string()))
    }

    fn cache_key(&self, text: &str) -> String {
        EmbeddingCache::key(&self.settings.model, text)
    }
}

#[async_trait]
impl EmbeddingProvider for EmbeddingGenerator {
    async fn embed(&self, batch: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let mut slots: Vec<Option<Vec<f32>>> = match self.cache {
            Some(ref cache) => batch.iter().map(|text| cache.get(&self.cache_key(text))).collect(),
            None => vec![None; batch.len()],
        };

        let mut missing: Vec<usize> = (0..batch.len()).filter(|&i| slots[i].is_none()).collect();
        debug!("Embedding batch: {} texts, {} cache hits", batch.len(), batch.len() - missing.len());

        if !missing.is_empty() {
            let texts: Vec<String> = missing.iter().map(|&i| batch[i].clone()).collect();
            let (mut model, mut fetched) = self.fetch(&texts).await?;

            // cache hits are primary-model vectors; a fallback answer must cover the whole batch
            if model != self.settings.model && missing.len() < batch.len() {
                debug!("Fallback answered a partially cached batch, re-embedding all {} texts", batch.len());
                slots.iter_mut().for_each(|slot| *slot = None);
                missing = (0..batch.len()).collect();
                (model, fetched) = self.fetch(batch).await?;
            }

            if fetched.len() != missing.len() {
                warn!(
                    "Embedding endpoint returned {} vectors for {} texts",
                    fetched.len(),
                    missing.len()
                );
            }

            for (&i, mut embedding) in missing.iter().zip(fetched) {
                l2_normalize(&mut embedding);
                if let Some(ref cache) = self.cache {
                    cache.put(EmbeddingCache::key(model, &batch[i]), embedding.clone());
                }
                slots[i] = Some(embedding);
            }
        }

        // keep the aligned prefix only
        Ok(slots.into_iter().map_while(|slot| slot).collect())
    }

    fn model_name(&self) -> &str {
        &self.settings.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_settings(cache_size: usize) -> EmbeddingSettings {
        EmbeddingSettings {
            kind: EmbeddingProviderKind::Ollama,
            url: "http://127.0.0.1:9".to_string(),
            model: "test-embed".to_string(),
            api_key: None,
            timeout_secs: 1,
            cache_size,
            cache_ttl: 300,
            fallback_enabled: false,
            fallback_url: "http://127.0.0.1:9".to_string(),
            fallback_model: "test-embed".to_string(),
        }
    }

    #[test]
    fn test_l2_normalize() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);

        let mut zero = vec![0.0, 0.0];
        l2_normalize(&mut zero);
        assert_eq!(zero, vec![0.0, 0.0]);
    }

    #[test]
    fn test_openai_data_reordered_by_index() {
        let data: Vec<OpenAIEmbeddingData> = serde_json::from_str(
            r#"[{"index": 1, "embedding": [0.0, 1.0]}, {"index": 0, "embedding": [1.0, 0.0]}]"#,
        )
        .unwrap();
        assert_eq!(into_input_order(data), vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn test_cache_key_depends_on_model() {
        assert_ne!(EmbeddingCache::key("a", "text"), EmbeddingCache::key("b", "text"));
        assert_eq!(EmbeddingCache::key("a", "text"), EmbeddingCache::key("a", "text"));
    }

    #[test]
    fn test_openai_requires_key() {
        let mut settings = offline_settings(0);
        settings.kind = EmbeddingProviderKind::OpenAi;
        assert!(matches!(EmbeddingGenerator::new(settings), Err(EmbeddingError::Config(_))));
    }

    #[test]
    fn test_fallback_skipped_when_identical_to_primary() {
        let settings = offline_settings(0);
        assert!(!settings.fallback_differs());
    }

    #[tokio::test]
    async fn test_empty_batch_makes_no_request() {
        let generator = EmbeddingGenerator::new(offline_settings(0)).unwrap();
        assert!(generator.embed(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fully_cached_batch_served_offline() {
        let generator = EmbeddingGenerator::new(offline_settings(16)).unwrap();
        let cache = generator.cache.as_ref().unwrap();
        cache.put(generator.cache_key("사과"), vec![1.0, 0.0]);
        cache.put(generator.cache_key("운동"), vec![0.0, 1.0]);

        let batch = vec!["운동".to_string(), "사과".to_string()];
        let embeddings = generator.embed(&batch).await.unwrap();
        assert_eq!(embeddings, vec![vec![0.0, 1.0], vec![1.0, 0.0]]);
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_error() {
        let generator = EmbeddingGenerator::new(offline_settings(0)).unwrap();
        let batch = vec!["문장".to_string()];
        assert!(generator.embed(&batch).await.is_err());
    }

    /// Minimal `/api/embed` endpoint answering `dims`-wide unit vectors, one per input.
    async fn spawn_mock_ollama(dims: usize) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut buf = Vec::new();
                    let mut chunk = [0u8; 4096];
                    let body = loop {
                        let n = stream.read(&mut chunk).await.unwrap_or(0);
                        if n == 0 {
                            return;
                        }
                        buf.extend_from_slice(&chunk[..n]);
                        let text = String::from_utf8_lossy(&buf);
                        if let Some(header_end) = text.find("\r\n\r\n") {
                            let length = text[..header_end]
                                .lines()
                                .find_map(|l| {
                                    let (name, value) = l.split_once(':')?;
                                    name.eq_ignore_ascii_case("content-length")
                                        .then(|| value.trim().parse::<usize>().ok())
                                        .flatten()
                                })
                                .unwrap_or(0);
                            if buf.len() >= header_end + 4 + length {
                                break buf[header_end + 4..header_end + 4 + length].to_vec();
                            }
                        }
                    };

                    let request: serde_json::Value = serde_json::from_slice(&body).unwrap();
                    let count = request["input"].as_array().map(Vec::len).unwrap_or(0);
                    let mut unit = vec![0.0f32; dims];
                    unit[0] = 1.0;
                    let reply = serde_json::json!({ "embeddings": vec![unit; count] }).to_string();
                    let response = format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        reply.len(),
                        reply
                    );
                    let _ = stream.write_all(response.as_bytes()).await;
                    let _ = stream.shutdown().await;
                });
            }
        });

        format!("http://{}", addr)
    }

    fn with_fallback(cache_size: usize, fallback_url: String) -> EmbeddingSettings {
        EmbeddingSettings {
            model: "primary-768d".to_string(),
            fallback_enabled: true,
            fallback_url,
            fallback_model: "fallback-2d".to_string(),
            ..offline_settings(cache_size)
        }
    }

    #[tokio::test]
    async fn test_fallback_vectors_cached_under_fallback_model() {
        let fallback_url = spawn_mock_ollama(2).await;
        let generator = EmbeddingGenerator::new(with_fallback(16, fallback_url)).unwrap();

        let embeddings = generator.embed(&["사과".to_string()]).await.unwrap();
        assert_eq!(embeddings, vec![vec![1.0, 0.0]]);

        let cache = generator.cache.as_ref().unwrap();
        assert!(cache.get(&EmbeddingCache::key("primary-768d", "사과")).is_none());
        assert_eq!(cache.get(&EmbeddingCache::key("fallback-2d", "사과")), Some(vec![1.0, 0.0]));
    }

    #[tokio::test]
    async fn test_fallback_never_mixes_with_cached_primary_vectors() {
        let fallback_url = spawn_mock_ollama(2).await;
        let generator = EmbeddingGenerator::new(with_fallback(16, fallback_url)).unwrap();
        generator
            .cache
            .as_ref()
            .unwrap()
            .put(generator.cache_key("운동"), vec![0.0, 0.0, 1.0]);

        let batch = vec!["운동".to_string(), "사과".to_string()];
        let embeddings = generator.embed(&batch).await.unwrap();

        assert_eq!(embeddings.len(), 2);
        assert!(embeddings.iter().all(|v| v.len() == 2));
    }
}
