use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::{BoxFuture, Embedder, Error, Result};
use quarry_config::EmbeddingProviderConfig;

/// OpenAI-compatible `/embeddings` client.
pub struct HttpEmbedder {
	cfg: EmbeddingProviderConfig,
	client: Client,
}
impl HttpEmbedder {
	pub fn new(cfg: &EmbeddingProviderConfig) -> Result<Self> {
		let client = Client::builder()
			.timeout(Duration::from_millis(cfg.timeout_ms))
			.default_headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
			.build()?;

		Ok(Self { cfg: cfg.clone(), client })
	}

	async fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
		if texts.is_empty() {
			return Ok(Vec::new());
		}

		let url = format!("{}{}", self.cfg.api_base, self.cfg.path);
		let body = serde_json::json!({
			"model": self.cfg.model,
			"input": texts,
			"dimensions": self.cfg.dimensions,
		});
		let res = self.client.post(url).json(&body).send().await?;
		let body = res.error_for_status()?.bytes().await?;
		let vectors = decode_embedding_body(&body)?;

		if vectors.len() != texts.len() {
			return Err(Error::VectorCount { expected: texts.len(), actual: vectors.len() });
		}

		tracing::debug!(
			provider_id = %self.cfg.provider_id,
			model = %self.cfg.model,
			inputs = texts.len(),
			"Embedded texts."
		);

		Ok(vectors)
	}
}
impl Embedder for HttpEmbedder {
	fn embed<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		Box::pin(self.request(texts))
	}

	fn dimensions(&self) -> u32 {
		self.cfg.dimensions
	}
}

fn decode_embedding_body(body: &[u8]) -> Result<Vec<Vec<f32>>> {
	let json: Value = serde_json::from_slice(body)?;

	parse_embedding_response(json)
}

fn parse_embedding_response(json: Value) -> Result<Vec<Vec<f32>>> {
	let data = json.get("data").and_then(|v| v.as_array()).ok_or_else(|| {
		Error::InvalidResponse { message: "Embedding response is missing data array.".to_string() }
	})?;
	let mut indexed: Vec<(usize, Vec<f32>)> = Vec::with_capacity(data.len());

	for (fallback_index, item) in data.iter().enumerate() {
		let index = item
			.get("index")
			.and_then(|v| v.as_u64())
			.map(|v| v as usize)
			.unwrap_or(fallback_index);
		let embedding = item.get("embedding").and_then(|v| v.as_array()).ok_or_else(|| {
			Error::InvalidResponse {
				message: "Embedding item missing embedding array.".to_string(),
			}
		})?;
		let mut vec = Vec::with_capacity(embedding.len());

		for value in embedding {
			let number = value.as_f64().ok_or_else(|| Error::InvalidResponse {
				message: "Embedding value must be numeric.".to_string(),
			})?;

			vec.push(number as f32);
		}

		indexed.push((index, vec));
	}

	indexed.sort_by_key(|(index, _)| *index);

	Ok(indexed.into_iter().map(|(_, vec)| vec).collect())
}
