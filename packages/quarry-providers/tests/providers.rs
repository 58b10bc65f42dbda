use reqwest::header::AUTHORIZATION;
use serde_json::{Map, Value};

use quarry_config::EmbeddingProviderConfig;
use quarry_providers::{Embedder, Error, HttpEmbedder};

fn embedding_config() -> EmbeddingProviderConfig {
	EmbeddingProviderConfig {
		provider_id: "local".to_string(),
		api_base: "http://127.0.0.1:9".to_string(),
		api_key: "secret".to_string(),
		path: "/v1/embeddings".to_string(),
		model: "embed-small".to_string(),
		dimensions: 4,
		timeout_ms: 1_000,
		default_headers: Map::new(),
	}
}

#[test]
fn builds_bearer_auth_header() {
	let headers =
		quarry_providers::auth_headers("secret", &Map::new()).expect("Failed to build headers.");
	let value = headers.get(AUTHORIZATION).expect("Missing authorization header.");

	assert_eq!(value, "Bearer secret");
}

#[test]
fn rejects_non_string_default_headers() {
	let mut defaults = Map::new();

	defaults.insert("x-retries".to_string(), Value::from(3));

	let err = quarry_providers::auth_headers("secret", &defaults)
		.expect_err("Expected invalid header config.");

	assert!(matches!(err, Error::InvalidConfig { .. }));
}

#[tokio::test]
async fn empty_batches_skip_the_network() {
	let embedder = HttpEmbedder::new(&embedding_config()).expect("Failed to build embedder.");
	let vectors = embedder.embed(&[]).await.expect("Empty batch must succeed.");

	assert!(vectors.is_empty());
	assert_eq!(embedder.dimensions(), 4);
}
