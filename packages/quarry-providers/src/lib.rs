pub mod embedding;

mod error;

pub use embedding::HttpEmbedder;
pub use error::{Error, Result};

use std::{future::Future, pin::Pin};

use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName};
use serde_json::{Map, Value};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Turns text into fixed-dimension vectors. Implementations are shared across concurrent
/// searches, so they must be safe to call from many tasks at once.
pub trait Embedder
where
	Self: Send + Sync,
{
	/// Returns one vector per input, in input order.
	fn embed<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>>;

	fn dimensions(&self) -> u32;
}

pub fn auth_headers(api_key: &str, default_headers: &Map<String, Value>) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	headers.insert(AUTHORIZATION, format!("Bearer {api_key}").parse()?);

	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(Error::InvalidConfig {
				message: format!("Default header {key} must be a string."),
			});
		};

		headers.insert(HeaderName::from_bytes(key.as_bytes())?, raw.parse()?);
	}

	Ok(headers)
}
