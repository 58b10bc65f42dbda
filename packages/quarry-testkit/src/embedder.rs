use quarry_domain::keywords;
use quarry_providers::{BoxFuture, Embedder, Error as ProviderError, Result as ProviderResult};

/// Deterministic bag-of-words embedder. Each term is hashed into one signed bucket and the vector
/// is L2-normalized, so texts sharing terms land close together.
pub struct HashEmbedder {
	dimensions: u32,
}
impl HashEmbedder {
	pub fn new(dimensions: u32) -> Self {
		Self { dimensions: dimensions.max(1) }
	}

	pub fn vector(&self, text: &str) -> Vec<f32> {
		let dim = self.dimensions as usize;
		let mut vector = vec![0.0_f32; dim];

		for term in keywords::terms(text) {
			let hash = blake3::hash(term.as_bytes());
			let bytes = hash.as_bytes();
			let mut bucket = [0_u8; 8];

			bucket.copy_from_slice(&bytes[..8]);

			let index = (u64::from_le_bytes(bucket) % dim as u64) as usize;
			let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };

			vector[index] += sign;
		}

		let norm = vector.iter().map(|value| value * value).sum::<f32>().sqrt();

		if norm > 0.0 {
			for value in &mut vector {
				*value /= norm;
			}
		}

		vector
	}
}
impl Embedder for HashEmbedder {
	fn embed<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, ProviderResult<Vec<Vec<f32>>>> {
		Box::pin(async move { Ok(texts.iter().map(|text| self.vector(text)).collect()) })
	}

	fn dimensions(&self) -> u32 {
		self.dimensions
	}
}

/// Embedder whose every call fails with an invalid-response error.
pub struct FailingEmbedder {
	dimensions: u32,
	message: String,
}
impl FailingEmbedder {
	pub fn new(dimensions: u32, message: impl Into<String>) -> Self {
		Self { dimensions, message: message.into() }
	}
}
impl Embedder for FailingEmbedder {
	fn embed<'a>(&'a self, _texts: &'a [String]) -> BoxFuture<'a, ProviderResult<Vec<Vec<f32>>>> {
		Box::pin(async move {
			Err(ProviderError::InvalidResponse { message: self.message.clone() })
		})
	}

	fn dimensions(&self) -> u32 {
		self.dimensions
	}
}
