use std::{env, thread, time::Duration};

use qdrant_client::{
	Qdrant,
	qdrant::{CreateCollectionBuilder, Distance, VectorParamsBuilder, VectorsConfigBuilder},
};
use tokio::{runtime::Builder, time};
use uuid::Uuid;

use crate::{Error, Result};
use quarry_storage::qdrant::DENSE_VECTOR_NAME;

const OP_TIMEOUT: Duration = Duration::from_secs(10);

pub fn env_qdrant_url() -> Option<String> {
	env::var("QUARRY_QDRANT_URL").ok().filter(|url| !url.trim().is_empty())
}

/// A uniquely named Qdrant collection with a dense cosine vector, deleted on cleanup or drop.
pub struct TestCollection {
	url: String,
	name: String,
	vector_dim: u32,
	cleaned: bool,
}
impl TestCollection {
	pub async fn create(url: &str, vector_dim: u32) -> Result<Self> {
		let name = format!("quarry_test_{}", Uuid::new_v4().simple());
		let client = connect(url)?;
		let max_attempts = 8;
		let mut backoff = Duration::from_millis(100);

		for attempt in 1..=max_attempts {
			let mut vectors_config = VectorsConfigBuilder::default();

			vectors_config.add_named_vector_params(
				DENSE_VECTOR_NAME,
				VectorParamsBuilder::new(vector_dim.into(), Distance::Cosine),
			);

			let builder = CreateCollectionBuilder::new(name.clone()).vectors_config(vectors_config);

			match time::timeout(OP_TIMEOUT, client.create_collection(builder)).await {
				Ok(Ok(_)) =>
					return Ok(Self { url: url.to_string(), name, vector_dim, cleaned: false }),
				Ok(Err(err)) =>
					if attempt == max_attempts {
						return Err(Error::Message(format!(
							"Failed to create Qdrant collection {name:?} after {attempt} attempts: {err}."
						)));
					},
				Err(_) =>
					if attempt == max_attempts {
						return Err(Error::Message(format!(
							"Timed out creating Qdrant collection {name:?} after {attempt} attempts."
						)));
					},
			}

			time::sleep(backoff).await;

			backoff = backoff.saturating_mul(2).min(Duration::from_secs(2));
		}

		Err(Error::Message(format!("Failed to create Qdrant collection {name:?}.")))
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	/// Storage settings pointing at this collection.
	pub fn qdrant_config(&self) -> quarry_config::Qdrant {
		quarry_config::Qdrant {
			url: self.url.clone(),
			collection: self.name.clone(),
			vector_dim: self.vector_dim,
		}
	}

	pub async fn cleanup(mut self) -> Result<()> {
		let result = delete_collection(&self.url, &self.name).await;

		self.cleaned = true;

		result
	}
}
impl Drop for TestCollection {
	fn drop(&mut self) {
		if self.cleaned {
			return;
		}

		let url = self.url.clone();
		let name = self.name.clone();
		let cleanup_thread = thread::spawn(move || {
			let runtime = match Builder::new_current_thread().enable_all().build() {
				Ok(runtime) => runtime,
				Err(err) => {
					eprintln!("Test collection cleanup failed: {err}.");

					return;
				},
			};

			if let Err(err) = runtime.block_on(delete_collection(&url, &name)) {
				eprintln!("Test collection cleanup failed: {err}.");
			}
		});
		let _ = cleanup_thread.join();
	}
}

fn connect(url: &str) -> Result<Qdrant> {
	Qdrant::from_url(url)
		.build()
		.map_err(|err| Error::Message(format!("Failed to build Qdrant client: {err}.")))
}

async fn delete_collection(url: &str, name: &str) -> Result<()> {
	let client = connect(url)?;
	let max_attempts = 6;
	let mut backoff = Duration::from_millis(100);

	for attempt in 1..=max_attempts {
		let exists = time::timeout(OP_TIMEOUT, client.collection_exists(name.to_string()))
			.await
			.map_err(|_| Error::Message("Qdrant collection_exists timed out.".to_string()))?
			.map_err(|err| Error::Message(format!("Failed to probe Qdrant collection: {err}.")))?;

		if !exists {
			return Ok(());
		}

		match time::timeout(OP_TIMEOUT, client.delete_collection(name.to_string())).await {
			Ok(Ok(_)) => return Ok(()),
			Ok(Err(err)) =>
				if attempt == max_attempts {
					return Err(Error::Message(format!(
						"Failed to delete Qdrant collection {name:?} after {attempt} attempts: {err}."
					)));
				},
			Err(_) =>
				if attempt == max_attempts {
					return Err(Error::Message(format!(
						"Timed out deleting Qdrant collection {name:?} after {attempt} attempts."
					)));
				},
		}

		time::sleep(backoff).await;

		backoff = backoff.saturating_mul(2).min(Duration::from_secs(2));
	}

	Ok(())
}
