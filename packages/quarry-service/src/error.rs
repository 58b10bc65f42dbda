pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Embedding error: {message}")]
	Embedding { message: String },
	#[error("Store unavailable: {message}")]
	StoreUnavailable { message: String },
	#[error("Store error: {message}")]
	Store { message: String },
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
}
impl Error {
	/// Whether repeating the call, possibly with a different query, can succeed.
	pub fn is_retryable(&self) -> bool {
		matches!(self, Self::Embedding { .. } | Self::Store { .. })
	}
}

impl From<quarry_providers::Error> for Error {
	fn from(err: quarry_providers::Error) -> Self {
		Self::Embedding { message: err.to_string() }
	}
}

impl From<quarry_storage::Error> for Error {
	fn from(err: quarry_storage::Error) -> Self {
		match err {
			quarry_storage::Error::Unavailable(message) => Self::StoreUnavailable { message },
			quarry_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			quarry_storage::Error::NotFound(message) => Self::Store { message },
			quarry_storage::Error::Qdrant(inner) => Self::Store { message: inner.to_string() },
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn classifies_retryable_errors() {
		assert!(Error::Embedding { message: "timeout".to_string() }.is_retryable());
		assert!(Error::Store { message: "io".to_string() }.is_retryable());
		assert!(!Error::StoreUnavailable { message: "down".to_string() }.is_retryable());
		assert!(!Error::InvalidRequest { message: "k".to_string() }.is_retryable());
	}

	#[test]
	fn maps_storage_errors() {
		let unavailable = Error::from(quarry_storage::Error::Unavailable("down".to_string()));
		let invalid = Error::from(quarry_storage::Error::InvalidArgument("k".to_string()));

		assert!(matches!(unavailable, Error::StoreUnavailable { .. }));
		assert!(matches!(invalid, Error::InvalidRequest { .. }));
	}
}
