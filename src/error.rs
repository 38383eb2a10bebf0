use thiserror::Error;

/// Failures talking to the entity service.
///
/// Nothing above the API layer treats these as fatal; callers log and carry
/// on with an empty result.
#[derive(Clone, Debug, Error)]
pub enum ApiError {
	#[error("request to {url} failed: {message}")]
	Request { url: String, message: String },

	#[error("{url} answered HTTP {status}")]
	Status { url: String, status: u16 },

	#[error("could not decode response from {url}: {message}")]
	Decode { url: String, message: String },
}

impl ApiError {
	pub(crate) fn request(url: &str, err: impl std::fmt::Display) -> Self {
		Self::Request {
			url: url.to_string(),
			message: err.to_string(),
		}
	}

	pub(crate) fn decode(url: &str, err: impl std::fmt::Display) -> Self {
		Self::Decode {
			url: url.to_string(),
			message: err.to_string(),
		}
	}
}

pub type ApiResult<T> = Result<T, ApiError>;
