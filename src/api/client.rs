//! HTTP client for the entity service.
//!
//! reqwest drives `fetch` on wasm32 and hyper natively, so the same code
//! serves the browser build and native tests.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{ApiError, ApiResult};

#[derive(Clone)]
pub struct ApiClient {
	base_url: String,
	http: reqwest::Client,
}

impl ApiClient {
	pub fn new(base_url: &str) -> Self {
		Self {
			base_url: base_url.trim_end_matches('/').to_string(),
			http: reqwest::Client::new(),
		}
	}

	/// POST `body` as JSON to `path` and decode the JSON answer.
	pub async fn post<B, T>(&self, path: &str, body: &B) -> ApiResult<T>
	where
		B: Serialize + ?Sized,
		T: DeserializeOwned,
	{
		let url = format!("{}{}", self.base_url, path);
		let response = self
			.http
			.post(&url)
			.json(body)
			.send()
			.await
			.map_err(|e| ApiError::request(&url, e))?;

		if !response.status().is_success() {
			return Err(ApiError::Status {
				url,
				status: response.status().as_u16(),
			});
		}

		response.json::<T>().await.map_err(|e| ApiError::decode(&url, e))
	}
}
