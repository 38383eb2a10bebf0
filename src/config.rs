use serde::Deserialize;

const DEFAULT_API_URL: &str = "http://localhost:8081";

/// Where the entity service lives and how the navigator names things in the URL.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct NavigatorConfig {
	/// Base URL of the entity service, without a trailing slash.
	pub api_url: String,
	/// Id of the government root that presidents hang off.
	pub government_id: String,
	/// Query parameter that carries the focused ministry.
	pub focus_param: String,
}

impl Default for NavigatorConfig {
	fn default() -> Self {
		Self {
			api_url: option_env!("NAVIGATOR_API_URL")
				.unwrap_or(DEFAULT_API_URL)
				.trim_end_matches('/')
				.to_string(),
			government_id: "gov_01".into(),
			focus_param: "ministry".into(),
		}
	}
}

impl NavigatorConfig {
	/// Overlay a JSON document (e.g. an inline `<script type="application/json">`)
	/// on the defaults. Unknown or invalid input leaves the defaults in place.
	pub fn from_json(raw: &str) -> Self {
		match serde_json::from_str::<Self>(raw) {
			Ok(mut cfg) => {
				cfg.api_url = cfg.api_url.trim_end_matches('/').to_string();
				cfg
			}
			Err(err) => {
				log::warn!("ignoring navigator config: {err}");
				Self::default()
			}
		}
	}
}
