//! Keeps the focused ministry in the query string (`?ministry=<id>`).
//!
//! Updates use `history.replaceState`, so drilling in and out never piles up
//! history entries.

use std::cell::{Cell, RefCell};

use url::Url;

use crate::graph::{Focus, GROUP_MINISTRY, GraphNode, NodeKind};
use crate::model::Dictionaries;

/// Read and replace query parameters of the current location.
pub trait QueryStore {
	fn query_param(&self, key: &str) -> Option<String>;
	/// Set `key` to `value`, or remove it when `value` is `None`.
	fn replace_query_param(&self, key: &str, value: Option<&str>);
}

/// `url` with `key` set to `value` (or removed), other parameters untouched.
pub fn with_param(url: &Url, key: &str, value: Option<&str>) -> Url {
	let kept: Vec<(String, String)> = url
		.query_pairs()
		.filter(|(k, _)| k != key)
		.map(|(k, v)| (k.into_owned(), v.into_owned()))
		.collect();
	let mut next = url.clone();
	if kept.is_empty() && value.is_none() {
		next.set_query(None);
		return next;
	}
	{
		let mut pairs = next.query_pairs_mut();
		pairs.clear();
		for (k, v) in &kept {
			pairs.append_pair(k, v);
		}
		if let Some(value) = value {
			pairs.append_pair(key, value);
		}
	}
	next
}

fn param_of(url: &Url, key: &str) -> Option<String> {
	url.query_pairs()
		.find(|(k, _)| k == key)
		.map(|(_, v)| v.into_owned())
		.filter(|v| !v.is_empty())
}

/// The browser's `window.location`.
#[derive(Clone, Copy, Debug, Default)]
pub struct BrowserLocation;

impl BrowserLocation {
	fn current() -> Option<Url> {
		let href = web_sys::window()?.location().href().ok()?;
		Url::parse(&href).ok()
	}
}

impl QueryStore for BrowserLocation {
	fn query_param(&self, key: &str) -> Option<String> {
		Self::current().and_then(|url| param_of(&url, key))
	}

	fn replace_query_param(&self, key: &str, value: Option<&str>) {
		let Some(url) = Self::current() else {
			return;
		};
		let next = with_param(&url, key, value);
		if next == url {
			return;
		}
		let Some(history) = web_sys::window().and_then(|w| w.history().ok()) else {
			return;
		};
		if let Err(err) =
			history.replace_state_with_url(&wasm_bindgen::JsValue::NULL, "", Some(next.as_str()))
		{
			log::warn!("could not update location: {err:?}");
		}
	}
}

/// An in-memory location, for tests and non-browser hosts.
#[derive(Debug)]
pub struct MemoryLocation {
	url: RefCell<Url>,
	replacements: Cell<usize>,
}

impl MemoryLocation {
	pub fn new(href: &str) -> Result<Self, url::ParseError> {
		Ok(Self {
			url: RefCell::new(Url::parse(href)?),
			replacements: Cell::new(0),
		})
	}

	pub fn href(&self) -> String {
		self.url.borrow().to_string()
	}

	/// How many times the location was replaced.
	pub fn replacements(&self) -> usize {
		self.replacements.get()
	}
}

impl QueryStore for MemoryLocation {
	fn query_param(&self, key: &str) -> Option<String> {
		param_of(&self.url.borrow(), key)
	}

	fn replace_query_param(&self, key: &str, value: Option<&str>) {
		let next = with_param(&self.url.borrow(), key, value);
		*self.url.borrow_mut() = next;
		self.replacements.set(self.replacements.get() + 1);
	}
}

/// Maps focus to and from one query parameter.
pub struct UrlSync<S> {
	param: String,
	store: S,
}

impl<S: QueryStore> UrlSync<S> {
	pub fn new(param: impl Into<String>, store: S) -> Self {
		Self {
			param: param.into(),
			store,
		}
	}

	pub fn store(&self) -> &S {
		&self.store
	}

	/// Focus requested by the URL at mount time.
	///
	/// An id that is not in the ministry dictionary is removed from the URL
	/// and the navigator starts at the root.
	pub fn resolve_initial(&self, dicts: &Dictionaries) -> Focus {
		let Some(id) = self.store.query_param(&self.param) else {
			return Focus::Root;
		};
		match dicts.ministry(&id) {
			Some(ministry) => {
				log::info!("deep link to {}", ministry.name);
				Focus::Ministry(GraphNode::new(
					ministry.id.clone(),
					ministry.name.clone(),
					NodeKind::Ministry,
					GROUP_MINISTRY,
				))
			}
			None => {
				log::warn!("deep link to unknown ministry {id}, starting at root");
				self.store.replace_query_param(&self.param, None);
				Focus::Root
			}
		}
	}

	/// Write `focus` to the URL.
	pub fn persist(&self, focus: &Focus) {
		self.store.replace_query_param(&self.param, focus.ministry_id());
	}
}
