use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::fmt;

use async_trait::async_trait;
use serde::Serialize;

use super::client::ApiClient;
use crate::error::{ApiError, ApiResult};
use crate::model::{PointInTime, Relation, to_active_at};

/// Relation names understood by the entity service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RelationKind {
	/// government → president
	President,
	/// president → ministry
	Minister,
	/// ministry → department
	Department,
	/// ministry → person
	Appointed,
}

impl RelationKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			RelationKind::President => "AS_PRESIDENT",
			RelationKind::Minister => "AS_MINISTER",
			RelationKind::Department => "AS_DEPARTMENT",
			RelationKind::Appointed => "AS_APPOINTED",
		}
	}
}

impl fmt::Display for RelationKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Point-in-time relation queries.
///
/// One call is one request; implementations hold no state between calls.
#[async_trait(?Send)]
pub trait RelationSource {
	/// Relations of `kind` leaving `subject_id` that are active at `active_at`
	/// (all of them when `active_at` is `None`).
	async fn fetch_relations(
		&self,
		subject_id: &str,
		kind: RelationKind,
		active_at: Option<PointInTime>,
	) -> ApiResult<Vec<Relation>>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RelationQuery<'a> {
	name: &'a str,
	active_at: String,
	related_entity_id: &'a str,
	start_time: &'a str,
	end_time: &'a str,
	id: &'a str,
}

/// `POST /v1/entities/{id}/relations` against the entity service.
#[derive(Clone)]
pub struct HttpRelationFetcher {
	client: ApiClient,
}

impl HttpRelationFetcher {
	pub fn new(client: ApiClient) -> Self {
		Self { client }
	}
}

#[async_trait(?Send)]
impl RelationSource for HttpRelationFetcher {
	async fn fetch_relations(
		&self,
		subject_id: &str,
		kind: RelationKind,
		active_at: Option<PointInTime>,
	) -> ApiResult<Vec<Relation>> {
		let query = RelationQuery {
			name: kind.as_str(),
			active_at: active_at.map(to_active_at).unwrap_or_default(),
			related_entity_id: "",
			start_time: "",
			end_time: "",
			id: "",
		};
		let path = format!("/v1/entities/{subject_id}/relations");
		self.client.post(&path, &query).await
	}
}

/// An in-memory relation table, for offline use and tests.
///
/// Filters by `active_at` the way the service does, counts calls, and can be
/// told to fail specific `(subject, kind)` pairs.
#[derive(Default)]
pub struct StaticRelations {
	table: HashMap<(String, RelationKind), Vec<Relation>>,
	failing: HashSet<(String, RelationKind)>,
	calls: Cell<usize>,
	log: RefCell<Vec<(String, RelationKind)>>,
}

impl StaticRelations {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with(mut self, subject_id: &str, kind: RelationKind, relations: Vec<Relation>) -> Self {
		self.table
			.entry((subject_id.to_string(), kind))
			.or_default()
			.extend(relations);
		self
	}

	pub fn failing(mut self, subject_id: &str, kind: RelationKind) -> Self {
		self.failing.insert((subject_id.to_string(), kind));
		self
	}

	pub fn calls(&self) -> usize {
		self.calls.get()
	}

	pub fn requested(&self) -> Vec<(String, RelationKind)> {
		self.log.borrow().clone()
	}
}

#[async_trait(?Send)]
impl RelationSource for StaticRelations {
	async fn fetch_relations(
		&self,
		subject_id: &str,
		kind: RelationKind,
		active_at: Option<PointInTime>,
	) -> ApiResult<Vec<Relation>> {
		self.calls.set(self.calls.get() + 1);
		let key = (subject_id.to_string(), kind);
		self.log.borrow_mut().push(key.clone());
		if self.failing.contains(&key) {
			return Err(ApiError::Status {
				url: format!("memory://{subject_id}/{kind}"),
				status: 503,
			});
		}
		Ok(self
			.table
			.get(&key)
			.map(|rows| {
				rows.iter()
					.filter(|r| active_at.is_none_or(|date| r.is_active_at(date)))
					.cloned()
					.collect()
			})
			.unwrap_or_default())
	}
}
