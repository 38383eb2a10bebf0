//! Start-up loading of the reference dictionaries and the per-date views the
//! navigator consumes (who is head of state, which ministries exist).

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};

use super::client::ApiClient;
use super::relations::{RelationKind, RelationSource};
use crate::error::ApiResult;
use crate::model::resolver::{EntityRow, resolve_row};
use crate::model::{ActiveMinistry, Dictionaries, EntityKind, HeadOfState, PointInTime};

#[derive(Serialize)]
struct KindFilter<'a> {
	major: &'a str,
	minor: &'a str,
}

#[derive(Serialize)]
struct SearchQuery<'a> {
	kind: KindFilter<'a>,
}

#[derive(Deserialize)]
struct SearchResponse {
	#[serde(default)]
	body: Vec<EntityRow>,
}

async fn search(client: &ApiClient, major: &str, minor: &str) -> ApiResult<Vec<EntityRow>> {
	let query = SearchQuery {
		kind: KindFilter { major, minor },
	};
	let response: SearchResponse = client.post("/v1/entities/search", &query).await?;
	Ok(response.body)
}

/// Everything loaded once when the app starts.
#[derive(Clone, Debug, Default)]
pub struct Directory {
	pub dictionaries: Arc<Dictionaries>,
	/// Ordered by start of term.
	pub presidents: Vec<HeadOfState>,
}

impl Directory {
	/// Load ministries, departments, persons and the presidents timeline.
	pub async fn load(
		client: &ApiClient,
		relations: &dyn RelationSource,
		government_id: &str,
	) -> ApiResult<Self> {
		let (ministries, departments, persons) = futures::try_join!(
			search(client, "Organisation", "minister"),
			search(client, "Organisation", "department"),
			search(client, "Person", "citizen"),
		)?;

		let entities = ministries
			.into_iter()
			.map(|row| resolve_row(row, EntityKind::Ministry))
			.chain(
				departments
					.into_iter()
					.map(|row| resolve_row(row, EntityKind::Department)),
			)
			.chain(persons.into_iter().map(|row| resolve_row(row, EntityKind::Person)));
		let dictionaries = Dictionaries::from_entities(entities);

		let terms = relations
			.fetch_relations(government_id, RelationKind::President, None)
			.await?;
		let presidents = presidents_from(&dictionaries, &terms);

		log::info!(
			"directory loaded: {} ministries, {} departments, {} persons, {} presidents",
			dictionaries.ministries.len(),
			dictionaries.departments.len(),
			dictionaries.persons.len(),
			presidents.len()
		);
		Ok(Self {
			dictionaries: Arc::new(dictionaries),
			presidents,
		})
	}

	/// The president in office on `date`, if any.
	pub fn head_of_state_at(&self, date: PointInTime) -> Option<&HeadOfState> {
		self.presidents
			.iter()
			.rev()
			.find(|p| p.holds_office_on(date))
	}
}

fn presidents_from(dicts: &Dictionaries, terms: &[crate::model::Relation]) -> Vec<HeadOfState> {
	let mut presidents: Vec<HeadOfState> = terms
		.iter()
		.filter_map(|term| {
			let Some(person) = dicts.person(&term.related_entity_id) else {
				log::debug!("president {} not in person dictionary", term.related_entity_id);
				return None;
			};
			Some(HeadOfState {
				id: person.id.clone(),
				name: person.name.clone(),
				term_start: term.start_date(),
				term_end: term.end_time.map(|t| t.date_naive()),
			})
		})
		.collect();
	presidents.sort_by_key(|p| p.term_start);
	presidents
}

/// Ministries under `head` on `date`, each with its head minister resolved.
///
/// Fetch failures are logged and yield fewer (or no) ministries, never an error.
pub async fn active_ministries(
	head: &HeadOfState,
	date: PointInTime,
	dicts: &Dictionaries,
	source: &dyn RelationSource,
) -> Vec<ActiveMinistry> {
	let portfolios = match source
		.fetch_relations(&head.id, RelationKind::Minister, Some(date))
		.await
	{
		Ok(rows) => rows,
		Err(err) => {
			log::warn!("could not load ministries for {}: {err}", head.name);
			return Vec::new();
		}
	};

	// a portfolio listed twice is still one ministry
	let mut seen = HashSet::new();
	let ministries: Vec<_> = portfolios
		.iter()
		.filter_map(|r| dicts.ministry(&r.related_entity_id))
		.filter(|m| seen.insert(m.id.clone()))
		.collect();

	let heads = join_all(ministries.iter().map(|m| async move {
		match source
			.fetch_relations(&m.id, RelationKind::Appointed, Some(date))
			.await
		{
			Ok(rows) => rows
				.into_iter()
				.filter(|r| dicts.person(&r.related_entity_id).is_some())
				.max_by_key(|r| r.start_time),
			Err(err) => {
				log::warn!("could not load head minister of {}: {err}", m.name);
				None
			}
		}
	}))
	.await;

	let mut active: Vec<ActiveMinistry> = ministries
		.into_iter()
		.zip(heads)
		.map(|(ministry, appointment)| {
			let person = appointment
				.as_ref()
				.and_then(|r| dicts.person(&r.related_entity_id));
			ActiveMinistry {
				id: ministry.id.clone(),
				name: ministry.name.clone(),
				head_minister_id: person.map(|p| p.id.clone()),
				head_minister_name: person.map(|p| p.name.clone()),
				head_minister_since: appointment.as_ref().and_then(|r| r.start_date()),
			}
		})
		.collect();
	active.sort_by(|a, b| a.name.cmp(&b.name));
	active
}

#[cfg(test)]
mod tests {
	use futures::executor::block_on;
	use pretty_assertions::assert_eq;

	use super::*;
	use crate::api::StaticRelations;
	use crate::model::{Entity, Relation, parse_timestamp};

	fn entity(id: &str, name: &str, kind: EntityKind) -> Entity {
		Entity {
			id: id.into(),
			name: name.into(),
			kind,
			created: None,
			terminated: None,
		}
	}

	fn rel(target: &str, start: &str, end: Option<&str>) -> Relation {
		Relation {
			id: format!("r-{target}"),
			related_entity_id: target.into(),
			name: String::new(),
			start_time: parse_timestamp(start),
			end_time: end.and_then(parse_timestamp),
		}
	}

	fn day(s: &str) -> PointInTime {
		PointInTime::parse_from_str(s, "%Y-%m-%d").unwrap()
	}

	fn dicts() -> Dictionaries {
		Dictionaries::from_entities([
			entity("min-fin", "Finance", EntityKind::Ministry),
			entity("min-def", "Defence", EntityKind::Ministry),
			entity("p-pres", "President One", EntityKind::Person),
			entity("p-pres2", "President Two", EntityKind::Person),
			entity("p-fin", "Finance Minister", EntityKind::Person),
			entity("p-old", "Former Minister", EntityKind::Person),
		])
	}

	#[test]
	fn presidents_are_ordered_and_resolved() {
		let terms = vec![
			rel("p-pres2", "2022-07-21", None),
			rel("p-pres", "2019-11-18", Some("2022-07-14")),
			rel("p-ghost", "2010-01-01", Some("2015-01-01")),
		];
		let directory = Directory {
			presidents: presidents_from(&dicts(), &terms),
			dictionaries: Arc::new(dicts()),
		};
		assert_eq!(directory.presidents.len(), 2);
		assert_eq!(directory.presidents[0].id, "p-pres");
		assert_eq!(
			directory.head_of_state_at(day("2023-01-01")).map(|p| p.id.as_str()),
			Some("p-pres2")
		);
		assert_eq!(directory.head_of_state_at(day("2022-07-15")), None);
	}

	#[test]
	fn active_ministries_pick_latest_appointment() {
		let head = HeadOfState {
			id: "p-pres".into(),
			name: "President One".into(),
			term_start: Some(day("2019-11-18")),
			term_end: None,
		};
		let source = StaticRelations::new()
			.with(
				"p-pres",
				RelationKind::Minister,
				vec![rel("min-fin", "2019-11-18", None), rel("min-def", "2019-11-18", None)],
			)
			.with(
				"min-fin",
				RelationKind::Appointed,
				vec![rel("p-old", "2019-11-18", None), rel("p-fin", "2020-08-12", None)],
			);
		let active = block_on(active_ministries(&head, day("2021-01-01"), &dicts(), &source));

		assert_eq!(
			active,
			vec![
				ActiveMinistry {
					id: "min-def".into(),
					name: "Defence".into(),
					head_minister_id: None,
					head_minister_name: None,
					head_minister_since: None,
				},
				ActiveMinistry {
					id: "min-fin".into(),
					name: "Finance".into(),
					head_minister_id: Some("p-fin".into()),
					head_minister_name: Some("Finance Minister".into()),
					head_minister_since: Some(day("2020-08-12")),
				},
			]
		);
	}

	#[test]
	fn repeated_portfolios_collapse_to_one_ministry() {
		let head = HeadOfState {
			id: "p-pres".into(),
			name: "President One".into(),
			term_start: None,
			term_end: None,
		};
		let dicts = Dictionaries::from_entities([
			entity("min-a1", "Alpha", EntityKind::Ministry),
			entity("min-a2", "Alpha", EntityKind::Ministry),
		]);
		let source = StaticRelations::new().with(
			"p-pres",
			RelationKind::Minister,
			vec![
				rel("min-a1", "2019-11-18", None),
				rel("min-a2", "2019-11-18", None),
				rel("min-a1", "2020-01-01", None),
			],
		);
		let active = block_on(active_ministries(&head, day("2021-01-01"), &dicts, &source));
		let ids: Vec<_> = active.iter().map(|m| m.id.as_str()).collect();
		assert_eq!(ids, vec!["min-a1", "min-a2"]);
	}

	#[test]
	fn failed_portfolio_fetch_is_empty() {
		let head = HeadOfState {
			id: "p-pres".into(),
			name: "President One".into(),
			term_start: None,
			term_end: None,
		};
		let source = StaticRelations::new().failing("p-pres", RelationKind::Minister);
		let active = block_on(active_ministries(&head, day("2021-01-01"), &dicts(), &source));
		assert!(active.is_empty());
	}
}
