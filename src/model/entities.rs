use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// The date the timeline is looking at.
pub type PointInTime = NaiveDate;

/// What kind of organisation or person a dictionary entry describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
	Ministry,
	Department,
	Person,
}

/// A display-ready entity from one of the preloaded dictionaries.
#[derive(Clone, Debug, PartialEq)]
pub struct Entity {
	pub id: String,
	pub name: String,
	pub kind: EntityKind,
	pub created: Option<DateTime<Utc>>,
	pub terminated: Option<DateTime<Utc>>,
}

/// A timestamped association between two entities.
///
/// `end_time == None` is an open interval: the relation is still in force.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
	#[serde(default)]
	pub id: String,
	pub related_entity_id: String,
	#[serde(default)]
	pub name: String,
	#[serde(default, deserialize_with = "lenient_time")]
	pub start_time: Option<DateTime<Utc>>,
	#[serde(default, deserialize_with = "lenient_time")]
	pub end_time: Option<DateTime<Utc>>,
}

impl Relation {
	/// Whether the relation holds on `date`. Start is inclusive, end exclusive.
	pub fn is_active_at(&self, date: PointInTime) -> bool {
		let day = date.and_hms_opt(0, 0, 0).map(|t| t.and_utc());
		let Some(day) = day else {
			return false;
		};
		let started = self.start_time.is_none_or(|start| start <= day);
		let open = self.end_time.is_none_or(|end| end > day);
		started && open
	}

	/// Calendar day the relation began on, if known.
	pub fn start_date(&self) -> Option<PointInTime> {
		self.start_time.map(|t| t.date_naive())
	}
}

/// The API sends `""` for missing timestamps, so treat blanks and junk as absent.
fn lenient_time<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
	D: serde::Deserializer<'de>,
{
	let raw = Option::<String>::deserialize(deserializer)?;
	Ok(raw.as_deref().and_then(parse_timestamp))
}

/// Parse an RFC 3339 timestamp or a bare `YYYY-MM-DD` date.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
	let raw = raw.trim();
	if raw.is_empty() {
		return None;
	}
	if let Ok(t) = DateTime::parse_from_rfc3339(raw) {
		return Some(t.with_timezone(&Utc));
	}
	NaiveDate::parse_from_str(raw, "%Y-%m-%d")
		.ok()
		.and_then(|d| d.and_hms_opt(0, 0, 0))
		.map(|t| t.and_utc())
}

/// Wire form of a point in time, e.g. `2019-11-18T00:00:00Z`.
pub fn to_active_at(date: PointInTime) -> String {
	format!("{}T00:00:00Z", date.format("%Y-%m-%d"))
}

/// A head of state and their term of office.
#[derive(Clone, Debug, PartialEq)]
pub struct HeadOfState {
	pub id: String,
	pub name: String,
	pub term_start: Option<PointInTime>,
	pub term_end: Option<PointInTime>,
}

impl HeadOfState {
	/// Whether `date` falls in the term. An open term runs to the present.
	pub fn holds_office_on(&self, date: PointInTime) -> bool {
		self.term_start.is_none_or(|s| s <= date) && self.term_end.is_none_or(|e| e > date)
	}
}

/// A ministry that exists at the selected point in time, with its head
/// minister already resolved by the directory loader.
#[derive(Clone, Debug, PartialEq)]
pub struct ActiveMinistry {
	pub id: String,
	pub name: String,
	pub head_minister_id: Option<String>,
	pub head_minister_name: Option<String>,
	pub head_minister_since: Option<PointInTime>,
}

/// All ministries, departments and persons, loaded once at start-up.
#[derive(Clone, Debug, Default)]
pub struct Dictionaries {
	pub ministries: HashMap<String, Entity>,
	pub departments: HashMap<String, Entity>,
	pub persons: HashMap<String, Entity>,
}

impl Dictionaries {
	/// Build the three maps from a flat list of entities.
	pub fn from_entities(entities: impl IntoIterator<Item = Entity>) -> Self {
		let mut dicts = Self::default();
		for entity in entities {
			let map = match entity.kind {
				EntityKind::Ministry => &mut dicts.ministries,
				EntityKind::Department => &mut dicts.departments,
				EntityKind::Person => &mut dicts.persons,
			};
			map.insert(entity.id.clone(), entity);
		}
		dicts
	}

	pub fn ministry(&self, id: &str) -> Option<&Entity> {
		self.ministries.get(id)
	}

	pub fn department(&self, id: &str) -> Option<&Entity> {
		self.departments.get(id)
	}

	pub fn person(&self, id: &str) -> Option<&Entity> {
		self.persons.get(id)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn date(s: &str) -> PointInTime {
		NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
	}

	fn relation(start: Option<&str>, end: Option<&str>) -> Relation {
		Relation {
			id: "r".into(),
			related_entity_id: "x".into(),
			name: "AS_APPOINTED".into(),
			start_time: start.and_then(parse_timestamp),
			end_time: end.and_then(parse_timestamp),
		}
	}

	#[test]
	fn open_relation_is_active_after_start() {
		let r = relation(Some("2020-01-01T00:00:00Z"), None);
		assert!(r.is_active_at(date("2024-05-01")));
		assert!(r.is_active_at(date("2020-01-01")));
		assert!(!r.is_active_at(date("2019-12-31")));
	}

	#[test]
	fn closed_relation_ends_exclusively() {
		let r = relation(Some("2020-01-01"), Some("2021-01-01"));
		assert!(r.is_active_at(date("2020-12-31")));
		assert!(!r.is_active_at(date("2021-01-01")));
	}

	#[test]
	fn blank_timestamps_deserialize_as_absent() {
		let r: Relation = serde_json::from_str(
			r#"{"id":"1","relatedEntityId":"dep-1","name":"AS_DEPARTMENT","startTime":"2019-11-18T00:00:00Z","endTime":""}"#,
		)
		.unwrap();
		assert_eq!(r.end_time, None);
		assert_eq!(r.start_date(), Some(date("2019-11-18")));
	}

	#[test]
	fn active_at_wire_format() {
		assert_eq!(to_active_at(date("2022-07-22")), "2022-07-22T00:00:00Z");
	}

	#[test]
	fn head_of_state_term() {
		let hos = HeadOfState {
			id: "p1".into(),
			name: "A".into(),
			term_start: Some(date("2019-11-18")),
			term_end: Some(date("2022-07-14")),
		};
		assert!(hos.holds_office_on(date("2020-01-01")));
		assert!(!hos.holds_office_on(date("2022-07-14")));
	}
}
