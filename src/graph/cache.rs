use std::collections::HashMap;

use super::level::{Focus, LevelFilter};
use super::types::LevelData;
use crate::model::PointInTime;

const ROOT_KEY: &str = "root";

/// Identity of a built level.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LevelKey {
	pub focus: String,
	pub point_in_time: PointInTime,
	pub filter: LevelFilter,
}

impl LevelKey {
	pub fn new(focus: &Focus, point_in_time: PointInTime, filter: LevelFilter) -> Self {
		Self {
			focus: focus.ministry_id().unwrap_or(ROOT_KEY).to_string(),
			point_in_time,
			filter,
		}
	}
}

/// Built levels, owned by the navigator. Cleared when the leader or date changes.
#[derive(Debug, Default)]
pub struct LevelCache {
	entries: HashMap<LevelKey, LevelData>,
}

impl LevelCache {
	pub fn get(&self, key: &LevelKey) -> Option<&LevelData> {
		self.entries.get(key)
	}

	pub fn insert(&mut self, key: LevelKey, data: LevelData) {
		self.entries.insert(key, data);
	}

	pub fn clear(&mut self) {
		self.entries.clear();
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::graph::{GROUP_MINISTRY, GraphNode, NodeKind};

	#[test]
	fn keys_separate_focus_date_and_filter() {
		let date = PointInTime::from_ymd_opt(2021, 1, 1).unwrap();
		let later = PointInTime::from_ymd_opt(2022, 1, 1).unwrap();
		let finance = Focus::Ministry(GraphNode::new("min-fin", "Finance", NodeKind::Ministry, GROUP_MINISTRY));

		let root = LevelKey::new(&Focus::Root, date, LevelFilter::None);
		assert_eq!(root.focus, "root");
		assert_ne!(root, LevelKey::new(&finance, date, LevelFilter::None));
		assert_ne!(root, LevelKey::new(&Focus::Root, later, LevelFilter::None));
		assert_ne!(root, LevelKey::new(&Focus::Root, date, LevelFilter::NewlyAppointed));

		let mut cache = LevelCache::default();
		cache.insert(root.clone(), LevelData::default());
		assert!(cache.get(&root).is_some());
		cache.clear();
		assert!(cache.is_empty());
	}
}
