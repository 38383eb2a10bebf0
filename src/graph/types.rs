use std::collections::{HashMap, HashSet};

use crate::model::Relation;

/// Layer indices used for layout and colouring.
pub const GROUP_GOVERNMENT: u32 = 1;
pub const GROUP_MINISTRY: u32 = 2;
pub const GROUP_ROOT_LEAF: u32 = 3;
pub const GROUP_MINISTRY_LEAF: u32 = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
	Government,
	Ministry,
	Department,
	Person,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GraphNode {
	pub id: String,
	pub name: String,
	pub kind: NodeKind,
	pub group: u32,
	/// Fabricated as a fallback rather than read from a relation.
	pub is_synthetic: bool,
}

impl GraphNode {
	pub fn new(id: impl Into<String>, name: impl Into<String>, kind: NodeKind, group: u32) -> Self {
		Self {
			id: id.into(),
			name: name.into(),
			kind,
			group,
			is_synthetic: false,
		}
	}

	pub fn synthetic(mut self) -> Self {
		self.is_synthetic = true;
		self
	}
}

/// Edge category; each has its own preferred length in the layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LevelTag {
	ToMinistry,
	ToDepartment,
	ToPerson,
}

impl LevelTag {
	/// Target link length in world units.
	pub fn target_distance(&self) -> f64 {
		match self {
			LevelTag::ToMinistry => 120.0,
			LevelTag::ToDepartment => 60.0,
			LevelTag::ToPerson => 45.0,
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct GraphLink {
	pub source: String,
	pub target: String,
	pub level_tag: LevelTag,
}

impl GraphLink {
	pub fn new(source: impl Into<String>, target: impl Into<String>, level_tag: LevelTag) -> Self {
		Self {
			source: source.into(),
			target: target.into(),
			level_tag,
		}
	}
}

/// Nodes and links handed to the renderer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GraphData {
	pub nodes: Vec<GraphNode>,
	pub links: Vec<GraphLink>,
}

impl GraphData {
	pub fn node(&self, id: &str) -> Option<&GraphNode> {
		self.nodes.iter().find(|n| n.id == id)
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	/// Drop links whose endpoints are not in the node set.
	pub fn retain_valid_links(&mut self) {
		let ids: HashSet<&str> = self.nodes.iter().map(|n| n.id.as_str()).collect();
		let before = self.links.len();
		self.links
			.retain(|l| ids.contains(l.source.as_str()) && ids.contains(l.target.as_str()));
		if self.links.len() != before {
			log::debug!("dropped {} dangling links", before - self.links.len());
		}
	}
}

/// Ministry id → the relation records behind its departments and persons.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LevelIndex {
	pub minister_to_departments: HashMap<String, Vec<Relation>>,
	pub minister_to_persons: HashMap<String, Vec<Relation>>,
}

/// Everything built for one level.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LevelData {
	pub graph: GraphData,
	pub index: LevelIndex,
}
