//! Builds the node/link set for one level of the drill-down.
//!
//! The root level is assembled from data the directory loader already has;
//! a ministry level costs two concurrent relation fetches. Either way the
//! output is a pure function of the focus, the filter and the context.

use std::collections::HashMap;
use std::sync::Arc;

use super::types::{
	GROUP_GOVERNMENT, GROUP_MINISTRY, GROUP_MINISTRY_LEAF, GROUP_ROOT_LEAF, GraphData, GraphLink,
	GraphNode, LevelData, LevelIndex, LevelTag, NodeKind,
};
use crate::api::{RelationKind, RelationSource};
use crate::model::{ActiveMinistry, Dictionaries, HeadOfState, PointInTime, Relation};

/// The navigator's expansion level.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum Focus {
	#[default]
	Root,
	Ministry(GraphNode),
}

impl Focus {
	pub fn ministry_id(&self) -> Option<&str> {
		match self {
			Focus::Root => None,
			Focus::Ministry(node) => Some(&node.id),
		}
	}

	pub fn is_root(&self) -> bool {
		matches!(self, Focus::Root)
	}
}

/// Which persons the root level shows next to the ministries.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LevelFilter {
	#[default]
	None,
	/// Ministers whose appointment starts on the selected date.
	NewlyAppointed,
	/// Ministries held by the head of state personally.
	HeadedByHeadOfState,
}

impl LevelFilter {
	pub const ALL: [LevelFilter; 3] = [
		LevelFilter::None,
		LevelFilter::NewlyAppointed,
		LevelFilter::HeadedByHeadOfState,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			LevelFilter::None => "none",
			LevelFilter::NewlyAppointed => "new-person",
			LevelFilter::HeadedByHeadOfState => "head-of-state",
		}
	}

	pub fn label(&self) -> &'static str {
		match self {
			LevelFilter::None => "Ministries only",
			LevelFilter::NewlyAppointed => "Newly appointed ministers",
			LevelFilter::HeadedByHeadOfState => "Held by the president",
		}
	}

	pub fn parse(raw: &str) -> Self {
		Self::ALL
			.into_iter()
			.find(|f| f.as_str() == raw)
			.unwrap_or_default()
	}
}

/// The externally owned inputs a level is built from.
#[derive(Clone, Debug)]
pub struct LevelContext {
	pub point_in_time: PointInTime,
	pub head_of_state: HeadOfState,
	/// Ministries active at `point_in_time`, head ministers resolved.
	pub active_ministries: Vec<ActiveMinistry>,
	pub dictionaries: Arc<Dictionaries>,
}

impl LevelContext {
	/// Id of the synthetic government node for the current head of state.
	pub fn government_id(&self) -> String {
		format!("government:{}", self.head_of_state.id)
	}

	fn government_node(&self) -> GraphNode {
		GraphNode::new(
			self.government_id(),
			self.head_of_state.name.clone(),
			NodeKind::Government,
			GROUP_GOVERNMENT,
		)
	}

	/// The head of state standing in for a missing appointee.
	pub fn acting_minister(&self, group: u32) -> GraphNode {
		GraphNode::new(
			self.head_of_state.id.clone(),
			self.head_of_state.name.clone(),
			NodeKind::Person,
			group,
		)
		.synthetic()
	}
}

/// Build the level for `focus`.
///
/// Infallible: a failed fetch contributes nothing for its relation kind.
pub async fn build_level(
	focus: &Focus,
	filter: LevelFilter,
	ctx: &LevelContext,
	source: &dyn RelationSource,
) -> LevelData {
	let mut level = match focus {
		Focus::Root => build_root(filter, ctx),
		Focus::Ministry(ministry) => build_ministry(ministry, ctx, source).await,
	};
	level.graph.retain_valid_links();
	level
}

#[derive(Default)]
struct LevelAssembly {
	graph: GraphData,
	/// Node id → position in `graph.nodes`.
	seen: HashMap<String, usize>,
}

impl LevelAssembly {
	/// First node per id wins, except that a real node replaces a synthetic
	/// one with the same id.
	fn push_node(&mut self, node: GraphNode) {
		match self.seen.get(&node.id) {
			None => {
				self.seen.insert(node.id.clone(), self.graph.nodes.len());
				self.graph.nodes.push(node);
			}
			Some(&at) if self.graph.nodes[at].is_synthetic && !node.is_synthetic => {
				self.graph.nodes[at] = node;
			}
			Some(_) => {}
		}
	}

	fn push_link(&mut self, source: &str, target: &str, tag: LevelTag) {
		self.graph.links.push(GraphLink::new(source, target, tag));
	}
}

fn same_person(a: &str, b: &str) -> bool {
	a.trim().eq_ignore_ascii_case(b.trim())
}

fn build_root(filter: LevelFilter, ctx: &LevelContext) -> LevelData {
	let mut asm = LevelAssembly::default();
	let government = ctx.government_node();
	let gov_id = government.id.clone();
	asm.push_node(government);

	for ministry in &ctx.active_ministries {
		asm.push_node(GraphNode::new(
			ministry.id.clone(),
			ministry.name.clone(),
			NodeKind::Ministry,
			GROUP_MINISTRY,
		));
		asm.push_link(&gov_id, &ministry.id, LevelTag::ToMinistry);

		let person = match filter {
			LevelFilter::None => None,
			LevelFilter::NewlyAppointed => newly_appointed(ministry, ctx.point_in_time),
			LevelFilter::HeadedByHeadOfState => held_by_head_of_state(ministry, ctx),
		};
		if let Some(person) = person {
			asm.push_link(&ministry.id, &person.id, LevelTag::ToPerson);
			asm.push_node(person);
		}
	}

	LevelData {
		graph: asm.graph,
		index: LevelIndex::default(),
	}
}

fn newly_appointed(ministry: &ActiveMinistry, date: PointInTime) -> Option<GraphNode> {
	if ministry.head_minister_since != Some(date) {
		return None;
	}
	let id = ministry.head_minister_id.as_ref()?;
	let name = ministry.head_minister_name.clone().unwrap_or_else(|| id.clone());
	Some(GraphNode::new(id.clone(), name, NodeKind::Person, GROUP_ROOT_LEAF))
}

/// No named minister is checked before the name comparison, so an unfilled
/// portfolio always renders as the synthetic acting head of state.
fn held_by_head_of_state(ministry: &ActiveMinistry, ctx: &LevelContext) -> Option<GraphNode> {
	match ministry.head_minister_name.as_deref() {
		None => Some(ctx.acting_minister(GROUP_ROOT_LEAF)),
		Some(name) if name.trim().is_empty() => Some(ctx.acting_minister(GROUP_ROOT_LEAF)),
		Some(name) if same_person(name, &ctx.head_of_state.name) => {
			let id = ministry
				.head_minister_id
				.clone()
				.unwrap_or_else(|| ctx.head_of_state.id.clone());
			Some(GraphNode::new(id, name, NodeKind::Person, GROUP_ROOT_LEAF))
		}
		Some(_) => None,
	}
}

async fn build_ministry(
	ministry: &GraphNode,
	ctx: &LevelContext,
	source: &dyn RelationSource,
) -> LevelData {
	let (departments, persons) = futures::join!(
		fetch_or_empty(source, &ministry.id, RelationKind::Department, ctx.point_in_time),
		fetch_or_empty(source, &ministry.id, RelationKind::Appointed, ctx.point_in_time),
	);

	let dicts = &ctx.dictionaries;
	let mut asm = LevelAssembly::default();
	let mut index = LevelIndex::default();
	let government = ctx.government_node();
	let gov_id = government.id.clone();
	asm.push_node(government);
	asm.push_node(GraphNode::new(
		ministry.id.clone(),
		ministry.name.clone(),
		NodeKind::Ministry,
		GROUP_MINISTRY,
	));
	asm.push_link(&gov_id, &ministry.id, LevelTag::ToMinistry);

	let mut resolved_departments = Vec::new();
	for relation in departments {
		let Some(department) = dicts.department(&relation.related_entity_id) else {
			log::debug!("dropping unknown department {}", relation.related_entity_id);
			continue;
		};
		asm.push_node(GraphNode::new(
			department.id.clone(),
			department.name.clone(),
			NodeKind::Department,
			GROUP_MINISTRY_LEAF,
		));
		asm.push_link(&ministry.id, &department.id, LevelTag::ToDepartment);
		resolved_departments.push(relation);
	}

	let mut resolved_persons = Vec::new();
	for relation in persons {
		let Some(person) = dicts.person(&relation.related_entity_id) else {
			log::debug!("dropping unknown person {}", relation.related_entity_id);
			continue;
		};
		asm.push_node(GraphNode::new(
			person.id.clone(),
			person.name.clone(),
			NodeKind::Person,
			GROUP_MINISTRY_LEAF,
		));
		asm.push_link(&ministry.id, &person.id, LevelTag::ToPerson);
		resolved_persons.push(relation);
	}

	if resolved_persons.is_empty() {
		let acting = ctx.acting_minister(GROUP_MINISTRY_LEAF);
		log::debug!("{} has no appointee, showing {}", ministry.name, acting.name);
		asm.push_link(&ministry.id, &acting.id, LevelTag::ToPerson);
		asm.push_node(acting);
	}

	index
		.minister_to_departments
		.insert(ministry.id.clone(), resolved_departments);
	index
		.minister_to_persons
		.insert(ministry.id.clone(), resolved_persons);

	LevelData {
		graph: asm.graph,
		index,
	}
}

async fn fetch_or_empty(
	source: &dyn RelationSource,
	subject_id: &str,
	kind: RelationKind,
	date: PointInTime,
) -> Vec<Relation> {
	match source.fetch_relations(subject_id, kind, Some(date)).await {
		Ok(rows) => rows,
		Err(err) => {
			log::warn!("{kind} fetch for {subject_id} failed: {err}");
			Vec::new()
		}
	}
}
