//! What the side panel lists, derived from the navigator's state.
//!
//! Nothing here fetches or caches: the full list for the current level is
//! already in memory, and the pager only limits how much of it is rendered.

use super::machine::LoadingFlags;
use crate::graph::{Focus, GraphNode, LevelData, NodeKind};
use crate::model::{ActiveMinistry, Dictionaries, Relation};

pub const PANEL_BATCH_SIZE: usize = 20;

/// Tabs shown inside an expanded ministry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PanelTab {
	#[default]
	Departments,
	Persons,
}

impl PanelTab {
	pub fn label(&self) -> &'static str {
		match self {
			PanelTab::Departments => "Departments",
			PanelTab::Persons => "People",
		}
	}
}

/// How many rows are revealed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PanelPager {
	visible: usize,
}

impl Default for PanelPager {
	fn default() -> Self {
		Self {
			visible: PANEL_BATCH_SIZE,
		}
	}
}

impl PanelPager {
	pub fn visible(&self) -> usize {
		self.visible
	}

	pub fn load_more(&mut self) {
		self.visible += PANEL_BATCH_SIZE;
	}

	pub fn reset(&mut self) {
		self.visible = PANEL_BATCH_SIZE;
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct PanelItem {
	pub id: String,
	pub name: String,
	pub kind: NodeKind,
	pub detail: Option<String>,
	pub is_synthetic: bool,
	pub selected: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PanelView {
	pub title: String,
	pub focus: Focus,
	/// `None` at the root, where there is a single list.
	pub tab: Option<PanelTab>,
	pub items: Vec<PanelItem>,
	pub total: usize,
	pub has_more: bool,
	pub loading: bool,
	pub selected_id: Option<String>,
}

pub struct PanelInput<'a> {
	pub focus: &'a Focus,
	pub selected: Option<&'a GraphNode>,
	pub tab: PanelTab,
	pub pager: PanelPager,
	pub loading: LoadingFlags,
	pub level: &'a LevelData,
	pub active_ministries: &'a [ActiveMinistry],
	pub dictionaries: &'a Dictionaries,
}

pub fn select_panel(input: &PanelInput<'_>) -> PanelView {
	let selected_id = input.selected.map(|n| n.id.clone());
	let (title, tab, loading, mut items) = match input.focus {
		Focus::Root => (
			"Ministries".to_string(),
			None,
			input.loading.root,
			ministry_items(input.active_ministries),
		),
		Focus::Ministry(ministry) => {
			let items = match input.tab {
				PanelTab::Departments => department_items(input, &ministry.id),
				PanelTab::Persons => person_items(input, &ministry.id),
			};
			(
				ministry.name.clone(),
				Some(input.tab),
				input.loading.ministry,
				items,
			)
		}
	};

	let total = items.len();
	items.truncate(input.pager.visible());
	if let Some(id) = &selected_id {
		for item in items.iter_mut() {
			item.selected = &item.id == id;
		}
	}

	PanelView {
		title,
		focus: input.focus.clone(),
		tab,
		has_more: total > items.len(),
		total,
		items,
		loading,
		selected_id,
	}
}

fn ministry_items(ministries: &[ActiveMinistry]) -> Vec<PanelItem> {
	let mut items: Vec<PanelItem> = ministries
		.iter()
		.map(|m| PanelItem {
			id: m.id.clone(),
			name: m.name.clone(),
			kind: NodeKind::Ministry,
			detail: m.head_minister_name.clone(),
			is_synthetic: false,
			selected: false,
		})
		.collect();
	items.sort_by(|a, b| a.name.cmp(&b.name));
	items
}

fn since(relation: &Relation) -> Option<String> {
	relation
		.start_date()
		.map(|d| format!("since {}", d.format("%Y-%m-%d")))
}

fn department_items(input: &PanelInput<'_>, ministry_id: &str) -> Vec<PanelItem> {
	input
		.level
		.index
		.minister_to_departments
		.get(ministry_id)
		.into_iter()
		.flatten()
		.filter_map(|r| {
			let dept = input.dictionaries.department(&r.related_entity_id)?;
			Some(PanelItem {
				id: dept.id.clone(),
				name: dept.name.clone(),
				kind: NodeKind::Department,
				detail: since(r),
				is_synthetic: false,
				selected: false,
			})
		})
		.collect()
}

fn person_items(input: &PanelInput<'_>, ministry_id: &str) -> Vec<PanelItem> {
	let appointed: Vec<PanelItem> = input
		.level
		.index
		.minister_to_persons
		.get(ministry_id)
		.into_iter()
		.flatten()
		.filter_map(|r| {
			let person = input.dictionaries.person(&r.related_entity_id)?;
			Some(PanelItem {
				id: person.id.clone(),
				name: person.name.clone(),
				kind: NodeKind::Person,
				detail: since(r),
				is_synthetic: false,
				selected: false,
			})
		})
		.collect();
	if !appointed.is_empty() {
		return appointed;
	}

	// unfilled portfolio: show whoever the builder put in as acting minister
	input
		.level
		.graph
		.nodes
		.iter()
		.filter(|n| n.kind == NodeKind::Person && n.is_synthetic)
		.map(|n| PanelItem {
			id: n.id.clone(),
			name: n.name.clone(),
			kind: NodeKind::Person,
			detail: Some("acting, head of state".into()),
			is_synthetic: true,
			selected: false,
		})
		.collect()
}
