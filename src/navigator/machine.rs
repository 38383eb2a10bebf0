//! The drill-down state machine.
//!
//! Owns the focus, the selected leaf, the visible level and the level cache.
//! Transitions are decided synchronously; rebuilding a level is split into
//! `begin_rebuild` (hands out a ticket) and `complete_rebuild` (applies the
//! result only if the ticket is still the newest one).

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use crate::api::RelationSource;
use crate::graph::{
	Focus, GraphNode, LevelCache, LevelContext, LevelData, LevelFilter, LevelKey, NodeKind,
	build_level,
};

/// What a click (or back action) did to the navigator.
#[derive(Clone, Debug, PartialEq)]
pub enum Transition {
	/// Root → ministry.
	Expand(GraphNode),
	/// Ministry → root.
	Collapse,
	/// Ministry → a different ministry.
	Replace(GraphNode),
	/// Leaf recorded as selected; level unchanged.
	Select(GraphNode),
	/// Click refused while the visible level is loading, or nothing to do.
	Ignored,
}

impl Transition {
	/// Whether the focus changed and a level rebuild is due.
	pub fn changes_focus(&self) -> bool {
		matches!(
			self,
			Transition::Expand(_) | Transition::Collapse | Transition::Replace(_)
		)
	}

	/// The node the camera should travel to afterwards, if any.
	pub fn camera_target(&self) -> Option<&GraphNode> {
		match self {
			Transition::Expand(node) | Transition::Replace(node) | Transition::Select(node) => {
				Some(node)
			}
			Transition::Collapse | Transition::Ignored => None,
		}
	}
}

/// Which level a rebuild produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LevelKind {
	Root,
	Ministry,
}

impl LevelKind {
	fn of(focus: &Focus) -> Self {
		match focus {
			Focus::Root => LevelKind::Root,
			Focus::Ministry(_) => LevelKind::Ministry,
		}
	}
}

/// Per-level-kind loading indicators.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadingFlags {
	pub root: bool,
	pub ministry: bool,
}

impl LoadingFlags {
	pub fn any(&self) -> bool {
		self.root || self.ministry
	}

	fn for_kind(&self, kind: LevelKind) -> bool {
		match kind {
			LevelKind::Root => self.root,
			LevelKind::Ministry => self.ministry,
		}
	}
}

/// A dispatched rebuild. Carries everything the builder needs so the build
/// can run without holding a borrow of the navigator.
#[derive(Clone, Debug)]
pub struct RebuildTicket {
	generation: u64,
	epoch: u64,
	kind: LevelKind,
	key: LevelKey,
	pub focus: Focus,
	pub filter: LevelFilter,
	pub context: Arc<LevelContext>,
}

impl RebuildTicket {
	pub fn generation(&self) -> u64 {
		self.generation
	}

	pub fn kind(&self) -> LevelKind {
		self.kind
	}
}

pub enum RebuildStart {
	/// Served from the cache; the level is already in place.
	Ready,
	/// Needs a build; run it and hand the result to `complete_rebuild`.
	Pending(RebuildTicket),
}

#[derive(Default)]
pub struct Navigator {
	focus: Focus,
	selected: Option<GraphNode>,
	filter: LevelFilter,
	context: Option<Arc<LevelContext>>,
	level: LevelData,
	cache: LevelCache,
	/// Bumped for every rebuild; a ticket with an older value is stale.
	generation: u64,
	/// Bumped on reset; results from an older epoch are not cached either.
	epoch: u64,
	pending: Option<(u64, LevelKind)>,
}

impl Navigator {
	pub fn new(filter: LevelFilter) -> Self {
		Self {
			filter,
			..Self::default()
		}
	}

	pub fn focus(&self) -> &Focus {
		&self.focus
	}

	pub fn selected(&self) -> Option<&GraphNode> {
		self.selected.as_ref()
	}

	pub fn filter(&self) -> LevelFilter {
		self.filter
	}

	pub fn level(&self) -> &LevelData {
		&self.level
	}

	pub fn cached_levels(&self) -> usize {
		self.cache.len()
	}

	pub fn loading(&self) -> LoadingFlags {
		match self.pending {
			Some((_, LevelKind::Root)) => LoadingFlags {
				root: true,
				ministry: false,
			},
			Some((_, LevelKind::Ministry)) => LoadingFlags {
				root: false,
				ministry: true,
			},
			None => LoadingFlags::default(),
		}
	}

	/// Node clicks are refused while the visible level is being rebuilt.
	pub fn accepts_clicks(&self) -> bool {
		!self.loading().for_kind(LevelKind::of(&self.focus))
	}

	/// New leader or date: back to the root, nothing cached survives.
	pub fn reset(&mut self, context: impl Into<Arc<LevelContext>>) {
		let context = context.into();
		log::info!(
			"navigator reset to {} on {}",
			context.head_of_state.name,
			context.point_in_time
		);
		self.context = Some(context);
		self.focus = Focus::Root;
		self.selected = None;
		self.level = LevelData::default();
		self.cache.clear();
		self.epoch += 1;
		self.generation += 1;
		self.pending = None;
	}

	/// Switch the root-level person filter. Returns true when the visible
	/// level depends on it and must be rebuilt.
	pub fn set_filter(&mut self, filter: LevelFilter) -> bool {
		if self.filter == filter {
			return false;
		}
		self.filter = filter;
		self.focus.is_root()
	}

	/// Apply a node click.
	pub fn activate(&mut self, node: &GraphNode) -> Transition {
		if !self.accepts_clicks() {
			log::debug!("ignoring click on {} while loading", node.id);
			return Transition::Ignored;
		}
		let transition = match (&self.focus, node.kind) {
			(Focus::Root, NodeKind::Ministry) => Transition::Expand(node.clone()),
			(Focus::Ministry(current), NodeKind::Ministry) if current.id == node.id => {
				Transition::Collapse
			}
			(Focus::Ministry(_), NodeKind::Ministry) => Transition::Replace(node.clone()),
			(Focus::Ministry(_), NodeKind::Government) => Transition::Collapse,
			(_, NodeKind::Department | NodeKind::Person | NodeKind::Government) => {
				Transition::Select(node.clone())
			}
		};
		self.apply(&transition);
		transition
	}

	/// The explicit "back" action.
	pub fn back(&mut self) -> Transition {
		if self.focus.is_root() {
			return Transition::Ignored;
		}
		self.apply(&Transition::Collapse);
		Transition::Collapse
	}

	/// Jump straight to `focus`, e.g. from a deep link.
	pub fn focus_on(&mut self, focus: Focus) {
		self.focus = focus;
		self.selected = None;
	}

	fn apply(&mut self, transition: &Transition) {
		match transition {
			Transition::Expand(node) | Transition::Replace(node) => {
				log::info!("expanding {}", node.name);
				self.focus = Focus::Ministry(node.clone());
				self.selected = None;
			}
			Transition::Collapse => {
				log::info!("collapsing to root");
				self.focus = Focus::Root;
				self.selected = None;
			}
			Transition::Select(node) => self.selected = Some(node.clone()),
			Transition::Ignored => {}
		}
	}

	/// Start rebuilding the level for the current focus.
	///
	/// The previous level is discarded immediately so a stale level is never
	/// shown while the new one loads. Returns `None` before the first reset.
	pub fn begin_rebuild(&mut self) -> Option<RebuildStart> {
		let context = self.context.clone()?;
		let key = LevelKey::new(&self.focus, context.point_in_time, self.filter);
		let kind = LevelKind::of(&self.focus);
		self.generation += 1;

		if let Some(cached) = self.cache.get(&key) {
			log::debug!("level {} served from cache", key.focus);
			self.level = cached.clone();
			self.pending = None;
			return Some(RebuildStart::Ready);
		}

		self.level = LevelData::default();
		self.pending = Some((self.generation, kind));
		Some(RebuildStart::Pending(RebuildTicket {
			generation: self.generation,
			epoch: self.epoch,
			kind,
			key,
			focus: self.focus.clone(),
			filter: self.filter,
			context,
		}))
	}

	/// Apply a finished build. Returns false (and changes nothing visible)
	/// when a newer rebuild or reset has happened since the ticket was issued.
	pub fn complete_rebuild(&mut self, ticket: RebuildTicket, data: LevelData) -> bool {
		if ticket.epoch == self.epoch {
			self.cache.insert(ticket.key.clone(), data.clone());
		}
		if ticket.generation != self.generation {
			log::debug!(
				"discarding stale level {} (generation {} < {})",
				ticket.key.focus,
				ticket.generation,
				self.generation
			);
			return false;
		}
		self.level = data;
		self.pending = None;
		true
	}

	/// The build for `generation` will never complete; drop its loading flag.
	pub fn abandon(&mut self, generation: u64) {
		if matches!(self.pending, Some((g, _)) if g == generation) {
			self.pending = None;
		}
	}
}

/// Clears the loading flag if a rebuild future is dropped before finishing.
struct LoadingGuard {
	navigator: Rc<RefCell<Navigator>>,
	generation: Option<u64>,
}

impl LoadingGuard {
	fn disarm(&mut self) {
		self.generation = None;
	}
}

impl Drop for LoadingGuard {
	fn drop(&mut self) {
		let Some(generation) = self.generation else {
			return;
		};
		if let Ok(mut nav) = self.navigator.try_borrow_mut() {
			nav.abandon(generation);
		}
	}
}

/// Build the level for `ticket` and hand it back to the navigator.
///
/// Returns whether the result was applied.
pub async fn run_rebuild(
	navigator: Rc<RefCell<Navigator>>,
	ticket: RebuildTicket,
	source: Rc<dyn RelationSource>,
) -> bool {
	let mut guard = LoadingGuard {
		navigator: navigator.clone(),
		generation: Some(ticket.generation),
	};
	let data = build_level(
		&ticket.focus,
		ticket.filter,
		&ticket.context,
		source.as_ref(),
	)
	.await;
	guard.disarm();
	navigator.borrow_mut().complete_rebuild(ticket, data)
}

#[cfg(test)]
mod tests {
	use futures::executor::block_on;
	use pretty_assertions::assert_eq;

	use super::*;
	use crate::api::StaticRelations;
	use crate::graph::{GROUP_MINISTRY, GROUP_MINISTRY_LEAF};
	use crate::model::{ActiveMinistry, Dictionaries, HeadOfState, PointInTime};

	fn ministry_node(id: &str) -> GraphNode {
		GraphNode::new(id, id.to_uppercase(), NodeKind::Ministry, GROUP_MINISTRY)
	}

	fn context() -> LevelContext {
		let day = PointInTime::from_ymd_opt(2021, 6, 1).unwrap();
		LevelContext {
			point_in_time: day,
			head_of_state: HeadOfState {
				id: "p-pres".into(),
				name: "President".into(),
				term_start: None,
				term_end: None,
			},
			active_ministries: ["min-a", "min-b"]
				.into_iter()
				.map(|id| ActiveMinistry {
					id: id.into(),
					name: id.to_uppercase(),
					head_minister_id: None,
					head_minister_name: None,
					head_minister_since: None,
				})
				.collect(),
			dictionaries: Arc::new(Dictionaries::default()),
		}
	}

	fn ready_navigator() -> Navigator {
		let mut nav = Navigator::new(LevelFilter::None);
		nav.reset(context());
		nav
	}

	#[test]
	fn transition_table() {
		let mut nav = ready_navigator();
		let a = ministry_node("min-a");
		let b = ministry_node("min-b");
		let dept = GraphNode::new("dep-1", "Dept", NodeKind::Department, GROUP_MINISTRY_LEAF);

		assert_eq!(nav.activate(&a), Transition::Expand(a.clone()));
		assert_eq!(nav.focus(), &Focus::Ministry(a.clone()));

		assert_eq!(nav.activate(&dept), Transition::Select(dept.clone()));
		assert_eq!(nav.focus(), &Focus::Ministry(a.clone()));
		assert_eq!(nav.selected(), Some(&dept));

		assert_eq!(nav.activate(&b), Transition::Replace(b.clone()));
		assert_eq!(nav.selected(), None);

		assert_eq!(nav.activate(&b), Transition::Collapse);
		assert_eq!(nav.focus(), &Focus::Root);

		assert_eq!(nav.back(), Transition::Ignored);
		nav.activate(&a);
		assert_eq!(nav.back(), Transition::Collapse);
		assert!(nav.focus().is_root());
	}

	#[test]
	fn government_click_at_ministry_level_goes_back() {
		let mut nav = ready_navigator();
		nav.activate(&ministry_node("min-a"));
		let gov = GraphNode::new("government:p-pres", "President", NodeKind::Government, 1);
		assert_eq!(nav.activate(&gov), Transition::Collapse);
		assert_eq!(nav.activate(&gov), Transition::Select(gov.clone()));
	}

	#[test]
	fn clicks_are_refused_while_visible_level_loads() {
		let mut nav = ready_navigator();
		nav.activate(&ministry_node("min-a"));
		let Some(RebuildStart::Pending(ticket)) = nav.begin_rebuild() else {
			panic!("expected a pending rebuild");
		};
		assert_eq!(
			nav.loading(),
			LoadingFlags {
				root: false,
				ministry: true
			}
		);
		assert!(!nav.accepts_clicks());
		assert_eq!(nav.activate(&ministry_node("min-b")), Transition::Ignored);

		assert!(nav.complete_rebuild(ticket, LevelData::default()));
		assert!(nav.accepts_clicks());
		assert!(!nav.loading().any());
	}

	#[test]
	fn stale_result_is_discarded() {
		let mut nav = ready_navigator();
		nav.activate(&ministry_node("min-a"));
		let Some(RebuildStart::Pending(first)) = nav.begin_rebuild() else {
			panic!("expected a pending rebuild");
		};
		nav.focus_on(Focus::Ministry(ministry_node("min-b")));
		let Some(RebuildStart::Pending(second)) = nav.begin_rebuild() else {
			panic!("expected a pending rebuild");
		};

		let mut b_level = LevelData::default();
		b_level.graph.nodes.push(ministry_node("min-b"));
		let mut a_level = LevelData::default();
		a_level.graph.nodes.push(ministry_node("min-a"));

		assert!(nav.complete_rebuild(second, b_level.clone()));
		assert!(!nav.complete_rebuild(first, a_level));
		assert_eq!(nav.level(), &b_level);
		assert_eq!(nav.focus(), &Focus::Ministry(ministry_node("min-b")));
	}

	#[test]
	fn cached_levels_are_served_synchronously() {
		let nav = Rc::new(RefCell::new(ready_navigator()));
		let source: Rc<dyn RelationSource> = Rc::new(StaticRelations::new());
		let Some(RebuildStart::Pending(ticket)) = nav.borrow_mut().begin_rebuild() else {
			panic!("expected a pending rebuild");
		};
		assert!(block_on(run_rebuild(nav.clone(), ticket, source)));
		let root = nav.borrow().level().clone();
		assert_eq!(root.graph.nodes.len(), 3);

		assert!(matches!(
			nav.borrow_mut().begin_rebuild(),
			Some(RebuildStart::Ready)
		));
		assert_eq!(nav.borrow().level(), &root);
		assert!(!nav.borrow().loading().any());
	}

	struct NeverRelations;

	#[async_trait::async_trait(?Send)]
	impl RelationSource for NeverRelations {
		async fn fetch_relations(
			&self,
			_subject_id: &str,
			_kind: crate::api::RelationKind,
			_active_at: Option<PointInTime>,
		) -> crate::error::ApiResult<Vec<crate::model::Relation>> {
			futures::future::pending().await
		}
	}

	#[test]
	fn dropped_rebuild_clears_loading() {
		use futures::FutureExt;

		let nav = Rc::new(RefCell::new(ready_navigator()));
		nav.borrow_mut().activate(&ministry_node("min-a"));
		let Some(RebuildStart::Pending(ticket)) = nav.borrow_mut().begin_rebuild() else {
			panic!("expected a pending rebuild");
		};
		let source: Rc<dyn RelationSource> = Rc::new(NeverRelations);
		let mut rebuild = Box::pin(run_rebuild(nav.clone(), ticket, source));
		assert!(rebuild.as_mut().now_or_never().is_none());
		assert!(nav.borrow().loading().ministry);

		drop(rebuild);
		assert!(!nav.borrow().loading().any());
		assert!(nav.borrow().accepts_clicks());
	}

	#[test]
	fn reset_discards_cache_and_focus() {
		let mut nav = ready_navigator();
		nav.activate(&ministry_node("min-a"));
		let Some(RebuildStart::Pending(ticket)) = nav.begin_rebuild() else {
			panic!("expected a pending rebuild");
		};
		nav.reset(context());
		assert!(!nav.complete_rebuild(ticket, LevelData::default()));
		assert_eq!(nav.cached_levels(), 0);
		assert!(nav.focus().is_root());
	}

	#[test]
	fn filter_only_matters_at_root() {
		let mut nav = ready_navigator();
		assert!(nav.set_filter(LevelFilter::NewlyAppointed));
		assert!(!nav.set_filter(LevelFilter::NewlyAppointed));
		nav.activate(&ministry_node("min-a"));
		assert!(!nav.set_filter(LevelFilter::None));
	}
}
