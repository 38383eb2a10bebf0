use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use futures::channel::oneshot;
use futures::executor::block_on;
use pretty_assertions::assert_eq;

use cabinet_graph::api::{RelationKind, RelationSource, StaticRelations};
use cabinet_graph::error::ApiResult;
use cabinet_graph::graph::{
	Focus, GROUP_MINISTRY, GraphNode, LevelContext, LevelFilter, LevelTag, NodeKind, build_level,
};
use cabinet_graph::model::{
	ActiveMinistry, Dictionaries, Entity, EntityKind, HeadOfState, PointInTime, Relation,
	parse_timestamp,
};
use cabinet_graph::navigator::{
	MemoryLocation, Navigator, RebuildStart, Transition, UrlSync, run_rebuild,
};

fn day(s: &str) -> PointInTime {
	PointInTime::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn entity(id: &str, name: &str, kind: EntityKind) -> Entity {
	Entity {
		id: id.into(),
		name: name.into(),
		kind,
		created: None,
		terminated: None,
	}
}

fn rel(target: &str) -> Relation {
	Relation {
		id: format!("r-{target}"),
		related_entity_id: target.into(),
		name: String::new(),
		start_time: parse_timestamp("2020-01-01"),
		end_time: None,
	}
}

fn ministry(id: &str, name: &str) -> ActiveMinistry {
	ActiveMinistry {
		id: id.into(),
		name: name.into(),
		head_minister_id: None,
		head_minister_name: None,
		head_minister_since: None,
	}
}

fn context() -> LevelContext {
	LevelContext {
		point_in_time: day("2021-06-01"),
		head_of_state: HeadOfState {
			id: "p-pres".into(),
			name: "Head Of State".into(),
			term_start: Some(day("2019-11-18")),
			term_end: None,
		},
		active_ministries: vec![
			ministry("defence-001", "Ministry of Defence"),
			ministry("finance-001", "Ministry of Finance"),
			ministry("health-001", "Ministry of Health"),
		],
		dictionaries: Arc::new(Dictionaries::from_entities([
			entity("defence-001", "Ministry of Defence", EntityKind::Ministry),
			entity("finance-001", "Ministry of Finance", EntityKind::Ministry),
			entity("health-001", "Ministry of Health", EntityKind::Ministry),
			entity("dep-tax", "Inland Revenue", EntityKind::Department),
			entity("dep-army", "Army", EntityKind::Department),
			entity("p-fin", "Finance Minister", EntityKind::Person),
			entity("p-pres", "Head Of State", EntityKind::Person),
		])),
	}
}

fn relations() -> StaticRelations {
	StaticRelations::new()
		.with("finance-001", RelationKind::Department, vec![rel("dep-tax")])
		.with("finance-001", RelationKind::Appointed, vec![rel("p-fin")])
		.with("defence-001", RelationKind::Department, vec![rel("dep-army")])
}

fn ministry_node(id: &str, name: &str) -> GraphNode {
	GraphNode::new(id, name, NodeKind::Ministry, GROUP_MINISTRY)
}

/// Drive whatever `begin_rebuild` asks for to completion.
fn settle(nav: &Rc<RefCell<Navigator>>, source: &Rc<dyn RelationSource>) {
	let start = nav.borrow_mut().begin_rebuild();
	if let Some(RebuildStart::Pending(ticket)) = start {
		assert!(block_on(run_rebuild(nav.clone(), ticket, source.clone())));
	}
}

/// Holds the first fetch until the gate opens, then answers from `inner`.
struct GatedRelations {
	inner: StaticRelations,
	gate: RefCell<Option<oneshot::Receiver<()>>>,
}

#[async_trait(?Send)]
impl RelationSource for GatedRelations {
	async fn fetch_relations(
		&self,
		subject_id: &str,
		kind: RelationKind,
		active_at: Option<PointInTime>,
	) -> ApiResult<Vec<Relation>> {
		let gate = self.gate.borrow_mut().take();
		if let Some(gate) = gate {
			let _ = gate.await;
		}
		self.inner.fetch_relations(subject_id, kind, active_at).await
	}
}

#[test]
fn expand_then_collapse_restores_the_root() {
	let source: Rc<dyn RelationSource> = Rc::new(relations());
	let nav = Rc::new(RefCell::new(Navigator::new(LevelFilter::None)));
	nav.borrow_mut().reset(context());
	settle(&nav, &source);
	let root = nav.borrow().level().clone();

	let finance = ministry_node("finance-001", "Ministry of Finance");
	let expanded = nav.borrow_mut().activate(&finance);
	assert_eq!(expanded, Transition::Expand(finance.clone()));
	settle(&nav, &source);
	assert!(nav.borrow().level().graph.node("dep-tax").is_some());

	let collapsed = nav.borrow_mut().activate(&finance);
	assert_eq!(collapsed, Transition::Collapse);
	settle(&nav, &source);

	let nav = nav.borrow();
	assert_eq!(nav.focus(), &Focus::Root);
	assert_eq!(nav.selected(), None);
	assert_eq!(nav.level(), &root);
}

#[test]
fn late_ministry_result_never_replaces_the_root() {
	let (open, gate) = oneshot::channel();
	let source: Rc<dyn RelationSource> = Rc::new(GatedRelations {
		inner: relations(),
		gate: RefCell::new(Some(gate)),
	});
	let nav = Rc::new(RefCell::new(Navigator::new(LevelFilter::None)));
	nav.borrow_mut().reset(context());
	settle(&nav, &source);
	let root = nav.borrow().level().clone();

	nav.borrow_mut()
		.activate(&ministry_node("finance-001", "Ministry of Finance"));
	let Some(RebuildStart::Pending(ticket)) = nav.borrow_mut().begin_rebuild() else {
		panic!("finance level should need a build");
	};
	let mut late = Box::pin(run_rebuild(nav.clone(), ticket, source.clone()));
	assert!(late.as_mut().now_or_never().is_none());
	assert!(nav.borrow().loading().ministry);

	assert_eq!(nav.borrow_mut().back(), Transition::Collapse);
	assert!(matches!(
		nav.borrow_mut().begin_rebuild(),
		Some(RebuildStart::Ready)
	));

	open.send(()).unwrap();
	assert!(!block_on(late));

	let nav = nav.borrow();
	assert_eq!(nav.focus(), &Focus::Root);
	assert_eq!(nav.level(), &root);
	assert!(!nav.loading().any());
	// the late build still lands in the cache for next time
	assert_eq!(nav.cached_levels(), 2);
}

#[test]
fn deep_link_opens_the_named_ministry() {
	let ctx = context();
	let dictionaries = ctx.dictionaries.clone();
	let url = UrlSync::new(
		"ministry",
		MemoryLocation::new("https://example.org/?ministry=finance-001").unwrap(),
	);
	let source: Rc<dyn RelationSource> = Rc::new(relations());
	let nav = Rc::new(RefCell::new(Navigator::new(LevelFilter::None)));
	nav.borrow_mut().reset(ctx);

	let focus = url.resolve_initial(&dictionaries);
	assert_eq!(
		focus.ministry_id(),
		Some("finance-001"),
		"deep link should resolve to finance"
	);
	nav.borrow_mut().focus_on(focus);
	settle(&nav, &source);

	let nav = nav.borrow();
	let graph = &nav.level().graph;
	assert_eq!(graph.node("finance-001").map(|n| n.kind), Some(NodeKind::Ministry));
	assert!(graph.node("p-fin").is_some());
	assert_eq!(url.store().replacements(), 0);
	assert_eq!(url.store().href(), "https://example.org/?ministry=finance-001");
}

#[test]
fn unknown_deep_link_starts_at_the_root() {
	let ctx = context();
	let url = UrlSync::new(
		"ministry",
		MemoryLocation::new("https://example.org/?date=2021-06-01&ministry=does-not-exist")
			.unwrap(),
	);

	assert_eq!(url.resolve_initial(&ctx.dictionaries), Focus::Root);
	assert_eq!(url.store().href(), "https://example.org/?date=2021-06-01");
	assert_eq!(url.store().replacements(), 1);
}

#[test]
fn every_ministry_without_appointees_shows_the_head_of_state() {
	let ctx = context();
	let source = StaticRelations::new();
	for ministry in &ctx.active_ministries {
		let focus = Focus::Ministry(ministry_node(&ministry.id, &ministry.name));
		let data = block_on(build_level(&focus, LevelFilter::None, &ctx, &source));

		let persons: Vec<_> = data
			.graph
			.nodes
			.iter()
			.filter(|n| n.kind == NodeKind::Person)
			.collect();
		assert_eq!(persons.len(), 1, "{}", ministry.id);
		assert_eq!(persons[0].id, "p-pres");
		assert!(persons[0].is_synthetic);

		let person_links: Vec<_> = data
			.graph
			.links
			.iter()
			.filter(|l| l.level_tag == LevelTag::ToPerson)
			.map(|l| (l.source.as_str(), l.target.as_str()))
			.collect();
		assert_eq!(person_links, vec![(ministry.id.as_str(), "p-pres")]);
	}
}

#[test]
fn new_date_drops_focus_and_cache() {
	let source: Rc<dyn RelationSource> = Rc::new(relations());
	let nav = Rc::new(RefCell::new(Navigator::new(LevelFilter::None)));
	nav.borrow_mut().reset(context());
	settle(&nav, &source);
	nav.borrow_mut()
		.activate(&ministry_node("defence-001", "Ministry of Defence"));
	settle(&nav, &source);
	assert_eq!(nav.borrow().cached_levels(), 2);

	let mut later = context();
	later.point_in_time = day("2022-01-01");
	nav.borrow_mut().reset(later);

	let nav = nav.borrow();
	assert_eq!(nav.focus(), &Focus::Root);
	assert_eq!(nav.cached_levels(), 0);
	assert!(nav.level().graph.is_empty());
}
