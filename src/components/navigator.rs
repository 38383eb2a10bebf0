use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::{AbortHandle, Aborted, LocalBoxFuture, abortable};
use leptos::callback::UnsyncCallback;
use leptos::prelude::*;
use leptos::task::spawn_local;
use send_wrapper::SendWrapper;

use super::force_graph::{CanvasEngine, ForceGraphCanvas};
use super::side_panel::SidePanel;
use crate::api::{ApiClient, HttpRelationFetcher, RelationSource};
use crate::graph::{
	Focus, GROUP_MINISTRY, GROUP_MINISTRY_LEAF, GROUP_ROOT_LEAF, GraphData, GraphNode,
	LevelContext, LevelData, LevelFilter, NodeKind,
};
use crate::model::Dictionaries;
use crate::navigator::{
	BrowserLocation, BrowserTimer, CameraFollower, FollowStart, LoadingFlags, Navigator,
	PanelInput, PanelItem, PanelPager, PanelTab, QueryStore, RebuildStart, RebuildTicket, Timer,
	Transition, UrlSync, run_rebuild, select_panel,
};

/// What the view reads. Copied out of the navigator after every change.
#[derive(Clone, Copy)]
struct ViewSignals {
	level: RwSignal<LevelData>,
	focus: RwSignal<Focus>,
	selected: RwSignal<Option<GraphNode>>,
	loading: RwSignal<LoadingFlags>,
	tab: RwSignal<PanelTab>,
	pager: RwSignal<PanelPager>,
}

impl ViewSignals {
	fn new() -> Self {
		Self {
			level: RwSignal::new(LevelData::default()),
			focus: RwSignal::new(Focus::Root),
			selected: RwSignal::new(None),
			loading: RwSignal::new(LoadingFlags::default()),
			tab: RwSignal::new(PanelTab::default()),
			pager: RwSignal::new(PanelPager::default()),
		}
	}
}

/// The non-`Send` half of the navigator: state machine, camera and URL.
struct Shell<S = BrowserLocation, T = BrowserTimer> {
	navigator: Rc<RefCell<Navigator>>,
	engine: CanvasEngine,
	follower: Rc<RefCell<CameraFollower<CanvasEngine, T>>>,
	url: Rc<UrlSync<S>>,
	source: Rc<dyn RelationSource>,
	view: ViewSignals,
	/// In-flight level builds by generation.
	rebuilds: Rc<RefCell<HashMap<u64, AbortHandle>>>,
	disposed: Rc<Cell<bool>>,
}

impl<S, T> Clone for Shell<S, T> {
	fn clone(&self) -> Self {
		Self {
			navigator: self.navigator.clone(),
			engine: self.engine.clone(),
			follower: self.follower.clone(),
			url: self.url.clone(),
			source: self.source.clone(),
			view: self.view,
			rebuilds: self.rebuilds.clone(),
			disposed: self.disposed.clone(),
		}
	}
}

impl<S, T> Shell<S, T>
where
	S: QueryStore + 'static,
	T: Timer + Clone + 'static,
{
	fn new(
		engine: CanvasEngine,
		timer: T,
		url: UrlSync<S>,
		source: Rc<dyn RelationSource>,
		filter: LevelFilter,
	) -> Self {
		Self {
			navigator: Rc::new(RefCell::new(Navigator::new(filter))),
			follower: Rc::new(RefCell::new(CameraFollower::new(engine.clone(), timer))),
			engine,
			url: Rc::new(url),
			source,
			view: ViewSignals::new(),
			rebuilds: Rc::default(),
			disposed: Rc::default(),
		}
	}

	fn publish(&self) {
		if self.disposed.get() {
			return;
		}
		let Ok(nav) = self.navigator.try_borrow() else {
			return;
		};
		let (level, focus, selected, loading) = (
			nav.level().clone(),
			nav.focus().clone(),
			nav.selected().cloned(),
			nav.loading(),
		);
		drop(nav);

		let Some(level_changed) = self.view.level.try_with_untracked(|current| current != &level)
		else {
			return;
		};
		if level_changed {
			// hand the canvas the level now so framing measures it, not the last one
			self.engine.set_data(&level.graph);
			let _ = self.view.level.try_set(level);
		}
		if self.view.focus.try_with_untracked(|current| current != &focus) == Some(true) {
			let _ = self.view.focus.try_set(focus);
			let _ = self.view.tab.try_set(PanelTab::default());
			let _ = self.view.pager.try_set(PanelPager::default());
		}
		let _ = self.view.selected.try_set(selected);
		let _ = self.view.loading.try_set(loading);
	}

	fn activate(&self, node: &GraphNode) {
		let transition = self.navigator.borrow_mut().activate(node);
		self.settle(transition);
	}

	fn back(&self) {
		let transition = self.navigator.borrow_mut().back();
		self.settle(transition);
	}

	fn settle(&self, transition: Transition) {
		if transition.changes_focus() {
			self.follower.borrow_mut().cancel();
			let focus = self.navigator.borrow().focus().clone();
			self.url.persist(&focus);
			self.rebuild();
		} else if let Some(node) = transition.camera_target() {
			self.publish();
			self.follow(&node.id);
		}
	}

	/// Rebuild the visible level and frame it once it is in place.
	fn rebuild(&self) {
		if self.disposed.get() {
			return;
		}
		let start = self.navigator.borrow_mut().begin_rebuild();
		self.publish();
		match start {
			None => {}
			Some(RebuildStart::Ready) => self.frame_focus(),
			Some(RebuildStart::Pending(ticket)) => spawn_local(self.rebuild_task(ticket)),
		}
	}

	/// Build `ticket`'s level, then publish and frame it. Aborted by `dispose`.
	fn rebuild_task(&self, ticket: RebuildTicket) -> LocalBoxFuture<'static, ()> {
		let generation = ticket.generation();
		log::debug!("building {:?} level, generation {generation}", ticket.kind());
		let (build, handle) = abortable(run_rebuild(
			self.navigator.clone(),
			ticket,
			self.source.clone(),
		));
		self.rebuilds.borrow_mut().insert(generation, handle);

		let shell = self.clone();
		async move {
			let outcome = build.await;
			shell.rebuilds.borrow_mut().remove(&generation);
			match outcome {
				Ok(true) => {
					shell.publish();
					shell.frame_focus();
				}
				Ok(false) => shell.publish(),
				Err(Aborted) => log::debug!("level build {generation} aborted"),
			}
		}
		.boxed_local()
	}

	fn frame_focus(&self) {
		if self.disposed.get() {
			return;
		}
		let target = self
			.navigator
			.borrow()
			.focus()
			.ministry_id()
			.map(str::to_string);
		match target {
			Some(id) => self.follow(&id),
			None => self.follower.borrow_mut().fit_all(),
		}
	}

	fn follow(&self, node_id: &str) {
		if self.disposed.get() {
			return;
		}
		let start = self.follower.borrow_mut().follow(node_id);
		if let FollowStart::Polling(task) = start {
			spawn_local(async move {
				let outcome = task.await;
				log::debug!("camera follow finished: {outcome:?}");
			});
		}
	}

	/// Unmount: stop the camera, abort level builds and publish nothing more.
	fn dispose(&self) {
		self.disposed.set(true);
		self.follower.borrow_mut().cancel();
		for (_, handle) in self.rebuilds.borrow_mut().drain() {
			handle.abort();
		}
	}

	/// A panel row as the node it stands for.
	fn node_for(&self, item: &PanelItem) -> GraphNode {
		let nav = self.navigator.borrow();
		if let Some(node) = nav.level().graph.node(&item.id) {
			return node.clone();
		}
		let group = match (item.kind, nav.focus()) {
			(NodeKind::Ministry, _) => GROUP_MINISTRY,
			(_, Focus::Root) => GROUP_ROOT_LEAF,
			(_, Focus::Ministry(_)) => GROUP_MINISTRY_LEAF,
		};
		let node = GraphNode::new(item.id.clone(), item.name.clone(), item.kind, group);
		if item.is_synthetic {
			node.synthetic()
		} else {
			node
		}
	}
}

/// The drill-down graph plus its side panel.
///
/// `context` is replaced by the caller whenever the date or the leader
/// changes; each new context resets the navigator to the root. The first one
/// honours a ministry deep link in the URL.
#[component]
pub fn GraphNavigator(
	#[prop(into)] context: Signal<Option<Arc<LevelContext>>>,
	#[prop(into)] filter: Signal<LevelFilter>,
	client: ApiClient,
	#[prop(into)] focus_param: String,
) -> impl IntoView {
	let engine = CanvasEngine::default();
	let shell = Shell::new(
		engine.clone(),
		BrowserTimer,
		UrlSync::new(focus_param, BrowserLocation),
		Rc::new(HttpRelationFetcher::new(client)),
		filter.get_untracked(),
	);
	let signals = shell.view;

	let (shell_ctx, first_context) = (shell.clone(), Rc::new(Cell::new(true)));
	Effect::new(move |_| {
		let Some(ctx) = context.get() else {
			return;
		};
		let dictionaries = ctx.dictionaries.clone();
		shell_ctx.follower.borrow_mut().cancel();
		shell_ctx.navigator.borrow_mut().reset(ctx);
		if first_context.replace(false) {
			let focus = shell_ctx.url.resolve_initial(&dictionaries);
			shell_ctx.navigator.borrow_mut().focus_on(focus);
		} else {
			shell_ctx.url.persist(&Focus::Root);
		}
		shell_ctx.rebuild();
	});

	let shell_filter = shell.clone();
	Effect::new(move |_| {
		let filter = filter.get();
		let stale = shell_filter.navigator.borrow_mut().set_filter(filter);
		if stale {
			shell_filter.rebuild();
		}
	});

	let shell_cleanup = SendWrapper::new(shell.clone());
	on_cleanup(move || shell_cleanup.dispose());

	let shell_click = shell.clone();
	let on_node_click = UnsyncCallback::new(move |node: GraphNode| shell_click.activate(&node));
	let shell_item = shell.clone();
	let on_item = UnsyncCallback::new(move |item: PanelItem| {
		let node = shell_item.node_for(&item);
		shell_item.activate(&node);
	});
	let shell_back = shell.clone();
	let on_back = UnsyncCallback::new(move |()| shell_back.back());
	let on_tab = UnsyncCallback::new(move |tab: PanelTab| {
		signals.tab.set(tab);
		signals.pager.set(PanelPager::default());
	});
	let on_load_more = UnsyncCallback::new(move |()| signals.pager.update(PanelPager::load_more));

	let graph = Memo::new(move |_| signals.level.with(|level| level.graph.clone()));
	let graph: Signal<GraphData> = graph.into();
	let selected_id =
		Signal::derive(move || signals.selected.with(|s| s.as_ref().map(|n| n.id.clone())));

	let panel = Memo::new(move |_| {
		let ctx = context.get();
		let focus = signals.focus.get();
		let selected = signals.selected.get();
		let empty = Dictionaries::default();
		signals.level.with(|level| {
			select_panel(&PanelInput {
				focus: &focus,
				selected: selected.as_ref(),
				tab: signals.tab.get(),
				pager: signals.pager.get(),
				loading: signals.loading.get(),
				level,
				active_ministries: ctx
					.as_ref()
					.map(|c| c.active_ministries.as_slice())
					.unwrap_or_default(),
				dictionaries: ctx.as_ref().map_or(&empty, |c| c.dictionaries.as_ref()),
			})
		})
	});

	view! {
		<div class="navigator">
			<ForceGraphCanvas
				data=graph
				engine=engine
				selected=selected_id
				on_node_click=on_node_click
				fullscreen=true
			/>
			<SidePanel
				panel=panel
				on_item=on_item
				on_tab=on_tab
				on_load_more=on_load_more
				on_back=on_back
			/>
		</div>
	}
}
