use std::collections::{HashMap, HashSet};
use std::f64::consts::PI;
use std::time::Duration;

use force_graph::{DefaultNodeIdx, EdgeData, ForceGraph, NodeData, SimulationParameters};

use crate::graph::{GraphData, GraphNode, LevelTag};

const COLORS: &[&str] = &[
	"#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
	"#bcbd22", "#17becf",
];

pub const NODE_RADIUS: f64 = 5.0;
pub const HIT_RADIUS: f64 = 12.0;

/// How far (screen px) a press may travel and still count as a click.
const CLICK_SLOP: f64 = 4.0;

/// Fraction of the length error corrected per tick for each link.
const LINK_STIFFNESS: f32 = 0.08;

/// Eye distance at which the 2D view sits at zoom 1.
const CAMERA_REFERENCE_DISTANCE: f64 = 150.0;

const MIN_ZOOM: f64 = 0.1;
const MAX_ZOOM: f64 = 10.0;

pub fn ease_out_cubic(t: f64) -> f64 {
	1.0 - (1.0 - t).powi(3)
}

/// Node radius by layer: the government node is the biggest.
pub fn radius_for_group(group: u32) -> f64 {
	match group {
		1 => NODE_RADIUS * 2.2,
		2 => NODE_RADIUS * 1.5,
		_ => NODE_RADIUS,
	}
}

#[derive(Clone, Debug, Default)]
pub struct NodeInfo {
	pub id: String,
	pub label: String,
	pub color: String,
	pub radius: f64,
	pub synthetic: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ViewTransform {
	pub x: f64,
	pub y: f64,
	pub k: f64,
}

impl ViewTransform {
	fn lerp(&self, to: &ViewTransform, t: f64) -> ViewTransform {
		ViewTransform {
			x: self.x + (to.x - self.x) * t,
			y: self.y + (to.y - self.y) * t,
			k: self.k + (to.k - self.k) * t,
		}
	}
}

/// An eased move of the view from one transform to another.
#[derive(Clone, Debug)]
pub struct CameraTransition {
	from: ViewTransform,
	to: ViewTransform,
	elapsed: f64,
	duration: f64,
}

#[derive(Clone, Debug, Default)]
pub struct DragState {
	pub active: bool,
	pub moved: bool,
	pub node_idx: Option<DefaultNodeIdx>,
	pub start_x: f64,
	pub start_y: f64,
	pub node_start_x: f32,
	pub node_start_y: f32,
}

#[derive(Clone, Debug, Default)]
pub struct PanState {
	pub active: bool,
	pub start_x: f64,
	pub start_y: f64,
	pub transform_start_x: f64,
	pub transform_start_y: f64,
}

#[derive(Clone, Debug, Default)]
pub struct HoverState {
	pub node: Option<DefaultNodeIdx>,
	pub neighbors: HashSet<DefaultNodeIdx>,
	pub highlight_t: f64,
	pub prev_node: Option<DefaultNodeIdx>,
	pub prev_neighbors: HashSet<DefaultNodeIdx>,
	delay_t: f64,
}

fn new_simulation() -> ForceGraph<NodeInfo, ()> {
	ForceGraph::new(SimulationParameters {
		force_charge: 150.0,
		force_spring: 0.05,
		force_max: 100.0,
		node_speed: 3000.0,
		damping_factor: 0.9,
	})
}

pub struct ForceGraphState {
	pub graph: ForceGraph<NodeInfo, ()>,
	pub transform: ViewTransform,
	pub drag: DragState,
	pub pan: PanState,
	pub hover: HoverState,
	pub width: f64,
	pub height: f64,
	pub animation_running: bool,
	pub flow_time: f64,
	pub selected: Option<String>,
	camera: Option<CameraTransition>,
	shown: GraphData,
	id_to_idx: HashMap<String, DefaultNodeIdx>,
	idx_to_node: HashMap<DefaultNodeIdx, usize>,
	edges: Vec<(DefaultNodeIdx, DefaultNodeIdx, LevelTag)>,
}

impl ForceGraphState {
	pub fn new(width: f64, height: f64) -> Self {
		Self {
			graph: new_simulation(),
			transform: ViewTransform {
				x: width / 2.0,
				y: height / 2.0,
				k: 1.0,
			},
			drag: DragState::default(),
			pan: PanState::default(),
			hover: HoverState::default(),
			width,
			height,
			animation_running: true,
			flow_time: 0.0,
			selected: None,
			camera: None,
			shown: GraphData::default(),
			id_to_idx: HashMap::new(),
			idx_to_node: HashMap::new(),
			edges: Vec::new(),
		}
	}

	/// Replace the simulated graph. Nodes that survive from the previous
	/// data keep their position; new ones start on a ring by layer.
	pub fn set_data(&mut self, data: &GraphData) {
		if *data == self.shown {
			return;
		}
		let previous = self.positions_by_id();
		let mut graph = new_simulation();
		let mut id_to_idx = HashMap::new();
		let mut idx_to_node = HashMap::new();
		let mut edges = Vec::new();

		for (i, node) in data.nodes.iter().enumerate() {
			let color = COLORS[node.group as usize % COLORS.len()].to_string();
			let (x, y) = previous.get(&node.id).copied().unwrap_or_else(|| {
				let angle = (i as f64) * 2.0 * PI / data.nodes.len().max(1) as f64;
				let ring = 40.0 * node.group.saturating_sub(1) as f64;
				((ring * angle.cos()) as f32, (ring * angle.sin()) as f32)
			});

			let idx = graph.add_node(NodeData {
				x,
				y,
				mass: 10.0,
				is_anchor: false,
				user_data: NodeInfo {
					id: node.id.clone(),
					label: node.name.clone(),
					color,
					radius: radius_for_group(node.group),
					synthetic: node.is_synthetic,
				},
			});
			id_to_idx.insert(node.id.clone(), idx);
			idx_to_node.insert(idx, i);
		}

		for link in &data.links {
			if let (Some(&src), Some(&tgt)) =
				(id_to_idx.get(&link.source), id_to_idx.get(&link.target))
			{
				graph.add_edge(src, tgt, EdgeData::default());
				edges.push((src, tgt, link.level_tag));
			}
		}

		self.graph = graph;
		self.shown = data.clone();
		self.id_to_idx = id_to_idx;
		self.idx_to_node = idx_to_node;
		self.edges = edges;
		self.hover = HoverState::default();
		self.drag = DragState::default();
	}

	/// Drop the simulation and everything that refers into it.
	pub fn release(&mut self) {
		self.set_data(&GraphData::default());
		self.camera = None;
		self.animation_running = false;
	}

	fn positions_by_id(&self) -> HashMap<String, (f32, f32)> {
		let mut positions = HashMap::new();
		self.graph.visit_nodes(|node| {
			positions.insert(node.data.user_data.id.clone(), (node.x(), node.y()));
		});
		positions
	}

	/// World position of a node, if it is in the current graph.
	pub fn node_position(&self, id: &str) -> Option<(f64, f64)> {
		let idx = *self.id_to_idx.get(id)?;
		let mut found = None;
		self.graph.visit_nodes(|node| {
			if node.index() == idx {
				found = Some((node.x() as f64, node.y() as f64));
			}
		});
		found
	}

	/// Simulated links with the tag they were built with.
	pub fn links(&self) -> &[(DefaultNodeIdx, DefaultNodeIdx, LevelTag)] {
		&self.edges
	}

	pub fn node_at_index(&self, idx: DefaultNodeIdx) -> Option<&GraphNode> {
		self.idx_to_node.get(&idx).and_then(|&i| self.shown.nodes.get(i))
	}

	pub fn is_selected(&self, idx: DefaultNodeIdx) -> bool {
		match (&self.selected, self.node_at_index(idx)) {
			(Some(id), Some(node)) => &node.id == id,
			_ => false,
		}
	}

	pub fn screen_to_graph(&self, sx: f64, sy: f64) -> (f64, f64) {
		(
			(sx - self.transform.x) / self.transform.k,
			(sy - self.transform.y) / self.transform.k,
		)
	}

	pub fn node_at_position(&self, sx: f64, sy: f64) -> Option<DefaultNodeIdx> {
		let (gx, gy) = self.screen_to_graph(sx, sy);
		let mut found = None;
		self.graph.visit_nodes(|node| {
			let (dx, dy) = (node.x() as f64 - gx, node.y() as f64 - gy);
			// HIT_RADIUS is in world-space, scales with zoom like nodes
			let hit = HIT_RADIUS.max(node.data.user_data.radius + 4.0);
			if (dx * dx + dy * dy).sqrt() < hit {
				found = Some(node.index());
			}
		});
		found
	}

	fn node_xy(&self, idx: DefaultNodeIdx) -> Option<(f32, f32)> {
		let mut found = None;
		self.graph.visit_nodes(|node| {
			if node.index() == idx {
				found = Some((node.x(), node.y()));
			}
		});
		found
	}

	/// Pointer down at screen `(x, y)`: grab the node under it, or start
	/// panning (which takes the view back from any camera move).
	pub fn press(&mut self, x: f64, y: f64) {
		let Some(idx) = self.node_at_position(x, y) else {
			self.cancel_camera();
			self.pan = PanState {
				active: true,
				start_x: x,
				start_y: y,
				transform_start_x: self.transform.x,
				transform_start_y: self.transform.y,
			};
			return;
		};
		let (node_start_x, node_start_y) = self.node_xy(idx).unwrap_or_default();
		self.drag = DragState {
			active: true,
			moved: false,
			node_idx: Some(idx),
			start_x: x,
			start_y: y,
			node_start_x,
			node_start_y,
		};
	}

	/// Pointer moved to screen `(x, y)`. A grabbed node only starts moving
	/// once the pointer leaves the click slop.
	pub fn pointer_move(&mut self, x: f64, y: f64) {
		if self.pan.active {
			self.transform.x = self.pan.transform_start_x + (x - self.pan.start_x);
			self.transform.y = self.pan.transform_start_y + (y - self.pan.start_y);
			return;
		}
		if !self.drag.active {
			let hovered = self.node_at_position(x, y);
			self.set_hover(hovered);
			return;
		}

		let (sx, sy) = (x - self.drag.start_x, y - self.drag.start_y);
		if !self.drag.moved && (sx * sx + sy * sy).sqrt() <= CLICK_SLOP {
			return;
		}
		self.drag.moved = true;
		let Some(idx) = self.drag.node_idx else {
			return;
		};
		let k = self.transform.k;
		let (nx, ny) = (
			self.drag.node_start_x + (sx / k) as f32,
			self.drag.node_start_y + (sy / k) as f32,
		);
		self.graph.visit_nodes_mut(|node| {
			if node.index() == idx {
				node.data.x = nx;
				node.data.y = ny;
				node.data.is_anchor = true;
			}
		});
	}

	/// Pointer up. Returns the node when press and release made a click.
	pub fn release_pointer(&mut self) -> Option<GraphNode> {
		let clicked = match (self.drag.active, self.drag.moved, self.drag.node_idx) {
			(true, false, Some(idx)) => self.node_at_index(idx).cloned(),
			_ => None,
		};
		self.drag = DragState::default();
		self.pan.active = false;
		clicked
	}

	/// Pointer left the canvas: drop any gesture in progress.
	pub fn leave(&mut self) {
		self.drag = DragState::default();
		self.pan.active = false;
		self.set_hover(None);
	}

	/// One wheel notch at screen `(x, y)`, keeping that point fixed.
	pub fn zoom_at(&mut self, x: f64, y: f64, zoom_in: bool) {
		self.cancel_camera();
		let factor = if zoom_in { 1.1 } else { 0.9 };
		let k = (self.transform.k * factor).clamp(MIN_ZOOM, MAX_ZOOM);
		let ratio = k / self.transform.k;
		self.transform.x = x - (x - self.transform.x) * ratio;
		self.transform.y = y - (y - self.transform.y) * ratio;
		self.transform.k = k;
	}

	/// Ease the view so world point `(wx, wy)` ends up centred at zoom `k`.
	pub fn fly_to(&mut self, wx: f64, wy: f64, k: f64, duration: Duration) {
		let k = k.clamp(MIN_ZOOM, MAX_ZOOM);
		let to = ViewTransform {
			x: self.width / 2.0 - wx * k,
			y: self.height / 2.0 - wy * k,
			k,
		};
		self.start_camera(to, duration);
	}

	/// Zoom for an eye `distance` away from what it looks at.
	pub fn zoom_for_distance(distance: f64) -> f64 {
		if distance <= f64::EPSILON {
			return MAX_ZOOM;
		}
		(CAMERA_REFERENCE_DISTANCE / distance).clamp(MIN_ZOOM, MAX_ZOOM)
	}

	/// Ease the view so every node is visible with `padding` px to spare.
	pub fn fit_all(&mut self, duration: Duration, padding: f64) {
		let mut bounds: Option<(f64, f64, f64, f64)> = None;
		self.graph.visit_nodes(|node| {
			let (x, y) = (node.x() as f64, node.y() as f64);
			bounds = Some(match bounds {
				None => (x, y, x, y),
				Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
			});
		});
		let Some((x0, y0, x1, y1)) = bounds else {
			return;
		};
		let (w, h) = ((x1 - x0).max(1.0), (y1 - y0).max(1.0));
		let avail_w = (self.width - 2.0 * padding).max(1.0);
		let avail_h = (self.height - 2.0 * padding).max(1.0);
		let k = (avail_w / w).min(avail_h / h).min(2.0);
		self.fly_to((x0 + x1) / 2.0, (y0 + y1) / 2.0, k, duration);
	}

	fn start_camera(&mut self, to: ViewTransform, duration: Duration) {
		let duration = duration.as_secs_f64();
		if duration <= 0.0 {
			self.transform = to;
			self.camera = None;
			return;
		}
		self.camera = Some(CameraTransition {
			from: self.transform,
			to,
			elapsed: 0.0,
			duration,
		});
	}

	/// World point at the centre of the view once any camera move lands.
	#[cfg(test)]
	pub fn view_center(&self) -> (f64, f64) {
		let t = self.camera.as_ref().map_or(self.transform, |c| c.to);
		((self.width / 2.0 - t.x) / t.k, (self.height / 2.0 - t.y) / t.k)
	}

	/// User input takes the view back from any running transition.
	pub fn cancel_camera(&mut self) {
		self.camera = None;
	}

	pub fn set_hover(&mut self, node: Option<DefaultNodeIdx>) {
		if self.hover.node == node {
			return;
		}
		let was_hovering = self.hover.node.is_some();

		// Save previous state for fade-out
		if was_hovering && node.is_none() {
			self.hover.prev_node = self.hover.node.take();
			self.hover.prev_neighbors = std::mem::take(&mut self.hover.neighbors);
		} else {
			self.hover.prev_node = None;
			self.hover.prev_neighbors.clear();
		}

		self.hover.node = node;
		self.hover.neighbors.clear();

		if let Some(idx) = node {
			if !was_hovering {
				self.hover.delay_t = 0.0;
			}
			for &(src, tgt, _) in &self.edges {
				if src == idx {
					self.hover.neighbors.insert(tgt);
				} else if tgt == idx {
					self.hover.neighbors.insert(src);
				}
			}
		}
	}

	pub fn is_highlighted(&self, idx: DefaultNodeIdx) -> bool {
		self.hover.node == Some(idx)
			|| self.hover.neighbors.contains(&idx)
			|| self.hover.prev_node == Some(idx)
			|| self.hover.prev_neighbors.contains(&idx)
	}

	pub fn is_hovered(&self, idx: DefaultNodeIdx) -> bool {
		self.hover.node == Some(idx) || self.hover.prev_node == Some(idx)
	}

	pub fn has_active_highlight(&self) -> bool {
		self.hover.node.is_some() || self.hover.prev_node.is_some()
	}

	pub fn tick(&mut self, dt: f32) {
		self.graph.update(dt);
		self.apply_link_distances();
		self.flow_time += dt as f64;
		self.tick_camera(dt as f64);

		let (target, delay, speed) = if self.hover.node.is_some() {
			(1.0, 0.08, 1.8)
		} else {
			(0.0, 0.0, 1.26)
		};

		if self.hover.node.is_some() {
			self.hover.delay_t = (self.hover.delay_t + dt as f64).min(delay);
			if self.hover.delay_t >= delay {
				self.hover.highlight_t += (target - self.hover.highlight_t) * speed * dt as f64;
			}
		} else {
			self.hover.highlight_t += (target - self.hover.highlight_t) * speed * dt as f64;
			if self.hover.highlight_t < 0.01 {
				self.hover.highlight_t = 0.0;
				self.hover.prev_node = None;
				self.hover.prev_neighbors.clear();
			}
		}
	}

	fn tick_camera(&mut self, dt: f64) {
		let Some(camera) = self.camera.as_mut() else {
			return;
		};
		camera.elapsed += dt;
		let t = (camera.elapsed / camera.duration).min(1.0);
		self.transform = camera.from.lerp(&camera.to, ease_out_cubic(t));
		if t >= 1.0 {
			self.camera = None;
		}
	}

	/// Pull each link towards its tag's preferred length.
	fn apply_link_distances(&mut self) {
		if self.edges.is_empty() {
			return;
		}
		let mut positions: HashMap<DefaultNodeIdx, (f32, f32, bool)> = HashMap::new();
		self.graph.visit_nodes(|node| {
			positions.insert(node.index(), (node.x(), node.y(), node.data.is_anchor));
		});

		let mut shifts: HashMap<DefaultNodeIdx, (f32, f32)> = HashMap::new();
		for &(src, tgt, tag) in &self.edges {
			let (Some(&(x1, y1, a1)), Some(&(x2, y2, a2))) = (positions.get(&src), positions.get(&tgt))
			else {
				continue;
			};
			let (dx, dy) = (x2 - x1, y2 - y1);
			let dist = (dx * dx + dy * dy).sqrt();
			if dist < 0.001 {
				continue;
			}
			let err = (dist - tag.target_distance() as f32) / dist * LINK_STIFFNESS * 0.5;
			if !a1 {
				let s = shifts.entry(src).or_default();
				s.0 += dx * err;
				s.1 += dy * err;
			}
			if !a2 {
				let s = shifts.entry(tgt).or_default();
				s.0 -= dx * err;
				s.1 -= dy * err;
			}
		}

		self.graph.visit_nodes_mut(|node| {
			if let Some(&(sx, sy)) = shifts.get(&node.index()) {
				node.data.x += sx;
				node.data.y += sy;
			}
		});
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::graph::{GraphLink, NodeKind};

	fn data() -> GraphData {
		GraphData {
			nodes: vec![
				GraphNode::new("gov", "Gov", NodeKind::Government, 1),
				GraphNode::new("min-a", "A", NodeKind::Ministry, 2),
			],
			links: vec![
				GraphLink::new("gov", "min-a", LevelTag::ToMinistry),
				GraphLink::new("gov", "min-missing", LevelTag::ToMinistry),
			],
		}
	}

	#[test]
	fn positions_are_known_after_set_data() {
		let mut state = ForceGraphState::new(800.0, 600.0);
		assert_eq!(state.node_position("min-a"), None);
		state.set_data(&data());
		assert!(state.node_position("min-a").is_some());
		assert_eq!(state.edges.len(), 1);
	}

	#[test]
	fn surviving_nodes_keep_their_position() {
		let mut state = ForceGraphState::new(800.0, 600.0);
		state.set_data(&data());
		for _ in 0..10 {
			state.tick(0.016);
		}
		let before = state.node_position("min-a");
		state.set_data(&data());
		assert_eq!(state.node_position("min-a"), before);
	}

	#[test]
	fn camera_transition_lands_on_target() {
		let mut state = ForceGraphState::new(800.0, 600.0);
		state.fly_to(100.0, 50.0, 2.0, Duration::from_millis(500));
		for _ in 0..40 {
			state.tick_camera(0.016);
		}
		assert_eq!(
			state.transform,
			ViewTransform {
				x: 400.0 - 200.0,
				y: 300.0 - 100.0,
				k: 2.0
			}
		);
	}

	/// Screen point of a node under the initial transform.
	fn screen_of(state: &ForceGraphState, id: &str) -> (f64, f64) {
		let (x, y) = state.node_position(id).unwrap();
		(x * state.transform.k + state.transform.x, y * state.transform.k + state.transform.y)
	}

	#[test]
	fn press_and_release_in_place_is_a_click() {
		let mut state = ForceGraphState::new(800.0, 600.0);
		state.set_data(&data());
		let (x, y) = screen_of(&state, "min-a");

		state.press(x, y);
		state.pointer_move(x + 2.0, y + 1.0);
		let clicked = state.release_pointer();
		assert_eq!(clicked.map(|n| n.id), Some("min-a".to_string()));
	}

	#[test]
	fn dragging_past_the_slop_is_not_a_click() {
		let mut state = ForceGraphState::new(800.0, 600.0);
		state.set_data(&data());
		let (x, y) = screen_of(&state, "min-a");
		let before = state.node_position("min-a").unwrap();

		state.press(x, y);
		state.pointer_move(x + 30.0, y);
		assert_eq!(state.release_pointer(), None);
		let after = state.node_position("min-a").unwrap();
		assert!((after.0 - before.0 - 30.0).abs() < 1e-3);
	}

	#[test]
	fn panning_cancels_the_camera_move() {
		let mut state = ForceGraphState::new(800.0, 600.0);
		state.fly_to(100.0, 50.0, 2.0, Duration::from_millis(500));
		state.press(5.0, 5.0);
		state.pointer_move(25.0, 5.0);
		assert!(state.camera.is_none());
		assert_eq!(state.transform.x, 420.0);
		assert_eq!(state.release_pointer(), None);
	}

	#[test]
	fn release_empties_the_graph() {
		let mut state = ForceGraphState::new(800.0, 600.0);
		state.set_data(&data());
		state.release();
		assert_eq!(state.node_position("gov"), None);
		assert!(!state.animation_running);
	}
}
