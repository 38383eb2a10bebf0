use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use super::state::ForceGraphState;
use crate::graph::GraphData;
use crate::navigator::{RenderingEngine, Vec3};

/// Shared handle to the canvas simulation.
///
/// The canvas component drives it frame by frame; the navigator reads node
/// positions and issues camera moves through [`RenderingEngine`]. The canvas
/// is flat, so every position has `z == 0`.
#[derive(Clone)]
pub struct CanvasEngine {
	state: Rc<RefCell<ForceGraphState>>,
}

impl Default for CanvasEngine {
	fn default() -> Self {
		Self::new(800.0, 600.0)
	}
}

impl CanvasEngine {
	pub fn new(width: f64, height: f64) -> Self {
		Self {
			state: Rc::new(RefCell::new(ForceGraphState::new(width, height))),
		}
	}

	pub(super) fn state(&self) -> &Rc<RefCell<ForceGraphState>> {
		&self.state
	}

	pub fn set_data(&self, data: &GraphData) {
		self.state.borrow_mut().set_data(data);
	}

	pub fn set_selected(&self, id: Option<String>) {
		self.state.borrow_mut().selected = id;
	}

	#[cfg(test)]
	pub(crate) fn view_center(&self) -> (f64, f64) {
		self.state.borrow().view_center()
	}

	/// Free the simulation. The canvas stops animating afterwards.
	pub fn release(&self) {
		if let Ok(mut state) = self.state.try_borrow_mut() {
			state.release();
		}
	}
}

impl RenderingEngine for CanvasEngine {
	fn node_position(&self, id: &str) -> Option<Vec3> {
		let state = self.state.try_borrow().ok()?;
		state.node_position(id).map(|(x, y)| Vec3::new(x, y, 0.0))
	}

	fn camera_position(&self, position: Vec3, look_at: Vec3, duration: Duration) {
		let distance = Vec3::new(
			position.x - look_at.x,
			position.y - look_at.y,
			position.z - look_at.z,
		)
		.length();
		let k = ForceGraphState::zoom_for_distance(distance);
		if let Ok(mut state) = self.state.try_borrow_mut() {
			state.fly_to(look_at.x, look_at.y, k, duration);
		}
	}

	fn zoom_to_fit(&self, duration: Duration, padding: f64) {
		if let Ok(mut state) = self.state.try_borrow_mut() {
			state.fit_all(duration, padding);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::graph::{GraphNode, NodeKind};
	use crate::navigator::follow_eye;

	#[test]
	fn engine_reports_flat_positions() {
		let engine = CanvasEngine::default();
		engine.set_data(&GraphData {
			nodes: vec![GraphNode::new("min-a", "A", NodeKind::Ministry, 2)],
			links: vec![],
		});
		let p = engine.node_position("min-a").unwrap();
		assert_eq!(p.z, 0.0);
		assert!(engine.node_position("nope").is_none());
	}

	#[test]
	fn follow_distance_maps_to_unit_zoom() {
		let engine = CanvasEngine::default();
		let node = Vec3::new(30.0, 40.0, 0.0);
		engine.camera_position(follow_eye(node), node, Duration::ZERO);
		let state = engine.state().borrow();
		assert!((state.transform.k - 1.0).abs() < 1e-9);
		assert!((state.transform.x - (400.0 - 30.0)).abs() < 1e-9);
	}
}
