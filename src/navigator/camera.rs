//! Camera follow across the layout-settle period.
//!
//! A node that was just handed to the simulation has no position for an
//! unknown number of frames. The follower reads it immediately, then polls on
//! a fixed interval, and gives up with a fit-all after a bounded number of
//! polls. At most one poll loop is alive; starting another aborts it.

use std::time::Duration;

use futures::FutureExt;
use futures::future::{AbortHandle, LocalBoxFuture, abortable};

use super::timer::Timer;

/// Camera distance kept between the followed node and the eye.
pub const FOLLOW_DISTANCE: f64 = 150.0;
pub const FOLLOW_DURATION: Duration = Duration::from_millis(3000);
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);
pub const MAX_POLLS: usize = 20;
pub const FIT_DURATION: Duration = Duration::from_millis(800);
pub const FIT_PADDING: f64 = 60.0;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec3 {
	pub x: f64,
	pub y: f64,
	pub z: f64,
}

impl Vec3 {
	pub const fn new(x: f64, y: f64, z: f64) -> Self {
		Self { x, y, z }
	}

	pub fn length(&self) -> f64 {
		(self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
	}

	pub fn scale(&self, k: f64) -> Self {
		Self::new(self.x * k, self.y * k, self.z * k)
	}

	fn is_finite(&self) -> bool {
		self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
	}
}

/// The parts of the renderer the follower drives.
pub trait RenderingEngine {
	/// Simulated position of a node, once the layout has placed it.
	fn node_position(&self, id: &str) -> Option<Vec3>;
	/// Smoothly move the eye to `position`, looking at `look_at`.
	fn camera_position(&self, position: Vec3, look_at: Vec3, duration: Duration);
	/// Frame every visible node.
	fn zoom_to_fit(&self, duration: Duration, padding: f64);
}

/// Eye position for following a node at `node`: pushed out from the origin
/// along the node's direction so the node keeps its on-screen size.
pub fn follow_eye(node: Vec3) -> Vec3 {
	let distance = node.length();
	if distance < f64::EPSILON {
		return Vec3::new(0.0, 0.0, FOLLOW_DISTANCE);
	}
	node.scale(1.0 + FOLLOW_DISTANCE / distance)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FollowOutcome {
	/// The camera is on its way to the node.
	Tracked,
	/// The node never got a position; the camera framed everything instead.
	FellBack,
	/// Superseded by another follow or cancelled.
	Cancelled,
}

pub enum FollowStart {
	/// Position was available right away.
	Tracked,
	/// Spawn this future to keep polling.
	Polling(LocalBoxFuture<'static, FollowOutcome>),
}

pub struct CameraFollower<E, T> {
	engine: E,
	timer: T,
	pending: Option<AbortHandle>,
}

impl<E, T> CameraFollower<E, T>
where
	E: RenderingEngine + Clone + 'static,
	T: Timer + Clone + 'static,
{
	pub fn new(engine: E, timer: T) -> Self {
		Self {
			engine,
			timer,
			pending: None,
		}
	}

	/// Point the camera at `node_id`, now or once the layout places it.
	pub fn follow(&mut self, node_id: &str) -> FollowStart {
		self.cancel();
		if let Some(position) = placed(&self.engine, node_id) {
			fly_to(&self.engine, position);
			return FollowStart::Tracked;
		}

		let (task, handle) = abortable(poll_until_placed(
			self.engine.clone(),
			self.timer.clone(),
			node_id.to_string(),
		));
		self.pending = Some(handle);
		FollowStart::Polling(
			task.map(|result| result.unwrap_or(FollowOutcome::Cancelled))
				.boxed_local(),
		)
	}

	/// Frame the whole level, abandoning any node being followed.
	pub fn fit_all(&mut self) {
		self.cancel();
		self.engine.zoom_to_fit(FIT_DURATION, FIT_PADDING);
	}

	/// Abort the outstanding poll loop, if any.
	pub fn cancel(&mut self) {
		if let Some(handle) = self.pending.take() {
			handle.abort();
		}
	}
}

fn placed<E: RenderingEngine>(engine: &E, id: &str) -> Option<Vec3> {
	engine.node_position(id).filter(Vec3::is_finite)
}

fn fly_to<E: RenderingEngine>(engine: &E, node: Vec3) {
	engine.camera_position(follow_eye(node), node, FOLLOW_DURATION);
}

async fn poll_until_placed<E, T>(engine: E, timer: T, node_id: String) -> FollowOutcome
where
	E: RenderingEngine,
	T: Timer,
{
	for _ in 0..MAX_POLLS {
		timer.sleep(POLL_INTERVAL).await;
		if let Some(position) = placed(&engine, &node_id) {
			fly_to(&engine, position);
			return FollowOutcome::Tracked;
		}
	}
	log::debug!("{node_id} never placed after {MAX_POLLS} polls, fitting all");
	engine.zoom_to_fit(FIT_DURATION, FIT_PADDING);
	FollowOutcome::FellBack
}
