//! The drill-down navigator: state machine, URL sync, camera follow and the
//! side panel's content. Framework-free; the Leptos wiring lives in
//! `components::navigator`.

mod camera;
mod machine;
mod panel;
mod timer;
mod url_sync;

pub use camera::{
	CameraFollower, FIT_DURATION, FIT_PADDING, FOLLOW_DISTANCE, FOLLOW_DURATION, FollowOutcome,
	FollowStart, MAX_POLLS, POLL_INTERVAL, RenderingEngine, Vec3, follow_eye,
};
pub use machine::{
	LevelKind, LoadingFlags, Navigator, RebuildStart, RebuildTicket, Transition, run_rebuild,
};
pub use panel::{
	PANEL_BATCH_SIZE, PanelInput, PanelItem, PanelPager, PanelTab, PanelView, select_panel,
};
pub use timer::{BrowserTimer, Timer};
pub use url_sync::{BrowserLocation, MemoryLocation, QueryStore, UrlSync, with_param};
