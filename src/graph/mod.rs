//! Graph data for the drill-down: node/link types, the level builder and its cache.

mod cache;
mod level;
mod types;

pub use cache::{LevelCache, LevelKey};
pub use level::{Focus, LevelContext, LevelFilter, build_level};
pub use types::{
	GROUP_GOVERNMENT, GROUP_MINISTRY, GROUP_MINISTRY_LEAF, GROUP_ROOT_LEAF, GraphData, GraphLink,
	GraphNode, LevelData, LevelIndex, LevelTag, NodeKind,
};
