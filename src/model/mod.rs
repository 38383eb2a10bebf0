//! Domain entities and the pure resolver that produces them.

mod entities;
pub mod resolver;

pub use entities::{
	ActiveMinistry, Dictionaries, Entity, EntityKind, HeadOfState, PointInTime, Relation,
	parse_timestamp, to_active_at,
};
