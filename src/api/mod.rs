//! Client side of the entity service: HTTP plumbing, relation queries and the
//! start-up directory loader.

mod client;
mod directory;
mod relations;

pub use client::ApiClient;
pub use directory::{Directory, active_ministries};
pub use relations::{HttpRelationFetcher, RelationKind, RelationSource, StaticRelations};
