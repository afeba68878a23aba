//! Release plan: data model, construction and manipulation.

pub mod builder;
pub mod level_iterator;
pub mod manipulation;
pub mod release_plan;
pub mod version;

pub use builder::{BuildOptions, ReleasePlanBuilder};
pub use level_iterator::LevelIterator;
pub use release_plan::{ReleasePlan, ReleasePlanIter, ReleasePlanParts};
pub use version::VersionDeterminer;
