//! DGR Core Library
//!
//! Plans the release of a project together with all of its (transitive)
//! dependents and drives the release jobs in dependency order.

pub mod analyser;
pub mod domain;
pub mod fakes;
pub mod obs;
pub mod plan;
pub mod release;
pub mod telemetry;

pub use analyser::{Analyser, InMemoryAnalyser, ProjectUniverse};

pub use domain::{
    Command, CommandKind, CommandState, Config, ConfigKey, Project, ProjectId, Relation,
    ReleaseError, ReleaseState, Result, StateKind, TransitionError, TypeOfRun,
};

pub use plan::{BuildOptions, LevelIterator, ReleasePlan, ReleasePlanBuilder, VersionDeterminer};

pub use release::{
    ConfiguredJobDataFactory, JobExecutionData, JobExecutor, JsonFilePublisher, PollOptions,
    Releaser, StatePublisher,
};

pub use telemetry::init_tracing;
