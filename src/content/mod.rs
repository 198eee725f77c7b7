//! Application services. Each submodule takes its collaborators (store,
//! backend, config values) as arguments and owns no global state.

pub mod drafts;
pub mod export;
pub mod generator;
pub mod library;
pub mod planner;
pub mod query;
pub mod refine;
pub mod reminder;
pub mod scheduler;
