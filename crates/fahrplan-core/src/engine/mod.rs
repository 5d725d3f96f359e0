//! The plan engine collaborator interface.

pub mod http;
pub mod trait_def;

pub use trait_def::PlanEngine;
