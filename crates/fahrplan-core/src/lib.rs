//! Task dependency and scheduling core for generated life-event plans.
//!
//! The plan engine (an external service, reached through
//! [`fahrplan_engine`]) generates a plan's tasks and dependency snapshot
//! from a set of facts. This crate owns everything the client decides
//! locally on top of that data:
//!
//! - which tasks are blocked by unmet dependencies ([`deps`])
//! - deterministic display order, overdue/critical flags, and progress
//!   ([`schedule`])
//! - the status transition state machine, including the force override
//!   ([`transition`])
//! - decision resolution and the recompute trigger ([`decision`])
//! - the per-plan working set tying it all together ([`session`])

pub mod decision;
pub mod deps;
pub mod engine;
pub mod schedule;
pub mod session;
pub mod transition;
