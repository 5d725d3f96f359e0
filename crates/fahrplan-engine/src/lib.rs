//! Wire models and HTTP client for the external plan engine.
//!
//! The plan engine owns plan generation, recomputation, and persistence.
//! This crate speaks its HTTP API and nothing else: no retries, no
//! caching, no scheduling logic. The scheduling core lives in
//! `fahrplan-core` and consumes these types.

pub mod client;
pub mod config;
pub mod error;
pub mod models;

pub use client::EngineClient;
pub use config::EngineConfig;
pub use error::EngineError;
