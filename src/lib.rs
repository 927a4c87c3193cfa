//! EV traction battery digital twin.
//!
//! A real-time engine ([`controller`]) advances a coupled electrical, thermal
//! and aging model ([`simulation`]) from live driver commands, samples
//! telemetry, raises threshold warnings and exports each session as CSV
//! ([`export`]). The [`api`] module exposes the engine over HTTP.

pub mod api;
pub mod config;
pub mod controller;
pub mod error;
pub mod export;
pub mod report;
pub mod simulation;
pub mod telemetry;
