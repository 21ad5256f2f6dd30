//! Contest print station: upload intake, PDF normalization, per-team page
//! quotas, and durable print dispatch for a single on-site event.
//!
//! The crate is organized around the submission pipeline in
//! [`pipeline::service`]; the HTTP surface in [`pipeline::router`] is a thin
//! adapter that the `print-station-api` service mounts next to its own
//! operational endpoints.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod roster;
pub mod telemetry;
