//! Domain models for riceboard.
//!
//! # Core Concepts
//!
//! - [`Feature`]: A roadmap item carrying its RICE inputs and the derived
//!   `rice_score`. Features link to any number of OKRs and to at most one
//!   sprint at a time.
//! - [`Okr`]: A two-level goal hierarchy. Objectives stand alone; key-results
//!   point at their objective via `parent_id`. `progress` is derived from
//!   `current_value` / `target_value`.
//! - [`Sprint`]: A time-boxed iteration with planned capacity and, once
//!   completed, a recorded velocity. Sprint membership lives on the feature
//!   (`sprint_id`), never on the sprint.
//! - [`ActivityLog`]: Append-only record of create/update events fired from
//!   the API boundary.
//!
//! Derived fields (`rice_score`, `progress`) are owned by the store: they are
//! recomputed on every mutation that touches their inputs and are never
//! accepted from callers.

mod activity;
mod feature;
mod okr;
mod sprint;

pub use activity::*;
pub use feature::*;
pub use okr::*;
pub use sprint::*;
