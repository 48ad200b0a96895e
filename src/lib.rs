//! Product roadmap management: RICE prioritization, OKR alignment, and
//! sprint tracking behind a small HTTP API.
//!
//! The crate splits into an entity store ([`db`]), pure scoring math
//! ([`scoring`]), read-side dashboard derivations ([`views`]), and the axum
//! boundary ([`api`]). Mutations flow through the store, which recomputes
//! derived fields synchronously; views re-derive their aggregates on every
//! read.

pub mod api;
pub mod db;
pub mod models;
pub mod scoring;
pub mod views;
