//! # Radar Metrics Engine
//!
//! This crate computes the canonical per-client RFM analytics, per-product
//! analytics and dataset-wide KPIs from a normalized transaction set.
//!
//! ## Architectural Principles
//!
//! - **Layer 2 Logic:** This is a pure logic crate. It has no knowledge of
//!   external systems. It depends only on `core-types`, `statistics` and
//!   `configuration`.
//! - **Stateless Calculation:** The `MetricsEngine` is a stateless calculator
//!   parameterized by a reference date and the analysis settings. Identical
//!   inputs always produce identical outputs; there is no hidden clock or
//!   randomness, which makes runs reproducible and easy to test.
//! - **Graceful degradation:** Empty input returns empty lists and a
//!   zero-valued KPI report; groups with insufficient history are skipped
//!   metric-by-metric, never failing the whole computation.
//!
//! ## Public API
//!
//! - `MetricsEngine`: the main struct that contains the calculation logic.
//! - `GeneralKpis`: the standardized dataset-wide KPI report.

// Declare the modules that constitute this crate.
pub mod engine;
pub mod kpis;

// Re-export the key components to create a clean, public-facing API.
pub use engine::MetricsEngine;
pub use kpis::GeneralKpis;
