//! # Radar Insights Engine
//!
//! Generates the standardized R.I.C.O. alerts (stock-out risk, sharp revenue
//! drop, volume anomaly) from a normalized transaction set, enriched with
//! statistical context and PDV segmentation triggers.
//!
//! ## Architectural Principles
//!
//! - **Layer 3 Logic:** Pure rule evaluation over in-memory data. Alert
//!   persistence (delete-then-insert per dataset) belongs to the caller.
//! - **Independent rules:** Each rule is evaluated on its own groups with its
//!   own minimum sample size; a group skipped by one rule never prevents the
//!   others from producing alerts.

// Declare the modules that constitute this crate.
pub mod engine;

// Re-export the key components to create a clean, public-facing API.
pub use engine::InsightsEngine;
