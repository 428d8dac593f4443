//! # Radar Report Assembly
//!
//! Joins the metrics and insights outputs into the named report tables and
//! exposes `run_analysis`, the single entry point of the analytics core.
//!
//! ## Architectural Principles
//!
//! - **Layer 4 Glue:** No new statistics live here; this crate only derives
//!   presentation-ready tables from the engine outputs.
//! - **Stable contract:** The table names and column sets are part of the
//!   output contract consumed by the export collaborator and must not drift.

// Declare the modules that constitute this crate.
pub mod assemble;
pub mod tables;

// Re-export the key components to create a clean, public-facing API.
pub use assemble::{AnalysisOutput, run_analysis};
pub use tables::{
    BEHAVIOR_TABLE, BehaviorIndicator, CLIENTS_TABLE, HISTORY_TABLE, MIX_TABLE,
    MonthlyHistoryRow, RELATIONSHIP_TABLE, RelationshipRow, ReportBundle,
};
