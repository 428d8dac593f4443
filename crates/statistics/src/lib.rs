//! # Radar Statistics Primitives
//!
//! Pure, stateless statistical functions over numeric and date sequences.
//! This is the lowest layer of the analytics core: it has no knowledge of
//! transactions, customers, or any other domain type.
//!
//! ## Resilience contract
//!
//! Every function in this crate is total:
//!
//! - Empty input returns the documented zero-valued default, never an error.
//! - Non-finite values (NaN, infinities) are dropped before computation, so a
//!   malformed sequence degrades to fewer samples instead of a failure.
//!
//! ## Public API
//!
//! - [`primitives`]: the recurrence/turnover/outlier/survival functions.
//! - [`describe`]: the shared numeric helpers (mean, population standard
//!   deviation, median, quantile, percentile ranks) reused by the engines.

pub mod describe;
pub mod primitives;

pub use describe::{mean, median, percentile_ranks, population_std, quantile};
pub use primitives::{
    bayesian_survival_score, coefficient_of_variation, repurchase_probability,
    turnover_confidence_interval, volume_outliers,
};
