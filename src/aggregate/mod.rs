//! Metric aggregates
//!
//! Builds the metric-aggregate query body and flattens the matrix-shaped
//! response into per-date rows.

mod normalize;
mod query;

pub use normalize::{
    normalize, repair, AggregateRecord, DIMENSION_NOT_AVAILABLE, NO_DIMENSIONS_SELECTED,
};
pub use query::{AggregateQuery, Interval, MEASUREMENTS};

#[cfg(test)]
mod tests;
