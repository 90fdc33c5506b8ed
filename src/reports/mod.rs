// Reports module - aggregates, flat export and chart descriptors

pub mod charts;
pub mod export;
pub mod summary;

pub use charts::{build_charts, Charts};
pub use export::{read_flat_table, to_flat_table, write_flat_table, FlatRow};
pub use summary::{delta_stats, rank, source_stats, DeltaStats, Rankings, SourceStats};
