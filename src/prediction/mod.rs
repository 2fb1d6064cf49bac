pub mod aggregator;
pub mod pipeline;
pub mod types;

#[cfg(test)]
pub(crate) mod test_utils;

pub use aggregator::PredictionAggregator;
pub use pipeline::PredictionPipeline;
pub use types::PredictionEntry;
