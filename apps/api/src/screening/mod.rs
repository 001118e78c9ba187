//! Resume screening: analysis, classification, rejection drafting and the
//! run aggregator that ties them together.

pub mod analyzer;
pub mod classifier;
pub mod drafter;
pub mod handlers;
pub mod pipeline;
pub mod prompts;
pub mod statistics;
