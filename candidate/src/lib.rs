pub mod cache;
mod filter;
mod fuzzy;
mod key;
pub mod producer;
mod semantic;
mod types;

pub use filter::filter_candidates;
pub use filter::filter_range_with_query_runes;
pub use filter::filter_subset_with_query_runes;
pub use filter::filter_with_query_runes;
pub use filter::merge_filtered_candidates;
pub use fuzzy::fuzzy_positions_runes;
pub use fuzzy::lower_runes;
pub use fuzzy::trim_runes;
pub use key::extract_key;
pub use producer::ScanError;
pub use producer::start_producer;
pub use semantic::compute_semantic_score;
pub use types::Candidate;
pub use types::DEFAULT_CONFIG_PATTERN;
pub use types::DEFAULT_PATTERN;
pub use types::FilteredCandidate;
pub use types::ProducerConfig;
