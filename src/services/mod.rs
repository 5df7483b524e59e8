pub mod aggregator;
pub mod marking;
pub mod review_writer;
pub mod segmenter;
pub mod similarity;

pub use marking::MarkingEngine;
pub use review_writer::ReviewWriter;
pub use similarity::SimilarityScorer;
