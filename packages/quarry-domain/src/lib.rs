pub mod keywords;
pub mod result;
pub mod scorer;
pub mod script;

pub use result::{ScoredResult, metadata_path};
pub use scorer::{Scored, sort_by_score, sort_scored};
