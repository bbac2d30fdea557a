// Core algorithm exports
pub mod distance;
pub mod filters;
pub mod matcher;
pub mod scoring;

pub use distance::haversine_distance;
pub use filters::{is_eligible, ExclusionSets};
pub use matcher::{Matcher, RankResult, ScoredCandidate};
pub use scoring::calculate_match_score;
