pub mod engine;
pub mod query;
pub mod score;

pub use engine::{ListingResult, QueryEngine};
pub use query::{ArticleQuery, ListingRequest, SortMode};
pub use score::trending_score;
