pub mod client;
pub mod errors;
pub mod pipeline;
pub mod types;

pub use client::{FeedClient, FeedFetcher};
pub use errors::FeedError;
pub use pipeline::parse_feed;
pub use types::{Enclosure, RawEntry};
