pub mod config;
pub mod entities;
pub mod extractor;
pub mod fetcher;
pub mod ingest;
pub mod ranking;
pub mod repositories;
