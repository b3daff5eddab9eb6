pub mod errors;
pub mod manual;
pub mod orchestrator;
pub mod trigger;

pub use errors::IngestError;
pub use manual::{NewArticleRequest, Submitted, submit_article};
pub use orchestrator::{
    IngestOutcome, IngestSettings, Ingestor, SourceOutcome, SourceReport, SourceStatus,
};
pub use trigger::{IngestHandle, IngestTrigger};
