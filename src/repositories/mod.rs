pub mod article;
pub mod errors;
pub mod memory;
pub mod overlay;
pub mod source;
pub mod tag;

pub use article::{ArticleReader, ArticleStore, InsertOutcome, PgArticleStore};
pub use errors::{StoreError, bounded};
pub use memory::InMemoryStore;
pub use overlay::{OverlayStore, PgOverlayStore};
pub use source::{PgSourceStore, SourceStore};
pub use tag::{PgTagStore, TagStore, slugify};
