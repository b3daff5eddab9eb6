pub mod fields;
pub mod normalize;

#[cfg(test)]
mod tests;

pub use fields::{extract_article, reading_time_minutes};
pub use normalize::strip_markup;
