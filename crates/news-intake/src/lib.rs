//! News Intake Module
//!
//! Turns collector output into normalized, deduplicated articles and pulls
//! candidate entity strings out of their text.

pub mod article;
pub mod dedup;
pub mod entities;

pub use article::{load_raw_articles, normalize_articles, normalize_published_at, stable_digest};
pub use dedup::{dedup_articles, Identity};
pub use entities::RegexEntityExtractor;
