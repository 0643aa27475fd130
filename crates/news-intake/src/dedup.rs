use analysis_core::{Article, RawArticle};
use std::collections::HashSet;

/// Fields that make up an article's identity. Missing fields read as "".
pub trait Identity {
    fn source(&self) -> &str;
    fn title(&self) -> &str;
    fn url(&self) -> &str;

    /// `source|title|url`, each trimmed and lowercased
    fn signature(&self) -> String {
        format!(
            "{}|{}|{}",
            self.source().trim().to_lowercase(),
            self.title().trim().to_lowercase(),
            self.url().trim().to_lowercase()
        )
    }
}

impl Identity for RawArticle {
    fn source(&self) -> &str {
        self.source.as_deref().unwrap_or("")
    }

    fn title(&self) -> &str {
        self.title.as_deref().unwrap_or("")
    }

    fn url(&self) -> &str {
        self.url.as_deref().unwrap_or("")
    }
}

impl Identity for Article {
    fn source(&self) -> &str {
        &self.source
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn url(&self) -> &str {
        &self.url
    }
}

/// Drop later records whose signature was already seen, keeping first-seen order.
pub fn dedup_articles<T: Identity>(articles: impl IntoIterator<Item = T>) -> Vec<T> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for article in articles {
        if seen.insert(article.signature()) {
            out.push(article);
        }
    }

    out
}
