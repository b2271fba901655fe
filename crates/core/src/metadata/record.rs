//! Flat bibliographic record returned by tracker lookup endpoints.

use serde::Deserialize;
use serde_json::Value;

use super::{parse_year, Metadata};
use crate::identifier::Isbn;

/// A lookup answer keyed `authors, title, isbn, publisher, pages, year, image,
/// description`. Services are loose about types (numbers as strings, authors
/// as a list or a comma-separated string), so every field is kept as raw JSON
/// until conversion.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookRecord {
    #[serde(default)]
    pub title: Value,
    #[serde(default)]
    pub authors: Value,
    #[serde(default)]
    pub isbn: Value,
    #[serde(default)]
    pub publisher: Value,
    #[serde(default)]
    pub pages: Value,
    #[serde(default)]
    pub year: Value,
    #[serde(default)]
    pub image: Value,
    #[serde(default)]
    pub description: Value,
}

impl BookRecord {
    /// Convert into [`Metadata`]. A record without a title is an empty result.
    pub fn into_metadata(self, requested: &Isbn) -> Option<Metadata> {
        let title = text(&self.title)?;

        let isbn = text(&self.isbn)
            .and_then(|raw| Isbn::normalize(&raw))
            .unwrap_or_else(|| requested.clone());

        Some(Metadata {
            isbn,
            title,
            authors: authors(&self.authors),
            publisher: text(&self.publisher),
            year: text(&self.year).and_then(|y| parse_year(&y)),
            pages: text(&self.pages).and_then(|p| p.trim().parse().ok()),
            image: text(&self.image),
            description: text(&self.description),
        })
    }
}

fn text(value: &Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

fn authors(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(text).collect(),
        Value::String(s) => s
            .split(',')
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}
