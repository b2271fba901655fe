//! Open Library books API resolver.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

use super::{parse_year, Metadata, MetadataError, MetadataResolver};
use crate::identifier::Isbn;

#[derive(Debug, Deserialize)]
struct OpenLibraryBook {
    title: Option<String>,
    subtitle: Option<String>,
    #[serde(default)]
    authors: Vec<Named>,
    #[serde(default)]
    publishers: Vec<Named>,
    number_of_pages: Option<u32>,
    publish_date: Option<String>,
    cover: Option<Cover>,
    /// Either a plain string or `{ "type": ..., "value": ... }`.
    notes: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Named {
    name: String,
}

#[derive(Debug, Deserialize)]
struct Cover {
    large: Option<String>,
    medium: Option<String>,
    small: Option<String>,
}

/// Public lookup against `GET /api/books?bibkeys=ISBN:<isbn>&format=json&jscmd=data`.
pub struct OpenLibraryResolver {
    client: Client,
    base_url: String,
}

impl OpenLibraryResolver {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn lookup_url(&self, isbn: &Isbn) -> String {
        format!(
            "{}/api/books?bibkeys=ISBN:{}&format=json&jscmd=data",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(isbn.as_str())
        )
    }

    /// Parse an API response body. An empty object means the ISBN is unknown.
    pub(crate) fn parse_response(isbn: &Isbn, body: &str) -> Result<Option<Metadata>, MetadataError> {
        let mut books: HashMap<String, OpenLibraryBook> =
            serde_json::from_str(body).map_err(|e| MetadataError::Parse(e.to_string()))?;

        let Some(book) = books.remove(&format!("ISBN:{}", isbn)) else {
            return Ok(None);
        };

        let Some(title) = book.title.filter(|t| !t.trim().is_empty()) else {
            return Ok(None);
        };

        let title = match book.subtitle {
            Some(subtitle) if !subtitle.is_empty() => format!("{}: {}", title, subtitle),
            _ => title,
        };

        let description = book.notes.and_then(|notes| match notes {
            Value::String(s) => Some(s),
            Value::Object(mut map) => match map.remove("value") {
                Some(Value::String(s)) => Some(s),
                _ => None,
            },
            _ => None,
        });

        Ok(Some(Metadata {
            isbn: isbn.clone(),
            title,
            authors: book.authors.into_iter().map(|a| a.name).collect(),
            publisher: book.publishers.into_iter().next().map(|p| p.name),
            year: book.publish_date.as_deref().and_then(parse_year),
            pages: book.number_of_pages,
            image: book.cover.and_then(|c| c.large.or(c.medium).or(c.small)),
            description,
        }))
    }
}

#[async_trait]
impl MetadataResolver for OpenLibraryResolver {
    fn name(&self) -> &str {
        "openlibrary"
    }

    async fn resolve(&self, isbn: &Isbn) -> Result<Option<Metadata>, MetadataError> {
        debug!(isbn = %isbn, "Looking up ISBN on Open Library");

        let response = self.client.get(self.lookup_url(isbn)).send().await?;

        if !response.status().is_success() {
            return Err(MetadataError::Status {
                status: response.status().as_u16(),
            });
        }

        let body = response.text().await?;
        Self::parse_response(isbn, &body)
    }
}
