//! Tracker-hosted ISBN lookup.
//!
//! Some trackers expose their own lookup endpoint that only answers requests
//! carrying the session's authorization key, so the resolver is built from an
//! authenticated session rather than configured globally.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use super::{BookRecord, Metadata, MetadataError, MetadataResolver};
use crate::identifier::Isbn;

pub struct TrackerLookupResolver {
    name: String,
    client: Client,
    url: String,
    auth_param: String,
    auth_token: String,
}

impl TrackerLookupResolver {
    /// `client` must carry the tracker's session cookies.
    pub fn new(
        tracker: &str,
        client: Client,
        url: impl Into<String>,
        auth_param: impl Into<String>,
        auth_token: impl Into<String>,
    ) -> Self {
        Self {
            name: format!("{}-lookup", tracker),
            client,
            url: url.into(),
            auth_param: auth_param.into(),
            auth_token: auth_token.into(),
        }
    }

    pub(crate) fn parse_response(isbn: &Isbn, body: &str) -> Result<Option<Metadata>, MetadataError> {
        if body.trim().is_empty() {
            return Ok(None);
        }

        let value: Value =
            serde_json::from_str(body).map_err(|e| MetadataError::Parse(e.to_string()))?;

        let record = match value {
            Value::Array(items) => match items.into_iter().next() {
                Some(first) => first,
                None => return Ok(None),
            },
            object @ Value::Object(_) => object,
            _ => return Ok(None),
        };

        let record: BookRecord =
            serde_json::from_value(record).map_err(|e| MetadataError::Parse(e.to_string()))?;

        Ok(record.into_metadata(isbn))
    }
}

#[async_trait]
impl MetadataResolver for TrackerLookupResolver {
    fn name(&self) -> &str {
        &self.name
    }

    async fn resolve(&self, isbn: &Isbn) -> Result<Option<Metadata>, MetadataError> {
        debug!(resolver = %self.name, isbn = %isbn, "Looking up ISBN on tracker");

        let response = self
            .client
            .get(&self.url)
            .query(&[
                ("isbn", isbn.as_str()),
                (self.auth_param.as_str(), self.auth_token.as_str()),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(MetadataError::Status {
                status: response.status().as_u16(),
            });
        }

        let body = response.text().await?;
        Self::parse_response(isbn, &body)
    }
}
