//! Profile-driven HTTP tracker session.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{multipart, Client, Response, StatusCode, Url};
use tracing::{debug, info};

use super::html::harvest;
use super::profile::{MetadataSource, TrackerProfile};
use super::{AuthError, TrackerError, TrackerSite};
use crate::http::{build_client, HttpOptions};
use crate::identifier::Isbn;
use crate::metadata::{Metadata, MetadataResolver, TrackerLookupResolver};
use crate::packager::TorrentDescriptor;

/// An authenticated session with one tracker site.
pub struct HttpTracker {
    client: Client,
    profile: TrackerProfile,
    auth_token: String,
    announce_url: String,
    resolver: Option<Arc<dyn MetadataResolver>>,
}

impl std::fmt::Debug for HttpTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTracker")
            .field("name", &self.profile.name)
            .field("base_url", &self.profile.base_url)
            .field("auth_token", &"<redacted>")
            .field("announce_url", &"<redacted>")
            .finish()
    }
}

impl HttpTracker {
    /// Log in and harvest the session tokens from the upload page.
    pub async fn authenticate(
        profile: TrackerProfile,
        username: &str,
        password: &str,
        options: &HttpOptions,
    ) -> Result<Self, AuthError> {
        let client = build_client(options, true)?;

        let mut params = vec![
            (profile.login.username_field.as_str(), username),
            (profile.login.password_field.as_str(), password),
        ];
        params.extend(
            profile
                .login
                .extra
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str())),
        );

        let response = client
            .post(profile.url(&profile.login.path))
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(AuthError::LoginRejected {
                tracker: profile.name.clone(),
                reason: format!("HTTP {}", status),
            });
        }

        let response = client
            .get(profile.url(&profile.upload_page_path))
            .send()
            .await?;

        if is_login_redirect(&profile, &response) {
            return Err(AuthError::LoginRejected {
                tracker: profile.name.clone(),
                reason: "redirected back to the login page".to_string(),
            });
        }

        let body = response.text().await?;

        let auth_token =
            harvest(&body, &profile.auth_token)?.ok_or_else(|| AuthError::TokenNotFound {
                tracker: profile.name.clone(),
                token: "authorization key",
            })?;

        let announce_url =
            harvest(&body, &profile.announce_url)?.ok_or_else(|| AuthError::TokenNotFound {
                tracker: profile.name.clone(),
                token: "announce URL",
            })?;

        let resolver: Option<Arc<dyn MetadataResolver>> = match &profile.metadata {
            MetadataSource::Public => None,
            MetadataSource::Tracker { path, auth_param } => {
                let lookup = TrackerLookupResolver::new(
                    &profile.name,
                    client.clone(),
                    profile.url(path),
                    auth_param.as_str(),
                    auth_token.as_str(),
                );
                Some(Arc::new(lookup) as Arc<dyn MetadataResolver>)
            }
        };

        info!(tracker = %profile.name, "Authenticated");

        Ok(Self {
            client,
            profile,
            auth_token,
            announce_url,
            resolver,
        })
    }

    pub fn profile(&self) -> &TrackerProfile {
        &self.profile
    }

    fn expired(&self) -> TrackerError {
        TrackerError::SessionExpired {
            tracker: self.profile.name.clone(),
        }
    }

    fn check_session(&self, response: &Response) -> Result<(), TrackerError> {
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED
            || status == StatusCode::FORBIDDEN
            || is_login_redirect(&self.profile, response)
        {
            return Err(self.expired());
        }
        Ok(())
    }

    /// Text fields of the upload form, in submission order.
    pub(crate) fn form_fields(&self, book: &Path, metadata: &Metadata) -> Vec<(String, String)> {
        let fields = &self.profile.fields;
        let optional = |v: Option<u32>| v.map(|n| n.to_string()).unwrap_or_default();

        let mut form = Vec::new();
        if let Some(name) = &fields.auth_token {
            form.push((name.clone(), self.auth_token.clone()));
        }
        form.extend(fields.extra.iter().cloned());

        if let Some(name) = &fields.format {
            let extension = book
                .extension()
                .map(|e| e.to_string_lossy().to_string())
                .unwrap_or_default();
            form.push((name.clone(), self.profile.format_code(&extension)));
        }

        form.extend([
            (fields.title.clone(), metadata.title.clone()),
            (fields.authors.clone(), metadata.authors_joined()),
            (
                fields.publisher.clone(),
                metadata.publisher.clone().unwrap_or_default(),
            ),
            (fields.year.clone(), optional(metadata.year)),
            (fields.pages.clone(), optional(metadata.pages)),
            (fields.isbn.clone(), metadata.isbn.to_string()),
            (fields.image.clone(), metadata.image.clone().unwrap_or_default()),
            (
                fields.description.clone(),
                metadata.description.clone().unwrap_or_default(),
            ),
        ]);

        form
    }
}

/// Whether a response ended up on the profile's login page.
fn is_login_redirect(profile: &TrackerProfile, response: &Response) -> bool {
    is_login_url(profile, response.url())
}

/// Same origin and the exact login path; the query string is ignored.
fn is_login_url(profile: &TrackerProfile, url: &Url) -> bool {
    let Ok(login) = Url::parse(&profile.url(&profile.login.path)) else {
        return false;
    };
    login.origin() == url.origin()
        && login.path().trim_end_matches('/') == url.path().trim_end_matches('/')
}

#[async_trait]
impl TrackerSite for HttpTracker {
    fn name(&self) -> &str {
        &self.profile.name
    }

    fn announce_url(&self) -> &str {
        &self.announce_url
    }

    fn metadata_resolver(&self) -> Option<Arc<dyn MetadataResolver>> {
        self.resolver.clone()
    }

    async fn has_book(&self, isbn: &Isbn) -> Result<bool, TrackerError> {
        let url = self.profile.search_url(isbn);
        debug!(tracker = %self.profile.name, isbn = %isbn, "Searching tracker");

        let response = self.client.get(&url).send().await?;
        self.check_session(&response)?;

        let body = response.text().await?;
        Ok(!body.contains(&self.profile.not_found_marker))
    }

    async fn submit(
        &self,
        book: &Path,
        torrent: &TorrentDescriptor,
        metadata: &Metadata,
    ) -> Result<(), TrackerError> {
        let bytes = torrent.read().await?;
        let torrent_part = multipart::Part::bytes(bytes)
            .file_name(torrent.file_name())
            .mime_str("application/x-bittorrent")?;

        let form = self
            .form_fields(book, metadata)
            .into_iter()
            .fold(
                multipart::Form::new().part(self.profile.fields.torrent.clone(), torrent_part),
                |form, (name, value)| form.text(name, value),
            );

        debug!(
            tracker = %self.profile.name,
            book = %book.display(),
            title = %metadata.title,
            "Submitting upload"
        );

        let response = self
            .client
            .post(self.profile.url(&self.profile.upload_path))
            .multipart(form)
            .send()
            .await?;
        self.check_session(&response)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TrackerError::Rejected {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        Ok(())
    }
}
