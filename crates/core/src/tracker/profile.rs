//! Per-site scraping and form data.
//!
//! Tracker variants only differ in where their tokens live, how searches are
//! encoded and what their upload form fields are called. All of that is data
//! in a [`TrackerProfile`]; the HTTP logic in `HttpTracker` is shared.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::identifier::Isbn;

/// Supported tracker sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackerKind {
    Bibliotik,
    MyAnonamouse,
}

impl TrackerKind {
    /// Built-in order used when the configuration does not set one.
    pub const ALL: [TrackerKind; 2] = [TrackerKind::Bibliotik, TrackerKind::MyAnonamouse];

    pub fn as_str(&self) -> &'static str {
        match self {
            TrackerKind::Bibliotik => "bibliotik",
            TrackerKind::MyAnonamouse => "myanonamouse",
        }
    }

    /// The built-in profile for this site.
    pub fn profile(&self) -> TrackerProfile {
        match self {
            TrackerKind::Bibliotik => TrackerProfile::bibliotik(),
            TrackerKind::MyAnonamouse => TrackerProfile::myanonamouse(),
        }
    }
}

impl fmt::Display for TrackerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a session token sits on the upload page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenLocator {
    /// CSS selector of the element holding the value.
    pub selector: String,
    /// Attribute holding the value. `None` reads the element text.
    pub attribute: Option<String>,
}

impl TokenLocator {
    pub fn attribute(selector: &str, attribute: &str) -> Self {
        Self {
            selector: selector.to_string(),
            attribute: Some(attribute.to_string()),
        }
    }

    pub fn text(selector: &str) -> Self {
        Self {
            selector: selector.to_string(),
            attribute: None,
        }
    }
}

/// Login form shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginForm {
    pub path: String,
    pub username_field: String,
    pub password_field: String,
    /// Constant fields sent along with the credentials.
    pub extra: Vec<(String, String)>,
}

/// Upload form field names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFields {
    pub torrent: String,
    pub title: String,
    pub authors: String,
    pub publisher: String,
    pub year: String,
    pub pages: String,
    pub isbn: String,
    pub image: String,
    pub description: String,
    /// Field carrying the session's authorization token, if the form wants it.
    pub auth_token: Option<String>,
    /// Field carrying the book format code, if the form wants it.
    pub format: Option<String>,
    /// Constant fields sent with every upload.
    pub extra: Vec<(String, String)>,
}

/// Which resolver a tracker's uploads take their metadata from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataSource {
    /// The shared public resolver.
    Public,
    /// The tracker's own lookup endpoint, authorized with the session token
    /// passed as `auth_param`.
    Tracker { path: String, auth_param: String },
}

/// Everything site-specific about one tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerProfile {
    pub name: String,
    pub base_url: String,
    pub login: LoginForm,
    /// Authenticated page carrying the two session tokens.
    pub upload_page_path: String,
    pub auth_token: TokenLocator,
    pub announce_url: TokenLocator,
    /// Search path with a `{query}` placeholder.
    pub search_path: String,
    /// Exact text present on a search page with zero results.
    pub not_found_marker: String,
    pub upload_path: String,
    pub fields: UploadFields,
    /// Lower-case extension to the site's format code.
    pub format_codes: Vec<(String, String)>,
    pub metadata: MetadataSource,
}

fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
    items
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

impl TrackerProfile {
    pub fn bibliotik() -> Self {
        Self {
            name: TrackerKind::Bibliotik.to_string(),
            base_url: "https://bibliotik.me".to_string(),
            login: LoginForm {
                path: "/login".to_string(),
                username_field: "username".to_string(),
                password_field: "password".to_string(),
                extra: pairs(&[("keeplogged", "1")]),
            },
            upload_page_path: "/upload/ebook".to_string(),
            auth_token: TokenLocator::attribute("input[name=\"authkey\"]", "value"),
            announce_url: TokenLocator::text("#announce"),
            search_path: "/torrents/?search={query}".to_string(),
            not_found_marker: "No torrents found.".to_string(),
            upload_path: "/upload/ebook".to_string(),
            fields: UploadFields {
                torrent: "TorrentFileField".to_string(),
                title: "TitleField".to_string(),
                authors: "AuthorsField".to_string(),
                publisher: "PublishersField".to_string(),
                year: "YearField".to_string(),
                pages: "PagesField".to_string(),
                isbn: "IsbnField".to_string(),
                image: "ImageField".to_string(),
                description: "DescriptionField".to_string(),
                auth_token: Some("authkey".to_string()),
                format: Some("FormatField".to_string()),
                extra: pairs(&[("upload", ""), ("LanguageField", "1"), ("NotifyField", "1")]),
            },
            format_codes: pairs(&[
                ("pdf", "2"),
                ("djvu", "6"),
                ("epub", "15"),
                ("mobi", "16"),
                ("azw3", "21"),
                ("cbr", "4"),
                ("cbz", "5"),
            ]),
            metadata: MetadataSource::Tracker {
                path: "/isbnlookup".to_string(),
                auth_param: "authkey".to_string(),
            },
        }
    }

    pub fn myanonamouse() -> Self {
        Self {
            name: TrackerKind::MyAnonamouse.to_string(),
            base_url: "https://www.myanonamouse.net".to_string(),
            login: LoginForm {
                path: "/takelogin.php".to_string(),
                username_field: "email".to_string(),
                password_field: "password".to_string(),
                extra: pairs(&[("rememberMe", "yes")]),
            },
            upload_page_path: "/tor/upload.php".to_string(),
            auth_token: TokenLocator::attribute("input[name=\"csrf\"]", "value"),
            announce_url: TokenLocator::attribute("#announceURL", "value"),
            search_path: "/tor/browse.php?tor[text]={query}&tor[srchIn][isbn]=true".to_string(),
            not_found_marker: "Nothing returned, out of".to_string(),
            upload_path: "/tor/takeUpload.php".to_string(),
            fields: UploadFields {
                torrent: "tor[file]".to_string(),
                title: "tor[title]".to_string(),
                authors: "tor[author]".to_string(),
                publisher: "tor[publisher]".to_string(),
                year: "tor[year]".to_string(),
                pages: "tor[pages]".to_string(),
                isbn: "tor[isbn]".to_string(),
                image: "tor[posterURL]".to_string(),
                description: "tor[description]".to_string(),
                auth_token: Some("csrf".to_string()),
                format: None,
                extra: pairs(&[("tor[category]", "14"), ("tor[language]", "1")]),
            },
            format_codes: Vec::new(),
            metadata: MetadataSource::Public,
        }
    }

    /// Point the profile at a different site root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Absolute URL for a site path.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    pub fn search_url(&self, isbn: &Isbn) -> String {
        self.url(
            &self
                .search_path
                .replace("{query}", &urlencoding::encode(isbn.as_str())),
        )
    }

    /// Format code for a file extension. Unknown extensions fall back to the
    /// upper-cased extension itself.
    pub fn format_code(&self, extension: &str) -> String {
        let extension = extension.to_lowercase();
        self.format_codes
            .iter()
            .find(|(ext, _)| *ext == extension)
            .map(|(_, code)| code.clone())
            .unwrap_or_else(|| extension.to_uppercase())
    }
}
