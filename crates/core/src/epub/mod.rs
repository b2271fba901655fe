//! Dublin Core metadata embedded in EPUB files.
//!
//! An EPUB is a zip container whose package document (the `.opf` file)
//! carries a `<metadata>` block. The package is located through the
//! `full-path` of the first rootfile in `META-INF/container.xml`; books that
//! violate the layout are searched for `OEBPS/content.opf` and `content.opf`.
//!
//! Embedded metadata is informational. Books are identified by the ISBN in
//! their file name only.

mod error;

pub use error::EpubError;

use std::collections::BTreeMap;
use std::fmt;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::Serialize;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::identifier::Isbn;
use crate::metadata::{parse_year, Metadata};

const CONTAINER_PATH: &str = "META-INF/container.xml";

/// Package locations tried when the container does not name one.
const FALLBACK_PACKAGE_PATHS: [&str; 4] = [
    "OEBPS/content.opf",
    "OEBPS/Content.opf",
    "content.opf",
    "Content.opf",
];

/// A metadata element's text and its attributes, keyed by local name
/// (`opf:file-as` is stored as `file-as`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetaValue {
    pub value: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl MetaValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)?;
        if !self.attributes.is_empty() {
            let attributes: Vec<String> = self
                .attributes
                .iter()
                .map(|(k, v)| format!("{}: '{}'", k, v))
                .collect();
            write!(f, " ({})", attributes.join(", "))?;
        }
        Ok(())
    }
}

/// Metadata read from an EPUB package document.
///
/// Single-valued fields keep the first occurrence. A field absent from the
/// package stays `None` or empty; a field present but empty keeps an empty
/// value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EpubMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<MetaValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<MetaValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<MetaValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<MetaValue>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub creators: Vec<MetaValue>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub contributors: Vec<MetaValue>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub identifiers: Vec<MetaValue>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dates: Vec<MetaValue>,
}

impl EpubMetadata {
    /// Creators with the `aut` role, or every creator without a role when
    /// none is tagged as author.
    pub fn authors(&self) -> Vec<&MetaValue> {
        let tagged: Vec<&MetaValue> = self
            .creators
            .iter()
            .filter(|c| c.attribute("role") == Some("aut"))
            .collect();
        if !tagged.is_empty() {
            return tagged;
        }
        self.creators
            .iter()
            .filter(|c| c.attribute("role").is_none())
            .collect()
    }

    /// First identifier that is a valid ISBN, preferring `scheme="ISBN"`.
    pub fn isbn(&self) -> Option<Isbn> {
        let declared = self.identifiers.iter().filter(|id| {
            id.attribute("scheme")
                .is_some_and(|s| s.eq_ignore_ascii_case("isbn"))
        });
        declared
            .chain(self.identifiers.iter())
            .find_map(|id| Isbn::normalize(strip_isbn_urn(&id.value)))
    }

    /// Earliest year among the dates.
    pub fn year(&self) -> Option<u32> {
        self.dates.iter().filter_map(|d| parse_year(&d.value)).min()
    }

    /// Author names for sorting: `file-as` when given, else the display name.
    fn author_names(&self) -> Vec<String> {
        self.authors()
            .into_iter()
            .map(|a| a.attribute("file-as").unwrap_or(&a.value).trim().to_string())
            .filter(|a| !a.is_empty())
            .collect()
    }

    /// Convert into [`Metadata`] for `isbn`. Without a title there is nothing
    /// to describe.
    pub fn to_metadata(&self, isbn: &Isbn) -> Option<Metadata> {
        let title = non_empty(self.title.as_ref())?;
        let mut metadata = Metadata::new(isbn.clone(), title);
        self.fill_missing(&mut metadata);
        Some(metadata)
    }

    /// Fill gaps in resolved metadata. Fields already present are kept.
    pub fn fill_missing(&self, metadata: &mut Metadata) {
        if metadata.authors.is_empty() {
            metadata.authors = self.author_names();
        }
        if metadata.year.is_none() {
            metadata.year = self.year();
        }
        if metadata.publisher.is_none() {
            metadata.publisher = non_empty(self.publisher.as_ref());
        }
        if metadata.description.is_none() {
            metadata.description = non_empty(self.description.as_ref());
        }
    }

    fn insert(&mut self, field: &str, value: MetaValue) {
        match field {
            "title" => set_once(&mut self.title, value),
            "publisher" => set_once(&mut self.publisher, value),
            "language" => set_once(&mut self.language, value),
            "description" => set_once(&mut self.description, value),
            "creator" => self.creators.push(value),
            "contributor" => self.contributors.push(value),
            "identifier" => self.identifiers.push(value),
            "date" => self.dates.push(value),
            _ => {}
        }
    }
}

fn set_once(slot: &mut Option<MetaValue>, value: MetaValue) {
    if slot.is_none() {
        *slot = Some(value);
    }
}

impl fmt::Display for EpubMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let singles = [
            ("title", &self.title),
            ("publisher", &self.publisher),
            ("language", &self.language),
            ("description", &self.description),
        ];
        for (name, value) in singles {
            if let Some(value) = value {
                writeln!(f, "- {}: {}", name, value)?;
            }
        }

        let lists = [
            ("creator", &self.creators),
            ("contributor", &self.contributors),
            ("identifier", &self.identifiers),
            ("date", &self.dates),
        ];
        for (name, values) in lists {
            if values.is_empty() {
                continue;
            }
            writeln!(f, "- {}:", name)?;
            for value in values {
                writeln!(f, "\t- {}", value)?;
            }
        }
        Ok(())
    }
}

fn is_field(name: &str) -> bool {
    matches!(
        name,
        "title"
            | "publisher"
            | "language"
            | "description"
            | "creator"
            | "contributor"
            | "identifier"
            | "date"
    )
}

fn non_empty(value: Option<&MetaValue>) -> Option<String> {
    value
        .map(|v| v.value.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn strip_isbn_urn(value: &str) -> &str {
    let value = value.trim();
    match value.get(..9) {
        Some(prefix) if prefix.eq_ignore_ascii_case("urn:isbn:") => &value[9..],
        _ => value,
    }
}

/// Read the package metadata of the EPUB at `path`.
pub fn read_epub_metadata(path: &Path) -> Result<EpubMetadata, EpubError> {
    let file = File::open(path).map_err(|source| EpubError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut archive = ZipArchive::new(file).map_err(|source| EpubError::Container {
        path: path.to_path_buf(),
        source,
    })?;

    let package = find_package(path, &mut archive)?;
    let xml = read_entry(path, &mut archive, &package)?
        .ok_or_else(|| EpubError::PackageNotFound {
            path: path.to_path_buf(),
        })?;
    parse_package(&package, &xml)
}

/// [`read_epub_metadata`] on the blocking pool.
pub async fn read_epub_metadata_async(path: &Path) -> Result<EpubMetadata, EpubError> {
    let owned = path.to_path_buf();
    tokio::task::spawn_blocking(move || read_epub_metadata(&owned))
        .await
        .map_err(|e| EpubError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::other(e),
        })?
}

fn find_package<R: Read + Seek>(
    path: &Path,
    archive: &mut ZipArchive<R>,
) -> Result<String, EpubError> {
    let declared = match read_entry(path, archive, CONTAINER_PATH)? {
        Some(xml) => parse_container(&xml)?,
        None => None,
    };

    declared
        .into_iter()
        .chain(FALLBACK_PACKAGE_PATHS.iter().map(|p| p.to_string()))
        .find(|candidate| archive.file_names().any(|name| name == candidate.as_str()))
        .ok_or_else(|| EpubError::PackageNotFound {
            path: path.to_path_buf(),
        })
}

/// Read a zip entry as text. A missing entry is `Ok(None)`.
fn read_entry<R: Read + Seek>(
    path: &Path,
    archive: &mut ZipArchive<R>,
    entry: &str,
) -> Result<Option<String>, EpubError> {
    let mut file = match archive.by_name(entry) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(source) => {
            return Err(EpubError::Container {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let mut contents = String::new();
    file.read_to_string(&mut contents)
        .map_err(|source| EpubError::Entry {
            path: path.to_path_buf(),
            entry: entry.to_string(),
            source,
        })?;
    Ok(Some(contents))
}

fn xml_error(entry: &str, error: impl fmt::Display) -> EpubError {
    EpubError::Xml {
        entry: entry.to_string(),
        message: error.to_string(),
    }
}

fn local_name(element: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(element.local_name().as_ref()).into_owned()
}

/// Attributes keyed by local name, namespace declarations excluded.
fn attributes(entry: &str, element: &BytesStart<'_>) -> Result<BTreeMap<String, String>, EpubError> {
    let mut attributes = BTreeMap::new();
    for attribute in element.attributes() {
        let attribute = attribute.map_err(|e| xml_error(entry, e))?;
        if attribute.key.as_ref().starts_with(b"xmlns") {
            continue;
        }
        let name = String::from_utf8_lossy(attribute.key.local_name().as_ref()).into_owned();
        let value = attribute.unescape_value().map_err(|e| xml_error(entry, e))?;
        attributes.insert(name, value.into_owned());
    }
    Ok(attributes)
}

/// `full-path` of the first rootfile in the container document.
fn parse_container(xml: &str) -> Result<Option<String>, EpubError> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event().map_err(|e| xml_error(CONTAINER_PATH, e))? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"rootfile" => {
                return Ok(attributes(CONTAINER_PATH, &e)?.remove("full-path"));
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

/// Collect the Dublin Core elements of the first `<metadata>` block.
fn parse_package(entry: &str, xml: &str) -> Result<EpubMetadata, EpubError> {
    let mut reader = Reader::from_str(xml);
    let mut metadata: Option<EpubMetadata> = None;
    let mut in_metadata = false;
    let mut current: Option<(String, MetaValue)> = None;

    loop {
        match reader.read_event().map_err(|e| xml_error(entry, e))? {
            Event::Start(e) => {
                let name = local_name(&e);
                if !in_metadata {
                    if name == "metadata" {
                        in_metadata = true;
                        metadata = Some(EpubMetadata::default());
                    }
                } else if current.is_none() && is_field(&name) {
                    let value = MetaValue {
                        value: String::new(),
                        attributes: attributes(entry, &e)?,
                    };
                    current = Some((name, value));
                }
            }
            Event::Empty(e) => {
                let name = local_name(&e);
                if !in_metadata && name == "metadata" {
                    metadata = Some(EpubMetadata::default());
                    break;
                }
                if in_metadata && current.is_none() && is_field(&name) {
                    let value = MetaValue {
                        value: String::new(),
                        attributes: attributes(entry, &e)?,
                    };
                    if let Some(found) = metadata.as_mut() {
                        found.insert(&name, value);
                    }
                }
            }
            Event::Text(text) => {
                if let Some((_, value)) = current.as_mut() {
                    let text = text.unescape().map_err(|e| xml_error(entry, e))?;
                    value.value.push_str(&text);
                }
            }
            Event::CData(data) => {
                if let Some((_, value)) = current.as_mut() {
                    value.value.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Event::End(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if in_metadata && name == "metadata" {
                    break;
                }
                if current.as_ref().is_some_and(|(field, _)| *field == name) {
                    if let Some((field, mut value)) = current.take() {
                        value.value = value.value.trim().to_string();
                        if let Some(found) = metadata.as_mut() {
                            found.insert(&field, value);
                        }
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    metadata.ok_or_else(|| EpubError::MetadataNotFound {
        entry: entry.to_string(),
    })
}
