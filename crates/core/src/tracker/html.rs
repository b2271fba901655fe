//! Token harvesting from tracker pages.

use scraper::{Html, Selector};

use super::profile::TokenLocator;
use super::AuthError;

/// Find the value a locator points at. `Ok(None)` when the element is missing
/// or its value is blank.
pub(crate) fn harvest(body: &str, locator: &TokenLocator) -> Result<Option<String>, AuthError> {
    let selector = Selector::parse(&locator.selector).map_err(|e| AuthError::InvalidSelector {
        selector: locator.selector.clone(),
        reason: format!("{:?}", e),
    })?;

    let document = Html::parse_document(body);
    let Some(element) = document.select(&selector).next() else {
        return Ok(None);
    };

    let value = match &locator.attribute {
        Some(attribute) => element.value().attr(attribute).map(str::to_string),
        None => Some(element.text().collect::<String>()),
    };

    Ok(value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty()))
}
