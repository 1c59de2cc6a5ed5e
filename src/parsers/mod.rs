pub mod listing;
pub mod product;
pub mod rating;

pub use listing::*;
pub use product::*;
pub use rating::*;

use html_escape::decode_html_entities;
use scraper::{ElementRef, Html};

use crate::error::{CrawlError, CrawlResult};
use crate::sites::{CompiledField, CompiledRules};

/// Clean and normalize text by removing extra whitespace and decoding HTML entities
pub fn clean_text(text: &str) -> String {
    let decoded = decode_html_entities(text);
    decoded
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Fail when the document is a CAPTCHA or error page.
pub(crate) fn check_blocked(document: &Html, rules: &CompiledRules, url: &str) -> CrawlResult<()> {
    if rules
        .blocked
        .iter()
        .any(|selector| document.select(selector).next().is_some())
    {
        return Err(CrawlError::Blocked {
            url: url.to_string(),
        });
    }
    Ok(())
}

fn element_value(element: ElementRef<'_>, field: &CompiledField) -> Option<String> {
    let raw = match &field.attr {
        Some(attr) => clean_text(element.value().attr(attr)?),
        None => clean_text(&element.text().collect::<String>()),
    };

    let value = match field.word {
        Some(index) => raw.split_whitespace().nth(index)?.to_string(),
        None => raw,
    };

    (!value.is_empty()).then_some(value)
}

/// Walk the selector chain below `scope` and return the first non-empty value.
pub(crate) fn select_field(scope: ElementRef<'_>, field: &CompiledField) -> Option<String> {
    field.selectors.iter().find_map(|selector| {
        scope
            .select(selector)
            .find_map(|element| element_value(element, field))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_text_collapses_whitespace_and_entities() {
        assert_eq!(clean_text("  Wireless &amp; Quiet\n\t Mouse  "), "Wireless & Quiet Mouse");
        assert_eq!(clean_text("   "), "");
    }
}
