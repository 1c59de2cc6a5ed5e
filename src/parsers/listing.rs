use scraper::{ElementRef, Html};
use std::collections::{HashMap, HashSet};
use url::Url;

use super::product::read_fields;
use super::{check_blocked, select_field};
use crate::error::CrawlResult;
use crate::models::{ItemId, ProductRecord};
use crate::sites::{CompiledCard, CompiledRules};

/// Identifiers found on one search results page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Listing {
    pub identifiers: Vec<ItemId>,
    /// Records read from the result cards, when the site defines card fields.
    pub cards: HashMap<ItemId, ProductRecord>,
    /// `true` when the page shows a next-page link, or when the site has no
    /// such signal at all.
    pub has_next: bool,
}

/// Read the identifiers of every result item, in page order, without duplicates.
pub fn extract_listing(html: &str, url: &str, rules: &CompiledRules) -> CrawlResult<Listing> {
    let document = Html::parse_document(html);
    check_blocked(&document, rules, url)?;

    let mut seen = HashSet::new();
    let mut listing = Listing::default();

    for element in document.select(&rules.item) {
        let Some(id) = element.value().attr(&rules.id_attr).map(str::trim) else {
            continue;
        };
        if id.is_empty()
            || !rules.id_length.map_or(true, |len| id.chars().count() == len)
            || !seen.insert(id.to_string())
        {
            continue;
        }

        let id = ItemId::from(id);
        if let Some(card) = &rules.card {
            listing
                .cards
                .insert(id.clone(), read_card(element, url, &id, card));
        }
        listing.identifiers.push(id);
    }

    listing.has_next = match &rules.next_page {
        Some(selector) => document.select(selector).next().is_some(),
        None => true,
    };

    Ok(listing)
}

fn read_card(item: ElementRef<'_>, page_url: &str, id: &ItemId, card: &CompiledCard) -> ProductRecord {
    let mut record = read_fields(item, id, &card.fields);
    record.link = card
        .link
        .as_ref()
        .and_then(|field| select_field(item, field))
        .map(|href| absolute_url(page_url, &href));
    record
}

fn absolute_url(base: &str, href: &str) -> String {
    Url::parse(base)
        .and_then(|base| base.join(href))
        .map(String::from)
        .unwrap_or_else(|_| href.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CrawlError;
    use crate::models::{Site, SENTINEL};
    use pretty_assertions::assert_eq;

    const SEARCH_PAGE: &str = r#"
        <html><body>
          <div data-asin=""></div>
          <div data-component-type="s-search-result" data-asin="B000000001"></div>
          <div data-component-type="s-search-result" data-asin="B000000002"></div>
          <div data-component-type="s-search-result" data-asin="B000000001"></div>
          <div data-asin="SHORT"></div>
          <div data-component-type="s-search-result" data-asin=" B000000003 "></div>
          <span class="s-pagination-item"><a class="s-pagination-next" href="?page=2">Next</a></span>
        </body></html>
    "#;

    fn ids(values: &[&str]) -> Vec<ItemId> {
        values.iter().map(|v| ItemId::from(*v)).collect()
    }

    #[test]
    fn extracts_unique_identifiers_in_order() {
        let rules = Site::Amazon.rules().compile().unwrap();
        let listing = extract_listing(SEARCH_PAGE, "https://www.amazon.com/s?k=x", &rules).unwrap();

        assert_eq!(
            listing.identifiers,
            ids(&["B000000001", "B000000002", "B000000003"])
        );
        assert!(listing.has_next);
    }

    #[test]
    fn extraction_is_idempotent() {
        let rules = Site::Amazon.rules().compile().unwrap();
        let once = extract_listing(SEARCH_PAGE, "u", &rules).unwrap();
        let twice = extract_listing(SEARCH_PAGE, "u", &rules).unwrap();
        assert_eq!(once, twice);

        let doubled = format!("{}{}", SEARCH_PAGE, SEARCH_PAGE);
        let merged = extract_listing(&doubled, "u", &rules).unwrap();
        assert_eq!(merged.identifiers.len(), once.identifiers.len());
    }

    #[test]
    fn last_page_has_no_next() {
        let rules = Site::Amazon.rules().compile().unwrap();
        let html = r#"<div data-asin="B000000009"></div>
            <span class="s-pagination-next s-pagination-disabled">Next</span>"#;
        let listing = extract_listing(html, "u", &rules).unwrap();
        assert_eq!(listing.identifiers, ids(&["B000000009"]));
        assert!(!listing.has_next);
    }

    #[test]
    fn captcha_page_is_blocked() {
        let rules = Site::Amazon.rules().compile().unwrap();
        let html = r#"<form action="/errors/validateCaptcha"><input name="amzn"></form>"#;
        match extract_listing(html, "https://www.amazon.com/s?k=x", &rules) {
            Err(CrawlError::Blocked { url }) => assert_eq!(url, "https://www.amazon.com/s?k=x"),
            other => panic!("expected blocked page, got {:?}", other),
        }
    }

    const LAZADA_PAGE: &str = r#"
        <html><body>
          <div class="Bm3ON" data-item-id="2339437011">
            <a href="//www.lazada.vn/products/chuot-khong-day-i2339437011.html">
              <img src="https://img.lazcdn.com/mouse.jpg">
            </a>
            <div class="RfADt"><a title="Chuot khong day">Chuot   khong day</a></div>
            <div class="ooOxS">129.000 &#8363;</div>
            <span class="qzqFw">(1.204)</span>
          </div>
          <div class="Bm3ON" data-item-id="99">
            <a href="/products/lot-chuot-i99.html"></a>
          </div>
        </body></html>
    "#;

    #[test]
    fn cards_are_read_per_item() {
        let rules = Site::Lazada.rules().compile().unwrap();
        let listing =
            extract_listing(LAZADA_PAGE, "https://www.lazada.vn/catalog/?q=mouse&page=1", &rules)
                .unwrap();

        assert_eq!(listing.identifiers, ids(&["2339437011", "99"]));
        assert!(listing.has_next);

        let mouse = &listing.cards[&ItemId::from("2339437011")];
        assert_eq!(mouse.name, "Chuot khong day");
        assert_eq!(mouse.price, "129.000 \u{20ab}");
        assert_eq!(mouse.rating, Some(1204));
        assert_eq!(mouse.image, "https://img.lazcdn.com/mouse.jpg");
        assert_eq!(mouse.description, SENTINEL);
        assert_eq!(
            mouse.link.as_deref(),
            Some("https://www.lazada.vn/products/chuot-khong-day-i2339437011.html")
        );

        // fields stay inside their own card
        let pad = &listing.cards[&ItemId::from("99")];
        assert!(!pad.has_name());
        assert_eq!(pad.price, SENTINEL);
        assert_eq!(
            pad.link.as_deref(),
            Some("https://www.lazada.vn/products/lot-chuot-i99.html")
        );
    }

    #[test]
    fn detail_only_sites_have_no_cards() {
        let rules = Site::Amazon.rules().compile().unwrap();
        let listing = extract_listing(SEARCH_PAGE, "u", &rules).unwrap();
        assert!(listing.cards.is_empty());
    }
}
