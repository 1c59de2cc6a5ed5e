use scraper::{ElementRef, Html};

use super::{check_blocked, parse_count, select_field};
use crate::error::{CrawlError, CrawlResult};
use crate::models::{ItemId, ProductRecord, SENTINEL, UNKNOWN_PRODUCT};
use crate::sites::{CompiledFields, CompiledRules};

/// Map a product page to a record. Missing fields fall back to the sentinel;
/// only an anti-bot page is an error.
pub fn extract_product(
    html: &str,
    url: &str,
    id: &ItemId,
    rules: &CompiledRules,
) -> CrawlResult<ProductRecord> {
    let detail = rules.detail.as_ref().ok_or_else(|| {
        CrawlError::Rules(format!("{} has no detail page selectors", rules.name))
    })?;

    let document = Html::parse_document(html);
    check_blocked(&document, rules, url)?;

    Ok(read_fields(document.root_element(), id, &detail.fields))
}

/// Build a record from the fields found below `scope`.
pub(crate) fn read_fields(scope: ElementRef<'_>, id: &ItemId, fields: &CompiledFields) -> ProductRecord {
    let or_sentinel = |value: Option<String>| value.unwrap_or_else(|| SENTINEL.to_string());

    let details = fields
        .details
        .iter()
        .map(|(key, field)| (key.clone(), or_sentinel(select_field(scope, field))))
        .collect();

    ProductRecord {
        id: id.clone(),
        name: select_field(scope, &fields.name).unwrap_or_else(|| UNKNOWN_PRODUCT.to_string()),
        price: or_sentinel(select_field(scope, &fields.price)),
        rating: select_field(scope, &fields.rating).and_then(|text| parse_count(&text)),
        image: or_sentinel(select_field(scope, &fields.image)),
        description: or_sentinel(select_field(scope, &fields.description)),
        details,
        link: None,
    }
}
