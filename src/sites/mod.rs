//! Site descriptions expressed as selector tables.
//!
//! A [`SiteRules`] value is plain data: it can come from a built-in preset
//! or from the configuration file. [`CompiledRules`] is the same table with
//! every selector parsed once up front.

pub mod amazon;
pub mod lazada;

use scraper::Selector;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{CrawlError, CrawlResult};
use crate::models::ItemId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteRules {
    pub name: String,
    pub search: SearchRules,
    /// Detail page visited per identifier. Without it, records come from
    /// the listing cards alone.
    #[serde(default)]
    pub product: Option<ProductRules>,
    /// Any match means the site served a CAPTCHA or error page.
    #[serde(default)]
    pub blocked: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRules {
    pub item: String,
    pub id_attr: String,
    #[serde(default)]
    pub id_length: Option<usize>,
    #[serde(default)]
    pub next_page: Option<String>,
    #[serde(default = "default_page_param")]
    pub page_param: String,
    /// Fields read from inside each result item.
    #[serde(default)]
    pub card: Option<CardRules>,
}

fn default_page_param() -> String {
    "page".to_string()
}

/// Field selectors shared by detail pages and listing cards. A field left
/// out selects nothing and ends up as the sentinel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductFields {
    pub name: FieldRule,
    pub price: FieldRule,
    pub rating: FieldRule,
    pub image: FieldRule,
    pub description: FieldRule,
    pub details: BTreeMap<String, FieldRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductRules {
    /// Detail page URL with `{id}` standing for the identifier.
    pub url_template: String,
    #[serde(flatten)]
    pub fields: ProductFields,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardRules {
    #[serde(flatten)]
    pub fields: ProductFields,
    /// Link to the product, resolved against the search page URL.
    #[serde(default)]
    pub link: Option<FieldRule>,
}

/// Selectors tried in order; the first non-empty value wins.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldRule {
    pub selectors: Vec<String>,
    /// Read this attribute instead of the element text.
    #[serde(default)]
    pub attr: Option<String>,
    /// Keep only the n-th whitespace separated word.
    #[serde(default)]
    pub word: Option<usize>,
}

impl FieldRule {
    pub fn text(selectors: &[&str]) -> Self {
        Self {
            selectors: selectors.iter().map(|s| s.to_string()).collect(),
            attr: None,
            word: None,
        }
    }

    pub fn attr(selectors: &[&str], attr: &str) -> Self {
        Self {
            attr: Some(attr.to_string()),
            ..Self::text(selectors)
        }
    }

    pub fn word(mut self, index: usize) -> Self {
        self.word = Some(index);
        self
    }
}

pub(crate) struct CompiledField {
    pub selectors: Vec<Selector>,
    pub attr: Option<String>,
    pub word: Option<usize>,
}

pub(crate) struct CompiledFields {
    pub name: CompiledField,
    pub price: CompiledField,
    pub rating: CompiledField,
    pub image: CompiledField,
    pub description: CompiledField,
    pub details: Vec<(String, CompiledField)>,
}

pub(crate) struct CompiledDetail {
    pub url_template: String,
    pub fields: CompiledFields,
}

pub(crate) struct CompiledCard {
    pub fields: CompiledFields,
    pub link: Option<CompiledField>,
}

pub struct CompiledRules {
    pub(crate) name: String,
    pub(crate) item: Selector,
    pub(crate) id_attr: String,
    pub(crate) id_length: Option<usize>,
    pub(crate) next_page: Option<Selector>,
    pub(crate) page_param: String,
    pub(crate) blocked: Vec<Selector>,
    pub(crate) card: Option<CompiledCard>,
    pub(crate) detail: Option<CompiledDetail>,
}

fn parse_selector(raw: &str) -> CrawlResult<Selector> {
    Selector::parse(raw).map_err(|_| CrawlError::Selector(raw.to_string()))
}

fn compile_field(rule: &FieldRule) -> CrawlResult<CompiledField> {
    let selectors = rule
        .selectors
        .iter()
        .map(|s| parse_selector(s))
        .collect::<CrawlResult<Vec<_>>>()?;

    Ok(CompiledField {
        selectors,
        attr: rule.attr.clone(),
        word: rule.word,
    })
}

fn compile_fields(fields: &ProductFields) -> CrawlResult<CompiledFields> {
    let details = fields
        .details
        .iter()
        .map(|(key, rule)| Ok((key.clone(), compile_field(rule)?)))
        .collect::<CrawlResult<Vec<_>>>()?;

    Ok(CompiledFields {
        name: compile_field(&fields.name)?,
        price: compile_field(&fields.price)?,
        rating: compile_field(&fields.rating)?,
        image: compile_field(&fields.image)?,
        description: compile_field(&fields.description)?,
        details,
    })
}

impl SiteRules {
    pub fn compile(&self) -> CrawlResult<CompiledRules> {
        if self.product.is_none() && self.search.card.is_none() {
            return Err(CrawlError::Rules(format!(
                "{} defines neither a detail page nor listing card fields",
                self.name
            )));
        }

        let card = match &self.search.card {
            Some(card) => Some(CompiledCard {
                fields: compile_fields(&card.fields)?,
                link: card.link.as_ref().map(compile_field).transpose()?,
            }),
            None => None,
        };

        let detail = match &self.product {
            Some(product) => Some(CompiledDetail {
                url_template: product.url_template.clone(),
                fields: compile_fields(&product.fields)?,
            }),
            None => None,
        };

        Ok(CompiledRules {
            name: self.name.clone(),
            item: parse_selector(&self.search.item)?,
            id_attr: self.search.id_attr.clone(),
            id_length: self.search.id_length,
            next_page: self
                .search
                .next_page
                .as_deref()
                .map(parse_selector)
                .transpose()?,
            page_param: self.search.page_param.clone(),
            blocked: self
                .blocked
                .iter()
                .map(|s| parse_selector(s))
                .collect::<CrawlResult<Vec<_>>>()?,
            card,
            detail,
        })
    }
}

impl CompiledRules {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn page_param(&self) -> &str {
        &self.page_param
    }

    pub fn has_detail_page(&self) -> bool {
        self.detail.is_some()
    }

    pub fn product_url(&self, id: &ItemId) -> Option<String> {
        self.detail
            .as_ref()
            .map(|detail| detail.url_template.replace("{id}", id.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Site;

    #[test]
    fn presets_compile() {
        for site in Site::ALL {
            let rules = site.rules();
            assert!(rules.compile().is_ok(), "{} rules failed to compile", rules.name);
        }
    }

    #[test]
    fn invalid_selector_is_reported() {
        let mut rules = Site::Amazon.rules();
        if let Some(product) = rules.product.as_mut() {
            product.fields.price = FieldRule::text(&["div[["]);
        }
        match rules.compile() {
            Err(CrawlError::Selector(raw)) => assert_eq!(raw, "div[["),
            other => panic!("expected selector error, got {:?}", other.err()),
        }
    }

    #[test]
    fn product_url_substitutes_id() {
        let rules = Site::Amazon.rules().compile().unwrap();
        assert_eq!(
            rules.product_url(&ItemId::from("B0TEST1234")).as_deref(),
            Some("https://www.amazon.com/dp/B0TEST1234")
        );

        let cards_only = Site::Lazada.rules().compile().unwrap();
        assert!(!cards_only.has_detail_page());
        assert_eq!(cards_only.product_url(&ItemId::from("123")), None);
    }

    #[test]
    fn rules_deserialize_with_defaults() {
        let raw = r#"{
            "name": "shop",
            "search": { "item": "li.product", "id_attr": "data-id" },
            "product": {
                "url_template": "https://shop.test/p/{id}",
                "name": { "selectors": ["h1"] },
                "price": { "selectors": [".price"] },
                "rating": { "selectors": [".reviews"], "word": 0 },
                "image": { "selectors": ["img.main"], "attr": "src" },
                "description": { "selectors": [".desc"] }
            }
        }"#;
        let rules: SiteRules = serde_json::from_str(raw).unwrap();
        assert_eq!(rules.search.page_param, "page");
        assert!(rules.blocked.is_empty());
        let product = rules.product.as_ref().unwrap();
        assert!(product.fields.details.is_empty());
        assert_eq!(product.fields.rating.word, Some(0));
        assert!(rules.search.card.is_none());
        assert!(rules.compile().is_ok());
    }

    #[test]
    fn card_only_rules_deserialize() {
        let raw = r#"{
            "name": "shop",
            "search": {
                "item": "li.product",
                "id_attr": "data-id",
                "card": {
                    "name": { "selectors": [".title"] },
                    "link": { "selectors": ["a"], "attr": "href" }
                }
            }
        }"#;
        let rules: SiteRules = serde_json::from_str(raw).unwrap();
        let card = rules.search.card.as_ref().unwrap();
        assert_eq!(card.fields.name.selectors, vec![".title"]);
        assert!(card.fields.price.selectors.is_empty());
        assert!(rules.product.is_none());
        assert!(rules.compile().is_ok());
    }

    #[test]
    fn rules_need_cards_or_detail_page() {
        let mut rules = Site::Lazada.rules();
        rules.search.card = None;
        assert!(matches!(rules.compile(), Err(CrawlError::Rules(_))));
    }
}
