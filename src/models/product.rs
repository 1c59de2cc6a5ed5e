use super::{SENTINEL, UNKNOWN_PRODUCT};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// NewType pattern for type safety
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        ItemId(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: ItemId,
    pub name: String,
    pub price: String,
    /// Number of customer ratings shown on the page.
    pub rating: Option<u64>,
    pub image: String,
    pub description: String,
    pub details: BTreeMap<String, String>,
    /// Product link taken from a listing card.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl ProductRecord {
    /// Record standing in for a product that could not be fetched.
    pub fn placeholder(id: ItemId) -> Self {
        Self {
            id,
            name: UNKNOWN_PRODUCT.to_string(),
            price: SENTINEL.to_string(),
            rating: None,
            image: SENTINEL.to_string(),
            description: SENTINEL.to_string(),
            details: BTreeMap::new(),
            link: None,
        }
    }

    pub fn has_name(&self) -> bool {
        self.name != UNKNOWN_PRODUCT
    }

    /// Overlay what a detail page found on top of a listing card record.
    /// Fields the detail page could not read keep the card's value.
    pub fn merge_detail(mut self, detail: ProductRecord) -> Self {
        fn prefer(current: &mut String, found: String) {
            if found != SENTINEL {
                *current = found;
            }
        }

        if detail.has_name() {
            self.name = detail.name;
        }
        prefer(&mut self.price, detail.price);
        prefer(&mut self.image, detail.image);
        prefer(&mut self.description, detail.description);
        self.rating = detail.rating.or(self.rating);

        for (key, value) in detail.details {
            match self.details.get_mut(&key) {
                Some(current) => prefer(current, value),
                None => {
                    self.details.insert(key, value);
                }
            }
        }
        self.link = detail.link.or(self.link);
        self
    }
}

/// Contents of one category's output file.
///
/// Only constructible from a product list, so the count can never drift
/// from the list it describes. Written out, never read back.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultFile {
    total_products: usize,
    products: Vec<ProductRecord>,
}

impl ResultFile {
    pub fn new(products: Vec<ProductRecord>) -> Self {
        Self {
            total_products: products.len(),
            products,
        }
    }

    pub fn total_products(&self) -> usize {
        self.total_products
    }

    pub fn products(&self) -> &[ProductRecord] {
        &self.products
    }
}
