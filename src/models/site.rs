use serde::{Deserialize, Serialize};

use crate::sites::{self, SiteRules};

/// Sites with a built-in selector table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Site {
    /// Search results, then every `/dp/` detail page.
    Amazon,
    /// Search results, then the all-offers fragment per product.
    AmazonOffers,
    /// Search result cards, plus the detail page for the description.
    AmazonListing,
    /// Catalog result cards only.
    Lazada,
}

impl Site {
    pub const ALL: [Site; 4] = [
        Site::Amazon,
        Site::AmazonOffers,
        Site::AmazonListing,
        Site::Lazada,
    ];

    pub fn rules(&self) -> SiteRules {
        match self {
            Site::Amazon => sites::amazon::detail_page(),
            Site::AmazonOffers => sites::amazon::offer_listing(),
            Site::AmazonListing => sites::amazon::listing_cards(),
            Site::Lazada => sites::lazada::search_cards(),
        }
    }
}
