use super::{CardRules, FieldRule, ProductFields, SearchRules, SiteRules};

/// Records built from the catalog result cards; no detail page is fetched.
pub fn search_cards() -> SiteRules {
    let card = CardRules {
        fields: ProductFields {
            name: FieldRule::text(&[".RfADt a", ".pdp-mod-product-badge-title"]),
            price: FieldRule::text(&[".ooOxS", ".pdp-product-price span"]),
            // review count, shown as "(123)"
            rating: FieldRule::text(&[".qzqFw"]),
            image: FieldRule::attr(&["img"], "src"),
            ..ProductFields::default()
        },
        link: Some(FieldRule::attr(&["a"], "href")),
    };

    SiteRules {
        name: "lazada".to_string(),
        search: SearchRules {
            item: ".Bm3ON".to_string(),
            id_attr: "data-item-id".to_string(),
            id_length: None,
            // the catalog keeps paging until a page comes back empty
            next_page: None,
            page_param: "page".to_string(),
            card: Some(card),
        },
        product: None,
        blocked: vec!["#baxia-punish".to_string(), ".nc_wrapper".to_string()],
    }
}
