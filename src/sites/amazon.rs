use std::collections::BTreeMap;

use super::{CardRules, FieldRule, ProductFields, ProductRules, SearchRules, SiteRules};

const SPEC_VALUE: &str = ".a-size-base.po-break-word";
const DETAIL_URL: &str = "https://www.amazon.com/dp/{id}";

fn search() -> SearchRules {
    SearchRules {
        item: "[data-asin]".to_string(),
        id_attr: "data-asin".to_string(),
        // ASINs are always ten characters; shorter values are ad slots
        id_length: Some(10),
        next_page: Some("a.s-pagination-next, li.a-last a".to_string()),
        page_param: "page".to_string(),
        card: None,
    }
}

fn blocked() -> Vec<String> {
    vec![
        "form[action*='validateCaptcha']".to_string(),
        "img[src*='captcha']".to_string(),
        ".a-box-inner a[href='/ref=cs_503_link']".to_string(),
    ]
}

fn spec_row(class: &str) -> String {
    format!("{} {}", class, SPEC_VALUE)
}

/// Product overview table on `/dp/{asin}` pages.
fn detail_fields() -> BTreeMap<String, FieldRule> {
    let mut details = BTreeMap::new();

    let single = [
        ("brand", ".po-brand"),
        ("operatingSystem", ".po-operating_system"),
        ("resolution", ".po-resolution"),
        ("modelName", ".po-model_name"),
        ("cellularTechnology", ".po-cellular_technology"),
        ("connectivity", ".po-connectivity_technology"),
        ("color", ".po-color .a-span9"),
    ];
    for (key, class) in single {
        details.insert(key.to_string(), FieldRule::text(&[&spec_row(class)]));
    }

    // Attribute class names differ in case between listings
    let with_fallback = [
        ("ram", "[class*='ram_memory']", "[class*='RAM']"),
        ("hard_disk", "[class*='hard_disk']", "[class*='Hard_Disk']"),
        ("screenSize", "[class*='display_size']", "[class*='Display_Size']"),
    ];
    for (key, primary, fallback) in with_fallback {
        details.insert(
            key.to_string(),
            FieldRule::text(&[&spec_row(primary), &spec_row(fallback)]),
        );
    }

    details.insert(
        "special_feature".to_string(),
        FieldRule::text(&[".po-special_feature .a-span9 .a-truncate-cut"]),
    );
    details.insert(
        "detail_item".to_string(),
        FieldRule::text(&["#feature-bullets ul.a-unordered-list li span.a-list-item"]),
    );

    details
}

fn description() -> FieldRule {
    FieldRule::text(&["#feature-bullets ul"])
}

pub fn detail_page() -> SiteRules {
    SiteRules {
        name: "amazon".to_string(),
        search: search(),
        product: Some(ProductRules {
            url_template: DETAIL_URL.to_string(),
            fields: ProductFields {
                name: FieldRule::text(&["#productTitle", "#title span"]),
                price: FieldRule::text(&[
                    "#corePrice_feature_div .a-price .a-offscreen",
                    ".a-price .a-offscreen",
                ]),
                rating: FieldRule::text(&["#acrCustomerReviewText"]).word(0),
                image: FieldRule::attr(&["#imgTagWrapperId img", "#landingImage"], "src"),
                description: description(),
                details: detail_fields(),
            },
        }),
        blocked: blocked(),
    }
}

/// All-offers-display fragment served by `/gp/product/ajax`.
pub fn offer_listing() -> SiteRules {
    let mut details = BTreeMap::new();
    details.insert(
        "discount_price".to_string(),
        FieldRule::text(&["#pinned-offer-top-id .a-section .aok-offscreen"]).word(0),
    );
    details.insert(
        "discount_percent".to_string(),
        FieldRule::text(&["#pinned-offer-top-id .a-section .aok-offscreen"]).word(2),
    );

    SiteRules {
        name: "amazon_offers".to_string(),
        search: search(),
        product: Some(ProductRules {
            url_template:
                "https://www.amazon.com/gp/product/ajax/?asin={id}&r=pc&experienceId=aodAjaxMain"
                    .to_string(),
            fields: ProductFields {
                name: FieldRule::text(&["#aod-asin-title #aod-asin-title-text"]),
                price: FieldRule::text(&[".a-section .aok-relative .a-size-small .a-price span"]),
                rating: FieldRule::text(&["#pinned-de-id #aod-asin-reviews-count-title"]).word(0),
                image: FieldRule::attr(&["#aod-pinned-offer #pinned-image-id img"], "src"),
                description: FieldRule::text(&[".a-size-small .a-popover-preload .a-size-base"]),
                details,
            },
        }),
        blocked: blocked(),
    }
}

/// Title, price, rating and image straight from the search result cards;
/// the detail page is only visited for the feature bullets.
pub fn listing_cards() -> SiteRules {
    let card = CardRules {
        fields: ProductFields {
            name: FieldRule::text(&["h2 .a-text-normal", "h2 span"]),
            price: FieldRule::text(&[".a-price .a-offscreen"]),
            rating: FieldRule::text(&["span.a-size-base.s-underline-text", "[aria-label$='ratings']"]),
            image: FieldRule::attr(&[".s-image"], "src"),
            ..ProductFields::default()
        },
        link: Some(FieldRule::attr(&["h2 a", "a.a-link-normal"], "href")),
    };

    SiteRules {
        name: "amazon_listing".to_string(),
        search: SearchRules {
            card: Some(card),
            ..search()
        },
        product: Some(ProductRules {
            url_template: DETAIL_URL.to_string(),
            fields: ProductFields {
                description: description(),
                ..ProductFields::default()
            },
        }),
        blocked: blocked(),
    }
}
