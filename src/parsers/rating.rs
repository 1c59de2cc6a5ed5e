use once_cell::sync::Lazy;
use regex::Regex;

static COUNT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d[\d.,\u{a0}]*")
        .expect("Invalid count regex")
});

/// Parse a displayed count such as `1,234` or `(2.501)` into a number.
///
/// Separators are treated as thousands separators since counts are whole.
pub fn parse_count(text: &str) -> Option<u64> {
    let digits: String = COUNT_REGEX
        .find(text)?
        .as_str()
        .chars()
        .filter(char::is_ascii_digit)
        .collect();

    digits.parse().ok()
}
