//! Join-key normalisation for suburb and LGA names.
//!
//! Every dataset spells places slightly differently: price tables add a
//! parenthesised council (`Bellfield (Banyule)`), census tables add a state
//! (`Albert Park (Vic.)`), crime tables use upper case and hyphens. Each source
//! gets its own key function so that inner joins line up.

use regex::Regex;
use std::sync::LazyLock;

static PRICE_QUALIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" \([A-Za-z ]+\)").expect("valid regex"));

static CENSUS_QUALIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" \([A-Za-z .]+\)").expect("valid regex"));

/// Lowercases `s` and uppercases its first character (`MOUNT ELIZA` → `Mount eliza`).
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Key for suburb names from the median house price workbook.
pub fn price_suburb_key(name: &str) -> String {
    capitalize(&PRICE_QUALIFIER.replace_all(name, ""))
}

/// Key for suburb names from the census suburb code list.
pub fn census_suburb_key(name: &str) -> String {
    capitalize(&CENSUS_QUALIFIER.replace_all(name, ""))
}

/// Key for suburb names from the crime workbook.
pub fn crime_suburb_key(name: &str) -> String {
    capitalize(name)
}

/// Parses a census region code such as `SSC20001` into its numeric part.
pub fn census_code(raw: &str) -> Option<u32> {
    raw.trim().get(3..)?.parse().ok()
}

/// Key for LGA names from the crime workbook.
///
/// Crime LGA names carry a leading filler character and use hyphens where the
/// property data uses spaces (`Colac-Otway`).
pub fn crime_lga_key(name: &str) -> String {
    capitalize(&name.trim().replace('-', " "))
}

/// Key for LGA names from the property sales workbook.
///
/// Property names end with the council type (`Alpine Shire`, `Ballarat City`),
/// which is dropped.
pub fn property_lga_key(name: &str) -> String {
    let name = name.trim();
    let head = name.rsplit_once(' ').map_or(name, |(head, _)| head);
    capitalize(head)
}
