// 🧹 Normalizer - canonical comparable forms
// Every function here is total: bad input falls back, it never fails.
//
// Normalization only drives matching. Stored records keep their raw values.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

use crate::record::RawValue;

// ============================================================================
// KEYS
// ============================================================================

/// Canonical join key for a license plate.
///
/// Separators and whitespace are dropped and letters upper-cased, so
/// `"12-AB-34"`, `"12 ab 34"` and `"12AB34"` are the same booking.
pub fn normalize_key(plate: &str) -> String {
    plate
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_uppercase())
        .collect()
}

// ============================================================================
// SCALARS
// ============================================================================

const NOT_AVAILABLE: &str = "n/a";
const CURRENCY_SYMBOLS: [char; 3] = ['€', '$', '£'];
const CURRENCY_CODES: [&str; 3] = ["eur", "usd", "gbp"];

/// Comparable form of a generic field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Number(f64),
    Text(String),
}

impl Scalar {
    pub fn empty() -> Self {
        Scalar::Text(String::new())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Scalar::Text(s) if s.is_empty())
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) => Some(*n),
            Scalar::Text(_) => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Number(n) => write!(f, "{:.2}", n),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

/// Normalize a field that may be absent
pub fn normalize_scalar(value: Option<&RawValue>) -> Scalar {
    match value {
        None => Scalar::empty(),
        Some(RawValue::Number(n)) if n.is_finite() => Scalar::Number(*n),
        Some(RawValue::Number(n)) => Scalar::Text(n.to_string().to_lowercase()),
        Some(RawValue::Text(s)) => normalize_text_scalar(s),
    }
}

/// Normalize a textual cell: `"10.00"`, `"10"` and `"10 €"` all give 10.
///
/// Currency markers are only dropped around an amount; other text keeps them.
pub fn normalize_text_scalar(raw: &str) -> Scalar {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(NOT_AVAILABLE) {
        return Scalar::empty();
    }

    let text = trimmed.to_lowercase();
    if let Some(n) = parse_amount(&text) {
        return Scalar::Number(n);
    }

    let without_symbols: String = text
        .chars()
        .filter(|c| !CURRENCY_SYMBOLS.contains(c))
        .collect();
    let remainder = strip_currency_code(without_symbols.trim());

    if remainder.is_empty() {
        return Scalar::empty();
    }

    match parse_amount(remainder) {
        Some(n) => Scalar::Number(n),
        None => Scalar::Text(text),
    }
}

fn strip_currency_code(mut value: &str) -> &str {
    for code in CURRENCY_CODES {
        if let Some(rest) = value.strip_suffix(code) {
            value = rest.trim_end();
        }
        if let Some(rest) = value.strip_prefix(code) {
            value = rest.trim_start();
        }
    }
    value
}

fn parse_amount(value: &str) -> Option<f64> {
    if let Ok(n) = value.parse::<f64>() {
        return n.is_finite().then_some(n);
    }

    // "12,50" - decimal comma, only when unambiguous
    if value.matches(',').count() == 1 && !value.contains('.') {
        if let Ok(n) = value.replace(',', ".").parse::<f64>() {
            return n.is_finite().then_some(n);
        }
    }

    None
}

// ============================================================================
// BRANDS
// ============================================================================

/// Generic words sources append to a park's name
pub const DEFAULT_BRAND_SUFFIXES: [&str; 4] = ["parking", "park", "estacionamento", "parque"];

pub const DEFAULT_CITY_GAZETTEER: [&str; 20] = [
    "lisboa",
    "lisbon",
    "porto",
    "oporto",
    "faro",
    "algarve",
    "funchal",
    "madeira",
    "ponta delgada",
    "acores",
    "açores",
    "azores",
    "coimbra",
    "braga",
    "aveiro",
    "setubal",
    "setúbal",
    "cascais",
    "sintra",
    "madrid",
];

/// Lossy brand comparison.
///
/// Trades false negatives on genuinely different brands for removing the
/// known false positive of one brand listed with different city qualifiers.
#[derive(Debug, Clone)]
pub struct BrandNormalizer {
    suffixes: Vec<String>,
    /// Tokenized city names, longest first
    cities: Vec<Vec<String>>,
}

impl BrandNormalizer {
    pub fn new<S: AsRef<str>>(suffixes: &[S], cities: &[S]) -> Self {
        let suffixes = suffixes
            .iter()
            .flat_map(|s| tokenize(s.as_ref()))
            .collect();

        let mut cities: Vec<Vec<String>> = cities
            .iter()
            .map(|c| tokenize(c.as_ref()))
            .filter(|tokens| !tokens.is_empty())
            .collect();
        cities.sort_by(|a, b| b.len().cmp(&a.len()));

        BrandNormalizer { suffixes, cities }
    }

    pub fn normalize(&self, name: &str) -> String {
        let tokens = tokenize(name);
        let mut current = tokens.clone();

        // Stripping a city can expose a suffix and vice versa
        loop {
            let before = current.len();

            while current
                .last()
                .map_or(false, |word| self.suffixes.contains(word))
            {
                current.pop();
            }
            current = self.strip_cities(current);

            if current.len() == before {
                break;
            }
        }

        // A name made only of generic words keeps them
        let kept = if current.is_empty() { tokens } else { current };
        kept.join(" ").to_uppercase()
    }

    pub fn matches(&self, a: &str, b: &str) -> bool {
        self.normalize(a) == self.normalize(b)
    }

    fn strip_cities(&self, tokens: Vec<String>) -> Vec<String> {
        let mut kept = Vec::with_capacity(tokens.len());
        let mut i = 0;

        'outer: while i < tokens.len() {
            for city in &self.cities {
                if tokens[i..].starts_with(city) {
                    i += city.len();
                    continue 'outer;
                }
            }
            kept.push(tokens[i].clone());
            i += 1;
        }

        kept
    }
}

impl Default for BrandNormalizer {
    fn default() -> Self {
        BrandNormalizer::new(&DEFAULT_BRAND_SUFFIXES, &DEFAULT_CITY_GAZETTEER)
    }
}

/// Folded through upper then lower so the upper-cased output tokenizes the same
fn tokenize(value: &str) -> Vec<String> {
    value
        .to_uppercase()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

fn default_brand_normalizer() -> &'static BrandNormalizer {
    static DEFAULT: OnceLock<BrandNormalizer> = OnceLock::new();
    DEFAULT.get_or_init(BrandNormalizer::default)
}

/// Canonical brand using the default suffix list and gazetteer
pub fn normalize_brand(name: &str) -> String {
    default_brand_normalizer().normalize(name)
}

pub fn brands_match(a: &str, b: &str) -> bool {
    default_brand_normalizer().matches(a, b)
}

// ============================================================================
// DATES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NormalizedDate {
    Date(NaiveDate),
    /// Sentinel for anything unparseable
    Invalid,
}

impl NormalizedDate {
    pub fn is_valid(&self) -> bool {
        matches!(self, NormalizedDate::Date(_))
    }
}

impl fmt::Display for NormalizedDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizedDate::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            NormalizedDate::Invalid => f.write_str("invalid"),
        }
    }
}

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y"];
const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M",
];

pub fn normalize_date(value: &str) -> NormalizedDate {
    let value = value.trim();

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return NormalizedDate::Date(date);
        }
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return NormalizedDate::Date(dt.date());
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return NormalizedDate::Date(dt.date_naive());
    }

    NormalizedDate::Invalid
}

// ============================================================================
// PAYMENT METHODS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Delivered without charge
    NoPay,
    /// Paid ahead through the booking site
    Online,
    Cash,
    Card,
    Other(String),
}

pub fn normalize_payment_method(value: &str) -> PaymentMethod {
    let compact: String = value
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect();

    match compact.as_str() {
        "nopay" | "nopayment" => PaymentMethod::NoPay,
        "online" | "onlinepayment" => PaymentMethod::Online,
        "cash" | "dinheiro" | "numerario" | "numerário" => PaymentMethod::Cash,
        "card" | "creditcard" | "debitcard" | "cartao" | "cartão" | "multibanco" | "mb"
        | "tpa" => PaymentMethod::Card,
        _ => PaymentMethod::Other(value.trim().to_lowercase()),
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_key_strips_separators() {
        assert_eq!(normalize_key("12-AB-34"), "12AB34");
        assert_eq!(normalize_key(" 12 ab 34 "), "12AB34");
        assert_eq!(normalize_key("12.ab.34"), "12AB34");
        assert_eq!(normalize_key(""), "");
    }

    #[test]
    fn test_normalize_key_idempotent() {
        for plate in ["12-AB-34", "aa 00 bb", "Ø-12-zz", "--", "AbC123"] {
            let once = normalize_key(plate);
            assert_eq!(normalize_key(&once), once, "plate {plate}");
        }
    }

    #[test]
    fn test_scalar_prices_compare_equal() {
        let ten = Scalar::Number(10.0);
        assert_eq!(normalize_text_scalar("10.00"), ten);
        assert_eq!(normalize_text_scalar("10"), ten);
        assert_eq!(normalize_text_scalar("10 €"), ten);
        assert_eq!(normalize_text_scalar("€10"), ten);
        assert_eq!(normalize_text_scalar("10 EUR"), ten);
        assert_eq!(normalize_scalar(Some(&RawValue::Number(10.0))), ten);
    }

    #[test]
    fn test_scalar_decimal_comma() {
        assert_eq!(normalize_text_scalar("12,50"), Scalar::Number(12.5));
        // Ambiguous grouping stays text
        assert_eq!(
            normalize_text_scalar("1,000,50"),
            Scalar::Text("1,000,50".to_string())
        );
    }

    #[test]
    fn test_scalar_empty_and_sentinel() {
        assert!(normalize_scalar(None).is_empty());
        assert!(normalize_text_scalar("").is_empty());
        assert!(normalize_text_scalar("  ").is_empty());
        assert!(normalize_text_scalar("N/A").is_empty());
        assert!(normalize_text_scalar("n/a").is_empty());
    }

    #[test]
    fn test_scalar_text_keeps_currency_letters() {
        assert_eq!(normalize_text_scalar("Europe"), Scalar::Text("europe".to_string()));
        assert_ne!(normalize_text_scalar("Europe"), normalize_text_scalar("ope"));
        assert_eq!(normalize_text_scalar("Usdx"), Scalar::Text("usdx".to_string()));
        assert_eq!(normalize_text_scalar("deur"), Scalar::Text("deur".to_string()));
        assert_eq!(normalize_text_scalar("€uro"), Scalar::Text("€uro".to_string()));
        assert_eq!(normalize_text_scalar("GBP 7,50"), Scalar::Number(7.5));
    }

    #[test]
    fn test_scalar_text_fallback() {
        assert_eq!(
            normalize_text_scalar("  Free Upgrade "),
            Scalar::Text("free upgrade".to_string())
        );
        assert_eq!(
            normalize_scalar(Some(&RawValue::Number(f64::NAN))),
            Scalar::Text("nan".to_string())
        );
    }

    #[test]
    fn test_brand_city_and_suffix() {
        assert!(brands_match("RedPark Lisboa", "RedPark"));
        assert!(brands_match("RedPark - Porto", "redpark"));
        assert!(brands_match("Sky Parking Faro", "Sky"));
        assert!(brands_match("Lisboa Sky Park", "SKY"));
        assert!(brands_match("Parque Azul Ponta Delgada", "Parque Azul"));
        assert!(!brands_match("RedPark", "BluePark"));
    }

    #[test]
    fn test_brand_uppercase_collapsed() {
        assert_eq!(normalize_brand("  red   park  lisboa "), "RED");
        assert_eq!(normalize_brand("RedPark Lisboa"), "REDPARK");
        assert_eq!(normalize_brand(""), "");
    }

    #[test]
    fn test_brand_only_generic_words() {
        assert_eq!(normalize_brand("Parking Lisboa"), "PARKING LISBOA");
        assert!(!brands_match("Parking Lisboa", "Parking Porto"));
    }

    #[test]
    fn test_brand_idempotent() {
        for brand in [
            "RedPark Lisboa",
            "Red Park Lisboa",
            "Parking Lisboa",
            "Lisboa",
            "Sky Parking Faro Park",
            "Blue-Park (Oporto)",
            "",
        ] {
            let once = normalize_brand(brand);
            assert_eq!(normalize_brand(&once), once, "brand {brand}");
        }
    }

    #[test]
    fn test_brand_idempotent_with_case_folding_letters() {
        // Dotless i upper-cases to plain I
        assert_eq!(normalize_brand("Red parkıng"), "RED");
        assert_eq!(normalize_brand("Red lısboa"), "RED");

        for brand in [
            "Red parkıng",
            "Red lısboa",
            "İstanbul Park",
            "Straße Parque",
            "ǰet Park",
        ] {
            let once = normalize_brand(brand);
            assert_eq!(normalize_brand(&once), once, "brand {brand}");
        }
    }

    #[test]
    fn test_brand_custom_gazetteer() {
        let normalizer = BrandNormalizer::new(&["garage"], &["new york"]);
        assert!(normalizer.matches("Acme Garage New York", "acme"));
        // Default cities are not part of a custom gazetteer
        assert!(!normalizer.matches("Acme Lisboa", "Acme"));
    }

    #[test]
    fn test_normalize_date_formats() {
        let expected = NormalizedDate::Date(NaiveDate::from_ymd_opt(2025, 3, 14).unwrap());
        assert_eq!(normalize_date("2025-03-14"), expected);
        assert_eq!(normalize_date("14/03/2025"), expected);
        assert_eq!(normalize_date("14-03-2025"), expected);
        assert_eq!(normalize_date("2025-03-14 09:30:00"), expected);
        assert_eq!(normalize_date("2025-03-14T09:30:00+00:00"), expected);
    }

    #[test]
    fn test_normalize_date_invalid() {
        assert_eq!(normalize_date("tomorrow"), NormalizedDate::Invalid);
        assert_eq!(normalize_date(""), NormalizedDate::Invalid);
        assert_eq!(normalize_date("2025-02-30"), NormalizedDate::Invalid);
        assert_eq!(NormalizedDate::Invalid.to_string(), "invalid");
    }

    #[test]
    fn test_payment_methods() {
        assert_eq!(normalize_payment_method("No Pay"), PaymentMethod::NoPay);
        assert_eq!(normalize_payment_method("no-pay"), PaymentMethod::NoPay);
        assert_eq!(normalize_payment_method("NOPAY"), PaymentMethod::NoPay);
        assert_eq!(normalize_payment_method(" Online "), PaymentMethod::Online);
        assert_eq!(normalize_payment_method("Multibanco"), PaymentMethod::Card);
        assert_eq!(normalize_payment_method("cash"), PaymentMethod::Cash);
        assert_eq!(
            normalize_payment_method("Voucher"),
            PaymentMethod::Other("voucher".to_string())
        );
    }
}
