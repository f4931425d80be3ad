// 🧾 Raw records - what each source says about a booking
// Records are values: once placed in a comparison entry they are never
// mutated. A resolution that changes a field builds a new record.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ============================================================================
// RAW VALUE
// ============================================================================

/// A field as it came out of the source: sometimes a number, sometimes text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
}

impl RawValue {
    /// Wrap a loader cell; blank cells are absent
    pub fn from_cell(cell: &str) -> Option<RawValue> {
        if cell.trim().is_empty() {
            None
        } else {
            Some(RawValue::Text(cell.to_string()))
        }
    }

    pub fn text(value: impl Into<String>) -> Self {
        RawValue::Text(value.into())
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Number(n) => write!(f, "{}", n),
            RawValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for RawValue {
    fn from(n: f64) -> Self {
        RawValue::Number(n)
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Text(s.to_string())
    }
}

// ============================================================================
// SIDE & FIELD TAG
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// Primary booking system
    Primary,
    /// Back-office system
    Secondary,
}

impl Side {
    pub fn other(&self) -> Side {
        match self {
            Side::Primary => Side::Secondary,
            Side::Secondary => Side::Primary,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Primary => "primary",
            Side::Secondary => "secondary",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields the comparator checks between the two sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldTag {
    BookingPrice,
    ParkBrand,
}

impl FieldTag {
    pub const ALL: [FieldTag; 2] = [FieldTag::BookingPrice, FieldTag::ParkBrand];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldTag::BookingPrice => "booking_price",
            FieldTag::ParkBrand => "park_brand",
        }
    }
}

impl fmt::Display for FieldTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// RAW RECORD
// ============================================================================

/// One booking as described by one source
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRecord {
    /// Join key; normalized only for matching, stored as received
    pub license_plate: String,

    #[serde(default)]
    pub booking_price: Option<RawValue>,

    #[serde(default)]
    pub park_brand: String,

    // ========================================================================
    // SOURCE-SPECIFIC FIELDS
    // ========================================================================
    /// Identifier inside the source system (booking number, row id, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allocation: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_in: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_out: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,

    /// Back-office campaign flag; only a real boolean counts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_pay: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_online_payment: Option<bool>,

    /// True when the record was created by an `Include` resolution
    #[serde(default)]
    pub synthesized: bool,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl RawRecord {
    pub fn new(license_plate: impl Into<String>) -> Self {
        RawRecord {
            license_plate: license_plate.into(),
            ..Default::default()
        }
    }

    /// Builder pattern: booking price
    pub fn with_price(mut self, price: impl Into<RawValue>) -> Self {
        self.booking_price = Some(price.into());
        self
    }

    /// Builder pattern: park brand
    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.park_brand = brand.into();
        self
    }

    pub fn with_record_id(mut self, id: impl Into<String>) -> Self {
        self.record_id = Some(id.into());
        self
    }

    pub fn with_campaign_pay(mut self, flag: bool) -> Self {
        self.campaign_pay = Some(flag);
        self
    }

    pub fn with_online_payment(mut self, flag: bool) -> Self {
        self.has_online_payment = Some(flag);
        self
    }

    /// Read a compared field in its raw form
    pub fn field(&self, tag: FieldTag) -> Option<RawValue> {
        match tag {
            FieldTag::BookingPrice => self.booking_price.clone(),
            FieldTag::ParkBrand if self.park_brand.is_empty() => None,
            FieldTag::ParkBrand => Some(RawValue::Text(self.park_brand.clone())),
        }
    }

    /// New record equal to this one except for `tag`
    pub fn with_field(&self, tag: FieldTag, value: Option<RawValue>) -> RawRecord {
        let mut next = self.clone();
        match tag {
            FieldTag::BookingPrice => next.booking_price = value,
            FieldTag::ParkBrand => {
                next.park_brand = value.map(|v| v.to_string()).unwrap_or_default();
            }
        }
        next
    }

    /// Build the absent side's record from this one.
    ///
    /// Shared booking fields are copied; source-specific flags are not, since
    /// the other source never stated them.
    pub fn synthesize_counterpart(&self, placeholder_id: String) -> RawRecord {
        let mut metadata = HashMap::new();
        if let Some(origin) = &self.record_id {
            metadata.insert(
                "synthesized_from".to_string(),
                serde_json::json!(origin),
            );
        }

        RawRecord {
            license_plate: self.license_plate.clone(),
            booking_price: self.booking_price.clone(),
            park_brand: self.park_brand.clone(),
            record_id: Some(placeholder_id),
            allocation: self.allocation.clone(),
            check_in: self.check_in.clone(),
            check_out: self.check_out.clone(),
            driver: self.driver.clone(),
            campaign_pay: None,
            has_online_payment: None,
            synthesized: true,
            metadata,
        }
    }
}

// ============================================================================
// RAW DELIVERY
// ============================================================================

/// One cash-register line: a car handed back to its owner
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDelivery {
    pub license_plate: String,

    #[serde(default)]
    pub driver: String,

    #[serde(default)]
    pub payment_method: String,

    #[serde(default)]
    pub price_on_delivery: Option<RawValue>,

    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl RawDelivery {
    pub fn new(
        license_plate: impl Into<String>,
        driver: impl Into<String>,
        payment_method: impl Into<String>,
        price: impl Into<RawValue>,
    ) -> Self {
        RawDelivery {
            license_plate: license_plate.into(),
            driver: driver.into(),
            payment_method: payment_method.into(),
            price_on_delivery: Some(price.into()),
            metadata: HashMap::new(),
        }
    }
}
