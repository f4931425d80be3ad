// 📥 CSV Loader - spreadsheets exported by each source
//
// Cells are read as text and converted totally: a blank cell is absent, a
// flag that is not clearly true/false is absent. Only IO and CSV structure
// errors fail a load.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

use crate::record::{RawDelivery, RawRecord, RawValue};

#[derive(Debug, Deserialize)]
struct RecordRow {
    #[serde(rename = "License Plate", alias = "licensePlate", alias = "license_plate")]
    license_plate: String,
    #[serde(rename = "Booking Price", alias = "bookingPrice", alias = "booking_price", default)]
    booking_price: String,
    #[serde(rename = "Park Brand", alias = "parkBrand", alias = "park_brand", default)]
    park_brand: String,
    #[serde(rename = "Record Id", alias = "Booking Number", alias = "id", default)]
    record_id: String,
    #[serde(rename = "Allocation", alias = "allocation", default)]
    allocation: String,
    #[serde(rename = "Check In", alias = "checkIn", alias = "check_in", default)]
    check_in: String,
    #[serde(rename = "Check Out", alias = "checkOut", alias = "check_out", default)]
    check_out: String,
    #[serde(rename = "Driver", alias = "driver", default)]
    driver: String,
    #[serde(rename = "Campaign Pay", alias = "campaignPay", alias = "campaign_pay", default)]
    campaign_pay: String,
    #[serde(
        rename = "Has Online Payment",
        alias = "hasOnlinePayment",
        alias = "has_online_payment",
        default
    )]
    has_online_payment: String,
}

#[derive(Debug, Deserialize)]
struct DeliveryRow {
    #[serde(rename = "License Plate", alias = "licensePlate", alias = "license_plate")]
    license_plate: String,
    #[serde(rename = "Driver", alias = "driver", default)]
    driver: String,
    #[serde(rename = "Payment Method", alias = "paymentMethod", alias = "payment_method", default)]
    payment_method: String,
    #[serde(
        rename = "Price On Delivery",
        alias = "priceOnDelivery",
        alias = "price_on_delivery",
        default
    )]
    price_on_delivery: String,
}

fn optional(cell: String) -> Option<String> {
    let trimmed = cell.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// "true"/"false" (and the usual spreadsheet spellings); anything else is absent
pub fn parse_flag(cell: &str) -> Option<bool> {
    match cell.trim().to_lowercase().as_str() {
        "true" | "yes" | "sim" | "1" => Some(true),
        "false" | "no" | "não" | "nao" | "0" => Some(false),
        _ => None,
    }
}

impl From<RecordRow> for RawRecord {
    fn from(row: RecordRow) -> Self {
        RawRecord {
            license_plate: row.license_plate,
            booking_price: RawValue::from_cell(&row.booking_price),
            park_brand: row.park_brand.trim().to_string(),
            record_id: optional(row.record_id),
            allocation: optional(row.allocation),
            check_in: optional(row.check_in),
            check_out: optional(row.check_out),
            driver: optional(row.driver),
            campaign_pay: parse_flag(&row.campaign_pay),
            has_online_payment: parse_flag(&row.has_online_payment),
            synthesized: false,
            metadata: HashMap::new(),
        }
    }
}

impl From<DeliveryRow> for RawDelivery {
    fn from(row: DeliveryRow) -> Self {
        RawDelivery {
            license_plate: row.license_plate,
            driver: row.driver.trim().to_string(),
            payment_method: row.payment_method.trim().to_string(),
            price_on_delivery: RawValue::from_cell(&row.price_on_delivery),
            metadata: HashMap::new(),
        }
    }
}

fn load<Row, T>(path: &Path, what: &str) -> Result<Vec<T>>
where
    Row: DeserializeOwned,
    T: From<Row>,
{
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open CSV file: {:?}", path))?;

    let mut rows = Vec::new();
    for (line, result) in rdr.deserialize::<Row>().enumerate() {
        let row = result
            .with_context(|| format!("Failed to deserialize {} at row {}", what, line + 1))?;
        rows.push(T::from(row));
    }

    info!(path = %path.display(), rows = rows.len(), "loaded {}", what);
    Ok(rows)
}

pub fn load_records(path: &Path) -> Result<Vec<RawRecord>> {
    load::<RecordRow, RawRecord>(path, "booking record")
}

pub fn load_deliveries(path: &Path) -> Result<Vec<RawDelivery>> {
    load::<DeliveryRow, RawDelivery>(path, "delivery")
}
