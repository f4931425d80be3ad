// 📤 Export - flat row projections of reconciled state
// One row per entry, ready for CSV. Nothing here changes an entry.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::compare::{ComparisonEntry, EntryStatus, Reconciliation};
use crate::delivery::{DeliveryEntry, DeliveryLedger};
use crate::normalize::{normalize_date, normalize_scalar};
use crate::record::{RawRecord, RawValue, Side};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub license_plate: String,
    pub key: String,
    pub status: &'static str,
    pub primary_price: String,
    pub secondary_price: String,
    pub primary_brand: String,
    pub secondary_brand: String,
    /// `;`-joined field tags still disagreeing
    pub mismatches: String,
    pub check_in: String,
    pub check_out: String,
    pub resolution: String,
    pub previous_status: String,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeliveryRow {
    pub id: String,
    pub license_plate: String,
    pub driver: String,
    pub payment_method: String,
    pub price_on_delivery: String,
    pub status: &'static str,
    pub inconsistencies: String,
    pub permanent_issues: String,
    pub resolution: String,
    pub cleared: String,
    pub original_price: String,
    pub original_payment_method: String,
    pub notes: String,
    pub batch: usize,
}

fn price(value: Option<&RawValue>) -> String {
    normalize_scalar(value).to_string()
}

fn side_price(entry: &ComparisonEntry, side: Side) -> String {
    entry
        .record(side)
        .map(|r| price(r.booking_price.as_ref()))
        .unwrap_or_default()
}

fn side_brand(entry: &ComparisonEntry, side: Side) -> String {
    entry
        .record(side)
        .map(|r| r.park_brand.clone())
        .unwrap_or_default()
}

/// Dates come from whichever side has them, primary first
fn side_date(entry: &ComparisonEntry, pick: fn(&RawRecord) -> Option<&String>) -> String {
    [Side::Primary, Side::Secondary]
        .into_iter()
        .find_map(|side| entry.record(side).and_then(pick))
        .map(|raw| normalize_date(raw).to_string())
        .unwrap_or_default()
}

fn join<I, T>(items: I) -> String
where
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
{
    items
        .into_iter()
        .map(|s| s.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(";")
}

/// Rows in `all()` order: valid, inconsistent, missing
pub fn comparison_rows(reconciliation: &Reconciliation) -> Vec<ComparisonRow> {
    reconciliation
        .all()
        .map(|entry| {
            let resolution = entry.resolution.as_ref();
            ComparisonRow {
                license_plate: entry.license_plate.clone(),
                key: entry.key.clone(),
                status: entry.display_status().as_str(),
                primary_price: side_price(entry, Side::Primary),
                secondary_price: side_price(entry, Side::Secondary),
                primary_brand: side_brand(entry, Side::Primary),
                secondary_brand: side_brand(entry, Side::Secondary),
                mismatches: join(entry.inconsistencies().iter().map(|t| t.as_str())),
                check_in: side_date(entry, |r| r.check_in.as_ref()),
                check_out: side_date(entry, |r| r.check_out.as_ref()),
                resolution: resolution
                    .map(|r| r.strategy.name().to_string())
                    .unwrap_or_default(),
                previous_status: resolution
                    .map(|r| previous_status_name(&r.previous_status))
                    .unwrap_or_default(),
                notes: resolution
                    .and_then(|r| r.notes.clone())
                    .unwrap_or_default(),
            }
        })
        .collect()
}

fn previous_status_name(status: &EntryStatus) -> String {
    match status {
        EntryStatus::Valid => "valid",
        EntryStatus::Inconsistent(_) => "inconsistent",
        EntryStatus::MissingPrimary => "missing_primary",
        EntryStatus::MissingSecondary => "missing_secondary",
    }
    .to_string()
}

/// Rows for pending then validated deliveries
pub fn delivery_rows(ledger: &DeliveryLedger) -> Vec<DeliveryRow> {
    ledger.all().map(delivery_row).collect()
}

fn delivery_row(entry: &DeliveryEntry) -> DeliveryRow {
    let resolution = entry.resolution.as_ref();
    DeliveryRow {
        id: entry.id.to_string(),
        license_plate: entry.license_plate.clone(),
        driver: entry.driver.clone(),
        payment_method: entry.payment_method.clone(),
        price_on_delivery: price(entry.price_on_delivery.as_ref()),
        status: entry.display_status().as_str(),
        inconsistencies: join(entry.inconsistencies.iter().map(|t| t.as_str())),
        permanent_issues: join(entry.permanent_issues.iter().map(|i| i.kind.as_str())),
        resolution: resolution
            .map(|r| r.action.as_str().to_string())
            .unwrap_or_default(),
        cleared: resolution
            .map(|r| join(r.cleared.iter().map(|t| t.as_str())))
            .unwrap_or_default(),
        original_price: entry
            .original_price
            .as_ref()
            .map(|p| price(Some(p)))
            .unwrap_or_default(),
        original_payment_method: entry.original_payment_method.clone().unwrap_or_default(),
        notes: resolution
            .and_then(|r| r.notes.clone())
            .unwrap_or_default(),
        batch: entry.batch,
    }
}

pub fn write_csv<W: Write, R: Serialize>(writer: W, rows: &[R]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in rows {
        wtr.serialize(row).context("Failed to serialize export row")?;
    }
    wtr.flush().context("Failed to flush CSV writer")?;
    Ok(())
}

pub fn export_to_file<R: Serialize>(path: &Path, rows: &[R]) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create export file: {:?}", path))?;
    write_csv(file, rows)
}
