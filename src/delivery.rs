// 🚗 Delivery Validator - cash-register lines against reconciled bookings
//
// Each batch is appended to an explicit ledger that the caller threads from
// one import to the next. Imports only ever add: a delivery already seen
// (same plate + driver) in any earlier batch is skipped.
//
// Two kinds of findings:
//   - inconsistencies: missing booking, price off by more than the tolerance
//   - permanent issues: payment-method rules the operator cannot clear

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, info};
use uuid::Uuid;

use crate::compare::{ComparisonEntry, Reconciliation};
use crate::config::ReconConfig;
use crate::delivery_resolution::DeliveryResolution;
use crate::normalize::{
    normalize_key, normalize_payment_method, normalize_scalar, PaymentMethod, Scalar,
};
use crate::record::{RawDelivery, RawRecord, RawValue, Side};

/// Slack on top of the tolerance for float subtraction noise (20.01 - 20.00)
const FLOAT_SLACK: f64 = 1e-9;

// ============================================================================
// STATUS & FINDINGS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// Created, checks not yet derived
    Pending,
    Ready,
    Inconsistent,
    /// Terminal
    Validated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryDisplayStatus {
    Pending,
    Ready,
    Inconsistent,
    Validated,
    /// Validated, but carrying a permanent issue
    ValidatedWithIssues,
}

impl DeliveryDisplayStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryDisplayStatus::Pending => "pending",
            DeliveryDisplayStatus::Ready => "ready",
            DeliveryDisplayStatus::Inconsistent => "inconsistent",
            DeliveryDisplayStatus::Validated => "validated",
            DeliveryDisplayStatus::ValidatedWithIssues => "validated_with_issues",
        }
    }
}

/// Clearable findings
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryTag {
    /// No booking with this plate in either source
    MissingRecord,
    PrimaryPriceMismatch,
    SecondaryPriceMismatch,
}

impl DeliveryTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryTag::MissingRecord => "missing_record",
            DeliveryTag::PrimaryPriceMismatch => "primary_price_mismatch",
            DeliveryTag::SecondaryPriceMismatch => "secondary_price_mismatch",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermanentIssueKind {
    NoPayWithoutCampaignPayFalse,
    OnlineWithoutHasOnlinePaymentTrue,
}

impl PermanentIssueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermanentIssueKind::NoPayWithoutCampaignPayFalse => "no_pay_without_campaign_pay_false",
            PermanentIssueKind::OnlineWithoutHasOnlinePaymentTrue => {
                "online_without_has_online_payment_true"
            }
        }
    }
}

/// Business-rule violation; survives every resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermanentIssue {
    #[serde(rename = "type")]
    pub kind: PermanentIssueKind,
    pub message: String,
}

// ============================================================================
// DELIVERY KEY
// ============================================================================

/// Identity of a delivery across imports
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeliveryKey {
    pub plate: String,
    pub driver: String,
}

impl DeliveryKey {
    /// None for lines without a usable plate
    pub fn of(delivery: &RawDelivery) -> Option<DeliveryKey> {
        let plate = normalize_key(&delivery.license_plate);
        if plate.is_empty() {
            return None;
        }
        Some(DeliveryKey {
            plate,
            driver: normalize_driver(&delivery.driver),
        })
    }
}

fn normalize_driver(driver: &str) -> String {
    driver.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

// ============================================================================
// DELIVERY ENTRY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryEntry {
    /// Generated at ingest, never reused
    pub id: Uuid,
    pub license_plate: String,
    pub key: String,
    pub driver: String,
    pub payment_method: String,
    pub price_on_delivery: Option<RawValue>,
    pub status: DeliveryStatus,
    pub inconsistencies: BTreeSet<DeliveryTag>,
    #[serde(default)]
    pub permanent_issues: Vec<PermanentIssue>,
    /// Key of the comparison entry this delivery matched
    pub matched_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<DeliveryResolution>,
    /// Values before a `correct` overwrote them
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_price: Option<RawValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_payment_method: Option<String>,
    #[serde(default)]
    pub permanent_inconsistency: bool,
    /// 1-based import batch number
    pub batch: usize,
    pub imported_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl DeliveryEntry {
    pub fn display_status(&self) -> DeliveryDisplayStatus {
        match self.status {
            DeliveryStatus::Pending => DeliveryDisplayStatus::Pending,
            DeliveryStatus::Ready => DeliveryDisplayStatus::Ready,
            DeliveryStatus::Inconsistent => DeliveryDisplayStatus::Inconsistent,
            DeliveryStatus::Validated if self.permanent_inconsistency => {
                DeliveryDisplayStatus::ValidatedWithIssues
            }
            DeliveryStatus::Validated => DeliveryDisplayStatus::Validated,
        }
    }

    pub fn has_permanent_issues(&self) -> bool {
        !self.permanent_issues.is_empty()
    }

    pub fn dedup_key(&self) -> DeliveryKey {
        DeliveryKey {
            plate: self.key.clone(),
            driver: normalize_driver(&self.driver),
        }
    }

    /// Pending → Ready | Inconsistent
    fn derive_status(&mut self) {
        self.status = if self.inconsistencies.is_empty() && self.permanent_issues.is_empty() {
            DeliveryStatus::Ready
        } else {
            DeliveryStatus::Inconsistent
        };
    }
}

// ============================================================================
// IMPORT REPORT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportReport {
    pub batch: usize,
    /// SHA-256 over the batch's delivery keys
    pub digest: String,
    pub received: usize,
    pub imported: usize,
    pub skipped_duplicates: usize,
    pub skipped_without_plate: usize,
    pub ready: usize,
    pub inconsistent: usize,
    pub imported_at: DateTime<Utc>,
}

impl ImportReport {
    pub fn summary(&self) -> String {
        format!(
            "Batch {}: {} received, {} imported ({} ready, {} inconsistent), \
             {} already processed, {} without plate",
            self.batch,
            self.received,
            self.imported,
            self.ready,
            self.inconsistent,
            self.skipped_duplicates,
            self.skipped_without_plate
        )
    }
}

fn batch_digest(batch: &[RawDelivery]) -> String {
    let mut hasher = Sha256::new();
    for key in batch.iter().filter_map(DeliveryKey::of) {
        hasher.update(format!("{}|{}\n", key.plate, key.driver));
    }
    format!("{:x}", hasher.finalize())
}

// ============================================================================
// DELIVERY LEDGER (accumulator)
// ============================================================================

/// Running state across delivery imports
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeliveryLedger {
    pub(crate) pending: Vec<DeliveryEntry>,
    pub(crate) validated: Vec<DeliveryEntry>,
    processed: HashSet<DeliveryKey>,
    imports: Vec<ImportReport>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliverySummary {
    pub pending: usize,
    pub ready: usize,
    pub inconsistent: usize,
    pub validated: usize,
    /// Subset of `validated` carrying permanent issues
    pub validated_with_issues: usize,
}

impl DeliverySummary {
    pub fn summary(&self) -> String {
        format!(
            "{} pending ({} ready, {} inconsistent), {} validated ({} with permanent issues)",
            self.pending, self.ready, self.inconsistent, self.validated, self.validated_with_issues
        )
    }
}

impl DeliveryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> &[DeliveryEntry] {
        &self.pending
    }

    pub fn validated(&self) -> &[DeliveryEntry] {
        &self.validated
    }

    pub fn imports(&self) -> &[ImportReport] {
        &self.imports
    }

    pub fn is_processed(&self, key: &DeliveryKey) -> bool {
        self.processed.contains(key)
    }

    /// pending ++ validated
    pub fn all(&self) -> impl Iterator<Item = &DeliveryEntry> {
        self.pending.iter().chain(self.validated.iter())
    }

    pub fn find(&self, id: Uuid) -> Option<&DeliveryEntry> {
        self.all().find(|entry| entry.id == id)
    }

    pub fn summary(&self) -> DeliverySummary {
        DeliverySummary {
            pending: self.pending.len(),
            ready: self
                .pending
                .iter()
                .filter(|e| e.status == DeliveryStatus::Ready)
                .count(),
            inconsistent: self
                .pending
                .iter()
                .filter(|e| e.status == DeliveryStatus::Inconsistent)
                .count(),
            validated: self.validated.len(),
            validated_with_issues: self
                .validated
                .iter()
                .filter(|e| e.permanent_inconsistency)
                .count(),
        }
    }
}

// ============================================================================
// DELIVERY VALIDATOR
// ============================================================================

pub struct DeliveryValidator {
    /// Absolute price tolerance (default: 0.01)
    pub tolerance: f64,
}

impl DeliveryValidator {
    pub fn new() -> Self {
        DeliveryValidator { tolerance: 0.01 }
    }

    pub fn with_tolerance(tolerance: f64) -> Self {
        DeliveryValidator { tolerance }
    }

    pub fn from_config(config: &ReconConfig) -> Self {
        DeliveryValidator::with_tolerance(config.price_tolerance)
    }

    /// Append a batch to the ledger and return it with the batch report.
    ///
    /// Calling this again with an overlapping batch adds only the new lines.
    pub fn ingest(
        &self,
        mut ledger: DeliveryLedger,
        batch: &[RawDelivery],
        reconciliation: &Reconciliation,
    ) -> (DeliveryLedger, ImportReport) {
        let index = reconciliation.index();
        let batch_no = ledger.imports.len() + 1;
        let imported_at = Utc::now();

        let mut report = ImportReport {
            batch: batch_no,
            digest: batch_digest(batch),
            received: batch.len(),
            imported: 0,
            skipped_duplicates: 0,
            skipped_without_plate: 0,
            ready: 0,
            inconsistent: 0,
            imported_at,
        };

        for raw in batch {
            let Some(key) = DeliveryKey::of(raw) else {
                report.skipped_without_plate += 1;
                continue;
            };
            if ledger.processed.contains(&key) {
                report.skipped_duplicates += 1;
                continue;
            }

            let matched = index.get(key.plate.as_str()).copied();
            let entry = self.evaluate(raw, &key, matched, batch_no, imported_at);

            match entry.status {
                DeliveryStatus::Ready => report.ready += 1,
                _ => report.inconsistent += 1,
            }
            debug!(
                key = %entry.key,
                status = entry.display_status().as_str(),
                tags = entry.inconsistencies.len(),
                permanent = entry.permanent_issues.len(),
                "delivery checked"
            );

            ledger.processed.insert(key);
            ledger.pending.push(entry);
            report.imported += 1;
        }

        info!(
            batch = report.batch,
            received = report.received,
            imported = report.imported,
            skipped_duplicates = report.skipped_duplicates,
            ready = report.ready,
            inconsistent = report.inconsistent,
            "delivery batch ingested"
        );

        ledger.imports.push(report.clone());
        (ledger, report)
    }

    fn evaluate(
        &self,
        raw: &RawDelivery,
        key: &DeliveryKey,
        matched: Option<&ComparisonEntry>,
        batch: usize,
        imported_at: DateTime<Utc>,
    ) -> DeliveryEntry {
        let mut entry = DeliveryEntry {
            id: Uuid::new_v4(),
            license_plate: raw.license_plate.clone(),
            key: key.plate.clone(),
            driver: raw.driver.clone(),
            payment_method: raw.payment_method.clone(),
            price_on_delivery: raw.price_on_delivery.clone(),
            status: DeliveryStatus::Pending,
            inconsistencies: BTreeSet::new(),
            permanent_issues: Vec::new(),
            matched_key: matched.map(|m| m.key.clone()),
            resolution: None,
            original_price: None,
            original_payment_method: None,
            permanent_inconsistency: false,
            batch,
            imported_at,
            metadata: raw.metadata.clone(),
        };

        match matched {
            None => {
                entry.inconsistencies.insert(DeliveryTag::MissingRecord);
            }
            Some(booking) => {
                let delivered = normalize_scalar(raw.price_on_delivery.as_ref());
                if self.price_exceeds(&delivered, booking.record(Side::Primary)) {
                    entry.inconsistencies.insert(DeliveryTag::PrimaryPriceMismatch);
                }
                if self.price_exceeds(&delivered, booking.record(Side::Secondary)) {
                    entry.inconsistencies.insert(DeliveryTag::SecondaryPriceMismatch);
                }
            }
        }

        entry.permanent_issues = permanent_issues(
            &raw.payment_method,
            matched.and_then(|m| m.record(Side::Secondary)),
        );
        entry.permanent_inconsistency = !entry.permanent_issues.is_empty();
        entry.derive_status();
        entry
    }

    /// An absent side is not compared
    fn price_exceeds(&self, delivered: &Scalar, recorded: Option<&RawRecord>) -> bool {
        let Some(record) = recorded else {
            return false;
        };
        let recorded = normalize_scalar(record.booking_price.as_ref());

        match (delivered, &recorded) {
            (Scalar::Number(a), Scalar::Number(b)) => (a - b).abs() > self.tolerance + FLOAT_SLACK,
            _ => *delivered != recorded,
        }
    }
}

impl Default for DeliveryValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Payment-method rules checked against the back-office record.
///
/// Only a real boolean satisfies a rule; an absent record or flag does not.
pub fn permanent_issues(
    payment_method: &str,
    secondary: Option<&RawRecord>,
) -> Vec<PermanentIssue> {
    let mut issues = Vec::new();

    match normalize_payment_method(payment_method) {
        PaymentMethod::NoPay => {
            if secondary.and_then(|r| r.campaign_pay) != Some(false) {
                issues.push(PermanentIssue {
                    kind: PermanentIssueKind::NoPayWithoutCampaignPayFalse,
                    message: "Delivered as 'no pay' but the back-office booking \
                              does not have campaignPay = false"
                        .to_string(),
                });
            }
        }
        PaymentMethod::Online => {
            if secondary.and_then(|r| r.has_online_payment) != Some(true) {
                issues.push(PermanentIssue {
                    kind: PermanentIssueKind::OnlineWithoutHasOnlinePaymentTrue,
                    message: "Delivered as 'online' but the back-office booking \
                              does not have hasOnlinePayment = true"
                        .to_string(),
                });
            }
        }
        _ => {}
    }

    issues
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::compare;

    fn booking(plate: &str, price: f64) -> RawRecord {
        RawRecord::new(plate).with_price(price).with_brand("RedPark")
    }

    fn reconciled(primary: Vec<RawRecord>, secondary: Vec<RawRecord>) -> Reconciliation {
        compare(&primary, &secondary)
    }

    fn ingest_one(recon: &Reconciliation, delivery: RawDelivery) -> DeliveryEntry {
        let (ledger, _) =
            DeliveryValidator::new().ingest(DeliveryLedger::new(), &[delivery], recon);
        ledger.pending()[0].clone()
    }

    #[test]
    fn test_price_within_tolerance() {
        let recon = reconciled(vec![booking("12-AB-34", 10.0)], vec![booking("12AB34", 10.0)]);

        let entry = ingest_one(&recon, RawDelivery::new("12-AB-34", "Rui", "cash", 10.004));

        assert!(entry.inconsistencies.is_empty());
        assert_eq!(entry.status, DeliveryStatus::Ready);
        assert_eq!(entry.matched_key.as_deref(), Some("12AB34"));
    }

    #[test]
    fn test_price_beyond_tolerance_both_sides() {
        let recon = reconciled(vec![booking("12-AB-34", 10.0)], vec![booking("12AB34", 10.0)]);

        let entry = ingest_one(&recon, RawDelivery::new("12-AB-34", "Rui", "cash", 10.02));

        assert_eq!(
            entry.inconsistencies,
            BTreeSet::from([DeliveryTag::PrimaryPriceMismatch, DeliveryTag::SecondaryPriceMismatch])
        );
        assert_eq!(entry.status, DeliveryStatus::Inconsistent);
    }

    #[test]
    fn test_price_sides_checked_independently() {
        let recon = reconciled(vec![booking("A-1", 20.0)], vec![booking("A-1", 20.01)]);

        let entry = ingest_one(&recon, RawDelivery::new("A-1", "Rui", "card", 20.01));

        // 20.01 - 20.00 is exactly the tolerance
        assert!(entry.inconsistencies.is_empty());

        let entry = ingest_one(&recon, RawDelivery::new("A-1", "Rui", "card", "20,03 €"));
        assert_eq!(
            entry.inconsistencies,
            BTreeSet::from([DeliveryTag::PrimaryPriceMismatch, DeliveryTag::SecondaryPriceMismatch])
        );

        let recon = reconciled(vec![booking("A-1", 20.0)], vec![booking("A-1", 25.0)]);
        let entry = ingest_one(&recon, RawDelivery::new("A-1", "Rui", "card", 25.0));
        assert_eq!(entry.inconsistencies, BTreeSet::from([DeliveryTag::PrimaryPriceMismatch]));
    }

    #[test]
    fn test_absent_side_not_compared() {
        let recon = reconciled(vec![], vec![booking("A-1", 20.0)]);

        let entry = ingest_one(&recon, RawDelivery::new("A-1", "Rui", "card", 20.0));

        assert!(entry.inconsistencies.is_empty());
    }

    #[test]
    fn test_missing_record() {
        let recon = reconciled(vec![booking("A-1", 20.0)], vec![]);

        let entry = ingest_one(&recon, RawDelivery::new("ZZ-99-ZZ", "Rui", "cash", 20.0));

        assert_eq!(entry.inconsistencies, BTreeSet::from([DeliveryTag::MissingRecord]));
        assert_eq!(entry.status, DeliveryStatus::Inconsistent);
        assert!(entry.matched_key.is_none());
    }

    #[test]
    fn test_no_pay_rule() {
        let recon = reconciled(
            vec![booking("A-1", 0.0), booking("B-2", 0.0), booking("C-3", 0.0)],
            vec![
                booking("A-1", 0.0).with_campaign_pay(false),
                booking("B-2", 0.0).with_campaign_pay(true),
                booking("C-3", 0.0),
            ],
        );

        let ok = ingest_one(&recon, RawDelivery::new("A-1", "Rui", "No Pay", 0.0));
        assert!(ok.permanent_issues.is_empty());
        assert_eq!(ok.status, DeliveryStatus::Ready);

        for plate in ["B-2", "C-3"] {
            let flagged = ingest_one(&recon, RawDelivery::new(plate, "Rui", "no-pay", 0.0));
            assert_eq!(flagged.permanent_issues.len(), 1, "plate {plate}");
            assert_eq!(
                flagged.permanent_issues[0].kind,
                PermanentIssueKind::NoPayWithoutCampaignPayFalse
            );
            assert!(flagged.permanent_inconsistency);
            assert_eq!(flagged.status, DeliveryStatus::Inconsistent);
        }
    }

    #[test]
    fn test_online_rule() {
        let recon = reconciled(
            vec![booking("A-1", 30.0), booking("B-2", 30.0), booking("C-3", 30.0)],
            vec![
                booking("A-1", 30.0).with_online_payment(true),
                booking("B-2", 30.0).with_online_payment(false),
                booking("C-3", 30.0),
            ],
        );

        let ok = ingest_one(&recon, RawDelivery::new("A-1", "Rui", "Online", 30.0));
        assert!(ok.permanent_issues.is_empty());

        for plate in ["B-2", "C-3"] {
            let flagged = ingest_one(&recon, RawDelivery::new(plate, "Rui", "online", 30.0));
            assert_eq!(flagged.permanent_issues.len(), 1, "plate {plate}");
            assert_eq!(
                flagged.permanent_issues[0].kind,
                PermanentIssueKind::OnlineWithoutHasOnlinePaymentTrue
            );
            assert!(flagged.inconsistencies.is_empty());
            assert_eq!(flagged.status, DeliveryStatus::Inconsistent);
        }
    }

    #[test]
    fn test_rules_without_matching_booking() {
        let issues = permanent_issues("no pay", None);
        assert_eq!(issues.len(), 1);
        assert!(permanent_issues("cash", None).is_empty());
    }

    #[test]
    fn test_reingest_same_batch_is_idempotent() {
        let recon = reconciled(vec![booking("A-1", 10.0)], vec![booking("A-1", 10.0)]);
        let batch = vec![
            RawDelivery::new("A-1", "Rui", "cash", 10.0),
            RawDelivery::new("B-2", "Ana", "cash", 10.0),
        ];
        let validator = DeliveryValidator::new();

        let (once, first) = validator.ingest(DeliveryLedger::new(), &batch, &recon);
        let (twice, second) = validator.ingest(once.clone(), &batch, &recon);

        assert_eq!(first.imported, 2);
        assert_eq!(second.imported, 0);
        assert_eq!(second.skipped_duplicates, 2);
        assert_eq!(first.digest, second.digest);
        assert_eq!(once.pending(), twice.pending());
        assert_eq!(once.validated(), twice.validated());
        assert_eq!(twice.imports().len(), 2);
    }

    #[test]
    fn test_appended_batch_keeps_earlier_entries() {
        let recon = reconciled(vec![booking("A-1", 10.0)], vec![booking("A-1", 10.0)]);
        let validator = DeliveryValidator::new();

        let (ledger, _) = validator.ingest(
            DeliveryLedger::new(),
            &[RawDelivery::new("A-1", "Rui", "cash", 10.0)],
            &recon,
        );
        let first_id = ledger.pending()[0].id;

        let (ledger, report) = validator.ingest(
            ledger,
            &[
                RawDelivery::new("a 1", " rui ", "cash", 99.0),
                RawDelivery::new("A-1", "Ana", "cash", 10.0),
            ],
            &recon,
        );

        assert_eq!(report.batch, 2);
        assert_eq!(report.imported, 1, "same plate + driver is already processed");
        assert_eq!(ledger.pending().len(), 2);
        assert_eq!(ledger.pending()[0].id, first_id);
        assert_eq!(ledger.pending()[0].status, DeliveryStatus::Ready);
        assert_eq!(ledger.pending()[1].batch, 2);
    }

    #[test]
    fn test_duplicate_within_batch_and_empty_plate() {
        let recon = reconciled(vec![], vec![]);
        let batch = vec![
            RawDelivery::new("A-1", "Rui", "cash", 10.0),
            RawDelivery::new("A1", "RUI", "cash", 10.0),
            RawDelivery::new("  ", "Rui", "cash", 10.0),
        ];

        let (ledger, report) =
            DeliveryValidator::new().ingest(DeliveryLedger::new(), &batch, &recon);

        assert_eq!(report.received, 3);
        assert_eq!(report.imported, 1);
        assert_eq!(report.skipped_duplicates, 1);
        assert_eq!(report.skipped_without_plate, 1);
        assert_eq!(ledger.pending().len(), 1);
        println!("✅ {}", report.summary());
    }

    #[test]
    fn test_ids_are_unique() {
        let recon = reconciled(vec![], vec![]);
        let batch: Vec<RawDelivery> = (0..20)
            .map(|i| RawDelivery::new(format!("P-{i}"), "Rui", "cash", 1.0))
            .collect();

        let (ledger, _) = DeliveryValidator::new().ingest(DeliveryLedger::new(), &batch, &recon);

        let ids: HashSet<Uuid> = ledger.pending().iter().map(|e| e.id).collect();
        assert_eq!(ids.len(), 20);
    }

    #[test]
    fn test_custom_tolerance() {
        let recon = reconciled(vec![booking("A-1", 10.0)], vec![booking("A-1", 10.0)]);
        let validator = DeliveryValidator::with_tolerance(0.5);

        let (ledger, _) = validator.ingest(
            DeliveryLedger::new(),
            &[RawDelivery::new("A-1", "Rui", "cash", 10.4)],
            &recon,
        );

        assert_eq!(ledger.pending()[0].status, DeliveryStatus::Ready);
    }
}
