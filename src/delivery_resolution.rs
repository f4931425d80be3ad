// ✅ Delivery Resolution Engine - finalize pending deliveries
//
//   ready | inconsistent --confirm / correct / auto_validate--> validated
//
// Validated is terminal. Clearable tags are moved into the resolution record;
// permanent issues stay on the entry forever.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::info;
use uuid::Uuid;

use crate::delivery::{DeliveryEntry, DeliveryLedger, DeliveryStatus, DeliveryTag};
use crate::error::{ReconError, Result};
use crate::record::RawValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryAction {
    /// Operator accepted the line as recorded
    Confirm,
    /// Operator overwrote price and/or payment method
    Correct,
    /// Accepted without operator input
    AutoValidate,
}

impl DeliveryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryAction::Confirm => "confirm",
            DeliveryAction::Correct => "correct",
            DeliveryAction::AutoValidate => "auto_validate",
        }
    }
}

/// Operator correction; `None` keeps the current value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Correction {
    pub price: Option<RawValue>,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryResolution {
    pub action: DeliveryAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub previous_status: DeliveryStatus,
    /// Clearable tags the entry carried when it was validated
    pub cleared: BTreeSet<DeliveryTag>,
    pub validated_at: DateTime<Utc>,
}

impl DeliveryLedger {
    pub fn confirm(&mut self, id: Uuid, notes: Option<String>) -> Result<&DeliveryEntry> {
        self.finalize(id, DeliveryAction::Confirm, notes, None)
    }

    pub fn correct(&mut self, id: Uuid, correction: Correction) -> Result<&DeliveryEntry> {
        let notes = correction.notes.clone();
        self.finalize(id, DeliveryAction::Correct, notes, Some(correction))
    }

    pub fn auto_validate(&mut self, id: Uuid) -> Result<&DeliveryEntry> {
        self.finalize(id, DeliveryAction::AutoValidate, None, None)
    }

    /// Auto-validate every pending entry with no findings; returns the count
    pub fn auto_validate_ready(&mut self) -> usize {
        let (ready, rest): (Vec<DeliveryEntry>, Vec<DeliveryEntry>) = self
            .pending
            .drain(..)
            .partition(|e| e.status == DeliveryStatus::Ready);
        self.pending = rest;

        let count = ready.len();
        for entry in ready {
            let validated = validate(entry, DeliveryAction::AutoValidate, None);
            self.validated.push(validated);
        }

        info!(count, "ready deliveries auto-validated");
        count
    }

    fn finalize(
        &mut self,
        id: Uuid,
        action: DeliveryAction,
        notes: Option<String>,
        correction: Option<Correction>,
    ) -> Result<&DeliveryEntry> {
        let Some(position) = self.pending.iter().position(|e| e.id == id) else {
            if self.validated.iter().any(|e| e.id == id) {
                return Err(ReconError::DeliveryAlreadyValidated(id));
            }
            return Err(ReconError::DeliveryNotFound(id));
        };

        let mut entry = self.pending.remove(position);
        if let Some(correction) = correction {
            apply_correction(&mut entry, correction);
        }
        let entry = validate(entry, action, notes);

        info!(
            id = %entry.id,
            key = %entry.key,
            action = action.as_str(),
            permanent = entry.permanent_inconsistency,
            "delivery validated"
        );
        self.validated.push(entry);
        self.validated
            .last()
            .ok_or(ReconError::DeliveryNotFound(id))
    }
}

fn apply_correction(entry: &mut DeliveryEntry, correction: Correction) {
    if let Some(price) = correction.price {
        entry.original_price = entry.price_on_delivery.replace(price);
    }
    if let Some(method) = correction.payment_method {
        entry.original_payment_method = Some(std::mem::replace(&mut entry.payment_method, method));
    }
}

fn validate(
    mut entry: DeliveryEntry,
    action: DeliveryAction,
    notes: Option<String>,
) -> DeliveryEntry {
    let cleared = std::mem::take(&mut entry.inconsistencies);

    entry.resolution = Some(DeliveryResolution {
        action,
        notes,
        previous_status: entry.status,
        cleared,
        validated_at: Utc::now(),
    });
    entry.permanent_inconsistency = entry.has_permanent_issues();
    entry.status = DeliveryStatus::Validated;
    entry
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::compare;
    use crate::delivery::{DeliveryDisplayStatus, DeliveryValidator, PermanentIssueKind};
    use crate::record::{RawDelivery, RawRecord};

    fn ledger_with(deliveries: &[RawDelivery]) -> DeliveryLedger {
        let primary = vec![
            RawRecord::new("A-1").with_price(10.0).with_brand("RedPark"),
            RawRecord::new("B-2").with_price(0.0).with_brand("RedPark"),
        ];
        let secondary = vec![
            RawRecord::new("A-1").with_price(10.0).with_brand("RedPark"),
            RawRecord::new("B-2")
                .with_price(0.0)
                .with_brand("RedPark")
                .with_campaign_pay(true),
        ];
        let recon = compare(&primary, &secondary);

        let (ledger, _) =
            DeliveryValidator::new().ingest(DeliveryLedger::new(), deliveries, &recon);
        ledger
    }

    #[test]
    fn test_confirm_moves_entry() {
        let mut ledger = ledger_with(&[RawDelivery::new("A-1", "Rui", "cash", 10.0)]);
        let id = ledger.pending()[0].id;

        let entry = ledger.confirm(id, Some("ok".to_string())).unwrap();

        assert_eq!(entry.status, DeliveryStatus::Validated);
        assert_eq!(entry.display_status(), DeliveryDisplayStatus::Validated);
        assert_eq!(entry.resolution.as_ref().unwrap().action, DeliveryAction::Confirm);
        assert!(ledger.pending().is_empty());
        assert_eq!(ledger.validated().len(), 1);
    }

    #[test]
    fn test_correct_keeps_originals() {
        let mut ledger = ledger_with(&[RawDelivery::new("A-1", "Rui", "card", 12.0)]);
        let id = ledger.pending()[0].id;
        assert_eq!(ledger.pending()[0].status, DeliveryStatus::Inconsistent);

        let entry = ledger
            .correct(
                id,
                Correction {
                    price: Some(RawValue::Number(10.0)),
                    payment_method: Some("cash".to_string()),
                    notes: Some("typo at register".to_string()),
                },
            )
            .unwrap();

        assert_eq!(entry.price_on_delivery, Some(RawValue::Number(10.0)));
        assert_eq!(entry.original_price, Some(RawValue::Number(12.0)));
        assert_eq!(entry.payment_method, "cash");
        assert_eq!(entry.original_payment_method.as_deref(), Some("card"));
        assert!(entry.inconsistencies.is_empty());

        let resolution = entry.resolution.as_ref().unwrap();
        assert_eq!(resolution.previous_status, DeliveryStatus::Inconsistent);
        assert_eq!(resolution.notes.as_deref(), Some("typo at register"));
        assert_eq!(
            resolution.cleared,
            BTreeSet::from([DeliveryTag::PrimaryPriceMismatch, DeliveryTag::SecondaryPriceMismatch])
        );
    }

    #[test]
    fn test_correct_partial_keeps_other_field() {
        let mut ledger = ledger_with(&[RawDelivery::new("A-1", "Rui", "card", 12.0)]);
        let id = ledger.pending()[0].id;

        let entry = ledger
            .correct(id, Correction { price: Some(RawValue::Number(10.0)), ..Default::default() })
            .unwrap();

        assert_eq!(entry.payment_method, "card");
        assert_eq!(entry.original_payment_method, None);
    }

    #[test]
    fn test_permanent_issue_survives_every_transition() {
        let deliveries = [
            RawDelivery::new("B-2", "Rui", "No Pay", 0.0),
            RawDelivery::new("B-2", "Ana", "No Pay", 0.0),
            RawDelivery::new("B-2", "Eva", "No Pay", 0.0),
        ];
        let mut ledger = ledger_with(&deliveries);
        let ids: Vec<Uuid> = ledger.pending().iter().map(|e| e.id).collect();

        ledger.confirm(ids[0], None).unwrap();
        ledger
            .correct(
                ids[1],
                Correction {
                    payment_method: Some("cash".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();
        ledger.auto_validate(ids[2]).unwrap();

        assert_eq!(ledger.validated().len(), 3);
        for entry in ledger.validated() {
            assert!(entry.permanent_inconsistency);
            assert_eq!(
                entry.permanent_issues[0].kind,
                PermanentIssueKind::NoPayWithoutCampaignPayFalse
            );
            assert_eq!(entry.display_status(), DeliveryDisplayStatus::ValidatedWithIssues);
        }
        assert_eq!(ledger.summary().validated_with_issues, 3);
    }

    #[test]
    fn test_unknown_and_repeated_ids() {
        let mut ledger = ledger_with(&[RawDelivery::new("A-1", "Rui", "cash", 10.0)]);
        let id = ledger.pending()[0].id;

        let unknown = Uuid::new_v4();
        assert_eq!(
            ledger.confirm(unknown, None).unwrap_err(),
            ReconError::DeliveryNotFound(unknown)
        );

        ledger.auto_validate(id).unwrap();
        assert_eq!(
            ledger.confirm(id, None).unwrap_err(),
            ReconError::DeliveryAlreadyValidated(id)
        );
        assert_eq!(ledger.validated().len(), 1);
    }

    #[test]
    fn test_auto_validate_ready_only() {
        let mut ledger = ledger_with(&[
            RawDelivery::new("A-1", "Rui", "cash", 10.0),
            RawDelivery::new("A-1", "Ana", "cash", 15.0),
            RawDelivery::new("ZZ-9", "Eva", "cash", 10.0),
        ]);

        let count = ledger.auto_validate_ready();

        assert_eq!(count, 1);
        assert_eq!(ledger.pending().len(), 2);
        assert!(ledger
            .pending()
            .iter()
            .all(|e| e.status == DeliveryStatus::Inconsistent));
        assert_eq!(
            ledger.validated()[0].resolution.as_ref().unwrap().action,
            DeliveryAction::AutoValidate
        );
    }

    #[test]
    fn test_validated_not_reingested() {
        let primary = vec![RawRecord::new("A-1").with_price(10.0).with_brand("X")];
        let recon = compare(&primary, &primary);
        let batch = [RawDelivery::new("A-1", "Rui", "cash", 10.0)];
        let validator = DeliveryValidator::new();

        let (mut ledger, _) = validator.ingest(DeliveryLedger::new(), &batch, &recon);
        let id = ledger.pending()[0].id;
        ledger.confirm(id, None).unwrap();

        let (ledger, report) = validator.ingest(ledger, &batch, &recon);

        assert_eq!(report.imported, 0);
        assert!(ledger.pending().is_empty());
        assert_eq!(ledger.validated().len(), 1);
        assert_eq!(ledger.find(id).unwrap().status, DeliveryStatus::Validated);
    }
}
