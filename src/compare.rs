// ⚖️ Comparator - match primary vs back-office bookings
// Every normalized plate lands in exactly one partition:
//   valid | inconsistent | missing
//
// Price is compared with zero tolerance here; tolerance only exists for
// deliveries, where a human typed the amount at the register.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::ReconConfig;
use crate::normalize::{normalize_key, normalize_scalar, BrandNormalizer};
use crate::record::{FieldTag, RawRecord, Side};
use crate::resolution::Resolution;

// ============================================================================
// ENTRY STATUS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "fields", rename_all = "snake_case")]
pub enum EntryStatus {
    /// Both sides present and agreeing (or converged by a resolution)
    Valid,
    /// Both sides present, at least one field disagrees
    Inconsistent(BTreeSet<FieldTag>),
    /// Only the back-office has it
    MissingPrimary,
    /// Only the primary system has it
    MissingSecondary,
}

/// What a reader of an entry should be shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayStatus {
    Valid,
    Resolved,
    Inconsistent,
    MissingPrimary,
    MissingSecondary,
}

impl DisplayStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayStatus::Valid => "valid",
            DisplayStatus::Resolved => "resolved",
            DisplayStatus::Inconsistent => "inconsistent",
            DisplayStatus::MissingPrimary => "missing_primary",
            DisplayStatus::MissingSecondary => "missing_secondary",
        }
    }
}

// ============================================================================
// COMPARISON ENTRY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonEntry {
    /// Raw plate as shown to the operator
    pub license_plate: String,
    /// Normalized join key
    pub key: String,
    pub primary: Option<Arc<RawRecord>>,
    pub secondary: Option<Arc<RawRecord>>,
    pub status: EntryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution: Option<Resolution>,
}

impl ComparisonEntry {
    fn paired(
        key: String,
        primary: Arc<RawRecord>,
        secondary: Arc<RawRecord>,
        mismatches: BTreeSet<FieldTag>,
    ) -> Self {
        let status = if mismatches.is_empty() {
            EntryStatus::Valid
        } else {
            EntryStatus::Inconsistent(mismatches)
        };

        ComparisonEntry {
            license_plate: secondary.license_plate.clone(),
            key,
            primary: Some(primary),
            secondary: Some(secondary),
            status,
            resolution: None,
        }
    }

    fn missing(key: String, present: Arc<RawRecord>, present_side: Side) -> Self {
        let (primary, secondary, status) = match present_side {
            Side::Primary => (Some(present.clone()), None, EntryStatus::MissingSecondary),
            Side::Secondary => (None, Some(present.clone()), EntryStatus::MissingPrimary),
        };

        ComparisonEntry {
            license_plate: present.license_plate.clone(),
            key,
            primary,
            secondary,
            status,
            resolution: None,
        }
    }

    pub fn display_status(&self) -> DisplayStatus {
        match (&self.status, &self.resolution) {
            (EntryStatus::Valid, Some(_)) => DisplayStatus::Resolved,
            (EntryStatus::Valid, None) => DisplayStatus::Valid,
            (EntryStatus::Inconsistent(_), _) => DisplayStatus::Inconsistent,
            (EntryStatus::MissingPrimary, _) => DisplayStatus::MissingPrimary,
            (EntryStatus::MissingSecondary, _) => DisplayStatus::MissingSecondary,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.status == EntryStatus::Valid
    }

    pub fn is_missing(&self) -> bool {
        matches!(
            self.status,
            EntryStatus::MissingPrimary | EntryStatus::MissingSecondary
        )
    }

    pub fn record(&self, side: Side) -> Option<&RawRecord> {
        match side {
            Side::Primary => self.primary.as_deref(),
            Side::Secondary => self.secondary.as_deref(),
        }
    }

    /// Mismatched fields, empty unless inconsistent
    pub fn inconsistencies(&self) -> BTreeSet<FieldTag> {
        match &self.status {
            EntryStatus::Inconsistent(fields) => fields.clone(),
            _ => BTreeSet::new(),
        }
    }
}

// ============================================================================
// DUPLICATES
// ============================================================================

/// Plates from one source that normalized to the same key.
/// The last record won; the others were dropped from matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateKey {
    pub side: Side,
    pub key: String,
    /// Raw plates in input order; the last one is the record kept
    pub plates: Vec<String>,
}

// ============================================================================
// RECONCILIATION (partitions)
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub(crate) valid: Vec<ComparisonEntry>,
    pub(crate) inconsistent: Vec<ComparisonEntry>,
    pub(crate) missing: Vec<ComparisonEntry>,
    duplicates: Vec<DuplicateKey>,
    skipped_without_plate: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonSummary {
    pub total: usize,
    pub valid: usize,
    /// Subset of `valid` that got there through a resolution
    pub resolved: usize,
    pub inconsistent: usize,
    pub missing_primary: usize,
    pub missing_secondary: usize,
}

impl ComparisonSummary {
    pub fn summary(&self) -> String {
        format!(
            "{} bookings: {} valid ({} resolved), {} inconsistent, \
             {} missing in primary, {} missing in back-office",
            self.total,
            self.valid,
            self.resolved,
            self.inconsistent,
            self.missing_primary,
            self.missing_secondary
        )
    }
}

impl Reconciliation {
    pub fn valid(&self) -> &[ComparisonEntry] {
        &self.valid
    }

    pub fn inconsistent(&self) -> &[ComparisonEntry] {
        &self.inconsistent
    }

    pub fn missing(&self) -> &[ComparisonEntry] {
        &self.missing
    }

    pub fn duplicates(&self) -> &[DuplicateKey] {
        &self.duplicates
    }

    pub fn skipped_without_plate(&self) -> usize {
        self.skipped_without_plate
    }

    /// valid ++ inconsistent ++ missing, derived on every call
    pub fn all(&self) -> impl Iterator<Item = &ComparisonEntry> {
        self.valid
            .iter()
            .chain(self.inconsistent.iter())
            .chain(self.missing.iter())
    }

    pub fn len(&self) -> usize {
        self.valid.len() + self.inconsistent.len() + self.missing.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up an entry by any spelling of its plate
    pub fn find(&self, plate: &str) -> Option<&ComparisonEntry> {
        let key = normalize_key(plate);
        if key.is_empty() {
            return None;
        }
        self.all().find(|entry| entry.key == key)
    }

    /// Key → entry map for bulk lookups
    pub fn index(&self) -> HashMap<&str, &ComparisonEntry> {
        self.all().map(|entry| (entry.key.as_str(), entry)).collect()
    }

    pub fn summary(&self) -> ComparisonSummary {
        let missing_primary = self
            .missing
            .iter()
            .filter(|e| e.status == EntryStatus::MissingPrimary)
            .count();

        ComparisonSummary {
            total: self.len(),
            valid: self.valid.len(),
            resolved: self.valid.iter().filter(|e| e.resolution.is_some()).count(),
            inconsistent: self.inconsistent.len(),
            missing_primary,
            missing_secondary: self.missing.len() - missing_primary,
        }
    }
}

// ============================================================================
// COMPARATOR
// ============================================================================

/// One source keyed by normalized plate
struct SourceIndex<'a> {
    records: HashMap<String, &'a RawRecord>,
    /// Keys in first-appearance order
    order: Vec<String>,
    duplicates: Vec<DuplicateKey>,
    skipped: usize,
}

impl<'a> SourceIndex<'a> {
    fn build(records: &'a [RawRecord], side: Side) -> Self {
        let mut index: HashMap<String, &'a RawRecord> = HashMap::new();
        let mut order = Vec::new();
        let mut plates: HashMap<String, Vec<String>> = HashMap::new();
        let mut skipped = 0;

        for record in records {
            let key = normalize_key(&record.license_plate);
            if key.is_empty() {
                skipped += 1;
                continue;
            }

            if index.insert(key.clone(), record).is_none() {
                order.push(key.clone());
            }
            plates
                .entry(key)
                .or_default()
                .push(record.license_plate.clone());
        }

        let duplicates: Vec<DuplicateKey> = order
            .iter()
            .filter_map(|key| {
                let seen = plates.remove(key)?;
                (seen.len() > 1).then(|| DuplicateKey {
                    side,
                    key: key.clone(),
                    plates: seen,
                })
            })
            .collect();

        for dup in &duplicates {
            warn!(
                side = %dup.side,
                key = %dup.key,
                count = dup.plates.len(),
                "duplicate license plate in source, keeping last record"
            );
        }
        if skipped > 0 {
            debug!(side = %side, skipped, "records without license plate skipped");
        }

        SourceIndex {
            records: index,
            order,
            duplicates,
            skipped,
        }
    }
}

pub struct Comparator {
    brands: BrandNormalizer,
}

impl Comparator {
    pub fn new() -> Self {
        Comparator {
            brands: BrandNormalizer::default(),
        }
    }

    pub fn with_normalizer(brands: BrandNormalizer) -> Self {
        Comparator { brands }
    }

    pub fn from_config(config: &ReconConfig) -> Self {
        Comparator::with_normalizer(config.brand_normalizer())
    }

    /// Classify every booking across both sources
    pub fn compare(&self, primary: &[RawRecord], secondary: &[RawRecord]) -> Reconciliation {
        let primary_index = SourceIndex::build(primary, Side::Primary);
        let secondary_index = SourceIndex::build(secondary, Side::Secondary);

        let mut result = Reconciliation::default();

        // Pass 1: everything the back-office knows about
        for key in &secondary_index.order {
            let secondary_record = secondary_index.records[key];

            let entry = match primary_index.records.get(key) {
                None => ComparisonEntry::missing(
                    key.clone(),
                    Arc::new(secondary_record.clone()),
                    Side::Secondary,
                ),
                Some(primary_record) => {
                    let mismatches = self.mismatched_fields(primary_record, secondary_record);
                    ComparisonEntry::paired(
                        key.clone(),
                        Arc::new((*primary_record).clone()),
                        Arc::new(secondary_record.clone()),
                        mismatches,
                    )
                }
            };

            debug!(key = %entry.key, status = entry.display_status().as_str(), "classified");
            result.push(entry);
        }

        // Pass 2: primary bookings the back-office never saw
        for key in &primary_index.order {
            if secondary_index.records.contains_key(key) {
                continue;
            }
            let entry = ComparisonEntry::missing(
                key.clone(),
                Arc::new(primary_index.records[key].clone()),
                Side::Primary,
            );
            debug!(key = %entry.key, status = entry.display_status().as_str(), "classified");
            result.push(entry);
        }

        result.duplicates = primary_index
            .duplicates
            .into_iter()
            .chain(secondary_index.duplicates)
            .collect();
        result.skipped_without_plate = primary_index.skipped + secondary_index.skipped;

        let summary = result.summary();
        info!(
            total = summary.total,
            valid = summary.valid,
            inconsistent = summary.inconsistent,
            missing_primary = summary.missing_primary,
            missing_secondary = summary.missing_secondary,
            duplicates = result.duplicates.len(),
            "comparison complete"
        );

        result
    }

    /// Symmetric: swapping the records gives the same set
    pub fn mismatched_fields(
        &self,
        primary: &RawRecord,
        secondary: &RawRecord,
    ) -> BTreeSet<FieldTag> {
        let mut mismatches = BTreeSet::new();

        if normalize_scalar(primary.booking_price.as_ref())
            != normalize_scalar(secondary.booking_price.as_ref())
        {
            mismatches.insert(FieldTag::BookingPrice);
        }

        if !self.brands.matches(&primary.park_brand, &secondary.park_brand) {
            mismatches.insert(FieldTag::ParkBrand);
        }

        mismatches
    }
}

impl Default for Comparator {
    fn default() -> Self {
        Self::new()
    }
}

impl Reconciliation {
    fn push(&mut self, entry: ComparisonEntry) {
        match entry.status {
            EntryStatus::Valid => self.valid.push(entry),
            EntryStatus::Inconsistent(_) => self.inconsistent.push(entry),
            EntryStatus::MissingPrimary | EntryStatus::MissingSecondary => self.missing.push(entry),
        }
    }
}

/// Compare with the default brand rules
pub fn compare(primary: &[RawRecord], secondary: &[RawRecord]) -> Reconciliation {
    Comparator::new().compare(primary, secondary)
}

// ============================================================================
// TESTS
// ============================================================================
