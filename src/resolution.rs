// 🛠️ Resolution Engine - operator decisions on comparison entries
//
//   inconsistent --UseSide / Custom--> valid (resolved)
//   missing      --Include / Ignore--> valid (resolved)
//
// A resolution never edits a record in place: it builds new records and swaps
// the references, then moves the entry between partitions (remove first, then
// append). Every check runs before the first mutation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use crate::compare::{ComparisonEntry, EntryStatus, Reconciliation};
use crate::config::ReconConfig;
use crate::error::{ReconError, Result};
use crate::normalize::normalize_key;
use crate::record::{FieldTag, RawRecord, RawValue, Side};

// ============================================================================
// STRATEGY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", content = "value", rename_all = "snake_case")]
pub enum Strategy {
    /// Copy every mismatched field from this side onto the other
    UseSide(Side),
    /// Write operator-supplied values into both sides
    Custom(BTreeMap<FieldTag, RawValue>),
    /// Synthesize the absent side from the present one
    Include,
    /// Close a missing entry without creating data
    Ignore,
}

impl Strategy {
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::UseSide(Side::Primary) => "use_primary",
            Strategy::UseSide(Side::Secondary) => "use_secondary",
            Strategy::Custom(_) => "custom",
            Strategy::Include => "include",
            Strategy::Ignore => "ignore",
        }
    }
}

// ============================================================================
// AUDIT TRAIL
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub strategy: Strategy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Status the entry had before it was resolved
    pub previous_status: EntryStatus,
    /// Side whose record was synthesized by `Include`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synthesized: Option<Side>,
    pub resolved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveOutcome {
    Resolved,
    /// Entry was already in the valid partition; nothing changed
    AlreadyResolved,
}

// ============================================================================
// RESOLVER
// ============================================================================

#[derive(Debug, Clone)]
pub struct Resolver {
    placeholder_prefix: String,
}

impl Resolver {
    pub fn new(placeholder_prefix: impl Into<String>) -> Self {
        Resolver {
            placeholder_prefix: placeholder_prefix.into(),
        }
    }

    pub fn from_config(config: &ReconConfig) -> Self {
        Resolver::new(config.placeholder_prefix.clone())
    }

    pub fn resolve(
        &self,
        reconciliation: &mut Reconciliation,
        plate: &str,
        strategy: Option<Strategy>,
        notes: Option<String>,
    ) -> Result<ResolveOutcome> {
        let strategy = strategy.ok_or(ReconError::NoStrategySelected)?;
        let key = normalize_key(plate);

        if reconciliation.valid.iter().any(|e| e.key == key) {
            return Ok(ResolveOutcome::AlreadyResolved);
        }

        let (partition, position) = if let Some(i) =
            reconciliation.inconsistent.iter().position(|e| e.key == key)
        {
            (Partition::Inconsistent, i)
        } else if let Some(i) = reconciliation.missing.iter().position(|e| e.key == key) {
            (Partition::Missing, i)
        } else {
            return Err(ReconError::EntryNotFound {
                plate: plate.to_string(),
            });
        };

        let source = match partition {
            Partition::Inconsistent => &reconciliation.inconsistent,
            Partition::Missing => &reconciliation.missing,
        };
        let strategy_name = strategy.name();
        let resolved = self.apply(&source[position], strategy, notes)?;

        match partition {
            Partition::Inconsistent => reconciliation.inconsistent.remove(position),
            Partition::Missing => reconciliation.missing.remove(position),
        };
        reconciliation.valid.push(resolved);

        info!(key = %key, strategy = strategy_name, "comparison entry resolved");
        Ok(ResolveOutcome::Resolved)
    }

    /// Build the resolved entry; `entry` itself is left untouched
    fn apply(
        &self,
        entry: &ComparisonEntry,
        strategy: Strategy,
        notes: Option<String>,
    ) -> Result<ComparisonEntry> {
        let mut next = entry.clone();
        let mut synthesized = None;

        match (&entry.status, &strategy) {
            (EntryStatus::Inconsistent(fields), Strategy::UseSide(side)) => {
                let (from, to) = paired_records(entry, *side);
                let converged = fields
                    .iter()
                    .fold(to, |record, tag| record.with_field(*tag, from.field(*tag)));
                set_record(&mut next, side.other(), converged);
            }
            (EntryStatus::Inconsistent(fields), Strategy::Custom(values)) => {
                let (mut primary, mut secondary) = paired_records(entry, Side::Primary);
                for tag in fields {
                    let value = values
                        .get(tag)
                        .ok_or(ReconError::MissingCustomValue { field: *tag })?;
                    primary = primary.with_field(*tag, Some(value.clone()));
                    secondary = secondary.with_field(*tag, Some(value.clone()));
                }
                set_record(&mut next, Side::Primary, primary);
                set_record(&mut next, Side::Secondary, secondary);
            }
            (EntryStatus::MissingPrimary | EntryStatus::MissingSecondary, Strategy::Include) => {
                let absent = if entry.primary.is_none() {
                    Side::Primary
                } else {
                    Side::Secondary
                };
                let present = entry.record(absent.other()).ok_or_else(|| {
                    ReconError::EntryNotFound {
                        plate: entry.license_plate.clone(),
                    }
                })?;
                let placeholder = format!("{}-{}", self.placeholder_prefix, uuid::Uuid::new_v4());
                set_record(&mut next, absent, present.synthesize_counterpart(placeholder));
                synthesized = Some(absent);
            }
            (EntryStatus::MissingPrimary | EntryStatus::MissingSecondary, Strategy::Ignore) => {}
            _ => {
                return Err(ReconError::StrategyNotApplicable {
                    strategy: strategy.name(),
                    status: entry.display_status(),
                })
            }
        }

        next.status = EntryStatus::Valid;
        next.resolution = Some(Resolution {
            strategy,
            notes,
            previous_status: entry.status.clone(),
            synthesized,
            resolved_at: Utc::now(),
        });
        Ok(next)
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Resolver::from_config(&ReconConfig::default())
    }
}

enum Partition {
    Inconsistent,
    Missing,
}

/// (record of `side`, record of the other side) for a two-sided entry
fn paired_records(entry: &ComparisonEntry, side: Side) -> (RawRecord, RawRecord) {
    let from = entry.record(side).cloned().unwrap_or_default();
    let to = entry.record(side.other()).cloned().unwrap_or_default();
    (from, to)
}

fn set_record(entry: &mut ComparisonEntry, side: Side, record: RawRecord) {
    match side {
        Side::Primary => entry.primary = Some(Arc::new(record)),
        Side::Secondary => entry.secondary = Some(Arc::new(record)),
    }
}

// ============================================================================
// RECONCILIATION SHORTCUTS
// ============================================================================

impl Reconciliation {
    /// Resolve with the default placeholder prefix
    pub fn resolve(
        &mut self,
        plate: &str,
        strategy: Option<Strategy>,
        notes: Option<String>,
    ) -> Result<ResolveOutcome> {
        Resolver::default().resolve(self, plate, strategy, notes)
    }

    /// Bulk "use this side" over every inconsistent entry; returns how many moved
    pub fn resolve_all_inconsistent(&mut self, side: Side, notes: Option<String>) -> Result<usize> {
        let resolver = Resolver::default();
        let keys: Vec<String> = self.inconsistent.iter().map(|e| e.key.clone()).collect();

        let mut resolved = 0;
        for key in keys {
            let outcome =
                resolver.resolve(self, &key, Some(Strategy::UseSide(side)), notes.clone())?;
            if outcome == ResolveOutcome::Resolved {
                resolved += 1;
            }
        }
        Ok(resolved)
    }
}

// ============================================================================
// TESTS
// ============================================================================
