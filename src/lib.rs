// Booking Reconciliation Engine - Core Library
// Exposes all modules for use in the CLI and tests

pub mod record;              // Raw input shapes
pub mod normalize;           // Key / scalar / brand / date normalization
pub mod compare;             // Comparator: valid | inconsistent | missing
pub mod resolution;          // Operator strategies on comparison entries
pub mod delivery;            // Delivery Validator + ledger
pub mod delivery_resolution; // confirm / correct / auto-validate
pub mod config;
pub mod error;
pub mod loader;
pub mod export;

// Re-export commonly used types
pub use record::{FieldTag, RawDelivery, RawRecord, RawValue, Side};
pub use normalize::{
    brands_match, normalize_brand, normalize_date, normalize_key, normalize_payment_method,
    normalize_scalar, BrandNormalizer, NormalizedDate, PaymentMethod, Scalar,
};
pub use compare::{
    compare, Comparator, ComparisonEntry, ComparisonSummary, DisplayStatus, DuplicateKey,
    EntryStatus, Reconciliation,
};
pub use resolution::{Resolution, ResolveOutcome, Resolver, Strategy};
pub use delivery::{
    permanent_issues, DeliveryDisplayStatus, DeliveryEntry, DeliveryKey, DeliveryLedger,
    DeliveryStatus, DeliverySummary, DeliveryTag, DeliveryValidator, ImportReport,
    PermanentIssue, PermanentIssueKind,
};
pub use delivery_resolution::{Correction, DeliveryAction, DeliveryResolution};
pub use config::ReconConfig;
pub use error::{ReconError, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
