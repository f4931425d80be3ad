// 🚫 Reconciliation errors
// Only invalid calls surface here. Filtering rules (empty plates, duplicate
// keys) and parse fallbacks never become errors.

use thiserror::Error;
use uuid::Uuid;

use crate::compare::DisplayStatus;
use crate::record::FieldTag;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReconError {
    /// The operator submitted a resolution without choosing a strategy
    #[error("no resolution strategy selected")]
    NoStrategySelected,

    #[error("no comparison entry for license plate '{plate}'")]
    EntryNotFound { plate: String },

    /// e.g. `UseSide` on a missing entry, `Include` on an inconsistent one
    #[error("strategy '{strategy}' cannot resolve an entry in status {status:?}")]
    StrategyNotApplicable {
        strategy: &'static str,
        status: DisplayStatus,
    },

    #[error("custom resolution is missing a value for field '{field}'")]
    MissingCustomValue { field: FieldTag },

    #[error("delivery entry {0} not found")]
    DeliveryNotFound(Uuid),

    #[error("delivery entry {0} is already validated")]
    DeliveryAlreadyValidated(Uuid),
}

pub type Result<T> = std::result::Result<T, ReconError>;
