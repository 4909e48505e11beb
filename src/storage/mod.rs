//! Storage abstractions for ledger persistence.
//!
//! The ledger is stored as a single JSON document that is rewritten in full
//! after every commit:
//!
//! ```text
//! {
//!   "updated_at": "2024-01-01T00:00:05Z",
//!   "count": 2,
//!   "identities": ["2024-01-01T00:00Z", "2024-01-01T00:01Z"]
//! }
//! ```
//!
//! A bare JSON array of identity strings is also accepted on load.

pub mod local;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::RowIdentity;

// Re-export for convenience
pub use local::LocalStorage;

/// Persisted ledger document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    /// ISO 8601 timestamp of last update
    pub updated_at: DateTime<Utc>,
    /// Identity count
    pub count: usize,
    /// Announced identities, in commit order
    pub identities: Vec<RowIdentity>,
}

impl LedgerSnapshot {
    pub fn new(identities: Vec<RowIdentity>) -> Self {
        Self {
            updated_at: Utc::now(),
            count: identities.len(),
            identities,
        }
    }
}

/// Accepted on-disk shapes.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum StoredLedger {
    // Tried first: a struct would also accept a JSON array positionally.
    Plain(Vec<RowIdentity>),
    Snapshot(LedgerSnapshot),
}

impl StoredLedger {
    pub(crate) fn into_snapshot(self) -> LedgerSnapshot {
        match self {
            Self::Snapshot(snapshot) => snapshot,
            Self::Plain(identities) => LedgerSnapshot {
                updated_at: DateTime::<Utc>::UNIX_EPOCH,
                count: identities.len(),
                identities,
            },
        }
    }
}

/// Trait for ledger storage backends.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Load the stored ledger. `Ok(None)` when nothing has been stored yet.
    async fn load(&self) -> Result<Option<LedgerSnapshot>>;

    /// Replace the stored ledger with the given identities.
    async fn save(&self, identities: &[RowIdentity]) -> Result<()>;

    /// Human-readable location for logs.
    fn location(&self) -> String;
}
