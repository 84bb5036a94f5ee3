//! Export queue work items.
//!
//! Transient, best-effort retry wrapper around the reconciler - never
//! authoritative state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use vitrine_core::ProductId;

/// Requested sync operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueOperation {
    Create,
    Update,
}

impl QueueOperation {
    /// Stored representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
        }
    }
}

impl std::str::FromStr for QueueOperation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            _ => Err(format!("invalid queue operation: {s}")),
        }
    }
}

/// Lifecycle status of a queue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStatus {
    Pending,
    Processing,
    Success,
    Error,
}

impl QueueStatus {
    /// Stored representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

impl std::str::FromStr for QueueStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "success" => Ok(Self::Success),
            "error" => Ok(Self::Error),
            _ => Err(format!("invalid queue status: {s}")),
        }
    }
}

/// One export queue entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportQueueEntry {
    /// Entry ID.
    pub id: Uuid,
    /// Product to reconcile.
    pub product_id: ProductId,
    /// Requested operation (advisory; the reconciler decides from the
    /// mapping table).
    pub operation: QueueOperation,
    /// Current status.
    pub status: QueueStatus,
    /// Attempts so far.
    pub attempts: i32,
    /// Claim priority (higher first).
    pub priority: i32,
    /// Error text from the most recent failed attempt.
    pub last_error: Option<String>,
    /// When the entry was enqueued.
    pub created_at: DateTime<Utc>,
    /// When the entry was last touched.
    pub updated_at: DateTime<Utc>,
    /// When the entry was last claimed for processing.
    pub started_at: Option<DateTime<Utc>>,
}
