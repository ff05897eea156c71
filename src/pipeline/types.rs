//! Shared types for the attachment pipeline.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Upper bound on outbound messages per destination for one inbound email.
pub const MAX_BINS: usize = 10;

// ── Inbound event ───────────────────────────────────────────────────

/// One processing unit, extracted from a bus notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    /// Object-store bucket holding the raw email.
    pub bucket: String,
    /// Object key of the raw email blob.
    pub object_key: String,
    /// Envelope recipients, in transport order.
    pub destinations: Vec<String>,
    /// Envelope sender.
    pub sender: String,
}

// ── Policy ──────────────────────────────────────────────────────────

/// Per-recipient policy: who may submit, and where documents go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRecord {
    pub recipient: String,
    pub approved_senders: Vec<String>,
    /// Downstream delivery addresses, dispatched in this order.
    pub destinations: Vec<String>,
}

impl PolicyRecord {
    /// Exact-match membership test; no case folding.
    pub fn approves(&self, sender: &str) -> bool {
        self.approved_senders.iter().any(|s| s == sender)
    }
}

// ── Attachments ─────────────────────────────────────────────────────

/// A file extracted from the inbound email, not yet on disk.
#[derive(Debug, Clone)]
pub struct Attachment {
    /// Filename as given by the sender (may be empty).
    pub display_name: String,
    pub content: Vec<u8>,
}

/// A sized artifact ready to attach to an outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileToSend {
    pub local_path: PathBuf,
    pub display_name: String,
    pub size: u64,
}

/// One outbound message slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutboundBin {
    pub files: Vec<FileToSend>,
}

impl OutboundBin {
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }
}

// ── Result ──────────────────────────────────────────────────────────

/// Outcome of one successfully processed event.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryReport {
    pub bucket: String,
    pub object_key: String,
    pub recipient: String,
    /// Files that made it into an outbound message.
    pub attachments: Vec<String>,
    /// Attachments dropped by classification, size, or the bin ceiling.
    pub dropped: Vec<String>,
    pub messages_sent: usize,
    pub completed_at: DateTime<Utc>,
}
