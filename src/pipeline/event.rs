//! Event-bus notification parsing.
//!
//! The bus delivers either a batch (`{"Records":[{"Sns":{"Message":..}}]}`)
//! or a single HTTP push (`{"Type":"Notification","Message":..}`). In both
//! cases `Message` is a JSON string holding the mail receipt.

use serde::Deserialize;

use crate::error::PipelineError;
use crate::pipeline::types::InboundEvent;

// ── Envelope ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawEnvelope {
    Batch {
        #[serde(rename = "Records")]
        records: Vec<RawRecord>,
    },
    Push {
        #[serde(rename = "Type")]
        kind: String,
        #[serde(rename = "Message", default)]
        message: Option<String>,
        #[serde(rename = "SubscribeURL", default)]
        subscribe_url: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(rename = "Sns")]
    sns: RawSnsMessage,
}

#[derive(Debug, Deserialize)]
struct RawSnsMessage {
    #[serde(rename = "Message")]
    message: String,
}

/// A decoded bus delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// Receipt payloads, one per record, in delivery order.
    Messages(Vec<String>),
    /// Subscription handshake; never processed.
    SubscriptionConfirmation { subscribe_url: Option<String> },
    /// Any other control message (unsubscribe, etc.).
    Control { kind: String },
}

impl Notification {
    /// Decode an envelope. Record payloads are left unparsed so each record
    /// can fail on its own turn.
    pub fn parse(body: &[u8]) -> Result<Self, PipelineError> {
        let raw: RawEnvelope = serde_json::from_slice(body)
            .map_err(|e| PipelineError::InvalidEvent(format!("envelope: {e}")))?;

        Ok(match raw {
            RawEnvelope::Batch { records } => {
                Self::Messages(records.into_iter().map(|r| r.sns.message).collect())
            }
            RawEnvelope::Push {
                kind,
                message,
                subscribe_url,
            } => match kind.as_str() {
                "Notification" => {
                    let message = message.ok_or_else(|| {
                        PipelineError::InvalidEvent("notification without Message".into())
                    })?;
                    Self::Messages(vec![message])
                }
                "SubscriptionConfirmation" => Self::SubscriptionConfirmation { subscribe_url },
                _ => Self::Control { kind },
            },
        })
    }
}

// ── Receipt ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct Receipt {
    mail: ReceiptMail,
    receipt: ReceiptInfo,
}

#[derive(Debug, Deserialize)]
struct ReceiptMail {
    source: String,
    destination: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ReceiptInfo {
    action: ReceiptAction,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReceiptAction {
    bucket_name: String,
    object_key: String,
}

impl InboundEvent {
    /// Parse one receipt payload. Missing or mistyped fields are fatal.
    pub fn from_message(message: &str) -> Result<Self, PipelineError> {
        let receipt: Receipt = serde_json::from_str(message)
            .map_err(|e| PipelineError::InvalidEvent(format!("receipt: {e}")))?;

        Ok(Self {
            bucket: receipt.receipt.action.bucket_name,
            object_key: receipt.receipt.action.object_key,
            destinations: receipt.mail.destination,
            sender: receipt.mail.source,
        })
    }
}
