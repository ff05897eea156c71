//! Recipient resolution and sender authorisation.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::PipelineError;
use crate::pipeline::types::PolicyRecord;
use crate::store::PolicyStore;

/// Pick the first destination on the receive domain.
///
/// The suffix comparison ignores ASCII case; the returned address is
/// untouched so the policy lookup stays an exact-key read.
pub fn select_local_recipient<'a>(destinations: &'a [String], suffix: &str) -> Option<&'a str> {
    let suffix = suffix.to_ascii_lowercase();
    destinations
        .iter()
        .map(String::as_str)
        .find(|d| d.to_ascii_lowercase().ends_with(&suffix))
}

/// Maps an inbound envelope to the policy governing it.
pub struct RecipientResolver {
    receive_domain: String,
    store: Arc<dyn PolicyStore>,
}

impl RecipientResolver {
    pub fn new(receive_domain: impl Into<String>, store: Arc<dyn PolicyStore>) -> Self {
        Self {
            receive_domain: receive_domain.into(),
            store,
        }
    }

    /// Find the local recipient, load its policy, and check the sender.
    pub async fn resolve(
        &self,
        destinations: &[String],
        sender: &str,
    ) -> Result<PolicyRecord, PipelineError> {
        let recipient = select_local_recipient(destinations, &self.receive_domain)
            .ok_or_else(|| PipelineError::NoLocalRecipient(destinations.to_vec()))?;

        let policy = self
            .store
            .get(recipient)
            .await?
            .ok_or_else(|| PipelineError::UnknownRecipient(recipient.to_string()))?;

        if !policy.approves(sender) {
            warn!(recipient, sender, "Rejected unapproved sender");
            return Err(PipelineError::UnauthorisedSender {
                sender: sender.to_string(),
                recipient: recipient.to_string(),
            });
        }

        debug!(
            recipient,
            destinations = policy.destinations.len(),
            "Resolved recipient policy"
        );
        Ok(policy)
    }
}
