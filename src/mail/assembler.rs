//! Outbound message assembly: one multipart message per bin.

use std::sync::Arc;

use lettre::Message;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use tokio::fs;
use tracing::info;

use crate::error::PipelineError;
use crate::mail::transport::MailTransport;
use crate::pipeline::classifier::content_type_for;
use crate::pipeline::types::OutboundBin;

/// Render a bin as a raw message from `sender` to `target`.
///
/// Empty subject, empty HTML body, one attachment per file named by its
/// display name.
pub async fn render(sender: &str, target: &str, bin: &OutboundBin) -> Result<Vec<u8>, PipelineError> {
    let from = parse_mailbox(sender)?;
    let to = parse_mailbox(target)?;

    let mut body = MultiPart::mixed().singlepart(SinglePart::html(String::new()));
    for file in &bin.files {
        let content = fs::read(&file.local_path)
            .await
            .map_err(|source| PipelineError::AttachmentIoFailed {
                name: file.display_name.clone(),
                source,
            })?;
        let content_type = ContentType::parse(content_type_for(&file.display_name))
            .map_err(|e| PipelineError::BuildFailed(format!("content type: {e}")))?;
        body = body.singlepart(Attachment::new(file.display_name.clone()).body(content, content_type));
    }

    let message = Message::builder()
        .from(from)
        .to(to)
        .subject("")
        .multipart(body)
        .map_err(|e| PipelineError::BuildFailed(e.to_string()))?;

    Ok(message.formatted())
}

fn parse_mailbox(address: &str) -> Result<Mailbox, PipelineError> {
    address
        .parse()
        .map_err(|e: lettre::address::AddressError| PipelineError::InvalidAddress {
            address: address.to_string(),
            reason: e.to_string(),
        })
}

/// Renders bins and hands them to the transport.
pub struct MailAssembler {
    sender: String,
    transport: Arc<dyn MailTransport>,
}

impl MailAssembler {
    pub fn new(sender: impl Into<String>, transport: Arc<dyn MailTransport>) -> Self {
        Self {
            sender: sender.into(),
            transport,
        }
    }

    /// Send one bin to one target as a single-recipient envelope.
    pub async fn send(&self, target: &str, bin: &OutboundBin) -> Result<(), PipelineError> {
        let raw = render(&self.sender, target, bin).await?;
        self.transport
            .send_raw(&self.sender, &[target.to_string()], &raw)
            .await
            .map_err(|source| PipelineError::SendFailed {
                destination: target.to_string(),
                source,
            })?;
        info!(
            destination = target,
            files = bin.len(),
            bytes = bin.total_size(),
            "Delivered bin"
        );
        Ok(())
    }
}
