//! Event processor. Drives one inbound email from notification to delivery.
//!
//! **Core invariant: the raw email is deleted on every terminal path.**
//! Success or failure, exactly one delete of `(bucket, key)` is attempted
//! before `process` returns. Delete failures are logged, never surfaced.
//!
//! Flow:
//! 1. Resolve the local recipient and authorise the sender
//! 2. Download and parse the raw email
//! 3. Materialise attachments, converting where needed
//! 4. Pack into bins and send every non-empty bin to every destination

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tokio::fs;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::config::GatewayConfig;
use crate::converter::DocumentConverter;
use crate::error::PipelineError;
use crate::mail::assembler::MailAssembler;
use crate::mail::parser::extract_attachments;
use crate::mail::transport::MailTransport;
use crate::pipeline::classifier::{
    Classification, base_name, classify, converted_display_name, lowercase_extension,
};
use crate::pipeline::event::Notification;
use crate::pipeline::packer::pack_with_overflow;
use crate::pipeline::resolver::RecipientResolver;
use crate::pipeline::types::{Attachment, DeliveryReport, FileToSend, InboundEvent, PolicyRecord};
use crate::scratch::ScratchDir;
use crate::store::{ObjectStore, PolicyStore};

/// Knobs the processor needs from the gateway configuration.
#[derive(Debug, Clone)]
pub struct ProcessorSettings {
    pub receive_domain: String,
    pub sender: String,
    pub max_message_size: u64,
    pub scratch_root: PathBuf,
    pub skip_failed_conversions: bool,
}

impl From<&GatewayConfig> for ProcessorSettings {
    fn from(config: &GatewayConfig) -> Self {
        Self {
            receive_domain: config.receive_domain.clone(),
            sender: config.sender.clone(),
            max_message_size: config.max_message_size,
            scratch_root: config.scratch_dir.clone(),
            skip_failed_conversions: config.skip_failed_conversions,
        }
    }
}

/// Collaborators the processor drives.
pub struct ProcessorDeps {
    pub policies: Arc<dyn PolicyStore>,
    pub objects: Arc<dyn ObjectStore>,
    pub converter: Arc<dyn DocumentConverter>,
    pub transport: Arc<dyn MailTransport>,
}

/// What the materialise, pack and deliver stages produced.
struct Delivery {
    attachments: Vec<String>,
    dropped: Vec<String>,
    messages_sent: usize,
}

pub struct EventProcessor {
    settings: ProcessorSettings,
    resolver: RecipientResolver,
    objects: Arc<dyn ObjectStore>,
    converter: Arc<dyn DocumentConverter>,
    assembler: MailAssembler,
}

impl EventProcessor {
    pub fn new(settings: ProcessorSettings, deps: ProcessorDeps) -> Self {
        Self {
            resolver: RecipientResolver::new(settings.receive_domain.clone(), deps.policies),
            assembler: MailAssembler::new(settings.sender.clone(), deps.transport),
            objects: deps.objects,
            converter: deps.converter,
            settings,
        }
    }

    /// Process every record of a bus delivery, in order.
    ///
    /// The first failing record aborts the batch; records before it have
    /// already been delivered and cleaned up.
    pub async fn process_notification(
        &self,
        notification: &Notification,
    ) -> Result<Vec<DeliveryReport>, PipelineError> {
        match notification {
            Notification::Messages(messages) => {
                let mut reports = Vec::with_capacity(messages.len());
                for message in messages {
                    let event = InboundEvent::from_message(message)?;
                    reports.push(self.process(&event).await?);
                }
                Ok(reports)
            }
            Notification::SubscriptionConfirmation { subscribe_url } => {
                info!(
                    subscribe_url = subscribe_url.as_deref().unwrap_or("(none)"),
                    "Subscription confirmation received; confirm it out of band"
                );
                Ok(Vec::new())
            }
            Notification::Control { kind } => {
                debug!(kind = %kind, "Ignoring control notification");
                Ok(Vec::new())
            }
        }
    }

    /// Process one event end to end, then delete the raw email.
    pub async fn process(&self, event: &InboundEvent) -> Result<DeliveryReport, PipelineError> {
        let span = info_span!("event", bucket = %event.bucket, key = %event.object_key);
        async {
            info!(sender = %event.sender, "Processing inbound email");

            let result = self.run(event).await;
            self.cleanup(event).await;

            match &result {
                Ok(report) => info!(
                    recipient = %report.recipient,
                    messages = report.messages_sent,
                    dropped = report.dropped.len(),
                    "Inbound email processed"
                ),
                Err(e) => error!(error = %e, "Inbound email failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run(&self, event: &InboundEvent) -> Result<DeliveryReport, PipelineError> {
        let policy = self
            .resolver
            .resolve(&event.destinations, &event.sender)
            .await?;

        let raw = self
            .objects
            .get(&event.bucket, &event.object_key)
            .await
            .map_err(PipelineError::DownloadFailed)?;
        let attachments = extract_attachments(&raw)?;
        drop(raw);
        debug!(count = attachments.len(), "Parsed attachments");

        let scratch = ScratchDir::create(&self.settings.scratch_root)
            .await
            .map_err(|source| PipelineError::AttachmentIoFailed {
                name: "scratch directory".into(),
                source,
            })?;
        let delivery = self.deliver(&scratch, &policy, attachments).await;
        scratch.remove().await;
        let delivery = delivery?;

        Ok(DeliveryReport {
            bucket: event.bucket.clone(),
            object_key: event.object_key.clone(),
            recipient: policy.recipient,
            attachments: delivery.attachments,
            dropped: delivery.dropped,
            messages_sent: delivery.messages_sent,
            completed_at: Utc::now(),
        })
    }

    async fn deliver(
        &self,
        scratch: &ScratchDir,
        policy: &PolicyRecord,
        attachments: Vec<Attachment>,
    ) -> Result<Delivery, PipelineError> {
        let (files, mut dropped) = self.materialise(scratch, attachments).await?;

        let packing = pack_with_overflow(files, self.settings.max_message_size);
        dropped.extend(packing.dropped.iter().map(|f| f.display_name.clone()));

        let mut messages_sent = 0;
        for destination in &policy.destinations {
            for (index, bin) in packing.non_empty() {
                debug!(destination = %destination, bin = index, files = bin.len(), "Sending bin");
                self.assembler.send(destination, bin).await?;
                messages_sent += 1;
            }
        }

        let attachments = packing
            .non_empty()
            .flat_map(|(_, bin)| bin.files.iter().map(|f| f.display_name.clone()))
            .collect();

        Ok(Delivery {
            attachments,
            dropped,
            messages_sent,
        })
    }

    /// Write attachments to scratch as `book{i}{ext}` and classify them.
    ///
    /// Returns the sendable files plus the display names that were dropped.
    async fn materialise(
        &self,
        scratch: &ScratchDir,
        attachments: Vec<Attachment>,
    ) -> Result<(Vec<FileToSend>, Vec<String>), PipelineError> {
        let mut files = Vec::new();
        let mut dropped = Vec::new();

        for (index, attachment) in attachments.into_iter().enumerate() {
            let name = attachment.display_name;

            let classification = classify(&name);
            if classification == Classification::Drop {
                warn!(attachment = %name, "Unsupported attachment, skipping");
                dropped.push(name);
                continue;
            }
            if attachment.content.is_empty() {
                warn!(attachment = %name, "Empty attachment, skipping");
                dropped.push(name);
                continue;
            }

            let ext = lowercase_extension(&name).unwrap_or_default();
            let local_path = scratch.resolve(&format!("book{index}{ext}"));
            fs::write(&local_path, &attachment.content)
                .await
                .map_err(|source| PipelineError::AttachmentIoFailed {
                    name: name.clone(),
                    source,
                })?;
            let size = attachment.content.len() as u64;

            match classification {
                Classification::Accepted => {
                    debug!(attachment = %name, size, "Attachment accepted as-is");
                    files.push(FileToSend {
                        local_path,
                        display_name: base_name(&name).to_string(),
                        size,
                    });
                }
                Classification::Convertible => match self.converter.convert(&local_path).await {
                    Ok(converted) if converted.size == 0 => {
                        warn!(attachment = %name, "Converter produced an empty file, skipping");
                        dropped.push(name);
                    }
                    Ok(converted) => {
                        debug!(attachment = %name, size = converted.size, "Attachment converted");
                        files.push(FileToSend {
                            local_path: converted.path,
                            display_name: converted_display_name(&name),
                            size: converted.size,
                        });
                    }
                    Err(source) if self.settings.skip_failed_conversions => {
                        warn!(attachment = %name, error = %source, "Conversion failed, skipping");
                        dropped.push(name);
                    }
                    Err(source) => return Err(PipelineError::ConversionFailed { name, source }),
                },
                Classification::Drop => {}
            }
        }

        Ok((files, dropped))
    }

    async fn cleanup(&self, event: &InboundEvent) {
        match self.objects.delete(&event.bucket, &event.object_key).await {
            Ok(()) => debug!("Raw email deleted"),
            Err(e) => warn!(error = %e, "Failed to delete raw email"),
        }
    }
}
