//! Attachment extraction from raw RFC 5322 messages.

use mail_parser::{MessageParser, MessagePart, MimeHeaders};
use tracing::debug;

use crate::error::PipelineError;
use crate::pipeline::types::Attachment;

/// Parse a raw email and return its attachments in message order.
///
/// Parts without a filename are kept with an empty name; the classifier
/// drops them. Resources embedded in the body are not attachments.
pub fn extract_attachments(raw: &[u8]) -> Result<Vec<Attachment>, PipelineError> {
    let message = MessageParser::default()
        .parse(raw)
        .ok_or_else(|| PipelineError::ParseFailed("not a MIME message".into()))?;

    if message.headers().is_empty() {
        return Err(PipelineError::ParseFailed("message has no headers".into()));
    }

    Ok(message
        .attachments()
        .filter(|part| {
            let embedded = is_embedded(part);
            if embedded {
                debug!(
                    content_id = part.content_id().unwrap_or_default(),
                    "Skipping embedded body resource"
                );
            }
            !embedded
        })
        .map(|part| Attachment {
            display_name: MimeHeaders::attachment_name(part)
                .unwrap_or_default()
                .to_string(),
            content: part.contents().to_vec(),
        })
        .collect())
}

/// A part referenced from the body by `cid:` (a `Content-ID` without an
/// explicit `attachment` disposition).
fn is_embedded(part: &MessagePart<'_>) -> bool {
    part.content_id().is_some()
        && !part
            .content_disposition()
            .is_some_and(|d| d.ctype().eq_ignore_ascii_case("attachment"))
}
