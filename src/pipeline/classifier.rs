//! Extension-based classification of attachments.
//!
//! Lists are taken from the send-to-Kindle documentation (accepted) and the
//! calibre FAQ (convertible input formats).

use std::collections::HashSet;
use std::sync::LazyLock;

/// Extension every converted file carries.
pub const TARGET_FORMAT: &str = ".mobi";

/// Formats the downstream service ingests as-is.
pub const ACCEPTED_FORMATS: &[&str] = &[
    ".doc", ".docx", ".rtf", ".htm", ".html", ".txt", ".mobi", ".azw", ".azw3", ".azw4", ".pdf",
    ".jpg", ".jpeg", ".gif", ".bmp", ".png",
];

/// Formats the converter can turn into [`TARGET_FORMAT`].
pub const CONVERTIBLE_FORMATS: &[&str] = &[
    ".azw", ".azw3", ".azw4", ".cbz", ".cbr", ".cb7", ".cbc", ".chm", ".djvu", ".docx", ".epub",
    ".fb2", ".fbz", ".html", ".htmlz", ".lit", ".lrf", ".mobi", ".odt", ".pdf", ".prc", ".pdb",
    ".pml", ".rb", ".rtf", ".snb", ".tcr", ".txt", ".txtz",
];

static ACCEPTED: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| ACCEPTED_FORMATS.iter().copied().collect());

static CONVERTIBLE: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| CONVERTIBLE_FORMATS.iter().copied().collect());

/// What to do with an attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Forward unchanged.
    Accepted,
    /// Convert to [`TARGET_FORMAT`] first.
    Convertible,
    Drop,
}

/// Classify a filename by its lowercased extension.
pub fn classify(filename: &str) -> Classification {
    let Some(ext) = lowercase_extension(filename) else {
        return Classification::Drop;
    };
    if ACCEPTED.contains(ext.as_str()) {
        Classification::Accepted
    } else if CONVERTIBLE.contains(ext.as_str()) {
        Classification::Convertible
    } else {
        Classification::Drop
    }
}

/// The extension of the last path component, dot included.
///
/// `"a/b.tar.gz"` → `".gz"`; `"README"` → `None`.
pub fn extension(filename: &str) -> Option<&str> {
    let base = base_name(filename);
    base.rfind('.').map(|i| &base[i..])
}

/// [`extension`], lowercased.
pub fn lowercase_extension(filename: &str) -> Option<String> {
    extension(filename).map(str::to_ascii_lowercase)
}

/// Strip any directory components a sender put into a filename.
pub fn base_name(filename: &str) -> &str {
    filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
}

/// Display name of the converted file: original stem plus [`TARGET_FORMAT`].
pub fn converted_display_name(filename: &str) -> String {
    let base = base_name(filename);
    let stem = match extension(base) {
        Some(ext) => &base[..base.len() - ext.len()],
        None => base,
    };
    format!("{stem}{TARGET_FORMAT}")
}

/// MIME type for an outbound attachment.
pub fn content_type_for(filename: &str) -> &'static str {
    match lowercase_extension(filename).as_deref() {
        Some(".pdf") => "application/pdf",
        Some(".mobi" | ".prc") => "application/x-mobipocket-ebook",
        Some(".azw" | ".azw3" | ".azw4") => "application/vnd.amazon.ebook",
        Some(".doc") => "application/msword",
        Some(".docx") => {
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        }
        Some(".rtf") => "application/rtf",
        Some(".htm" | ".html") => "text/html",
        Some(".txt") => "text/plain",
        Some(".jpg" | ".jpeg") => "image/jpeg",
        Some(".gif") => "image/gif",
        Some(".bmp") => "image/bmp",
        Some(".png") => "image/png",
        _ => "application/octet-stream",
    }
}
