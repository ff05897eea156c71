//! First-fit-decreasing distribution of files over outbound messages.

use tracing::warn;

use crate::pipeline::types::{FileToSend, MAX_BINS, OutboundBin};

/// Bins plus the files that did not make it into any of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packing {
    pub bins: [OutboundBin; MAX_BINS],
    /// Oversized files and files left over once every bin was full.
    pub dropped: Vec<FileToSend>,
}

impl Packing {
    /// Non-empty bins, in index order.
    pub fn non_empty(&self) -> impl Iterator<Item = (usize, &OutboundBin)> {
        self.bins.iter().enumerate().filter(|(_, bin)| !bin.is_empty())
    }
}

/// Distribute `files` across at most [`MAX_BINS`] bins.
///
/// Every bin's summed size stays strictly below `max_message_size`.
pub fn pack(files: Vec<FileToSend>, max_message_size: u64) -> [OutboundBin; MAX_BINS] {
    pack_with_overflow(files, max_message_size).bins
}

/// [`pack`], also returning what was left out.
pub fn pack_with_overflow(files: Vec<FileToSend>, max_message_size: u64) -> Packing {
    let mut bins: [OutboundBin; MAX_BINS] = Default::default();
    let mut totals = [0u64; MAX_BINS];
    let mut dropped = Vec::new();

    let (mut candidates, oversized): (Vec<_>, Vec<_>) =
        files.into_iter().partition(|f| f.size <= max_message_size);
    for file in &oversized {
        warn!(
            file = %file.display_name,
            size = file.size,
            limit = max_message_size,
            "File exceeds message size budget, skipping"
        );
    }
    dropped.extend(oversized);

    // Stable sort keeps insertion order among equal sizes.
    candidates.sort_by(|a, b| b.size.cmp(&a.size));

    for file in candidates {
        match totals
            .iter()
            .position(|total| total + file.size < max_message_size)
        {
            Some(index) => {
                totals[index] += file.size;
                bins[index].files.push(file);
            }
            None => {
                warn!(
                    file = %file.display_name,
                    size = file.size,
                    "All outbound messages are full, dropping file"
                );
                dropped.push(file);
            }
        }
    }

    Packing { bins, dropped }
}
