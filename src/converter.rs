//! Document conversion through an external tool.
//!
//! Runs `<program> <input> <output>` where `output` is the input path with
//! its extension swapped for `.mobi`. A zero exit status plus a readable
//! output file means success.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::ConversionError;
use crate::pipeline::classifier::TARGET_FORMAT;

/// Maximum converter output kept for diagnostics (16KB).
const MAX_OUTPUT_SIZE: usize = 16 * 1024;

/// A converted artifact on local disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConvertedFile {
    pub path: PathBuf,
    pub size: u64,
}

/// Turns a local file into the target format.
#[async_trait]
pub trait DocumentConverter: Send + Sync {
    async fn convert(&self, input: &Path) -> Result<ConvertedFile, ConversionError>;
}

/// Output path for a conversion: same directory and stem, target extension.
pub fn output_path_for(input: &Path) -> PathBuf {
    input.with_extension(TARGET_FORMAT.trim_start_matches('.'))
}

/// Converter backed by calibre's `ebook-convert` (or a compatible binary).
#[derive(Debug, Clone)]
pub struct EbookConvert {
    program: String,
    timeout: Duration,
}

impl EbookConvert {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

#[async_trait]
impl DocumentConverter for EbookConvert {
    async fn convert(&self, input: &Path) -> Result<ConvertedFile, ConversionError> {
        let output_path = output_path_for(input);

        let child = Command::new(&self.program)
            .arg(input)
            .arg(&output_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ConversionError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => {
                return Err(ConversionError::Spawn {
                    program: self.program.clone(),
                    source,
                });
            }
            // Dropping the future drops the child, which kills it.
            Err(_) => return Err(ConversionError::Timeout(self.timeout)),
        };

        let combined = combine_output(&output.stdout, &output.stderr);
        debug!(
            input = %input.display(),
            status = ?output.status.code(),
            output = %combined,
            "Converter finished"
        );

        if !output.status.success() {
            return Err(ConversionError::NonZeroExit {
                code: output.status.code(),
                output: combined,
            });
        }

        let metadata = tokio::fs::metadata(&output_path)
            .await
            .map_err(|source| ConversionError::MissingOutput {
                path: output_path.display().to_string(),
                source,
            })?;

        Ok(ConvertedFile {
            path: output_path,
            size: metadata.len(),
        })
    }
}

/// Merge stdout and stderr, truncated for logging.
fn combine_output(stdout: &[u8], stderr: &[u8]) -> String {
    let stdout = String::from_utf8_lossy(stdout);
    let stderr = String::from_utf8_lossy(stderr);
    let combined = if stderr.trim().is_empty() {
        stdout.into_owned()
    } else if stdout.trim().is_empty() {
        stderr.into_owned()
    } else {
        format!("{stdout}\n--- stderr ---\n{stderr}")
    };
    truncate_output(combined)
}

fn truncate_output(mut output: String) -> String {
    if output.len() > MAX_OUTPUT_SIZE {
        let mut cut = MAX_OUTPUT_SIZE;
        while !output.is_char_boundary(cut) {
            cut -= 1;
        }
        output.truncate(cut);
        output.push_str("\n... (truncated)");
    }
    output
}
