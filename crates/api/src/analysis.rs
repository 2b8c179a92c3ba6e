//! Media analysis: decide whether audio at a URL is synthetic.
//!
//! A run is strictly sequential and stops at the first failing stage:
//!
//! 1. classify the URL (direct audio file or a page needing extraction)
//! 2. acquire audio (streamed download, or the extractor tool)
//! 3. normalize to 16 kHz mono WAV with the transcoder tool
//! 4. run the inference tool and parse its JSON verdict
//!
//! All intermediate files live in a per-run scratch directory that is removed on
//! every exit path. Every subprocess is bound to the caller's cancellation token and
//! a per-stage timeout, and is killed when either fires.

mod pipeline;
mod source;
mod tool;

pub use pipeline::{AnalysisTools, AudioAnalyzer, MediaAnalyzer};
pub use tool::ToolCommand;

#[cfg(test)]
pub use pipeline::MockMediaAnalyzer;

use serde::Deserialize;

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("invalid media url: {0}")]
    InvalidUrl(String),
    #[error("scratch directory i/o failed")]
    Scratch(#[from] std::io::Error),
    #[error("download failed: {0}")]
    Download(String),
    #[error("conversion failed: {0}")]
    Conversion(String),
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("invalid inference output: {0}")]
    Parse(String),
    #[error("{stage} timed out after {secs}s")]
    TimedOut { stage: &'static str, secs: u64 },
    #[error("analysis cancelled")]
    Cancelled,
}

/// Verdict printed by the inference tool.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AnalysisResult {
    pub probability: f64,
    pub label: String,
}
