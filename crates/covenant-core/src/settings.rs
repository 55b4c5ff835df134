//! Tunables shared by the extraction and analysis stages.

use std::time::Duration;

/// Polling behaviour for asynchronous (PDF) text detection jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractorSettings {
    /// Delay between two job status checks.
    pub poll_interval: Duration,
    /// Hard deadline for the whole poll loop, including in-flight status calls.
    pub max_wait: Duration,
}

impl Default for ExtractorSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            max_wait: Duration::from_secs(300),
        }
    }
}

/// Prompt construction limits for the analyzers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalyzerSettings {
    /// Extracted text beyond this many characters is cut from the prompt.
    pub max_prompt_chars: usize,
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self {
            max_prompt_chars: 5000,
        }
    }
}
