//! Mock backend: a scripted label sequence in place of a real model.
//!
//! Lets the whole engine run end to end (cadence, confirmation, trigger
//! persistence, benchmarking) with no model on the machine. Real VLM
//! adapters live outside this crate behind the same trait.

use std::time::Duration;

use async_trait::async_trait;

use super::{Frame, FrameSource, VisionAdapter};
use crate::error::DetectError;

/// Env var holding a comma-separated label script for the mock adapter,
/// e.g. `VIGIL_MOCK_LABELS=NONE,CUT,CUT,CUT`.
pub const ENV_MOCK_LABELS: &str = "VIGIL_MOCK_LABELS";

const DEFAULT_RESPONSE: &str = "NONE";

/// Scripted classification backend. Emits each scripted response once, in
/// order, then repeats the final entry forever. An entry of `ERROR` yields a
/// classification failure for that tick (for exercising the failure
/// ceiling).
pub struct MockAdapter {
    script: Vec<String>,
    cursor: usize,
    simulated_latency: Duration,
    loaded: bool,
}

impl MockAdapter {
    pub fn new(script: Vec<String>) -> Self {
        Self {
            script,
            cursor: 0,
            simulated_latency: Duration::ZERO,
            loaded: false,
        }
    }

    /// Builds the script from `VIGIL_MOCK_LABELS`; defaults to an endless
    /// `NONE` stream when unset.
    pub fn from_env() -> Self {
        let script = std::env::var(ENV_MOCK_LABELS)
            .ok()
            .map(|v| {
                v.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|v: &Vec<String>| !v.is_empty())
            .unwrap_or_default();
        Self::new(script)
    }

    /// Adds a per-call sleep so cadence behavior is observable in runs and
    /// latency statistics are non-degenerate in benchmarks.
    pub fn with_simulated_latency(mut self, latency: Duration) -> Self {
        self.simulated_latency = latency;
        self
    }

    fn next_response(&mut self) -> String {
        if self.script.is_empty() {
            return DEFAULT_RESPONSE.to_string();
        }
        let idx = self.cursor.min(self.script.len() - 1);
        self.cursor += 1;
        self.script[idx].clone()
    }
}

#[async_trait]
impl VisionAdapter for MockAdapter {
    fn name(&self) -> &str {
        "mock"
    }

    async fn load(&mut self) -> Result<(), DetectError> {
        self.loaded = true;
        tracing::info!(target: "vigil::adapter", script_len = self.script.len(), "mock adapter loaded");
        Ok(())
    }

    async fn unload(&mut self) {
        self.loaded = false;
        tracing::info!(target: "vigil::adapter", "mock adapter unloaded");
    }

    async fn classify(&mut self, _frame: &Frame, _prompt: &str) -> Result<String, DetectError> {
        if !self.loaded {
            return Err(DetectError::Classification(
                "mock adapter not loaded".to_string(),
            ));
        }
        if !self.simulated_latency.is_zero() {
            tokio::time::sleep(self.simulated_latency).await;
        }
        let response = self.next_response();
        if response == "ERROR" {
            return Err(DetectError::Classification(
                "scripted classification failure".to_string(),
            ));
        }
        Ok(response)
    }
}

/// Frame source yielding the same fixed bytes on every capture. Stands in
/// for a camera in tests and mock-mode runs.
pub struct StaticFrameSource {
    bytes: Vec<u8>,
}

impl StaticFrameSource {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

impl Default for StaticFrameSource {
    fn default() -> Self {
        // Minimal JPEG SOI/EOI pair; evidence files stay recognizably JPEG.
        Self::new(vec![0xFF, 0xD8, 0xFF, 0xD9])
    }
}

impl FrameSource for StaticFrameSource {
    fn capture(&mut self) -> Result<Frame, DetectError> {
        Ok(Frame::new(self.bytes.clone()))
    }
}
