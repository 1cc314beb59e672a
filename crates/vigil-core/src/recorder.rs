//! Trigger evidence persistence.
//!
//! On a confirmed event the session hands the triggering frame and the
//! confirming classification run to the recorder, which writes exactly two
//! artifacts to the evidence directory: the frame image and a JSON sidecar.
//! Both are named deterministically from the firing timestamp and event id.
//! There are no retries: if either write fails the session fails, because a
//! confirmed event that was not durably recorded must not look confirmed.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::adapter::Frame;
use crate::error::DetectError;
use crate::scenario::{EventDefinition, Scenario};

/// One classification observation, as seen by the state machine.
///
/// Ephemeral during the session (an in-memory rolling log); the trailing run
/// that produced a confirmation is persisted inside the trigger record for
/// auditability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationRecord {
    /// Unix milliseconds when the classification completed.
    pub timestamp_ms: i64,
    /// Parsed label for the tick.
    pub label: String,
    /// Full raw backend response text.
    pub raw: String,
    /// 1.0 when the label parsed cleanly, 0.5 for a best-effort fallback.
    pub confidence: f32,
    /// Wall-clock inference latency measured around the call.
    pub latency_ms: f64,
}

/// The structured record persisted alongside the frame when an event fires.
/// Immutable once written; the evaluation tooling reads it as ground truth
/// of what the engine saw.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerRecord {
    pub scenario_id: String,
    pub scenario_version: u32,
    pub event_id: String,
    pub event_label: String,
    /// UTC firing timestamp, also the evidence file-name stem prefix.
    pub fired_at: String,
    /// Path of the persisted frame image.
    pub frame_path: PathBuf,
    /// The classification prompt in effect, so evaluators can reproduce the
    /// exact wording this scenario version used.
    pub prompt: String,
    /// The consecutive matching classifications that confirmed the event,
    /// oldest first.
    pub confirmations: Vec<ClassificationRecord>,
}

/// Writes trigger evidence to a fixed directory. One write per session.
pub struct TriggerRecorder {
    evidence_dir: PathBuf,
}

impl TriggerRecorder {
    pub fn new(evidence_dir: impl Into<PathBuf>) -> Self {
        Self {
            evidence_dir: evidence_dir.into(),
        }
    }

    pub fn evidence_dir(&self) -> &Path {
        &self.evidence_dir
    }

    /// Persists the frame and the trigger record for a fired event.
    ///
    /// File names are deterministic: `{utc_ts}_{event_id}.jpg` and
    /// `{utc_ts}_{event_id}_trigger.json`. Any IO failure maps to
    /// [`DetectError::Persistence`] and fails the session.
    pub fn record(
        &self,
        scenario: &Scenario,
        event: &EventDefinition,
        frame: &Frame,
        prompt: &str,
        confirmations: Vec<ClassificationRecord>,
    ) -> Result<TriggerRecord, DetectError> {
        let fired_at = Utc::now().format("%Y%m%dT%H%M%S%3f").to_string();
        let stem = format!("{}_{}", fired_at, event.id);

        fs::create_dir_all(&self.evidence_dir).map_err(|source| DetectError::Persistence {
            path: self.evidence_dir.clone(),
            source,
        })?;

        let frame_path = self.evidence_dir.join(format!("{stem}.jpg"));
        fs::write(&frame_path, &frame.bytes).map_err(|source| DetectError::Persistence {
            path: frame_path.clone(),
            source,
        })?;

        let record = TriggerRecord {
            scenario_id: scenario.id.clone(),
            scenario_version: scenario.version,
            event_id: event.id.clone(),
            event_label: event.label.clone(),
            fired_at,
            frame_path: frame_path.clone(),
            prompt: prompt.to_string(),
            confirmations,
        };

        let sidecar_path = self.evidence_dir.join(format!("{stem}_trigger.json"));
        let json = serde_json::to_vec_pretty(&record).map_err(|e| DetectError::Persistence {
            path: sidecar_path.clone(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        })?;
        fs::write(&sidecar_path, json).map_err(|source| DetectError::Persistence {
            path: sidecar_path.clone(),
            source,
        })?;

        tracing::info!(
            target: "vigil::recorder",
            event_id = %record.event_id,
            frame = %frame_path.display(),
            sidecar = %sidecar_path.display(),
            "trigger evidence written"
        );
        Ok(record)
    }
}
