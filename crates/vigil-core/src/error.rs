//! Error taxonomy for the detection engine.
//!
//! Fatal errors (`ScenarioValidation`, `BackendLoad`, `Persistence`,
//! `BackendUnresponsive`, `BenchmarkPrecondition`) terminate a session with a
//! stage-identifying diagnostic. `Classification` and `Capture` are
//! recoverable per-tick: the session treats the tick as "no match", logs it,
//! and only escalates after a consecutive-failure ceiling.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by scenario loading, detection sessions, and the
/// latency benchmark harness.
#[derive(Debug, Error)]
pub enum DetectError {
    /// Malformed scenario definition. Raised before any inference call.
    #[error("scenario validation failed: {0}")]
    ScenarioValidation(String),

    /// Scenario file could not be read.
    #[error("failed to read scenario {path}: {source}")]
    ScenarioIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Scenario file is not valid YAML for the expected layout.
    #[error("failed to parse scenario {path}: {source}")]
    ScenarioParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The classification backend failed to initialize. Aborts the session
    /// before the cadence loop starts.
    #[error("backend '{adapter}' failed to load: {reason}")]
    BackendLoad { adapter: String, reason: String },

    /// A single inference call failed. Recoverable: the tick counts as
    /// "no match" and feeds the consecutive-failure ceiling.
    #[error("classification call failed: {0}")]
    Classification(String),

    /// A single frame capture failed. Recoverable, same handling as
    /// [`DetectError::Classification`].
    #[error("frame capture failed: {0}")]
    Capture(String),

    /// The consecutive-failure ceiling was exceeded; the backend or the
    /// frame source appears persistently broken.
    #[error("aborting session after {failures} consecutive failed ticks")]
    BackendUnresponsive { failures: u32 },

    /// Trigger evidence could not be written. Fatal: a confirmed event is
    /// only durable once both the frame and its sidecar record exist.
    #[error("could not persist trigger evidence to {path}: {source}")]
    Persistence {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Benchmark invoked without acknowledging the clean-environment
    /// precondition.
    #[error(
        "latency benchmark requires a quiet machine; close other applications \
         and acknowledge the precondition to proceed"
    )]
    BenchmarkPrecondition,

    /// Benchmark invoked with a zero frame count.
    #[error("benchmark frame count must be at least 1")]
    BenchmarkFrameCount,

    /// No adapter is registered under the requested name.
    #[error("unknown adapter '{name}' (choices: {choices})")]
    UnknownAdapter { name: String, choices: String },

    /// Engine configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}
