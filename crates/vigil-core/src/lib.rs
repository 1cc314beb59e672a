//! vigil-core: targeted event-detection engine.
//!
//! A cadence-driven sampling loop queries a vision-classification backend
//! with a constrained label set, accumulates consecutive matching
//! classifications per candidate event, and declares an event confirmed only
//! after a configurable run-length of agreement. Ships with the latency
//! benchmark harness that gates real-time viability and the recorder that
//! persists trigger evidence.

mod adapter;
mod bench;
mod config;
mod confirm;
mod error;
mod label;
mod recorder;
mod scenario;
mod session;

// Scenario definitions
pub use scenario::{EventDefinition, Scenario};

// Label policy
pub use label::{parse_label, LabelSet, Observation, NONE_LABEL};

// Confirmation state machine
pub use confirm::ConfirmationTracker;

// Backend adapter seam
pub use adapter::{Frame, FrameSource, MockAdapter, StaticFrameSource, VisionAdapter, ENV_MOCK_LABELS};

// Detection session
pub use session::{
    CancelToken, DetectionSession, SessionOptions, SessionOutcome, TerminationPolicy,
};

// Latency benchmark harness
pub use bench::{run_latency_benchmark, BenchmarkOptions, BenchmarkReport};

// Trigger evidence
pub use recorder::{ClassificationRecord, TriggerRecord, TriggerRecorder};

// Configuration
pub use config::EngineConfig;

// Errors
pub use error::DetectError;
