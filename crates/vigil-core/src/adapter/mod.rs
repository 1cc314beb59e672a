//! Classification backend adapter seam.
//!
//! All backends expose the same capability surface: `load()`, `unload()`,
//! `classify()`. The session is decoupled from the model; adding a backend
//! family means implementing [`VisionAdapter`] and registering it with the
//! runner's selector. The prompt is injected per call; adapters carry no
//! static prompts.

mod mock;

pub use mock::{MockAdapter, StaticFrameSource, ENV_MOCK_LABELS};

use async_trait::async_trait;

use crate::error::DetectError;

/// One captured frame, already encoded (JPEG or similar). The engine never
/// decodes pixels; the bytes pass through to the evidence store untouched.
#[derive(Debug, Clone)]
pub struct Frame {
    pub bytes: Vec<u8>,
    /// Unix milliseconds at capture time.
    pub captured_at_ms: i64,
}

impl Frame {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            captured_at_ms: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// On-demand frame supplier (camera, file replay, test fixture).
///
/// Capture failures are recoverable at the tick level; the session logs
/// them and counts them toward its consecutive-failure ceiling.
pub trait FrameSource: Send {
    fn capture(&mut self) -> Result<Frame, DetectError>;
}

/// Capability trait for vision-classification backends.
///
/// `classify` takes `&mut self`: a session exclusively owns its adapter, so
/// two classification calls can never be in flight at once. Backends are
/// assumed not reentrant-safe and the engine's latency accounting depends on
/// strictly serialized calls.
#[async_trait]
pub trait VisionAdapter: Send {
    /// Adapter name for selection and diagnostics.
    fn name(&self) -> &str;

    /// Loads model weights. Called once, before any `classify` call;
    /// failure aborts the session before the cadence loop starts.
    async fn load(&mut self) -> Result<(), DetectError>;

    /// Releases model weights. Called exactly once on every session exit
    /// path, including error paths.
    async fn unload(&mut self);

    /// Runs one inference over `frame` with the given classification
    /// prompt, returning the raw response text. Label extraction and
    /// matching are the engine's job, not the backend's.
    async fn classify(&mut self, frame: &Frame, prompt: &str) -> Result<String, DetectError>;
}
