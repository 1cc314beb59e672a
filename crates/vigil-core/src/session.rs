//! Detection session: the cadence-driven capture → classify → confirm loop.
//!
//! Single logical task, strictly serialized backend calls. Each tick captures
//! a frame, runs one timed classification, feeds the parsed label to the
//! confirmation state machine, then sleeps whatever remains of the interval.
//! When classification runs longer than the interval the next tick starts
//! immediately; there is no catch-up skipping and never two in-flight calls.
//!
//! Cancellation is cooperative and checked only between ticks; an in-flight
//! inference call cannot be interrupted, only the next tick prevented.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::adapter::{Frame, FrameSource, VisionAdapter};
use crate::confirm::ConfirmationTracker;
use crate::error::DetectError;
use crate::label::{parse_label, LabelSet};
use crate::recorder::{ClassificationRecord, TriggerRecord, TriggerRecorder};
use crate::scenario::Scenario;

/// When a detection session ends of its own accord.
///
/// `FirstTrigger` is the production policy: the session terminates on the
/// first confirmed event. `FrameLimit` bounds the session to a fixed number
/// of ticks regardless of triggers, for soak runs and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationPolicy {
    FirstTrigger,
    FrameLimit(u64),
}

/// Tunables for one detection session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Target spacing between classification cycles.
    pub interval: Duration,
    /// Uniform `confirm_frames` override for every event, when set.
    pub confirm_override: Option<u32>,
    /// Consecutive failed ticks (capture or classification) tolerated before
    /// the session aborts with `BackendUnresponsive`.
    pub max_consecutive_failures: u32,
    pub termination: TerminationPolicy,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            confirm_override: None,
            max_consecutive_failures: 5,
            termination: TerminationPolicy::FirstTrigger,
        }
    }
}

/// How a session ended.
#[derive(Debug)]
pub enum SessionOutcome {
    /// An event was confirmed and its evidence durably written.
    Triggered(TriggerRecord),
    /// The frame limit elapsed with no confirmed event.
    FrameLimitReached { frames: u64 },
    /// The caller cancelled between ticks.
    Cancelled { frames: u64 },
}

/// Cooperative cancellation flag, checked between ticks only.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// One detection session over a validated scenario.
///
/// The session exclusively owns its adapter: it loads the backend before the
/// first tick and unloads it on every exit path, success or error.
pub struct DetectionSession {
    scenario: Scenario,
    adapter: Box<dyn VisionAdapter>,
    recorder: TriggerRecorder,
    options: SessionOptions,
    cancel: CancelToken,
}

impl DetectionSession {
    pub fn new(
        mut scenario: Scenario,
        adapter: Box<dyn VisionAdapter>,
        recorder: TriggerRecorder,
        options: SessionOptions,
    ) -> Self {
        if let Some(confirm_frames) = options.confirm_override {
            scenario.apply_confirm_override(confirm_frames);
        }
        Self {
            scenario,
            adapter,
            recorder,
            options,
            cancel: CancelToken::new(),
        }
    }

    /// Handle for cancelling the session from another task (e.g. ctrl-c).
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Runs the session to completion. The backend is loaded before the
    /// first tick and unloaded on every exit path.
    pub async fn run(mut self, source: &mut dyn FrameSource) -> Result<SessionOutcome, DetectError> {
        self.adapter.load().await?;
        let result = self.drive(source).await;
        self.adapter.unload().await;
        result
    }

    async fn drive(&mut self, source: &mut dyn FrameSource) -> Result<SessionOutcome, DetectError> {
        let prompt = self.scenario.classification_prompt();
        let labels = LabelSet::from_events(&self.scenario.events);
        let mut tracker = ConfirmationTracker::new(&self.scenario.events);
        let mut log: Vec<ClassificationRecord> = Vec::new();
        let mut consecutive_failures: u32 = 0;
        let mut frame_num: u64 = 0;

        tracing::info!(
            target: "vigil::session",
            scenario = %self.scenario.id,
            version = self.scenario.version,
            adapter = %self.adapter.name(),
            interval_ms = self.options.interval.as_millis() as u64,
            events = %self
                .scenario
                .events
                .iter()
                .map(|e| e.id.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            "detection session starting"
        );

        loop {
            if self.cancel.is_cancelled() {
                tracing::info!(target: "vigil::session", frames = frame_num, "session cancelled");
                return Ok(SessionOutcome::Cancelled { frames: frame_num });
            }
            if let TerminationPolicy::FrameLimit(limit) = self.options.termination {
                if frame_num >= limit {
                    return Ok(SessionOutcome::FrameLimitReached { frames: frame_num });
                }
            }

            let tick_start = Instant::now();
            frame_num += 1;

            let tick = self.tick(source, &prompt, &labels).await;
            match tick {
                Ok((frame, record, matched)) => {
                    consecutive_failures = 0;
                    let fired = tracker.observe(matched);
                    tracing::info!(
                        target: "vigil::session",
                        frame = frame_num,
                        label = %record.label,
                        confidence = record.confidence,
                        latency_ms = record.latency_ms as u64,
                        progress = %tracker.progress_line(&self.scenario.events),
                        "classified"
                    );
                    log.push(record);

                    if let Some(fired_idx) = fired {
                        return self.persist_trigger(fired_idx, &prompt, &log, frame);
                    }
                }
                Err(e) => {
                    consecutive_failures += 1;
                    // a failed tick gives the state machine nothing to match
                    tracker.observe(None);
                    tracing::warn!(
                        target: "vigil::session",
                        frame = frame_num,
                        consecutive_failures,
                        error = %e,
                        "tick failed; counters reset"
                    );
                    if consecutive_failures >= self.options.max_consecutive_failures {
                        return Err(DetectError::BackendUnresponsive {
                            failures: consecutive_failures,
                        });
                    }
                }
            }

            let remaining = self.options.interval.saturating_sub(tick_start.elapsed());
            if !remaining.is_zero() {
                tokio::time::sleep(remaining).await;
            }
        }
    }

    /// One capture + timed classification. Returns the tick's frame, its
    /// record, and the matched event index, if any.
    async fn tick(
        &mut self,
        source: &mut dyn FrameSource,
        prompt: &str,
        labels: &LabelSet,
    ) -> Result<(Frame, ClassificationRecord, Option<usize>), DetectError> {
        let frame = source.capture()?;

        let inference_start = Instant::now();
        let raw = self.adapter.classify(&frame, prompt).await?;
        let latency_ms = inference_start.elapsed().as_secs_f64() * 1000.0;

        let (label, confidence) = parse_label(&raw);
        let observation = labels.resolve(&label);
        tracing::debug!(target: "vigil::session", raw = %raw, ?observation, "raw backend response");

        let record = ClassificationRecord {
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
            label,
            raw,
            confidence,
            latency_ms,
        };
        Ok((frame, record, observation.matched()))
    }

    /// Persists the firing tick's frame plus the trailing confirmation run.
    fn persist_trigger(
        &mut self,
        fired_idx: usize,
        prompt: &str,
        log: &[ClassificationRecord],
        frame: Frame,
    ) -> Result<SessionOutcome, DetectError> {
        let event = &self.scenario.events[fired_idx];
        let run_len = event.confirm_frames as usize;
        let confirmations = log[log.len().saturating_sub(run_len)..].to_vec();

        let record = self
            .recorder
            .record(&self.scenario, event, &frame, prompt, confirmations)?;
        tracing::info!(
            target: "vigil::session",
            event_id = %record.event_id,
            label = %record.event_label,
            "EVENT TRIGGERED"
        );
        Ok(SessionOutcome::Triggered(record))
    }
}
