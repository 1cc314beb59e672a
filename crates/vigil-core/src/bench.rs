//! Latency benchmark harness.
//!
//! The only authoritative source of latency numbers for real-time gating.
//! Detection-session latencies are measured under uncontrolled system load
//! and are disqualified as benchmark evidence; this harness runs isolated,
//! strictly sequential calls with one discarded warmup to absorb one-time
//! JIT/initialization cost.

use std::time::Instant;

use serde::Serialize;

use crate::adapter::{FrameSource, VisionAdapter};
use crate::error::DetectError;

/// Benchmark invocation parameters.
#[derive(Debug, Clone)]
pub struct BenchmarkOptions {
    /// Number of timed calls (the warmup call is extra and discarded).
    pub frames: usize,
    /// Caller's acknowledgement that the machine is otherwise idle.
    /// Concurrent CPU/memory load measurably skews the statistics, so the
    /// harness refuses to run without it.
    pub quiet_environment_acknowledged: bool,
}

/// Distributional latency statistics over one benchmark invocation.
#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkReport {
    pub adapter: String,
    /// Per-call latencies in call order, warmup excluded.
    pub latencies_ms: Vec<f64>,
    pub mean_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub p50_ms: f64,
    pub p90_ms: f64,
    /// Throughput estimate from the mean: 1000 / mean_ms.
    pub fps_estimate: f64,
    /// The discarded warmup call's latency, reported for visibility into
    /// cold-start cost but never part of the statistics.
    pub warmup_ms: f64,
}

impl BenchmarkReport {
    fn from_latencies(adapter: String, latencies_ms: Vec<f64>, warmup_ms: f64) -> Self {
        let mut sorted = latencies_ms.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let mean_ms = latencies_ms.iter().sum::<f64>() / latencies_ms.len() as f64;
        let p50_ms = sorted[sorted.len() / 2];
        let p90_ms = sorted[(sorted.len() * 9 / 10).min(sorted.len() - 1)];
        Self {
            adapter,
            min_ms: sorted[0],
            max_ms: sorted[sorted.len() - 1],
            mean_ms,
            p50_ms,
            p90_ms,
            fps_estimate: 1000.0 / mean_ms,
            warmup_ms,
            latencies_ms,
        }
    }

    /// Pass/fail against a mean-latency budget in milliseconds.
    pub fn meets_budget(&self, budget_ms: f64) -> bool {
        self.mean_ms < budget_ms
    }

    /// Human-readable multi-line summary for the CLI.
    pub fn summary(&self) -> String {
        format!(
            "Benchmark results ({} frames, adapter={}):\n\
             \x20 mean={:.0}ms  min={:.0}ms  max={:.0}ms\n\
             \x20 p50={:.0}ms  p90={:.0}ms\n\
             \x20 estimated fps: {:.2} (mean-based)\n\
             \x20 warmup (excluded): {:.0}ms",
            self.latencies_ms.len(),
            self.adapter,
            self.mean_ms,
            self.min_ms,
            self.max_ms,
            self.p50_ms,
            self.p90_ms,
            self.fps_estimate,
            self.warmup_ms,
        )
    }
}

/// Runs the latency benchmark: load, one discarded warmup call, then exactly
/// `options.frames` timed sequential classification calls. The adapter is
/// unloaded on every exit path. Never writes a trigger.
pub async fn run_latency_benchmark(
    adapter: &mut dyn VisionAdapter,
    source: &mut dyn FrameSource,
    prompt: &str,
    options: &BenchmarkOptions,
) -> Result<BenchmarkReport, DetectError> {
    if !options.quiet_environment_acknowledged {
        return Err(DetectError::BenchmarkPrecondition);
    }
    if options.frames == 0 {
        return Err(DetectError::BenchmarkFrameCount);
    }

    adapter.load().await?;
    let result = timed_calls(adapter, source, prompt, options.frames).await;
    adapter.unload().await;
    result
}

async fn timed_calls(
    adapter: &mut dyn VisionAdapter,
    source: &mut dyn FrameSource,
    prompt: &str,
    frames: usize,
) -> Result<BenchmarkReport, DetectError> {
    // Warmup: absorbs JIT/cold-cache cost. Discarded from statistics.
    let frame = source.capture()?;
    let warmup_start = Instant::now();
    let warmup_raw = adapter.classify(&frame, prompt).await?;
    let warmup_ms = warmup_start.elapsed().as_secs_f64() * 1000.0;
    tracing::info!(
        target: "vigil::bench",
        warmup_ms = warmup_ms as u64,
        response = %warmup_raw,
        "warmup call complete (excluded from statistics)"
    );

    let mut latencies_ms = Vec::with_capacity(frames);
    for i in 0..frames {
        let frame = source.capture()?;
        let start = Instant::now();
        let raw = adapter.classify(&frame, prompt).await?;
        let latency_ms = start.elapsed().as_secs_f64() * 1000.0;
        latencies_ms.push(latency_ms);
        tracing::info!(
            target: "vigil::bench",
            frame = i + 1,
            latency_ms = latency_ms as u64,
            response = %raw,
            "benchmark frame"
        );
    }

    Ok(BenchmarkReport::from_latencies(
        adapter.name().to_string(),
        latencies_ms,
        warmup_ms,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{Frame, MockAdapter, StaticFrameSource};
    use async_trait::async_trait;
    use std::time::Duration;

    fn options(frames: usize) -> BenchmarkOptions {
        BenchmarkOptions {
            frames,
            quiet_environment_acknowledged: true,
        }
    }

    #[tokio::test]
    async fn refuses_to_run_without_acknowledgement() {
        let mut adapter = MockAdapter::new(vec![]);
        let mut source = StaticFrameSource::default();
        let err = run_latency_benchmark(
            &mut adapter,
            &mut source,
            "p",
            &BenchmarkOptions {
                frames: 5,
                quiet_environment_acknowledged: false,
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DetectError::BenchmarkPrecondition));
    }

    #[tokio::test]
    async fn rejects_zero_frames() {
        let mut adapter = MockAdapter::new(vec![]);
        let mut source = StaticFrameSource::default();
        let err = run_latency_benchmark(&mut adapter, &mut source, "p", &options(0))
            .await
            .unwrap_err();
        assert!(matches!(err, DetectError::BenchmarkFrameCount));
    }

    #[tokio::test]
    async fn statistics_cover_exactly_n_samples_warmup_excluded() {
        let mut adapter =
            MockAdapter::new(vec!["NONE".into()]).with_simulated_latency(Duration::from_millis(2));
        let mut source = StaticFrameSource::default();
        let report = run_latency_benchmark(&mut adapter, &mut source, "p", &options(20))
            .await
            .unwrap();
        assert_eq!(report.latencies_ms.len(), 20);
        assert!(report.warmup_ms > 0.0);
        assert!(report.mean_ms >= 2.0);
        assert!(report.min_ms <= report.p50_ms && report.p50_ms <= report.max_ms);
        assert!(report.p90_ms <= report.max_ms);
        assert!(report.fps_estimate > 0.0);
    }

    /// Adapter that records call boundaries so tests can assert no two
    /// classification calls ever overlap.
    struct OverlapProbe {
        in_flight: bool,
        spans: Vec<(Instant, Instant)>,
    }

    #[async_trait]
    impl VisionAdapter for OverlapProbe {
        fn name(&self) -> &str {
            "probe"
        }
        async fn load(&mut self) -> Result<(), DetectError> {
            Ok(())
        }
        async fn unload(&mut self) {}
        async fn classify(&mut self, _: &Frame, _: &str) -> Result<String, DetectError> {
            assert!(!self.in_flight, "overlapping classification calls");
            self.in_flight = true;
            let start = Instant::now();
            tokio::time::sleep(Duration::from_millis(1)).await;
            let end = Instant::now();
            self.spans.push((start, end));
            self.in_flight = false;
            Ok("NONE".to_string())
        }
    }

    #[tokio::test]
    async fn calls_are_strictly_sequential() {
        let mut adapter = OverlapProbe {
            in_flight: false,
            spans: Vec::new(),
        };
        let mut source = StaticFrameSource::default();
        let report = run_latency_benchmark(&mut adapter, &mut source, "p", &options(5))
            .await
            .unwrap();
        assert_eq!(report.latencies_ms.len(), 5);
        // warmup + 5 timed calls, each ending before the next begins
        assert_eq!(adapter.spans.len(), 6);
        for pair in adapter.spans.windows(2) {
            assert!(pair[0].1 <= pair[1].0);
        }
    }

    #[test]
    fn percentiles_match_the_sorted_index_formulas() {
        let latencies: Vec<f64> = (1..=20).map(|i| i as f64 * 10.0).collect();
        let report = BenchmarkReport::from_latencies("mock".to_string(), latencies, 500.0);
        // sorted[len/2] and sorted[len*9/10]
        assert_eq!(report.p50_ms, 110.0);
        assert_eq!(report.p90_ms, 190.0);
        assert_eq!(report.min_ms, 10.0);
        assert_eq!(report.max_ms, 200.0);
        assert_eq!(report.mean_ms, 105.0);
        assert!(report.meets_budget(200.0));
        assert!(!report.meets_budget(100.0));
    }
}
