use std::collections::HashMap;
use std::time::Instant;

use crate::quality::validation_result::{ReasonCode, ValidationResult};

/// Why a completed detection produced no verdict.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DiscardReason {
    /// Result arrived for a flight that was already abandoned.
    Stale,
    /// The detector reported an error.
    DetectionFailed,
    /// The flight outlived the detection timeout.
    TimedOut,
}

impl DiscardReason {
    fn label(&self) -> &'static str {
        match self {
            Self::Stale => "stale",
            Self::DetectionFailed => "detection_failed",
            Self::TimedOut => "timed_out",
        }
    }
}

/// Cross-cutting logger for capture pipeline events.
///
/// Lives on the owning context next to the listeners, so implementations
/// take `&mut self` and need no locking.
pub trait PipelineLogger: Send {
    /// Record one verdict handed to the listeners.
    fn verdict(&mut self, result: &ValidationResult);

    /// Record a completion that produced no verdict.
    fn discarded(&mut self, reason: DiscardReason);

    /// Record how long a named stage took for one frame.
    fn timing(&mut self, stage: &str, duration_ms: f64);

    /// Record a point-in-time metric (e.g. frame brightness).
    fn metric(&mut self, name: &str, value: f64);

    /// Emit an end-of-session summary. Default: no-op.
    fn summary(&self) {}
}

/// Silent logger. Used by tests and embedders that only care about
/// listener callbacks.
pub struct NullPipelineLogger;

impl PipelineLogger for NullPipelineLogger {
    fn verdict(&mut self, _result: &ValidationResult) {}
    fn discarded(&mut self, _reason: DiscardReason) {}
    fn timing(&mut self, _stage: &str, _duration_ms: f64) {}
    fn metric(&mut self, _name: &str, _value: f64) {}
}

/// Running aggregate of one timing or metric series. Constant size no
/// matter how many samples a session records.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SeriesStats {
    pub count: usize,
    pub total: f64,
    pub max: f64,
}

impl SeriesStats {
    fn record(&mut self, value: f64) {
        self.max = if self.count == 0 {
            value
        } else {
            self.max.max(value)
        };
        self.count += 1;
        self.total += value;
    }

    pub fn mean(&self) -> f64 {
        self.total / self.count.max(1) as f64
    }
}

/// Aggregating logger for the CLI: verdict counts per reason, discard
/// counts, per-stage timing and metric averages, reported once at the end.
pub struct StdoutPipelineLogger {
    verdicts: HashMap<ReasonCode, usize>,
    discards: HashMap<DiscardReason, usize>,
    timings: HashMap<String, SeriesStats>,
    metrics: HashMap<String, SeriesStats>,
    start_time: Instant,
}

impl StdoutPipelineLogger {
    pub fn new() -> Self {
        Self {
            verdicts: HashMap::new(),
            discards: HashMap::new(),
            timings: HashMap::new(),
            metrics: HashMap::new(),
            start_time: Instant::now(),
        }
    }

    pub fn verdict_count(&self, reason: ReasonCode) -> usize {
        self.verdicts.get(&reason).copied().unwrap_or(0)
    }

    pub fn discard_count(&self, reason: DiscardReason) -> usize {
        self.discards.get(&reason).copied().unwrap_or(0)
    }

    pub fn timing_stats(&self, stage: &str) -> Option<SeriesStats> {
        self.timings.get(stage).copied()
    }

    /// Returns the formatted summary string, or `None` if nothing was
    /// evaluated or discarded.
    pub fn summary_string(&self) -> Option<String> {
        let evaluated: usize = self.verdicts.values().sum();
        let discarded: usize = self.discards.values().sum();
        if evaluated == 0 && discarded == 0 {
            return None;
        }

        let elapsed_s = self.start_time.elapsed().as_secs_f64();
        let mut lines = vec![format!(
            "Capture summary ({evaluated} verdicts, {discarded} discarded, {elapsed_s:.1}s):"
        )];

        for reason in ReasonCode::ALL.iter().copied() {
            let count = self.verdict_count(reason);
            if count > 0 {
                lines.push(format!("  {:28}: {count}", reason.text()));
            }
        }

        let mut discards: Vec<_> = self.discards.iter().collect();
        discards.sort_by_key(|(reason, _)| reason.label());
        for (reason, count) in discards {
            lines.push(format!("  discarded {:17}: {count}", reason.label()));
        }

        let mut stages: Vec<_> = self.timings.keys().collect();
        stages.sort();
        for stage in stages {
            let stats = &self.timings[stage];
            lines.push(format!(
                "  {stage:12}: avg {:6.1}ms  max {:6.1}ms",
                stats.mean(),
                stats.max
            ));
        }

        let mut metric_names: Vec<_> = self.metrics.keys().collect();
        metric_names.sort();
        for name in metric_names {
            lines.push(format!("  {name}: avg {:.3}", self.metrics[name].mean()));
        }

        if evaluated > 0 && elapsed_s > 0.0 {
            lines.push(format!(
                "  Throughput: {:.1} verdicts/s",
                evaluated as f64 / elapsed_s
            ));
        }

        Some(lines.join("\n"))
    }
}

impl Default for StdoutPipelineLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineLogger for StdoutPipelineLogger {
    fn verdict(&mut self, result: &ValidationResult) {
        *self.verdicts.entry(result.reason).or_default() += 1;
    }

    fn discarded(&mut self, reason: DiscardReason) {
        *self.discards.entry(reason).or_default() += 1;
    }

    fn timing(&mut self, stage: &str, duration_ms: f64) {
        self.timings
            .entry(stage.to_string())
            .or_default()
            .record(duration_ms);
    }

    fn metric(&mut self, name: &str, value: f64) {
        self.metrics
            .entry(name.to_string())
            .or_default()
            .record(value);
    }

    fn summary(&self) {
        if let Some(text) = self.summary_string() {
            log::info!("\n\n{text}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // ── NullPipelineLogger ───────────────────────────────────────────

    #[test]
    fn test_null_logger_all_methods_are_noop() {
        let mut logger = NullPipelineLogger;
        logger.verdict(&ValidationResult::accepted());
        logger.discarded(DiscardReason::Stale);
        logger.timing("detect", 5.0);
        logger.metric("brightness", 0.5);
        logger.summary();
    }

    // ── StdoutPipelineLogger ─────────────────────────────────────────

    #[test]
    fn test_counts_verdicts_per_reason() {
        let mut logger = StdoutPipelineLogger::new();
        logger.verdict(&ValidationResult::accepted());
        logger.verdict(&ValidationResult::accepted());
        logger.verdict(&ValidationResult::rejected(ReasonCode::LowLight));

        assert_eq!(logger.verdict_count(ReasonCode::Validated), 2);
        assert_eq!(logger.verdict_count(ReasonCode::LowLight), 1);
        assert_eq!(logger.verdict_count(ReasonCode::PoseOutOfRange), 0);
    }

    #[test]
    fn test_counts_discards() {
        let mut logger = StdoutPipelineLogger::new();
        logger.discarded(DiscardReason::Stale);
        logger.discarded(DiscardReason::TimedOut);
        logger.discarded(DiscardReason::Stale);

        assert_eq!(logger.discard_count(DiscardReason::Stale), 2);
        assert_eq!(logger.discard_count(DiscardReason::TimedOut), 1);
        assert_eq!(logger.discard_count(DiscardReason::DetectionFailed), 0);
    }

    #[test]
    fn test_timing_keeps_running_stats() {
        let mut logger = StdoutPipelineLogger::new();
        logger.timing("detect", 20.0);
        logger.timing("detect", 30.0);
        logger.timing("detect", 10.0);

        let detect = logger.timing_stats("detect").unwrap();
        assert_eq!(detect.count, 3);
        assert_relative_eq!(detect.mean(), 20.0);
        assert_relative_eq!(detect.max, 30.0);
        assert!(logger.timing_stats("overlay").is_none());
    }

    #[test]
    fn test_long_session_aggregates_in_constant_space() {
        let mut logger = StdoutPipelineLogger::new();
        for i in 0..100_000 {
            logger.timing("detect", (i % 50) as f64);
            logger.metric("brightness", 0.5);
        }

        let detect = logger.timing_stats("detect").unwrap();
        assert_eq!(detect.count, 100_000);
        assert_relative_eq!(detect.mean(), 24.5);
        assert_relative_eq!(detect.max, 49.0);
        assert_eq!(logger.timings.len(), 1);
        assert_eq!(logger.metrics.len(), 1);
    }

    #[test]
    fn test_series_max_tracks_negative_values() {
        let mut stats = SeriesStats::default();
        stats.record(-3.0);
        stats.record(-1.0);
        assert_relative_eq!(stats.max, -1.0);
        assert_relative_eq!(SeriesStats::default().mean(), 0.0);
    }

    #[test]
    fn test_summary_lists_reasons_and_discards() {
        let mut logger = StdoutPipelineLogger::new();
        logger.verdict(&ValidationResult::accepted());
        logger.verdict(&ValidationResult::rejected(ReasonCode::PoseOutOfRange));
        logger.discarded(DiscardReason::DetectionFailed);
        logger.timing("detect", 12.0);
        logger.metric("brightness", 0.25);
        logger.metric("brightness", 0.75);

        let summary = logger.summary_string().unwrap();
        assert!(summary.contains("2 verdicts, 1 discarded"));
        assert!(summary.contains("Face validated successfully"));
        assert!(summary.contains("Face not straight"));
        assert!(!summary.contains("Poor lighting"));
        assert!(summary.contains("detection_failed"));
        assert!(summary.contains("detect"));
        assert!(summary.contains("brightness: avg 0.500"));
    }

    #[test]
    fn test_empty_summary_returns_none() {
        let mut logger = StdoutPipelineLogger::new();
        logger.timing("detect", 3.0);
        assert!(logger.summary_string().is_none());
    }
}
