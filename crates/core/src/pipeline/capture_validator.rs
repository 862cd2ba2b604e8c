use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};

use crate::detection::domain::face_detector::{DetectionError, FaceDetector};
use crate::detection::infrastructure::face_detection_adapter::{
    DetectionCompletion, FaceDetectionAdapter,
};
use crate::pipeline::frame_intake::{FrameIntake, IntakeCounters};
use crate::pipeline::pipeline_logger::{DiscardReason, PipelineLogger};
use crate::pipeline::single_flight::SingleFlight;
use crate::pipeline::validation_listener::{ListenerId, ListenerRegistry, ValidationListener};
use crate::quality::brightness_estimator::BrightnessEstimator;
use crate::quality::quality_gate::QualityGate;
use crate::quality::validation_result::ValidationResult;
use crate::shared::settings::{ScanSettings, SettingsError};

/// Snapshot of pipeline counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub frames_received: u64,
    pub frames_dispatched: u64,
    pub frames_dropped: u64,
    pub frames_skipped: u64,
    pub verdicts: u64,
    pub stale: u64,
    pub detection_failures: u64,
    pub timeouts: u64,
}

#[derive(Debug, Default)]
struct OwnerCounters {
    verdicts: u64,
    stale: u64,
    detection_failures: u64,
    timeouts: u64,
}

/// Owner-side half of the capture pipeline.
///
/// Completions from the detection worker are only turned into verdicts
/// when the owning context calls [`pump`](Self::pump) or
/// [`pump_timeout`](Self::pump_timeout), so listeners always run there.
/// Completions for abandoned flights and detection errors are logged and
/// counted but never reach a listener.
pub struct CaptureValidator {
    gate: QualityGate,
    flight: Arc<SingleFlight>,
    completions: Receiver<DetectionCompletion>,
    listeners: ListenerRegistry,
    logger: Box<dyn PipelineLogger>,
    intake_counters: Arc<IntakeCounters>,
    counters: OwnerCounters,
    adapter: Option<FaceDetectionAdapter>,
}

impl CaptureValidator {
    /// Moves `detector` onto its worker and returns the producer-side
    /// [`FrameIntake`] together with the owner-side validator.
    pub fn start(
        detector: Box<dyn FaceDetector>,
        settings: &ScanSettings,
        logger: Box<dyn PipelineLogger>,
    ) -> Result<(FrameIntake, Self), SettingsError> {
        Self::start_with_gate(detector, settings, QualityGate::new(settings.gate), logger)
    }

    /// Like [`start`](Self::start) with a caller-built rule chain.
    pub fn start_with_gate(
        detector: Box<dyn FaceDetector>,
        settings: &ScanSettings,
        gate: QualityGate,
        logger: Box<dyn PipelineLogger>,
    ) -> Result<(FrameIntake, Self), SettingsError> {
        settings.validate()?;
        let estimator = BrightnessEstimator::new(settings.sample_stride)
            .map_err(|e| SettingsError::Invalid(e.to_string()))?;

        let (completion_tx, completions) = crossbeam_channel::unbounded();
        let (adapter, dispatcher) = FaceDetectionAdapter::spawn(detector, completion_tx);
        let flight = Arc::new(SingleFlight::new(settings.detection_timeout()));
        let intake_counters = Arc::new(IntakeCounters::default());

        let intake = FrameIntake::new(
            estimator,
            dispatcher,
            Arc::clone(&flight),
            Arc::clone(&intake_counters),
        );
        let validator = Self {
            gate,
            flight,
            completions,
            listeners: ListenerRegistry::new(),
            logger,
            intake_counters,
            counters: OwnerCounters::default(),
            adapter: Some(adapter),
        };
        Ok((intake, validator))
    }

    /// Registers `listener` without taking ownership of it.
    pub fn subscribe<L: ValidationListener + 'static>(&mut self, listener: &Arc<L>) -> ListenerId {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.listeners.unsubscribe(id)
    }

    /// Handles every completion already waiting. Returns the number of
    /// verdicts delivered.
    pub fn pump(&mut self) -> usize {
        let mut delivered = 0;
        while let Ok(completion) = self.completions.try_recv() {
            if self.handle(completion).is_some() {
                delivered += 1;
            }
        }
        delivered
    }

    /// Waits up to `wait` for the next completion, then drains the rest.
    ///
    /// When nothing arrives in time a flight that outlived the detection
    /// timeout is abandoned.
    pub fn pump_timeout(&mut self, wait: Duration) -> usize {
        match self.completions.recv_timeout(wait) {
            Ok(completion) => {
                let first = usize::from(self.handle(completion).is_some());
                first + self.pump()
            }
            Err(RecvTimeoutError::Timeout) => {
                self.expire_stale();
                0
            }
            Err(RecvTimeoutError::Disconnected) => 0,
        }
    }

    /// Abandons the current flight if it has outlived the timeout. Its
    /// result, if it ever arrives, is discarded as stale.
    pub fn expire_stale(&mut self) -> Option<u64> {
        let ticket = self.flight.expire_at(Instant::now())?;
        self.counters.timeouts += 1;
        let err = DetectionError::TimedOut(self.flight.timeout());
        log::warn!("Abandoning detection {ticket}: {err}");
        self.logger.discarded(DiscardReason::TimedOut);
        Some(ticket)
    }

    pub fn stats(&self) -> PipelineStats {
        let c = &self.intake_counters;
        PipelineStats {
            frames_received: IntakeCounters::get(&c.received),
            frames_dispatched: IntakeCounters::get(&c.dispatched),
            frames_dropped: IntakeCounters::get(&c.dropped),
            frames_skipped: IntakeCounters::get(&c.skipped),
            verdicts: self.counters.verdicts,
            stale: self.counters.stale,
            detection_failures: self.counters.detection_failures,
            timeouts: self.counters.timeouts,
        }
    }

    pub fn in_flight(&self) -> Option<u64> {
        self.flight.in_flight()
    }

    /// Stops the pipeline and hands the detector back.
    ///
    /// Blocks until the worker finishes the detection it is running, if
    /// any. Its result is still delivered when it is current. The summary
    /// is logged even when the worker died.
    pub fn shutdown(mut self, intake: FrameIntake) -> Result<Box<dyn FaceDetector>, DetectionError> {
        drop(intake);
        let joined = match self.adapter.take() {
            Some(adapter) => adapter.join(),
            None => Err(DetectionError::WorkerStopped),
        };
        self.pump();
        self.logger.summary();
        joined
    }

    fn handle(&mut self, completion: DetectionCompletion) -> Option<ValidationResult> {
        let DetectionCompletion {
            ticket,
            frame_index,
            brightness,
            elapsed,
            outcome,
            ..
        } = completion;

        if !self.flight.finish(ticket) {
            log::debug!("Discarding stale result for frame {frame_index} (detection {ticket})");
            self.counters.stale += 1;
            self.logger.discarded(DiscardReason::Stale);
            return None;
        }
        self.logger.timing("detect", elapsed.as_secs_f64() * 1000.0);

        let observation = match outcome {
            Ok(observation) => observation,
            Err(e) => {
                log::warn!("Face detection failed for frame {frame_index}: {e}");
                self.counters.detection_failures += 1;
                self.logger.discarded(DiscardReason::DetectionFailed);
                return None;
            }
        };

        let result = self.gate.evaluate(&observation, brightness);
        log::debug!(
            "Frame {frame_index}: {} faces, brightness {:.3} -> {}",
            observation.face_count(),
            brightness.value(),
            result.reason
        );
        self.logger.metric("brightness", brightness.value());
        self.logger.verdict(&result);
        self.counters.verdicts += 1;
        self.listeners.notify(&result);
        Some(result)
    }
}
