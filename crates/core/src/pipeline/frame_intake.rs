use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::detection::infrastructure::face_detection_adapter::{
    DetectionDispatcher, DetectionJob, DispatchRefused,
};
use crate::pipeline::single_flight::SingleFlight;
use crate::quality::brightness_estimator::BrightnessEstimator;
use crate::shared::frame::{FrameSample, ResourceError};

/// What happened to one frame handed to [`FrameIntake::on_frame`].
#[derive(Debug, Clone, PartialEq)]
pub enum FrameDisposition {
    /// Sent to the detector under this ticket.
    Dispatched(u64),
    /// A detection was already in progress; the frame was discarded.
    DroppedInFlight,
    /// The pixel buffer could not be read; the frame was discarded.
    Skipped(ResourceError),
    /// The detection worker is gone. No frame can be evaluated any more.
    DetectorUnavailable,
}

/// Producer-side counters, shared with the owning context.
#[derive(Debug, Default)]
pub(crate) struct IntakeCounters {
    pub(crate) received: AtomicU64,
    pub(crate) dispatched: AtomicU64,
    pub(crate) dropped: AtomicU64,
    pub(crate) skipped: AtomicU64,
}

impl IntakeCounters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}

/// Entry point for the camera callback thread.
///
/// Applies the single-flight policy, estimates brightness for admitted
/// frames only, and hands them to the detection worker. Never blocks on
/// detection.
///
/// While the worker's queue slot is occupied (a hung detection plus an
/// abandoned one waiting behind it) frames are dropped before a ticket is
/// taken, so a stuck engine costs each frame nothing but the check.
pub struct FrameIntake {
    estimator: BrightnessEstimator,
    dispatcher: DetectionDispatcher,
    flight: Arc<SingleFlight>,
    counters: Arc<IntakeCounters>,
}

impl FrameIntake {
    pub(crate) fn new(
        estimator: BrightnessEstimator,
        dispatcher: DetectionDispatcher,
        flight: Arc<SingleFlight>,
        counters: Arc<IntakeCounters>,
    ) -> Self {
        Self {
            estimator,
            dispatcher,
            flight,
            counters,
        }
    }

    pub fn on_frame(&self, frame: FrameSample) -> FrameDisposition {
        IntakeCounters::bump(&self.counters.received);
        let index = frame.index();

        if self.dispatcher.is_busy() {
            log::trace!("Frame {index} dropped: detector queue full");
            IntakeCounters::bump(&self.counters.dropped);
            return FrameDisposition::DroppedInFlight;
        }

        let Some(ticket) = self.flight.try_begin() else {
            log::trace!("Frame {index} dropped: detection in flight");
            IntakeCounters::bump(&self.counters.dropped);
            return FrameDisposition::DroppedInFlight;
        };

        let brightness = match self.estimator.estimate(&frame) {
            Ok(brightness) => brightness,
            Err(e) => {
                self.flight.finish(ticket);
                log::warn!("Skipping frame {index}: {e}");
                IntakeCounters::bump(&self.counters.skipped);
                return FrameDisposition::Skipped(e);
            }
        };

        let job = DetectionJob {
            ticket,
            frame,
            brightness,
        };
        match self.dispatcher.dispatch(job) {
            Ok(()) => {
                log::trace!("Frame {index} dispatched as detection {ticket}");
                IntakeCounters::bump(&self.counters.dispatched);
                FrameDisposition::Dispatched(ticket)
            }
            Err(DispatchRefused::Busy(_)) => {
                // Another producer filled the slot after the check above
                self.flight.finish(ticket);
                log::debug!("Frame {index} dropped: detector busy");
                IntakeCounters::bump(&self.counters.dropped);
                FrameDisposition::DroppedInFlight
            }
            Err(DispatchRefused::Stopped(_)) => {
                self.flight.finish(ticket);
                log::error!("Frame {index} not evaluated: face detection worker stopped");
                FrameDisposition::DetectorUnavailable
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::domain::face_detector::{DetectionError, DetectorOptions, FaceDetector};
    use crate::detection::domain::face_observation::DetectedFace;
    use crate::detection::infrastructure::face_detection_adapter::{
        DetectionCompletion, FaceDetectionAdapter,
    };
    use crate::shared::frame::{LumaBuffer, LumaPlane, PixelBuffer};
    use approx::assert_relative_eq;
    use crossbeam_channel::Receiver;
    use std::time::Duration;

    struct GatedDetector {
        gate: Receiver<()>,
    }

    impl FaceDetector for GatedDetector {
        fn options(&self) -> DetectorOptions {
            DetectorOptions::default()
        }

        fn detect(&mut self, _frame: &FrameSample) -> Result<Vec<DetectedFace>, DetectionError> {
            let _ = self.gate.recv();
            Ok(vec![DetectedFace::default()])
        }
    }

    /// Uniform buffer that counts how often its plane is locked.
    struct CountingBuffer {
        inner: LumaBuffer,
        locks: std::sync::atomic::AtomicUsize,
    }

    impl PixelBuffer for CountingBuffer {
        fn width(&self) -> u32 {
            self.inner.width()
        }

        fn height(&self) -> u32 {
            self.inner.height()
        }

        fn lock_luma(&self) -> Result<LumaPlane<'_>, ResourceError> {
            self.locks.fetch_add(1, Ordering::SeqCst);
            self.inner.lock_luma()
        }

        fn unlock_luma(&self) {
            self.inner.unlock_luma()
        }
    }

    struct LockedBuffer;

    impl PixelBuffer for LockedBuffer {
        fn width(&self) -> u32 {
            64
        }

        fn height(&self) -> u32 {
            64
        }

        fn lock_luma(&self) -> Result<LumaPlane<'_>, ResourceError> {
            Err(ResourceError::LockFailed("held by encoder".into()))
        }

        fn unlock_luma(&self) {}
    }

    struct Harness {
        intake: FrameIntake,
        flight: Arc<SingleFlight>,
        counters: Arc<IntakeCounters>,
        gate: crossbeam_channel::Sender<()>,
        done: Receiver<DetectionCompletion>,
        _adapter: FaceDetectionAdapter,
    }

    fn harness(timeout: Duration) -> Harness {
        let (gate, gate_rx) = crossbeam_channel::unbounded();
        let (done_tx, done) = crossbeam_channel::unbounded();
        let (adapter, dispatcher) =
            FaceDetectionAdapter::spawn(Box::new(GatedDetector { gate: gate_rx }), done_tx);
        let flight = Arc::new(SingleFlight::new(timeout));
        let counters = Arc::new(IntakeCounters::default());
        let intake = FrameIntake::new(
            BrightnessEstimator::default(),
            dispatcher,
            Arc::clone(&flight),
            Arc::clone(&counters),
        );
        Harness {
            intake,
            flight,
            counters,
            gate,
            done,
            _adapter: adapter,
        }
    }

    fn frame(index: usize, luma: u8) -> FrameSample {
        FrameSample::new(
            Arc::new(LumaBuffer::uniform(40, 40, luma)),
            Duration::from_millis(index as u64 * 33),
            index,
        )
        .unwrap()
    }

    const WAIT: Duration = Duration::from_secs(5);

    #[test]
    fn test_first_frame_is_dispatched_with_its_brightness() {
        let h = harness(Duration::from_secs(60));

        assert_eq!(h.intake.on_frame(frame(0, 102)), FrameDisposition::Dispatched(0));
        h.gate.send(()).unwrap();
        let done = h.done.recv_timeout(WAIT).unwrap();

        assert_eq!(done.ticket, 0);
        assert_relative_eq!(done.brightness.value(), 102.0 / 255.0);
    }

    #[test]
    fn test_frames_during_flight_are_dropped() {
        let h = harness(Duration::from_secs(60));

        h.intake.on_frame(frame(0, 128));
        for i in 1..5 {
            assert_eq!(h.intake.on_frame(frame(i, 128)), FrameDisposition::DroppedInFlight);
        }

        assert_eq!(IntakeCounters::get(&h.counters.received), 5);
        assert_eq!(IntakeCounters::get(&h.counters.dispatched), 1);
        assert_eq!(IntakeCounters::get(&h.counters.dropped), 4);
    }

    #[test]
    fn test_next_frame_admitted_after_finish() {
        let h = harness(Duration::from_secs(60));

        h.intake.on_frame(frame(0, 128));
        h.gate.send(()).unwrap();
        let done = h.done.recv_timeout(WAIT).unwrap();
        assert!(h.flight.finish(done.ticket));

        assert_eq!(h.intake.on_frame(frame(1, 128)), FrameDisposition::Dispatched(1));
    }

    #[test]
    fn test_unreadable_buffer_is_skipped_and_frees_the_slot() {
        let h = harness(Duration::from_secs(60));
        let locked = FrameSample::new(Arc::new(LockedBuffer), Duration::ZERO, 0).unwrap();

        let disposition = h.intake.on_frame(locked);

        assert!(matches!(
            disposition,
            FrameDisposition::Skipped(ResourceError::LockFailed(_))
        ));
        assert_eq!(h.flight.in_flight(), None);
        assert_eq!(IntakeCounters::get(&h.counters.skipped), 1);
        assert!(matches!(
            h.intake.on_frame(frame(1, 128)),
            FrameDisposition::Dispatched(_)
        ));
    }

    #[test]
    fn test_lock_is_released_for_dispatched_frames() {
        let h = harness(Duration::from_secs(60));
        let buffer = Arc::new(LumaBuffer::uniform(40, 40, 200));
        let sample = FrameSample::new(buffer.clone(), Duration::ZERO, 0).unwrap();

        h.intake.on_frame(sample);

        assert_eq!(buffer.outstanding_locks(), 0);
    }

    #[test]
    fn test_timed_out_flight_admits_a_new_frame() {
        let h = harness(Duration::from_millis(20));

        assert_eq!(h.intake.on_frame(frame(0, 128)), FrameDisposition::Dispatched(0));
        std::thread::sleep(Duration::from_millis(40));

        // Worker still blocked on ticket 0; the queue slot takes ticket 1
        assert_eq!(h.intake.on_frame(frame(1, 128)), FrameDisposition::Dispatched(1));
        assert_eq!(h.flight.in_flight(), Some(1));
    }

    #[test]
    fn test_hung_worker_drops_frames_without_estimating_or_dispatching() {
        let h = harness(Duration::from_millis(20));

        // Ticket 0 hangs in the detector; ticket 1 takes the queue slot
        // once ticket 0 has timed out.
        assert_eq!(h.intake.on_frame(frame(0, 128)), FrameDisposition::Dispatched(0));
        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(h.intake.on_frame(frame(1, 128)), FrameDisposition::Dispatched(1));
        std::thread::sleep(Duration::from_millis(40));

        // Both timeouts have passed and the worker is still stuck
        let buffer = Arc::new(CountingBuffer {
            inner: LumaBuffer::uniform(40, 40, 128),
            locks: std::sync::atomic::AtomicUsize::new(0),
        });
        for i in 2..6 {
            let sample =
                FrameSample::new(buffer.clone(), Duration::from_millis(i * 33), i as usize)
                    .unwrap();
            assert_eq!(h.intake.on_frame(sample), FrameDisposition::DroppedInFlight);
        }

        assert_eq!(buffer.locks.load(Ordering::SeqCst), 0);
        assert_eq!(IntakeCounters::get(&h.counters.dispatched), 2);
        assert_eq!(h.flight.in_flight(), Some(1));

        // Once the worker drains the queue the next frame gets the next ticket
        h.gate.send(()).unwrap();
        assert_eq!(h.done.recv_timeout(WAIT).unwrap().ticket, 0);
        let mut next = h.intake.on_frame(frame(6, 128));
        let deadline = std::time::Instant::now() + WAIT;
        while next == FrameDisposition::DroppedInFlight && std::time::Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
            next = h.intake.on_frame(frame(6, 128));
        }
        assert_eq!(next, FrameDisposition::Dispatched(2));
    }

    #[test]
    fn test_stopped_worker_reports_unavailable() {
        let Harness {
            intake,
            flight,
            gate,
            done,
            _adapter: adapter,
            ..
        } = harness(Duration::from_secs(60));
        // With nobody listening for completions the worker exits after one job
        drop(done);
        assert_eq!(intake.on_frame(frame(0, 128)), FrameDisposition::Dispatched(0));
        gate.send(()).unwrap();
        adapter.join().unwrap();
        assert!(flight.finish(0));

        assert_eq!(
            intake.on_frame(frame(1, 128)),
            FrameDisposition::DetectorUnavailable
        );
        assert_eq!(flight.in_flight(), None);
    }
}
