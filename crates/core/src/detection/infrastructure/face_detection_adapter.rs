use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::detection::domain::face_detector::{DetectionError, DetectorOptions, FaceDetector};
use crate::detection::domain::face_observation::FaceObservation;
use crate::quality::brightness_estimator::BrightnessSample;
use crate::shared::frame::FrameSample;

/// One slot: a frame waits here only while the worker is still busy with
/// an abandoned detection.
const JOB_QUEUE_CAPACITY: usize = 1;

/// A frame handed to the detection worker.
#[derive(Debug)]
pub struct DetectionJob {
    pub ticket: u64,
    pub frame: FrameSample,
    pub brightness: BrightnessSample,
}

/// Result of one detection, delivered back to the owning context.
#[derive(Debug)]
pub struct DetectionCompletion {
    pub ticket: u64,
    pub frame_index: usize,
    pub timestamp: Duration,
    pub brightness: BrightnessSample,
    pub elapsed: Duration,
    pub outcome: Result<FaceObservation, DetectionError>,
}

/// Why a job was handed back instead of queued.
#[derive(Debug)]
pub enum DispatchRefused {
    Busy(DetectionJob),
    Stopped(DetectionJob),
}

/// Producer-side handle for submitting jobs. Never blocks.
#[derive(Clone)]
pub struct DetectionDispatcher {
    job_tx: Sender<DetectionJob>,
}

impl DetectionDispatcher {
    /// The queue slot is taken: the worker is still on an earlier job and
    /// another one is already waiting.
    pub fn is_busy(&self) -> bool {
        self.job_tx.is_full()
    }

    pub fn dispatch(&self, job: DetectionJob) -> Result<(), DispatchRefused> {
        self.job_tx.try_send(job).map_err(|e| match e {
            TrySendError::Full(job) => DispatchRefused::Busy(job),
            TrySendError::Disconnected(job) => DispatchRefused::Stopped(job),
        })
    }
}

/// Runs the single long-lived detector on a dedicated worker thread.
///
/// Layout: `dispatcher → [1-slot queue] → worker(detector) → completions`
///
/// The worker exits once every [`DetectionDispatcher`] is dropped or the
/// completion receiver goes away.
pub struct FaceDetectionAdapter {
    handle: JoinHandle<Box<dyn FaceDetector>>,
    options: DetectorOptions,
}

impl FaceDetectionAdapter {
    pub fn spawn(
        detector: Box<dyn FaceDetector>,
        completion_tx: Sender<DetectionCompletion>,
    ) -> (Self, DetectionDispatcher) {
        let options = detector.options();
        log::info!(
            "Starting face detection worker ({:?}, landmarks {:?}, classification {:?})",
            options.performance_mode,
            options.landmark_mode,
            options.classification_mode
        );

        let (job_tx, job_rx) = crossbeam_channel::bounded::<DetectionJob>(JOB_QUEUE_CAPACITY);
        let handle = spawn_worker(detector, job_rx, completion_tx);

        (Self { handle, options }, DetectionDispatcher { job_tx })
    }

    pub fn options(&self) -> DetectorOptions {
        self.options
    }

    /// Waits for the worker to exit and hands the detector back.
    pub fn join(self) -> Result<Box<dyn FaceDetector>, DetectionError> {
        self.handle.join().map_err(|_| {
            log::error!("Face detection worker panicked");
            DetectionError::WorkerStopped
        })
    }
}

fn spawn_worker(
    mut detector: Box<dyn FaceDetector>,
    job_rx: Receiver<DetectionJob>,
    completion_tx: Sender<DetectionCompletion>,
) -> JoinHandle<Box<dyn FaceDetector>> {
    std::thread::spawn(move || {
        for job in job_rx {
            let started = Instant::now();
            let outcome = detector
                .detect(&job.frame)
                .map(FaceObservation::from_faces);

            let completion = DetectionCompletion {
                ticket: job.ticket,
                frame_index: job.frame.index(),
                timestamp: job.frame.timestamp(),
                brightness: job.brightness,
                elapsed: started.elapsed(),
                outcome,
            };
            drop(job.frame);

            if completion_tx.send(completion).is_err() {
                break;
            }
        }
        detector
    })
}
