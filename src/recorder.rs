// Copyright 2025 coScene
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

// Session orchestration: frame admission, asynchronous persistence fan-out,
// inertial pairing and final status aggregation

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::{CaptureSettings, RecorderConfig};
use crate::frame::{AcceptedFrame, Frame, SessionStatus, SinkStatus};
use crate::gate::{AcceptanceObserver, FrameGate, GateConfig};
use crate::inertial::{InertialSample, InertialSynchronizer};
use crate::session::{DirectoryAllocationError, SessionAllocator, SessionDirectory};
use crate::sink::SinkSet;

/// File receiving the transposed 3x3 intrinsics of the last processed frame.
const CAMERA_MATRIX_FILE: &str = "camera_matrix.csv";

#[derive(Debug, Error)]
pub enum RecorderError {
    /// The persistence worker is no longer accepting tasks; the session
    /// cannot make progress.
    #[error("persistence worker stopped unexpectedly")]
    WorkerStopped,
    #[error("persistence worker panicked")]
    WorkerPanicked,
}

/// Outcome of `add_frame` for one delivered frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameDisposition {
    /// The frame passed the gate and was scheduled for persistence under the
    /// given sequence number.
    Accepted(u64),
    /// The frame was decimated or below the adaptive thresholds; no
    /// observable effect.
    Skipped,
}

/// Terminal statuses collected from every sink once the task queue drained.
#[derive(Debug, Clone, Copy)]
pub struct WorkerReport {
    pub video: SinkStatus,
    pub depth: SinkStatus,
    pub confidence: SinkStatus,
    pub odometry: SinkStatus,
    pub inertial: SinkStatus,
    pub intrinsics: SinkStatus,
}

/// What the caller gets back from `finalize`: exactly one terminal status per
/// session, plus stream counters.
#[derive(Debug)]
pub struct SessionReport {
    pub status: SessionStatus,
    pub directory: SessionDirectory,
    pub frames_received: u64,
    pub frames_accepted: u64,
    pub inertial_records: u64,
}

enum PersistTask {
    Frame(AcceptedFrame),
    Inertial(crate::inertial::PairedRecord),
}

/// Records one capture session into an allocated dataset directory.
///
/// Lifecycle is encoded in the type: a value only exists once the session
/// directory is allocated (allocation failure means capture never starts),
/// every accessor is a capturing-state operation, and `finalize` consumes the
/// recorder, so no call can follow it.
///
/// The capture path never blocks: accepted work is handed to a single
/// persistence worker over an unbounded channel, which preserves acceptance
/// order across all sinks. Callers must serialize access themselves; the
/// recorder takes `&mut self` and is not meant to be shared between tasks.
pub struct SessionRecorder {
    gate: FrameGate,
    synchronizer: InertialSynchronizer,
    arrival_index: u64,
    sequence: u64,
    inertial_records: u64,
    outstanding: Arc<AtomicU64>,
    tx: mpsc::UnboundedSender<PersistTask>,
    worker: JoinHandle<WorkerReport>,
    session: SessionDirectory,
    observer: Option<Arc<dyn AcceptanceObserver>>,
}

impl SessionRecorder {
    /// Allocate a session directory under the configured base path and start
    /// recording with the default filesystem sinks.
    pub async fn start(config: &RecorderConfig) -> Result<Self, DirectoryAllocationError> {
        let allocator = SessionAllocator::new(&config.storage.base_path);
        let session = allocator.allocate().await?;

        let sinks = SinkSet::filesystem(&session.path)
            .await
            .map_err(|e| DirectoryAllocationError::CreateFailed(std::io::Error::other(e)))?;

        info!(
            session = %session.name,
            path = %session.path.display(),
            "capture session started"
        );
        Ok(Self::with_sinks(&config.capture, session, sinks, None))
    }

    /// Start recording into an already-allocated directory with caller-
    /// provided sinks and an optional acceptance observer. Must be called
    /// from within a tokio runtime.
    pub fn with_sinks(
        settings: &CaptureSettings,
        session: SessionDirectory,
        sinks: SinkSet,
        observer: Option<Arc<dyn AcceptanceObserver>>,
    ) -> Self {
        let outstanding = Arc::new(AtomicU64::new(0));
        let (tx, rx) = mpsc::unbounded_channel();

        let worker = PersistenceWorker {
            sinks,
            session_path: session.path.clone(),
            outstanding: outstanding.clone(),
            last_frame: None,
        };
        let worker = tokio::spawn(worker.run(rx));

        Self {
            gate: FrameGate::new(GateConfig::from_settings(settings)),
            synchronizer: InertialSynchronizer::new(),
            arrival_index: 0,
            sequence: 0,
            inertial_records: 0,
            outstanding,
            tx,
            worker,
            session,
            observer,
        }
    }

    pub fn session(&self) -> &SessionDirectory {
        &self.session
    }

    /// Persistence tasks scheduled but not yet completed.
    pub fn outstanding_tasks(&self) -> u64 {
        self.outstanding.load(Ordering::Acquire)
    }

    /// Deliver one frame. O(1) and non-blocking regardless of the decision;
    /// a rejected frame only consumes an arrival index.
    pub fn add_frame(&mut self, frame: Frame) -> Result<FrameDisposition, RecorderError> {
        let arrival_index = self.arrival_index;
        self.arrival_index += 1;

        if !self.gate.decide(arrival_index, &frame.pose) {
            return Ok(FrameDisposition::Skipped);
        }

        let sequence = self.sequence;
        self.sequence += 1;

        self.schedule(PersistTask::Frame(AcceptedFrame {
            frame,
            arrival_index,
            sequence,
        }))?;

        if self.gate.is_adaptive() {
            if let Some(observer) = &self.observer {
                observer.frame_accepted(sequence);
            }
        }

        Ok(FrameDisposition::Accepted(sequence))
    }

    /// Deliver one inertial sample. A completed pair is scheduled on the same
    /// serial lane as frame persistence, so records land in completion order.
    pub fn add_inertial_sample(&mut self, sample: InertialSample) -> Result<(), RecorderError> {
        if let Some(record) = self.synchronizer.push(sample) {
            self.inertial_records += 1;
            self.schedule(PersistTask::Inertial(record))?;
        }
        Ok(())
    }

    fn schedule(&self, task: PersistTask) -> Result<(), RecorderError> {
        self.outstanding.fetch_add(1, Ordering::AcqRel);
        self.tx.send(task).map_err(|_| {
            self.outstanding.fetch_sub(1, Ordering::AcqRel);
            RecorderError::WorkerStopped
        })
    }

    /// Drain all outstanding persistence work, finalize every sink and
    /// aggregate one terminal status. The only blocking call in the API;
    /// consuming `self` makes a second call or a late `add_frame` impossible.
    pub async fn finalize(self) -> Result<SessionReport, RecorderError> {
        let SessionRecorder {
            tx,
            worker,
            outstanding,
            session,
            arrival_index,
            sequence,
            inertial_records,
            ..
        } = self;

        // Closing the channel is the barrier: every task scheduled before
        // this point is observed by the worker before it shuts down.
        drop(tx);
        let report = worker.await.map_err(|_| RecorderError::WorkerPanicked)?;
        debug_assert_eq!(outstanding.load(Ordering::Acquire), 0);

        let status = aggregate_status(None, &report);
        info!(
            session = %session.name,
            ?status,
            frames_received = arrival_index,
            frames_accepted = sequence,
            inertial_records,
            "capture session closed"
        );

        Ok(SessionReport {
            status,
            directory: session,
            frames_received: arrival_index,
            frames_accepted: sequence,
            inertial_records,
        })
    }
}

/// First-error-wins aggregation of sub-system outcomes.
///
/// A directory allocation failure always takes precedence (capture never
/// started, no sink status can overwrite it); otherwise any sink failure
/// collapses to `EncodingError`.
pub fn aggregate_status(
    directory_error: Option<&DirectoryAllocationError>,
    report: &WorkerReport,
) -> SessionStatus {
    if directory_error.is_some() {
        return SessionStatus::DirectoryError;
    }

    let sinks = [
        report.video,
        report.depth,
        report.confidence,
        report.odometry,
        report.inertial,
        report.intrinsics,
    ];
    if sinks.contains(&SinkStatus::Error) {
        SessionStatus::EncodingError
    } else {
        SessionStatus::Ok
    }
}

/// The single serial persistence lane. Owns the sinks; tasks are processed
/// in the exact order they were scheduled.
struct PersistenceWorker {
    sinks: SinkSet,
    session_path: PathBuf,
    outstanding: Arc<AtomicU64>,
    last_frame: Option<Frame>,
}

impl PersistenceWorker {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<PersistTask>) -> WorkerReport {
        while let Some(task) = rx.recv().await {
            match task {
                PersistTask::Frame(accepted) => self.persist_frame(accepted).await,
                PersistTask::Inertial(record) => self.sinks.inertial.accept(&record).await,
            }
            self.outstanding.fetch_sub(1, Ordering::AcqRel);
        }
        self.finish().await
    }

    async fn persist_frame(&mut self, accepted: AcceptedFrame) {
        let AcceptedFrame {
            frame,
            arrival_index,
            sequence,
        } = accepted;

        // Absent auxiliary maps are logged and skipped, never fatal.
        match &frame.depth {
            Some(map) => self.sinks.depth.accept(map.clone(), sequence).await,
            None => warn!(sequence, "depth map missing for accepted frame"),
        }
        match &frame.confidence {
            Some(map) => self.sinks.confidence.accept(map.clone(), sequence).await,
            None => warn!(sequence, "confidence map missing for accepted frame"),
        }

        self.sinks
            .video
            .accept(frame.image.clone(), frame.timestamp, arrival_index)
            .await;
        self.sinks
            .odometry
            .accept(&frame.pose, frame.timestamp, sequence)
            .await;

        self.last_frame = Some(frame);
    }

    async fn finish(mut self) -> WorkerReport {
        let video = self.sinks.video.finalize().await;
        let inertial = self.sinks.inertial.finalize().await;
        let odometry = self.sinks.odometry.finalize().await;
        self.sinks.depth.finalize().await;
        self.sinks.confidence.finalize().await;

        WorkerReport {
            video,
            inertial,
            odometry,
            depth: self.sinks.depth.status(),
            confidence: self.sinks.confidence.status(),
            intrinsics: self.write_intrinsics().await,
        }
    }

    /// Write the last processed frame's 3x3 intrinsics, transposed, as three
    /// comma-separated rows. Skipped (not an error) when no frame was ever
    /// processed.
    async fn write_intrinsics(&self) -> SinkStatus {
        let Some(frame) = &self.last_frame else {
            debug!("no frame processed, skipping camera matrix");
            return SinkStatus::Ok;
        };

        let matrix = frame.intrinsics.transpose();
        let rows: Vec<String> = (0..3)
            .map(|r| format!("{}, {}, {}", matrix[(r, 0)], matrix[(r, 1)], matrix[(r, 2)]))
            .collect();

        let path = self.session_path.join(CAMERA_MATRIX_FILE);
        match tokio::fs::write(&path, rows.join("\n")).await {
            Ok(()) => SinkStatus::Ok,
            Err(e) => {
                warn!("failed to write camera matrix to {}: {}", path.display(), e);
                SinkStatus::Error
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clean_report() -> WorkerReport {
        WorkerReport {
            video: SinkStatus::Ok,
            depth: SinkStatus::Ok,
            confidence: SinkStatus::Ok,
            odometry: SinkStatus::Ok,
            inertial: SinkStatus::Ok,
            intrinsics: SinkStatus::Ok,
        }
    }

    #[test]
    fn all_clean_aggregates_ok() {
        assert_eq!(aggregate_status(None, &clean_report()), SessionStatus::Ok);
    }

    #[test]
    fn any_sink_error_collapses_to_encoding_error() {
        let mut report = clean_report();
        report.confidence = SinkStatus::Error;
        assert_eq!(
            aggregate_status(None, &report),
            SessionStatus::EncodingError
        );

        let mut report = clean_report();
        report.video = SinkStatus::Error;
        assert_eq!(
            aggregate_status(None, &report),
            SessionStatus::EncodingError
        );
    }

    #[test]
    fn directory_error_wins_over_sink_errors() {
        let mut report = clean_report();
        report.video = SinkStatus::Error;
        report.odometry = SinkStatus::Error;

        let dir_error = DirectoryAllocationError::Exhausted(16);
        assert_eq!(
            aggregate_status(Some(&dir_error), &report),
            SessionStatus::DirectoryError
        );
    }

    #[test]
    fn intrinsics_failure_is_encoding_error() {
        let mut report = clean_report();
        report.intrinsics = SinkStatus::Error;
        assert_eq!(
            aggregate_status(None, &report),
            SessionStatus::EncodingError
        );
    }
}
