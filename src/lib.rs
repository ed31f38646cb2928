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

// Dataset recorder for synchronized multi-stream RGB-D capture
//
// This crate records a live capture feed into a reduced-size on-disk dataset:
// - Admits frames through fixed-interval decimation plus an adaptive
//   pose-delta gate, without ever stalling the capture source
// - Fans accepted frames out to independent persistence sinks (video, depth,
//   confidence, odometry) on one serial background lane, preserving order
// - Merges two independently-clocked inertial channels into complete
//   timestamped records
// - Allocates collision-safe, content-derived session directories
// - Aggregates heterogeneous sink failures into a single session status

pub mod config;
pub mod frame;
pub mod gate;
pub mod inertial;
pub mod recorder;
pub mod session;
pub mod sink;

// Re-export main types
pub use config::{load_config, CaptureSettings, RecorderConfig};
pub use frame::{AcceptedFrame, Frame, SessionStatus, SinkStatus};
pub use gate::{AcceptanceObserver, FrameGate, GateConfig};
pub use inertial::{InertialChannel, InertialSample, InertialSynchronizer, PairedRecord};
pub use recorder::{
    aggregate_status, FrameDisposition, RecorderError, SessionRecorder, SessionReport,
    WorkerReport,
};
pub use session::{DirectoryAllocationError, SessionAllocator, SessionDirectory};
pub use sink::{InertialSink, MapSink, OdometrySink, SinkSet, VideoSink};
