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

// Sink contracts for write-only stream persistence

mod factory;
mod filesystem;

pub use factory::SinkSet;
pub use filesystem::{CsvInertialSink, CsvOdometrySink, MapDirectorySink, RawVideoSink};

use async_trait::async_trait;
use bytes::Bytes;
use nalgebra::Matrix4;

use crate::frame::SinkStatus;
use crate::inertial::PairedRecord;

/// Persists the color image stream.
///
/// Sinks are write-only and never fail the capture path: a per-record IO
/// failure is logged by the implementation and latched into the cumulative
/// status returned by `finalize`. Implementations are owned and driven by the
/// single persistence worker, so `&mut self` methods need no further
/// synchronization.
#[async_trait]
pub trait VideoSink: Send + Sync {
    /// Accept one image buffer. The arrival index (not the sequence number)
    /// identifies the frame: the video stream keeps the absolute timeline.
    async fn accept(&mut self, image: Bytes, timestamp: f64, arrival_index: u64);

    async fn finalize(&mut self) -> SinkStatus;
}

/// Persists one encoded map (depth or confidence) per accepted frame.
#[async_trait]
pub trait MapSink: Send + Sync {
    async fn accept(&mut self, map: Bytes, sequence: u64);

    async fn finalize(&mut self);

    /// Cumulative status, meaningful after `finalize`.
    fn status(&self) -> SinkStatus;
}

/// Persists one pose record per accepted frame, keyed by sequence number.
#[async_trait]
pub trait OdometrySink: Send + Sync {
    async fn accept(&mut self, pose: &Matrix4<f32>, timestamp: f64, sequence: u64);

    async fn finalize(&mut self) -> SinkStatus;
}

/// Persists merged inertial records.
#[async_trait]
pub trait InertialSink: Send + Sync {
    async fn accept(&mut self, record: &PairedRecord);

    async fn finalize(&mut self) -> SinkStatus;
}
