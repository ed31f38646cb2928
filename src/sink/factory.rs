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

// Construction of the per-session sink set

use anyhow::Result;
use std::path::Path;
use tracing::info;

use super::filesystem::{CsvInertialSink, CsvOdometrySink, MapDirectorySink, RawVideoSink};
use super::{InertialSink, MapSink, OdometrySink, VideoSink};

/// The five persistence targets of one session, owned as trait objects so
/// tests can substitute doubles for any stream.
pub struct SinkSet {
    pub video: Box<dyn VideoSink>,
    pub depth: Box<dyn MapSink>,
    pub confidence: Box<dyn MapSink>,
    pub odometry: Box<dyn OdometrySink>,
    pub inertial: Box<dyn InertialSink>,
}

impl SinkSet {
    /// Build the default filesystem sinks inside an allocated session
    /// directory, producing the standard dataset layout:
    /// `rgb.video`, `depth/`, `confidence/`, `odometry.csv`, `imu.csv`.
    pub async fn filesystem(session_dir: &Path) -> Result<Self> {
        info!("creating dataset sinks in {}", session_dir.display());

        Ok(Self {
            video: Box::new(RawVideoSink::create(session_dir.join("rgb.video")).await?),
            depth: Box::new(MapDirectorySink::create(session_dir.join("depth"), "depth").await?),
            confidence: Box::new(
                MapDirectorySink::create(session_dir.join("confidence"), "confidence").await?,
            ),
            odometry: Box::new(CsvOdometrySink::create(session_dir.join("odometry.csv")).await?),
            inertial: Box::new(CsvInertialSink::create(session_dir.join("imu.csv")).await?),
        })
    }
}
