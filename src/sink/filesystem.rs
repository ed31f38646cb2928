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

// Filesystem sink implementations producing the on-disk session layout

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use nalgebra::{Matrix4, Rotation3, UnitQuaternion};
use std::path::PathBuf;
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, warn};

use super::{InertialSink, MapSink, OdometrySink, VideoSink};
use crate::frame::SinkStatus;
use crate::inertial::PairedRecord;

/// Raw video container: length-prefixed image records in arrival order.
///
/// Codec work is an external concern; this container just preserves the
/// absolute timeline. Record framing, all little-endian:
/// `arrival_index: u64, timestamp: f64, len: u32, payload`.
pub struct RawVideoSink {
    writer: BufWriter<File>,
    path: PathBuf,
    status: SinkStatus,
}

impl RawVideoSink {
    pub async fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = File::create(&path)
            .await
            .with_context(|| format!("failed to create video file: {}", path.display()))?;
        Ok(Self {
            writer: BufWriter::new(file),
            path,
            status: SinkStatus::Ok,
        })
    }

    async fn write_record(&mut self, image: &Bytes, timestamp: f64, arrival_index: u64) -> Result<()> {
        self.writer.write_all(&arrival_index.to_le_bytes()).await?;
        self.writer.write_all(&timestamp.to_le_bytes()).await?;
        self.writer
            .write_all(&(image.len() as u32).to_le_bytes())
            .await?;
        self.writer.write_all(image).await?;
        Ok(())
    }
}

#[async_trait]
impl VideoSink for RawVideoSink {
    async fn accept(&mut self, image: Bytes, timestamp: f64, arrival_index: u64) {
        if let Err(e) = self.write_record(&image, timestamp, arrival_index).await {
            warn!(
                arrival_index,
                "failed to write video record to {}: {}",
                self.path.display(),
                e
            );
            self.status = SinkStatus::Error;
        }
    }

    async fn finalize(&mut self) -> SinkStatus {
        if let Err(e) = self.writer.flush().await {
            warn!("failed to flush video file {}: {}", self.path.display(), e);
            self.status = SinkStatus::Error;
        }
        debug!("finalized video file: {}", self.path.display());
        self.status
    }
}

/// One encoded map per accepted sequence number, as individual files in a
/// per-stream subdirectory (`depth/` or `confidence/`).
pub struct MapDirectorySink {
    directory: PathBuf,
    stream: &'static str,
    status: SinkStatus,
}

impl MapDirectorySink {
    pub async fn create(directory: impl Into<PathBuf>, stream: &'static str) -> Result<Self> {
        let directory = directory.into();
        fs::create_dir_all(&directory)
            .await
            .with_context(|| format!("failed to create {} directory: {}", stream, directory.display()))?;
        Ok(Self {
            directory,
            stream,
            status: SinkStatus::Ok,
        })
    }

    fn map_path(&self, sequence: u64) -> PathBuf {
        self.directory.join(format!("{:06}.bin", sequence))
    }
}

#[async_trait]
impl MapSink for MapDirectorySink {
    async fn accept(&mut self, map: Bytes, sequence: u64) {
        let path = self.map_path(sequence);
        if let Err(e) = fs::write(&path, &map).await {
            warn!(
                sequence,
                stream = self.stream,
                "failed to write map to {}: {}",
                path.display(),
                e
            );
            self.status = SinkStatus::Error;
        }
    }

    async fn finalize(&mut self) {
        debug!(stream = self.stream, "finalized map directory: {}", self.directory.display());
    }

    fn status(&self) -> SinkStatus {
        self.status
    }
}

/// `odometry.csv`: one `timestamp, frame, x, y, z, qx, qy, qz, qw` row per
/// accepted frame.
pub struct CsvOdometrySink {
    writer: BufWriter<File>,
    path: PathBuf,
    status: SinkStatus,
}

impl CsvOdometrySink {
    pub async fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = File::create(&path)
            .await
            .with_context(|| format!("failed to create odometry file: {}", path.display()))?;
        Ok(Self {
            writer: BufWriter::new(file),
            path,
            status: SinkStatus::Ok,
        })
    }
}

#[async_trait]
impl OdometrySink for CsvOdometrySink {
    async fn accept(&mut self, pose: &Matrix4<f32>, timestamp: f64, sequence: u64) {
        let translation = pose.fixed_view::<3, 1>(0, 3).into_owned();
        let rotation = Rotation3::from_matrix_unchecked(pose.fixed_view::<3, 3>(0, 0).into_owned());
        let q = UnitQuaternion::from_rotation_matrix(&rotation);

        let row = format!(
            "{}, {}, {}, {}, {}, {}, {}, {}, {}\n",
            timestamp,
            sequence,
            translation.x,
            translation.y,
            translation.z,
            q.i,
            q.j,
            q.k,
            q.w
        );

        if let Err(e) = self.writer.write_all(row.as_bytes()).await {
            warn!(sequence, "failed to write odometry row to {}: {}", self.path.display(), e);
            self.status = SinkStatus::Error;
        }
    }

    async fn finalize(&mut self) -> SinkStatus {
        if let Err(e) = self.writer.flush().await {
            warn!("failed to flush odometry file {}: {}", self.path.display(), e);
            self.status = SinkStatus::Error;
        }
        self.status
    }
}

/// `imu.csv`: one `timestamp, ax, ay, az, rx, ry, rz` row per merged pair.
pub struct CsvInertialSink {
    writer: BufWriter<File>,
    path: PathBuf,
    status: SinkStatus,
}

impl CsvInertialSink {
    pub async fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = File::create(&path)
            .await
            .with_context(|| format!("failed to create inertial file: {}", path.display()))?;
        Ok(Self {
            writer: BufWriter::new(file),
            path,
            status: SinkStatus::Ok,
        })
    }
}

#[async_trait]
impl InertialSink for CsvInertialSink {
    async fn accept(&mut self, record: &PairedRecord) {
        let row = format!(
            "{}, {}, {}, {}, {}, {}, {}\n",
            record.timestamp,
            record.linear.x,
            record.linear.y,
            record.linear.z,
            record.angular.x,
            record.angular.y,
            record.angular.z
        );

        if let Err(e) = self.writer.write_all(row.as_bytes()).await {
            warn!("failed to write inertial row to {}: {}", self.path.display(), e);
            self.status = SinkStatus::Error;
        }
    }

    async fn finalize(&mut self) -> SinkStatus {
        if let Err(e) = self.writer.flush().await {
            warn!("failed to flush inertial file {}: {}", self.path.display(), e);
            self.status = SinkStatus::Error;
        }
        self.status
    }
}
