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

// Pairing of the two independently-clocked inertial channels

use nalgebra::Vector3;

/// Which inertial channel a sample came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InertialChannel {
    /// Linear acceleration.
    Linear,
    /// Angular rate.
    Angular,
}

/// One raw sample from either inertial channel.
#[derive(Debug, Clone, Copy)]
pub struct InertialSample {
    pub channel: InertialChannel,
    pub vector: Vector3<f64>,
    pub timestamp: f64,
}

impl InertialSample {
    pub fn linear(timestamp: f64, vector: Vector3<f64>) -> Self {
        Self {
            channel: InertialChannel::Linear,
            vector,
            timestamp,
        }
    }

    pub fn angular(timestamp: f64, vector: Vector3<f64>) -> Self {
        Self {
            channel: InertialChannel::Angular,
            vector,
            timestamp,
        }
    }
}

/// A merged inertial record: one sample from each channel, stamped with the
/// later of the two timestamps.
#[derive(Debug, Clone, Copy)]
pub struct PairedRecord {
    pub timestamp: f64,
    pub linear: Vector3<f64>,
    pub angular: Vector3<f64>,
}

/// Merges the two channels under a latest-wins policy.
///
/// At most one sample per channel is ever buffered. A sample is either paired
/// on arrival of its complement or silently superseded by a newer sample on
/// the same channel; a record is never emitted with a missing channel and
/// never reuses a consumed sample.
#[derive(Debug, Default)]
pub struct InertialSynchronizer {
    linear: Option<(f64, Vector3<f64>)>,
    angular: Option<(f64, Vector3<f64>)>,
}

impl InertialSynchronizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store one sample; returns a merged record when both slots are filled.
    /// Both slots are cleared on emission.
    pub fn push(&mut self, sample: InertialSample) -> Option<PairedRecord> {
        let slot = (sample.timestamp, sample.vector);
        match sample.channel {
            InertialChannel::Linear => self.linear = Some(slot),
            InertialChannel::Angular => self.angular = Some(slot),
        }

        let ((lin_ts, linear), (ang_ts, angular)) = self.linear.zip(self.angular)?;
        self.linear = None;
        self.angular = None;

        Some(PairedRecord {
            timestamp: lin_ts.max(ang_ts),
            linear,
            angular,
        })
    }
}
