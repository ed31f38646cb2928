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

// Core data model shared between the gate, the recorder and the sinks

use bytes::Bytes;
use nalgebra::{Matrix3, Matrix4};

/// One captured frame as delivered by the device.
///
/// Depth and confidence maps are optional: not every device (or every frame)
/// carries them. The pose is a camera-to-world transform, the intrinsics the
/// usual 3x3 pinhole matrix. Timestamps are device seconds.
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: Bytes,
    pub depth: Option<Bytes>,
    pub confidence: Option<Bytes>,
    pub pose: Matrix4<f32>,
    pub intrinsics: Matrix3<f32>,
    pub timestamp: f64,
}

/// A frame that passed the gate, carrying both numbering schemes.
///
/// `arrival_index` counts every frame the recorder ever received (the
/// absolute timeline the video stream needs); `sequence` counts only accepted
/// frames and is contiguous (the key depth/confidence/odometry files are
/// named by).
#[derive(Debug, Clone)]
pub struct AcceptedFrame {
    pub frame: Frame,
    pub arrival_index: u64,
    pub sequence: u64,
}

/// Terminal status of a single sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkStatus {
    Ok,
    Error,
}

/// Aggregate terminal status of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Every sink finished cleanly.
    Ok,
    /// The session directory could not be allocated; capture never started.
    DirectoryError,
    /// At least one sink failed; the other streams' data remains usable.
    EncodingError,
}
