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

// Frame admission: fixed-interval decimation composed with an adaptive
// pose-delta gate

use nalgebra::{Matrix4, Vector3};
use tracing::debug;

use crate::config::CaptureSettings;

/// Observer notified whenever the adaptive gate accepts a frame.
///
/// Implementations must return quickly and must not block: the callback runs
/// on the capture path, after the gating decision has already been recorded,
/// and its outcome never influences admission.
pub trait AcceptanceObserver: Send + Sync {
    fn frame_accepted(&self, sequence: u64);
}

/// Gate configuration with the angle threshold pre-converted to a cosine so
/// the per-frame comparison stays O(1).
#[derive(Debug, Clone, Copy)]
pub struct GateConfig {
    /// Decimation stride; only every `interval`-th arrival is considered.
    pub interval: u32,
    pub adaptive: bool,
    /// Minimum translation (meters) that forces acceptance in adaptive mode.
    pub position_threshold: f32,
    /// Cosine of the rotation limit; a forward-vector similarity at or below
    /// this value forces acceptance in adaptive mode.
    pub angle_threshold_cos: f32,
}

impl GateConfig {
    pub fn from_settings(settings: &CaptureSettings) -> Self {
        Self {
            interval: settings.frame_interval.max(1),
            adaptive: settings.adaptive.enabled,
            position_threshold: settings.adaptive.position_threshold_m,
            angle_threshold_cos: settings.adaptive.angle_threshold_degrees.to_radians().cos(),
        }
    }
}

/// Decides, per incoming frame, whether it joins the dataset.
///
/// The decimation stage keys off the arrival index; the adaptive stage keys
/// off the pose delta relative to the last frame this gate accepted. Either
/// threshold tripping is sufficient for acceptance.
pub struct FrameGate {
    config: GateConfig,
    last_accepted_pose: Option<Matrix4<f32>>,
}

impl FrameGate {
    pub fn new(config: GateConfig) -> Self {
        Self {
            config,
            last_accepted_pose: None,
        }
    }

    /// Evaluate one frame. Never blocks, never fails.
    pub fn decide(&mut self, arrival_index: u64, pose: &Matrix4<f32>) -> bool {
        if arrival_index % u64::from(self.config.interval) != 0 {
            return false;
        }

        if !self.config.adaptive {
            return true;
        }

        let Some(last) = self.last_accepted_pose else {
            // First considered frame always anchors the adaptive gate.
            self.last_accepted_pose = Some(*pose);
            return true;
        };

        let translation_delta = (origin(pose) - origin(&last)).norm();
        let forward_cos = forward(pose).dot(&forward(&last));

        let accept = translation_delta >= self.config.position_threshold
            || forward_cos <= self.config.angle_threshold_cos;

        if accept {
            self.last_accepted_pose = Some(*pose);
        } else {
            debug!(
                arrival_index,
                translation_delta, forward_cos, "frame below adaptive thresholds, skipping"
            );
        }

        accept
    }

    pub fn is_adaptive(&self) -> bool {
        self.config.adaptive
    }
}

fn origin(pose: &Matrix4<f32>) -> Vector3<f32> {
    pose.fixed_view::<3, 1>(0, 3).into_owned()
}

// Forward is the negated third basis column of the camera-to-world transform.
fn forward(pose: &Matrix4<f32>) -> Vector3<f32> {
    -pose.fixed_view::<3, 1>(0, 2).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::{Rotation3, Translation3};

    fn config(interval: u32, adaptive: bool) -> GateConfig {
        GateConfig {
            interval,
            adaptive,
            position_threshold: 0.15,
            angle_threshold_cos: 15.0_f32.to_radians().cos(),
        }
    }

    fn pose_at(x: f32, y: f32, z: f32) -> Matrix4<f32> {
        Translation3::new(x, y, z).to_homogeneous()
    }

    fn pose_rotated_y(degrees: f32) -> Matrix4<f32> {
        Rotation3::from_axis_angle(&Vector3::y_axis(), degrees.to_radians()).to_homogeneous()
    }

    #[test]
    fn interval_one_accepts_everything() {
        let mut gate = FrameGate::new(config(1, false));
        for i in 0..10 {
            assert!(gate.decide(i, &Matrix4::identity()));
        }
    }

    #[test]
    fn interval_strides_on_arrival_index() {
        let mut gate = FrameGate::new(config(3, false));
        let accepted: Vec<u64> = (0..10)
            .filter(|&i| gate.decide(i, &Matrix4::identity()))
            .collect();
        assert_eq!(accepted, vec![0, 3, 6, 9]);
    }

    #[test]
    fn adaptive_accepts_first_frame_unconditionally() {
        let mut gate = FrameGate::new(config(1, true));
        assert!(gate.decide(0, &Matrix4::identity()));
    }

    #[test]
    fn adaptive_rejects_small_motion() {
        let mut gate = FrameGate::new(config(1, true));
        assert!(gate.decide(0, &pose_at(0.0, 0.0, 0.0)));
        // 5 cm forward, no rotation: below both thresholds.
        assert!(!gate.decide(1, &pose_at(0.0, 0.0, 0.05)));
    }

    #[test]
    fn adaptive_accepts_translation_past_threshold() {
        let mut gate = FrameGate::new(config(1, true));
        assert!(gate.decide(0, &pose_at(0.0, 0.0, 0.0)));
        assert!(gate.decide(1, &pose_at(0.2, 0.0, 0.0)));
    }

    #[test]
    fn adaptive_accepts_rotation_past_threshold() {
        let mut gate = FrameGate::new(config(1, true));
        assert!(gate.decide(0, &Matrix4::identity()));
        assert!(gate.decide(1, &pose_rotated_y(20.0)));
    }

    #[test]
    fn adaptive_delta_is_relative_to_last_accepted() {
        let mut gate = FrameGate::new(config(1, true));
        assert!(gate.decide(0, &pose_at(0.0, 0.0, 0.0)));
        // Creeping forward 10 cm at a time: each step is below the threshold
        // relative to the anchor until the accumulated delta crosses it.
        assert!(!gate.decide(1, &pose_at(0.0, 0.0, 0.10)));
        assert!(gate.decide(2, &pose_at(0.0, 0.0, 0.20)));
        // Anchor moved to z=0.20; the next small step is rejected again.
        assert!(!gate.decide(3, &pose_at(0.0, 0.0, 0.25)));
    }

    #[test]
    fn decimation_applies_before_adaptive_check() {
        let mut gate = FrameGate::new(config(2, true));
        assert!(gate.decide(0, &pose_at(0.0, 0.0, 0.0)));
        // Large motion on an off-stride arrival is still rejected.
        assert!(!gate.decide(1, &pose_at(5.0, 0.0, 0.0)));
        assert!(gate.decide(2, &pose_at(5.0, 0.0, 0.0)));
    }
}
