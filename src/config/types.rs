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

// Configuration types for dataset-recorder

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct RecorderConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub capture: CaptureSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where session directories are allocated
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_base_path")]
    pub base_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_path: default_base_path(),
        }
    }
}

/// Frame admission settings, consumed once at session start
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CaptureSettings {
    /// Decimation stride: keep every n-th arriving frame.
    #[serde(default = "default_frame_interval")]
    pub frame_interval: u32,

    #[serde(default)]
    pub adaptive: AdaptiveConfig,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            frame_interval: default_frame_interval(),
            adaptive: AdaptiveConfig::default(),
        }
    }
}

/// Pose-delta gating thresholds
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AdaptiveConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Translation threshold in meters.
    #[serde(default = "default_position_threshold")]
    pub position_threshold_m: f32,

    /// Rotation threshold in degrees; converted to a cosine internally.
    #[serde(default = "default_angle_threshold")]
    pub angle_threshold_degrees: f32,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            position_threshold_m: default_position_threshold(),
            angle_threshold_degrees: default_angle_threshold(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String, // "trace", "debug", "info", "warn", "error"

    #[serde(default = "default_log_format")]
    pub format: String, // "text", "json"
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// Default value functions
fn default_base_path() -> String {
    "/data/recordings".to_string()
}
fn default_frame_interval() -> u32 {
    1
}
fn default_position_threshold() -> f32 {
    0.15
}
fn default_angle_threshold() -> f32 {
    15.0
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "text".to_string()
}
