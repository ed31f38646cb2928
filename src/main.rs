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

use anyhow::Result;
use bytes::Bytes;
use clap::Parser;
use nalgebra::{Matrix3, Rotation3, Translation3, Vector3};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use dataset_recorder::config::load_config;
use dataset_recorder::{Frame, InertialSample, SessionRecorder, SessionStatus};

/// Dataset Recorder - capture synchronized RGB-D streams to a dataset directory
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/default.yaml")]
    config: PathBuf,

    /// Recording base path (overrides config file)
    #[arg(short, long)]
    base_path: Option<String>,

    /// Number of synthetic frames to feed
    #[arg(short, long, default_value_t = 60)]
    frames: u64,

    /// Decimation interval (overrides config file)
    #[arg(short, long)]
    interval: Option<u32>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse CLI arguments
    let args = Args::parse();

    // Load configuration from file
    let mut config = load_config(&args.config)?;

    // Apply CLI overrides
    if let Some(base_path) = args.base_path {
        config.storage.base_path = base_path;
    }
    if let Some(interval) = args.interval {
        config.capture.frame_interval = interval.max(1);
    }

    // Initialize tracing with configured level
    let log_level = match config.logging.level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting Dataset Recorder");
    info!("Loaded configuration from: {:?}", args.config);
    info!("Recording base path: {}", config.storage.base_path);
    info!(
        "Frame interval: {}, adaptive: {}",
        config.capture.frame_interval, config.capture.adaptive.enabled
    );

    let mut recorder = match SessionRecorder::start(&config).await {
        Ok(recorder) => recorder,
        Err(e) => {
            error!("Could not allocate a session directory: {}", e);
            // The caller-facing mapping of allocation failure.
            info!("Session status: {:?}", SessionStatus::DirectoryError);
            return Ok(ExitCode::FAILURE);
        }
    };

    // Feed a synthetic capture: the camera advances along +z with a slow yaw,
    // with both inertial channels interleaved at a higher rate.
    for i in 0..args.frames {
        let t = i as f64 / 30.0;
        recorder.add_frame(synthetic_frame(i, t))?;

        recorder.add_inertial_sample(InertialSample::linear(
            t,
            Vector3::new(0.0, -9.81, 0.02 * t),
        ))?;
        recorder.add_inertial_sample(InertialSample::angular(
            t + 0.001,
            Vector3::new(0.0, 0.01, 0.0),
        ))?;
    }

    let report = recorder.finalize().await?;
    info!(
        "Recorded {} of {} frames, {} inertial records into {}",
        report.frames_accepted,
        report.frames_received,
        report.inertial_records,
        report.directory.path.display()
    );
    info!("Session status: {:?}", report.status);

    Ok(if report.status == SessionStatus::Ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn synthetic_frame(index: u64, timestamp: f64) -> Frame {
    let yaw = Rotation3::from_axis_angle(&Vector3::y_axis(), 0.01 * index as f32);
    let pose = Translation3::new(0.0, 0.0, 0.02 * index as f32).to_homogeneous()
        * yaw.to_homogeneous();

    let image = vec![(index % 256) as u8; 640 * 480 * 2];
    let depth = vec![0u8; 256 * 192 * 2];
    let confidence = vec![2u8; 256 * 192];

    Frame {
        image: Bytes::from(image),
        depth: Some(Bytes::from(depth)),
        confidence: Some(Bytes::from(confidence)),
        pose,
        intrinsics: Matrix3::new(600.0, 0.0, 320.0, 0.0, 600.0, 240.0, 0.0, 0.0, 1.0),
        timestamp,
    }
}
