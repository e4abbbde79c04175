//! Spinning lidar demo
//!
//! A producer thread simulates a sensor turning inside a square room and
//! streams range frames into a structured cloud while the main thread runs
//! the frame loop on the software renderer. The last frame is written as a
//! PNG.
//!
//! ```text
//! RUST_LOG=info cargo run --bin spinning_lidar -- --frames 120 --rings
//! ```

use std::f64::consts::TAU;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use lidarviz::prelude::*;
use log::{info, warn};
use ndarray::Array2;
use rand::Rng;

const ROOM_HALF_SIZE_M: f64 = 12.0;
const SENSOR_HEIGHT_M: f64 = 1.8;
const MAX_RANGE_MM: u32 = 60_000;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PaletteChoice {
    Spezia,
    Calref,
}

#[derive(Parser, Debug)]
#[command(name = "spinning_lidar")]
#[command(about = "Stream simulated lidar frames into a structured cloud")]
struct Cli {
    /// Sensor metadata JSON; a synthetic sensor is used when omitted
    #[arg(long)]
    metadata: Option<PathBuf>,

    /// Columns per frame of the synthetic sensor
    #[arg(long, default_value_t = 1024)]
    columns: usize,

    /// Beams of the synthetic sensor
    #[arg(long, default_value_t = 64)]
    rows: usize,

    /// Number of frames to publish before stopping
    #[arg(long, default_value_t = 60)]
    frames: usize,

    /// Stop with an interrupt after this many seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    #[arg(long, value_enum, default_value_t = PaletteChoice::Spezia)]
    palette: PaletteChoice,

    /// Show distance rings around the camera target
    #[arg(long)]
    rings: bool,

    #[arg(long, default_value_t = 800)]
    width: u32,

    #[arg(long, default_value_t = 600)]
    height: u32,

    /// Where to write the last rendered frame
    #[arg(long, default_value = "spinning_lidar.png")]
    output: PathBuf,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let sensor = match &cli.metadata {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            SensorInfo::from_json(&text)?
        }
        None => SensorInfo::synthetic(cli.columns, cli.rows, 45.0),
    };
    info!(
        "sensor {} x {} ({} points)",
        sensor.format.columns_per_frame,
        sensor.format.pixels_per_column,
        sensor.pixel_count()
    );

    let config = VizConfig {
        name: "spinning lidar".to_string(),
        window_width: cli.width,
        window_height: cli.height,
        ..VizConfig::default()
    };
    let renderer = SoftwareRenderer::new(cli.width, cli.height, SoftwareRendererConfig::default());
    let mut viz = PointViz::new(config, renderer);
    add_default_controls(&viz.handle());

    {
        let mut camera = viz.camera();
        camera.pitch(-60.0);
        camera.dolly(-80.0);
    }
    viz.target_display().enable_rings(cli.rings);

    let cloud = Arc::new(Cloud::from_sensor(&sensor)?);
    cloud.set_palette_table(match cli.palette {
        PaletteChoice::Spezia => SPEZIA.clone(),
        PaletteChoice::Calref => CALREF.clone(),
    });
    let sensor_box = Arc::new(Cuboid::new(Pose::scaling(0.3, 0.3, 0.3), &[1.0, 0.8, 0.0])?);
    let status = Arc::new(Label::new_2d("", 0.02, 0.02, false, true));
    viz.add(&cloud);
    viz.add(&sensor_box);
    viz.add(&status);

    if let Some(secs) = cli.timeout_secs {
        let interrupt = viz.interrupt_handle();
        thread::spawn(move || {
            thread::sleep(Duration::from_secs(secs));
            interrupt.trigger();
        });
    }

    let producer = {
        let handle = viz.handle();
        let cloud = Arc::clone(&cloud);
        let status = Arc::clone(&status);
        let frames = cli.frames;
        thread::spawn(move || -> Result<()> {
            while !handle.running() {
                thread::yield_now();
            }
            let mut rng = rand::thread_rng();
            for frame in 0..frames {
                if !handle.running() {
                    break;
                }
                let (range, key) = simulate_frame(&sensor, frame, &mut rng);
                cloud.set_range(range.view())?;
                cloud.set_key(key.view())?;
                cloud.set_pose(Pose::translation(0.0, 0.0, SENSOR_HEIGHT_M));
                status.set_text(format!("frame {}", frame));
                while !handle.update() && handle.running() {
                    thread::sleep(Duration::from_millis(1));
                }
            }
            handle.set_running(false);
            Ok(())
        })
    };

    match viz.run() {
        Ok(()) => info!("rendering finished after {} frames", viz.frame_count()),
        Err(e) if e.is_interrupted() => warn!("rendering interrupted after {} frames", viz.frame_count()),
        Err(e) => return Err(e.into()),
    }

    producer
        .join()
        .map_err(|_| anyhow::anyhow!("producer thread panicked"))??;

    viz.backend().save_png(&cli.output)?;
    println!("Wrote {}", cli.output.display());
    Ok(())
}

/// Ranges and normalized keys for a sensor rotated by `frame` steps inside a
/// square room with a flat floor
fn simulate_frame(sensor: &SensorInfo, frame: usize, rng: &mut impl Rng) -> (Array2<u32>, Array2<f32>) {
    let w = sensor.format.columns_per_frame;
    let h = sensor.format.pixels_per_column;
    let phase = frame as f64 * 0.02;

    let range = Array2::from_shape_fn((h, w), |(row, col)| {
        let azimuth = TAU * (1.0 - col as f64 / w as f64) + phase;
        let altitude = sensor.beam_altitude_angles[row].to_radians();

        let horizontal = ROOM_HALF_SIZE_M / azimuth.cos().abs().max(azimuth.sin().abs());
        let mut distance = horizontal / altitude.cos();
        if altitude < 0.0 {
            distance = distance.min(SENSOR_HEIGHT_M / (-altitude).sin());
        }
        let noise: f64 = rng.gen_range(-0.02..0.02);
        (((distance + noise) * 1000.0) as u32).min(MAX_RANGE_MM)
    });
    let key = range.mapv(|r| r as f32 / (ROOM_HALF_SIZE_M as f32 * 1500.0));
    (range, key)
}
