//! Scene tour
//!
//! Builds one of each scene object, stacks an application key handler over
//! the default controls, replays a short sequence of input events and
//! renders the result to a PNG with the software renderer.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use lidarviz::prelude::*;
use log::info;
use ndarray::{Array2, Array3};

#[derive(Parser, Debug)]
#[command(name = "scene_tour")]
#[command(about = "Render every scene object kind with the software renderer")]
struct Cli {
    /// Frames to draw after the input replay
    #[arg(long, default_value_t = 3)]
    frames: usize,

    /// Comma separated RGBA color of the cuboid, missing components default to 0,0,0,1
    #[arg(long, default_value = "0.1,0.9,0.3")]
    cuboid_color: String,

    /// Where to write the rendered frame
    #[arg(long, default_value = "scene_tour.png")]
    output: PathBuf,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    println!("lidarviz {} scene tour", VERSION);
    println!("==============================");

    let renderer = SoftwareRenderer::new(640, 480, SoftwareRendererConfig::default());
    let events = renderer.events();
    let mut viz = PointViz::new(
        VizConfig {
            name: "scene tour".to_string(),
            window_width: 640,
            window_height: 480,
            ..VizConfig::default()
        },
        renderer,
    );
    let handle = viz.handle();
    add_default_controls(&handle);

    // A helix of points, one pose per turn
    let turns = 4;
    let per_turn = 64;
    let helix = Arc::new(Cloud::with_poses(turns * per_turn, per_turn)?);
    let xyz = Array2::from_shape_fn((turns * per_turn, 3), |(i, axis)| {
        let angle = std::f32::consts::TAU * (i % per_turn) as f32 / per_turn as f32;
        match axis {
            0 => 5.0 * angle.cos(),
            1 => 5.0 * angle.sin(),
            _ => (i / per_turn) as f32,
        }
    });
    helix.set_xyz(xyz.view())?;
    helix.set_key(Array2::from_shape_fn((turns, per_turn), |(t, _)| t as f32 / turns as f32).view())?;
    let poses: Vec<Pose> = (0..per_turn)
        .map(|col| Pose::translation(0.0, 0.0, col as f64 * 0.01))
        .collect();
    helix.set_column_poses(&poses)?;
    helix.set_point_size(3.0);

    // Rectangular overlay in the lower left with a red mask over one corner
    let image = Arc::new(Image::from_array(
        Array2::from_shape_fn((32, 64), |(_, x)| x as f32 / 63.0).view(),
    )?);
    let mut mask = Array3::<f32>::zeros((32, 64, 4));
    for y in 0..8 {
        for x in 0..8 {
            mask[[y, x, 0]] = 1.0;
            mask[[y, x, 3]] = 0.8;
        }
    }
    image.set_mask(mask.view())?;
    // x is in viewport-height units; the shift snaps the left side to the screen edge
    image.set_position(0.0, 0.6, -1.0, -0.7);
    image.set_hshift(-1.0);

    let cuboid = Arc::new(Cuboid::new(
        Pose::translation(0.0, 0.0, 1.5) * Pose::scaling(2.0, 2.0, 3.0),
        &parse_rgba(&cli.cuboid_color)?,
    )?);
    let origin = Arc::new(Label::new_3d("origin", 0.0, 0.0, 0.0));
    let title = Arc::new(Label::new_2d("scene tour", 0.98, 0.02, true, true));
    title.set_rgba(&[1.0, 1.0, 0.0])?;

    viz.add(&helix);
    viz.add(&image);
    viz.add(&cuboid);
    viz.add(&origin);
    viz.add(&title);
    viz.update();
    info!("scene holds {} objects", handle.object_count());

    // Application overlay: space toggles the rings and is not seen by the defaults
    let target = handle.shared_target_display();
    viz.push_key_handler(Box::new(move |_ctx: &WindowCtx, key: Key, _mods: Modifiers| {
        if key == Key::SPACE {
            let mut target = target.lock().unwrap_or_else(|e| e.into_inner());
            let enabled = target.rings_enabled();
            target.enable_rings(!enabled);
            return false;
        }
        true
    }));

    for key in [Key::SPACE, Key::W, Key::W, Key::A, Key::MINUS] {
        events.push(InputEvent::Key {
            key,
            mods: Modifiers::NONE,
            action: Action::Press,
        });
    }
    events.push(InputEvent::Scroll { dx: 0.0, dy: 2.0 });

    for _ in 0..cli.frames.max(1) {
        viz.run_once()?;
    }

    {
        let camera = viz.camera();
        println!(
            "camera yaw {:.1} pitch {:.1} distance {:.2}",
            camera.yaw_degrees(),
            camera.pitch_degrees(),
            camera.distance()
        );
    }
    println!("rings enabled: {}", viz.target_display().rings_enabled());

    viz.backend().save_png(&cli.output)?;
    println!("Wrote {}", cli.output.display());
    Ok(())
}
