//! Default keyboard and mouse bindings
//!
//! | Input            | Action                          |
//! |------------------|---------------------------------|
//! | `W` / `S`        | pitch up / down                 |
//! | `A` / `D`        | orbit left / right              |
//! | `=` / `-`        | dolly in / out                  |
//! | `0`              | toggle orthographic projection  |
//! | `R`              | reset the camera                |
//! | `Esc`            | stop the rendering loop         |
//! | left drag        | orbit                           |
//! | middle drag      | pan in the view plane           |
//! | scroll           | dolly                           |

use std::sync::atomic::Ordering;

use log::debug;

use crate::input::{Key, Modifiers, WindowCtx};
use crate::lock;
use crate::viz::VizHandle;

const KEY_ANGLE_STEP: f64 = 5.0;
const KEY_DOLLY_STEP: f64 = 5.0;
const SCROLL_DOLLY_STEP: f64 = 5.0;
const DRAG_DEGREES_PER_PIXEL: f64 = 0.25;

/// Push the default camera bindings
///
/// Call this before pushing application handlers so that the defaults sit at
/// the bottom of each stack and only see events the application lets through.
pub fn add_default_controls(viz: &VizHandle) {
    let camera = viz.shared_camera();
    let running = viz.running_flag();
    viz.push_key_handler(Box::new(move |_ctx: &WindowCtx, key: Key, _mods: Modifiers| {
        let mut camera = lock(&camera);
        match key {
            Key::W => camera.pitch(KEY_ANGLE_STEP),
            Key::S => camera.pitch(-KEY_ANGLE_STEP),
            Key::A => camera.yaw(KEY_ANGLE_STEP),
            Key::D => camera.yaw(-KEY_ANGLE_STEP),
            Key::EQUAL => camera.dolly(-KEY_DOLLY_STEP),
            Key::MINUS => camera.dolly(KEY_DOLLY_STEP),
            Key::NUM_0 => {
                let ortho = !camera.is_orthographic();
                camera.set_orthographic(ortho);
            }
            Key::R => camera.reset(),
            Key::ESCAPE => {
                debug!("escape pressed, stopping");
                running.store(false, Ordering::SeqCst);
            }
            _ => return true,
        }
        false
    }));

    let camera = viz.shared_camera();
    viz.push_mouse_pos_handler(Box::new(move |ctx: &WindowCtx, x: f64, y: f64| {
        let dx = x - ctx.mouse_x;
        let dy = y - ctx.mouse_y;
        if ctx.lbutton_down {
            let mut camera = lock(&camera);
            camera.yaw(dx * DRAG_DEGREES_PER_PIXEL);
            camera.pitch(dy * DRAG_DEGREES_PER_PIXEL);
        } else if ctx.mbutton_down {
            let height = ctx.viewport_height.max(1) as f64;
            lock(&camera).dolly_xy(-dx / height, dy / height);
        }
        true
    }));

    let camera = viz.shared_camera();
    viz.push_scroll_handler(Box::new(move |_ctx: &WindowCtx, _dx: f64, dy: f64| {
        lock(&camera).dolly(-dy * SCROLL_DOLLY_STEP);
        true
    }));
}
