//! CPU rasterizer backend
//!
//! Draws frames into an RGBA buffer without a window or GPU. Points are
//! depth tested square splats, cuboids and target rings are wireframes,
//! images are drawn as screen-space quads over the 3D content and labels are
//! shown as anchor markers (text rendering is left to windowed backends).

use std::f64::consts::TAU;
use std::path::Path;

use image::{ImageFormat, Rgba, RgbaImage};
use lidarviz_core::{Error, Result};
use log::debug;
use nalgebra::{Matrix4, Point3};
use serde::{Deserialize, Serialize};

use crate::backend::{EventQueue, Frame, RenderBackend};
use crate::cuboid::CUBOID_EDGES;
use crate::input::InputEvent;
use crate::label::LabelAnchor;

const RING_SEGMENTS: usize = 96;
const RING_COLOR: [f32; 4] = [0.6, 0.6, 0.6, 1.0];
const LABEL_MARKER_PX: f32 = 3.0;

/// Rendering configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoftwareRendererConfig {
    pub background: [f32; 4],
    /// Multiplier applied to each cloud's point size, in pixels
    pub point_scale: f32,
    /// Number of target rings drawn when rings are enabled
    pub ring_count: usize,
}

impl Default for SoftwareRendererConfig {
    fn default() -> Self {
        Self {
            background: [0.1, 0.1, 0.1, 1.0],
            point_scale: 1.0,
            ring_count: 8,
        }
    }
}

/// A position on screen in pixels with its normalized depth
#[derive(Debug, Clone, Copy)]
struct ScreenPoint {
    x: f32,
    y: f32,
    depth: f32,
}

/// Software point cloud renderer
pub struct SoftwareRenderer {
    config: SoftwareRendererConfig,
    color: RgbaImage,
    depth: Vec<f32>,
    events: EventQueue,
}

impl SoftwareRenderer {
    pub fn new(width: u32, height: u32, config: SoftwareRendererConfig) -> Self {
        let mut renderer = Self {
            config,
            color: RgbaImage::new(width, height),
            depth: vec![f32::INFINITY; width as usize * height as usize],
            events: EventQueue::new(),
        };
        renderer.clear();
        renderer
    }

    pub fn config(&self) -> &SoftwareRendererConfig {
        &self.config
    }

    /// Handle for feeding input to the frame loop
    pub fn events(&self) -> EventQueue {
        self.events.clone()
    }

    /// The last drawn frame
    pub fn image(&self) -> &RgbaImage {
        &self.color
    }

    /// Write the last drawn frame as a PNG file
    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.color
            .save_with_format(path, ImageFormat::Png)
            .map_err(|e| Error::Backend(format!("Failed to save {}: {}", path.display(), e)))?;
        debug!("saved frame to {}", path.display());
        Ok(())
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        if (width, height) != self.color.dimensions() {
            self.color = RgbaImage::new(width, height);
            self.depth = vec![f32::INFINITY; width as usize * height as usize];
        }
    }

    fn clear(&mut self) {
        let background = to_rgba8(self.config.background);
        for pixel in self.color.pixels_mut() {
            *pixel = background;
        }
        self.depth.fill(f32::INFINITY);
    }

    fn project(&self, view_proj: &Matrix4<f64>, point: &Point3<f64>) -> Option<ScreenPoint> {
        let clip = view_proj * point.to_homogeneous();
        if clip.w <= f64::EPSILON {
            return None;
        }
        let ndc = clip.xyz() / clip.w;
        if !(-1.0..=1.0).contains(&ndc.z) {
            return None;
        }
        let (width, height) = self.color.dimensions();
        Some(ScreenPoint {
            x: ((ndc.x + 1.0) * 0.5 * width as f64) as f32,
            y: ((1.0 - ndc.y) * 0.5 * height as f64) as f32,
            depth: ndc.z as f32,
        })
    }

    fn blend(&mut self, x: i64, y: i64, rgba: [f32; 4]) {
        let (width, height) = self.color.dimensions();
        if x < 0 || y < 0 || x >= width as i64 || y >= height as i64 {
            return;
        }
        let dst = self.color.get_pixel_mut(x as u32, y as u32);
        let a = rgba[3].clamp(0.0, 1.0);
        for c in 0..3 {
            let value = rgba[c].clamp(0.0, 1.0) * a + dst.0[c] as f32 / 255.0 * (1.0 - a);
            dst.0[c] = (value * 255.0).round() as u8;
        }
        dst.0[3] = 255;
    }

    fn splat(&mut self, at: ScreenPoint, half_extent: i64, rgba: [f32; 4]) {
        let (width, height) = self.color.dimensions();
        let (cx, cy) = (at.x.floor() as i64, at.y.floor() as i64);
        for y in cy - half_extent..=cy + half_extent {
            for x in cx - half_extent..=cx + half_extent {
                if x < 0 || y < 0 || x >= width as i64 || y >= height as i64 {
                    continue;
                }
                let idx = y as usize * width as usize + x as usize;
                if at.depth < self.depth[idx] {
                    self.depth[idx] = at.depth;
                    self.blend(x, y, rgba);
                }
            }
        }
    }

    fn line(&mut self, a: ScreenPoint, b: ScreenPoint, rgba: [f32; 4]) {
        let (width, height) = self.color.dimensions();
        let (dx, dy) = (b.x - a.x, b.y - a.y);
        let limit = 4 * (width as usize + height as usize);
        let steps = (dx.abs().max(dy.abs()).ceil() as usize).clamp(1, limit);
        for i in 0..=steps {
            let t = i as f32 / steps as f32;
            self.blend(
                (a.x + dx * t).floor() as i64,
                (a.y + dy * t).floor() as i64,
                rgba,
            );
        }
    }

    fn draw_clouds(&mut self, frame: &Frame, view_proj: &Matrix4<f64>) {
        for cloud in &frame.scene.clouds {
            let half_extent = ((cloud.point_size() * self.config.point_scale) / 2.0).floor().max(0.0) as i64;
            for vertex in cloud.vertices() {
                let p = Point3::new(
                    vertex.position[0] as f64,
                    vertex.position[1] as f64,
                    vertex.position[2] as f64,
                );
                if let Some(at) = self.project(view_proj, &p) {
                    self.splat(at, half_extent, vertex.color);
                }
            }
        }
    }

    fn draw_cuboids(&mut self, frame: &Frame, view_proj: &Matrix4<f64>) {
        for cuboid in &frame.scene.cuboids {
            let corners = cuboid.corners().map(|c| self.project(view_proj, &c));
            for (a, b) in CUBOID_EDGES {
                if let (Some(a), Some(b)) = (corners[a], corners[b]) {
                    self.line(a, b, cuboid.rgba);
                }
            }
        }
    }

    fn draw_rings(&mut self, frame: &Frame, view_proj: &Matrix4<f64>) {
        if !frame.target.rings_enabled() {
            return;
        }
        let center = frame.camera.target;
        let spacing = frame.target.ring_spacing();
        for ring in 1..=self.config.ring_count {
            let radius = spacing * ring as f64;
            let points: Vec<Option<ScreenPoint>> = (0..=RING_SEGMENTS)
                .map(|s| {
                    let angle = TAU * s as f64 / RING_SEGMENTS as f64;
                    let p = Point3::new(
                        center.x + radius * angle.cos(),
                        center.y + radius * angle.sin(),
                        center.z,
                    );
                    self.project(view_proj, &p)
                })
                .collect();
            for pair in points.windows(2) {
                if let (Some(a), Some(b)) = (pair[0], pair[1]) {
                    self.line(a, b, RING_COLOR);
                }
            }
        }
    }

    fn draw_images(&mut self, frame: &Frame) {
        let (width, height) = self.color.dimensions();
        for image in &frame.scene.images {
            let pos = image.position();
            // x shares the vertical scale, then shifts by viewport widths
            let x_scale = height as f32 / width.max(1) as f32;
            let to_px = |x: f32| (x * x_scale + image.hshift() + 1.0) * 0.5 * width as f32;
            let x0 = to_px(pos.x_min);
            let x1 = to_px(pos.x_max);
            let y0 = (1.0 - pos.y_max) * 0.5 * height as f32;
            let y1 = (1.0 - pos.y_min) * 0.5 * height as f32;
            if x1 <= x0 || y1 <= y0 {
                continue;
            }
            let px0 = x0.max(0.0).floor() as i64;
            let px1 = x1.min(width as f32).ceil() as i64;
            let py0 = y0.max(0.0).floor() as i64;
            let py1 = y1.min(height as f32).ceil() as i64;
            for py in py0..py1 {
                let v = (py as f32 + 0.5 - y0) / (y1 - y0);
                for px in px0..px1 {
                    let u = (px as f32 + 0.5 - x0) / (x1 - x0);
                    if !(0.0..1.0).contains(&u) || !(0.0..1.0).contains(&v) {
                        continue;
                    }
                    if let Some(rgba) = image.sample(u, v) {
                        self.blend(px, py, rgba);
                    }
                }
            }
        }
    }

    fn draw_labels(&mut self, frame: &Frame, view_proj: &Matrix4<f64>) {
        let (width, height) = self.color.dimensions();
        for label in &frame.scene.labels {
            let at = match label.anchor {
                LabelAnchor::World { position } => self.project(view_proj, &position),
                LabelAnchor::Screen { x, y, .. } => Some(ScreenPoint {
                    x: (x * width as f64) as f32,
                    y: (y * height as f64) as f32,
                    depth: -1.0,
                }),
            };
            let Some(at) = at else { continue };
            let size = LABEL_MARKER_PX * label.scale.max(0.0);
            let h = ScreenPoint { x: at.x - size, ..at };
            let v = ScreenPoint { y: at.y - size, ..at };
            self.line(h, ScreenPoint { x: at.x + size, ..at }, label.rgba);
            self.line(v, ScreenPoint { y: at.y + size, ..at }, label.rgba);
        }
    }
}

impl RenderBackend for SoftwareRenderer {
    fn poll_events(&mut self) -> Vec<InputEvent> {
        let events = self.events.drain();
        for event in &events {
            if let InputEvent::Resized { width, height } = *event {
                self.resize(width, height);
            }
        }
        events
    }

    fn viewport(&self) -> (u32, u32) {
        self.color.dimensions()
    }

    fn draw(&mut self, frame: &Frame) -> Result<()> {
        let (width, height) = frame.viewport;
        self.resize(width, height);
        self.clear();

        let view_proj = frame.camera.view_proj();
        self.draw_clouds(frame, &view_proj);
        self.draw_cuboids(frame, &view_proj);
        self.draw_rings(frame, &view_proj);
        self.draw_images(frame);
        self.draw_labels(frame, &view_proj);
        Ok(())
    }
}

fn to_rgba8(rgba: [f32; 4]) -> Rgba<u8> {
    Rgba(rgba.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8))
}
