//! Renderer backend interface and a headless implementation
//!
//! A backend turns a [`Frame`] into pixels and reports window input. The
//! frame loop never talks to a window system directly, so the same loop runs
//! on a GPU surface, the CPU [`crate::SoftwareRenderer`] or the
//! [`HeadlessBackend`] used in tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use lidarviz_core::Result;

use crate::camera::CameraData;
use crate::input::InputEvent;
use crate::lock;
use crate::scene::SceneSnapshot;
use crate::target::TargetDisplay;

/// Everything a backend needs to draw one frame
#[derive(Debug, Clone)]
pub struct Frame {
    pub scene: Arc<SceneSnapshot>,
    pub camera: CameraData,
    pub target: TargetDisplay,
    /// Viewport size in pixels
    pub viewport: (u32, u32),
    /// Frames drawn before this one
    pub index: u64,
}

/// Drawing surface and input source driven by the frame loop
pub trait RenderBackend {
    /// Input received since the previous call
    fn poll_events(&mut self) -> Vec<InputEvent>;

    /// Current viewport size in pixels
    fn viewport(&self) -> (u32, u32);

    /// Draw a frame; an error ends the frame loop
    fn draw(&mut self, frame: &Frame) -> Result<()>;

    /// Show or hide the window, if there is one
    fn set_visible(&mut self, _visible: bool) {}
}

/// Thread-safe queue feeding synthetic input to a backend
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    events: Arc<Mutex<VecDeque<InputEvent>>>,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: InputEvent) {
        lock(&self.events).push_back(event);
    }

    pub fn drain(&self) -> Vec<InputEvent> {
        lock(&self.events).drain(..).collect()
    }
}

#[derive(Debug, Default)]
struct ProbeState {
    frames: u64,
    last: Option<Frame>,
}

/// Read access to what a headless backend has drawn
#[derive(Debug, Clone, Default)]
pub struct FrameProbe {
    state: Arc<Mutex<ProbeState>>,
}

impl FrameProbe {
    /// Number of frames drawn so far
    pub fn frames(&self) -> u64 {
        lock(&self.state).frames
    }

    /// The most recently drawn frame
    pub fn last_frame(&self) -> Option<Frame> {
        lock(&self.state).last.clone()
    }

    /// Scene state of the most recently drawn frame
    pub fn last_scene(&self) -> Option<Arc<SceneSnapshot>> {
        lock(&self.state).last.as_ref().map(|f| Arc::clone(&f.scene))
    }

    fn record(&self, frame: &Frame) {
        let mut state = lock(&self.state);
        state.frames += 1;
        state.last = Some(frame.clone());
    }
}

/// A backend with no window that records frames instead of drawing them
#[derive(Debug)]
pub struct HeadlessBackend {
    viewport: (u32, u32),
    events: EventQueue,
    probe: FrameProbe,
    visible: bool,
}

impl HeadlessBackend {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            viewport: (width, height),
            events: EventQueue::new(),
            probe: FrameProbe::default(),
            visible: false,
        }
    }

    /// Handle for injecting input from any thread
    pub fn events(&self) -> EventQueue {
        self.events.clone()
    }

    /// Handle for inspecting drawn frames from any thread
    pub fn probe(&self) -> FrameProbe {
        self.probe.clone()
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new(800, 600)
    }
}

impl RenderBackend for HeadlessBackend {
    fn poll_events(&mut self) -> Vec<InputEvent> {
        let events = self.events.drain();
        for event in &events {
            if let InputEvent::Resized { width, height } = *event {
                self.viewport = (width, height);
            }
        }
        events
    }

    fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    fn draw(&mut self, frame: &Frame) -> Result<()> {
        self.probe.record(frame);
        Ok(())
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }
}
