//! The frame loop and its cross-thread control surface
//!
//! [`PointViz`] owns the renderer backend and must stay on the thread that
//! created it. Everything other threads need (scene membership, publishing,
//! handlers, the camera, stopping the loop) is reachable through a cloneable
//! [`VizHandle`].
//!
//! `run()` draws frames in batches of [`FRAMES_PER_BATCH`]. Interrupts and the
//! stop flag are only looked at between batches, and that boundary is also
//! where producers waiting in [`VizHandle::lock_frame`] get their turn.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use lidarviz_core::{Error, Result};
use log::{debug, info, trace, warn};
use serde::{Deserialize, Serialize};

use crate::backend::{Frame, HeadlessBackend, RenderBackend};
use crate::camera::Camera;
use crate::gate::{FrameGate, FrameGuard};
use crate::handlers::{InputHandlers, KeyHandler, MouseButtonHandler, MousePosHandler, ScrollHandler};
use crate::input::{Action, InputEvent, WindowCtx};
use crate::lock;
use crate::scene::{Scene, SceneObject, SceneSnapshot};
use crate::target::TargetDisplay;

/// Frames drawn between two checks of the stop flag and interrupts
pub const FRAMES_PER_BATCH: usize = 10;

/// Construction parameters of a visualizer window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VizConfig {
    /// Window title
    pub name: String,
    /// Keep the aspect ratio of the initial window size when resized
    pub fix_aspect: bool,
    pub window_width: u32,
    pub window_height: u32,
}

impl Default for VizConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            fix_aspect: false,
            window_width: 800,
            window_height: 600,
        }
    }
}

/// External cancellation observed by the frame loop between batches
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    flag: Arc<AtomicBool>,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; `run()` returns [`Error::Interrupted`]
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Consume a pending request
    fn take(&self) -> bool {
        self.flag.swap(false, Ordering::SeqCst)
    }
}

struct Published {
    snapshot: Arc<SceneSnapshot>,
    from_update: bool,
}

struct Shared {
    running: Arc<AtomicBool>,
    interrupt: Interrupt,
    scene: Mutex<Scene>,
    published: Mutex<Option<Published>>,
    camera: Arc<Mutex<Camera>>,
    target: Arc<Mutex<TargetDisplay>>,
    handlers: Mutex<InputHandlers>,
    gate: FrameGate,
}

/// Thread-safe control surface of a [`PointViz`]
#[derive(Clone)]
pub struct VizHandle {
    shared: Arc<Shared>,
}

impl VizHandle {
    fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                running: Arc::new(AtomicBool::new(false)),
                interrupt: Interrupt::new(),
                scene: Mutex::new(Scene::new()),
                published: Mutex::new(None),
                camera: Arc::new(Mutex::new(Camera::new())),
                target: Arc::new(Mutex::new(TargetDisplay::new())),
                handlers: Mutex::new(InputHandlers::default()),
                gate: FrameGate::new(),
            }),
        }
    }

    /// Check if the rendering loop is running
    pub fn running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Set the running flag; `false` ends `run()` after the current batch
    pub fn set_running(&self, state: bool) {
        self.shared.running.store(state, Ordering::SeqCst);
    }

    /// Publish the current state of every object in the scene
    ///
    /// Returns false if the previous update had not been drawn yet; it is
    /// replaced by this one.
    pub fn update(&self) -> bool {
        let consumed = self.publish(true);
        if !consumed {
            trace!("update replaced an undrawn snapshot");
        }
        consumed
    }

    /// Replace the pending snapshot; returns false if it held an undrawn
    /// `update()`, whose flag then carries over to the replacement
    fn publish(&self, from_update: bool) -> bool {
        let snapshot = Arc::new(lock(&self.shared.scene).snapshot());
        let mut published = lock(&self.shared.published);
        let pending_update = matches!(*published, Some(Published { from_update: true, .. }));
        *published = Some(Published {
            snapshot,
            from_update: from_update || pending_update,
        });
        !pending_update
    }

    /// Add an object to the scene; adding it again has no effect
    ///
    /// The membership change is published right away, together with the
    /// current state of every other object in the scene, as if `update()`
    /// had been called. It does not count as an `update()` for pacing.
    pub fn add(&self, object: impl Into<SceneObject>) -> bool {
        let object = object.into();
        let kind = object.kind_name();
        let added = lock(&self.shared.scene).add(object);
        if added {
            debug!("added {} to scene", kind);
            self.publish(false);
        }
        added
    }

    /// Remove an object from the scene; returns false if it was not present
    ///
    /// Publishes like [`VizHandle::add`].
    pub fn remove(&self, object: impl Into<SceneObject>) -> bool {
        let object = object.into();
        let kind = object.kind_name();
        let removed = lock(&self.shared.scene).remove(object);
        if removed {
            debug!("removed {} from scene", kind);
            self.publish(false);
        }
        removed
    }

    pub fn contains(&self, object: impl Into<SceneObject>) -> bool {
        lock(&self.shared.scene).contains(&object.into())
    }

    /// Number of objects in the scene
    pub fn object_count(&self) -> usize {
        lock(&self.shared.scene).len()
    }

    /// Add a key handler on top of the stack
    pub fn push_key_handler(&self, handler: Box<KeyHandler>) {
        lock(&self.shared.handlers).key.push(handler);
    }

    pub fn push_mouse_button_handler(&self, handler: Box<MouseButtonHandler>) {
        lock(&self.shared.handlers).mouse_button.push(handler);
    }

    pub fn push_mouse_pos_handler(&self, handler: Box<MousePosHandler>) {
        lock(&self.shared.handlers).mouse_pos.push(handler);
    }

    pub fn push_scroll_handler(&self, handler: Box<ScrollHandler>) {
        lock(&self.shared.handlers).scroll.push(handler);
    }

    /// Lock the camera for reading or changing the view
    pub fn camera(&self) -> MutexGuard<'_, Camera> {
        lock(&self.shared.camera)
    }

    pub fn target_display(&self) -> MutexGuard<'_, TargetDisplay> {
        lock(&self.shared.target)
    }

    /// Shared camera, for handlers that outlive a borrow of the handle
    pub fn shared_camera(&self) -> Arc<Mutex<Camera>> {
        Arc::clone(&self.shared.camera)
    }

    pub fn shared_target_display(&self) -> Arc<Mutex<TargetDisplay>> {
        Arc::clone(&self.shared.target)
    }

    /// Shared running flag, for handlers that stop the loop
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shared.running)
    }

    /// Wait for the next batch boundary and hold off frames until the guard
    /// is dropped
    pub fn lock_frame(&self) -> FrameGuard<'_> {
        self.shared.gate.enter()
    }

    pub fn interrupt_handle(&self) -> Interrupt {
        self.shared.interrupt.clone()
    }

    fn take_published(&self) -> Option<Arc<SceneSnapshot>> {
        lock(&self.shared.published).take().map(|p| p.snapshot)
    }
}

/// A visualizer window and its frame loop
///
/// Not `Send`: frames can only be run by the thread that created it. Use
/// [`PointViz::handle`] to control it from elsewhere.
pub struct PointViz<B: RenderBackend = HeadlessBackend> {
    config: VizConfig,
    backend: B,
    handle: VizHandle,
    ctx: WindowCtx,
    current: Arc<SceneSnapshot>,
    frames: u64,
    _owning_thread: PhantomData<*const ()>,
}

impl<B: RenderBackend> PointViz<B> {
    pub fn new(config: VizConfig, backend: B) -> Self {
        let (width, height) = backend.viewport();
        info!(
            "creating visualizer '{}' ({}x{}, fix_aspect={})",
            config.name, config.window_width, config.window_height, config.fix_aspect
        );
        Self {
            config,
            backend,
            handle: VizHandle::new(),
            ctx: WindowCtx::new(width, height),
            current: Arc::new(SceneSnapshot::default()),
            frames: 0,
            _owning_thread: PhantomData,
        }
    }

    /// Cloneable handle usable from any thread
    pub fn handle(&self) -> VizHandle {
        self.handle.clone()
    }

    pub fn config(&self) -> &VizConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Window state as of the last processed event
    pub fn window_ctx(&self) -> WindowCtx {
        self.ctx
    }

    /// Frames drawn since creation
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    pub fn running(&self) -> bool {
        self.handle.running()
    }

    pub fn set_running(&self, state: bool) {
        self.handle.set_running(state);
    }

    pub fn update(&self) -> bool {
        self.handle.update()
    }

    pub fn add(&self, object: impl Into<SceneObject>) -> bool {
        self.handle.add(object)
    }

    pub fn remove(&self, object: impl Into<SceneObject>) -> bool {
        self.handle.remove(object)
    }

    pub fn push_key_handler(&self, handler: Box<KeyHandler>) {
        self.handle.push_key_handler(handler);
    }

    pub fn push_mouse_button_handler(&self, handler: Box<MouseButtonHandler>) {
        self.handle.push_mouse_button_handler(handler);
    }

    pub fn push_mouse_pos_handler(&self, handler: Box<MousePosHandler>) {
        self.handle.push_mouse_pos_handler(handler);
    }

    pub fn push_scroll_handler(&self, handler: Box<ScrollHandler>) {
        self.handle.push_scroll_handler(handler);
    }

    pub fn camera(&self) -> MutexGuard<'_, Camera> {
        self.handle.camera()
    }

    pub fn target_display(&self) -> MutexGuard<'_, TargetDisplay> {
        self.handle.target_display()
    }

    pub fn lock_frame(&self) -> FrameGuard<'_> {
        self.handle.lock_frame()
    }

    pub fn interrupt_handle(&self) -> Interrupt {
        self.handle.interrupt_handle()
    }

    /// Run the rendering loop until stopped, closed or interrupted
    ///
    /// Returns `Ok(())` when the running flag is cleared or the window is
    /// closed, [`Error::Interrupted`] when an [`Interrupt`] fires, and the
    /// backend's error if a frame fails to draw.
    pub fn run(&mut self) -> Result<()> {
        info!("starting rendering loop for '{}'", self.config.name);
        self.set_running(true);
        self.backend.set_visible(true);

        let handle = self.handle.clone();
        let gate = &handle.shared.gate;
        let mut held = gate.hold();

        let result = loop {
            if let Err(e) = self.run_batch() {
                break Err(e);
            }
            held = gate.handoff(held);
            trace!("batch boundary after frame {}", self.frames);

            if handle.shared.interrupt.take() {
                warn!("rendering loop interrupted");
                break Err(Error::Interrupted);
            }
            if !handle.running() {
                break Ok(());
            }
        };

        drop(held);
        self.set_running(false);
        self.backend.set_visible(false);
        info!("rendering loop stopped after {} frames", self.frames);
        result
    }

    fn run_batch(&mut self) -> Result<()> {
        for _ in 0..FRAMES_PER_BATCH {
            self.run_once()?;
        }
        Ok(())
    }

    /// Process input and draw a single frame
    pub fn run_once(&mut self) -> Result<()> {
        for event in self.backend.poll_events() {
            self.dispatch(event);
        }

        if let Some(snapshot) = self.handle.take_published() {
            self.current = snapshot;
        }

        let viewport = self.backend.viewport();
        let aspect = if self.config.fix_aspect && self.config.window_height > 0 {
            self.config.window_width as f64 / self.config.window_height as f64
        } else {
            self.ctx.aspect()
        };
        let camera = self.handle.camera().matrices(aspect);
        let target = *self.handle.target_display();

        let frame = Frame {
            scene: Arc::clone(&self.current),
            camera,
            target,
            viewport,
            index: self.frames,
        };
        self.backend.draw(&frame)?;
        self.frames += 1;
        Ok(())
    }

    fn dispatch(&mut self, event: InputEvent) {
        let handlers = lock(&self.handle.shared.handlers).snapshot();
        let ctx = self.ctx;
        match event {
            InputEvent::Key { key, mods, action } => {
                if action != Action::Release {
                    handlers.key.dispatch(|h| h(&ctx, key, mods));
                }
            }
            InputEvent::MouseButton { button, mods, action } => {
                self.ctx = ctx.apply(&event);
                let ctx = self.ctx;
                handlers.mouse_button.dispatch(|h| h(&ctx, button, action, mods));
            }
            InputEvent::CursorMoved { x, y } => {
                handlers.mouse_pos.dispatch(|h| h(&ctx, x, y));
                self.ctx = ctx.apply(&event);
            }
            InputEvent::Scroll { dx, dy } => {
                handlers.scroll.dispatch(|h| h(&ctx, dx, dy));
            }
            InputEvent::Resized { width, height } => {
                debug!("viewport resized to {}x{}", width, height);
                self.ctx = ctx.apply(&event);
            }
            InputEvent::CloseRequested => {
                warn!("window close requested");
                self.set_running(false);
            }
        }
    }
}
