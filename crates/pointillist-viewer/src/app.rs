use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

use pointillist_engine::device::{Gpu, GpuInit, SurfaceErrorAction};
use pointillist_engine::render::{RenderCtx, RenderTarget};
use pointillist_engine::texture::{FontSystem, RampKind};
use pointillist_engine::{FrameStats, PointCloudRenderer, RenderConfig};

use crate::camera::PanZoomCamera;
use crate::store::SyntheticStore;

const STATS_INTERVAL: Duration = Duration::from_secs(2);

/// Window-bound state, created on `resumed`.
struct Surface {
    window: Arc<Window>,
    gpu: Gpu,
    renderer: PointCloudRenderer,
    camera: PanZoomCamera,
    last_report: Instant,
}

impl Surface {
    fn create(event_loop: &ActiveEventLoop, config: RenderConfig, fonts: &FontSystem) -> Result<Self> {
        let attrs = Window::default_attributes()
            .with_title("pointillist")
            .with_inner_size(LogicalSize::new(1280.0, 800.0));

        let window = Arc::new(
            event_loop
                .create_window(attrs)
                .context("failed to create window")?,
        );

        let gpu = pollster::block_on(Gpu::new(window.clone(), GpuInit::default()))
            .context("GPU initialization failed")?;

        let renderer = PointCloudRenderer::new(&RenderCtx::from_gpu(&gpu), config, fonts.primary());

        let size = gpu.size();
        Ok(Self {
            window,
            gpu,
            renderer,
            camera: PanZoomCamera::new(size.width, size.height),
            last_report: Instant::now(),
        })
    }

    /// Renders one frame. Returns false when the surface is unusable.
    fn redraw(&mut self, store: &SyntheticStore) -> bool {
        let mut frame = match self.gpu.begin_frame() {
            Ok(frame) => frame,
            Err(err) => {
                return self.gpu.handle_surface_error(err) != SurfaceErrorAction::Fatal;
            }
        };

        let stats = {
            let ctx = RenderCtx::from_gpu(&self.gpu);
            let mut target = RenderTarget::new(&mut frame.encoder, &frame.view);
            self.renderer.render_frame(&ctx, &mut target, store, &self.camera)
        };
        self.gpu.submit(frame);

        if self.last_report.elapsed() >= STATS_INTERVAL {
            self.last_report = Instant::now();
            report(&stats, self.renderer.orchestrator().cache().resident());
        }
        true
    }

    fn on_key(&mut self, event: &KeyEvent) -> bool {
        if event.state != ElementState::Pressed || event.repeat {
            return true;
        }

        let PhysicalKey::Code(code) = event.physical_key else {
            return true;
        };

        match code {
            KeyCode::Escape => return false,
            KeyCode::KeyR => self.camera.reset(),
            KeyCode::KeyL => {
                let mut config = self.renderer.config().clone();
                config.labels_enabled = !config.labels_enabled;
                log::info!("labels {}", if config.labels_enabled { "on" } else { "off" });
                self.renderer.set_config(config);
            }
            KeyCode::KeyC => {
                let mut config = self.renderer.config().clone();
                config.colormap = next_ramp(config.colormap);
                log::info!("colormap {:?}", config.colormap);
                self.renderer.set_config(config);
            }
            _ => {}
        }
        true
    }
}

fn next_ramp(current: RampKind) -> RampKind {
    let at = RampKind::ALL.iter().position(|k| *k == current).unwrap_or(0);
    RampKind::ALL[(at + 1) % RampKind::ALL.len()]
}

fn report(stats: &FrameStats, resident: usize) {
    log::info!(
        "frame {}: budget {:.0}, {} candidate tiles, {} drawn, {} draw calls, {} points, {} resident",
        stats.frame,
        stats.budget,
        stats.candidates,
        stats.drawn_tiles,
        stats.draw_calls,
        stats.points,
        resident
    );
}

/// winit application driving one viewer window.
pub struct Viewer {
    config: RenderConfig,
    store: SyntheticStore,
    fonts: FontSystem,
    surface: Option<Surface>,
    exit_requested: bool,
}

impl Viewer {
    pub fn new(config: RenderConfig, store: SyntheticStore, fonts: FontSystem) -> Self {
        Self {
            config,
            store,
            fonts,
            surface: None,
            exit_requested: false,
        }
    }

    fn request_exit(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(surface) = self.surface.take() {
            surface.renderer.destroy();
        }
        self.exit_requested = true;
        event_loop.exit();
    }
}

impl ApplicationHandler for Viewer {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.surface.is_some() {
            return;
        }

        match Surface::create(event_loop, self.config.clone(), &self.fonts) {
            Ok(surface) => {
                surface.window.request_redraw();
                self.surface = Some(surface);
            }
            Err(e) => {
                log::error!("failed to create viewer window: {e:#}");
                self.request_exit(event_loop);
            }
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.exit_requested {
            event_loop.exit();
            return;
        }

        // Tiles arrive asynchronously; keep redrawing so completions get polled.
        event_loop.set_control_flow(ControlFlow::Wait);
        if let Some(surface) = &self.surface {
            surface.window.request_redraw();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        let Some(surface) = self.surface.as_mut() else {
            return;
        };

        let keep_running = match event {
            WindowEvent::CloseRequested => false,

            WindowEvent::Resized(size) => {
                surface.gpu.resize(size);
                surface.camera.resize(size.width, size.height);
                surface.window.request_redraw();
                true
            }

            WindowEvent::CursorMoved { position, .. } => {
                surface.camera.cursor_moved(position.x as f32, position.y as f32);
                true
            }

            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                surface.camera.set_dragging(state == ElementState::Pressed);
                true
            }

            WindowEvent::MouseWheel { delta, .. } => {
                let factor = match delta {
                    MouseScrollDelta::LineDelta(_, y) => 1.2f32.powf(y),
                    MouseScrollDelta::PixelDelta(p) => 1.002f32.powf(p.y as f32),
                };
                surface.camera.zoom_at_cursor(factor);
                true
            }

            WindowEvent::KeyboardInput { event, .. } => surface.on_key(&event),

            WindowEvent::RedrawRequested => surface.redraw(&self.store),

            _ => true,
        };

        if !keep_running {
            self.request_exit(event_loop);
        }
    }
}
