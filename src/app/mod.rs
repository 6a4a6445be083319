//! winit shell: owns the window, translates raw events into viewer session
//! calls and drives one tick per redraw, paced to the monitor refresh rate.

mod timing;

use crate::assets;
use crate::config::ViewerConfig;
use crate::engine::RenderEngine;
use crate::render::WgpuEngine;
use crate::session::{StopHandle, ViewerSession};
use timing::FrameStats;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowAttributes, WindowId};

struct App {
    window: Option<Arc<Window>>,
    engine: Option<WgpuEngine>,
    session: ViewerSession,
    stats: FrameStats,
    config: ViewerConfig,
    model_path: PathBuf,
    stop: StopHandle,
    mouse_pos: Option<(f32, f32)>,
    target_frame_duration: Duration,
    next_frame_time: Instant,
}

impl App {
    fn new(config: ViewerConfig, model_path: PathBuf) -> Self {
        Self {
            window: None,
            engine: None,
            session: ViewerSession::new(&config),
            stats: FrameStats::new(config.window_title.clone()),
            config,
            model_path,
            stop: StopHandle::new(),
            mouse_pos: None,
            target_frame_duration: Duration::from_millis(16),
            next_frame_time: Instant::now(),
        }
    }

    fn update_target_frame_duration(&mut self, window: &Window) {
        let mut target = Duration::from_millis(16);
        if let Some(monitor) = window.current_monitor() {
            if let Some(millihz) = monitor.refresh_rate_millihertz() {
                let hz = millihz as f32 / 1000.0;
                if hz > 1.0 {
                    target = Duration::from_secs_f32(1.0 / hz);
                }
            }
        }
        self.target_frame_duration = target;
        self.next_frame_time = Instant::now() + self.target_frame_duration;
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attrs = WindowAttributes::default()
            .with_title(self.config.window_title.as_str())
            .with_inner_size(PhysicalSize::new(
                self.config.window_width,
                self.config.window_height,
            ))
            .with_resizable(true);

        let window = Arc::new(
            event_loop
                .create_window(window_attrs)
                .expect("Failed to create window"),
        );

        match WgpuEngine::new(window.clone(), &self.config) {
            Ok(engine) => self.engine = Some(engine),
            Err(err) => {
                log::error!("Failed to initialize renderer: {}", err);
                self.stop.stop();
                event_loop.exit();
                return;
            }
        }

        // Kick off the asset load; the frame loop polls the channel and
        // keeps animating zero parts until it resolves.
        self.session
            .begin_load(assets::spawn_load(self.model_path.clone()));

        self.update_target_frame_duration(&window);
        self.window = Some(window);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                self.stop.stop();
                event_loop.exit();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.physical_key == PhysicalKey::Code(KeyCode::Escape) {
                    self.stop.stop();
                    event_loop.exit();
                    return;
                }
                let pressed = event.state == ElementState::Pressed;
                self.session.key_event(event.physical_key, pressed);
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.mouse_pos = Some((position.x as f32, position.y as f32));
                self.session
                    .pointer_moved(position.x as f32, position.y as f32);
            }
            WindowEvent::MouseInput { state, button, .. } => {
                if button == MouseButton::Left {
                    match state {
                        // No position yet if the button went down before the
                        // cursor ever moved; the session seeds from the first
                        // move in that case.
                        ElementState::Pressed => self.session.pointer_down(self.mouse_pos),
                        ElementState::Released => self.session.pointer_up(),
                    }
                }
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let vertical = match delta {
                    MouseScrollDelta::LineDelta(_, y) => y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32,
                };
                // Fixed dolly distance per notch; only the sign matters.
                if vertical != 0.0 {
                    self.session.wheel(vertical.signum());
                }
            }
            WindowEvent::Resized(new_size) => {
                if let Some(engine) = &mut self.engine {
                    engine.resize(new_size.width, new_size.height);
                }
                if let Some(window) = self.window.clone() {
                    self.update_target_frame_duration(&window);
                }
            }
            WindowEvent::RedrawRequested => {
                if self.stop.is_stopped() {
                    return;
                }
                if let Some(engine) = &mut self.engine {
                    self.session.tick(engine);
                }
                self.stats.frame(self.window.as_deref());
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();
        if now >= self.next_frame_time {
            if let Some(window) = &self.window {
                window.request_redraw();
            }
            self.next_frame_time = now + self.target_frame_duration;
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(self.next_frame_time));
    }
}

pub fn run(config: ViewerConfig, model_path: PathBuf) {
    let event_loop = EventLoop::new().expect("Failed to create event loop");
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app = App::new(config, model_path);
    event_loop.run_app(&mut app).expect("Event loop error");
}
