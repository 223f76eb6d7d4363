//! Render-to-target demo shell
//!
//! Opens the scene window and a debug window, runs the render loop on a
//! background thread and shows live telemetry in the debug window title.
//! Closing either window or pressing Escape stops the render thread and
//! exits. A scene that fails to load exits with status 1.

use std::thread::JoinHandle;
use std::time::Instant;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::error::EventLoopError;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{Key, NamedKey};
use winit::window::{Window, WindowId};

use rtt_engine::rtt::device::HeadlessGraphicsDevice;
use rtt_engine::rtt::frame::{CancellationToken, TelemetrySlot};
use rtt_engine::rtt::scene::{spawn_render_thread, LoopStats};
use rtt_engine::rtt::{Config, Result, WindowInfo};
use rtt_engine::{engine_error, engine_info, engine_warn};

const SOURCE: &str = "rtt::demo";

struct ShellApp {
    config: Config,
    scene_window: Option<Window>,
    debug_window: Option<Window>,
    token: CancellationToken,
    telemetry: TelemetrySlot,
    render_thread: Option<JoinHandle<Result<LoopStats>>>,
    next_refresh: Instant,
    exit_code: i32,
}

impl ShellApp {
    fn new(config: Config) -> Self {
        Self {
            config,
            scene_window: None,
            debug_window: None,
            token: CancellationToken::new(),
            telemetry: TelemetrySlot::new(),
            render_thread: None,
            next_refresh: Instant::now(),
            exit_code: 0,
        }
    }

    fn create_windows(&mut self, event_loop: &ActiveEventLoop) -> std::result::Result<(), String> {
        let width = self.config.window.width;
        let height = self.config.window.height;

        let scene_window = event_loop
            .create_window(
                Window::default_attributes()
                    .with_title(self.config.app_name.clone())
                    .with_inner_size(LogicalSize::new(width, height)),
            )
            .map_err(|e| format!("Failed to create scene window: {}", e))?;

        let debug_window = event_loop
            .create_window(
                Window::default_attributes()
                    .with_title("Debug")
                    .with_inner_size(LogicalSize::new(width / 2, height / 2)),
            )
            .map_err(|e| format!("Failed to create debug window: {}", e))?;

        self.config.window = WindowInfo {
            v_sync: false,
            ..WindowInfo::from_window(&scene_window)
        };
        self.scene_window = Some(scene_window);
        self.debug_window = Some(debug_window);
        Ok(())
    }

    fn start_render_thread(&mut self) -> Result<()> {
        self.config.validate()?;
        let device = HeadlessGraphicsDevice::new(&self.config)?;
        let handle = spawn_render_thread(
            Box::new(device),
            self.config.clone(),
            self.telemetry.clone(),
            self.token.clone(),
        )?;
        self.render_thread = Some(handle);
        Ok(())
    }

    /// Stop the render thread, wait for it and record how it ended
    fn join_render_thread(&mut self) {
        self.token.cancel();
        let Some(handle) = self.render_thread.take() else {
            return;
        };
        match handle.join() {
            Ok(Ok(stats)) => {
                engine_info!(SOURCE, "Game exited ({} frames presented, {} dropped)",
                    stats.presented, stats.dropped);
            }
            Ok(Err(e)) => {
                engine_error!(SOURCE, "Render thread failed: {}", e);
                self.exit_code = 1;
            }
            Err(_) => {
                engine_error!(SOURCE, "Render thread panicked");
                self.exit_code = 1;
            }
        }
    }

    fn request_exit(&mut self, event_loop: &ActiveEventLoop) {
        self.join_render_thread();
        event_loop.exit();
    }

    fn refresh_debug_panel(&self) {
        if let (Some(window), Some(snapshot)) = (&self.debug_window, self.telemetry.latest()) {
            window.set_title(&snapshot.title_text());
        }
    }
}

impl ApplicationHandler for ShellApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.scene_window.is_some() {
            return;
        }

        if let Err(message) = self.create_windows(event_loop) {
            engine_error!(SOURCE, "{}", message);
            self.exit_code = 1;
            event_loop.exit();
            return;
        }

        if let Err(e) = self.start_render_thread() {
            engine_error!(SOURCE, "Failed to start render thread: {}", e);
            self.exit_code = 1;
            event_loop.exit();
            return;
        }

        self.next_refresh = Instant::now() + self.config.telemetry_interval;
        event_loop.set_control_flow(ControlFlow::WaitUntil(self.next_refresh));
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                engine_info!(SOURCE, "Close requested, shutting down");
                self.request_exit(event_loop);
            }
            WindowEvent::KeyboardInput {
                event: KeyEvent {
                    logical_key: Key::Named(NamedKey::Escape),
                    state: ElementState::Pressed,
                    ..
                },
                ..
            } => {
                engine_info!(SOURCE, "Escape pressed, shutting down");
                self.request_exit(event_loop);
            }
            WindowEvent::Resized(size) => {
                // Swapchain is sized once at load
                engine_warn!(SOURCE, "Window resized to {}x{}, rendering keeps the original size",
                    size.width, size.height);
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        if self.render_thread.as_ref().is_some_and(|handle| handle.is_finished()) {
            self.request_exit(event_loop);
            return;
        }

        let now = Instant::now();
        if now >= self.next_refresh {
            self.refresh_debug_panel();
            while self.next_refresh <= now {
                self.next_refresh += self.config.telemetry_interval;
            }
        }
        event_loop.set_control_flow(ControlFlow::WaitUntil(self.next_refresh));
    }

    fn exiting(&mut self, _event_loop: &ActiveEventLoop) {
        self.join_render_thread();
    }
}

fn run() -> std::result::Result<i32, EventLoopError> {
    let event_loop = EventLoop::new()?;
    let mut app = ShellApp::new(Config::default());
    event_loop.run_app(&mut app)?;
    Ok(app.exit_code)
}

fn main() {
    engine_info!(SOURCE, "Starting render-to-target demo");

    let code = match run() {
        Ok(code) => code,
        Err(e) => {
            engine_error!(SOURCE, "Event loop error: {}", e);
            1
        }
    };
    std::process::exit(code);
}
