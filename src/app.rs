// ============================================================================
// app.rs - wavetank
// Windowed driver: winit event-loop handler, GPU setup, and the per-frame
// redraw that runs the pipeline and presents the selected field.
// ============================================================================

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use winit::{
    application::ApplicationHandler,
    event::{ElementState, MouseButton, WindowEvent},
    keyboard::{Key, NamedKey},
    window::{Window, WindowAttributes},
};

use crate::clock::FrameClock;
use crate::config::RunConfig;
use crate::events::InputEvent;
use crate::export;
use crate::frame::FramePipeline;
use crate::hud::{HudRenderer, HudStatus};
use crate::pipeline::{create_display, Display};

// The original field renders on a pink backdrop; anything the grid fails
// to cover shows up immediately.
const CLEAR_COLOR: wgpu::Color = wgpu::Color {
    r: 1.0,
    g: 0.753,
    b: 0.796,
    a: 1.0,
};

// ======================== Application ========================

pub struct App {
    state: Option<AppState>,
    config: RunConfig,
}

struct AppState {
    // GPU
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,

    // Simulation & display
    config: RunConfig,
    pipeline: FramePipeline,
    display: Display,

    // Window
    window: Arc<Window>,

    // Input
    cursor: Option<(f64, f64)>,

    // HUD
    hud: HudRenderer,
    extended_hud: bool,
    screenshot_requested: bool,

    // Timing
    started: Instant,
    last_redraw: Instant,
    fps: f32,
    last_dt: f32,
}

impl App {
    pub fn new(config: RunConfig) -> Self {
        Self {
            state: None,
            config,
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &winit::event_loop::ActiveEventLoop) {
        if self.state.is_some() {
            return;
        }

        let window_attrs = WindowAttributes::default()
            .with_title(format!("wavetank - {}", self.config.sim.label()))
            .with_inner_size(winit::dpi::LogicalSize::new(900u32, 900u32));

        let window = Arc::new(event_loop.create_window(window_attrs).unwrap());

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = instance.create_surface(window.clone()).unwrap();

        let (device, queue, surface_config) =
            pollster::block_on(init_gpu(&instance, &surface, &window, self.config.vsync));

        surface.configure(&device, &surface_config);

        let clock = FrameClock::new(
            self.config.time_base(),
            self.config.time_scale,
            self.config.effective_max_dt(),
        );
        let pipeline = FramePipeline::new(self.config.build_sim(), clock, 0.0);
        let display = create_display(&device, surface_config.format, &self.config);
        // The selector uniform starts in sync with the selection.
        display.set_chosen_field(&queue, pipeline.selection_index());
        let hud = HudRenderer::new(&device, &queue, surface_config.format);

        log::info!(
            "wavetank initialized: {} {}x{}, step cap {:.4}s, time scale {:.3}",
            self.config.sim.label(),
            self.config.width,
            self.config.height,
            self.config.effective_max_dt(),
            self.config.time_scale,
        );

        self.state = Some(AppState {
            device,
            queue,
            surface,
            surface_config,
            config: self.config.clone(),
            pipeline,
            display,
            window: window.clone(),
            cursor: None,
            hud,
            extended_hud: false,
            screenshot_requested: false,
            started: Instant::now(),
            last_redraw: Instant::now(),
            fps: 0.0,
            last_dt: 0.0,
        });

        // Initial redraw is required on macOS with winit 0.30
        window.request_redraw();
    }

    fn about_to_wait(&mut self, _event_loop: &winit::event_loop::ActiveEventLoop) {
        if let Some(state) = &self.state {
            state.window.request_redraw();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &winit::event_loop::ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let Some(state) = &mut self.state else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),

            WindowEvent::KeyboardInput { event, .. } => {
                handle_keyboard(state, event_loop, &event);
            }

            WindowEvent::CursorMoved { position, .. } => {
                state.cursor = Some((position.x, position.y));
            }

            WindowEvent::MouseInput {
                state: ElementState::Pressed,
                button: MouseButton::Left,
                ..
            } => {
                if let Some((cx, cy)) = state.cursor {
                    // Window y grows downward; the field's does not.
                    let w = f64::from(state.surface_config.width).max(1.0);
                    let h = f64::from(state.surface_config.height).max(1.0);
                    let x = (cx / w).clamp(0.0, 1.0) as f32;
                    let y = (1.0 - cy / h).clamp(0.0, 1.0) as f32;
                    state.pipeline.push(InputEvent::Reseed { x, y });
                }
            }

            WindowEvent::Resized(new_size) => {
                if new_size.width > 0 && new_size.height > 0 {
                    state.surface_config.width = new_size.width;
                    state.surface_config.height = new_size.height;
                    state.surface.configure(&state.device, &state.surface_config);
                }
            }

            WindowEvent::RedrawRequested => {
                redraw(state);
            }

            _ => {}
        }
    }
}

// ======================== GPU Initialization ========================

async fn init_gpu(
    instance: &wgpu::Instance,
    surface: &wgpu::Surface<'_>,
    window: &Window,
    vsync: bool,
) -> (wgpu::Device, wgpu::Queue, wgpu::SurfaceConfiguration) {
    let adapter = instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: Some(surface),
            force_fallback_adapter: false,
        })
        .await
        .expect(
            "Failed to find a suitable GPU adapter.\n\
             wavetank requires a GPU with Vulkan, Metal, or DX12 support.",
        );

    log::info!("GPU: {}", adapter.get_info().name);

    let (device, queue) = adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                label: Some("wavetank_device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default(),
                memory_hints: Default::default(),
            },
            None,
        )
        .await
        .expect("Failed to create device");

    let size = window.inner_size();
    let surface_caps = surface.get_capabilities(&adapter);
    let surface_format = surface_caps
        .formats
        .iter()
        .find(|f| f.is_srgb())
        .copied()
        .unwrap_or(surface_caps.formats[0]);

    // Fifo when vsync is on; otherwise Mailbox (uncapped, no tearing) if
    // available, else Immediate, else Fifo anyway.
    let present_mode = if vsync {
        wgpu::PresentMode::Fifo
    } else if surface_caps
        .present_modes
        .contains(&wgpu::PresentMode::Mailbox)
    {
        log::info!("Present mode: Mailbox (uncapped FPS)");
        wgpu::PresentMode::Mailbox
    } else if surface_caps
        .present_modes
        .contains(&wgpu::PresentMode::Immediate)
    {
        log::info!("Present mode: Immediate (uncapped FPS)");
        wgpu::PresentMode::Immediate
    } else {
        log::info!("Present mode: Fifo (VSync ON)");
        wgpu::PresentMode::Fifo
    };

    let surface_config = wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format: surface_format,
        width: size.width.max(1),
        height: size.height.max(1),
        present_mode,
        alpha_mode: surface_caps.alpha_modes[0],
        view_formats: vec![],
        desired_maximum_frame_latency: 2,
    };

    (device, queue, surface_config)
}

// ======================== Keyboard Handling ========================

fn handle_keyboard(
    state: &mut AppState,
    event_loop: &winit::event_loop::ActiveEventLoop,
    event: &winit::event::KeyEvent,
) {
    if !event.state.is_pressed() || event.repeat {
        return;
    }

    match &event.logical_key {
        Key::Named(NamedKey::Escape) => event_loop.exit(),
        Key::Named(NamedKey::Space) => state.pipeline.push(InputEvent::TogglePause),

        Key::Character(c) => match c.as_str() {
            "c" | "C" => state.pipeline.push(InputEvent::CycleField),
            "h" | "H" => state.extended_hud = !state.extended_hud,
            "p" | "P" => state.screenshot_requested = true,
            _ => {}
        },

        _ => {}
    }
}

// ======================== Frame Rendering ========================

fn redraw(state: &mut AppState) {
    // FPS (exponential moving average)
    let now_instant = Instant::now();
    let frame_gap = now_instant
        .duration_since(state.last_redraw)
        .as_secs_f32()
        .max(0.0001);
    state.last_redraw = now_instant;
    state.fps = state.fps * 0.95 + (1.0 / frame_gap) * 0.05;

    // Drain inputs, clock the frame, advance the simulation.
    let now = state.started.elapsed().as_secs_f64();
    let report = state.pipeline.frame(now);
    if report.advanced {
        state.last_dt = report.dt;
    }
    if report.selection_changed {
        state
            .display
            .set_chosen_field(&state.queue, state.pipeline.selection_index());
        log::info!("Displaying field '{}'", state.pipeline.output_name());
    }

    // Take this frame's view and stage the upload. The same view feeds the
    // PNG export, so what lands on disk is exactly what is on screen.
    {
        let view = state.pipeline.field();
        state.display.upload(&state.queue, view);

        if state.screenshot_requested {
            state.screenshot_requested = false;
            let path = export::timestamped_path(Path::new("."), state.pipeline.output_name());
            match export::save_field_png(view, &path) {
                Ok(()) => log::info!("Saved field to {}", path.display()),
                Err(err) => log::error!("Field export failed: {}", err),
            }
        }
    }

    let win_w = state.surface_config.width;
    let win_h = state.surface_config.height;
    let status = HudStatus {
        sim_label: state.config.sim.label(),
        width: state.config.width,
        height: state.config.height,
        field_name: state.pipeline.output_name(),
        fps: state.fps,
        dt: state.last_dt,
        max_dt: state.pipeline.max_dt(),
        behind: report.overrun,
        overrun_episodes: state.pipeline.overrun_episodes(),
        overrun_frames: state.pipeline.overrun_frames(),
        paused: state.pipeline.paused(),
        frame: state.pipeline.frame_count(),
        extended: state.extended_hud,
    };
    state
        .hud
        .prepare(&state.device, &state.queue, &status, win_w, win_h);

    let output = match state.surface.get_current_texture() {
        Ok(t) => t,
        Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
            state.surface.configure(&state.device, &state.surface_config);
            return;
        }
        Err(e) => {
            log::error!("Surface error: {:?}", e);
            return;
        }
    };

    let view = output
        .texture
        .create_view(&wgpu::TextureViewDescriptor::default());

    let mut encoder = state
        .device
        .create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("frame_encoder"),
        });

    {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("frame_pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(CLEAR_COLOR),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        state.display.draw(&mut pass);
        state.hud.render(&mut pass);
    }

    state.queue.submit(std::iter::once(encoder.finish()));
    output.present();
    state.hud.trim();

    // Buffer roles flip only after the frame that showed the old state.
    state.pipeline.swap();

    state.window.request_redraw();
}
