use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use tracing::{debug, error, info, warn};
use winit::dpi::PhysicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::{Window, WindowBuilder};

use crate::error::FrameError;
use crate::gpu::{LoopSetup, RenderLoop, WgpuDevice};
use crate::runtime::{FrameClock, FrameScheduler};
use crate::types::{RendererConfig, Viewport};

/// Window plus the render loop drawing into it.
pub(crate) struct WindowState {
    window: Arc<Window>,
    render_loop: RenderLoop<WgpuDevice>,
}

/// What the event loop should do after a frame attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameOutcome {
    Presented,
    Skipped,
    Exit,
}

impl WindowState {
    pub(crate) fn new(
        window: Arc<Window>,
        config: &RendererConfig,
        setup: LoopSetup,
    ) -> Result<Self> {
        let device = WgpuDevice::new(
            window.clone(),
            setup.viewport,
            config.color_space,
            config.gpu_power,
        )
        .context("failed to initialise GPU")?;
        let profile = device.adapter_profile();
        info!(
            adapter = %profile.name,
            backend = ?profile.backend,
            "initialised GPU surface {}x{}",
            setup.viewport.width,
            setup.viewport.height
        );

        let mut render_loop = RenderLoop::new(device, setup);
        render_loop
            .initialize()
            .context("failed to initialise render loop")?;
        Ok(Self {
            window,
            render_loop,
        })
    }

    pub(crate) fn window(&self) -> &Window {
        self.window.as_ref()
    }

    pub(crate) fn resize(&mut self, new_size: PhysicalSize<u32>) -> Result<()> {
        self.render_loop
            .resize(new_size.width, new_size.height)
            .context("failed to resize render targets")
    }

    fn render_frame(&mut self, timestamp_ms: f64) -> FrameOutcome {
        match self.render_loop.render_frame(timestamp_ms) {
            Ok(()) => FrameOutcome::Presented,
            Err(FrameError::Surface(surface_err)) => match surface_err {
                wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
                    debug!(error = %surface_err, "surface needs reconfiguring");
                    self.render_loop.device_mut().reconfigure_surface();
                    FrameOutcome::Skipped
                }
                wgpu::SurfaceError::OutOfMemory => {
                    error!("surface out of memory; exiting");
                    FrameOutcome::Exit
                }
                wgpu::SurfaceError::Timeout => {
                    warn!("surface timeout; retrying next frame");
                    FrameOutcome::Skipped
                }
                other => {
                    warn!(error = ?other, "surface error; retrying next frame");
                    FrameOutcome::Skipped
                }
            },
            Err(err) => {
                error!(error = %err, "failed to render frame");
                FrameOutcome::Exit
            }
        }
    }
}

/// Opens the window and drives the winit event loop until it closes.
///
/// Each redraw renders one frame; the next redraw is requested from
/// `AboutToWait` once the [`FrameScheduler`] allows it.
pub(crate) fn run_window(config: &RendererConfig, setup: LoopSetup) -> Result<()> {
    let event_loop = EventLoop::new().context("failed to initialize event loop")?;
    let window_size = PhysicalSize::new(setup.viewport.width, setup.viewport.height);
    let window = WindowBuilder::new()
        .with_title(config.title.as_str())
        .with_inner_size(window_size)
        .build(&event_loop)
        .context("failed to create window")?;
    let window = Arc::new(window);

    let mut setup = setup;
    let actual = Viewport::from(window.inner_size());
    if !actual.is_empty() {
        setup.viewport = actual;
    }

    let mut state = WindowState::new(window, config, setup)?;
    let mut clock = FrameClock::system();
    let mut scheduler = FrameScheduler::new(config.target_fps);
    let mut fatal: Option<anyhow::Error> = None;
    state.window().request_redraw();

    let run_result = event_loop.run(|event, elwt| match event {
        Event::WindowEvent { window_id, event } if window_id == state.window().id() => {
            match event {
                WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                    elwt.exit();
                }
                WindowEvent::Resized(new_size) => {
                    if let Err(err) = state.resize(new_size) {
                        error!(error = %err, "resize failed");
                        fatal = Some(err);
                        elwt.exit();
                    }
                }
                WindowEvent::RedrawRequested => match state.render_frame(clock.sample()) {
                    FrameOutcome::Presented => scheduler.mark_rendered(Instant::now()),
                    FrameOutcome::Skipped => {}
                    FrameOutcome::Exit => {
                        fatal = Some(anyhow!("rendering stopped after an unrecoverable error"));
                        elwt.exit();
                    }
                },
                _ => {}
            }
        }
        Event::AboutToWait => {
            let now = Instant::now();
            if scheduler.ready_for_frame(now) {
                tracing::trace!("scheduler: issuing redraw now");
                state.window().request_redraw();
                elwt.set_control_flow(ControlFlow::Wait);
            } else if let Some(deadline) = scheduler.next_deadline() {
                tracing::trace!(
                    deadline_ms = deadline.saturating_duration_since(now).as_millis(),
                    "scheduler: waiting until next frame"
                );
                elwt.set_control_flow(ControlFlow::WaitUntil(deadline));
            } else {
                elwt.set_control_flow(ControlFlow::Wait);
            }
        }
        _ => {}
    });

    if let Err(err) = run_result {
        return Err(anyhow!("window event loop error: {err}"));
    }
    match fatal {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
