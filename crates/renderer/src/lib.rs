//! Renderer crate for cloudmark.
//!
//! Draws an animated value-noise backdrop with a text label burned into it,
//! then warps the result onto a window surface. The overall flow is:
//!
//! ```text
//!   CLI / cloudmark
//!          │ RendererConfig
//!          ▼
//!   Renderer::run ──▶ decal + palette ──▶ WindowState ──▶ winit event loop
//!                                              │
//!                                              └─▶ RenderLoop::render_frame()
//!                                                    │ GraphicsContext commands
//!                                                    ▼
//!                                                WgpuDevice::execute()
//! ```
//!
//! `RenderLoop` owns every GPU resource through a [`gpu::GraphicsDevice`];
//! draws are recorded through [`gpu::GraphicsContext`] so that each one
//! carries the full bind state it needs. The noise shader has a CPU mirror
//! in [`noise`].

mod compile;
pub mod color;
pub mod decal;
mod error;
pub mod gpu;
pub mod noise;
pub mod runtime;
pub mod types;
mod window;

pub use color::{hsl_to_rgb, Palette};
pub use compile::{
    ATTRIBUTE_BINDINGS, BACKDROP_FRAGMENT_GLSL, POST_FRAGMENT_GLSL, QUAD_VERTEX_GLSL,
    TEXT_FRAGMENT_GLSL,
};
pub use decal::{DecalError, DecalImage, FontDecalSource, TextDecalSource};
pub use error::{FrameError, SetupError};
pub use gpu::{LoopSetup, RenderLoop};
pub use types::{
    AdapterProfile, ColorSpaceMode, GpuPowerPreference, RendererConfig, Viewport, CLEAR_COLOR,
    DECAL_HEIGHT, DECAL_WIDTH,
};

use anyhow::{Context, Result};

/// High-level entry point that owns the chosen configuration.
pub struct Renderer {
    config: RendererConfig,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Rasterizes the label, draws the palette and runs the window until it
    /// is closed. Setup failures are logged and returned before any frame.
    pub fn run(&self) -> Result<()> {
        let setup = self.prepare().map_err(|err| {
            tracing::error!(error = %err, "renderer setup failed");
            err
        })?;
        window::run_window(&self.config, setup).map_err(|err| {
            tracing::error!(error = %format!("{err:#}"), "renderer stopped");
            err
        })
    }

    /// Builds everything the render loop needs that does not touch the GPU.
    pub fn prepare(&self) -> Result<LoopSetup> {
        let source = FontDecalSource::discover(self.config.font_path.as_deref())
            .map_err(SetupError::from)
            .context("failed to load label font")?;
        let decal = source
            .rasterize(&self.config.label)
            .map_err(SetupError::from)
            .context("failed to rasterize label")?;

        let palette = Palette::from_seed(self.config.palette_seed);
        tracing::debug!(
            background = ?palette.background,
            foreground = ?palette.foreground,
            seed = ?self.config.palette_seed,
            "generated palette"
        );

        let (width, height) = self.config.surface_size;
        Ok(LoopSetup {
            viewport: Viewport::new(width.max(1), height.max(1)),
            palette,
            decal,
        })
    }
}
