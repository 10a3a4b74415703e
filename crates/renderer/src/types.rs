use std::path::PathBuf;

/// Fixed pixel width of the rasterized text decal.
pub const DECAL_WIDTH: u32 = 700;
/// Fixed pixel height of the rasterized text decal.
pub const DECAL_HEIGHT: u32 = 300;

/// Clear colour used by both passes before drawing.
pub const CLEAR_COLOR: [f32; 4] = [0.6, 0.7, 0.8, 1.0];

/// Drawable area in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Minimised windows report a zero extent; nothing can be rendered into them.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn aspect(&self) -> f32 {
        self.width.max(1) as f32 / self.height.max(1) as f32
    }
}

impl From<winit::dpi::PhysicalSize<u32>> for Viewport {
    fn from(size: winit::dpi::PhysicalSize<u32>) -> Self {
        Self::new(size.width, size.height)
    }
}

/// Output color handling for the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorSpaceMode {
    /// Pass shader values straight through to a non-sRGB swapchain.
    #[default]
    Auto,
    /// Treat shader outputs as gamma-encoded; use non-sRGB surfaces.
    Gamma,
    /// Treat shader outputs as linear and use sRGB swapchains/targets for conversion.
    Linear,
}

impl std::fmt::Display for ColorSpaceMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColorSpaceMode::Auto => f.write_str("auto"),
            ColorSpaceMode::Gamma => f.write_str("gamma"),
            ColorSpaceMode::Linear => f.write_str("linear"),
        }
    }
}

/// Adapter power preference forwarded to `wgpu`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GpuPowerPreference {
    #[default]
    Low,
    High,
}

impl std::fmt::Display for GpuPowerPreference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GpuPowerPreference::Low => f.write_str("low"),
            GpuPowerPreference::High => f.write_str("high"),
        }
    }
}

/// Immutable configuration passed to the renderer at start-up.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Initial window size in physical pixels.
    pub surface_size: (u32, u32),
    /// Window title.
    pub title: String,
    /// Text burned into the backdrop.
    pub label: String,
    /// Explicit font file; when absent well-known system fonts are probed.
    pub font_path: Option<PathBuf>,
    /// Optional FPS cap; None renders on every redraw opportunity.
    pub target_fps: Option<f32>,
    /// Seed for the palette; None draws from the thread RNG.
    pub palette_seed: Option<u64>,
    /// Desired color handling for swapchain/targets.
    pub color_space: ColorSpaceMode,
    /// Adapter power preference.
    pub gpu_power: GpuPowerPreference,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            surface_size: (1280, 720),
            title: "cloudmark".to_string(),
            label: "Абоба".to_string(),
            font_path: None,
            target_fps: Some(60.0),
            palette_seed: None,
            color_space: ColorSpaceMode::default(),
            gpu_power: GpuPowerPreference::default(),
        }
    }
}

/// Description of an adapter, kept for diagnostics.
#[derive(Debug, Clone)]
pub struct AdapterProfile {
    pub name: String,
    pub backend: wgpu::Backend,
    pub device_type: wgpu::DeviceType,
    pub max_texture_dimension_2d: u32,
}

impl AdapterProfile {
    pub fn from_wgpu(info: &wgpu::AdapterInfo, limits: &wgpu::Limits) -> Self {
        Self {
            name: info.name.clone(),
            backend: info.backend,
            device_type: info.device_type,
            max_texture_dimension_2d: limits.max_texture_dimension_2d,
        }
    }

    pub fn is_software(&self) -> bool {
        matches!(self.device_type, wgpu::DeviceType::Cpu)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aspect_tracks_width_over_height() {
        assert!((Viewport::new(800, 600).aspect() - 4.0 / 3.0).abs() < 1e-6);
        assert!((Viewport::new(1000, 500).aspect() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn zero_extent_viewport_is_empty() {
        assert!(Viewport::new(0, 600).is_empty());
        assert!(Viewport::new(800, 0).is_empty());
        assert!(!Viewport::new(1, 1).is_empty());
    }
}
