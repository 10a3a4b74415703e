use crate::decal::DecalError;
use crate::gpu::BindError;

/// Failures while bringing the renderer up. All of them are fatal: the
/// window never shows a frame.
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("failed to create rendering surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("failed to find a suitable GPU adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),
    #[error("failed to create GPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    #[error("GPU max texture dimension is {max_dimension}, requested surface is {width}x{height}")]
    SurfaceTooLarge {
        max_dimension: u32,
        width: u32,
        height: u32,
    },
    #[error("{program} {stage} shader failed to compile: {message}")]
    ShaderCompile {
        program: String,
        stage: &'static str,
        message: String,
    },
    #[error("{program} program failed to link: {message}")]
    ProgramLink { program: String, message: String },
    #[error("offscreen target {width}x{height} is incomplete: {message}")]
    IncompleteTarget {
        width: u32,
        height: u32,
        message: String,
    },
    #[error("failed to upload texture {label}: {message}")]
    Texture { label: String, message: String },
    #[error(transparent)]
    Decal(#[from] DecalError),
}

/// Failures while recording or submitting a single frame.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("renderer is not initialised")]
    NotInitialized,
    #[error(transparent)]
    Bind(#[from] BindError),
    #[error(transparent)]
    Surface(#[from] wgpu::SurfaceError),
    #[error("command references unknown {kind} {id}")]
    UnknownResource { kind: &'static str, id: u32 },
}
