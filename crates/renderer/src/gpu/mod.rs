//! GPU side of the renderer.
//!
//! - `commands` is the explicit bind-state machine every draw goes through.
//! - `device` is the trait seam between the render loop and the hardware.
//! - `context`, `pipeline`, `target` and `backend` implement that trait on
//!   wgpu: surface wiring, cached pipelines, offscreen targets, and replay of
//!   recorded commands into one encoder per frame.
//! - `geometry` and `uniforms` hold the CPU-side layouts of vertex and
//!   uniform data.
//! - `state` is the two-pass [`RenderLoop`].

mod backend;
mod commands;
mod context;
mod device;
mod geometry;
mod pipeline;
mod state;
mod target;
mod uniforms;

pub use backend::WgpuDevice;
pub use commands::{
    BindError, BlendFactor, BlendFunc, BufferId, Command, DrawCall, GraphicsContext, ProgramId,
    RenderTarget, TargetId, TextureBinding, TextureId, Uniform, UniformSlot,
};
pub use device::{GraphicsDevice, ProgramDesc, ProgramOutput};
pub use geometry::{
    full_screen_quad, quad, text_extents, Vertex, VertexAttribute, VertexLayout, QUAD_LAYOUT,
    QUAD_VERTEX_COUNT,
};
pub use state::{LoopPhase, LoopSetup, RenderLoop};
pub use uniforms::ProgramUniforms;
