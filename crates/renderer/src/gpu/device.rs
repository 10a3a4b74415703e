use crate::decal::DecalImage;
use crate::error::{FrameError, SetupError};
use crate::types::Viewport;

use super::commands::{BlendFunc, BufferId, Command, ProgramId, TargetId, TextureId, UniformSlot};
use super::geometry::Vertex;

/// Which kind of colour attachment a program renders into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramOutput {
    Offscreen,
    Surface,
}

/// Everything needed to build one program.
#[derive(Debug, Clone)]
pub struct ProgramDesc<'a> {
    pub label: &'a str,
    pub vertex_source: &'a str,
    pub fragment_source: &'a str,
    /// Attribute names and the slots they must occupy.
    pub attributes: &'a [(&'a str, u32)],
    /// Uniform slots the fragment stage reads; others are ignored.
    pub uniforms: &'a [UniformSlot],
    /// Whether the fragment stage samples texture unit 0.
    pub samples_texture: bool,
    pub output: ProgramOutput,
    /// Blend state the program is primarily drawn with.
    pub blend: Option<BlendFunc>,
}

/// The GPU operations the render loop needs.
///
/// Resource creation happens outside a frame; [`GraphicsDevice::execute`]
/// replays one frame of recorded commands.
pub trait GraphicsDevice {
    fn create_program(&mut self, desc: &ProgramDesc<'_>) -> Result<ProgramId, SetupError>;

    fn create_vertex_buffer(&mut self, label: &str, vertices: &[Vertex]) -> BufferId;

    /// Overwrites the contents of an existing buffer in place.
    fn write_vertex_buffer(&mut self, buffer: BufferId, vertices: &[Vertex]);

    fn create_texture(&mut self, label: &str, image: &DecalImage) -> Result<TextureId, SetupError>;

    /// Allocates a colour target matching `viewport`, verifying it is usable.
    fn create_target(&mut self, viewport: Viewport) -> Result<TargetId, SetupError>;

    fn destroy_target(&mut self, target: TargetId);

    /// Largest width or height a target or the surface may take.
    fn max_target_dimension(&self) -> u32;

    /// Resizes the drawable surface.
    fn set_viewport(&mut self, viewport: Viewport);

    fn execute(&mut self, commands: &[Command]) -> Result<(), FrameError>;
}
