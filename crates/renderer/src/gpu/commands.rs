//! Explicit bind-state recorder.
//!
//! Draws never read state nobody set: [`GraphicsContext`] tracks the bound
//! target, program, vertex buffer, texture and blend, refuses to draw when
//! any required piece is missing, and snapshots the full state into each
//! [`DrawCall`] so the executor never consults ambient state.

use super::geometry::VertexLayout;

/// Handle to a linked shader program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramId(pub u32);

/// Handle to a vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub u32);

/// Handle to an uploaded texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

/// Handle to an offscreen colour target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(pub u32);

/// Where draws land.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderTarget {
    /// The window surface.
    Default,
    Offscreen(TargetId),
}

/// A texture source for the sampler on unit 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureBinding {
    Texture(TextureId),
    /// The colour attachment of an offscreen target.
    Target(TargetId),
}

/// Blend factors the renderer uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcAlpha,
    OneMinusSrcAlpha,
    OneMinusDst,
}

/// Source/destination factors applied to colour and alpha alike with an
/// additive equation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendFunc {
    pub src: BlendFactor,
    pub dst: BlendFactor,
}

impl BlendFunc {
    /// Inverts the destination under the decal's coverage:
    /// `out = src * (1 - dst) + dst * (1 - src.a)`.
    pub const BURN_IN: Self = Self {
        src: BlendFactor::OneMinusDst,
        dst: BlendFactor::OneMinusSrcAlpha,
    };
}

/// Named uniform slots a program can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformSlot {
    Time,
    Aspect,
    BackgroundColor,
    ForegroundColor,
}

/// A value destined for the current program's uniform slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Uniform {
    /// Seconds.
    Time(f32),
    Aspect(f32),
    BackgroundColor([f32; 3]),
    ForegroundColor([f32; 3]),
}

impl Uniform {
    pub fn slot(&self) -> UniformSlot {
        match self {
            Uniform::Time(_) => UniformSlot::Time,
            Uniform::Aspect(_) => UniformSlot::Aspect,
            Uniform::BackgroundColor(_) => UniformSlot::BackgroundColor,
            Uniform::ForegroundColor(_) => UniformSlot::ForegroundColor,
        }
    }
}

/// Complete state a draw executes with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawCall {
    pub target: RenderTarget,
    pub program: ProgramId,
    pub buffer: BufferId,
    pub layout: VertexLayout,
    pub texture: Option<TextureBinding>,
    pub blend: Option<BlendFunc>,
    pub vertex_count: u32,
}

/// One recorded state change or draw.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    BindTarget(RenderTarget),
    Clear([f32; 4]),
    UseProgram(ProgramId),
    SetUniform { program: ProgramId, value: Uniform },
    BindVertexBuffer(BufferId),
    AssignAttributes { buffer: BufferId, layout: VertexLayout },
    BindTexture(Option<TextureBinding>),
    SetBlend(Option<BlendFunc>),
    Draw(DrawCall),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BindError {
    #[error("draw issued with no render target bound")]
    NoTarget,
    #[error("draw issued with no program in use")]
    NoProgram,
    #[error("uniform set with no program in use")]
    UniformWithoutProgram,
    #[error("draw issued with no vertex buffer bound")]
    NoVertexBuffer,
    #[error("attributes for buffer {0:?} were not assigned after it was bound")]
    StaleAttributes(BufferId),
}

/// Records commands for a frame while tracking what is currently bound.
///
/// Binding a vertex buffer invalidates the attribute assignment, so every
/// draw must be preceded by [`GraphicsContext::assign_attributes`] for the
/// buffer it uses.
#[derive(Debug, Default)]
pub struct GraphicsContext {
    target: Option<RenderTarget>,
    program: Option<ProgramId>,
    buffer: Option<BufferId>,
    layout: Option<VertexLayout>,
    texture: Option<TextureBinding>,
    blend: Option<BlendFunc>,
    commands: Vec<Command>,
}

impl GraphicsContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind_target(&mut self, target: RenderTarget) {
        self.target = Some(target);
        self.commands.push(Command::BindTarget(target));
    }

    pub fn clear(&mut self, color: [f32; 4]) -> Result<(), BindError> {
        if self.target.is_none() {
            return Err(BindError::NoTarget);
        }
        self.commands.push(Command::Clear(color));
        Ok(())
    }

    pub fn use_program(&mut self, program: ProgramId) {
        self.program = Some(program);
        self.commands.push(Command::UseProgram(program));
    }

    /// Sets a uniform on the program currently in use.
    pub fn set_uniform(&mut self, value: Uniform) -> Result<(), BindError> {
        let program = self.program.ok_or(BindError::UniformWithoutProgram)?;
        self.commands.push(Command::SetUniform { program, value });
        Ok(())
    }

    pub fn bind_vertex_buffer(&mut self, buffer: BufferId) {
        self.buffer = Some(buffer);
        self.layout = None;
        self.commands.push(Command::BindVertexBuffer(buffer));
    }

    /// Points the attribute slots at the bound buffer.
    pub fn assign_attributes(&mut self, layout: VertexLayout) -> Result<(), BindError> {
        let buffer = self.buffer.ok_or(BindError::NoVertexBuffer)?;
        self.layout = Some(layout);
        self.commands.push(Command::AssignAttributes { buffer, layout });
        Ok(())
    }

    pub fn bind_texture(&mut self, texture: Option<TextureBinding>) {
        self.texture = texture;
        self.commands.push(Command::BindTexture(texture));
    }

    pub fn set_blend(&mut self, blend: Option<BlendFunc>) {
        self.blend = blend;
        self.commands.push(Command::SetBlend(blend));
    }

    pub fn draw_strip(&mut self, vertex_count: u32) -> Result<(), BindError> {
        let target = self.target.ok_or(BindError::NoTarget)?;
        let program = self.program.ok_or(BindError::NoProgram)?;
        let buffer = self.buffer.ok_or(BindError::NoVertexBuffer)?;
        let layout = self.layout.ok_or(BindError::StaleAttributes(buffer))?;
        self.commands.push(Command::Draw(DrawCall {
            target,
            program,
            buffer,
            layout,
            texture: self.texture,
            blend: self.blend,
            vertex_count,
        }));
        Ok(())
    }

    pub fn target(&self) -> Option<RenderTarget> {
        self.target
    }

    pub fn blend(&self) -> Option<BlendFunc> {
        self.blend
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Drains recorded commands; bound state carries over to the next frame.
    pub fn take_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    /// Forgets resources that no longer exist, such as a destroyed target.
    pub fn forget_target(&mut self, target: TargetId) {
        if self.target == Some(RenderTarget::Offscreen(target)) {
            self.target = None;
        }
        if self.texture == Some(TextureBinding::Target(target)) {
            self.texture = None;
        }
    }
}
