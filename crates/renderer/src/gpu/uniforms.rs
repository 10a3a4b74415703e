use bytemuck::{Pod, Zeroable};

use super::commands::{Uniform, UniformSlot};

/// CPU mirror of the std140 `ProgramParams` block shared by every program.
///
/// `vec3` members are 16-byte aligned in std140, hence the padded arrays.
#[repr(C, align(16))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProgramUniforms {
    pub time: f32,
    pub aspect: f32,
    pub _padding0: [f32; 2],
    pub bg_col: [f32; 4],
    pub fg_col: [f32; 4],
}

unsafe impl Zeroable for ProgramUniforms {}
unsafe impl Pod for ProgramUniforms {}

impl Default for ProgramUniforms {
    fn default() -> Self {
        Self {
            time: 0.0,
            aspect: 1.0,
            _padding0: [0.0; 2],
            bg_col: [0.0; 4],
            fg_col: [0.0; 4],
        }
    }
}

impl ProgramUniforms {
    /// Stores `value` if the program declares its slot; returns whether it changed.
    pub fn apply(&mut self, declared: &[UniformSlot], value: Uniform) -> bool {
        if !declared.contains(&value.slot()) {
            tracing::trace!(?value, "ignoring uniform the program does not declare");
            return false;
        }
        let before = *self;
        match value {
            Uniform::Time(seconds) => self.time = seconds,
            Uniform::Aspect(aspect) => self.aspect = aspect,
            Uniform::BackgroundColor([r, g, b]) => self.bg_col = [r, g, b, 1.0],
            Uniform::ForegroundColor([r, g, b]) => self.fg_col = [r, g, b, 1.0],
        }
        before != *self
    }

    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}
