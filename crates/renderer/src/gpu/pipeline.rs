use std::collections::HashMap;

use crate::error::SetupError;

use super::commands::{BlendFactor, BlendFunc, ProgramId};
use super::geometry::QUAD_LAYOUT;

/// Bind group layouts shared by every program.
pub(crate) struct PipelineLayouts {
    pub uniform_layout: wgpu::BindGroupLayout,
    pub texture_layout: wgpu::BindGroupLayout,
    pub uniform_only: wgpu::PipelineLayout,
    pub textured: wgpu::PipelineLayout,
}

impl PipelineLayouts {
    pub fn new(device: &wgpu::Device) -> Self {
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("program uniform layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("texture unit layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });
        let uniform_only = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("uniform pipeline layout"),
            bind_group_layouts: &[&uniform_layout],
            push_constant_ranges: &[],
        });
        let textured = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("textured pipeline layout"),
            bind_group_layouts: &[&uniform_layout, &texture_layout],
            push_constant_ranges: &[],
        });
        Self {
            uniform_layout,
            texture_layout,
            uniform_only,
            textured,
        }
    }
}

/// Pipelines are specialised per blend state and attachment format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct PipelineKey {
    pub program: ProgramId,
    pub blend: Option<BlendFunc>,
    pub format: wgpu::TextureFormat,
}

/// Compiled shader stages of one program.
pub(crate) struct ProgramModules<'a> {
    pub label: &'a str,
    pub vertex: &'a wgpu::ShaderModule,
    pub fragment: &'a wgpu::ShaderModule,
    pub samples_texture: bool,
}

#[derive(Default)]
pub(crate) struct PipelineCache {
    pipelines: HashMap<PipelineKey, wgpu::RenderPipeline>,
}

impl PipelineCache {
    pub fn get(&self, key: &PipelineKey) -> Option<&wgpu::RenderPipeline> {
        self.pipelines.get(key)
    }

    /// Returns the cached pipeline for `key`, building it on first use.
    pub fn get_or_build(
        &mut self,
        device: &wgpu::Device,
        layouts: &PipelineLayouts,
        key: PipelineKey,
        modules: &ProgramModules<'_>,
    ) -> &wgpu::RenderPipeline {
        self.pipelines.entry(key).or_insert_with(|| {
            tracing::debug!(
                program = modules.label,
                blend = ?key.blend,
                format = ?key.format,
                "building render pipeline"
            );
            build_pipeline(device, layouts, &key, modules)
        })
    }

    /// Builds `key` inside a validation scope so link failures surface at setup.
    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        layouts: &PipelineLayouts,
        key: PipelineKey,
        modules: &ProgramModules<'_>,
    ) -> Result<(), SetupError> {
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let pipeline = build_pipeline(device, layouts, &key, modules);
        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(SetupError::ProgramLink {
                program: modules.label.to_string(),
                message: error.to_string(),
            });
        }
        self.pipelines.insert(key, pipeline);
        Ok(())
    }
}

fn blend_factor(factor: BlendFactor) -> wgpu::BlendFactor {
    match factor {
        BlendFactor::Zero => wgpu::BlendFactor::Zero,
        BlendFactor::One => wgpu::BlendFactor::One,
        BlendFactor::SrcAlpha => wgpu::BlendFactor::SrcAlpha,
        BlendFactor::OneMinusSrcAlpha => wgpu::BlendFactor::OneMinusSrcAlpha,
        BlendFactor::OneMinusDst => wgpu::BlendFactor::OneMinusDst,
    }
}

pub(crate) fn blend_state(blend: BlendFunc) -> wgpu::BlendState {
    let component = wgpu::BlendComponent {
        src_factor: blend_factor(blend.src),
        dst_factor: blend_factor(blend.dst),
        operation: wgpu::BlendOperation::Add,
    };
    wgpu::BlendState {
        color: component,
        alpha: component,
    }
}

fn build_pipeline(
    device: &wgpu::Device,
    layouts: &PipelineLayouts,
    key: &PipelineKey,
    modules: &ProgramModules<'_>,
) -> wgpu::RenderPipeline {
    let attributes = QUAD_LAYOUT.wgpu_attributes();
    let layout = if modules.samples_texture {
        &layouts.textured
    } else {
        &layouts.uniform_only
    };

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(modules.label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: modules.vertex,
            entry_point: Some("main"),
            buffers: &[wgpu::VertexBufferLayout {
                array_stride: QUAD_LAYOUT.stride,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &attributes,
            }],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleStrip,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        fragment: Some(wgpu::FragmentState {
            module: modules.fragment,
            entry_point: Some("main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: key.format,
                blend: key.blend.map(blend_state),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview: None,
        cache: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burn_in_blend_applies_to_colour_and_alpha() {
        let state = blend_state(BlendFunc::BURN_IN);
        assert_eq!(state.color, state.alpha);
        assert_eq!(state.color.src_factor, wgpu::BlendFactor::OneMinusDst);
        assert_eq!(state.color.dst_factor, wgpu::BlendFactor::OneMinusSrcAlpha);
        assert_eq!(state.color.operation, wgpu::BlendOperation::Add);
    }
}
