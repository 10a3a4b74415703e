use crate::error::SetupError;
use crate::types::Viewport;

use super::pipeline::PipelineLayouts;

/// Colour texture the backdrop and label are composited into before the
/// post pass samples it.
pub(crate) struct OffscreenTarget {
    pub viewport: Viewport,
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub bind_group: wgpu::BindGroup,
}

impl OffscreenTarget {
    /// Allocates and validates a target. Creation runs inside a validation
    /// scope so an unusable attachment is reported here rather than on the
    /// first frame.
    pub fn create(
        device: &wgpu::Device,
        layouts: &PipelineLayouts,
        sampler: &wgpu::Sampler,
        viewport: Viewport,
        format: wgpu::TextureFormat,
    ) -> Result<Self, SetupError> {
        let max_dimension = device.limits().max_texture_dimension_2d;
        let oversized = viewport.width > max_dimension || viewport.height > max_dimension;
        if viewport.is_empty() || oversized {
            return Err(SetupError::IncompleteTarget {
                width: viewport.width,
                height: viewport.height,
                message: format!("extent must be between 1 and {max_dimension}"),
            });
        }

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("offscreen colour target"),
            size: wgpu::Extent3d {
                width: viewport.width,
                height: viewport.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("offscreen target bind group"),
            layout: &layouts.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(sampler),
                },
            ],
        });
        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(SetupError::IncompleteTarget {
                width: viewport.width,
                height: viewport.height,
                message: error.to_string(),
            });
        }

        tracing::debug!(
            width = viewport.width,
            height = viewport.height,
            ?format,
            "created offscreen target"
        );
        Ok(Self {
            viewport,
            texture,
            view,
            bind_group,
        })
    }

    pub fn destroy(self) {
        self.texture.destroy();
    }
}

/// Linear filtering, clamped at the edges.
pub(crate) fn create_clamped_sampler(device: &wgpu::Device, label: &str) -> wgpu::Sampler {
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some(label),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}
