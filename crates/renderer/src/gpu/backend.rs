use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;
use wgpu::naga::ShaderStage;
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::compile::{check_attribute_bindings, compile_stage};
use crate::decal::DecalImage;
use crate::error::{FrameError, SetupError};
use crate::types::{AdapterProfile, ColorSpaceMode, GpuPowerPreference, Viewport};

use super::commands::{
    BufferId, Command, DrawCall, ProgramId, RenderTarget, TargetId, TextureBinding, TextureId,
    UniformSlot,
};
use super::context::GpuContext;
use super::device::{GraphicsDevice, ProgramDesc, ProgramOutput};
use super::geometry::Vertex;
use super::pipeline::{PipelineCache, PipelineKey, PipelineLayouts, ProgramModules};
use super::target::{create_clamped_sampler, OffscreenTarget};
use super::uniforms::ProgramUniforms;

struct ProgramResources {
    label: String,
    vertex: wgpu::ShaderModule,
    fragment: wgpu::ShaderModule,
    uniforms: Vec<UniformSlot>,
    samples_texture: bool,
    values: ProgramUniforms,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
}

impl ProgramResources {
    fn modules(&self) -> ProgramModules<'_> {
        ProgramModules {
            label: &self.label,
            vertex: &self.vertex,
            fragment: &self.fragment,
            samples_texture: self.samples_texture,
        }
    }
}

struct DecalTexture {
    _texture: wgpu::Texture,
    bind_group: wgpu::BindGroup,
}

fn unknown(kind: &'static str, id: u32) -> FrameError {
    FrameError::UnknownResource { kind, id }
}

/// Draws recorded between two target binds.
struct PassPlan {
    target: RenderTarget,
    clear: Option<[f32; 4]>,
    draws: Vec<DrawCall>,
}

/// [`GraphicsDevice`] backed by a wgpu surface.
pub struct WgpuDevice {
    context: GpuContext,
    layouts: PipelineLayouts,
    sampler: wgpu::Sampler,
    programs: Vec<ProgramResources>,
    buffers: Vec<wgpu::Buffer>,
    textures: Vec<DecalTexture>,
    targets: HashMap<TargetId, OffscreenTarget>,
    next_target: u32,
    pipelines: PipelineCache,
    frames_since_last_update: u32,
    last_fps_update: Instant,
}

impl WgpuDevice {
    pub fn new(
        window: Arc<Window>,
        viewport: Viewport,
        color_space: ColorSpaceMode,
        gpu_power: GpuPowerPreference,
    ) -> Result<Self, SetupError> {
        let context = GpuContext::new(window, viewport, color_space, gpu_power)?;
        let layouts = PipelineLayouts::new(&context.device);
        let sampler = create_clamped_sampler(&context.device, "texture unit sampler");
        Ok(Self {
            context,
            layouts,
            sampler,
            programs: Vec::new(),
            buffers: Vec::new(),
            textures: Vec::new(),
            targets: HashMap::new(),
            next_target: 0,
            pipelines: PipelineCache::default(),
            frames_since_last_update: 0,
            last_fps_update: Instant::now(),
        })
    }

    pub fn adapter_profile(&self) -> &AdapterProfile {
        &self.context.adapter_profile
    }

    /// Reconfigures a lost or outdated surface at its current size.
    pub fn reconfigure_surface(&mut self) {
        self.context.reconfigure();
    }

    fn format_for(&self, target: RenderTarget) -> wgpu::TextureFormat {
        match target {
            RenderTarget::Default => self.context.surface_format,
            RenderTarget::Offscreen(_) => self.context.color_space.target_format(),
        }
    }

    fn program(&self, id: ProgramId) -> Result<&ProgramResources, FrameError> {
        self.programs
            .get(id.0 as usize)
            .ok_or_else(|| unknown("program", id.0))
    }

    fn texture_bind_group(&self, binding: TextureBinding) -> Result<&wgpu::BindGroup, FrameError> {
        match binding {
            TextureBinding::Texture(id) => self
                .textures
                .get(id.0 as usize)
                .map(|texture| &texture.bind_group)
                .ok_or_else(|| unknown("texture", id.0)),
            TextureBinding::Target(id) => self
                .targets
                .get(&id)
                .map(|target| &target.bind_group)
                .ok_or_else(|| unknown("target", id.0)),
        }
    }

    fn plan_passes(&mut self, commands: &[Command]) -> Result<Vec<PassPlan>, FrameError> {
        let mut plans: Vec<PassPlan> = Vec::new();
        for command in commands {
            match command {
                Command::BindTarget(target) => plans.push(PassPlan {
                    target: *target,
                    clear: None,
                    draws: Vec::new(),
                }),
                Command::Clear(color) => match plans.last_mut() {
                    Some(plan) if plan.draws.is_empty() => plan.clear = Some(*color),
                    Some(plan) => {
                        let target = plan.target;
                        plans.push(PassPlan {
                            target,
                            clear: Some(*color),
                            draws: Vec::new(),
                        });
                    }
                    None => return Err(crate::gpu::BindError::NoTarget.into()),
                },
                Command::SetUniform { program, value } => {
                    let queue = &self.context.queue;
                    let resources = self
                        .programs
                        .get_mut(program.0 as usize)
                        .ok_or_else(|| unknown("program", program.0))?;
                    if resources.values.apply(&resources.uniforms, *value) {
                        let bytes = resources.values.as_bytes();
                        queue.write_buffer(&resources.uniform_buffer, 0, bytes);
                    }
                }
                Command::Draw(call) => match plans.last_mut() {
                    Some(plan) => plan.draws.push(*call),
                    None => return Err(crate::gpu::BindError::NoTarget.into()),
                },
                Command::UseProgram(_)
                | Command::BindVertexBuffer(_)
                | Command::AssignAttributes { .. }
                | Command::BindTexture(_)
                | Command::SetBlend(_) => {}
            }
        }
        Ok(plans)
    }

    fn prepare_pipelines(&mut self, plans: &[PassPlan]) -> Result<(), FrameError> {
        for plan in plans {
            let format = self.format_for(plan.target);
            for call in &plan.draws {
                let key = PipelineKey {
                    program: call.program,
                    blend: call.blend,
                    format,
                };
                let program = self
                    .programs
                    .get(call.program.0 as usize)
                    .ok_or_else(|| unknown("program", call.program.0))?;
                self.pipelines
                    .get_or_build(&self.context.device, &self.layouts, key, &program.modules());
            }
        }
        Ok(())
    }

    fn encode_pass(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        plan: &PassPlan,
        surface_view: Option<&wgpu::TextureView>,
    ) -> Result<(), FrameError> {
        let view = match plan.target {
            RenderTarget::Default => surface_view.ok_or(FrameError::NotInitialized)?,
            RenderTarget::Offscreen(id) => {
                &self
                    .targets
                    .get(&id)
                    .ok_or_else(|| unknown("target", id.0))?
                    .view
            }
        };
        let load = match plan.clear {
            Some([r, g, b, a]) => wgpu::LoadOp::Clear(wgpu::Color {
                r: r as f64,
                g: g as f64,
                b: b as f64,
                a: a as f64,
            }),
            None => wgpu::LoadOp::Load,
        };
        let format = self.format_for(plan.target);

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("cloudmark pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                depth_slice: None,
                resolve_target: None,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        for call in &plan.draws {
            let key = PipelineKey {
                program: call.program,
                blend: call.blend,
                format,
            };
            let program = self.program(call.program)?;
            let pipeline = self
                .pipelines
                .get(&key)
                .ok_or_else(|| unknown("pipeline", call.program.0))?;
            let buffer = self
                .buffers
                .get(call.buffer.0 as usize)
                .ok_or_else(|| unknown("buffer", call.buffer.0))?;

            render_pass.set_pipeline(pipeline);
            render_pass.set_bind_group(0, &program.uniform_bind_group, &[]);
            if program.samples_texture {
                let binding = call
                    .texture
                    .ok_or_else(|| unknown("texture unit", 0))?;
                render_pass.set_bind_group(1, self.texture_bind_group(binding)?, &[]);
            }
            render_pass.set_vertex_buffer(0, buffer.slice(..));
            render_pass.draw(0..call.vertex_count, 0..1);
        }
        Ok(())
    }

    fn record_frame_stats(&mut self) {
        let now = Instant::now();
        self.frames_since_last_update += 1;
        let elapsed = now.saturating_duration_since(self.last_fps_update);
        if elapsed >= Duration::from_secs(1) {
            let fps = self.frames_since_last_update as f32 / elapsed.as_secs_f32();
            self.frames_since_last_update = 0;
            self.last_fps_update = now;
            debug!(
                fps = fps.round(),
                width = self.context.viewport.width,
                height = self.context.viewport.height,
                "render stats"
            );
        }
    }
}

impl GraphicsDevice for WgpuDevice {
    fn create_program(&mut self, desc: &ProgramDesc<'_>) -> Result<ProgramId, SetupError> {
        check_attribute_bindings(desc.label, desc.vertex_source, desc.attributes)?;
        let device = &self.context.device;
        let vertex = compile_stage(device, desc.label, desc.vertex_source, ShaderStage::Vertex)?;
        let fragment =
            compile_stage(device, desc.label, desc.fragment_source, ShaderStage::Fragment)?;

        let values = ProgramUniforms::default();
        let uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(desc.label),
            contents: values.as_bytes(),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(desc.label),
            layout: &self.layouts.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let id = ProgramId(self.programs.len() as u32);
        let resources = ProgramResources {
            label: desc.label.to_string(),
            vertex,
            fragment,
            uniforms: desc.uniforms.to_vec(),
            samples_texture: desc.samples_texture,
            values,
            uniform_buffer,
            uniform_bind_group,
        };

        let format = match desc.output {
            ProgramOutput::Offscreen => self.context.color_space.target_format(),
            ProgramOutput::Surface => self.context.surface_format,
        };
        let key = PipelineKey {
            program: id,
            blend: desc.blend,
            format,
        };
        self.pipelines
            .prepare(device, &self.layouts, key, &resources.modules())?;

        debug!(program = desc.label, ?format, "linked program");
        self.programs.push(resources);
        Ok(id)
    }

    fn create_vertex_buffer(&mut self, label: &str, vertices: &[Vertex]) -> BufferId {
        let buffer = self
            .context
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: bytemuck::cast_slice(vertices),
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            });
        let id = BufferId(self.buffers.len() as u32);
        self.buffers.push(buffer);
        id
    }

    fn write_vertex_buffer(&mut self, buffer: BufferId, vertices: &[Vertex]) {
        match self.buffers.get(buffer.0 as usize) {
            Some(target) => {
                self.context
                    .queue
                    .write_buffer(target, 0, bytemuck::cast_slice(vertices));
            }
            None => tracing::warn!(?buffer, "write to unknown vertex buffer ignored"),
        }
    }

    fn create_texture(&mut self, label: &str, image: &DecalImage) -> Result<TextureId, SetupError> {
        let device = &self.context.device;
        let size = wgpu::Extent3d {
            width: image.width(),
            height: image.height(),
            depth_or_array_layers: 1,
        };

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: self.context.color_space.decal_format(),
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        self.context.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            image.as_raw(),
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * image.width()),
                rows_per_image: Some(image.height()),
            },
            size,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &self.layouts.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });
        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(SetupError::Texture {
                label: label.to_string(),
                message: error.to_string(),
            });
        }

        let id = TextureId(self.textures.len() as u32);
        self.textures.push(DecalTexture {
            _texture: texture,
            bind_group,
        });
        Ok(id)
    }

    fn create_target(&mut self, viewport: Viewport) -> Result<TargetId, SetupError> {
        let target = OffscreenTarget::create(
            &self.context.device,
            &self.layouts,
            &self.sampler,
            viewport,
            self.context.color_space.target_format(),
        )?;
        let id = TargetId(self.next_target);
        self.next_target += 1;
        self.targets.insert(id, target);
        Ok(id)
    }

    fn destroy_target(&mut self, target: TargetId) {
        if let Some(resources) = self.targets.remove(&target) {
            debug!(
                width = resources.viewport.width,
                height = resources.viewport.height,
                "destroyed offscreen target"
            );
            resources.destroy();
        }
    }

    fn max_target_dimension(&self) -> u32 {
        self.context.device.limits().max_texture_dimension_2d
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.context.resize(viewport);
    }

    fn execute(&mut self, commands: &[Command]) -> Result<(), FrameError> {
        let plans = self.plan_passes(commands)?;
        self.prepare_pipelines(&plans)?;

        let needs_surface = plans
            .iter()
            .any(|plan| plan.target == RenderTarget::Default);
        let frame = if needs_surface {
            Some(self.context.surface.get_current_texture()?)
        } else {
            None
        };
        let surface_view = frame.as_ref().map(|frame| {
            frame
                .texture
                .create_view(&wgpu::TextureViewDescriptor::default())
        });

        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("frame encoder"),
                });
        for plan in &plans {
            self.encode_pass(&mut encoder, plan, surface_view.as_ref())?;
        }
        self.context.queue.submit(Some(encoder.finish()));
        if let Some(frame) = frame {
            frame.present();
        }

        self.record_frame_stats();
        Ok(())
    }
}
