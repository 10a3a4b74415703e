use tracing::debug;

use crate::color::Palette;
use crate::compile::{
    ATTRIBUTE_BINDINGS, BACKDROP_FRAGMENT_GLSL, POST_FRAGMENT_GLSL, QUAD_VERTEX_GLSL,
    TEXT_FRAGMENT_GLSL,
};
use crate::decal::DecalImage;
use crate::error::{FrameError, SetupError};
use crate::types::{Viewport, CLEAR_COLOR};

use super::commands::{
    BindError, BlendFunc, BufferId, GraphicsContext, ProgramId, RenderTarget, TargetId,
    TextureBinding, TextureId, Uniform, UniformSlot,
};
use super::device::{GraphicsDevice, ProgramDesc, ProgramOutput};
use super::geometry::{full_screen_quad, quad, text_extents, QUAD_LAYOUT, QUAD_VERTEX_COUNT};

const BACKDROP_UNIFORMS: &[UniformSlot] = &[
    UniformSlot::Time,
    UniformSlot::Aspect,
    UniformSlot::BackgroundColor,
    UniformSlot::ForegroundColor,
];
const POST_UNIFORMS: &[UniformSlot] = &[UniformSlot::Time];

fn backdrop_uniform_error(err: BindError) -> SetupError {
    SetupError::ProgramLink {
        program: "backdrop".to_string(),
        message: err.to_string(),
    }
}

/// Inputs fixed for the lifetime of a [`RenderLoop`].
#[derive(Debug, Clone)]
pub struct LoopSetup {
    pub viewport: Viewport,
    pub palette: Palette,
    pub decal: DecalImage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    Uninitialized,
    Ready,
    Running,
}

/// GPU handles owned by the loop once initialised.
#[derive(Debug, Clone, Copy)]
struct LoopResources {
    backdrop: ProgramId,
    text: ProgramId,
    post: ProgramId,
    full_quad: BufferId,
    text_quad: BufferId,
    decal: TextureId,
    target: TargetId,
}

/// Two-pass animation: noise backdrop and burned-in label into an offscreen
/// target, then a warped copy of that target onto the surface.
pub struct RenderLoop<D: GraphicsDevice> {
    device: D,
    setup: LoopSetup,
    context: GraphicsContext,
    resources: Option<LoopResources>,
    phase: LoopPhase,
}

impl<D: GraphicsDevice> RenderLoop<D> {
    pub fn new(device: D, setup: LoopSetup) -> Self {
        Self {
            device,
            setup,
            context: GraphicsContext::new(),
            resources: None,
            phase: LoopPhase::Uninitialized,
        }
    }

    pub fn phase(&self) -> LoopPhase {
        self.phase
    }

    pub fn viewport(&self) -> Viewport {
        self.setup.viewport
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Creates every GPU resource. Calling it again once initialised is a no-op.
    pub fn initialize(&mut self) -> Result<(), SetupError> {
        if self.resources.is_some() {
            return Ok(());
        }

        let backdrop = self.device.create_program(&ProgramDesc {
            label: "backdrop",
            vertex_source: QUAD_VERTEX_GLSL,
            fragment_source: BACKDROP_FRAGMENT_GLSL,
            attributes: &ATTRIBUTE_BINDINGS,
            uniforms: BACKDROP_UNIFORMS,
            samples_texture: false,
            output: ProgramOutput::Offscreen,
            blend: None,
        })?;
        let text = self.device.create_program(&ProgramDesc {
            label: "text",
            vertex_source: QUAD_VERTEX_GLSL,
            fragment_source: TEXT_FRAGMENT_GLSL,
            attributes: &ATTRIBUTE_BINDINGS,
            uniforms: &[],
            samples_texture: true,
            output: ProgramOutput::Offscreen,
            blend: Some(BlendFunc::BURN_IN),
        })?;
        let post = self.device.create_program(&ProgramDesc {
            label: "post",
            vertex_source: QUAD_VERTEX_GLSL,
            fragment_source: POST_FRAGMENT_GLSL,
            attributes: &ATTRIBUTE_BINDINGS,
            uniforms: POST_UNIFORMS,
            samples_texture: true,
            output: ProgramOutput::Surface,
            blend: None,
        })?;

        let viewport = self.setup.viewport;
        let extents = self.text_extents();
        let full_quad = self
            .device
            .create_vertex_buffer("full-screen quad", &full_screen_quad());
        let text_quad = self.device.create_vertex_buffer("text quad", &quad(extents));
        let decal = self.device.create_texture("text decal", &self.setup.decal)?;
        let target = self.device.create_target(viewport)?;

        let palette = self.setup.palette;
        self.context.use_program(backdrop);
        self.context
            .set_uniform(Uniform::BackgroundColor(palette.background))
            .map_err(backdrop_uniform_error)?;
        self.context
            .set_uniform(Uniform::ForegroundColor(palette.foreground))
            .map_err(backdrop_uniform_error)?;
        self.context
            .set_uniform(Uniform::Aspect(viewport.aspect()))
            .map_err(backdrop_uniform_error)?;

        self.resources = Some(LoopResources {
            backdrop,
            text,
            post,
            full_quad,
            text_quad,
            decal,
            target,
        });
        self.phase = LoopPhase::Ready;
        debug!(
            width = viewport.width,
            height = viewport.height,
            "render loop initialised"
        );
        Ok(())
    }

    fn text_extents(&self) -> [f32; 2] {
        text_extents(
            self.setup.decal.width(),
            self.setup.decal.height(),
            self.setup.viewport,
        )
    }

    /// Tracks a viewport change. Zero-sized viewports are ignored; before
    /// initialisation only the stored size changes.
    ///
    /// A size beyond the device limit is rejected before anything changes.
    /// If the new target cannot be created the loop drops back to
    /// [`LoopPhase::Uninitialized`], since the old target is already gone.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), SetupError> {
        let viewport = Viewport::new(width, height);
        if viewport.is_empty() {
            debug!(width, height, "ignoring zero-sized viewport");
            return Ok(());
        }

        let Some(mut resources) = self.resources else {
            self.setup.viewport = viewport;
            return Ok(());
        };

        let max_dimension = self.device.max_target_dimension();
        if width > max_dimension || height > max_dimension {
            return Err(SetupError::SurfaceTooLarge {
                max_dimension,
                width,
                height,
            });
        }

        self.device.set_viewport(viewport);

        self.context.use_program(resources.backdrop);
        self.context
            .set_uniform(Uniform::Aspect(viewport.aspect()))
            .map_err(backdrop_uniform_error)?;

        self.context.forget_target(resources.target);
        self.device.destroy_target(resources.target);
        resources.target = match self.device.create_target(viewport) {
            Ok(target) => target,
            Err(err) => {
                self.resources = None;
                self.phase = LoopPhase::Uninitialized;
                return Err(err);
            }
        };
        self.resources = Some(resources);
        self.setup.viewport = viewport;

        let extents = self.text_extents();
        self.device.write_vertex_buffer(resources.text_quad, &quad(extents));
        debug!(width, height, ?extents, "resized render loop");
        Ok(())
    }

    /// Records and submits one frame at `timestamp_ms` since loop start.
    pub fn render_frame(&mut self, timestamp_ms: f64) -> Result<(), FrameError> {
        let resources = self.resources.ok_or(FrameError::NotInitialized)?;
        let seconds = (timestamp_ms / 1000.0) as f32;
        let ctx = &mut self.context;

        ctx.bind_target(RenderTarget::Offscreen(resources.target));
        ctx.clear(CLEAR_COLOR)?;

        ctx.use_program(resources.backdrop);
        ctx.set_uniform(Uniform::Time(seconds))?;
        ctx.bind_vertex_buffer(resources.full_quad);
        ctx.assign_attributes(QUAD_LAYOUT)?;
        ctx.draw_strip(QUAD_VERTEX_COUNT)?;

        ctx.use_program(resources.text);
        ctx.set_blend(Some(BlendFunc::BURN_IN));
        ctx.bind_texture(Some(TextureBinding::Texture(resources.decal)));
        ctx.bind_vertex_buffer(resources.text_quad);
        ctx.assign_attributes(QUAD_LAYOUT)?;
        ctx.draw_strip(QUAD_VERTEX_COUNT)?;
        ctx.set_blend(None);

        ctx.bind_target(RenderTarget::Default);
        ctx.use_program(resources.post);
        ctx.clear(CLEAR_COLOR)?;
        ctx.bind_texture(Some(TextureBinding::Target(resources.target)));
        ctx.set_uniform(Uniform::Time(seconds))?;
        ctx.bind_vertex_buffer(resources.full_quad);
        ctx.assign_attributes(QUAD_LAYOUT)?;
        ctx.draw_strip(QUAD_VERTEX_COUNT)?;

        let commands = ctx.take_commands();
        self.device.execute(&commands)?;
        self.phase = LoopPhase::Running;
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{uniform_commands, DeviceEvent, RecordingDevice};
    use super::*;
    use crate::gpu::commands::{Command, DrawCall};

    fn setup(width: u32, height: u32) -> LoopSetup {
        LoopSetup {
            viewport: Viewport::new(width, height),
            palette: Palette::from_seed(Some(1)),
            decal: DecalImage::blank(),
        }
    }

    fn ready_loop(width: u32, height: u32) -> RenderLoop<RecordingDevice> {
        let mut render_loop = RenderLoop::new(RecordingDevice::default(), setup(width, height));
        render_loop.initialize().expect("initialise");
        render_loop
    }

    fn draws(commands: &[Command]) -> Vec<DrawCall> {
        commands
            .iter()
            .filter_map(|command| match command {
                Command::Draw(call) => Some(*call),
                _ => None,
            })
            .collect()
    }

    fn text_quad(render_loop: &RenderLoop<RecordingDevice>) -> [f32; 2] {
        // Buffer 1 is the text quad; its first vertex is the top-left corner.
        let vertex = render_loop.device().buffers[1][0];
        [-vertex.position[0], vertex.position[1]]
    }

    #[test]
    fn frames_feed_seconds_to_backdrop_and_post() {
        let mut render_loop = ready_loop(800, 600);
        render_loop.render_frame(0.0).unwrap();
        render_loop.render_frame(1000.0).unwrap();

        let device = render_loop.device();
        assert_eq!(device.frame_times[0]["backdrop"], 0.0);
        assert_eq!(device.frame_times[1]["backdrop"], 1.0);
        for frame in &device.frame_times {
            assert_eq!(frame["post"], frame["backdrop"]);
        }
        let aspect = device.uniforms_of("backdrop").aspect;
        assert!((aspect - 800.0 / 600.0).abs() < 1e-6);
    }

    #[test]
    fn frame_follows_two_pass_protocol() {
        let mut render_loop = ready_loop(800, 600);
        render_loop.render_frame(16.0).unwrap();
        let device = render_loop.device();
        let frame = &device.frames[0];
        let calls = draws(frame);
        assert_eq!(calls.len(), 3);

        let backdrop = device.program_id("backdrop");
        let text = device.program_id("text");
        let post = device.program_id("post");
        let target = *device.live_targets.iter().next().expect("live target");

        assert_eq!(calls[0].program, backdrop);
        assert_eq!(calls[0].target, RenderTarget::Offscreen(target));
        assert_eq!(calls[0].blend, None);

        assert_eq!(calls[1].program, text);
        assert_eq!(calls[1].blend, Some(BlendFunc::BURN_IN));
        assert_eq!(calls[1].texture, Some(TextureBinding::Texture(TextureId(0))));
        assert_eq!(calls[1].buffer, BufferId(1));

        assert_eq!(calls[2].program, post);
        assert_eq!(calls[2].target, RenderTarget::Default);
        assert_eq!(calls[2].blend, None);
        assert_eq!(calls[2].texture, Some(TextureBinding::Target(target)));
        assert!(calls.iter().all(|call| call.vertex_count == 4));

        let clears = frame
            .iter()
            .filter(|command| **command == Command::Clear(CLEAR_COLOR))
            .count();
        assert_eq!(clears, 2);
    }

    #[test]
    fn attributes_are_reassigned_after_every_buffer_bind() {
        let mut render_loop = ready_loop(640, 480);
        render_loop.render_frame(0.0).unwrap();
        let frame = &render_loop.device().frames[0];
        for (index, command) in frame.iter().enumerate() {
            if let Command::BindVertexBuffer(buffer) = command {
                assert_eq!(
                    frame[index + 1],
                    Command::AssignAttributes {
                        buffer: *buffer,
                        layout: QUAD_LAYOUT
                    }
                );
            }
        }
    }

    #[test]
    fn text_quad_extents_follow_viewport() {
        let mut render_loop = ready_loop(800, 600);
        render_loop.resize(1000, 500).unwrap();
        let [x, y] = text_quad(&render_loop);
        assert!((x - 0.7).abs() < 1e-6);
        assert!((y - 0.6).abs() < 1e-6);
    }

    #[test]
    fn repeated_resize_is_idempotent() {
        let mut once = ready_loop(800, 600);
        once.resize(1024, 768).unwrap();
        once.render_frame(0.0).unwrap();

        let mut twice = ready_loop(800, 600);
        twice.resize(1024, 768).unwrap();
        twice.resize(1024, 768).unwrap();
        twice.render_frame(0.0).unwrap();

        assert_eq!(once.device().buffers, twice.device().buffers);
        assert_eq!(
            once.device().uniforms_of("backdrop"),
            twice.device().uniforms_of("backdrop")
        );
        assert_eq!(twice.device().live_targets.len(), 1);
    }

    #[test]
    fn resize_destroys_target_before_recreating() {
        let mut render_loop = ready_loop(800, 600);
        render_loop.resize(1024, 768).unwrap();
        let events = &render_loop.device().events;
        let viewport = Viewport::new(1024, 768);
        assert_eq!(
            events[1..],
            [
                DeviceEvent::SetViewport(viewport),
                DeviceEvent::DestroyTarget(TargetId(0)),
                DeviceEvent::CreateTarget(TargetId(1), viewport),
                DeviceEvent::WriteBuffer(BufferId(1)),
            ]
        );
    }

    #[test]
    fn resize_updates_backdrop_aspect() {
        let mut render_loop = ready_loop(800, 600);
        render_loop.resize(1000, 500).unwrap();
        render_loop.render_frame(0.0).unwrap();
        let device = render_loop.device();
        let backdrop = device.program_id("backdrop");
        let last_aspect = uniform_commands(&device.frames[0])
            .into_iter()
            .filter(|(program, _)| *program == backdrop)
            .filter_map(|(_, value)| match value {
                Uniform::Aspect(aspect) => Some(aspect),
                _ => None,
            })
            .last();
        assert_eq!(last_aspect, Some(2.0));
        assert_eq!(device.uniforms_of("backdrop").aspect, 2.0);
    }

    #[test]
    fn zero_sized_resize_is_ignored() {
        let mut render_loop = ready_loop(800, 600);
        let before = render_loop.device().events.len();
        render_loop.resize(0, 600).unwrap();
        assert_eq!(render_loop.device().events.len(), before);
        assert_eq!(render_loop.viewport(), Viewport::new(800, 600));
    }

    #[test]
    fn resize_before_initialize_only_records_viewport() {
        let mut render_loop = RenderLoop::new(RecordingDevice::default(), setup(800, 600));
        render_loop.resize(1000, 500).unwrap();
        assert!(render_loop.device().events.is_empty());
        render_loop.initialize().unwrap();
        assert_eq!(
            render_loop.device().events,
            [DeviceEvent::CreateTarget(TargetId(0), Viewport::new(1000, 500))]
        );
        let [x, y] = text_quad(&render_loop);
        assert!((x - 0.7).abs() < 1e-6);
        assert!((y - 0.6).abs() < 1e-6);
    }

    #[test]
    fn palette_is_uploaded_once_at_initialize() {
        let mut render_loop = ready_loop(800, 600);
        render_loop.render_frame(0.0).unwrap();
        render_loop.render_frame(16.0).unwrap();
        let device = render_loop.device();
        let palette = Palette::from_seed(Some(1));
        let [r, g, b] = palette.background;
        assert_eq!(device.uniforms_of("backdrop").bg_col, [r, g, b, 1.0]);
        let colour_sets = uniform_commands(&device.frames[1])
            .into_iter()
            .filter(|(_, value)| matches!(value, Uniform::BackgroundColor(_)))
            .count();
        assert_eq!(colour_sets, 0);
    }

    #[test]
    fn render_before_initialize_fails() {
        let mut render_loop = RenderLoop::new(RecordingDevice::default(), setup(800, 600));
        assert!(matches!(
            render_loop.render_frame(0.0),
            Err(FrameError::NotInitialized)
        ));
        assert_eq!(render_loop.phase(), LoopPhase::Uninitialized);
    }

    #[test]
    fn compile_failure_aborts_initialize() {
        let device = RecordingDevice::failing_program("post");
        let mut render_loop = RenderLoop::new(device, setup(800, 600));
        let err = render_loop.initialize().unwrap_err();
        assert!(matches!(err, SetupError::ShaderCompile { .. }));
        assert_eq!(render_loop.phase(), LoopPhase::Uninitialized);
        assert!(render_loop.device().live_targets.is_empty());
    }

    #[test]
    fn phases_advance_through_lifecycle() {
        let mut render_loop = RenderLoop::new(RecordingDevice::default(), setup(320, 200));
        assert_eq!(render_loop.phase(), LoopPhase::Uninitialized);
        render_loop.initialize().unwrap();
        assert_eq!(render_loop.phase(), LoopPhase::Ready);
        render_loop.render_frame(0.0).unwrap();
        assert_eq!(render_loop.phase(), LoopPhase::Running);
    }

    #[test]
    fn oversized_resize_leaves_loop_untouched() {
        let device = RecordingDevice::with_max_dimension(4096);
        let mut render_loop = RenderLoop::new(device, setup(800, 600));
        render_loop.initialize().unwrap();
        let before = render_loop.device().events.clone();

        let err = render_loop.resize(8192, 600).unwrap_err();
        assert!(matches!(
            err,
            SetupError::SurfaceTooLarge {
                max_dimension: 4096,
                ..
            }
        ));
        assert_eq!(render_loop.device().events, before);
        assert_eq!(render_loop.viewport(), Viewport::new(800, 600));
        assert_eq!(render_loop.device().live_targets.len(), 1);
        render_loop.render_frame(0.0).unwrap();
    }

    #[test]
    fn failed_target_recreation_uninitializes_loop() {
        let mut render_loop = ready_loop(800, 600);
        render_loop.render_frame(0.0).unwrap();
        render_loop.device_mut().fail_targets();

        let err = render_loop.resize(1024, 768).unwrap_err();
        assert!(matches!(err, SetupError::IncompleteTarget { .. }));
        assert_eq!(render_loop.phase(), LoopPhase::Uninitialized);
        assert_eq!(render_loop.viewport(), Viewport::new(800, 600));
        assert!(render_loop.device().live_targets.is_empty());
        assert!(matches!(
            render_loop.render_frame(16.0),
            Err(FrameError::NotInitialized)
        ));
    }
}
