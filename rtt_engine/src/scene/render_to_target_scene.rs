/// Render-to-target scene
///
/// Renders an animated clear color into an offscreen render target, then
/// samples that target onto a quad drawn into the swapchain image.
///
/// Lifecycle:
/// - `load` creates every device resource, in dependency order. Any
///   required step failing releases what was created so far and fails.
/// - `update` advances the clear color, re-records the offscreen command
///   buffers and publishes telemetry.
/// - `pre_render` submits both passes for the acquired image.
/// - `release` destroys everything; calling it again does nothing.

use glam::Mat4;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::frame::{
    oscillating_clear_color, FrameError, FrameSubmission, GameTime, SyncPair, TelemetrySlot,
    TelemetrySnapshot, TwoPassSubmitter,
};
use crate::graphics_device::{
    AttachmentDesc, BindingResource, BufferHandle, ClearValue, Color, CommandBufferHandle,
    CommandBufferLevel, DeviceResource, FenceHandle, GraphicsDevice, ImageLayout, MeshHandle,
    PipelineDesc, PipelineHandle, PrimitiveTopology, Rect2D, RenderPassDesc, RenderPassHandle,
    RenderPassRef, RenderTargetDesc, RenderTargetHandle, SemaphoreHandle, ShaderBinding,
    ShaderBindingType, ShaderHandle, ShaderStage, ShaderStageDesc, VertexDeclaration, Viewport,
};
use crate::scene::quad::quad_mesh_desc;
use crate::{engine_debug, engine_error, engine_info, engine_warn};

const SOURCE: &str = "rtt::Scene";

/// Name of the pipeline cache opened at load
pub const PIPELINE_CACHE_NAME: &str = "pipeline_cache";

/// Size of the world-view-projection uniform (one 4x4 f32 matrix)
pub const UNIFORM_BUFFER_SIZE: u64 = std::mem::size_of::<Mat4>() as u64;

const DEPTH_CLEAR: ClearValue = ClearValue::DepthStencil { depth: 1.0, stencil: 0 };

pub struct RenderToTargetScene {
    config: Config,
    telemetry: TelemetrySlot,
    world_view_projection: Mat4,
    clear_color: Color,
    loaded: bool,

    // Composite pass
    render_pass: Option<RenderPassHandle>,
    composite_semaphore: Option<SemaphoreHandle>,
    composite_fence: Option<FenceHandle>,
    composite_commands: Vec<CommandBufferHandle>,

    // Offscreen pass
    offscreen_commands: Vec<CommandBufferHandle>,
    render_target: Option<RenderTargetHandle>,
    offscreen_semaphore: Option<SemaphoreHandle>,
    offscreen_fence: Option<FenceHandle>,

    // Quad drawing
    shader: Option<ShaderHandle>,
    uniform_buffer: Option<BufferHandle>,
    pipeline: Option<PipelineHandle>,
    mesh: Option<MeshHandle>,
}

impl RenderToTargetScene {
    /// Create an unloaded scene
    ///
    /// # Arguments
    ///
    /// * `config` - Content path and fence timeout are read from here
    /// * `telemetry` - Slot receiving a snapshot on every `update`
    pub fn new(config: &Config, telemetry: TelemetrySlot) -> Self {
        Self {
            config: config.clone(),
            telemetry,
            world_view_projection: Mat4::IDENTITY,
            clear_color: Color::BLACK,
            loaded: false,
            render_pass: None,
            composite_semaphore: None,
            composite_fence: None,
            composite_commands: Vec::new(),
            offscreen_commands: Vec::new(),
            render_target: None,
            offscreen_semaphore: None,
            offscreen_fence: None,
            shader: None,
            uniform_buffer: None,
            pipeline: None,
            mesh: None,
        }
    }

    // ===== LOAD =====

    /// Create every device resource of the scene
    ///
    /// Setting shader bindings and opening the pipeline cache may fail
    /// without aborting the load; every other step is required.
    ///
    /// # Errors
    ///
    /// Returns `InitializationFailed` naming the failed step. Resources
    /// created before the failure are released, and later steps are not
    /// attempted.
    pub fn load(&mut self, device: &mut dyn GraphicsDevice) -> Result<()> {
        if self.loaded {
            engine_warn!(SOURCE, "Scene already loaded");
            return Ok(());
        }

        let swapchain = device.swapchain();
        if swapchain.image_count == 0 {
            return Err(self.fatal(
                device,
                "loading render pass",
                Error::InvalidResource("swapchain has no images".to_string()),
            ));
        }

        let viewport = Viewport::from_extent(swapchain.width, swapchain.height);
        let scissor = Rect2D::from_extent(swapchain.width, swapchain.height);
        let image_count = swapchain.image_count;

        // Composite pass: one framebuffer per swapchain image plus the shared depth buffer
        let render_pass = device
            .create_render_pass(&RenderPassDesc {
                viewport,
                scissor,
                color_attachment: AttachmentDesc::color(swapchain.color_format, ImageLayout::PresentSrc),
                depth_attachment: Some(AttachmentDesc::depth(swapchain.depth_format)),
            })
            .map_err(|e| self.fatal(device, "loading render pass", e))?;
        self.render_pass = Some(render_pass);

        let semaphore = device
            .create_semaphore()
            .map_err(|e| self.fatal(device, "initializing semaphore", e))?;
        self.composite_semaphore = Some(semaphore);

        let fence = device
            .create_fence(true)
            .map_err(|e| self.fatal(device, "initializing fence(s)", e))?;
        self.composite_fence = Some(fence);

        self.composite_commands = device
            .create_command_buffers(image_count, CommandBufferLevel::Primary)
            .map_err(|e| self.fatal(device, "initializing draw command buffer(s)", e))?;

        // Offscreen pass
        self.offscreen_commands = device
            .create_command_buffers(image_count, CommandBufferLevel::Primary)
            .map_err(|e| self.fatal(device, "initializing render target command buffer(s)", e))?;

        let render_target = device
            .create_render_target(&RenderTargetDesc {
                viewport,
                scissor,
                color_format: swapchain.color_format,
                depth_format: Some(swapchain.depth_format),
                count: image_count,
            })
            .map_err(|e| self.fatal(device, "loading render target", e))?;
        self.render_target = Some(render_target);

        let semaphore = device
            .create_semaphore()
            .map_err(|e| self.fatal(device, "initializing semaphore of render target", e))?;
        self.offscreen_semaphore = Some(semaphore);

        let fence = device
            .create_fence(true)
            .map_err(|e| self.fatal(device, "initializing fence(s) of render target", e))?;
        self.offscreen_fence = Some(fence);

        // Quad drawing
        let vertex_stage = ShaderStageDesc::new(self.config.shader_path("shader.vert.spv"), ShaderStage::Vertex);
        let shader = device
            .create_shader(&vertex_stage)
            .map_err(|e| self.fatal(device, "loading vertex shader", e))?;
        self.shader = Some(shader);

        let fragment_stage = ShaderStageDesc::new(self.config.shader_path("shader.frag.spv"), ShaderStage::Fragment);
        device
            .add_shader_stage(shader, &fragment_stage)
            .map_err(|e| self.fatal(device, "loading fragment shader", e))?;

        let uniform_buffer = device
            .create_uniform_buffer(UNIFORM_BUFFER_SIZE)
            .map_err(|e| self.fatal(device, "loading vertex shader uniform", e))?;
        self.uniform_buffer = Some(uniform_buffer);

        device
            .update_buffer(uniform_buffer, 0, bytemuck::bytes_of(&self.world_view_projection))
            .map_err(|e| self.fatal(device, "updating vertex shader uniform", e))?;

        if let Err(err) = self.bind_shader_inputs(device, shader, render_target, uniform_buffer) {
            engine_error!(SOURCE, "Error on setting shader binding params: {}", err);
        }

        if let Err(err) = device.create_pipeline_cache(PIPELINE_CACHE_NAME) {
            engine_error!(SOURCE, "Error on creating pipeline cache: {}", err);
        }

        let pipeline = device
            .create_pipeline(&PipelineDesc {
                vertex_declaration: VertexDeclaration::PositionUv,
                topology: PrimitiveTopology::TriangleList,
                render_pass,
                shader,
                viewports: vec![viewport],
                scissors: vec![scissor],
                pipeline_cache: Some(PIPELINE_CACHE_NAME.to_string()),
            })
            .map_err(|e| self.fatal(device, "creating pipeline", e))?;
        self.pipeline = Some(pipeline);

        let mesh = device
            .create_mesh(&quad_mesh_desc())
            .map_err(|e| self.fatal(device, "loading mesh", e))?;
        self.mesh = Some(mesh);

        self.record_composite_commands(device)
            .map_err(|e| self.fatal(device, "building command buffers", e))?;

        self.loaded = true;
        engine_info!(SOURCE, "Scene loaded successfully ({} swapchain images)", image_count);
        Ok(())
    }

    /// Log a failed load step and release everything created so far
    fn fatal(&mut self, device: &mut dyn GraphicsDevice, step: &str, err: Error) -> Error {
        engine_error!(SOURCE, "Error on {}: {}", step, err);
        self.release(device);
        Error::InitializationFailed(format!("Error on {}: {}", step, err))
    }

    /// Binding 0 samples the render target color, binding 1 is the uniform
    fn bind_shader_inputs(
        &self,
        device: &mut dyn GraphicsDevice,
        shader: ShaderHandle,
        render_target: RenderTargetHandle,
        uniform_buffer: BufferHandle,
    ) -> Result<()> {
        let color_attachment = device.render_target_attachment(render_target, 0)?;
        let bindings = [
            ShaderBinding {
                index: 0,
                binding_type: ShaderBindingType::Sampler2D,
                stage: ShaderStage::Fragment,
                resource: BindingResource::Image(color_attachment),
            },
            ShaderBinding {
                index: 1,
                binding_type: ShaderBindingType::Uniform,
                stage: ShaderStage::Vertex,
                resource: BindingResource::Buffer {
                    buffer: uniform_buffer,
                    offset: 0,
                    range: UNIFORM_BUFFER_SIZE,
                },
            },
        ];
        device.set_shader_bindings(shader, &bindings)
    }

    /// Record the quad draw into every composite command buffer
    fn record_composite_commands(&self, device: &mut dyn GraphicsDevice) -> Result<()> {
        let (Some(render_pass), Some(pipeline), Some(mesh)) = (self.render_pass, self.pipeline, self.mesh) else {
            return Err(Error::InvalidResource("composite pass resources missing".to_string()));
        };
        let clear_values = [Color::CORNFLOWER_BLUE.to_clear_value(), DEPTH_CLEAR];

        for (index, &command_buffer) in self.composite_commands.iter().enumerate() {
            let list = device.command_list(command_buffer)?;
            list.begin()?;
            list.begin_render_pass(RenderPassRef::Swapchain(render_pass), index as u32, &clear_values)?;
            list.bind_pipeline(pipeline)?;
            list.bind_mesh(mesh)?;
            list.draw_indexed(6, 0, 0)?;
            list.end_render_pass()?;
            list.end()?;
        }
        Ok(())
    }

    /// Record a clear of the render target into every offscreen command buffer
    fn record_offscreen_commands(&self, device: &mut dyn GraphicsDevice) -> Result<()> {
        let render_target = self
            .render_target
            .ok_or_else(|| Error::InvalidResource("render target missing".to_string()))?;
        let clear_values = [self.clear_color.to_clear_value(), DEPTH_CLEAR];

        for (index, &command_buffer) in self.offscreen_commands.iter().enumerate() {
            let list = device.command_list(command_buffer)?;
            list.begin()?;
            list.begin_render_pass(RenderPassRef::Offscreen(render_target), index as u32, &clear_values)?;
            list.end_render_pass()?;
            list.end()?;
        }
        Ok(())
    }

    // ===== FRAME =====

    /// Advance per-frame content
    ///
    /// Publishes telemetry, derives the clear color from total game time
    /// and re-records the offscreen command buffers with it.
    pub fn update(&mut self, device: &mut dyn GraphicsDevice, time: &GameTime) -> Result<()> {
        self.telemetry.publish(TelemetrySnapshot::from_game_time(time));
        self.clear_color = oscillating_clear_color(time.total_seconds());

        if !self.loaded {
            return Err(Error::InvalidResource("scene is not loaded".to_string()));
        }
        self.record_offscreen_commands(device).map_err(|err| {
            engine_error!(SOURCE, "Error on recording render target command buffers: {}", err);
            err
        })
    }

    /// Submit both passes for `image_index`
    ///
    /// A scene that is not loaded, or an image index without command
    /// buffers, fails as an offscreen submission.
    pub fn pre_render(&self, device: &mut dyn GraphicsDevice, image_index: u32) -> std::result::Result<(), FrameError> {
        let (submitter, frame) = self
            .frame_submission(device, image_index)
            .map_err(FrameError::SubmitOffscreen)?;
        submitter.submit(device, &frame)
    }

    fn frame_submission(
        &self,
        device: &dyn GraphicsDevice,
        image_index: u32,
    ) -> Result<(TwoPassSubmitter, FrameSubmission)> {
        let (Some(offscreen), Some(composite)) = (self.offscreen_sync(), self.composite_sync()) else {
            return Err(Error::InvalidResource("scene is not loaded".to_string()));
        };
        let index = image_index as usize;
        let (Some(&offscreen_commands), Some(&composite_commands)) =
            (self.offscreen_commands.get(index), self.composite_commands.get(index))
        else {
            return Err(Error::InvalidResource(format!("no command buffers for image {}", image_index)));
        };

        let swapchain = device.swapchain();
        Ok((
            TwoPassSubmitter::new(offscreen, composite, self.config.fence_timeout),
            FrameSubmission {
                offscreen_commands,
                composite_commands,
                image_available: swapchain.image_available,
                rendering_done: swapchain.rendering_done,
            },
        ))
    }

    /// Replace the world-view-projection matrix
    ///
    /// The uniform buffer is updated immediately when loaded; otherwise the
    /// matrix is uploaded by `load`.
    pub fn set_world_view_projection(&mut self, device: &mut dyn GraphicsDevice, matrix: Mat4) -> Result<()> {
        self.world_view_projection = matrix;
        match self.uniform_buffer {
            Some(buffer) => device.update_buffer(buffer, 0, bytemuck::bytes_of(&matrix)),
            None => Ok(()),
        }
    }

    // ===== RELEASE =====

    /// Destroy every resource the scene still holds
    ///
    /// Order: sync primitives, command buffers, render pass and target,
    /// then shader, pipeline, mesh and uniform buffer. Returns the number
    /// of resources destroyed; a second call returns 0.
    pub fn release(&mut self, device: &mut dyn GraphicsDevice) -> usize {
        let mut destroyed =
            release_sync(device, self.composite_fence.take(), self.composite_semaphore.take());
        destroyed += release_sync(device, self.offscreen_fence.take(), self.offscreen_semaphore.take());

        let mut resources = Vec::new();
        resources.extend(self.composite_commands.drain(..).map(DeviceResource::CommandBuffer));
        resources.extend(self.offscreen_commands.drain(..).map(DeviceResource::CommandBuffer));

        resources.extend(self.render_pass.take().map(DeviceResource::RenderPass));
        resources.extend(self.render_target.take().map(DeviceResource::RenderTarget));

        resources.extend(self.shader.take().map(DeviceResource::Shader));
        resources.extend(self.pipeline.take().map(DeviceResource::Pipeline));
        resources.extend(self.mesh.take().map(DeviceResource::Mesh));
        resources.extend(self.uniform_buffer.take().map(DeviceResource::Buffer));

        self.loaded = false;
        destroyed += resources.into_iter().filter(|resource| device.destroy(*resource)).count();
        if destroyed > 0 {
            engine_debug!(SOURCE, "Scene released ({} resources)", destroyed);
        }
        destroyed
    }

    // ===== ACCESSORS =====

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Clear color used by the latest offscreen recording
    pub fn clear_color(&self) -> Color {
        self.clear_color
    }

    pub fn world_view_projection(&self) -> Mat4 {
        self.world_view_projection
    }

    pub fn render_pass(&self) -> Option<RenderPassHandle> {
        self.render_pass
    }

    pub fn render_target(&self) -> Option<RenderTargetHandle> {
        self.render_target
    }

    pub fn shader(&self) -> Option<ShaderHandle> {
        self.shader
    }

    pub fn uniform_buffer(&self) -> Option<BufferHandle> {
        self.uniform_buffer
    }

    pub fn pipeline(&self) -> Option<PipelineHandle> {
        self.pipeline
    }

    pub fn mesh(&self) -> Option<MeshHandle> {
        self.mesh
    }

    pub fn composite_commands(&self) -> &[CommandBufferHandle] {
        &self.composite_commands
    }

    pub fn offscreen_commands(&self) -> &[CommandBufferHandle] {
        &self.offscreen_commands
    }

    /// Offscreen fence/semaphore, once both exist
    pub fn offscreen_sync(&self) -> Option<SyncPair> {
        Some(SyncPair::new(self.offscreen_fence?, self.offscreen_semaphore?))
    }

    /// Composite fence/semaphore, once both exist
    pub fn composite_sync(&self) -> Option<SyncPair> {
        Some(SyncPair::new(self.composite_fence?, self.composite_semaphore?))
    }
}

/// Destroy the fence and semaphore of one pass, whichever were created
fn release_sync(
    device: &mut dyn GraphicsDevice,
    fence: Option<FenceHandle>,
    semaphore: Option<SemaphoreHandle>,
) -> usize {
    match (fence, semaphore) {
        (Some(fence), Some(semaphore)) => SyncPair::new(fence, semaphore).release(device),
        // Load stopped between the two
        (fence, semaphore) => fence
            .map(DeviceResource::Fence)
            .into_iter()
            .chain(semaphore.map(DeviceResource::Semaphore))
            .filter(|resource| device.destroy(*resource))
            .count(),
    }
}

#[cfg(test)]
#[path = "render_to_target_scene_tests.rs"]
mod tests;
