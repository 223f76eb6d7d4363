//! Headless graphics device
//!
//! A complete CPU-side implementation of [`GraphicsDevice`]. It keeps every
//! resource in slot maps and models the queue as executing each submission
//! the moment it is accepted:
//!
//! - a submission consumes its wait semaphores, then signals its signal
//!   semaphores and its fence
//! - a submission waiting on an unsignaled semaphore is rejected, since no
//!   later work could ever signal it on this queue
//! - fence waits resolve immediately (signaled) or time out immediately
//! - `acquire_next_image` cycles the swapchain index and signals the
//!   image-available semaphore, `present` consumes the rendering-done one
//!
//! Every call is journaled, and any operation can be made to fail for
//! exercising error paths without a GPU.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::SlotMap;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::graphics_device::{
    AttachmentDescriptorInfo, BindingResource, BufferHandle, ClearValue, CommandBufferHandle,
    CommandBufferLevel, CommandList, DeviceInfo, DeviceResource, FenceHandle, GraphicsDevice,
    ImageLayout, MeshDesc, MeshHandle, PipelineDesc, PipelineHandle, Rect2D, RenderPassDesc,
    RenderPassHandle, RenderPassRef, RenderTargetDesc, RenderTargetHandle, SemaphoreHandle,
    ShaderBinding, ShaderHandle, ShaderStage, ShaderStageDesc, SubmitInfo, SwapchainInfo,
    TextureFormat, VertexDeclaration, Viewport,
};
use crate::{engine_bail, engine_debug, engine_err, engine_info, engine_trace};

const SOURCE: &str = "rtt::headless";

/// Swapchain image count used by `HeadlessGraphicsDevice::new`
pub const DEFAULT_SWAPCHAIN_IMAGE_COUNT: usize = 3;

// ============================================================================
// Journal
// ============================================================================

/// Device operations that are journaled and can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceOperation {
    CreateRenderPass,
    CreateRenderTarget,
    RenderTargetAttachment,
    CreateCommandBuffers,
    CreateFence,
    CreateSemaphore,
    CreateShader,
    AddShaderStage,
    SetShaderBindings,
    CreateUniformBuffer,
    UpdateBuffer,
    CreatePipelineCache,
    CreatePipeline,
    CreateMesh,
    CommandList,
    Submit,
    WaitForFence,
    ResetFence,
    WaitIdle,
    AcquireNextImage,
    Present,
}

/// An accepted queue submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionRecord {
    /// Position in submission order, starting at 0
    pub sequence: u64,
    pub command_buffers: Vec<CommandBufferHandle>,
    pub wait_semaphores: Vec<SemaphoreHandle>,
    pub signal_semaphores: Vec<SemaphoreHandle>,
    pub fence: Option<FenceHandle>,
}

/// One journaled device event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    /// An operation was attempted
    Call { operation: DeviceOperation, succeeded: bool },
    /// A submission was accepted and executed
    Submitted(SubmissionRecord),
    /// A fence wait completed or failed
    FenceWaited { fence: FenceHandle, succeeded: bool },
    /// A fence was reset
    FenceReset { fence: FenceHandle },
    /// A resource was destroyed
    Destroyed(DeviceResource),
}

/// Shared, append-only record of everything the device was asked to do
///
/// Cloning yields another view of the same journal, so it can be kept
/// after the device moves to the render thread.
#[derive(Debug, Clone, Default)]
pub struct DeviceJournal {
    events: Arc<Mutex<Vec<DeviceEvent>>>,
}

impl DeviceJournal {
    fn push(&self, event: DeviceEvent) {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).push(event);
    }

    /// Snapshot of all events in order
    pub fn events(&self) -> Vec<DeviceEvent> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Snapshot of accepted submissions in order
    pub fn submissions(&self) -> Vec<SubmissionRecord> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                DeviceEvent::Submitted(record) => Some(record),
                _ => None,
            })
            .collect()
    }

    /// Number of attempts of `operation`, successful or not
    pub fn call_count(&self, operation: DeviceOperation) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, DeviceEvent::Call { operation: op, .. } if *op == operation))
            .count()
    }

    /// Operations attempted, in order
    pub fn operations(&self) -> Vec<DeviceOperation> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                DeviceEvent::Call { operation, .. } => Some(operation),
                _ => None,
            })
            .collect()
    }

    /// Forget all events
    pub fn clear(&self) {
        self.events.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

// ============================================================================
// Fault injection
// ============================================================================

/// How an injected fault triggers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailMode {
    /// Every call fails
    Always,
    /// The next call fails, later calls succeed
    Once,
    /// The first `n` calls succeed, every later call fails
    AfterSuccesses(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum FaultKey {
    Operation(DeviceOperation),
    SubmitSignaling(SemaphoreHandle),
}

#[derive(Debug, Clone, Copy)]
struct FaultState {
    mode: FailMode,
    calls: u32,
}

impl FaultState {
    /// Advance the call counter and report whether this call fails
    fn trigger(&mut self) -> bool {
        let call = self.calls;
        self.calls += 1;
        match self.mode {
            FailMode::Always => true,
            FailMode::Once => call == 0,
            FailMode::AfterSuccesses(n) => call >= n,
        }
    }
}

// ============================================================================
// Resources
// ============================================================================

/// State of a headless command list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandListState {
    Initial,
    Recording,
    Executable,
}

/// A recorded command
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCommand {
    BeginRenderPass {
        pass: RenderPassRef,
        framebuffer_index: u32,
        clear_values: Vec<ClearValue>,
    },
    EndRenderPass,
    SetViewport(Viewport),
    SetScissor(Rect2D),
    BindPipeline(PipelineHandle),
    BindMesh(MeshHandle),
    DrawIndexed { index_count: u32, first_index: u32, vertex_offset: i32 },
}

/// Command list that stores commands for later inspection
#[derive(Debug)]
pub struct HeadlessCommandList {
    level: CommandBufferLevel,
    state: CommandListState,
    in_render_pass: bool,
    commands: Vec<RecordedCommand>,
}

impl HeadlessCommandList {
    fn new(level: CommandBufferLevel) -> Self {
        Self {
            level,
            state: CommandListState::Initial,
            in_render_pass: false,
            commands: Vec::new(),
        }
    }

    pub fn level(&self) -> CommandBufferLevel {
        self.level
    }

    pub fn state(&self) -> CommandListState {
        self.state
    }

    pub fn commands(&self) -> &[RecordedCommand] {
        &self.commands
    }

    fn push(&mut self, command: RecordedCommand) -> Result<()> {
        if self.state != CommandListState::Recording {
            engine_bail!(SOURCE, "Command {:?} recorded outside begin/end", command);
        }
        self.commands.push(command);
        Ok(())
    }

    fn push_in_pass(&mut self, command: RecordedCommand) -> Result<()> {
        if !self.in_render_pass {
            engine_bail!(SOURCE, "Command {:?} recorded outside a render pass", command);
        }
        self.push(command)
    }
}

impl CommandList for HeadlessCommandList {
    fn begin(&mut self) -> Result<()> {
        if self.state == CommandListState::Recording {
            engine_bail!(SOURCE, "Command list is already recording");
        }
        self.commands.clear();
        self.in_render_pass = false;
        self.state = CommandListState::Recording;
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        if self.state != CommandListState::Recording {
            engine_bail!(SOURCE, "end() called on a command list that is not recording");
        }
        if self.in_render_pass {
            engine_bail!(SOURCE, "end() called inside an open render pass");
        }
        self.state = CommandListState::Executable;
        Ok(())
    }

    fn begin_render_pass(
        &mut self,
        pass: RenderPassRef,
        framebuffer_index: u32,
        clear_values: &[ClearValue],
    ) -> Result<()> {
        if self.in_render_pass {
            engine_bail!(SOURCE, "begin_render_pass() inside an open render pass");
        }
        self.push(RecordedCommand::BeginRenderPass {
            pass,
            framebuffer_index,
            clear_values: clear_values.to_vec(),
        })?;
        self.in_render_pass = true;
        Ok(())
    }

    fn end_render_pass(&mut self) -> Result<()> {
        self.push_in_pass(RecordedCommand::EndRenderPass)?;
        self.in_render_pass = false;
        Ok(())
    }

    fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        self.push(RecordedCommand::SetViewport(viewport))
    }

    fn set_scissor(&mut self, scissor: Rect2D) -> Result<()> {
        self.push(RecordedCommand::SetScissor(scissor))
    }

    fn bind_pipeline(&mut self, pipeline: PipelineHandle) -> Result<()> {
        self.push(RecordedCommand::BindPipeline(pipeline))
    }

    fn bind_mesh(&mut self, mesh: MeshHandle) -> Result<()> {
        self.push(RecordedCommand::BindMesh(mesh))
    }

    fn draw_indexed(&mut self, index_count: u32, first_index: u32, vertex_offset: i32) -> Result<()> {
        self.push_in_pass(RecordedCommand::DrawIndexed { index_count, first_index, vertex_offset })
    }
}

#[derive(Debug)]
struct HeadlessRenderPass {
    framebuffer_count: usize,
}

#[derive(Debug)]
struct HeadlessRenderTarget {
    desc: RenderTargetDesc,
}

/// Shader program with its loaded stages and declared bindings
#[derive(Debug, Default)]
pub struct HeadlessShader {
    pub stages: Vec<ShaderStageDesc>,
    pub bindings: Vec<ShaderBinding>,
}

impl HeadlessShader {
    fn has_stage(&self, stage: ShaderStage) -> bool {
        self.stages.iter().any(|s| s.stage == stage)
    }
}

#[derive(Debug)]
struct HeadlessPipeline {
    #[allow(dead_code)]
    desc: PipelineDesc,
}

/// Mesh geometry as uploaded
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessMesh {
    pub vertex_declaration: VertexDeclaration,
    pub vertex_data: Vec<u8>,
    pub indices: Vec<u32>,
}

impl HeadlessMesh {
    pub fn vertex_count(&self) -> usize {
        self.vertex_data.len() / self.vertex_declaration.stride()
    }

    /// Vertices decoded back into f32 components
    pub fn vertex_components(&self) -> Vec<f32> {
        self.vertex_data
            .chunks_exact(4)
            .map(|bytes| f32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
            .collect()
    }
}

// ============================================================================
// Device
// ============================================================================

/// CPU-side graphics device
pub struct HeadlessGraphicsDevice {
    info: DeviceInfo,
    swapchain: SwapchainInfo,
    next_image: u32,
    acquired_image: Option<u32>,

    render_passes: SlotMap<RenderPassHandle, HeadlessRenderPass>,
    render_targets: SlotMap<RenderTargetHandle, HeadlessRenderTarget>,
    command_lists: SlotMap<CommandBufferHandle, HeadlessCommandList>,
    fences: SlotMap<FenceHandle, bool>,
    semaphores: SlotMap<SemaphoreHandle, bool>,
    shaders: SlotMap<ShaderHandle, HeadlessShader>,
    buffers: SlotMap<BufferHandle, Vec<u8>>,
    pipelines: SlotMap<PipelineHandle, HeadlessPipeline>,
    meshes: SlotMap<MeshHandle, HeadlessMesh>,
    pipeline_caches: FxHashSet<String>,

    faults: FxHashMap<FaultKey, FaultState>,
    journal: DeviceJournal,
    submission_count: u64,
    presented_count: u64,
}

impl HeadlessGraphicsDevice {
    /// Create a headless device for the configured window
    ///
    /// # Errors
    ///
    /// Returns `InitializationFailed` if the window has a zero extent.
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_image_count(config, DEFAULT_SWAPCHAIN_IMAGE_COUNT)
    }

    /// Create a headless device with a given swapchain image count
    pub fn with_image_count(config: &Config, image_count: usize) -> Result<Self> {
        let window = &config.window;
        if window.width == 0 || window.height == 0 {
            return Err(Error::InitializationFailed(format!(
                "Window extent {}x{} is empty",
                window.width, window.height
            )));
        }
        if image_count == 0 {
            return Err(Error::InitializationFailed("Swapchain needs at least one image".to_string()));
        }
        if window.swap_chain_format.is_depth() {
            return Err(Error::InitializationFailed(format!(
                "Swapchain format {:?} is a depth format",
                window.swap_chain_format
            )));
        }

        let mut semaphores = SlotMap::with_key();
        let image_available = semaphores.insert(false);
        let rendering_done = semaphores.insert(false);

        let device = Self {
            info: DeviceInfo {
                name: "Headless Adapter".to_string(),
                backend: "headless".to_string(),
                debug_gpu: config.debug_gpu,
            },
            swapchain: SwapchainInfo {
                image_count,
                width: window.width,
                height: window.height,
                color_format: window.swap_chain_format,
                depth_format: TextureFormat::D32_FLOAT,
                image_available,
                rendering_done,
            },
            next_image: 0,
            acquired_image: None,
            render_passes: SlotMap::with_key(),
            render_targets: SlotMap::with_key(),
            command_lists: SlotMap::with_key(),
            fences: SlotMap::with_key(),
            semaphores,
            shaders: SlotMap::with_key(),
            buffers: SlotMap::with_key(),
            pipelines: SlotMap::with_key(),
            meshes: SlotMap::with_key(),
            pipeline_caches: FxHashSet::default(),
            faults: FxHashMap::default(),
            journal: DeviceJournal::default(),
            submission_count: 0,
            presented_count: 0,
        };

        engine_info!(SOURCE, "Headless device created ({}x{}, {} swapchain images)",
            window.width, window.height, image_count);

        Ok(device)
    }

    // ===== FAULT INJECTION =====

    /// Make `operation` fail according to `mode`
    pub fn fail_operation(&mut self, operation: DeviceOperation, mode: FailMode) {
        self.faults.insert(FaultKey::Operation(operation), FaultState { mode, calls: 0 });
    }

    /// Make submissions that signal `semaphore` fail according to `mode`
    pub fn fail_submissions_signaling(&mut self, semaphore: SemaphoreHandle, mode: FailMode) {
        self.faults.insert(FaultKey::SubmitSignaling(semaphore), FaultState { mode, calls: 0 });
    }

    /// Remove every injected fault
    pub fn clear_faults(&mut self) {
        self.faults.clear();
    }

    fn should_fail(&mut self, key: FaultKey) -> bool {
        self.faults.get_mut(&key).is_some_and(|state| state.trigger())
    }

    fn injected(&self, what: &str) -> Error {
        engine_debug!(SOURCE, "Injected failure: {}", what);
        Error::BackendError(format!("Injected failure: {}", what))
    }

    /// Run `body` as a journaled, fault-injectable operation
    fn run<T>(
        &mut self,
        operation: DeviceOperation,
        body: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let result = if self.should_fail(FaultKey::Operation(operation)) {
            Err(self.injected(&format!("{:?}", operation)))
        } else {
            body(self)
        };
        self.journal.push(DeviceEvent::Call { operation, succeeded: result.is_ok() });
        result
    }

    // ===== INSPECTION =====

    /// Shared view of the device journal
    pub fn journal(&self) -> DeviceJournal {
        self.journal.clone()
    }

    /// Number of accepted submissions
    pub fn submission_count(&self) -> u64 {
        self.submission_count
    }

    /// Number of presented images
    pub fn presented_count(&self) -> u64 {
        self.presented_count
    }

    pub fn is_fence_signaled(&self, fence: FenceHandle) -> Option<bool> {
        self.fences.get(fence).copied()
    }

    pub fn is_semaphore_signaled(&self, semaphore: SemaphoreHandle) -> Option<bool> {
        self.semaphores.get(semaphore).copied()
    }

    pub fn command_list_state(&self, command_buffer: CommandBufferHandle) -> Option<CommandListState> {
        self.command_lists.get(command_buffer).map(|list| list.state())
    }

    pub fn recorded_commands(&self, command_buffer: CommandBufferHandle) -> Option<&[RecordedCommand]> {
        self.command_lists.get(command_buffer).map(|list| list.commands())
    }

    pub fn shader(&self, shader: ShaderHandle) -> Option<&HeadlessShader> {
        self.shaders.get(shader)
    }

    pub fn buffer_contents(&self, buffer: BufferHandle) -> Option<&[u8]> {
        self.buffers.get(buffer).map(|data| data.as_slice())
    }

    pub fn mesh(&self, mesh: MeshHandle) -> Option<&HeadlessMesh> {
        self.meshes.get(mesh)
    }

    pub fn has_pipeline_cache(&self, name: &str) -> bool {
        self.pipeline_caches.contains(name)
    }

    /// Number of live resources, excluding the swapchain's own semaphores
    pub fn live_resource_count(&self) -> usize {
        self.render_passes.len()
            + self.render_targets.len()
            + self.command_lists.len()
            + self.fences.len()
            + (self.semaphores.len() - 2)
            + self.shaders.len()
            + self.buffers.len()
            + self.pipelines.len()
            + self.meshes.len()
    }

    // ===== VALIDATION =====

    fn is_swapchain_semaphore(&self, semaphore: SemaphoreHandle) -> bool {
        semaphore == self.swapchain.image_available || semaphore == self.swapchain.rendering_done
    }

    fn framebuffer_count(&self, pass: RenderPassRef) -> Option<usize> {
        match pass {
            RenderPassRef::Swapchain(handle) => self.render_passes.get(handle).map(|p| p.framebuffer_count),
            RenderPassRef::Offscreen(handle) => self.render_targets.get(handle).map(|t| t.desc.count),
        }
    }

    /// Check that everything a recorded command buffer references still exists
    fn validate_commands(&self, command_buffer: CommandBufferHandle) -> Result<()> {
        let list = self.command_lists.get(command_buffer)
            .ok_or_else(|| Error::InvalidResource(format!("Unknown command buffer {:?}", command_buffer)))?;

        if list.level() == CommandBufferLevel::Secondary {
            return Err(Error::SubmitFailed(format!(
                "Secondary command buffer {:?} cannot be submitted directly", command_buffer
            )));
        }
        if list.state() != CommandListState::Executable {
            return Err(Error::SubmitFailed(format!(
                "Command buffer {:?} is not executable ({:?})",
                command_buffer,
                list.state()
            )));
        }

        for command in list.commands() {
            match command {
                RecordedCommand::BeginRenderPass { pass, framebuffer_index, .. } => {
                    let count = self.framebuffer_count(*pass).ok_or_else(|| {
                        Error::SubmitFailed(format!("Command buffer references destroyed {:?}", pass))
                    })?;
                    if *framebuffer_index as usize >= count {
                        return Err(Error::SubmitFailed(format!(
                            "Framebuffer index {} out of range ({} framebuffers)",
                            framebuffer_index, count
                        )));
                    }
                }
                RecordedCommand::BindPipeline(pipeline) if !self.pipelines.contains_key(*pipeline) => {
                    return Err(Error::SubmitFailed(format!(
                        "Command buffer references destroyed pipeline {:?}", pipeline
                    )));
                }
                RecordedCommand::BindMesh(mesh) if !self.meshes.contains_key(*mesh) => {
                    return Err(Error::SubmitFailed(format!(
                        "Command buffer references destroyed mesh {:?}", mesh
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn submit_inner(&mut self, submit: &SubmitInfo<'_>) -> Result<()> {
        for semaphore in submit.signal_semaphores {
            if self.should_fail(FaultKey::SubmitSignaling(*semaphore)) {
                return Err(self.injected(&format!("submission signaling {:?}", semaphore)));
            }
        }

        if submit.wait_semaphores.len() != submit.wait_stages.len() {
            engine_bail!(SOURCE, "Submit: {} wait semaphores but {} wait stages",
                submit.wait_semaphores.len(), submit.wait_stages.len());
        }
        if submit.command_buffers.is_empty() {
            engine_bail!(SOURCE, "Submit: no command buffers");
        }

        for &command_buffer in submit.command_buffers {
            self.validate_commands(command_buffer)?;
        }

        for &semaphore in submit.wait_semaphores {
            match self.semaphores.get(semaphore) {
                None => return Err(Error::InvalidResource(format!("Unknown wait semaphore {:?}", semaphore))),
                Some(false) => {
                    return Err(Error::SubmitFailed(format!(
                        "Waits on unsignaled semaphore {:?}; the submission could never start",
                        semaphore
                    )));
                }
                Some(true) => {}
            }
        }
        for &semaphore in submit.signal_semaphores {
            if !self.semaphores.contains_key(semaphore) {
                return Err(Error::InvalidResource(format!("Unknown signal semaphore {:?}", semaphore)));
            }
        }
        if let Some(fence) = submit.fence {
            match self.fences.get(fence) {
                None => return Err(Error::InvalidResource(format!("Unknown fence {:?}", fence))),
                Some(true) => {
                    return Err(Error::SubmitFailed(format!(
                        "Fence {:?} must be reset before submission", fence
                    )));
                }
                Some(false) => {}
            }
        }

        // Execute
        for &semaphore in submit.wait_semaphores {
            self.semaphores[semaphore] = false;
        }
        for &semaphore in submit.signal_semaphores {
            self.semaphores[semaphore] = true;
        }
        if let Some(fence) = submit.fence {
            self.fences[fence] = true;
        }

        let record = SubmissionRecord {
            sequence: self.submission_count,
            command_buffers: submit.command_buffers.to_vec(),
            wait_semaphores: submit.wait_semaphores.to_vec(),
            signal_semaphores: submit.signal_semaphores.to_vec(),
            fence: submit.fence,
        };
        engine_trace!(SOURCE, "Submission #{} executed ({} command buffers)",
            record.sequence, record.command_buffers.len());
        self.submission_count += 1;
        self.journal.push(DeviceEvent::Submitted(record));
        Ok(())
    }
}

impl GraphicsDevice for HeadlessGraphicsDevice {
    fn info(&self) -> DeviceInfo {
        self.info.clone()
    }

    fn swapchain(&self) -> SwapchainInfo {
        self.swapchain
    }

    fn create_render_pass(&mut self, desc: &RenderPassDesc) -> Result<RenderPassHandle> {
        self.run(DeviceOperation::CreateRenderPass, |device| {
            if desc.viewport.width <= 0.0 || desc.viewport.height <= 0.0 {
                engine_bail!(SOURCE, "Render pass viewport {:?} is empty", desc.viewport);
            }
            if desc.color_attachment.format.is_depth() {
                engine_bail!(SOURCE, "Render pass color attachment uses depth format {:?}",
                    desc.color_attachment.format);
            }
            if let Some(depth) = &desc.depth_attachment {
                if !depth.format.is_depth() {
                    engine_bail!(SOURCE, "Render pass depth attachment uses color format {:?}", depth.format);
                }
            }
            let framebuffer_count = device.swapchain.image_count;
            Ok(device.render_passes.insert(HeadlessRenderPass { framebuffer_count }))
        })
    }

    fn create_render_target(&mut self, desc: &RenderTargetDesc) -> Result<RenderTargetHandle> {
        self.run(DeviceOperation::CreateRenderTarget, |device| {
            if desc.count == 0 {
                engine_bail!(SOURCE, "Render target needs at least one framebuffer");
            }
            if desc.scissor.width == 0 || desc.scissor.height == 0 {
                engine_bail!(SOURCE, "Render target extent {}x{} is empty",
                    desc.scissor.width, desc.scissor.height);
            }
            if desc.color_format.is_depth() {
                engine_bail!(SOURCE, "Render target color format {:?} is a depth format", desc.color_format);
            }
            if let Some(depth) = desc.depth_format {
                if !depth.is_depth() {
                    engine_bail!(SOURCE, "Render target depth format {:?} is a color format", depth);
                }
            }
            Ok(device.render_targets.insert(HeadlessRenderTarget { desc: desc.clone() }))
        })
    }

    fn render_target_attachment(
        &self,
        render_target: RenderTargetHandle,
        attachment_index: usize,
    ) -> Result<AttachmentDescriptorInfo> {
        let result = (|| -> Result<AttachmentDescriptorInfo> {
            let target = self.render_targets.get(render_target)
                .ok_or_else(|| Error::InvalidResource(format!("Unknown render target {:?}", render_target)))?;
            let format = match attachment_index {
                0 => target.desc.color_format,
                1 => target.desc.depth_format.ok_or_else(|| {
                    Error::InvalidResource("Render target has no depth attachment".to_string())
                })?,
                _ => {
                    return Err(Error::InvalidResource(format!(
                        "Attachment index {} out of range", attachment_index
                    )));
                }
            };
            Ok(AttachmentDescriptorInfo {
                render_target,
                attachment_index,
                format,
                layout: ImageLayout::ShaderReadOnly,
            })
        })();
        self.journal.push(DeviceEvent::Call {
            operation: DeviceOperation::RenderTargetAttachment,
            succeeded: result.is_ok(),
        });
        result
    }

    fn create_command_buffers(
        &mut self,
        count: usize,
        level: CommandBufferLevel,
    ) -> Result<Vec<CommandBufferHandle>> {
        self.run(DeviceOperation::CreateCommandBuffers, |device| {
            if count == 0 {
                engine_bail!(SOURCE, "Cannot allocate zero command buffers");
            }
            Ok((0..count)
                .map(|_| device.command_lists.insert(HeadlessCommandList::new(level)))
                .collect())
        })
    }

    fn create_fence(&mut self, signaled: bool) -> Result<FenceHandle> {
        self.run(DeviceOperation::CreateFence, |device| Ok(device.fences.insert(signaled)))
    }

    fn create_semaphore(&mut self) -> Result<SemaphoreHandle> {
        self.run(DeviceOperation::CreateSemaphore, |device| Ok(device.semaphores.insert(false)))
    }

    fn create_shader(&mut self, desc: &ShaderStageDesc) -> Result<ShaderHandle> {
        self.run(DeviceOperation::CreateShader, |device| {
            if desc.path.as_os_str().is_empty() {
                engine_bail!(SOURCE, "Shader stage {:?} has no path", desc.stage);
            }
            let shader = HeadlessShader { stages: vec![desc.clone()], bindings: Vec::new() };
            Ok(device.shaders.insert(shader))
        })
    }

    fn add_shader_stage(&mut self, shader: ShaderHandle, desc: &ShaderStageDesc) -> Result<()> {
        self.run(DeviceOperation::AddShaderStage, |device| {
            if desc.path.as_os_str().is_empty() {
                engine_bail!(SOURCE, "Shader stage {:?} has no path", desc.stage);
            }
            let program = device.shaders.get_mut(shader)
                .ok_or_else(|| Error::InvalidResource(format!("Unknown shader {:?}", shader)))?;
            if program.has_stage(desc.stage) {
                engine_bail!(SOURCE, "Shader {:?} already has a {:?} stage", shader, desc.stage);
            }
            program.stages.push(desc.clone());
            Ok(())
        })
    }

    fn set_shader_bindings(&mut self, shader: ShaderHandle, bindings: &[ShaderBinding]) -> Result<()> {
        self.run(DeviceOperation::SetShaderBindings, |device| {
            let mut seen = FxHashSet::default();
            for binding in bindings {
                if !seen.insert(binding.index) {
                    engine_bail!(SOURCE, "Duplicate shader binding index {}", binding.index);
                }
                if !binding.is_consistent() {
                    engine_bail!(SOURCE, "Binding {} declares {:?} but binds {:?}",
                        binding.index, binding.binding_type, binding.resource);
                }
                let exists = match binding.resource {
                    BindingResource::Image(info) => device.render_targets.contains_key(info.render_target),
                    BindingResource::Buffer { buffer, offset, range } => device.buffers
                        .get(buffer)
                        .zip(offset.checked_add(range))
                        .is_some_and(|(data, end)| end <= data.len() as u64),
                };
                if !exists {
                    engine_bail!(SOURCE, "Binding {} references a missing resource", binding.index);
                }
            }
            let program = device.shaders.get_mut(shader)
                .ok_or_else(|| Error::InvalidResource(format!("Unknown shader {:?}", shader)))?;
            program.bindings = bindings.to_vec();
            Ok(())
        })
    }

    fn create_uniform_buffer(&mut self, size: u64) -> Result<BufferHandle> {
        self.run(DeviceOperation::CreateUniformBuffer, |device| {
            if size == 0 {
                engine_bail!(SOURCE, "Uniform buffer size must be positive");
            }
            Ok(device.buffers.insert(vec![0u8; size as usize]))
        })
    }

    fn update_buffer(&mut self, buffer: BufferHandle, offset: u64, data: &[u8]) -> Result<()> {
        self.run(DeviceOperation::UpdateBuffer, |device| {
            let contents = device.buffers.get_mut(buffer)
                .ok_or_else(|| Error::InvalidResource(format!("Unknown buffer {:?}", buffer)))?;
            let range = usize::try_from(offset)
                .ok()
                .and_then(|start| Some(start..start.checked_add(data.len())?))
                .filter(|range| range.end <= contents.len());
            let Some(range) = range else {
                return Err(Error::InvalidResource(format!(
                    "Buffer update of {} bytes at offset {} exceeds size {}",
                    data.len(), offset, contents.len()
                )));
            };
            contents[range].copy_from_slice(data);
            Ok(())
        })
    }

    fn create_pipeline_cache(&mut self, name: &str) -> Result<()> {
        self.run(DeviceOperation::CreatePipelineCache, |device| {
            if name.is_empty() {
                engine_bail!(SOURCE, "Pipeline cache name is empty");
            }
            device.pipeline_caches.insert(name.to_string());
            Ok(())
        })
    }

    fn create_pipeline(&mut self, desc: &PipelineDesc) -> Result<PipelineHandle> {
        self.run(DeviceOperation::CreatePipeline, |device| {
            if !device.render_passes.contains_key(desc.render_pass) {
                engine_bail!(SOURCE, "Pipeline references unknown render pass {:?}", desc.render_pass);
            }
            let shader = device.shaders.get(desc.shader)
                .ok_or_else(|| engine_err!(SOURCE, "Pipeline references unknown shader {:?}", desc.shader))?;
            if !shader.has_stage(ShaderStage::Vertex) || !shader.has_stage(ShaderStage::Fragment) {
                engine_bail!(SOURCE, "Pipeline shader needs both vertex and fragment stages");
            }
            if desc.viewports.is_empty() || desc.viewports.len() != desc.scissors.len() {
                engine_bail!(SOURCE, "Pipeline needs one scissor per viewport ({} viewports, {} scissors)",
                    desc.viewports.len(), desc.scissors.len());
            }
            if let Some(cache) = &desc.pipeline_cache {
                if !device.pipeline_caches.contains(cache) {
                    engine_debug!(SOURCE, "Pipeline cache '{}' not found, creating pipeline uncached", cache);
                }
            }
            Ok(device.pipelines.insert(HeadlessPipeline { desc: desc.clone() }))
        })
    }

    fn create_mesh(&mut self, desc: &MeshDesc<'_>) -> Result<MeshHandle> {
        self.run(DeviceOperation::CreateMesh, |device| {
            if !desc.is_well_formed() {
                engine_bail!(SOURCE, "Mesh data is malformed ({} vertex bytes, {} indices)",
                    desc.vertex_data.len(), desc.indices.len());
            }
            Ok(device.meshes.insert(HeadlessMesh {
                vertex_declaration: desc.vertex_declaration,
                vertex_data: desc.vertex_data.to_vec(),
                indices: desc.indices.to_vec(),
            }))
        })
    }

    fn command_list(&mut self, command_buffer: CommandBufferHandle) -> Result<&mut dyn CommandList> {
        let operation = DeviceOperation::CommandList;
        if self.should_fail(FaultKey::Operation(operation)) {
            self.journal.push(DeviceEvent::Call { operation, succeeded: false });
            return Err(self.injected("CommandList"));
        }
        let exists = self.command_lists.contains_key(command_buffer);
        self.journal.push(DeviceEvent::Call { operation, succeeded: exists });
        match self.command_lists.get_mut(command_buffer) {
            Some(list) => Ok(list as &mut dyn CommandList),
            None => Err(Error::InvalidResource(format!("Unknown command buffer {:?}", command_buffer))),
        }
    }

    fn submit(&mut self, submit: &SubmitInfo<'_>) -> Result<()> {
        self.run(DeviceOperation::Submit, |device| device.submit_inner(submit))
    }

    fn wait_for_fence(&mut self, fence: FenceHandle, timeout: Duration) -> Result<()> {
        let result = self.run(DeviceOperation::WaitForFence, |device| {
            match device.fences.get(fence) {
                None => Err(Error::InvalidResource(format!("Unknown fence {:?}", fence))),
                Some(true) => Ok(()),
                Some(false) => Err(Error::Timeout(format!(
                    "Fence {:?} not signaled within {:?}", fence, timeout
                ))),
            }
        });
        self.journal.push(DeviceEvent::FenceWaited { fence, succeeded: result.is_ok() });
        result
    }

    fn reset_fence(&mut self, fence: FenceHandle) -> Result<()> {
        self.run(DeviceOperation::ResetFence, |device| {
            let state = device.fences.get_mut(fence)
                .ok_or_else(|| Error::InvalidResource(format!("Unknown fence {:?}", fence)))?;
            *state = false;
            device.journal.push(DeviceEvent::FenceReset { fence });
            Ok(())
        })
    }

    fn wait_idle(&mut self) -> Result<()> {
        // Submissions complete on acceptance, so the queue is always idle
        self.run(DeviceOperation::WaitIdle, |_| Ok(()))
    }

    fn acquire_next_image(&mut self) -> Result<u32> {
        self.run(DeviceOperation::AcquireNextImage, |device| {
            let index = device.next_image;
            device.next_image = (index + 1) % device.swapchain.image_count as u32;
            device.acquired_image = Some(index);
            device.semaphores[device.swapchain.image_available] = true;
            Ok(index)
        })
    }

    fn present(&mut self, image_index: u32) -> Result<()> {
        self.run(DeviceOperation::Present, |device| {
            if device.acquired_image != Some(image_index) {
                return Err(Error::InvalidResource(format!(
                    "Image {} presented but {:?} was acquired", image_index, device.acquired_image
                )));
            }
            let rendering_done = device.swapchain.rendering_done;
            if !device.semaphores[rendering_done] {
                return Err(Error::SubmitFailed(format!(
                    "Image {} presented before rendering finished", image_index
                )));
            }
            device.semaphores[rendering_done] = false;
            device.acquired_image = None;
            device.presented_count += 1;
            Ok(())
        })
    }

    fn destroy(&mut self, resource: DeviceResource) -> bool {
        let removed = match resource {
            DeviceResource::RenderPass(h) => self.render_passes.remove(h).is_some(),
            DeviceResource::RenderTarget(h) => self.render_targets.remove(h).is_some(),
            DeviceResource::CommandBuffer(h) => self.command_lists.remove(h).is_some(),
            DeviceResource::Fence(h) => self.fences.remove(h).is_some(),
            DeviceResource::Semaphore(h) => {
                !self.is_swapchain_semaphore(h) && self.semaphores.remove(h).is_some()
            }
            DeviceResource::Shader(h) => self.shaders.remove(h).is_some(),
            DeviceResource::Buffer(h) => self.buffers.remove(h).is_some(),
            DeviceResource::Pipeline(h) => self.pipelines.remove(h).is_some(),
            DeviceResource::Mesh(h) => self.meshes.remove(h).is_some(),
        };
        if removed {
            self.journal.push(DeviceEvent::Destroyed(resource));
        } else {
            engine_debug!(SOURCE, "Ignoring release of missing {}", resource.kind());
        }
        removed
    }
}

#[cfg(test)]
#[path = "headless_tests.rs"]
mod tests;
