/// Unit tests for RenderToTargetScene

use super::*;
use crate::graphics_device::{
    DeviceOperation, FailMode, HeadlessGraphicsDevice, RecordedCommand,
};
use crate::rtt::Engine;
use crate::rtt::log::{LogEntry, LogSeverity, Logger};
use serial_test::serial;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

fn setup() -> (HeadlessGraphicsDevice, RenderToTargetScene, TelemetrySlot) {
    let config = Config::default();
    let device = HeadlessGraphicsDevice::new(&config).unwrap();
    let telemetry = TelemetrySlot::new();
    let scene = RenderToTargetScene::new(&config, telemetry.clone());
    (device, scene, telemetry)
}

fn loaded() -> (HeadlessGraphicsDevice, RenderToTargetScene, TelemetrySlot) {
    let (mut device, mut scene, telemetry) = setup();
    scene.load(&mut device).unwrap();
    (device, scene, telemetry)
}

fn game_time_at(seconds: u64) -> GameTime {
    let mut time = GameTime::new();
    time.set_max_delta(Duration::from_secs(3600));
    let start = Instant::now();
    time.tick_at(start, |_| {});
    time.tick_at(start + Duration::from_secs(seconds), |_| {});
    time
}

struct CaptureLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl Logger for CaptureLogger {
    fn log(&self, entry: &LogEntry) {
        self.entries.lock().unwrap().push(entry.clone());
    }
}

// ============================================================================
// Load
// ============================================================================

#[test]
fn test_load_step_order() {
    let (mut device, mut scene, _) = setup();
    scene.load(&mut device).unwrap();

    use DeviceOperation::*;
    let mut expected = vec![
        CreateRenderPass,
        CreateSemaphore,
        CreateFence,
        CreateCommandBuffers,
        CreateCommandBuffers,
        CreateRenderTarget,
        CreateSemaphore,
        CreateFence,
        CreateShader,
        AddShaderStage,
        CreateUniformBuffer,
        UpdateBuffer,
        RenderTargetAttachment,
        SetShaderBindings,
        CreatePipelineCache,
        CreatePipeline,
        CreateMesh,
    ];
    expected.extend(std::iter::repeat(CommandList).take(3));
    assert_eq!(device.journal().operations(), expected);
    assert!(scene.is_loaded());
}

#[test]
fn test_load_creates_resources() {
    let (device, scene, _) = loaded();

    assert_eq!(scene.composite_commands().len(), 3);
    assert_eq!(scene.offscreen_commands().len(), 3);
    assert!(scene.offscreen_sync().is_some());
    assert!(scene.composite_sync().is_some());
    assert!(device.has_pipeline_cache(PIPELINE_CACHE_NAME));

    // 4 sync primitives, 6 command buffers, pass, target, shader, uniform, pipeline, mesh
    assert_eq!(device.live_resource_count(), 16);

    let mesh = device.mesh(scene.mesh().unwrap()).unwrap();
    assert_eq!(mesh.vertex_count(), 4);
    assert_eq!(mesh.indices, vec![0, 1, 3, 3, 1, 2]);
    assert_eq!(mesh.vertex_declaration, VertexDeclaration::PositionUv);
}

#[test]
fn test_load_shader_stages_and_bindings() {
    let (device, scene, _) = loaded();
    let shader = device.shader(scene.shader().unwrap()).unwrap();

    let paths: Vec<PathBuf> = shader.stages.iter().map(|s| s.path.clone()).collect();
    assert_eq!(
        paths,
        vec![
            PathBuf::from("content").join("shaders").join("shader.vert.spv"),
            PathBuf::from("content").join("shaders").join("shader.frag.spv"),
        ]
    );

    assert_eq!(shader.bindings.len(), 2);
    let sampler = shader.bindings[0];
    assert_eq!(sampler.index, 0);
    assert_eq!(sampler.binding_type, ShaderBindingType::Sampler2D);
    assert_eq!(sampler.stage, ShaderStage::Fragment);
    match sampler.resource {
        BindingResource::Image(info) => {
            assert_eq!(Some(info.render_target), scene.render_target());
            assert_eq!(info.attachment_index, 0);
        }
        other => panic!("unexpected sampler resource {:?}", other),
    }

    let uniform = shader.bindings[1];
    assert_eq!(uniform.index, 1);
    assert_eq!(uniform.binding_type, ShaderBindingType::Uniform);
    assert_eq!(uniform.stage, ShaderStage::Vertex);
    assert_eq!(
        uniform.resource,
        BindingResource::Buffer { buffer: scene.uniform_buffer().unwrap(), offset: 0, range: 64 }
    );
}

#[test]
fn test_load_uploads_identity_matrix() {
    let (device, scene, _) = loaded();
    let contents = device.buffer_contents(scene.uniform_buffer().unwrap()).unwrap();
    assert_eq!(contents.len(), 64);
    assert_eq!(contents, bytemuck::bytes_of(&Mat4::IDENTITY));
}

#[test]
fn test_load_records_composite_commands() {
    let (device, scene, _) = loaded();
    let render_pass = scene.render_pass().unwrap();

    for (index, &cmd) in scene.composite_commands().iter().enumerate() {
        let commands = device.recorded_commands(cmd).unwrap();
        assert_eq!(
            commands.to_vec(),
            vec![
                RecordedCommand::BeginRenderPass {
                    pass: RenderPassRef::Swapchain(render_pass),
                    framebuffer_index: index as u32,
                    clear_values: vec![Color::CORNFLOWER_BLUE.to_clear_value(), DEPTH_CLEAR],
                },
                RecordedCommand::BindPipeline(scene.pipeline().unwrap()),
                RecordedCommand::BindMesh(scene.mesh().unwrap()),
                RecordedCommand::DrawIndexed { index_count: 6, first_index: 0, vertex_offset: 0 },
                RecordedCommand::EndRenderPass,
            ]
        );
    }
}

#[test]
fn test_load_twice_is_noop() {
    let (mut device, mut scene, _) = loaded();
    let before = device.live_resource_count();
    scene.load(&mut device).unwrap();
    assert_eq!(device.live_resource_count(), before);
}

// ============================================================================
// Load failures
// ============================================================================

#[test]
#[serial]
fn test_render_pass_failure_aborts_load() {
    let entries = Arc::new(Mutex::new(Vec::new()));
    Engine::set_logger(CaptureLogger { entries: entries.clone() });

    let (mut device, mut scene, _) = setup();
    device.fail_operation(DeviceOperation::CreateRenderPass, FailMode::Always);
    let result = scene.load(&mut device);

    Engine::reset_logger();

    match result {
        Err(Error::InitializationFailed(message)) => assert!(message.contains("loading render pass")),
        other => panic!("expected InitializationFailed, got {:?}", other),
    }
    assert_eq!(device.journal().operations(), vec![DeviceOperation::CreateRenderPass]);
    assert_eq!(device.live_resource_count(), 0);
    assert!(!scene.is_loaded());

    let entries = entries.lock().unwrap();
    assert!(entries.iter().any(|entry| entry.severity == LogSeverity::Error
        && entry.source == "rtt::Scene"
        && entry.message.starts_with("Error on loading render pass")));
}

#[test]
fn test_midway_failure_releases_everything() {
    let (mut device, mut scene, _) = setup();
    device.fail_operation(DeviceOperation::CreatePipeline, FailMode::Always);

    let err = scene.load(&mut device).unwrap_err();
    assert!(err.to_string().contains("creating pipeline"));
    assert_eq!(device.live_resource_count(), 0);
    assert_eq!(device.journal().call_count(DeviceOperation::CreateMesh), 0);
    assert!(scene.offscreen_sync().is_none());
    assert!(scene.composite_commands().is_empty());
    assert_eq!(scene.release(&mut device), 0);
}

#[test]
fn test_fence_failure_releases_lone_semaphore() {
    let (mut device, mut scene, _) = setup();
    device.fail_operation(DeviceOperation::CreateFence, FailMode::Once);

    let err = scene.load(&mut device).unwrap_err();
    assert!(err.to_string().contains("initializing fence(s)"));
    assert!(scene.composite_sync().is_none());
    assert_eq!(device.live_resource_count(), 0);
}

#[test]
fn test_fragment_shader_failure_is_fatal() {
    let (mut device, mut scene, _) = setup();
    device.fail_operation(DeviceOperation::AddShaderStage, FailMode::Once);
    let err = scene.load(&mut device).unwrap_err();
    assert!(err.to_string().contains("loading fragment shader"));
    assert_eq!(device.journal().call_count(DeviceOperation::CreateUniformBuffer), 0);
}

#[test]
fn test_recording_failure_is_fatal() {
    let (mut device, mut scene, _) = setup();
    device.fail_operation(DeviceOperation::CommandList, FailMode::Once);
    let err = scene.load(&mut device).unwrap_err();
    assert!(err.to_string().contains("building command buffers"));
    assert_eq!(device.live_resource_count(), 0);
}

#[test]
fn test_binding_and_cache_failures_are_not_fatal() {
    let (mut device, mut scene, _) = setup();
    device.fail_operation(DeviceOperation::SetShaderBindings, FailMode::Always);
    device.fail_operation(DeviceOperation::CreatePipelineCache, FailMode::Always);

    scene.load(&mut device).unwrap();
    assert!(scene.is_loaded());
    assert!(scene.pipeline().is_some());
    assert!(!device.has_pipeline_cache(PIPELINE_CACHE_NAME));
}

// ============================================================================
// Frame
// ============================================================================

#[test]
fn test_update_rerecords_offscreen_with_clear_color() {
    let (mut device, mut scene, telemetry) = loaded();
    let time = game_time_at(1);
    scene.update(&mut device, &time).unwrap();

    let color = scene.clear_color();
    assert_eq!(color, Color::rgba(215, 138, 155, 255));

    let render_target = scene.render_target().unwrap();
    for (index, &cmd) in scene.offscreen_commands().iter().enumerate() {
        assert_eq!(
            device.recorded_commands(cmd).unwrap().to_vec(),
            vec![
                RecordedCommand::BeginRenderPass {
                    pass: RenderPassRef::Offscreen(render_target),
                    framebuffer_index: index as u32,
                    clear_values: vec![color.to_clear_value(), DEPTH_CLEAR],
                },
                RecordedCommand::EndRenderPass,
            ]
        );
    }

    let snapshot = telemetry.latest().unwrap();
    assert!((snapshot.total_time - 1.0).abs() < 1e-9);
}

#[test]
fn test_update_before_load_fails() {
    let (mut device, mut scene, telemetry) = setup();
    assert!(scene.update(&mut device, &GameTime::new()).is_err());
    assert!(telemetry.latest().is_some());
}

#[test]
fn test_pre_render_submits_both_passes() {
    let (mut device, mut scene, _) = loaded();
    scene.update(&mut device, &game_time_at(2)).unwrap();

    let image = device.acquire_next_image().unwrap();
    scene.pre_render(&mut device, image).unwrap();
    device.present(image).unwrap();

    let submissions = device.journal().submissions();
    assert_eq!(submissions.len(), 2);
    assert_eq!(submissions[0].command_buffers, vec![scene.offscreen_commands()[image as usize]]);
    assert_eq!(submissions[1].command_buffers, vec![scene.composite_commands()[image as usize]]);
}

#[test]
fn test_pre_render_before_update_is_dropped() {
    let (mut device, scene, _) = loaded();
    let image = device.acquire_next_image().unwrap();
    // Offscreen buffers have never been recorded
    let err = scene.pre_render(&mut device, image).unwrap_err();
    assert!(matches!(err, FrameError::SubmitOffscreen(_)));
}

#[test]
fn test_pre_render_unloaded_or_bad_index() {
    let (mut device, scene, _) = setup();
    assert!(matches!(scene.pre_render(&mut device, 0), Err(FrameError::SubmitOffscreen(_))));

    let (mut device, scene, _) = loaded();
    assert!(matches!(scene.pre_render(&mut device, 7), Err(FrameError::SubmitOffscreen(_))));
}

#[test]
fn test_set_world_view_projection() {
    let (mut device, mut scene, _) = loaded();
    let matrix = Mat4::from_scale(glam::Vec3::splat(2.0));
    scene.set_world_view_projection(&mut device, matrix).unwrap();

    assert_eq!(scene.world_view_projection(), matrix);
    let contents = device.buffer_contents(scene.uniform_buffer().unwrap()).unwrap();
    assert_eq!(contents, bytemuck::bytes_of(&matrix));
}

#[test]
fn test_set_world_view_projection_before_load() {
    let (mut device, mut scene, _) = setup();
    let matrix = Mat4::from_translation(glam::Vec3::new(1.0, 0.0, 0.0));
    scene.set_world_view_projection(&mut device, matrix).unwrap();
    scene.load(&mut device).unwrap();

    let contents = device.buffer_contents(scene.uniform_buffer().unwrap()).unwrap();
    assert_eq!(contents, bytemuck::bytes_of(&matrix));
}

// ============================================================================
// Release
// ============================================================================

#[test]
fn test_release_is_idempotent() {
    let (mut device, mut scene, _) = loaded();
    assert_eq!(scene.release(&mut device), 16);
    assert_eq!(scene.release(&mut device), 0);
    assert_eq!(device.live_resource_count(), 0);
    assert!(!scene.is_loaded());
}

#[test]
fn test_release_order() {
    let (mut device, mut scene, _) = loaded();
    device.journal().clear();
    scene.release(&mut device);

    let kinds: Vec<&str> = device
        .journal()
        .events()
        .into_iter()
        .filter_map(|event| match event {
            crate::graphics_device::DeviceEvent::Destroyed(resource) => Some(resource.kind()),
            _ => None,
        })
        .collect();

    let mut expected = vec!["fence", "semaphore", "fence", "semaphore"];
    expected.extend(std::iter::repeat("command buffer").take(6));
    expected.extend(["render pass", "render target", "shader", "pipeline", "mesh", "buffer"]);
    assert_eq!(kinds, expected);
}
