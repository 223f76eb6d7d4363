//! Scene module
//!
//! The render-to-target scene, its quad geometry and the render loop that
//! drives it.

pub mod quad;
mod render_to_target_scene;
mod render_loop;

pub use quad::{quad_mesh_desc, Vertex, QUAD_INDICES, QUAD_VERTICES};
pub use render_to_target_scene::{RenderToTargetScene, PIPELINE_CACHE_NAME, UNIFORM_BUFFER_SIZE};
pub use render_loop::{
    spawn_render_thread, FrameDrop, FrameOutcome, LoopStats, RenderLoop, RENDER_THREAD_NAME,
};
