/// Graphics device module - the engine capability set and its headless implementation

// Module declarations
pub mod handles;
pub mod color;
pub mod command_list;
pub mod render_pass;
pub mod pipeline;
pub mod buffer;
pub mod sync;
pub mod graphics_device;
pub mod headless;

// Re-export everything from graphics_device.rs
pub use graphics_device::*;

// Re-export from other modules
pub use handles::*;
pub use color::*;
pub use command_list::*;
pub use render_pass::*;
pub use pipeline::*;
pub use buffer::*;
pub use sync::*;
pub use headless::{
    CommandListState, DeviceEvent, DeviceJournal, DeviceOperation, FailMode, HeadlessCommandList,
    HeadlessGraphicsDevice, HeadlessMesh, HeadlessShader, RecordedCommand, SubmissionRecord,
    DEFAULT_SWAPCHAIN_IMAGE_COUNT,
};
