//! Framebuffers and the framebuffer pipeline
//!
//! Framebuffers are bound through a `DeviceContext` that owns the bind stack.
//! The pipeline cycles a fixed pool of framebuffers through the
//! geometry → post-process → present flow.

mod bind_stack;
mod device_context;
mod framebuffer;
mod framebuffer_pipeline;

pub use bind_stack::BindStack;
pub use device_context::DeviceContext;
pub use framebuffer::{
    Framebuffer, FramebufferDesc, FramebufferId, FramebufferTargets, TargetSlot,
    TARGET_SLOT_COUNT,
};
pub use framebuffer_pipeline::{
    FramebufferPipeline, PipelineState, PING_PONG_COUNT, SAVED_FRAMES,
};
