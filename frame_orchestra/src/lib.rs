/*!
# Frame Orchestra

Frame orchestration core for a real-time renderer.

This crate sequences the rendering passes of a frame, wires the named
resources they exchange, validates that every declared requirement is
satisfied before the first frame, and cycles a fixed pool of framebuffers
through the geometry → post-process → present flow.

## Architecture

- **Graph**: ordered passes plus a resource manager, executed once per frame
- **ResourceManager**: per-pass produced, required and incoming resources
- **Pass**: trait implemented by rendering stages (`apply()` plus named outputs)
- **Framebuffer**: group of render targets with stack-disciplined bind/unbind
- **FramebufferPipeline**: geometry ring plus ping-pong pair for post-processing
- **GraphicsDevice**: backend seam that allocates textures and binds targets

Backends implement `GraphicsDevice` and `Texture`; the core never talks to a
graphics API directly.
*/

// Internal modules
mod config;
mod error;
mod framebuffer;
pub mod graphics_device;
pub mod log;
mod render_graph;

// Main orchestra namespace module
pub mod orchestra {
    // Error types
    pub use crate::error::{Error, Result};

    // Configuration
    pub use crate::config::{ExecutionOrder, OrchestraConfig, ValidationMode};

    // Render graph
    pub use crate::render_graph::{
        Camera, Graph, LabelId, LabelInterner, NamedResource, Pass, PassContext, PassId,
        PassResources, RenderContext, Renderable, ResourceHandle, ResourceLink, ResourceManager,
    };

    // Framebuffers
    pub use crate::framebuffer::{
        BindStack, DeviceContext, Framebuffer, FramebufferDesc, FramebufferId,
        FramebufferPipeline, FramebufferTargets, PipelineState, TargetSlot, PING_PONG_COUNT,
        SAVED_FRAMES, TARGET_SLOT_COUNT,
    };

    // Logging sub-module (types only, NOT macros)
    pub mod log {
        pub use crate::log::{DefaultLogger, LogEntry, LogSeverity, Logger};
    }

    // Backend seam
    pub mod device {
        pub use crate::graphics_device::*;
    }
}

// Re-export math and window-size types used in the public API
pub use glam;
pub use winit::dpi::PhysicalSize;
