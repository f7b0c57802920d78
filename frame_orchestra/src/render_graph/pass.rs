/// Pass trait and the context handed to `Pass::apply()`.
///
/// A pass is one rendering step of the frame. It reads named inputs wired
/// to it by the resource manager, renders, and exposes named outputs that
/// the graph pulls after every successful `apply()`.

use slotmap::new_key_type;
use winit::dpi::PhysicalSize;
use crate::error::Result;
use crate::framebuffer::DeviceContext;
use super::named_resource::{NamedResource, ResourceHandle};
use super::render_context::RenderContext;
use super::resource_manager::ResourceManager;

new_key_type! {
    /// Stable key of a pass registered in a `Graph`
    pub struct PassId;
}

/// One step of the frame
///
/// Only `name()` and `apply()` are mandatory. Passes without outputs keep
/// the default `produce_output()`, passes without inputs ignore `set_input()`.
pub trait Pass {
    /// Display name, used in errors and logs
    fn name(&self) -> &str;

    /// Render one frame's worth of work
    fn apply(&mut self, ctx: &mut PassContext<'_>) -> Result<()>;

    /// Labels this pass can produce, used by `Graph::declare_outputs()`
    fn output_labels(&self) -> Vec<&str> {
        Vec::new()
    }

    /// Resource currently backing output `label`, `None` if not produced
    ///
    /// Called when the output is declared or linked and again after every
    /// successful `apply()`, so an implementation may hand out a different
    /// handle each frame.
    fn produce_output(&self, _label: &str) -> Option<ResourceHandle> {
        None
    }

    /// Receive an incoming resource (on link and after each producer refresh)
    fn set_input(&mut self, _resource: &NamedResource) {}

    /// Pass-level switch, checked together with the graph's own flag
    fn is_enabled(&self) -> bool {
        true
    }

    /// Recreate size-dependent state
    fn on_resize(&mut self, _device: &mut DeviceContext, _size: PhysicalSize<u32>) -> Result<()> {
        Ok(())
    }

    fn has_debug_window(&self) -> bool {
        false
    }

    fn open_debug_window(&mut self) {}
}

/// Everything a pass may touch during `apply()`
pub struct PassContext<'a> {
    pub render: &'a RenderContext<'a>,
    pub device: &'a mut DeviceContext,
    pub resources: &'a ResourceManager,
    pub pass: PassId,
    pub frame_index: u64,
}

impl<'a> PassContext<'a> {
    /// Incoming resource wired to this pass under `label`
    pub fn input(&self, label: &str) -> Option<&NamedResource> {
        if !self.resources.requires(self.pass, label) {
            crate::orchestra_warn!(
                "orchestra::Pass",
                "Reading input '{}' that was never declared as a requirement",
                label
            );
        }
        self.resources.incoming(self.pass, label)
    }

    /// Incoming resource, only if its producer ran during this frame
    pub fn fresh_input(&self, label: &str) -> Option<&NamedResource> {
        self.input(label).filter(|r| r.is_fresh(self.frame_index))
    }
}
