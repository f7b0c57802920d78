//! Render graph module
//!
//! Passes, the named resources they exchange, the resource manager that
//! wires and validates them, and the graph that runs them once per frame.

mod named_resource;
mod pass;
mod render_context;
mod render_graph;
mod resource_manager;

#[cfg(test)]
pub(crate) mod mock_pass;

pub use named_resource::{LabelId, LabelInterner, NamedResource, ResourceHandle};
pub use pass::{Pass, PassContext, PassId};
pub use render_context::{Camera, RenderContext, Renderable};
pub use render_graph::Graph;
pub use resource_manager::{PassResources, ResourceLink, ResourceManager};
