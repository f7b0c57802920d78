/// GraphicsDevice trait - the immediate command context the core drives

use std::sync::Arc;
use crate::error::Result;
use crate::graphics_device::{Texture, TextureDesc};

/// Fixed-function state profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderProfile {
    /// Depth test and blending enabled (scene geometry)
    Geometry,
    /// No depth test, no blending (fullscreen post-processing)
    PostProcess,
}

/// The set of images a framebuffer activates as render targets
#[derive(Clone, Default)]
pub struct RenderTargetSet {
    /// Color attachments in slot order
    pub colors: Vec<Arc<dyn Texture>>,
    /// Depth attachment (own or overridden)
    pub depth: Option<Arc<dyn Texture>>,
    /// Whether the depth attachment is read-only (shared depth override)
    pub depth_read_only: bool,
}

impl RenderTargetSet {
    /// Labels of every attachment, colors first, for diagnostics
    pub fn labels(&self) -> Vec<String> {
        self.colors
            .iter()
            .chain(self.depth.iter())
            .map(|t| t.info().label.clone())
            .collect()
    }
}

/// Graphics device trait
///
/// Implemented by the native backend. All calls are issued from the
/// rendering thread and execute in submission order.
pub trait GraphicsDevice {
    /// Allocate a texture
    fn create_texture(&mut self, desc: TextureDesc) -> Result<Arc<dyn Texture>>;

    /// Make `targets` the active render targets
    fn set_render_targets(&mut self, targets: &RenderTargetSet) -> Result<()>;

    /// Deactivate all render targets (rendering falls back to the
    /// presentation surface)
    fn unset_render_targets(&mut self) -> Result<()>;

    /// Clear a color attachment
    fn clear_color(&mut self, target: &Arc<dyn Texture>, color: [f32; 4]) -> Result<()>;

    /// Clear a depth attachment
    fn clear_depth(&mut self, target: &Arc<dyn Texture>, depth: f32) -> Result<()>;

    /// Resolve / down-sample `src` into `dst`
    fn resolve(&mut self, src: &Arc<dyn Texture>, dst: &Arc<dyn Texture>) -> Result<()>;

    /// Switch fixed-function state
    fn set_render_profile(&mut self, profile: RenderProfile) -> Result<()>;
}
