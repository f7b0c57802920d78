/// Mock Pass for unit tests
///
/// Records applies, delivered inputs and observed inputs into a shared
/// probe so tests can inspect a pass after handing it to the graph.

use std::sync::{Arc, Mutex};
use rustc_hash::FxHashMap;
use winit::dpi::PhysicalSize;
use crate::error::{Error, Result};
use crate::framebuffer::DeviceContext;
use crate::graphics_device::mock_graphics_device::MockTexture;
use crate::graphics_device::Texture;
use super::named_resource::{NamedResource, ResourceHandle};
use super::pass::{Pass, PassContext};

/// What a MockPass saw
#[derive(Debug, Default)]
pub struct PassProbe {
    /// Frame index of every `apply()`
    pub applied: Vec<u64>,
    /// `(label, refreshed_frame)` for every `set_input()`
    pub received: Vec<(String, Option<u64>)>,
    /// `(label, refreshed_frame)` read through `PassContext::input()` during apply
    pub observed: Vec<(String, Option<u64>)>,
    pub resized: Vec<PhysicalSize<u32>>,
    pub debug_windows_opened: u32,
}

pub struct MockPass {
    name: String,
    outputs: FxHashMap<String, Arc<dyn Texture>>,
    reads: Vec<String>,
    pub enabled: bool,
    pub fail: bool,
    pub debug_window: bool,
    probe: Arc<Mutex<PassProbe>>,
}

impl MockPass {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            outputs: FxHashMap::default(),
            reads: Vec::new(),
            enabled: true,
            fail: false,
            debug_window: false,
            probe: Arc::new(Mutex::new(PassProbe::default())),
        }
    }

    /// Produce `label` backed by a fresh 64x64 mock texture
    pub fn producing(mut self, label: &str) -> Self {
        self.outputs.insert(label.to_string(), MockTexture::shared(label, 64, 64));
        self
    }

    /// Read `label` through the pass context on every apply
    pub fn reading(mut self, label: &str) -> Self {
        self.reads.push(label.to_string());
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn with_debug_window(mut self) -> Self {
        self.debug_window = true;
        self
    }

    pub fn probe(&self) -> Arc<Mutex<PassProbe>> {
        self.probe.clone()
    }
}

impl Pass for MockPass {
    fn name(&self) -> &str {
        &self.name
    }

    fn apply(&mut self, ctx: &mut PassContext<'_>) -> Result<()> {
        if self.fail {
            return Err(Error::BackendError(format!("{} failed", self.name)));
        }
        let mut probe = self.probe.lock().unwrap();
        probe.applied.push(ctx.frame_index);
        for label in &self.reads {
            let seen = ctx.input(label).and_then(|r| r.refreshed_frame());
            probe.observed.push((label.clone(), seen));
        }
        Ok(())
    }

    fn output_labels(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = self.outputs.keys().map(String::as_str).collect();
        labels.sort_unstable();
        labels
    }

    fn produce_output(&self, label: &str) -> Option<ResourceHandle> {
        self.outputs
            .get(label)
            .map(|texture| ResourceHandle::from_texture(texture.clone()))
    }

    fn set_input(&mut self, resource: &NamedResource) {
        self.probe
            .lock()
            .unwrap()
            .received
            .push((resource.label().to_string(), resource.refreshed_frame()));
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn on_resize(&mut self, _device: &mut DeviceContext, size: PhysicalSize<u32>) -> Result<()> {
        // Recreate every output at the new size, like a pass owning framebuffers
        for (label, texture) in self.outputs.iter_mut() {
            *texture = MockTexture::shared(label, size.width, size.height);
        }
        self.probe.lock().unwrap().resized.push(size);
        Ok(())
    }

    fn has_debug_window(&self) -> bool {
        self.debug_window
    }

    fn open_debug_window(&mut self) {
        self.probe.lock().unwrap().debug_windows_opened += 1;
    }
}
