/// Device context: the graphics device plus the framebuffer bind stack.
///
/// Passed by `&mut` to every bind/unbind so the stack has an explicit
/// owner and lifetime.

use crate::config::OrchestraConfig;
use crate::error::Result;
use crate::graphics_device::{GraphicsDevice, RenderTargetSet};
use super::bind_stack::{BindEntry, BindStack};
use super::framebuffer::FramebufferId;

pub struct DeviceContext {
    device: Box<dyn GraphicsDevice>,
    bind_stack: BindStack,
    config: OrchestraConfig,
}

impl DeviceContext {
    pub fn new(device: Box<dyn GraphicsDevice>, config: OrchestraConfig) -> Self {
        let bind_stack = BindStack::new(config.max_bind_depth);
        Self {
            device,
            bind_stack,
            config,
        }
    }

    pub fn device(&self) -> &dyn GraphicsDevice {
        self.device.as_ref()
    }

    pub fn device_mut(&mut self) -> &mut dyn GraphicsDevice {
        self.device.as_mut()
    }

    pub fn bind_stack(&self) -> &BindStack {
        &self.bind_stack
    }

    pub fn config(&self) -> &OrchestraConfig {
        &self.config
    }

    /// Push `id` and activate its targets
    ///
    /// If the device rejects the targets the entry is popped again, so the
    /// stack only ever holds framebuffers that were actually activated.
    pub(crate) fn push_targets(
        &mut self,
        id: FramebufferId,
        label: &str,
        targets: RenderTargetSet,
    ) -> Result<()> {
        self.bind_stack.push(BindEntry {
            id,
            label: label.to_string(),
            targets: targets.clone(),
        });
        if let Err(err) = self.device.set_render_targets(&targets) {
            self.bind_stack.pop(id, label);
            crate::orchestra_error!("orchestra::Framebuffer", "bind '{}' failed: {}", label, err);
            return Err(err);
        }
        crate::orchestra_trace!("orchestra::Framebuffer", "bind '{}' (depth {})", label, self.bind_stack.depth());
        Ok(())
    }

    /// Pop `id` and re-activate whatever is now on top
    ///
    /// The entry is gone even when re-activation fails.
    pub(crate) fn pop_targets(&mut self, id: FramebufferId, label: &str) -> Result<()> {
        let restored = self.bind_stack.pop(id, label).map(|e| e.targets.clone());
        crate::orchestra_trace!("orchestra::Framebuffer", "unbind '{}' (depth {})", label, self.bind_stack.depth());
        match restored {
            Some(targets) => self.device.set_render_targets(&targets),
            None => self.device.unset_render_targets(),
        }
    }

    /// Swap the recorded targets of a bound framebuffer, re-issuing them if it is on top
    pub(crate) fn rebind_targets(&mut self, id: FramebufferId, targets: &RenderTargetSet) -> Result<()> {
        self.bind_stack.replace_targets(id, targets);
        if self.bind_stack.top() == Some(id) {
            self.device.set_render_targets(targets)?;
        }
        Ok(())
    }
}

impl Drop for DeviceContext {
    fn drop(&mut self) {
        if !self.bind_stack.is_empty() {
            crate::orchestra_warn!(
                "orchestra::DeviceContext",
                "Dropped with {} framebuffer(s) still bound",
                self.bind_stack.depth()
            );
        }
    }
}
