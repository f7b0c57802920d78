/// Mock GraphicsDevice for unit tests (no GPU required)
///
/// Records every command it receives into a shared log so tests can assert
/// binding discipline, clears and resolves.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use crate::error::{Error, Result};
use crate::graphics_device::{
    GraphicsDevice, RenderProfile, RenderTargetSet, Texture, TextureDesc, TextureFormat,
    TextureInfo, TextureKind, TextureUsage,
};

// ============================================================================
// Mock Texture
// ============================================================================

#[derive(Debug)]
pub struct MockTexture {
    pub info: TextureInfo,
}

impl MockTexture {
    pub fn new(label: &str, width: u32, height: u32) -> Self {
        Self::with_kind(label, width, height, TextureKind::Image)
    }

    pub fn with_kind(label: &str, width: u32, height: u32, kind: TextureKind) -> Self {
        Self {
            info: TextureInfo {
                label: label.to_string(),
                width,
                height,
                format: TextureFormat::R8G8B8A8_UNORM,
                usage: TextureUsage::SampledAndRenderTarget,
                kind,
                sample_count: 1,
            },
        }
    }

    pub fn depth(label: &str, width: u32, height: u32) -> Self {
        let mut texture = Self::new(label, width, height);
        texture.info.format = TextureFormat::D32_FLOAT;
        texture.info.usage = TextureUsage::DepthStencil;
        texture
    }

    pub fn shared(label: &str, width: u32, height: u32) -> Arc<dyn Texture> {
        Arc::new(Self::new(label, width, height))
    }
}

impl Texture for MockTexture {
    fn info(&self) -> &TextureInfo {
        &self.info
    }
}

// ============================================================================
// Mock GraphicsDevice
// ============================================================================

/// One recorded device command, textures identified by label
#[derive(Debug, Clone, PartialEq)]
pub enum MockCommand {
    CreateTexture(String),
    SetRenderTargets(Vec<String>),
    UnsetRenderTargets,
    ClearColor(String, [f32; 4]),
    ClearDepth(String, f32),
    Resolve { src: String, dst: String },
    SetRenderProfile(RenderProfile),
}

pub struct MockGraphicsDevice {
    commands: Arc<Mutex<Vec<MockCommand>>>,
    pub fail_texture_creation: bool,
    /// Number of upcoming `set_render_targets` calls that fail
    render_target_failures: Arc<AtomicU32>,
}

impl MockGraphicsDevice {
    pub fn new() -> Self {
        Self {
            commands: Arc::new(Mutex::new(Vec::new())),
            fail_texture_creation: false,
            render_target_failures: Arc::new(AtomicU32::new(0)),
        }
    }

    /// Shared counter of `set_render_targets` calls to fail before succeeding again
    pub fn render_target_failures(&self) -> Arc<AtomicU32> {
        Arc::clone(&self.render_target_failures)
    }

    /// Shared handle on the command log (stays valid after the device is boxed)
    pub fn command_log(&self) -> Arc<Mutex<Vec<MockCommand>>> {
        Arc::clone(&self.commands)
    }

    fn record(&self, command: MockCommand) {
        self.commands.lock().unwrap().push(command);
    }
}

impl GraphicsDevice for MockGraphicsDevice {
    fn create_texture(&mut self, desc: TextureDesc) -> Result<Arc<dyn Texture>> {
        if self.fail_texture_creation {
            return Err(Error::BackendError(format!("cannot allocate '{}'", desc.label)));
        }
        self.record(MockCommand::CreateTexture(desc.label.clone()));
        Ok(Arc::new(MockTexture {
            info: TextureInfo::from(&desc),
        }))
    }

    fn set_render_targets(&mut self, targets: &RenderTargetSet) -> Result<()> {
        let pending = self.render_target_failures.load(Ordering::SeqCst);
        if pending > 0 {
            self.render_target_failures.store(pending - 1, Ordering::SeqCst);
            return Err(Error::BackendError(format!(
                "cannot activate {:?}", targets.labels()
            )));
        }
        self.record(MockCommand::SetRenderTargets(targets.labels()));
        Ok(())
    }

    fn unset_render_targets(&mut self) -> Result<()> {
        self.record(MockCommand::UnsetRenderTargets);
        Ok(())
    }

    fn clear_color(&mut self, target: &Arc<dyn Texture>, color: [f32; 4]) -> Result<()> {
        self.record(MockCommand::ClearColor(target.info().label.clone(), color));
        Ok(())
    }

    fn clear_depth(&mut self, target: &Arc<dyn Texture>, depth: f32) -> Result<()> {
        self.record(MockCommand::ClearDepth(target.info().label.clone(), depth));
        Ok(())
    }

    fn resolve(&mut self, src: &Arc<dyn Texture>, dst: &Arc<dyn Texture>) -> Result<()> {
        self.record(MockCommand::Resolve {
            src: src.info().label.clone(),
            dst: dst.info().label.clone(),
        });
        Ok(())
    }

    fn set_render_profile(&mut self, profile: RenderProfile) -> Result<()> {
        self.record(MockCommand::SetRenderProfile(profile));
        Ok(())
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Device context over a fresh mock device, plus the device's command log
pub fn mock_device_context(
    config: crate::config::OrchestraConfig,
) -> (crate::framebuffer::DeviceContext, Arc<Mutex<Vec<MockCommand>>>) {
    let device = MockGraphicsDevice::new();
    let log = device.command_log();
    (crate::framebuffer::DeviceContext::new(Box::new(device), config), log)
}

/// Like `mock_device_context`, plus the device's render-target failure counter
pub fn flaky_device_context(
    config: crate::config::OrchestraConfig,
) -> (
    crate::framebuffer::DeviceContext,
    Arc<Mutex<Vec<MockCommand>>>,
    Arc<AtomicU32>,
) {
    let device = MockGraphicsDevice::new();
    let log = device.command_log();
    let failures = device.render_target_failures();
    (crate::framebuffer::DeviceContext::new(Box::new(device), config), log, failures)
}

/// Drain and return everything recorded so far
pub fn take_commands(log: &Arc<Mutex<Vec<MockCommand>>>) -> Vec<MockCommand> {
    std::mem::take(&mut *log.lock().unwrap())
}
