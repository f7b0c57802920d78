/// Framebuffer - an owned group of render targets.
///
/// Groups up to four color attachments and one depth attachment, all of the
/// same size. Binding is stack-disciplined through the `DeviceContext`: only
/// the framebuffer on top of the bind stack receives writes, and unbinding
/// re-activates whatever was bound before.
///
/// Created once and reused each frame. Recreated wholesale on window resize.

use std::cell::Cell;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use bitflags::bitflags;
use crate::engine_bail;
use crate::error::{Error, Result};
use crate::graphics_device::{
    RenderTargetSet, Texture, TextureDesc, TextureFormat, TextureKind, TextureUsage,
};
use super::device_context::DeviceContext;

bitflags! {
    /// Attachments requested when creating a framebuffer
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct FramebufferTargets: u32 {
        const COLOR0 = 1 << 0;
        const COLOR1 = 1 << 1;
        const COLOR2 = 1 << 2;
        const COLOR3 = 1 << 3;
        const DEPTH = 1 << 4;
    }
}

/// Number of attachment slots (four colors + depth)
pub const TARGET_SLOT_COUNT: usize = 5;

/// One attachment slot of a framebuffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetSlot {
    Color0,
    Color1,
    Color2,
    Color3,
    Depth,
}

impl TargetSlot {
    /// All slots, colors first
    pub const ALL: [TargetSlot; TARGET_SLOT_COUNT] = [
        TargetSlot::Color0,
        TargetSlot::Color1,
        TargetSlot::Color2,
        TargetSlot::Color3,
        TargetSlot::Depth,
    ];

    pub fn index(self) -> usize {
        match self {
            TargetSlot::Color0 => 0,
            TargetSlot::Color1 => 1,
            TargetSlot::Color2 => 2,
            TargetSlot::Color3 => 3,
            TargetSlot::Depth => 4,
        }
    }

    pub fn flag(self) -> FramebufferTargets {
        match self {
            TargetSlot::Color0 => FramebufferTargets::COLOR0,
            TargetSlot::Color1 => FramebufferTargets::COLOR1,
            TargetSlot::Color2 => FramebufferTargets::COLOR2,
            TargetSlot::Color3 => FramebufferTargets::COLOR3,
            TargetSlot::Depth => FramebufferTargets::DEPTH,
        }
    }

    pub fn is_depth(self) -> bool {
        self == TargetSlot::Depth
    }

    fn suffix(self) -> &'static str {
        match self {
            TargetSlot::Color0 => "color0",
            TargetSlot::Color1 => "color1",
            TargetSlot::Color2 => "color2",
            TargetSlot::Color3 => "color3",
            TargetSlot::Depth => "depth",
        }
    }
}

/// Process-unique framebuffer identity, used by the bind stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FramebufferId(u64);

static NEXT_FRAMEBUFFER_ID: AtomicU64 = AtomicU64::new(1);

impl FramebufferId {
    fn next() -> Self {
        Self(NEXT_FRAMEBUFFER_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Descriptor for creating a framebuffer
#[derive(Debug, Clone)]
pub struct FramebufferDesc {
    /// Debug label, also prefixes attachment labels ("{label}.color0")
    pub label: String,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Attachments to allocate
    pub targets: FramebufferTargets,
    /// MSAA sample count (1 = single-sampled)
    pub sample_count: u32,
    /// Format of every color attachment
    pub color_format: TextureFormat,
    /// Format of the depth attachment
    pub depth_format: TextureFormat,
}

impl FramebufferDesc {
    /// Single-sampled RGBA8 / D32 descriptor
    pub fn new(label: &str, width: u32, height: u32, targets: FramebufferTargets) -> Self {
        Self {
            label: label.to_string(),
            width,
            height,
            targets,
            sample_count: 1,
            color_format: TextureFormat::R8G8B8A8_UNORM,
            depth_format: TextureFormat::D32_FLOAT,
        }
    }

    pub fn with_samples(mut self, sample_count: u32) -> Self {
        self.sample_count = sample_count;
        self
    }

    pub fn with_formats(mut self, color_format: TextureFormat, depth_format: TextureFormat) -> Self {
        self.color_format = color_format;
        self.depth_format = depth_format;
        self
    }
}

pub struct Framebuffer {
    id: FramebufferId,
    label: String,
    width: u32,
    height: u32,
    targets: [Option<Arc<dyn Texture>>; TARGET_SLOT_COUNT],
    depth_override: Option<Arc<dyn Texture>>,
    sample_count: u32,
    /// Textures belong to someone else (swap-chain backbuffer)
    keep_textures: bool,
    /// Number of times this framebuffer currently appears on the bind stack
    bind_count: Cell<u32>,
}

impl Framebuffer {
    /// Allocate the attachments requested by `desc`
    ///
    /// # Errors
    ///
    /// Returns `InvalidResource` for an empty size, an empty target mask, a
    /// zero sample count or mismatched color/depth formats, and forwards
    /// backend allocation failures.
    pub fn new(ctx: &mut DeviceContext, desc: FramebufferDesc) -> Result<Self> {
        if desc.width == 0 || desc.height == 0 {
            engine_bail!("orchestra::Framebuffer", Error::InvalidResource(format!(
                "framebuffer '{}' has an empty size {}x{}", desc.label, desc.width, desc.height
            )));
        }
        if desc.targets.is_empty() {
            engine_bail!("orchestra::Framebuffer", Error::InvalidResource(format!(
                "framebuffer '{}' requests no targets", desc.label
            )));
        }
        if desc.sample_count == 0 {
            engine_bail!("orchestra::Framebuffer", Error::InvalidResource(format!(
                "framebuffer '{}' has a sample count of 0", desc.label
            )));
        }
        if desc.color_format.is_depth() || !desc.depth_format.is_depth() {
            engine_bail!("orchestra::Framebuffer", Error::InvalidResource(format!(
                "framebuffer '{}' has mismatched formats {:?}/{:?}",
                desc.label, desc.color_format, desc.depth_format
            )));
        }

        let mut targets: [Option<Arc<dyn Texture>>; TARGET_SLOT_COUNT] = Default::default();
        for slot in TargetSlot::ALL {
            if !desc.targets.contains(slot.flag()) {
                continue;
            }
            let (format, usage) = if slot.is_depth() {
                (desc.depth_format, TextureUsage::DepthStencil)
            } else {
                (desc.color_format, TextureUsage::SampledAndRenderTarget)
            };
            let texture = ctx.device_mut().create_texture(TextureDesc {
                label: format!("{}.{}", desc.label, slot.suffix()),
                width: desc.width,
                height: desc.height,
                format,
                usage,
                kind: TextureKind::Image,
                sample_count: desc.sample_count,
            })?;
            targets[slot.index()] = Some(texture);
        }

        crate::orchestra_debug!(
            "orchestra::Framebuffer",
            "Created '{}' {}x{} targets={:?} samples={}",
            desc.label, desc.width, desc.height, desc.targets, desc.sample_count
        );

        Ok(Self {
            id: FramebufferId::next(),
            label: desc.label,
            width: desc.width,
            height: desc.height,
            targets,
            depth_override: None,
            sample_count: desc.sample_count,
            keep_textures: false,
            bind_count: Cell::new(0),
        })
    }

    /// Wrap textures owned elsewhere (e.g. the swap-chain backbuffer)
    ///
    /// The wrapped textures are never released by this framebuffer.
    ///
    /// # Errors
    ///
    /// Returns `InvalidResource` if no color is given, more than four colors
    /// are given, a color has a depth format or `depth` does not, or the
    /// attachments disagree in size or sample count.
    pub fn from_external(
        label: &str,
        colors: Vec<Arc<dyn Texture>>,
        depth: Option<Arc<dyn Texture>>,
    ) -> Result<Self> {
        if colors.is_empty() || colors.len() > TARGET_SLOT_COUNT - 1 {
            engine_bail!("orchestra::Framebuffer", Error::InvalidResource(format!(
                "external framebuffer '{}' needs 1 to 4 colors, got {}", label, colors.len()
            )));
        }
        let (width, height) = (colors[0].info().width, colors[0].info().height);
        let sample_count = colors[0].info().sample_count;
        if let Some(t) = colors.iter().find(|t| t.info().format.is_depth()) {
            engine_bail!("orchestra::Framebuffer", Error::InvalidResource(format!(
                "external framebuffer '{}': color '{}' has depth format {:?}",
                label, t.info().label, t.info().format
            )));
        }
        if let Some(t) = depth.iter().find(|t| !t.info().format.is_depth()) {
            engine_bail!("orchestra::Framebuffer", Error::InvalidResource(format!(
                "external framebuffer '{}': depth '{}' has color format {:?}",
                label, t.info().label, t.info().format
            )));
        }
        if let Some(t) = colors
            .iter()
            .chain(depth.iter())
            .find(|t| t.info().sample_count != sample_count)
        {
            engine_bail!("orchestra::Framebuffer", Error::InvalidResource(format!(
                "external framebuffer '{}': '{}' has {} sample(s), expected {}",
                label, t.info().label, t.info().sample_count, sample_count
            )));
        }
        if let Some(t) = colors
            .iter()
            .chain(depth.iter())
            .find(|t| t.info().width != width || t.info().height != height)
        {
            engine_bail!("orchestra::Framebuffer", Error::InvalidResource(format!(
                "external framebuffer '{}': '{}' is {}x{}, expected {}x{}",
                label, t.info().label, t.info().width, t.info().height, width, height
            )));
        }

        let mut targets: [Option<Arc<dyn Texture>>; TARGET_SLOT_COUNT] = Default::default();
        for (i, color) in colors.into_iter().enumerate() {
            targets[i] = Some(color);
        }
        targets[TargetSlot::Depth.index()] = depth;

        Ok(Self {
            id: FramebufferId::next(),
            label: label.to_string(),
            width,
            height,
            targets,
            depth_override: None,
            sample_count,
            keep_textures: true,
            bind_count: Cell::new(0),
        })
    }

    pub fn id(&self) -> FramebufferId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    pub fn is_multisampled(&self) -> bool {
        self.sample_count > 1
    }

    /// Whether the attachments are owned elsewhere
    pub fn keeps_textures(&self) -> bool {
        self.keep_textures
    }

    /// Whether this framebuffer is currently anywhere on the bind stack
    pub fn is_bound(&self) -> bool {
        self.bind_count.get() > 0
    }

    /// Attachments that were allocated
    pub fn targets(&self) -> FramebufferTargets {
        TargetSlot::ALL
            .iter()
            .filter(|slot| self.targets[slot.index()].is_some())
            .fold(FramebufferTargets::empty(), |acc, slot| acc | slot.flag())
    }

    pub fn has_target(&self, slot: TargetSlot) -> bool {
        self.targets[slot.index()].is_some()
    }

    /// The images this framebuffer activates when bound
    pub fn render_targets(&self) -> RenderTargetSet {
        let colors = TargetSlot::ALL[..TARGET_SLOT_COUNT - 1]
            .iter()
            .filter_map(|slot| self.targets[slot.index()].clone())
            .collect();
        let depth = self
            .depth_override
            .clone()
            .or_else(|| self.targets[TargetSlot::Depth.index()].clone());
        RenderTargetSet {
            colors,
            depth,
            depth_read_only: self.depth_override.is_some(),
        }
    }

    /// Push onto the bind stack and activate this framebuffer's targets
    ///
    /// Does not clear. Panics if the stack is already at its maximum depth.
    /// On a device error the framebuffer is left unbound.
    pub fn bind(&self, ctx: &mut DeviceContext) -> Result<()> {
        ctx.push_targets(self.id, &self.label, self.render_targets())?;
        self.bind_count.set(self.bind_count.get() + 1);
        Ok(())
    }

    /// Pop from the bind stack and restore the previous binding
    ///
    /// Panics if this framebuffer is not on top of the stack. The framebuffer
    /// is unbound even if restoring the previous binding fails.
    pub fn unbind(&self, ctx: &mut DeviceContext) -> Result<()> {
        let result = ctx.pop_targets(self.id, &self.label);
        self.bind_count.set(self.bind_count.get() - 1);
        result
    }

    /// Clear colors to the configured background and the own depth to far
    ///
    /// An overriding depth buffer is shared and read-only, so it is left untouched.
    pub fn clear_targets(&self, ctx: &mut DeviceContext) -> Result<()> {
        let clear_color = ctx.config().clear_color;
        let clear_depth = ctx.config().clear_depth;
        for slot in TargetSlot::ALL {
            let Some(texture) = &self.targets[slot.index()] else {
                continue;
            };
            if slot.is_depth() {
                if self.depth_override.is_none() {
                    ctx.device_mut().clear_depth(texture, clear_depth)?;
                }
            } else {
                ctx.device_mut().clear_color(texture, clear_color)?;
            }
        }
        Ok(())
    }

    /// Sampleable handle on one attachment
    ///
    /// Panics if the attachment was not allocated at construction.
    pub fn target_as_texture(&self, slot: TargetSlot) -> Arc<dyn Texture> {
        match &self.targets[slot.index()] {
            Some(texture) => Arc::clone(texture),
            None => panic!(
                "framebuffer '{}' has no {:?} attachment (allocated: {:?})",
                self.label,
                slot,
                self.targets()
            ),
        }
    }

    /// Non-panicking variant of `target_as_texture`
    pub fn try_target(&self, slot: TargetSlot) -> Option<&Arc<dyn Texture>> {
        self.targets[slot.index()].as_ref()
    }

    /// Depth buffer used in place of the own depth attachment, if any
    pub fn depth_override(&self) -> Option<&Arc<dyn Texture>> {
        self.depth_override.as_ref()
    }

    /// Test against an externally owned depth buffer instead of the own one
    ///
    /// Takes effect immediately: if this framebuffer is bound, its stack entry
    /// is updated and, when on top, the targets are re-issued. `None` restores
    /// the own depth attachment.
    ///
    /// # Errors
    ///
    /// Returns `InvalidResource` if `depth` is not a depth format or does not
    /// match this framebuffer's size.
    pub fn set_depth_override(
        &mut self,
        ctx: &mut DeviceContext,
        depth: Option<Arc<dyn Texture>>,
    ) -> Result<()> {
        if let Some(texture) = &depth {
            let info = texture.info();
            if !info.format.is_depth() {
                engine_bail!("orchestra::Framebuffer", Error::InvalidResource(format!(
                    "depth override '{}' for '{}' has color format {:?}",
                    info.label, self.label, info.format
                )));
            }
            if info.width != self.width || info.height != self.height {
                engine_bail!("orchestra::Framebuffer", Error::InvalidResource(format!(
                    "depth override '{}' is {}x{}, framebuffer '{}' is {}x{}",
                    info.label, info.width, info.height, self.label, self.width, self.height
                )));
            }
        }

        self.depth_override = depth;
        if self.is_bound() {
            ctx.rebind_targets(self.id, &self.render_targets())?;
        }
        Ok(())
    }
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            assert!(
                !self.is_bound(),
                "framebuffer '{}' destroyed while on the bind stack",
                self.label
            );
        }
        if !self.keep_textures {
            crate::orchestra_trace!(
                "orchestra::Framebuffer",
                "Releasing {} target(s) of '{}'",
                self.targets.iter().flatten().count(),
                self.label
            );
        }
    }
}

#[cfg(test)]
#[path = "framebuffer_tests.rs"]
mod tests;
