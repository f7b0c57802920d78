/// Named resources passed between passes.
///
/// Labels are interned once into `LabelId` tokens; everything inside the
/// resource manager is keyed by token, strings stay at the API edges.

use std::fmt;
use std::sync::Arc;
use rustc_hash::FxHashMap;
use crate::graphics_device::{Texture, TextureKind};

/// Interned resource label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LabelId(u32);

impl LabelId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// String ↔ `LabelId` table. Labels are never removed.
#[derive(Debug, Default)]
pub struct LabelInterner {
    ids: FxHashMap<String, LabelId>,
    names: Vec<String>,
}

impl LabelInterner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token for `label`, allocating one on first sight
    pub fn intern(&mut self, label: &str) -> LabelId {
        if let Some(id) = self.ids.get(label) {
            return *id;
        }
        let id = LabelId(self.names.len() as u32);
        self.names.push(label.to_string());
        self.ids.insert(label.to_string(), id);
        id
    }

    /// Token for `label` if it was interned before
    pub fn get(&self, label: &str) -> Option<LabelId> {
        self.ids.get(label).copied()
    }

    pub fn name(&self, id: LabelId) -> &str {
        &self.names[id.index()]
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Sampleable image-like handle
///
/// Borrowed for the frame from whichever framebuffer or texture cache
/// created it; holding the handle does not own GPU memory beyond the `Arc`.
#[derive(Clone)]
pub enum ResourceHandle {
    Image(Arc<dyn Texture>),
    ImageArray(Arc<dyn Texture>),
    Cubemap(Arc<dyn Texture>),
}

impl ResourceHandle {
    /// Wrap a texture in the variant matching its shape
    pub fn from_texture(texture: Arc<dyn Texture>) -> Self {
        match texture.info().kind {
            TextureKind::Image => ResourceHandle::Image(texture),
            TextureKind::ImageArray { .. } => ResourceHandle::ImageArray(texture),
            TextureKind::Cubemap => ResourceHandle::Cubemap(texture),
        }
    }

    pub fn texture(&self) -> &Arc<dyn Texture> {
        match self {
            ResourceHandle::Image(t) | ResourceHandle::ImageArray(t) | ResourceHandle::Cubemap(t) => t,
        }
    }

    pub fn as_image(&self) -> Option<&Arc<dyn Texture>> {
        match self {
            ResourceHandle::Image(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_image_array(&self) -> Option<&Arc<dyn Texture>> {
        match self {
            ResourceHandle::ImageArray(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_cubemap(&self) -> Option<&Arc<dyn Texture>> {
        match self {
            ResourceHandle::Cubemap(t) => Some(t),
            _ => None,
        }
    }

    /// Whether both handles refer to the same texture object
    pub fn same_texture(&self, other: &ResourceHandle) -> bool {
        Arc::ptr_eq(self.texture(), other.texture())
    }

    fn variant_name(&self) -> &'static str {
        match self {
            ResourceHandle::Image(_) => "Image",
            ResourceHandle::ImageArray(_) => "ImageArray",
            ResourceHandle::Cubemap(_) => "Cubemap",
        }
    }
}

impl fmt::Debug for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.variant_name(), self.texture().info().label)
    }
}

/// A label plus a resource handle, stamped with the frame that last refreshed it
#[derive(Debug, Clone)]
pub struct NamedResource {
    label: String,
    id: LabelId,
    resource: ResourceHandle,
    refreshed_frame: Option<u64>,
}

impl NamedResource {
    pub(crate) fn new(
        label: &str,
        id: LabelId,
        resource: ResourceHandle,
        refreshed_frame: Option<u64>,
    ) -> Self {
        Self {
            label: label.to_string(),
            id,
            resource,
            refreshed_frame,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn id(&self) -> LabelId {
        self.id
    }

    pub fn resource(&self) -> &ResourceHandle {
        &self.resource
    }

    pub fn texture(&self) -> &Arc<dyn Texture> {
        self.resource.texture()
    }

    /// Frame index whose execution of the producer last refreshed this
    /// resource, `None` if the producer has not run since it was wired
    pub fn refreshed_frame(&self) -> Option<u64> {
        self.refreshed_frame
    }

    /// Whether the producer has rendered it at least once
    pub fn is_produced(&self) -> bool {
        self.refreshed_frame.is_some()
    }

    /// Whether the producer rendered it during `frame`
    pub fn is_fresh(&self, frame: u64) -> bool {
        self.refreshed_frame == Some(frame)
    }
}
