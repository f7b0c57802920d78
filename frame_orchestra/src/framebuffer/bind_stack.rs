/// Stack of currently bound framebuffers.
///
/// Owned by a `DeviceContext` instead of living in global state. Enforces
/// LIFO discipline and a bounded depth; violations are programming errors
/// and panic.

use crate::graphics_device::RenderTargetSet;
use super::framebuffer::FramebufferId;

/// One bound framebuffer and the targets it activated
pub(crate) struct BindEntry {
    pub(crate) id: FramebufferId,
    pub(crate) label: String,
    pub(crate) targets: RenderTargetSet,
}

pub struct BindStack {
    entries: Vec<BindEntry>,
    max_depth: usize,
}

impl BindStack {
    /// Create an empty stack that panics beyond `max_depth` entries
    pub fn new(max_depth: usize) -> Self {
        Self {
            entries: Vec::with_capacity(max_depth),
            max_depth,
        }
    }

    /// Number of framebuffers currently bound
    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    /// Maximum number of nested binds
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The framebuffer currently receiving writes
    pub fn top(&self) -> Option<FramebufferId> {
        self.entries.last().map(|e| e.id)
    }

    /// Label of the framebuffer currently receiving writes
    pub fn top_label(&self) -> Option<&str> {
        self.entries.last().map(|e| e.label.as_str())
    }

    /// Whether `id` appears anywhere in the stack
    pub fn contains(&self, id: FramebufferId) -> bool {
        self.entries.iter().any(|e| e.id == id)
    }

    /// Bound framebuffer ids, bottom first
    pub fn ids(&self) -> Vec<FramebufferId> {
        self.entries.iter().map(|e| e.id).collect()
    }

    pub(crate) fn push(&mut self, entry: BindEntry) {
        assert!(
            self.entries.len() < self.max_depth,
            "framebuffer bind stack overflow binding '{}' (max depth {}): missing unbind()?",
            entry.label,
            self.max_depth
        );
        self.entries.push(entry);
    }

    /// Pop `id`, which must be on top. Returns the entry that becomes the new top.
    pub(crate) fn pop(&mut self, id: FramebufferId, label: &str) -> Option<&BindEntry> {
        let top = self.entries.last().unwrap_or_else(|| {
            panic!("unbind of framebuffer '{}' with an empty bind stack", label)
        });
        assert!(
            top.id == id,
            "unbind of framebuffer '{}' out of order: '{}' is on top of the bind stack",
            label,
            top.label
        );
        self.entries.pop();
        self.entries.last()
    }

    /// Replace the recorded targets of every entry for `id`
    pub(crate) fn replace_targets(&mut self, id: FramebufferId, targets: &RenderTargetSet) {
        for entry in self.entries.iter_mut().filter(|e| e.id == id) {
            entry.targets = targets.clone();
        }
    }
}

#[cfg(test)]
#[path = "bind_stack_tests.rs"]
mod tests;
