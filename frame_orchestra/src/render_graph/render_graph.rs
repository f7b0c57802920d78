/// Render graph: the ordered passes of a frame plus their resource wiring.
///
/// Passes execute in registration order unless dependency ordering is
/// configured, in which case link edges drive a topological sort and
/// registration order only breaks ties.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use slotmap::SlotMap;
use winit::dpi::PhysicalSize;
use crate::config::{ExecutionOrder, OrchestraConfig, ValidationMode};
use crate::engine_bail;
use crate::error::{Error, Result};
use crate::framebuffer::DeviceContext;
use super::pass::{Pass, PassContext, PassId};
use super::render_context::RenderContext;
use super::resource_manager::{ResourceLink, ResourceManager};

struct PassEntry {
    pass: Box<dyn Pass>,
    enabled: bool,
}

/// Ordered passes plus one resource manager
pub struct Graph {
    passes: SlotMap<PassId, PassEntry>,
    /// Registration order
    order: Vec<PassId>,
    resources: ResourceManager,
    validation: ValidationMode,
    execution_order: ExecutionOrder,
    /// Index of the last executed frame (0 before the first `execute()`)
    frame_index: u64,
}

impl Graph {
    pub fn new(config: &OrchestraConfig) -> Self {
        Self {
            passes: SlotMap::with_key(),
            order: Vec::new(),
            resources: ResourceManager::new(),
            validation: config.validation,
            execution_order: config.execution_order,
            frame_index: 0,
        }
    }

    // ===== PASSES =====

    /// Append a pass and register it with the resource manager
    pub fn add_pass(&mut self, pass: impl Pass + 'static) -> PassId {
        self.add_boxed_pass(Box::new(pass))
    }

    pub fn add_boxed_pass(&mut self, pass: Box<dyn Pass>) -> PassId {
        let name = pass.name().to_string();
        let id = self.passes.insert(PassEntry { pass, enabled: true });
        self.order.push(id);
        self.resources.add_pass(id, &name);
        crate::orchestra_debug!("orchestra::Graph", "Added pass '{}'", name);
        id
    }

    /// Remove a pass, its links and the inputs it delivered downstream
    pub fn remove_pass(&mut self, id: PassId) -> Result<Box<dyn Pass>> {
        let Some(entry) = self.passes.remove(id) else {
            engine_bail!("orchestra::Graph", Error::PassNotInGraph(format!("{:?}", id)));
        };
        self.order.retain(|other| *other != id);
        self.resources.remove_pass(id);
        crate::orchestra_debug!("orchestra::Graph", "Removed pass '{}'", entry.pass.name());
        Ok(entry.pass)
    }

    pub fn pass(&self, id: PassId) -> Option<&dyn Pass> {
        self.passes.get(id).map(|entry| entry.pass.as_ref())
    }

    pub fn pass_mut(&mut self, id: PassId) -> Option<&mut (dyn Pass + 'static)> {
        self.passes.get_mut(id).map(|entry| entry.pass.as_mut())
    }

    /// Look a pass up by display name (first match in registration order)
    pub fn find_pass(&self, name: &str) -> Option<PassId> {
        self.order
            .iter()
            .copied()
            .find(|id| self.passes.get(*id).map_or(false, |e| e.pass.name() == name))
    }

    pub fn set_pass_enabled(&mut self, id: PassId, enabled: bool) -> Result<()> {
        match self.passes.get_mut(id) {
            Some(entry) => {
                entry.enabled = enabled;
                Ok(())
            }
            None => engine_bail!("orchestra::Graph", Error::PassNotInGraph(format!("{:?}", id))),
        }
    }

    /// Graph flag and the pass's own flag combined
    pub fn is_pass_enabled(&self, id: PassId) -> bool {
        self.passes
            .get(id)
            .map_or(false, |entry| entry.enabled && entry.pass.is_enabled())
    }

    pub fn pass_count(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Pass names in registration order
    pub fn pass_names(&self) -> Vec<&str> {
        self.order
            .iter()
            .filter_map(|id| self.passes.get(*id))
            .map(|entry| entry.pass.name())
            .collect()
    }

    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn resources(&self) -> &ResourceManager {
        &self.resources
    }

    // ===== RESOURCE WIRING =====

    pub fn declare_produced(&mut self, id: PassId, label: &str) -> Result<()> {
        let Some(entry) = self.passes.get(id) else {
            engine_bail!("orchestra::Graph", Error::PassNotInGraph(format!("{:?}", id)));
        };
        self.resources.declare_produced(id, entry.pass.as_ref(), label)
    }

    /// Declare every label listed by `Pass::output_labels()`
    pub fn declare_outputs(&mut self, id: PassId) -> Result<()> {
        let Some(entry) = self.passes.get(id) else {
            engine_bail!("orchestra::Graph", Error::PassNotInGraph(format!("{:?}", id)));
        };
        for label in entry.pass.output_labels() {
            self.resources.declare_produced(id, entry.pass.as_ref(), label)?;
        }
        Ok(())
    }

    pub fn declare_requirement(&mut self, id: PassId, label: &str) -> Result<()> {
        self.resources.declare_requirement(id, label)
    }

    /// Wire `from`'s output `label` into `to` and push it with `set_input()`
    pub fn link(&mut self, from: PassId, label: &str, to: PassId) -> Result<()> {
        let Some(producer) = self.passes.get(from) else {
            engine_bail!("orchestra::Graph", Error::PassNotInGraph(format!("{:?}", from)));
        };
        let resource = self.resources.link(from, producer.pass.as_ref(), label, to)?;
        if let Some(consumer) = self.passes.get_mut(to) {
            consumer.pass.set_input(&resource);
        }
        Ok(())
    }

    /// Check requirements using the configured validation mode
    pub fn validate(&self) -> Result<bool> {
        self.resources.validate(self.validation)
    }

    pub fn validate_with(&self, mode: ValidationMode) -> Result<bool> {
        self.resources.validate(mode)
    }

    // ===== ORDERING =====

    /// Order in which `execute()` visits passes
    pub fn execution_order(&self) -> Result<Vec<PassId>> {
        match self.execution_order {
            ExecutionOrder::Registration => Ok(self.order.clone()),
            ExecutionOrder::Dependency => self.dependency_order(),
        }
    }

    /// Kahn's algorithm over link edges, ties broken by registration position
    fn dependency_order(&self) -> Result<Vec<PassId>> {
        let count = self.order.len();
        let position = |id: PassId| self.order.iter().position(|other| *other == id);

        let mut successors: Vec<Vec<usize>> = vec![Vec::new(); count];
        let mut in_degree = vec![0usize; count];
        for ResourceLink { from, to, .. } in self.resources.links() {
            let (Some(from), Some(to)) = (position(*from), position(*to)) else {
                continue;
            };
            if from == to || successors[from].contains(&to) {
                continue;
            }
            successors[from].push(to);
            in_degree[to] += 1;
        }

        let mut ready: BinaryHeap<Reverse<usize>> = (0..count)
            .filter(|i| in_degree[*i] == 0)
            .map(Reverse)
            .collect();
        let mut sorted = Vec::with_capacity(count);
        while let Some(Reverse(index)) = ready.pop() {
            sorted.push(self.order[index]);
            for next in &successors[index] {
                in_degree[*next] -= 1;
                if in_degree[*next] == 0 {
                    ready.push(Reverse(*next));
                }
            }
        }

        if sorted.len() != count {
            let cycle = (0..count)
                .filter(|i| in_degree[*i] > 0)
                .filter_map(|i| self.passes.get(self.order[i]))
                .map(|entry| entry.pass.name().to_string())
                .collect();
            engine_bail!("orchestra::Graph", Error::CyclicDependency(cycle));
        }
        Ok(sorted)
    }

    // ===== EXECUTION =====

    /// Run one frame: every enabled pass's `apply()`, then refresh its outputs
    ///
    /// A disabled pass is skipped entirely; its outputs keep their previous
    /// refresh stamp. The first failing pass aborts the frame.
    pub fn execute(&mut self, render: &RenderContext<'_>, device: &mut DeviceContext) -> Result<()> {
        let order = self.execution_order()?;
        self.frame_index += 1;
        let frame = self.frame_index;

        for id in order {
            let Some(entry) = self.passes.get_mut(id) else {
                continue;
            };
            if !entry.enabled || !entry.pass.is_enabled() {
                crate::orchestra_trace!("orchestra::Graph", "Skipping disabled pass '{}'", entry.pass.name());
                continue;
            }

            let mut ctx = PassContext {
                render,
                device: &mut *device,
                resources: &self.resources,
                pass: id,
                frame_index: frame,
            };
            if let Err(err) = entry.pass.apply(&mut ctx) {
                crate::orchestra_error!(
                    "orchestra::Graph",
                    "Pass '{}' failed in frame {}: {}",
                    entry.pass.name(),
                    frame,
                    err
                );
                return Err(err);
            }

            let deliveries = self.resources.refresh_outputs(id, entry.pass.as_ref(), Some(frame));
            self.deliver(deliveries);
        }
        Ok(())
    }

    /// Forward a size change to every pass, then re-pull all outputs
    ///
    /// Re-pulled outputs are unstamped until their producer runs again.
    pub fn resize(&mut self, device: &mut DeviceContext, size: PhysicalSize<u32>) -> Result<()> {
        crate::orchestra_debug!("orchestra::Graph", "Resizing {} pass(es) to {}x{}", self.order.len(), size.width, size.height);
        for id in &self.order {
            if let Some(entry) = self.passes.get_mut(*id) {
                entry.pass.on_resize(device, size)?;
            }
        }

        for id in self.order.clone() {
            let Some(entry) = self.passes.get(id) else {
                continue;
            };
            let deliveries = self.resources.refresh_outputs(id, entry.pass.as_ref(), None);
            self.deliver(deliveries);
        }
        Ok(())
    }

    fn deliver(&mut self, deliveries: Vec<(PassId, super::named_resource::NamedResource)>) {
        for (consumer, resource) in deliveries {
            if let Some(entry) = self.passes.get_mut(consumer) {
                entry.pass.set_input(&resource);
            }
        }
    }

    // ===== TOOLING =====

    /// `(pass name, label)` pairs required but never wired
    pub fn missing_requirements(&self) -> Vec<(String, String)> {
        self.resources
            .missing_requirements()
            .into_iter()
            .map(|(id, label)| (self.pass_name(id), label))
            .collect()
    }

    /// `(producer name, label, consumer name)` links the consumer never required
    pub fn unrequired_links(&self) -> Vec<(String, String, String)> {
        self.resources
            .unrequired_links()
            .into_iter()
            .map(|link| {
                (
                    self.pass_name(link.from),
                    self.resources.label_name(link.label).to_string(),
                    self.pass_name(link.to),
                )
            })
            .collect()
    }

    pub fn passes_with_debug_window(&self) -> Vec<PassId> {
        self.order
            .iter()
            .copied()
            .filter(|id| self.passes.get(*id).map_or(false, |e| e.pass.has_debug_window()))
            .collect()
    }

    pub fn open_debug_window(&mut self, id: PassId) -> Result<()> {
        match self.passes.get_mut(id) {
            Some(entry) => {
                entry.pass.open_debug_window();
                Ok(())
            }
            None => engine_bail!("orchestra::Graph", Error::PassNotInGraph(format!("{:?}", id))),
        }
    }

    fn pass_name(&self, id: PassId) -> String {
        self.passes
            .get(id)
            .map(|entry| entry.pass.name().to_string())
            .unwrap_or_else(|| format!("{:?}", id))
    }
}

#[cfg(test)]
#[path = "render_graph_tests.rs"]
mod tests;
