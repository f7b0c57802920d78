/// Resource manager: per-pass produced, required and incoming resources.
///
/// Requirements and links are stored separately so the graph can be checked
/// for completeness before any pass has run, and so tooling can report both
/// "required but never wired" and "wired but never required".

use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::SecondaryMap;
use crate::config::ValidationMode;
use crate::engine_bail;
use crate::error::{Error, Result};
use super::named_resource::{LabelId, LabelInterner, NamedResource};
use super::pass::{Pass, PassId};

/// Resources tracked for one registered pass
#[derive(Debug, Default)]
pub struct PassResources {
    name: String,
    incoming: FxHashMap<LabelId, NamedResource>,
    produced: FxHashMap<LabelId, NamedResource>,
    required: FxHashSet<LabelId>,
}

impl PassResources {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resources wired in from upstream passes
    pub fn incoming(&self) -> impl Iterator<Item = &NamedResource> {
        self.incoming.values()
    }

    /// Resources this pass has declared or been linked from
    pub fn produced(&self) -> impl Iterator<Item = &NamedResource> {
        self.produced.values()
    }

    pub fn required(&self) -> impl Iterator<Item = LabelId> + '_ {
        self.required.iter().copied()
    }
}

/// A wired data path: `from`'s output `label` feeds `to`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceLink {
    pub from: PassId,
    pub label: LabelId,
    pub to: PassId,
}

/// Owns the resource bookkeeping of every pass in a graph
#[derive(Debug, Default)]
pub struct ResourceManager {
    labels: LabelInterner,
    passes: SecondaryMap<PassId, PassResources>,
    links: Vec<ResourceLink>,
}

impl ResourceManager {
    pub fn new() -> Self {
        Self::default()
    }

    // ===== REGISTRATION =====

    /// Register an empty resource entry for `id`
    pub fn add_pass(&mut self, id: PassId, name: &str) {
        if self.passes.contains_key(id) {
            crate::orchestra_warn!("orchestra::ResourceManager", "Pass '{}' registered twice", name);
            return;
        }
        self.passes.insert(id, PassResources::new(name));
    }

    /// Unregister `id`, dropping its links and whatever it delivered downstream
    pub fn remove_pass(&mut self, id: PassId) -> bool {
        if self.passes.remove(id).is_none() {
            return false;
        }

        let (dropped, kept): (Vec<ResourceLink>, Vec<ResourceLink>) = self
            .links
            .drain(..)
            .partition(|link| link.from == id || link.to == id);
        self.links = kept;

        for link in dropped.iter().filter(|link| link.from == id) {
            if let Some(consumer) = self.passes.get_mut(link.to) {
                consumer.incoming.remove(&link.label);
            }
        }
        true
    }

    pub fn is_registered(&self, id: PassId) -> bool {
        self.passes.contains_key(id)
    }

    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    // ===== DECLARATIONS =====

    /// Pull `label` from `pass` once and record it as produced
    pub fn declare_produced(&mut self, id: PassId, pass: &dyn Pass, label: &str) -> Result<()> {
        self.pull_output(id, pass, label).map(|_| ())
    }

    /// Record that `id` cannot run correctly without an incoming `label`
    pub fn declare_requirement(&mut self, id: PassId, label: &str) -> Result<()> {
        let label_id = self.labels.intern(label);
        match self.passes.get_mut(id) {
            Some(entry) => {
                entry.required.insert(label_id);
                Ok(())
            }
            None => engine_bail!(
                "orchestra::ResourceManager",
                Error::PassNotInGraph(format!("{:?}", id))
            ),
        }
    }

    /// Wire `from`'s output `label` into `to`'s incoming resources
    ///
    /// Returns the delivered resource; the caller pushes it into the consumer
    /// pass with `Pass::set_input()`. Execution order is not affected.
    pub fn link(
        &mut self,
        from: PassId,
        from_pass: &dyn Pass,
        label: &str,
        to: PassId,
    ) -> Result<NamedResource> {
        if !self.passes.contains_key(to) {
            engine_bail!(
                "orchestra::ResourceManager",
                Error::PassNotInGraph(format!("{:?}", to))
            );
        }
        let resource = self.pull_output(from, from_pass, label)?;

        let link = ResourceLink {
            from,
            label: resource.id(),
            to,
        };
        // A later link for the same consumer label replaces the earlier producer
        self.links.retain(|l| !(l.to == to && l.label == link.label));
        self.links.push(link);

        if let Some(consumer) = self.passes.get_mut(to) {
            consumer.incoming.insert(link.label, resource.clone());
        }
        crate::orchestra_debug!(
            "orchestra::ResourceManager",
            "Linked '{}' from '{}' to '{}'",
            label,
            from_pass.name(),
            self.passes.get(to).map(|p| p.name()).unwrap_or_default()
        );
        Ok(resource)
    }

    fn pull_output(&mut self, id: PassId, pass: &dyn Pass, label: &str) -> Result<NamedResource> {
        if !self.passes.contains_key(id) {
            engine_bail!(
                "orchestra::ResourceManager",
                Error::PassNotInGraph(pass.name().to_string())
            );
        }
        let Some(handle) = pass.produce_output(label) else {
            engine_bail!(
                "orchestra::ResourceManager",
                Error::PassDoesNotProduceResource {
                    pass: pass.name().to_string(),
                    label: label.to_string(),
                }
            );
        };

        let label_id = self.labels.intern(label);
        let entry = self.passes.get_mut(id).ok_or_else(|| Error::PassNotInGraph(pass.name().to_string()))?;

        // Re-pulling the same texture keeps its refresh stamp
        let stamp = entry
            .produced
            .get(&label_id)
            .filter(|previous| previous.resource().same_texture(&handle))
            .and_then(|previous| previous.refreshed_frame());

        let resource = NamedResource::new(label, label_id, handle, stamp);
        entry.produced.insert(label_id, resource.clone());
        Ok(resource)
    }

    // ===== FRAME REFRESH =====

    /// Re-pull every output of `id` and forward linked ones to their consumers
    ///
    /// Stamps the refreshed resources with `stamp` and returns the
    /// `(consumer, resource)` deliveries to push via `Pass::set_input()`.
    pub(crate) fn refresh_outputs(
        &mut self,
        id: PassId,
        pass: &dyn Pass,
        stamp: Option<u64>,
    ) -> Vec<(PassId, NamedResource)> {
        let Some(entry) = self.passes.get_mut(id) else {
            return Vec::new();
        };

        for (label_id, resource) in entry.produced.iter_mut() {
            let label = self.labels.name(*label_id);
            match pass.produce_output(label) {
                Some(handle) => *resource = NamedResource::new(label, *label_id, handle, stamp),
                None => crate::orchestra_warn!(
                    "orchestra::ResourceManager",
                    "Pass '{}' stopped producing '{}', keeping the previous resource",
                    pass.name(),
                    label
                ),
            }
        }

        let mut deliveries = Vec::new();
        for link in self.links.iter().filter(|link| link.from == id) {
            let Some(resource) = self
                .passes
                .get(id)
                .and_then(|entry| entry.produced.get(&link.label))
                .cloned()
            else {
                continue;
            };
            if let Some(consumer) = self.passes.get_mut(link.to) {
                consumer.incoming.insert(link.label, resource.clone());
            }
            deliveries.push((link.to, resource));
        }
        deliveries
    }

    // ===== VALIDATION =====

    /// Check that every required label has an incoming resource
    ///
    /// `Strict` fails with `ResourceGraphNotValid`, `Lenient` logs and
    /// returns `Ok(false)`.
    pub fn validate(&self, mode: ValidationMode) -> Result<bool> {
        let missing = self.missing_requirements();
        if missing.is_empty() {
            return Ok(true);
        }

        let details = missing
            .iter()
            .map(|(id, label)| {
                let name = self.passes.get(*id).map(|p| p.name()).unwrap_or_default();
                format!("'{}' requires '{}'", name, label)
            })
            .collect::<Vec<_>>()
            .join("; ");

        match mode {
            ValidationMode::Strict => {
                engine_bail!("orchestra::ResourceManager", Error::ResourceGraphNotValid(details))
            }
            ValidationMode::Lenient => {
                crate::orchestra_warn!(
                    "orchestra::ResourceManager",
                    "Resource graph not valid: {}",
                    details
                );
                Ok(false)
            }
        }
    }

    /// `(pass, label)` pairs declared as required but never wired
    pub fn missing_requirements(&self) -> Vec<(PassId, String)> {
        let mut missing = Vec::new();
        for (id, entry) in self.passes.iter() {
            let mut labels: Vec<LabelId> = entry
                .required
                .iter()
                .filter(|label| !entry.incoming.contains_key(*label))
                .copied()
                .collect();
            labels.sort();
            missing.extend(labels.into_iter().map(|label| (id, self.labels.name(label).to_string())));
        }
        missing
    }

    /// Links whose consumer never declared the label as a requirement
    pub fn unrequired_links(&self) -> Vec<ResourceLink> {
        self.links
            .iter()
            .filter(|link| {
                self.passes
                    .get(link.to)
                    .map_or(false, |entry| !entry.required.contains(&link.label))
            })
            .copied()
            .collect()
    }

    // ===== QUERIES =====

    pub fn pass_resources(&self, id: PassId) -> Option<&PassResources> {
        self.passes.get(id)
    }

    pub fn incoming(&self, id: PassId, label: &str) -> Option<&NamedResource> {
        let label_id = self.labels.get(label)?;
        self.passes.get(id)?.incoming.get(&label_id)
    }

    pub fn produced(&self, id: PassId, label: &str) -> Option<&NamedResource> {
        let label_id = self.labels.get(label)?;
        self.passes.get(id)?.produced.get(&label_id)
    }

    pub fn requires(&self, id: PassId, label: &str) -> bool {
        match (self.labels.get(label), self.passes.get(id)) {
            (Some(label_id), Some(entry)) => entry.required.contains(&label_id),
            _ => false,
        }
    }

    pub fn links(&self) -> &[ResourceLink] {
        &self.links
    }

    /// Every label seen so far, declared or required
    pub fn labels(&self) -> &LabelInterner {
        &self.labels
    }

    pub fn label_id(&self, label: &str) -> Option<LabelId> {
        self.labels.get(label)
    }

    pub fn label_name(&self, id: LabelId) -> &str {
        self.labels.name(id)
    }
}

#[cfg(test)]
#[path = "resource_manager_tests.rs"]
mod tests;
