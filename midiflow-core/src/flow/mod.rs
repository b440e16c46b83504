//! PatternFlow: a DAG of source and transform nodes with memoized evaluation
//!
//! Nodes live in a flat arena indexed by [`NodeId`]. Edges point from a node
//! to its inputs; every mutation that adds an edge checks reachability first,
//! so the graph is acyclic at all times, not just when evaluated.
//!
//! Evaluation walks the ancestor set of the requested node in topological
//! order and fills a per-node compute-once cell. Cells are only reset by
//! `&mut self` operations, which also reset every descendant, so a node is
//! computed at most once per flow state even when several threads evaluate
//! overlapping parts of the graph through a shared reference.

mod node;


pub use node::{NodeId, NodeKind, PatternFlowNode};

use crate::error::{Result, ValidationError};
use crate::modifier::Modifier;
use crate::types::Pattern;
use log::{debug, trace};
use once_cell::sync::OnceCell;
use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeSet, HashSet};
use std::hash::{Hash, Hasher};

#[derive(Clone, Debug)]
struct Slot {
    node: PatternFlowNode,
    /// Nodes that list this one among their inputs
    dependents: BTreeSet<NodeId>,
    /// Structural hash of the payload and, transitively, all inputs
    fingerprint: u64,
    output: OnceCell<Pattern>,
}

/// A graph of pattern sources and modifiers, evaluated lazily with caching
#[derive(Clone, Debug, Default)]
pub struct PatternFlow {
    slots: Vec<Option<Slot>>,
}

impl PatternFlow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.slots.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.slot(id).is_ok()
    }

    pub fn node(&self, id: NodeId) -> Option<&PatternFlowNode> {
        self.slot(id).ok().map(|slot| &slot.node)
    }

    /// Live nodes in id order
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &PatternFlowNode)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|slot| (NodeId::new(index), &slot.node)))
    }

    pub fn inputs(&self, id: NodeId) -> Result<&[NodeId]> {
        Ok(self.slot(id)?.node.inputs())
    }

    /// Nodes that consume `id` directly
    pub fn dependents(&self, id: NodeId) -> Result<Vec<NodeId>> {
        Ok(self.slot(id)?.dependents.iter().copied().collect())
    }

    /// Every node `id` transitively reads from, excluding itself
    pub fn ancestors(&self, id: NodeId) -> Result<BTreeSet<NodeId>> {
        let mut seen = BTreeSet::new();
        let mut stack: Vec<NodeId> = self.slot(id)?.node.inputs.clone();
        while let Some(current) = stack.pop() {
            if seen.insert(current) {
                stack.extend(self.slot(current)?.node.inputs.iter().copied());
            }
        }
        Ok(seen)
    }

    /// Structural identity of the node's output: equal fingerprints mean
    /// equal payloads fed by equal inputs
    pub fn fingerprint(&self, id: NodeId) -> Result<u64> {
        Ok(self.slot(id)?.fingerprint)
    }

    /// True when the node's result is already computed
    pub fn is_cached(&self, id: NodeId) -> bool {
        self.slot(id)
            .map(|slot| slot.output.get().is_some())
            .unwrap_or(false)
    }

    fn slot(&self, id: NodeId) -> Result<&Slot> {
        self.slots
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or(ValidationError::UnknownNode(id))
    }

    fn slot_mut(&mut self, id: NodeId) -> Result<&mut Slot> {
        self.slots
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(ValidationError::UnknownNode(id))
    }

    /// Add a leaf node holding `pattern`
    pub fn add_source(&mut self, pattern: Pattern) -> NodeId {
        let node = PatternFlowNode::source(pattern);
        let fingerprint = self.compute_fingerprint(&node);
        self.push(node, fingerprint)
    }

    /// Add a node applying `modifier` to the outputs of `inputs`.
    ///
    /// The node and its edges become visible together, or not at all.
    pub fn add_transform(&mut self, modifier: Modifier, inputs: &[NodeId]) -> Result<NodeId> {
        check_arity(&modifier, inputs.len())?;
        modifier.validate()?;
        for input in inputs {
            self.slot(*input)?;
        }
        let node = PatternFlowNode::transform(modifier, inputs.to_vec());
        let fingerprint = self.compute_fingerprint(&node);
        let id = self.push(node, fingerprint);
        for input in inputs {
            self.slot_mut(*input)?.dependents.insert(id);
        }
        Ok(id)
    }

    fn push(&mut self, node: PatternFlowNode, fingerprint: u64) -> NodeId {
        let id = NodeId::new(self.slots.len());
        trace!("adding node {}: {}", id, node);
        self.slots.push(Some(Slot {
            node,
            dependents: BTreeSet::new(),
            fingerprint,
            output: OnceCell::new(),
        }));
        id
    }

    /// Replace the pattern stored in a source node
    pub fn replace_source(&mut self, id: NodeId, pattern: Pattern) -> Result<()> {
        let slot = self.slot(id)?;
        if !slot.node.is_source() {
            return Err(ValidationError::WrongNodeKind {
                node: id,
                expected: "source",
            });
        }
        self.replace_node(id, PatternFlowNode::source(pattern))
    }

    /// Swap the modifier of a transform node, keeping its inputs
    pub fn replace_modifier(&mut self, id: NodeId, modifier: Modifier) -> Result<()> {
        let slot = self.slot(id)?;
        if slot.node.is_source() {
            return Err(ValidationError::WrongNodeKind {
                node: id,
                expected: "transform",
            });
        }
        check_arity(&modifier, slot.node.inputs.len())?;
        modifier.validate()?;
        let inputs = slot.node.inputs.clone();
        self.replace_node(id, PatternFlowNode::transform(modifier, inputs))
    }

    /// Point a transform node at new inputs.
    ///
    /// Fails with a cycle error, leaving the flow untouched, if any new input
    /// is `id` itself or already reads from `id`.
    pub fn rewire(&mut self, id: NodeId, inputs: &[NodeId]) -> Result<()> {
        let slot = self.slot(id)?;
        let modifier = match &slot.node.kind {
            NodeKind::Transform(modifier) => modifier.clone(),
            NodeKind::Source(_) => {
                return Err(ValidationError::WrongNodeKind {
                    node: id,
                    expected: "transform",
                })
            }
        };
        check_arity(&modifier, inputs.len())?;
        for input in inputs {
            self.slot(*input)?;
        }
        let downstream: HashSet<NodeId> = self.downstream_order(id)?.into_iter().collect();
        if let Some(input) = inputs.iter().find(|input| downstream.contains(input)) {
            return Err(ValidationError::Cycle {
                node: id,
                input: *input,
            });
        }

        let old_inputs = std::mem::take(&mut self.slot_mut(id)?.node.inputs);
        for input in &old_inputs {
            self.slot_mut(*input)?.dependents.remove(&id);
        }
        for input in inputs {
            self.slot_mut(*input)?.dependents.insert(id);
        }
        self.slot_mut(id)?.node.inputs = inputs.to_vec();
        self.refresh_fingerprints(id)?;
        self.invalidate(id)?;
        Ok(())
    }

    fn replace_node(&mut self, id: NodeId, node: PatternFlowNode) -> Result<()> {
        let fingerprint = self.compute_fingerprint(&node);
        let slot = self.slot_mut(id)?;
        if slot.fingerprint == fingerprint && slot.node == node {
            debug!("node {} replaced by an identical node, cache kept", id);
            return Ok(());
        }
        slot.node = node;
        self.refresh_fingerprints(id)?;
        self.invalidate(id)?;
        Ok(())
    }

    /// Delete a node nothing depends on. Its id is not reused.
    pub fn remove(&mut self, id: NodeId) -> Result<PatternFlowNode> {
        let slot = self.slot(id)?;
        if !slot.dependents.is_empty() {
            return Err(ValidationError::NodeInUse {
                node: id,
                dependents: slot.dependents.iter().copied().collect(),
            });
        }
        let inputs = slot.node.inputs.clone();
        for input in &inputs {
            self.slot_mut(*input)?.dependents.remove(&id);
        }
        let removed = self.slots[id.index()].take();
        removed
            .map(|slot| slot.node)
            .ok_or(ValidationError::UnknownNode(id))
    }

    /// Drop the cached result of `id` and of everything downstream of it.
    ///
    /// Returns how many cached results were discarded.
    pub fn invalidate(&mut self, id: NodeId) -> Result<usize> {
        let cone = self.downstream_order(id)?;
        let mut dropped = 0;
        for node in &cone {
            let slot = self.slot_mut(*node)?;
            if slot.output.take().is_some() {
                dropped += 1;
            }
        }
        debug!(
            "invalidated {}: {} node(s) in cone, {} cached result(s) dropped",
            id,
            cone.len(),
            dropped
        );
        Ok(dropped)
    }

    /// Invalidate `id`, then eagerly recompute it and every descendant
    pub fn populate(&mut self, id: NodeId) -> Result<()> {
        self.invalidate(id)?;
        for node in self.downstream_order(id)? {
            self.evaluate(node)?;
        }
        Ok(())
    }

    /// `id` followed by every node downstream of it, in an order where each
    /// node comes after all of its inputs
    fn downstream_order(&self, id: NodeId) -> Result<Vec<NodeId>> {
        let mut order = Vec::new();
        let mut visited = HashSet::new();
        // (node, dependents already pushed)
        let mut stack = vec![(id, false)];
        while let Some((current, expanded)) = stack.pop() {
            if expanded {
                order.push(current);
                continue;
            }
            if !visited.insert(current) {
                continue;
            }
            stack.push((current, true));
            for dependent in &self.slot(current)?.dependents {
                if !visited.contains(dependent) {
                    stack.push((*dependent, false));
                }
            }
        }
        order.reverse();
        Ok(order)
    }

    /// Nodes that must be computed to produce `id`, inputs first, ending
    /// with `id`. Subgraphs behind an already-cached node are skipped.
    pub fn topological_order(&self, id: NodeId) -> Result<Vec<NodeId>> {
        let mut order = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = vec![(id, false)];
        while let Some((current, expanded)) = stack.pop() {
            if expanded {
                order.push(current);
                continue;
            }
            if !visited.insert(current) {
                continue;
            }
            let slot = self.slot(current)?;
            stack.push((current, true));
            if slot.output.get().is_some() {
                continue;
            }
            for input in slot.node.inputs.iter().rev() {
                if !visited.contains(input) {
                    stack.push((*input, false));
                }
            }
        }
        Ok(order)
    }

    /// Synthesize the pattern at `id`.
    ///
    /// All or nothing: the first failing ancestor's error is returned,
    /// tagged with that ancestor's id.
    pub fn evaluate(&self, id: NodeId) -> Result<Pattern> {
        let slot = self.slot(id)?;
        if let Some(pattern) = slot.output.get() {
            debug!("cache hit for {}", id);
            return Ok(pattern.clone());
        }
        let order = self.topological_order(id)?;
        debug!("evaluating {} via {} node(s)", id, order.len());
        let mut result = None;
        for node in order {
            result = Some(self.evaluate_node(node)?);
        }
        result.ok_or(ValidationError::UnknownNode(id))
    }

    /// Evaluate several nodes, one worker thread per request.
    ///
    /// Shared ancestors are still computed only once.
    pub fn evaluate_all(&self, ids: &[NodeId]) -> Vec<Result<Pattern>> {
        if ids.len() < 2 {
            return ids.iter().map(|id| self.evaluate(*id)).collect();
        }
        std::thread::scope(|scope| {
            let workers: Vec<_> = ids
                .iter()
                .map(|id| scope.spawn(move || self.evaluate(*id)))
                .collect();
            workers
                .into_iter()
                .map(|worker| {
                    worker
                        .join()
                        .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
                })
                .collect()
        })
    }

    fn evaluate_node(&self, id: NodeId) -> Result<Pattern> {
        let slot = self.slot(id)?;
        slot.output
            .get_or_try_init(|| {
                trace!("computing {}: {}", id, slot.node);
                match &slot.node.kind {
                    NodeKind::Source(pattern) => Ok(pattern.clone()),
                    NodeKind::Transform(modifier) => {
                        let inputs = slot
                            .node
                            .inputs
                            .iter()
                            .map(|input| self.evaluate_node(*input))
                            .collect::<Result<Vec<Pattern>>>()?;
                        modifier.forward(&inputs).map_err(|err| err.at_node(id))
                    }
                }
            })
            .cloned()
    }

    fn compute_fingerprint(&self, node: &PatternFlowNode) -> u64 {
        let mut hasher = DefaultHasher::new();
        match &node.kind {
            NodeKind::Source(pattern) => {
                "source".hash(&mut hasher);
                pattern.hash(&mut hasher);
            }
            NodeKind::Transform(modifier) => {
                "transform".hash(&mut hasher);
                modifier.hash(&mut hasher);
                for input in &node.inputs {
                    self.slot(*input)
                        .map(|slot| slot.fingerprint)
                        .unwrap_or_default()
                        .hash(&mut hasher);
                }
            }
        }
        hasher.finish()
    }

    fn refresh_fingerprints(&mut self, id: NodeId) -> Result<()> {
        for node in self.downstream_order(id)? {
            let fingerprint = self.compute_fingerprint(&self.slot(node)?.node);
            self.slot_mut(node)?.fingerprint = fingerprint;
        }
        Ok(())
    }
}

fn check_arity(modifier: &Modifier, actual: usize) -> Result<()> {
    let expected = modifier.arity();
    if expected.accepts(actual) {
        Ok(())
    } else {
        Err(ValidationError::Arity {
            modifier: modifier.name().to_string(),
            expected,
            actual,
        })
    }
}
