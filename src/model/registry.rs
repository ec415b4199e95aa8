use std::collections::VecDeque;

use slotmap::{new_key_type, SlotMap};

use super::body::{BodyHandle, BodyOrigin};
use super::scene::NodeId;
use crate::config::TerminationScope;

new_key_type! {
    /// Stable id of a tracked dynamic body.
    pub struct BodyId;
}

/// A scene node paired with its physics body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DynamicBody {
    pub node: NodeId,
    pub handle: BodyHandle,
    pub origin: BodyOrigin,
    /// Fixed at creation; crossing the edge with this set ends the run
    pub in_termination_set: bool,
}

impl DynamicBody {
    pub fn new(node: NodeId, handle: BodyHandle, origin: BodyOrigin, scope: TerminationScope) -> Self {
        let in_termination_set = match (scope, origin) {
            (_, BodyOrigin::Scenery) => false,
            (TerminationScope::AllDynamic, _) => true,
            (TerminationScope::SpawnedOnly, origin) => origin == BodyOrigin::Spawned,
        };
        Self { node, handle, origin, in_termination_set }
    }
}

/// Tracked dynamic bodies in insertion order.
#[derive(Debug, Default)]
pub struct BodyRegistry {
    bodies: SlotMap<BodyId, DynamicBody>,
    order: VecDeque<BodyId>,
}

impl BodyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, body: DynamicBody) -> BodyId {
        let id = self.bodies.insert(body);
        self.order.push_back(id);
        id
    }

    pub fn remove(&mut self, id: BodyId) -> Option<DynamicBody> {
        let body = self.bodies.remove(id)?;
        self.order.retain(|other| *other != id);
        Some(body)
    }

    /// Remove the least recently inserted body.
    pub fn pop_oldest(&mut self) -> Option<(BodyId, DynamicBody)> {
        let id = self.order.pop_front()?;
        self.bodies.remove(id).map(|body| (id, body))
    }

    pub fn get(&self, id: BodyId) -> Option<&DynamicBody> {
        self.bodies.get(id)
    }

    pub fn contains(&self, id: BodyId) -> bool {
        self.bodies.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Bodies in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (BodyId, &DynamicBody)> {
        self.order
            .iter()
            .filter_map(|id| self.bodies.get(*id).map(|body| (*id, body)))
    }

    pub fn termination_set(&self) -> impl Iterator<Item = (BodyId, &DynamicBody)> {
        self.iter().filter(|(_, body)| body.in_termination_set)
    }
}
