//! Live-entity registry and the frame-reconciliation diff.
//!
//! The registry is the single source of truth for what is on screen: a map
//! from [`EntityKey`] to the renderer handle (plus current pose) of exactly
//! one live object. [`reconcile`] is a pure function of the prior registry
//! and an incoming snapshot; it never touches the renderer itself.
//!
//! Diff policy, preserved from the observed system:
//! - Cars are diffed by stable id: present-and-known becomes an update,
//!   present-and-new a create, known-but-absent a removal.
//! - Signals have no server identity and are cleared and recreated wholesale
//!   every frame, keyed by grid position.
//! - Application order is removals, then creates, then updates, so a key is
//!   never claimed by two live objects during a transition.

use std::collections::{HashMap, HashSet};

use tracing::warn;

use crate::motion::Pose;
use crate::render::EntityKind;
use crate::snapshot::Snapshot;

// ============================================================================
// KEYS
// ============================================================================

/// Registry identity of a rendered entity.
///
/// Cars use the server-assigned id; signals use the synthetic positional
/// key derived in [`crate::snapshot::SignalState::registry_key`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKey {
    Car(String),
    Signal(String),
}

impl std::fmt::Display for EntityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKey::Car(id) => write!(f, "car:{id}"),
            EntityKey::Signal(key) => write!(f, "signal:{key}"),
        }
    }
}

// ============================================================================
// DIFF
// ============================================================================

/// Instruction to create one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateOp {
    pub key: EntityKey,
    pub kind: EntityKind,
    pub pose: Pose,
}

/// Instruction to move one entity toward a target pose.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOp {
    pub key: EntityKey,
    pub target: Pose,
}

/// The delta between a registry and a snapshot, in application order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameDiff {
    pub removals: Vec<EntityKey>,
    pub creates: Vec<CreateOp>,
    pub updates: Vec<UpdateOp>,
}

impl FrameDiff {
    pub fn is_empty(&self) -> bool {
        self.removals.is_empty() && self.creates.is_empty() && self.updates.is_empty()
    }
}

/// Computes the delta that brings `registry` in line with `snapshot`.
///
/// Deterministic: creates and updates follow snapshot order, removals are
/// sorted by key. Duplicate keys within one snapshot keep the first record;
/// later ones are dropped with a warning (one live object per key).
pub fn reconcile<H>(registry: &SceneRegistry<H>, snapshot: &Snapshot) -> FrameDiff {
    let mut diff = FrameDiff::default();

    let mut snapshot_cars: HashSet<&str> = HashSet::with_capacity(snapshot.cars.len());
    for car in &snapshot.cars {
        if !snapshot_cars.insert(car.id.as_str()) {
            warn!(car = %car.id, "duplicate car id in snapshot, keeping first record");
            continue;
        }
        let key = EntityKey::Car(car.id.clone());
        let pose = Pose::facing(car.position, car.heading);
        if registry.contains(&key) {
            diff.updates.push(UpdateOp { key, target: pose });
        } else {
            diff.creates.push(CreateOp { key, kind: EntityKind::Car, pose });
        }
    }

    // Departed cars, plus every signal: signals are recreated from scratch
    // each frame.
    for key in registry.keys() {
        match key {
            EntityKey::Car(id) if !snapshot_cars.contains(id.as_str()) => {
                diff.removals.push(key.clone());
            }
            EntityKey::Signal(_) => diff.removals.push(key.clone()),
            EntityKey::Car(_) => {}
        }
    }
    diff.removals.sort();

    let mut signal_keys: HashSet<String> = HashSet::with_capacity(snapshot.signals.len());
    for signal in &snapshot.signals {
        let key = signal.registry_key();
        if !signal_keys.insert(key.clone()) {
            warn!(signal = %key, "duplicate signal position in snapshot, keeping first record");
            continue;
        }
        diff.creates.push(CreateOp {
            key: EntityKey::Signal(key),
            kind: EntityKind::Signal(signal.phase),
            pose: Pose::facing(signal.position, signal.heading),
        });
    }

    diff
}

// ============================================================================
// REGISTRY
// ============================================================================

/// Mapping from entity key to live renderer handle and current pose.
///
/// Single-writer: only the synchronizer mutates it. Invariant: every key
/// corresponds to exactly one live rendered object.
#[derive(Debug)]
pub struct SceneRegistry<H> {
    entries: HashMap<EntityKey, Entry<H>>,
}

#[derive(Debug)]
struct Entry<H> {
    handle: H,
    pose: Pose,
}

impl<H> Default for SceneRegistry<H> {
    fn default() -> Self {
        Self { entries: HashMap::new() }
    }
}

impl<H> SceneRegistry<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: EntityKey, handle: H, pose: Pose) {
        self.entries.insert(key, Entry { handle, pose });
    }

    /// Removes an entry, returning its handle for destruction.
    pub fn remove(&mut self, key: &EntityKey) -> Option<H> {
        self.entries.remove(key).map(|e| e.handle)
    }

    pub fn contains(&self, key: &EntityKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn pose(&self, key: &EntityKey) -> Option<Pose> {
        self.entries.get(key).map(|e| e.pose)
    }

    /// Updates the stored pose and hands the entry's handle to `f`.
    pub fn move_entity(&mut self, key: &EntityKey, pose: Pose, f: impl FnOnce(&mut H, Pose)) {
        if let Some(entry) = self.entries.get_mut(key) {
            entry.pose = pose;
            f(&mut entry.handle, pose);
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &EntityKey> {
        self.entries.keys()
    }

    /// Car ids currently live, unordered.
    pub fn car_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().filter_map(|k| match k {
            EntityKey::Car(id) => Some(id.as_str()),
            EntityKey::Signal(_) => None,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Empties the registry, handing every handle to `destroy`.
    pub fn clear_with(&mut self, mut destroy: impl FnMut(H)) {
        for (_, entry) in self.entries.drain() {
            destroy(entry.handle);
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
