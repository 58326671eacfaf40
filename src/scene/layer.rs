use std::collections::BTreeMap;
use std::fmt;

use tracing::debug;

use crate::projection::Projection;

/// Everything an element needs to derive its screen attributes for one tick.
#[derive(Debug, Clone, Copy)]
pub struct ApplyContext {
    pub projection: Projection,
    /// Halo radius in world units, from the snapshot. Zero when the backend omitted it.
    pub robot_radius: f64,
    /// Time of application, in seconds on the UI clock.
    pub now: f64,
    /// Duration of position transitions. Zero disables tweening.
    pub transition_secs: f64,
}

/// A drawable thing that lives in a [`Layer`] and is identified across snapshots by its key.
pub trait SceneElement: Sized {
    type Key: Ord + Clone + fmt::Debug;
    type Datum;

    fn key(datum: &Self::Datum) -> Self::Key;

    fn create(key: &Self::Key, datum: &Self::Datum, ctx: &ApplyContext) -> Self;

    /// Bring the element in line with `datum`. Returns whether any attribute changed.
    fn update(&mut self, datum: &Self::Datum, ctx: &ApplyContext) -> bool;
}

/// What one reconcile pass did to a layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileReport<K> {
    pub created: Vec<K>,
    pub updated: Vec<K>,
    pub unchanged: usize,
    pub removed: Vec<K>,
    /// Incoming data sharing a key with an earlier datum in the same snapshot.
    pub duplicates: usize,
}

impl<K> Default for ReconcileReport<K> {
    fn default() -> Self {
        Self { created: Vec::new(), updated: Vec::new(), unchanged: 0, removed: Vec::new(), duplicates: 0 }
    }
}

impl<K> ReconcileReport<K> {
    /// No element was created or removed.
    pub fn is_structurally_stable(&self) -> bool {
        self.created.is_empty() && self.removed.is_empty()
    }
}

/// Keyed collection of live elements of one category.
pub struct Layer<E: SceneElement> {
    elements: BTreeMap<E::Key, E>,
}

impl<E: SceneElement> Default for Layer<E> {
    fn default() -> Self {
        Self { elements: BTreeMap::new() }
    }
}

impl<E: SceneElement> Layer<E> {
    /// Join the live elements with `data` by key, then update, create and remove, in that order.
    ///
    /// When two data share a key the first one wins; the rest are counted as duplicates.
    pub fn reconcile(&mut self, data: &[E::Datum], ctx: &ApplyContext) -> ReconcileReport<E::Key> {
        let mut report = ReconcileReport::default();

        let mut incoming: BTreeMap<E::Key, &E::Datum> = BTreeMap::new();
        for datum in data {
            let key = E::key(datum);
            if incoming.contains_key(&key) {
                report.duplicates += 1;
                continue;
            }
            incoming.insert(key, datum);
        }

        for (key, element) in self.elements.iter_mut() {
            if let Some(datum) = incoming.get(key) {
                if element.update(datum, ctx) {
                    report.updated.push(key.clone());
                } else {
                    report.unchanged += 1;
                }
            }
        }

        for (key, datum) in &incoming {
            if !self.elements.contains_key(key) {
                self.elements.insert(key.clone(), E::create(key, datum, ctx));
                report.created.push(key.clone());
            }
        }

        self.elements.retain(|key, _| {
            let keep = incoming.contains_key(key);
            if !keep {
                report.removed.push(key.clone());
            }
            keep
        });

        if report.duplicates > 0 {
            debug!(duplicates = report.duplicates, "ignored data sharing an identity key");
        }

        report
    }

    pub fn get(&self, key: &E::Key) -> Option<&E> {
        self.elements.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&E::Key, &E)> {
        self.elements.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &E::Key> {
        self.elements.keys()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn clear(&mut self) {
        self.elements.clear();
    }
}
