//! Per-layer timelines
//!
//! A timeline is the ordered mapping from observation time to dataset.
//! Keys are unique: re-inserting a dataset at a known time step replaces
//! the previous entry. Iteration order is ascending by time, which the
//! backing `BTreeMap` guarantees by construction.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::ops::RangeBounds;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::dataset::ProductDataset;

/// Ordered mapping `observation time -> dataset` for one layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    entries: BTreeMap<DateTime<Utc>, ProductDataset>,
}

impl Timeline {
    /// Create an empty timeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `dataset` at its scheduled time, replacing and returning any
    /// previous entry at that time step.
    pub fn insert(&mut self, dataset: ProductDataset) -> Option<ProductDataset> {
        self.entries.insert(dataset.sched_time, dataset)
    }

    /// Remove and return the entry at `sched_time`.
    pub fn remove(&mut self, sched_time: &DateTime<Utc>) -> Option<ProductDataset> {
        self.entries.remove(sched_time)
    }

    /// Dataset at exactly `sched_time`.
    pub fn get(&self, sched_time: &DateTime<Utc>) -> Option<&ProductDataset> {
        self.entries.get(sched_time)
    }

    /// Mutable dataset at exactly `sched_time`.
    pub fn get_mut(&mut self, sched_time: &DateTime<Utc>) -> Option<&mut ProductDataset> {
        self.entries.get_mut(sched_time)
    }

    /// Dataset with the given identity, wherever it sits in the timeline.
    pub fn get_by_uuid(&self, dataset_uuid: Uuid) -> Option<&ProductDataset> {
        self.entries.values().find(|d| d.uuid == dataset_uuid)
    }

    /// Number of time steps.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the timeline has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Earliest time step.
    pub fn first_time(&self) -> Option<DateTime<Utc>> {
        self.entries.keys().next().copied()
    }

    /// Latest time step.
    pub fn last_time(&self) -> Option<DateTime<Utc>> {
        self.entries.keys().next_back().copied()
    }

    /// Time steps in ascending order.
    pub fn times(&self) -> impl Iterator<Item = DateTime<Utc>> + '_ {
        self.entries.keys().copied()
    }

    /// Entries in ascending time order.
    pub fn iter(&self) -> btree_map::Iter<'_, DateTime<Utc>, ProductDataset> {
        self.entries.iter()
    }

    /// Datasets in ascending time order.
    pub fn datasets(&self) -> impl Iterator<Item = &ProductDataset> {
        self.entries.values()
    }

    /// Mutable datasets in ascending time order.
    pub fn datasets_mut(&mut self) -> impl Iterator<Item = &mut ProductDataset> {
        self.entries.values_mut()
    }

    /// Entries whose time step falls in `range`, ascending.
    pub fn range<R>(&self, range: R) -> btree_map::Range<'_, DateTime<Utc>, ProductDataset>
    where
        R: RangeBounds<DateTime<Utc>>,
    {
        self.entries.range(range)
    }
}

impl<'a> IntoIterator for &'a Timeline {
    type Item = (&'a DateTime<Utc>, &'a ProductDataset);
    type IntoIter = btree_map::Iter<'a, DateTime<Utc>, ProductDataset>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
