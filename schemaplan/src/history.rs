//! In-memory registry of the snapshots accepted into one schema lineage.
//!
//! Snapshots are never destroyed once recorded; the history answers version
//! lookups for auditing and derives validated migration plans between any
//! two recorded versions.

use std::collections::BTreeMap;

use crate::differ::{diff, Delta};
use crate::errors::{DiffError, HistoryError, SchemaError};
use crate::plan::{build_with, BuildOptions, MigrationPlan};
use crate::schema::Snapshot;
use crate::validator::{check_equivalent, compose, validate};

/// Every version of one model class, keyed by version.
#[derive(Debug)]
pub struct SchemaHistory {
    name: String,
    snapshots: BTreeMap<u32, Snapshot>,
}

impl SchemaHistory {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            snapshots: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Record a new snapshot. Versions must strictly increase within a
    /// lineage, and the snapshot must describe this lineage's model.
    pub fn insert(&mut self, snapshot: Snapshot) -> Result<(), SchemaError> {
        if snapshot.name() != self.name {
            return Err(SchemaError::LineageNameMismatch {
                lineage: self.name.clone(),
                snapshot: snapshot.name().to_string(),
            });
        }
        if let Some((&latest, _)) = self.snapshots.iter().next_back()
            && snapshot.version() <= latest
        {
            return Err(SchemaError::NonMonotonicVersion {
                version: snapshot.version(),
                latest,
            });
        }
        self.snapshots.insert(snapshot.version(), snapshot);
        Ok(())
    }

    pub fn latest(&self) -> Option<&Snapshot> {
        self.snapshots.values().next_back()
    }

    pub fn get(&self, version: u32) -> Option<&Snapshot> {
        self.snapshots.get(&version)
    }

    /// Recorded versions in increasing order.
    pub fn versions(&self) -> Vec<u32> {
        self.snapshots.keys().copied().collect()
    }

    /// Diff two recorded versions.
    pub fn delta_between(&self, from: u32, to: u32) -> Result<Delta, HistoryError> {
        let from = self.fetch(from)?;
        let to = self.fetch(to)?;
        Ok(diff(from, to)?)
    }

    /// Build and validate the direct plan between two recorded versions.
    pub fn plan_between(&self, from: u32, to: u32, options: BuildOptions) -> Result<MigrationPlan, HistoryError> {
        let from_snap = self.fetch(from)?;
        let to_snap = self.fetch(to)?;
        let delta = diff(from_snap, to_snap)?;
        let plan = build_with(&delta, options)?;
        validate(&plan, from_snap, to_snap)?;
        Ok(plan)
    }

    /// Compose stepwise plans across every recorded version between `from`
    /// and `to`, verify the result against the direct plan, and return the
    /// composed plan. Guarantees that incremental and one-jump upgrades
    /// agree before anything reaches a migration engine.
    pub fn plan_chain(&self, from: u32, to: u32, options: BuildOptions) -> Result<MigrationPlan, HistoryError> {
        let from_snap = self.fetch(from)?;
        self.fetch(to)?;
        if from >= to {
            return Err(HistoryError::Diff(DiffError::VersionOrder { from, to }));
        }

        // Both endpoints are recorded, so the range walks at least two
        // versions.
        let steps: Vec<u32> = self.snapshots.range(from..=to).map(|(&v, _)| v).collect();
        let mut composed = self.plan_between(steps[0], steps[1], options)?;
        for pair in steps[1..].windows(2) {
            let step = self.plan_between(pair[0], pair[1], options)?;
            composed = compose(&composed, &step)?;
        }

        let direct = self.plan_between(from, to, options)?;
        check_equivalent(&composed, &direct, from_snap)?;
        Ok(composed)
    }

    fn fetch(&self, version: u32) -> Result<&Snapshot, HistoryError> {
        self.get(version).ok_or(HistoryError::UnknownVersion { version })
    }
}
