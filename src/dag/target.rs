// src/dag/target.rs

use std::collections::BTreeSet;
use std::fmt;

use crate::dag::CLEAN_TARGET;
use crate::engine::TargetName;
use crate::pipeline::{pipeline_for, Step};
use crate::types::AssetCategory;

/// What a target operates on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    /// Empties the build root.
    Clean,
    /// Builds one asset category.
    Asset(AssetCategory),
}

impl TargetKind {
    /// Ordering key used inside a plan group: `clean` first, then category
    /// order.
    pub fn sort_key(self) -> usize {
        match self {
            TargetKind::Clean => 0,
            TargetKind::Asset(category) => 1 + category.ordinal(),
        }
    }
}

/// A named, idempotent unit of build work. Built once, never mutated.
#[derive(Clone)]
pub struct Target {
    pub name: TargetName,
    pub kind: TargetKind,
    /// Transform steps, applied in order. Empty for `clean`.
    pub pipeline: Vec<Step>,
    pub depends_on: BTreeSet<TargetName>,
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let steps: Vec<&str> = self.pipeline.iter().map(|s| s.name()).collect();
        f.debug_struct("Target")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("pipeline", &steps)
            .field("depends_on", &self.depends_on)
            .finish()
    }
}

impl Target {
    pub fn clean() -> Self {
        Self {
            name: CLEAN_TARGET.to_string(),
            kind: TargetKind::Clean,
            pipeline: Vec::new(),
            depends_on: BTreeSet::new(),
        }
    }

    /// Target for `category`, bound to that category's fixed pipeline.
    pub fn asset(category: AssetCategory, depends_on: BTreeSet<TargetName>) -> Self {
        Self {
            name: category.target_name().to_string(),
            kind: TargetKind::Asset(category),
            pipeline: pipeline_for(category),
            depends_on,
        }
    }

    pub fn category(&self) -> Option<AssetCategory> {
        match self.kind {
            TargetKind::Clean => None,
            TargetKind::Asset(category) => Some(category),
        }
    }

    /// Names of the pipeline steps, in order.
    pub fn step_names(&self) -> Vec<&'static str> {
        self.pipeline.iter().map(|s| s.name()).collect()
    }
}
