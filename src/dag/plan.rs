// src/dag/plan.rs

use std::collections::{BTreeMap, HashMap};

use crate::dag::target::Target;
use crate::engine::TargetName;

/// Sequential groups of targets. Targets within a group have no ordering
/// constraint among themselves and run concurrently; a group starts only
/// after every member of the previous group completed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionPlan {
    groups: Vec<Vec<TargetName>>,
}

impl ExecutionPlan {
    pub fn new(groups: Vec<Vec<TargetName>>) -> Self {
        Self { groups }
    }

    /// Topological layering: a target lands in the first group after all of
    /// its dependencies. `topo_order` must list every target after its
    /// dependencies.
    pub(crate) fn layered(targets: &BTreeMap<TargetName, Target>, topo_order: &[&str]) -> Self {
        let mut level: HashMap<&str, usize> = HashMap::new();
        let mut groups: Vec<Vec<&Target>> = Vec::new();

        for name in topo_order {
            let Some(target) = targets.get(*name) else {
                continue;
            };
            let depth = target
                .depends_on
                .iter()
                .filter_map(|dep| level.get(dep.as_str()))
                .map(|l| l + 1)
                .max()
                .unwrap_or(0);
            level.insert(target.name.as_str(), depth);

            if groups.len() <= depth {
                groups.resize_with(depth + 1, Vec::new);
            }
            groups[depth].push(target);
        }

        let groups = groups
            .into_iter()
            .map(|mut group| {
                group.sort_by_key(|t| (t.kind.sort_key(), t.name.clone()));
                group.into_iter().map(|t| t.name.clone()).collect()
            })
            .collect();

        Self { groups }
    }

    pub fn groups(&self) -> &[Vec<TargetName>] {
        &self.groups
    }

    pub fn group(&self, index: usize) -> Option<&[TargetName]> {
        self.groups.get(index).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Every target, in plan order.
    pub fn targets(&self) -> impl Iterator<Item = &TargetName> {
        self.groups.iter().flatten()
    }

    /// Index of the group containing `name`.
    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.groups
            .iter()
            .position(|g| g.iter().any(|t| t == name))
    }
}
