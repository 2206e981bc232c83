// src/dag/graph.rs

use std::collections::{BTreeMap, BTreeSet};

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::config::model::ConfigFile;
use crate::dag::plan::ExecutionPlan;
use crate::dag::target::Target;
use crate::dag::CLEAN_TARGET;
use crate::engine::TargetName;
use crate::errors::{PipelineError, Result};

/// Immutable set of targets, their dependency edges and the derived
/// execution plan.
#[derive(Debug, Clone)]
pub struct TaskGraph {
    targets: BTreeMap<TargetName, Target>,
    dependents: BTreeMap<TargetName, Vec<TargetName>>,
    plan: ExecutionPlan,
}

impl TaskGraph {
    /// Build a graph from explicit targets.
    ///
    /// Fails with `ConfigError` for a dependency on an unknown target and
    /// with `CycleDetected` for self-dependencies and cycles.
    pub fn from_targets(targets: impl IntoIterator<Item = Target>) -> Result<Self> {
        let targets: BTreeMap<TargetName, Target> =
            targets.into_iter().map(|t| (t.name.clone(), t)).collect();

        for target in targets.values() {
            for dep in &target.depends_on {
                if *dep == target.name {
                    return Err(PipelineError::CycleDetected(format!(
                        "target '{}' depends on itself",
                        target.name
                    )));
                }
                if !targets.contains_key(dep) {
                    return Err(PipelineError::ConfigError(format!(
                        "target '{}' depends on unknown target '{}'",
                        target.name, dep
                    )));
                }
            }
        }

        // Edge direction: dep -> target.
        let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();
        for name in targets.keys() {
            graph.add_node(name.as_str());
        }
        for target in targets.values() {
            for dep in &target.depends_on {
                graph.add_edge(dep.as_str(), target.name.as_str(), ());
            }
        }

        let order = toposort(&graph, None).map_err(|cycle| {
            PipelineError::CycleDetected(format!(
                "cycle in `after` dependencies involving target '{}'",
                cycle.node_id()
            ))
        })?;

        let plan = ExecutionPlan::layered(&targets, &order);

        let mut dependents: BTreeMap<TargetName, Vec<TargetName>> = BTreeMap::new();
        for target in targets.values() {
            for dep in &target.depends_on {
                dependents
                    .entry(dep.clone())
                    .or_default()
                    .push(target.name.clone());
            }
        }

        debug!(groups = ?plan.groups(), "derived execution plan");

        Ok(Self {
            targets,
            dependents,
            plan,
        })
    }

    pub fn target(&self, name: &str) -> Option<&Target> {
        self.targets.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.targets.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Targets in plan order.
    pub fn targets(&self) -> impl Iterator<Item = &Target> {
        self.plan.targets().filter_map(|n| self.targets.get(n))
    }

    pub fn dependencies_of(&self, name: &str) -> Option<&BTreeSet<TargetName>> {
        self.targets.get(name).map(|t| &t.depends_on)
    }

    /// Targets that list `name` as a dependency.
    pub fn dependents_of(&self, name: &str) -> &[TargetName] {
        self.dependents
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn plan(&self) -> &ExecutionPlan {
        &self.plan
    }
}

/// One target per asset category plus `clean`. Every asset target depends on
/// `clean` and on the targets named in its `after` list.
pub fn build_graph(cfg: &ConfigFile) -> Result<TaskGraph> {
    let mut targets = vec![Target::clean()];

    for entry in cfg.paths().iter() {
        let mut deps: BTreeSet<TargetName> = BTreeSet::new();
        deps.insert(CLEAN_TARGET.to_string());
        deps.extend(entry.after.iter().cloned());
        targets.push(Target::asset(entry.category, deps));
    }

    TaskGraph::from_targets(targets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AssetCategory;

    fn asset(category: AssetCategory, deps: &[&str]) -> Target {
        Target::asset(category, deps.iter().map(|d| d.to_string()).collect())
    }

    #[test]
    fn default_plan_is_clean_then_everything() {
        let graph = build_graph(&crate::config::ConfigFile::default()).unwrap();
        assert_eq!(graph.len(), 7);
        assert_eq!(
            graph.plan().groups(),
            &[
                vec!["clean".to_string()],
                vec![
                    "html".to_string(),
                    "css".to_string(),
                    "js".to_string(),
                    "images".to_string(),
                    "fonts".to_string(),
                    "icons".to_string(),
                ],
            ]
        );
    }

    #[test]
    fn after_edges_push_targets_into_later_groups() {
        let graph = TaskGraph::from_targets(vec![
            Target::clean(),
            asset(AssetCategory::Html, &["clean", "css"]),
            asset(AssetCategory::Css, &["clean"]),
        ])
        .unwrap();

        assert_eq!(graph.plan().position_of("clean"), Some(0));
        assert_eq!(graph.plan().position_of("css"), Some(1));
        assert_eq!(graph.plan().position_of("html"), Some(2));
        assert_eq!(graph.dependents_of("css"), &["html".to_string()]);
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let err = TaskGraph::from_targets(vec![
            Target::clean(),
            asset(AssetCategory::Js, &["js"]),
        ])
        .unwrap_err();
        assert!(matches!(err, PipelineError::CycleDetected(_)), "{err}");
    }

    #[test]
    fn two_target_cycle_is_detected() {
        let err = TaskGraph::from_targets(vec![
            Target::clean(),
            asset(AssetCategory::Js, &["clean", "css"]),
            asset(AssetCategory::Css, &["clean", "js"]),
        ])
        .unwrap_err();
        assert!(matches!(err, PipelineError::CycleDetected(_)), "{err}");
    }
}
