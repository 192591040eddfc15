//! Run planning: task universe, filters and continue seeding

use crate::error::{RunError, RunResult};
use crate::executor::TaskId;
use std::collections::{BTreeMap, HashMap, HashSet};
use trib_core::{AssetDag, AssetName, Pipeline, PipelineState, RunConfig, SkipReason, TaskKind};

/// A task with the indices of the tasks it waits for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedTask {
    pub id: TaskId,
    pub deps: Vec<usize>,
}

/// The tasks of a run in dependency order, plus the assets it leaves out.
///
/// Every dependency index of a task is smaller than the task's own index.
#[derive(Debug, Clone)]
pub struct RunPlan {
    tasks: Vec<PlannedTask>,
    skipped: BTreeMap<AssetName, SkipReason>,
    compatibility_hash: String,
}

impl RunPlan {
    /// Plan a run of `pipeline`.
    ///
    /// With `previous`, the plan continues that run: its compatibility hash
    /// must match the pipeline and assets it completed are skipped. An asset
    /// counts as completed when it succeeded or was itself skipped as
    /// previously succeeded. Every other selected asset is planned again
    /// together with its selected dependents.
    pub fn build(
        pipeline: &Pipeline,
        config: &RunConfig,
        previous: Option<&PipelineState>,
    ) -> RunResult<Self> {
        let dag = pipeline.dag()?;
        let order = dag.topological_order()?;
        let compatibility_hash = pipeline.compatibility_hash();

        let selected = select_assets(pipeline, &dag, config)?;
        let mut skipped: BTreeMap<AssetName, SkipReason> = order
            .iter()
            .filter(|name| !selected.contains(*name))
            .map(|name| (name.clone(), SkipReason::Filtered))
            .collect();

        let universe = match previous {
            None => selected,
            Some(previous) => {
                if !previous.is_compatible_with(&compatibility_hash) {
                    return Err(RunError::IncompatibleState {
                        expected: compatibility_hash,
                        found: previous.compatibility_hash.clone(),
                    });
                }
                let rerun = assets_to_rerun(&dag, &selected, previous);
                for name in selected.difference(&rerun) {
                    skipped.insert(name.clone(), SkipReason::PreviouslySucceeded);
                }
                rerun
            }
        };

        let kinds = config.task_kinds();
        let mut tasks = Vec::new();
        let mut index: HashMap<TaskId, usize> = HashMap::new();
        for name in order.iter().filter(|n| universe.contains(*n)) {
            let Some(asset) = pipeline.get_asset_by_name(name) else {
                continue;
            };
            for &kind in &kinds {
                if kind == TaskKind::Checks && !asset.has_checks() {
                    continue;
                }
                let id = TaskId::new(name.clone(), kind);
                index.insert(id.clone(), tasks.len());
                tasks.push(PlannedTask {
                    id,
                    deps: Vec::new(),
                });
            }
        }

        for task in &mut tasks {
            let mut deps: Vec<usize> = match task.id.kind {
                TaskKind::Main => dag
                    .ancestors(&task.id.asset)
                    .into_iter()
                    .flat_map(|up| {
                        [
                            TaskId::new(up.clone(), TaskKind::Main),
                            TaskId::new(up, TaskKind::Checks),
                        ]
                    })
                    .filter_map(|id| index.get(&id).copied())
                    .collect(),
                TaskKind::Checks | TaskKind::PushMetadata => index
                    .get(&TaskId::new(task.id.asset.clone(), TaskKind::Main))
                    .copied()
                    .into_iter()
                    .collect(),
            };
            deps.sort_unstable();
            deps.dedup();
            task.deps = deps;
        }

        Ok(Self {
            tasks,
            skipped,
            compatibility_hash,
        })
    }

    pub fn tasks(&self) -> &[PlannedTask] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Assets left out of the run, with the reason
    pub fn skipped(&self) -> &BTreeMap<AssetName, SkipReason> {
        &self.skipped
    }

    pub fn skip_reason(&self, name: &str) -> Option<SkipReason> {
        self.skipped.get(name).copied()
    }

    /// Structural hash of the planned pipeline
    pub fn compatibility_hash(&self) -> &str {
        &self.compatibility_hash
    }

    /// Assets with at least one task, in execution order
    pub fn scheduled_assets(&self) -> Vec<&AssetName> {
        let mut seen = HashSet::new();
        self.tasks
            .iter()
            .map(|t| &t.id.asset)
            .filter(|name| seen.insert(*name))
            .collect()
    }
}

fn select_assets(
    pipeline: &Pipeline,
    dag: &AssetDag,
    config: &RunConfig,
) -> RunResult<HashSet<AssetName>> {
    let mut selected: HashSet<AssetName> = if config.targets.is_empty() {
        pipeline.asset_names().cloned().collect()
    } else {
        let mut selected = HashSet::new();
        for target in &config.targets {
            let asset = pipeline
                .get_asset_by_name(target)
                .ok_or_else(|| RunError::UnknownAsset {
                    name: target.clone(),
                })?;
            selected.insert(asset.name.clone());
            if config.downstream {
                selected.extend(dag.descendants(target));
            }
        }
        selected
    };

    let has_tag = |name: &AssetName, tag: &str| {
        pipeline
            .get_asset_by_name(name)
            .is_some_and(|asset| asset.has_tag(tag))
    };
    if let Some(tag) = &config.tag {
        selected.retain(|name| has_tag(name, tag));
    }
    if let Some(tag) = &config.exclude_tag {
        selected.retain(|name| !has_tag(name, tag));
    }
    Ok(selected)
}

/// Selected assets the previous run did not complete, and their selected dependents
fn assets_to_rerun(
    dag: &AssetDag,
    selected: &HashSet<AssetName>,
    previous: &PipelineState,
) -> HashSet<AssetName> {
    let mut rerun: HashSet<AssetName> = selected
        .iter()
        .filter(|name| !previous.is_complete(name))
        .cloned()
        .collect();

    let roots: Vec<AssetName> = rerun.iter().cloned().collect();
    for name in roots {
        rerun.extend(
            dag.descendants(&name)
                .into_iter()
                .filter(|d| selected.contains(d)),
        );
    }
    rerun
}

#[cfg(test)]
#[path = "plan_test.rs"]
mod tests;
