//! Dependency graph over the assets of a pipeline

use crate::asset::Asset;
use crate::asset_name::AssetName;
use crate::error::{CoreError, CoreResult};
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Bfs, Reversed};
use petgraph::Direction;
use std::collections::{HashMap, VecDeque};

/// Producer-to-consumer edges between assets. Always acyclic once built.
#[derive(Debug, Default)]
pub struct AssetDag {
    graph: DiGraph<AssetName, ()>,
    index: HashMap<AssetName, NodeIndex>,
}

impl AssetDag {
    /// Upstream names that are not among `assets` are external tables and
    /// add no edge.
    pub fn build(assets: &[Asset]) -> CoreResult<Self> {
        let mut graph = DiGraph::with_capacity(assets.len(), assets.len());
        let index: HashMap<AssetName, NodeIndex> = assets
            .iter()
            .map(|a| (a.name.clone(), graph.add_node(a.name.clone())))
            .collect();

        for asset in assets {
            let Some(&consumer) = index.get(&asset.name) else {
                continue;
            };
            for &producer in asset.upstreams.iter().filter_map(|u| index.get(u)) {
                graph.update_edge(producer, consumer, ());
            }
        }

        let dag = Self { graph, index };
        dag.topological_order()?;
        Ok(dag)
    }

    /// Producers before consumers
    pub fn topological_order(&self) -> CoreResult<Vec<AssetName>> {
        let nodes = toposort(&self.graph, None).map_err(|cycle| CoreError::CircularDependency {
            cycle: self.cycle_through(cycle.node_id()),
        })?;
        Ok(nodes.into_iter().map(|n| self.graph[n].clone()).collect())
    }

    /// Shortest cycle that starts and ends at `start`, as `a -> b -> a`
    fn cycle_through(&self, start: NodeIndex) -> String {
        let render = |path: &[NodeIndex]| {
            path.iter()
                .map(|&n| self.graph[n].as_str())
                .collect::<Vec<_>>()
                .join(" -> ")
        };

        let mut came_from: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut queue = VecDeque::from([start]);
        while let Some(node) = queue.pop_front() {
            for next in self.graph.neighbors(node) {
                if next == start {
                    let mut back = Vec::new();
                    let mut cursor = node;
                    while cursor != start {
                        back.push(cursor);
                        match came_from.get(&cursor) {
                            Some(&prev) => cursor = prev,
                            None => break,
                        }
                    }
                    let mut path = vec![start];
                    path.extend(back.into_iter().rev());
                    path.push(start);
                    return render(&path);
                }
                if !came_from.contains_key(&next) {
                    came_from.insert(next, node);
                    queue.push_back(next);
                }
            }
        }
        render(&[start])
    }

    pub fn dependencies(&self, name: &str) -> Vec<AssetName> {
        self.adjacent(name, Direction::Incoming)
    }

    pub fn dependents(&self, name: &str) -> Vec<AssetName> {
        self.adjacent(name, Direction::Outgoing)
    }

    /// Every asset `name` reads from, directly or not
    pub fn ancestors(&self, name: &str) -> Vec<AssetName> {
        let Some(&start) = self.index.get(name) else {
            return Vec::new();
        };
        let reversed = Reversed(&self.graph);
        let mut bfs = Bfs::new(reversed, start);
        let mut found = Vec::new();
        while let Some(node) = bfs.next(reversed) {
            if node != start {
                found.push(self.graph[node].clone());
            }
        }
        found
    }

    /// Every asset that reads from `name`, directly or not
    pub fn descendants(&self, name: &str) -> Vec<AssetName> {
        let Some(&start) = self.index.get(name) else {
            return Vec::new();
        };
        let mut bfs = Bfs::new(&self.graph, start);
        let mut found = Vec::new();
        while let Some(node) = bfs.next(&self.graph) {
            if node != start {
                found.push(self.graph[node].clone());
            }
        }
        found
    }

    fn adjacent(&self, name: &str, direction: Direction) -> Vec<AssetName> {
        self.index
            .get(name)
            .map(|&idx| {
                self.graph
                    .neighbors_directed(idx, direction)
                    .map(|n| self.graph[n].clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

#[cfg(test)]
#[path = "dag_test.rs"]
mod tests;
