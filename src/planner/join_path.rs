//! Join path resolution.
//!
//! The catalog's join edges form an undirected graph over tables. Starting
//! from the base table (the metric's table), a breadth-first search reaches
//! every other required table; the union of the BFS tree paths to those
//! tables is the join plan.
//!
//! Determinism: the incident edges of each table are explored in catalog
//! registration order, so among equally short paths the one declared first
//! wins and identical catalogs always yield identical plans.

use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::graph::{EdgeIndex, NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use serde::Serialize;
use tracing::debug;

use super::{PlanError, PlanResult};
use crate::catalog::{Catalog, JoinEdge, TableRef};
use crate::intent::QueryIntent;

/// One join in a plan: the catalog edge and the table it brings in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinStep {
    pub edge: JoinEdge,
    /// The endpoint of `edge` not yet present when the step is applied.
    pub joined: TableRef,
}

/// Ordered joins connecting every required table to the base table.
///
/// Every step joins a table whose partner is either the base table or a
/// table joined by an earlier step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct JoinPlan {
    pub steps: Vec<JoinStep>,
}

impl JoinPlan {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// The join edges in plan order.
    pub fn edges(&self) -> impl Iterator<Item = &JoinEdge> {
        self.steps.iter().map(|s| &s.edge)
    }

    /// The tables joined onto the base, in plan order.
    pub fn joined_tables(&self) -> impl Iterator<Item = &TableRef> {
        self.steps.iter().map(|s| &s.joined)
    }
}

/// Parent information for path reconstruction.
struct ParentInfo {
    parent: NodeIndex,
    edge_idx: EdgeIndex,
}

/// Distinct tables an intent touches, metric table first.
///
/// Covers the metric's table, each dimension's table and each filter
/// target's table, in that order. Assumes the intent has been validated.
pub fn required_tables(catalog: &Catalog, intent: &QueryIntent) -> PlanResult<Vec<TableRef>> {
    let metric = catalog.lookup_metric(&intent.metric)?;
    let mut tables = vec![metric.table.clone()];

    let targets = intent
        .dimensions
        .iter()
        .chain(intent.filters.iter().map(|f| &f.target))
        .filter(|name| **name != intent.metric);
    for name in targets {
        let table = &catalog.lookup_dimension(name)?.table;
        if !tables.contains(table) {
            tables.push(table.clone());
        }
    }

    Ok(tables)
}

/// Compute the join plan connecting `required` to `base`.
///
/// Fails with [`PlanError::UnknownTable`] when a required table or a join
/// edge endpoint is not registered, and with [`PlanError::UnresolvableJoin`]
/// naming the first required table that cannot be reached.
pub fn resolve_join_plan(
    catalog: &Catalog,
    base: &TableRef,
    required: &[TableRef],
) -> PlanResult<JoinPlan> {
    for table in std::iter::once(base).chain(required) {
        ensure_registered(catalog, table)?;
    }

    let targets: Vec<&TableRef> = required.iter().filter(|t| *t != base).collect();
    if targets.is_empty() {
        return Ok(JoinPlan::default());
    }

    let (graph, nodes) = build_graph(catalog)?;
    let start = node_for(&nodes, base)?;
    let parents = bfs(&graph, start);

    let edges = catalog.all_join_edges();
    let mut used: HashSet<EdgeIndex> = HashSet::new();
    let mut plan = JoinPlan::default();

    for target in targets {
        let target_idx = node_for(&nodes, target)?;
        if target_idx != start && !parents.contains_key(&target_idx) {
            return Err(PlanError::UnresolvableJoin {
                base: base.clone(),
                unreachable: target.clone(),
            });
        }

        for (edge_idx, joined) in reconstruct_path(start, target_idx, &parents) {
            if used.insert(edge_idx) {
                plan.steps.push(JoinStep {
                    edge: edges[graph[edge_idx]].clone(),
                    joined: graph[joined].clone(),
                });
            }
        }
    }

    debug!(base = %base, joins = plan.len(), "join plan resolved");
    Ok(plan)
}

fn ensure_registered(catalog: &Catalog, table: &TableRef) -> PlanResult<()> {
    catalog
        .lookup_table(table)
        .map(|_| ())
        .map_err(|_| PlanError::UnknownTable {
            table: table.clone(),
        })
}

/// Undirected table graph. Edge weights are registration indices into
/// `Catalog::all_join_edges`.
fn build_graph(
    catalog: &Catalog,
) -> PlanResult<(UnGraph<TableRef, usize>, HashMap<TableRef, NodeIndex>)> {
    let mut graph = UnGraph::new_undirected();
    let mut nodes = HashMap::new();

    for table in catalog.all_tables() {
        let idx = graph.add_node(table.table_ref.clone());
        nodes.insert(table.table_ref.clone(), idx);
    }

    for (i, edge) in catalog.all_join_edges().iter().enumerate() {
        let from = node_for(&nodes, &edge.from)?;
        let to = node_for(&nodes, &edge.to)?;
        graph.add_edge(from, to, i);
    }

    Ok((graph, nodes))
}

fn node_for(nodes: &HashMap<TableRef, NodeIndex>, table: &TableRef) -> PlanResult<NodeIndex> {
    nodes
        .get(table)
        .copied()
        .ok_or_else(|| PlanError::UnknownTable {
            table: table.clone(),
        })
}

/// Breadth-first search from `start`, recording how each node was reached.
fn bfs(graph: &UnGraph<TableRef, usize>, start: NodeIndex) -> HashMap<NodeIndex, ParentInfo> {
    let mut visited: HashSet<NodeIndex> = HashSet::new();
    let mut parents: HashMap<NodeIndex, ParentInfo> = HashMap::new();
    let mut queue: VecDeque<NodeIndex> = VecDeque::new();

    visited.insert(start);
    queue.push_back(start);

    while let Some(current) = queue.pop_front() {
        let mut incident: Vec<_> = graph.edges(current).collect();
        incident.sort_by_key(|edge_ref| *edge_ref.weight());

        for edge_ref in incident {
            let neighbor = if edge_ref.source() == current {
                edge_ref.target()
            } else {
                edge_ref.source()
            };

            if !visited.insert(neighbor) {
                continue;
            }

            parents.insert(
                neighbor,
                ParentInfo {
                    parent: current,
                    edge_idx: edge_ref.id(),
                },
            );
            queue.push_back(neighbor);
        }
    }

    parents
}

/// Edges (with the node each one reaches) from `from_idx` to `to_idx`.
fn reconstruct_path(
    from_idx: NodeIndex,
    to_idx: NodeIndex,
    parents: &HashMap<NodeIndex, ParentInfo>,
) -> Vec<(EdgeIndex, NodeIndex)> {
    let mut path = Vec::new();
    let mut current = to_idx;

    while current != from_idx {
        let Some(info) = parents.get(&current) else {
            break;
        };
        path.push((info.edge_idx, current));
        current = info.parent;
    }

    path.reverse();
    path
}
