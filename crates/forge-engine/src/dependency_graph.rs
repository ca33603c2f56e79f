//! Ready/blocked classification and graph traversal over dependency edges
//! (spec.md §4.2, §4.4's topological tree completion).
//!
//! Mirrors the teacher's `bd ready`/`bd graph` query style: build an
//! adjacency view on demand from repository rows rather than caching edges
//! on `WorkItem` (spec.md §9: "do not embed child lists in `WorkItem`
//! rows").

use std::collections::{HashMap, HashSet, VecDeque};

use forge_core::dependency::Dependency;
use forge_core::enums::{DependencyType, Role};

/// One unsatisfied gating edge, named as in spec.md §4.3.2: the blocking
/// item's id, its current role, and the role it must reach.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Blocker {
    pub from_item_id: String,
    pub current_role: Role,
    pub required_role: Role,
}

/// Why an item is reported as blocked (spec.md §4.2: "explicitly `BLOCKED`
/// ... `blockType = "explicit"`; otherwise `blockType = "dependency"`").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    Explicit,
    Dependency,
}

#[derive(Debug, Clone)]
pub struct BlockStatus {
    pub blocked: bool,
    pub block_type: Option<BlockType>,
    pub blockers: Vec<Blocker>,
}

/// Collects the unsatisfied gating edges for `item_id` among `deps` (all
/// dependency rows touching `item_id`, both directions), using
/// `role_of` to look up each blocker's current role.
///
/// An edge gates iff it is `BLOCKS(blocker -> item_id)` or
/// `IS_BLOCKED_BY(item_id -> blocker)`; `RELATES_TO` never gates
/// (spec.md §4.2). An edge is unsatisfied iff the blocker has not reached
/// or passed the edge's `effectiveUnblockRole`; a blocker currently
/// `BLOCKED` always counts as unsatisfied (`Role::is_at_or_beyond` returns
/// `false` for it regardless of threshold).
pub fn unsatisfied_blockers(
    item_id: &str,
    deps: &[Dependency],
    role_of: &HashMap<String, Role>,
) -> Vec<Blocker> {
    let mut blockers = Vec::new();

    for dep in deps {
        let blocker_id = if dep.to_item_id == item_id && dep.dep_type == DependencyType::Blocks {
            Some(dep.from_item_id.clone())
        } else if dep.from_item_id == item_id && dep.dep_type == DependencyType::IsBlockedBy {
            Some(dep.to_item_id.clone())
        } else {
            None
        };

        let Some(blocker_id) = blocker_id else {
            continue;
        };

        let Some(threshold) = dep.effective_unblock_role() else {
            continue; // RELATES_TO
        };

        let Some(&blocker_role) = role_of.get(&blocker_id) else {
            continue; // blocker row missing; nothing to gate against
        };

        if !blocker_role.is_at_or_beyond(threshold) {
            blockers.push(Blocker {
                from_item_id: blocker_id,
                current_role: blocker_role,
                required_role: threshold,
            });
        }
    }

    blockers
}

/// Classifies `item_id`'s block status (spec.md §4.2's "Ready / blocked
/// classification").
pub fn classify_block_status(
    item_id: &str,
    item_role: Role,
    deps: &[Dependency],
    role_of: &HashMap<String, Role>,
) -> BlockStatus {
    let blockers = unsatisfied_blockers(item_id, deps, role_of);

    if item_role == Role::Blocked {
        return BlockStatus {
            blocked: true,
            block_type: Some(BlockType::Explicit),
            blockers,
        };
    }

    if !blockers.is_empty() {
        return BlockStatus {
            blocked: true,
            block_type: Some(BlockType::Dependency),
            blockers,
        };
    }

    BlockStatus {
        blocked: false,
        block_type: None,
        blockers: Vec::new(),
    }
}

/// Builds a `BLOCKS`-only adjacency map for cycle/traversal purposes,
/// normalizing `IS_BLOCKED_BY(a -> b)` to a reverse `BLOCKS(b -> a)` edge
/// (spec.md §4.2 step 3). `RELATES_TO` is excluded.
pub fn gating_adjacency(deps: &[Dependency]) -> HashMap<String, Vec<String>> {
    let mut adjacency: HashMap<String, Vec<String>> = HashMap::new();
    for dep in deps {
        match dep.dep_type {
            DependencyType::Blocks => adjacency
                .entry(dep.from_item_id.clone())
                .or_default()
                .push(dep.to_item_id.clone()),
            DependencyType::IsBlockedBy => adjacency
                .entry(dep.to_item_id.clone())
                .or_default()
                .push(dep.from_item_id.clone()),
            DependencyType::RelatesTo => {}
        }
    }
    adjacency
}

/// Kahn's algorithm over the induced subgraph restricted to `nodes`
/// (spec.md §4.4 "Complete tree" step 3). Edges whose endpoints are not
/// both in `nodes` are ignored. Nodes left over after the queue drains
/// (i.e. caught in a residual cycle) are appended at the end in their
/// original relative order, so every node in `nodes` is always present in
/// the result exactly once.
pub fn topological_order(nodes: &[String], deps: &[Dependency]) -> Vec<String> {
    let node_set: HashSet<&str> = nodes.iter().map(String::as_str).collect();
    let adjacency = gating_adjacency(deps);

    let mut in_degree: HashMap<&str, usize> = nodes.iter().map(|n| (n.as_str(), 0)).collect();
    let mut induced: HashMap<&str, Vec<&str>> = HashMap::new();

    for from in nodes {
        let Some(targets) = adjacency.get(from.as_str()) else {
            continue;
        };
        for to in targets {
            if node_set.contains(to.as_str()) {
                induced.entry(from.as_str()).or_default().push(to.as_str());
                *in_degree.entry(to.as_str()).or_insert(0) += 1;
            }
        }
    }

    let mut queue: VecDeque<&str> = nodes
        .iter()
        .map(String::as_str)
        .filter(|n| in_degree.get(n).copied().unwrap_or(0) == 0)
        .collect();

    let mut order = Vec::with_capacity(nodes.len());
    let mut visited: HashSet<&str> = HashSet::new();

    while let Some(node) = queue.pop_front() {
        if !visited.insert(node) {
            continue;
        }
        order.push(node.to_string());

        if let Some(targets) = induced.get(node) {
            for target in targets {
                if let Some(degree) = in_degree.get_mut(target) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(target);
                    }
                }
            }
        }
    }

    // Residual cycle members: append in original order, not yet visited.
    for node in nodes {
        if !visited.contains(node.as_str()) {
            order.push(node.clone());
        }
    }

    order
}
