/*
 * Copyright 2019 Zejun Li
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

use crate::common::{ItemPos, NodeId};
use crate::format::{AlgorithmFormatter, ProgressDisplay};
use crate::pool::PoolSolution;

/// Contract between a problem family and the tree search driver.
///
/// A node is an immutable snapshot of a partial packing; its parent chain
/// reconstructs the solution. Children are obtained by applying one
/// insertion to a parent.
pub trait BranchingScheme {
    type Node;
    type Insertion: PartialEq;
    type Solution: PoolSolution + ProgressDisplay;

    fn root(&self) -> Rc<Self::Node>;

    /// Ordered list of the legal children of `parent`. May be empty.
    fn insertions(&self, parent: &Rc<Self::Node>) -> Vec<Self::Insertion>;

    fn child(&self, parent: &Rc<Self::Node>, insertion: &Self::Insertion) -> Rc<Self::Node>;

    /// 'true' iff the node packs the instance's whole demand.
    fn leaf(&self, node: &Self::Node) -> bool;

    /// 'true' iff `node` is a terminal candidate strictly better than the
    /// incumbent (`None` = no terminal found yet).
    fn better(&self, node: &Self::Node, incumbent: Option<&Self::Node>) -> bool;

    /// 'true' iff no descendant of `node` can beat the incumbent.
    fn bound(&self, node: &Self::Node, incumbent: Option<&Self::Node>) -> bool;

    /// Guide value ordering the best-first queue; smaller is explored first.
    fn guide(&self, node: &Self::Node) -> f64;

    /// Creation index of the node; ties in the guide break FIFO on it.
    fn node_id(&self, node: &Self::Node) -> NodeId;

    /// Item-copy multiset; only nodes with equal keys are compared for
    /// dominance.
    fn dominance_key(&self, node: &Self::Node) -> Vec<ItemPos>;

    /// Structural dominance inside an equivalence class: every completion
    /// of `b` is matched by a completion of `a` at least as good.
    fn dominates(&self, a: &Self::Node, b: &Self::Node) -> bool;

    fn to_solution(&self, node: &Rc<Self::Node>) -> Self::Solution;

    /// Optimality certificate; 'true' ends the search early.
    fn optimal(&self, _incumbent: &Self::Node) -> bool {
        false
    }
}

pub struct TreeSearchParameters {
    /// Worst queue entries are dropped beyond this size.
    pub maximum_size_of_the_queue: Option<usize>,
}

impl Default for TreeSearchParameters {
    fn default() -> Self {
        TreeSearchParameters {
            maximum_size_of_the_queue: None,
        }
    }
}

pub struct TreeSearchStats {
    pub number_of_nodes: u64,
    /// 'false' when the run was cut short by the timer or a certificate.
    pub queue_exhausted: bool,
}

struct QueueEntry<N> {
    guide: f64,
    id: NodeId,
    node: Rc<N>,
}

impl<N> PartialEq for QueueEntry<N> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<N> Eq for QueueEntry<N> {}

impl<N> PartialOrd for QueueEntry<N> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<N> Ord for QueueEntry<N> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.guide
            .total_cmp(&other.guide)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Best-first search over one branching scheme.
///
/// The queue and the dominance table are local to the caller's worker; the
/// shared pool is reached through the formatter only.
pub fn tree_search<B: BranchingScheme>(
    scheme: &B,
    formatter: &AlgorithmFormatter<B::Solution>,
    parameters: &TreeSearchParameters,
    comment: &str,
) -> TreeSearchStats {
    let mut queue: BTreeSet<QueueEntry<B::Node>> = BTreeSet::new();
    let mut history: HashMap<Vec<ItemPos>, Vec<Rc<B::Node>>> = HashMap::new();
    let mut incumbent: Option<Rc<B::Node>> = None;
    let mut number_of_nodes = 0;
    let mut queue_exhausted = true;

    let root = scheme.root();
    queue.insert(QueueEntry {
        guide: scheme.guide(&root),
        id: scheme.node_id(&root),
        node: root,
    });

    'search: while let Some(entry) = pop_best(&mut queue) {
        if formatter.timer().needs_to_end() {
            queue_exhausted = false;
            break;
        }
        let parent = entry.node;
        if scheme.bound(&parent, incumbent.as_deref()) {
            continue;
        }
        for insertion in scheme.insertions(&parent) {
            let child = scheme.child(&parent, &insertion);
            number_of_nodes += 1;

            if scheme.better(&child, incumbent.as_deref()) {
                incumbent = Some(child.clone());
                formatter.update_solution(scheme.to_solution(&child), comment);
                if scheme.optimal(&child) {
                    queue_exhausted = false;
                    break 'search;
                }
            }
            if scheme.leaf(&child) {
                continue;
            }
            if scheme.bound(&child, incumbent.as_deref()) {
                continue;
            }

            let bucket = history.entry(scheme.dominance_key(&child)).or_default();
            if bucket.iter().any(|n| scheme.dominates(n, &child)) {
                continue;
            }
            bucket.retain(|n| !scheme.dominates(&child, n));
            bucket.push(child.clone());

            queue.insert(QueueEntry {
                guide: scheme.guide(&child),
                id: scheme.node_id(&child),
                node: child,
            });
            if let Some(size_max) = parameters.maximum_size_of_the_queue {
                while queue.len() > size_max {
                    pop_worst(&mut queue);
                }
            }
        }
    }

    formatter.add_nodes(number_of_nodes);
    tracing::debug!(comment, number_of_nodes, queue_exhausted, "tree search done");
    TreeSearchStats {
        number_of_nodes,
        queue_exhausted,
    }
}

fn pop_best<N>(queue: &mut BTreeSet<QueueEntry<N>>) -> Option<QueueEntry<N>> {
    let best = queue.iter().next()?;
    let key = QueueEntry {
        guide: best.guide,
        id: best.id,
        node: best.node.clone(),
    };
    queue.take(&key)
}

fn pop_worst<N>(queue: &mut BTreeSet<QueueEntry<N>>) {
    if let Some(worst) = queue.iter().next_back() {
        let key = QueueEntry {
            guide: worst.guide,
            id: worst.id,
            node: worst.node.clone(),
        };
        queue.take(&key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::Parameters;
    use crate::pool::PoolSolution;
    use serde_json::json;
    use std::cell::Cell;

    /// Toy subset-sum scheme: items with values, one bin of capacity `cap`,
    /// maximize the packed value.
    struct SubsetScheme {
        values: Vec<i64>,
        cap: i64,
        node_id: Cell<NodeId>,
    }

    struct SubsetNode {
        id: NodeId,
        parent: Option<Rc<SubsetNode>>,
        copies: Vec<ItemPos>,
        total: i64,
        next: usize,
    }

    #[derive(Clone)]
    struct SubsetSolution {
        total: i64,
        copies: Vec<ItemPos>,
    }

    impl PoolSolution for SubsetSolution {
        fn strictly_better(&self, other: &Self) -> bool {
            self.total > other.total
        }

        fn item_copies(&self) -> &[ItemPos] {
            &self.copies
        }
    }

    impl ProgressDisplay for SubsetSolution {
        fn progress_line(&self) -> String {
            format!("total {}", self.total)
        }

        fn to_json(&self) -> serde_json::Value {
            json!({ "Total": self.total })
        }
    }

    impl BranchingScheme for SubsetScheme {
        type Node = SubsetNode;
        type Insertion = usize;
        type Solution = SubsetSolution;

        fn root(&self) -> Rc<SubsetNode> {
            let id = self.node_id.get();
            self.node_id.set(id + 1);
            Rc::new(SubsetNode {
                id,
                parent: None,
                copies: vec![0; self.values.len()],
                total: 0,
                next: 0,
            })
        }

        fn insertions(&self, parent: &Rc<SubsetNode>) -> Vec<usize> {
            (parent.next..self.values.len())
                .filter(|&i| parent.total + self.values[i] <= self.cap)
                .collect()
        }

        fn child(&self, parent: &Rc<SubsetNode>, insertion: &usize) -> Rc<SubsetNode> {
            let id = self.node_id.get();
            self.node_id.set(id + 1);
            let mut copies = parent.copies.clone();
            copies[*insertion] += 1;
            Rc::new(SubsetNode {
                id,
                parent: Some(parent.clone()),
                copies,
                total: parent.total + self.values[*insertion],
                next: insertion + 1,
            })
        }

        fn leaf(&self, _node: &SubsetNode) -> bool {
            false
        }

        fn better(&self, node: &SubsetNode, incumbent: Option<&SubsetNode>) -> bool {
            match incumbent {
                Some(incumbent) => node.total > incumbent.total,
                None => true,
            }
        }

        fn bound(&self, _node: &SubsetNode, incumbent: Option<&SubsetNode>) -> bool {
            incumbent.map_or(false, |incumbent| incumbent.total == self.cap)
        }

        fn guide(&self, node: &SubsetNode) -> f64 {
            -(node.total as f64)
        }

        fn node_id(&self, node: &SubsetNode) -> NodeId {
            node.id
        }

        fn dominance_key(&self, node: &SubsetNode) -> Vec<ItemPos> {
            node.copies.clone()
        }

        fn dominates(&self, _a: &SubsetNode, _b: &SubsetNode) -> bool {
            false
        }

        fn to_solution(&self, node: &Rc<SubsetNode>) -> SubsetSolution {
            // Replay the parent chain; checks the chain stays alive.
            let mut total = 0;
            let mut current = Some(node.clone());
            while let Some(n) = current {
                if n.parent.is_some() {
                    total += self.values[n.next - 1];
                }
                current = n.parent.clone();
            }
            assert_eq!(total, node.total);
            SubsetSolution {
                total: node.total,
                copies: node.copies.clone(),
            }
        }
    }

    #[test]
    fn finds_best_subset() {
        let scheme = SubsetScheme {
            values: vec![7, 5, 4, 3],
            cap: 10,
            node_id: Cell::new(0),
        };
        let mut parameters: Parameters<SubsetSolution> = Parameters {
            verbosity_level: 0,
            ..Parameters::default()
        };
        let empty = SubsetSolution {
            total: 0,
            copies: vec![0; 4],
        };
        let formatter = AlgorithmFormatter::new(&mut parameters, empty);
        let stats = tree_search(
            &scheme,
            &formatter,
            &TreeSearchParameters::default(),
            "toy",
        );
        assert!(stats.number_of_nodes > 0);
        let output = formatter.into_output();
        assert_eq!(output.solution_pool.best().total, 10);
    }

    #[test]
    fn queue_cap_is_honored() {
        let scheme = SubsetScheme {
            values: vec![1, 2, 3, 4, 5, 6],
            cap: 21,
            node_id: Cell::new(0),
        };
        let mut parameters: Parameters<SubsetSolution> = Parameters {
            verbosity_level: 0,
            ..Parameters::default()
        };
        let empty = SubsetSolution {
            total: 0,
            copies: vec![0; 6],
        };
        let formatter = AlgorithmFormatter::new(&mut parameters, empty);
        let search_parameters = TreeSearchParameters {
            maximum_size_of_the_queue: Some(4),
        };
        tree_search(&scheme, &formatter, &search_parameters, "toy");
        // A tight queue still yields a feasible (possibly suboptimal) best.
        let output = formatter.into_output();
        assert!(output.solution_pool.best().total >= 6);
    }
}
