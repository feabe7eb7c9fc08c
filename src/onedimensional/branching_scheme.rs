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

use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

use super::instance::Instance;
use super::solution::Solution;
use crate::common::*;
use crate::tree_search;

/// Candidate placement extending a parent node by one item.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Insertion {
    pub item_type_id: ItemTypeId,
    /// 'true' iff the item opens a new bin.
    pub new_bin: bool,
}

/// Immutable snapshot of a partial packing.
#[derive(Debug)]
pub struct Node {
    pub id: NodeId,
    pub parent: Option<Rc<Node>>,
    pub item_type_id: Option<ItemTypeId>,
    pub item_number_of_copies: Vec<ItemPos>,
    pub number_of_bins: BinPos,
    pub number_of_items: ItemPos,
    pub item_length: Volume,
    pub squared_item_length: Volume,
    pub current_length: Volume,
    pub waste: Volume,
    pub profit: Profit,
    pub cost: Profit,
    pub last_bin_length: Length,
    pub last_bin_weight: Weight,
    pub last_bin_number_of_items: ItemPos,
    pub last_bin_maximum_number_of_items: ItemPos,
    /// Tightest remaining weight allowed behind the items of the last bin;
    /// starts unconstrained, the first insertion always overwrites it.
    pub last_bin_remaining_weight: Weight,
}

#[derive(Copy, Clone, Debug, Default)]
pub struct Parameters {
    pub guide_id: GuideId,
}

/// Branching scheme packing items end to end into a sequence of bins.
pub struct BranchingScheme {
    instance: Arc<Instance>,
    parameters: Parameters,
    node_id: Cell<NodeId>,
}

impl BranchingScheme {
    pub fn new(instance: Arc<Instance>, parameters: Parameters) -> Result<Self> {
        match instance.objective() {
            Objective::Default
            | Objective::BinPacking
            | Objective::BinPackingWithLeftovers
            | Objective::Knapsack
            | Objective::VariableSizedBinPacking => {}
            objective => {
                return Err(Error::ObjectiveUnsupported(
                    objective,
                    "onedimensional::BranchingScheme",
                ));
            }
        }
        Ok(BranchingScheme {
            instance,
            parameters,
            node_id: Cell::new(0),
        })
    }

    pub fn instance(&self) -> &Arc<Instance> {
        &self.instance
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    fn next_node_id(&self) -> NodeId {
        let id = self.node_id.get();
        self.node_id.set(id + 1);
        id
    }

    fn mean_item_length(&self, node: &Node) -> f64 {
        node.item_length as f64 / node.number_of_items as f64
    }

    fn mean_squared_item_length(&self, node: &Node) -> f64 {
        node.squared_item_length as f64 / node.number_of_items as f64
    }

    fn waste_percentage(&self, node: &Node) -> f64 {
        node.waste as f64 / node.current_length as f64
    }

    /// Cheap admissible knapsack bound.
    fn ubkp(&self, node: &Node) -> Profit {
        let remaining_item_length = self.instance.item_length() - node.item_length;
        let remaining_length = self.instance.bin_length() - node.current_length;
        if remaining_length >= remaining_item_length {
            return self.instance.item_profit();
        }
        match self.instance.max_efficiency_item_type_id() {
            Some(item_type_id) => {
                let item_type = self.instance.item_type(item_type_id);
                node.profit
                    + remaining_length as Profit * item_type.profit / item_type.length as Profit
            }
            None => node.profit,
        }
    }

    /// Least number of bins able to hold `length`, used as a bin packing
    /// certificate and bound.
    fn bin_packing_lower_bound(&self, length: Volume) -> BinPos {
        let mut remaining = length;
        let mut bin_pos = 0;
        while remaining > 0 {
            if bin_pos >= self.instance.number_of_bins() {
                return bin_pos + 1;
            }
            let bin_type_id = self.instance.bin_type_id(bin_pos);
            remaining -= self.instance.bin_type(bin_type_id).length;
            bin_pos += 1;
        }
        bin_pos
    }

    fn insertion_item_same_bin(
        &self,
        parent: &Node,
        insertions: &mut Vec<Insertion>,
        item_type_id: ItemTypeId,
    ) {
        let item_type = self.instance.item_type(item_type_id);
        let bin_type_id = self.instance.bin_type_id(parent.number_of_bins - 1);
        let bin_type = self.instance.bin_type(bin_type_id);

        // Bin length.
        if parent.last_bin_length + item_type.length - item_type.nesting_length > bin_type.length {
            return;
        }
        // Maximum weight.
        if parent.last_bin_weight + item_type.weight > bin_type.maximum_weight * PSTOL {
            return;
        }
        // Maximum stackability.
        let maximum_number_of_items = parent
            .last_bin_maximum_number_of_items
            .min(item_type.maximum_stackability);
        if parent.last_bin_number_of_items + 1 > maximum_number_of_items {
            return;
        }
        // Maximum weight above.
        if item_type.weight > parent.last_bin_remaining_weight * PSTOL {
            return;
        }

        insertions.push(Insertion {
            item_type_id,
            new_bin: false,
        });
    }

    fn insertion_item_new_bin(
        &self,
        parent: &Node,
        insertions: &mut Vec<Insertion>,
        item_type_id: ItemTypeId,
    ) {
        let item_type = self.instance.item_type(item_type_id);
        let bin_type_id = self.instance.bin_type_id(parent.number_of_bins);
        let bin_type = self.instance.bin_type(bin_type_id);

        if item_type.length > bin_type.length {
            return;
        }
        if item_type.weight > bin_type.maximum_weight * PSTOL {
            return;
        }

        insertions.push(Insertion {
            item_type_id,
            new_bin: true,
        });
    }
}

impl tree_search::BranchingScheme for BranchingScheme {
    type Node = Node;
    type Insertion = Insertion;
    type Solution = Solution;

    fn root(&self) -> Rc<Node> {
        Rc::new(Node {
            id: self.next_node_id(),
            parent: None,
            item_type_id: None,
            item_number_of_copies: vec![0; self.instance.number_of_item_types()],
            number_of_bins: 0,
            number_of_items: 0,
            item_length: 0,
            squared_item_length: 0,
            current_length: 0,
            waste: 0,
            profit: 0.0,
            cost: 0.0,
            last_bin_length: 0,
            last_bin_weight: 0.0,
            last_bin_number_of_items: 0,
            last_bin_maximum_number_of_items: ItemPos::MAX,
            last_bin_remaining_weight: f64::INFINITY,
        })
    }

    fn insertions(&self, parent: &Rc<Node>) -> Vec<Insertion> {
        if self.leaf(parent) {
            return Vec::new();
        }
        let mut insertions = Vec::new();

        // Insert an item in the current bin.
        if parent.number_of_bins > 0 {
            let bin_type_id = self.instance.bin_type_id(parent.number_of_bins - 1);
            for &item_type_id in &self.instance.bin_type(bin_type_id).item_type_ids {
                let item_type = self.instance.item_type(item_type_id);
                if parent.item_number_of_copies[item_type_id] == item_type.copies {
                    continue;
                }
                self.insertion_item_same_bin(parent, &mut insertions, item_type_id);
            }
        }

        // Open a new bin only when the current one accepts nothing more;
        // this prunes symmetric subtrees.
        if insertions.is_empty() && parent.number_of_bins < self.instance.number_of_bins() {
            let bin_type_id = self.instance.bin_type_id(parent.number_of_bins);
            for &item_type_id in &self.instance.bin_type(bin_type_id).item_type_ids {
                let item_type = self.instance.item_type(item_type_id);
                if parent.item_number_of_copies[item_type_id] == item_type.copies {
                    continue;
                }
                self.insertion_item_new_bin(parent, &mut insertions, item_type_id);
            }
        }

        insertions
    }

    fn child(&self, parent: &Rc<Node>, insertion: &Insertion) -> Rc<Node> {
        let item_type = self.instance.item_type(insertion.item_type_id);

        let (
            number_of_bins,
            last_bin_length,
            last_bin_weight,
            last_bin_number_of_items,
            last_bin_maximum_number_of_items,
            last_bin_remaining_weight,
            cost,
        ) = if insertion.new_bin {
            let bin_type_id = self.instance.bin_type_id(parent.number_of_bins);
            let bin_type = self.instance.bin_type(bin_type_id);
            (
                parent.number_of_bins + 1,
                item_type.length,
                item_type.weight,
                1,
                item_type.maximum_stackability,
                item_type.maximum_weight_after,
                parent.cost + bin_type.cost,
            )
        } else {
            (
                parent.number_of_bins,
                parent.last_bin_length + item_type.length - item_type.nesting_length,
                parent.last_bin_weight + item_type.weight,
                parent.last_bin_number_of_items + 1,
                parent
                    .last_bin_maximum_number_of_items
                    .min(item_type.maximum_stackability),
                (parent.last_bin_remaining_weight - item_type.weight)
                    .min(item_type.maximum_weight_after),
                parent.cost,
            )
        };

        let mut item_number_of_copies = parent.item_number_of_copies.clone();
        item_number_of_copies[insertion.item_type_id] += 1;
        let item_length = parent.item_length + item_type.length;
        let current_length =
            self.instance.previous_bins_length(number_of_bins - 1) + last_bin_length;

        Rc::new(Node {
            id: self.next_node_id(),
            parent: Some(parent.clone()),
            item_type_id: Some(insertion.item_type_id),
            item_number_of_copies,
            number_of_bins,
            number_of_items: parent.number_of_items + 1,
            item_length,
            squared_item_length: parent.squared_item_length
                + item_type.length * item_type.length,
            current_length,
            waste: current_length - item_length,
            profit: parent.profit + item_type.profit,
            cost,
            last_bin_length,
            last_bin_weight,
            last_bin_number_of_items,
            last_bin_maximum_number_of_items,
            last_bin_remaining_weight,
        })
    }

    fn leaf(&self, node: &Node) -> bool {
        node.number_of_items == self.instance.number_of_items()
    }

    fn better(&self, node: &Node, incumbent: Option<&Node>) -> bool {
        match self.instance.objective() {
            Objective::Default => match incumbent {
                Some(incumbent) => {
                    if node.profit != incumbent.profit {
                        node.profit > incumbent.profit
                    } else {
                        node.waste < incumbent.waste
                    }
                }
                None => node.profit > 0.0,
            },
            Objective::BinPacking => {
                self.leaf(node)
                    && incumbent.map_or(true, |incumbent| {
                        !self.leaf(incumbent) || node.number_of_bins < incumbent.number_of_bins
                    })
            }
            Objective::BinPackingWithLeftovers => {
                self.leaf(node)
                    && incumbent.map_or(true, |incumbent| {
                        !self.leaf(incumbent) || node.waste < incumbent.waste
                    })
            }
            Objective::Knapsack => match incumbent {
                Some(incumbent) => node.profit > incumbent.profit,
                None => node.profit > 0.0,
            },
            Objective::VariableSizedBinPacking => {
                self.leaf(node)
                    && incumbent.map_or(true, |incumbent| {
                        !self.leaf(incumbent)
                            || strictly_lesser(node.cost, incumbent.cost)
                    })
            }
            objective => unreachable!("objective '{}' rejected at scheme construction", objective),
        }
    }

    fn bound(&self, node: &Node, incumbent: Option<&Node>) -> bool {
        let incumbent = match incumbent {
            Some(incumbent) => incumbent,
            None => return false,
        };
        match self.instance.objective() {
            Objective::Default => {
                if !self.leaf(incumbent) {
                    self.ubkp(node) <= incumbent.profit
                } else if self.ubkp(node) != incumbent.profit {
                    self.ubkp(node) <= incumbent.profit
                } else {
                    node.waste >= incumbent.waste
                }
            }
            Objective::BinPacking => {
                if !self.leaf(incumbent) {
                    return false;
                }
                let required =
                    self.bin_packing_lower_bound(self.instance.item_length() + node.waste);
                required >= incumbent.number_of_bins
            }
            Objective::BinPackingWithLeftovers => {
                if !self.leaf(incumbent) {
                    return false;
                }
                node.waste >= incumbent.waste
            }
            Objective::Knapsack => false,
            Objective::VariableSizedBinPacking => {
                if !self.leaf(incumbent) {
                    return false;
                }
                !strictly_lesser(node.cost, incumbent.cost)
            }
            objective => unreachable!("objective '{}' rejected at scheme construction", objective),
        }
    }

    fn guide(&self, node: &Node) -> f64 {
        if node.number_of_items == 0 {
            return 0.0;
        }
        match self.parameters.guide_id {
            0 => node.current_length as f64 / node.item_length as f64,
            1 => {
                node.current_length as f64
                    / node.item_length as f64
                    / self.mean_item_length(node)
            }
            2 => (0.1 + self.waste_percentage(node)) / self.mean_item_length(node),
            3 => (0.1 + self.waste_percentage(node)) / self.mean_squared_item_length(node),
            4 => node.current_length as f64 / node.profit,
            5 => node.current_length as f64 / node.profit / self.mean_item_length(node),
            6 => node.waste as f64,
            _ => -self.ubkp(node),
        }
    }

    fn node_id(&self, node: &Node) -> NodeId {
        node.id
    }

    fn dominance_key(&self, node: &Node) -> Vec<ItemPos> {
        node.item_number_of_copies.clone()
    }

    fn dominates(&self, a: &Node, b: &Node) -> bool {
        a.item_type_id == b.item_type_id && a.current_length <= b.current_length
    }

    fn to_solution(&self, node: &Rc<Node>) -> Solution {
        let mut descendents: Vec<Rc<Node>> = Vec::new();
        let mut current = node.clone();
        while current.parent.is_some() {
            descendents.push(current.clone());
            let parent = current.parent.clone().unwrap();
            current = parent;
        }
        descendents.reverse();

        let mut solution = Solution::new(self.instance.clone());
        let mut bin_pos = 0;
        for current in descendents {
            if current.number_of_bins as ItemPos > solution.number_of_bins() {
                let bin_type_id = self.instance.bin_type_id(current.number_of_bins - 1);
                bin_pos = solution
                    .add_bin(bin_type_id, 1)
                    .expect("replay opened an invalid bin");
            }
            solution
                .add_item(bin_pos, current.item_type_id.unwrap())
                .expect("replay placed an invalid item");
        }
        solution
    }

    fn optimal(&self, incumbent: &Node) -> bool {
        match self.instance.objective() {
            Objective::Knapsack => incumbent.profit >= self.instance.item_profit(),
            Objective::BinPacking => {
                self.leaf(incumbent)
                    && incumbent.number_of_bins
                        == self.bin_packing_lower_bound(self.instance.item_length())
            }
            Objective::BinPackingWithLeftovers => self.leaf(incumbent) && incumbent.waste == 0,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::onedimensional::InstanceBuilder;
    use crate::tree_search::BranchingScheme as _;

    fn scheme(instance: Instance) -> BranchingScheme {
        BranchingScheme::new(Arc::new(instance), Parameters::default()).unwrap()
    }

    #[test]
    fn two_items_force_two_bins() {
        let mut builder = InstanceBuilder::new();
        builder.set_objective(Objective::BinPacking);
        builder.add_bin_type(10, -1.0, 2, 0).unwrap();
        builder.add_item_type(7, -1.0, 1).unwrap();
        builder.add_item_type(4, -1.0, 1).unwrap();
        let scheme = scheme(builder.build().unwrap());

        let root = scheme.root();
        let insertions = scheme.insertions(&root);
        assert_eq!(
            insertions,
            vec![
                Insertion { item_type_id: 0, new_bin: true },
                Insertion { item_type_id: 1, new_bin: true },
            ]
        );

        let child = scheme.child(&root, &insertions[0]);
        // 7 + 4 > 10: no same-bin insertion, only a new bin.
        let insertions = scheme.insertions(&child);
        assert_eq!(
            insertions,
            vec![Insertion { item_type_id: 1, new_bin: true }]
        );

        let leaf = scheme.child(&child, &insertions[0]);
        assert!(scheme.leaf(&leaf));
        assert_eq!(leaf.number_of_bins, 2);
        assert_eq!(leaf.current_length, 14);
        assert_eq!(leaf.waste, 3);
        assert!(scheme.optimal(&leaf));

        let solution = scheme.to_solution(&leaf);
        assert!(solution.full());
        assert!(solution.feasible());
        assert_eq!(solution.number_of_bins(), 2);
        assert_eq!(solution.full_waste(), 9);
    }

    #[test]
    fn same_bin_insertions_inhibit_new_bins() {
        let mut builder = InstanceBuilder::new();
        builder.set_objective(Objective::BinPacking);
        builder.add_bin_type(10, -1.0, 2, 0).unwrap();
        builder.add_item_type(4, -1.0, 2).unwrap();
        let scheme = scheme(builder.build().unwrap());

        let root = scheme.root();
        let child = scheme.child(&root, &Insertion { item_type_id: 0, new_bin: true });
        let insertions = scheme.insertions(&child);
        assert_eq!(
            insertions,
            vec![Insertion { item_type_id: 0, new_bin: false }]
        );
    }

    #[test]
    fn maximum_weight_rejects_same_bin_insertions() {
        let mut builder = InstanceBuilder::new();
        builder.set_objective(Objective::BinPacking);
        builder.add_bin_type(10, -1.0, 2, 0).unwrap();
        builder.set_bin_type_maximum_weight(0, 5.0);
        builder.add_item_type(2, -1.0, 2).unwrap();
        builder.set_item_type_weight(0, 3.0);
        let scheme = scheme(builder.build().unwrap());

        let root = scheme.root();
        let child = scheme.child(&root, &Insertion { item_type_id: 0, new_bin: true });
        // 3 + 3 > 5: the second item must open a new bin.
        let insertions = scheme.insertions(&child);
        assert_eq!(
            insertions,
            vec![Insertion { item_type_id: 0, new_bin: true }]
        );
    }

    #[test]
    fn maximum_stackability_caps_bin_count() {
        let mut builder = InstanceBuilder::new();
        builder.set_objective(Objective::BinPacking);
        builder.add_bin_type(10, -1.0, 3, 0).unwrap();
        builder.add_item_type(2, -1.0, 3).unwrap();
        builder.set_item_type_maximum_stackability(0, 2);
        let scheme = scheme(builder.build().unwrap());

        let root = scheme.root();
        let one = scheme.child(&root, &Insertion { item_type_id: 0, new_bin: true });
        let two = scheme.child(&one, &Insertion { item_type_id: 0, new_bin: false });
        let insertions = scheme.insertions(&two);
        assert_eq!(
            insertions,
            vec![Insertion { item_type_id: 0, new_bin: true }]
        );
    }

    #[test]
    fn dominance_compares_length_for_same_last_item() {
        let mut builder = InstanceBuilder::new();
        builder.set_objective(Objective::BinPacking);
        builder.add_bin_type(10, -1.0, 2, 0).unwrap();
        builder.add_item_type(4, -1.0, 1).unwrap();
        builder.add_item_type(3, -1.0, 1).unwrap();
        builder.set_item_type_nesting_length(1, 1);
        let scheme = scheme(builder.build().unwrap());

        let root = scheme.root();
        // 0 then 1 nests: length 4 + 3 - 1 = 6.
        let a = scheme.child(&root, &Insertion { item_type_id: 0, new_bin: true });
        let a = scheme.child(&a, &Insertion { item_type_id: 1, new_bin: false });
        // 1 then 0 does not nest: length 3 + 4 = 7.
        let b = scheme.child(&root, &Insertion { item_type_id: 1, new_bin: true });
        let b = scheme.child(&b, &Insertion { item_type_id: 0, new_bin: false });
        assert_eq!(a.current_length, 6);
        assert_eq!(b.current_length, 7);
        // Different last item: not comparable either way.
        assert!(!scheme.dominates(&a, &b));
        assert!(!scheme.dominates(&b, &a));
    }
}
