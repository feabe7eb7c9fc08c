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

use super::instance::{BinType, Defect, Instance};
use super::instance_flipper::InstanceFlipper;
use super::solution::Solution;
use crate::common::*;
use crate::tree_search;

/// One step of the staircase front: the band `[ys, ye)` is covered up to
/// `xe` by the item `item_type_id` (`None` for the bin's left border).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UncoveredItem {
    pub item_type_id: Option<ItemTypeId>,
    pub xs: Length,
    pub xe: Length,
    pub ys: Length,
    pub ye: Length,
}

/// Candidate placement extending a parent node by one item.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Insertion {
    pub item_type_id: ItemTypeId,
    pub rotate: bool,
    /// `-1`: last bin; `1`: new bin packed along x; `2`: new bin packed
    /// along y.
    pub new_bin: i8,
    pub x: Length,
    pub y: Length,
}

/// Item of the last bin, kept only under an unloading constraint.
#[derive(Clone, Debug)]
pub struct LastBinItem {
    pub group_id: GroupId,
    pub xs: Length,
    pub xe: Length,
    pub ys: Length,
    pub ye: Length,
}

/// Immutable snapshot of a partial packing.
#[derive(Debug)]
pub struct Node {
    pub id: NodeId,
    pub parent: Option<Rc<Node>>,
    pub item_type_id: Option<ItemTypeId>,
    pub rotate: bool,
    pub x: Length,
    pub y: Length,
    pub last_bin_direction: Direction,
    pub uncovered_items: Vec<UncoveredItem>,
    pub last_bin_items: Vec<LastBinItem>,
    pub item_number_of_copies: Vec<ItemPos>,
    pub number_of_bins: BinPos,
    pub number_of_items: ItemPos,
    pub item_area: Area,
    pub item_weight: Weight,
    pub current_area: Area,
    pub waste: Area,
    pub guide_area: Area,
    pub xe_max: Length,
    pub ye_max: Length,
    pub xs_max: Length,
    pub profit: Profit,
    pub cost: Profit,
    pub last_bin_weight: Weight,
    /// Sum of weight times item x-center, for the axle lever rule.
    pub last_bin_weight_moment: f64,
}

#[derive(Copy, Clone, Debug)]
pub struct Parameters {
    pub guide_id: GuideId,
    pub direction: Direction,
}

impl Default for Parameters {
    fn default() -> Self {
        Parameters {
            guide_id: 0,
            direction: Direction::X,
        }
    }
}

/// Branching scheme anchoring rectangles on a staircase front.
pub struct BranchingScheme {
    instance: Arc<Instance>,
    flipper: InstanceFlipper,
    parameters: Parameters,
    node_id: Cell<NodeId>,
}

impl BranchingScheme {
    pub fn new(instance: Arc<Instance>, parameters: Parameters) -> Result<Self> {
        let flipper = InstanceFlipper::new(instance.clone())?;
        let scheme = BranchingScheme {
            instance,
            flipper,
            parameters,
            node_id: Cell::new(0),
        };
        match scheme.objective() {
            Objective::Default
            | Objective::BinPacking
            | Objective::BinPackingWithLeftovers
            | Objective::OpenDimensionX
            | Objective::Knapsack
            | Objective::VariableSizedBinPacking => {}
            objective => {
                return Err(Error::ObjectiveUnsupported(
                    objective,
                    "rectangle::BranchingScheme",
                ));
            }
        }
        Ok(scheme)
    }

    pub fn instance(&self) -> &Arc<Instance> {
        &self.instance
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Objective seen by the packing frame: an open dimension y instance
    /// packed in direction y becomes open dimension x.
    fn objective(&self) -> Objective {
        match self.parameters.direction {
            Direction::Y => self.flipper.flipped_instance().objective(),
            _ => self.instance.objective(),
        }
    }

    fn instance_direction(&self, direction: Direction) -> &Arc<Instance> {
        match direction {
            Direction::Y => self.flipper.flipped_instance(),
            _ => &self.instance,
        }
    }

    fn new_bin_direction(new_bin: i8) -> Direction {
        if new_bin == 2 {
            Direction::Y
        } else {
            Direction::X
        }
    }

    fn next_node_id(&self) -> NodeId {
        let id = self.node_id.get();
        self.node_id.set(id + 1);
        id
    }

    fn mean_item_area(&self, node: &Node) -> f64 {
        node.item_area as f64 / node.number_of_items as f64
    }

    /// Cheap admissible knapsack bound.
    fn ubkp(&self, node: &Node) -> Profit {
        let remaining_item_area = self.instance.item_area() - node.item_area;
        let remaining_packable_area = self.instance.bin_area() - node.current_area;
        if remaining_packable_area >= remaining_item_area {
            return self.instance.item_profit();
        }
        match self.instance.max_efficiency_item_type_id() {
            Some(item_type_id) => {
                let item_type = self.instance.item_type(item_type_id);
                node.profit
                    + remaining_packable_area as Profit * item_type.profit
                        / item_type.area() as Profit
            }
            None => node.profit,
        }
    }

    fn bin_packing_lower_bound(&self, area: Area) -> ItemPos {
        let mut remaining = area;
        let mut bin_pos = 0;
        while remaining > 0 {
            if bin_pos >= self.instance.number_of_bins() {
                return bin_pos as ItemPos + 1;
            }
            let bin_type_id = self.instance.bin_type_id(bin_pos);
            remaining -= self.instance.bin_type(bin_type_id).area();
            bin_pos += 1;
        }
        bin_pos as ItemPos
    }

    /// Leftmost feasible x for the band `[ys, ye)`.
    fn x_start(front: &[UncoveredItem], ys: Length, ye: Length) -> Length {
        front
            .iter()
            .filter(|ui| ui.ys < ye && ys < ui.ye)
            .map(|ui| ui.xe)
            .max()
            .unwrap_or(0)
    }

    /// Shift `xs` right until the item clears every defect of the bin.
    fn shift_over_defects(
        bin_type: &BinType,
        mut xs: Length,
        xj: Length,
        ys: Length,
        yj: Length,
    ) -> Length {
        loop {
            let mut moved = false;
            for defect in &bin_type.defects {
                if defect.intersects(xs, xs + xj, ys, ys + yj) {
                    xs = xs.max(defect.xe());
                    moved = true;
                }
            }
            if !moved {
                return xs;
            }
        }
    }

    fn unloading_allowed(
        constraint: UnloadingConstraint,
        last_bin_items: &[LastBinItem],
        group_id: GroupId,
        xs: Length,
        xe: Length,
        ys: Length,
        ye: Length,
    ) -> bool {
        let ordered = |va: Length, ga: GroupId, vb: Length, gb: GroupId| {
            (va > vb || ga <= gb) && (vb > va || gb <= ga)
        };
        last_bin_items.iter().all(|item| match constraint {
            UnloadingConstraint::None => true,
            UnloadingConstraint::IncreasingX => ordered(item.xs, item.group_id, xs, group_id),
            UnloadingConstraint::IncreasingY => ordered(item.ys, item.group_id, ys, group_id),
            UnloadingConstraint::OnlyXMovements => {
                if item.ys < ye && ys < item.ye {
                    ordered(item.xs, item.group_id, xs, group_id)
                } else {
                    true
                }
            }
            UnloadingConstraint::OnlyYMovements => {
                if item.xs < xe && xs < item.xe {
                    ordered(item.ys, item.group_id, ys, group_id)
                } else {
                    true
                }
            }
        })
    }

    /// Try one anchor; `defect` asks for a placement resting on its top
    /// edge instead of on a front corner.
    fn insertion_item(
        &self,
        parent: &Node,
        insertions: &mut Vec<Insertion>,
        item_type_id: ItemTypeId,
        rotate: bool,
        new_bin: i8,
        front: &[UncoveredItem],
        ys: Length,
        defect: Option<&Defect>,
    ) {
        let direction = if new_bin < 0 {
            parent.last_bin_direction
        } else {
            Self::new_bin_direction(new_bin)
        };
        let instance = self.instance_direction(direction);
        let bin_pos = if new_bin < 0 {
            parent.number_of_bins - 1
        } else {
            parent.number_of_bins
        };
        let bin_type = instance.bin_type(instance.bin_type_id(bin_pos));
        let item_type = instance.item_type(item_type_id);
        let xj = item_type.x(rotate);
        let yj = item_type.y(rotate);

        if ys + yj > bin_type.y {
            return;
        }
        let xs = Self::x_start(front, ys, ys + yj);
        let xs = Self::shift_over_defects(bin_type, xs, xj, ys, yj);
        if xs + xj > bin_type.x {
            return;
        }
        // An above-defect anchor only makes sense while the item spans the
        // defect's columns.
        if let Some(defect) = defect {
            if xs >= defect.xe() || defect.x >= xs + xj {
                return;
            }
        }

        // Maximum weight.
        let last_bin_weight = if new_bin < 0 { parent.last_bin_weight } else { 0.0 };
        if last_bin_weight + item_type.weight > bin_type.maximum_weight * PSTOL {
            return;
        }
        // Axle weights.
        if let Some(semi_trailer) = bin_type.semi_trailer {
            let weight = last_bin_weight + item_type.weight;
            let moment = if new_bin < 0 {
                parent.last_bin_weight_moment
            } else {
                0.0
            } + item_type.weight * (xs as f64 + xj as f64 / 2.0);
            if weight > 0.0 && !semi_trailer.satisfied(weight, moment / weight) {
                return;
            }
        }
        // Unloading constraint.
        let last_bin_items: &[LastBinItem] = if new_bin < 0 { &parent.last_bin_items } else { &[] };
        if !Self::unloading_allowed(
            instance.unloading_constraint(),
            last_bin_items,
            item_type.group_id,
            xs,
            xs + xj,
            ys,
            ys + yj,
        ) {
            return;
        }

        let insertion = Insertion {
            item_type_id,
            rotate,
            new_bin,
            x: xs,
            y: ys,
        };
        if !insertions.contains(&insertion) {
            insertions.push(insertion);
        }
    }

    fn insertions_bin(
        &self,
        parent: &Node,
        insertions: &mut Vec<Insertion>,
        new_bin: i8,
        front: &[UncoveredItem],
    ) {
        let direction = if new_bin < 0 {
            parent.last_bin_direction
        } else {
            Self::new_bin_direction(new_bin)
        };
        let instance = self.instance_direction(direction);
        let bin_pos = if new_bin < 0 {
            parent.number_of_bins - 1
        } else {
            parent.number_of_bins
        };
        let bin_type_id = instance.bin_type_id(bin_pos);
        let defects = &instance.bin_type(bin_type_id).defects;

        // Anchors at the front corners.
        for uncovered_item in front {
            for item_type in instance.item_types() {
                if parent.item_number_of_copies[item_type.id] == item_type.copies {
                    continue;
                }
                for &rotate in &[false, true] {
                    if !item_type.can_rotate(rotate) {
                        continue;
                    }
                    if rotate && item_type.x == item_type.y {
                        continue;
                    }
                    self.insertion_item(
                        parent,
                        insertions,
                        item_type.id,
                        rotate,
                        new_bin,
                        front,
                        uncovered_item.ys,
                        None,
                    );
                }
            }
        }
        // Anchors on top of the defects.
        for defect in defects {
            for item_type in instance.item_types() {
                if parent.item_number_of_copies[item_type.id] == item_type.copies {
                    continue;
                }
                for &rotate in &[false, true] {
                    if !item_type.can_rotate(rotate) {
                        continue;
                    }
                    if rotate && item_type.x == item_type.y {
                        continue;
                    }
                    self.insertion_item(
                        parent,
                        insertions,
                        item_type.id,
                        rotate,
                        new_bin,
                        front,
                        defect.ye(),
                        Some(defect),
                    );
                }
            }
        }
    }

    fn empty_front(bin_type: &BinType) -> Vec<UncoveredItem> {
        vec![UncoveredItem {
            item_type_id: None,
            xs: 0,
            xe: 0,
            ys: 0,
            ye: bin_type.y,
        }]
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
            rotate: false,
            x: -1,
            y: -1,
            last_bin_direction: Direction::X,
            uncovered_items: Vec::new(),
            last_bin_items: Vec::new(),
            item_number_of_copies: vec![0; self.instance.number_of_item_types()],
            number_of_bins: 0,
            number_of_items: 0,
            item_area: 0,
            item_weight: 0.0,
            current_area: 0,
            waste: 0,
            guide_area: 0,
            xe_max: 0,
            ye_max: 0,
            xs_max: 0,
            profit: 0.0,
            cost: 0.0,
            last_bin_weight: 0.0,
            last_bin_weight_moment: 0.0,
        })
    }

    fn insertions(&self, parent: &Rc<Node>) -> Vec<Insertion> {
        if self.leaf(parent) {
            return Vec::new();
        }
        let mut insertions = Vec::new();

        if parent.number_of_bins > 0 {
            self.insertions_bin(parent, &mut insertions, -1, &parent.uncovered_items);
        }

        // Same-bin insertions inhibit new-bin branching.
        if insertions.is_empty() && parent.number_of_bins < self.instance.number_of_bins() {
            let new_bins: &[i8] = match self.parameters.direction {
                Direction::X => &[1],
                Direction::Y => &[2],
                _ => &[1, 2],
            };
            for &new_bin in new_bins {
                let instance = self.instance_direction(Self::new_bin_direction(new_bin));
                let bin_type_id = instance.bin_type_id(parent.number_of_bins);
                let front = Self::empty_front(instance.bin_type(bin_type_id));
                self.insertions_bin(parent, &mut insertions, new_bin, &front);
            }
        }

        insertions
    }

    fn child(&self, parent: &Rc<Node>, insertion: &Insertion) -> Rc<Node> {
        let direction = if insertion.new_bin < 0 {
            parent.last_bin_direction
        } else {
            Self::new_bin_direction(insertion.new_bin)
        };
        let instance = self.instance_direction(direction);
        let item_type = instance.item_type(insertion.item_type_id);
        let xj = item_type.x(insertion.rotate);
        let yj = item_type.y(insertion.rotate);
        let xs = insertion.x;
        let ys = insertion.y;
        let xe = xs + xj;
        let ye = ys + yj;

        let new_bin = insertion.new_bin >= 0;
        let number_of_bins = if new_bin {
            parent.number_of_bins + 1
        } else {
            parent.number_of_bins
        };
        let bin_type_id = instance.bin_type_id(number_of_bins - 1);
        let bin_type = instance.bin_type(bin_type_id);

        let front = if new_bin {
            Self::empty_front(bin_type)
        } else {
            parent.uncovered_items.clone()
        };

        // Staircase update: trim the bands covered by the new item and
        // insert its own corner, keeping the list y-sorted.
        let new_uncovered = UncoveredItem {
            item_type_id: Some(insertion.item_type_id),
            xs,
            xe,
            ys,
            ye,
        };
        let mut uncovered_items = Vec::with_capacity(front.len() + 2);
        let mut inserted = false;
        for uncovered_item in &front {
            if uncovered_item.ye <= ys {
                uncovered_items.push(uncovered_item.clone());
                continue;
            }
            if uncovered_item.ys >= ye {
                if !inserted {
                    uncovered_items.push(new_uncovered.clone());
                    inserted = true;
                }
                uncovered_items.push(uncovered_item.clone());
                continue;
            }
            if uncovered_item.ys < ys {
                let mut trimmed = uncovered_item.clone();
                trimmed.ye = ys;
                uncovered_items.push(trimmed);
            }
            if !inserted {
                uncovered_items.push(new_uncovered.clone());
                inserted = true;
            }
            if uncovered_item.ye > ye {
                let mut trimmed = uncovered_item.clone();
                trimmed.ys = ye;
                uncovered_items.push(trimmed);
            }
        }
        debug_assert!(inserted);

        let mut last_bin_items = if new_bin {
            Vec::new()
        } else {
            parent.last_bin_items.clone()
        };
        if instance.unloading_constraint() != UnloadingConstraint::None {
            last_bin_items.push(LastBinItem {
                group_id: item_type.group_id,
                xs,
                xe,
                ys,
                ye,
            });
        }

        let (xe_max, ye_max, xs_max) = if new_bin {
            (xe, ye, xs)
        } else {
            (
                parent.xe_max.max(xe),
                parent.ye_max.max(ye),
                parent.xs_max.max(xs),
            )
        };
        let (last_bin_weight, last_bin_weight_moment) = if new_bin {
            (
                item_type.weight,
                item_type.weight * (xs as f64 + xj as f64 / 2.0),
            )
        } else {
            (
                parent.last_bin_weight + item_type.weight,
                parent.last_bin_weight_moment
                    + item_type.weight * (xs as f64 + xj as f64 / 2.0),
            )
        };

        let mut item_number_of_copies = parent.item_number_of_copies.clone();
        item_number_of_copies[insertion.item_type_id] += 1;
        let item_area = parent.item_area + item_type.area();
        let previous_bins_area = instance.previous_bins_area(number_of_bins - 1);
        let current_area = previous_bins_area + xe_max * ye_max;

        Rc::new(Node {
            id: self.next_node_id(),
            parent: Some(parent.clone()),
            item_type_id: Some(insertion.item_type_id),
            rotate: insertion.rotate,
            x: xs,
            y: ys,
            last_bin_direction: direction,
            uncovered_items,
            last_bin_items,
            item_number_of_copies,
            number_of_bins,
            number_of_items: parent.number_of_items + 1,
            item_area,
            item_weight: parent.item_weight + item_type.weight,
            current_area,
            waste: current_area - item_area,
            guide_area: previous_bins_area + xe_max * bin_type.y,
            xe_max,
            ye_max,
            xs_max,
            profit: parent.profit + item_type.profit,
            cost: if new_bin {
                parent.cost + bin_type.cost
            } else {
                parent.cost
            },
            last_bin_weight,
            last_bin_weight_moment,
        })
    }

    fn leaf(&self, node: &Node) -> bool {
        node.number_of_items == self.instance.number_of_items()
    }

    fn better(&self, node: &Node, incumbent: Option<&Node>) -> bool {
        match self.objective() {
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
            Objective::OpenDimensionX => {
                self.leaf(node)
                    && incumbent.map_or(true, |incumbent| {
                        !self.leaf(incumbent) || node.xe_max < incumbent.xe_max
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
        match self.objective() {
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
                    self.bin_packing_lower_bound(self.instance.item_area() + node.waste);
                required >= incumbent.number_of_bins as ItemPos
            }
            Objective::BinPackingWithLeftovers => {
                if !self.leaf(incumbent) {
                    return false;
                }
                node.waste >= incumbent.waste
            }
            Objective::OpenDimensionX => {
                if !self.leaf(incumbent) {
                    return false;
                }
                node.xe_max >= incumbent.xe_max
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
            0 => node.guide_area as f64 / node.item_area as f64,
            1 => {
                node.guide_area as f64 / node.item_area as f64 / self.mean_item_area(node)
            }
            4 => node.guide_area as f64 / node.profit,
            5 => {
                node.guide_area as f64 / node.profit / node.item_area as f64
                    * node.number_of_items as f64
            }
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
        if a.number_of_bins < b.number_of_bins {
            return true;
        }
        if a.number_of_bins > b.number_of_bins {
            return false;
        }
        if a.last_bin_direction != b.last_bin_direction {
            return false;
        }
        for uncovered_item_a in &a.uncovered_items {
            for uncovered_item_b in &b.uncovered_items {
                if uncovered_item_a.ys >= uncovered_item_b.ye
                    || uncovered_item_a.ye <= uncovered_item_b.ys
                {
                    continue;
                }
                if uncovered_item_a.xe > uncovered_item_b.xe {
                    return false;
                }
            }
        }
        true
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
        let mut number_of_bins = 0;
        for current in descendents {
            if current.number_of_bins > number_of_bins {
                number_of_bins = current.number_of_bins;
                let bin_type_id = self.instance.bin_type_id(current.number_of_bins - 1);
                bin_pos = solution
                    .add_bin(bin_type_id, 1)
                    .expect("replay opened an invalid bin");
            }
            // Direction-y bins live in the flipped frame; swap back.
            let (x, y) = match current.last_bin_direction {
                Direction::Y => (current.y, current.x),
                _ => (current.x, current.y),
            };
            solution
                .add_item(bin_pos, current.item_type_id.unwrap(), x, y, current.rotate)
                .expect("replay placed an invalid item");
        }
        solution
    }

    fn optimal(&self, incumbent: &Node) -> bool {
        match self.objective() {
            Objective::Knapsack => incumbent.profit >= self.instance.item_profit(),
            Objective::BinPacking => {
                self.leaf(incumbent)
                    && incumbent.number_of_bins as ItemPos
                        == self.bin_packing_lower_bound(self.instance.item_area())
            }
            Objective::BinPackingWithLeftovers => self.leaf(incumbent) && incumbent.waste == 0,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rectangle::InstanceBuilder;
    use crate::tree_search::BranchingScheme as _;

    fn scheme(instance: Instance) -> BranchingScheme {
        BranchingScheme::new(Arc::new(instance), Parameters::default()).unwrap()
    }

    fn uncovered(
        item_type_id: Option<ItemTypeId>,
        xs: Length,
        xe: Length,
        ys: Length,
        ye: Length,
    ) -> UncoveredItem {
        UncoveredItem {
            item_type_id,
            xs,
            xe,
            ys,
            ye,
        }
    }

    #[test]
    fn single_oriented_item() {
        let mut builder = InstanceBuilder::new();
        builder.add_bin_type(6000, 3210, -1.0, 1, 0).unwrap();
        builder.add_item_type(1000, 500, -1.0, 1).unwrap();
        builder.set_item_types_oriented();
        let scheme = scheme(builder.build().unwrap());

        let root = scheme.root();
        let insertions = scheme.insertions(&root);
        assert_eq!(
            insertions,
            vec![Insertion {
                item_type_id: 0,
                rotate: false,
                new_bin: 1,
                x: 0,
                y: 0,
            }]
        );

        let child = scheme.child(&root, &insertions[0]);
        assert_eq!(
            child.uncovered_items,
            vec![
                uncovered(Some(0), 0, 1000, 0, 500),
                uncovered(None, 0, 0, 500, 3210),
            ]
        );
    }

    #[test]
    fn staircase_keeps_three_items() {
        let mut builder = InstanceBuilder::new();
        builder.add_bin_type(6000, 3210, -1.0, 1, 0).unwrap();
        builder.add_item_type(1000, 500, -1.0, 1).unwrap();
        builder.add_item_type(1250, 1210, -1.0, 1).unwrap();
        builder.add_item_type(250, 1000, -1.0, 1).unwrap();
        builder.set_item_types_oriented();
        let scheme = scheme(builder.build().unwrap());

        let root = scheme.root();
        let child_1 = scheme.child(
            &root,
            &Insertion {
                item_type_id: 0,
                rotate: false,
                new_bin: 1,
                x: 0,
                y: 0,
            },
        );
        assert_eq!(
            child_1.uncovered_items,
            vec![
                uncovered(Some(0), 0, 1000, 0, 500),
                uncovered(None, 0, 0, 500, 3210),
            ]
        );
        // Anchors: corner (1000, 0) then corner (0, 500), items 1 and 2.
        assert_eq!(
            scheme.insertions(&child_1),
            vec![
                Insertion { item_type_id: 1, rotate: false, new_bin: -1, x: 1000, y: 0 },
                Insertion { item_type_id: 2, rotate: false, new_bin: -1, x: 1000, y: 0 },
                Insertion { item_type_id: 1, rotate: false, new_bin: -1, x: 0, y: 500 },
                Insertion { item_type_id: 2, rotate: false, new_bin: -1, x: 0, y: 500 },
            ]
        );

        let child_2 = scheme.child(
            &child_1,
            &Insertion {
                item_type_id: 2,
                rotate: false,
                new_bin: -1,
                x: 1000,
                y: 0,
            },
        );
        assert_eq!(child_2.current_area, 1000 * 1250);
        assert_eq!(child_2.item_area, 1000 * 500 + 250 * 1000);
        assert_eq!(child_2.waste, 500_000);
        assert_eq!(
            child_2.uncovered_items,
            vec![
                uncovered(Some(2), 1000, 1250, 0, 1000),
                uncovered(None, 0, 0, 1000, 3210),
            ]
        );
        assert_eq!(
            scheme.insertions(&child_2),
            vec![
                Insertion { item_type_id: 1, rotate: false, new_bin: -1, x: 1250, y: 0 },
                Insertion { item_type_id: 1, rotate: false, new_bin: -1, x: 0, y: 1000 },
            ]
        );

        let child_3 = scheme.child(
            &child_2,
            &Insertion {
                item_type_id: 1,
                rotate: false,
                new_bin: -1,
                x: 0,
                y: 1000,
            },
        );
        assert_eq!(child_3.current_area, 1250 * (1000 + 1210));
        assert_eq!(child_3.waste, 500_000);
        assert_eq!(
            child_3.uncovered_items,
            vec![
                uncovered(Some(2), 1000, 1250, 0, 1000),
                uncovered(Some(1), 0, 1250, 1000, 2210),
                uncovered(None, 0, 0, 2210, 3210),
            ]
        );
        assert_eq!(scheme.insertions(&child_3), vec![]);
    }

    #[test]
    fn defect_shifts_both_ways() {
        let mut builder = InstanceBuilder::new();
        builder.add_bin_type(6000, 3210, -1.0, 1, 0).unwrap();
        builder.add_defect(0, 100, 50, 20, 10).unwrap();
        builder.add_item_type(1000, 500, -1.0, 1).unwrap();
        builder.set_item_types_oriented();
        let scheme = scheme(builder.build().unwrap());

        let root = scheme.root();
        assert_eq!(
            scheme.insertions(&root),
            vec![
                Insertion { item_type_id: 0, rotate: false, new_bin: 1, x: 120, y: 0 },
                Insertion { item_type_id: 0, rotate: false, new_bin: 1, x: 0, y: 60 },
            ]
        );
    }

    #[test]
    fn defect_above_the_item_still_splits() {
        let mut builder = InstanceBuilder::new();
        builder.add_bin_type(6000, 3210, -1.0, 1, 0).unwrap();
        builder.add_defect(0, 100, 600, 20, 10).unwrap();
        builder.add_item_type(1000, 500, -1.0, 1).unwrap();
        builder.set_item_types_oriented();
        let scheme = scheme(builder.build().unwrap());

        let root = scheme.root();
        assert_eq!(
            scheme.insertions(&root),
            vec![
                Insertion { item_type_id: 0, rotate: false, new_bin: 1, x: 0, y: 0 },
                Insertion { item_type_id: 0, rotate: false, new_bin: 1, x: 0, y: 610 },
            ]
        );
    }

    #[test]
    fn defect_outside_the_item_is_ignored() {
        let mut builder = InstanceBuilder::new();
        builder.add_bin_type(6000, 3210, -1.0, 1, 0).unwrap();
        builder.add_defect(0, 1000, 50, 20, 10).unwrap();
        builder.add_item_type(1000, 500, -1.0, 1).unwrap();
        builder.set_item_types_oriented();
        let scheme = scheme(builder.build().unwrap());

        let root = scheme.root();
        assert_eq!(
            scheme.insertions(&root),
            vec![Insertion { item_type_id: 0, rotate: false, new_bin: 1, x: 0, y: 0 }]
        );
    }

    #[test]
    fn rotation_generates_both_orientations() {
        let mut builder = InstanceBuilder::new();
        builder.add_bin_type(6000, 3210, -1.0, 1, 0).unwrap();
        builder.add_item_type(1000, 500, -1.0, 1).unwrap();
        let scheme = scheme(builder.build().unwrap());

        let root = scheme.root();
        assert_eq!(
            scheme.insertions(&root),
            vec![
                Insertion { item_type_id: 0, rotate: false, new_bin: 1, x: 0, y: 0 },
                Insertion { item_type_id: 0, rotate: true, new_bin: 1, x: 0, y: 0 },
            ]
        );
    }

    #[test]
    fn dominance_compares_staircases() {
        let mut builder = InstanceBuilder::new();
        builder.add_bin_type(6000, 3210, -1.0, 1, 0).unwrap();
        builder.add_item_type(1000, 500, -1.0, 1).unwrap();
        builder.set_item_types_oriented();
        let scheme = scheme(builder.build().unwrap());

        // Same item, same band, one placement shifted right: the flush
        // placement dominates.
        let root = scheme.root();
        let a = scheme.child(
            &root,
            &Insertion { item_type_id: 0, rotate: false, new_bin: 1, x: 0, y: 0 },
        );
        let b = scheme.child(
            &root,
            &Insertion { item_type_id: 0, rotate: false, new_bin: 1, x: 500, y: 0 },
        );
        assert!(scheme.dominates(&a, &b));
        assert!(!scheme.dominates(&b, &a));
    }

    #[test]
    fn to_solution_replays_the_chain() {
        let mut builder = InstanceBuilder::new();
        builder.set_objective(Objective::BinPackingWithLeftovers);
        builder.add_bin_type(6000, 3210, -1.0, 1, 0).unwrap();
        builder.add_item_type(1000, 500, -1.0, 1).unwrap();
        builder.add_item_type(250, 1000, -1.0, 1).unwrap();
        builder.set_item_types_oriented();
        let scheme = scheme(builder.build().unwrap());

        let root = scheme.root();
        let node = scheme.child(
            &root,
            &Insertion { item_type_id: 0, rotate: false, new_bin: 1, x: 0, y: 0 },
        );
        let node = scheme.child(
            &node,
            &Insertion { item_type_id: 1, rotate: false, new_bin: -1, x: 1000, y: 0 },
        );
        let solution = scheme.to_solution(&node);
        assert!(solution.full());
        assert!(solution.feasible());
        assert_eq!(solution.area(), node.current_area);
        assert_eq!(solution.waste(), node.waste);
    }
}
