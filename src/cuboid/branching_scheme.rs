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

use super::instance::{BinType, Instance};
use super::instance_flipper::{convert_point_back, InstanceFlipper};
use super::solution::Solution;
use crate::common::*;
use crate::tree_search;

/// Cell of the 3D front: the region `[ys, ye) x [zs, ze)` is covered up to
/// `xe` by the item `item_type_id` (`None` for the bin's back wall).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UncoveredItem {
    pub item_type_id: Option<ItemTypeId>,
    pub xs: Length,
    pub xe: Length,
    pub ys: Length,
    pub ye: Length,
    pub zs: Length,
    pub ze: Length,
}

/// Exposed `+y` face of a placed item; anchor cache.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct YUncoveredItem {
    pub xs: Length,
    pub xe: Length,
    pub y: Length,
    pub zs: Length,
    pub ze: Length,
}

/// Exposed `+z` face of a placed item; anchor cache.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ZUncoveredItem {
    pub xs: Length,
    pub xe: Length,
    pub z: Length,
    pub ys: Length,
    pub ye: Length,
}

/// Candidate placement extending a parent node by one item.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Insertion {
    pub item_type_id: ItemTypeId,
    pub rotation: usize,
    /// `-1`: last bin; `1`/`2`/`3`: new bin packed along x/y/z.
    pub new_bin: i8,
    pub x: Length,
    pub y: Length,
    pub z: Length,
}

/// Immutable snapshot of a partial packing.
#[derive(Debug)]
pub struct Node {
    pub id: NodeId,
    pub parent: Option<Rc<Node>>,
    pub item_type_id: Option<ItemTypeId>,
    pub rotation: usize,
    pub x: Length,
    pub y: Length,
    pub z: Length,
    pub last_bin_direction: Direction,
    pub uncovered_items: Vec<UncoveredItem>,
    pub y_uncovered_items: Vec<YUncoveredItem>,
    pub z_uncovered_items: Vec<ZUncoveredItem>,
    pub item_number_of_copies: Vec<ItemPos>,
    pub number_of_bins: BinPos,
    pub number_of_items: ItemPos,
    pub item_volume: Volume,
    pub item_weight: Weight,
    pub current_volume: Volume,
    pub waste: Volume,
    pub guide_volume: Volume,
    pub xe_max: Length,
    pub ye_max: Length,
    pub ze_max: Length,
    pub xs_max: Length,
    pub profit: Profit,
    pub cost: Profit,
    pub last_bin_weight: Weight,
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

/// Branching scheme anchoring boxes on a 3D staircase front.
pub struct BranchingScheme {
    instance: Arc<Instance>,
    flipper_y: InstanceFlipper,
    flipper_z: InstanceFlipper,
    parameters: Parameters,
    node_id: Cell<NodeId>,
}

impl BranchingScheme {
    pub fn new(instance: Arc<Instance>, parameters: Parameters) -> Result<Self> {
        let flipper_y = InstanceFlipper::new(instance.clone(), Direction::Y)?;
        let flipper_z = InstanceFlipper::new(instance.clone(), Direction::Z)?;
        let scheme = BranchingScheme {
            instance,
            flipper_y,
            flipper_z,
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
                    "cuboid::BranchingScheme",
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

    fn objective(&self) -> Objective {
        match self.parameters.direction {
            Direction::Y => self.flipper_y.flipped_instance().objective(),
            Direction::Z => self.flipper_z.flipped_instance().objective(),
            _ => self.instance.objective(),
        }
    }

    fn instance_direction(&self, direction: Direction) -> &Arc<Instance> {
        match direction {
            Direction::Y => self.flipper_y.flipped_instance(),
            Direction::Z => self.flipper_z.flipped_instance(),
            _ => &self.instance,
        }
    }

    fn new_bin_direction(new_bin: i8) -> Direction {
        match new_bin {
            2 => Direction::Y,
            3 => Direction::Z,
            _ => Direction::X,
        }
    }

    fn next_node_id(&self) -> NodeId {
        let id = self.node_id.get();
        self.node_id.set(id + 1);
        id
    }

    fn mean_item_volume(&self, node: &Node) -> f64 {
        node.item_volume as f64 / node.number_of_items as f64
    }

    /// Cheap admissible knapsack bound.
    fn ubkp(&self, node: &Node) -> Profit {
        let remaining_item_volume = self.instance.item_volume() - node.item_volume;
        let remaining_packable_volume = self.instance.bin_volume() - node.current_volume;
        if remaining_packable_volume >= remaining_item_volume {
            return self.instance.item_profit();
        }
        match self.instance.max_efficiency_item_type_id() {
            Some(item_type_id) => {
                let item_type = self.instance.item_type(item_type_id);
                node.profit
                    + remaining_packable_volume as Profit * item_type.profit
                        / item_type.volume() as Profit
            }
            None => node.profit,
        }
    }

    fn bin_packing_lower_bound(&self, volume: Volume) -> ItemPos {
        let mut remaining = volume;
        let mut bin_pos = 0;
        while remaining > 0 {
            if bin_pos >= self.instance.number_of_bins() {
                return bin_pos as ItemPos + 1;
            }
            let bin_type_id = self.instance.bin_type_id(bin_pos);
            remaining -= self.instance.bin_type(bin_type_id).volume();
            bin_pos += 1;
        }
        bin_pos as ItemPos
    }

    /// Leftmost feasible x for the footprint `[ys, ye) x [zs, ze)`.
    fn x_start(front: &[UncoveredItem], ys: Length, ye: Length, zs: Length, ze: Length) -> Length {
        front
            .iter()
            .filter(|cell| cell.ys < ye && ys < cell.ye && cell.zs < ze && zs < cell.ze)
            .map(|cell| cell.xe)
            .max()
            .unwrap_or(0)
    }

    /// Try one anchor; `xs_min` lifts the anchor to an item's face edge.
    fn insertion_item(
        &self,
        parent: &Node,
        insertions: &mut Vec<Insertion>,
        item_type_id: ItemTypeId,
        rotation: usize,
        new_bin: i8,
        front: &[UncoveredItem],
        xs_min: Length,
        ys: Length,
        zs: Length,
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
        let xj = item_type.x(rotation);
        let yj = item_type.y(rotation);
        let zj = item_type.z(rotation);

        if ys + yj > bin_type.y || zs + zj > bin_type.z {
            return;
        }
        let xs = Self::x_start(front, ys, ys + yj, zs, zs + zj).max(xs_min);
        if xs + xj > bin_type.x {
            return;
        }

        // Maximum weight.
        let last_bin_weight = if new_bin < 0 { parent.last_bin_weight } else { 0.0 };
        if last_bin_weight + item_type.weight > bin_type.maximum_weight * PSTOL {
            return;
        }

        let insertion = Insertion {
            item_type_id,
            rotation,
            new_bin,
            x: xs,
            y: ys,
            z: zs,
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
        y_uncovered_items: &[YUncoveredItem],
        z_uncovered_items: &[ZUncoveredItem],
    ) {
        let direction = if new_bin < 0 {
            parent.last_bin_direction
        } else {
            Self::new_bin_direction(new_bin)
        };
        let instance = self.instance_direction(direction);

        let mut anchors: Vec<(Length, Length, Length)> = Vec::new();
        for cell in front {
            anchors.push((0, cell.ys, cell.zs));
        }
        for face in y_uncovered_items {
            anchors.push((face.xs, face.y, face.zs));
        }
        for face in z_uncovered_items {
            anchors.push((face.xs, face.ys, face.z));
        }

        for &(xs_min, ys, zs) in &anchors {
            for item_type in instance.item_types() {
                if parent.item_number_of_copies[item_type.id] == item_type.copies {
                    continue;
                }
                for rotation in item_type.unique_rotations() {
                    self.insertion_item(
                        parent,
                        insertions,
                        item_type.id,
                        rotation,
                        new_bin,
                        front,
                        xs_min,
                        ys,
                        zs,
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
            zs: 0,
            ze: bin_type.z,
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
            rotation: 0,
            x: -1,
            y: -1,
            z: -1,
            last_bin_direction: Direction::X,
            uncovered_items: Vec::new(),
            y_uncovered_items: Vec::new(),
            z_uncovered_items: Vec::new(),
            item_number_of_copies: vec![0; self.instance.number_of_item_types()],
            number_of_bins: 0,
            number_of_items: 0,
            item_volume: 0,
            item_weight: 0.0,
            current_volume: 0,
            waste: 0,
            guide_volume: 0,
            xe_max: 0,
            ye_max: 0,
            ze_max: 0,
            xs_max: 0,
            profit: 0.0,
            cost: 0.0,
            last_bin_weight: 0.0,
        })
    }

    fn insertions(&self, parent: &Rc<Node>) -> Vec<Insertion> {
        if self.leaf(parent) {
            return Vec::new();
        }
        let mut insertions = Vec::new();

        if parent.number_of_bins > 0 {
            self.insertions_bin(
                parent,
                &mut insertions,
                -1,
                &parent.uncovered_items,
                &parent.y_uncovered_items,
                &parent.z_uncovered_items,
            );
        }

        // Same-bin insertions inhibit new-bin branching.
        if insertions.is_empty() && parent.number_of_bins < self.instance.number_of_bins() {
            let new_bins: &[i8] = match self.parameters.direction {
                Direction::X => &[1],
                Direction::Y => &[2],
                Direction::Z => &[3],
                Direction::Any => &[1, 2, 3],
            };
            for &new_bin in new_bins {
                let instance = self.instance_direction(Self::new_bin_direction(new_bin));
                let bin_type_id = instance.bin_type_id(parent.number_of_bins);
                let front = Self::empty_front(instance.bin_type(bin_type_id));
                self.insertions_bin(parent, &mut insertions, new_bin, &front, &[], &[]);
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
        let xj = item_type.x(insertion.rotation);
        let yj = item_type.y(insertion.rotation);
        let zj = item_type.z(insertion.rotation);
        let xs = insertion.x;
        let ys = insertion.y;
        let zs = insertion.z;
        let xe = xs + xj;
        let ye = ys + yj;
        let ze = zs + zj;

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

        // Front update: subtract the item's footprint from every cell it
        // meets and insert the item's own cell.
        let mut uncovered_items = Vec::with_capacity(front.len() + 3);
        uncovered_items.push(UncoveredItem {
            item_type_id: Some(insertion.item_type_id),
            xs,
            xe,
            ys,
            ye,
            zs,
            ze,
        });
        for cell in &front {
            if cell.ye <= ys || cell.ys >= ye || cell.ze <= zs || cell.zs >= ze {
                uncovered_items.push(cell.clone());
                continue;
            }
            let ys_overlap = cell.ys.max(ys);
            let ye_overlap = cell.ye.min(ye);
            if cell.ys < ys {
                let mut piece = cell.clone();
                piece.ye = ys;
                uncovered_items.push(piece);
            }
            if cell.ye > ye {
                let mut piece = cell.clone();
                piece.ys = ye;
                uncovered_items.push(piece);
            }
            if cell.zs < zs {
                let mut piece = cell.clone();
                piece.ys = ys_overlap;
                piece.ye = ye_overlap;
                piece.ze = zs;
                uncovered_items.push(piece);
            }
            if cell.ze > ze {
                let mut piece = cell.clone();
                piece.ys = ys_overlap;
                piece.ye = ye_overlap;
                piece.zs = ze;
                uncovered_items.push(piece);
            }
        }
        uncovered_items.sort_by_key(|cell| (cell.ys, cell.zs));

        // Anchor caches: trim faces hidden by the new item, expose its own.
        let mut y_uncovered_items: Vec<YUncoveredItem> = Vec::new();
        if !new_bin {
            for face in &parent.y_uncovered_items {
                if face.y >= ys && face.y < ye && face.zs < ze && zs < face.ze {
                    if face.xs < xs {
                        let mut piece = face.clone();
                        piece.xe = piece.xe.min(xs);
                        y_uncovered_items.push(piece);
                    }
                    if face.xe > xe {
                        let mut piece = face.clone();
                        piece.xs = piece.xs.max(xe);
                        y_uncovered_items.push(piece);
                    }
                } else {
                    y_uncovered_items.push(face.clone());
                }
            }
        }
        if ye < bin_type.y {
            y_uncovered_items.push(YUncoveredItem {
                xs,
                xe,
                y: ye,
                zs,
                ze,
            });
        }

        let mut z_uncovered_items: Vec<ZUncoveredItem> = Vec::new();
        if !new_bin {
            for face in &parent.z_uncovered_items {
                if face.z >= zs && face.z < ze && face.ys < ye && ys < face.ye {
                    if face.xs < xs {
                        let mut piece = face.clone();
                        piece.xe = piece.xe.min(xs);
                        z_uncovered_items.push(piece);
                    }
                    if face.xe > xe {
                        let mut piece = face.clone();
                        piece.xs = piece.xs.max(xe);
                        z_uncovered_items.push(piece);
                    }
                } else {
                    z_uncovered_items.push(face.clone());
                }
            }
        }
        if ze < bin_type.z {
            z_uncovered_items.push(ZUncoveredItem {
                xs,
                xe,
                z: ze,
                ys,
                ye,
            });
        }

        let (xe_max, ye_max, ze_max, xs_max) = if new_bin {
            (xe, ye, ze, xs)
        } else {
            (
                parent.xe_max.max(xe),
                parent.ye_max.max(ye),
                parent.ze_max.max(ze),
                parent.xs_max.max(xs),
            )
        };
        let last_bin_weight = if new_bin {
            item_type.weight
        } else {
            parent.last_bin_weight + item_type.weight
        };

        let mut item_number_of_copies = parent.item_number_of_copies.clone();
        item_number_of_copies[insertion.item_type_id] += 1;
        let item_volume = parent.item_volume + item_type.volume();
        let previous_bins_volume = instance.previous_bins_volume(number_of_bins - 1);
        let current_volume = previous_bins_volume + xe_max * ye_max * ze_max;

        Rc::new(Node {
            id: self.next_node_id(),
            parent: Some(parent.clone()),
            item_type_id: Some(insertion.item_type_id),
            rotation: insertion.rotation,
            x: xs,
            y: ys,
            z: zs,
            last_bin_direction: direction,
            uncovered_items,
            y_uncovered_items,
            z_uncovered_items,
            item_number_of_copies,
            number_of_bins,
            number_of_items: parent.number_of_items + 1,
            item_volume,
            item_weight: parent.item_weight + item_type.weight,
            current_volume,
            waste: current_volume - item_volume,
            guide_volume: previous_bins_volume + xe_max * bin_type.y * bin_type.z,
            xe_max,
            ye_max,
            ze_max,
            xs_max,
            profit: parent.profit + item_type.profit,
            cost: if new_bin {
                parent.cost + bin_type.cost
            } else {
                parent.cost
            },
            last_bin_weight,
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
                    self.bin_packing_lower_bound(self.instance.item_volume() + node.waste);
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
            0 => node.guide_volume as f64 / node.item_volume as f64,
            1 => {
                node.guide_volume as f64 / node.item_volume as f64
                    / self.mean_item_volume(node)
            }
            4 => node.guide_volume as f64 / node.profit,
            5 => {
                node.guide_volume as f64 / node.profit / node.item_volume as f64
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
        for cell_a in &a.uncovered_items {
            for cell_b in &b.uncovered_items {
                if cell_a.ys >= cell_b.ye
                    || cell_a.ye <= cell_b.ys
                    || cell_a.zs >= cell_b.ze
                    || cell_a.ze <= cell_b.zs
                {
                    continue;
                }
                if cell_a.xe > cell_b.xe {
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
            let direction = current.last_bin_direction;
            let frame = self.instance_direction(direction);
            let item_type_id = current.item_type_id.unwrap();
            let frame_item = frame.item_type(item_type_id);
            let (x, y, z) = convert_point_back(direction, current.x, current.y, current.z);
            let (lx, ly, lz) = convert_point_back(
                direction,
                frame_item.x(current.rotation),
                frame_item.y(current.rotation),
                frame_item.z(current.rotation),
            );
            let rotation = self
                .instance
                .item_type(item_type_id)
                .rotation_matching(lx, ly, lz)
                .expect("no original rotation matches the flipped placement");
            solution
                .add_item(bin_pos, item_type_id, x, y, z, rotation)
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
                        == self.bin_packing_lower_bound(self.instance.item_volume())
            }
            Objective::BinPackingWithLeftovers => self.leaf(incumbent) && incumbent.waste == 0,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cuboid::InstanceBuilder;
    use crate::tree_search::BranchingScheme as _;

    fn scheme(instance: Instance) -> BranchingScheme {
        BranchingScheme::new(Arc::new(instance), Parameters::default()).unwrap()
    }

    #[test]
    fn perfect_fit_knapsack() {
        let mut builder = InstanceBuilder::new();
        builder.set_objective(Objective::Knapsack);
        builder.add_bin_type(10, 10, 10, -1.0, 1, 0).unwrap();
        builder.add_item_type(10, 10, 10, 100.0, 1).unwrap();
        let scheme = scheme(builder.build().unwrap());

        let root = scheme.root();
        let insertions = scheme.insertions(&root);
        assert_eq!(
            insertions,
            vec![Insertion {
                item_type_id: 0,
                rotation: 0,
                new_bin: 1,
                x: 0,
                y: 0,
                z: 0,
            }]
        );

        let child = scheme.child(&root, &insertions[0]);
        assert!(scheme.leaf(&child));
        assert_eq!(child.profit, 100.0);
        assert_eq!(child.waste, 0);
        assert!(scheme.optimal(&child));
        assert!(scheme.better(&child, None));

        let solution = scheme.to_solution(&child);
        assert!(solution.full());
        assert!(solution.feasible());
        assert_eq!(solution.profit(), 100.0);
    }

    #[test]
    fn front_splits_into_cells() {
        let mut builder = InstanceBuilder::new();
        builder.add_bin_type(10, 10, 10, -1.0, 1, 0).unwrap();
        builder.add_item_type(4, 6, 5, -1.0, 1).unwrap();
        builder.set_item_types_oriented();
        let scheme = scheme(builder.build().unwrap());

        let root = scheme.root();
        let child = scheme.child(
            &root,
            &Insertion { item_type_id: 0, rotation: 0, new_bin: 1, x: 0, y: 0, z: 0 },
        );
        assert_eq!(
            child.uncovered_items,
            vec![
                UncoveredItem {
                    item_type_id: Some(0),
                    xs: 0,
                    xe: 4,
                    ys: 0,
                    ye: 6,
                    zs: 0,
                    ze: 5,
                },
                UncoveredItem {
                    item_type_id: None,
                    xs: 0,
                    xe: 0,
                    ys: 0,
                    ye: 6,
                    zs: 5,
                    ze: 10,
                },
                UncoveredItem {
                    item_type_id: None,
                    xs: 0,
                    xe: 0,
                    ys: 6,
                    ye: 10,
                    zs: 0,
                    ze: 10,
                },
            ]
        );
        // The front still tiles the whole back wall.
        let area: Area = child
            .uncovered_items
            .iter()
            .map(|cell| (cell.ye - cell.ys) * (cell.ze - cell.zs))
            .sum();
        assert_eq!(area, 100);
        // The item's faces are exposed as anchor caches.
        assert_eq!(
            child.y_uncovered_items,
            vec![YUncoveredItem { xs: 0, xe: 4, y: 6, zs: 0, ze: 5 }]
        );
        assert_eq!(
            child.z_uncovered_items,
            vec![ZUncoveredItem { xs: 0, xe: 4, z: 5, ys: 0, ye: 6 }]
        );
    }

    #[test]
    fn two_boxes_stack_along_z() {
        let mut builder = InstanceBuilder::new();
        builder.set_objective(Objective::Knapsack);
        builder.add_bin_type(10, 10, 10, -1.0, 1, 0).unwrap();
        builder.add_item_type(10, 10, 5, 60.0, 2).unwrap();
        builder.set_item_types_oriented();
        let scheme = scheme(builder.build().unwrap());

        let root = scheme.root();
        let child = scheme.child(
            &root,
            &Insertion { item_type_id: 0, rotation: 0, new_bin: 1, x: 0, y: 0, z: 0 },
        );
        let insertions = scheme.insertions(&child);
        assert!(insertions.contains(&Insertion {
            item_type_id: 0,
            rotation: 0,
            new_bin: -1,
            x: 0,
            y: 0,
            z: 5,
        }));

        let leaf = scheme.child(
            &child,
            &Insertion { item_type_id: 0, rotation: 0, new_bin: -1, x: 0, y: 0, z: 5 },
        );
        assert!(scheme.leaf(&leaf));
        assert_eq!(leaf.current_volume, 1000);
        assert_eq!(leaf.waste, 0);
    }

    #[test]
    fn z_face_anchor_keeps_the_stack_aligned() {
        let mut builder = InstanceBuilder::new();
        builder.set_objective(Objective::Knapsack);
        builder.add_bin_type(20, 10, 10, -1.0, 1, 0).unwrap();
        builder.add_item_type(8, 10, 5, -1.0, 1).unwrap();
        builder.add_item_type(4, 10, 5, -1.0, 1).unwrap();
        builder.set_item_types_oriented();
        let scheme = scheme(builder.build().unwrap());

        let root = scheme.root();
        // Pretend the first box was pushed to x = 2.
        let child = scheme.child(
            &root,
            &Insertion { item_type_id: 0, rotation: 0, new_bin: 1, x: 2, y: 0, z: 0 },
        );
        // The z-face cache proposes stacking flush at the box's own x.
        let insertions = scheme.insertions(&child);
        assert!(insertions.contains(&Insertion {
            item_type_id: 1,
            rotation: 0,
            new_bin: -1,
            x: 2,
            y: 0,
            z: 5,
        }));
    }

    #[test]
    fn weight_limits_same_bin_insertions() {
        let mut builder = InstanceBuilder::new();
        builder.set_objective(Objective::BinPacking);
        builder.add_bin_type(10, 10, 10, -1.0, 2, 0).unwrap();
        builder.set_bin_type_maximum_weight(0, 5.0);
        builder.add_item_type(5, 10, 10, -1.0, 2).unwrap();
        builder.set_item_types_oriented();
        builder.set_item_type_weight(0, 3.0);
        let scheme = scheme(builder.build().unwrap());

        let root = scheme.root();
        let child = scheme.child(
            &root,
            &Insertion { item_type_id: 0, rotation: 0, new_bin: 1, x: 0, y: 0, z: 0 },
        );
        let insertions = scheme.insertions(&child);
        // 3 + 3 > 5: the second box must open a new bin.
        assert!(insertions.iter().all(|insertion| insertion.new_bin == 1));
    }
}
