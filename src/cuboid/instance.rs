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

use std::path::Path;

use serde::Deserialize;

use crate::common::*;

/// Axis permutations of a box, indexed by rotation:
///
/// | rotation | extents     |
/// |----------|-------------|
/// | 0        | (x, y, z)   |
/// | 1        | (y, x, z)   |
/// | 2        | (z, y, x)   |
/// | 3        | (x, z, y)   |
/// | 4        | (y, z, x)   |
/// | 5        | (z, x, y)   |
pub const NUMBER_OF_ROTATIONS: usize = 6;

/// All rotations allowed.
pub const ROTATIONS_ALL: u8 = 0b11_1111;
/// Only the identity rotation allowed.
pub const ROTATIONS_NONE: u8 = 0b1;

#[derive(Clone, Debug)]
pub struct ItemType {
    pub id: ItemTypeId,
    pub x: Length,
    pub y: Length,
    pub z: Length,
    /// Bit `r` allows rotation `r`.
    pub rotations: u8,
    pub profit: Profit,
    pub copies: ItemPos,
    pub weight: Weight,
}

impl ItemType {
    pub fn x(&self, rotation: usize) -> Length {
        match rotation {
            0 | 3 => self.x,
            1 | 4 => self.y,
            _ => self.z,
        }
    }

    pub fn y(&self, rotation: usize) -> Length {
        match rotation {
            2 | 0 => self.y,
            1 | 5 => self.x,
            _ => self.z,
        }
    }

    pub fn z(&self, rotation: usize) -> Length {
        match rotation {
            0 | 1 => self.z,
            2 | 4 => self.x,
            _ => self.y,
        }
    }

    pub fn volume(&self) -> Volume {
        self.x * self.y * self.z
    }

    pub fn can_rotate(&self, rotation: usize) -> bool {
        rotation < NUMBER_OF_ROTATIONS && (self.rotations >> rotation) & 1 == 1
    }

    /// Allowed rotations with pairwise distinct extents.
    pub fn unique_rotations(&self) -> Vec<usize> {
        let mut rotations = Vec::new();
        let mut seen: Vec<(Length, Length, Length)> = Vec::new();
        for rotation in 0..NUMBER_OF_ROTATIONS {
            if !self.can_rotate(rotation) {
                continue;
            }
            let extents = (self.x(rotation), self.y(rotation), self.z(rotation));
            if seen.contains(&extents) {
                continue;
            }
            seen.push(extents);
            rotations.push(rotation);
        }
        rotations
    }

    /// First allowed rotation yielding the given extents.
    pub fn rotation_matching(&self, x: Length, y: Length, z: Length) -> Option<usize> {
        (0..NUMBER_OF_ROTATIONS).find(|&rotation| {
            self.can_rotate(rotation)
                && self.x(rotation) == x
                && self.y(rotation) == y
                && self.z(rotation) == z
        })
    }
}

#[derive(Clone, Debug)]
pub struct BinType {
    pub id: BinTypeId,
    pub x: Length,
    pub y: Length,
    pub z: Length,
    pub cost: Profit,
    pub copies: ItemPos,
    pub copies_min: ItemPos,
    pub maximum_weight: Weight,
}

impl BinType {
    pub fn volume(&self) -> Volume {
        self.x * self.y * self.z
    }
}

/// Frozen problem description shared read-only by all scheme nodes.
#[derive(Debug)]
pub struct Instance {
    objective: Objective,
    item_types: Vec<ItemType>,
    bin_types: Vec<BinType>,

    number_of_items: ItemPos,
    item_profit: Profit,
    item_volume: Volume,
    item_weight: Weight,
    max_efficiency_item_type_id: Option<ItemTypeId>,
    all_item_types_infinite_copies: bool,
    bin_volume: Volume,
    bin_type_ids: Vec<BinTypeId>,
    previous_bins_volume: Vec<Volume>,
}

impl Instance {
    pub fn objective(&self) -> Objective {
        self.objective
    }

    pub fn number_of_item_types(&self) -> usize {
        self.item_types.len()
    }

    pub fn number_of_bin_types(&self) -> usize {
        self.bin_types.len()
    }

    pub fn item_type(&self, item_type_id: ItemTypeId) -> &ItemType {
        &self.item_types[item_type_id]
    }

    pub fn bin_type(&self, bin_type_id: BinTypeId) -> &BinType {
        &self.bin_types[bin_type_id]
    }

    pub fn item_types(&self) -> &[ItemType] {
        &self.item_types
    }

    pub fn bin_types(&self) -> &[BinType] {
        &self.bin_types
    }

    pub fn number_of_items(&self) -> ItemPos {
        self.number_of_items
    }

    pub fn number_of_bins(&self) -> BinPos {
        self.bin_type_ids.len()
    }

    pub fn bin_type_id(&self, bin_pos: BinPos) -> BinTypeId {
        self.bin_type_ids[bin_pos]
    }

    pub fn previous_bins_volume(&self, bin_pos: BinPos) -> Volume {
        self.previous_bins_volume[bin_pos]
    }

    pub fn item_volume(&self) -> Volume {
        self.item_volume
    }

    pub fn item_profit(&self) -> Profit {
        self.item_profit
    }

    pub fn item_weight(&self) -> Weight {
        self.item_weight
    }

    pub fn bin_volume(&self) -> Volume {
        self.bin_volume
    }

    pub fn max_efficiency_item_type_id(&self) -> Option<ItemTypeId> {
        self.max_efficiency_item_type_id
    }

    pub fn unbounded_knapsack(&self) -> bool {
        self.all_item_types_infinite_copies
    }
}

#[derive(Debug, Deserialize)]
struct BinRecord {
    #[serde(rename = "X")]
    x: Length,
    #[serde(rename = "Y")]
    y: Length,
    #[serde(rename = "Z")]
    z: Length,
    #[serde(rename = "COST", default)]
    cost: Option<Profit>,
    #[serde(rename = "COPIES", default)]
    copies: Option<ItemPos>,
    #[serde(rename = "COPIES_MIN", default)]
    copies_min: Option<ItemPos>,
    #[serde(rename = "MAXIMUM_WEIGHT", default)]
    maximum_weight: Option<Weight>,
}

#[derive(Debug, Deserialize)]
struct ItemRecord {
    #[serde(rename = "X")]
    x: Length,
    #[serde(rename = "Y")]
    y: Length,
    #[serde(rename = "Z")]
    z: Length,
    #[serde(rename = "PROFIT", default)]
    profit: Option<Profit>,
    #[serde(rename = "COPIES", default)]
    copies: Option<ItemPos>,
    #[serde(rename = "WEIGHT", default)]
    weight: Option<Weight>,
    #[serde(rename = "ROTATIONS", default)]
    rotations: Option<u8>,
    #[serde(rename = "ORIENTED", default)]
    oriented: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct ParameterRecord {
    #[serde(rename = "NAME")]
    name: String,
    #[serde(rename = "VALUE")]
    value: String,
}

/// Builds an [`Instance`]; validation is strict, aggregates are computed in
/// the final [`InstanceBuilder::build`].
pub struct InstanceBuilder {
    objective: Objective,
    item_types: Vec<ItemType>,
    bin_types: Vec<BinType>,
}

impl Default for InstanceBuilder {
    fn default() -> Self {
        InstanceBuilder::new()
    }
}

impl InstanceBuilder {
    pub fn new() -> Self {
        InstanceBuilder {
            objective: Objective::Default,
            item_types: Vec::new(),
            bin_types: Vec::new(),
        }
    }

    pub fn set_objective(&mut self, objective: Objective) {
        self.objective = objective;
    }

    pub fn add_bin_type(
        &mut self,
        x: Length,
        y: Length,
        z: Length,
        cost: Profit,
        copies: ItemPos,
        copies_min: ItemPos,
    ) -> Result<BinTypeId> {
        if x <= 0 || y <= 0 || z <= 0 {
            return Err(Error::ConstraintViolation(format!(
                "bin type lengths must be > 0, got {}x{}x{}",
                x, y, z
            )));
        }
        if cost < 0.0 && cost != -1.0 {
            return Err(Error::ConstraintViolation(format!(
                "bin type cost must be >= 0 or -1, got {}",
                cost
            )));
        }
        if copies_min < 0 {
            return Err(Error::ConstraintViolation(format!(
                "bin type copies_min must be >= 0, got {}",
                copies_min
            )));
        }
        if copies != -1 {
            if copies <= 0 {
                return Err(Error::ConstraintViolation(format!(
                    "bin type copies must be > 0 or -1, got {}",
                    copies
                )));
            }
            if copies_min > copies {
                return Err(Error::ConstraintViolation(format!(
                    "bin type copies_min {} exceeds copies {}",
                    copies_min, copies
                )));
            }
        }

        let id = self.bin_types.len();
        self.bin_types.push(BinType {
            id,
            x,
            y,
            z,
            cost: if cost == -1.0 {
                (x * y * z) as Profit
            } else {
                cost
            },
            copies,
            copies_min,
            maximum_weight: f64::INFINITY,
        });
        Ok(id)
    }

    pub fn set_bin_type_maximum_weight(&mut self, bin_type_id: BinTypeId, maximum_weight: Weight) {
        self.bin_types[bin_type_id].maximum_weight = maximum_weight;
    }

    pub fn add_item_type(
        &mut self,
        x: Length,
        y: Length,
        z: Length,
        profit: Profit,
        copies: ItemPos,
    ) -> Result<ItemTypeId> {
        if x <= 0 || y <= 0 || z <= 0 {
            return Err(Error::ConstraintViolation(format!(
                "item type lengths must be > 0, got {}x{}x{}",
                x, y, z
            )));
        }
        if copies != -1 && copies <= 0 {
            return Err(Error::ConstraintViolation(format!(
                "item type copies must be > 0 or -1, got {}",
                copies
            )));
        }

        let id = self.item_types.len();
        self.item_types.push(ItemType {
            id,
            x,
            y,
            z,
            rotations: ROTATIONS_ALL,
            profit: if profit == -1.0 {
                (x * y * z) as Profit
            } else {
                profit
            },
            copies,
            weight: 0.0,
        });
        Ok(id)
    }

    pub fn set_item_type_rotations(&mut self, item_type_id: ItemTypeId, rotations: u8) -> Result<()> {
        if rotations & ROTATIONS_ALL == 0 {
            return Err(Error::ConstraintViolation(format!(
                "item type {} must allow at least one rotation",
                item_type_id
            )));
        }
        self.item_types[item_type_id].rotations = rotations & ROTATIONS_ALL;
        Ok(())
    }

    pub fn set_item_type_weight(&mut self, item_type_id: ItemTypeId, weight: Weight) {
        self.item_types[item_type_id].weight = weight;
    }

    pub fn set_item_types_oriented(&mut self) {
        for item_type in &mut self.item_types {
            item_type.rotations = ROTATIONS_NONE;
        }
    }

    pub fn set_item_types_unweighted(&mut self) {
        for item_type in &mut self.item_types {
            item_type.weight = 0.0;
        }
    }

    pub fn set_item_types_profits_auto(&mut self) {
        for item_type in &mut self.item_types {
            item_type.profit = item_type.volume() as Profit;
        }
    }

    pub fn set_bin_types_infinite_copies(&mut self) {
        for bin_type in &mut self.bin_types {
            bin_type.copies = -1;
        }
    }

    pub fn set_bin_types_unweighted(&mut self) {
        for bin_type in &mut self.bin_types {
            bin_type.maximum_weight = f64::INFINITY;
        }
    }

    pub fn set_bin_types_infinite_x(&mut self) {
        let item_x_sum: Length = self
            .item_types
            .iter()
            .map(|item_type| item_type.copies.max(1) * item_type.x.max(item_type.y).max(item_type.z))
            .sum();
        for bin_type in &mut self.bin_types {
            bin_type.x = item_x_sum.max(bin_type.x);
        }
    }

    pub fn set_bin_types_infinite_y(&mut self) {
        let item_y_sum: Length = self
            .item_types
            .iter()
            .map(|item_type| item_type.copies.max(1) * item_type.x.max(item_type.y).max(item_type.z))
            .sum();
        for bin_type in &mut self.bin_types {
            bin_type.y = item_y_sum.max(bin_type.y);
        }
    }

    pub fn set_item_types_infinite_copies(&mut self) {
        let volume_max = self.bin_types.iter().map(BinType::volume).max().unwrap_or(0);
        for item_type in &mut self.item_types {
            item_type.copies = (volume_max - 1) / item_type.volume() + 1;
        }
    }

    pub fn read_bin_types<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let mut reader = csv::Reader::from_path(path)?;
        for record in reader.deserialize() {
            let record: BinRecord = record?;
            let bin_type_id = self.add_bin_type(
                record.x,
                record.y,
                record.z,
                record.cost.unwrap_or(-1.0),
                record.copies.unwrap_or(1),
                record.copies_min.unwrap_or(0),
            )?;
            if let Some(maximum_weight) = record.maximum_weight {
                self.set_bin_type_maximum_weight(bin_type_id, maximum_weight);
            }
        }
        Ok(())
    }

    pub fn read_item_types<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let mut reader = csv::Reader::from_path(path)?;
        for record in reader.deserialize() {
            let record: ItemRecord = record?;
            let item_type_id = self.add_item_type(
                record.x,
                record.y,
                record.z,
                record.profit.unwrap_or(-1.0),
                record.copies.unwrap_or(1),
            )?;
            if let Some(weight) = record.weight {
                self.set_item_type_weight(item_type_id, weight);
            }
            if let Some(rotations) = record.rotations {
                self.set_item_type_rotations(item_type_id, rotations)?;
            } else if record.oriented.unwrap_or(0) != 0 {
                self.set_item_type_rotations(item_type_id, ROTATIONS_NONE)?;
            }
        }
        Ok(())
    }

    pub fn read_parameters<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let mut reader = csv::Reader::from_path(path)?;
        for record in reader.deserialize() {
            let record: ParameterRecord = record?;
            if record.name == "objective" {
                self.set_objective(record.value.parse()?);
            }
        }
        Ok(())
    }

    pub fn build(mut self) -> Result<Instance> {
        match self.objective {
            Objective::Default
            | Objective::BinPacking
            | Objective::BinPackingWithLeftovers
            | Objective::OpenDimensionX
            | Objective::OpenDimensionY
            | Objective::Knapsack
            | Objective::VariableSizedBinPacking => {}
            objective => {
                return Err(Error::ObjectiveUnsupported(objective, "cuboid"));
            }
        }
        if self.bin_types.is_empty() {
            return Err(Error::InvalidInput("instance has no bin type".into()));
        }

        let volume_max = self.bin_types.iter().map(BinType::volume).max().unwrap_or(0);
        let mut number_of_items = 0;
        let mut item_profit = 0.0;
        let mut item_volume = 0;
        let mut item_weight = 0.0;
        let mut max_efficiency_item_type_id: Option<ItemTypeId> = None;
        let mut max_efficiency = f64::NEG_INFINITY;
        let mut all_item_types_infinite_copies = true;
        for item_type in &mut self.item_types {
            let infinite_copies = (volume_max - 1) / item_type.volume() + 1;
            if item_type.copies == -1 {
                item_type.copies = infinite_copies;
            }
            number_of_items += item_type.copies;
            item_profit += item_type.copies as Profit * item_type.profit;
            item_volume += item_type.copies * item_type.volume();
            item_weight += item_type.copies as Weight * item_type.weight;
            let efficiency = item_type.profit / item_type.volume() as Profit;
            if efficiency > max_efficiency {
                max_efficiency = efficiency;
                max_efficiency_item_type_id = Some(item_type.id);
            }
            if item_type.copies < infinite_copies {
                all_item_types_infinite_copies = false;
            }
        }

        let mut bin_volume = 0;
        let mut bin_type_ids = Vec::new();
        let mut previous_bins_volume = Vec::new();
        let mut previous = 0;
        for bin_type in &mut self.bin_types {
            if bin_type.copies == -1 {
                bin_type.copies = number_of_items.max(1);
            }
            bin_volume += bin_type.copies * bin_type.volume();
            for _ in 0..bin_type.copies {
                bin_type_ids.push(bin_type.id);
                previous_bins_volume.push(previous);
                previous += bin_type.volume();
            }
        }

        Ok(Instance {
            objective: self.objective,
            item_types: self.item_types,
            bin_types: self.bin_types,
            number_of_items,
            item_profit,
            item_volume,
            item_weight,
            max_efficiency_item_type_id,
            all_item_types_infinite_copies,
            bin_volume,
            bin_type_ids,
            previous_bins_volume,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotations_permute_the_axes() {
        let mut builder = InstanceBuilder::new();
        builder.add_bin_type(100, 100, 100, -1.0, 1, 0).unwrap();
        builder.add_item_type(10, 20, 30, -1.0, 1).unwrap();
        let instance = builder.build().unwrap();
        let item_type = instance.item_type(0);

        let mut extents: Vec<(Length, Length, Length)> = (0..NUMBER_OF_ROTATIONS)
            .map(|r| (item_type.x(r), item_type.y(r), item_type.z(r)))
            .collect();
        extents.sort_unstable();
        extents.dedup();
        // Three distinct lengths give six distinct orientations.
        assert_eq!(extents.len(), 6);
        for r in 0..NUMBER_OF_ROTATIONS {
            let volume = item_type.x(r) * item_type.y(r) * item_type.z(r);
            assert_eq!(volume, item_type.volume());
        }
    }

    #[test]
    fn unique_rotations_deduplicate_equal_extents() {
        let mut builder = InstanceBuilder::new();
        builder.add_bin_type(100, 100, 100, -1.0, 1, 0).unwrap();
        builder.add_item_type(10, 10, 10, -1.0, 1).unwrap();
        builder.add_item_type(10, 10, 30, -1.0, 1).unwrap();
        let instance = builder.build().unwrap();

        assert_eq!(instance.item_type(0).unique_rotations(), vec![0]);
        assert_eq!(instance.item_type(1).unique_rotations().len(), 3);
    }

    #[test]
    fn oriented_items_keep_only_identity() {
        let mut builder = InstanceBuilder::new();
        builder.add_bin_type(100, 100, 100, -1.0, 1, 0).unwrap();
        builder.add_item_type(10, 20, 30, -1.0, 1).unwrap();
        builder.set_item_types_oriented();
        let instance = builder.build().unwrap();
        assert_eq!(instance.item_type(0).unique_rotations(), vec![0]);
    }

    #[test]
    fn empty_rotation_mask_is_rejected() {
        let mut builder = InstanceBuilder::new();
        builder.add_bin_type(100, 100, 100, -1.0, 1, 0).unwrap();
        builder.add_item_type(10, 20, 30, -1.0, 1).unwrap();
        assert!(builder.set_item_type_rotations(0, 0).is_err());
    }

    #[test]
    fn build_computes_aggregates() {
        let mut builder = InstanceBuilder::new();
        builder.set_objective(Objective::Knapsack);
        builder.add_bin_type(10, 10, 10, -1.0, 1, 0).unwrap();
        builder.add_item_type(10, 10, 10, 100.0, 1).unwrap();
        let instance = builder.build().unwrap();

        assert_eq!(instance.number_of_items(), 1);
        assert_eq!(instance.item_volume(), 1000);
        assert_eq!(instance.bin_volume(), 1000);
        assert_eq!(instance.item_profit(), 100.0);
        assert_eq!(instance.max_efficiency_item_type_id(), Some(0));
    }
}
