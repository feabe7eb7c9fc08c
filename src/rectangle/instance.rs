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

/// Forbidden axis-aligned sub-rectangle of a bin.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Defect {
    pub id: DefectId,
    pub x: Length,
    pub y: Length,
    pub lx: Length,
    pub ly: Length,
}

impl Defect {
    pub fn xe(&self) -> Length {
        self.x + self.lx
    }

    pub fn ye(&self) -> Length {
        self.y + self.ly
    }

    /// 'true' iff the open rectangle `[xs, xe) x [ys, ye)` meets the defect.
    pub fn intersects(&self, xs: Length, xe: Length, ys: Length, ye: Length) -> bool {
        xs < self.xe() && self.x < xe && ys < self.ye() && self.y < ye
    }
}

/// Axle positions and load limits of a semi-trailer bin.
#[derive(Copy, Clone, Debug)]
pub struct SemiTrailer {
    pub middle_axle_position: Length,
    pub rear_axle_position: Length,
    pub maximum_middle_axle_weight: Weight,
    pub maximum_rear_axle_weight: Weight,
}

impl SemiTrailer {
    /// Axle loads of a total `weight` whose centroid sits at `x`, by the
    /// lever rule between the two axles.
    pub fn axle_weights(&self, weight: Weight, x: f64) -> (Weight, Weight) {
        let span = (self.rear_axle_position - self.middle_axle_position) as f64;
        let rear = weight * (x - self.middle_axle_position as f64) / span;
        let middle = weight - rear;
        (middle, rear)
    }

    pub fn satisfied(&self, weight: Weight, x: f64) -> bool {
        if weight <= 0.0 {
            return true;
        }
        let (middle, rear) = self.axle_weights(weight, x);
        middle <= self.maximum_middle_axle_weight * PSTOL
            && rear <= self.maximum_rear_axle_weight * PSTOL
    }
}

#[derive(Clone, Debug)]
pub struct ItemType {
    pub id: ItemTypeId,
    pub x: Length,
    pub y: Length,
    /// 'true' iff the item must not be rotated.
    pub oriented: bool,
    pub profit: Profit,
    pub copies: ItemPos,
    pub weight: Weight,
    /// Unloading group; higher groups leave the bin first.
    pub group_id: GroupId,
}

impl ItemType {
    pub fn x(&self, rotate: bool) -> Length {
        if rotate {
            self.y
        } else {
            self.x
        }
    }

    pub fn y(&self, rotate: bool) -> Length {
        if rotate {
            self.x
        } else {
            self.y
        }
    }

    pub fn area(&self) -> Area {
        self.x * self.y
    }

    pub fn can_rotate(&self, rotate: bool) -> bool {
        !rotate || !self.oriented
    }
}

#[derive(Clone, Debug)]
pub struct BinType {
    pub id: BinTypeId,
    pub x: Length,
    pub y: Length,
    pub cost: Profit,
    pub copies: ItemPos,
    pub copies_min: ItemPos,
    pub maximum_weight: Weight,
    pub semi_trailer: Option<SemiTrailer>,
    pub defects: Vec<Defect>,
}

impl BinType {
    pub fn area(&self) -> Area {
        self.x * self.y
    }
}

/// Instance-level parameters.
#[derive(Copy, Clone, Debug, Default)]
pub struct InstanceParameters {
    pub unloading_constraint: UnloadingConstraint,
}

/// Frozen problem description shared read-only by all scheme nodes.
#[derive(Debug)]
pub struct Instance {
    objective: Objective,
    parameters: InstanceParameters,
    item_types: Vec<ItemType>,
    bin_types: Vec<BinType>,

    number_of_items: ItemPos,
    number_of_groups: usize,
    item_profit: Profit,
    item_area: Area,
    item_weight: Weight,
    max_efficiency_item_type_id: Option<ItemTypeId>,
    all_item_types_infinite_copies: bool,
    bin_area: Area,
    bin_type_ids: Vec<BinTypeId>,
    previous_bins_area: Vec<Area>,
}

impl Instance {
    pub fn objective(&self) -> Objective {
        self.objective
    }

    pub fn parameters(&self) -> &InstanceParameters {
        &self.parameters
    }

    pub fn unloading_constraint(&self) -> UnloadingConstraint {
        self.parameters.unloading_constraint
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

    pub fn number_of_groups(&self) -> usize {
        self.number_of_groups
    }

    pub fn number_of_bins(&self) -> BinPos {
        self.bin_type_ids.len()
    }

    pub fn bin_type_id(&self, bin_pos: BinPos) -> BinTypeId {
        self.bin_type_ids[bin_pos]
    }

    pub fn previous_bins_area(&self, bin_pos: BinPos) -> Area {
        self.previous_bins_area[bin_pos]
    }

    pub fn item_area(&self) -> Area {
        self.item_area
    }

    pub fn item_profit(&self) -> Profit {
        self.item_profit
    }

    pub fn item_weight(&self) -> Weight {
        self.item_weight
    }

    pub fn bin_area(&self) -> Area {
        self.bin_area
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
    #[serde(rename = "PROFIT", default)]
    profit: Option<Profit>,
    #[serde(rename = "COPIES", default)]
    copies: Option<ItemPos>,
    #[serde(rename = "WEIGHT", default)]
    weight: Option<Weight>,
    #[serde(rename = "ORIENTED", default)]
    oriented: Option<u8>,
    #[serde(rename = "GROUP_ID", default)]
    group_id: Option<GroupId>,
}

#[derive(Debug, Deserialize)]
struct DefectRecord {
    #[serde(rename = "BIN_TYPE")]
    bin_type_id: BinTypeId,
    #[serde(rename = "X")]
    x: Length,
    #[serde(rename = "Y")]
    y: Length,
    #[serde(rename = "LX")]
    lx: Length,
    #[serde(rename = "LY")]
    ly: Length,
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
    parameters: InstanceParameters,
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
            parameters: InstanceParameters::default(),
            item_types: Vec::new(),
            bin_types: Vec::new(),
        }
    }

    pub fn set_objective(&mut self, objective: Objective) {
        self.objective = objective;
    }

    pub fn set_unloading_constraint(&mut self, unloading_constraint: UnloadingConstraint) {
        self.parameters.unloading_constraint = unloading_constraint;
    }

    pub fn add_bin_type(
        &mut self,
        x: Length,
        y: Length,
        cost: Profit,
        copies: ItemPos,
        copies_min: ItemPos,
    ) -> Result<BinTypeId> {
        if x <= 0 || y <= 0 {
            return Err(Error::ConstraintViolation(format!(
                "bin type lengths must be > 0, got {}x{}",
                x, y
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
            cost: if cost == -1.0 { (x * y) as Profit } else { cost },
            copies,
            copies_min,
            maximum_weight: f64::INFINITY,
            semi_trailer: None,
            defects: Vec::new(),
        });
        Ok(id)
    }

    pub fn set_bin_type_maximum_weight(&mut self, bin_type_id: BinTypeId, maximum_weight: Weight) {
        self.bin_types[bin_type_id].maximum_weight = maximum_weight;
    }

    pub fn set_bin_type_semi_trailer(&mut self, bin_type_id: BinTypeId, semi_trailer: SemiTrailer) {
        self.bin_types[bin_type_id].semi_trailer = Some(semi_trailer);
    }

    pub fn add_defect(
        &mut self,
        bin_type_id: BinTypeId,
        x: Length,
        y: Length,
        lx: Length,
        ly: Length,
    ) -> Result<DefectId> {
        if bin_type_id >= self.bin_types.len() {
            return Err(Error::InvalidInput(format!(
                "defect references unknown bin type {}",
                bin_type_id
            )));
        }
        if lx <= 0 || ly <= 0 {
            return Err(Error::ConstraintViolation(format!(
                "defect lengths must be > 0, got {}x{}",
                lx, ly
            )));
        }
        let bin_type = &mut self.bin_types[bin_type_id];
        if x < 0 || y < 0 || x + lx > bin_type.x || y + ly > bin_type.y {
            return Err(Error::ConstraintViolation(format!(
                "defect ({}, {}) {}x{} lies outside bin type {}",
                x, y, lx, ly, bin_type_id
            )));
        }
        let id = bin_type.defects.len();
        bin_type.defects.push(Defect { id, x, y, lx, ly });
        Ok(id)
    }

    pub fn add_item_type(
        &mut self,
        x: Length,
        y: Length,
        profit: Profit,
        copies: ItemPos,
    ) -> Result<ItemTypeId> {
        if x <= 0 || y <= 0 {
            return Err(Error::ConstraintViolation(format!(
                "item type lengths must be > 0, got {}x{}",
                x, y
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
            oriented: false,
            profit: if profit == -1.0 { (x * y) as Profit } else { profit },
            copies,
            weight: 0.0,
            group_id: 0,
        });
        Ok(id)
    }

    pub fn set_item_type_oriented(&mut self, item_type_id: ItemTypeId, oriented: bool) {
        self.item_types[item_type_id].oriented = oriented;
    }

    pub fn set_item_type_weight(&mut self, item_type_id: ItemTypeId, weight: Weight) {
        self.item_types[item_type_id].weight = weight;
    }

    pub fn set_item_type_group(&mut self, item_type_id: ItemTypeId, group_id: GroupId) {
        self.item_types[item_type_id].group_id = group_id;
    }

    pub fn set_item_types_oriented(&mut self) {
        for item_type in &mut self.item_types {
            item_type.oriented = true;
        }
    }

    pub fn set_item_types_unweighted(&mut self) {
        for item_type in &mut self.item_types {
            item_type.weight = 0.0;
        }
    }

    pub fn set_item_types_profits_auto(&mut self) {
        for item_type in &mut self.item_types {
            item_type.profit = item_type.area() as Profit;
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

    /// Stretch every bin along x; used by the open dimension objectives.
    pub fn set_bin_types_infinite_x(&mut self) {
        let item_x_sum: Length = self
            .item_types
            .iter()
            .map(|item_type| item_type.copies.max(1) * item_type.x.max(item_type.y))
            .sum();
        for bin_type in &mut self.bin_types {
            bin_type.x = item_x_sum.max(bin_type.x);
        }
    }

    pub fn set_bin_types_infinite_y(&mut self) {
        let item_y_sum: Length = self
            .item_types
            .iter()
            .map(|item_type| item_type.copies.max(1) * item_type.x.max(item_type.y))
            .sum();
        for bin_type in &mut self.bin_types {
            bin_type.y = item_y_sum.max(bin_type.y);
        }
    }

    pub fn set_item_types_infinite_copies(&mut self) {
        let area_max = self.bin_types.iter().map(BinType::area).max().unwrap_or(0);
        for item_type in &mut self.item_types {
            item_type.copies = (area_max - 1) / item_type.area() + 1;
        }
    }

    pub fn read_bin_types<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let mut reader = csv::Reader::from_path(path)?;
        for record in reader.deserialize() {
            let record: BinRecord = record?;
            let bin_type_id = self.add_bin_type(
                record.x,
                record.y,
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
                record.profit.unwrap_or(-1.0),
                record.copies.unwrap_or(1),
            )?;
            if let Some(weight) = record.weight {
                self.set_item_type_weight(item_type_id, weight);
            }
            if record.oriented.unwrap_or(0) != 0 {
                self.set_item_type_oriented(item_type_id, true);
            }
            if let Some(group_id) = record.group_id {
                self.set_item_type_group(item_type_id, group_id);
            }
        }
        Ok(())
    }

    pub fn read_defects<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let mut reader = csv::Reader::from_path(path)?;
        for record in reader.deserialize() {
            let record: DefectRecord = record?;
            self.add_defect(record.bin_type_id, record.x, record.y, record.lx, record.ly)?;
        }
        Ok(())
    }

    pub fn read_parameters<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let mut reader = csv::Reader::from_path(path)?;
        for record in reader.deserialize() {
            let record: ParameterRecord = record?;
            match record.name.as_str() {
                "objective" => self.set_objective(record.value.parse()?),
                "unloading_constraint" => {
                    self.set_unloading_constraint(record.value.parse()?)
                }
                _ => {}
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
                return Err(Error::ObjectiveUnsupported(objective, "rectangle"));
            }
        }
        if self.bin_types.is_empty() {
            return Err(Error::InvalidInput("instance has no bin type".into()));
        }

        let area_max = self.bin_types.iter().map(BinType::area).max().unwrap_or(0);
        let mut number_of_items = 0;
        let mut number_of_groups = 1;
        let mut item_profit = 0.0;
        let mut item_area = 0;
        let mut item_weight = 0.0;
        let mut max_efficiency_item_type_id: Option<ItemTypeId> = None;
        let mut max_efficiency = f64::NEG_INFINITY;
        let mut all_item_types_infinite_copies = true;
        for item_type in &mut self.item_types {
            let infinite_copies = (area_max - 1) / item_type.area() + 1;
            if item_type.copies == -1 {
                item_type.copies = infinite_copies;
            }
            number_of_items += item_type.copies;
            number_of_groups = number_of_groups.max(item_type.group_id + 1);
            item_profit += item_type.copies as Profit * item_type.profit;
            item_area += item_type.copies * item_type.area();
            item_weight += item_type.copies as Weight * item_type.weight;
            let efficiency = item_type.profit / item_type.area() as Profit;
            if efficiency > max_efficiency {
                max_efficiency = efficiency;
                max_efficiency_item_type_id = Some(item_type.id);
            }
            if item_type.copies < infinite_copies {
                all_item_types_infinite_copies = false;
            }
        }

        let mut bin_area = 0;
        let mut bin_type_ids = Vec::new();
        let mut previous_bins_area = Vec::new();
        let mut previous = 0;
        for bin_type in &mut self.bin_types {
            if bin_type.copies == -1 {
                bin_type.copies = number_of_items.max(1);
            }
            bin_area += bin_type.copies * bin_type.area();
            for _ in 0..bin_type.copies {
                bin_type_ids.push(bin_type.id);
                previous_bins_area.push(previous);
                previous += bin_type.area();
            }
        }

        Ok(Instance {
            objective: self.objective,
            parameters: self.parameters,
            item_types: self.item_types,
            bin_types: self.bin_types,
            number_of_items,
            number_of_groups,
            item_profit,
            item_area,
            item_weight,
            max_efficiency_item_type_id,
            all_item_types_infinite_copies,
            bin_area,
            bin_type_ids,
            previous_bins_area,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defect_must_lie_inside_its_bin() {
        let mut builder = InstanceBuilder::new();
        builder.add_bin_type(100, 50, -1.0, 1, 0).unwrap();
        assert!(builder.add_defect(0, 90, 40, 20, 5).is_err());
        assert!(builder.add_defect(0, 90, 40, 5, 5).is_ok());
        assert!(builder.add_defect(1, 0, 0, 5, 5).is_err());
    }

    #[test]
    fn defect_intersection_is_half_open() {
        let defect = Defect {
            id: 0,
            x: 100,
            y: 50,
            lx: 20,
            ly: 10,
        };
        assert!(defect.intersects(0, 1000, 0, 500));
        // Touching at the defect's start is not an overlap.
        assert!(!defect.intersects(0, 100, 0, 500));
        assert!(!defect.intersects(120, 1000, 0, 500));
    }

    #[test]
    fn build_computes_aggregates() {
        let mut builder = InstanceBuilder::new();
        builder.add_bin_type(6000, 3210, -1.0, 1, 0).unwrap();
        builder.add_item_type(1000, 500, -1.0, 1).unwrap();
        builder.add_item_type(250, 1000, 500_000.0, 2).unwrap();
        let instance = builder.build().unwrap();

        assert_eq!(instance.number_of_items(), 3);
        assert_eq!(instance.item_area(), 1000 * 500 + 2 * 250 * 1000);
        assert_eq!(instance.bin_area(), 6000 * 3210);
        // Item 1: 500000 / 250000 = 2 profit per unit area.
        assert_eq!(instance.max_efficiency_item_type_id(), Some(1));
    }

    #[test]
    fn semi_trailer_lever_rule() {
        let semi_trailer = SemiTrailer {
            middle_axle_position: 0,
            rear_axle_position: 100,
            maximum_middle_axle_weight: 60.0,
            maximum_rear_axle_weight: 60.0,
        };
        let (middle, rear) = semi_trailer.axle_weights(100.0, 50.0);
        assert!((middle - 50.0).abs() < 1e-9);
        assert!((rear - 50.0).abs() < 1e-9);
        assert!(semi_trailer.satisfied(100.0, 50.0));
        // All the weight near the rear axle overloads it.
        assert!(!semi_trailer.satisfied(100.0, 95.0));
    }
}
