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
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::instance::Instance;
use crate::common::*;
use crate::format::ProgressDisplay;
use crate::pool::PoolSolution;

#[derive(Clone, Debug)]
pub struct SolutionItem {
    pub item_type_id: ItemTypeId,
    /// Bottom-left corner.
    pub x: Length,
    pub y: Length,
    pub rotate: bool,
}

#[derive(Clone, Debug)]
pub struct SolutionBin {
    pub bin_type_id: BinTypeId,
    pub copies: ItemPos,
    pub items: Vec<SolutionItem>,
    pub weight: Weight,
}

/// Replayable packing; append-only within one pass.
#[derive(Clone)]
pub struct Solution {
    instance: Arc<Instance>,
    bins: Vec<SolutionBin>,
    number_of_bins: ItemPos,
    number_of_items: ItemPos,
    item_copies: Vec<ItemPos>,
    bin_cost: Profit,
    bin_area: Area,
    item_area: Area,
    item_profit: Profit,
    x_max: Length,
    y_max: Length,
    area: Area,
    feasible: bool,
}

impl Solution {
    pub fn new(instance: Arc<Instance>) -> Self {
        let number_of_item_types = instance.number_of_item_types();
        Solution {
            instance,
            bins: Vec::new(),
            number_of_bins: 0,
            number_of_items: 0,
            item_copies: vec![0; number_of_item_types],
            bin_cost: 0.0,
            bin_area: 0,
            item_area: 0,
            item_profit: 0.0,
            x_max: 0,
            y_max: 0,
            area: 0,
            feasible: true,
        }
    }

    pub fn instance(&self) -> &Arc<Instance> {
        &self.instance
    }

    pub fn add_bin(&mut self, bin_type_id: BinTypeId, copies: ItemPos) -> Result<BinPos> {
        if bin_type_id >= self.instance.number_of_bin_types() {
            return Err(Error::IllegalState(format!(
                "add_bin: unknown bin type {}",
                bin_type_id
            )));
        }
        let bin_type = self.instance.bin_type(bin_type_id);
        self.bins.push(SolutionBin {
            bin_type_id,
            copies,
            items: Vec::new(),
            weight: 0.0,
        });
        self.number_of_bins += copies;
        self.bin_cost += copies as Profit * bin_type.cost;
        self.bin_area += copies * bin_type.area();
        self.x_max = 0;
        self.y_max = 0;
        Ok(self.bins.len() - 1)
    }

    pub fn add_item(
        &mut self,
        bin_pos: BinPos,
        item_type_id: ItemTypeId,
        x: Length,
        y: Length,
        rotate: bool,
    ) -> Result<()> {
        if bin_pos >= self.bins.len() {
            return Err(Error::IllegalState(format!(
                "add_item: bin {} does not exist",
                bin_pos
            )));
        }
        if item_type_id >= self.instance.number_of_item_types() {
            return Err(Error::IllegalState(format!(
                "add_item: unknown item type {}",
                item_type_id
            )));
        }
        let item_type = self.instance.item_type(item_type_id).clone();
        if !item_type.can_rotate(rotate) {
            return Err(Error::IllegalState(format!(
                "add_item: item type {} is oriented",
                item_type_id
            )));
        }

        let xj = item_type.x(rotate);
        let yj = item_type.y(rotate);
        let xe = x + xj;
        let ye = y + yj;

        let bin = &mut self.bins[bin_pos];
        let bin_type = self.instance.bin_type(bin.bin_type_id);

        // Containment.
        if x < 0 || y < 0 || xe > bin_type.x || ye > bin_type.y {
            self.feasible = false;
        }
        // Non-overlap with the items already in the bin.
        for other in &bin.items {
            let other_type = self.instance.item_type(other.item_type_id);
            let other_xe = other.x + other_type.x(other.rotate);
            let other_ye = other.y + other_type.y(other.rotate);
            if x < other_xe && other.x < xe && y < other_ye && other.y < ye {
                self.feasible = false;
            }
        }
        // Non-overlap with the defects of the bin.
        for defect in &bin_type.defects {
            if defect.intersects(x, xe, y, ye) {
                self.feasible = false;
            }
        }

        bin.weight += item_type.weight;
        if bin.weight > bin_type.maximum_weight * PSTOL {
            self.feasible = false;
        }

        bin.items.push(SolutionItem {
            item_type_id,
            x,
            y,
            rotate,
        });

        let copies = bin.copies;
        self.number_of_items += copies;
        self.item_copies[item_type_id] += copies;
        if self.item_copies[item_type_id] > item_type.copies {
            return Err(Error::IllegalState(format!(
                "add_item: item type {} exceeds its {} copies",
                item_type_id, item_type.copies
            )));
        }
        self.item_area += copies * item_type.area();
        self.item_profit += copies as Profit * item_type.profit;

        if bin_pos == self.bins.len() - 1 {
            self.x_max = self.x_max.max(xe);
            self.y_max = self.y_max.max(ye);
            self.area = self.bin_area - bin_type.area() + self.x_max * self.y_max;
        }
        Ok(())
    }

    pub fn bins(&self) -> &[SolutionBin] {
        &self.bins
    }

    pub fn number_of_bins(&self) -> ItemPos {
        self.number_of_bins
    }

    pub fn number_of_items(&self) -> ItemPos {
        self.number_of_items
    }

    pub fn profit(&self) -> Profit {
        self.item_profit
    }

    pub fn cost(&self) -> Profit {
        self.bin_cost
    }

    pub fn item_area(&self) -> Area {
        self.item_area
    }

    /// Area of the full previous bins plus the used envelope of the last.
    pub fn area(&self) -> Area {
        self.area
    }

    pub fn waste(&self) -> Area {
        self.area - self.item_area
    }

    pub fn full_waste(&self) -> Area {
        self.bin_area - self.item_area
    }

    pub fn leftover_value(&self) -> Area {
        self.bin_area - self.area
    }

    /// Used x length of the last bin.
    pub fn width(&self) -> Length {
        self.x_max
    }

    pub fn height(&self) -> Length {
        self.y_max
    }

    pub fn full(&self) -> bool {
        self.number_of_items == self.instance.number_of_items()
    }

    pub fn feasible(&self) -> bool {
        self.feasible && self.unloading_constraints_satisfied()
    }

    fn unloading_constraints_satisfied(&self) -> bool {
        let constraint = self.instance.unloading_constraint();
        if constraint == UnloadingConstraint::None {
            return true;
        }
        for bin in &self.bins {
            for (pos, item) in bin.items.iter().enumerate() {
                let item_type = self.instance.item_type(item.item_type_id);
                let xe = item.x + item_type.x(item.rotate);
                let ye = item.y + item_type.y(item.rotate);
                for other in &bin.items[pos + 1..] {
                    let other_type = self.instance.item_type(other.item_type_id);
                    let other_xe = other.x + other_type.x(other.rotate);
                    let other_ye = other.y + other_type.y(other.rotate);
                    let ordered = |va: Length, ga: GroupId, vb: Length, gb: GroupId| {
                        (va > vb || ga <= gb) && (vb > va || gb <= ga)
                    };
                    let ok = match constraint {
                        UnloadingConstraint::None => true,
                        UnloadingConstraint::IncreasingX => ordered(
                            item.x,
                            item_type.group_id,
                            other.x,
                            other_type.group_id,
                        ),
                        UnloadingConstraint::IncreasingY => ordered(
                            item.y,
                            item_type.group_id,
                            other.y,
                            other_type.group_id,
                        ),
                        UnloadingConstraint::OnlyXMovements => {
                            // Only pairs sharing y levels block each other.
                            if item.y < other_ye && other.y < ye {
                                ordered(
                                    item.x,
                                    item_type.group_id,
                                    other.x,
                                    other_type.group_id,
                                )
                            } else {
                                true
                            }
                        }
                        UnloadingConstraint::OnlyYMovements => {
                            if item.x < other_xe && other.x < xe {
                                ordered(
                                    item.y,
                                    item_type.group_id,
                                    other.y,
                                    other_type.group_id,
                                )
                            } else {
                                true
                            }
                        }
                    };
                    if !ok {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// Write the certificate file.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        for (bin_pos, bin) in self.bins.iter().enumerate() {
            let bin_type = self.instance.bin_type(bin.bin_type_id);
            writer.serialize(CertificateRecord {
                kind: "BIN".into(),
                id: bin.bin_type_id,
                copies: bin.copies,
                bin: bin_pos,
                x: 0,
                y: 0,
                lx: bin_type.x,
                ly: bin_type.y,
                rotation: 0,
            })?;
            for item in &bin.items {
                let item_type = self.instance.item_type(item.item_type_id);
                writer.serialize(CertificateRecord {
                    kind: "ITEM".into(),
                    id: item.item_type_id,
                    copies: bin.copies,
                    bin: bin_pos,
                    x: item.x,
                    y: item.y,
                    lx: item_type.x(item.rotate),
                    ly: item_type.y(item.rotate),
                    rotation: item.rotate as u8,
                })?;
            }
        }
        writer.flush()?;
        Ok(())
    }

    /// Rebuild a solution from a certificate file.
    pub fn read<P: AsRef<Path>>(instance: Arc<Instance>, path: P) -> Result<Solution> {
        let mut solution = Solution::new(instance);
        let mut reader = csv::Reader::from_path(path)?;
        for record in reader.deserialize() {
            let record: CertificateRecord = record?;
            match record.kind.as_str() {
                "BIN" => {
                    solution.add_bin(record.id, record.copies)?;
                }
                "ITEM" => {
                    solution.add_item(record.bin, record.id, record.x, record.y, record.rotation != 0)?;
                }
                kind => {
                    return Err(Error::InvalidInput(format!(
                        "unknown certificate row type '{}'",
                        kind
                    )));
                }
            }
        }
        Ok(solution)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CertificateRecord {
    #[serde(rename = "TYPE")]
    kind: String,
    #[serde(rename = "ID")]
    id: usize,
    #[serde(rename = "COPIES")]
    copies: ItemPos,
    #[serde(rename = "BIN")]
    bin: BinPos,
    #[serde(rename = "X")]
    x: Length,
    #[serde(rename = "Y")]
    y: Length,
    #[serde(rename = "LX")]
    lx: Length,
    #[serde(rename = "LY")]
    ly: Length,
    #[serde(rename = "ROTATION", default)]
    rotation: u8,
}

impl PoolSolution for Solution {
    fn strictly_better(&self, other: &Self) -> bool {
        match self.instance.objective() {
            Objective::Default => {
                if self.profit() != other.profit() {
                    return self.profit() > other.profit();
                }
                self.waste() < other.waste()
            }
            Objective::BinPacking => {
                if !self.full() {
                    return false;
                }
                if !other.full() {
                    return true;
                }
                self.number_of_bins() < other.number_of_bins()
            }
            Objective::BinPackingWithLeftovers => {
                if !self.full() {
                    return false;
                }
                if !other.full() {
                    return true;
                }
                if self.number_of_bins() != other.number_of_bins() {
                    return self.number_of_bins() < other.number_of_bins();
                }
                self.leftover_value() > other.leftover_value()
            }
            Objective::OpenDimensionX => {
                if !self.full() {
                    return false;
                }
                if !other.full() {
                    return true;
                }
                self.width() < other.width()
            }
            Objective::OpenDimensionY => {
                if !self.full() {
                    return false;
                }
                if !other.full() {
                    return true;
                }
                self.height() < other.height()
            }
            Objective::Knapsack => self.profit() > other.profit(),
            Objective::VariableSizedBinPacking => {
                if !self.full() {
                    return false;
                }
                if !other.full() {
                    return true;
                }
                strictly_lesser(self.cost(), other.cost())
            }
        }
    }

    fn item_copies(&self) -> &[ItemPos] {
        &self.item_copies
    }
}

impl ProgressDisplay for Solution {
    fn progress_line(&self) -> String {
        match self.instance.objective() {
            Objective::Default => format!(
                "profit {} full {} waste {}",
                self.profit(),
                self.full(),
                self.waste()
            ),
            Objective::BinPacking => format!(
                "bins {} full waste {}",
                self.number_of_bins(),
                self.full_waste()
            ),
            Objective::BinPackingWithLeftovers => format!(
                "bins {} leftover {}",
                self.number_of_bins(),
                self.leftover_value()
            ),
            Objective::OpenDimensionX => format!("x {}", self.width()),
            Objective::OpenDimensionY => format!("y {}", self.height()),
            Objective::Knapsack => format!(
                "profit {} items {}",
                self.profit(),
                self.number_of_items()
            ),
            Objective::VariableSizedBinPacking => format!(
                "cost {} bins {}",
                self.cost(),
                self.number_of_bins()
            ),
        }
    }

    fn to_json(&self) -> Value {
        json!({
            "NumberOfItems": self.number_of_items(),
            "NumberOfBins": self.number_of_bins(),
            "ItemArea": self.item_area(),
            "Profit": self.profit(),
            "Cost": self.cost(),
            "Waste": self.waste(),
            "FullWaste": self.full_waste(),
            "X": self.width(),
            "Y": self.height(),
            "Full": self.full(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rectangle::InstanceBuilder;

    fn instance_6000_3210(objective: Objective) -> Arc<Instance> {
        let mut builder = InstanceBuilder::new();
        builder.set_objective(objective);
        builder.add_bin_type(6000, 3210, -1.0, 2, 0).unwrap();
        builder.add_item_type(1000, 500, -1.0, 2).unwrap();
        builder.add_item_type(250, 1000, -1.0, 1).unwrap();
        Arc::new(builder.build().unwrap())
    }

    #[test]
    fn area_tracks_the_envelope() {
        let instance = instance_6000_3210(Objective::BinPackingWithLeftovers);
        let mut solution = Solution::new(instance);
        let bin = solution.add_bin(0, 1).unwrap();
        solution.add_item(bin, 0, 0, 0, false).unwrap();
        solution.add_item(bin, 1, 1000, 0, false).unwrap();
        assert_eq!(solution.area(), 1250 * 1000);
        assert_eq!(solution.waste(), 1250 * 1000 - 500_000 - 250_000);
        assert!(solution.feasible());
    }

    #[test]
    fn overlap_is_infeasible() {
        let instance = instance_6000_3210(Objective::Default);
        let mut solution = Solution::new(instance);
        let bin = solution.add_bin(0, 1).unwrap();
        solution.add_item(bin, 0, 0, 0, false).unwrap();
        solution.add_item(bin, 0, 999, 0, false).unwrap();
        assert!(!solution.feasible());
    }

    #[test]
    fn defect_overlap_is_infeasible() {
        let mut builder = InstanceBuilder::new();
        builder.add_bin_type(6000, 3210, -1.0, 1, 0).unwrap();
        builder.add_defect(0, 100, 50, 20, 10).unwrap();
        builder.add_item_type(1000, 500, -1.0, 1).unwrap();
        let instance = Arc::new(builder.build().unwrap());

        let mut solution = Solution::new(instance);
        let bin = solution.add_bin(0, 1).unwrap();
        solution.add_item(bin, 0, 0, 0, false).unwrap();
        assert!(!solution.feasible());
    }

    #[test]
    fn oriented_item_cannot_rotate() {
        let mut builder = InstanceBuilder::new();
        builder.add_bin_type(6000, 3210, -1.0, 1, 0).unwrap();
        builder.add_item_type(1000, 500, -1.0, 1).unwrap();
        builder.set_item_type_oriented(0, true);
        let instance = Arc::new(builder.build().unwrap());

        let mut solution = Solution::new(instance);
        let bin = solution.add_bin(0, 1).unwrap();
        assert!(solution.add_item(bin, 0, 0, 0, true).is_err());
    }

    #[test]
    fn increasing_x_orders_groups() {
        let mut builder = InstanceBuilder::new();
        builder.set_unloading_constraint(UnloadingConstraint::IncreasingX);
        builder.add_bin_type(6000, 3210, -1.0, 1, 0).unwrap();
        builder.add_item_type(1000, 500, -1.0, 1).unwrap();
        builder.set_item_type_group(0, 1);
        builder.add_item_type(1000, 500, -1.0, 1).unwrap();
        builder.set_item_type_group(1, 0);
        let instance = Arc::new(builder.build().unwrap());

        // Group 1 before group 0 along x: infeasible.
        let mut solution = Solution::new(instance.clone());
        let bin = solution.add_bin(0, 1).unwrap();
        solution.add_item(bin, 0, 0, 0, false).unwrap();
        solution.add_item(bin, 1, 1000, 0, false).unwrap();
        assert!(!solution.feasible());

        let mut solution = Solution::new(instance);
        let bin = solution.add_bin(0, 1).unwrap();
        solution.add_item(bin, 1, 0, 0, false).unwrap();
        solution.add_item(bin, 0, 1000, 0, false).unwrap();
        assert!(solution.feasible());
    }

    #[test]
    fn open_dimension_x_compares_width() {
        let instance = instance_6000_3210(Objective::OpenDimensionX);

        let mut narrow = Solution::new(instance.clone());
        let bin = narrow.add_bin(0, 1).unwrap();
        narrow.add_item(bin, 0, 0, 0, false).unwrap();
        narrow.add_item(bin, 0, 0, 500, false).unwrap();
        narrow.add_item(bin, 1, 0, 1000, false).unwrap();

        let mut wide = Solution::new(instance);
        let bin = wide.add_bin(0, 1).unwrap();
        wide.add_item(bin, 0, 0, 0, false).unwrap();
        wide.add_item(bin, 0, 1000, 0, false).unwrap();
        wide.add_item(bin, 1, 2000, 0, false).unwrap();

        assert!(narrow.full() && wide.full());
        assert_eq!(narrow.width(), 1000);
        assert_eq!(wide.width(), 2250);
        assert!(narrow.strictly_better(&wide));
        assert!(!wide.strictly_better(&narrow));
    }
}
