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
    /// Back-bottom-left corner.
    pub x: Length,
    pub y: Length,
    pub z: Length,
    pub rotation: usize,
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
    bin_volume: Volume,
    item_volume: Volume,
    item_profit: Profit,
    x_max: Length,
    y_max: Length,
    z_max: Length,
    volume: Volume,
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
            bin_volume: 0,
            item_volume: 0,
            item_profit: 0.0,
            x_max: 0,
            y_max: 0,
            z_max: 0,
            volume: 0,
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
        self.bin_volume += copies * bin_type.volume();
        self.x_max = 0;
        self.y_max = 0;
        self.z_max = 0;
        Ok(self.bins.len() - 1)
    }

    pub fn add_item(
        &mut self,
        bin_pos: BinPos,
        item_type_id: ItemTypeId,
        x: Length,
        y: Length,
        z: Length,
        rotation: usize,
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
        if !item_type.can_rotate(rotation) {
            return Err(Error::IllegalState(format!(
                "add_item: rotation {} of item type {} is forbidden",
                rotation, item_type_id
            )));
        }

        let xj = item_type.x(rotation);
        let yj = item_type.y(rotation);
        let zj = item_type.z(rotation);
        let xe = x + xj;
        let ye = y + yj;
        let ze = z + zj;

        let bin = &mut self.bins[bin_pos];
        let bin_type = self.instance.bin_type(bin.bin_type_id);

        // Containment.
        if x < 0 || y < 0 || z < 0 || xe > bin_type.x || ye > bin_type.y || ze > bin_type.z {
            self.feasible = false;
        }
        // Non-overlap with the items already in the bin.
        for other in &bin.items {
            let other_type = self.instance.item_type(other.item_type_id);
            let other_xe = other.x + other_type.x(other.rotation);
            let other_ye = other.y + other_type.y(other.rotation);
            let other_ze = other.z + other_type.z(other.rotation);
            if x < other_xe
                && other.x < xe
                && y < other_ye
                && other.y < ye
                && z < other_ze
                && other.z < ze
            {
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
            z,
            rotation,
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
        self.item_volume += copies * item_type.volume();
        self.item_profit += copies as Profit * item_type.profit;

        if bin_pos == self.bins.len() - 1 {
            self.x_max = self.x_max.max(xe);
            self.y_max = self.y_max.max(ye);
            self.z_max = self.z_max.max(ze);
            self.volume =
                self.bin_volume - bin_type.volume() + self.x_max * self.y_max * self.z_max;
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

    pub fn item_volume(&self) -> Volume {
        self.item_volume
    }

    /// Volume of the full previous bins plus the used envelope of the last.
    pub fn volume(&self) -> Volume {
        self.volume
    }

    pub fn waste(&self) -> Volume {
        self.volume - self.item_volume
    }

    pub fn full_waste(&self) -> Volume {
        self.bin_volume - self.item_volume
    }

    pub fn leftover_value(&self) -> Volume {
        self.bin_volume - self.volume
    }

    pub fn width(&self) -> Length {
        self.x_max
    }

    pub fn height(&self) -> Length {
        self.y_max
    }

    pub fn depth(&self) -> Length {
        self.z_max
    }

    pub fn full(&self) -> bool {
        self.number_of_items == self.instance.number_of_items()
    }

    pub fn feasible(&self) -> bool {
        self.feasible
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
                z: 0,
                lx: bin_type.x,
                ly: bin_type.y,
                lz: bin_type.z,
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
                    z: item.z,
                    lx: item_type.x(item.rotation),
                    ly: item_type.y(item.rotation),
                    lz: item_type.z(item.rotation),
                    rotation: item.rotation,
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
                    solution.add_item(
                        record.bin,
                        record.id,
                        record.x,
                        record.y,
                        record.z,
                        record.rotation,
                    )?;
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
    #[serde(rename = "Z")]
    z: Length,
    #[serde(rename = "LX")]
    lx: Length,
    #[serde(rename = "LY")]
    ly: Length,
    #[serde(rename = "LZ")]
    lz: Length,
    #[serde(rename = "ROTATION", default)]
    rotation: usize,
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
            "ItemVolume": self.item_volume(),
            "Profit": self.profit(),
            "Cost": self.cost(),
            "Waste": self.waste(),
            "FullWaste": self.full_waste(),
            "X": self.width(),
            "Y": self.height(),
            "Z": self.depth(),
            "Full": self.full(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cuboid::InstanceBuilder;

    fn knapsack_instance() -> Arc<Instance> {
        let mut builder = InstanceBuilder::new();
        builder.set_objective(Objective::Knapsack);
        builder.add_bin_type(10, 10, 10, -1.0, 1, 0).unwrap();
        builder.add_item_type(10, 10, 5, 60.0, 2).unwrap();
        Arc::new(builder.build().unwrap())
    }

    #[test]
    fn volume_tracks_the_envelope() {
        let instance = knapsack_instance();
        let mut solution = Solution::new(instance);
        let bin = solution.add_bin(0, 1).unwrap();
        solution.add_item(bin, 0, 0, 0, 0, 0).unwrap();
        assert_eq!(solution.volume(), 10 * 10 * 5);
        solution.add_item(bin, 0, 0, 0, 5, 0).unwrap();
        assert_eq!(solution.volume(), 1000);
        assert!(solution.feasible());
        assert!(solution.full());
        assert_eq!(solution.waste(), 0);
    }

    #[test]
    fn overlap_is_infeasible() {
        let instance = knapsack_instance();
        let mut solution = Solution::new(instance);
        let bin = solution.add_bin(0, 1).unwrap();
        solution.add_item(bin, 0, 0, 0, 0, 0).unwrap();
        solution.add_item(bin, 0, 0, 0, 4, 0).unwrap();
        assert!(!solution.feasible());
    }

    #[test]
    fn containment_is_checked_under_rotation() {
        let mut builder = InstanceBuilder::new();
        builder.add_bin_type(10, 10, 6, -1.0, 1, 0).unwrap();
        builder.add_item_type(10, 10, 5, -1.0, 1).unwrap();
        let instance = Arc::new(builder.build().unwrap());

        // Rotation 2 turns 10x10x5 into 5x10x10: 10 > 6 along z.
        let mut solution = Solution::new(instance);
        let bin = solution.add_bin(0, 1).unwrap();
        solution.add_item(bin, 0, 0, 0, 0, 2).unwrap();
        assert!(!solution.feasible());
    }
}
