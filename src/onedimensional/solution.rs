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
    /// Start coordinate, nesting already subtracted.
    pub start: Length,
}

#[derive(Clone, Debug)]
pub struct SolutionBin {
    pub bin_type_id: BinTypeId,
    pub copies: ItemPos,
    pub items: Vec<SolutionItem>,
    pub end: Length,
    pub weight: Weight,
    maximum_number_of_items: ItemPos,
    remaining_weight: Weight,
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
    bin_length: Volume,
    item_length: Volume,
    item_profit: Profit,
    length: Volume,
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
            bin_length: 0,
            item_length: 0,
            item_profit: 0.0,
            length: 0,
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
            end: 0,
            weight: 0.0,
            maximum_number_of_items: ItemPos::MAX,
            remaining_weight: f64::INFINITY,
        });
        self.number_of_bins += copies;
        self.bin_cost += copies as Profit * bin_type.cost;
        self.bin_length += copies * bin_type.length;
        Ok(self.bins.len() - 1)
    }

    pub fn add_item(&mut self, bin_pos: BinPos, item_type_id: ItemTypeId) -> Result<()> {
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
        let bin = &mut self.bins[bin_pos];
        let bin_type = self.instance.bin_type(bin.bin_type_id);

        let mut start = bin.end;
        if !bin.items.is_empty() {
            start -= item_type.nesting_length;
        }
        bin.end = start + item_type.length;
        if bin.end > bin_type.length {
            self.feasible = false;
        }

        bin.weight += item_type.weight;
        if bin.weight > bin_type.maximum_weight * PSTOL {
            self.feasible = false;
        }

        bin.items.push(SolutionItem {
            item_type_id,
            start,
        });

        if bin.items.len() == 1 {
            bin.maximum_number_of_items = item_type.maximum_stackability;
            bin.remaining_weight = item_type.maximum_weight_after;
        } else {
            bin.maximum_number_of_items = bin
                .maximum_number_of_items
                .min(item_type.maximum_stackability);
            bin.remaining_weight =
                (bin.remaining_weight - item_type.weight).min(item_type.maximum_weight_after);
        }
        if bin.items.len() as ItemPos > bin.maximum_number_of_items {
            self.feasible = false;
        }
        if bin.remaining_weight < -1e-9 {
            self.feasible = false;
        }

        let copies = bin.copies;
        let end = bin.end;
        self.number_of_items += copies;
        self.item_copies[item_type_id] += copies;
        if self.item_copies[item_type_id] > item_type.copies {
            return Err(Error::IllegalState(format!(
                "add_item: item type {} exceeds its {} copies",
                item_type_id, item_type.copies
            )));
        }
        self.item_length += copies * item_type.length;
        self.item_profit += copies as Profit * item_type.profit;

        if bin_pos == self.bins.len() - 1 {
            self.length = self.bin_length - bin_type.length + end;
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

    pub fn item_length(&self) -> Volume {
        self.item_length
    }

    /// Length up to the end of the last item of the last bin.
    pub fn length(&self) -> Volume {
        self.length
    }

    pub fn waste(&self) -> Volume {
        self.length - self.item_length
    }

    /// Waste counting the unused tail of the last bin.
    pub fn full_waste(&self) -> Volume {
        self.bin_length - self.item_length
    }

    pub fn full(&self) -> bool {
        self.number_of_items == self.instance.number_of_items()
    }

    /// All constraints hold: containment, weight, stackability, demand.
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
                lx: bin_type.length,
            })?;
            for item in &bin.items {
                let item_type = self.instance.item_type(item.item_type_id);
                writer.serialize(CertificateRecord {
                    kind: "ITEM".into(),
                    id: item.item_type_id,
                    copies: bin.copies,
                    bin: bin_pos,
                    x: item.start,
                    lx: item_type.length,
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
                    solution.add_item(record.bin, record.id)?;
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
    #[serde(rename = "LX")]
    lx: Length,
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
                self.waste() < other.waste()
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
            objective => unreachable!(
                "objective '{}' rejected at instance build",
                objective
            ),
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
                "bins {} waste {}",
                self.number_of_bins(),
                self.waste()
            ),
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
            objective => unreachable!(
                "objective '{}' rejected at instance build",
                objective
            ),
        }
    }

    fn to_json(&self) -> Value {
        json!({
            "NumberOfItems": self.number_of_items(),
            "NumberOfBins": self.number_of_bins(),
            "ItemLength": self.item_length(),
            "Profit": self.profit(),
            "Cost": self.cost(),
            "Waste": self.waste(),
            "FullWaste": self.full_waste(),
            "Full": self.full(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::onedimensional::InstanceBuilder;

    fn small_instance(objective: Objective) -> Arc<Instance> {
        let mut builder = InstanceBuilder::new();
        builder.set_objective(objective);
        builder.add_bin_type(10, -1.0, 2, 0).unwrap();
        builder.add_item_type(7, -1.0, 1).unwrap();
        builder.add_item_type(4, -1.0, 1).unwrap();
        Arc::new(builder.build().unwrap())
    }

    #[test]
    fn add_item_updates_aggregates() {
        let instance = small_instance(Objective::BinPacking);
        let mut solution = Solution::new(instance);
        let bin = solution.add_bin(0, 1).unwrap();
        solution.add_item(bin, 0).unwrap();
        let bin = solution.add_bin(0, 1).unwrap();
        solution.add_item(bin, 1).unwrap();

        assert_eq!(solution.number_of_bins(), 2);
        assert!(solution.full());
        assert!(solution.feasible());
        assert_eq!(solution.length(), 14);
        assert_eq!(solution.waste(), 3);
        assert_eq!(solution.full_waste(), 9);
    }

    #[test]
    fn add_item_to_missing_bin_fails() {
        let instance = small_instance(Objective::BinPacking);
        let mut solution = Solution::new(instance);
        assert!(solution.add_item(0, 0).is_err());
    }

    #[test]
    fn overfull_bin_is_infeasible() {
        let instance = small_instance(Objective::BinPacking);
        let mut solution = Solution::new(instance);
        let bin = solution.add_bin(0, 1).unwrap();
        solution.add_item(bin, 0).unwrap();
        solution.add_item(bin, 1).unwrap();
        assert!(!solution.feasible());
    }

    #[test]
    fn nesting_length_shortens_the_bin() {
        let mut builder = InstanceBuilder::new();
        builder.add_bin_type(10, -1.0, 1, 0).unwrap();
        builder.add_item_type(6, -1.0, 2).unwrap();
        builder.set_item_type_nesting_length(0, 2);
        let instance = Arc::new(builder.build().unwrap());

        let mut solution = Solution::new(instance);
        let bin = solution.add_bin(0, 1).unwrap();
        solution.add_item(bin, 0).unwrap();
        solution.add_item(bin, 0).unwrap();
        // Second item starts at 6 - 2 = 4 and ends at 10.
        assert_eq!(solution.bins()[0].items[1].start, 4);
        assert_eq!(solution.length(), 10);
        assert!(solution.feasible());
    }

    #[test]
    fn bin_packing_comparator_requires_fullness() {
        let instance = small_instance(Objective::BinPacking);

        let mut partial = Solution::new(instance.clone());
        let bin = partial.add_bin(0, 1).unwrap();
        partial.add_item(bin, 0).unwrap();

        let mut complete = Solution::new(instance);
        let bin = complete.add_bin(0, 1).unwrap();
        complete.add_item(bin, 0).unwrap();
        let bin = complete.add_bin(0, 1).unwrap();
        complete.add_item(bin, 1).unwrap();

        assert!(!partial.strictly_better(&complete));
        assert!(complete.strictly_better(&partial));
    }
}
