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

/// Type of the items to pack end to end.
#[derive(Clone, Debug)]
pub struct ItemType {
    pub id: ItemTypeId,
    pub length: Length,
    pub profit: Profit,
    pub copies: ItemPos,
    pub weight: Weight,
    /// Length saved when the item is inserted after another one.
    pub nesting_length: Length,
    /// Maximum number of items in a bin containing this item.
    pub maximum_stackability: ItemPos,
    /// Maximum weight allowed after this item in its bin.
    pub maximum_weight_after: Weight,
    pub eligibility_id: Option<EligibilityId>,
}

/// Type of the bins items are packed into.
#[derive(Clone, Debug)]
pub struct BinType {
    pub id: BinTypeId,
    pub length: Length,
    pub cost: Profit,
    pub copies: ItemPos,
    pub copies_min: ItemPos,
    pub maximum_weight: Weight,
    pub eligibility_ids: Vec<EligibilityId>,
    /// Item types allowed in this bin, computed at build time.
    pub item_type_ids: Vec<ItemTypeId>,
}

/// Frozen problem description shared read-only by all scheme nodes.
#[derive(Debug)]
pub struct Instance {
    objective: Objective,
    item_types: Vec<ItemType>,
    bin_types: Vec<BinType>,

    number_of_items: ItemPos,
    item_profit: Profit,
    item_length: Volume,
    max_efficiency_item_type_id: Option<ItemTypeId>,
    all_item_types_infinite_copies: bool,
    bin_length: Volume,
    bin_type_ids: Vec<BinTypeId>,
    previous_bins_length: Vec<Volume>,
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

    /// Total demand.
    pub fn number_of_items(&self) -> ItemPos {
        self.number_of_items
    }

    /// Number of available bins, all copies expanded.
    pub fn number_of_bins(&self) -> BinPos {
        self.bin_type_ids.len()
    }

    /// Bin type of the `bin_pos`-th bin of the expanded bin sequence.
    pub fn bin_type_id(&self, bin_pos: BinPos) -> BinTypeId {
        self.bin_type_ids[bin_pos]
    }

    /// Cumulated length of the bins before `bin_pos`.
    pub fn previous_bins_length(&self, bin_pos: BinPos) -> Volume {
        self.previous_bins_length[bin_pos]
    }

    pub fn item_length(&self) -> Volume {
        self.item_length
    }

    pub fn item_profit(&self) -> Profit {
        self.item_profit
    }

    pub fn bin_length(&self) -> Volume {
        self.bin_length
    }

    pub fn max_efficiency_item_type_id(&self) -> Option<ItemTypeId> {
        self.max_efficiency_item_type_id
    }

    /// 'true' iff every item type has enough copies to fill any bin alone.
    pub fn unbounded_knapsack(&self) -> bool {
        self.all_item_types_infinite_copies
    }
}

#[derive(Debug, Deserialize)]
struct BinRecord {
    #[serde(rename = "X")]
    x: Length,
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
    #[serde(rename = "PROFIT", default)]
    profit: Option<Profit>,
    #[serde(rename = "COPIES", default)]
    copies: Option<ItemPos>,
    #[serde(rename = "WEIGHT", default)]
    weight: Option<Weight>,
    #[serde(rename = "NESTING_LENGTH", default)]
    nesting_length: Option<Length>,
    #[serde(rename = "MAXIMUM_STACKABILITY", default)]
    maximum_stackability: Option<ItemPos>,
    #[serde(rename = "MAXIMUM_WEIGHT_AFTER", default)]
    maximum_weight_after: Option<Weight>,
    #[serde(rename = "ELIGIBILITY_ID", default)]
    eligibility_id: Option<EligibilityId>,
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
        length: Length,
        cost: Profit,
        copies: ItemPos,
        copies_min: ItemPos,
    ) -> Result<BinTypeId> {
        if length <= 0 {
            return Err(Error::ConstraintViolation(format!(
                "bin type length must be > 0, got {}",
                length
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
            length,
            cost: if cost == -1.0 { length as Profit } else { cost },
            copies,
            copies_min,
            maximum_weight: f64::INFINITY,
            eligibility_ids: Vec::new(),
            item_type_ids: Vec::new(),
        });
        Ok(id)
    }

    pub fn set_bin_type_maximum_weight(&mut self, bin_type_id: BinTypeId, maximum_weight: Weight) {
        self.bin_types[bin_type_id].maximum_weight = maximum_weight;
    }

    pub fn add_bin_type_eligibility(&mut self, bin_type_id: BinTypeId, eligibility_id: EligibilityId) {
        self.bin_types[bin_type_id].eligibility_ids.push(eligibility_id);
    }

    pub fn add_item_type(
        &mut self,
        length: Length,
        profit: Profit,
        copies: ItemPos,
    ) -> Result<ItemTypeId> {
        if length <= 0 {
            return Err(Error::ConstraintViolation(format!(
                "item type length must be > 0, got {}",
                length
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
            length,
            profit: if profit == -1.0 { length as Profit } else { profit },
            copies,
            weight: 0.0,
            nesting_length: 0,
            maximum_stackability: ItemPos::MAX,
            maximum_weight_after: f64::INFINITY,
            eligibility_id: None,
        });
        Ok(id)
    }

    pub fn set_item_type_weight(&mut self, item_type_id: ItemTypeId, weight: Weight) {
        self.item_types[item_type_id].weight = weight;
    }

    pub fn set_item_type_nesting_length(&mut self, item_type_id: ItemTypeId, nesting_length: Length) {
        self.item_types[item_type_id].nesting_length = nesting_length;
    }

    pub fn set_item_type_maximum_stackability(
        &mut self,
        item_type_id: ItemTypeId,
        maximum_stackability: ItemPos,
    ) {
        self.item_types[item_type_id].maximum_stackability = maximum_stackability;
    }

    pub fn set_item_type_maximum_weight_after(
        &mut self,
        item_type_id: ItemTypeId,
        maximum_weight_after: Weight,
    ) {
        self.item_types[item_type_id].maximum_weight_after = maximum_weight_after;
    }

    pub fn set_item_type_eligibility(&mut self, item_type_id: ItemTypeId, eligibility_id: EligibilityId) {
        self.item_types[item_type_id].eligibility_id = Some(eligibility_id);
    }

    pub fn set_bin_types_infinite_copies(&mut self) {
        for bin_type in &mut self.bin_types {
            bin_type.copies = -1;
        }
    }

    pub fn set_bin_types_unweighted(&mut self) {
        for bin_type in &mut self.bin_types {
            bin_type.cost = bin_type.length as Profit;
        }
    }

    pub fn set_item_types_unweighted(&mut self) {
        for item_type in &mut self.item_types {
            item_type.profit = item_type.length as Profit;
        }
    }

    /// Give each item type enough copies to fill the largest bin alone.
    pub fn set_item_types_infinite_copies(&mut self) {
        let length_max = self.bin_types_length_max();
        for item_type in &mut self.item_types {
            item_type.copies = (length_max - 1) / item_type.length + 1;
        }
    }

    fn bin_types_length_max(&self) -> Length {
        self.bin_types.iter().map(|b| b.length).max().unwrap_or(0)
    }

    pub fn read_bin_types<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let mut reader = csv::Reader::from_path(path)?;
        for record in reader.deserialize() {
            let record: BinRecord = record?;
            let bin_type_id = self.add_bin_type(
                record.x,
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
                record.profit.unwrap_or(-1.0),
                record.copies.unwrap_or(1),
            )?;
            if let Some(weight) = record.weight {
                self.set_item_type_weight(item_type_id, weight);
            }
            if let Some(nesting_length) = record.nesting_length {
                self.set_item_type_nesting_length(item_type_id, nesting_length);
            }
            if let Some(maximum_stackability) = record.maximum_stackability {
                self.set_item_type_maximum_stackability(item_type_id, maximum_stackability);
            }
            if let Some(maximum_weight_after) = record.maximum_weight_after {
                self.set_item_type_maximum_weight_after(item_type_id, maximum_weight_after);
            }
            if let Some(eligibility_id) = record.eligibility_id {
                self.set_item_type_eligibility(item_type_id, eligibility_id);
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
            | Objective::Knapsack
            | Objective::VariableSizedBinPacking => {}
            objective => {
                return Err(Error::ObjectiveUnsupported(objective, "onedimensional"));
            }
        }
        if self.bin_types.is_empty() {
            return Err(Error::InvalidInput("instance has no bin type".into()));
        }

        let length_max = self.bin_types_length_max();
        let mut number_of_items = 0;
        let mut item_profit = 0.0;
        let mut item_length = 0;
        let mut max_efficiency_item_type_id: Option<ItemTypeId> = None;
        let mut max_efficiency = f64::NEG_INFINITY;
        let mut all_item_types_infinite_copies = true;
        for item_type in &mut self.item_types {
            // '-1' copies turn into the bound that makes them inexhaustible.
            let infinite_copies = (length_max - 1) / item_type.length + 1;
            if item_type.copies == -1 {
                item_type.copies = infinite_copies;
            }
            number_of_items += item_type.copies;
            item_profit += item_type.copies as Profit * item_type.profit;
            item_length += item_type.copies * item_type.length;
            let efficiency = item_type.profit / item_type.length as Profit;
            if efficiency > max_efficiency {
                max_efficiency = efficiency;
                max_efficiency_item_type_id = Some(item_type.id);
            }
            if item_type.copies < infinite_copies {
                all_item_types_infinite_copies = false;
            }
        }

        let mut bin_length = 0;
        let mut bin_type_ids = Vec::new();
        let mut previous_bins_length = Vec::new();
        let mut previous = 0;
        for bin_type in &mut self.bin_types {
            if bin_type.copies == -1 {
                bin_type.copies = number_of_items.max(1);
            }
            bin_length += bin_type.copies * bin_type.length;
            for _ in 0..bin_type.copies {
                bin_type_ids.push(bin_type.id);
                previous_bins_length.push(previous);
                previous += bin_type.length;
            }
        }

        // Restrict each bin type to the item types it is eligible for.
        for bin_type in &mut self.bin_types {
            for item_type in &self.item_types {
                match item_type.eligibility_id {
                    Some(eligibility_id)
                        if !bin_type.eligibility_ids.contains(&eligibility_id) => {}
                    _ => bin_type.item_type_ids.push(item_type.id),
                }
            }
        }

        Ok(Instance {
            objective: self.objective,
            item_types: self.item_types,
            bin_types: self.bin_types,
            number_of_items,
            item_profit,
            item_length,
            max_efficiency_item_type_id,
            all_item_types_infinite_copies,
            bin_length,
            bin_type_ids,
            previous_bins_length,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_rejects_bad_sizes() {
        let mut builder = InstanceBuilder::new();
        assert!(builder.add_bin_type(0, -1.0, 1, 0).is_err());
        assert!(builder.add_bin_type(10, -2.0, 1, 0).is_err());
        assert!(builder.add_bin_type(10, -1.0, 1, 2).is_err());
        assert!(builder.add_item_type(0, -1.0, 1).is_err());
        assert!(builder.add_item_type(5, -1.0, 0).is_err());
    }

    #[test]
    fn build_computes_aggregates() {
        let mut builder = InstanceBuilder::new();
        builder.add_bin_type(10, -1.0, 2, 0).unwrap();
        builder.add_item_type(7, -1.0, 1).unwrap();
        builder.add_item_type(4, 8.0, 1).unwrap();
        let instance = builder.build().unwrap();

        assert_eq!(instance.number_of_items(), 2);
        assert_eq!(instance.item_length(), 11);
        assert_eq!(instance.number_of_bins(), 2);
        assert_eq!(instance.bin_length(), 20);
        assert_eq!(instance.previous_bins_length(1), 10);
        // Item 1 has efficiency 2, item 0 has efficiency 1.
        assert_eq!(instance.max_efficiency_item_type_id(), Some(1));
    }

    #[test]
    fn infinite_copies_are_resolved() {
        let mut builder = InstanceBuilder::new();
        builder.add_bin_type(10, -1.0, -1, 0).unwrap();
        builder.add_item_type(3, -1.0, -1).unwrap();
        let instance = builder.build().unwrap();
        // ceil(10 / 3) copies make the item type inexhaustible in one bin.
        assert_eq!(instance.item_type(0).copies, 4);
        assert!(instance.unbounded_knapsack());
    }

    #[test]
    fn eligibility_filters_item_types() {
        let mut builder = InstanceBuilder::new();
        builder.add_bin_type(10, -1.0, 1, 0).unwrap();
        builder.add_bin_type(10, -1.0, 1, 0).unwrap();
        builder.add_bin_type_eligibility(1, 3);
        builder.add_item_type(5, -1.0, 1).unwrap();
        builder.add_item_type(5, -1.0, 1).unwrap();
        builder.set_item_type_eligibility(1, 3);
        let instance = builder.build().unwrap();
        // Bin 0 declares no eligibility: only unrestricted items allowed.
        assert_eq!(instance.bin_type(0).item_type_ids, vec![0]);
        assert_eq!(instance.bin_type(1).item_type_ids, vec![0, 1]);
    }

    #[test]
    fn open_dimension_is_rejected() {
        let mut builder = InstanceBuilder::new();
        builder.add_bin_type(10, -1.0, 1, 0).unwrap();
        builder.set_objective(Objective::OpenDimensionX);
        assert!(builder.build().is_err());
    }
}
