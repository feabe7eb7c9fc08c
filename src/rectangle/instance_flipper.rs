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

use std::sync::Arc;

use super::instance::{Instance, InstanceBuilder};
use super::solution::Solution;
use crate::common::*;

/// Maps an instance across the x/y diagonal so that a scheme packing along
/// x also serves direction y, and maps solutions back.
pub struct InstanceFlipper {
    original: Arc<Instance>,
    flipped: Arc<Instance>,
}

impl InstanceFlipper {
    pub fn new(instance: Arc<Instance>) -> Result<Self> {
        let flipped = Arc::new(Self::flip(&instance)?);
        Ok(InstanceFlipper {
            original: instance,
            flipped,
        })
    }

    pub fn original_instance(&self) -> &Arc<Instance> {
        &self.original
    }

    pub fn flipped_instance(&self) -> &Arc<Instance> {
        &self.flipped
    }

    fn flip(instance: &Instance) -> Result<Instance> {
        let mut builder = InstanceBuilder::new();
        builder.set_objective(match instance.objective() {
            Objective::OpenDimensionY => Objective::OpenDimensionX,
            objective => objective,
        });
        builder.set_unloading_constraint(match instance.unloading_constraint() {
            UnloadingConstraint::IncreasingX => UnloadingConstraint::IncreasingY,
            UnloadingConstraint::IncreasingY => UnloadingConstraint::IncreasingX,
            UnloadingConstraint::OnlyXMovements => UnloadingConstraint::OnlyYMovements,
            UnloadingConstraint::OnlyYMovements => UnloadingConstraint::OnlyXMovements,
            UnloadingConstraint::None => UnloadingConstraint::None,
        });
        for bin_type in instance.bin_types() {
            let bin_type_id =
                builder.add_bin_type(bin_type.y, bin_type.x, bin_type.cost, bin_type.copies, bin_type.copies_min)?;
            builder.set_bin_type_maximum_weight(bin_type_id, bin_type.maximum_weight);
            if let Some(semi_trailer) = bin_type.semi_trailer {
                builder.set_bin_type_semi_trailer(bin_type_id, semi_trailer);
            }
            for defect in &bin_type.defects {
                builder.add_defect(bin_type_id, defect.y, defect.x, defect.ly, defect.lx)?;
            }
        }
        for item_type in instance.item_types() {
            let item_type_id =
                builder.add_item_type(item_type.y, item_type.x, item_type.profit, item_type.copies)?;
            builder.set_item_type_oriented(item_type_id, item_type.oriented);
            builder.set_item_type_weight(item_type_id, item_type.weight);
            builder.set_item_type_group(item_type_id, item_type.group_id);
        }
        builder.build()
    }

    /// Map a solution of the flipped instance back onto the original axes.
    pub fn unflip_solution(&self, flipped_solution: &Solution) -> Solution {
        let mut solution = Solution::new(self.original.clone());
        for (bin_pos, flipped_bin) in flipped_solution.bins().iter().enumerate() {
            solution
                .add_bin(flipped_bin.bin_type_id, flipped_bin.copies)
                .expect("unflip opened an invalid bin");
            for flipped_item in &flipped_bin.items {
                solution
                    .add_item(
                        bin_pos,
                        flipped_item.item_type_id,
                        flipped_item.y,
                        flipped_item.x,
                        flipped_item.rotate,
                    )
                    .expect("unflip placed an invalid item");
            }
        }
        solution
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_instance() -> Arc<Instance> {
        let mut builder = InstanceBuilder::new();
        builder.set_objective(Objective::OpenDimensionY);
        builder.set_unloading_constraint(UnloadingConstraint::IncreasingX);
        builder.add_bin_type(6000, 3210, -1.0, 1, 0).unwrap();
        builder.add_defect(0, 100, 50, 20, 10).unwrap();
        builder.add_item_type(1000, 500, -1.0, 1).unwrap();
        builder.set_item_type_oriented(0, true);
        Arc::new(builder.build().unwrap())
    }

    #[test]
    fn flip_swaps_axes_and_remaps_enums() {
        let flipper = InstanceFlipper::new(build_instance()).unwrap();
        let flipped = flipper.flipped_instance();
        assert_eq!(flipped.objective(), Objective::OpenDimensionX);
        assert_eq!(
            flipped.unloading_constraint(),
            UnloadingConstraint::IncreasingY
        );
        let bin_type = flipped.bin_type(0);
        assert_eq!((bin_type.x, bin_type.y), (3210, 6000));
        let defect = &bin_type.defects[0];
        assert_eq!((defect.x, defect.y, defect.lx, defect.ly), (50, 100, 10, 20));
        let item_type = flipped.item_type(0);
        assert_eq!((item_type.x, item_type.y), (500, 1000));
        assert!(item_type.oriented);
    }

    #[test]
    fn unflip_restores_coordinates() {
        let flipper = InstanceFlipper::new(build_instance()).unwrap();
        let mut flipped_solution = Solution::new(flipper.flipped_instance().clone());
        let bin = flipped_solution.add_bin(0, 1).unwrap();
        flipped_solution.add_item(bin, 0, 200, 300, false).unwrap();

        let solution = flipper.unflip_solution(&flipped_solution);
        let item = &solution.bins()[0].items[0];
        assert_eq!((item.x, item.y), (300, 200));
        assert!(solution.feasible());
        assert!(solution.full());
    }
}
