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

use super::instance::{Instance, InstanceBuilder, ItemType, NUMBER_OF_ROTATIONS, ROTATIONS_ALL};
use super::solution::Solution;
use crate::common::*;

/// Swap a point's x with the flipped axis.
pub fn convert_point_back(
    direction: Direction,
    x: Length,
    y: Length,
    z: Length,
) -> (Length, Length, Length) {
    match direction {
        Direction::Y => (y, x, z),
        Direction::Z => (z, y, x),
        _ => (x, y, z),
    }
}

/// Maps an instance across an axis swap (x with y, or x with z) so that a
/// scheme packing along x serves the other directions.
pub struct InstanceFlipper {
    original: Arc<Instance>,
    flipped: Arc<Instance>,
    direction: Direction,
}

impl InstanceFlipper {
    pub fn new(instance: Arc<Instance>, direction: Direction) -> Result<Self> {
        let flipped = Arc::new(Self::flip(&instance, direction)?);
        Ok(InstanceFlipper {
            original: instance,
            flipped,
            direction,
        })
    }

    pub fn original_instance(&self) -> &Arc<Instance> {
        &self.original
    }

    pub fn flipped_instance(&self) -> &Arc<Instance> {
        &self.flipped
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    fn flip(instance: &Instance, direction: Direction) -> Result<Instance> {
        let mut builder = InstanceBuilder::new();
        builder.set_objective(match (instance.objective(), direction) {
            (Objective::OpenDimensionY, Direction::Y) => Objective::OpenDimensionX,
            (objective, _) => objective,
        });
        for bin_type in instance.bin_types() {
            let (x, y, z) = convert_point_back(direction, bin_type.x, bin_type.y, bin_type.z);
            let bin_type_id =
                builder.add_bin_type(x, y, z, bin_type.cost, bin_type.copies, bin_type.copies_min)?;
            builder.set_bin_type_maximum_weight(bin_type_id, bin_type.maximum_weight);
        }
        for item_type in instance.item_types() {
            let (x, y, z) = convert_point_back(direction, item_type.x, item_type.y, item_type.z);
            let item_type_id = builder.add_item_type(x, y, z, item_type.profit, item_type.copies)?;
            builder.set_item_type_weight(item_type_id, item_type.weight);

            // A rotation is allowed in the flipped frame iff its extents are
            // the swap of an allowed original orientation's extents.
            let flipped_item = ItemType {
                id: item_type_id,
                x,
                y,
                z,
                rotations: ROTATIONS_ALL,
                profit: item_type.profit,
                copies: item_type.copies,
                weight: item_type.weight,
            };
            let mut rotations = 0u8;
            for rotation in 0..NUMBER_OF_ROTATIONS {
                let extents = (
                    flipped_item.x(rotation),
                    flipped_item.y(rotation),
                    flipped_item.z(rotation),
                );
                let allowed = (0..NUMBER_OF_ROTATIONS).any(|original_rotation| {
                    item_type.can_rotate(original_rotation)
                        && convert_point_back(
                            direction,
                            item_type.x(original_rotation),
                            item_type.y(original_rotation),
                            item_type.z(original_rotation),
                        ) == extents
                });
                if allowed {
                    rotations |= 1 << rotation;
                }
            }
            builder.set_item_type_rotations(item_type_id, rotations)?;
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
                let flipped_type = self.flipped.item_type(flipped_item.item_type_id);
                let (x, y, z) = convert_point_back(
                    self.direction,
                    flipped_item.x,
                    flipped_item.y,
                    flipped_item.z,
                );
                let (lx, ly, lz) = convert_point_back(
                    self.direction,
                    flipped_type.x(flipped_item.rotation),
                    flipped_type.y(flipped_item.rotation),
                    flipped_type.z(flipped_item.rotation),
                );
                let rotation = self
                    .original
                    .item_type(flipped_item.item_type_id)
                    .rotation_matching(lx, ly, lz)
                    .expect("no original rotation matches the flipped placement");
                solution
                    .add_item(bin_pos, flipped_item.item_type_id, x, y, z, rotation)
                    .expect("unflip placed an invalid item");
            }
        }
        solution
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flip_z_swaps_bin_extents() {
        let mut builder = InstanceBuilder::new();
        builder.add_bin_type(100, 50, 20, -1.0, 1, 0).unwrap();
        builder.add_item_type(10, 20, 30, -1.0, 1).unwrap();
        let instance = Arc::new(builder.build().unwrap());

        let flipper = InstanceFlipper::new(instance, Direction::Z).unwrap();
        let bin_type = flipper.flipped_instance().bin_type(0);
        assert_eq!((bin_type.x, bin_type.y, bin_type.z), (20, 50, 100));
    }

    #[test]
    fn oriented_items_stay_oriented_under_flip() {
        let mut builder = InstanceBuilder::new();
        builder.add_bin_type(100, 50, 20, -1.0, 1, 0).unwrap();
        builder.add_item_type(10, 20, 30, -1.0, 1).unwrap();
        builder.set_item_types_oriented();
        let instance = Arc::new(builder.build().unwrap());

        let flipper = InstanceFlipper::new(instance, Direction::Y).unwrap();
        let item_type = flipper.flipped_instance().item_type(0);
        assert_eq!((item_type.x, item_type.y, item_type.z), (20, 10, 30));
        // Only the orientation matching the swapped original survives.
        assert_eq!(item_type.unique_rotations().len(), 1);
        let rotation = item_type.unique_rotations()[0];
        assert_eq!(
            (
                item_type.x(rotation),
                item_type.y(rotation),
                item_type.z(rotation)
            ),
            (20, 10, 30)
        );
    }

    #[test]
    fn free_rotation_survives_flip() {
        let mut builder = InstanceBuilder::new();
        builder.add_bin_type(100, 50, 20, -1.0, 1, 0).unwrap();
        builder.add_item_type(10, 20, 30, -1.0, 1).unwrap();
        let instance = Arc::new(builder.build().unwrap());

        let flipper = InstanceFlipper::new(instance, Direction::Z).unwrap();
        let item_type = flipper.flipped_instance().item_type(0);
        assert_eq!(item_type.unique_rotations().len(), 6);
    }

    #[test]
    fn point_conversion_is_an_involution() {
        for &direction in &[Direction::Y, Direction::Z] {
            let (x, y, z) = convert_point_back(direction, 1, 2, 3);
            assert_eq!(convert_point_back(direction, x, y, z), (1, 2, 3));
        }
    }

    #[test]
    fn unflip_restores_coordinates_and_rotation() {
        let mut builder = InstanceBuilder::new();
        builder.add_bin_type(100, 50, 20, -1.0, 1, 0).unwrap();
        builder.add_item_type(10, 20, 5, -1.0, 1).unwrap();
        let instance = Arc::new(builder.build().unwrap());

        let flipper = InstanceFlipper::new(instance, Direction::Z).unwrap();
        let mut flipped_solution = Solution::new(flipper.flipped_instance().clone());
        let bin = flipped_solution.add_bin(0, 1).unwrap();
        // Flipped item is 5x20x10, placed unrotated at (1, 2, 3).
        flipped_solution.add_item(bin, 0, 1, 2, 3, 0).unwrap();

        let solution = flipper.unflip_solution(&flipped_solution);
        let item = &solution.bins()[0].items[0];
        assert_eq!((item.x, item.y, item.z), (3, 2, 1));
        // Placed extents in the original frame are 10x20x5: the identity.
        assert_eq!(item.rotation, 0);
        assert!(solution.feasible());
    }
}
