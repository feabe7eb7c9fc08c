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

//! Three-dimensional box packing: boxes anchor back-bottom-left on a 3D
//! staircase front, under rotation masks and weight limits.

mod branching_scheme;
mod instance;
mod instance_flipper;
mod solution;

use std::sync::Arc;

pub use self::branching_scheme::{
    BranchingScheme, Insertion, Node, Parameters as SchemeParameters, UncoveredItem,
    YUncoveredItem, ZUncoveredItem,
};
pub use self::instance::{
    BinType, Instance, InstanceBuilder, ItemType, NUMBER_OF_ROTATIONS, ROTATIONS_ALL,
    ROTATIONS_NONE,
};
pub use self::instance_flipper::{convert_point_back, InstanceFlipper};
pub use self::solution::{Solution, SolutionBin, SolutionItem};

use crate::common::{Direction, GuideId, Objective, OptimizationMode, Result};
use crate::format::{AlgorithmFormatter, Output, Parameters};
use crate::tree_search::{tree_search, TreeSearchParameters};

pub struct OptimizeParameters {
    pub parameters: Parameters<Solution>,
    /// Guides of the tree search workers; chosen from the objective when
    /// empty.
    pub guides: Vec<GuideId>,
    pub maximum_size_of_the_queue: Option<usize>,
}

impl Default for OptimizeParameters {
    fn default() -> Self {
        OptimizeParameters {
            parameters: Parameters::default(),
            guides: Vec::new(),
            maximum_size_of_the_queue: None,
        }
    }
}

fn default_guides(objective: Objective) -> Vec<GuideId> {
    match objective {
        Objective::Knapsack | Objective::Default => vec![4, 5],
        _ => vec![0, 1],
    }
}

/// Run tree searches over the instance and keep the best solutions found.
pub fn optimize(
    instance: &Arc<Instance>,
    mut parameters: OptimizeParameters,
) -> Result<Output<Solution>> {
    let objective = instance.objective();
    let guides = if parameters.guides.is_empty() {
        default_guides(objective)
    } else {
        parameters.guides.clone()
    };
    let optimization_mode = parameters.parameters.optimization_mode;
    let directions: Vec<Direction> = match objective {
        Objective::OpenDimensionX => vec![Direction::X],
        Objective::OpenDimensionY => vec![Direction::Y],
        _ => match optimization_mode {
            OptimizationMode::Anytime => vec![Direction::Any],
            OptimizationMode::NotAnytimeSequential => {
                vec![Direction::X, Direction::Y, Direction::Z]
            }
        },
    };

    let mut schemes = Vec::new();
    for &direction in &directions {
        for &guide_id in &guides {
            schemes.push(BranchingScheme::new(
                instance.clone(),
                SchemeParameters { guide_id, direction },
            )?);
        }
    }

    let formatter =
        AlgorithmFormatter::new(&mut parameters.parameters, Solution::new(instance.clone()));
    let search_parameters = TreeSearchParameters {
        maximum_size_of_the_queue: parameters.maximum_size_of_the_queue,
    };

    match optimization_mode {
        OptimizationMode::Anytime => {
            rayon::scope(|scope| {
                for scheme in schemes {
                    let formatter = &formatter;
                    let search_parameters = &search_parameters;
                    scope.spawn(move |_| {
                        let comment = format!(
                            "TS g{} d{}",
                            scheme.parameters().guide_id,
                            scheme.parameters().direction
                        );
                        tree_search(&scheme, formatter, search_parameters, &comment);
                    });
                }
            });
        }
        OptimizationMode::NotAnytimeSequential => {
            for scheme in schemes {
                let comment = format!(
                    "TS g{} d{}",
                    scheme.parameters().guide_id,
                    scheme.parameters().direction
                );
                tree_search(&scheme, &formatter, &search_parameters, &comment);
            }
        }
    }

    Ok(formatter.into_output())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn knapsack_single_perfect_item() {
        let mut builder = InstanceBuilder::new();
        builder.set_objective(Objective::Knapsack);
        builder.add_bin_type(10, 10, 10, -1.0, 1, 0).unwrap();
        builder.add_item_type(10, 10, 10, 100.0, 1).unwrap();
        let instance = Arc::new(builder.build().unwrap());

        let mut parameters = OptimizeParameters::default();
        parameters.parameters.verbosity_level = 0;
        let output = optimize(&instance, parameters).unwrap();

        let best = output.solution_pool.best();
        assert_eq!(best.profit(), 100.0);
        assert!(best.full());
        assert!(best.feasible());
    }

    #[test]
    fn knapsack_selects_the_best_subset() {
        let mut builder = InstanceBuilder::new();
        builder.set_objective(Objective::Knapsack);
        builder.add_bin_type(10, 10, 10, -1.0, 1, 0).unwrap();
        builder.add_item_type(10, 10, 6, 10.0, 1).unwrap();
        builder.add_item_type(10, 10, 4, 7.0, 1).unwrap();
        builder.add_item_type(10, 10, 5, 6.0, 2).unwrap();
        let instance = Arc::new(builder.build().unwrap());

        let mut parameters = OptimizeParameters::default();
        parameters.parameters.verbosity_level = 0;
        let output = optimize(&instance, parameters).unwrap();

        // 6 + 4 thick slabs: profit 17 beats the two 5-thick at 12.
        assert_eq!(output.solution_pool.best().profit(), 17.0);
    }

    #[test]
    fn bin_packing_fills_one_bin() {
        let mut builder = InstanceBuilder::new();
        builder.set_objective(Objective::BinPacking);
        builder.add_bin_type(10, 10, 10, -1.0, 4, 0).unwrap();
        builder.add_item_type(10, 10, 5, -1.0, 2).unwrap();
        let instance = Arc::new(builder.build().unwrap());

        let mut parameters = OptimizeParameters::default();
        parameters.parameters.verbosity_level = 0;
        let output = optimize(&instance, parameters).unwrap();

        let best = output.solution_pool.best();
        assert!(best.full());
        assert!(best.feasible());
        assert_eq!(best.number_of_bins(), 1);
    }

    #[test]
    fn sequential_directions_agree() {
        let mut builder = InstanceBuilder::new();
        builder.set_objective(Objective::BinPacking);
        builder.add_bin_type(10, 10, 10, -1.0, 4, 0).unwrap();
        builder.add_item_type(10, 10, 5, -1.0, 2).unwrap();
        let instance = Arc::new(builder.build().unwrap());

        let mut parameters = OptimizeParameters::default();
        parameters.parameters.verbosity_level = 0;
        parameters.parameters.optimization_mode = OptimizationMode::NotAnytimeSequential;
        let output = optimize(&instance, parameters).unwrap();
        assert_eq!(output.solution_pool.best().number_of_bins(), 1);
    }
}
