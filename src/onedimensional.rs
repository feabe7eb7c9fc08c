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

//! One-dimensional bin packing: items are placed end to end, with optional
//! nesting, weight and stackability constraints.

mod branching_scheme;
mod instance;
mod solution;

use std::sync::Arc;

pub use self::branching_scheme::{BranchingScheme, Insertion, Node, Parameters as SchemeParameters};
pub use self::instance::{BinType, Instance, InstanceBuilder, ItemType};
pub use self::solution::{Solution, SolutionBin, SolutionItem};

use crate::common::{GuideId, Objective, OptimizationMode, Result};
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
    let guides = if parameters.guides.is_empty() {
        default_guides(instance.objective())
    } else {
        parameters.guides.clone()
    };

    let mut schemes = Vec::new();
    for &guide_id in &guides {
        schemes.push(BranchingScheme::new(
            instance.clone(),
            SchemeParameters { guide_id },
        )?);
    }

    let optimization_mode = parameters.parameters.optimization_mode;
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
                        let comment = format!("TS g{}", scheme.parameters().guide_id);
                        tree_search(&scheme, formatter, search_parameters, &comment);
                    });
                }
            });
        }
        OptimizationMode::NotAnytimeSequential => {
            for scheme in schemes {
                let comment = format!("TS g{}", scheme.parameters().guide_id);
                tree_search(&scheme, &formatter, &search_parameters, &comment);
            }
        }
    }

    Ok(formatter.into_output())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::PoolSolution;
    use std::sync::Mutex;

    #[test]
    fn bin_packing_two_bins() {
        let mut builder = InstanceBuilder::new();
        builder.set_objective(Objective::BinPacking);
        builder.add_bin_type(10, -1.0, 2, 0).unwrap();
        builder.add_item_type(7, -1.0, 1).unwrap();
        builder.add_item_type(4, -1.0, 1).unwrap();
        let instance = Arc::new(builder.build().unwrap());

        let mut parameters = OptimizeParameters::default();
        parameters.parameters.verbosity_level = 0;
        let output = optimize(&instance, parameters).unwrap();

        let best = output.solution_pool.best();
        assert!(best.full());
        assert!(best.feasible());
        assert_eq!(best.number_of_bins(), 2);
        assert_eq!(best.full_waste(), 9);
    }

    #[test]
    fn knapsack_prefers_profit() {
        let mut builder = InstanceBuilder::new();
        builder.set_objective(Objective::Knapsack);
        builder.add_bin_type(10, -1.0, 1, 0).unwrap();
        builder.add_item_type(6, 10.0, 1).unwrap();
        builder.add_item_type(5, 4.0, 2).unwrap();
        let instance = Arc::new(builder.build().unwrap());

        let mut parameters = OptimizeParameters::default();
        parameters.parameters.verbosity_level = 0;
        let output = optimize(&instance, parameters).unwrap();

        // 6 alone is worth 10; the two 5s are worth 8 together.
        assert_eq!(output.solution_pool.best().profit(), 10.0);
    }

    #[test]
    fn callback_sees_strictly_improving_solutions() {
        let mut builder = InstanceBuilder::new();
        builder.set_objective(Objective::BinPacking);
        builder.add_bin_type(12, -1.0, 6, 0).unwrap();
        builder.add_item_type(7, -1.0, 3).unwrap();
        builder.add_item_type(5, -1.0, 3).unwrap();
        builder.add_item_type(4, -1.0, 3).unwrap();
        let instance = Arc::new(builder.build().unwrap());

        let bins_seen = Arc::new(Mutex::new(Vec::new()));
        let bins_in_callback = bins_seen.clone();
        let mut parameters = OptimizeParameters::default();
        parameters.parameters.verbosity_level = 0;
        parameters.parameters.new_solution_callback = Some(Box::new(move |solution, _| {
            bins_in_callback.lock().unwrap().push(solution.number_of_bins());
        }));
        optimize(&instance, parameters).unwrap();

        let bins_seen = bins_seen.lock().unwrap();
        assert!(!bins_seen.is_empty());
        for pair in bins_seen.windows(2) {
            assert!(pair[1] < pair[0]);
        }
    }

    #[test]
    fn pool_keeps_distinct_equivalent_solutions() {
        let mut builder = InstanceBuilder::new();
        builder.set_objective(Objective::Knapsack);
        builder.add_bin_type(10, -1.0, 1, 0).unwrap();
        builder.add_item_type(5, 5.0, 1).unwrap();
        builder.add_item_type(5, 5.0, 1).unwrap();
        let instance = Arc::new(builder.build().unwrap());

        let mut parameters = OptimizeParameters::default();
        parameters.parameters.verbosity_level = 0;
        parameters.parameters.maximum_size_of_the_solution_pool = 4;
        let output = optimize(&instance, parameters).unwrap();

        let solutions = output.solution_pool.solutions();
        assert_eq!(output.solution_pool.best().profit(), 10.0);
        // Distinct item-copy vectors may coexist at equal profit.
        for pair in solutions.windows(2) {
            assert!(pair[0].item_copies() != pair[1].item_copies());
        }
    }
}
