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

//! Two-dimensional rectangle packing without guillotine cuts: items anchor
//! on a staircase front, avoiding bin defects, under weight and
//! unloading-order constraints.

mod branching_scheme;
mod instance;
mod instance_flipper;
mod solution;

use std::sync::Arc;

pub use self::branching_scheme::{
    BranchingScheme, Insertion, LastBinItem, Node, Parameters as SchemeParameters, UncoveredItem,
};
pub use self::instance::{
    BinType, Defect, Instance, InstanceBuilder, InstanceParameters, ItemType, SemiTrailer,
};
pub use self::instance_flipper::InstanceFlipper;
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
///
/// Open dimension objectives pin the packing direction; the other
/// objectives either let each worker branch on both directions (anytime
/// mode) or run one direction-specialized search after the other.
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
            OptimizationMode::NotAnytimeSequential => vec![Direction::X, Direction::Y],
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
