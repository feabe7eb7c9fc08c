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

use std::fmt;
use std::result::Result as StdResult;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub type Length = i64;
pub type Area = i64;
pub type Volume = i64;
pub type Weight = f64;
pub type Profit = f64;

pub type ItemTypeId = usize;
pub type BinTypeId = usize;
pub type DefectId = usize;
pub type ItemPos = i64;
pub type BinPos = usize;
pub type GroupId = usize;
pub type StackabilityId = i64;
pub type EligibilityId = i64;
pub type NodeId = u64;
pub type GuideId = u8;
pub type Seed = i64;

/// Tolerance factor applied to floating weight comparisons.
pub const PSTOL: f64 = 1.0 + 1e-9;

pub fn strictly_lesser(v1: f64, v2: f64) -> bool {
    if v1 >= v2 {
        return false;
    }
    v2 - v1 > 1e-9 * 1e-5_f64.max(v1.abs()).max(v2.abs())
}

pub fn strictly_greater(v1: f64, v2: f64) -> bool {
    strictly_lesser(v2, v1)
}

pub fn approx_equal(v1: f64, v2: f64) -> bool {
    if v1 == v2 {
        return true;
    }
    (v1 - v2).abs() <= 1e-9 * 1e-5_f64.max(v1.abs()).max(v2.abs())
}

quick_error! {
    #[derive(Debug)]
    pub enum Error {
        InvalidInput(msg: String) {
            display("invalid input: {}", msg)
        }
        ConstraintViolation(msg: String) {
            display("constraint violation: {}", msg)
        }
        IllegalState(msg: String) {
            display("illegal state: {}", msg)
        }
        ObjectiveUnsupported(objective: Objective, scheme: &'static str) {
            display("objective '{}' is not supported by '{}'", objective, scheme)
        }
        Csv(err: csv::Error) {
            from()
            display("csv error: {}", err)
        }
        Io(err: std::io::Error) {
            from()
            display("io error: {}", err)
        }
    }
}

pub type Result<T> = StdResult<T, Error>;

/// Criterion optimized by a solver run.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Serialize, Deserialize)]
pub enum Objective {
    /// Maximize profit, then minimize waste.
    Default,
    /// Pack all items in the minimum number of bins.
    BinPacking,
    /// Pack all items, maximize the leftover at the end of the last bin.
    BinPackingWithLeftovers,
    /// Pack all items, minimize the used length of the x axis.
    OpenDimensionX,
    /// Pack all items, minimize the used length of the y axis.
    OpenDimensionY,
    /// Maximize the profit of a selected subset of items.
    Knapsack,
    /// Pack all items, minimize the total cost of the used bins.
    VariableSizedBinPacking,
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Objective::Default => "default",
            Objective::BinPacking => "bin-packing",
            Objective::BinPackingWithLeftovers => "bin-packing-with-leftovers",
            Objective::OpenDimensionX => "open-dimension-x",
            Objective::OpenDimensionY => "open-dimension-y",
            Objective::Knapsack => "knapsack",
            Objective::VariableSizedBinPacking => "variable-sized-bin-packing",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Objective {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "default" => Ok(Objective::Default),
            "bin-packing" => Ok(Objective::BinPacking),
            "bin-packing-with-leftovers" => Ok(Objective::BinPackingWithLeftovers),
            "open-dimension-x" => Ok(Objective::OpenDimensionX),
            "open-dimension-y" => Ok(Objective::OpenDimensionY),
            "knapsack" => Ok(Objective::Knapsack),
            "variable-sized-bin-packing" => Ok(Objective::VariableSizedBinPacking),
            _ => Err(Error::InvalidInput(format!("unknown objective '{}'", s))),
        }
    }
}

/// Axis along which a scheme packs, used by the instance flippers.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Serialize, Deserialize)]
pub enum Direction {
    X,
    Y,
    Z,
    Any,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Direction::X => "x",
            Direction::Y => "y",
            Direction::Z => "z",
            Direction::Any => "any",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "x" => Ok(Direction::X),
            "y" => Ok(Direction::Y),
            "z" => Ok(Direction::Z),
            "any" => Ok(Direction::Any),
            _ => Err(Error::InvalidInput(format!("unknown direction '{}'", s))),
        }
    }
}

/// Rule constraining the order or the extraction direction of the items
/// sharing a bin.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Serialize, Deserialize)]
pub enum UnloadingConstraint {
    None,
    OnlyXMovements,
    OnlyYMovements,
    IncreasingX,
    IncreasingY,
}

impl Default for UnloadingConstraint {
    fn default() -> Self {
        UnloadingConstraint::None
    }
}

impl fmt::Display for UnloadingConstraint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            UnloadingConstraint::None => "none",
            UnloadingConstraint::OnlyXMovements => "only-x-movements",
            UnloadingConstraint::OnlyYMovements => "only-y-movements",
            UnloadingConstraint::IncreasingX => "increasing-x",
            UnloadingConstraint::IncreasingY => "increasing-y",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for UnloadingConstraint {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "none" => Ok(UnloadingConstraint::None),
            "only-x-movements" => Ok(UnloadingConstraint::OnlyXMovements),
            "only-y-movements" => Ok(UnloadingConstraint::OnlyYMovements),
            "increasing-x" => Ok(UnloadingConstraint::IncreasingX),
            "increasing-y" => Ok(UnloadingConstraint::IncreasingY),
            _ => Err(Error::InvalidInput(format!(
                "unknown unloading constraint '{}'",
                s
            ))),
        }
    }
}

/// How a run spends its time budget.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Serialize, Deserialize)]
pub enum OptimizationMode {
    /// Parallel searches with several guides and directions sharing one pool.
    Anytime,
    /// One search per direction, run sequentially, keep the best.
    NotAnytimeSequential,
}

impl fmt::Display for OptimizationMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            OptimizationMode::Anytime => "anytime",
            OptimizationMode::NotAnytimeSequential => "not-anytime-sequential",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for OptimizationMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "anytime" => Ok(OptimizationMode::Anytime),
            "not-anytime-sequential" => Ok(OptimizationMode::NotAnytimeSequential),
            _ => Err(Error::InvalidInput(format!(
                "unknown optimization mode '{}'",
                s
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tolerant_comparisons() {
        assert!(strictly_lesser(1.0, 2.0));
        assert!(!strictly_lesser(1.0, 1.0 + 1e-12));
        assert!(approx_equal(1.0, 1.0 + 1e-12));
        assert!(strictly_greater(2.0, 1.0));
    }

    #[test]
    fn objective_round_trip() {
        for s in &[
            "default",
            "bin-packing",
            "bin-packing-with-leftovers",
            "open-dimension-x",
            "open-dimension-y",
            "knapsack",
            "variable-sized-bin-packing",
        ] {
            let objective: Objective = s.parse().unwrap();
            assert_eq!(&objective.to_string(), s);
        }
        assert!("guillotine".parse::<Objective>().is_err());
    }

    #[test]
    fn unloading_constraint_accepts_underscores() {
        let c: UnloadingConstraint = "increasing_x".parse().unwrap();
        assert_eq!(c, UnloadingConstraint::IncreasingX);
    }
}
