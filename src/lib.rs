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

#[macro_use]
extern crate quick_error;

pub mod common;
pub mod cuboid;
pub mod format;
pub mod onedimensional;
pub mod pool;
pub mod rectangle;
pub mod timer;
pub mod tree_search;

pub use self::common::{
    Direction, Error, Objective, OptimizationMode, Result, UnloadingConstraint,
};
pub use self::format::{Output, Parameters};
pub use self::pool::SolutionPool;
pub use self::timer::Timer;
